//! Server-side receive pipeline for Ferry.
//!
//! Turns an incoming request body into a typed application value. A receive
//! call names the type it wants; the call's [`ReceivePipeline`] runs its
//! Before, Transform and After phases over the raw [`ByteReadChannel`] until
//! the candidate has that type; the accessor then type-checks and returns it.
//!
//! A request body can be materialized at most once. A second receive on the
//! same call fails with [`ReceiveError::AlreadyConsumed`] unless the
//! [`DoubleReceive`] step is installed.
//!
//! ```no_run
//! # async fn handle(call: &mut receive::ApplicationCall) -> Result<(), receive::ReceiveError> {
//! let text: String = call.receive().await?;
//! assert!(call.receive_or_none::<String>().await?.is_none());
//! # Ok(()) }
//! ```
//!
//! ## Architectural Layer
//!
//! **Request-scoped plumbing.** Connection handling, routing and dispatch are
//! the transport's job; it hands this crate an [`http::request::Parts`] and a
//! body channel.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`call`] | `ApplicationCall` |
//! | [`receive`] | Typed accessors and `ConsumptionState` |
//! | [`pipeline`] | `ReceivePipeline`, `ReceivePhase`, `ReceiveStep`, `StepOutcome` |
//! | [`request`] | `ReceiveRequest` |
//! | [`transform`] | `DefaultTransform` |
//! | [`double_receive`] | `DoubleReceive` |
//! | [`channel`] | `ByteReadChannel`, `InputStream` |
//! | [`multipart`] | `MultiPartData`, `PartData` |
//! | [`attributes`] | `Attributes`, `AttributeKey` |
//! | [`type_info`] | `TypeInfo` |
//! | [`config`] | `ReceiveConfig` |
//! | [`errors`] | `ReceiveError` |

pub mod attributes;
pub mod call;
pub mod channel;
pub mod config;
pub mod double_receive;
pub mod errors;
pub mod identifiers;
pub mod multipart;
pub mod pipeline;
pub mod receive;
pub mod request;
pub mod transform;
pub mod type_info;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use attributes::{AttributeKey, Attributes};
pub use call::ApplicationCall;
pub use channel::{ByteReadChannel, InputStream};
pub use config::ReceiveConfig;
pub use double_receive::DoubleReceive;
pub use errors::ReceiveError;
pub use identifiers::CallId;
pub use multipart::{MultiPartData, PartData};
pub use pipeline::{ReceiveContext, ReceivePhase, ReceivePipeline, ReceiveStep, StepOutcome};
pub use receive::ConsumptionState;
pub use request::ReceiveRequest;
pub use transform::DefaultTransform;
pub use type_info::TypeInfo;
