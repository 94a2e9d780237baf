//! Client-side JSON content negotiation for Ferry.
//!
//! [`JsonSerializer`] is the contract for turning application values into
//! [`content::OutgoingContent`] and reading them back; [`SerdeJsonSerializer`]
//! implements it with `serde_json`. [`JsonFeature`] wires a serializer into
//! reqwest: [`JsonFeature::prepare`] on the way out, [`JsonFeature::receive`]
//! on the way back.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport lives in `reqwest`; this crate only
//! sets headers, encodes bodies and checks the declared response type.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`serializer`] | `JsonSerializer`, `SerdeJsonSerializer` |
//! | [`feature`] | `JsonFeature`, `JsonConfig` |
//! | [`errors`] | `JsonError` |

pub mod errors;
pub mod feature;
pub mod serializer;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::JsonError;
pub use feature::{JsonConfig, JsonFeature};
pub use serializer::{JsonSerializer, SerdeJsonSerializer};
