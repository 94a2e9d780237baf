//! Shared HTTP content vocabulary for Ferry.
//!
//! Both sides of the workspace speak in these types: the server-side receive
//! pipeline (`receive`) uses them to decide how a request body is decoded, and
//! the client-side JSON feature (`json-client`) uses them to tag outgoing bodies
//! and check incoming ones.
//!
//! ## Architectural Layer
//!
//! **Value types only.** Nothing in this crate performs I/O. Decoding helpers
//! operate on byte slices that a caller has already read.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`content_type`] | `ContentType` parsing, formatting and pattern matching |
//! | [`charset`] | `Charset` and text decoding |
//! | [`content_disposition`] | `ContentDisposition`, used by multipart part headers |
//! | [`parameters`] | `Parameters`, the decoded form of `application/x-www-form-urlencoded` |
//! | [`outgoing`] | `OutgoingContent`, a serialized body tagged with its content type |
//! | [`errors`] | `ContentError` |

pub mod charset;
pub mod content_disposition;
pub mod content_type;
pub mod errors;
pub mod outgoing;
pub mod parameters;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use charset::Charset;
pub use content_disposition::ContentDisposition;
pub use content_type::{ContentType, HeaderParameter};
pub use errors::ContentError;
pub use outgoing::OutgoingContent;
pub use parameters::Parameters;
