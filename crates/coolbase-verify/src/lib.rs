//! # CoolBase Verify
//!
//! The receiver-side verification pipeline for decoded modification
//! requests: field and fields-trie integrity, writer authorization via
//! signature recovery, cheque plausibility against the routing table, and
//! consistency resolution against the replica set.
//!
//! Verification is pure: it consults a [`SchemaCatalog`] and a [`Routing`]
//! implementation but never touches storage, so it can run before any
//! resources are committed to a request.

mod error;
mod routing;
mod schema;
mod verify;

pub use error::VerifyError;
pub use routing::{Routing, StaticRouting};
pub use schema::{SchemaCatalog, StaticSchema};
pub use verify::{EntryVerifier, VerifiedEntry};
