//! # CoolBase Testkit
//!
//! Testing utilities for the CoolBase wire protocol.
//!
//! - **Golden vectors**: pinned header and element encodings for
//!   cross-implementation verification ([`vectors`]).
//! - **Generators**: proptest strategies over keys, versions, fields, and
//!   whole signed requests ([`generators`]).
//! - **Fixtures**: deterministic keypairs with a matching schema and
//!   routing table, plus packet encode/open helpers ([`fixtures`]).

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture, FIXTURE_VERSION};
pub use generators::{request_from_params, RequestParams};
pub use vectors::{element_vectors, header_vectors, verify_all_vectors, ElementVector, HeaderVector};
