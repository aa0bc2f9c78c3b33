//! # CoolBase Codec
//!
//! The type-tagged, length-prefixed nested element encoding used by the
//! CoolBase wire protocol.
//!
//! An element is `tag (1 byte) ‖ length ‖ value`. The length is encoded as a
//! prefix byte giving the number of following big-endian length bytes, so
//! small elements cost two bytes of overhead and nothing pays for a fixed
//! four-byte length field.
//!
//! Which tags are legal beneath a container is described by a hierarchical
//! [`TypeContext`] tree supplied by the protocol layer; this crate only
//! enforces it.
//!
//! Leaf values use canonical formats ([`value`]): minimal big-endian
//! integers, raw UTF-8 strings, nanosecond dates against the 2001-01-01
//! epoch offset, and raw binary. Encoding is canonical: equal values always
//! produce equal bytes.
//!
//! Writing supports deferred materialization ([`ElementWriter::lazy`]): a
//! write node may compute its value only once, on first serialization, and
//! memoize it, so a write graph can be constructed before its contents are
//! known.

pub mod context;
pub mod element;
pub mod error;
pub mod value;
pub mod writer;

pub use context::{TagRule, TypeContext, UnknownTagPolicy};
pub use element::{encode_element, encode_header, ElementReader, RawElement, Tag};
pub use error::CodecError;
pub use value::{
    decode_date, decode_signed, decode_string, decode_unsigned, encode_date, encode_signed,
    encode_string, encode_unsigned, ConsistencyLevel,
};
pub use writer::ElementWriter;
