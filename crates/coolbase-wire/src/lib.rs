//! # CoolBase Wire
//!
//! The CoolBase data-plane protocol: packet framing, the message element
//! tree, incremental parse contexts, and version negotiation.
//!
//! A conversation is a byte stream of packets. Each packet opens with a
//! fixed 16-byte header (magic, CRC32, version) followed by one message: a
//! 6-byte message header and a single root element encoded with
//! [`coolbase_codec`]. Parsing is incremental and lazy: a [`PacketContext`]
//! walks the packet's parts in wire order, spawning child contexts for
//! nested regions and caching every parse outcome, failures included.
//!
//! Receivers speak several protocol versions at once through a
//! [`ProtocolRegistry`]; the packet header is peeked, never consumed, so
//! every registered handler sniffs the same bytes.

pub mod context;
pub mod entry;
pub mod error;
pub mod header;
pub mod lazy;
pub mod protocol;
pub mod tags;

pub use context::{
    EntryContext, EntryPart, MessageBody, MessageContext, MessagePart, PacketContext, PacketPart,
};
pub use entry::{
    cheques_signing_hash, fields_root_hash, Cheque, DataEntry, DataEntryBuilder, DataEntryField,
    DataEntryHeader, DataModificationRequest, EntryType, FieldValue,
};
pub use error::WireError;
pub use header::{
    MessageHeader, PacketHeader, MESSAGE_HEADER_LEN, PACKET_HEADER_LEN, PACKET_MAGIC,
};
pub use lazy::Lazy;
pub use protocol::{write_packet, Protocol, ProtocolRegistry, StandardProtocol};
