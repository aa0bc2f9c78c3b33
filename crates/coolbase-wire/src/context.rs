//! Incremental parse contexts.
//!
//! A context is a cursor over one region of the conversation. It exposes the
//! region's parts in wire order; parsing a part either yields its value or
//! spawns a child context for a nested region. A parent whose child is still
//! open is blocked until the child is drained. Skipping is real: a skipped
//! part's bytes are consumed and discarded, children included, so the cursor
//! always lands on the next part boundary.
//!
//! Every parsed part is computed at most once and cached, failures included
//! ([`Lazy`]). Re-asking for a part that failed replays the original error
//! without touching the source again.

use bytes::Bytes;
use coolbase_codec::{
    CodecError, ConsistencyLevel, ElementReader, Tag, UnknownTagPolicy,
};
use coolbase_core::{ByteSource, SharedSource};

use crate::entry::DataEntry;
use crate::error::WireError;
use crate::header::{MessageHeader, PacketHeader, MESSAGE_HEADER_LEN, PACKET_HEADER_LEN};
use crate::lazy::Lazy;
use crate::tags;

/// Allocation step for wire-supplied element lengths. The value buffer
/// grows one chunk at a time, each chunk read before the next is reserved,
/// so a length field claiming gigabytes cannot allocate past what the
/// source actually delivers.
const READ_CHUNK: usize = 64 * 1024;

/// Read one whole element (tag, value) from a byte source.
fn read_element(source: &mut dyn ByteSource) -> Result<(Tag, Bytes), WireError> {
    let tag = Tag(source.get()?);
    let len = read_element_length(source)?;
    let mut value = Vec::with_capacity(len.min(READ_CHUNK));
    while value.len() < len {
        let chunk = (len - value.len()).min(READ_CHUNK);
        let start = value.len();
        value.resize(start + chunk, 0);
        source.read(&mut value[start..])?;
    }
    Ok((tag, Bytes::from(value)))
}

/// Consume and discard one whole element from a byte source, reporting its
/// tag.
fn skip_element(source: &mut dyn ByteSource) -> Result<Tag, WireError> {
    let tag = Tag(source.get()?);
    let len = read_element_length(source)?;
    source.skip(len)?;
    Ok(tag)
}

fn read_element_length(source: &mut dyn ByteSource) -> Result<usize, WireError> {
    let prefix = source.get()?;
    if prefix > 4 {
        return Err(CodecError::InvalidLengthPrefix(prefix).into());
    }
    let mut len = 0usize;
    for _ in 0..prefix {
        len = (len << 8) | usize::from(source.get()?);
    }
    Ok(len)
}

/// Total encoded size of the element starting at `buf[0]`.
fn element_span(buf: &[u8]) -> Result<usize, WireError> {
    let prefix = *buf.get(1).ok_or(CodecError::Truncated { needed: 2 })?;
    if prefix > 4 {
        return Err(CodecError::InvalidLengthPrefix(prefix).into());
    }
    let header = 2 + usize::from(prefix);
    if buf.len() < header {
        return Err(CodecError::Truncated {
            needed: header - buf.len(),
        }
        .into());
    }
    let mut len = 0usize;
    for &byte in &buf[2..header] {
        len = (len << 8) | usize::from(byte);
    }
    if buf.len() < header + len {
        return Err(CodecError::LengthOverflow(len as u64).into());
    }
    Ok(header + len)
}

/// The parts of a packet, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketPart {
    Header,
    Message,
}

/// Parse context for one packet.
pub struct PacketContext {
    source: SharedSource,
    policy: UnknownTagPolicy,
    part: Option<PacketPart>,
    header: Lazy<PacketHeader>,
    message: Option<MessageContext>,
}

impl PacketContext {
    /// Open a context at the start of a packet.
    pub fn new(source: SharedSource, policy: UnknownTagPolicy) -> Self {
        Self {
            source,
            policy,
            part: Some(PacketPart::Header),
            header: Lazy::new(),
            message: None,
        }
    }

    /// The part the cursor is on, `None` once the packet's own parts are
    /// done (a spawned message context may still be open).
    pub fn current(&self) -> Option<PacketPart> {
        self.part
    }

    /// True when the packet and any spawned child are fully consumed.
    pub fn is_closed(&self) -> bool {
        self.part.is_none() && self.message.as_ref().map_or(true, MessageContext::is_closed)
    }

    /// The open child context blocking this one, if any.
    pub fn blocked_by(&mut self) -> Option<&mut MessageContext> {
        self.message.as_mut().filter(|m| !m.is_closed())
    }

    /// Parse the packet header. A failed parse is cached and replayed.
    pub fn header(&mut self) -> Result<&PacketHeader, WireError> {
        if !self.header.is_set() {
            if self.part != Some(PacketPart::Header) {
                return Err(WireError::ContextClosed);
            }
            let source = &mut self.source;
            if self
                .header
                .get_or_try_init(|| PacketHeader::read(source))
                .is_ok()
            {
                self.part = Some(PacketPart::Message);
            }
        }
        match self.header.outcome() {
            Some(result) => result,
            None => Err(WireError::ContextClosed),
        }
    }

    /// Spawn (or return) the context for the packet's message.
    pub fn message(&mut self) -> Result<&mut MessageContext, WireError> {
        match self.part {
            Some(PacketPart::Message) => {
                self.message = Some(MessageContext::new(self.source.clone(), self.policy));
                self.part = None;
            }
            Some(PacketPart::Header) => return Err(WireError::Blocked),
            None => {
                if self.message.is_none() {
                    return Err(WireError::ContextClosed);
                }
            }
        }
        match &mut self.message {
            Some(message) => Ok(message),
            None => Err(WireError::ContextClosed),
        }
    }

    /// Discard the current part, consuming its bytes. Children are drained.
    pub fn skip(&mut self) -> Result<(), WireError> {
        match self.part {
            Some(PacketPart::Header) => {
                self.source.skip(PACKET_HEADER_LEN)?;
                self.part = Some(PacketPart::Message);
                Ok(())
            }
            Some(PacketPart::Message) => {
                let message = self.message()?;
                message.skip_all()
            }
            None => match self.blocked_by() {
                Some(message) => message.skip_all(),
                None => Err(WireError::ContextClosed),
            },
        }
    }

    /// Drain every remaining part.
    pub fn skip_all(&mut self) -> Result<(), WireError> {
        while !self.is_closed() {
            self.skip()?;
        }
        Ok(())
    }
}

/// The parts of a message, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePart {
    Header,
    Body,
}

/// The body of a message, dispatched on the root element tag.
pub enum MessageBody {
    /// A data modification request, exposed as its own parse context.
    Modification(EntryContext),
    /// A query request. Opaque at the framing layer.
    Query(Bytes),
}

/// Parse context for one message.
pub struct MessageContext {
    source: SharedSource,
    policy: UnknownTagPolicy,
    part: Option<MessagePart>,
    header: Lazy<MessageHeader>,
    body: Option<MessageBody>,
}

impl MessageContext {
    /// Open a context at the start of a message.
    pub fn new(source: SharedSource, policy: UnknownTagPolicy) -> Self {
        Self {
            source,
            policy,
            part: Some(MessagePart::Header),
            header: Lazy::new(),
            body: None,
        }
    }

    /// The part the cursor is on.
    pub fn current(&self) -> Option<MessagePart> {
        self.part
    }

    /// True when the message and any spawned entry context are consumed.
    pub fn is_closed(&self) -> bool {
        self.part.is_none()
            && match &self.body {
                Some(MessageBody::Modification(entry)) => entry.is_closed(),
                _ => true,
            }
    }

    /// The open entry context blocking this one, if any.
    pub fn blocked_by(&mut self) -> Option<&mut EntryContext> {
        match &mut self.body {
            Some(MessageBody::Modification(entry)) if !entry.is_closed() => Some(entry),
            _ => None,
        }
    }

    /// Parse the message header. A failed parse is cached and replayed.
    pub fn header(&mut self) -> Result<&MessageHeader, WireError> {
        if !self.header.is_set() {
            if self.part != Some(MessagePart::Header) {
                return Err(WireError::ContextClosed);
            }
            let source = &mut self.source;
            if self
                .header
                .get_or_try_init(|| MessageHeader::read(source))
                .is_ok()
            {
                self.part = Some(MessagePart::Body);
            }
        }
        match self.header.outcome() {
            Some(result) => result,
            None => Err(WireError::ContextClosed),
        }
    }

    /// Read the message body, dispatching on the root element tag.
    ///
    /// Unknown root tags are skipped or rejected per the configured policy.
    pub fn body(&mut self) -> Result<&mut MessageBody, WireError> {
        match self.part {
            Some(MessagePart::Body) => {
                let body = loop {
                    let (tag, value) = read_element(&mut self.source)?;
                    match tag {
                        t if t == tags::MODIFICATION_REQUEST => {
                            break MessageBody::Modification(EntryContext::new(
                                value,
                                self.policy,
                            ))
                        }
                        t if t == tags::QUERY_REQUEST => break MessageBody::Query(value),
                        other => match self.policy {
                            UnknownTagPolicy::Skip => continue,
                            UnknownTagPolicy::Reject => {
                                return Err(CodecError::UnexpectedTag {
                                    tag: other,
                                    context: tags::ROOT_CONTEXT.name,
                                }
                                .into())
                            }
                        },
                    }
                };
                self.body = Some(body);
                self.part = None;
            }
            Some(MessagePart::Header) => return Err(WireError::Blocked),
            None => {
                if self.body.is_none() {
                    return Err(WireError::ContextClosed);
                }
            }
        }
        match &mut self.body {
            Some(body) => Ok(body),
            None => Err(WireError::ContextClosed),
        }
    }

    /// Discard the current part, consuming its bytes.
    pub fn skip(&mut self) -> Result<(), WireError> {
        match self.part {
            Some(MessagePart::Header) => {
                self.source.skip(MESSAGE_HEADER_LEN)?;
                self.part = Some(MessagePart::Body);
                Ok(())
            }
            Some(MessagePart::Body) => {
                // Mirror body(): unknown root elements before the body are
                // consumed (or rejected) per the policy, then the body
                // element itself is discarded.
                loop {
                    let tag = skip_element(&mut self.source)?;
                    if tag == tags::MODIFICATION_REQUEST || tag == tags::QUERY_REQUEST {
                        break;
                    }
                    match self.policy {
                        UnknownTagPolicy::Skip => continue,
                        UnknownTagPolicy::Reject => {
                            return Err(CodecError::UnexpectedTag {
                                tag,
                                context: tags::ROOT_CONTEXT.name,
                            }
                            .into())
                        }
                    }
                }
                self.part = None;
                Ok(())
            }
            None => match self.blocked_by() {
                Some(entry) => entry.skip_all(),
                None => Err(WireError::ContextClosed),
            },
        }
    }

    /// Drain every remaining part.
    pub fn skip_all(&mut self) -> Result<(), WireError> {
        while !self.is_closed() {
            self.skip()?;
        }
        Ok(())
    }
}

/// The parts of a modification request, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPart {
    Consistency,
    Entry,
}

/// Parse context for a modification request's element tree.
///
/// The whole request element is already in memory; this context walks its
/// two parts and caches their parses.
pub struct EntryContext {
    buf: Bytes,
    pos: usize,
    policy: UnknownTagPolicy,
    part: Option<EntryPart>,
    consistency: Lazy<ConsistencyLevel>,
    entry: Lazy<DataEntry>,
}

impl EntryContext {
    /// Open a context over a `ModificationRequest` element's value bytes.
    pub fn new(value: Bytes, policy: UnknownTagPolicy) -> Self {
        Self {
            buf: value,
            pos: 0,
            policy,
            part: Some(EntryPart::Consistency),
            consistency: Lazy::new(),
            entry: Lazy::new(),
        }
    }

    /// The part the cursor is on.
    pub fn current(&self) -> Option<EntryPart> {
        self.part
    }

    /// True when both parts are consumed.
    pub fn is_closed(&self) -> bool {
        self.part.is_none()
    }

    /// Parse the consistency requirement.
    pub fn consistency(&mut self) -> Result<&ConsistencyLevel, WireError> {
        if !self.consistency.is_set() {
            if self.part != Some(EntryPart::Consistency) {
                return Err(WireError::ContextClosed);
            }
            let buf = &self.buf;
            let pos = &mut self.pos;
            let policy = self.policy;
            let parsed = self
                .consistency
                .get_or_try_init(|| {
                    let mut reader = ElementReader::new(
                        &buf[*pos..],
                        &tags::MODIFICATION_REQUEST_CONTEXT,
                        policy,
                    );
                    let element = reader
                        .next_element()?
                        .filter(|e| e.tag == tags::REQUEST_CONSISTENCY)
                        .ok_or(WireError::MissingElement("RequestConsistency"))?;
                    if element.value.len() != 1 {
                        return Err(CodecError::InvalidValueLength {
                            expected: 1,
                            got: element.value.len(),
                        }
                        .into());
                    }
                    let level = ConsistencyLevel::from_byte(element.value[0] as i8)?;
                    *pos += reader.position();
                    Ok(level)
                })
                .is_ok();
            if parsed {
                self.part = Some(EntryPart::Entry);
            }
        }
        match self.consistency.outcome() {
            Some(result) => result,
            None => Err(WireError::ContextClosed),
        }
    }

    /// Parse the data entry.
    pub fn entry(&mut self) -> Result<&DataEntry, WireError> {
        if !self.entry.is_set() {
            match self.part {
                Some(EntryPart::Entry) => {}
                Some(EntryPart::Consistency) => return Err(WireError::Blocked),
                None => return Err(WireError::ContextClosed),
            }
            let buf = &self.buf;
            let pos = &mut self.pos;
            let policy = self.policy;
            let parsed = self
                .entry
                .get_or_try_init(|| {
                    let mut reader = ElementReader::new(
                        &buf[*pos..],
                        &tags::MODIFICATION_REQUEST_CONTEXT,
                        policy,
                    );
                    let element = reader
                        .next_element()?
                        .filter(|e| e.tag == tags::DATA_ENTRY)
                        .ok_or(WireError::MissingElement("DataEntry"))?;
                    let entry = DataEntry::decode(element.value, policy)?;
                    *pos += reader.position();
                    Ok(entry)
                })
                .is_ok();
            if parsed {
                self.part = None;
            }
        }
        match self.entry.outcome() {
            Some(result) => result,
            None => Err(WireError::ContextClosed),
        }
    }

    /// Discard the current part without parsing its value.
    pub fn skip(&mut self) -> Result<(), WireError> {
        let next = match self.part {
            Some(EntryPart::Consistency) => Some(EntryPart::Entry),
            Some(EntryPart::Entry) => None,
            None => return Err(WireError::ContextClosed),
        };
        self.pos += element_span(&self.buf[self.pos..])?;
        self.part = next;
        Ok(())
    }

    /// Drain every remaining part.
    pub fn skip_all(&mut self) -> Result<(), WireError> {
        while !self.is_closed() {
            self.skip()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{DataEntryBuilder, DataModificationRequest, EntryType, FieldValue};
    use crate::header::PacketHeader;
    use coolbase_core::{BufferSource, Keypair, Version};

    fn sample_request() -> DataModificationRequest {
        let writer = Keypair::from_seed(&[0x11; 32]).unwrap();
        let banker = Keypair::from_seed(&[0x22; 32]).unwrap();
        let entry = DataEntryBuilder::new("inventory", "stock")
            .entry_type(EntryType::Insert)
            .timestamp(1_000)
            .field("sku", FieldValue::new(2, b"A-100".as_slice()))
            .sign(&writer, &banker)
            .unwrap();
        DataModificationRequest {
            consistency: ConsistencyLevel::Quorum,
            entry,
        }
    }

    fn packet_bytes(request: &DataModificationRequest) -> Vec<u8> {
        let version = Version::new(1, 0, 0);
        let mut out = PacketHeader::new(version).encode().to_vec();
        out.extend_from_slice(&MessageHeader::new(version).encode());
        out.extend_from_slice(&request.to_writer().to_bytes().unwrap());
        out
    }

    fn open(bytes: Vec<u8>) -> PacketContext {
        PacketContext::new(
            SharedSource::new(BufferSource::new(bytes)),
            UnknownTagPolicy::Reject,
        )
    }

    #[test]
    fn test_full_parse_walk() {
        let request = sample_request();
        let mut packet = open(packet_bytes(&request));

        assert_eq!(packet.current(), Some(PacketPart::Header));
        assert_eq!(packet.header().unwrap().version, Version::new(1, 0, 0));

        let message = packet.message().unwrap();
        assert_eq!(message.header().unwrap().version, Version::new(1, 0, 0));

        match message.body().unwrap() {
            MessageBody::Modification(entry) => {
                assert_eq!(entry.consistency().unwrap(), &ConsistencyLevel::Quorum);
                assert_eq!(entry.entry().unwrap(), &request.entry);
                assert!(entry.is_closed());
            }
            MessageBody::Query(_) => panic!("expected a modification body"),
        }
        assert!(packet.is_closed());
    }

    #[test]
    fn test_out_of_order_access_is_blocked() {
        let request = sample_request();
        let mut packet = open(packet_bytes(&request));

        // Message before header.
        assert!(matches!(packet.message(), Err(WireError::Blocked)));
        packet.header().unwrap();

        let message = packet.message().unwrap();
        assert!(matches!(message.body(), Err(WireError::Blocked)));
        message.header().unwrap();
        let MessageBody::Modification(entry) = message.body().unwrap() else {
            panic!("expected a modification body");
        };
        assert_eq!(entry.entry().unwrap_err(), WireError::Blocked);
    }

    #[test]
    fn test_header_error_is_sticky() {
        let request = sample_request();
        let mut bytes = packet_bytes(&request);
        bytes[12] ^= 0xFF; // corrupt a CRC-covered version byte
        let mut packet = open(bytes);

        let first = packet.header().unwrap_err();
        assert!(matches!(first, WireError::ChecksumMismatch { .. }));
        // Replay, not a re-read.
        assert_eq!(packet.header().unwrap_err(), first);
        assert!(matches!(packet.message(), Err(WireError::Blocked)));
    }

    #[test]
    fn test_skip_header_then_parse_message() {
        let request = sample_request();
        let mut packet = open(packet_bytes(&request));

        packet.skip().unwrap(); // packet header
        let message = packet.message().unwrap();
        message.header().unwrap();
        let MessageBody::Modification(entry) = message.body().unwrap() else {
            panic!("expected a modification body");
        };
        entry.skip().unwrap(); // consistency
        assert_eq!(entry.entry().unwrap(), &request.entry);
    }

    #[test]
    fn test_skip_all_consumes_everything() {
        let request = sample_request();
        let bytes = packet_bytes(&request);
        let mut trailer = bytes.clone();
        trailer.extend_from_slice(&[0xEE; 4]);

        let source = SharedSource::new(BufferSource::new(trailer));
        let mut packet = PacketContext::new(source.clone(), UnknownTagPolicy::Reject);
        packet.skip_all().unwrap();
        assert!(packet.is_closed());

        // The cursor sits exactly past the packet.
        let mut probe = source;
        assert_eq!(probe.get().unwrap(), 0xEE);
    }

    #[test]
    fn test_skip_consistency_only() {
        let request = sample_request();
        let value = request.to_writer().value_bytes().unwrap();
        let mut entry = EntryContext::new(Bytes::from(value), UnknownTagPolicy::Reject);

        entry.skip().unwrap();
        assert_eq!(entry.current(), Some(EntryPart::Entry));
        assert_eq!(entry.entry().unwrap(), &request.entry);
        assert_eq!(entry.consistency().unwrap_err(), WireError::ContextClosed);
    }

    #[test]
    fn test_closed_context_rejects_everything() {
        let request = sample_request();
        let value = request.to_writer().value_bytes().unwrap();
        let mut entry = EntryContext::new(Bytes::from(value), UnknownTagPolicy::Reject);
        entry.skip_all().unwrap();
        assert!(entry.is_closed());
        assert_eq!(entry.skip().unwrap_err(), WireError::ContextClosed);
        assert_eq!(entry.entry().unwrap_err(), WireError::ContextClosed);
    }

    #[test]
    fn test_query_body_is_opaque() {
        let version = Version::new(1, 0, 0);
        let mut bytes = PacketHeader::new(version).encode().to_vec();
        bytes.extend_from_slice(&MessageHeader::new(version).encode());
        coolbase_codec::encode_element(tags::QUERY_REQUEST, b"select *", &mut bytes);

        let mut packet = open(bytes);
        packet.header().unwrap();
        let message = packet.message().unwrap();
        message.header().unwrap();
        match message.body().unwrap() {
            MessageBody::Query(payload) => assert_eq!(payload.as_ref(), b"select *"),
            MessageBody::Modification(_) => panic!("expected a query body"),
        }
        assert!(packet.is_closed());
    }

    #[test]
    fn test_unknown_root_tag_policy() {
        let version = Version::new(1, 0, 0);
        let mut bytes = PacketHeader::new(version).encode().to_vec();
        bytes.extend_from_slice(&MessageHeader::new(version).encode());
        coolbase_codec::encode_element(Tag(0x77), b"future message", &mut bytes);
        coolbase_codec::encode_element(tags::QUERY_REQUEST, b"q", &mut bytes);

        // Reject: the unknown message kind is an error.
        let mut packet = open(bytes.clone());
        packet.header().unwrap();
        let message = packet.message().unwrap();
        message.header().unwrap();
        assert!(matches!(
            message.body(),
            Err(WireError::Codec(CodecError::UnexpectedTag { .. }))
        ));

        // Skip: the unknown element is consumed and the next one parsed.
        let mut packet = PacketContext::new(
            SharedSource::new(BufferSource::new(bytes)),
            UnknownTagPolicy::Skip,
        );
        packet.header().unwrap();
        let message = packet.message().unwrap();
        message.header().unwrap();
        assert!(matches!(
            message.body().unwrap(),
            MessageBody::Query(payload) if payload.as_ref() == b"q"
        ));
    }

    #[test]
    fn test_skip_body_consumes_unknown_preludes() {
        let version = Version::new(1, 0, 0);
        let mut bytes = PacketHeader::new(version).encode().to_vec();
        bytes.extend_from_slice(&MessageHeader::new(version).encode());
        coolbase_codec::encode_element(Tag(0x79), b"future message", &mut bytes);
        coolbase_codec::encode_element(tags::QUERY_REQUEST, b"q", &mut bytes);
        bytes.push(0xEE); // next packet boundary

        // Skipping the body discards the junk and the body itself, leaving
        // the cursor exactly on the packet boundary.
        let source = SharedSource::new(BufferSource::new(bytes.clone()));
        let mut packet = PacketContext::new(source.clone(), UnknownTagPolicy::Skip);
        packet.skip_all().unwrap();
        assert!(packet.is_closed());
        let mut probe = source;
        assert_eq!(probe.get().unwrap(), 0xEE);

        // Under the strict policy the junk element is an error even when
        // skipping.
        let mut packet = open(bytes);
        packet.skip().unwrap(); // packet header
        let message = packet.message().unwrap();
        message.skip().unwrap(); // message header
        assert!(matches!(
            message.skip(),
            Err(WireError::Codec(CodecError::UnexpectedTag { .. }))
        ));
    }

    #[test]
    fn test_overlong_element_length_fails_on_short_source() {
        let version = Version::new(1, 0, 0);
        let mut bytes = PacketHeader::new(version).encode().to_vec();
        bytes.extend_from_slice(&MessageHeader::new(version).encode());
        // An element claiming 4 GiB backed by a handful of real bytes.
        bytes.extend_from_slice(&[tags::QUERY_REQUEST.0, 0x04, 0xFF, 0xFF, 0xFF, 0xFF]);
        bytes.extend_from_slice(b"short");

        let mut packet = open(bytes);
        packet.header().unwrap();
        let message = packet.message().unwrap();
        message.header().unwrap();
        assert!(matches!(message.body(), Err(WireError::Io(_))));
    }
}
