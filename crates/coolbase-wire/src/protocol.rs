//! Protocol handlers and version negotiation.
//!
//! A receiver registers one handler per protocol version it speaks. On a new
//! conversation the registry peeks the packet header (consuming nothing) and
//! hands the conversation to the newest handler whose version matches the
//! peer's at minor granularity; maintenance releases are wire compatible by
//! definition.

use coolbase_codec::{ElementWriter, UnknownTagPolicy};
use coolbase_core::{ByteSink, ByteSource, SharedSource, Version, VersionGranularity};

use crate::context::PacketContext;
use crate::error::WireError;
use crate::header::{MessageHeader, PacketHeader};

/// A handler for one protocol version.
pub trait Protocol: Send + Sync {
    /// The version this handler speaks.
    fn version(&self) -> Version;

    /// Sniff a conversation's leading bytes without consuming them.
    ///
    /// Magic and checksum failures propagate: they are fatal for the
    /// conversation no matter which handler would have taken it.
    fn accepts(&self, source: &mut dyn ByteSource) -> Result<bool, WireError> {
        let header = PacketHeader::peek(source)?;
        Ok(header
            .version
            .matches(&self.version(), VersionGranularity::Minor))
    }

    /// Open a packet context over the conversation.
    fn open(&self, source: SharedSource) -> PacketContext;
}

/// The standard protocol handler.
pub struct StandardProtocol {
    version: Version,
    policy: UnknownTagPolicy,
}

impl StandardProtocol {
    /// A handler for `version` that skips unknown tags (the forward
    /// compatible default).
    pub fn new(version: Version) -> Self {
        Self {
            version,
            policy: UnknownTagPolicy::Skip,
        }
    }

    /// Override the unknown-tag policy.
    pub fn with_policy(mut self, policy: UnknownTagPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Protocol for StandardProtocol {
    fn version(&self) -> Version {
        self.version
    }

    fn open(&self, source: SharedSource) -> PacketContext {
        PacketContext::new(source, self.policy)
    }
}

/// Registered protocol handlers, newest version first.
#[derive(Default)]
pub struct ProtocolRegistry {
    protocols: Vec<Box<dyn Protocol>>,
}

impl ProtocolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, keeping the newest-first order.
    pub fn register(&mut self, protocol: Box<dyn Protocol>) -> &mut Self {
        self.protocols.push(protocol);
        self.protocols
            .sort_by(|a, b| b.version().cmp(&a.version()));
        self
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    /// True when no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    /// Pick the handler for a conversation by peeking its packet header.
    ///
    /// The newest handler matching the peer's version at minor granularity
    /// wins. Nothing is consumed either way.
    pub fn negotiate(&self, source: &mut dyn ByteSource) -> Result<&dyn Protocol, WireError> {
        let header = PacketHeader::peek(source)?;
        for protocol in &self.protocols {
            if header
                .version
                .matches(&protocol.version(), VersionGranularity::Minor)
            {
                tracing::debug!(
                    peer = %header.version,
                    handler = %protocol.version(),
                    "negotiated protocol"
                );
                return Ok(protocol.as_ref());
            }
        }
        tracing::debug!(peer = %header.version, "no handler for peer version");
        Err(WireError::UnsupportedVersion(header.version))
    }
}

/// Encode a complete packet: packet header, message header, message element.
pub fn write_packet(
    sink: &mut dyn ByteSink,
    version: Version,
    message: &mut ElementWriter,
) -> Result<(), WireError> {
    sink.write(&PacketHeader::new(version).encode())?;
    sink.write(&MessageHeader::new(version).encode())?;
    message.write_to(sink)?;
    Ok(())
}
