//! Deferred element writing.
//!
//! An [`ElementWriter`] is a write graph built ahead of serialization. Leaf
//! nodes hold their bytes; lazy nodes hold a thunk that is run at most once,
//! on first serialization, and memoized, so a graph can be assembled before
//! every value is known (a length-prefixed field whose content depends on
//! later computation, for instance). Containers serialize their children
//! into their own value bytes, which gives them their length.

use coolbase_core::ByteSink;

use crate::element::{encode_header, Tag};
use crate::error::CodecError;

type Thunk = Box<dyn FnOnce() -> Result<Vec<u8>, CodecError> + Send>;

enum Payload {
    Leaf(Vec<u8>),
    Lazy(Option<Thunk>, Option<Result<Vec<u8>, CodecError>>),
    Container(Vec<ElementWriter>),
}

/// One node of a write graph.
pub struct ElementWriter {
    tag: Tag,
    payload: Payload,
}

impl ElementWriter {
    /// A leaf element with known bytes.
    pub fn leaf(tag: Tag, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            payload: Payload::Leaf(value.into()),
        }
    }

    /// A leaf element whose bytes are computed on first serialization and
    /// memoized.
    pub fn lazy(
        tag: Tag,
        thunk: impl FnOnce() -> Result<Vec<u8>, CodecError> + Send + 'static,
    ) -> Self {
        Self {
            tag,
            payload: Payload::Lazy(Some(Box::new(thunk)), None),
        }
    }

    /// An empty container element.
    pub fn container(tag: Tag) -> Self {
        Self {
            tag,
            payload: Payload::Container(Vec::new()),
        }
    }

    /// Append a child to a container. No-op on leaves (a programming error
    /// surfaced by the child simply not appearing is avoided by the
    /// debug assertion).
    pub fn push(&mut self, child: ElementWriter) -> &mut Self {
        match &mut self.payload {
            Payload::Container(children) => children.push(child),
            _ => debug_assert!(false, "push on a leaf element"),
        }
        self
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, child: ElementWriter) -> Self {
        self.push(child);
        self
    }

    /// The element's tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Materialize this element's value bytes (not including its header).
    ///
    /// Lazy nodes run their thunk on the first call and replay the memoized
    /// outcome afterwards; a failed thunk is sticky.
    pub fn value_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        match &mut self.payload {
            Payload::Leaf(bytes) => Ok(bytes.clone()),
            Payload::Lazy(thunk, memo) => {
                if memo.is_none() {
                    let outcome = match thunk.take() {
                        Some(f) => f(),
                        None => Ok(Vec::new()),
                    };
                    *memo = Some(outcome);
                }
                memo.clone().unwrap_or(Ok(Vec::new()))
            }
            Payload::Container(children) => {
                let mut out = Vec::new();
                for child in children {
                    child.encode_into(&mut out)?;
                }
                Ok(out)
            }
        }
    }

    /// Encode this element (header and value) into a buffer.
    pub fn encode_into(&mut self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let value = self.value_bytes()?;
        encode_header(self.tag, value.len(), out);
        out.extend_from_slice(&value);
        Ok(())
    }

    /// Encode this element into a byte sink.
    pub fn write_to(&mut self, sink: &mut dyn ByteSink) -> Result<(), CodecError> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        sink.write(&out)?;
        Ok(())
    }

    /// Encode this element to a fresh byte vector.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }
}
