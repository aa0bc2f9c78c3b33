//! Element framing: tag ‖ length ‖ value.
//!
//! The length is a prefix byte `n` (0..=4) followed by `n` big-endian length
//! bytes; `n = 0` means an empty value. The reader walks a length-delimited
//! slice handed over by the framing layer; it never touches the conversation
//! cursor.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::{TypeContext, UnknownTagPolicy};
use crate::error::CodecError;

/// Maximum number of length bytes.
const MAX_LENGTH_BYTES: u8 = 4;

/// A one-byte element tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(pub u8);

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag(0x{:02X})", self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Encode an element header (tag and length) into `out`.
pub fn encode_header(tag: Tag, value_len: usize, out: &mut Vec<u8>) {
    out.push(tag.0);
    if value_len == 0 {
        out.push(0);
        return;
    }
    let len_bytes = (value_len as u32).to_be_bytes();
    let skip = len_bytes.iter().take_while(|&&b| b == 0).count();
    out.push((4 - skip) as u8);
    out.extend_from_slice(&len_bytes[skip..]);
}

/// Encode a whole element: header followed by the value bytes.
pub fn encode_element(tag: Tag, value: &[u8], out: &mut Vec<u8>) {
    encode_header(tag, value.len(), out);
    out.extend_from_slice(value);
}

/// A decoded element: its tag and a borrowed view of its value bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawElement<'a> {
    pub tag: Tag,
    pub value: &'a [u8],
}

/// Cursor over the elements of one container's value bytes.
///
/// Tags are validated against the active [`TypeContext`]; unknown tags are
/// skipped or rejected per the configured [`UnknownTagPolicy`].
pub struct ElementReader<'a> {
    buf: &'a [u8],
    pos: usize,
    context: &'static TypeContext,
    policy: UnknownTagPolicy,
}

impl<'a> ElementReader<'a> {
    /// Create a reader over a container's value bytes.
    pub fn new(buf: &'a [u8], context: &'static TypeContext, policy: UnknownTagPolicy) -> Self {
        Self {
            buf,
            pos: 0,
            context,
            policy,
        }
    }

    /// The active type context.
    pub fn context(&self) -> &'static TypeContext {
        self.context
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// True when the container is fully consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Peek the next element's tag without consuming anything.
    pub fn peek_tag(&self) -> Option<Tag> {
        self.buf.get(self.pos).map(|&b| Tag(b))
    }

    /// Decode the next element, applying the unknown-tag policy.
    ///
    /// Returns `None` at the end of the container.
    pub fn next_element(&mut self) -> Result<Option<RawElement<'a>>, CodecError> {
        loop {
            if self.is_empty() {
                return Ok(None);
            }
            let element = self.read_raw()?;
            if self.context.allows(element.tag) {
                return Ok(Some(element));
            }
            match self.policy {
                UnknownTagPolicy::Skip => continue,
                UnknownTagPolicy::Reject => {
                    return Err(CodecError::UnexpectedTag {
                        tag: element.tag,
                        context: self.context.name,
                    })
                }
            }
        }
    }

    /// Enter a container element, yielding a reader over its children.
    ///
    /// Fails if the element's tag is not declared as a container in the
    /// active context.
    pub fn enter(&self, element: &RawElement<'a>) -> Result<ElementReader<'a>, CodecError> {
        let rule = self
            .context
            .rule_for(element.tag)
            .filter(|rule| rule.is_container())
            .ok_or(CodecError::UnexpectedTag {
                tag: element.tag,
                context: self.context.name,
            })?;
        let child = rule.child.ok_or(CodecError::UnexpectedTag {
            tag: element.tag,
            context: self.context.name,
        })?;
        Ok(ElementReader::new(element.value, child, self.policy))
    }

    fn read_raw(&mut self) -> Result<RawElement<'a>, CodecError> {
        let tag = Tag(self.take(1)?[0]);
        let len_prefix = self.take(1)?[0];
        if len_prefix > MAX_LENGTH_BYTES {
            return Err(CodecError::InvalidLengthPrefix(len_prefix));
        }
        let mut length = 0u64;
        for &byte in self.take(len_prefix as usize)? {
            length = (length << 8) | u64::from(byte);
        }
        if length > self.remaining() as u64 {
            return Err(CodecError::LengthOverflow(length));
        }
        let value = self.take(length as usize)?;
        Ok(RawElement { tag, value })
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}
