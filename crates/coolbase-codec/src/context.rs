//! Hierarchical type contexts.
//!
//! A type context names a container and lists the tags that may appear
//! directly beneath it. Contexts form a static tree anchored at the
//! protocol's root context; the protocol layer declares the tree, the
//! element reader enforces it.

use crate::element::Tag;

/// How the reader handles a tag the active context does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTagPolicy {
    /// Skip the whole element silently.
    #[default]
    Skip,
    /// Fail the decode.
    Reject,
}

/// One legal child tag within a [`TypeContext`].
#[derive(Debug)]
pub struct TagRule {
    /// The tag code.
    pub tag: Tag,
    /// Human-readable element name, used in errors and traces.
    pub name: &'static str,
    /// The sub-context for container elements; `None` marks a leaf.
    pub child: Option<&'static TypeContext>,
}

impl TagRule {
    /// Declare a leaf element.
    pub const fn leaf(tag: Tag, name: &'static str) -> Self {
        Self {
            tag,
            name,
            child: None,
        }
    }

    /// Declare a container element with its sub-context.
    pub const fn container(tag: Tag, name: &'static str, child: &'static TypeContext) -> Self {
        Self {
            tag,
            name,
            child: Some(child),
        }
    }

    /// True if this rule declares a container.
    pub fn is_container(&self) -> bool {
        self.child.is_some()
    }
}

/// A node in the type-context tree.
#[derive(Debug)]
pub struct TypeContext {
    /// Context name, used in errors and traces.
    pub name: &'static str,
    /// The tags legal directly beneath this context.
    pub rules: &'static [TagRule],
}

impl TypeContext {
    /// Look up the rule for a tag, if declared.
    pub fn rule_for(&self, tag: Tag) -> Option<&'static TagRule> {
        self.rules.iter().find(|rule| rule.tag == tag)
    }

    /// True if the tag is legal in this context.
    pub fn allows(&self, tag: Tag) -> bool {
        self.rule_for(tag).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static INNER: TypeContext = TypeContext {
        name: "inner",
        rules: &[TagRule::leaf(Tag(0x02), "leaf")],
    };

    static ROOT: TypeContext = TypeContext {
        name: "root",
        rules: &[
            TagRule::container(Tag(0x01), "inner", &INNER),
            TagRule::leaf(Tag(0x03), "flag"),
        ],
    };

    #[test]
    fn test_rule_lookup() {
        assert!(ROOT.allows(Tag(0x01)));
        assert!(ROOT.allows(Tag(0x03)));
        assert!(!ROOT.allows(Tag(0x02)));

        let rule = ROOT.rule_for(Tag(0x01)).unwrap();
        assert!(rule.is_container());
        assert_eq!(rule.child.unwrap().name, "inner");
        assert!(!ROOT.rule_for(Tag(0x03)).unwrap().is_container());
    }
}
