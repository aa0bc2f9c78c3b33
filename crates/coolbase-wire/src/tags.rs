//! The protocol's element tag tree.
//!
//! Tags are scoped to their enclosing container: a code is only meaningful
//! relative to the active type context. The tree below is the single source
//! of truth for which elements may appear where.

use coolbase_codec::{Tag, TagRule, TypeContext};

// Root level
pub const MODIFICATION_REQUEST: Tag = Tag(0x10);
pub const QUERY_REQUEST: Tag = Tag(0x50);

// ModificationRequest
pub const REQUEST_CONSISTENCY: Tag = Tag(0x11);
pub const DATA_ENTRY: Tag = Tag(0x20);

// DataEntry
pub const ENTRY_HEADER: Tag = Tag(0x21);
pub const HEADER_SIGNATURE: Tag = Tag(0x28);
pub const CHEQUE: Tag = Tag(0x30);
pub const CHEQUES_SIGNATURE: Tag = Tag(0x36);
pub const ENTRY_FIELD: Tag = Tag(0x40);

// EntryHeader
pub const TABLESPACE_NAME: Tag = Tag(0x22);
pub const TABLE_NAME: Tag = Tag(0x23);
pub const ENTRY_VERSION: Tag = Tag(0x24);
pub const ENTRY_TYPE: Tag = Tag(0x25);
pub const TIMESTAMP: Tag = Tag(0x26);
pub const FIELDS_HASH: Tag = Tag(0x27);

// Cheque
pub const CHEQUE_TIMESTAMP: Tag = Tag(0x31);
pub const CHEQUE_RANGE: Tag = Tag(0x32);
pub const CHEQUE_NUMBER: Tag = Tag(0x33);
pub const CHEQUE_AMOUNT: Tag = Tag(0x34);
pub const RECEIPT_NODE: Tag = Tag(0x35);

// EntryField
pub const FIELD_NAME: Tag = Tag(0x41);
pub const FIELD_VALUE: Tag = Tag(0x42);
pub const FIELD_HASH: Tag = Tag(0x45);

// FieldValue
pub const VALUE_TYPE: Tag = Tag(0x43);
pub const VALUE_DATA: Tag = Tag(0x44);

pub static FIELD_VALUE_CONTEXT: TypeContext = TypeContext {
    name: "FieldValue",
    rules: &[
        TagRule::leaf(VALUE_TYPE, "ValueType"),
        TagRule::leaf(VALUE_DATA, "ValueData"),
    ],
};

pub static ENTRY_FIELD_CONTEXT: TypeContext = TypeContext {
    name: "EntryField",
    rules: &[
        TagRule::leaf(FIELD_NAME, "FieldName"),
        TagRule::container(FIELD_VALUE, "FieldValue", &FIELD_VALUE_CONTEXT),
        TagRule::leaf(FIELD_HASH, "FieldHash"),
    ],
};

pub static CHEQUE_CONTEXT: TypeContext = TypeContext {
    name: "Cheque",
    rules: &[
        TagRule::leaf(CHEQUE_TIMESTAMP, "ChequeTimestamp"),
        TagRule::leaf(CHEQUE_RANGE, "ChequeRange"),
        TagRule::leaf(CHEQUE_NUMBER, "ChequeNumber"),
        TagRule::leaf(CHEQUE_AMOUNT, "ChequeAmount"),
        TagRule::leaf(RECEIPT_NODE, "ReceiptNode"),
    ],
};

pub static ENTRY_HEADER_CONTEXT: TypeContext = TypeContext {
    name: "EntryHeader",
    rules: &[
        TagRule::leaf(TABLESPACE_NAME, "TablespaceName"),
        TagRule::leaf(TABLE_NAME, "TableName"),
        TagRule::leaf(ENTRY_VERSION, "EntryVersion"),
        TagRule::leaf(ENTRY_TYPE, "EntryType"),
        TagRule::leaf(TIMESTAMP, "Timestamp"),
        TagRule::leaf(FIELDS_HASH, "FieldsHash"),
    ],
};

pub static DATA_ENTRY_CONTEXT: TypeContext = TypeContext {
    name: "DataEntry",
    rules: &[
        TagRule::container(ENTRY_HEADER, "EntryHeader", &ENTRY_HEADER_CONTEXT),
        TagRule::leaf(HEADER_SIGNATURE, "HeaderSignature"),
        TagRule::container(CHEQUE, "Cheque", &CHEQUE_CONTEXT),
        TagRule::leaf(CHEQUES_SIGNATURE, "ChequesSignature"),
        TagRule::container(ENTRY_FIELD, "EntryField", &ENTRY_FIELD_CONTEXT),
    ],
};

pub static MODIFICATION_REQUEST_CONTEXT: TypeContext = TypeContext {
    name: "ModificationRequest",
    rules: &[
        TagRule::leaf(REQUEST_CONSISTENCY, "RequestConsistency"),
        TagRule::container(DATA_ENTRY, "DataEntry", &DATA_ENTRY_CONTEXT),
    ],
};

pub static QUERY_REQUEST_CONTEXT: TypeContext = TypeContext {
    name: "QueryRequest",
    // Query payloads are opaque at the framing layer.
    rules: &[],
};

pub static ROOT_CONTEXT: TypeContext = TypeContext {
    name: "Root",
    rules: &[
        TagRule::container(
            MODIFICATION_REQUEST,
            "ModificationRequest",
            &MODIFICATION_REQUEST_CONTEXT,
        ),
        TagRule::container(QUERY_REQUEST, "QueryRequest", &QUERY_REQUEST_CONTEXT),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_scoping() {
        // The same structural role uses different codes per context; a code
        // is only legal where declared.
        assert!(ROOT_CONTEXT.allows(MODIFICATION_REQUEST));
        assert!(!ROOT_CONTEXT.allows(DATA_ENTRY));
        assert!(MODIFICATION_REQUEST_CONTEXT.allows(DATA_ENTRY));
        assert!(!DATA_ENTRY_CONTEXT.allows(REQUEST_CONSISTENCY));
        assert!(ENTRY_HEADER_CONTEXT.allows(FIELDS_HASH));
        assert!(!ENTRY_HEADER_CONTEXT.allows(FIELD_HASH));
    }

    #[test]
    fn test_container_links() {
        let rule = DATA_ENTRY_CONTEXT.rule_for(ENTRY_FIELD).unwrap();
        assert_eq!(rule.child.unwrap().name, "EntryField");
        let rule = ENTRY_FIELD_CONTEXT.rule_for(FIELD_VALUE).unwrap();
        assert_eq!(rule.child.unwrap().name, "FieldValue");
    }
}
