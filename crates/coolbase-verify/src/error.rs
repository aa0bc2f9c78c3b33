//! Error types for entry verification.

use thiserror::Error;

use coolbase_core::{Address, EntryKey};
use coolbase_wire::WireError;

/// Why an entry was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The target table is not in the schema catalog.
    #[error("unknown table {tablespace}.{table}")]
    UnknownTable { tablespace: String, table: String },

    /// A field's carried hash does not match its name and value.
    #[error("field hash mismatch on field {0:?}")]
    FieldHashMismatch(String),

    /// The fields trie root does not match the signed fields hash.
    #[error("fields hash does not cover the carried fields")]
    FieldsRootMismatch,

    /// The header signer is not an authorized writer for the table.
    #[error("unauthorized writer {0}")]
    UnauthorizedWriter(Address),

    /// The entry carries no storage cheques.
    #[error("entry carries no cheques")]
    MissingCheques,

    /// A cheque names a range no storage node serves for this table.
    #[error("cheque range {} is not served for this table", .0.to_hex())]
    ImplausibleChequeRange(EntryKey),

    /// A cheque carries no receipt nodes.
    #[error("cheque {0} has an empty receipt list")]
    EmptyReceiptList(u64),

    #[error(transparent)]
    Wire(#[from] WireError),
}
