//! The entry verification pipeline.

use coolbase_core::Address;
use coolbase_wire::{fields_root_hash, DataModificationRequest};

use crate::error::VerifyError;
use crate::routing::Routing;
use crate::schema::SchemaCatalog;

/// The outcome of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedEntry {
    /// The recovered header signer.
    pub writer: Address,
    /// The recovered cheques signer.
    pub cheque_signer: Address,
    /// Acknowledgements the request's consistency level demands from the
    /// table's replica set.
    pub required_acks: usize,
}

/// Verifies modification requests against a schema catalog and routing
/// table before any storage work is committed.
pub struct EntryVerifier<S, R> {
    schema: S,
    routing: R,
}

impl<S: SchemaCatalog, R: Routing> EntryVerifier<S, R> {
    pub fn new(schema: S, routing: R) -> Self {
        Self { schema, routing }
    }

    /// Run the full pipeline over a request.
    ///
    /// 1. The table must exist and every field must be covered by the
    ///    signed fields hash.
    /// 2. The header signature must recover to an authorized writer.
    /// 3. The cheque list must be non-empty, signed, and name only ranges
    ///    the routing table serves, each with at least one receipt node.
    /// 4. The consistency level resolves against the table's replica count.
    pub fn verify(&self, request: &DataModificationRequest) -> Result<VerifiedEntry, VerifyError> {
        let entry = &request.entry;
        let header = &entry.header;

        if !self.schema.table_exists(&header.tablespace, &header.table) {
            return Err(VerifyError::UnknownTable {
                tablespace: header.tablespace.clone(),
                table: header.table.clone(),
            });
        }

        for field in &entry.fields {
            if !field.verify_hash() {
                tracing::warn!(field = %field.name, "field hash mismatch");
                return Err(VerifyError::FieldHashMismatch(field.name.clone()));
            }
        }
        if fields_root_hash(&entry.fields) != header.fields_hash {
            tracing::warn!(
                table = %header.table,
                "fields trie root does not match the signed fields hash"
            );
            return Err(VerifyError::FieldsRootMismatch);
        }

        let writer = entry.header_signer()?;
        if !self
            .schema
            .is_authorized_writer(&header.tablespace, &header.table, &writer)
        {
            tracing::warn!(writer = %writer, table = %header.table, "unauthorized writer");
            return Err(VerifyError::UnauthorizedWriter(writer));
        }

        if entry.cheques.is_empty() {
            return Err(VerifyError::MissingCheques);
        }
        let cheque_signer = entry.cheques_signer()?;
        for cheque in &entry.cheques {
            if cheque.receipt_nodes.is_empty() {
                return Err(VerifyError::EmptyReceiptList(cheque.number));
            }
            if !self
                .routing
                .serves_range(&header.tablespace, &header.table, &cheque.range)
            {
                tracing::warn!(
                    range = %cheque.range.to_hex(),
                    table = %header.table,
                    "cheque names an unserved range"
                );
                return Err(VerifyError::ImplausibleChequeRange(cheque.range));
            }
        }

        let replicas = self.schema.replica_count(&header.tablespace, &header.table);
        let required_acks = request.consistency.required_acks(replicas);

        tracing::debug!(
            writer = %writer,
            cheque_signer = %cheque_signer,
            required_acks,
            table = %header.table,
            "entry verified"
        );
        Ok(VerifiedEntry {
            writer,
            cheque_signer,
            required_acks,
        })
    }
}
