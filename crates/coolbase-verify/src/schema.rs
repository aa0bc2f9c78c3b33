//! The schema catalog: which tables exist, who may write them, and how many
//! replicas hold them.

use std::collections::HashMap;

use coolbase_core::Address;

/// Answers schema questions for the verifier.
///
/// Implementations are expected to be cheap lookups; the verifier queries
/// the catalog once per entry.
pub trait SchemaCatalog: Send + Sync {
    /// True if the table exists.
    fn table_exists(&self, tablespace: &str, table: &str) -> bool;

    /// True if `writer` may modify the table.
    fn is_authorized_writer(&self, tablespace: &str, table: &str, writer: &Address) -> bool;

    /// Number of replicas configured for the table.
    fn replica_count(&self, tablespace: &str, table: &str) -> usize;
}

#[derive(Debug, Clone)]
struct TableEntry {
    writers: Vec<Address>,
    replicas: usize,
}

/// An in-memory catalog, keyed by `(tablespace, table)`.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    tables: HashMap<(String, String), TableEntry>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table with its authorized writers and replica count.
    pub fn table(
        mut self,
        tablespace: impl Into<String>,
        table: impl Into<String>,
        writers: Vec<Address>,
        replicas: usize,
    ) -> Self {
        self.tables.insert(
            (tablespace.into(), table.into()),
            TableEntry { writers, replicas },
        );
        self
    }

    fn entry(&self, tablespace: &str, table: &str) -> Option<&TableEntry> {
        self.tables
            .get(&(tablespace.to_string(), table.to_string()))
    }
}

impl SchemaCatalog for StaticSchema {
    fn table_exists(&self, tablespace: &str, table: &str) -> bool {
        self.entry(tablespace, table).is_some()
    }

    fn is_authorized_writer(&self, tablespace: &str, table: &str, writer: &Address) -> bool {
        self.entry(tablespace, table)
            .is_some_and(|entry| entry.writers.contains(writer))
    }

    fn replica_count(&self, tablespace: &str, table: &str) -> usize {
        self.entry(tablespace, table)
            .map_or(0, |entry| entry.replicas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_schema_lookups() {
        let alice = Address::from_bytes([0xAA; 20]);
        let bob = Address::from_bytes([0xBB; 20]);
        let schema = StaticSchema::new().table("hr", "people", vec![alice], 5);

        assert!(schema.table_exists("hr", "people"));
        assert!(!schema.table_exists("hr", "salaries"));
        assert!(schema.is_authorized_writer("hr", "people", &alice));
        assert!(!schema.is_authorized_writer("hr", "people", &bob));
        assert_eq!(schema.replica_count("hr", "people"), 5);
        assert_eq!(schema.replica_count("hr", "salaries"), 0);
    }
}
