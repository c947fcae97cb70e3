//! redb table definitions.

use redb::TableDefinition;

/// Flat key-value table; values are JSON documents.
pub const KV: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");
