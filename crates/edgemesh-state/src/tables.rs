use redb::TableDefinition;

/// Single-row snapshot tables, keyed by a constant string since each holds
/// at most one live value (the latest of its kind). Kept as full tables
/// rather than bespoke files so `StateStore` has one open/txn discipline.
pub const TOPOLOGY: TableDefinition<&str, &[u8]> = TableDefinition::new("topology");
pub const APPLICATION: TableDefinition<&str, &[u8]> = TableDefinition::new("application");
pub const PLACEMENT: TableDefinition<&str, &[u8]> = TableDefinition::new("placement");
pub const INVOCATION_PATH: TableDefinition<&str, &[u8]> = TableDefinition::new("invocation_path");
pub const ROUND: TableDefinition<&str, &[u8]> = TableDefinition::new("round");

/// The single key used in each snapshot table.
pub const CURRENT: &str = "current";
