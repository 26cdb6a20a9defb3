//! redb table definitions.

use redb::TableDefinition;

/// Claim markers keyed by `/apps/{app_guid}/{instance_guid}`.
pub const CLAIMS: TableDefinition<&str, &[u8]> = TableDefinition::new("claims");
