//! Migration of legacy item records into the current nested layout.

mod legacy;

pub use legacy::{transform_legacy, LegacyAttack, LegacyCritical, LegacyDamage, LegacyItemRecord};

use serde_json::Value;

/// The current-schema records produced from one legacy item. Both values
/// have already been validated against their schemas.
#[derive(Debug, Clone, PartialEq)]
pub struct MigratedRecord {
    pub item: Value,
    pub activity: Option<Value>,
}
