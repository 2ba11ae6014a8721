use serde::{Deserialize, Serialize};

/// A named ordered bucket of cards within exactly one collection.
///
/// Groups are hard-deleted; the cascade (reassign member cards or delete
/// them outright) is decided by the caller at deletion time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subcategory {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fallback name applied when a group is renamed to an empty string.
pub const DEFAULT_GROUP_NAME: &str = "group";
