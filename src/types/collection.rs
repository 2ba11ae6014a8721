use serde::{Deserialize, Serialize};

/// Top-level namespace grouping collections.
///
/// Organizations are soft-deleted only; a tombstoned row is never removed
/// while collections still reference it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub position: i64,
    pub deleted_at: Option<i64>,
}

/// A named bucket of groups, scoped to one organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub color: String,
    /// Sort key within the organization. Float so a collection can be
    /// placed between two neighbors without renumbering the rest.
    pub position: f64,
    pub default_template_id: Option<String>,
    pub is_default: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Organization {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Category {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
