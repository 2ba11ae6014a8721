use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::collection::{Category, Organization};
use super::group::Subcategory;
use super::webpage::Webpage;

/// Version of the backup document layout this build reads and writes.
pub const SCHEMA_VERSION: u32 = 1;

/// Whole-dataset backup/export document.
///
/// `orders` is keyed by group id and restores exact per-group display order,
/// not just membership. The legacy single global order list travels in its
/// own field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportDocument {
    pub schema_version: u32,
    pub organizations: Vec<Organization>,
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
    pub webpages: Vec<Webpage>,
    pub orders: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_order: Option<Vec<String>>,
}
