use serde::{Deserialize, Serialize};

/// The atomic item representing a saved tab/link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Webpage {
    pub id: String,
    /// Canonical absolute http(s) URL.
    pub url: String,
    pub title: String,
    pub favicon: Option<String>,
    pub note: String,
    /// Owning collection.
    pub category_id: String,
    /// Owning group, if the card has been placed in one.
    pub subcategory_id: Option<String>,
    /// Open string-keyed map for template fields.
    pub meta: serde_json::Map<String, serde_json::Value>,
    /// Natural store order. Creation prepends (smaller is earlier); display
    /// order comes from the ordering engine, never from this field alone.
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Webpage {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for creating a card from a browser tab or an import row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebpageDraft {
    pub url: String,
    pub title: Option<String>,
    pub favicon: Option<String>,
    pub note: Option<String>,
    pub category_id: String,
    pub subcategory_id: Option<String>,
}

/// Partial update for an existing card. `None` fields are left untouched.
///
/// `favicon` and `subcategory_id` are doubly optional so a patch can clear
/// them (`Some(None)`) as well as set them.
#[derive(Debug, Clone, Default)]
pub struct WebpagePatch {
    pub url: Option<String>,
    pub title: Option<String>,
    pub favicon: Option<Option<String>>,
    pub note: Option<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<Option<String>>,
    pub meta: Option<serde_json::Map<String, serde_json::Value>>,
}

impl WebpagePatch {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.title.is_none()
            && self.favicon.is_none()
            && self.note.is_none()
            && self.category_id.is_none()
            && self.subcategory_id.is_none()
            && self.meta.is_none()
    }
}

/// Title used when neither the tab title nor the URL host yields one.
pub const UNTITLED: &str = "Untitled";
