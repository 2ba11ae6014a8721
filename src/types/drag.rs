use serde::{Deserialize, Serialize};

/// MIME type carrying a JSON-serialized [`TabPayload`] for new-tab drags.
pub const MIME_TAB: &str = "application/x-linktrove-tab";
/// MIME type carrying a bare card id string for existing-card drags.
pub const MIME_CARD: &str = "application/x-linktrove-card";
/// MIME type carrying a JSON-serialized [`NativeGroupPayload`].
pub const MIME_TAB_GROUP: &str = "application/x-linktrove-tabgroup";

/// Descriptor of a live browser tab being dragged into a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabPayload {
    pub url: String,
    pub title: Option<String>,
    pub favicon: Option<String>,
    /// Host-side tab id, when the drag originated from a native tab strip.
    pub tab_id: Option<i64>,
}

/// Descriptor of a native browser tab group being dragged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NativeGroupPayload {
    pub group_id: i64,
    pub title: Option<String>,
}

/// What is being dragged. One variant per MIME payload kind.
#[derive(Debug, Clone, PartialEq)]
pub enum DragSource {
    /// A card already stored in the engine, referenced by id.
    ExistingCard { id: String },
    /// A live browser tab not yet saved as a card.
    NewTab { payload: TabPayload },
    /// A native browser tab; the browser owns its position.
    NativeTab { tab_id: i64 },
    /// A native browser tab group.
    NativeTabGroup { group_id: i64 },
}

/// Insertion point within the target group's order list.
#[derive(Debug, Clone, PartialEq)]
pub enum DropPosition {
    /// Insert immediately before the referenced card.
    Before(String),
    /// Append at the end of the group.
    AtEnd,
}

/// A resolved drop surface: the group receiving the drop and where in it.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTarget {
    pub category_id: String,
    pub group_id: String,
    pub position: DropPosition,
}

/// Axis-aligned bounding box of a rendered card or group cell, in the
/// coordinate space of the pointer events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}
