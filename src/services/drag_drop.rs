//! Drag-and-drop mutation protocol for LinkTrove.
//!
//! A drag gesture is a short-lived session, not a persisted entity:
//! `Idle → Dragging(source) → Targeting(source, target) → commit/cancel →
//! Idle`. The controller owns the session explicitly — there is no ambient
//! module-level "current drag" — and the commit path is serialized so a
//! second drop cannot interleave with one that is still mutating the store.
//!
//! Insertion points are computed from pointer geometry by the pure helpers
//! at the bottom of this module; the host UI feeds them element bounding
//! boxes and gets back a [`DropPosition`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::database::{Database, TransactionMode};
use crate::managers::ordering_engine::{OrderScope, OrderingEngine};
use crate::managers::webpage_manager::{WebpageManager, WebpageManagerTrait};
use crate::types::drag::{
    DragSource, DropPosition, DropTarget, NativeGroupPayload, Rect, TabPayload, MIME_CARD,
    MIME_TAB, MIME_TAB_GROUP,
};
use crate::types::errors::DragError;
use crate::types::webpage::{Webpage, WebpageDraft};

/// Side effects for native browser tab/group drops. The browser is the
/// source of truth for native tab positions; the engine only issues the
/// movement request and flags a refresh.
pub trait BrowserTabHost: Send + Sync {
    fn move_tab(&self, tab_id: i64, target_group: &str) -> Result<(), String>;
    fn move_tab_group(&self, group_id: i64, target_group: &str) -> Result<(), String>;
}

/// Current phase of the drag session.
#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { source: DragSource },
    Targeting { source: DragSource, target: DropTarget },
}

/// What a committed drop did.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    CreatedCard(Webpage),
    MovedCard { id: String, group_id: String },
    NativeTabMoved { tab_id: i64 },
    NativeGroupMoved { group_id: i64 },
    /// Self-drop, vanished card, double-fired drop, or drop with no target.
    NoOp,
}

/// Drag session controller coordinating stores and the ordering engine.
pub struct DragDropController {
    db: Arc<Database>,
    state: Mutex<DragState>,
    commit_lock: tokio::sync::Mutex<()>,
    host: Option<Arc<dyn BrowserTabHost>>,
    needs_refresh: AtomicBool,
}

impl DragDropController {
    /// Returns the current UNIX timestamp in seconds.
    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            state: Mutex::new(DragState::Idle),
            commit_lock: tokio::sync::Mutex::new(()),
            host: None,
            needs_refresh: AtomicBool::new(false),
        }
    }

    /// Attaches the native-tab side-effect host.
    pub fn with_host(mut self, host: Arc<dyn BrowserTabHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Returns a snapshot of the session state.
    pub fn state(&self) -> DragState {
        self.state.lock().unwrap().clone()
    }

    /// Starts a drag session. An already-active session is replaced; the
    /// platform only delivers one dragstart at a time.
    pub fn begin(&self, source: DragSource) {
        *self.state.lock().unwrap() = DragState::Dragging { source };
    }

    /// Starts a drag session from a MIME-typed payload string.
    pub fn begin_from_payload(&self, mime: &str, data: &str) -> Result<(), DragError> {
        let source = decode_payload(mime, data)?;
        self.begin(source);
        Ok(())
    }

    /// Records the candidate drop surface under the pointer.
    pub fn target(&self, target: DropTarget) {
        let mut state = self.state.lock().unwrap();
        let source = match std::mem::replace(&mut *state, DragState::Idle) {
            DragState::Dragging { source } | DragState::Targeting { source, .. } => source,
            DragState::Idle => return,
        };
        *state = DragState::Targeting { source, target };
    }

    /// Clears the candidate target (pointer left the drop surface) while
    /// keeping the drag alive.
    pub fn clear_target(&self) {
        let mut state = self.state.lock().unwrap();
        if let DragState::Targeting { source, .. } = std::mem::replace(&mut *state, DragState::Idle)
        {
            *state = DragState::Dragging { source };
        }
    }

    /// Aborts the session and resets all transient state. This is the
    /// authoritative cleanup path — the host wires it to the global dragend
    /// event, since element-level leave events do not fire reliably when
    /// the pointer exits the window.
    pub fn cancel(&self) {
        *self.state.lock().unwrap() = DragState::Idle;
    }

    /// True once after a native tab/group commit; the host schedules a full
    /// refresh because the browser, not this engine, owns native positions.
    pub fn take_pending_refresh(&self) -> bool {
        self.needs_refresh.swap(false, Ordering::SeqCst)
    }

    /// Commits the in-flight drop.
    ///
    /// Commits serialize: a second drop arriving while one is mutating the
    /// store waits for it to finish, then finds the session consumed and
    /// resolves to `NoOp` instead of interleaving. A drop with no recorded
    /// target is treated as a cancellation.
    pub async fn commit(&self) -> Result<CommitOutcome, DragError> {
        let _guard = self.commit_lock.lock().await;

        let (source, target) = {
            let mut state = self.state.lock().unwrap();
            match std::mem::replace(&mut *state, DragState::Idle) {
                DragState::Targeting { source, target } => (source, target),
                _ => return Ok(CommitOutcome::NoOp),
            }
        };

        match source {
            DragSource::NewTab { payload } => self.commit_new_tab(payload, &target),
            DragSource::ExistingCard { id } => self.commit_move_card(&id, &target),
            DragSource::NativeTab { tab_id } => {
                let outcome = match &self.host {
                    Some(host) => {
                        host.move_tab(tab_id, &target.group_id)
                            .map_err(DragError::CommitFailed)?;
                        self.needs_refresh.store(true, Ordering::SeqCst);
                        CommitOutcome::NativeTabMoved { tab_id }
                    }
                    None => CommitOutcome::NoOp,
                };
                Ok(outcome)
            }
            DragSource::NativeTabGroup { group_id } => {
                let outcome = match &self.host {
                    Some(host) => {
                        host.move_tab_group(group_id, &target.group_id)
                            .map_err(DragError::CommitFailed)?;
                        self.needs_refresh.store(true, Ordering::SeqCst);
                        CommitOutcome::NativeGroupMoved { group_id }
                    }
                    None => CommitOutcome::NoOp,
                };
                Ok(outcome)
            }
        }
    }

    /// Creates a card from a dropped tab, placed at the requested position
    /// in the target group — one transaction for record and order list.
    fn commit_new_tab(
        &self,
        payload: TabPayload,
        target: &DropTarget,
    ) -> Result<CommitOutcome, DragError> {
        self.db
            .with_transaction(TransactionMode::ReadWrite, |conn| {
                let mut pages = WebpageManager::new(conn);
                let draft = WebpageDraft {
                    url: payload.url.clone(),
                    title: payload.title.clone(),
                    favicon: payload.favicon.clone(),
                    note: None,
                    category_id: target.category_id.clone(),
                    subcategory_id: Some(target.group_id.clone()),
                };
                let page = pages
                    .create(&draft)
                    .map_err(|e| DragError::CommitFailed(e.to_string()))?;

                let ordering = OrderingEngine::new(conn);
                let scope = OrderScope::Group(target.group_id.clone());
                let before = match &target.position {
                    DropPosition::Before(id) => Some(id.as_str()),
                    DropPosition::AtEnd => None,
                };
                ordering
                    .place(&scope, &page.id, before)
                    .map_err(|e| DragError::CommitFailed(e.to_string()))?;

                Ok(CommitOutcome::CreatedCard(page))
            })
    }

    /// Moves an existing card into the target group at the requested
    /// position: record fields and both scopes' order lists change in one
    /// transaction.
    fn commit_move_card(&self, id: &str, target: &DropTarget) -> Result<CommitOutcome, DragError> {
        if let DropPosition::Before(ref_id) = &target.position {
            if ref_id == id {
                return Ok(CommitOutcome::NoOp);
            }
        }

        self.db
            .with_transaction(TransactionMode::ReadWrite, |conn| {
                let pages = WebpageManager::new(conn);
                let page = match pages.get(id) {
                    Ok(page) => page,
                    // Deleted mid-drag; routine race, not an error.
                    Err(_) => return Ok(CommitOutcome::NoOp),
                };

                let ordering = OrderingEngine::new(conn);
                let old_scope = OrderScope::for_group(page.subcategory_id.as_deref());
                let new_scope = OrderScope::Group(target.group_id.clone());

                conn.execute(
                    "UPDATE webpages SET category_id = ?1, subcategory_id = ?2, updated_at = ?3 \
                     WHERE id = ?4",
                    rusqlite::params![target.category_id, target.group_id, Self::now(), id],
                )?;

                if old_scope != new_scope {
                    ordering
                        .remove(&old_scope, id)
                        .map_err(|e| DragError::CommitFailed(e.to_string()))?;
                }
                let before = match &target.position {
                    DropPosition::Before(ref_id) => Some(ref_id.as_str()),
                    DropPosition::AtEnd => None,
                };
                ordering
                    .place(&new_scope, id, before)
                    .map_err(|e| DragError::CommitFailed(e.to_string()))?;

                Ok(CommitOutcome::MovedCard {
                    id: id.to_string(),
                    group_id: target.group_id.clone(),
                })
            })
    }
}

// === Payload codecs ===

/// Encodes a drag source as its MIME-typed payload string: JSON for complex
/// sources, a bare id for existing-card references.
pub fn encode_source(source: &DragSource) -> Result<(&'static str, String), DragError> {
    match source {
        DragSource::ExistingCard { id } => Ok((MIME_CARD, id.clone())),
        DragSource::NewTab { payload } => {
            let json = serde_json::to_string(payload)
                .map_err(|e| DragError::InvalidPayload(e.to_string()))?;
            Ok((MIME_TAB, json))
        }
        DragSource::NativeTab { tab_id } => {
            let payload = TabPayload {
                url: String::new(),
                title: None,
                favicon: None,
                tab_id: Some(*tab_id),
            };
            let json = serde_json::to_string(&payload)
                .map_err(|e| DragError::InvalidPayload(e.to_string()))?;
            Ok((MIME_TAB, json))
        }
        DragSource::NativeTabGroup { group_id } => {
            let payload = NativeGroupPayload {
                group_id: *group_id,
                title: None,
            };
            let json = serde_json::to_string(&payload)
                .map_err(|e| DragError::InvalidPayload(e.to_string()))?;
            Ok((MIME_TAB_GROUP, json))
        }
    }
}

/// Decodes a MIME-typed payload string back into a drag source.
///
/// A tab descriptor without a URL but with a host tab id is a native tab
/// drag; the browser owns its position, so no card is created for it.
pub fn decode_payload(mime: &str, data: &str) -> Result<DragSource, DragError> {
    match mime {
        MIME_CARD => {
            let id = data.trim();
            if id.is_empty() {
                return Err(DragError::InvalidPayload(String::from("empty card id")));
            }
            Ok(DragSource::ExistingCard { id: id.to_string() })
        }
        MIME_TAB => {
            let payload: TabPayload = serde_json::from_str(data)
                .map_err(|e| DragError::InvalidPayload(e.to_string()))?;
            match (payload.url.is_empty(), payload.tab_id) {
                (true, Some(tab_id)) => Ok(DragSource::NativeTab { tab_id }),
                (true, None) => Err(DragError::InvalidPayload(String::from(
                    "tab payload has neither url nor tab id",
                ))),
                (false, _) => Ok(DragSource::NewTab { payload }),
            }
        }
        MIME_TAB_GROUP => {
            let payload: NativeGroupPayload = serde_json::from_str(data)
                .map_err(|e| DragError::InvalidPayload(e.to_string()))?;
            Ok(DragSource::NativeTabGroup {
                group_id: payload.group_id,
            })
        }
        other => Err(DragError::InvalidPayload(format!(
            "unknown payload type: {}",
            other
        ))),
    }
}

// === Insertion geometry ===

/// Which side of a row-oriented card the pointer favors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowHalf {
    Before,
    After,
}

/// Row-oriented lists: above the target's vertical midpoint inserts before
/// it, at or below inserts after.
pub fn row_insertion(pointer_y: f64, target: &Rect) -> RowHalf {
    if pointer_y < target.y + target.height / 2.0 {
        RowHalf::Before
    } else {
        RowHalf::After
    }
}

/// Grid-oriented lists: pick the cell whose center is nearest the pointer,
/// then choose the insertion gap on whichever side of that cell the pointer
/// sits. Returns an index in `0..=cells.len()`.
pub fn grid_insertion_index(pointer: (f64, f64), cells: &[Rect]) -> usize {
    if cells.is_empty() {
        return 0;
    }
    let (px, py) = pointer;
    let mut nearest = 0usize;
    let mut nearest_dist = f64::MAX;
    for (index, cell) in cells.iter().enumerate() {
        let (cx, cy) = cell.center();
        let dist = (px - cx) * (px - cx) + (py - cy) * (py - cy);
        if dist < nearest_dist {
            nearest_dist = dist;
            nearest = index;
        }
    }
    let (cx, _) = cells[nearest].center();
    if px > cx {
        nearest + 1
    } else {
        nearest
    }
}
