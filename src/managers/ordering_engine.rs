//! Ordering engine for LinkTrove.
//!
//! Maintains the explicit, persisted display order of cards per scope: one
//! legacy global list, plus one independent list per group once groups
//! exist. Order lists are stored as JSON id arrays in the key-value meta
//! table and are the single source of truth for display sequence — the
//! record store's natural iteration order is only a tiebreak for ids that
//! have no explicit entry yet.

use rusqlite::Connection;

use crate::managers::meta_store::MetaStore;
use crate::types::errors::MetaError;
use crate::types::webpage::Webpage;

/// Meta key holding the legacy single global order list.
pub const GLOBAL_ORDER_KEY: &str = "order.webpages";
/// Prefix of per-group order list keys.
pub const GROUP_ORDER_PREFIX: &str = "order.subcat.";

/// Which order list an operation addresses.
///
/// Scopes are isolated: mutating one list never touches another, even
/// though all of them live in the same physical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    /// The legacy one-list-for-all-cards scope.
    Global,
    /// Ordering strictly inside one group.
    Group(String),
}

impl OrderScope {
    /// Meta key this scope's list is persisted under.
    pub fn key(&self) -> String {
        match self {
            OrderScope::Global => GLOBAL_ORDER_KEY.to_string(),
            OrderScope::Group(id) => format!("{}{}", GROUP_ORDER_PREFIX, id),
        }
    }

    /// Scope for a card, given its group membership.
    pub fn for_group(subcategory_id: Option<&str>) -> Self {
        match subcategory_id {
            Some(id) => OrderScope::Group(id.to_string()),
            None => OrderScope::Global,
        }
    }
}

/// Ordering engine layered over the key-value meta store.
pub struct OrderingEngine<'a> {
    meta: MetaStore<'a>,
}

impl<'a> OrderingEngine<'a> {
    /// Creates a new `OrderingEngine` using the provided database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            meta: MetaStore::new(conn),
        }
    }

    /// Loads a scope's persisted order list (empty when never written).
    pub fn load(&self, scope: &OrderScope) -> Result<Vec<String>, MetaError> {
        Ok(self.meta.get_json(&scope.key())?.unwrap_or_default())
    }

    fn save(&self, scope: &OrderScope, order: &[String]) -> Result<(), MetaError> {
        self.meta.set_json(&scope.key(), &order)
    }

    /// Moves `from_id` immediately before `to_id` within the scope's list.
    ///
    /// The insertion index is `to_id`'s position measured *after* `from_id`
    /// has been removed. When the moved card originally preceded the target
    /// this shifts the target's effective index down by one, which is what
    /// makes forward moves land in front of the target instead of one slot
    /// short. `[a,b,c]` + `reorder(a,c)` gives `[b,a,c]`; `reorder(c,a)`
    /// gives `[c,a,b]`.
    ///
    /// Unknown `from_id` or `to_id` and self-reorders are silent no-ops
    /// returning the unchanged list: a card deleted mid-drag is routine, not
    /// exceptional. Returns the new full ordered list.
    pub fn reorder(
        &self,
        scope: &OrderScope,
        from_id: &str,
        to_id: &str,
    ) -> Result<Vec<String>, MetaError> {
        let mut order = self.load(scope)?;
        if from_id == to_id {
            return Ok(order);
        }
        let Some(from_idx) = order.iter().position(|id| id == from_id) else {
            return Ok(order);
        };
        let moved = order.remove(from_idx);
        match order.iter().position(|id| id == to_id) {
            Some(to_idx) => order.insert(to_idx, moved),
            None => {
                // Target vanished mid-drag: restore and persist nothing.
                order.insert(from_idx, moved);
                return Ok(order);
            }
        }
        self.save(scope, &order)?;
        Ok(order)
    }

    /// Moves `id` to the end of the scope's list. Unknown id is a no-op.
    pub fn move_to_end(&self, scope: &OrderScope, id: &str) -> Result<Vec<String>, MetaError> {
        let mut order = self.load(scope)?;
        let Some(idx) = order.iter().position(|entry| entry == id) else {
            return Ok(order);
        };
        if idx + 1 == order.len() {
            return Ok(order);
        }
        let moved = order.remove(idx);
        order.push(moved);
        self.save(scope, &order)?;
        Ok(order)
    }

    /// Places `id` in the scope's list: removed from any current position,
    /// then inserted before `before` when given and present, else appended.
    ///
    /// This is the placement primitive behind drop commits; unlike
    /// [`reorder`](Self::reorder) it also admits ids not yet in the list.
    pub fn place(
        &self,
        scope: &OrderScope,
        id: &str,
        before: Option<&str>,
    ) -> Result<Vec<String>, MetaError> {
        let mut order = self.load(scope)?;
        if let Some(idx) = order.iter().position(|entry| entry == id) {
            order.remove(idx);
        }
        let insert_at = before
            .and_then(|b| order.iter().position(|entry| entry == b))
            .unwrap_or(order.len());
        order.insert(insert_at, id.to_string());
        self.save(scope, &order)?;
        Ok(order)
    }

    /// Appends `id` to the scope's list if it is not already a member.
    pub fn ensure_membership(&self, scope: &OrderScope, id: &str) -> Result<Vec<String>, MetaError> {
        let mut order = self.load(scope)?;
        if !order.iter().any(|entry| entry == id) {
            order.push(id.to_string());
            self.save(scope, &order)?;
        }
        Ok(order)
    }

    /// Removes `id` from the scope's list. Callers deleting records are
    /// responsible for routing the deletion through here so order lists
    /// never reference dead ids.
    pub fn remove(&self, scope: &OrderScope, id: &str) -> Result<Vec<String>, MetaError> {
        let mut order = self.load(scope)?;
        if let Some(idx) = order.iter().position(|entry| entry == id) {
            order.remove(idx);
            self.save(scope, &order)?;
        }
        Ok(order)
    }

    /// Removes every id in `ids` from the scope's list in one write.
    pub fn remove_many(&self, scope: &OrderScope, ids: &[String]) -> Result<Vec<String>, MetaError> {
        let mut order = self.load(scope)?;
        let before = order.len();
        order.retain(|entry| !ids.contains(entry));
        if order.len() != before {
            self.save(scope, &order)?;
        }
        Ok(order)
    }

    /// Deletes a scope's order snapshot entirely (scope itself went away).
    pub fn drop_scope(&self, scope: &OrderScope) -> Result<(), MetaError> {
        use crate::managers::meta_store::MetaStoreTrait;
        self.meta.remove(&scope.key())
    }

    /// Resolves the final display sequence for `records` against a persisted
    /// order list: explicitly ordered ids first (by list position), then any
    /// record absent from the list, in the records' given (natural store)
    /// order. Pure — neither input is mutated.
    pub fn resolve_display_order(records: &[Webpage], order: &[String]) -> Vec<Webpage> {
        let mut resolved: Vec<Webpage> = Vec::with_capacity(records.len());
        for id in order {
            if let Some(record) = records.iter().find(|r| &r.id == id) {
                resolved.push(record.clone());
            }
        }
        for record in records {
            if !order.contains(&record.id) {
                resolved.push(record.clone());
            }
        }
        resolved
    }
}
