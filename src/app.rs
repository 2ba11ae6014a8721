//! App core for LinkTrove.
//!
//! Central struct owning the database and the drag controller, and exposing
//! the guarded application-level operations: the store layer deliberately
//! does not enforce the last-group precondition, so the checks live here,
//! together with the bookkeeping that keeps order snapshots in step with
//! record deletions.
//!
//! Managers borrow the connection with a lifetime and are created on demand
//! via `app.db.connection()`.

use std::sync::Arc;

use crate::database::{Database, TransactionMode};
use crate::managers::collection_manager::{CollectionManager, CollectionManagerTrait};
use crate::managers::group_manager::{GroupManager, GroupManagerTrait};
use crate::managers::meta_store::{MetaStore, MetaStoreTrait};
use crate::managers::ordering_engine::{OrderScope, OrderingEngine};
use crate::managers::webpage_manager::{WebpageManager, WebpageManagerTrait};
use crate::services::drag_drop::DragDropController;
use crate::types::errors::{CollectionError, GroupError, WebpageError};
use crate::types::webpage::{Webpage, WebpageDraft};

/// Central application struct wiring the engine together.
pub struct App {
    pub db: Arc<Database>,
    pub drag: DragDropController,
}

impl App {
    /// Creates a new App over a persistent database file.
    pub fn new(db_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Arc::new(Database::open(db_path)?);
        let drag = DragDropController::new(db.clone());
        Ok(Self { db, drag })
    }

    /// Creates a new App over an in-memory database (tests, demos).
    pub fn new_in_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let db = Arc::new(Database::open_in_memory()?);
        let drag = DragDropController::new(db.clone());
        Ok(Self { db, drag })
    }

    /// Startup seeding: every organization has a collection, every
    /// collection has a group. Creates the default organization when the
    /// store is empty.
    pub fn startup(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.db
            .with_transaction(TransactionMode::ReadWrite, |conn| {
                let mut collections = CollectionManager::new(conn);
                let org = collections.ensure_default_organization()?;
                collections.ensure_default(&org.id)?;

                let categories = collections.list_by_organization(&org.id)?;
                let mut groups = GroupManager::new(conn);
                for category in &categories {
                    groups.ensure_default(&category.id)?;
                }
                Ok::<(), Box<dyn std::error::Error>>(())
            })
    }

    /// Creates a card from a tab draft and registers it at the front of its
    /// scope's order list, mirroring the natural-order prepend.
    pub fn create_card_from_tab(&self, draft: &WebpageDraft) -> Result<Webpage, WebpageError> {
        self.db
            .with_transaction(TransactionMode::ReadWrite, |conn| {
                let mut pages = WebpageManager::new(conn);
                let page = pages.create(draft)?;

                let ordering = OrderingEngine::new(conn);
                let scope = OrderScope::for_group(page.subcategory_id.as_deref());
                let order = ordering
                    .load(&scope)
                    .map_err(|e| WebpageError::DatabaseError(e.to_string()))?;
                ordering
                    .place(&scope, &page.id, order.first().map(String::as_str))
                    .map_err(|e| WebpageError::DatabaseError(e.to_string()))?;

                Ok(page)
            })
    }

    /// Deletes a card and removes it from every order list that could
    /// reference it.
    pub fn delete_card(&self, id: &str) -> Result<(), WebpageError> {
        self.db
            .with_transaction(TransactionMode::ReadWrite, |conn| {
                let mut pages = WebpageManager::new(conn);
                let page = pages.get(id)?;
                pages.delete(id)?;

                let ordering = OrderingEngine::new(conn);
                let scope = OrderScope::for_group(page.subcategory_id.as_deref());
                ordering
                    .remove(&scope, id)
                    .map_err(|e| WebpageError::DatabaseError(e.to_string()))?;
                if scope != OrderScope::Global {
                    ordering
                        .remove(&OrderScope::Global, id)
                        .map_err(|e| WebpageError::DatabaseError(e.to_string()))?;
                }
                Ok(())
            })
    }

    /// Batch card deletion; missing ids are skipped.
    pub fn delete_cards(&self, ids: &[String]) -> Result<Vec<String>, WebpageError> {
        self.db
            .with_transaction(TransactionMode::ReadWrite, |conn| {
                let mut pages = WebpageManager::new(conn);
                let ordering = OrderingEngine::new(conn);

                let mut scoped: Vec<(String, OrderScope)> = Vec::new();
                for id in ids {
                    if let Ok(page) = pages.get(id) {
                        scoped.push((
                            page.id.clone(),
                            OrderScope::for_group(page.subcategory_id.as_deref()),
                        ));
                    }
                }

                let removed = pages.delete_many(ids)?;
                for (id, scope) in &scoped {
                    ordering
                        .remove(scope, id)
                        .map_err(|e| WebpageError::DatabaseError(e.to_string()))?;
                }
                ordering
                    .remove_many(&OrderScope::Global, &removed)
                    .map_err(|e| WebpageError::DatabaseError(e.to_string()))?;

                Ok(removed)
            })
    }

    /// Deletes a group after reassigning its cards, rejecting when it is the
    /// collection's last group. The reassigned cards' order entries are
    /// appended to the surviving group's list, preserving their relative
    /// order.
    pub fn delete_group_reassign(&self, id: &str, reassign_to: &str) -> Result<(), GroupError> {
        self.guard_last_group(id)?;

        self.db
            .with_transaction(TransactionMode::ReadWrite, |conn| {
                let ordering = OrderingEngine::new(conn);
                let from_scope = OrderScope::Group(id.to_string());
                let to_scope = OrderScope::Group(reassign_to.to_string());

                let moved = ordering
                    .load(&from_scope)
                    .map_err(|e| GroupError::DatabaseError(e.to_string()))?;

                let mut groups = GroupManager::new(conn);
                groups.delete_reassign(id, reassign_to)?;

                for card_id in &moved {
                    ordering
                        .ensure_membership(&to_scope, card_id)
                        .map_err(|e| GroupError::DatabaseError(e.to_string()))?;
                }
                ordering
                    .drop_scope(&from_scope)
                    .map_err(|e| GroupError::DatabaseError(e.to_string()))?;

                Ok(())
            })
    }

    /// Deletes a group together with its cards, rejecting when it is the
    /// collection's last group.
    pub fn delete_group_with_pages(&self, id: &str) -> Result<(), GroupError> {
        self.guard_last_group(id)?;

        self.db
            .with_transaction(TransactionMode::ReadWrite, |conn| {
                let mut groups = GroupManager::new(conn);
                let page_ids = groups.delete_with_pages(id)?;

                let ordering = OrderingEngine::new(conn);
                ordering
                    .drop_scope(&OrderScope::Group(id.to_string()))
                    .map_err(|e| GroupError::DatabaseError(e.to_string()))?;
                ordering
                    .remove_many(&OrderScope::Global, &page_ids)
                    .map_err(|e| GroupError::DatabaseError(e.to_string()))?;

                Ok(())
            })
    }

    /// Soft-deletes a collection (the store enforces the last-collection
    /// invariant) and drops the order snapshots of its removed groups.
    pub fn delete_collection(&self, id: &str) -> Result<(), CollectionError> {
        self.db
            .with_transaction(TransactionMode::ReadWrite, |conn| {
                let pages = WebpageManager::new(conn);
                let page_ids: Vec<String> = pages
                    .list_by_collection(id)
                    .map_err(|e| CollectionError::DatabaseError(e.to_string()))?
                    .into_iter()
                    .map(|p| p.id)
                    .collect();

                let mut collections = CollectionManager::new(conn);
                let group_ids = collections.delete(id)?;

                let ordering = OrderingEngine::new(conn);
                for group_id in &group_ids {
                    ordering
                        .drop_scope(&OrderScope::Group(group_id.clone()))
                        .map_err(|e| CollectionError::DatabaseError(e.to_string()))?;
                }
                ordering
                    .remove_many(&OrderScope::Global, &page_ids)
                    .map_err(|e| CollectionError::DatabaseError(e.to_string()))?;

                Ok(())
            })
    }

    /// Cards of a group in final display sequence: explicit order first,
    /// then anything the order list does not know about yet.
    pub fn cards_in_display_order(&self, group_id: &str) -> Result<Vec<Webpage>, WebpageError> {
        let conn = self.db.connection();
        let pages = WebpageManager::new(conn).list_by_group(group_id)?;
        let ordering = OrderingEngine::new(conn);
        let order = ordering
            .load(&OrderScope::Group(group_id.to_string()))
            .map_err(|e| WebpageError::DatabaseError(e.to_string()))?;
        Ok(OrderingEngine::resolve_display_order(&pages, &order))
    }

    /// Remembers the selected collection for an organization.
    pub fn select_collection(&self, organization_id: &str, category_id: &str) -> Result<(), CollectionError> {
        let meta = MetaStore::new(self.db.connection());
        meta.set_raw(&selected_collection_key(organization_id), category_id)
            .map_err(|e| CollectionError::DatabaseError(e.to_string()))
    }

    /// Reads the remembered collection for an organization, if any.
    pub fn selected_collection(&self, organization_id: &str) -> Result<Option<String>, CollectionError> {
        let meta = MetaStore::new(self.db.connection());
        meta.get_raw(&selected_collection_key(organization_id))
            .map_err(|e| CollectionError::DatabaseError(e.to_string()))
    }

    /// Application-level precondition for both deletion modes: the owning
    /// collection must keep at least one group.
    fn guard_last_group(&self, id: &str) -> Result<(), GroupError> {
        let conn = self.db.connection();
        let groups = GroupManager::new(conn);
        let group = groups.get(id)?;
        if groups.count_by_category(&group.category_id)? <= 1 {
            return Err(GroupError::LastGroup(group.category_id));
        }
        Ok(())
    }
}

fn selected_collection_key(organization_id: &str) -> String {
    format!("selectedCategoryId:{}", organization_id)
}
