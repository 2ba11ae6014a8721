//! Collection (category) and organization store for LinkTrove.
//!
//! Implements `CollectionManagerTrait` — CRUD over organizations and their
//! collections, the last-collection invariant, and the soft-delete cascade:
//! deleting a collection tombstones it and its member cards while
//! hard-deleting its groups. Backed by SQLite via `rusqlite`.

use rusqlite::{params, Connection, OptionalExtension};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::types::collection::{Category, Organization};
use crate::types::errors::CollectionError;

/// Name given to auto-seeded collections and organizations.
const DEFAULT_COLLECTION_NAME: &str = "My Collection";
const DEFAULT_ORGANIZATION_NAME: &str = "Personal";
const DEFAULT_COLOR: &str = "#64748b";

/// Trait defining collection and organization store operations.
pub trait CollectionManagerTrait {
    fn create_organization(&mut self, name: &str) -> Result<Organization, CollectionError>;
    fn list_organizations(&self) -> Result<Vec<Organization>, CollectionError>;
    /// Returns the first live organization, creating one when none exists.
    fn ensure_default_organization(&mut self) -> Result<Organization, CollectionError>;

    fn create(&mut self, organization_id: &str, name: &str, color: Option<&str>) -> Result<Category, CollectionError>;
    fn get(&self, id: &str) -> Result<Category, CollectionError>;
    fn list_by_organization(&self, organization_id: &str) -> Result<Vec<Category>, CollectionError>;
    fn rename(&mut self, id: &str, name: &str) -> Result<Category, CollectionError>;
    /// Soft-deletes a collection, cascading: member cards are tombstoned,
    /// member groups are hard-deleted. Returns the removed group ids so the
    /// caller can clear their order snapshots. Rejected with
    /// `LastCollection` when it would leave the organization empty.
    fn delete(&mut self, id: &str) -> Result<Vec<String>, CollectionError>;
    /// Creates the default collection if the organization has none live.
    fn ensure_default(&mut self, organization_id: &str) -> Result<Option<Category>, CollectionError>;
}

/// Collection store backed by a SQLite connection.
pub struct CollectionManager<'a> {
    conn: &'a Connection,
}

impl<'a> CollectionManager<'a> {
    /// Creates a new `CollectionManager` using the provided database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Returns the current UNIX timestamp in seconds.
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn organization_exists(&self, organization_id: &str) -> Result<bool, CollectionError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM organizations WHERE id = ?1 AND deleted_at IS NULL",
            params![organization_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn live_count(&self, organization_id: &str) -> Result<i64, CollectionError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE organization_id = ?1 AND deleted_at IS NULL",
            params![organization_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Next float position within an organization (max existing + 1).
    fn next_position(&self, organization_id: &str) -> Result<f64, CollectionError> {
        let pos: f64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM categories \
             WHERE organization_id = ?1 AND deleted_at IS NULL",
            params![organization_id],
            |row| row.get(0),
        )?;
        Ok(pos)
    }

    /// Reads a single `Category` row into a struct.
    fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
        Ok(Category {
            id: row.get(0)?,
            organization_id: row.get(1)?,
            name: row.get(2)?,
            color: row.get(3)?,
            position: row.get(4)?,
            default_template_id: row.get(5)?,
            is_default: row.get::<_, i64>(6)? != 0,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            deleted_at: row.get(9)?,
        })
    }

    const CATEGORY_COLUMNS: &'static str = "id, organization_id, name, color, position, \
         default_template_id, is_default, created_at, updated_at, deleted_at";

    fn insert_category(&self, category: &Category) -> Result<(), CollectionError> {
        self.conn.execute(
            "INSERT INTO categories (id, organization_id, name, color, position, \
             default_template_id, is_default, created_at, updated_at, deleted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL)",
            params![
                category.id,
                category.organization_id,
                category.name,
                category.color,
                category.position,
                category.default_template_id,
                category.is_default as i64,
                category.created_at,
                category.updated_at,
            ],
        )?;
        Ok(())
    }
}

impl<'a> CollectionManagerTrait for CollectionManager<'a> {
    fn create_organization(&mut self, name: &str) -> Result<Organization, CollectionError> {
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM organizations WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;

        let org = Organization {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            position,
            deleted_at: None,
        };
        self.conn.execute(
            "INSERT INTO organizations (id, name, position, deleted_at) VALUES (?1, ?2, ?3, NULL)",
            params![org.id, org.name, org.position],
        )?;
        Ok(org)
    }

    fn list_organizations(&self) -> Result<Vec<Organization>, CollectionError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, position, deleted_at FROM organizations \
             WHERE deleted_at IS NULL ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Organization {
                id: row.get(0)?,
                name: row.get(1)?,
                position: row.get(2)?,
                deleted_at: row.get(3)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn ensure_default_organization(&mut self) -> Result<Organization, CollectionError> {
        if let Some(org) = self.list_organizations()?.into_iter().next() {
            return Ok(org);
        }
        self.create_organization(DEFAULT_ORGANIZATION_NAME)
    }

    fn create(&mut self, organization_id: &str, name: &str, color: Option<&str>) -> Result<Category, CollectionError> {
        if !self.organization_exists(organization_id)? {
            return Err(CollectionError::OrganizationNotFound(organization_id.to_string()));
        }

        let category = Category {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            name: name.trim().to_string(),
            color: color.unwrap_or(DEFAULT_COLOR).to_string(),
            position: self.next_position(organization_id)?,
            default_template_id: None,
            is_default: false,
            created_at: Self::now(),
            updated_at: Self::now(),
            deleted_at: None,
        };
        self.insert_category(&category)?;
        Ok(category)
    }

    fn get(&self, id: &str) -> Result<Category, CollectionError> {
        let sql = format!(
            "SELECT {} FROM categories WHERE id = ?1",
            Self::CATEGORY_COLUMNS
        );
        self.conn
            .query_row(&sql, params![id], Self::row_to_category)
            .optional()?
            .ok_or_else(|| CollectionError::NotFound(id.to_string()))
    }

    fn list_by_organization(&self, organization_id: &str) -> Result<Vec<Category>, CollectionError> {
        let sql = format!(
            "SELECT {} FROM categories \
             WHERE organization_id = ?1 AND deleted_at IS NULL ORDER BY position",
            Self::CATEGORY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![organization_id], Self::row_to_category)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn rename(&mut self, id: &str, name: &str) -> Result<Category, CollectionError> {
        let affected = self.conn.execute(
            "UPDATE categories SET name = ?1, updated_at = ?2 WHERE id = ?3 AND deleted_at IS NULL",
            params![name.trim(), Self::now(), id],
        )?;
        if affected == 0 {
            return Err(CollectionError::NotFound(id.to_string()));
        }
        self.get(id)
    }

    fn delete(&mut self, id: &str) -> Result<Vec<String>, CollectionError> {
        let category = self.get(id)?;
        if category.is_deleted() {
            return Err(CollectionError::NotFound(id.to_string()));
        }

        // Reject before any mutation: the organization must keep one live collection.
        if self.live_count(&category.organization_id)? <= 1 {
            return Err(CollectionError::LastCollection(category.organization_id));
        }

        let now = Self::now();

        // Cascade edge 1: member cards tombstone alongside the collection.
        self.conn.execute(
            "UPDATE webpages SET deleted_at = ?1, updated_at = ?1 \
             WHERE category_id = ?2 AND deleted_at IS NULL",
            params![now, id],
        )?;

        // Cascade edge 2: member groups are hard-deleted; collect their ids
        // first so callers can drop the matching order snapshots.
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM subcategories WHERE category_id = ?1 ORDER BY position")?;
        let rows = stmt.query_map(params![id], |row| row.get(0))?;
        let mut group_ids: Vec<String> = Vec::new();
        for row in rows {
            group_ids.push(row?);
        }
        self.conn.execute(
            "DELETE FROM subcategories WHERE category_id = ?1",
            params![id],
        )?;

        // The collection itself tombstones last.
        self.conn.execute(
            "UPDATE categories SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;

        Ok(group_ids)
    }

    fn ensure_default(&mut self, organization_id: &str) -> Result<Option<Category>, CollectionError> {
        if self.live_count(organization_id)? > 0 {
            return Ok(None);
        }

        let category = Category {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            name: DEFAULT_COLLECTION_NAME.to_string(),
            color: DEFAULT_COLOR.to_string(),
            position: self.next_position(organization_id)?,
            default_template_id: None,
            is_default: true,
            created_at: Self::now(),
            updated_at: Self::now(),
            deleted_at: None,
        };
        self.insert_category(&category)?;
        Ok(Some(category))
    }
}
