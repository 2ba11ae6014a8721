//! Group (subcategory) store for LinkTrove.
//!
//! Implements `GroupManagerTrait` — CRUD over the named ordered buckets of
//! cards inside a collection, including the two deletion cascades (reassign
//! member cards, or delete them with the group). Backed by SQLite via
//! `rusqlite`.
//!
//! The "a collection keeps at least one group" invariant is deliberately NOT
//! enforced here; it is an application-level precondition checked by
//! [`crate::app::App`] before the deletion entry points are called.

use rusqlite::{params, Connection, OptionalExtension};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::types::errors::GroupError;
use crate::types::group::{Subcategory, DEFAULT_GROUP_NAME};

/// Trait defining group store operations.
pub trait GroupManagerTrait {
    fn create(&mut self, category_id: &str, name: &str) -> Result<Subcategory, GroupError>;
    fn get(&self, id: &str) -> Result<Subcategory, GroupError>;
    fn list_by_category(&self, category_id: &str) -> Result<Vec<Subcategory>, GroupError>;
    fn count_by_category(&self, category_id: &str) -> Result<i64, GroupError>;
    fn rename(&mut self, id: &str, name: &str) -> Result<Subcategory, GroupError>;
    fn reorder(&mut self, category_id: &str, ordered_ids: &[String]) -> Result<Vec<Subcategory>, GroupError>;
    /// Deletes the group, reassigning its member cards to `reassign_to`.
    fn delete_reassign(&mut self, id: &str, reassign_to: &str) -> Result<(), GroupError>;
    /// Deletes the group together with its member cards. Returns the ids of
    /// the removed cards so the caller can clear their order entries.
    fn delete_with_pages(&mut self, id: &str) -> Result<Vec<String>, GroupError>;
    /// Creates the default group if the collection has none.
    fn ensure_default(&mut self, category_id: &str) -> Result<Option<Subcategory>, GroupError>;
}

/// Group store backed by a SQLite connection.
pub struct GroupManager<'a> {
    conn: &'a Connection,
}

impl<'a> GroupManager<'a> {
    /// Creates a new `GroupManager` using the provided database connection.
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

    fn category_exists(&self, category_id: &str) -> Result<bool, GroupError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE id = ?1 AND deleted_at IS NULL",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Next integer position within a collection (max existing + 1).
    fn next_position(&self, category_id: &str) -> Result<i64, GroupError> {
        let pos: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM subcategories WHERE category_id = ?1",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(pos)
    }

    /// Reads a single `Subcategory` row into a struct.
    fn row_to_group(row: &rusqlite::Row) -> rusqlite::Result<Subcategory> {
        Ok(Subcategory {
            id: row.get(0)?,
            category_id: row.get(1)?,
            name: row.get(2)?,
            position: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl<'a> GroupManagerTrait for GroupManager<'a> {
    /// Creates a new group at the end of the collection's group order.
    fn create(&mut self, category_id: &str, name: &str) -> Result<Subcategory, GroupError> {
        if !self.category_exists(category_id)? {
            return Err(GroupError::CategoryNotFound(category_id.to_string()));
        }

        let trimmed = name.trim();
        let group = Subcategory {
            id: Uuid::new_v4().to_string(),
            category_id: category_id.to_string(),
            name: if trimmed.is_empty() {
                DEFAULT_GROUP_NAME.to_string()
            } else {
                trimmed.to_string()
            },
            position: self.next_position(category_id)?,
            created_at: Self::now(),
            updated_at: Self::now(),
        };

        self.conn.execute(
            "INSERT INTO subcategories (id, category_id, name, position, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                group.id,
                group.category_id,
                group.name,
                group.position,
                group.created_at,
                group.updated_at,
            ],
        )?;

        Ok(group)
    }

    fn get(&self, id: &str) -> Result<Subcategory, GroupError> {
        self.conn
            .query_row(
                "SELECT id, category_id, name, position, created_at, updated_at \
                 FROM subcategories WHERE id = ?1",
                params![id],
                Self::row_to_group,
            )
            .optional()?
            .ok_or_else(|| GroupError::NotFound(id.to_string()))
    }

    fn list_by_category(&self, category_id: &str) -> Result<Vec<Subcategory>, GroupError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, category_id, name, position, created_at, updated_at \
             FROM subcategories WHERE category_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![category_id], Self::row_to_group)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn count_by_category(&self, category_id: &str) -> Result<i64, GroupError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM subcategories WHERE category_id = ?1",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Renames a group. An empty or whitespace name falls back to the
    /// default name instead of erroring, so the group stays displayable.
    fn rename(&mut self, id: &str, name: &str) -> Result<Subcategory, GroupError> {
        let trimmed = name.trim();
        let effective = if trimmed.is_empty() {
            DEFAULT_GROUP_NAME
        } else {
            trimmed
        };

        let affected = self.conn.execute(
            "UPDATE subcategories SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![effective, Self::now(), id],
        )?;
        if affected == 0 {
            return Err(GroupError::NotFound(id.to_string()));
        }
        self.get(id)
    }

    /// Rewrites group positions to match `ordered_ids`.
    ///
    /// Merge semantics: listed groups take their list position; any existing
    /// group missing from the input is appended afterward, preserving its
    /// previous relative order. Stale or partial client state therefore
    /// reorders what it knows about without dropping the rest.
    fn reorder(&mut self, category_id: &str, ordered_ids: &[String]) -> Result<Vec<Subcategory>, GroupError> {
        let current = self.list_by_category(category_id)?;

        let mut merged: Vec<String> = Vec::with_capacity(current.len());
        for id in ordered_ids {
            if current.iter().any(|g| &g.id == id) && !merged.contains(id) {
                merged.push(id.clone());
            }
        }
        for group in &current {
            if !merged.contains(&group.id) {
                merged.push(group.id.clone());
            }
        }

        let now = Self::now();
        for (index, id) in merged.iter().enumerate() {
            self.conn.execute(
                "UPDATE subcategories SET position = ?1, updated_at = ?2 WHERE id = ?3",
                params![index as i64, now, id],
            )?;
        }

        self.list_by_category(category_id)
    }

    fn delete_reassign(&mut self, id: &str, reassign_to: &str) -> Result<(), GroupError> {
        // The target must exist, otherwise member cards would be orphaned.
        let _target = self.get(reassign_to)?;

        self.conn.execute(
            "UPDATE webpages SET subcategory_id = ?1, updated_at = ?2 WHERE subcategory_id = ?3",
            params![reassign_to, Self::now(), id],
        )?;

        let affected = self
            .conn
            .execute("DELETE FROM subcategories WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(GroupError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_with_pages(&mut self, id: &str) -> Result<Vec<String>, GroupError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM webpages WHERE subcategory_id = ?1 ORDER BY position")?;
        let rows = stmt.query_map(params![id], |row| row.get(0))?;
        let mut page_ids: Vec<String> = Vec::new();
        for row in rows {
            page_ids.push(row?);
        }

        self.conn.execute(
            "DELETE FROM webpages WHERE subcategory_id = ?1",
            params![id],
        )?;

        let affected = self
            .conn
            .execute("DELETE FROM subcategories WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(GroupError::NotFound(id.to_string()));
        }
        Ok(page_ids)
    }

    fn ensure_default(&mut self, category_id: &str) -> Result<Option<Subcategory>, GroupError> {
        if self.count_by_category(category_id)? > 0 {
            return Ok(None);
        }
        self.create(category_id, DEFAULT_GROUP_NAME).map(Some)
    }
}
