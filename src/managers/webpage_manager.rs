//! Webpage (card) store for LinkTrove.
//!
//! Implements `WebpageManagerTrait` — CRUD over saved tab/link records with
//! URL validation, soft-delete semantics, and the cascade entry points the
//! collection and group stores call into. Backed by SQLite via `rusqlite`.

use rusqlite::{params, Connection, OptionalExtension};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;
use uuid::Uuid;

use crate::types::errors::WebpageError;
use crate::types::webpage::{Webpage, WebpageDraft, WebpagePatch, UNTITLED};

/// Trait defining webpage store operations.
pub trait WebpageManagerTrait {
    fn create(&mut self, draft: &WebpageDraft) -> Result<Webpage, WebpageError>;
    fn get(&self, id: &str) -> Result<Webpage, WebpageError>;
    fn update(&mut self, id: &str, patch: &WebpagePatch) -> Result<Webpage, WebpageError>;
    fn delete(&mut self, id: &str) -> Result<(), WebpageError>;
    /// Batch delete. Missing ids are skipped; returns the ids actually removed.
    fn delete_many(&mut self, ids: &[String]) -> Result<Vec<String>, WebpageError>;
    fn list_by_collection(&self, category_id: &str) -> Result<Vec<Webpage>, WebpageError>;
    fn list_by_group(&self, group_id: &str) -> Result<Vec<Webpage>, WebpageError>;
    fn search(&self, query: &str) -> Result<Vec<Webpage>, WebpageError>;
    /// Soft-deletes every live card in a collection. Returns affected ids.
    fn soft_delete_by_collection(&mut self, category_id: &str) -> Result<Vec<String>, WebpageError>;
    /// Moves every card in `from_group` to `to_group` without touching other fields.
    fn reassign_group(&mut self, from_group: &str, to_group: &str) -> Result<usize, WebpageError>;
    /// Hard-deletes every card in a group. Returns the removed ids.
    fn hard_delete_by_group(&mut self, group_id: &str) -> Result<Vec<String>, WebpageError>;
}

/// Webpage store backed by a SQLite connection.
pub struct WebpageManager<'a> {
    conn: &'a Connection,
}

impl<'a> WebpageManager<'a> {
    /// Creates a new `WebpageManager` using the provided database connection.
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

    /// Validates that `raw` is an absolute http(s) URL and returns its
    /// canonical form (lowercased host, default port stripped, path
    /// normalized by the parser).
    pub fn normalize_url(raw: &str) -> Result<String, WebpageError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WebpageError::InvalidUrl(String::from("(empty)")));
        }
        let parsed =
            Url::parse(trimmed).map_err(|_| WebpageError::InvalidUrl(trimmed.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed.to_string()),
            _ => Err(WebpageError::InvalidUrl(trimmed.to_string())),
        }
    }

    /// Title fallback chain: trimmed input, else URL host, else "Untitled".
    fn derive_title(title: Option<&str>, url: &str) -> String {
        if let Some(t) = title {
            let t = t.trim();
            if !t.is_empty() {
                return t.to_string();
            }
        }
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| UNTITLED.to_string())
    }

    /// Position for a newly created card: one before the current minimum,
    /// so creation prepends in natural store order.
    fn next_front_position(&self) -> Result<i64, WebpageError> {
        let pos: i64 = self.conn.query_row(
            "SELECT COALESCE(MIN(position), 1) - 1 FROM webpages",
            [],
            |row| row.get(0),
        )?;
        Ok(pos)
    }

    /// Reads a single `Webpage` row into a struct.
    fn row_to_webpage(row: &rusqlite::Row) -> rusqlite::Result<Webpage> {
        let meta_raw: String = row.get(7)?;
        let meta = serde_json::from_str(&meta_raw).unwrap_or_default();
        Ok(Webpage {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            favicon: row.get(3)?,
            note: row.get(4)?,
            category_id: row.get(5)?,
            subcategory_id: row.get(6)?,
            meta,
            position: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            deleted_at: row.get(11)?,
        })
    }

    const SELECT_COLUMNS: &'static str = "id, url, title, favicon, note, category_id, \
         subcategory_id, meta, position, created_at, updated_at, deleted_at";

    fn query_pages(
        &self,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Webpage>, WebpageError> {
        let sql = format!(
            "SELECT {} FROM webpages WHERE {} ORDER BY position",
            Self::SELECT_COLUMNS,
            where_clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, Self::row_to_webpage)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn ids_where(
        &self,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<String>, WebpageError> {
        let sql = format!("SELECT id FROM webpages WHERE {} ORDER BY position", where_clause);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, |row| row.get(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}

impl<'a> WebpageManagerTrait for WebpageManager<'a> {
    /// Creates a card from a tab draft. The URL must be absolute http(s);
    /// the new card is prepended to the natural store order.
    fn create(&mut self, draft: &WebpageDraft) -> Result<Webpage, WebpageError> {
        let url = Self::normalize_url(&draft.url)?;
        let title = Self::derive_title(draft.title.as_deref(), &url);

        let page = Webpage {
            id: Uuid::new_v4().to_string(),
            url,
            title,
            favicon: draft.favicon.clone(),
            note: draft.note.clone().unwrap_or_default(),
            category_id: draft.category_id.clone(),
            subcategory_id: draft.subcategory_id.clone(),
            meta: serde_json::Map::new(),
            position: self.next_front_position()?,
            created_at: Self::now(),
            updated_at: Self::now(),
            deleted_at: None,
        };

        self.conn.execute(
            "INSERT INTO webpages (id, url, title, favicon, note, category_id, subcategory_id, \
             meta, position, created_at, updated_at, deleted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL)",
            params![
                page.id,
                page.url,
                page.title,
                page.favicon,
                page.note,
                page.category_id,
                page.subcategory_id,
                serde_json::to_string(&page.meta).unwrap_or_else(|_| String::from("{}")),
                page.position,
                page.created_at,
                page.updated_at,
            ],
        )?;

        Ok(page)
    }

    fn get(&self, id: &str) -> Result<Webpage, WebpageError> {
        let sql = format!("SELECT {} FROM webpages WHERE id = ?1", Self::SELECT_COLUMNS);
        self.conn
            .query_row(&sql, params![id], Self::row_to_webpage)
            .optional()?
            .ok_or_else(|| WebpageError::NotFound(id.to_string()))
    }

    /// Merges `patch` into the stored record. Absent fields are left
    /// untouched; a patched URL is re-validated; `updated_at` always bumps.
    fn update(&mut self, id: &str, patch: &WebpagePatch) -> Result<Webpage, WebpageError> {
        let mut page = self.get(id)?;

        if let Some(raw) = &patch.url {
            page.url = Self::normalize_url(raw)?;
        }
        if let Some(title) = &patch.title {
            page.title = title.trim().to_string();
            if page.title.is_empty() {
                page.title = Self::derive_title(None, &page.url);
            }
        }
        if let Some(favicon) = &patch.favicon {
            page.favicon = favicon.clone();
        }
        if let Some(note) = &patch.note {
            page.note = note.clone();
        }
        if let Some(category_id) = &patch.category_id {
            page.category_id = category_id.clone();
        }
        if let Some(subcategory_id) = &patch.subcategory_id {
            page.subcategory_id = subcategory_id.clone();
        }
        if let Some(meta) = &patch.meta {
            page.meta = meta.clone();
        }
        page.updated_at = Self::now();

        self.conn.execute(
            "UPDATE webpages SET url = ?1, title = ?2, favicon = ?3, note = ?4, \
             category_id = ?5, subcategory_id = ?6, meta = ?7, updated_at = ?8 WHERE id = ?9",
            params![
                page.url,
                page.title,
                page.favicon,
                page.note,
                page.category_id,
                page.subcategory_id,
                serde_json::to_string(&page.meta).unwrap_or_else(|_| String::from("{}")),
                page.updated_at,
                page.id,
            ],
        )?;

        Ok(page)
    }

    fn delete(&mut self, id: &str) -> Result<(), WebpageError> {
        let affected = self
            .conn
            .execute("DELETE FROM webpages WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(WebpageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_many(&mut self, ids: &[String]) -> Result<Vec<String>, WebpageError> {
        let mut removed = Vec::new();
        for id in ids {
            let affected = self
                .conn
                .execute("DELETE FROM webpages WHERE id = ?1", params![id])?;
            if affected > 0 {
                removed.push(id.clone());
            }
        }
        Ok(removed)
    }

    fn list_by_collection(&self, category_id: &str) -> Result<Vec<Webpage>, WebpageError> {
        self.query_pages(
            "category_id = ?1 AND deleted_at IS NULL",
            &[&category_id as &dyn rusqlite::ToSql],
        )
    }

    fn list_by_group(&self, group_id: &str) -> Result<Vec<Webpage>, WebpageError> {
        self.query_pages(
            "subcategory_id = ?1 AND deleted_at IS NULL",
            &[&group_id as &dyn rusqlite::ToSql],
        )
    }

    /// Searches live cards by title, URL or note using SQL LIKE.
    fn search(&self, query: &str) -> Result<Vec<Webpage>, WebpageError> {
        let pattern = format!("%{}%", query);
        self.query_pages(
            "deleted_at IS NULL AND (title LIKE ?1 OR url LIKE ?1 OR note LIKE ?1)",
            &[&pattern as &dyn rusqlite::ToSql],
        )
    }

    fn soft_delete_by_collection(&mut self, category_id: &str) -> Result<Vec<String>, WebpageError> {
        let ids = self.ids_where(
            "category_id = ?1 AND deleted_at IS NULL",
            &[&category_id as &dyn rusqlite::ToSql],
        )?;
        let now = Self::now();
        self.conn.execute(
            "UPDATE webpages SET deleted_at = ?1, updated_at = ?1 \
             WHERE category_id = ?2 AND deleted_at IS NULL",
            params![now, category_id],
        )?;
        Ok(ids)
    }

    fn reassign_group(&mut self, from_group: &str, to_group: &str) -> Result<usize, WebpageError> {
        let affected = self.conn.execute(
            "UPDATE webpages SET subcategory_id = ?1, updated_at = ?2 WHERE subcategory_id = ?3",
            params![to_group, Self::now(), from_group],
        )?;
        Ok(affected)
    }

    fn hard_delete_by_group(&mut self, group_id: &str) -> Result<Vec<String>, WebpageError> {
        let ids = self.ids_where(
            "subcategory_id = ?1",
            &[&group_id as &dyn rusqlite::ToSql],
        )?;
        self.conn.execute(
            "DELETE FROM webpages WHERE subcategory_id = ?1",
            params![group_id],
        )?;
        Ok(ids)
    }
}
