//! Backup document export/import for LinkTrove.
//!
//! Serializes the whole dataset (organizations, collections, groups, cards,
//! per-group order lists and the legacy global order) into one JSON
//! document, and restores it wholesale: import replaces local state rather
//! than merging, and re-establishes exact per-group display order, not just
//! membership. The sync reconciler pushes and restores these documents; the
//! same shape backs user-facing export/import.

use std::collections::BTreeMap;

use rusqlite::{params, Connection};

use crate::managers::meta_store::{MetaStore, MetaStoreTrait};
use crate::managers::ordering_engine::{GLOBAL_ORDER_KEY, GROUP_ORDER_PREFIX};
use crate::types::backup::{ExportDocument, SCHEMA_VERSION};
use crate::types::collection::{Category, Organization};
use crate::types::errors::BackupError;
use crate::types::group::Subcategory;
use crate::types::webpage::Webpage;

/// Reads the whole dataset into an [`ExportDocument`].
///
/// Tombstoned rows are included so a restore reproduces the store exactly.
pub fn export(conn: &Connection) -> Result<ExportDocument, BackupError> {
    let meta = MetaStore::new(conn);

    let mut orders: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for key in meta.keys_with_prefix(GROUP_ORDER_PREFIX).map_err(meta_to_backup)? {
        let group_id = key[GROUP_ORDER_PREFIX.len()..].to_string();
        if let Some(order) = meta.get_json::<Vec<String>>(&key).map_err(meta_to_backup)? {
            orders.insert(group_id, order);
        }
    }
    let global_order: Option<Vec<String>> = meta.get_json(GLOBAL_ORDER_KEY).map_err(meta_to_backup)?;

    Ok(ExportDocument {
        schema_version: SCHEMA_VERSION,
        organizations: read_organizations(conn)?,
        categories: read_categories(conn)?,
        subcategories: read_subcategories(conn)?,
        webpages: read_webpages(conn)?,
        orders,
        global_order,
    })
}

/// Replaces local state with `doc`, wholesale.
///
/// Callers wrap this in `Database::with_transaction` so a failed restore
/// leaves the previous dataset untouched. Last-writer-wins at the dataset
/// granularity: no field-level merge is attempted.
pub fn import(conn: &Connection, doc: &ExportDocument) -> Result<(), BackupError> {
    if doc.schema_version != SCHEMA_VERSION {
        return Err(BackupError::UnsupportedSchema(doc.schema_version));
    }

    conn.execute_batch(
        "DELETE FROM webpages;
         DELETE FROM subcategories;
         DELETE FROM categories;
         DELETE FROM organizations;",
    )?;

    for org in &doc.organizations {
        conn.execute(
            "INSERT INTO organizations (id, name, position, deleted_at) VALUES (?1, ?2, ?3, ?4)",
            params![org.id, org.name, org.position, org.deleted_at],
        )?;
    }
    for category in &doc.categories {
        conn.execute(
            "INSERT INTO categories (id, organization_id, name, color, position, \
             default_template_id, is_default, created_at, updated_at, deleted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
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
                category.deleted_at,
            ],
        )?;
    }
    for group in &doc.subcategories {
        conn.execute(
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
    }
    for page in &doc.webpages {
        conn.execute(
            "INSERT INTO webpages (id, url, title, favicon, note, category_id, subcategory_id, \
             meta, position, created_at, updated_at, deleted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                page.id,
                page.url,
                page.title,
                page.favicon,
                page.note,
                page.category_id,
                page.subcategory_id,
                serde_json::to_string(&page.meta)?,
                page.position,
                page.created_at,
                page.updated_at,
                page.deleted_at,
            ],
        )?;
    }

    let meta = MetaStore::new(conn);
    for key in meta.keys_with_prefix(GROUP_ORDER_PREFIX).map_err(meta_to_backup)? {
        meta.remove(&key).map_err(meta_to_backup)?;
    }
    meta.remove(GLOBAL_ORDER_KEY).map_err(meta_to_backup)?;
    for (group_id, order) in &doc.orders {
        meta.set_json(&format!("{}{}", GROUP_ORDER_PREFIX, group_id), order)
            .map_err(meta_to_backup)?;
    }
    if let Some(global) = &doc.global_order {
        meta.set_json(GLOBAL_ORDER_KEY, global)
            .map_err(meta_to_backup)?;
    }

    Ok(())
}

fn meta_to_backup(e: crate::types::errors::MetaError) -> BackupError {
    BackupError::DatabaseError(e.to_string())
}

fn read_organizations(conn: &Connection) -> Result<Vec<Organization>, BackupError> {
    let mut stmt =
        conn.prepare("SELECT id, name, position, deleted_at FROM organizations ORDER BY position")?;
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

fn read_categories(conn: &Connection) -> Result<Vec<Category>, BackupError> {
    let mut stmt = conn.prepare(
        "SELECT id, organization_id, name, color, position, default_template_id, is_default, \
         created_at, updated_at, deleted_at FROM categories ORDER BY position",
    )?;
    let rows = stmt.query_map([], |row| {
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
    })?;
    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn read_subcategories(conn: &Connection) -> Result<Vec<Subcategory>, BackupError> {
    let mut stmt = conn.prepare(
        "SELECT id, category_id, name, position, created_at, updated_at \
         FROM subcategories ORDER BY category_id, position",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Subcategory {
            id: row.get(0)?,
            category_id: row.get(1)?,
            name: row.get(2)?,
            position: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    })?;
    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn read_webpages(conn: &Connection) -> Result<Vec<Webpage>, BackupError> {
    let mut stmt = conn.prepare(
        "SELECT id, url, title, favicon, note, category_id, subcategory_id, meta, position, \
         created_at, updated_at, deleted_at FROM webpages ORDER BY position",
    )?;
    let rows = stmt.query_map([], |row| {
        let meta_raw: String = row.get(7)?;
        Ok(Webpage {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            favicon: row.get(3)?,
            note: row.get(4)?,
            category_id: row.get(5)?,
            subcategory_id: row.get(6)?,
            meta: serde_json::from_str(&meta_raw).unwrap_or_default(),
            position: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            deleted_at: row.get(11)?,
        })
    })?;
    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}
