//! Unit tests for backup document export/import.
//!
//! Import is a wholesale replace and must restore exact per-group display
//! order, not just membership.

use linktrove::database::{Database, TransactionMode};
use linktrove::managers::collection_manager::{CollectionManager, CollectionManagerTrait};
use linktrove::managers::group_manager::{GroupManager, GroupManagerTrait};
use linktrove::managers::meta_store::{MetaStore, MetaStoreTrait};
use linktrove::managers::ordering_engine::{OrderScope, OrderingEngine};
use linktrove::managers::webpage_manager::{WebpageManager, WebpageManagerTrait};
use linktrove::services::backup;
use linktrove::types::backup::{ExportDocument, SCHEMA_VERSION};
use linktrove::types::errors::BackupError;
use linktrove::types::webpage::WebpageDraft;

/// Builds a dataset with two groups, three cards, explicit per-group order
/// and a legacy global order entry.
fn build_source() -> (Database, String, String, Vec<String>) {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();

    let mut collections = CollectionManager::new(conn);
    let org = collections.ensure_default_organization().unwrap();
    let category = collections.create(&org.id, "Work", None).unwrap();

    let mut groups = GroupManager::new(conn);
    let g1 = groups.create(&category.id, "Inbox").unwrap().id;
    let g2 = groups.create(&category.id, "Later").unwrap().id;

    let mut pages = WebpageManager::new(conn);
    let mut ids = Vec::new();
    for (n, group) in [(1, &g1), (2, &g1), (3, &g2)] {
        let page = pages
            .create(&WebpageDraft {
                url: format!("https://example.com/{}", n),
                title: Some(format!("Page {}", n)),
                favicon: None,
                note: None,
                category_id: category.id.clone(),
                subcategory_id: Some(group.clone()),
            })
            .unwrap();
        ids.push(page.id);
    }

    let engine = OrderingEngine::new(conn);
    // Deliberately not the natural store order
    engine
        .place(&OrderScope::Group(g1.clone()), &ids[1], None)
        .unwrap();
    engine
        .place(&OrderScope::Group(g1.clone()), &ids[0], None)
        .unwrap();
    engine
        .place(&OrderScope::Group(g2.clone()), &ids[2], None)
        .unwrap();
    engine
        .ensure_membership(&OrderScope::Global, &ids[2])
        .unwrap();

    (db, g1, g2, ids)
}

/// Export → import into a fresh database reproduces entities and exact
/// per-group order.
#[test]
fn test_round_trip_restores_exact_order() {
    let (source, g1, g2, ids) = build_source();
    let doc = source
        .with_transaction(TransactionMode::ReadOnly, backup::export)
        .unwrap();

    assert_eq!(doc.schema_version, SCHEMA_VERSION);
    assert_eq!(doc.webpages.len(), 3);
    assert_eq!(doc.orders.get(&g1).unwrap(), &vec![ids[1].clone(), ids[0].clone()]);

    let target = Database::open_in_memory().unwrap();
    target
        .with_transaction(TransactionMode::ReadWrite, |conn| {
            backup::import(conn, &doc)
        })
        .unwrap();

    let engine = OrderingEngine::new(target.connection());
    assert_eq!(
        engine.load(&OrderScope::Group(g1.clone())).unwrap(),
        vec![ids[1].clone(), ids[0].clone()]
    );
    assert_eq!(
        engine.load(&OrderScope::Group(g2)).unwrap(),
        vec![ids[2].clone()]
    );
    assert_eq!(
        engine.load(&OrderScope::Global).unwrap(),
        vec![ids[2].clone()]
    );

    let pages = WebpageManager::new(target.connection());
    let display = OrderingEngine::resolve_display_order(
        &pages.list_by_group(&g1).unwrap(),
        &engine.load(&OrderScope::Group(g1)).unwrap(),
    );
    let titles: Vec<&str> = display.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Page 2", "Page 1"]);
}

/// Import wholesale-replaces what was there before, including stale order
/// snapshots.
#[test]
fn test_import_replaces_existing_state() {
    let (source, _g1, _g2, _ids) = build_source();
    let doc = source
        .with_transaction(TransactionMode::ReadOnly, backup::export)
        .unwrap();

    // Target has its own unrelated state
    let target = Database::open_in_memory().unwrap();
    {
        let conn = target.connection();
        let mut collections = CollectionManager::new(conn);
        let org = collections.ensure_default_organization().unwrap();
        collections.create(&org.id, "Stale", None).unwrap();
        MetaStore::new(conn)
            .set_raw("order.subcat.stale-group", "[\"zombie\"]")
            .unwrap();
    }

    target
        .with_transaction(TransactionMode::ReadWrite, |conn| {
            backup::import(conn, &doc)
        })
        .unwrap();

    let collections = CollectionManager::new(target.connection());
    let orgs = collections.list_organizations().unwrap();
    assert_eq!(orgs.len(), 1);
    let names: Vec<String> = collections
        .list_by_organization(&orgs[0].id)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Work"]);

    let meta = MetaStore::new(target.connection());
    assert_eq!(meta.get_raw("order.subcat.stale-group").unwrap(), None);
}

/// Documents from an unknown schema version are rejected before any write.
#[test]
fn test_unsupported_schema_is_rejected() {
    let (source, _g1, _g2, _ids) = build_source();
    let mut doc: ExportDocument = source
        .with_transaction(TransactionMode::ReadOnly, backup::export)
        .unwrap();
    doc.schema_version = 99;

    let target = Database::open_in_memory().unwrap();
    {
        let mut collections = CollectionManager::new(target.connection());
        collections.ensure_default_organization().unwrap();
    }

    let result = target.with_transaction(TransactionMode::ReadWrite, |conn| {
        backup::import(conn, &doc)
    });
    assert!(matches!(result, Err(BackupError::UnsupportedSchema(99))));

    // Existing state untouched
    let collections = CollectionManager::new(target.connection());
    assert_eq!(collections.list_organizations().unwrap().len(), 1);
}
