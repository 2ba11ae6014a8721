//! Unit tests for the group (subcategory) store and the application-level
//! last-group guard.
//!
//! The store itself does not enforce the "a collection keeps at least one
//! group" invariant — that split is intentional, so both the guarded App
//! path and the unguarded direct store path are covered here.

use linktrove::app::App;
use linktrove::database::Database;
use linktrove::managers::collection_manager::{CollectionManager, CollectionManagerTrait};
use linktrove::managers::group_manager::{GroupManager, GroupManagerTrait};
use linktrove::managers::webpage_manager::{WebpageManager, WebpageManagerTrait};
use linktrove::types::errors::GroupError;
use linktrove::types::webpage::WebpageDraft;

fn setup() -> (Database, String) {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    let category_id = {
        let conn = db.connection();
        let mut collections = CollectionManager::new(conn);
        let org = collections.ensure_default_organization().unwrap();
        collections.create(&org.id, "Work", None).unwrap().id
    };
    (db, category_id)
}

fn add_card(db: &Database, category_id: &str, group_id: &str, url: &str) -> String {
    let mut pages = WebpageManager::new(db.connection());
    pages
        .create(&WebpageDraft {
            url: url.to_string(),
            title: None,
            favicon: None,
            note: None,
            category_id: category_id.to_string(),
            subcategory_id: Some(group_id.to_string()),
        })
        .unwrap()
        .id
}

/// Groups get consecutive integer positions (max existing + 1).
#[test]
fn test_create_assigns_next_position() {
    let (db, category_id) = setup();
    let mut mgr = GroupManager::new(db.connection());

    let g1 = mgr.create(&category_id, "First").unwrap();
    let g2 = mgr.create(&category_id, "Second").unwrap();
    assert_eq!(g1.position, 0);
    assert_eq!(g2.position, 1);

    let listed = mgr.list_by_category(&category_id).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, g1.id);
    assert_eq!(listed[1].id, g2.id);
}

/// Creating a group in a missing collection fails.
#[test]
fn test_create_requires_live_collection() {
    let (db, _category_id) = setup();
    let mut mgr = GroupManager::new(db.connection());

    assert!(matches!(
        mgr.create("ghost", "Orphans"),
        Err(GroupError::CategoryNotFound(_))
    ));
}

/// Renaming to an empty string falls back to the default name instead of
/// erroring.
#[test]
fn test_rename_empty_falls_back_to_default() {
    let (db, category_id) = setup();
    let mut mgr = GroupManager::new(db.connection());

    let group = mgr.create(&category_id, "Inbox").unwrap();
    let renamed = mgr.rename(&group.id, "   ").unwrap();
    assert_eq!(renamed.name, "group");

    let renamed = mgr.rename(&group.id, "  Reading  ").unwrap();
    assert_eq!(renamed.name, "Reading");
}

/// Reorder is a merge, not a destructive replace: groups missing from the
/// input keep their relative order after the listed ones.
#[test]
fn test_reorder_merges_stale_input() {
    let (db, category_id) = setup();
    let mut mgr = GroupManager::new(db.connection());

    let a = mgr.create(&category_id, "A").unwrap();
    let b = mgr.create(&category_id, "B").unwrap();
    let c = mgr.create(&category_id, "C").unwrap();
    let d = mgr.create(&category_id, "D").unwrap();

    // Client only knew about a, b, c and wants c first; d was created by
    // another window and must survive, after the listed ones.
    let reordered = mgr
        .reorder(&category_id, &[c.id.clone(), a.id.clone(), b.id.clone()])
        .unwrap();
    let ids: Vec<&str> = reordered.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec![c.id.as_str(), a.id.as_str(), b.id.as_str(), d.id.as_str()]);

    // Unknown ids in the input are ignored entirely
    let reordered = mgr
        .reorder(&category_id, &["ghost".to_string(), b.id.clone()])
        .unwrap();
    let ids: Vec<&str> = reordered.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec![b.id.as_str(), c.id.as_str(), a.id.as_str(), d.id.as_str()]);
}

/// Deleting with reassignment keeps both cards, now under the surviving
/// group; deleting with pages removes the cards while a sibling group's
/// cards are untouched.
#[test]
fn test_reassign_delete_vs_delete_with_pages() {
    let (db, category_id) = setup();
    let (g1, g2) = {
        let mut mgr = GroupManager::new(db.connection());
        (
            mgr.create(&category_id, "G1").unwrap().id,
            mgr.create(&category_id, "G2").unwrap().id,
        )
    };
    let card_a = add_card(&db, &category_id, &g1, "https://example.com/a");
    let card_b = add_card(&db, &category_id, &g1, "https://example.com/b");
    let card_c = add_card(&db, &category_id, &g2, "https://example.com/c");

    // Mode (a): reassign
    {
        let mut mgr = GroupManager::new(db.connection());
        mgr.delete_reassign(&g1, &g2).unwrap();
        assert!(matches!(mgr.get(&g1), Err(GroupError::NotFound(_))));
    }
    let pages = WebpageManager::new(db.connection());
    let in_g2: Vec<String> = pages
        .list_by_group(&g2)
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert!(in_g2.contains(&card_a));
    assert!(in_g2.contains(&card_b));
    assert!(in_g2.contains(&card_c));

    // Mode (b): delete with pages, against a rebuilt two-group layout
    let g3 = {
        let mut mgr = GroupManager::new(db.connection());
        mgr.create(&category_id, "G3").unwrap().id
    };
    let card_d = add_card(&db, &category_id, &g3, "https://example.com/d");

    {
        let mut mgr = GroupManager::new(db.connection());
        let mut removed = mgr.delete_with_pages(&g2).unwrap();
        removed.sort();
        let mut expected = vec![card_a.clone(), card_b.clone(), card_c.clone()];
        expected.sort();
        assert_eq!(removed, expected);
    }

    let pages = WebpageManager::new(db.connection());
    assert!(pages.list_by_group(&g2).unwrap().is_empty());
    let in_g3: Vec<String> = pages
        .list_by_group(&g3)
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(in_g3, vec![card_d]);
}

/// Reassigning to a missing group is rejected before any mutation, so no
/// card is orphaned.
#[test]
fn test_delete_reassign_requires_surviving_group() {
    let (db, category_id) = setup();
    let g1 = {
        let mut mgr = GroupManager::new(db.connection());
        mgr.create(&category_id, "G1").unwrap().id
    };
    let card = add_card(&db, &category_id, &g1, "https://example.com/a");

    let mut mgr = GroupManager::new(db.connection());
    assert!(matches!(
        mgr.delete_reassign(&g1, "ghost"),
        Err(GroupError::NotFound(_))
    ));

    // Group and card both survive the rejected call
    assert!(mgr.get(&g1).is_ok());
    let pages = WebpageManager::new(db.connection());
    assert_eq!(pages.list_by_group(&g1).unwrap()[0].id, card);
}

/// The direct store call happily deletes the last group — the invariant is
/// an application-level precondition, not a store rule.
#[test]
fn test_unguarded_store_call_deletes_last_group() {
    let (db, category_id) = setup();
    let mut mgr = GroupManager::new(db.connection());

    let only = mgr.create(&category_id, "Only").unwrap();
    mgr.delete_with_pages(&only.id).unwrap();
    assert_eq!(mgr.count_by_category(&category_id).unwrap(), 0);
}

/// The guarded App path rejects deleting the last group and leaves the
/// count at 1; with two groups the deletion goes through.
#[test]
fn test_guarded_app_path_protects_last_group() {
    let app = App::new_in_memory().unwrap();
    app.startup().unwrap();

    let conn = app.db.connection();
    let category_id = {
        let mut collections = CollectionManager::new(conn);
        let org = collections.ensure_default_organization().unwrap();
        collections.list_by_organization(&org.id).unwrap()[0].id.clone()
    };
    let only_group = {
        let groups = GroupManager::new(conn);
        groups.list_by_category(&category_id).unwrap()[0].id.clone()
    };

    assert!(matches!(
        app.delete_group_with_pages(&only_group),
        Err(GroupError::LastGroup(_))
    ));
    {
        let groups = GroupManager::new(app.db.connection());
        assert_eq!(groups.count_by_category(&category_id).unwrap(), 1);
    }

    let second = {
        let mut groups = GroupManager::new(app.db.connection());
        groups.create(&category_id, "Second").unwrap().id
    };
    app.delete_group_with_pages(&second).unwrap();
    let groups = GroupManager::new(app.db.connection());
    assert_eq!(groups.count_by_category(&category_id).unwrap(), 1);
}

/// A collection with zero groups gets the default group auto-created.
#[test]
fn test_ensure_default_creates_group_when_none() {
    let (db, category_id) = setup();
    let mut mgr = GroupManager::new(db.connection());

    let created = mgr.ensure_default(&category_id).unwrap();
    assert_eq!(created.as_ref().map(|g| g.name.as_str()), Some("group"));

    // Second call is a no-op
    assert!(mgr.ensure_default(&category_id).unwrap().is_none());
    assert_eq!(mgr.count_by_category(&category_id).unwrap(), 1);
}
