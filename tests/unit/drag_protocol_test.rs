//! Unit tests for the drag-and-drop mutation protocol.
//!
//! Covers session lifecycle transitions, payload codecs, commit paths for
//! new tabs and existing cards, native side effects, and serialization of
//! rapid double-drops.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use linktrove::app::App;
use linktrove::managers::collection_manager::{CollectionManager, CollectionManagerTrait};
use linktrove::managers::group_manager::{GroupManager, GroupManagerTrait};
use linktrove::managers::ordering_engine::{OrderScope, OrderingEngine};
use linktrove::managers::webpage_manager::{WebpageManager, WebpageManagerTrait};
use linktrove::services::drag_drop::{
    decode_payload, encode_source, BrowserTabHost, CommitOutcome, DragDropController, DragState,
};
use linktrove::types::drag::{
    DragSource, DropPosition, DropTarget, TabPayload, MIME_CARD, MIME_TAB,
};
use linktrove::types::webpage::WebpageDraft;

struct Fixture {
    app: App,
    category_id: String,
    inbox: String,
    later: String,
}

fn setup() -> Fixture {
    let app = App::new_in_memory().unwrap();
    app.startup().unwrap();
    let (category_id, inbox, later) = {
        let conn = app.db.connection();
        let mut collections = CollectionManager::new(conn);
        let org = collections.ensure_default_organization().unwrap();
        let category = collections.list_by_organization(&org.id).unwrap()[0].clone();
        let mut groups = GroupManager::new(conn);
        let inbox = groups.list_by_category(&category.id).unwrap()[0].clone();
        let later = groups.create(&category.id, "Later").unwrap();
        (category.id, inbox.id, later.id)
    };
    Fixture {
        app,
        category_id,
        inbox,
        later,
    }
}

fn save_card(fixture: &Fixture, group: &str, url: &str) -> String {
    fixture
        .app
        .create_card_from_tab(&WebpageDraft {
            url: url.to_string(),
            title: None,
            favicon: None,
            note: None,
            category_id: fixture.category_id.clone(),
            subcategory_id: Some(group.to_string()),
        })
        .unwrap()
        .id
}

fn target(fixture: &Fixture, group: &str, position: DropPosition) -> DropTarget {
    DropTarget {
        category_id: fixture.category_id.clone(),
        group_id: group.to_string(),
        position,
    }
}

/// begin → target → cancel walks the session state machine and ends Idle.
#[test]
fn test_session_lifecycle_transitions() {
    let fixture = setup();
    let drag = &fixture.app.drag;
    assert_eq!(drag.state(), DragState::Idle);

    let source = DragSource::ExistingCard {
        id: "card".to_string(),
    };
    drag.begin(source.clone());
    assert!(matches!(drag.state(), DragState::Dragging { .. }));

    drag.target(target(&fixture, &fixture.inbox, DropPosition::AtEnd));
    assert!(matches!(drag.state(), DragState::Targeting { .. }));

    // Pointer left the surface: back to Dragging with the source kept
    drag.clear_target();
    assert_eq!(drag.state(), DragState::Dragging { source });

    // Global dragend is the authoritative cleanup
    drag.cancel();
    assert_eq!(drag.state(), DragState::Idle);
}

/// Payload codecs: bare id for cards, JSON for tabs, unknown MIME rejected.
#[test]
fn test_payload_codecs_round_trip() {
    let card = DragSource::ExistingCard {
        id: "abc-123".to_string(),
    };
    let (mime, data) = encode_source(&card).unwrap();
    assert_eq!(mime, MIME_CARD);
    assert_eq!(data, "abc-123");
    assert_eq!(decode_payload(mime, &data).unwrap(), card);

    let tab = DragSource::NewTab {
        payload: TabPayload {
            url: "https://example.com/t".to_string(),
            title: Some("T".to_string()),
            favicon: None,
            tab_id: None,
        },
    };
    let (mime, data) = encode_source(&tab).unwrap();
    assert_eq!(mime, MIME_TAB);
    assert_eq!(decode_payload(mime, &data).unwrap(), tab);

    let native = DragSource::NativeTab { tab_id: 99 };
    let (mime, data) = encode_source(&native).unwrap();
    assert_eq!(decode_payload(mime, &data).unwrap(), native);

    assert!(decode_payload("text/plain", "x").is_err());
    assert!(decode_payload(MIME_CARD, "   ").is_err());
}

/// Dropping a new tab creates a card in the target group at the requested
/// position, in one pass over record and order list.
#[tokio::test]
async fn test_new_tab_drop_creates_card_at_position() {
    let fixture = setup();
    let existing = save_card(&fixture, &fixture.inbox, "https://example.com/existing");

    fixture.app.drag.begin(DragSource::NewTab {
        payload: TabPayload {
            url: "https://example.com/dropped".to_string(),
            title: Some("Dropped".to_string()),
            favicon: None,
            tab_id: None,
        },
    });
    fixture.app.drag.target(target(
        &fixture,
        &fixture.inbox,
        DropPosition::Before(existing.clone()),
    ));
    let outcome = fixture.app.drag.commit().await.unwrap();

    let created = match outcome {
        CommitOutcome::CreatedCard(page) => page,
        other => panic!("expected CreatedCard, got {:?}", other),
    };
    assert_eq!(created.title, "Dropped");
    assert_eq!(created.subcategory_id.as_deref(), Some(fixture.inbox.as_str()));

    let order = OrderingEngine::new(fixture.app.db.connection())
        .load(&OrderScope::Group(fixture.inbox.clone()))
        .unwrap();
    assert_eq!(order, vec![created.id.clone(), existing]);
    assert_eq!(fixture.app.drag.state(), DragState::Idle);
}

/// Moving an existing card to another group updates its fields and both
/// order lists atomically.
#[tokio::test]
async fn test_existing_card_moves_between_groups() {
    let fixture = setup();
    let a = save_card(&fixture, &fixture.inbox, "https://example.com/a");
    let b = save_card(&fixture, &fixture.inbox, "https://example.com/b");
    let c = save_card(&fixture, &fixture.later, "https://example.com/c");

    fixture.app.drag.begin(DragSource::ExistingCard { id: a.clone() });
    fixture.app.drag.target(target(
        &fixture,
        &fixture.later,
        DropPosition::Before(c.clone()),
    ));
    let outcome = fixture.app.drag.commit().await.unwrap();
    assert_eq!(
        outcome,
        CommitOutcome::MovedCard {
            id: a.clone(),
            group_id: fixture.later.clone(),
        }
    );

    let pages = WebpageManager::new(fixture.app.db.connection());
    let moved = pages.get(&a).unwrap();
    assert_eq!(moved.subcategory_id.as_deref(), Some(fixture.later.as_str()));

    let engine = OrderingEngine::new(fixture.app.db.connection());
    assert_eq!(
        engine.load(&OrderScope::Group(fixture.inbox.clone())).unwrap(),
        vec![b]
    );
    assert_eq!(
        engine.load(&OrderScope::Group(fixture.later.clone())).unwrap(),
        vec![a, c]
    );
}

/// Dropping a card onto itself is a no-op and mutates nothing.
#[tokio::test]
async fn test_self_drop_is_noop() {
    let fixture = setup();
    let a = save_card(&fixture, &fixture.inbox, "https://example.com/a");
    let b = save_card(&fixture, &fixture.inbox, "https://example.com/b");

    fixture.app.drag.begin(DragSource::ExistingCard { id: a.clone() });
    fixture.app.drag.target(target(
        &fixture,
        &fixture.inbox,
        DropPosition::Before(a.clone()),
    ));
    let outcome = fixture.app.drag.commit().await.unwrap();
    assert_eq!(outcome, CommitOutcome::NoOp);

    let order = OrderingEngine::new(fixture.app.db.connection())
        .load(&OrderScope::Group(fixture.inbox.clone()))
        .unwrap();
    assert_eq!(order, vec![b, a]);
}

/// A card deleted mid-drag resolves to NoOp instead of an error.
#[tokio::test]
async fn test_vanished_card_is_noop() {
    let fixture = setup();
    let a = save_card(&fixture, &fixture.inbox, "https://example.com/a");

    fixture.app.drag.begin(DragSource::ExistingCard { id: a.clone() });
    fixture.app.drag.target(target(&fixture, &fixture.later, DropPosition::AtEnd));
    fixture.app.delete_card(&a).unwrap();

    let outcome = fixture.app.drag.commit().await.unwrap();
    assert_eq!(outcome, CommitOutcome::NoOp);
}

/// A drop with no recorded target is a cancellation, not an error.
#[tokio::test]
async fn test_commit_without_target_is_cancellation() {
    let fixture = setup();
    fixture.app.drag.begin(DragSource::ExistingCard {
        id: "card".to_string(),
    });
    let outcome = fixture.app.drag.commit().await.unwrap();
    assert_eq!(outcome, CommitOutcome::NoOp);
    assert_eq!(fixture.app.drag.state(), DragState::Idle);
}

/// Two rapid drops serialize: the first commit mutates, the second finds
/// the session consumed and no-ops instead of interleaving.
#[tokio::test]
async fn test_double_drop_serializes() {
    let fixture = setup();
    let a = save_card(&fixture, &fixture.inbox, "https://example.com/a");

    fixture.app.drag.begin(DragSource::ExistingCard { id: a.clone() });
    fixture.app.drag.target(target(&fixture, &fixture.later, DropPosition::AtEnd));

    let (first, second) = tokio::join!(fixture.app.drag.commit(), fixture.app.drag.commit());
    let outcomes = [first.unwrap(), second.unwrap()];

    let moved = outcomes
        .iter()
        .filter(|o| matches!(o, CommitOutcome::MovedCard { .. }))
        .count();
    let noops = outcomes
        .iter()
        .filter(|o| matches!(o, CommitOutcome::NoOp))
        .count();
    assert_eq!((moved, noops), (1, 1));

    // Exactly one application of the move
    let order = OrderingEngine::new(fixture.app.db.connection())
        .load(&OrderScope::Group(fixture.later.clone()))
        .unwrap();
    assert_eq!(order.iter().filter(|id| **id == a).count(), 1);
}

/// Native tab drops go through the host side effect and flag a refresh;
/// the engine stores nothing itself.
#[tokio::test]
async fn test_native_tab_drop_calls_host() {
    struct CountingHost {
        moves: AtomicUsize,
    }
    impl BrowserTabHost for CountingHost {
        fn move_tab(&self, _tab_id: i64, _target_group: &str) -> Result<(), String> {
            self.moves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn move_tab_group(&self, _group_id: i64, _target_group: &str) -> Result<(), String> {
            Ok(())
        }
    }

    let fixture = setup();
    let host = Arc::new(CountingHost {
        moves: AtomicUsize::new(0),
    });
    let drag = DragDropController::new(fixture.app.db.clone()).with_host(host.clone());

    drag.begin(DragSource::NativeTab { tab_id: 7 });
    drag.target(target(&fixture, &fixture.inbox, DropPosition::AtEnd));
    let outcome = drag.commit().await.unwrap();

    assert_eq!(outcome, CommitOutcome::NativeTabMoved { tab_id: 7 });
    assert_eq!(host.moves.load(Ordering::SeqCst), 1);
    assert!(drag.take_pending_refresh());
    assert!(!drag.take_pending_refresh());

    let pages = WebpageManager::new(fixture.app.db.connection());
    assert!(pages.list_by_group(&fixture.inbox).unwrap().is_empty());
}
