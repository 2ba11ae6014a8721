//! LinkTrove Core — console demo.
//!
//! Walks each engine component against an in-memory database: stores,
//! ordering, the drag protocol, backup export and the sync reconciler.

use std::sync::Arc;

use linktrove::app::App;
use linktrove::database::TransactionMode;
use linktrove::managers::collection_manager::{CollectionManager, CollectionManagerTrait};
use linktrove::managers::group_manager::{GroupManager, GroupManagerTrait};
use linktrove::managers::ordering_engine::{OrderScope, OrderingEngine};
use linktrove::managers::webpage_manager::{WebpageManager, WebpageManagerTrait};
use linktrove::services::backup;
use linktrove::services::sync_reconciler::{BackupTransport, SyncReconciler, DEBOUNCE_MS};
use linktrove::types::drag::{DragSource, DropPosition, DropTarget, TabPayload};
use linktrove::types::errors::SyncError;
use linktrove::types::sync::RemoteMeta;
use linktrove::types::webpage::WebpageDraft;

fn section(name: &str) {
    println!("───────────────────────────────────────────────");
    println!("  {}", name);
    println!("───────────────────────────────────────────────");
}

/// In-memory transport so the demo runs without network access.
struct MemoryTransport {
    stored: Option<(i64, String)>,
    uploads: usize,
}

impl BackupTransport for MemoryTransport {
    fn upload(&mut self, body: &str, now_ms: i64) -> Result<RemoteMeta, SyncError> {
        self.stored = Some((now_ms, body.to_string()));
        self.uploads += 1;
        Ok(RemoteMeta {
            modified_at: now_ms,
            checksum: None,
        })
    }

    fn head(&mut self) -> Result<Option<RemoteMeta>, SyncError> {
        Ok(self.stored.as_ref().map(|(at, _)| RemoteMeta {
            modified_at: *at,
            checksum: None,
        }))
    }

    fn download(&mut self) -> Result<(RemoteMeta, String), SyncError> {
        let (at, body) = self
            .stored
            .clone()
            .ok_or_else(|| SyncError::NetworkError(String::from("no backup stored")))?;
        Ok((
            RemoteMeta {
                modified_at: at,
                checksum: None,
            },
            body,
        ))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("LinkTrove Core v{} — demo mode", env!("CARGO_PKG_VERSION"));
    println!();

    let app = App::new_in_memory()?;
    app.startup()?;

    section("Collections and groups");
    let conn = app.db.connection();
    let (org, category) = {
        let mut collections = CollectionManager::new(conn);
        let org = collections.ensure_default_organization()?;
        let category = collections
            .list_by_organization(&org.id)?
            .into_iter()
            .next()
            .expect("startup seeds a collection");
        (org, category)
    };
    let (inbox, reading) = {
        let mut groups = GroupManager::new(conn);
        let inbox = groups
            .list_by_category(&category.id)?
            .into_iter()
            .next()
            .expect("startup seeds a group");
        let reading = groups.create(&category.id, "Reading list")?;
        (inbox, reading)
    };
    println!("organization: {}", org.name);
    println!("collection:   {} ({})", category.name, category.id);
    println!("groups:       {} / {}", inbox.name, reading.name);

    section("Cards");
    let mut saved = Vec::new();
    for url in [
        "https://www.rust-lang.org/learn",
        "https://docs.rs/rusqlite",
        "https://blog.example.com/a-long-read",
    ] {
        let page = app.create_card_from_tab(&WebpageDraft {
            url: url.to_string(),
            title: None,
            favicon: None,
            note: None,
            category_id: category.id.clone(),
            subcategory_id: Some(inbox.id.clone()),
        })?;
        println!("saved: {} — {}", page.title, page.url);
        saved.push(page);
    }

    section("Ordering");
    {
        let ordering = OrderingEngine::new(app.db.connection());
        let scope = OrderScope::Group(inbox.id.clone());
        let order = ordering.reorder(&scope, &saved[0].id, &saved[2].id)?;
        println!("after reorder: {:?}", order);
    }

    section("Drag and drop");
    app.drag.begin(DragSource::NewTab {
        payload: TabPayload {
            url: String::from("https://github.com/trending"),
            title: Some(String::from("Trending")),
            favicon: None,
            tab_id: None,
        },
    });
    app.drag.target(DropTarget {
        category_id: category.id.clone(),
        group_id: reading.id.clone(),
        position: DropPosition::AtEnd,
    });
    let outcome = app.drag.commit().await?;
    println!("drop outcome: {:?}", outcome);
    for page in app.cards_in_display_order(&reading.id)? {
        println!("  {} — {}", page.title, page.url);
    }

    section("Backup and sync");
    let doc = app
        .db
        .with_transaction(TransactionMode::ReadOnly, backup::export)?;
    println!(
        "export: {} collections, {} groups, {} cards",
        doc.categories.len(),
        doc.subcategories.len(),
        doc.webpages.len()
    );

    let transport = MemoryTransport {
        stored: None,
        uploads: 0,
    };
    let mut sync = SyncReconciler::new(Arc::clone(&app.db), transport);
    let mut now_ms = 1_000;
    sync.connect(now_ms);
    // Three rapid changes collapse into a single debounced upload.
    for _ in 0..3 {
        now_ms += 100;
        sync.note_local_change(now_ms);
    }
    sync.poll(now_ms + DEBOUNCE_MS);
    let status = sync.status();
    println!(
        "sync: connected={} uploaded_at={:?} checksum={}",
        status.connected,
        status.last_uploaded_at,
        status
            .last_checksum
            .as_deref()
            .map(|c| &c[..12.min(c.len())])
            .unwrap_or("-")
    );

    // Keep the webpage manager's search path exercised in the demo too.
    let hits = WebpageManager::new(app.db.connection()).search("rust")?;
    println!("search 'rust': {} hit(s)", hits.len());

    println!();
    println!("All components demonstrated.");
    Ok(())
}
