//! Property-based tests for card URL validation and normalization.
//!
//! For arbitrary well-formed http(s) URLs, creation must succeed and store
//! a canonical form that is stable under re-normalization; non-http(s)
//! schemes must always be rejected without creating a record.

use linktrove::database::Database;
use linktrove::managers::collection_manager::{CollectionManager, CollectionManagerTrait};
use linktrove::managers::group_manager::{GroupManager, GroupManagerTrait};
use linktrove::managers::webpage_manager::{WebpageManager, WebpageManagerTrait};
use linktrove::types::errors::WebpageError;
use linktrove::types::webpage::WebpageDraft;
use proptest::prelude::*;

/// Strategy for generating valid URL strings, including mixed-case hosts
/// that normalization must lowercase.
fn arb_url() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("https"), Just("http")],
        "[a-zA-Z][a-zA-Z0-9]{2,15}",
        prop_oneof![Just(".com"), Just(".org"), Just(".net"), Just(".io")],
        proptest::option::of("/[a-z0-9]{1,10}"),
    )
        .prop_map(|(scheme, host, tld, path)| {
            format!("{}://{}{}{}", scheme, host, tld, path.unwrap_or_default())
        })
}

/// Strategy for URLs with schemes the engine must refuse.
fn arb_rejected_url() -> impl Strategy<Value = String> {
    (
        prop_oneof![
            Just("javascript"),
            Just("ftp"),
            Just("file"),
            Just("data"),
            Just("chrome")
        ],
        "[a-z0-9]{1,12}",
    )
        .prop_map(|(scheme, rest)| format!("{}:{}", scheme, rest))
}

fn setup() -> (Database, String, String) {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    let (category_id, group_id) = {
        let conn = db.connection();
        let mut collections = CollectionManager::new(conn);
        let org = collections.ensure_default_organization().unwrap();
        let category = collections.create(&org.id, "Work", None).unwrap();
        let mut groups = GroupManager::new(conn);
        let group = groups.create(&category.id, "Inbox").unwrap();
        (category.id, group.id)
    };
    (db, category_id, group_id)
}

// **Property: valid URLs round-trip canonically**
//
// *For any* valid http(s) URL, create stores a canonical absolute URL that
// re-normalizes to itself and is retrievable unchanged.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn valid_urls_normalize_and_round_trip(url in arb_url()) {
        let (db, category_id, group_id) = setup();
        let mut manager = WebpageManager::new(db.connection());

        let page = manager
            .create(&WebpageDraft {
                url: url.clone(),
                title: None,
                favicon: None,
                note: None,
                category_id,
                subcategory_id: Some(group_id),
            })
            .expect("create should succeed for valid http(s) URLs");

        // Canonical form is stable under re-normalization
        let renormalized = WebpageManager::normalize_url(&page.url).unwrap();
        prop_assert_eq!(&renormalized, &page.url, "normalization must be idempotent");

        // Host is lowercased in the canonical form
        prop_assert_eq!(page.url.to_lowercase(), page.url.clone());

        // Retrievable with the canonical URL
        let loaded = manager.get(&page.id).unwrap();
        prop_assert_eq!(loaded.url, page.url);
    }
}

// **Property: non-http(s) schemes always rejected**
//
// *For any* URL with a refused scheme, create fails with InvalidUrl and
// leaves the store empty.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn rejected_schemes_create_no_record(url in arb_rejected_url()) {
        let (db, category_id, group_id) = setup();
        let mut manager = WebpageManager::new(db.connection());

        let result = manager.create(&WebpageDraft {
            url,
            title: None,
            favicon: None,
            note: None,
            category_id: category_id.clone(),
            subcategory_id: Some(group_id),
        });

        prop_assert!(matches!(result, Err(WebpageError::InvalidUrl(_))));
        prop_assert!(manager.list_by_collection(&category_id).unwrap().is_empty());
    }
}
