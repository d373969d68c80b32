use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::{Value as JsonValue, json};
use tempfile::tempdir;

use panel_pipeline::report::render_report;
use panel_pipeline::{CachedStore, Dashboard, DashboardConfig, DocumentStore, FsDocumentStore};

fn write_docs(root: &Path, collection: &str, docs: &[(&str, JsonValue)]) {
    let dir = root.join(collection);
    fs::create_dir_all(&dir).unwrap();
    for (id, body) in docs {
        fs::write(dir.join(format!("{id}.json")), body.to_string()).unwrap();
    }
}

fn seed_export(root: &Path) {
    let config = DashboardConfig::default();
    write_docs(
        root,
        &config.collections.render_times,
        &[
            ("q1", json!({ "userId": "u1", "qr_rtime": 45.5, "timestamp": "2024-11-04T09:00:00Z" })),
            ("q2", json!({ "userId": "u2", "qr_rtime": 130, "timestamp": "2024-11-05T09:00:00Z" })),
            ("q3", json!({ "userId": "u3", "qr_rtime": "90", "timestamp": { "_seconds": 1730800800, "_nanoseconds": 0 } })),
        ],
    );
    write_docs(
        root,
        &config.collections.language_changes,
        &[
            ("l1", json!({ "userId": "u1", "language": "es", "timestamp": "2024-11-04T10:00:00Z" })),
            ("l2", json!({ "userId": "u1", "language": "en", "timestamp": "2024-11-10T10:00:00Z" })),
        ],
    );
    write_docs(root, "users", &[("u1", json!({})), ("u2", json!({})), ("u3", json!({})), ("u4", json!({}))]);
    write_docs(
        root,
        "stores",
        &[("s1", json!({ "name": "Corner Bakery" })), ("s2", json!({ "name": "Book Nook" }))],
    );
    write_docs(
        root,
        "loyaltyCards",
        &[
            ("c1", json!({ "storeId": "s1", "user_id": "u1", "isCurrent": true })),
            ("c2", json!({ "storeId": "s2", "user_id": "u2", "isCurrent": "false" })),
            ("c3", json!({ "storeId": "s1", "user_id": "u3", "isCurrent": true })),
        ],
    );
    write_docs(
        root,
        "purchases",
        &[
            ("p1", json!({ "cardId": "c1", "date": "2024-11-04T12:00:00Z", "total": 12.5 })),
            ("p2", json!({ "cardId": "c3", "date": "2024-11-04T13:00:00Z", "total": 7.5 })),
            ("p3", json!({ "cardId": "c2", "date": "2024-11-09T13:00:00Z", "total": 20 })),
            ("p4", json!({ "cardId": "c404", "date": "2024-11-10T13:00:00Z" })),
        ],
    );
}

#[test]
fn dashboard_runs_end_to_end_over_a_json_export() {
    let temp = tempdir().unwrap();
    seed_export(temp.path());
    let config = DashboardConfig::default();
    let store = CachedStore::new(FsDocumentStore::new(temp.path()), config.cache_ttl());
    let now = Utc.with_ymd_and_hms(2024, 11, 11, 0, 0, 0).unwrap();

    let dashboard = Dashboard::build(&store, &config, now);

    let render = dashboard.render_times.as_ref().unwrap();
    assert_eq!(render.total_measurements, 3);
    assert_eq!(render.max_ms, 130.0);
    assert_eq!(render.average_ms, 88.5);
    assert_eq!(render.over_target.to_string(), "33.3%");

    let loyalty = dashboard.loyalty.as_ref().unwrap();
    assert_eq!(loyalty.top_stores[0], ("Corner Bakery".to_string(), 2));
    assert_eq!(loyalty.total_cards, 3);

    assert_eq!(dashboard.activation.activated_users, 2);
    assert_eq!(dashboard.activation.activation_rate.to_string(), "50.0%");

    let language = dashboard.language.as_ref().unwrap();
    assert_eq!(language.metrics.users_with_any_change, 1);
    assert_eq!(language.metrics.switchers, 1);
    assert_eq!(language.weekdays.get("Monday"), Some(&1));
    assert_eq!(language.weekdays.get("Sunday"), Some(&1));

    let purchases = dashboard.purchases.as_ref().unwrap();
    assert_eq!(purchases.total_purchases, 4);
    assert_eq!(
        purchases.top_stores,
        vec![
            ("Corner Bakery".to_string(), 2),
            ("Book Nook".to_string(), 1),
            ("unknown".to_string(), 1)
        ]
    );
    assert_eq!(purchases.revenue, 40.0);
    assert_eq!(purchases.weekdays.get("Monday"), Some(&2));
    assert_eq!(purchases.totals.as_ref().map(|stats| stats.count), Some(3));

    let text = render_report(&dashboard);
    assert!(text.contains("Activation Rate: 50.0%"));
    assert!(text.contains("1. Corner Bakery: 2"));
}

#[test]
fn cached_store_serves_repeat_panels_from_memory() {
    let temp = tempdir().unwrap();
    seed_export(temp.path());
    let config = DashboardConfig::default();
    let store = CachedStore::new(FsDocumentStore::new(temp.path()), Duration::from_secs(300));
    let now = Utc.with_ymd_and_hms(2024, 11, 11, 0, 0, 0).unwrap();

    let first = Dashboard::build(&store, &config, now);
    fs::remove_dir_all(temp.path().join("users")).unwrap();
    let second = Dashboard::build(&store, &config, now);
    assert_eq!(first, second);
    assert!(store.stats().hits > 0);

    store.clear();
    assert!(store.fetch_collection("users").is_err());
    let third = Dashboard::build(&store, &config, now);
    assert_eq!(third.activation.total_users, 0);
    assert!(third.activation.activation_rate.is_undefined());
}

#[test]
fn malformed_collection_degrades_to_no_data() {
    let temp = tempdir().unwrap();
    seed_export(temp.path());
    fs::write(temp.path().join("purchases").join("broken.json"), "{").unwrap();
    let store = FsDocumentStore::new(temp.path());
    let now = Utc.with_ymd_and_hms(2024, 11, 11, 0, 0, 0).unwrap();

    let dashboard = Dashboard::build(&store, &DashboardConfig::default(), now);
    assert!(dashboard.purchases.is_none());
    assert!(dashboard.render_times.is_some());
}
