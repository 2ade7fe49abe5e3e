//! Behaviour every RecordStore backend must share, run against the
//! in-memory store, the filesystem store and Postgres.
//! The Postgres cases are skipped unless DATABASE_TEST_URL is set.

use chrono::{TimeZone, Utc};
use driftnet_common::{GeoPoint, RecordId, WebPage};
use driftnet_store::{mirror_missing, FileStore, MemoryStore, PgStore, RecordStore, StoreError};
use sqlx::PgPool;

fn page(url: &str, text: &str, labels: &[&str]) -> WebPage {
    WebPage::builder()
        .id(RecordId::derive(url).unwrap())
        .url(url)
        .domain(driftnet_common::derive_domain(url).unwrap())
        .text(text)
        .html(format!("<html><body><p>{text}</p></body></html>"))
        .labels(labels.iter().map(|l| l.to_string()).collect())
        .captured_at(Utc.with_ymd_and_hms(2024, 9, 19, 12, 0, 0).unwrap())
        .geo(vec![GeoPoint::new(38.8974, -77.0365).unwrap()])
        .build()
}

/// A migrated Postgres store with `index` emptied, or `None` without a test DB.
/// Every case owns its index so the cases can run concurrently.
async fn pg_store(index: &str) -> Option<PgStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PgStore::new(pool.clone());
    store.migrate().await.ok()?;

    sqlx::query("DELETE FROM driftnet_records WHERE index_name = $1 OR index_name = $1 || '_other'")
        .bind(index)
        .execute(&pool)
        .await
        .ok()?;

    Some(store)
}

async fn save_get_exists(store: &dyn RecordStore, index: &str) {
    let p = page("https://www.nytimes.com/covid.html", "Covid in nursing homes", &["news", "politics"]);
    assert!(!store.exists(index, &p.id).await.unwrap());
    assert!(store.get(index, &p.id).await.unwrap().is_none());

    store.save(index, &p).await.unwrap();
    assert!(store.exists(index, &p.id).await.unwrap());
    assert_eq!(store.get(index, &p.id).await.unwrap(), Some(p.clone()));
    assert_eq!(store.count(index).await.unwrap(), 1);
}

async fn indexes_are_isolated(store: &dyn RecordStore, index: &str) {
    let other = format!("{index}_other");
    let p = page("https://example.com/a", "alpha", &[]);
    store.save(index, &p).await.unwrap();
    assert!(!store.exists(&other, &p.id).await.unwrap());
    assert_eq!(store.count(&other).await.unwrap(), 0);
    assert!(store.list(&other).await.unwrap().is_empty());
}

async fn delete_then_resave(store: &dyn RecordStore, index: &str) {
    let original = page("https://example.com/a", "first version", &["news"]);
    store.save(index, &original).await.unwrap();

    assert!(store.delete(index, &original.id).await.unwrap());
    assert!(!store.exists(index, &original.id).await.unwrap());
    assert!(!store.delete(index, &original.id).await.unwrap());
    assert_eq!(store.count(index).await.unwrap(), 0);

    let mut replacement = original.clone();
    replacement.text = "second version".to_string();
    store.save(index, &replacement).await.unwrap();

    assert!(store.exists(index, &original.id).await.unwrap());
    let got = store.get(index, &original.id).await.unwrap().unwrap();
    assert_eq!(got.text, "second version");
}

async fn save_overwrites(store: &dyn RecordStore, index: &str) {
    let mut p = page("https://example.com/a", "one", &["a"]);
    store.save(index, &p).await.unwrap();
    p.labels = vec![];
    p.geo = vec![];
    p.text = "two".to_string();
    store.save(index, &p).await.unwrap();

    assert_eq!(store.count(index).await.unwrap(), 1);
    assert_eq!(store.get(index, &p.id).await.unwrap(), Some(p));
}

async fn list_is_sorted_and_complete(store: &dyn RecordStore, index: &str) {
    let urls = ["https://c.com/", "https://a.com/", "https://B.com/x", "https://b.com/"];
    for url in urls {
        store.save(index, &page(url, "x", &[])).await.unwrap();
    }
    let ids = store.list(index).await.unwrap();
    let mut expected: Vec<RecordId> = urls.iter().map(|u| RecordId::derive(u).unwrap()).collect();
    expected.sort();
    assert_eq!(ids, expected);
    assert_eq!(store.get_all(index).await.unwrap().len(), 4);
}

async fn search_bar_filters(store: &dyn RecordStore, index: &str) {
    let other = format!("{index}_other");
    store
        .save(index, &page("https://www.nytimes.com/covid.html", "Covid spread in nursing homes", &["politics"]))
        .await
        .unwrap();
    store
        .save(index, &page("https://cooking.nytimes.com/roast", "A slow roast", &["food"]))
        .await
        .unwrap();
    store
        .save(index, &page("https://astrorobotic.medium.com/post", "Covid essay", &["news"]))
        .await
        .unwrap();
    store
        .save(&other, &page("https://www.nytimes.com/other.html", "Covid elsewhere", &["food"]))
        .await
        .unwrap();

    let hits = store.search_bar(index, "domain:nytimes.com text:covid").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "https://www.nytimes.com/covid.html");

    let hits = store.search_bar(index, "labels:food").await.unwrap();
    assert_eq!(hits.len(), 1);

    let hits = store.search_any(index, "politics food").await.unwrap();
    assert_eq!(hits.len(), 2);

    let hits = store.search_any(index, "https://cooking.nytimes.com/roast").await.unwrap();
    assert_eq!(hits.len(), 1);

    assert!(matches!(
        store.search_bar(index, "html:body").await,
        Err(StoreError::Query(_))
    ));
}

async fn hits(store: &dyn RecordStore, index: &str, query: &str) -> usize {
    store.search_bar(index, query).await.unwrap().len()
}

async fn text_search_semantics(store: &dyn RecordStore, index: &str) {
    store
        .save(index, &page("https://example.com/cats", "Cats rule nursing homes", &[]))
        .await
        .unwrap();
    store
        .save(index, &page("https://example.com/code", "I write c++ (mostly) and .net daily", &[]))
        .await
        .unwrap();

    // Word-start prefixes, any case.
    assert_eq!(hits(store, index, "text:cat").await, 1);
    assert_eq!(hits(store, index, "text:NURS").await, 1);
    assert_eq!(hits(store, index, "text:ule").await, 0);
    assert_eq!(hits(store, index, "text:ats").await, 0);

    // Phrases are matched in order.
    assert_eq!(hits(store, index, r#"text:"nursing homes""#).await, 1);
    assert_eq!(hits(store, index, r#"text:"homes nursing""#).await, 0);

    // Punctuation is literal.
    assert_eq!(hits(store, index, "text:c++").await, 1);
    assert_eq!(hits(store, index, r#"text:"(mostly)""#).await, 1);
    assert_eq!(hits(store, index, "text:.net").await, 1);
    assert_eq!(hits(store, index, "text:c.+").await, 0);

    // Free terms and unknown prefixes.
    assert_eq!(hits(store, index, "rule").await, 1);
    assert_eq!(hits(store, index, "covid 12:30").await, 0);
}

async fn invalid_index_rejected(store: &dyn RecordStore, _index: &str) {
    let p = page("https://example.com/a", "x", &[]);
    assert!(matches!(
        store.save("../outside", &p).await,
        Err(StoreError::InvalidIndex(_))
    ));
}

macro_rules! contract {
    ($backend:ident, |$index:ident| $make:expr) => {
        contract!(@cases $backend, |$index| $make,
            save_get_exists,
            indexes_are_isolated,
            delete_then_resave,
            save_overwrites,
            list_is_sorted_and_complete,
            search_bar_filters,
            text_search_semantics,
            invalid_index_rejected
        );
    };
    (@cases $backend:ident, |$index:ident| $make:expr, $($case:ident),+) => {
        mod $backend {
            use super::*;

            $(
                #[tokio::test]
                async fn $case() {
                    let $index = concat!(stringify!($backend), "_", stringify!($case));
                    let Some((_guard, store)) = ($make) else {
                        return;
                    };
                    super::$case(&store, $index).await;
                }
            )+
        }
    };
}

contract!(memory, |_index| Some(((), MemoryStore::new())));
contract!(file, |_index| {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    Some((dir, store))
});
contract!(postgres, |index| pg_store(index).await.map(|store| ((), store)));

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let p = page("https://example.com/a", "persisted", &[]);
    FileStore::new(dir.path()).save("demo", &p).await.unwrap();

    let reopened = FileStore::new(dir.path());
    assert_eq!(reopened.get("demo", &p.id).await.unwrap(), Some(p));
}

#[tokio::test]
async fn file_store_handles_very_long_urls() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let url = format!("https://example.com/{}", "segment/".repeat(120));
    let p = page(&url, "long", &[]);

    store.save("demo", &p).await.unwrap();
    assert!(store.exists("demo", &p.id).await.unwrap());
    assert_eq!(store.list("demo").await.unwrap(), vec![p.id.clone()]);
    assert_eq!(store.get("demo", &p.id).await.unwrap().unwrap().url, url);
}

#[tokio::test]
async fn file_store_reports_corrupt_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let id = RecordId::derive("https://example.com/a").unwrap();
    std::fs::create_dir_all(dir.path().join("demo")).unwrap();
    std::fs::write(dir.path().join("demo").join(format!("{id}.json")), b"{ not json").unwrap();

    assert!(store.exists("demo", &id).await.unwrap());
    assert!(matches!(
        store.get("demo", &id).await,
        Err(StoreError::Corrupt { .. })
    ));
}

#[tokio::test]
async fn unavailable_store_fails_loudly() {
    let store = MemoryStore::new();
    store.set_unavailable(true);
    let id = RecordId::derive("https://example.com/a").unwrap();
    let err = store.exists("demo", &id).await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn mirror_copies_only_missing_records() {
    let dir = tempfile::tempdir().unwrap();
    let files = FileStore::new(dir.path());
    let search = MemoryStore::new();

    let a = page("https://a.com/", "a", &[]);
    let b = page("https://b.com/", "b", &[]);
    files.save("demo", &a).await.unwrap();
    files.save("demo", &b).await.unwrap();
    search.save("demo", &a).await.unwrap();

    let report = mirror_missing(&files, &search, "demo").await.unwrap();
    assert_eq!(report.copied, 1);
    assert_eq!(report.already_present, 1);
    assert_eq!(search.list("demo").await.unwrap(), files.list("demo").await.unwrap());

    let again = mirror_missing(&files, &search, "demo").await.unwrap();
    assert_eq!(again.copied, 0);
    assert_eq!(again.already_present, 2);
}
