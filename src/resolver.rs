use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::directory::{Lookup, PlaceDirectory};
use crate::errors::AppResult;
use crate::normalize::build_record;
use crate::queue::UrlQueue;
use crate::store::PlaceStore;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveStats {
    pub total_urls: usize,
    pub already_known: usize,
    pub added: usize,
    pub skipped: usize,
}

/// Drains the pending queue into the place store.
///
/// Each URL from the initial snapshot is processed once, in file order:
/// already-known URLs migrate straight to finished without touching the
/// API; any failed lookup leaves the URL pending for a later run; a
/// successful resolution appends a record, migrates the URL and sleeps the
/// politeness delay. The store's `modified` stamp is rewritten and the
/// whole document persisted at the end regardless of how many records
/// were added.
pub async fn run_resolver(
    queue: &UrlQueue,
    store_path: &Path,
    directory: &dyn PlaceDirectory,
    request_delay: Duration,
) -> AppResult<ResolveStats> {
    let mut store = PlaceStore::load(store_path)?;
    let snapshot = queue.snapshot()?;

    let mut stats = ResolveStats {
        total_urls: snapshot.len(),
        ..ResolveStats::default()
    };

    for url in &snapshot {
        if store.contains_url(url) {
            info!(url, "url already in store; moving to finished");
            queue.migrate(url)?;
            stats.already_known += 1;
            continue;
        }

        let place_id = match directory.resolve_place_id(url).await {
            Lookup::Found(place_id) => place_id,
            Lookup::NotFound => {
                warn!(url, "final url carries no place id; leaving pending");
                stats.skipped += 1;
                continue;
            }
            Lookup::TransportError(cause) | Lookup::ParseError(cause) => {
                warn!(url, cause, "place id resolution failed; leaving pending");
                stats.skipped += 1;
                continue;
            }
        };

        let summary = match directory.fetch_summary(&place_id).await {
            Lookup::Found(summary) => summary,
            Lookup::NotFound => {
                warn!(url, place_id, "summary fetch rejected; leaving pending");
                stats.skipped += 1;
                continue;
            }
            Lookup::TransportError(cause) | Lookup::ParseError(cause) => {
                warn!(url, place_id, cause, "summary fetch failed; leaving pending");
                stats.skipped += 1;
                continue;
            }
        };

        let record = build_record(&summary, url);
        info!(url, place_id, title = %record.title, "place added");
        store.push(record);
        queue.migrate(url)?;
        stats.added += 1;

        sleep(request_delay).await;
    }

    store.persist()?;
    info!(
        total = stats.total_urls,
        added = stats.added,
        already_known = stats.already_known,
        skipped = stats.skipped,
        "resolver run finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::tempdir;

    use crate::directory::Lookup;
    use crate::normalize::PlaceSummary;

    use super::*;

    /// Scripted directory keyed by URL/place id, counting API traffic.
    #[derive(Default)]
    struct ScriptedDirectory {
        ids: HashMap<String, String>,
        summaries: HashMap<String, PlaceSummary>,
        resolve_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
    }

    impl ScriptedDirectory {
        fn with_place(mut self, url: &str, place_id: &str, name: &str) -> Self {
            self.ids.insert(url.to_string(), place_id.to_string());
            self.summaries.insert(
                place_id.to_string(),
                PlaceSummary {
                    name: Some(name.to_string()),
                    ..PlaceSummary::default()
                },
            );
            self
        }
    }

    #[async_trait]
    impl PlaceDirectory for ScriptedDirectory {
        async fn resolve_place_id(&self, short_url: &str) -> Lookup<String> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            match self.ids.get(short_url) {
                Some(place_id) => Lookup::Found(place_id.clone()),
                None => Lookup::NotFound,
            }
        }

        async fn fetch_summary(&self, place_id: &str) -> Lookup<PlaceSummary> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            match self.summaries.get(place_id) {
                Some(summary) => Lookup::Found(summary.clone()),
                None => Lookup::TransportError("scripted outage".into()),
            }
        }
    }

    fn queue_in(dir: &Path) -> UrlQueue {
        UrlQueue::new(dir.join("target_urls.txt"), dir.join("finished_urls.txt"))
    }

    #[tokio::test]
    async fn resolves_pending_urls_into_store() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        queue.enqueue("https://naver.me/a").unwrap();
        queue.enqueue("https://naver.me/b").unwrap();

        let directory = ScriptedDirectory::default()
            .with_place("https://naver.me/a", "111", "가게 하나")
            .with_place("https://naver.me/b", "222", "가게 둘");
        let store_path = dir.path().join("places.json");

        let stats = run_resolver(&queue, &store_path, &directory, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(stats.added, 2);
        assert_eq!(stats.skipped, 0);
        assert!(queue.snapshot().unwrap().is_empty());
        assert_eq!(
            queue.finished().unwrap(),
            vec!["https://naver.me/a", "https://naver.me/b"]
        );

        let store = PlaceStore::load(&store_path).unwrap();
        assert_eq!(store.places().len(), 2);
        assert!(store.contains_url("https://naver.me/a"));
        assert!(store.contains_url("https://naver.me/b"));
    }

    #[tokio::test]
    async fn known_urls_migrate_without_api_calls() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        queue.enqueue("https://naver.me/a").unwrap();

        let directory = ScriptedDirectory::default()
            .with_place("https://naver.me/a", "111", "가게 하나");
        let store_path = dir.path().join("places.json");

        run_resolver(&queue, &store_path, &directory, Duration::ZERO)
            .await
            .unwrap();

        // Second run over the same URL must short-circuit on the store.
        queue.reset_pending().unwrap();
        queue.enqueue("https://naver.me/a").unwrap();
        let before = directory.resolve_calls.load(Ordering::SeqCst);

        let stats = run_resolver(&queue, &store_path, &directory, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(stats.already_known, 1);
        assert_eq!(stats.added, 0);
        assert_eq!(directory.resolve_calls.load(Ordering::SeqCst), before);

        let store = PlaceStore::load(&store_path).unwrap();
        assert_eq!(store.places().len(), 1);
    }

    #[tokio::test]
    async fn failed_lookups_leave_urls_pending() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        queue.enqueue("https://naver.me/unresolvable").unwrap();
        queue.enqueue("https://naver.me/broken-fetch").unwrap();

        let mut directory = ScriptedDirectory::default();
        // Resolves to an id the summary API does not know.
        directory
            .ids
            .insert("https://naver.me/broken-fetch".into(), "999".into());
        let store_path = dir.path().join("places.json");

        let stats = run_resolver(&queue, &store_path, &directory, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.added, 0);
        assert_eq!(
            queue.snapshot().unwrap(),
            vec!["https://naver.me/unresolvable", "https://naver.me/broken-fetch"]
        );
        assert!(queue.finished().unwrap().is_empty());

        let store = PlaceStore::load(&store_path).unwrap();
        assert!(store.places().is_empty());
        // modified is stamped even though nothing was added.
        assert!(!store.modified().is_empty());
    }
}
