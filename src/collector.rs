use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::browser::SavedListBrowser;
use crate::errors::AppResult;
use crate::queue::UrlQueue;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectStats {
    pub entries_seen: usize,
    pub urls_collected: usize,
}

/// Walks the scroll-paginated saved-places list and harvests each entry's
/// shareable URL into the pending queue.
///
/// The pending file is truncated up front, so a run always publishes
/// exactly the URL set it discovered. Every new URL is appended the moment
/// it is seen (deduplicated in-memory for the run); entries at or below
/// the highest vertical offset already handled are never re-processed.
pub async fn collect_share_urls(
    browser: &mut dyn SavedListBrowser,
    queue: &UrlQueue,
) -> AppResult<CollectStats> {
    queue.reset_pending()?;
    browser.open_saved_list().await?;

    let mut stats = CollectStats::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut last_offset = 0.0_f64;

    loop {
        let entries = browser.visible_entries().await?;

        for entry in &entries {
            if entry.offset <= last_offset {
                continue;
            }
            stats.entries_seen += 1;

            match browser.read_share_url(entry).await? {
                Some(url) => {
                    if seen.insert(url.clone()) {
                        queue.enqueue(&url)?;
                        stats.urls_collected += 1;
                        info!(url, "share url collected");
                    }
                }
                None => {
                    warn!(index = entry.index, "no share url for entry");
                }
            }
        }

        if let Some(last) = entries.last() {
            last_offset = last.offset;
        }

        if !browser.scroll_down().await? {
            info!("scroll height stopped growing; list exhausted");
            break;
        }
    }

    info!(
        entries = stats.entries_seen,
        urls = stats.urls_collected,
        pending_file = %queue.pending_path().display(),
        "collection run finished"
    );
    Ok(stats)
}
