use anyhow::{bail, Context};
use tracing::info;

use naver_place_scraper::{
    collect_share_urls, init_tracing, AppConfig, ChromeSavedList, UrlQueue,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = AppConfig::from_env();
    if config.folder_name.trim().is_empty() {
        bail!("NAVER_FOLDER_NAME must name the saved-places folder to collect");
    }

    let queue = UrlQueue::new(&config.pending_file, &config.finished_file);
    let mut browser = ChromeSavedList::launch(config.clone())
        .await
        .context("failed to launch browser")?;

    let outcome = collect_share_urls(&mut browser, &queue).await;
    browser.close().await.context("failed to close browser")?;

    let stats = outcome.context("collection run failed")?;
    info!(
        urls = stats.urls_collected,
        file = %config.pending_file.display(),
        "collected share urls"
    );
    Ok(())
}
