use std::time::Duration;

use anyhow::Context;
use tracing::info;

use naver_place_scraper::{
    init_tracing, run_resolver, AppConfig, HttpPlaceDirectory, UrlQueue,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = AppConfig::from_env();

    let queue = UrlQueue::new(&config.pending_file, &config.finished_file);
    let directory =
        HttpPlaceDirectory::new(&config).context("failed to build http client")?;

    let stats = run_resolver(
        &queue,
        &config.store_file,
        &directory,
        Duration::from_millis(config.request_delay_ms),
    )
    .await
    .context("resolver run failed")?;

    info!(
        added = stats.added,
        store = %config.store_file.display(),
        "done"
    );
    Ok(())
}
