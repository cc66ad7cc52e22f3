mod browser;
mod collector;
mod config;
mod directory;
mod errors;
mod normalize;
mod queue;
mod resolver;
mod store;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use browser::{ChromeSavedList, ListEntry, SavedListBrowser};
pub use collector::{collect_share_urls, CollectStats};
pub use config::AppConfig;
pub use directory::{HttpPlaceDirectory, Lookup, PlaceDirectory};
pub use errors::{AppError, AppResult};
pub use normalize::{build_record, PlaceSummary};
pub use queue::UrlQueue;
pub use resolver::{run_resolver, ResolveStats};
pub use store::{GeoPoint, PlaceRecord, PlaceStore, PlaceUrls};

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,naver_place_scraper=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
