use std::path::PathBuf;
use std::{env, io};

use secrecy::SecretString;
use tracing::debug;

const DEFAULT_SAVED_LIST_URL: &str = "https://map.naver.com/p/favorite/myPlace?c=15.00,0,0,0,dh";
const DEFAULT_SUMMARY_API_BASE: &str = "https://map.naver.com/p/api/place/summary";
const DEFAULT_REFERER: &str = "https://map.naver.com/";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub pending_file: PathBuf,
    pub finished_file: PathBuf,
    pub store_file: PathBuf,
    pub saved_list_url: String,
    pub folder_name: String,
    pub summary_api_base: String,
    pub referer: String,
    pub user_agent: String,
    pub request_delay_ms: u64,
    pub detail_wait_ms: u64,
    pub scroll_wait_ms: u64,
    pub selector_timeout_ms: u64,
    pub browser_headless: bool,
    pub naver_id: Option<SecretString>,
    pub naver_password: Option<SecretString>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            pending_file: parse_path("TARGET_URLS_FILE", "data/target_urls.txt"),
            finished_file: parse_path("FINISHED_URLS_FILE", "data/finished_urls.txt"),
            store_file: parse_path("PLACE_STORE_FILE", "data/places.json"),
            saved_list_url: env::var("NAVER_SAVED_LIST_URL")
                .unwrap_or_else(|_| DEFAULT_SAVED_LIST_URL.to_string()),
            folder_name: env::var("NAVER_FOLDER_NAME").unwrap_or_default(),
            summary_api_base: env::var("NAVER_SUMMARY_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_SUMMARY_API_BASE.to_string()),
            referer: env::var("NAVER_REFERER").unwrap_or_else(|_| DEFAULT_REFERER.to_string()),
            user_agent: env::var("SCRAPER_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            request_delay_ms: parse_u64("REQUEST_DELAY_MS", 1_000),
            detail_wait_ms: parse_u64("DETAIL_WAIT_MS", 2_000),
            scroll_wait_ms: parse_u64("SCROLL_WAIT_MS", 2_000),
            selector_timeout_ms: parse_u64("SELECTOR_TIMEOUT_MS", 10_000),
            browser_headless: parse_bool("BROWSER_HEADLESS", false),
            naver_id: secret_var("NAVER_ID"),
            naver_password: secret_var("NAVER_PASSWORD"),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.naver_id.is_some() && self.naver_password.is_some()
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn secret_var(key: &str) -> Option<SecretString> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

fn parse_path(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}
