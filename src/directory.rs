use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::normalize::PlaceSummary;

/// Outcome of one external lookup. Non-`Found` variants are transient:
/// the caller leaves the URL pending and a later run retries it.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    /// The upstream answered, but not with what we need (non-200 status,
    /// or a final URL without a `/place/<digits>` segment).
    NotFound,
    TransportError(String),
    ParseError(String),
}

/// Narrow seam over the Naver map service: short-URL redirect resolution
/// and the place summary API.
#[async_trait]
pub trait PlaceDirectory: Send + Sync {
    async fn resolve_place_id(&self, short_url: &str) -> Lookup<String>;
    async fn fetch_summary(&self, place_id: &str) -> Lookup<PlaceSummary>;
}

pub struct HttpPlaceDirectory {
    http: Client,
    summary_api_base: String,
    referer: String,
}

impl HttpPlaceDirectory {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            http,
            summary_api_base: config.summary_api_base.clone(),
            referer: config.referer.clone(),
        })
    }
}

#[async_trait]
impl PlaceDirectory for HttpPlaceDirectory {
    async fn resolve_place_id(&self, short_url: &str) -> Lookup<String> {
        // The client follows redirects, so the response URL is the final
        // destination of the share link.
        let response = match self.http.get(short_url).send().await {
            Ok(response) => response,
            Err(err) => return Lookup::TransportError(err.to_string()),
        };

        let final_url = response.url();
        match place_id_from_url(final_url) {
            Some(place_id) => {
                debug!(short_url, place_id, "resolved share url");
                Lookup::Found(place_id)
            }
            None => Lookup::NotFound,
        }
    }

    async fn fetch_summary(&self, place_id: &str) -> Lookup<PlaceSummary> {
        let url = format!("{}/{place_id}", self.summary_api_base);
        let response = match self
            .http
            .get(&url)
            .header(reqwest::header::REFERER, &self.referer)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return Lookup::TransportError(err.to_string()),
        };

        if response.status() != StatusCode::OK {
            debug!(place_id, status = %response.status(), "summary fetch rejected");
            return Lookup::NotFound;
        }

        match response.json::<PlaceSummary>().await {
            Ok(summary) => Lookup::Found(summary),
            Err(err) => Lookup::ParseError(err.to_string()),
        }
    }
}

/// Picks the digits out of a `/place/<digits>/...` path segment pair.
fn place_id_from_url(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "place" {
            if let Some(candidate) = segments.next() {
                if !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit()) {
                    return Some(candidate.to_string());
                }
            }
            return None;
        }
    }
    None
}
