use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceUrls {
    pub naver: String,
}

/// One normalized map location. `urls.naver` is the natural key: the store
/// never holds two records resolved from the same source URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceRecord {
    pub id: String,
    pub title: String,
    pub location: GeoPoint,
    pub address: String,
    pub description: String,
    pub urls: PlaceUrls,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreDocument {
    #[serde(default)]
    pub places: Vec<PlaceRecord>,
    #[serde(default)]
    pub modified: String,
}

pub struct PlaceStore {
    path: PathBuf,
    document: StoreDocument,
}

impl PlaceStore {
    /// Loads the store from disk; a missing file starts an empty store.
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let document = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => StoreDocument::default(),
            Err(err) => return Err(AppError::Io(err)),
        };
        Ok(Self { path, document })
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.document.places.iter().any(|place| place.urls.naver == url)
    }

    pub fn push(&mut self, record: PlaceRecord) {
        self.document.places.push(record);
    }

    pub fn places(&self) -> &[PlaceRecord] {
        &self.document.places
    }

    pub fn modified(&self) -> &str {
        &self.document.modified
    }

    /// Stamps `modified` with today's date and writes the whole document
    /// back, pretty-printed, non-ASCII characters kept literal. The stamp
    /// happens even when no record was added this run.
    pub fn persist(&mut self) -> AppResult<()> {
        self.document.modified = Utc::now().format("%Y-%m-%d").to_string();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(&self.document)?;
        fs::write(&self.path, serialized)?;
        debug!(
            path = %self.path.display(),
            places = self.document.places.len(),
            "place store persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn sample_record(url: &str) -> PlaceRecord {
        PlaceRecord {
            id: "place-0123456789ab".into(),
            title: "제주김만복".into(),
            location: GeoPoint {
                lat: 33.499,
                lng: 126.531,
            },
            address: "제주특별자치도 제주시".into(),
            description: "김밥".into(),
            urls: PlaceUrls { naver: url.into() },
            labels: vec!["분식".into()],
        }
    }

    #[test]
    fn missing_file_loads_empty_store() {
        let dir = tempdir().unwrap();
        let store = PlaceStore::load(dir.path().join("places.json")).unwrap();
        assert!(store.places().is_empty());
        assert!(store.modified().is_empty());
    }

    #[test]
    fn roundtrips_records_and_stamps_modified() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("places.json");

        let mut store = PlaceStore::load(&path).unwrap();
        store.push(sample_record("https://naver.me/abc"));
        store.persist().unwrap();

        let reloaded = PlaceStore::load(&path).unwrap();
        assert_eq!(reloaded.places().len(), 1);
        assert!(reloaded.contains_url("https://naver.me/abc"));
        assert!(!reloaded.contains_url("https://naver.me/other"));
        assert_eq!(reloaded.modified(), Utc::now().format("%Y-%m-%d").to_string());
    }

    #[test]
    fn persists_hangul_unescaped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("places.json");

        let mut store = PlaceStore::load(&path).unwrap();
        store.push(sample_record("https://naver.me/abc"));
        store.persist().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("제주김만복"));
        assert!(!raw.contains("\\u"));
    }
}
