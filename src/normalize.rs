use rand::{thread_rng, Rng};
use serde::Deserialize;
use serde_json::Value;

use crate::store::{GeoPoint, PlaceRecord, PlaceUrls};

const ID_SUFFIX_LEN: usize = 12;

/// Raw shape of the place summary API response. Only the fields the record
/// needs; everything else in the body is ignored. `y`/`x` arrive as either
/// JSON numbers or strings depending on the endpoint revision, so they stay
/// untyped until coercion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceSummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub y: Option<Value>,
    #[serde(default)]
    pub x: Option<Value>,
    #[serde(default, rename = "roadAddress")]
    pub road_address: Option<String>,
    #[serde(default, rename = "microReview")]
    pub micro_review: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Maps an API summary onto the persisted record shape. Pure except for id
/// generation: every call mints a fresh id, so store-level idempotence is
/// the caller's job via the `urls.naver` dedup check.
pub fn build_record(summary: &PlaceSummary, source_url: &str) -> PlaceRecord {
    PlaceRecord {
        id: new_place_id(),
        title: summary.name.clone().unwrap_or_default(),
        location: GeoPoint {
            lat: coerce_coordinate(summary.y.as_ref()),
            lng: coerce_coordinate(summary.x.as_ref()),
        },
        address: summary.road_address.clone().unwrap_or_default(),
        description: summary.micro_review.clone().unwrap_or_default(),
        urls: PlaceUrls {
            naver: source_url.to_string(),
        },
        labels: summary
            .category
            .as_deref()
            .filter(|category| !category.is_empty())
            .map(|category| vec![category.to_string()])
            .unwrap_or_default(),
    }
}

pub fn new_place_id() -> String {
    let mut rng = thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect();
    format!("place-{suffix}")
}

fn coerce_coordinate(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
