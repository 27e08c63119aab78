use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column order used by [`crate::save_to_csv`] when the caller supplies none.
pub const DEFAULT_FIELDNAMES: [&str; 11] = [
    "name",
    "street_address",
    "city",
    "state",
    "zip",
    "country",
    "latitude",
    "longitude",
    "phone",
    "url",
    "scraped_at",
];

/// One retail store as extracted from a retailer's locator pages.
///
/// Retailer parsers may attach extra fields (store hours, store type, ...) in
/// `extra`. They are flattened into the JSON object on serialization, kept in
/// JSON output and dropped from CSV output unless named in the field list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub name: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    /// Page the record was scraped from.
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoreRecord {
    /// A record with only a name and source URL, stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            street_address: String::new(),
            city: String::new(),
            state: String::new(),
            zip: String::new(),
            country: String::new(),
            latitude: None,
            longitude: None,
            phone: None,
            url: url.into(),
            scraped_at: Utc::now(),
            extra: serde_json::Map::new(),
        }
    }

    /// `true` when both coordinates are present and inside valid ranges.
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        matches!(
            (self.latitude, self.longitude),
            (Some(lat), Some(lng)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
        )
    }
}
