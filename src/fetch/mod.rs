// src/fetch/mod.rs

/// HTTP plumbing and the `[meta, records]` envelope
pub mod client;
/// Display name → API country code
pub mod countries;
/// Per (country, indicator) series downloads
pub mod series;

pub use client::{parse_page, ApiPage, HttpSource, JsonSource, PageMeta};
pub use countries::{resolve_country_codes, CountryRecord};
pub use series::{fetch_observations, Observation};
