// src/fetch/series.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::ops::RangeInclusive;
use tracing::{info, instrument, warn};
use url::Url;

use super::client::{parse_page, JsonSource};

/// One data point exactly as the API returned it. `value` stays opaque
/// (number, string or null) until the table builder coerces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub country: String,
    pub date: String,
    pub indicator: String,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    value: String,
}

#[derive(Debug, Deserialize)]
struct SeriesRecord {
    country: NamedRef,
    date: String,
    #[serde(default)]
    value: Value,
}

fn series_url(api_base: &Url, country: &str, indicator: &str, years: &RangeInclusive<i32>) -> Result<Url> {
    let mut url = api_base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("{} cannot be a base URL", api_base))?
        .pop_if_empty()
        .extend(["country", country, "indicator", indicator]);
    url.query_pairs_mut()
        .append_pair("date", &format!("{}:{}", years.start(), years.end()))
        .append_pair("format", "json")
        .append_pair("per_page", "1000");
    Ok(url)
}

/// Fetch one (country, indicator) series. `Ok(None)` means the response had
/// no data page.
fn fetch_pair(
    source: &impl JsonSource,
    api_base: &Url,
    country: &str,
    indicator: &str,
    years: &RangeInclusive<i32>,
) -> Result<Option<Vec<Observation>>> {
    let url = series_url(api_base, country, indicator, years)?;
    let body = source.get_json(&url)?;
    let Some(page) = parse_page::<SeriesRecord>(body)
        .with_context(|| format!("parsing series from {}", url))?
    else {
        return Ok(None);
    };

    Ok(Some(
        page.records
            .into_iter()
            .map(|r| Observation {
                country: r.country.value,
                date: r.date,
                indicator: indicator.to_string(),
                value: r.value,
            })
            .collect(),
    ))
}

/// Fetch every country × indicator pair, country-major, one request each.
///
/// A pair that fails is logged and skipped; the rest still run. Returns
/// `None` when nothing at all came back.
#[instrument(level = "info", skip(source, api_base))]
pub fn fetch_observations(
    source: &impl JsonSource,
    api_base: &Url,
    countries: &[String],
    indicators: &[String],
    years: RangeInclusive<i32>,
) -> Option<Vec<Observation>> {
    let mut all = Vec::new();

    for country in countries {
        for indicator in indicators {
            info!(%country, %indicator, "fetching");
            match fetch_pair(source, api_base, country, indicator, &years) {
                Ok(Some(obs)) => {
                    info!(%country, %indicator, records = obs.len(), "fetched");
                    all.extend(obs);
                }
                Ok(None) => {
                    info!(%country, %indicator, "no data available");
                }
                Err(e) => {
                    warn!(%country, %indicator, error = %format!("{:#}", e), "fetch failed; skipping");
                }
            }
        }
    }

    if all.is_empty() {
        warn!("no data was fetched from the API");
        return None;
    }
    info!(observations = all.len(), "fetch complete");
    Some(all)
}
