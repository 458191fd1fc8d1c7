// src/fetch/countries.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use url::Url;

use super::client::{parse_page, JsonSource};

/// One entry of the country reference list.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryRecord {
    pub id: String,
    pub name: String,
}

fn country_list_url(api_base: &Url) -> Result<Url> {
    let mut url = api_base.join("country").context("building country list URL")?;
    url.query_pairs_mut()
        .append_pair("format", "json")
        .append_pair("per_page", "300");
    Ok(url)
}

/// Fetch the reference list once and build a lowercase name → code map.
fn fetch_country_map(source: &impl JsonSource, api_base: &Url) -> Result<HashMap<String, String>> {
    let url = country_list_url(api_base)?;
    let body = source.get_json(&url)?;
    let page = parse_page::<CountryRecord>(body)
        .with_context(|| format!("parsing country list from {}", url))?
        .with_context(|| format!("country list at {} has no data page", url))?;

    Ok(page
        .records
        .into_iter()
        .map(|c| (c.name.to_lowercase(), c.id))
        .collect())
}

/// Translate display names into API country codes, preserving order.
///
/// A name with no match is passed through unchanged; if the reference list
/// can't be fetched at all, every name is passed through. Both cases are
/// logged and never abort the run.
#[instrument(level = "info", skip(source, api_base))]
pub fn resolve_country_codes(
    source: &impl JsonSource,
    api_base: &Url,
    names: &[String],
) -> Vec<String> {
    let map = match fetch_country_map(source, api_base) {
        Ok(map) => map,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "could not fetch country codes; using names as given");
            return names.to_vec();
        }
    };
    info!(known = map.len(), "loaded country reference list");

    names
        .iter()
        .map(|name| match map.get(&name.to_lowercase()) {
            Some(code) => code.clone(),
            None => {
                warn!(country = %name, "could not find code; using name as is");
                name.clone()
            }
        })
        .collect()
}
