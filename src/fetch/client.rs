// src/fetch/client.rs

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Anything that can turn a URL into a JSON document.
pub trait JsonSource {
    fn get_json(&self, url: &Url) -> Result<Value>;
}

/// Blocking HTTP source. Requests are issued one at a time and bounded by
/// the client timeout.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

impl JsonSource for HttpSource {
    fn get_json(&self, url: &Url) -> Result<Value> {
        debug!(%url, "GET");
        self.client
            .get(url.clone())
            .send()
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", url))?
            .json()
            .with_context(|| format!("Decoding JSON from {}", url))
    }
}

/// Pagination header of a `[meta, records]` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub pages: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub per_page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ApiPage<T> {
    pub meta: PageMeta,
    pub records: Vec<T>,
}

/// The API writes some counts as numbers and some as strings.
fn lenient_u64<'de, D>(de: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Split a response body into its pagination header and records.
///
/// Returns `Ok(None)` when the body carries no data page: a one-element
/// array (the API's error/message shape) or a `null` records slot.
pub fn parse_page<T: DeserializeOwned>(body: Value) -> Result<Option<ApiPage<T>>> {
    let mut parts = match body {
        Value::Array(parts) => parts,
        other => bail!("expected a [meta, records] array, got {}", kind(&other)),
    };
    if parts.len() < 2 {
        return Ok(None);
    }
    let records = parts.swap_remove(1);
    if records.is_null() {
        return Ok(None);
    }

    let meta: PageMeta = serde_json::from_value(parts.swap_remove(0))
        .map_err(|e| anyhow!("malformed pagination header: {}", e))?;
    let records: Vec<T> =
        serde_json::from_value(records).context("malformed records array")?;

    if let (Some(page), Some(pages)) = (meta.page, meta.pages) {
        if pages > page {
            warn!(
                page,
                pages,
                total = ?meta.total,
                "response has more pages; only the first page is used"
            );
        }
    }

    Ok(Some(ApiPage { meta, records }))
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::{cell::RefCell, collections::HashMap};

    /// Serves canned bodies keyed by URL path; unknown paths fail like a
    /// network error would. Records every URL it was asked for.
    #[derive(Default)]
    pub struct StaticSource {
        pub bodies: HashMap<String, Value>,
        pub requests: RefCell<Vec<Url>>,
    }

    impl StaticSource {
        pub fn with(mut self, path: &str, body: Value) -> Self {
            self.bodies.insert(path.to_string(), body);
            self
        }
    }

    impl JsonSource for StaticSource {
        fn get_json(&self, url: &Url) -> Result<Value> {
            self.requests.borrow_mut().push(url.clone());
            self.bodies
                .get(url.path())
                .cloned()
                .ok_or_else(|| anyhow!("connection refused: {}", url))
        }
    }
}
