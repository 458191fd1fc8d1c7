// src/pipeline.rs

use anyhow::{Context, Result};
use std::{fs, path::PathBuf, time::Instant};
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::dashboard::render_dashboard;
use crate::fetch::{fetch_observations, resolve_country_codes, JsonSource};
use crate::table::build_wide_table;

const PREVIEW_ROWS: usize = 5;

/// Resolve → fetch → pivot → render → write.
///
/// Returns the written image path, or `None` when the API yielded no data
/// (nothing is written in that case).
#[instrument(level = "info", skip_all, fields(output = %config.output_path.display()))]
pub fn run(config: &Config, source: &impl JsonSource) -> Result<Option<PathBuf>> {
    let start = Instant::now();
    let api = config.api_url()?;

    info!(countries = ?config.countries, "resolving country codes");
    let codes = resolve_country_codes(source, &api, &config.countries);

    info!(indicators = ?config.indicators, years = ?config.years(), "fetching series");
    let Some(observations) =
        fetch_observations(source, &api, &codes, &config.indicators, config.years())
    else {
        return Ok(None);
    };

    let table = build_wide_table(&observations)?;
    match table.preview(PREVIEW_ROWS) {
        Ok(text) => info!("first rows of the fetched data:\n{}", text),
        Err(e) => warn!(error = %e, "could not format table preview"),
    }

    if let Some(path) = &config.table_path {
        table
            .write_parquet(path)
            .with_context(|| format!("exporting table to {}", path.display()))?;
    }

    let Some(dashboard) = render_dashboard(&config.countries, Some(&table), &config.style)? else {
        return Ok(None);
    };

    let out = &config.output_path;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(out, &dashboard.png).with_context(|| format!("writing {}", out.display()))?;
    info!(path = %out.display(), elapsed = ?start.elapsed(), "dashboard saved");

    Ok(Some(out.clone()))
}
