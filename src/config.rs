// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::dashboard::DashboardStyle;
use crate::table::{FERTILITY_RATE, FEMALE_LABOR_FORCE, TEEN_BIRTH_RATE};

pub const DEFAULT_API_BASE: &str = "http://api.worldbank.org/v2/";

static DEFAULT_COUNTRIES: &[&str] = &["Norway", "Sweden", "Denmark", "Finland", "Iceland"];

/// Run configuration. Every field has a default, so an empty YAML file
/// reproduces the stock Nordic dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display names, in legend/color order.
    pub countries: Vec<String>,
    /// Indicator codes to fetch.
    pub indicators: Vec<String>,
    pub start_year: i32,
    pub end_year: i32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub output_path: PathBuf,
    /// Optional Parquet export of the wide table.
    pub table_path: Option<PathBuf>,
    pub api_base: String,
    pub style: DashboardStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            countries: DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
            indicators: vec![
                FERTILITY_RATE.to_string(),
                TEEN_BIRTH_RATE.to_string(),
                FEMALE_LABOR_FORCE.to_string(),
            ],
            start_year: 1960,
            end_year: 2022,
            timeout_secs: 30,
            output_path: PathBuf::from("upgraded_nordic_fertility_dashboard.png"),
            table_path: None,
            api_base: DEFAULT_API_BASE.to_string(),
            style: DashboardStyle::default(),
        }
    }
}

impl Config {
    /// Read a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // serde_yaml refuses an empty document for a struct
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.countries.is_empty() {
            bail!("at least one country is required");
        }
        if self.indicators.is_empty() {
            bail!("at least one indicator is required");
        }
        if self.start_year > self.end_year {
            bail!(
                "start_year {} is after end_year {}",
                self.start_year,
                self.end_year
            );
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be positive");
        }
        self.api_url()?;
        self.style.validate()?;
        Ok(())
    }

    /// The API base as a URL that relative endpoints can be joined onto.
    pub fn api_url(&self) -> Result<Url> {
        let mut raw = self.api_base.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).with_context(|| format!("parsing api_base {:?}", raw))?;
        if url.cannot_be_a_base() {
            bail!("api_base {:?} cannot be used as a base URL", raw);
        }
        Ok(url)
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_file_is_default() {
        let cfg = Config::from_yaml("  \n").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.years(), 1960..=2022);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            "countries: [Estonia, Latvia]\nend_year: 2020\noutput_path: baltic.png\nstyle:\n  width: 1200"
        )
        .unwrap();

        let cfg = Config::load(f.path()).unwrap();
        assert_eq!(cfg.countries, vec!["Estonia", "Latvia"]);
        assert_eq!(cfg.start_year, 1960);
        assert_eq!(cfg.end_year, 2020);
        assert_eq!(cfg.output_path, PathBuf::from("baltic.png"));
        assert_eq!(cfg.style.width, 1200);
        assert_eq!(cfg.indicators.len(), 3);
    }

    #[test]
    fn bundled_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/nordic.yaml");
        let cfg = Config::load(path).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.start_year = 2023;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.countries.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.timeout_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.api_base = "mailto:someone@example.com".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn api_url_gets_trailing_slash() {
        let mut cfg = Config::default();
        cfg.api_base = "https://example.org/v2".to_string();
        assert_eq!(cfg.api_url().unwrap().as_str(), "https://example.org/v2/");
    }
}
