use anyhow::{bail, Result};
use clap::Parser;
use fertdash::{fetch::HttpSource, Config};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Fetch fertility and labor series from the World Bank API and render a
/// six-panel dashboard PNG.
#[derive(Parser, Debug)]
#[command(name = "fertdash")]
struct Args {
    /// YAML config file; built-in defaults apply to anything it leaves out
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma separated country names (overrides config)
    #[arg(long, value_delimiter = ',')]
    countries: Option<Vec<String>>,

    /// Comma separated indicator codes (overrides config)
    #[arg(long, value_delimiter = ',')]
    indicators: Option<Vec<String>>,

    #[arg(long)]
    start_year: Option<i32>,

    #[arg(long)]
    end_year: Option<i32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Output PNG path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also export the wide table as Parquet
    #[arg(long)]
    table_out: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(v) = self.countries {
            cfg.countries = v;
        }
        if let Some(v) = self.indicators {
            cfg.indicators = v;
        }
        if let Some(v) = self.start_year {
            cfg.start_year = v;
        }
        if let Some(v) = self.end_year {
            cfg.end_year = v;
        }
        if let Some(v) = self.timeout {
            cfg.timeout_secs = v;
        }
        if let Some(v) = self.output {
            cfg.output_path = v;
        }
        if self.table_out.is_some() {
            cfg.table_path = self.table_out;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cfg = Args::parse().into_config()?;
    info!(
        countries = cfg.countries.len(),
        indicators = cfg.indicators.len(),
        "startup"
    );

    let source = HttpSource::new(cfg.timeout())?;
    match fertdash::run(&cfg, &source)? {
        Some(path) => {
            info!("dashboard saved as {}", path.display());
            Ok(())
        }
        None => {
            error!("no data was fetched; check your internet connection and try again");
            bail!("failed to create dashboard due to data retrieval issues")
        }
    }
}
