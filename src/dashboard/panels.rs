// src/dashboard/panels.rs
//
// Data side of the six panels. Nothing here draws; `draw` turns these
// values into pixels.

use tracing::warn;

use crate::table::{WideTable, FEMALE_LABOR_FORCE, FERTILITY_RATE, TEEN_BIRTH_RATE};

/// Endpoints of the change panel. Fixed years, not first/last available.
pub const CHANGE_FROM_YEAR: i32 = 1960;
pub const CHANGE_TO_YEAR: i32 = 2022;

/// Years projected past the last observation in the forecast panel.
pub const FORECAST_HORIZON: i32 = 10;

/// The six panels, in grid order (row-major, two per row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    FertilityTrend,
    LatestRates,
    LaborScatter,
    TeenBirthTrend,
    FertilityChange,
    Forecast,
}

impl Panel {
    pub const ALL: [Panel; 6] = [
        Panel::FertilityTrend,
        Panel::LatestRates,
        Panel::LaborScatter,
        Panel::TeenBirthTrend,
        Panel::FertilityChange,
        Panel::Forecast,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Panel::FertilityTrend => "fertility_trend",
            Panel::LatestRates => "latest_rates",
            Panel::LaborScatter => "labor_scatter",
            Panel::TeenBirthTrend => "teen_birth_trend",
            Panel::FertilityChange => "fertility_change",
            Panel::Forecast => "forecast",
        }
    }

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Panel::LaborScatter => &[FERTILITY_RATE, FEMALE_LABOR_FORCE],
            Panel::TeenBirthTrend => &[TEEN_BIRTH_RATE],
            _ => &[FERTILITY_RATE],
        }
    }

    pub fn missing_columns(self, table: &WideTable) -> Vec<&'static str> {
        self.required_columns()
            .iter()
            .copied()
            .filter(|c| !table.has_column(c))
            .collect()
    }

    /// Text shown in place of the chart when columns are missing.
    pub fn placeholder(self) -> &'static str {
        match self {
            Panel::LaborScatter => "Data not available for this plot",
            Panel::TeenBirthTrend => "Teenage Birth Rate data not available",
            Panel::Forecast => "Fertility Rate data not available for forecast",
            _ => "Fertility Rate data not available",
        }
    }

    pub fn title(self, table: &WideTable) -> String {
        let span = match (table.min_year(), table.max_year()) {
            (Some(a), Some(b)) => format!(" ({}-{})", a, b),
            _ => String::new(),
        };
        match self {
            Panel::FertilityTrend => format!("Fertility Rate Trends{}", span),
            Panel::LatestRates => match table.max_year() {
                Some(y) => format!("Fertility Rates ({})", y),
                None => "Fertility Rates".to_string(),
            },
            Panel::LaborScatter => "Fertility Rate vs Female Labor Force Participation".to_string(),
            Panel::TeenBirthTrend => format!("Teenage Birth Rate Trends{}", span),
            Panel::FertilityChange => format!(
                "Change in Fertility Rate ({} to {})",
                CHANGE_FROM_YEAR, CHANGE_TO_YEAR
            ),
            Panel::Forecast => format!("Fertility Rate Forecast (Next {} Years)", FORECAST_HORIZON),
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            Panel::FertilityTrend => {
                "How the average number of children born to a woman has changed over time"
            }
            Panel::LatestRates => "Current average number of children born to a woman in each country",
            Panel::LaborScatter => "How fertility rates relate to women's participation in the workforce",
            Panel::TeenBirthTrend => {
                "How the number of births among teenage women has changed over time"
            }
            Panel::FertilityChange => {
                "How much the average number of children born to a woman has changed since 1960"
            }
            Panel::Forecast => "Predicted trends in fertility rates for the coming decade",
        }
    }
}

/// One country's line, broken into runs of consecutive non-missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct CountrySeries {
    pub country: String,
    /// Palette slot, from the country's position in the input list.
    pub color_index: usize,
    pub segments: Vec<Vec<(f64, f64)>>,
}

impl CountrySeries {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.segments.iter().flatten().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// Per-country lines of `indicator` over every year in the table.
pub fn trend_segments(table: &WideTable, countries: &[String], indicator: &str) -> Vec<CountrySeries> {
    countries
        .iter()
        .enumerate()
        .map(|(i, country)| {
            let mut segments = Vec::new();
            let mut run = Vec::new();
            for (year, value) in table.series(country, indicator) {
                match value {
                    Some(v) => run.push((year as f64, v)),
                    None if !run.is_empty() => segments.push(std::mem::take(&mut run)),
                    None => {}
                }
            }
            if !run.is_empty() {
                segments.push(run);
            }
            CountrySeries {
                country: country.clone(),
                color_index: i,
                segments,
            }
        })
        .collect()
}

/// Values at the table's latest year, ascending. Returns the year too.
pub fn latest_bars(table: &WideTable, indicator: &str) -> Option<(i32, Vec<Bar>)> {
    let year = table.max_year()?;
    let mut bars: Vec<Bar> = table
        .values_at(year, indicator)
        .into_iter()
        .filter_map(|(label, v)| v.map(|value| Bar { label, value }))
        .collect();
    bars.sort_by(|a, b| a.value.total_cmp(&b.value));
    Some((year, bars))
}

/// `(x, y)` pairs per country where both indicators are present.
pub fn scatter_points(
    table: &WideTable,
    countries: &[String],
    x_indicator: &str,
    y_indicator: &str,
) -> Vec<CountrySeries> {
    countries
        .iter()
        .enumerate()
        .map(|(i, country)| {
            let xs = table.series(country, x_indicator);
            let ys = table.series(country, y_indicator);
            let points: Vec<(f64, f64)> = xs
                .into_iter()
                .zip(ys)
                .filter_map(|((_, x), (_, y))| Some((x?, y?)))
                .collect();
            CountrySeries {
                country: country.clone(),
                color_index: i,
                segments: if points.is_empty() { Vec::new() } else { vec![points] },
            }
        })
        .collect()
}

/// `value@to - value@from` per country present at both years, ascending by
/// the signed change.
pub fn change_bars(table: &WideTable, indicator: &str, from: i32, to: i32) -> Vec<Bar> {
    let mut bars: Vec<Bar> = table
        .countries()
        .into_iter()
        .filter_map(|country| {
            let start = table.value(&country, from, indicator)?;
            let end = table.value(&country, to, indicator)?;
            Some(Bar {
                label: country,
                value: end - start,
            })
        })
        .collect();
    bars.sort_by(|a, b| a.value.total_cmp(&b.value));
    bars
}

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// `None` with fewer than two points or when every x is the same.
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
        let (mut sxx, mut sxy) = (0.0, 0.0);
        for &(x, y) in points {
            sxx += (x - mean_x) * (x - mean_x);
            sxy += (x - mean_x) * (y - mean_y);
        }
        if sxx == 0.0 {
            return None;
        }
        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryForecast {
    pub country: String,
    pub color_index: usize,
    pub fit: LinearFit,
    pub observed: Vec<(f64, f64)>,
    /// The fitted line evaluated at each observed year.
    pub fitted: Vec<(f64, f64)>,
    /// The fitted line over the `horizon` years after the last observation.
    pub projected: Vec<(f64, f64)>,
}

/// Linear trend and projection per country. Countries with too few points
/// for a fit are skipped with a warning.
pub fn forecast(
    table: &WideTable,
    countries: &[String],
    indicator: &str,
    horizon: i32,
) -> Vec<CountryForecast> {
    let mut out = Vec::new();
    for (i, country) in countries.iter().enumerate() {
        let observed: Vec<(f64, f64)> = table
            .series(country, indicator)
            .into_iter()
            .filter_map(|(year, v)| v.map(|v| (year as f64, v)))
            .collect();
        let Some(fit) = LinearFit::fit(&observed) else {
            warn!(%country, points = observed.len(), "not enough data to fit a trend; skipping forecast");
            continue;
        };
        let last = observed.iter().map(|p| p.0).fold(f64::MIN, f64::max);
        let fitted = observed.iter().map(|&(x, _)| (x, fit.predict(x))).collect();
        let projected = (1..=horizon)
            .map(|k| {
                let x = last + k as f64;
                (x, fit.predict(x))
            })
            .collect();
        out.push(CountryForecast {
            country: country.clone(),
            color_index: i,
            fit,
            observed,
            fitted,
            projected,
        });
    }
    out
}
