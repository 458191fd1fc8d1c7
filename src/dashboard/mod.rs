// src/dashboard/mod.rs

use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use std::io::Cursor;
use tracing::{info, instrument, warn};

use crate::table::WideTable;

pub mod draw;
pub mod panels;
pub mod style;

pub use draw::{PanelReport, PanelStatus};
pub use panels::Panel;
pub use style::{DashboardStyle, HexColor};

/// A rendered dashboard: encoded PNG plus what happened to each panel.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub png: Vec<u8>,
    pub panels: Vec<PanelReport>,
}

impl Dashboard {
    pub fn status(&self, panel: Panel) -> Option<&PanelStatus> {
        self.panels
            .iter()
            .find(|r| r.panel == panel)
            .map(|r| &r.status)
    }
}

/// Render the six-panel dashboard into an in-memory PNG.
///
/// `countries` are display names; their order fixes legend order and
/// palette slots. Returns `None` when there is no table or it has no rows.
#[instrument(level = "info", skip(table, style))]
pub fn render_dashboard(
    countries: &[String],
    table: Option<&WideTable>,
    style: &DashboardStyle,
) -> Result<Option<Dashboard>> {
    let Some(table) = table.filter(|t| !t.is_empty()) else {
        warn!("no data available; dashboard not rendered");
        return Ok(None);
    };
    info!(columns = ?table.indicator_columns(), rows = table.num_rows(), "available columns");

    let (w, h) = (style.width, style.height);
    let mut buf = vec![0u8; w as usize * h as usize * 3];
    let panels = {
        let root = BitMapBackend::with_buffer(&mut buf, (w, h)).into_drawing_area();
        let panels = draw::draw_dashboard(&root, countries, table, style)?;
        root.present().context("finalising dashboard bitmap")?;
        panels
    };

    let png = encode_png(buf, w, h)?;
    info!(bytes = png.len(), width = w, height = h, "rendered dashboard");
    Ok(Some(Dashboard { png, panels }))
}

fn encode_png(rgb: Vec<u8>, w: u32, h: u32) -> Result<Vec<u8>> {
    let img = RgbImage::from_raw(w, h, rgb).context("pixel buffer does not match dashboard size")?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .context("encoding dashboard PNG")?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::testing::table;
    use crate::table::{build_wide_table, FEMALE_LABOR_FORCE, FERTILITY_RATE, TEEN_BIRTH_RATE};

    fn small_style() -> DashboardStyle {
        DashboardStyle {
            width: 640,
            height: 480,
            ..DashboardStyle::default()
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn decode_size(png: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(png).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn no_table_or_empty_table_renders_nothing() {
        let style = small_style();
        assert!(render_dashboard(&names(&["Norway"]), None, &style)
            .unwrap()
            .is_none());

        let empty = build_wide_table(&[]).unwrap();
        assert!(render_dashboard(&names(&["Norway"]), Some(&empty), &style)
            .unwrap()
            .is_none());
    }

    #[test]
    fn missing_fertility_column_uses_placeholders() {
        let t = table(&[
            ("Norway", 2000, TEEN_BIRTH_RATE, 10.5),
            ("Norway", 2001, TEEN_BIRTH_RATE, 9.8),
        ]);
        let dash = render_dashboard(&names(&["Norway"]), Some(&t), &small_style())
            .unwrap()
            .unwrap();

        assert_eq!(dash.panels.len(), 6);
        for panel in Panel::ALL {
            let status = dash.status(panel).unwrap();
            if panel == Panel::TeenBirthTrend {
                assert_eq!(status, &PanelStatus::Drawn);
            } else {
                assert_eq!(status, &PanelStatus::Placeholder, "{:?}", panel);
            }
        }
        assert_eq!(decode_size(&dash.png), (640, 480));
    }

    #[test]
    fn full_table_draws_every_panel_region() {
        let mut cells = Vec::new();
        for (country, base) in [("Norway", 2.9), ("Sweden", 2.2), ("Iceland", 4.3)] {
            for (k, year) in [1960, 1990, 2022].into_iter().enumerate() {
                let k = k as f64;
                cells.push((country, year, FERTILITY_RATE, base - 0.5 * k));
                cells.push((country, year, TEEN_BIRTH_RATE, 40.0 - 12.0 * k));
                cells.push((country, year, FEMALE_LABOR_FORCE, 40.0 + 10.0 * k));
            }
        }
        let t = table(&cells);
        let countries = names(&["Norway", "Sweden", "Iceland"]);
        let dash = render_dashboard(&countries, Some(&t), &small_style())
            .unwrap()
            .unwrap();

        let panels: Vec<Panel> = dash.panels.iter().map(|r| r.panel).collect();
        assert_eq!(panels, Panel::ALL.to_vec());
        for report in &dash.panels {
            assert_eq!(report.status, PanelStatus::Drawn, "{:?}", report.panel);
        }
        assert_eq!(decode_size(&dash.png), (640, 480));
    }
}
