// src/dashboard/style.rs

use anyhow::{bail, Context, Result};
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An `#RRGGBB` color as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub u8, pub u8, pub u8);

impl HexColor {
    pub fn parse(raw: &str) -> Result<Self> {
        let hex = raw.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("invalid color {:?}, expected #RRGGBB", raw);
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .with_context(|| format!("parsing color {:?}", raw))
        };
        Ok(Self(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn rgb(self) -> RGBColor {
        RGBColor(self.0, self.1, self.2)
    }
}

impl TryFrom<String> for HexColor {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(c: HexColor) -> Self {
        c.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Everything the renderer needs to know about looks. Owned by the caller
/// and passed in, so dashboards with different styling can coexist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStyle {
    pub width: u32,
    pub height: u32,
    pub figure_background: HexColor,
    pub panel_background: HexColor,
    pub title_color: HexColor,
    pub text_color: HexColor,
    pub grid_color: HexColor,
    pub palette: Vec<HexColor>,
    pub font_family: String,
    pub title_size: f64,
    pub panel_title_size: f64,
    pub subtitle_size: f64,
    pub label_size: f64,
    pub tick_size: f64,
    pub title: String,
    pub source_note: String,
}

impl Default for DashboardStyle {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 1600,
            figure_background: HexColor(0xEC, 0xEF, 0xF4),
            panel_background: HexColor(0xE5, 0xE9, 0xF0),
            title_color: HexColor(0x2E, 0x34, 0x40),
            text_color: HexColor(0x4C, 0x56, 0x6A),
            grid_color: HexColor(0xD8, 0xDE, 0xE9),
            palette: vec![
                HexColor(0xFF, 0x6B, 0x6B),
                HexColor(0x4E, 0xCD, 0xC4),
                HexColor(0x45, 0xB7, 0xD1),
                HexColor(0xFF, 0xA0, 0x7A),
                HexColor(0x98, 0xD8, 0xC8),
            ],
            font_family: "sans-serif".to_string(),
            title_size: 36.0,
            panel_title_size: 22.0,
            subtitle_size: 15.0,
            label_size: 15.0,
            tick_size: 13.0,
            title: "Nordic Countries Fertility Analysis Dashboard".to_string(),
            source_note: "Data source: World Bank".to_string(),
        }
    }
}

impl DashboardStyle {
    /// Palette entry for position `i`, cycling when there are more series
    /// than colors.
    pub fn color(&self, i: usize) -> RGBColor {
        if self.palette.is_empty() {
            return self.title_color.rgb();
        }
        self.palette[i % self.palette.len()].rgb()
    }

    pub fn validate(&self) -> Result<()> {
        if self.width < 300 || self.height < 300 {
            bail!(
                "dashboard size {}x{} is too small (minimum 300x300)",
                self.width,
                self.height
            );
        }
        if self.palette.is_empty() {
            bail!("style.palette must contain at least one color");
        }
        Ok(())
    }
}
