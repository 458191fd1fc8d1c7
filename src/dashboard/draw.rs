// src/dashboard/draw.rs

use anyhow::Result;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use tracing::{info, warn};

use super::panels::{
    change_bars, forecast, latest_bars, scatter_points, trend_segments, Bar, CountryForecast,
    CountrySeries, Panel, CHANGE_FROM_YEAR, CHANGE_TO_YEAR, FORECAST_HORIZON,
};
use super::style::DashboardStyle;
use crate::table::{WideTable, FEMALE_LABOR_FORCE, FERTILITY_RATE, TEEN_BIRTH_RATE};

/// How a single panel ended up on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelStatus {
    Drawn,
    /// Required columns were absent.
    Placeholder,
    /// Drawing errored; a placeholder was drawn instead.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelReport {
    pub panel: Panel,
    pub status: PanelStatus,
}

const FERTILITY_AXIS: &str = "Fertility Rate (births per woman)";

fn font<'a>(style: &'a DashboardStyle, size: f64, weight: FontStyle) -> FontDesc<'a> {
    FontDesc::new(FontFamily::from(style.font_family.as_str()), size, weight)
}

/// Title band, 3x2 panel grid and source footer.
pub fn draw_dashboard<DB>(
    root: &DrawingArea<DB, Shift>,
    countries: &[String],
    table: &WideTable,
    style: &DashboardStyle,
) -> Result<Vec<PanelReport>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&style.figure_background.rgb())?;

    let (w, _) = root.dim_in_pixel();
    let band = (style.title_size * 2.2) as u32;
    let (head, body) = root.split_vertically(band);
    let title = font(style, style.title_size, FontStyle::Bold)
        .color(&style.title_color.rgb())
        .pos(Pos::new(HPos::Center, VPos::Center));
    if let Err(e) = head.draw_text(&style.title, &title, ((w / 2) as i32, (band / 2) as i32)) {
        warn!(error = %e, "could not draw dashboard title");
    }

    let (_, body_h) = body.dim_in_pixel();
    let footer_h = (style.tick_size * 2.5) as u32;
    let (grid, footer) = body.split_vertically(body_h.saturating_sub(footer_h));
    let note = font(style, style.tick_size, FontStyle::Normal)
        .color(&style.text_color.rgb())
        .pos(Pos::new(HPos::Left, VPos::Center));
    if let Err(e) = footer.draw_text(&style.source_note, &note, (20, (footer_h / 2) as i32)) {
        warn!(error = %e, "could not draw source note");
    }

    let areas = grid.margin(10, 10, 20, 20).split_evenly((3, 2));
    let reports = areas
        .iter()
        .zip(Panel::ALL)
        .map(|(area, panel)| draw_guarded(area, panel, countries, table, style))
        .collect();
    Ok(reports)
}

/// Draw one panel, never letting it take down the rest of the dashboard.
fn draw_guarded<DB>(
    area: &DrawingArea<DB, Shift>,
    panel: Panel,
    countries: &[String],
    table: &WideTable,
    style: &DashboardStyle,
) -> PanelReport
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let missing = panel.missing_columns(table);
    let status = if !missing.is_empty() {
        info!(panel = panel.name(), ?missing, "required columns absent; drawing placeholder");
        PanelStatus::Placeholder
    } else {
        match draw_panel(area, panel, countries, table, style) {
            Ok(()) => return PanelReport { panel, status: PanelStatus::Drawn },
            Err(e) => {
                let msg = format!("{:#}", e);
                warn!(panel = panel.name(), error = %msg, "panel failed; drawing placeholder");
                PanelStatus::Failed(msg)
            }
        }
    };

    if let Err(e) = draw_placeholder(area, style, panel.placeholder()) {
        warn!(panel = panel.name(), error = %e, "could not draw placeholder");
    }
    PanelReport { panel, status }
}

fn draw_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    panel: Panel,
    countries: &[String],
    table: &WideTable,
    style: &DashboardStyle,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let plot = with_subtitle(area, style, panel.subtitle())?;
    let title = panel.title(table);
    match panel {
        Panel::FertilityTrend => {
            let series = trend_segments(table, countries, FERTILITY_RATE);
            draw_lines(&plot, style, &title, &series, FERTILITY_AXIS)
        }
        Panel::LatestRates => {
            let bars = latest_bars(table, FERTILITY_RATE)
                .map(|(_, bars)| bars)
                .unwrap_or_default();
            draw_bars(&plot, style, &title, &bars, FERTILITY_AXIS)
        }
        Panel::LaborScatter => {
            let series = scatter_points(table, countries, FEMALE_LABOR_FORCE, FERTILITY_RATE);
            draw_scatter(&plot, style, &title, &series)
        }
        Panel::TeenBirthTrend => {
            let series = trend_segments(table, countries, TEEN_BIRTH_RATE);
            draw_lines(&plot, style, &title, &series, "Births per 1,000 women ages 15-19")
        }
        Panel::FertilityChange => {
            let bars = change_bars(table, FERTILITY_RATE, CHANGE_FROM_YEAR, CHANGE_TO_YEAR);
            draw_bars(&plot, style, &title, &bars, "Change in Fertility Rate")
        }
        Panel::Forecast => {
            let forecasts = forecast(table, countries, FERTILITY_RATE, FORECAST_HORIZON);
            draw_forecast(&plot, style, &title, &forecasts)
        }
    }
}

/// Reserve a strip under the chart for the italic subtitle; returns the
/// area left for the chart.
fn with_subtitle<DB>(
    area: &DrawingArea<DB, Shift>,
    style: &DashboardStyle,
    text: &str,
) -> Result<DrawingArea<DB, Shift>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (w, h) = area.dim_in_pixel();
    let strip = (style.subtitle_size * 2.2) as u32;
    let (plot, below) = area.split_vertically(h.saturating_sub(strip));
    let sub = font(style, style.subtitle_size, FontStyle::Italic)
        .color(&style.text_color.rgb())
        .pos(Pos::new(HPos::Center, VPos::Center));
    below.draw_text(text, &sub, ((w / 2) as i32, (strip / 2) as i32))?;
    Ok(plot)
}

fn draw_placeholder<DB>(area: &DrawingArea<DB, Shift>, style: &DashboardStyle, message: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    area.fill(&style.panel_background.rgb())?;
    let (w, h) = area.dim_in_pixel();
    let text = font(style, style.label_size, FontStyle::Normal)
        .color(&style.title_color.rgb())
        .pos(Pos::new(HPos::Center, VPos::Center));
    area.draw_text(message, &text, ((w / 2) as i32, (h / 2) as i32))?;
    Ok(())
}

/// `(min, max)` padded by 5% of the span; a flat or empty range is widened
/// so the axis still has extent.
fn padded_range(values: impl Iterator<Item = f64>, fallback: (f64, f64)) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return fallback;
    }
    if hi - lo < f64::EPSILON {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

/// Bar axis: always includes zero, with room for the value labels.
fn bar_range(bars: &[Bar]) -> (f64, f64) {
    let lo = bars.iter().map(|b| b.value).fold(0.0, f64::min);
    let hi = bars.iter().map(|b| b.value).fold(0.0, f64::max);
    let span = (hi - lo).max(1e-9);
    let lo = if lo < 0.0 { lo - span * 0.2 } else { 0.0 };
    let hi = if hi > 0.0 { hi + span * 0.2 } else { 0.0 };
    if hi - lo < f64::EPSILON {
        (-1.0, 1.0)
    } else {
        (lo, hi)
    }
}

/// Category label for a bar axis tick; only integer ticks get a name.
fn category_label(names: &[String], y: f64) -> String {
    let i = y.round();
    if (y - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    names.get(i as usize).cloned().unwrap_or_default()
}

/// Value labels sit past the bar end: right of positive bars, left of the rest.
fn value_label_anchor(value: f64) -> HPos {
    if value > 0.0 {
        HPos::Left
    } else {
        HPos::Right
    }
}

fn draw_lines<DB>(
    area: &DrawingArea<DB, Shift>,
    style: &DashboardStyle,
    title: &str,
    series: &[CountrySeries],
    y_desc: &str,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x0, x1) = padded_range(series.iter().flat_map(|s| s.points()).map(|p| p.0), (0.0, 1.0));
    let (y0, y1) = padded_range(series.iter().flat_map(|s| s.points()).map(|p| p.1), (0.0, 1.0));

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .caption(title, font(style, style.panel_title_size, FontStyle::Bold).color(&style.title_color.rgb()))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    chart.plotting_area().fill(&style.panel_background.rgb())?;

    chart
        .configure_mesh()
        .light_line_style(style.grid_color.rgb().mix(0.7))
        .bold_line_style(style.grid_color.rgb())
        .x_desc("Year")
        .y_desc(y_desc)
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .axis_desc_style(font(style, style.label_size, FontStyle::Normal).color(&style.text_color.rgb()))
        .label_style(font(style, style.tick_size, FontStyle::Normal).color(&style.text_color.rgb()))
        .draw()?;

    for s in series {
        let color = style.color(s.color_index);
        for (k, segment) in s.segments.iter().enumerate() {
            let drawn = chart.draw_series(LineSeries::new(segment.iter().copied(), color.stroke_width(2)))?;
            if k == 0 {
                drawn
                    .label(&s.country)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            }
        }
    }

    if series.iter().any(|s| !s.segments.is_empty()) {
        draw_legend(&mut chart, style)?;
    }
    Ok(())
}

fn draw_scatter<DB>(
    area: &DrawingArea<DB, Shift>,
    style: &DashboardStyle,
    title: &str,
    series: &[CountrySeries],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x0, x1) = padded_range(series.iter().flat_map(|s| s.points()).map(|p| p.0), (0.0, 100.0));
    let (y0, y1) = padded_range(series.iter().flat_map(|s| s.points()).map(|p| p.1), (0.0, 1.0));

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .caption(title, font(style, style.panel_title_size, FontStyle::Bold).color(&style.title_color.rgb()))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    chart.plotting_area().fill(&style.panel_background.rgb())?;

    chart
        .configure_mesh()
        .light_line_style(style.grid_color.rgb().mix(0.7))
        .bold_line_style(style.grid_color.rgb())
        .x_desc("Female Labor Force Participation Rate (%)")
        .y_desc(FERTILITY_AXIS)
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .axis_desc_style(font(style, style.label_size, FontStyle::Normal).color(&style.text_color.rgb()))
        .label_style(font(style, style.tick_size, FontStyle::Normal).color(&style.text_color.rgb()))
        .draw()?;

    for s in series.iter().filter(|s| !s.segments.is_empty()) {
        let color = style.color(s.color_index);
        chart
            .draw_series(s.points().map(|p| Circle::new(p, 4, color.mix(0.7).filled())))?
            .label(&s.country)
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    if series.iter().any(|s| !s.segments.is_empty()) {
        draw_legend(&mut chart, style)?;
    }
    Ok(())
}

fn draw_bars<DB>(
    area: &DrawingArea<DB, Shift>,
    style: &DashboardStyle,
    title: &str,
    bars: &[Bar],
    x_desc: &str,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x0, x1) = bar_range(bars);
    let n = bars.len().max(1);
    let names: Vec<String> = bars.iter().map(|b| b.label.clone()).collect();

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .caption(title, font(style, style.panel_title_size, FontStyle::Bold).color(&style.title_color.rgb()))
        .set_label_area_size(LabelAreaPosition::Left, 110)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d(x0..x1, -0.5..(n as f64 - 0.5))?;
    chart.plotting_area().fill(&style.panel_background.rgb())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .light_line_style(style.grid_color.rgb().mix(0.7))
        .bold_line_style(style.grid_color.rgb())
        .y_labels(n)
        .y_label_formatter(&|y| category_label(&names, *y))
        .x_label_formatter(&|v| format!("{:.1}", v))
        .x_desc(x_desc)
        .axis_desc_style(font(style, style.label_size, FontStyle::Normal).color(&style.text_color.rgb()))
        .label_style(font(style, style.tick_size, FontStyle::Normal).color(&style.text_color.rgb()))
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, b)| {
        let y = i as f64;
        Rectangle::new([(0.0, y - 0.35), (b.value, y + 0.35)], style.color(i).filled())
    }))?;

    let value_font = font(style, style.tick_size, FontStyle::Normal).color(&style.title_color.rgb());
    chart.draw_series(bars.iter().enumerate().map(|(i, b)| {
        Text::new(
            format!("{:.2}", b.value),
            (b.value, i as f64),
            value_font.clone().pos(Pos::new(value_label_anchor(b.value), VPos::Center)),
        )
    }))?;

    Ok(())
}

fn draw_forecast<DB>(
    area: &DrawingArea<DB, Shift>,
    style: &DashboardStyle,
    title: &str,
    forecasts: &[CountryForecast],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let all = || {
        forecasts
            .iter()
            .flat_map(|f| f.observed.iter().chain(&f.fitted).chain(&f.projected).copied())
    };
    let (x0, x1) = padded_range(all().map(|p| p.0), (0.0, 1.0));
    let (y0, y1) = padded_range(all().map(|p| p.1), (0.0, 1.0));

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .caption(title, font(style, style.panel_title_size, FontStyle::Bold).color(&style.title_color.rgb()))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    chart.plotting_area().fill(&style.panel_background.rgb())?;

    chart
        .configure_mesh()
        .light_line_style(style.grid_color.rgb().mix(0.7))
        .bold_line_style(style.grid_color.rgb())
        .x_desc("Year")
        .y_desc(FERTILITY_AXIS)
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .axis_desc_style(font(style, style.label_size, FontStyle::Normal).color(&style.text_color.rgb()))
        .label_style(font(style, style.tick_size, FontStyle::Normal).color(&style.text_color.rgb()))
        .draw()?;

    for f in forecasts {
        let color = style.color(f.color_index);
        chart
            .draw_series(f.observed.iter().map(|&p| Circle::new(p, 3, color.mix(0.5).filled())))?
            .label(format!("{} (Data)", f.country))
            .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.mix(0.5).filled()));
        chart
            .draw_series(LineSeries::new(f.fitted.iter().copied(), color.stroke_width(2)))?
            .label(format!("{} (Trend)", f.country))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(DashedLineSeries::new(
            f.projected.iter().copied(),
            8,
            5,
            color.stroke_width(2),
        ))?;
    }

    if !forecasts.is_empty() {
        draw_legend(&mut chart, style)?;
    }
    Ok(())
}

fn draw_legend<'a, DB>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    style: &DashboardStyle,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
{
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.3))
        .label_font(font(style, style.tick_size, FontStyle::Normal).color(&style.text_color.rgb()))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;
    Ok(())
}
