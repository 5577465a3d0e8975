use crate::chart::ChartKind;
use crate::ir::{ChartDescription, Geometry, StyledSlice};
use crate::palette::{ACCENT, LINE_STROKE};
use crate::scale::category_label;
use crate::transform::{build_geometry, line_segments, monotone_curve};
use anyhow::{Context, Result};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters_backend::{
    BackendColor, BackendCoord, BackendTextStyle, DrawingBackend, DrawingErrorKind,
};
use std::panic;
use tracing::debug;

/// Most category labels drawn on an X axis before they start thinning out
const MAX_X_LABELS: usize = 20;
const CURVE_SAMPLES: usize = 12;
const AREA_BANDS: usize = 24;
const PIE_RADIUS: f64 = 150.0;
const LEGEND_ROW_HEIGHT: i32 = 22;

pub struct GraphConfig {
    pub title: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            title: None,
            width: 800,
            height: 400,
        }
    }
}

/// An RGB8 raster of a rendered chart
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    /// True when there is no visible region to capture
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}

/// Turns a chart description into pixels
pub trait ChartRenderer {
    fn render(&self, chart: &ChartDescription) -> Result<Frame>;
}

/// Draws charts with plotters into an in-memory bitmap
pub struct PlottersRenderer {
    config: GraphConfig,
}

impl PlottersRenderer {
    pub fn new(config: GraphConfig) -> Self {
        PlottersRenderer { config }
    }
}

type Area<'a> = DrawingArea<FontSafeBackend<BitMapBackend<'a>>, Shift>;
type Cartesian<'a, 'b> =
    ChartContext<'a, FontSafeBackend<BitMapBackend<'b>>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

impl ChartRenderer for PlottersRenderer {
    fn render(&self, chart: &ChartDescription) -> Result<Frame> {
        let (width, height) = (self.config.width, self.config.height);
        if width == 0 || height == 0 {
            anyhow::bail!("Cannot render a {}x{} chart", width, height);
        }

        debug!(kind = %chart.kind, items = chart.len(), width, height, "rendering chart");

        let mut buffer = vec![0u8; (width as usize) * (height as usize) * 3];
        {
            let backend = BitMapBackend::with_buffer(&mut buffer, (width, height));
            let root = FontSafeBackend::new(backend).into_drawing_area();

            root.fill(&WHITE).context("Failed to fill background")?;

            let area = match &self.config.title {
                Some(title) => root
                    .titled(title, ("sans-serif", 20))
                    .context("Failed to draw title")?,
                None => root.clone(),
            };

            match chart.kind {
                ChartKind::Bar => draw_bar_chart(&area, chart)?,
                ChartKind::Line => draw_line_chart(&area, chart)?,
                ChartKind::Area => draw_area_chart(&area, chart)?,
                ChartKind::Scatter => draw_scatter_chart(&area, chart)?,
                ChartKind::Pie => draw_pie_chart(&area, chart.slices())?,
            }

            root.present().context("Failed to present drawing")?;
        }

        Ok(Frame {
            width,
            height,
            pixels: buffer,
        })
    }
}

// =============================================================================
// Cartesian charts
// =============================================================================

fn build_cartesian<'a, 'b>(
    area: &'a Area<'b>,
    geometry: &Geometry,
    grid: bool,
) -> Result<Cartesian<'a, 'b>> {
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(
            geometry.x.domain.0..geometry.x.domain.1,
            geometry.y.domain.0..geometry.y.domain.1,
        )
        .context("Failed to build chart")?;

    let x_scale = &geometry.x;
    let category_formatter = |v: &f64| category_label(x_scale, *v).unwrap_or_default().to_string();

    {
        let mut mesh = chart.configure_mesh();
        if x_scale.is_categorical {
            mesh.x_labels(x_scale.categories.len().clamp(1, MAX_X_LABELS))
                .x_label_formatter(&category_formatter);
        }
        if !grid {
            mesh.disable_x_mesh().disable_y_mesh();
        }
        mesh.draw().context("Failed to draw mesh")?;
    }

    Ok(chart)
}

fn draw_bar_chart(area: &Area<'_>, chart: &ChartDescription) -> Result<()> {
    let geometry = build_geometry(chart);
    let mut cc = build_cartesian(area, &geometry, false)?;

    let bars: Vec<Rectangle<(f64, f64)>> = geometry
        .points
        .iter()
        .flatten()
        .map(|&(x, y)| Rectangle::new([(x - 0.4, 0.0), (x + 0.4, y)], ACCENT.filled()))
        .collect();

    let series = cc
        .draw_series(bars)
        .context("Failed to draw bar series")?;

    if let Some(y_field) = &chart.y_field {
        series
            .label(y_field.as_str())
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], ACCENT.filled()));
        draw_series_legend(&mut cc)?;
    }

    Ok(())
}

fn draw_line_chart(area: &Area<'_>, chart: &ChartDescription) -> Result<()> {
    let geometry = build_geometry(chart);
    let mut cc = build_cartesian(area, &geometry, false)?;
    let stroke = LINE_STROKE.stroke_width(2);

    let mut labelled = false;
    for segment in line_segments(&geometry.points) {
        let curve = monotone_curve(&segment, CURVE_SAMPLES);
        let series = cc
            .draw_series(LineSeries::new(curve, stroke))
            .context("Failed to draw line series")?;

        if !labelled {
            if let Some(y_field) = &chart.y_field {
                series.label(y_field.as_str()).legend(|(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], LINE_STROKE.stroke_width(2))
                });
                labelled = true;
            }
        }

        cc.draw_series(
            segment
                .iter()
                .map(|&p| Circle::new(p, 3, WHITE.filled())),
        )
        .context("Failed to draw line markers")?;
        cc.draw_series(
            segment
                .iter()
                .map(|&p| Circle::new(p, 3, LINE_STROKE.stroke_width(1))),
        )
        .context("Failed to draw line markers")?;
    }

    if labelled {
        draw_series_legend(&mut cc)?;
    }

    Ok(())
}

fn draw_area_chart(area: &Area<'_>, chart: &ChartDescription) -> Result<()> {
    let geometry = build_geometry(chart);
    let mut cc = build_cartesian(area, &geometry, false)?;

    let (low, high) = geometry.y.domain;
    let bands = fade_bands(low.min(0.0), high.max(0.0), AREA_BANDS);

    for segment in line_segments(&geometry.points) {
        let curve = monotone_curve(&segment, CURVE_SAMPLES);

        for band in &bands {
            if band.opacity <= 0.0 {
                continue;
            }
            let polygon = band_polygon(&curve, band.low, band.high);
            cc.draw_series(std::iter::once(Polygon::new(
                polygon,
                ACCENT.mix(band.opacity).filled(),
            )))
            .context("Failed to draw area fill")?;
        }

        cc.draw_series(LineSeries::new(curve, ACCENT.stroke_width(2)))
            .context("Failed to draw area border")?;
    }

    Ok(())
}

fn draw_scatter_chart(area: &Area<'_>, chart: &ChartDescription) -> Result<()> {
    let geometry = build_geometry(chart);
    let mut cc = build_cartesian(area, &geometry, true)?;

    cc.draw_series(
        geometry
            .points
            .iter()
            .flatten()
            .map(|&p| Circle::new(p, 4, ACCENT.filled())),
    )
    .context("Failed to draw scatter series")?;

    Ok(())
}

fn draw_series_legend<'a, 'b: 'a>(cc: &mut Cartesian<'a, 'b>) -> Result<()> {
    cc.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .context("Failed to draw legend")
}

/// A horizontal slice of the value axis and the fill opacity it gets
#[derive(Debug, Clone, PartialEq)]
pub struct FadeBand {
    pub low: f64,
    pub high: f64,
    pub opacity: f64,
}

/// Split `[bottom, top]` into bands whose opacity fades from 0.8 near the top
/// (first 5%) to 0 near the bottom (last 5%)
pub fn fade_bands(bottom: f64, top: f64, count: usize) -> Vec<FadeBand> {
    if count == 0 || top <= bottom {
        return Vec::new();
    }

    let step = (top - bottom) / count as f64;
    (0..count)
        .map(|i| {
            let low = bottom + step * i as f64;
            let high = low + step;
            let centre = (low + high) / 2.0;
            let offset = (top - centre) / (top - bottom);
            let opacity = if offset <= 0.05 {
                0.8
            } else if offset >= 0.95 {
                0.0
            } else {
                0.8 * (0.95 - offset) / 0.9
            };
            FadeBand { low, high, opacity }
        })
        .collect()
}

/// Outline of the region between the curve and zero, clipped to `[low, high]`.
/// Columns outside the band collapse to zero height.
fn band_polygon(curve: &[(f64, f64)], low: f64, high: f64) -> Vec<(f64, f64)> {
    let clip = |v: f64| v.clamp(low, high);
    let mut outline: Vec<(f64, f64)> = curve
        .iter()
        .map(|&(x, y)| (x, clip(y.max(0.0))))
        .collect();
    outline.extend(curve.iter().rev().map(|&(x, y)| (x, clip(y.min(0.0)))));
    outline
}

// =============================================================================
// Pie chart
// =============================================================================

fn draw_pie_chart(area: &Area<'_>, slices: &[StyledSlice]) -> Result<()> {
    let (width, height) = area.dim_in_pixel();
    let names: Vec<&str> = slices.iter().map(|s| s.slice.name.as_str()).collect();
    let legend = legend_layout(&names, width as i32);
    let legend_height = legend.iter().map(|&(_, y)| y).max().map_or(0, |y| y + LEGEND_ROW_HEIGHT + 8);

    let pie_height = (height as i32 - legend_height).max(1);
    let (pie_area, legend_area) = area.split_vertically(pie_height);

    let sizes = pie_sizes(slices);
    let total: f64 = sizes.iter().sum();

    if total > 0.0 {
        let (pw, ph) = pie_area.dim_in_pixel();
        let center = (pw as i32 / 2, ph as i32 / 2);
        let radius = PIE_RADIUS.min(f64::from(pw.min(ph)) / 2.0 - 24.0).max(8.0);
        let colors: Vec<RGBColor> = slices.iter().map(|s| s.fill.to_rgb()).collect();
        let labels: Vec<String> = slices.iter().map(|s| format_value(s.slice.value)).collect();

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.label_style(("sans-serif", 14).into_font().color(&BLACK));
        pie_area.draw(&pie).context("Failed to draw pie")?;
    } else {
        debug!("pie values sum to zero, drawing legend only");
    }

    for ((styled, name), &(x, y)) in slices.iter().zip(&names).zip(&legend) {
        let swatch = styled.fill.to_rgb();
        let y = y + 6;
        legend_area
            .draw(&Rectangle::new([(x, y), (x + 12, y + 12)], swatch.filled()))
            .context("Failed to draw legend swatch")?;
        legend_area
            .draw(&Text::new(
                name.to_string(),
                (x + 18, y),
                ("sans-serif", 14).into_font().color(&swatch),
            ))
            .context("Failed to draw legend label")?;
    }

    Ok(())
}

/// Sector sizes relative to the largest slice. Negative values count as
/// empty; scaling keeps the total finite for values near `f64::MAX`.
fn pie_sizes(slices: &[StyledSlice]) -> Vec<f64> {
    let largest = slices
        .iter()
        .map(|s| s.slice.value.max(0.0))
        .fold(0.0, f64::max);
    if largest <= 0.0 {
        return vec![0.0; slices.len()];
    }
    slices
        .iter()
        .map(|s| s.slice.value.max(0.0) / largest)
        .collect()
}

/// Top-left corner of each legend entry, wrapping rows to fit `width`
pub fn legend_layout(names: &[&str], width: i32) -> Vec<(i32, i32)> {
    let mut positions = Vec::with_capacity(names.len());
    let (mut x, mut y) = (10, 0);

    for name in names {
        let entry_width = 18 + 8 * name.chars().count() as i32 + 16;
        if x > 10 && x + entry_width > width {
            x = 10;
            y += LEGEND_ROW_HEIGHT;
        }
        positions.push((x, y));
        x += entry_width;
    }

    positions
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// =============================================================================
// Font-safe backend
// =============================================================================

/// Wraps a backend so that a missing or broken system font drops text instead
/// of failing the whole render
pub struct FontSafeBackend<DB> {
    inner: DB,
}

impl<DB> FontSafeBackend<DB> {
    pub fn new(inner: DB) -> Self {
        Self { inner }
    }
}

impl<DB: DrawingBackend> DrawingBackend for FontSafeBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: plotters_backend::BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: plotters_backend::BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: plotters_backend::BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn draw_circle<S: plotters_backend::BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_circle(center, radius, style, fill)
    }

    fn fill_polygon<S: plotters_backend::BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.fill_polygon(vert, style)
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        (iw, ih): (u32, u32),
        src: &[u8],
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, (iw, ih), src)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        match panic::catch_unwind(panic::AssertUnwindSafe(|| {
            self.inner.draw_text(text, style, pos)
        })) {
            Ok(Err(DrawingErrorKind::FontError(err))) => {
                debug!("skipping text {:?}: {}", text, err);
                Ok(())
            }
            Ok(result) => result,
            Err(_) => {
                debug!("font rasterizer panicked, skipping text {:?}", text);
                Ok(())
            }
        }
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        match panic::catch_unwind(panic::AssertUnwindSafe(|| {
            self.inner.estimate_text_size(text, style)
        })) {
            Ok(Ok(size)) => Ok(size),
            _ => {
                let size = style.size().max(1.0);
                let width = (text.chars().count() as f64 * size * 0.6).ceil() as u32;
                Ok((width, size.ceil() as u32))
            }
        }
    }
}
