//! PNG heatmaps drawn with the plotters bitmap backend.
//!
//! Text uses the DejaVu Sans face embedded in the binary through plotters'
//! `ab_glyph` font backend, so rendering never depends on system fonts.

use fnirs_blocks::{Chromophore, FnirsError, HeatmapGrid, HeatmapRenderer, Result};
use plotters::prelude::*;
use plotters::style::colors::colormaps::{ColorMap, ViridisRGB};
use plotters::style::register_font;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use std::sync::OnceLock;

const FONT_FAMILY: &str = "sans-serif";
const FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

const CELL_WIDTH: u32 = 104;
const CELL_HEIGHT: u32 = 44;
const MARGIN: u32 = 20;
const TITLE_HEIGHT: u32 = 40;
const AXIS_TITLE: u32 = 24;
const TICK_HEIGHT: u32 = 24;
const BAR_WIDTH: u32 = 20;
const BAR_LABELS: u32 = 96;
/// Rough advance of one glyph at `TICK_SIZE`, for sizing the trial label column
const CHAR_WIDTH: u32 = 8;
const TITLE_SIZE: f64 = 20.0;
const AXIS_SIZE: f64 = 16.0;
const TICK_SIZE: f64 = 14.0;
const ANNOT_SIZE: f64 = 12.0;
/// Outside the viridis range, so "no data" never reads as a scale extreme
const MISSING_COLOR: RGBColor = RGBColor(190, 190, 190);
const GRID_COLOR: RGBColor = RGBColor(128, 128, 128);

static FONT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

fn ensure_font() -> Result<()> {
    FONT.get_or_init(|| {
        register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES)
            .map_err(|_| "embedded font could not be parsed".to_string())
    })
    .clone()
    .map_err(FnirsError::Render)
}

/// Renders grids with a zero-centred viridis scale, tick labels and
/// per-cell value annotations
#[derive(Debug, Clone, Copy, Default)]
pub struct PngHeatmapRenderer {
    chromophore: Chromophore,
}

impl PngHeatmapRenderer {
    pub fn new(chromophore: Chromophore) -> Self {
        Self { chromophore }
    }
}

impl HeatmapRenderer for PngHeatmapRenderer {
    fn render(&self, grid: &HeatmapGrid, path: &Path) -> Result<()> {
        ensure_font()?;
        draw(grid, self.chromophore, path).map_err(|e| FnirsError::Render(e.to_string()))
    }
}

/// Map a value onto [0, 1] symmetrically around zero
fn normalize(value: f64, bound: f64) -> f64 {
    if bound <= 0.0 {
        return 0.5;
    }
    ((value + bound) / (2.0 * bound)).clamp(0.0, 1.0)
}

/// Shorten a label to at most `max_chars` characters
fn fit_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let mut short: String = label.chars().take(max_chars.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// Scientific notation with two decimals, the usual annotation for concentrations
fn format_value(value: f64) -> String {
    format!("{:.2e}", value)
}

fn draw(
    grid: &HeatmapGrid,
    chromophore: Chromophore,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let n_rows = grid.n_rows().max(1) as u32;
    let n_cols = grid.n_cols().max(1) as u32;
    let label_chars = grid
        .row_labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0) as u32;

    let plot_x0 = MARGIN + AXIS_TITLE + label_chars * CHAR_WIDTH + 12;
    let plot_y0 = MARGIN + TITLE_HEIGHT;
    let plot_width = n_cols * CELL_WIDTH;
    let plot_height = n_rows * CELL_HEIGHT;
    let width = plot_x0 + plot_width + MARGIN + BAR_WIDTH + BAR_LABELS + MARGIN;
    let height = plot_y0 + plot_height + TICK_HEIGHT + AXIS_TITLE + MARGIN;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let centered = Pos::new(HPos::Center, VPos::Center);
    let title = (FONT_FAMILY, TITLE_SIZE).into_font().color(&BLACK).pos(centered);
    let axis = (FONT_FAMILY, AXIS_SIZE).into_font().color(&BLACK).pos(centered);
    let tick = (FONT_FAMILY, TICK_SIZE).into_font().color(&BLACK);

    root.draw_text(
        &format!("{} Averages: {}", chromophore, grid.region),
        &title,
        ((width / 2) as i32, (MARGIN + TITLE_HEIGHT / 2) as i32),
    )?;

    let bound = grid
        .value_range()
        .map_or(0.0, |(lo, hi)| lo.abs().max(hi.abs()));

    if grid.is_empty() {
        root.draw(&cell_rect(plot_x0, plot_y0, 0, 0, MISSING_COLOR))?;
    }
    for (r, row) in grid.values.iter().enumerate() {
        for (c, &value) in row.iter().enumerate() {
            let rect = cell_rect(plot_x0, plot_y0, r as u32, c as u32, MISSING_COLOR);
            if grid.is_missing(r, c) {
                root.draw(&rect)?;
                continue;
            }
            let norm = normalize(value, bound);
            root.draw(&cell_rect(
                plot_x0,
                plot_y0,
                r as u32,
                c as u32,
                ViridisRGB.get_color(norm),
            ))?;
            // viridis is dark below the midpoint
            let ink = if norm < 0.5 { &WHITE } else { &BLACK };
            let annot = (FONT_FAMILY, ANNOT_SIZE).into_font().color(ink).pos(centered);
            let (cx, cy) = cell_center(plot_x0, plot_y0, r as u32, c as u32);
            root.draw_text(&format_value(value), &annot, (cx, cy))?;
        }
    }

    let row_tick = tick.pos(Pos::new(HPos::Right, VPos::Center));
    for (r, label) in grid.row_labels.iter().enumerate() {
        let (_, cy) = cell_center(plot_x0, plot_y0, r as u32, 0);
        root.draw_text(label, &row_tick, (plot_x0 as i32 - 6, cy))?;
    }
    let col_tick = tick.pos(Pos::new(HPos::Center, VPos::Top));
    let max_chars = (CELL_WIDTH / CHAR_WIDTH) as usize;
    for (c, label) in grid.col_labels.iter().enumerate() {
        let (cx, _) = cell_center(plot_x0, plot_y0, 0, c as u32);
        root.draw_text(
            &fit_label(label, max_chars),
            &col_tick,
            (cx, (plot_y0 + plot_height + 6) as i32),
        )?;
    }

    root.draw_text(
        "Block",
        &axis,
        (
            (plot_x0 + plot_width / 2) as i32,
            (plot_y0 + plot_height + TICK_HEIGHT + AXIS_TITLE / 2) as i32,
        ),
    )?;
    root.draw_text(
        "Trial",
        &axis.transform(FontTransform::Rotate270),
        (
            (MARGIN + AXIS_TITLE / 2) as i32,
            (plot_y0 + plot_height / 2) as i32,
        ),
    )?;

    let bar_x = (plot_x0 + plot_width + MARGIN) as i32;
    let top = plot_y0 as i32;
    let bar_height = plot_height as i32;
    for i in 0..bar_height {
        let frac = 1.0 - i as f64 / (bar_height - 1).max(1) as f64;
        root.draw(&Rectangle::new(
            [(bar_x, top + i), (bar_x + BAR_WIDTH as i32, top + i + 1)],
            ViridisRGB.get_color(frac).filled(),
        ))?;
    }
    let bar_tick = tick.pos(Pos::new(HPos::Left, VPos::Center));
    let tick_x = bar_x + BAR_WIDTH as i32 + 4;
    root.draw_text(&format_value(bound), &bar_tick, (tick_x, top))?;
    root.draw_text(&format_value(0.0), &bar_tick, (tick_x, top + bar_height / 2))?;
    root.draw_text(&format_value(-bound), &bar_tick, (tick_x, top + bar_height))?;

    root.present()?;
    log::debug!(
        "Rendered {}x{} heatmap for '{}' to {}",
        grid.n_rows(),
        grid.n_cols(),
        grid.region,
        path.display()
    );
    Ok(())
}

fn cell_center(x0: u32, y0: u32, row: u32, col: u32) -> (i32, i32) {
    (
        (x0 + col * CELL_WIDTH + CELL_WIDTH / 2) as i32,
        (y0 + row * CELL_HEIGHT + CELL_HEIGHT / 2) as i32,
    )
}

fn cell_rect(x0: u32, y0: u32, row: u32, col: u32, color: RGBColor) -> Rectangle<(i32, i32)> {
    let left = (x0 + col * CELL_WIDTH) as i32;
    let top = (y0 + row * CELL_HEIGHT) as i32;
    let mut rect = Rectangle::new(
        [(left, top), (left + CELL_WIDTH as i32, top + CELL_HEIGHT as i32)],
        color.filled(),
    );
    rect.set_margin(0, 1, 0, 1);
    rect
}
