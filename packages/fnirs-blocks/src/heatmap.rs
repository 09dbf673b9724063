//! Numeric grids handed to heatmap renderers.

use crate::error::Result;
use crate::pivot::RegionPivotTable;
use std::path::Path;

/// Trials × blocks values for one region. Absent cells are `NaN`.
#[derive(Debug, Clone)]
pub struct HeatmapGrid {
    pub region: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl HeatmapGrid {
    pub fn from_table(table: &RegionPivotTable) -> Self {
        Self {
            region: table.region.clone(),
            row_labels: table.rows.iter().map(|r| r.trial.clone()).collect(),
            col_labels: table.blocks.clone(),
            values: table
                .rows
                .iter()
                .map(|r| r.cells.iter().map(|c| c.value().unwrap_or(f64::NAN)).collect())
                .collect(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn n_cols(&self) -> usize {
        self.col_labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0 || self.n_cols() == 0
    }

    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.values[row][col].is_nan()
    }

    /// (min, max) over present cells, or `None` if every cell is missing
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Draws a grid to an image file
pub trait HeatmapRenderer {
    fn render(&self, grid: &HeatmapGrid, path: &Path) -> Result<()>;
}
