use std::fmt::Display;

use crate::components::raster::Grid;

pub const PERCENTILES: [u8; 5] = [5, 25, 50, 75, 95];

/// Distribution of a float raster, ignoring no-data cells.
///
/// Value fields are `NaN` when no cell is valid.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSummary {
    pub cells: usize,
    pub valid: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub std_dev: f64,
    /// Linearly interpolated, for each of [PERCENTILES].
    pub percentiles: [f32; 5],
    /// Share of valid cells above zero, in `[0, 1]`.
    pub positive_share: f64,
}

impl RasterSummary {
    pub fn from_grid(grid: &Grid<f32>) -> Self {
        let mut values: Vec<f32> = grid
            .data()
            .iter()
            .copied()
            .filter(|value| !value.is_nan())
            .collect();
        values.sort_by(f32::total_cmp);

        let valid = values.len();
        let mean = values.iter().map(|&value| value as f64).sum::<f64>() / valid as f64;
        let variance = values
            .iter()
            .map(|&value| (value as f64 - mean).powi(2))
            .sum::<f64>()
            / valid as f64;
        let positive = values.iter().filter(|&&value| value > 0.).count();

        Self {
            cells: grid.cell_count(),
            valid,
            min: values.first().copied().unwrap_or(f32::NAN),
            max: values.last().copied().unwrap_or(f32::NAN),
            mean,
            std_dev: variance.sqrt(),
            percentiles: PERCENTILES.map(|percentile| interpolate(&values, percentile)),
            positive_share: positive as f64 / valid as f64,
        }
    }

    pub fn no_data(&self) -> usize {
        self.cells - self.valid
    }
}

fn interpolate(sorted: &[f32], percentile: u8) -> f32 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return f32::NAN;
    };
    let rank = percentile as f64 / 100. * last as f64;
    let below = rank.floor() as usize;
    let above = rank.ceil() as usize;
    let (low, high) = (sorted[below] as f64, sorted[above] as f64);
    (low + (high - low) * (rank - below as f64)) as f32
}

impl Display for RasterSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} cells, {} valid, {} no-data",
            self.cells,
            self.valid,
            self.no_data()
        )?;
        if self.valid == 0 {
            return write!(f, "no valid cells");
        }
        writeln!(
            f,
            "min {:.4}  max {:.4}  mean {:.4}  std {:.4}",
            self.min, self.max, self.mean, self.std_dev
        )?;
        for (percentile, value) in PERCENTILES.iter().zip(self.percentiles) {
            write!(f, "p{percentile} {value:.4}  ")?;
        }
        write!(f, "\npositive cells {:.1}%", self.positive_share * 100.)
    }
}
