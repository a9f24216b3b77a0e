//! Rendering and export of round-trip results.

use crate::evaluation::ProjectionError;
use image::{Rgb, RgbImage};
use log::info;
use nalgebra::DMatrix;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum UtilError {
    #[error("Failed to save image: {0}")]
    ImageError(#[from] image::ImageError),
    #[error("Failed to write JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Failed to write CSV: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}

/// Colour used for cells whose residual is `NaN` or infinite.
pub const NON_FINITE_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

/// Viridis sampled at 0, 0.25, 0.5, 0.75 and 1.
const VIRIDIS: [[f64; 3]; 5] = [
    [68.0, 1.0, 84.0],
    [59.0, 82.0, 139.0],
    [33.0, 145.0, 140.0],
    [94.0, 201.0, 98.0],
    [253.0, 231.0, 37.0],
];

/// Presents an error grid together with its statistics.
pub trait GridRenderer {
    fn render(&self, error_grid: &DMatrix<f64>, statistics: &ProjectionError)
        -> Result<(), UtilError>;
}

/// Writes the error grid as a PNG heatmap.
#[derive(Debug, Clone)]
pub struct HeatmapRenderer {
    pub output_path: PathBuf,
}

impl HeatmapRenderer {
    pub fn new<P: AsRef<Path>>(output_path: P) -> Self {
        HeatmapRenderer {
            output_path: output_path.as_ref().to_path_buf(),
        }
    }
}

impl GridRenderer for HeatmapRenderer {
    fn render(
        &self,
        error_grid: &DMatrix<f64>,
        _statistics: &ProjectionError,
    ) -> Result<(), UtilError> {
        ensure_parent_dir(&self.output_path)?;
        heatmap_image(error_grid).save(&self.output_path)?;
        info!("Saved projection error heatmap: {:?}", self.output_path);
        Ok(())
    }
}

/// Logs the headline statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRenderer;

impl GridRenderer for LogRenderer {
    fn render(
        &self,
        error_grid: &DMatrix<f64>,
        statistics: &ProjectionError,
    ) -> Result<(), UtilError> {
        info!("Double Sphere Model - Projection Error");
        info!(
            "Grid: {}x{}, evaluated pixels: {}, non-finite: {}",
            error_grid.ncols(),
            error_grid.nrows(),
            statistics.count,
            statistics.non_finite
        );
        info!("min    = {:e}", statistics.min);
        info!("max    = {:e}", statistics.max);
        info!("mean   = {:e}", statistics.mean);
        info!("stddev = {:e}", statistics.stddev);
        Ok(())
    }
}

fn colormap(t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0) * (VIRIDIS.len() - 1) as f64;
    let i = (t.floor() as usize).min(VIRIDIS.len() - 2);
    let f = t - i as f64;
    let (a, b) = (VIRIDIS[i], VIRIDIS[i + 1]);
    Rgb([0, 1, 2].map(|c| (a[c] + f * (b[c] - a[c])).round() as u8))
}

/// Maps residuals linearly onto the colormap, scaled to the largest finite value.
pub fn heatmap_image(error_grid: &DMatrix<f64>) -> RgbImage {
    let max = error_grid
        .iter()
        .filter(|e| e.is_finite())
        .fold(0.0_f64, |a, &b| a.max(b));
    let scale = if max > 0.0 { 1.0 / max } else { 0.0 };

    RgbImage::from_fn(error_grid.ncols() as u32, error_grid.nrows() as u32, |x, y| {
        let error = error_grid[(y as usize, x as usize)];
        if error.is_finite() {
            colormap(error * scale)
        } else {
            NON_FINITE_COLOR
        }
    })
}

pub fn export_statistics_json(statistics: &ProjectionError, path: &Path) -> Result<(), UtilError> {
    ensure_parent_dir(path)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, statistics)?;
    info!("Exported statistics: {:?}", path);
    Ok(())
}

/// Writes the grid row by row, one CSV record per image row.
pub fn export_error_grid_csv(error_grid: &DMatrix<f64>, path: &Path) -> Result<(), UtilError> {
    ensure_parent_dir(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    for row in error_grid.row_iter() {
        writer.write_record(row.iter().map(|e| e.to_string()))?;
    }
    writer.flush()?;
    info!("Exported error grid: {:?}", path);
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), UtilError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
