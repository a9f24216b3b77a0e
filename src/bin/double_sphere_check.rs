//! Double Sphere round-trip check.
//!
//! Unprojects every pixel of a lens mask with the given Double Sphere parameters,
//! projects it back and reports how far it lands from where it started.
//!
//! Usage:
//! ```bash
//! cargo run --bin double_sphere_check -- \
//!   --mask-path samples/fisheye-mask.png \
//!   --parameters -0.17023409 0.59679147 156.96507623 157.72873153 343 343
//! ```

use clap::{ArgGroup, Parser};
use double_sphere_check::camera::{CameraModel, DoubleSphereModel};
use double_sphere_check::evaluation::compute_round_trip_error;
use double_sphere_check::util::{
    export_error_grid_csv, export_statistics_json, generate_mask, GridLoader, GridRenderer,
    HeatmapRenderer, ImageMaskLoader, LogRenderer,
};
use flexi_logger::{colored_detailed_format, detailed_format, Duplicate, FileSpec, Logger};
use log::{info, warn};
use std::path::PathBuf;

/// Double Sphere projection error check
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("input").required(true).multiple(true).args(["image_path", "mask_path"])))]
struct Cli {
    /// Fisheye image; thresholded into a mask (written next to it) when no mask is given
    #[arg(short = 'i', long)]
    image_path: Option<PathBuf>,

    /// Binary mask of the lens footprint
    #[arg(short = 'm', long)]
    mask_path: Option<PathBuf>,

    /// Camera parameters: chi alpha fx fy cx cy
    #[arg(
        short = 'p',
        long,
        num_args = 1..,
        allow_negative_numbers = true,
        default_values_t = [-0.17023409, 0.59679147, 156.96507623, 157.72873153, 343.0, 343.0],
        conflicts_with = "camera"
    )]
    parameters: Vec<f64>,

    /// Camera parameters from a YAML calibration file instead of --parameters
    #[arg(short = 'c', long)]
    camera: Option<PathBuf>,

    /// Output path of the error heatmap
    #[arg(long, default_value = "output/double_sphere_projection_error.png")]
    heatmap: PathBuf,

    /// Optional JSON export of the statistics
    #[arg(long)]
    stats_json: Option<PathBuf>,

    /// Optional CSV export of the error grid
    #[arg(long)]
    grid_csv: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Logger::try_with_str("info")?
        .log_to_file(
            FileSpec::default()
                .directory("logs")
                .suppress_timestamp()
                .suffix("log"),
        )
        .duplicate_to_stdout(Duplicate::All)
        .format_for_files(detailed_format)
        .format_for_stdout(colored_detailed_format)
        .set_palette("196;208;76;39;178".to_string())
        .start()?;

    let cli = Cli::parse();

    info!("Image Path: {:?}", cli.image_path);
    info!("Mask Path: {:?}", cli.mask_path);

    let camera_model = match &cli.camera {
        Some(path) => {
            let path_str = path.to_str().ok_or("Invalid camera path string")?;
            DoubleSphereModel::load_from_yaml(path_str)?
        }
        None => DoubleSphereModel::new(&cli.parameters)?,
    };
    info!("Parameters: {:?}", camera_model.parameters());
    info!("Intrinsics: {:?}", camera_model.get_intrinsics());
    info!("Distortion: {:?}", camera_model.get_distortion());

    let loader = ImageMaskLoader;
    let mask = match (&cli.mask_path, &cli.image_path) {
        (Some(mask_path), _) => loader.load(mask_path)?,
        (None, Some(image_path)) => generate_mask(&loader, image_path, None)?.0,
        (None, None) => return Err("Either --image-path or --mask-path is required".into()),
    };

    let resolution = &camera_model.resolution;
    if resolution.width > 0
        && (resolution.width as usize, resolution.height as usize) != (mask.width(), mask.height())
    {
        warn!(
            "Mask is {}x{} but the camera was calibrated at {}x{}",
            mask.width(),
            mask.height(),
            resolution.width,
            resolution.height
        );
    }

    let report = compute_round_trip_error(&mask, &camera_model)?;

    LogRenderer.render(&report.error_grid, &report.statistics)?;
    HeatmapRenderer::new(&cli.heatmap).render(&report.error_grid, &report.statistics)?;

    if let Some(path) = &cli.stats_json {
        export_statistics_json(&report.statistics, path)?;
    }
    if let Some(path) = &cli.grid_csv {
        export_error_grid_csv(&report.error_grid, path)?;
    }

    Ok(())
}
