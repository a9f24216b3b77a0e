//! Binary mask generation.
//!
//! Thresholds a fisheye image so that every non-black pixel becomes foreground and
//! writes the result, by default next to the input as `<stem>-mask.<ext>`.
//!
//! Usage:
//! ```bash
//! cargo run --bin generate_mask -- -i samples/fisheye.png
//! ```

use clap::Parser;
use double_sphere_check::util::{generate_mask, ImageMaskLoader};
use flexi_logger::{colored_detailed_format, detailed_format, Duplicate, FileSpec, Logger};
use log::info;
use std::path::PathBuf;

/// Binary mask generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Fisheye image path
    #[arg(short = 'i', long)]
    image_path: PathBuf,

    /// Output path for the generated mask
    #[arg(short = 'o', long)]
    output_path: Option<PathBuf>,
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
    info!("Output Path: {:?}", cli.output_path);

    let (mask, output_path) =
        generate_mask(&ImageMaskLoader, &cli.image_path, cli.output_path.as_deref())?;
    info!(
        "Mask {}x{} with {} foreground pixels written to {:?}",
        mask.width(),
        mask.height(),
        mask.active_count(),
        output_path
    );

    Ok(())
}
