//! Mask acquisition and result reporting.
//!
//! Everything touching the filesystem lives here; the camera and evaluation modules
//! only see in-memory grids.

pub mod report;

pub use report::{
    export_error_grid_csv, export_statistics_json, heatmap_image, GridRenderer,
    HeatmapRenderer, LogRenderer, UtilError,
};

use crate::evaluation::Mask;
use image::GrayImage;
use log::info;
use nalgebra::DMatrix;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix appended to the file stem of a generated mask.
pub const MASK_SUFFIX: &str = "-mask";

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to save mask {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Invalid image path: {0}")]
    InvalidPath(PathBuf),
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}

/// Source of masks, keyed by path.
pub trait GridLoader {
    fn load(&self, path: &Path) -> Result<Mask, LoadError>;
}

/// Loads any format the `image` crate decodes as an 8-bit grayscale mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageMaskLoader;

impl GridLoader for ImageMaskLoader {
    fn load(&self, path: &Path) -> Result<Mask, LoadError> {
        let image = image::open(path).map_err(|source| LoadError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let mask = mask_from_image(&image.to_luma8());
        info!(
            "Loaded {}x{} mask from {:?} ({} active pixels)",
            mask.width(),
            mask.height(),
            path,
            mask.active_count()
        );
        Ok(mask)
    }
}

pub fn mask_from_image(image: &GrayImage) -> Mask {
    Mask::new(DMatrix::from_fn(
        image.height() as usize,
        image.width() as usize,
        |row, col| image.get_pixel(col as u32, row as u32)[0],
    ))
}

pub fn mask_to_image(mask: &Mask) -> GrayImage {
    GrayImage::from_fn(mask.width() as u32, mask.height() as u32, |x, y| {
        image::Luma([mask.data()[(y as usize, x as usize)]])
    })
}

/// Path a generated mask is written to when none is given: `dir/<stem>-mask.<ext>`.
pub fn derived_mask_path(image_path: &Path) -> Result<PathBuf, LoadError> {
    let stem = image_path
        .file_stem()
        .ok_or_else(|| LoadError::InvalidPath(image_path.to_path_buf()))?;

    let mut file_name = stem.to_os_string();
    file_name.push(MASK_SUFFIX);
    if let Some(extension) = image_path.extension() {
        file_name.push(".");
        file_name.push(extension);
    }
    Ok(image_path.with_file_name(file_name))
}

/// Thresholds the image at `image_path` into a binary mask and writes it next to the
/// image, or to `output_path` when given.
pub fn generate_mask<L>(
    loader: &L,
    image_path: &Path,
    output_path: Option<&Path>,
) -> Result<(Mask, PathBuf), LoadError>
where
    L: ?Sized + GridLoader,
{
    let mask = loader.load(image_path)?.binarized();

    let output_path = match output_path {
        Some(path) => path.to_path_buf(),
        None => derived_mask_path(image_path)?,
    };
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    mask_to_image(&mask)
        .save(&output_path)
        .map_err(|source| LoadError::Save {
            path: output_path.clone(),
            source,
        })?;
    info!("Saved binary mask: {:?}", output_path);

    Ok((mask, output_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::MASK_FOREGROUND;

    #[test]
    fn test_derived_mask_path() {
        assert_eq!(
            derived_mask_path(Path::new("data/fisheye.png")).unwrap(),
            PathBuf::from("data/fisheye-mask.png")
        );
        assert_eq!(
            derived_mask_path(Path::new("shot.v2.jpg")).unwrap(),
            PathBuf::from("shot.v2-mask.jpg")
        );
        assert_eq!(
            derived_mask_path(Path::new("raw")).unwrap(),
            PathBuf::from("raw-mask")
        );
        assert!(matches!(
            derived_mask_path(Path::new("/")),
            Err(LoadError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_mask_image_conversion() {
        let image = GrayImage::from_fn(4, 3, |x, y| image::Luma([(x + 10 * y) as u8]));

        let mask = mask_from_image(&image);

        assert_eq!(mask.shape(), (3, 4));
        assert_eq!(mask.data()[(2, 1)], 21);
        assert_eq!(mask_to_image(&mask), image);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ImageMaskLoader.load(Path::new("does/not/exist.png"));
        assert!(matches!(result, Err(LoadError::Image { .. })));
    }

    #[test]
    fn test_generate_mask() {
        let dir = std::env::temp_dir().join("double_sphere_check_generate_mask");
        fs::create_dir_all(&dir).unwrap();
        let image_path = dir.join("fisheye.png");
        GrayImage::from_fn(6, 4, |x, y| image::Luma([if x > y { 7 } else { 0 }]))
            .save(&image_path)
            .unwrap();

        let (mask, mask_path) = generate_mask(&ImageMaskLoader, &image_path, None).unwrap();

        assert_eq!(mask_path, dir.join("fisheye-mask.png"));
        assert_eq!(mask.data()[(0, 1)], MASK_FOREGROUND);
        assert_eq!(mask.data()[(1, 0)], 0);

        let reloaded = ImageMaskLoader.load(&mask_path).unwrap();
        assert_eq!(reloaded, mask);
    }

    #[test]
    fn test_generate_mask_save_failure() {
        let dir = std::env::temp_dir().join("double_sphere_check_generate_mask_save");
        fs::create_dir_all(&dir).unwrap();
        let image_path = dir.join("fisheye.png");
        GrayImage::from_fn(3, 3, |x, _| image::Luma([x as u8]))
            .save(&image_path)
            .unwrap();

        let output_path = dir.join("mask.unknownformat");
        let err = generate_mask(&ImageMaskLoader, &image_path, Some(&output_path)).unwrap_err();

        assert!(matches!(err, LoadError::Save { ref path, .. } if *path == output_path));
        assert!(err.to_string().starts_with("Failed to save mask"));
    }
}
