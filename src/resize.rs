//! Downsized copies of field photos for the web map.

use image::imageops::FilterType;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Height keeping the aspect ratio of a `width` x `height` image at `fixed_width`.
pub fn scaled_height(width: u32, height: u32, fixed_width: u32) -> u32 {
    if width == 0 {
        return height.max(1);
    }
    let scaled = (f64::from(height) * f64::from(fixed_width) / f64::from(width)).round();
    (scaled as u32).max(1)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension.trim_start_matches('.')))
}

/// Writes a copy of every `*.<extension>` image in `origin_dir` into
/// `destination_dir`, resized to `fixed_width` pixels wide.
///
/// Existing destination files are left alone unless `overwrite` is set.
/// Returns the number of images written.
pub fn resize_images(
    origin_dir: &Path,
    destination_dir: &Path,
    extension: &str,
    fixed_width: u32,
    overwrite: bool,
) -> Result<usize> {
    let mut origin_paths: Vec<PathBuf> = fs::read_dir(origin_dir)
        .map_err(|e| Error::io(origin_dir, e))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && has_extension(path, extension))
        .collect();
    origin_paths.sort();

    fs::create_dir_all(destination_dir).map_err(|e| Error::io(destination_dir, e))?;

    let mut written = 0;
    for origin_path in &origin_paths {
        let Some(file_name) = origin_path.file_name() else {
            continue;
        };
        let destination_path = destination_dir.join(file_name);
        if destination_path.exists() && !overwrite {
            debug!("Skipping existing {:?}", destination_path);
            continue;
        }

        let image = image::open(origin_path)?;
        let height = scaled_height(image.width(), image.height(), fixed_width);
        let resized = image.resize_exact(fixed_width, height, FilterType::Lanczos3);
        // JPEG has no alpha channel
        let resized = if has_extension(&destination_path, "jpg")
            || has_extension(&destination_path, "jpeg")
        {
            DynamicImage::ImageRgb8(resized.to_rgb8())
        } else {
            resized
        };
        resized.save(&destination_path)?;
        written += 1;
    }

    info!(
        found = origin_paths.len(),
        written,
        fixed_width,
        "Resized images from {:?} to {:?}",
        origin_dir,
        destination_dir
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_image(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([120, 80, 40]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(400, 300, 200), 150);
        assert_eq!(scaled_height(1000, 1, 10), 1);
        assert_eq!(scaled_height(0, 30, 10), 30);
    }

    #[test]
    fn test_resize_images_keeps_aspect() {
        let origin = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        write_image(&origin.path().join("IMG-1.jpg"), 40, 20);
        write_image(&origin.path().join("IMG-2.JPG"), 30, 30);
        write_image(&origin.path().join("other.png"), 30, 30);

        let written =
            resize_images(origin.path(), destination.path(), "jpg", 10, false).unwrap();
        assert_eq!(written, 2);

        let resized = image::open(destination.path().join("IMG-1.jpg")).unwrap();
        assert_eq!((resized.width(), resized.height()), (10, 5));
        assert!(!destination.path().join("other.png").exists());
    }

    #[test]
    fn test_resize_images_skips_existing() {
        let origin = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        write_image(&origin.path().join("IMG-1.png"), 40, 20);
        write_image(&destination.path().join("IMG-1.png"), 4, 4);

        let written =
            resize_images(origin.path(), destination.path(), "png", 10, false).unwrap();
        assert_eq!(written, 0);
        let kept = image::open(destination.path().join("IMG-1.png")).unwrap();
        assert_eq!(kept.width(), 4);

        let written = resize_images(origin.path(), destination.path(), ".png", 10, true).unwrap();
        assert_eq!(written, 1);
        let replaced = image::open(destination.path().join("IMG-1.png")).unwrap();
        assert_eq!((replaced.width(), replaced.height()), (10, 5));
    }

    #[test]
    fn test_resize_images_missing_origin() {
        let destination = TempDir::new().unwrap();
        let missing = destination.path().join("missing");
        assert!(matches!(
            resize_images(&missing, destination.path(), "jpg", 10, false),
            Err(Error::Io { .. })
        ));
    }
}
