//! Batch conversion of uploaded images into fixed-size JPEGs.
//!
//! Images are handled one at a time: open, decode, resize, encode, write.
//! A failing image becomes a [`ConversionOutcome::Failure`] and the batch
//! moves on; only provisioning the output directory can abort a run.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::db::model::ImageRecord;
use crate::decoder::ImageKind;
use crate::error::{ConvertError, ProvisionError};

/// Subdirectory of the image directory that receives converted files.
pub const CONVERTED_SUBDIR: &str = "converted";

pub const DEFAULT_WIDTH: u32 = 600;
pub const DEFAULT_HEIGHT: u32 = 600;

/// A successfully converted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    pub image_id: i64,
    pub source_name: String,
    pub source_location: String,
    pub converted_name: String,
    pub converted_location: PathBuf,
}

/// An image that could not be converted, with enough identity for an
/// operator to find the source file.
#[derive(Debug)]
pub struct FailedConversion {
    pub image_id: i64,
    pub source_name: String,
    pub source_location: String,
    pub cause: ConvertError,
}

impl fmt::Display for FailedConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source_location, self.cause)
    }
}

#[derive(Debug)]
pub enum ConversionOutcome {
    Success(ConvertedImage),
    Failure(FailedConversion),
}

/// Result of one batch. Each list keeps input order.
#[derive(Debug, Default)]
pub struct ConversionBatch {
    pub successes: Vec<ConvertedImage>,
    pub failures: Vec<FailedConversion>,
    /// Records whose extension is not a supported image type.
    pub skipped: Vec<ImageRecord>,
}

impl ConversionBatch {
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len() + self.skipped.len()
    }
}

/// Ensure `{host_dir}/converted` exists, creating missing parents.
pub fn provision_output_dir(host_dir: &Path) -> Result<PathBuf, ProvisionError> {
    let path = host_dir.join(CONVERTED_SUBDIR);
    fs::create_dir_all(&path).map_err(|source| ProvisionError {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Provision the output directory under `host_dir`, then convert every
/// image found there into it.
pub fn convert_pending(
    images: &[ImageRecord],
    host_dir: &Path,
    width: u32,
    height: u32,
) -> Result<ConversionBatch, ProvisionError> {
    let dest_dir = provision_output_dir(host_dir)?;
    Ok(convert_images(images, host_dir, &dest_dir, width, height))
}

/// Convert `images` read from `source_dir` into `dest_dir`, which must exist.
pub fn convert_images(
    images: &[ImageRecord],
    source_dir: &Path,
    dest_dir: &Path,
    width: u32,
    height: u32,
) -> ConversionBatch {
    let mut batch = ConversionBatch::default();
    for image in images {
        match convert_one(image, source_dir, dest_dir, width, height) {
            Some(ConversionOutcome::Success(converted)) => batch.successes.push(converted),
            Some(ConversionOutcome::Failure(failed)) => batch.failures.push(failed),
            None => {
                debug!(image_id = image.image_id, file = %image.file_name, "not an image; skipped");
                batch.skipped.push(image.clone());
            }
        }
    }
    batch
}

/// Convert a single record. `None` when the file is not a supported image.
///
/// All file handles opened here are closed before this returns.
pub fn convert_one(
    image: &ImageRecord,
    source_dir: &Path,
    dest_dir: &Path,
    width: u32,
    height: u32,
) -> Option<ConversionOutcome> {
    let source_path = source_dir.join(&image.file_name);
    let kind = ImageKind::for_path(&source_path)?;

    let outcome = match convert_file(kind, &source_path, image, dest_dir, width, height) {
        Ok((converted_name, converted_location)) => {
            debug!(image_id = image.image_id, dest = %converted_location.display(), "converted");
            ConversionOutcome::Success(ConvertedImage {
                image_id: image.image_id,
                source_name: image.file_name.clone(),
                source_location: image.location.clone(),
                converted_name,
                converted_location,
            })
        }
        Err(cause) => ConversionOutcome::Failure(FailedConversion {
            image_id: image.image_id,
            source_name: image.file_name.clone(),
            source_location: image.location.clone(),
            cause,
        }),
    };
    Some(outcome)
}

fn convert_file(
    kind: ImageKind,
    source_path: &Path,
    image: &ImageRecord,
    dest_dir: &Path,
    width: u32,
    height: u32,
) -> Result<(String, PathBuf), ConvertError> {
    let decoded = {
        let file = File::open(source_path).map_err(|source| ConvertError::Open {
            path: source_path.to_path_buf(),
            source,
        })?;
        kind.decode(BufReader::new(file))
            .map_err(|source| ConvertError::Decode {
                path: source_path.to_path_buf(),
                source,
            })?
    };

    // Stretches to the target box; aspect ratio is not kept.
    let resized = decoded.resize_exact(width, height, FilterType::Lanczos3);

    let converted_name = converted_file_name(image.image_id, &image.file_name);
    let dest_path = dest_dir.join(&converted_name);
    write_jpeg(&resized, &dest_path)?;
    Ok((converted_name, dest_path))
}

/// `{image_id}converted{stem}.jpg`; the same image always maps to the same file.
pub fn converted_file_name(image_id: i64, file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    format!("{image_id}converted{stem}.jpg")
}

fn write_jpeg(image: &DynamicImage, dest_path: &Path) -> Result<(), ConvertError> {
    let file = recreate(dest_path).map_err(|source| ConvertError::Create {
        path: dest_path.to_path_buf(),
        source,
    })?;
    let encode_err = |source: ImageError| ConvertError::Encode {
        path: dest_path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(file);
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(JpegEncoder::new(&mut writer))
        .map_err(encode_err)?;
    writer
        .flush()
        .map_err(|e| encode_err(ImageError::IoError(e)))?;
    Ok(())
}

/// Remove any previous output at `path`, then create it fresh.
fn recreate(path: &Path) -> io::Result<File> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    File::create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::{ImageFormat, Rgb, RgbImage};
    use tempfile::tempdir;

    fn record(dir: &Path, image_id: i64, file_name: &str) -> ImageRecord {
        ImageRecord {
            image_id,
            post_id: image_id,
            file_name: file_name.to_string(),
            location: dir.join(file_name).to_string_lossy().to_string(),
            converted_name: None,
            converted_location: None,
            uploaded_at: Utc::now(),
        }
    }

    fn write_image(dir: &Path, name: &str, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, Rgb([30, 120, 220]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn mixed_batch_keeps_order_and_skips_non_images() {
        let td = tempdir().unwrap();
        write_image(td.path(), "a.jpg", 32, 32);
        fs::write(td.path().join("b.txt"), "hello").unwrap();
        write_image(td.path(), "c.png", 16, 8);
        let images = vec![
            record(td.path(), 1, "a.jpg"),
            record(td.path(), 2, "b.txt"),
            record(td.path(), 3, "c.png"),
        ];

        let batch = convert_pending(&images, td.path(), 20, 20).unwrap();

        let names: Vec<_> = batch.successes.iter().map(|s| s.converted_name.as_str()).collect();
        assert_eq!(names, vec!["1converteda.jpg", "3convertedc.jpg"]);
        assert!(batch.failures.is_empty());
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].file_name, "b.txt");
        assert_eq!(batch.total(), images.len());

        let first = &batch.successes[0];
        assert_eq!(first.source_location, images[0].location);
        assert_eq!(
            first.converted_location,
            td.path().join(CONVERTED_SUBDIR).join("1converteda.jpg")
        );
        assert!(first.converted_location.is_file());
    }

    #[test]
    fn output_has_exact_target_dimensions() {
        let td = tempdir().unwrap();
        write_image(td.path(), "wide.png", 90, 10);
        write_image(td.path(), "tall.jpeg", 7, 50);
        let images = vec![
            record(td.path(), 1, "wide.png"),
            record(td.path(), 2, "tall.jpeg"),
        ];

        let batch = convert_pending(&images, td.path(), 24, 12).unwrap();

        assert_eq!(batch.successes.len(), 2);
        for converted in &batch.successes {
            let dims = image::image_dimensions(&converted.converted_location).unwrap();
            assert_eq!(dims, (24, 12));
            let format = ImageFormat::from_path(&converted.converted_location).unwrap();
            assert_eq!(format, ImageFormat::Jpeg);
        }
    }

    #[test]
    fn rerun_targets_and_overwrites_same_file() {
        let td = tempdir().unwrap();
        write_image(td.path(), "photo.png", 10, 10);
        let images = vec![record(td.path(), 42, "photo.png")];

        let first = convert_pending(&images, td.path(), 8, 8).unwrap();
        let second = convert_pending(&images, td.path(), 16, 16).unwrap();

        assert_eq!(first.successes[0].converted_name, "42convertedphoto.jpg");
        assert_eq!(first.successes[0].converted_name, second.successes[0].converted_name);
        assert!(second.failures.is_empty());
        let dims = image::image_dimensions(&second.successes[0].converted_location).unwrap();
        assert_eq!(dims, (16, 16));
    }

    #[test]
    fn bmp_sources_convert() {
        let td = tempdir().unwrap();
        write_image(td.path(), "legacy.BMP", 12, 6);
        let images = vec![record(td.path(), 5, "legacy.BMP")];

        let batch = convert_pending(&images, td.path(), 6, 6).unwrap();

        assert_eq!(batch.successes.len(), 1);
        assert_eq!(batch.successes[0].converted_name, "5convertedlegacy.jpg");
    }

    #[test]
    fn per_item_failures_do_not_abort_batch() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("broken.png"), b"definitely not a png").unwrap();
        write_image(td.path(), "ok.jpg", 10, 10);
        let images = vec![
            record(td.path(), 1, "missing.jpg"),
            record(td.path(), 2, "broken.png"),
            record(td.path(), 3, "ok.jpg"),
        ];

        let batch = convert_pending(&images, td.path(), 5, 5).unwrap();

        assert_eq!(batch.successes.len(), 1);
        assert_eq!(batch.successes[0].image_id, 3);
        assert_eq!(batch.failures.len(), 2);
        assert_eq!(batch.failures[0].image_id, 1);
        assert!(matches!(batch.failures[0].cause, ConvertError::Open { .. }));
        assert_eq!(batch.failures[1].image_id, 2);
        assert!(matches!(batch.failures[1].cause, ConvertError::Decode { .. }));
        assert!(batch.failures[1]
            .to_string()
            .starts_with(&images[1].location));
        assert_eq!(batch.total(), images.len());
    }

    #[test]
    fn unwritable_destination_is_a_per_item_failure() {
        let td = tempdir().unwrap();
        write_image(td.path(), "a.png", 4, 4);
        let dest = td.path().join(CONVERTED_SUBDIR);
        fs::create_dir_all(dest.join("1converteda.jpg")).unwrap();
        let images = vec![record(td.path(), 1, "a.png")];

        let batch = convert_images(&images, td.path(), &dest, 4, 4);

        assert!(batch.successes.is_empty());
        assert!(matches!(batch.failures[0].cause, ConvertError::Create { .. }));
    }

    #[test]
    fn provisioning_failure_aborts_before_any_item() {
        let td = tempdir().unwrap();
        write_image(td.path(), "a.png", 4, 4);
        // A regular file where the host directory should be.
        let host = td.path().join("host");
        fs::write(&host, "occupied").unwrap();
        let images = vec![record(td.path(), 1, "a.png")];

        let err = convert_pending(&images, &host, 4, 4).unwrap_err();

        assert_eq!(err.path, host.join(CONVERTED_SUBDIR));
        assert!(!td.path().join(CONVERTED_SUBDIR).exists());
    }

    #[test]
    fn provisioning_is_idempotent() {
        let td = tempdir().unwrap();
        let nested = td.path().join("a").join("b");
        let first = provision_output_dir(&nested).unwrap();
        let second = provision_output_dir(&nested).unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn converted_name_uses_stem() {
        assert_eq!(converted_file_name(7, "cat.png"), "7convertedcat.jpg");
        assert_eq!(converted_file_name(8, "my.holiday.JPEG"), "8convertedmy.holiday.jpg");
    }
}
