//! Extension-keyed decoder dispatch over the supported source formats.

use image::{DynamicImage, ImageFormat, ImageResult};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::io::{BufRead, Seek};
use std::path::Path;

/// Source formats the converter knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Jpeg,
    Png,
    Bmp,
}

/// Built on first use and never mutated afterwards.
static DECODERS: Lazy<HashMap<&'static str, ImageKind>> = Lazy::new(|| {
    HashMap::from([
        (".jpg", ImageKind::Jpeg),
        (".jpeg", ImageKind::Jpeg),
        (".png", ImageKind::Png),
        (".bmp", ImageKind::Bmp),
    ])
});

impl ImageKind {
    /// Look up a normalized extension tag such as `.jpg`.
    pub fn for_extension(tag: &str) -> Option<Self> {
        DECODERS.get(tag).copied()
    }

    /// `None` means "not an image": the caller skips the file.
    pub fn for_path(path: &Path) -> Option<Self> {
        extension_tag(path).and_then(|tag| Self::for_extension(&tag))
    }

    /// Decode a whole image from `reader`.
    ///
    /// JPEG and PNG come back exactly as the codec produced them. BMP is
    /// always expanded into an owned RGBA8 buffer so that the resize step can
    /// address pixels directly.
    pub fn decode<R: BufRead + Seek>(self, reader: R) -> ImageResult<DynamicImage> {
        match self {
            ImageKind::Jpeg => image::load(reader, ImageFormat::Jpeg),
            ImageKind::Png => image::load(reader, ImageFormat::Png),
            ImageKind::Bmp => image::load(reader, ImageFormat::Bmp)
                .map(|img| DynamicImage::ImageRgba8(img.to_rgba8())),
        }
    }
}

/// Lowercased extension with a leading dot, e.g. `Photo.JPG` → `.jpg`.
pub fn extension_tag(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    Some(format!(".{}", ext.to_ascii_lowercase()))
}
