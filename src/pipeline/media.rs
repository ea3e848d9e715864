//! Image normalisation: anything that is not JPEG or PNG becomes JPEG.
//!
//! The media library accepts only a few formats for featured images, and Drive
//! happily stores HEIC exports, WebP screenshots and TIFF scans. Those are
//! decoded and re-encoded as baseline JPEG before upload. JPEG and PNG files
//! pass through untouched, so a photographer's original is never recompressed.
//!
//! Decoding is CPU-bound; callers on the async runtime run
//! [`normalise_image`] inside `spawn_blocking`.

use crate::error::PublishError;
use image::ImageFormat;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Whether `path` already has an upload-ready extension.
pub fn is_upload_ready(path: &Path) -> bool {
    matches!(
        extension(path).as_deref(),
        Some("jpg") | Some("jpeg") | Some("png")
    )
}

/// MIME type sent with the multipart upload, from the file extension.
pub fn mime_for(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Return `path` unchanged if it is JPEG or PNG, otherwise decode it and
/// write `<stem>.jpg` into `out_dir`.
pub fn normalise_image(path: &Path, out_dir: &Path) -> Result<PathBuf, PublishError> {
    if is_upload_ready(path) {
        debug!("{} is upload-ready", path.display());
        return Ok(path.to_path_buf());
    }

    let conversion_error = |detail: String| PublishError::ImageConversion {
        path: path.to_path_buf(),
        detail,
    };

    // Drive names do not always carry an honest extension; sniff the bytes.
    let img = image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| conversion_error(e.to_string()))?
        .decode()
        .map_err(|e| conversion_error(e.to_string()))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());
    let out = out_dir.join(format!("{stem}.jpg"));

    let file = File::create(&out).map_err(|e| PublishError::CacheIo {
        path: out.clone(),
        detail: e.to_string(),
    })?;
    // JPEG has no alpha channel.
    img.to_rgb8()
        .write_to(&mut BufWriter::new(file), ImageFormat::Jpeg)
        .map_err(|e| conversion_error(e.to_string()))?;

    info!("Converted {} → {}", path.display(), out.display());
    Ok(out)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn write_image(dir: &Path, name: &str, format: ImageFormat) -> PathBuf {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 128])));
        let path = dir.join(name);
        img.save_with_format(&path, format).unwrap();
        path
    }

    #[test]
    fn mime_types_follow_extension() {
        assert_eq!(mime_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_for(Path::new("a")), "application/octet-stream");
    }

    #[test]
    fn jpeg_and_png_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_image(dir.path(), "photo.png", ImageFormat::Png);
        assert_eq!(normalise_image(&png, dir.path()).unwrap(), png);
    }

    #[test]
    fn other_formats_become_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let bmp = write_image(dir.path(), "scan.bmp", ImageFormat::Bmp);

        let out = normalise_image(&bmp, out_dir.path()).unwrap();
        assert_eq!(out, out_dir.path().join("scan.jpg"));
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn mislabelled_file_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_image(dir.path(), "tmp.png", ImageFormat::Png);
        let renamed = dir.path().join("export.heic");
        std::fs::rename(&png, &renamed).unwrap();

        let out = normalise_image(&renamed, dir.path()).unwrap();
        assert_eq!(out.extension().unwrap(), "jpg");
    }

    #[test]
    fn garbage_is_a_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("broken.gif");
        std::fs::write(&bad, b"not an image").unwrap();
        assert!(matches!(
            normalise_image(&bad, dir.path()),
            Err(PublishError::ImageConversion { .. })
        ));
    }
}
