//! Media download and local materialization.
//!
//! The single-asset path (`materialize`) enforces content-type and size
//! policy and, for images, resizes to a fixed 1920x1080 frame with a
//! cover-and-crop policy. The batch path (`materialize_batch`) saves
//! originals best-effort: a per-item failure is logged and skipped, never
//! aborting the batch.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::fetch::{blocking_agent, require_http_url};

pub const MAX_DOWNLOAD_BYTES: u64 = 200 * 1024 * 1024;
/// Bodies below this are treated as icons, not product assets.
pub const MIN_IMAGE_BYTES: usize = 5_000;
/// Hard cap on downloads per batch request.
pub const MAX_BATCH_DOWNLOADS: usize = 5;

pub const TARGET_WIDTH: u32 = 1920;
pub const TARGET_HEIGHT: u32 = 1080;

const DOWNLOAD_TIMEOUT_SECS: u64 = 30;
const JPEG_QUALITY: u8 = 95;

const RASTER_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".webp", ".avif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// The token the Content-Type header must contain.
    fn family(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(Error::Validation(format!(
                "media type must be image or video: {other}"
            ))),
        }
    }
}

/// Download one asset into `dest_dir` and return `(filename, filepath)`.
///
/// Images are normalized to RGB, cover-scaled to 1920x1080, center-cropped,
/// and saved as JPEG. Videos stream to disk unchanged, with the byte
/// ceiling enforced while writing.
pub fn materialize(url: &str, media_type: MediaType, dest_dir: &Path) -> Result<(String, PathBuf)> {
    require_http_url(url)?;
    if !dest_dir.is_dir() {
        fs::create_dir_all(dest_dir).map_err(|e| {
            Error::Validation(format!("cannot create {}: {e}", dest_dir.display()))
        })?;
    }

    info!(url = %url, "download start");
    let response = blocking_agent(DOWNLOAD_TIMEOUT_SECS)
        .get(url)
        .call()
        .map_err(|e| Error::Transport(format!("failed to download {url}: {e}")))?;

    check_content_type(&response, media_type)?;
    check_declared_length(&response)?;

    let timestamp = unix_timestamp();
    match media_type {
        MediaType::Image => {
            let bytes = read_body(response, url)?;
            if icon_sized(bytes.len()) {
                return Err(Error::ContentPolicy(format!(
                    "{} bytes is below the icon threshold",
                    bytes.len()
                )));
            }
            let img = image::load_from_memory(&bytes).map_err(|e| {
                Error::ContentPolicy(format!("cannot decode image from {url}: {e}"))
            })?;
            let framed = cover_crop(&img, TARGET_WIDTH, TARGET_HEIGHT);
            let filename = format!("downloaded_{timestamp}.jpg");
            let filepath = dest_dir.join(&filename);
            save_jpeg(&framed, &filepath)?;
            info!(filename = %filename, "image saved");
            Ok((filename, filepath))
        }
        MediaType::Video => {
            let filename = format!("downloaded_{timestamp}.mp4");
            let filepath = dest_dir.join(&filename);
            let mut body = response.into_body();
            // One byte of slack so the ceiling check below fires before the
            // reader's own limit error, which would be a transport error.
            let mut reader = body
                .with_config()
                .limit(MAX_DOWNLOAD_BYTES + 1)
                .reader();
            let mut file = fs::File::create(&filepath).map_err(|e| {
                Error::Transport(format!("cannot create {}: {e}", filepath.display()))
            })?;
            if let Err(e) = copy_with_ceiling(&mut reader, &mut file, MAX_DOWNLOAD_BYTES) {
                let _ = fs::remove_file(&filepath);
                return Err(e);
            }
            info!(filename = %filename, "video saved");
            Ok((filename, filepath))
        }
    }
}

/// Download up to five resolved image URLs into `dest_dir`, saving
/// originals as-is. Returns the successfully saved subset.
pub fn materialize_batch(urls: &[String], dest_dir: &Path) -> Vec<(String, PathBuf)> {
    let timestamp = unix_timestamp();
    let mut saved = Vec::new();
    for (index, url) in urls.iter().take(MAX_BATCH_DOWNLOADS).enumerate() {
        match download_original(url, dest_dir, timestamp, index) {
            Ok(Some(entry)) => saved.push(entry),
            Ok(None) => info!(url = %url, "skipped undersized image"),
            Err(e) => warn!(url = %url, error = %e, "image download failed"),
        }
    }
    saved
}

/// `Ok(None)` means the body was below the icon threshold; that is a skip,
/// not a failure.
fn download_original(
    url: &str,
    dest_dir: &Path,
    timestamp: u64,
    index: usize,
) -> Result<Option<(String, PathBuf)>> {
    require_http_url(url)?;
    let response = blocking_agent(DOWNLOAD_TIMEOUT_SECS)
        .get(url)
        .call()
        .map_err(|e| Error::Transport(format!("failed to download {url}: {e}")))?;

    check_content_type(&response, MediaType::Image)?;
    check_declared_length(&response)?;

    let bytes = read_body(response, url)?;
    if icon_sized(bytes.len()) {
        return Ok(None);
    }

    let filename = format!("product_{timestamp}_{index}{}", raster_extension(url));
    let filepath = dest_dir.join(&filename);
    fs::write(&filepath, &bytes)
        .map_err(|e| Error::Transport(format!("cannot write {}: {e}", filepath.display())))?;
    Ok(Some((filename, filepath)))
}

fn check_content_type(
    response: &ureq::http::Response<ureq::Body>,
    media_type: MediaType,
) -> Result<()> {
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !content_type.contains(media_type.family()) {
        return Err(Error::ContentPolicy(format!(
            "expected {} content, got {content_type:?}",
            media_type.family()
        )));
    }
    Ok(())
}

fn check_declared_length(response: &ureq::http::Response<ureq::Body>) -> Result<()> {
    let declared = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if let Some(length) = declared {
        if length > MAX_DOWNLOAD_BYTES {
            return Err(Error::ContentPolicy(format!(
                "declared size {length} exceeds the download ceiling"
            )));
        }
    }
    Ok(())
}

fn read_body(response: ureq::http::Response<ureq::Body>, url: &str) -> Result<Vec<u8>> {
    response
        .into_body()
        .with_config()
        .limit(MAX_DOWNLOAD_BYTES)
        .read_to_vec()
        .map_err(|e| match e {
            ureq::Error::BodyExceedsLimit(_) => {
                Error::ContentPolicy("download exceeds the byte ceiling".to_string())
            }
            other => Error::Transport(format!("failed to read {url}: {other}")),
        })
}

/// Bodies this small are icons or tracking pixels, not product assets.
fn icon_sized(len: usize) -> bool {
    len < MIN_IMAGE_BYTES
}

/// Stream `reader` into `writer`, enforcing the byte ceiling while
/// writing. Exceeding the ceiling is a content-policy failure; read and
/// write failures stay transport failures.
fn copy_with_ceiling(
    reader: &mut impl Read,
    writer: &mut impl Write,
    ceiling: u64,
) -> Result<u64> {
    let mut written: u64 = 0;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| Error::Transport(format!("failed to read stream: {e}")))?;
        if n == 0 {
            return Ok(written);
        }
        written += n as u64;
        if written > ceiling {
            return Err(Error::ContentPolicy(
                "download exceeds the byte ceiling".to_string(),
            ));
        }
        writer
            .write_all(&buf[..n])
            .map_err(|e| Error::Transport(format!("failed to write stream: {e}")))?;
    }
}

/// Scale so the image fully covers the target frame (pin height when wider
/// than the target ratio, width when narrower), then cut symmetric margins.
/// Cover-and-crop, not letterbox.
fn cover_crop(img: &DynamicImage, target_w: u32, target_h: u32) -> image::RgbImage {
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();

    let wider = (w as f64) * (target_h as f64) > (h as f64) * (target_w as f64);
    let (new_w, new_h) = if wider {
        (
            ((w as f64) * (target_h as f64) / (h as f64)).round() as u32,
            target_h,
        )
    } else {
        (
            target_w,
            ((h as f64) * (target_w as f64) / (w as f64)).round() as u32,
        )
    };

    let scaled = image::imageops::resize(&rgb, new_w, new_h, FilterType::Lanczos3);
    let left = (new_w.saturating_sub(target_w)) / 2;
    let top = (new_h.saturating_sub(target_h)) / 2;
    image::imageops::crop_imm(&scaled, left, top, target_w, target_h).to_image()
}

fn save_jpeg(img: &image::RgbImage, path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .map_err(|e| Error::Transport(format!("cannot create {}: {e}", path.display())))?;
    let mut writer = std::io::BufWriter::new(file);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    img.write_with_encoder(encoder)
        .map_err(|e| Error::ContentPolicy(format!("failed to encode jpeg: {e}")))
}

/// Keep a recognized raster extension from the URL path, defaulting to
/// `.jpg`.
fn raster_extension(url: &str) -> &'static str {
    let path = match url.find(['?', '#']) {
        Some(i) => &url[..i],
        None => url,
    };
    let lower = path.to_ascii_lowercase();
    RASTER_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .copied()
        .unwrap_or(".jpg")
}

/// Prepare the temp directory the materializer writes into.
pub fn ensure_temp_dir(base: &Path) -> Result<PathBuf> {
    let dir = base.join("temp_images");
    fs::create_dir_all(&dir)
        .map_err(|e| Error::Validation(format!("cannot create {}: {e}", dir.display())))?;
    Ok(dir)
}

/// Remove regular files older than `max_age_hours`. Cleanup failures are
/// logged, never fatal.
pub fn cleanup_old_files(dir: &Path, max_age_hours: u64) {
    let cutoff = std::time::Duration::from_secs(max_age_hours * 3600);
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "temp cleanup failed");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())
            .is_some_and(|age| age > cutoff);
        if expired {
            match fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "removed old temp file"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
            }
        }
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;
    use std::net::TcpListener;
    use std::thread;

    /// Serve canned HTTP responses, routed by request-path substring, for a
    /// fixed number of connections.
    fn spawn_server(routes: Vec<(&'static str, Vec<u8>)>, connections: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for _ in 0..connections {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    match stream.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            request.extend_from_slice(&buf[..n]);
                            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let response = routes
                    .iter()
                    .find(|(path, _)| request.contains(path))
                    .map(|(_, response)| response.clone())
                    .unwrap_or_else(|| http_response("404 Not Found", "text/plain", b""));
                let _ = stream.write_all(&response);
            }
        });
        format!("http://{addr}")
    }

    fn http_response(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        response
    }

    /// A PNG with enough pixel noise to clear the icon threshold.
    fn noisy_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        });
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        assert!(png.len() >= MIN_IMAGE_BYTES);
        png
    }

    #[test]
    fn test_media_type_parse() {
        assert_eq!(MediaType::parse("image").unwrap(), MediaType::Image);
        assert_eq!(MediaType::parse("video").unwrap(), MediaType::Video);
        assert!(matches!(
            MediaType::parse("audio"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_materialize_rejects_bad_url_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let result = materialize("ftp://example.com/a.jpg", MediaType::Image, dir.path());
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_cover_crop_wide_source() {
        // 4:1 source is wider than 16:9: height pins to 1080, width crops.
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(400, 100));
        let framed = cover_crop(&img, TARGET_WIDTH, TARGET_HEIGHT);
        assert_eq!(framed.dimensions(), (TARGET_WIDTH, TARGET_HEIGHT));
    }

    #[test]
    fn test_cover_crop_tall_source() {
        // 3:4 source is narrower than 16:9: width pins to 1920, height crops.
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(300, 400));
        let framed = cover_crop(&img, TARGET_WIDTH, TARGET_HEIGHT);
        assert_eq!(framed.dimensions(), (TARGET_WIDTH, TARGET_HEIGHT));
    }

    #[test]
    fn test_cover_crop_exact_ratio() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(3840, 2160));
        let framed = cover_crop(&img, TARGET_WIDTH, TARGET_HEIGHT);
        assert_eq!(framed.dimensions(), (TARGET_WIDTH, TARGET_HEIGHT));
    }

    #[test]
    fn test_copy_ceiling_is_a_content_policy_failure() {
        let payload = vec![0u8; 10];
        let mut out = Vec::new();
        assert!(matches!(
            copy_with_ceiling(&mut Cursor::new(&payload), &mut out, 5),
            Err(Error::ContentPolicy(_))
        ));

        let mut out = Vec::new();
        let written = copy_with_ceiling(&mut Cursor::new(&payload), &mut out, 20).unwrap();
        assert_eq!(written, 10);
        assert_eq!(out, payload);
    }

    #[test]
    fn test_materialize_rejects_wrong_content_type() {
        let base = spawn_server(
            vec![("/page.html", http_response("200 OK", "text/html", b"<html></html>"))],
            1,
        );
        let dir = tempfile::tempdir().unwrap();
        let result = materialize(&format!("{base}/page.html"), MediaType::Image, dir.path());
        assert!(matches!(result, Err(Error::ContentPolicy(_))));
    }

    #[test]
    fn test_materialize_rejects_declared_oversize_before_reading() {
        // Headers declare more than the ceiling; no body is ever sent.
        let header_only = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n",
            MAX_DOWNLOAD_BYTES + 1
        )
        .into_bytes();
        let base = spawn_server(vec![("/big.mp4", header_only)], 1);
        let dir = tempfile::tempdir().unwrap();
        let result = materialize(&format!("{base}/big.mp4"), MediaType::Video, dir.path());
        assert!(matches!(result, Err(Error::ContentPolicy(_))));
    }

    #[test]
    fn test_materialize_image_end_to_end() {
        let base = spawn_server(
            vec![("/hero.png", http_response("200 OK", "image/png", &noisy_png(200, 200)))],
            1,
        );
        let dir = tempfile::tempdir().unwrap();
        let (filename, filepath) =
            materialize(&format!("{base}/hero.png"), MediaType::Image, dir.path()).unwrap();

        assert!(filename.starts_with("downloaded_"));
        assert!(filename.ends_with(".jpg"));
        let saved = image::open(&filepath).unwrap();
        assert_eq!(
            (saved.width(), saved.height()),
            (TARGET_WIDTH, TARGET_HEIGHT)
        );
    }

    #[test]
    fn test_batch_skips_failures_and_undersized_images() {
        let routes = vec![
            ("/tiny.jpg", http_response("200 OK", "image/jpeg", &[0xFFu8; 4_999])),
            ("/full.jpg", http_response("200 OK", "image/jpeg", &[0xFFu8; 5_001])),
        ];
        let base = spawn_server(routes, 3);
        let urls = vec![
            format!("{base}/tiny.jpg"),
            format!("{base}/missing.jpg"),
            format!("{base}/full.jpg"),
        ];
        let dir = tempfile::tempdir().unwrap();
        let saved = materialize_batch(&urls, dir.path());

        // Only the 5,001-byte body survives: the undersized one is a silent
        // skip and the 404 is a logged failure, neither aborts the batch.
        assert_eq!(saved.len(), 1);
        let (filename, filepath) = &saved[0];
        assert!(filename.ends_with(".jpg"));
        assert_eq!(fs::metadata(filepath).unwrap().len(), 5_001);
    }

    #[test]
    fn test_icon_threshold_boundary() {
        assert!(icon_sized(4_999));
        assert!(!icon_sized(5_001));
        assert!(!icon_sized(MIN_IMAGE_BYTES));
    }

    #[test]
    fn test_raster_extension() {
        assert_eq!(raster_extension("https://c.example.com/a.png?v=2"), ".png");
        assert_eq!(raster_extension("https://c.example.com/a.webp"), ".webp");
        assert_eq!(raster_extension("https://c.example.com/a.cgi"), ".jpg");
        assert_eq!(raster_extension("https://c.example.com/a"), ".jpg");
    }

    #[test]
    fn test_ensure_temp_dir_and_cleanup() {
        let base = tempfile::tempdir().unwrap();
        let dir = ensure_temp_dir(base.path()).unwrap();
        assert!(dir.is_dir());

        let fresh = dir.join("fresh.jpg");
        fs::write(&fresh, b"data").unwrap();
        // Files newer than the cutoff survive.
        cleanup_old_files(&dir, 1);
        assert!(fresh.exists());
        // A zero-hour cutoff removes everything already on disk.
        cleanup_old_files(&dir, 0);
        assert!(!fresh.exists());
    }
}
