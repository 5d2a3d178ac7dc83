//! Bitmap loading and request tracking.
//!
//! Decoding is the only asynchronous step in the viewer. Loads are keyed by
//! a [`LoadTicket`]: a newer request supersedes every older one, and a
//! completion carrying a superseded ticket is discarded instead of applied.

use std::sync::Arc;

use image::{imageops, ImageError, RgbaImage};
use log::debug;

use crate::atlas::Frame;
use crate::error::AssetLoadError;

/// A decoded RGBA8 image together with the path it was read from.
///
/// Cloning is cheap; the pixel buffer is shared.
#[derive(Clone, Debug)]
pub struct Bitmap {
    source_path: String,
    pixels: Arc<RgbaImage>,
}

impl Bitmap {
    /// Wrap already decoded pixels.
    pub fn from_rgba(source_path: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            source_path: source_path.into(),
            pixels: Arc::new(pixels),
        }
    }

    /// A transparent bitmap of the given size.
    pub fn blank(source_path: impl Into<String>, width: u32, height: u32) -> Self {
        Self::from_rgba(source_path, RgbaImage::new(width, height))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline]
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    #[inline]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Copy the pixels covered by `frame`, clipped to the bitmap bounds.
    pub fn crop(&self, frame: &Frame) -> RgbaImage {
        let x = frame.x.max(0.0).floor() as u32;
        let y = frame.y.max(0.0).floor() as u32;
        let width = frame.width.max(0.0).round() as u32;
        let height = frame.height.max(0.0).round() as u32;
        imageops::crop_imm(self.pixels.as_ref(), x, y, width, height).to_image()
    }

    /// Square thumbnail of a frame, stretched to `size` x `size`.
    pub fn thumbnail(&self, frame: &Frame, size: u32) -> RgbaImage {
        let cropped = self.crop(frame);
        if cropped.width() == 0 || cropped.height() == 0 {
            return RgbaImage::new(size, size);
        }
        imageops::resize(&cropped, size, size, imageops::FilterType::Triangle)
    }
}

/// Decode encoded image bytes read from `path`.
pub fn decode_bitmap(path: &str, bytes: &[u8]) -> Result<Bitmap, AssetLoadError> {
    let format = image::guess_format(bytes).map_err(|_| AssetLoadError::UnsupportedFormat {
        path: path.to_string(),
    })?;

    let decoded = image::load_from_memory_with_format(bytes, format).map_err(|err| match err {
        ImageError::Unsupported(_) => AssetLoadError::UnsupportedFormat {
            path: path.to_string(),
        },
        other => AssetLoadError::decode(path, other.to_string()),
    })?;

    let bitmap = Bitmap::from_rgba(path, decoded.to_rgba8());
    debug!("decoded {} ({}x{})", path, bitmap.width(), bitmap.height());
    Ok(bitmap)
}

/// Trait for async byte sources backing bitmap loads.
///
/// Implement this for your I/O mechanism (host file API, fetch, filesystem).
///
/// No `Send` bounds: works in both native and WASM (single-threaded) contexts.
pub trait BitmapLoader {
    /// Read the encoded bytes of the image at `path`.
    fn read_bytes(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>, AssetLoadError>>;
}

/// Reads images straight from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsBitmapLoader;

impl BitmapLoader for FsBitmapLoader {
    fn read_bytes(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>, AssetLoadError>> {
        async move { std::fs::read(path).map_err(|err| AssetLoadError::io(path, err)) }
    }
}

/// Read and decode the bitmap at `path`.
pub async fn load_bitmap<L: BitmapLoader>(loader: &L, path: &str) -> Result<Bitmap, AssetLoadError> {
    let bytes = loader.read_bytes(path).await?;
    decode_bitmap(path, &bytes)
}

/// Identity of one bitmap load request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// A load the caller should perform and hand back with its ticket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub path: String,
}

/// Loading phase indicator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPhase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// A request is in flight
    Loading,
    /// The latest request completed and was applied
    Complete,
    /// The latest request failed
    Failed,
}

/// Tracks the one load whose completion may still be applied.
#[derive(Clone, Debug, Default)]
pub struct LoadTracker {
    next_id: u64,
    pending: Option<LoadRequest>,
    phase: LoadPhase,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `path`, superseding any request still in flight.
    pub fn begin(&mut self, path: &str) -> LoadRequest {
        self.next_id += 1;
        if let Some(stale) = &self.pending {
            debug!("load of {} superseded by {}", stale.path, path);
        }
        let request = LoadRequest {
            ticket: LoadTicket(self.next_id),
            path: path.to_string(),
        };
        self.pending = Some(request.clone());
        self.phase = LoadPhase::Loading;
        request
    }

    /// Whether `ticket` belongs to the request still in flight.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.pending.as_ref().is_some_and(|p| p.ticket == ticket)
    }

    /// Settle a request. Returns `false` for a stale ticket, which the caller
    /// must then ignore.
    pub fn finish(&mut self, ticket: LoadTicket, succeeded: bool) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.pending = None;
        self.phase = if succeeded { LoadPhase::Complete } else { LoadPhase::Failed };
        true
    }

    /// Forget the request in flight so its completion is discarded.
    pub fn cancel(&mut self) -> Option<LoadRequest> {
        let cancelled = self.pending.take();
        if cancelled.is_some() {
            self.phase = LoadPhase::Idle;
        }
        cancelled
    }

    #[inline]
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Path of the request in flight.
    pub fn pending_path(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_decode_png() {
        let bitmap = decode_bitmap("sheet.png", &png_bytes(8, 4)).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (8, 4));
        assert_eq!(bitmap.source_path(), "sheet.png");
    }

    #[test]
    fn test_decode_unknown_bytes() {
        let err = decode_bitmap("notes.svg", b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap_err();
        assert!(matches!(err, AssetLoadError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_decode_truncated_png() {
        let bytes = png_bytes(8, 8);
        let err = decode_bitmap("cut.png", &bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, AssetLoadError::Decode { .. }));
    }

    #[test]
    fn test_crop_and_thumbnail() {
        let mut img = RgbaImage::new(4, 2);
        img.put_pixel(2, 0, image::Rgba([255, 0, 0, 255]));
        let bitmap = Bitmap::from_rgba("a.png", img);
        let frame = Frame {
            x: 2.0,
            y: 0.0,
            width: 2.0,
            height: 2.0,
            index: 1,
        };

        let cropped = bitmap.crop(&frame);
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.get_pixel(0, 0).0, [255, 0, 0, 255]);

        assert_eq!(bitmap.thumbnail(&frame, 40).dimensions(), (40, 40));
    }

    #[test]
    fn test_fs_loader_missing_file() {
        let path = std::env::temp_dir().join(format!("spritesheet_missing_{}.png", std::process::id()));
        let path = path.to_string_lossy().into_owned();
        let result = futures::executor::block_on(load_bitmap(&FsBitmapLoader, &path));
        assert!(matches!(result, Err(AssetLoadError::NotFound { .. })));
    }

    #[test]
    fn test_tracker_discards_superseded_ticket() {
        let mut tracker = LoadTracker::new();
        let first = tracker.begin("a.png");
        let second = tracker.begin("b.png");

        assert!(!tracker.is_current(first.ticket));
        assert!(tracker.is_current(second.ticket));
        assert_eq!(tracker.pending_path(), Some("b.png"));

        assert!(tracker.finish(second.ticket, true));
        assert_eq!(tracker.phase(), LoadPhase::Complete);
        assert!(!tracker.finish(first.ticket, true));
        assert!(!tracker.is_loading());
    }

    #[test]
    fn test_tracker_cancel() {
        let mut tracker = LoadTracker::new();
        let request = tracker.begin("a.png");
        assert_eq!(tracker.cancel(), Some(request.clone()));
        assert!(!tracker.finish(request.ticket, false));
        assert_eq!(tracker.phase(), LoadPhase::Idle);
    }
}
