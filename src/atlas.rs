//! Sprite atlas configuration and frame extraction.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::loader::Bitmap;

/// Order in which frame indices walk the atlas grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadDirection {
    /// Left to right, then top to bottom
    #[default]
    #[serde(rename = "horizontal", alias = "row-major")]
    RowMajor,
    /// Top to bottom, then left to right
    #[serde(rename = "vertical", alias = "column-major")]
    ColumnMajor,
}

/// Grid layout of a sprite atlas and the frame range to play.
///
/// Serialized with the field names used by `_sprite_config.json` sidecars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasConfig {
    pub cols: u32,
    pub rows: u32,
    pub start_frame: u32,
    pub end_frame: u32,
    pub direction: ReadDirection,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            cols: 4,
            rows: 4,
            start_frame: 0,
            end_frame: 15,
            direction: ReadDirection::RowMajor,
        }
    }
}

impl AtlasConfig {
    /// Create a row-major config covering every cell of a `cols` x `rows` grid.
    pub fn grid(cols: u32, rows: u32) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            start_frame: 0,
            end_frame: cols.saturating_mul(rows) - 1,
            direction: ReadDirection::RowMajor,
        }
    }

    /// Number of cells in the grid.
    #[inline]
    pub fn cell_count(&self) -> u32 {
        self.cols.saturating_mul(self.rows)
    }

    /// Index of the last addressable cell.
    #[inline]
    pub fn max_frame(&self) -> u32 {
        self.cell_count().saturating_sub(1)
    }

    /// Number of frames in the configured range.
    #[inline]
    pub fn frame_count(&self) -> u32 {
        self.end_frame.saturating_sub(self.start_frame).saturating_add(1)
    }

    /// Normalize this config, falling back to `previous` for invalid counts.
    ///
    /// A zero `cols` or `rows` is rejected in favour of the previous value,
    /// then `end_frame` is clamped to the last cell and `start_frame` to
    /// `end_frame`. Never fails, and normalizing an already normalized config
    /// against any previous value returns it unchanged.
    ///
    /// ```rust
    /// use spritesheet_core_view::AtlasConfig;
    ///
    /// let requested = AtlasConfig { end_frame: 20, ..AtlasConfig::grid(4, 4) };
    /// let normalized = requested.normalized(&AtlasConfig::default());
    /// assert_eq!(normalized.end_frame, 15);
    /// ```
    pub fn normalized(self, previous: &AtlasConfig) -> AtlasConfig {
        let cols = if self.cols >= 1 { self.cols } else { previous.cols.max(1) };
        let rows = if self.rows >= 1 { self.rows } else { previous.rows.max(1) };

        let max_frame = cols.saturating_mul(rows) - 1;
        let end_frame = self.end_frame.min(max_frame);
        let start_frame = self.start_frame.min(end_frame);

        AtlasConfig {
            cols,
            rows,
            start_frame,
            end_frame,
            direction: self.direction,
        }
    }

    /// Grid position `(col, row)` of an atlas frame index.
    #[inline]
    pub fn cell_of(&self, index: u32) -> (u32, u32) {
        match self.direction {
            ReadDirection::RowMajor => (index % self.cols, index / self.cols),
            ReadDirection::ColumnMajor => (index / self.rows, index % self.rows),
        }
    }
}

/// One rectangular sub-region of an atlas, in atlas pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Index of the cell in the atlas grid (not the position in the sequence)
    pub index: u32,
}

impl Frame {
    /// Frame size rounded to whole pixels, as shown in size labels.
    pub fn rounded_size(&self) -> (u32, u32) {
        (self.width.round() as u32, self.height.round() as u32)
    }
}

/// Decompose an atlas of the given pixel size into its frame sequence.
///
/// Frames are produced index-ascending from `start_frame` to `end_frame`
/// inclusive. Indices whose grid cell falls outside the atlas are dropped,
/// which only happens for configs that were not normalized.
///
/// ```rust
/// use spritesheet_core_view::{extract_frames, AtlasConfig};
///
/// let frames = extract_frames(400, 400, &AtlasConfig::grid(4, 4));
/// assert_eq!(frames.len(), 16);
/// assert_eq!((frames[5].x, frames[5].y), (100.0, 100.0));
/// assert_eq!((frames[5].width, frames[5].height), (100.0, 100.0));
/// ```
pub fn extract_frames(atlas_width: u32, atlas_height: u32, config: &AtlasConfig) -> Vec<Frame> {
    if config.cols == 0 || config.rows == 0 || config.start_frame > config.end_frame {
        return Vec::new();
    }

    // Indices past the last cell have no grid position
    let last = config.end_frame.min(config.max_frame());
    if config.start_frame > last {
        return Vec::new();
    }

    let frame_width = atlas_width as f64 / config.cols as f64;
    let frame_height = atlas_height as f64 / config.rows as f64;

    let mut frames = Vec::with_capacity((last - config.start_frame) as usize + 1);
    for index in config.start_frame..=last {
        let (col, row) = config.cell_of(index);
        if row < config.rows && col < config.cols {
            frames.push(Frame {
                x: col as f64 * frame_width,
                y: row as f64 * frame_height,
                width: frame_width,
                height: frame_height,
                index,
            });
        }
    }
    frames
}

/// Owns the atlas config, the installed bitmap and the frames derived from them.
///
/// The frame list is rebuilt in full whenever the config or the bitmap
/// changes; it is never patched.
#[derive(Clone, Debug, Default)]
pub struct SpriteAtlasEngine {
    config: AtlasConfig,
    bitmap: Option<Bitmap>,
    frames: Vec<Frame>,
}

impl SpriteAtlasEngine {
    /// Create an engine with the given config and no bitmap.
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            config: config.normalized(&AtlasConfig::default()),
            bitmap: None,
            frames: Vec::new(),
        }
    }

    /// Apply a new config and return the normalized result.
    pub fn configure(&mut self, config: AtlasConfig) -> AtlasConfig {
        self.config = config.normalized(&self.config);
        debug!("atlas config applied: {:?}", self.config);
        self.rebuild();
        self.config
    }

    /// Install a freshly decoded atlas, replacing the previous one.
    pub fn install(&mut self, bitmap: Bitmap) {
        self.bitmap = Some(bitmap);
        self.rebuild();
    }

    /// Drop the bitmap and its frames.
    pub fn clear(&mut self) {
        self.bitmap = None;
        self.frames.clear();
    }

    #[inline]
    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    #[inline]
    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    /// Whether the installed bitmap was decoded from `path`.
    pub fn has_bitmap_for(&self, path: &str) -> bool {
        self.bitmap.as_ref().is_some_and(|b| b.source_path() == path)
    }

    #[inline]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[inline]
    pub fn frame(&self, position: usize) -> Option<&Frame> {
        self.frames.get(position)
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn rebuild(&mut self) {
        self.frames = match &self.bitmap {
            Some(bitmap) => extract_frames(bitmap.width(), bitmap.height(), &self.config),
            None => Vec::new(),
        };
        debug!("extracted {} atlas frames", self.frames.len());
    }
}
