//! Display-refresh notifications and progress bookkeeping.
//!
//! Everything here is derived from the playback position; nothing in this
//! module mutates viewer state.

use crate::atlas::{AtlasConfig, Frame};
use crate::data::Asset;

/// Timeline markers are only drawn for sequences up to this length.
pub const MAX_TIMELINE_MARKERS: usize = 50;

/// Which sequence is being shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    /// Whole images from the asset list
    Image,
    /// Frames cut from the selected atlas
    Frame,
}

/// Notification sent to renderers after every state change.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayUpdate {
    pub mode: DisplayMode,
    pub current_index: usize,
    pub total_frames: usize,
    /// Atlas-space rectangle of the current frame (frame mode only)
    pub frame_rect: Option<Frame>,
    pub is_playing: bool,
    pub is_looping: bool,
}

impl DisplayUpdate {
    /// Progress bar state for this update.
    pub fn progress(&self) -> ProgressInfo {
        ProgressInfo::new(self.current_index, self.total_frames)
    }

    /// Enabled state of the navigation buttons.
    pub fn navigation(&self) -> NavigationState {
        NavigationState::new(self.current_index, self.total_frames)
    }

    /// Frame counter text, e.g. "3 / 16".
    pub fn counter_label(&self) -> String {
        format!("{} / {}", self.current_index + 1, self.total_frames)
    }
}

/// Progress bar and timeline marker state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressInfo {
    /// Position in percent (0-100)
    pub percent: f64,
    /// Number of timeline markers to draw, if any
    pub markers: Option<usize>,
    /// Index of the highlighted marker
    pub active_marker: usize,
}

impl ProgressInfo {
    pub fn new(current_index: usize, total_frames: usize) -> Self {
        let span = total_frames.saturating_sub(1).max(1) as f64;
        let markers = (total_frames > 0 && total_frames <= MAX_TIMELINE_MARKERS).then_some(total_frames);
        Self {
            percent: current_index as f64 / span * 100.0,
            markers,
            active_marker: current_index,
        }
    }
}

/// Map a pointer position along the progress bar to a sequence index.
///
/// `fraction` is the pointer offset divided by the bar width; it is clamped
/// to 0.0 - 1.0. Returns `None` for an empty sequence.
pub fn index_at_fraction(fraction: f64, total_frames: usize) -> Option<usize> {
    if total_frames == 0 {
        return None;
    }
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let last = (total_frames - 1) as f64;
    Some((fraction * last).round() as usize)
}

/// Which navigation buttons are disabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub first_disabled: bool,
    pub previous_disabled: bool,
    pub next_disabled: bool,
    pub last_disabled: bool,
}

impl NavigationState {
    pub fn new(current_index: usize, total_frames: usize) -> Self {
        let at_start = current_index == 0;
        let at_end = current_index + 1 >= total_frames;
        Self {
            first_disabled: at_start,
            previous_disabled: at_start,
            next_disabled: at_end,
            last_disabled: at_end,
        }
    }
}

/// Text for the info panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfoLabels {
    pub name: String,
    /// "W × H" of the current frame or image
    pub size: String,
    pub mode: String,
}

impl InfoLabels {
    /// Labels for the current frame of an atlas.
    pub fn for_frame(asset: &Asset, frame: &Frame, config: &AtlasConfig) -> Self {
        let (width, height) = frame.rounded_size();
        Self {
            name: asset.name.clone(),
            size: format!("{width} × {height}"),
            mode: format!("Sprite ({}×{})", config.cols, config.rows),
        }
    }

    /// Labels for a whole image.
    pub fn for_image(asset: &Asset) -> Self {
        Self {
            name: asset.name.clone(),
            size: format!("{} × {}", asset.width, asset.height),
            mode: "Image".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(ProgressInfo::new(0, 5).percent, 0.0);
        assert_eq!(ProgressInfo::new(2, 5).percent, 50.0);
        assert_eq!(ProgressInfo::new(4, 5).percent, 100.0);
        // A single frame never divides by zero
        assert_eq!(ProgressInfo::new(0, 1).percent, 0.0);
    }

    #[test]
    fn test_markers_only_for_short_sequences() {
        assert_eq!(ProgressInfo::new(0, 50).markers, Some(50));
        assert_eq!(ProgressInfo::new(0, 51).markers, None);
        assert_eq!(ProgressInfo::new(0, 0).markers, None);
    }

    #[test]
    fn test_index_at_fraction() {
        assert_eq!(index_at_fraction(0.5, 11), Some(5));
        assert_eq!(index_at_fraction(-0.3, 11), Some(0));
        assert_eq!(index_at_fraction(1.7, 11), Some(10));
        assert_eq!(index_at_fraction(0.96, 4), Some(3));
        assert_eq!(index_at_fraction(0.5, 0), None);
    }

    #[test]
    fn test_navigation_state() {
        let nav = NavigationState::new(0, 3);
        assert!(nav.first_disabled && nav.previous_disabled);
        assert!(!nav.next_disabled && !nav.last_disabled);

        let nav = NavigationState::new(2, 3);
        assert!(!nav.previous_disabled);
        assert!(nav.next_disabled && nav.last_disabled);
    }

    #[test]
    fn test_labels() {
        let asset = Asset::new("/lib/walk.png", "walk.png", 400, 300);
        let frame = Frame {
            x: 0.0,
            y: 0.0,
            width: 133.33,
            height: 100.0,
            index: 0,
        };
        let labels = InfoLabels::for_frame(&asset, &frame, &AtlasConfig::grid(3, 3));
        assert_eq!(labels.size, "133 × 100");
        assert_eq!(labels.mode, "Sprite (3×3)");

        let labels = InfoLabels::for_image(&asset);
        assert_eq!(labels.size, "400 × 300");
        assert_eq!(labels.mode, "Image");
    }

    #[test]
    fn test_counter_label() {
        let update = DisplayUpdate {
            mode: DisplayMode::Image,
            current_index: 2,
            total_frames: 16,
            frame_rect: None,
            is_playing: false,
            is_looping: false,
        };
        assert_eq!(update.counter_label(), "3 / 16");
    }
}
