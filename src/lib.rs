//! # spritesheet-core-view
//!
//! Core sprite-sheet extraction and playback library for asset viewers.
//!
//! This crate provides platform-agnostic data structures and logic for:
//! - Cutting a texture atlas into an ordered sequence of frames
//! - Controlling playback of images or atlas frames (fps, speed, loop, scrub)
//! - Tracking asynchronous bitmap loads so stale results are dropped
//! - Zoom/pan state, onionskin draw lists and `_sprite_config.json` sidecars
//! - Rendering frames to canvas (with optional web support)
//!
//! The crate never owns a clock or an event loop. Playback timers go through
//! the [`TickScheduler`] trait and bitmap bytes through [`BitmapLoader`].
//!
//! ## Features
//!
//! - `toml` - Load [`ViewerSettings`] from TOML (enabled by default)
//! - `web` - Enable web/WASM canvas rendering support
//!
//! ## Example
//!
//! ```rust
//! use spritesheet_core_view::{Asset, Bitmap, ManualScheduler, Viewer, ViewerSettings};
//!
//! let settings = ViewerSettings {
//!     sprite_mode: Some(true),
//!     ..Default::default()
//! };
//! let mut viewer = Viewer::new(&settings, ManualScheduler::new());
//!
//! // Selecting an atlas asks for its bitmap
//! let request = viewer
//!     .set_assets(vec![Asset::new("/art/walk.png", "walk.png", 400, 400)])
//!     .unwrap();
//!
//! // Decode it however the host likes, then hand it back
//! let bitmap = Bitmap::blank(&request.path, 400, 400);
//! viewer.complete_load(request.ticket, Ok(bitmap)).unwrap();
//!
//! // The default 4x4 grid yields 16 frames of 100x100
//! viewer.seek(5);
//! let frame = viewer.display().unwrap().frame_rect.unwrap();
//! assert_eq!((frame.x, frame.y), (100.0, 100.0));
//! ```

mod animation;
mod atlas;
mod data;
mod display;
mod error;
pub mod loader;
pub mod parser;
pub mod render;
mod settings;
pub mod sidecar;
mod viewer;
mod viewport;

pub use animation::{ManualScheduler, PlaybackController, PlaybackState, TickScheduler, TimerId};
pub use atlas::{extract_frames, AtlasConfig, Frame, ReadDirection, SpriteAtlasEngine};
pub use data::{collect_displayable, is_displayable_extension, parse_host_items, selected_assets, Asset, AssetSource, HostItem};
pub use display::{index_at_fraction, DisplayMode, DisplayUpdate, InfoLabels, NavigationState, ProgressInfo};
pub use error::{AssetLoadError, ConfigValidationError, SidecarError, ViewerError};
pub use loader::{decode_bitmap, load_bitmap, Bitmap, BitmapLoader, FsBitmapLoader, LoadPhase, LoadRequest, LoadTicket};
pub use parser::{RawAtlasInput, ViewerCommand};
pub use render::{DrawCommand, OnionskinConfig, RenderResult};
pub use settings::ViewerSettings;
pub use viewer::{refresh_selection, run_load, Viewer};
pub use viewport::{FitSizing, Viewport};

#[cfg(feature = "web")]
pub use render::web::render_to_canvas;
