//! The viewer: one asset list, one atlas engine and one playback controller.
//!
//! All state changes go through [`Viewer`] methods. After each change that
//! affects what is on screen, every subscriber receives a [`DisplayUpdate`].
//! Nothing is sent while the active sequence is empty.

use std::cell::RefCell;
use std::path::PathBuf;

use image::RgbaImage;
use log::{debug, error, info};

use crate::animation::{PlaybackController, PlaybackState, TickScheduler, TimerId};
use crate::atlas::{AtlasConfig, SpriteAtlasEngine};
use crate::data::{selected_assets, Asset, AssetSource};
use crate::display::{index_at_fraction, DisplayMode, DisplayUpdate, InfoLabels};
use crate::error::{AssetLoadError, ViewerError};
use crate::loader::{load_bitmap, Bitmap, BitmapLoader, LoadPhase, LoadRequest, LoadTicket, LoadTracker};
use crate::parser::{parse_atlas_input, parse_rate, RawAtlasInput, ViewerCommand};
use crate::render::{render_frame, OnionskinConfig, RenderResult};
use crate::settings::ViewerSettings;
use crate::sidecar;
use crate::viewport::Viewport;

type Listener = Box<dyn FnMut(&DisplayUpdate)>;

/// Atlas requested by a load, committed only when its bitmap arrives.
#[derive(Clone, Debug)]
struct PendingAtlas {
    ticket: LoadTicket,
    index: usize,
    /// Sidecar config of the requested asset
    config: Option<AtlasConfig>,
}

/// Sprite-sheet viewer state.
///
/// In image mode the active sequence is the asset list and the playback
/// index is the selected asset. In sprite mode the selected asset is the
/// atlas and the active sequence is its extracted frames.
///
/// Bitmap decoding happens outside the viewer: methods that need an atlas
/// return a [`LoadRequest`], and the caller hands the decoded bitmap back to
/// [`Viewer::complete_load`] (or uses [`run_load`]).
///
/// ## Example
///
/// ```rust
/// use spritesheet_core_view::{Asset, ManualScheduler, Viewer, ViewerSettings};
///
/// let mut viewer = Viewer::new(&ViewerSettings::default(), ManualScheduler::new());
/// viewer.set_assets(vec![
///     Asset::new("/art/a.png", "a.png", 64, 64),
///     Asset::new("/art/b.png", "b.png", 64, 64),
/// ]);
///
/// viewer.go_to_last();
/// assert_eq!(viewer.selected_asset().map(|a| a.name.as_str()), Some("b.png"));
/// assert_eq!(viewer.display().unwrap().counter_label(), "2 / 2");
/// ```
pub struct Viewer<S: TickScheduler> {
    assets: Vec<Asset>,
    selected: Option<usize>,
    sprite_mode: bool,
    engine: SpriteAtlasEngine,
    playback: PlaybackController<S>,
    loads: LoadTracker,
    pending: Option<PendingAtlas>,
    onionskin: OnionskinConfig,
    onionskin_enabled: bool,
    viewport: Viewport,
    read_sidecar: bool,
    listeners: Vec<Listener>,
}

impl<S: TickScheduler> Viewer<S> {
    /// Create an empty viewer from settings.
    pub fn new(settings: &ViewerSettings, scheduler: S) -> Self {
        Self {
            assets: Vec::new(),
            selected: None,
            sprite_mode: settings.sprite_mode(),
            engine: SpriteAtlasEngine::new(settings.atlas_config()),
            playback: PlaybackController::with_state(settings.playback_state(), scheduler),
            loads: LoadTracker::new(),
            pending: None,
            onionskin: OnionskinConfig::default(),
            onionskin_enabled: settings.onionskin(),
            viewport: Viewport::new(),
            read_sidecar: settings.read_sidecar(),
            listeners: Vec::new(),
        }
    }

    /// Register a display-refresh callback.
    pub fn subscribe(&mut self, listener: impl FnMut(&DisplayUpdate) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // Accessors

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn selected_asset(&self) -> Option<&Asset> {
        self.selected.and_then(|i| self.assets.get(i))
    }

    #[inline]
    pub fn is_sprite_mode(&self) -> bool {
        self.sprite_mode
    }

    #[inline]
    pub fn engine(&self) -> &SpriteAtlasEngine {
        &self.engine
    }

    #[inline]
    pub fn atlas_config(&self) -> &AtlasConfig {
        self.engine.config()
    }

    #[inline]
    pub fn playback(&self) -> &PlaybackController<S> {
        &self.playback
    }

    #[inline]
    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    /// The host scheduler, e.g. to poll the armed timer.
    #[inline]
    pub fn scheduler(&self) -> &S {
        self.playback.scheduler()
    }

    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut S {
        self.playback.scheduler_mut()
    }

    #[inline]
    pub fn load_phase(&self) -> LoadPhase {
        self.loads.phase()
    }

    #[inline]
    pub fn is_onionskin_enabled(&self) -> bool {
        self.onionskin_enabled
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[inline]
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Length of the active sequence.
    pub fn total_frames(&self) -> usize {
        if self.sprite_mode {
            self.engine.frame_count()
        } else {
            self.assets.len()
        }
    }

    // Assets and mode

    /// Replace the asset list and select the first asset.
    ///
    /// Playback stops and any load in flight is abandoned. In sprite mode
    /// the returned request loads the new atlas.
    pub fn set_assets(&mut self, assets: Vec<Asset>) -> Option<LoadRequest> {
        self.playback.stop();
        self.cancel_load();
        self.engine.clear();
        self.viewport.reset();

        info!("{} assets selected", assets.len());
        self.assets = assets;
        self.selected = (!self.assets.is_empty()).then_some(0);
        self.adopt_sidecar();

        let request = match self.selected {
            Some(index) if self.sprite_mode => self.begin_atlas_load(index, None),
            _ => None,
        };
        self.sync_sequence();
        self.notify();
        request
    }

    /// Select an asset by position in the list.
    ///
    /// In sprite mode the asset becomes the atlas only once its bitmap
    /// arrives through [`Viewer::complete_load`]. Until then the previous
    /// atlas, its config and its selection stay in place, and they are kept
    /// for good if the load fails.
    pub fn select_asset(&mut self, index: usize) -> Option<LoadRequest> {
        if index >= self.assets.len() {
            return None;
        }

        if !self.sprite_mode {
            let changed = self.selected != Some(index);
            self.playback.seek(index);
            self.after_move();
            if changed {
                self.adopt_sidecar();
            }
            return None;
        }

        let path = self.assets[index].path.clone();
        if self.selected == Some(index) && self.engine.has_bitmap_for(&path) {
            // Back to the atlas on screen: drop any other atlas still loading
            self.cancel_load();
            return None;
        }
        self.playback.stop();
        self.viewport.reset();
        let config = self.sidecar_config(index);
        let request = self.begin_atlas_load(index, config);
        self.notify();
        request
    }

    /// Switch between image mode and sprite mode.
    ///
    /// The index returns to 0. Entering sprite mode re-extracts frames
    /// immediately when the selected asset's bitmap is already installed,
    /// otherwise a load request is returned.
    pub fn set_sprite_mode(&mut self, enabled: bool) -> Option<LoadRequest> {
        if enabled == self.sprite_mode {
            return None;
        }
        self.playback.stop();
        self.sprite_mode = enabled;
        self.viewport.reset();
        debug!("sprite mode {}", if enabled { "on" } else { "off" });

        let request = if enabled {
            match self.selected {
                Some(index) if self.assets.get(index).is_some_and(|a| self.engine.has_bitmap_for(&a.path)) => {
                    let config = *self.engine.config();
                    self.engine.configure(config);
                    None
                }
                Some(index) => {
                    self.engine.clear();
                    self.begin_atlas_load(index, None)
                }
                None => None,
            }
        } else {
            self.cancel_load();
            self.selected = (!self.assets.is_empty()).then_some(0);
            None
        };

        self.sync_sequence();
        self.notify();
        request
    }

    pub fn toggle_mode(&mut self) -> Option<LoadRequest> {
        self.set_sprite_mode(!self.sprite_mode)
    }

    /// Install the result of a load request.
    ///
    /// Returns `Ok(false)` when the request was superseded or cancelled; the
    /// result is dropped. A failed load is logged, leaves the current frames
    /// in place and is returned for the caller to report.
    pub fn complete_load(&mut self, ticket: LoadTicket, result: Result<Bitmap, AssetLoadError>) -> Result<bool, ViewerError> {
        if !self.loads.finish(ticket, result.is_ok()) {
            debug!("discarding stale load result {:?}", ticket);
            return Ok(false);
        }

        let pending = self.pending.take().filter(|p| p.ticket == ticket);
        let bitmap = result.inspect_err(|err| error!("failed to load atlas: {}", err))?;

        if let Some(pending) = pending {
            self.selected = Some(pending.index);
            if let Some(config) = pending.config {
                self.engine.configure(config);
            }
        }
        info!("atlas {} loaded ({}x{})", bitmap.source_path(), bitmap.width(), bitmap.height());
        self.engine.install(bitmap);
        self.playback.reset();
        self.sync_sequence();
        self.notify();
        Ok(true)
    }

    /// Abandon the load in flight, if any.
    pub fn cancel_load(&mut self) -> Option<LoadRequest> {
        self.pending = None;
        self.loads.cancel()
    }

    // Atlas config

    /// Apply an atlas config and re-extract frames. Returns the normalized config.
    pub fn apply_config(&mut self, config: AtlasConfig) -> AtlasConfig {
        let applied = self.engine.configure(config);
        if self.sprite_mode {
            self.playback.reset();
            self.sync_sequence();
            self.notify();
        }
        applied
    }

    /// Apply atlas form input, keeping the current value of every bad field.
    pub fn apply_raw_config(&mut self, raw: &RawAtlasInput) -> AtlasConfig {
        let config = parse_atlas_input(raw, self.engine.config());
        self.apply_config(config)
    }

    /// Write the current atlas config next to the selected asset.
    pub fn save_config(&self) -> Result<PathBuf, ViewerError> {
        let asset = self.selected_asset().ok_or(ViewerError::NoAssetSelected)?;
        Ok(sidecar::write_sidecar(&asset.path, &asset.name, self.engine.config())?)
    }

    // Playback

    pub fn play(&mut self) {
        if self.playback.is_playing() {
            return;
        }
        self.playback.play();
        if self.playback.is_playing() {
            self.notify();
        }
    }

    pub fn pause(&mut self) {
        if self.playback.is_playing() {
            self.playback.pause();
            self.notify();
        }
    }

    /// Pause and rewind to the first item.
    pub fn stop(&mut self) {
        self.playback.stop();
        self.after_move();
    }

    pub fn toggle_playback(&mut self) {
        if self.playback.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Change fps and speed; a running timer restarts at the new period.
    pub fn set_rate(&mut self, fps: f64, speed: f64) {
        self.playback.set_rate(fps, speed);
    }

    /// Change fps and speed from form text, keeping the current value of a bad field.
    pub fn set_rate_text(&mut self, fps: &str, speed: &str) {
        let state = self.playback.state();
        let fps = parse_rate("fps", fps, state.fps);
        let speed = parse_rate("speed", speed, state.speed);
        self.set_rate(fps, speed);
    }

    pub fn set_loop(&mut self, looping: bool) {
        if self.playback.is_looping() != looping {
            self.playback.set_loop(looping);
            self.notify();
        }
    }

    pub fn toggle_loop(&mut self) {
        self.set_loop(!self.playback.is_looping());
    }

    /// Forward a scheduler tick. Returns `true` when the display changed.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        if !self.playback.on_timer(id) {
            return false;
        }
        self.after_move();
        true
    }

    // Navigation

    /// Jump to `index`, clamped to the active sequence.
    pub fn seek(&mut self, index: usize) {
        if self.playback.seek(index) {
            self.after_move();
        }
    }

    pub fn go_to_first(&mut self) {
        self.seek(0);
    }

    pub fn go_to_last(&mut self) {
        if let Some(last) = self.total_frames().checked_sub(1) {
            self.seek(last);
        }
    }

    /// Step back one item; no-op on the first.
    pub fn previous(&mut self) {
        if let Some(index) = self.playback.current_index().checked_sub(1) {
            self.seek(index);
        }
    }

    /// Step forward one item; no-op on the last.
    pub fn next(&mut self) {
        let index = self.playback.current_index() + 1;
        if index < self.total_frames() {
            self.seek(index);
        }
    }

    /// Jump to the item under a click on the progress bar.
    pub fn seek_fraction(&mut self, fraction: f64) {
        if let Some(index) = index_at_fraction(fraction, self.total_frames()) {
            self.seek(index);
        }
    }

    /// Start dragging the progress handle. Timer ticks are ignored until
    /// [`Viewer::end_scrub`].
    pub fn begin_scrub(&mut self, fraction: f64) {
        self.playback.begin_scrub();
        self.seek_fraction(fraction);
    }

    pub fn scrub_to(&mut self, fraction: f64) {
        if self.playback.is_scrubbing() {
            self.seek_fraction(fraction);
        }
    }

    pub fn end_scrub(&mut self) {
        self.playback.end_scrub();
    }

    // Overlays and input

    /// Flip the onionskin overlay and return the new state.
    pub fn toggle_onionskin(&mut self) -> bool {
        self.onionskin_enabled = !self.onionskin_enabled;
        self.notify();
        self.onionskin_enabled
    }

    /// Run a keyboard command.
    ///
    /// Only [`ViewerCommand::SaveConfig`] can fail.
    pub fn handle_command(&mut self, command: ViewerCommand) -> Result<(), ViewerError> {
        match command {
            ViewerCommand::Previous => self.previous(),
            ViewerCommand::Next => self.next(),
            ViewerCommand::TogglePlayback => self.toggle_playback(),
            ViewerCommand::First => self.go_to_first(),
            ViewerCommand::Last => self.go_to_last(),
            ViewerCommand::ToggleOnionskin => {
                self.toggle_onionskin();
            }
            ViewerCommand::SaveConfig => {
                self.save_config()?;
            }
            ViewerCommand::Escape => {
                if self.viewport.is_fullscreen() {
                    self.viewport.toggle_fullscreen();
                } else if self.playback.is_playing() {
                    self.stop();
                }
            }
            ViewerCommand::ToggleFullscreen => {
                self.viewport.toggle_fullscreen();
            }
        }
        Ok(())
    }

    // Output

    /// What should be on screen now, or `None` for an empty sequence.
    pub fn display(&self) -> Option<DisplayUpdate> {
        let total_frames = self.total_frames();
        if total_frames == 0 {
            return None;
        }
        let current_index = self.playback.current_index();
        let (mode, frame_rect) = if self.sprite_mode {
            (DisplayMode::Frame, self.engine.frame(current_index).copied())
        } else {
            (DisplayMode::Image, None)
        };
        Some(DisplayUpdate {
            mode,
            current_index,
            total_frames,
            frame_rect,
            is_playing: self.playback.is_playing(),
            is_looping: self.playback.is_looping(),
        })
    }

    /// Draw list for the current atlas frame. Image mode has none: the host
    /// shows the asset itself.
    pub fn render(&self) -> Option<RenderResult> {
        if !self.sprite_mode {
            return None;
        }
        let onionskin = self.onionskin_enabled.then_some(&self.onionskin);
        render_frame(self.engine.frames(), self.playback.current_index(), onionskin)
    }

    /// Name, size and mode text for the info panel.
    pub fn info_labels(&self) -> Option<InfoLabels> {
        let asset = self.selected_asset()?;
        if self.sprite_mode {
            if let Some(frame) = self.engine.frame(self.playback.current_index()) {
                return Some(InfoLabels::for_frame(asset, frame, self.engine.config()));
            }
        }
        Some(InfoLabels::for_image(asset))
    }

    /// Square thumbnail of the frame at `position` in the frame list.
    pub fn frame_thumbnail(&self, position: usize, size: u32) -> Option<RgbaImage> {
        let bitmap = self.engine.bitmap()?;
        let frame = self.engine.frame(position)?;
        Some(bitmap.thumbnail(frame, size))
    }

    // Internals

    fn begin_atlas_load(&mut self, index: usize, config: Option<AtlasConfig>) -> Option<LoadRequest> {
        let path = self.assets.get(index)?.path.clone();
        debug!("loading atlas {}", path);
        let request = self.loads.begin(&path);
        self.pending = Some(PendingAtlas {
            ticket: request.ticket,
            index,
            config,
        });
        Some(request)
    }

    fn sidecar_config(&self, index: usize) -> Option<AtlasConfig> {
        if !self.read_sidecar {
            return None;
        }
        sidecar::read_sidecar(&self.assets.get(index)?.path)
    }

    /// Apply the sidecar of the selected asset right away.
    fn adopt_sidecar(&mut self) {
        if let Some(config) = self.selected.and_then(|index| self.sidecar_config(index)) {
            self.engine.configure(config);
        }
    }

    fn sync_sequence(&mut self) {
        let total = self.total_frames();
        self.playback.set_total_frames(total);
    }

    /// Follow a change of the playback index.
    fn after_move(&mut self) {
        if !self.sprite_mode && !self.assets.is_empty() {
            let index = self.playback.current_index();
            if self.selected != Some(index) {
                self.selected = Some(index);
                self.viewport.reset();
            }
        }
        self.notify();
    }

    fn notify(&mut self) {
        let Some(update) = self.display() else {
            return;
        };
        for listener in &mut self.listeners {
            listener(&update);
        }
    }
}

/// Perform a load request and hand the result back to the viewer.
///
/// The viewer is only borrowed after the bitmap is decoded, so other
/// operations (including newer loads) may run while this one is pending.
pub async fn run_load<S, L>(viewer: &RefCell<Viewer<S>>, loader: &L, request: LoadRequest) -> Result<bool, ViewerError>
where
    S: TickScheduler,
    L: BitmapLoader,
{
    let result = load_bitmap(loader, &request.path).await;
    viewer.borrow_mut().complete_load(request.ticket, result)
}

/// Fetch the host selection, show it, and load the atlas if one is needed.
pub async fn refresh_selection<S, A, L>(viewer: &RefCell<Viewer<S>>, source: &A, loader: &L) -> Result<(), ViewerError>
where
    S: TickScheduler,
    A: AssetSource,
    L: BitmapLoader,
{
    let assets = selected_assets(source).await?;
    let request = viewer.borrow_mut().set_assets(assets);
    if let Some(request) = request {
        run_load(viewer, loader, request).await?;
    }
    Ok(())
}
