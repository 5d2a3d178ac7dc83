//! Zoom, pan and fullscreen state of the display area.

/// Multiplicative step of one zoom in/out action.
pub const ZOOM_STEP: f64 = 1.2;
/// Smallest allowed scale.
pub const MIN_SCALE: f64 = 0.1;
/// Largest allowed scale.
pub const MAX_SCALE: f64 = 5.0;

/// View transform applied to the displayed image or frame canvas.
///
/// Panning is only possible while zoomed in past 1x. Pointer deltas are
/// divided by the scale so the content tracks the pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    scale: f64,
    translate_x: f64,
    translate_y: f64,
    /// Last pointer position while a drag is active
    drag_origin: Option<(f64, f64)>,
    fullscreen: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            drag_origin: None,
            fullscreen: false,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Current pan offset in unscaled pixels.
    #[inline]
    pub fn translate(&self) -> (f64, f64) {
        (self.translate_x, self.translate_y)
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    #[inline]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn zoom_in(&mut self) {
        self.scale = (self.scale * ZOOM_STEP).min(MAX_SCALE);
    }

    pub fn zoom_out(&mut self) {
        self.scale = (self.scale / ZOOM_STEP).max(MIN_SCALE);
    }

    /// Apply a mouse wheel step: scrolling down zooms out, up zooms in.
    pub fn wheel(&mut self, delta_y: f64) {
        if delta_y > 0.0 {
            self.zoom_out();
        } else if delta_y < 0.0 {
            self.zoom_in();
        }
    }

    /// Start panning at pointer position `(x, y)`.
    ///
    /// Returns `false` without starting a drag when not zoomed in.
    pub fn begin_drag(&mut self, x: f64, y: f64) -> bool {
        if self.scale <= 1.0 {
            return false;
        }
        self.drag_origin = Some((x, y));
        true
    }

    /// Move an active drag to pointer position `(x, y)`.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        let Some((last_x, last_y)) = self.drag_origin else {
            return;
        };
        self.translate_x += (x - last_x) / self.scale;
        self.translate_y += (y - last_y) / self.scale;
        self.drag_origin = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.drag_origin = None;
    }

    /// Back to 1x with no pan. Fullscreen is left as is.
    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.translate_x = 0.0;
        self.translate_y = 0.0;
        self.drag_origin = None;
    }

    /// Flip fullscreen and return the new state.
    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.fullscreen
    }

    /// Returns a CSS `transform` value for the current view.
    ///
    /// ```rust
    /// use spritesheet_core_view::Viewport;
    ///
    /// let mut viewport = Viewport::new();
    /// viewport.zoom_in();
    /// assert_eq!(viewport.transform_css(), "scale(1.2) translate(0px, 0px)");
    /// ```
    pub fn transform_css(&self) -> String {
        format!(
            "scale({}) translate({}px, {}px)",
            self.scale, self.translate_x, self.translate_y
        )
    }
}

/// Fit-to-container sizing configuration.
#[derive(Clone, Debug)]
pub struct FitSizing {
    /// Padding to subtract from container dimensions
    pub padding: f64,
    /// Smallest scale returned
    pub min_scale: f64,
    /// Largest scale returned; 1.0 never enlarges content
    pub max_scale: f64,
}

impl Default for FitSizing {
    fn default() -> Self {
        Self {
            padding: 20.0,
            min_scale: MIN_SCALE,
            max_scale: 1.0,
        }
    }
}

impl FitSizing {
    /// Largest scale at which `content` fits the padded container.
    ///
    /// ## Arguments
    ///
    /// * `content_width` - Content width in pixels
    /// * `content_height` - Content height in pixels
    /// * `container_width` - Available container width in pixels
    /// * `container_height` - Available container height in pixels
    ///
    /// ## Returns
    ///
    /// The scale, clamped between `min_scale` and `max_scale`.
    pub fn fit_scale(&self, content_width: f64, content_height: f64, container_width: f64, container_height: f64) -> f64 {
        if content_width <= 0.0 || content_height <= 0.0 {
            return self.max_scale;
        }

        let available_width = container_width - self.padding;
        let available_height = container_height - self.padding;

        if available_width <= 0.0 || available_height <= 0.0 {
            return self.min_scale;
        }

        let scale = (available_width / content_width).min(available_height / content_height);
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Content size in pixels after fitting.
    pub fn fitted_size(&self, content_width: f64, content_height: f64, container_width: f64, container_height: f64) -> (f64, f64) {
        let scale = self.fit_scale(content_width, content_height, container_width, container_height);
        (content_width * scale, content_height * scale)
    }
}
