//! Draw commands for the current atlas frame, with onionskin ghosts.

use crate::atlas::Frame;

/// Onionskin overlay parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OnionskinConfig {
    /// Neighbouring frames drawn on each side of the current one
    pub layers: usize,
    /// Opacity of the nearest ghost; layer `i` uses `base_opacity / i`
    pub base_opacity: f64,
}

impl Default for OnionskinConfig {
    fn default() -> Self {
        Self {
            layers: 3,
            base_opacity: 0.3,
        }
    }
}

impl OnionskinConfig {
    /// Opacity of the ghost at distance `offset` (1-based).
    #[inline]
    pub fn opacity(&self, offset: usize) -> f64 {
        self.base_opacity / offset.max(1) as f64
    }
}

/// Copy one atlas rectangle onto the output at the given opacity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCommand {
    /// Source rectangle in atlas space
    pub source: Frame,
    /// Destination rectangle (x, y, width, height) in output pixels
    pub dest: (f64, f64, f64, f64),
    pub alpha: f64,
}

/// Result of a render operation containing draw commands.
///
/// This is a platform-agnostic representation of what needs to be drawn.
/// Each consumer can interpret these commands for their rendering backend.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderResult {
    /// Output width in pixels
    pub width: f64,
    /// Output height in pixels
    pub height: f64,
    /// Draws in painting order; the last one is the opaque current frame
    pub draws: Vec<DrawCommand>,
}

/// Generate the draw list for frame `current` of `frames`.
///
/// With an onionskin config, up to `layers` preceding and following frames
/// are drawn first, nearest first (previous then next at each distance),
/// clipped at the sequence bounds. The current frame is drawn last at full
/// opacity. Every draw lands on the current frame's size.
///
/// ## Example
///
/// ```rust
/// use spritesheet_core_view::render::{render_frame, OnionskinConfig};
/// use spritesheet_core_view::{extract_frames, AtlasConfig};
///
/// let frames = extract_frames(400, 100, &AtlasConfig::grid(4, 1));
/// let result = render_frame(&frames, 1, Some(&OnionskinConfig::default())).unwrap();
///
/// // Frame 0 and 2 at distance 1, frame 3 at distance 2, then frame 1 itself
/// assert_eq!(result.draws.len(), 4);
/// assert_eq!(result.draws[3].source.index, 1);
/// assert_eq!(result.draws[3].alpha, 1.0);
/// ```
///
/// Panics if `current` is out of range: callers keep the playback index
/// clamped to the sequence.
pub fn render_frame(frames: &[Frame], current: usize, onionskin: Option<&OnionskinConfig>) -> Option<RenderResult> {
    if frames.is_empty() {
        return None;
    }
    assert!(
        current < frames.len(),
        "frame index {current} out of range for {} frames",
        frames.len()
    );

    let frame = frames[current];
    let dest = (0.0, 0.0, frame.width, frame.height);
    let mut draws = Vec::new();

    if let Some(onionskin) = onionskin {
        for offset in 1..=onionskin.layers {
            let alpha = onionskin.opacity(offset);
            if let Some(previous) = current.checked_sub(offset) {
                draws.push(DrawCommand {
                    source: frames[previous],
                    dest,
                    alpha,
                });
            }
            if let Some(next) = frames.get(current + offset) {
                draws.push(DrawCommand {
                    source: *next,
                    dest,
                    alpha,
                });
            }
        }
    }

    draws.push(DrawCommand {
        source: frame,
        dest,
        alpha: 1.0,
    });

    Some(RenderResult {
        width: frame.width,
        height: frame.height,
        draws,
    })
}

/// Web-specific rendering implementation.
#[cfg(feature = "web")]
pub mod web {
    use super::*;
    use wasm_bindgen::JsCast;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

    /// Replay a [`RenderResult`] onto an HTML canvas.
    ///
    /// ## Arguments
    ///
    /// * `atlas` - The loaded atlas image element
    /// * `canvas` - The target canvas element
    /// * `result` - Draw commands from [`render_frame`]
    ///
    /// ## Returns
    ///
    /// `Ok(())` on success, or an error message on failure.
    pub fn render_to_canvas(atlas: &HtmlImageElement, canvas: &HtmlCanvasElement, result: &RenderResult) -> Result<(), String> {
        canvas.set_width(result.width.ceil() as u32);
        canvas.set_height(result.height.ceil() as u32);

        let ctx = canvas
            .get_context("2d")
            .map_err(|_| "Failed to get 2d context")?
            .ok_or("No 2d context available")?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| "Failed to cast to CanvasRenderingContext2d")?;

        ctx.clear_rect(0.0, 0.0, result.width, result.height);

        for draw in &result.draws {
            let (dx, dy, dw, dh) = draw.dest;
            ctx.set_global_alpha(draw.alpha);
            ctx.draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                atlas,
                draw.source.x,
                draw.source.y,
                draw.source.width,
                draw.source.height,
                dx,
                dy,
                dw,
                dh,
            )
            .map_err(|_| "Failed to draw atlas frame")?;
        }

        ctx.set_global_alpha(1.0);
        Ok(())
    }
}
