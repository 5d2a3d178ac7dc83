//! Parsing of raw form input and keyboard keys.
//!
//! Form fields arrive as text. Each field is parsed on its own and a bad
//! value falls back to the previous valid one, so one typo never resets the
//! whole atlas layout.

use log::debug;

use crate::atlas::{AtlasConfig, ReadDirection};
use crate::error::ConfigValidationError;

/// Atlas form fields exactly as typed by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawAtlasInput {
    pub cols: String,
    pub rows: String,
    pub start_frame: String,
    pub end_frame: String,
    pub direction: String,
}

/// Parse a non-negative whole number.
///
/// Like a browser number field, a leading integer is accepted and anything
/// after it is ignored, so `"12px"` and `"3.7"` parse as 12 and 3.
pub fn parse_count(field: &'static str, raw: &str) -> Result<u32, ConfigValidationError> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    let not_a_number = || ConfigValidationError::NotANumber {
        field,
        raw: raw.to_string(),
    };
    if end == 0 {
        return Err(not_a_number());
    }
    let value: i64 = digits[..end].parse().map_err(|_| not_a_number())?;

    if negative && value != 0 {
        return Err(ConfigValidationError::Negative { field, value: -value });
    }
    u32::try_from(value).map_err(|_| not_a_number())
}

/// Parse a grid dimension: a whole number of at least 1.
pub fn parse_grid_count(field: &'static str, raw: &str) -> Result<u32, ConfigValidationError> {
    match parse_count(field, raw)? {
        0 => Err(ConfigValidationError::Zero { field }),
        n => Ok(n),
    }
}

/// Parse a read direction name.
///
/// Accepts `horizontal`/`row-major` and `vertical`/`column-major`, ignoring
/// case and surrounding whitespace.
pub fn parse_direction(raw: &str) -> Result<ReadDirection, ConfigValidationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "horizontal" | "row-major" | "row" => Ok(ReadDirection::RowMajor),
        "vertical" | "column-major" | "column" => Ok(ReadDirection::ColumnMajor),
        _ => Err(ConfigValidationError::UnknownDirection(raw.to_string())),
    }
}

/// Parse a positive, finite rate such as fps or a speed multiplier.
pub fn parse_positive_rate(field: &'static str, raw: &str) -> Result<f64, ConfigValidationError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| ConfigValidationError::InvalidRate {
            field,
            raw: raw.to_string(),
        })
}

/// Parse a rate field, keeping `previous` when the text is not a valid rate.
pub fn parse_rate(field: &'static str, raw: &str, previous: f64) -> f64 {
    or_previous(parse_positive_rate(field, raw), previous)
}

/// Turn form input into a normalized config.
///
/// Every field that fails to parse keeps its value from `previous`, then the
/// result is normalized against `previous`.
///
/// ```rust
/// use spritesheet_core_view::parser::{parse_atlas_input, RawAtlasInput};
/// use spritesheet_core_view::AtlasConfig;
///
/// let raw = RawAtlasInput {
///     cols: "8".into(),
///     rows: "zero".into(),
///     start_frame: "0".into(),
///     end_frame: "99".into(),
///     direction: "horizontal".into(),
/// };
/// let config = parse_atlas_input(&raw, &AtlasConfig::default());
/// assert_eq!((config.cols, config.rows), (8, 4));
/// assert_eq!(config.end_frame, 31);
/// ```
pub fn parse_atlas_input(raw: &RawAtlasInput, previous: &AtlasConfig) -> AtlasConfig {
    let requested = AtlasConfig {
        cols: or_previous(parse_grid_count("cols", &raw.cols), previous.cols),
        rows: or_previous(parse_grid_count("rows", &raw.rows), previous.rows),
        start_frame: or_previous(parse_count("startFrame", &raw.start_frame), previous.start_frame),
        end_frame: or_previous(parse_count("endFrame", &raw.end_frame), previous.end_frame),
        direction: or_previous(parse_direction(&raw.direction), previous.direction),
    };
    requested.normalized(previous)
}

fn or_previous<T>(parsed: Result<T, ConfigValidationError>, previous: T) -> T {
    parsed.unwrap_or_else(|err| {
        debug!("rejected input, keeping previous value: {}", err);
        previous
    })
}

/// A viewer action bound to a keyboard key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerCommand {
    Previous,
    Next,
    TogglePlayback,
    First,
    Last,
    ToggleOnionskin,
    /// Save the atlas config sidecar
    SaveConfig,
    /// Leave fullscreen, or stop playback when not fullscreen
    Escape,
    ToggleFullscreen,
}

impl ViewerCommand {
    /// Map a `KeyboardEvent.key` value to a command.
    ///
    /// `ctrl_or_meta` is true while Ctrl (or Cmd on macOS) is held; it turns
    /// `s` into [`ViewerCommand::SaveConfig`] and leaves every other chord to
    /// the host.
    pub fn from_key(key: &str, ctrl_or_meta: bool) -> Option<ViewerCommand> {
        if ctrl_or_meta {
            return matches!(key, "s" | "S").then_some(ViewerCommand::SaveConfig);
        }
        match key {
            "ArrowLeft" => Some(ViewerCommand::Previous),
            "ArrowRight" => Some(ViewerCommand::Next),
            " " | "Spacebar" => Some(ViewerCommand::TogglePlayback),
            "Home" => Some(ViewerCommand::First),
            "End" => Some(ViewerCommand::Last),
            "o" | "O" => Some(ViewerCommand::ToggleOnionskin),
            "Escape" => Some(ViewerCommand::Escape),
            "F11" => Some(ViewerCommand::ToggleFullscreen),
            _ => None,
        }
    }
}
