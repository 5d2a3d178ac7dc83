use serde::{Deserialize, Serialize};

use crate::animation::PlaybackState;
use crate::atlas::AtlasConfig;

/// Viewer defaults from a `viewer.toml` file or a JSON preference blob.
///
/// All fields are optional for forward/backward compatibility
/// with older preference files.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerSettings {
    pub fps: Option<f64>,
    pub speed: Option<f64>,
    pub looping: Option<bool>,
    pub sprite_mode: Option<bool>,
    pub onionskin: Option<bool>,
    pub read_sidecar: Option<bool>,
    pub atlas: Option<AtlasConfig>,
}

impl ViewerSettings {
    /// Parse a `viewer.toml` string into `ViewerSettings`.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Parse settings stored as JSON.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Initial playback state: 12 fps, 1x, no looping unless overridden.
    ///
    /// Invalid rates are replaced by the defaults when the controller is built.
    pub fn playback_state(&self) -> PlaybackState {
        let defaults = PlaybackState::default();
        PlaybackState {
            fps: self.fps.unwrap_or(defaults.fps),
            speed: self.speed.unwrap_or(defaults.speed),
            is_looping: self.looping.unwrap_or(defaults.is_looping),
            ..defaults
        }
    }

    /// Initial atlas config, normalized against the 4x4 default.
    pub fn atlas_config(&self) -> AtlasConfig {
        let defaults = AtlasConfig::default();
        self.atlas.map_or(defaults, |atlas| atlas.normalized(&defaults))
    }

    pub fn sprite_mode(&self) -> bool {
        self.sprite_mode.unwrap_or(false)
    }

    pub fn onionskin(&self) -> bool {
        self.onionskin.unwrap_or(false)
    }

    /// Whether `_sprite_config.json` sidecars are consulted on selection.
    pub fn read_sidecar(&self) -> bool {
        self.read_sidecar.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::ReadDirection;

    #[test]
    fn default_settings() {
        let settings = ViewerSettings::default();
        let state = settings.playback_state();
        assert_eq!((state.fps, state.speed), (12.0, 1.0));
        assert!(!state.is_looping);
        assert_eq!(settings.atlas_config(), AtlasConfig::default());
        assert!(!settings.sprite_mode());
        assert!(!settings.onionskin());
        assert!(settings.read_sidecar());
    }

    #[test]
    fn json_settings() {
        let settings = ViewerSettings::from_json_str(
            r#"{"fps": 24, "looping": true, "atlas": {"cols": 8, "rows": 2, "startFrame": 0, "endFrame": 40, "direction": "vertical"}}"#,
        )
        .unwrap();
        assert_eq!(settings.playback_state().fps, 24.0);
        assert!(settings.playback_state().is_looping);

        let atlas = settings.atlas_config();
        assert_eq!(atlas.end_frame, 15);
        assert_eq!(atlas.direction, ReadDirection::ColumnMajor);
    }

    #[test]
    fn unknown_fields_ignored() {
        let settings = ViewerSettings::from_json_str(r#"{"speed": 0.5, "theme": "dark"}"#).unwrap();
        assert_eq!(settings.speed, Some(0.5));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn toml_settings() {
        let settings = ViewerSettings::from_toml_str(
            r#"
fps = 30.0
speed = 2.0
sprite_mode = true
onionskin = true
read_sidecar = false

[atlas]
cols = 6
rows = 1
startFrame = 1
endFrame = 4
direction = "horizontal"
"#,
        )
        .unwrap();

        assert_eq!(settings.playback_state().speed, 2.0);
        assert!(settings.sprite_mode());
        assert!(settings.onionskin());
        assert!(!settings.read_sidecar());
        assert_eq!(settings.atlas_config().frame_count(), 4);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn empty_toml_is_all_defaults() {
        assert_eq!(ViewerSettings::from_toml_str("").unwrap(), ViewerSettings::default());
    }
}
