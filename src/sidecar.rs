//! `_sprite_config.json` files stored next to atlas images.
//!
//! A sidecar remembers the atlas layout of one image. Reading is best effort:
//! a missing or malformed file means "use the defaults", never an error.

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::atlas::AtlasConfig;
use crate::error::SidecarError;

/// Format version written into new sidecars.
pub const SIDECAR_VERSION: &str = "1.0";

const SIDECAR_SUFFIX: &str = "_sprite_config.json";

/// On-disk shape of a sidecar file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarConfig {
    pub sprite_config: AtlasConfig,
    /// Save time in milliseconds since the Unix epoch
    pub timestamp: i64,
    pub version: String,
    pub image_name: String,
    /// Save time as an RFC 3339 UTC string
    pub created: String,
}

impl SidecarConfig {
    /// Stamp `config` with the current time.
    pub fn new(image_name: impl Into<String>, config: AtlasConfig) -> Self {
        let now = Utc::now();
        Self {
            sprite_config: config,
            timestamp: now.timestamp_millis(),
            version: SIDECAR_VERSION.to_string(),
            image_name: image_name.into(),
            created: now.to_rfc3339(),
        }
    }
}

/// Sidecar path for an image: `<dir>/<basename>_sprite_config.json`.
///
/// ```rust
/// use std::path::Path;
/// use spritesheet_core_view::sidecar::config_path_for;
///
/// let path = config_path_for("/sprites/hero.walk.png").unwrap();
/// assert_eq!(path, Path::new("/sprites/hero.walk_sprite_config.json"));
/// ```
pub fn config_path_for(image_path: impl AsRef<Path>) -> Result<PathBuf, SidecarError> {
    let image_path = image_path.as_ref();
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SidecarError::InvalidImagePath(image_path.display().to_string()))?;
    Ok(image_path.with_file_name(format!("{stem}{SIDECAR_SUFFIX}")))
}

/// Load and parse the sidecar of an image.
pub fn load_sidecar(image_path: impl AsRef<Path>) -> Result<SidecarConfig, SidecarError> {
    let path = config_path_for(image_path)?;
    let text = std::fs::read_to_string(&path).map_err(|source| SidecarError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// The atlas config saved for an image, if a well-formed sidecar exists.
///
/// Missing files are expected and only logged at debug level; unreadable
/// or malformed ones are logged as warnings. The stored config is normalized
/// before it is returned.
pub fn read_sidecar(image_path: impl AsRef<Path>) -> Option<AtlasConfig> {
    let image_path = image_path.as_ref();
    match load_sidecar(image_path) {
        Ok(sidecar) => {
            debug!("loaded sprite config for {}", image_path.display());
            Some(sidecar.sprite_config.normalized(&AtlasConfig::default()))
        }
        Err(SidecarError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            debug!("no sprite config for {}", image_path.display());
            None
        }
        Err(err) => {
            warn!("ignoring sprite config for {}: {}", image_path.display(), err);
            None
        }
    }
}

/// Write the sidecar for an image and return the path written.
pub fn write_sidecar(
    image_path: impl AsRef<Path>,
    image_name: &str,
    config: &AtlasConfig,
) -> Result<PathBuf, SidecarError> {
    let path = config_path_for(image_path)?;
    let sidecar = SidecarConfig::new(image_name, *config);
    let json = serde_json::to_string_pretty(&sidecar)?;
    std::fs::write(&path, json).map_err(|source| SidecarError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!("saved sprite config to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::ReadDirection;

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("spritesheet_{tag}_{}_{}", std::process::id(), nanos));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn config_path_uses_basename() {
        assert_eq!(
            config_path_for("a/b/run.png").unwrap(),
            PathBuf::from("a/b/run_sprite_config.json")
        );
        assert!(matches!(config_path_for("/"), Err(SidecarError::InvalidImagePath(_))));
    }

    #[test]
    fn write_then_read() {
        let dir = temp_dir("sidecar_rw");
        let image = dir.join("run.png");
        let config = AtlasConfig {
            start_frame: 2,
            end_frame: 6,
            direction: ReadDirection::ColumnMajor,
            ..AtlasConfig::grid(4, 2)
        };

        let written = write_sidecar(&image, "run.png", &config).unwrap();
        assert_eq!(written, dir.join("run_sprite_config.json"));

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&written).unwrap()).unwrap();
        assert_eq!(raw["version"], "1.0");
        assert_eq!(raw["imageName"], "run.png");
        assert_eq!(raw["spriteConfig"]["direction"], "vertical");
        assert!(raw["timestamp"].as_i64().unwrap() > 0);
        assert!(chrono::DateTime::parse_from_rfc3339(raw["created"].as_str().unwrap()).is_ok());

        assert_eq!(read_sidecar(&image), Some(config));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_sidecar_is_none() {
        let dir = temp_dir("sidecar_missing");
        assert_eq!(read_sidecar(dir.join("idle.png")), None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_sidecar_is_none() {
        let dir = temp_dir("sidecar_bad");
        std::fs::write(dir.join("jump_sprite_config.json"), "{ not json").unwrap();
        assert_eq!(read_sidecar(dir.join("jump.png")), None);
        assert!(matches!(load_sidecar(dir.join("jump.png")), Err(SidecarError::Json(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn stored_config_is_normalized() {
        let dir = temp_dir("sidecar_clamp");
        std::fs::write(
            dir.join("big_sprite_config.json"),
            r#"{"spriteConfig": {"cols": 2, "rows": 2, "startFrame": 0, "endFrame": 30, "direction": "horizontal"},
                "timestamp": 0, "version": "1.0", "imageName": "big.png", "created": "1970-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(read_sidecar(dir.join("big.png")).map(|c| c.end_frame), Some(3));
        std::fs::remove_dir_all(&dir).ok();
    }
}
