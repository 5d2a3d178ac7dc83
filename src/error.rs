//! Error types for loading, configuration and sidecar persistence.

/// Failure to turn an asset path into a decoded bitmap.
///
/// Recoverable: the viewer keeps whatever it was displaying before the
/// failed load and the caller shows a single message to the user.
#[derive(thiserror::Error, Debug)]
pub enum AssetLoadError {
    #[error("asset not found: {path}")]
    NotFound { path: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported image format: {path}")]
    UnsupportedFormat { path: String },

    #[error("failed to decode {path}: {message}")]
    Decode { path: String, message: String },
}

impl AssetLoadError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Path of the asset that failed to load.
    pub fn path(&self) -> &str {
        match self {
            Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::UnsupportedFormat { path }
            | Self::Decode { path, .. } => path,
        }
    }
}

/// Rejected user input for an atlas or playback field.
///
/// Never shown to the user: the offending field keeps its previous value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{field}: {raw:?} is not a number")]
    NotANumber { field: &'static str, raw: String },

    #[error("{field}: {value} is negative")]
    Negative { field: &'static str, value: i64 },

    #[error("{field}: must be at least 1")]
    Zero { field: &'static str },

    #[error("{field}: {raw:?} is not a positive finite rate")]
    InvalidRate { field: &'static str, raw: String },

    #[error("unknown read direction {0:?}")]
    UnknownDirection(String),
}

/// Failure to read or write a `_sprite_config.json` sidecar.
#[derive(thiserror::Error, Debug)]
pub enum SidecarError {
    #[error("image path {0:?} has no file name")]
    InvalidImagePath(String),

    #[error("sidecar io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed sidecar: {0}")]
    Json(#[from] serde_json::Error),
}

/// Umbrella error returned by [`crate::Viewer`] operations.
#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    AssetLoad(#[from] AssetLoadError),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error("no asset selected")]
    NoAssetSelected,
}
