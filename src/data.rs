//! Asset records and the adapter from host item shapes.

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::AssetLoadError;

/// Extensions the viewer can display, lower-case without the dot.
pub const DISPLAYABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];

/// Whether an extension (any case, optional leading dot) is displayable.
pub fn is_displayable_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    DISPLAYABLE_EXTENSIONS.contains(&ext.as_str())
}

/// An image asset as seen by the viewer core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Full path to the image file
    pub path: String,
    /// Display name (e.g. "walk_cycle.png")
    pub name: String,
    /// Lower-case extension without the dot
    pub ext: String,
    /// Pixel width reported by the host
    pub width: u32,
    /// Pixel height reported by the host
    pub height: u32,
}

impl Asset {
    /// Create a new Asset, deriving the extension from the path.
    pub fn new(path: impl Into<String>, name: impl Into<String>, width: u32, height: u32) -> Self {
        let path = path.into();
        let ext = extension_of(&path).unwrap_or_default();
        Self {
            path,
            name: name.into(),
            ext,
            width,
            height,
        }
    }

    #[inline]
    pub fn is_displayable(&self) -> bool {
        is_displayable_extension(&self.ext)
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// An item as delivered by the host application.
///
/// This is the one place host field names are mapped onto [`Asset`]; the
/// rest of the crate only sees `Asset`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostItem {
    #[serde(alias = "path")]
    pub file_path: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "extension")]
    pub ext: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl HostItem {
    /// Map to an [`Asset`], or `None` when the item has no path or is not a
    /// displayable image.
    ///
    /// A missing name is taken from the file name, a missing extension from
    /// the name or path.
    pub fn into_asset(self) -> Option<Asset> {
        let path = self.file_path.filter(|p| !p.is_empty())?;

        let name = match self.name.filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => Path::new(&path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(path.as_str())
                .to_string(),
        };

        let ext = match self.ext.filter(|e| !e.is_empty()) {
            Some(ext) => ext.trim_start_matches('.').to_ascii_lowercase(),
            None => extension_of(&name).or_else(|| extension_of(&path))?,
        };

        if !is_displayable_extension(&ext) {
            debug!("skipping non-image item {}", name);
            return None;
        }

        Some(Asset {
            path,
            name,
            ext,
            width: self.width.unwrap_or(0),
            height: self.height.unwrap_or(0),
        })
    }
}

/// Parse a JSON array of host items.
pub fn parse_host_items(json: &str) -> Result<Vec<HostItem>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Keep the displayable items and sort them by name in natural order.
pub fn collect_displayable(items: impl IntoIterator<Item = HostItem>) -> Vec<Asset> {
    let mut assets: Vec<Asset> = items.into_iter().filter_map(HostItem::into_asset).collect();
    assets.sort_by(|a, b| alphanumeric_sort::compare_str(&a.name, &b.name));
    assets
}

/// Trait for the host collaborator that knows which assets are selected.
///
/// No `Send` bounds: works in both native and WASM (single-threaded) contexts.
pub trait AssetSource {
    /// The currently selected items, in host order. May be empty.
    fn selected_items(&self) -> impl std::future::Future<Output = Result<Vec<HostItem>, AssetLoadError>>;
}

/// Fetch the selection and reduce it to sorted, displayable assets.
pub async fn selected_assets<S: AssetSource>(source: &S) -> Result<Vec<Asset>, AssetLoadError> {
    let items = source.selected_items().await?;
    let total = items.len();
    let assets = collect_displayable(items);
    debug!("{} of {} selected items are displayable", assets.len(), total);
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_displayable_extensions() {
        for ext in ["jpg", "JPEG", ".png", "gif", "bmp", "webp", "Svg"] {
            assert!(is_displayable_extension(ext), "{ext}");
        }
        for ext in ["tiff", "psd", "mp4", ""] {
            assert!(!is_displayable_extension(ext), "{ext}");
        }
    }

    #[test]
    fn test_host_item_mapping() {
        let items = parse_host_items(
            r#"[
                {"filePath": "/lib/run.png", "name": "run", "ext": "png", "width": 512, "height": 256},
                {"path": "/lib/idle.PNG"},
                {"filePath": "/lib/clip.mp4", "name": "clip", "ext": "mp4"},
                {"name": "orphan", "ext": "png"}
            ]"#,
        )
        .unwrap();

        let assets: Vec<Asset> = items.into_iter().filter_map(HostItem::into_asset).collect();
        assert_eq!(assets.len(), 2);

        assert_eq!(assets[0].path, "/lib/run.png");
        assert_eq!(assets[0].name, "run");
        assert_eq!((assets[0].width, assets[0].height), (512, 256));

        assert_eq!(assets[1].name, "idle.PNG");
        assert_eq!(assets[1].ext, "png");
        assert_eq!(assets[1].width, 0);
    }

    #[test]
    fn test_collect_sorts_naturally() {
        let item = |name: &str| HostItem {
            file_path: Some(format!("/lib/{name}")),
            name: Some(name.to_string()),
            ..Default::default()
        };
        let assets = collect_displayable(vec![item("frame_10.png"), item("frame_2.png"), item("frame_1.png")]);
        let names: Vec<&str> = assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["frame_1.png", "frame_2.png", "frame_10.png"]);
    }

    struct FixedSource(Vec<HostItem>);

    impl AssetSource for FixedSource {
        fn selected_items(&self) -> impl std::future::Future<Output = Result<Vec<HostItem>, AssetLoadError>> {
            let items = self.0.clone();
            async move { Ok(items) }
        }
    }

    #[test]
    fn test_selected_assets_filters() {
        let source = FixedSource(vec![
            HostItem {
                file_path: Some("/a/b.webp".into()),
                ..Default::default()
            },
            HostItem {
                file_path: Some("/a/readme.txt".into()),
                ..Default::default()
            },
        ]);
        let assets = futures::executor::block_on(selected_assets(&source)).unwrap();
        assert_eq!(assets, vec![Asset::new("/a/b.webp", "b.webp", 0, 0)]);
    }
}
