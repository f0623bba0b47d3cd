//! Widget HTML asset loading.
//!
//! Assets are read once at startup; a missing directory or file aborts
//! startup rather than surfacing as a per-request error.

use crate::error::{Result, WidgetError};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read the markup for one widget component.
///
/// Tries the exact `<component>.html` filename first, then falls back to the
/// last (lexicographically newest) `<component>-*.html` hash-suffixed build
/// artifact.
pub fn read_widget_html(assets_dir: &Path, component: &str) -> Result<String> {
    if !assets_dir.is_dir() {
        return Err(WidgetError::AssetsDirMissing(assets_dir.to_path_buf()).into());
    }

    let direct_path = assets_dir.join(format!("{component}.html"));
    if direct_path.is_file() {
        debug!("Loading widget asset {}", direct_path.display());
        return Ok(fs::read_to_string(&direct_path)?);
    }

    let prefix = format!("{component}-");
    let mut candidates: Vec<String> = fs::read_dir(assets_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(&prefix) && name.ends_with(".html"))
        .collect();
    candidates.sort();

    match candidates.last() {
        Some(fallback) => {
            let path = assets_dir.join(fallback);
            debug!("Loading widget asset {} (hashed variant)", path.display());
            Ok(fs::read_to_string(&path)?)
        }
        None => Err(WidgetError::AssetNotFound {
            name: component.to_string(),
            dir: assets_dir.to_path_buf(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McpError;
    use std::fs;

    #[test]
    fn test_exact_match_preferred() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pizza-list.html"), "<div>exact</div>").unwrap();
        fs::write(dir.path().join("pizza-list-abc123.html"), "<div>hashed</div>").unwrap();

        let html = read_widget_html(dir.path(), "pizza-list").unwrap();
        assert_eq!(html, "<div>exact</div>");
    }

    #[test]
    fn test_hashed_fallback_picks_last_variant() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pizza-list-aaa111.html"), "<div>old</div>").unwrap();
        fs::write(dir.path().join("pizza-list-bbb222.html"), "<div>new</div>").unwrap();
        // A different component must not be picked up.
        fs::write(dir.path().join("pizza-map-zzz999.html"), "<div>map</div>").unwrap();

        let html = read_widget_html(dir.path(), "pizza-list").unwrap();
        assert_eq!(html, "<div>new</div>");
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = read_widget_html(&missing, "pizza-list").unwrap_err();
        assert!(matches!(
            err,
            McpError::Widget(WidgetError::AssetsDirMissing(_))
        ));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_missing_asset_names_component_and_directory() {
        let dir = tempfile::tempdir().unwrap();

        let err = read_widget_html(dir.path(), "pizza-list").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("pizza-list"));
        assert!(message.contains(&dir.path().display().to_string()));
    }
}
