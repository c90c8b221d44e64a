use std::path::{Path, PathBuf};

use crate::shared::constants::{IMAGE_EXTENSIONS, MODELS_DIR_ENV};

/// Directory that model assets are resolved against.
///
/// Resolution order:
/// 1. `CONTENT_GUARD_MODELS_DIR` if set
/// 2. Platform cache directory (`~/Library/Application Support/ContentGuard/models/`
///    on macOS, `$XDG_CACHE_HOME/ContentGuard/models/` elsewhere)
/// 3. `.assets/models` relative to the working directory
pub fn models_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(MODELS_DIR_ENV) {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("ContentGuard").join("models"))
        .unwrap_or_else(|| PathBuf::from(".assets").join("models"))
}

/// Resolve an asset path relative to [`models_dir`]. Absolute paths are
/// returned unchanged.
pub fn resolve_relative_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return path.to_path_buf();
    }
    models_dir().join(path)
}

/// Whether the path carries one of the known still-image extensions.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
