//! On-disk cache for icon and wallpaper PNGs.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/icons/<identity>.png
//! <root>/wallpapers/<device id>.png
//! ```
//!
//! The default root is the platform cache directory:
//! - Windows:  `%LOCALAPPDATA%\SBManager`
//! - Linux:    `$XDG_CACHE_HOME/sbmanager` (or `~/.cache/sbmanager`)
//! - macOS:    `~/Library/Caches/SBManager`
//!
//! Identities become file names through [`file_stem`]: every byte outside
//! `[A-Za-z0-9._-]` is written as `%XX`.  A web-clip identity containing `/`
//! or `:` cannot escape the cache directory, and two identities never share
//! a file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::application::icon_loader::ImageStore;
use crate::infrastructure::storage::config::CacheConfig;

/// Error type for cache directory operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("could not determine platform cache directory")]
    NoPlatformCacheDir,

    #[error("I/O error accessing cache at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File-backed [`ImageStore`].
#[derive(Debug, Clone)]
pub struct ImageCache {
    root: PathBuf,
}

impl ImageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses the configured directory, or the platform default.
    ///
    /// # Errors
    ///
    /// [`CacheError::NoPlatformCacheDir`] if neither is available.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        match &config.directory {
            Some(dir) => Ok(Self::new(dir.clone())),
            None => platform_cache_dir().map(Self::new).ok_or(CacheError::NoPlatformCacheDir),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn icon_path(&self, identity: &str) -> PathBuf {
        self.root.join("icons").join(format!("{}.png", file_stem(identity)))
    }

    pub fn wallpaper_path(&self, device_id: &str) -> PathBuf {
        self.root.join("wallpapers").join(format!("{}.png", file_stem(device_id)))
    }

    async fn write(&self, path: &Path, png: &[u8]) -> Result<(), CacheError> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|source| CacheError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        tokio::fs::write(path, png).await.map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = png.len(), "cached image");
        Ok(())
    }
}

#[async_trait]
impl ImageStore for ImageCache {
    async fn load_icon(&self, identity: &str) -> Option<Vec<u8>> {
        tokio::fs::read(self.icon_path(identity)).await.ok()
    }

    async fn store_icon(&self, identity: &str, png: &[u8]) -> Result<(), String> {
        self.write(&self.icon_path(identity), png)
            .await
            .map_err(|e| e.to_string())
    }

    async fn store_wallpaper(&self, device_id: &str, png: &[u8]) -> Result<(), String> {
        self.write(&self.wallpaper_path(device_id), png)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Percent-encodes `name` for use as a file name stem.
///
/// `%` itself is outside the kept set, so decoding is unambiguous and
/// distinct names always map to distinct stems.
pub fn file_stem(name: &str) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

fn platform_cache_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("LOCALAPPDATA").map(|p| PathBuf::from(p).join("SBManager"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))?;
        Some(base.join("sbmanager"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join("Library").join("Caches").join("SBManager"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache() -> ImageCache {
        ImageCache::new(std::env::temp_dir().join(format!("sbm-cache-test-{}", uuid::Uuid::new_v4())))
    }

    #[test]
    fn test_identity_is_percent_encoded_into_file_name() {
        let cache = ImageCache::new("/cache");
        let path = cache.icon_path("http://example.com/clip:1");
        assert_eq!(path, PathBuf::from("/cache/icons/http%3A%2F%2Fexample.com%2Fclip%3A1.png"));
    }

    #[test]
    fn test_file_stem_keeps_distinct_identities_apart() {
        // Arrange
        let names = ["a/b", "a:b", "a_b", "a%2Fb", "caf\u{e9}"];

        // Act
        let stems: Vec<String> = names.iter().map(|n| file_stem(n)).collect();

        // Assert
        for (i, a) in stems.iter().enumerate() {
            for b in &stems[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(stems[3], "a%252Fb");
        assert_eq!(stems[4], "caf%C3%A9");
    }

    #[test]
    fn test_file_stem_leaves_bundle_identifiers_readable() {
        assert_eq!(file_stem("com.example.my-app_2"), "com.example.my-app_2");
    }

    #[test]
    fn test_from_config_prefers_configured_directory() {
        let config = CacheConfig {
            directory: Some(PathBuf::from("/tmp/sbm-explicit")),
        };
        let cache = ImageCache::from_config(&config).expect("configured dir");
        assert_eq!(cache.root(), Path::new("/tmp/sbm-explicit"));
    }

    #[tokio::test]
    async fn test_missing_icon_loads_as_none() {
        let cache = temp_cache();
        assert_eq!(cache.load_icon("com.example.none").await, None);
    }

    #[tokio::test]
    async fn test_stored_icon_is_loaded_back() {
        // Arrange
        let cache = temp_cache();

        // Act
        cache.store_icon("com.example.app", &[1, 2, 3]).await.expect("store");
        let loaded = cache.load_icon("com.example.app").await;

        // Assert
        assert_eq!(loaded, Some(vec![1, 2, 3]));
        let _ = std::fs::remove_dir_all(cache.root());
    }

    #[tokio::test]
    async fn test_wallpaper_is_written_per_device() {
        let cache = temp_cache();

        cache.store_wallpaper("abc123", b"png").await.expect("store");

        assert_eq!(std::fs::read(cache.wallpaper_path("abc123")).expect("read"), b"png");
        let _ = std::fs::remove_dir_all(cache.root());
    }
}
