//! Storage infrastructure: configuration file and the icon image cache.
//!
//! - `config` reads and writes the TOML application configuration in the
//!   platform config directory, falling back to defaults on first run.
//! - `cache` decides where fetched icon and wallpaper PNGs live on disk and
//!   reads/writes them.
//!
//! Nothing outside this module touches those paths directly.

pub mod cache;
pub mod config;
