//! Per-session device parameters.
//!
//! [`DeviceLayoutConfig`] is supplied by the device when a session starts and
//! stays fixed until the device is disconnected.  It drives both the codec
//! (row width, document format) and the placement arithmetic (capacities,
//! icon size).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_DOCK_CAPACITY: usize = 4;
const DEFAULT_ROWS: usize = 4;
const DEFAULT_COLUMNS: usize = 4;
const DEFAULT_ICON_SIZE: u32 = 57;

/// SpringBoard preference keys carrying the home screen metrics.
pub const KEY_ICON_COLUMNS: &str = "HomeScreenIconColumns";
pub const KEY_ICON_ROWS: &str = "HomeScreenIconRows";
pub const KEY_DOCK_MAX: &str = "HomeScreenIconDockMaxCount";
pub const KEY_ICON_WIDTH: &str = "HomeScreenIconWidth";
pub const KEY_ICON_HEIGHT: &str = "HomeScreenIconHeight";
/// Battery refresh period in seconds, when the device suggests one.
pub const KEY_BATTERY_POLL_INTERVAL: &str = "BatteryPollInterval";

/// Schema version of the icon-state document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatVersion {
    /// Row-wrapped pages with explicit empty markers; double-wrapped dock.
    V1,
    /// Flat pages and dock, gaps are simply absent.
    V2,
}

impl FormatVersion {
    /// Picks the document format the icon service speaks for a given OS version.
    ///
    /// Returns `None` when the OS predates the icon service altogether.
    pub fn for_os_version(version: VersionTriple) -> Option<Self> {
        match version.major {
            0..=2 => None,
            3 => Some(Self::V1),
            _ => Some(Self::V2),
        }
    }

    /// The numeric value the device expects in its `formatVersion` request field.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

/// A `major.minor.patch` operating system version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionTriple {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionTriple {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Error returned when a version string is not of the form `N[.N[.N]]`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid version string: {0:?}")]
pub struct ParseVersionError(pub String);

impl FromStr for VersionTriple {
    type Err = ParseVersionError;

    /// Parses `"4"`, `"4.3"` or `"4.3.1"`; missing components default to zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = [0u32; 3];
        let mut count = 0;
        for piece in s.trim().split('.') {
            if count == 3 {
                return Err(ParseVersionError(s.to_string()));
            }
            parts[count] = piece
                .parse()
                .map_err(|_| ParseVersionError(s.to_string()))?;
            count += 1;
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

/// Immutable per-session layout parameters reported by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceLayoutConfig {
    /// Maximum number of dock icons.
    pub dock_capacity: usize,
    /// Icon rows per page.
    pub page_rows: usize,
    /// Icon columns per page.
    pub page_columns: usize,
    /// Icon width in pixels.
    pub icon_width: u32,
    /// Icon height in pixels.
    pub icon_height: u32,
    /// Document schema to request and write.
    pub format_version: FormatVersion,
    /// How often the status bar battery level is refreshed, if the device
    /// reports it.  `None` leaves the choice to the application settings.
    pub battery_poll_interval: Option<Duration>,
}

impl Default for DeviceLayoutConfig {
    fn default() -> Self {
        Self {
            dock_capacity: DEFAULT_DOCK_CAPACITY,
            page_rows: DEFAULT_ROWS,
            page_columns: DEFAULT_COLUMNS,
            icon_width: DEFAULT_ICON_SIZE,
            icon_height: DEFAULT_ICON_SIZE,
            format_version: FormatVersion::V2,
            battery_poll_interval: None,
        }
    }
}

impl DeviceLayoutConfig {
    /// Number of icons a single page holds (`rows × columns`).
    pub fn page_capacity(&self) -> usize {
        self.page_rows * self.page_columns
    }

    /// Builds a config from the SpringBoard preference dictionary.
    ///
    /// Missing or non-positive values fall back to the 4×4 page / 4-icon dock /
    /// 57 px defaults.
    pub fn from_springboard_domain(domain: &plist::Dictionary, format_version: FormatVersion) -> Self {
        let read = |key: &str, default: u64| -> u64 {
            domain
                .get(key)
                .and_then(|v| v.as_unsigned_integer())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };
        Self {
            dock_capacity: read(KEY_DOCK_MAX, DEFAULT_DOCK_CAPACITY as u64) as usize,
            page_rows: read(KEY_ICON_ROWS, DEFAULT_ROWS as u64) as usize,
            page_columns: read(KEY_ICON_COLUMNS, DEFAULT_COLUMNS as u64) as usize,
            icon_width: read(KEY_ICON_WIDTH, u64::from(DEFAULT_ICON_SIZE)) as u32,
            icon_height: read(KEY_ICON_HEIGHT, u64::from(DEFAULT_ICON_SIZE)) as u32,
            format_version,
            battery_poll_interval: domain
                .get(KEY_BATTERY_POLL_INTERVAL)
                .and_then(|v| v.as_unsigned_integer())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plist::{Dictionary, Value};

    #[test]
    fn test_default_config_is_four_by_four_with_four_dock_slots() {
        let cfg = DeviceLayoutConfig::default();
        assert_eq!(cfg.page_capacity(), 16);
        assert_eq!(cfg.dock_capacity, 4);
    }

    #[test]
    fn test_version_triple_parses_full_and_partial_strings() {
        assert_eq!("4.3.1".parse(), Ok(VersionTriple::new(4, 3, 1)));
        assert_eq!("5.0".parse(), Ok(VersionTriple::new(5, 0, 0)));
        assert_eq!("3".parse(), Ok(VersionTriple::new(3, 0, 0)));
    }

    #[test]
    fn test_version_triple_rejects_garbage() {
        assert!("four".parse::<VersionTriple>().is_err());
        assert!("1.2.3.4".parse::<VersionTriple>().is_err());
    }

    #[test]
    fn test_format_version_for_os_version() {
        assert_eq!(FormatVersion::for_os_version(VersionTriple::new(2, 2, 1)), None);
        assert_eq!(
            FormatVersion::for_os_version(VersionTriple::new(3, 1, 3)),
            Some(FormatVersion::V1)
        );
        assert_eq!(
            FormatVersion::for_os_version(VersionTriple::new(4, 0, 0)),
            Some(FormatVersion::V2)
        );
    }

    #[test]
    fn test_from_springboard_domain_reads_metrics() {
        // Arrange
        let mut domain = Dictionary::new();
        domain.insert(KEY_ICON_COLUMNS.to_string(), Value::Integer(4i64.into()));
        domain.insert(KEY_ICON_ROWS.to_string(), Value::Integer(5i64.into()));
        domain.insert(KEY_DOCK_MAX.to_string(), Value::Integer(6i64.into()));

        // Act
        let cfg = DeviceLayoutConfig::from_springboard_domain(&domain, FormatVersion::V2);

        // Assert
        assert_eq!(cfg.page_rows, 5);
        assert_eq!(cfg.page_capacity(), 20);
        assert_eq!(cfg.dock_capacity, 6);
        assert_eq!(cfg.icon_width, 57, "missing keys keep defaults");
    }

    #[test]
    fn test_from_springboard_domain_ignores_zero_values() {
        let mut domain = Dictionary::new();
        domain.insert(KEY_ICON_COLUMNS.to_string(), Value::Integer(0i64.into()));
        let cfg = DeviceLayoutConfig::from_springboard_domain(&domain, FormatVersion::V1);
        assert_eq!(cfg.page_columns, 4);
        assert_eq!(cfg.format_version, FormatVersion::V1);
    }

    #[test]
    fn test_from_springboard_domain_reads_reported_battery_interval() {
        let mut domain = Dictionary::new();
        domain.insert(KEY_BATTERY_POLL_INTERVAL.to_string(), Value::Integer(15i64.into()));

        let cfg = DeviceLayoutConfig::from_springboard_domain(&domain, FormatVersion::V2);

        assert_eq!(cfg.battery_poll_interval, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_from_springboard_domain_without_battery_interval_leaves_it_unset() {
        let mut domain = Dictionary::new();
        domain.insert(KEY_BATTERY_POLL_INTERVAL.to_string(), Value::Integer(0i64.into()));

        let reported_zero = DeviceLayoutConfig::from_springboard_domain(&domain, FormatVersion::V2);
        let absent = DeviceLayoutConfig::from_springboard_domain(&Dictionary::new(), FormatVersion::V2);

        assert_eq!(reported_zero.battery_poll_interval, None);
        assert_eq!(absent.battery_poll_interval, None);
    }
}
