//! The Device Service port.
//!
//! Everything SBManager needs from a physical (or simulated) device goes
//! through [`DeviceService`].  Transport details such as pairing, service
//! discovery, and lockdown sessions stay behind this trait.

use async_trait::async_trait;
use plist::Value;
use sbm_core::{DeviceLayoutConfig, FormatVersion, VersionTriple};
use serde::Serialize;
use thiserror::Error;

/// Failures while establishing a device session.
#[derive(Debug, Error, PartialEq)]
pub enum ConnectionError {
    /// No attached device has this identifier.
    #[error("device not found: {0}")]
    NotFound(String),

    /// The device was found but refused or broke the handshake.
    #[error("handshake with device {device_id} failed: {reason}")]
    HandshakeFailed { device_id: String, reason: String },
}

/// Failures of an established session's services.
#[derive(Debug, Error, PartialEq)]
pub enum ServiceError {
    /// The icon service could not be started or stopped responding.
    #[error("icon service unavailable: {0}")]
    Unavailable(String),

    /// The device's OS predates the icon service.
    #[error("OS version {0} does not provide the icon service")]
    UnsupportedOsVersion(VersionTriple),

    /// A request or response failed in transit.
    #[error("transfer failed: {0}")]
    Transfer(String),
}

/// An open session with one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSession {
    pub device_id: String,
    /// User-visible device name, when the device reports one.
    pub device_name: Option<String>,
}

/// A started icon service on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconServiceHandle {
    pub device_id: String,
}

/// Device attach/detach notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugEvent {
    Attached(String),
    Detached(String),
}

/// Everything SBManager asks of a device.
///
/// Implementations must be cheap to share (`Arc<dyn DeviceService>`): icon
/// images are fetched concurrently from many tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceService: Send + Sync {
    /// Opens a session with the device.
    async fn connect(&self, device_id: &str) -> Result<DeviceSession, ConnectionError>;

    /// The device's operating system version.
    async fn os_version(&self, session: &DeviceSession) -> Result<VersionTriple, ServiceError>;

    /// Home screen metrics (grid size, dock size, icon size).
    ///
    /// The returned `format_version` is advisory; the session controller
    /// derives the format from [`DeviceService::os_version`].
    async fn device_layout_config(&self, session: &DeviceSession) -> Result<DeviceLayoutConfig, ServiceError>;

    /// Starts the SpringBoard icon service.
    async fn start_icon_service(&self, session: &DeviceSession) -> Result<IconServiceHandle, ServiceError>;

    /// Fetches the icon state document in the requested format.
    async fn get_icon_document(&self, handle: &IconServiceHandle, format: FormatVersion) -> Result<Value, ServiceError>;

    /// Replaces the icon state document.
    async fn set_icon_document(&self, handle: &IconServiceHandle, document: Value) -> Result<(), ServiceError>;

    /// PNG bytes of one application icon.
    async fn get_icon_image(&self, handle: &IconServiceHandle, identity: &str) -> Result<Vec<u8>, ServiceError>;

    /// PNG bytes of the home screen wallpaper, if the device provides one.
    async fn get_wallpaper_image(&self, handle: &IconServiceHandle) -> Option<Vec<u8>>;

    /// Battery charge in percent.
    async fn battery_level(&self, session: &DeviceSession) -> Result<u8, ServiceError>;
}
