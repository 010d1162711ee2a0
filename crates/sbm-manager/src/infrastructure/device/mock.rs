//! Scripted in-memory device.
//!
//! Holds one icon state document, a set of icon images, and a battery level.
//! Every `set_icon_document` call is recorded so tests can assert on exactly
//! what was written back and how often.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use plist::Value;
use sbm_core::{DeviceLayoutConfig, FormatVersion, VersionTriple};

use crate::application::device::{
    ConnectionError, DeviceService, DeviceSession, IconServiceHandle, ServiceError,
};

/// An in-memory [`DeviceService`] for tests and UI development.
pub struct MockDevice {
    device_id: String,
    device_name: Option<String>,
    os_version: VersionTriple,
    config: DeviceLayoutConfig,
    document: Mutex<Value>,
    icons: HashMap<String, Vec<u8>>,
    wallpaper: Option<Vec<u8>>,
    battery_level: u8,
    icon_service_available: bool,
    writes: Mutex<Vec<Value>>,
    requested_formats: Mutex<Vec<FormatVersion>>,
    icon_requests: AtomicUsize,
}

impl MockDevice {
    /// A device with the given id, OS version, and icon state document.
    pub fn new(device_id: impl Into<String>, os_version: VersionTriple, document: Value) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: None,
            os_version,
            config: DeviceLayoutConfig::default(),
            document: Mutex::new(document),
            icons: HashMap::new(),
            wallpaper: None,
            battery_level: 100,
            icon_service_available: true,
            writes: Mutex::new(Vec::new()),
            requested_formats: Mutex::new(Vec::new()),
            icon_requests: AtomicUsize::new(0),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn with_config(mut self, config: DeviceLayoutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_icon(mut self, identity: impl Into<String>, png: Vec<u8>) -> Self {
        self.icons.insert(identity.into(), png);
        self
    }

    pub fn with_wallpaper(mut self, png: Vec<u8>) -> Self {
        self.wallpaper = Some(png);
        self
    }

    pub fn with_battery_level(mut self, level: u8) -> Self {
        self.battery_level = level;
        self
    }

    /// Makes `start_icon_service` fail.
    pub fn without_icon_service(mut self) -> Self {
        self.icon_service_available = false;
        self
    }

    // ── Recorded interactions ─────────────────────────────────────────────────

    /// Every document written so far, oldest first.
    pub fn writes(&self) -> Vec<Value> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The document the device currently holds.
    pub fn current_document(&self) -> Value {
        self.document.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Formats requested through `get_icon_document`, in call order.
    pub fn requested_formats(&self) -> Vec<FormatVersion> {
        self.requested_formats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn icon_requests(&self) -> usize {
        self.icon_requests.load(Ordering::SeqCst)
    }

    fn check_handle(&self, handle: &IconServiceHandle) -> Result<(), ServiceError> {
        if handle.device_id == self.device_id {
            Ok(())
        } else {
            Err(ServiceError::Unavailable(format!("no icon service for {}", handle.device_id)))
        }
    }
}

#[async_trait]
impl DeviceService for MockDevice {
    async fn connect(&self, device_id: &str) -> Result<DeviceSession, ConnectionError> {
        if device_id != self.device_id {
            return Err(ConnectionError::NotFound(device_id.to_string()));
        }
        Ok(DeviceSession {
            device_id: self.device_id.clone(),
            device_name: self.device_name.clone(),
        })
    }

    async fn os_version(&self, _session: &DeviceSession) -> Result<VersionTriple, ServiceError> {
        Ok(self.os_version)
    }

    async fn device_layout_config(&self, _session: &DeviceSession) -> Result<DeviceLayoutConfig, ServiceError> {
        Ok(self.config.clone())
    }

    async fn start_icon_service(&self, session: &DeviceSession) -> Result<IconServiceHandle, ServiceError> {
        if !self.icon_service_available {
            return Err(ServiceError::Unavailable("icon service refused to start".to_string()));
        }
        Ok(IconServiceHandle {
            device_id: session.device_id.clone(),
        })
    }

    async fn get_icon_document(&self, handle: &IconServiceHandle, format: FormatVersion) -> Result<Value, ServiceError> {
        self.check_handle(handle)?;
        self.requested_formats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format);
        Ok(self.current_document())
    }

    async fn set_icon_document(&self, handle: &IconServiceHandle, document: Value) -> Result<(), ServiceError> {
        self.check_handle(handle)?;
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(document.clone());
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = document;
        Ok(())
    }

    async fn get_icon_image(&self, handle: &IconServiceHandle, identity: &str) -> Result<Vec<u8>, ServiceError> {
        self.check_handle(handle)?;
        self.icon_requests.fetch_add(1, Ordering::SeqCst);
        self.icons
            .get(identity)
            .cloned()
            .ok_or_else(|| ServiceError::Transfer(format!("no icon image for {identity}")))
    }

    async fn get_wallpaper_image(&self, _handle: &IconServiceHandle) -> Option<Vec<u8>> {
        self.wallpaper.clone()
    }

    async fn battery_level(&self, _session: &DeviceSession) -> Result<u8, ServiceError> {
        Ok(self.battery_level)
    }
}
