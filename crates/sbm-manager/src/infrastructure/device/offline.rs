//! Directory-backed device backend.
//!
//! Each subdirectory of the offline root is one device snapshot:
//!
//! ```text
//! <root>/<device id>/device.plist       ProductVersion, DeviceName, BatteryCurrentCapacity,
//!                                       SpringBoard (HomeScreenIcon* metrics, BatteryPollInterval)
//! <root>/<device id>/IconState.plist    the icon state document
//! <root>/<device id>/icons/<id>.png     icon images, identity encoded like the cache
//! <root>/<device id>/wallpaper.png      optional
//! ```
//!
//! Writes replace `IconState.plist` as an XML plist.  The document is stored
//! in whatever format the snapshot came in; the requested format is not
//! converted.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use plist::{Dictionary, Value};
use sbm_core::{DeviceLayoutConfig, FormatVersion, VersionTriple};
use tracing::{debug, info};

use crate::application::device::{
    ConnectionError, DeviceService, DeviceSession, IconServiceHandle, ServiceError,
};
use crate::infrastructure::storage::cache::file_stem;

const DEVICE_INFO_FILE: &str = "device.plist";
const ICON_STATE_FILE: &str = "IconState.plist";
const WALLPAPER_FILE: &str = "wallpaper.png";
const ICONS_DIR: &str = "icons";

const KEY_PRODUCT_VERSION: &str = "ProductVersion";
const KEY_DEVICE_NAME: &str = "DeviceName";
const KEY_BATTERY: &str = "BatteryCurrentCapacity";
const KEY_SPRINGBOARD: &str = "SpringBoard";

/// Serves device snapshots from a directory tree.
#[derive(Debug, Clone)]
pub struct OfflineDevice {
    root: PathBuf,
}

impl OfflineDevice {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ids of every snapshot directory containing a `device.plist`, sorted.
    pub async fn attached_devices(&self) -> Vec<String> {
        let mut ids = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.root).await else {
            return ids;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if tokio::fs::metadata(entry.path().join(DEVICE_INFO_FILE)).await.is_ok() {
                if let Some(name) = entry.file_name().to_str() {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        ids
    }

    fn device_dir(&self, device_id: &str) -> PathBuf {
        self.root.join(device_id)
    }

    fn icon_path(&self, device_id: &str, identity: &str) -> PathBuf {
        self.device_dir(device_id)
            .join(ICONS_DIR)
            .join(format!("{}.png", file_stem(identity)))
    }

    async fn device_info(&self, device_id: &str) -> Result<Dictionary, ServiceError> {
        let value = read_plist(&self.device_dir(device_id).join(DEVICE_INFO_FILE)).await?;
        value
            .into_dictionary()
            .ok_or_else(|| ServiceError::Transfer(format!("{DEVICE_INFO_FILE} is not a dictionary")))
    }
}

async fn read_plist(path: &Path) -> Result<Value, ServiceError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ServiceError::Transfer(format!("{}: {e}", path.display())))?;
    plist::from_bytes(&bytes).map_err(|e| ServiceError::Transfer(format!("{}: {e}", path.display())))
}

#[async_trait]
impl DeviceService for OfflineDevice {
    async fn connect(&self, device_id: &str) -> Result<DeviceSession, ConnectionError> {
        let info_path = self.device_dir(device_id).join(DEVICE_INFO_FILE);
        if tokio::fs::metadata(&info_path).await.is_err() {
            return Err(ConnectionError::NotFound(device_id.to_string()));
        }
        let info = self
            .device_info(device_id)
            .await
            .map_err(|e| ConnectionError::HandshakeFailed {
                device_id: device_id.to_string(),
                reason: e.to_string(),
            })?;
        let device_name = info
            .get(KEY_DEVICE_NAME)
            .and_then(Value::as_string)
            .map(str::to_string);
        info!(device_id, name = ?device_name, "opened offline device snapshot");
        Ok(DeviceSession {
            device_id: device_id.to_string(),
            device_name,
        })
    }

    async fn os_version(&self, session: &DeviceSession) -> Result<VersionTriple, ServiceError> {
        let info = self.device_info(&session.device_id).await?;
        let raw = info
            .get(KEY_PRODUCT_VERSION)
            .and_then(Value::as_string)
            .ok_or_else(|| ServiceError::Transfer(format!("{KEY_PRODUCT_VERSION} missing")))?;
        VersionTriple::from_str(raw).map_err(|e| ServiceError::Transfer(e.to_string()))
    }

    async fn device_layout_config(&self, session: &DeviceSession) -> Result<DeviceLayoutConfig, ServiceError> {
        let info = self.device_info(&session.device_id).await?;
        let springboard = info
            .get(KEY_SPRINGBOARD)
            .and_then(Value::as_dictionary)
            .cloned()
            .unwrap_or_default();
        Ok(DeviceLayoutConfig::from_springboard_domain(&springboard, FormatVersion::V2))
    }

    async fn start_icon_service(&self, session: &DeviceSession) -> Result<IconServiceHandle, ServiceError> {
        let path = self.device_dir(&session.device_id).join(ICON_STATE_FILE);
        if tokio::fs::metadata(&path).await.is_err() {
            return Err(ServiceError::Unavailable(format!("{} not found", path.display())));
        }
        Ok(IconServiceHandle {
            device_id: session.device_id.clone(),
        })
    }

    async fn get_icon_document(&self, handle: &IconServiceHandle, format: FormatVersion) -> Result<Value, ServiceError> {
        debug!(device_id = %handle.device_id, format = format.as_u8(), "reading icon state snapshot");
        read_plist(&self.device_dir(&handle.device_id).join(ICON_STATE_FILE)).await
    }

    async fn set_icon_document(&self, handle: &IconServiceHandle, document: Value) -> Result<(), ServiceError> {
        let path = self.device_dir(&handle.device_id).join(ICON_STATE_FILE);
        let mut buf = Vec::new();
        document
            .to_writer_xml(&mut buf)
            .map_err(|e| ServiceError::Transfer(e.to_string()))?;
        tokio::fs::write(&path, buf)
            .await
            .map_err(|e| ServiceError::Transfer(format!("{}: {e}", path.display())))?;
        info!(device_id = %handle.device_id, "icon state snapshot updated");
        Ok(())
    }

    async fn get_icon_image(&self, handle: &IconServiceHandle, identity: &str) -> Result<Vec<u8>, ServiceError> {
        let path = self.icon_path(&handle.device_id, identity);
        tokio::fs::read(&path)
            .await
            .map_err(|e| ServiceError::Transfer(format!("{}: {e}", path.display())))
    }

    async fn get_wallpaper_image(&self, handle: &IconServiceHandle) -> Option<Vec<u8>> {
        tokio::fs::read(self.device_dir(&handle.device_id).join(WALLPAPER_FILE))
            .await
            .ok()
    }

    async fn battery_level(&self, session: &DeviceSession) -> Result<u8, ServiceError> {
        let info = self.device_info(&session.device_id).await?;
        info.get(KEY_BATTERY)
            .and_then(Value::as_unsigned_integer)
            .map(|level| level.min(100) as u8)
            .ok_or_else(|| ServiceError::Transfer(format!("{KEY_BATTERY} missing")))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str) -> Value {
        let mut dict = Dictionary::new();
        dict.insert("displayIdentifier".to_string(), Value::String(id.to_string()));
        Value::Dictionary(dict)
    }

    /// Writes a snapshot for `device_id` under a fresh temp root.
    fn snapshot(device_id: &str) -> OfflineDevice {
        let root = std::env::temp_dir().join(format!("sbm-offline-test-{}", uuid::Uuid::new_v4()));
        let dir = root.join(device_id);
        std::fs::create_dir_all(dir.join(ICONS_DIR)).unwrap();

        let mut springboard = Dictionary::new();
        springboard.insert("HomeScreenIconRows".to_string(), Value::Integer(5u64.into()));
        springboard.insert("BatteryPollInterval".to_string(), Value::Integer(30u64.into()));
        let mut info = Dictionary::new();
        info.insert(KEY_PRODUCT_VERSION.to_string(), Value::String("4.3.3".to_string()));
        info.insert(KEY_DEVICE_NAME.to_string(), Value::String("Desk Phone".to_string()));
        info.insert(KEY_BATTERY.to_string(), Value::Integer(64u64.into()));
        info.insert(KEY_SPRINGBOARD.to_string(), Value::Dictionary(springboard));
        Value::Dictionary(info).to_file_xml(dir.join(DEVICE_INFO_FILE)).unwrap();

        let doc = Value::Array(vec![
            Value::Array(vec![app("com.apple.mobilephone")]),
            Value::Array(vec![app("com.example.a")]),
        ]);
        doc.to_file_xml(dir.join(ICON_STATE_FILE)).unwrap();
        std::fs::write(dir.join(ICONS_DIR).join("com.example.a.png"), [9, 9]).unwrap();

        OfflineDevice::new(root)
    }

    #[tokio::test]
    async fn test_attached_devices_lists_snapshot_dirs() {
        let device = snapshot("phone-a");
        assert_eq!(device.attached_devices().await, vec!["phone-a".to_string()]);
        let _ = std::fs::remove_dir_all(device.root());
    }

    #[tokio::test]
    async fn test_connect_reads_name_version_and_metrics() {
        // Arrange
        let device = snapshot("phone-a");

        // Act
        let session = device.connect("phone-a").await.expect("connect");
        let version = device.os_version(&session).await.expect("version");
        let config = device.device_layout_config(&session).await.expect("config");
        let battery = device.battery_level(&session).await.expect("battery");

        // Assert
        assert_eq!(session.device_name.as_deref(), Some("Desk Phone"));
        assert_eq!(version, VersionTriple::new(4, 3, 3));
        assert_eq!(config.page_rows, 5);
        assert_eq!(config.page_columns, 4);
        assert_eq!(config.battery_poll_interval, Some(std::time::Duration::from_secs(30)));
        assert_eq!(battery, 64);
        let _ = std::fs::remove_dir_all(device.root());
    }

    #[tokio::test]
    async fn test_unknown_device_is_not_found() {
        let device = snapshot("phone-a");
        assert!(matches!(
            device.connect("phone-b").await,
            Err(ConnectionError::NotFound(_))
        ));
        let _ = std::fs::remove_dir_all(device.root());
    }

    #[tokio::test]
    async fn test_written_document_is_read_back() {
        // Arrange
        let device = snapshot("phone-a");
        let session = device.connect("phone-a").await.expect("connect");
        let handle = device.start_icon_service(&session).await.expect("service");
        let replacement = Value::Array(vec![Value::Array(vec![app("com.example.z")])]);

        // Act
        device
            .set_icon_document(&handle, replacement.clone())
            .await
            .expect("write");
        let read = device
            .get_icon_document(&handle, FormatVersion::V2)
            .await
            .expect("read");

        // Assert
        assert_eq!(read, replacement);
        let _ = std::fs::remove_dir_all(device.root());
    }

    #[tokio::test]
    async fn test_icon_images_and_missing_wallpaper() {
        let device = snapshot("phone-a");
        let handle = IconServiceHandle {
            device_id: "phone-a".to_string(),
        };

        assert_eq!(device.get_icon_image(&handle, "com.example.a").await, Ok(vec![9, 9]));
        assert!(device.get_icon_image(&handle, "com.example.b").await.is_err());
        assert_eq!(device.get_wallpaper_image(&handle).await, None);
        let _ = std::fs::remove_dir_all(device.root());
    }

    #[tokio::test]
    async fn test_web_clip_icon_is_read_from_encoded_file_name() {
        // Arrange
        let device = snapshot("phone-a");
        let handle = IconServiceHandle {
            device_id: "phone-a".to_string(),
        };
        let icons = device.root().join("phone-a").join(ICONS_DIR);
        std::fs::write(icons.join("http%3A%2F%2Fexample.com%2Fclip.png"), [7]).unwrap();
        std::fs::write(icons.join("http___example.com_clip.png"), [1]).unwrap();

        // Act
        let image = device.get_icon_image(&handle, "http://example.com/clip").await;

        // Assert
        assert_eq!(image, Ok(vec![7]));
        let _ = std::fs::remove_dir_all(device.root());
    }
}
