//! Background icon image loading.
//!
//! One task per icon fetches its PNG (from the image store if cached, from
//! the device otherwise) and posts the result to an unbounded channel.  The
//! coordinating context drains the channel whenever it polls; completion is
//! a counter, not a join, so results may arrive in any order.
//!
//! After [`IconLoader::shutdown`] every late result is dropped by the task
//! that produced it.  Nothing outlives the loader except those tasks, and
//! they only touch the channel and two atomics.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::device::{DeviceService, IconServiceHandle};

/// Persistent storage for fetched images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Cached PNG for an icon identity, if present.
    async fn load_icon(&self, identity: &str) -> Option<Vec<u8>>;

    /// Stores an icon PNG.
    async fn store_icon(&self, identity: &str, png: &[u8]) -> Result<(), String>;

    /// Stores a device's wallpaper PNG.
    async fn store_wallpaper(&self, device_id: &str, png: &[u8]) -> Result<(), String>;
}

/// A loaded icon image ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    pub identity: String,
    pub png: Vec<u8>,
}

/// Fan-out icon image loader for one session.
#[derive(Debug)]
pub struct IconLoader {
    total: usize,
    loaded: Arc<AtomicUsize>,
    deinitialized: Arc<AtomicBool>,
    receiver: mpsc::UnboundedReceiver<IconImage>,
    tasks: Vec<JoinHandle<()>>,
}

impl IconLoader {
    /// Spawns one fetch task per distinct identity.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        device: Arc<dyn DeviceService>,
        handle: IconServiceHandle,
        store: Option<Arc<dyn ImageStore>>,
        identities: impl IntoIterator<Item = String>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let loaded = Arc::new(AtomicUsize::new(0));
        let deinitialized = Arc::new(AtomicBool::new(false));

        let mut seen = HashSet::new();
        let tasks: Vec<JoinHandle<()>> = identities
            .into_iter()
            .filter(|identity| seen.insert(identity.clone()))
            .map(|identity| {
                let device = Arc::clone(&device);
                let handle = handle.clone();
                let store = store.clone();
                let sender = sender.clone();
                let loaded = Arc::clone(&loaded);
                let deinitialized = Arc::clone(&deinitialized);
                tokio::spawn(async move {
                    let result = fetch_icon(device.as_ref(), &handle, store.as_deref(), &identity).await;
                    loaded.fetch_add(1, Ordering::SeqCst);
                    if deinitialized.load(Ordering::SeqCst) {
                        debug!(identity = %identity, "discarding icon image loaded after teardown");
                        return;
                    }
                    match result {
                        Ok(png) => {
                            let _ = sender.send(IconImage { identity, png });
                        }
                        Err(e) => warn!(identity = %identity, error = %e, "icon image unavailable, skipping"),
                    }
                })
            })
            .collect();

        debug!(total = tasks.len(), "spawned icon loaders");
        Self {
            total: tasks.len(),
            loaded,
            deinitialized,
            receiver,
            tasks,
        }
    }

    /// Takes every image that finished since the last call.
    pub fn drain(&mut self) -> Vec<IconImage> {
        let mut images = Vec::new();
        if self.deinitialized.load(Ordering::SeqCst) {
            return images;
        }
        while let Ok(image) = self.receiver.try_recv() {
            images.push(image);
        }
        images
    }

    /// `(finished, total)`; failures count as finished.
    pub fn progress(&self) -> (usize, usize) {
        (self.loaded.load(Ordering::SeqCst).min(self.total), self.total)
    }

    pub fn is_complete(&self) -> bool {
        let (done, total) = self.progress();
        done == total
    }

    /// Marks the loader torn down.  Outstanding tasks keep running but
    /// discard their results.
    pub fn shutdown(&self) {
        self.deinitialized.store(true, Ordering::SeqCst);
        let outstanding = self.tasks.iter().filter(|t| !t.is_finished()).count();
        if outstanding > 0 {
            debug!(outstanding, "icon loader shut down with tasks in flight");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.deinitialized.load(Ordering::SeqCst)
    }
}

async fn fetch_icon(
    device: &dyn DeviceService,
    handle: &IconServiceHandle,
    store: Option<&dyn ImageStore>,
    identity: &str,
) -> Result<Vec<u8>, String> {
    if let Some(store) = store {
        if let Some(png) = store.load_icon(identity).await {
            return Ok(png);
        }
    }
    let png = device
        .get_icon_image(handle, identity)
        .await
        .map_err(|e| e.to_string())?;
    if let Some(store) = store {
        if let Err(e) = store.store_icon(identity, &png).await {
            warn!(identity, error = %e, "failed to cache icon image");
        }
    }
    Ok(png)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::device::{MockDeviceService, ServiceError};
    use std::sync::Mutex;
    use std::time::Duration;

    fn handle() -> IconServiceHandle {
        IconServiceHandle {
            device_id: "dev".to_string(),
        }
    }

    async fn wait_until_complete(loader: &IconLoader) {
        for _ in 0..200 {
            if loader.is_complete() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("icon loader did not finish: {:?}", loader.progress());
    }

    #[derive(Default)]
    struct MemoryStore {
        icons: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl ImageStore for MemoryStore {
        async fn load_icon(&self, identity: &str) -> Option<Vec<u8>> {
            self.icons
                .lock()
                .unwrap()
                .iter()
                .find(|(id, _)| id == identity)
                .map(|(_, png)| png.clone())
        }

        async fn store_icon(&self, identity: &str, png: &[u8]) -> Result<(), String> {
            self.icons.lock().unwrap().push((identity.to_string(), png.to_vec()));
            Ok(())
        }

        async fn store_wallpaper(&self, _device_id: &str, _png: &[u8]) -> Result<(), String> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_loader_fetches_each_identity_once() {
        // Arrange
        let mut device = MockDeviceService::new();
        device
            .expect_get_icon_image()
            .times(2)
            .returning(|_, identity| Ok(identity.as_bytes().to_vec()));
        let identities = vec!["a".to_string(), "b".to_string(), "a".to_string()];

        // Act
        let mut loader = IconLoader::spawn(Arc::new(device), handle(), None, identities);
        wait_until_complete(&loader).await;
        let mut images = loader.drain();
        images.sort_by(|x, y| x.identity.cmp(&y.identity));

        // Assert
        assert_eq!(loader.progress(), (2, 2));
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].png, b"a".to_vec());
    }

    #[tokio::test]
    async fn test_failed_icon_is_skipped_but_counted() {
        let mut device = MockDeviceService::new();
        device.expect_get_icon_image().returning(|_, identity| {
            if identity.starts_with("broken") {
                Err(ServiceError::Transfer("timeout".to_string()))
            } else {
                Ok(vec![1, 2, 3])
            }
        });

        let mut loader = IconLoader::spawn(
            Arc::new(device),
            handle(),
            None,
            vec!["ok".to_string(), "broken".to_string()],
        );
        wait_until_complete(&loader).await;

        let images = loader.drain();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].identity, "ok");
        assert!(loader.is_complete());
    }

    #[tokio::test]
    async fn test_cached_icon_skips_device_and_fresh_icon_is_cached() {
        // Arrange
        let store = Arc::new(MemoryStore::default());
        store.store_icon("cached", b"old").await.unwrap();
        let mut device = MockDeviceService::new();
        device
            .expect_get_icon_image()
            .withf(|_, identity| identity.starts_with("fresh"))
            .times(1)
            .returning(|_, _| Ok(b"new".to_vec()));

        // Act
        let loader = IconLoader::spawn(
            Arc::new(device),
            handle(),
            Some(store.clone() as Arc<dyn ImageStore>),
            vec!["cached".to_string(), "fresh".to_string()],
        );
        wait_until_complete(&loader).await;

        // Assert
        assert_eq!(store.load_icon("fresh").await, Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_results_after_shutdown_are_discarded() {
        let mut device = MockDeviceService::new();
        device.expect_get_icon_image().returning(|_, _| Ok(vec![0]));

        let mut loader = IconLoader::spawn(Arc::new(device), handle(), None, vec!["a".to_string()]);
        loader.shutdown();
        wait_until_complete(&loader).await;

        assert!(loader.is_shut_down());
        assert!(loader.drain().is_empty());
    }

    #[tokio::test]
    async fn test_empty_loader_is_complete_immediately() {
        let device = MockDeviceService::new();
        let loader = IconLoader::spawn(Arc::new(device), handle(), None, Vec::<String>::new());
        assert_eq!(loader.progress(), (0, 0));
        assert!(loader.is_complete());
    }
}
