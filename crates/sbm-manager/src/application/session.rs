//! Session Controller: one device, one layout, one placement engine.
//!
//! The controller is the only place where device failures turn into
//! user-visible errors.  Everything it owns for the active device lives in a
//! single [`SessionState`]; no session means no state at all, and layout
//! queries answer with an empty layout.
//!
//! # Load sequence
//!
//! ```text
//! connect ─► os_version ─► (format) ─► device_layout_config ─► start_icon_service
//!        ─► get_icon_document ─► decode ─► Layout ─► spawn icon loads ─► wallpaper
//! ```
//!
//! Any failure aborts the load before the new state is installed, so a
//! half-loaded device is never shown.

use std::sync::Arc;
use std::time::Duration;

use plist::Value;
use sbm_core::{
    decode_document, document_changed, encode_layout, DeviceLayoutConfig, DocumentError,
    EncodeParams, FolderViewState, FormatVersion, IconId, Layout, LayoutError, PlacementEngine,
    PointerEvent, RenderCommand, StageGeometry, VersionTriple,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::device::{
    ConnectionError, DeviceService, DeviceSession, HotplugEvent, IconServiceHandle, ServiceError,
};
use crate::application::icon_loader::{IconImage, IconLoader, ImageStore};

/// Everything that can abort a session operation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The operation needs a loaded device.
    #[error("no device session is active")]
    NoSession,
}

/// Result of [`SessionController::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveOutcome {
    /// The document differed and was written to the device.
    Written,
    /// Nothing meaningful changed; the device was not touched.
    Unchanged,
}

/// Status bar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub battery_level: u8,
    pub os_version: VersionTriple,
}

/// Replica stage size, independent of the device.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDimensions {
    pub width: f32,
    pub height: f32,
    pub dock_height: f32,
    pub page_switch_dwell: Duration,
}

impl Default for StageDimensions {
    fn default() -> Self {
        use sbm_core::domain::geometry::{
            DEFAULT_DOCK_HEIGHT, DEFAULT_PAGE_SWITCH_DWELL, DEFAULT_STAGE_HEIGHT, DEFAULT_STAGE_WIDTH,
        };
        Self {
            width: DEFAULT_STAGE_WIDTH,
            height: DEFAULT_STAGE_HEIGHT,
            dock_height: DEFAULT_DOCK_HEIGHT,
            page_switch_dwell: DEFAULT_PAGE_SWITCH_DWELL,
        }
    }
}

impl StageDimensions {
    pub fn geometry(&self, device: &DeviceLayoutConfig) -> StageGeometry {
        StageGeometry::with_stage(device, self.width, self.height, self.dock_height)
            .with_page_switch_dwell(self.page_switch_dwell)
    }
}

/// All per-device state of an active session.
#[derive(Debug)]
pub struct SessionState {
    pub device_id: String,
    pub os_version: VersionTriple,
    pub config: DeviceLayoutConfig,
    pub layout: Layout,
    pub engine: PlacementEngine,
    pub wallpaper: Option<Vec<u8>>,
    session: DeviceSession,
    handle: IconServiceHandle,
    /// The document as the device last had it (fetched or written by us).
    last_document: Value,
    dock_slots: usize,
    icons: IconLoader,
}

impl SessionState {
    pub fn device_name(&self) -> Option<&str> {
        self.session.device_name.as_deref()
    }
}

/// Drives one device at a time through the [`DeviceService`].
pub struct SessionController {
    device: Arc<dyn DeviceService>,
    store: Option<Arc<dyn ImageStore>>,
    stage: StageDimensions,
    state: Option<SessionState>,
    empty: Layout,
}

impl SessionController {
    pub fn new(device: Arc<dyn DeviceService>) -> Self {
        Self {
            device,
            store: None,
            stage: StageDimensions::default(),
            state: None,
            empty: Layout::default(),
        }
    }

    /// Caches icon and wallpaper images in `store`.
    pub fn with_image_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_stage(mut self, stage: StageDimensions) -> Self {
        self.stage = stage;
        self
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.device_id.as_str())
    }

    /// The current layout; empty when no device is loaded.
    pub fn layout(&self) -> &Layout {
        self.state.as_ref().map_or(&self.empty, |s| &s.layout)
    }

    /// `(finished, total)` icon image loads for the active session.
    pub fn icon_progress(&self) -> (usize, usize) {
        self.state.as_ref().map_or((0, 0), |s| s.icons.progress())
    }

    /// Battery refresh period reported by the loaded device, if any.
    pub fn battery_poll_interval(&self) -> Option<Duration> {
        self.state.as_ref().and_then(|s| s.config.battery_poll_interval)
    }

    // ── Session lifecycle ─────────────────────────────────────────────────────

    /// Loads `device_id`, replacing any active session.
    ///
    /// Returns the render commands for the initial home screen.
    ///
    /// # Errors
    ///
    /// Connection, service, and document failures abort the load; the
    /// previous session (if any) has already been torn down by then.
    pub async fn load(&mut self, device_id: &str) -> Result<Vec<RenderCommand>, SessionError> {
        self.disconnect();
        info!(device_id, "loading device");

        let session = self.device.connect(device_id).await?;
        let os_version = self.device.os_version(&session).await?;
        let format = FormatVersion::for_os_version(os_version)
            .ok_or(ServiceError::UnsupportedOsVersion(os_version))?;
        let mut config = self.device.device_layout_config(&session).await?;
        config.format_version = format;

        let handle = self.device.start_icon_service(&session).await?;
        let document = self.device.get_icon_document(&handle, format).await?;
        let decoded = decode_document(&document, format)?;
        let dock_slots = decoded.dock_slots;
        let layout = decoded.into_layout(&config)?;
        info!(
            device_id,
            os = %os_version,
            format = format.as_u8(),
            dock = layout.dock().len(),
            pages = layout.page_count(),
            "device layout loaded"
        );

        let icons = IconLoader::spawn(
            Arc::clone(&self.device),
            handle.clone(),
            self.store.clone(),
            identities(&layout),
        );
        let wallpaper = self.fetch_wallpaper(&handle, device_id).await;

        let mut engine = PlacementEngine::new(self.stage.geometry(&config));
        let commands = engine.layout_all(&layout);

        self.state = Some(SessionState {
            device_id: device_id.to_string(),
            os_version,
            config,
            layout,
            engine,
            wallpaper,
            session,
            handle,
            last_document: document,
            dock_slots,
            icons,
        });
        Ok(commands)
    }

    async fn fetch_wallpaper(&self, handle: &IconServiceHandle, device_id: &str) -> Option<Vec<u8>> {
        let png = self.device.get_wallpaper_image(handle).await?;
        if let Some(store) = &self.store {
            if let Err(e) = store.store_wallpaper(device_id, &png).await {
                warn!(device_id, error = %e, "failed to cache wallpaper");
            }
        }
        Some(png)
    }

    /// Drops the active session.  Icon loads still in flight discard their
    /// results when they complete.
    pub fn disconnect(&mut self) {
        if let Some(state) = self.state.take() {
            state.icons.shutdown();
            info!(device_id = %state.device_id, "device session closed");
        }
    }

    /// Reacts to device attach/detach.
    ///
    /// An attach loads the device when nothing is loaded yet and returns its
    /// initial render commands; a detach of the active device tears the
    /// session down.
    ///
    /// # Errors
    ///
    /// Propagates load failures for attached devices.
    pub async fn handle_hotplug(&mut self, event: HotplugEvent) -> Result<Option<Vec<RenderCommand>>, SessionError> {
        match event {
            HotplugEvent::Attached(device_id) if !self.is_active() => {
                self.load(&device_id).await.map(Some)
            }
            HotplugEvent::Attached(device_id) => {
                debug!(device_id, "ignoring attach while another device is loaded");
                Ok(None)
            }
            HotplugEvent::Detached(device_id) => {
                if self.device_id() == Some(device_id.as_str()) {
                    info!(device_id, "active device detached");
                    self.disconnect();
                }
                Ok(None)
            }
        }
    }

    /// Writes the layout back if it differs from the last-known device
    /// document.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoSession`] without a device, or the device's write failure.
    pub async fn save(&mut self) -> Result<SaveOutcome, SessionError> {
        let state = self.state.as_mut().ok_or(SessionError::NoSession)?;
        let format = state.config.format_version;
        let proposed = encode_layout(&state.layout, &EncodeParams::new(&state.config, state.dock_slots));

        if !document_changed(&state.last_document, &proposed, format) {
            info!(device_id = %state.device_id, "layout unchanged, skipping write-back");
            return Ok(SaveOutcome::Unchanged);
        }

        self.device.set_icon_document(&state.handle, proposed.clone()).await?;
        info!(device_id = %state.device_id, "icon state written to device");
        state.last_document = proposed;
        Ok(SaveOutcome::Written)
    }

    /// Battery level and OS version for the status bar.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoSession`] without a device, or the battery query's failure.
    pub async fn refresh_status(&self) -> Result<DeviceStatus, SessionError> {
        let state = self.state.as_ref().ok_or(SessionError::NoSession)?;
        let battery_level = self.device.battery_level(&state.session).await?;
        Ok(DeviceStatus {
            battery_level,
            os_version: state.os_version,
        })
    }

    // ── Interaction ───────────────────────────────────────────────────────────

    /// Forwards a pointer event to the placement engine.  Without a session
    /// this is a no-op.
    pub fn handle_event(&mut self, event: PointerEvent) -> Vec<RenderCommand> {
        match &mut self.state {
            Some(state) => state.engine.handle(&mut state.layout, event),
            None => Vec::new(),
        }
    }

    pub fn show_page(&mut self, page: usize) -> Vec<RenderCommand> {
        match &mut self.state {
            Some(state) => state.engine.show_page(&state.layout, page),
            None => Vec::new(),
        }
    }

    pub fn open_folder(&mut self, folder: IconId) -> Vec<RenderCommand> {
        match &mut self.state {
            Some(state) => state.engine.open_folder(&state.layout, folder),
            None => Vec::new(),
        }
    }

    pub fn close_folder(&mut self, edited_name: Option<&str>) -> Vec<RenderCommand> {
        match &mut self.state {
            Some(state) => state.engine.close_folder(&mut state.layout, edited_name),
            None => Vec::new(),
        }
    }

    /// The rendering collaborator finished a folder transition.
    pub fn transition_finished(&mut self) {
        if let Some(state) = &mut self.state {
            state.engine.transition_finished();
        }
    }

    pub fn folder_view(&self) -> FolderViewState {
        self.state
            .as_ref()
            .map_or(FolderViewState::Closed, |s| s.engine.folder_view())
    }

    /// Icon images that finished loading since the last call.
    pub fn drain_icon_updates(&mut self) -> Vec<IconImage> {
        self.state.as_mut().map(|s| s.icons.drain()).unwrap_or_default()
    }
}

/// Every application identity in the layout, folder members included.
fn identities(layout: &Layout) -> Vec<String> {
    let mut out = Vec::new();
    for icon in layout.top_level() {
        match icon.as_folder() {
            Some(folder) => out.extend(folder.members.iter().map(|m| m.display_identifier.clone())),
            None => out.extend(icon.display_identifier().map(str::to_string)),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
