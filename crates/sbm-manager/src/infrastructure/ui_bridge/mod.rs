//! Command bridge: exposes session operations to the rendering front end.
//!
//! Every command takes the shared [`AppState`] and returns a
//! [`CommandResult`], so responses always have the shape
//! `{ success: bool, data: T | null, error: string | null }`.
//!
//! # Data Transfer Objects (for beginners)
//!
//! The session works with internal types (`Layout`, `IconId`,
//! `PointerEvent`) that are either not serialisable or not convenient for a
//! JavaScript consumer.  DTOs are small structs holding only JSON-friendly
//! fields (`String`, `f32`, `Vec`).  Conversions happen here and nowhere
//! else.
//!
//! Render commands are already plain data, so they cross the bridge as-is.
//!
//! # Why async Mutex?
//!
//! Commands run on the Tokio runtime and `save_layout` holds the session
//! across an `.await` on the device.  `tokio::sync::Mutex` suspends the
//! waiting task instead of blocking a runtime thread.

use std::sync::Arc;
use std::time::Duration;

use sbm_core::{Icon, IconId, Layout, Point, PointerEvent, RenderCommand};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::application::device::DeviceService;
use crate::application::session::{SaveOutcome, SessionController};
use crate::infrastructure::storage::cache::ImageCache;
use crate::infrastructure::storage::config::AppConfig;

// ── Shared application state ──────────────────────────────────────────────────

/// State shared by all command handlers.
pub struct AppState {
    /// The one device session.
    pub session: Mutex<SessionController>,
    /// The configuration the session was built from.
    pub config: Mutex<AppConfig>,
}

impl AppState {
    /// Builds the session controller for `device` from `config`.
    ///
    /// Icon caching is skipped (with a warning) when no cache directory can
    /// be determined.
    pub fn new(device: Arc<dyn DeviceService>, config: AppConfig) -> Arc<Self> {
        let mut controller = SessionController::new(device).with_stage(config.stage.dimensions());
        match ImageCache::from_config(&config.cache) {
            Ok(cache) => controller = controller.with_image_store(Arc::new(cache)),
            Err(e) => warn!(error = %e, "icon cache disabled"),
        }
        Arc::new(Self {
            session: Mutex::new(controller),
            config: Mutex::new(config),
        })
    }
}

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// One top-level icon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IconDto {
    pub id: String,
    /// Set for application icons.
    pub display_identifier: Option<String>,
    /// Set for folders.
    pub folder_name: Option<String>,
    /// Member identities, folders only.
    pub members: Vec<String>,
}

impl From<&Icon> for IconDto {
    fn from(icon: &Icon) -> Self {
        let folder = icon.as_folder();
        Self {
            id: icon.id.to_string(),
            display_identifier: icon.display_identifier().map(str::to_string),
            folder_name: folder.map(|f| f.display_name.clone()),
            members: folder
                .map(|f| f.members.iter().map(|m| m.display_identifier.clone()).collect())
                .unwrap_or_default(),
        }
    }
}

/// The whole home screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutDto {
    pub dock: Vec<IconDto>,
    pub pages: Vec<Vec<IconDto>>,
}

impl From<&Layout> for LayoutDto {
    fn from(layout: &Layout) -> Self {
        Self {
            dock: layout.dock().iter().map(IconDto::from).collect(),
            pages: layout
                .pages()
                .iter()
                .map(|page| page.iter().map(IconDto::from).collect())
                .collect(),
        }
    }
}

/// Pointer input from the front end, in stage coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEventDto {
    Press { icon: String, x: f32, y: f32 },
    Move { x: f32, y: f32, time_ms: u64 },
    Release,
}

impl TryFrom<PointerEventDto> for PointerEvent {
    type Error = String;

    fn try_from(dto: PointerEventDto) -> Result<Self, Self::Error> {
        Ok(match dto {
            PointerEventDto::Press { icon, x, y } => PointerEvent::Press {
                icon: parse_icon_id(&icon)?,
                at: Point::new(x, y),
            },
            PointerEventDto::Move { x, y, time_ms } => PointerEvent::Move {
                at: Point::new(x, y),
                time: Duration::from_millis(time_ms),
            },
            PointerEventDto::Release => PointerEvent::Release,
        })
    }
}

/// Icon images that arrived since the last poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IconUpdatesDto {
    pub loaded: usize,
    pub total: usize,
    pub images: Vec<IconImageDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IconImageDto {
    pub identity: String,
    pub png: Vec<u8>,
}

/// Status bar contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusDto {
    pub device_name: Option<String>,
    pub battery_level: u8,
    pub os_version: String,
}

/// Unified response wrapper used by every command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

fn parse_icon_id(raw: &str) -> Result<IconId, String> {
    raw.parse::<IconId>().map_err(|e| format!("invalid icon id {raw:?}: {e}"))
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Loads a device and returns the initial render commands.
///
/// # Example (frontend)
/// ```ts
/// const res = await invoke<RenderCommand[]>('load_device', { deviceId });
/// ```
pub async fn load_device(state: Arc<AppState>, device_id: String) -> CommandResult<Vec<RenderCommand>> {
    let mut session = state.session.lock().await;
    match session.load(&device_id).await {
        Ok(commands) => CommandResult::ok(commands),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Returns the current layout (empty without a device).
pub async fn get_layout(state: Arc<AppState>) -> CommandResult<LayoutDto> {
    let session = state.session.lock().await;
    CommandResult::ok(LayoutDto::from(session.layout()))
}

/// Writes the layout back to the device if anything changed.
///
/// `data` is `true` when a write happened.
pub async fn save_layout(state: Arc<AppState>) -> CommandResult<bool> {
    let mut session = state.session.lock().await;
    match session.save().await {
        Ok(outcome) => CommandResult::ok(outcome == SaveOutcome::Written),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Feeds one pointer event to the placement engine.
pub async fn pointer_event(state: Arc<AppState>, event: PointerEventDto) -> CommandResult<Vec<RenderCommand>> {
    let event = match PointerEvent::try_from(event) {
        Ok(event) => event,
        Err(e) => return CommandResult::err(e),
    };
    let mut session = state.session.lock().await;
    CommandResult::ok(session.handle_event(event))
}

pub async fn show_page(state: Arc<AppState>, page: usize) -> CommandResult<Vec<RenderCommand>> {
    let mut session = state.session.lock().await;
    CommandResult::ok(session.show_page(page))
}

pub async fn open_folder(state: Arc<AppState>, folder: String) -> CommandResult<Vec<RenderCommand>> {
    let folder = match parse_icon_id(&folder) {
        Ok(id) => id,
        Err(e) => return CommandResult::err(e),
    };
    let mut session = state.session.lock().await;
    CommandResult::ok(session.open_folder(folder))
}

/// Closes the open folder, applying the edited name if one is given.
pub async fn close_folder(state: Arc<AppState>, name: Option<String>) -> CommandResult<Vec<RenderCommand>> {
    let mut session = state.session.lock().await;
    CommandResult::ok(session.close_folder(name.as_deref()))
}

/// Signals that the folder open/close animation finished.
pub async fn transition_finished(state: Arc<AppState>) -> CommandResult<()> {
    let mut session = state.session.lock().await;
    session.transition_finished();
    CommandResult::ok(())
}

/// Returns icon images loaded since the last poll, plus progress.
pub async fn poll_icons(state: Arc<AppState>) -> CommandResult<IconUpdatesDto> {
    let mut session = state.session.lock().await;
    let images = session
        .drain_icon_updates()
        .into_iter()
        .map(|image| IconImageDto {
            identity: image.identity,
            png: image.png,
        })
        .collect();
    let (loaded, total) = session.icon_progress();
    CommandResult::ok(IconUpdatesDto { loaded, total, images })
}

/// How often the status bar should refresh.
///
/// The loaded device's own interval wins; otherwise the configured
/// `battery_poll_interval_secs` applies.
pub async fn battery_poll_interval(state: Arc<AppState>) -> Duration {
    let reported = state.session.lock().await.battery_poll_interval();
    match reported {
        Some(interval) => interval,
        None => {
            let config = state.config.lock().await;
            Duration::from_secs(config.device.battery_poll_interval_secs.max(1))
        }
    }
}

/// Battery level, OS version, and device name.
pub async fn device_status(state: Arc<AppState>) -> CommandResult<StatusDto> {
    let session = state.session.lock().await;
    match session.refresh_status().await {
        Ok(status) => CommandResult::ok(StatusDto {
            device_name: session.state().and_then(|s| s.device_name()).map(str::to_string),
            battery_level: status.battery_level,
            os_version: status.os_version.to_string(),
        }),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
