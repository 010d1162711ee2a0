//! SBManager entry point.
//!
//! Loads the configuration, starts structured logging, and runs the headless
//! session loop over the offline device backend.  A graphical front end
//! drives the same [`AppState`] through the `ui_bridge` commands.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()              -- TOML file or defaults
//!  └─ AppState::new()            -- session controller + image cache
//!  └─ loop
//!       ├─ hotplug scan          (attach loads, detach disconnects)
//!       ├─ icon poll             (drains finished icon images)
//!       └─ battery poll          (status bar refresh)
//!  └─ Ctrl-C: save_layout, disconnect
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sbm_manager::infrastructure::device::{hotplug_events, offline::OfflineDevice};
use sbm_manager::infrastructure::storage::config::{load_config, AppConfig};
use sbm_manager::infrastructure::ui_bridge::{self, AppState};

const HOTPLUG_SCAN_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, config_error) = match load_config() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Level from `RUST_LOG`, else the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    info!("SBManager starting");
    if let Some(e) = config_error {
        warn!(error = %e, "could not load config, using defaults");
    }

    let root = config
        .device
        .offline_root
        .clone()
        .context("no device backend configured: set [device] offline_root in config.toml")?;
    let device = Arc::new(OfflineDevice::new(root));
    let icon_poll = Duration::from_millis(config.device.icon_poll_interval_ms.max(1));
    let state = AppState::new(device.clone(), config);

    let mut hotplug_tick = interval(HOTPLUG_SCAN_INTERVAL);
    let mut icon_tick = interval(icon_poll);
    let mut battery_poll = ui_bridge::battery_poll_interval(Arc::clone(&state)).await;
    let mut battery_tick = interval(battery_poll);
    for tick in [&mut hotplug_tick, &mut icon_tick, &mut battery_tick] {
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    }

    info!(root = %device.root().display(), "SBManager ready.  Press Ctrl-C to exit.");

    let mut attached: Vec<String> = Vec::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
            _ = hotplug_tick.tick() => {
                let current = device.attached_devices().await;
                for event in hotplug_events(&attached, &current) {
                    let mut session = state.session.lock().await;
                    match session.handle_hotplug(event).await {
                        Ok(Some(commands)) => info!(commands = commands.len(), "device home screen rendered"),
                        Ok(None) => {}
                        Err(e) => error!(error = %e, "failed to load device"),
                    }
                }
                attached = current;

                // The loaded device may ask for its own status refresh period.
                let wanted = ui_bridge::battery_poll_interval(Arc::clone(&state)).await;
                if wanted != battery_poll {
                    info!(secs = wanted.as_secs(), "battery poll interval changed");
                    battery_poll = wanted;
                    battery_tick = interval(battery_poll);
                    battery_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
                }
            }
            _ = icon_tick.tick() => {
                let updates = ui_bridge::poll_icons(Arc::clone(&state)).await;
                if let Some(updates) = updates.data.filter(|u| !u.images.is_empty()) {
                    info!(loaded = updates.loaded, total = updates.total, "icon images loaded");
                }
            }
            _ = battery_tick.tick() => {
                let status = ui_bridge::device_status(Arc::clone(&state)).await;
                if let Some(status) = status.data {
                    info!(battery = status.battery_level, os = %status.os_version, "device status");
                }
            }
        }
    }

    let saved = ui_bridge::save_layout(Arc::clone(&state)).await;
    match (saved.data, saved.error) {
        (Some(true), _) => info!("layout written back to device"),
        (Some(false), _) => info!("layout unchanged"),
        (None, Some(e)) => warn!(error = %e, "layout not saved"),
        (None, None) => {}
    }
    state.session.lock().await.disconnect();

    info!("SBManager stopped");
    Ok(())
}
