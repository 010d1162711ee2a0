//! Device backends implementing the [`DeviceService`] port.
//!
//! - [`offline::OfflineDevice`] serves devices from snapshot directories on
//!   disk, so a home screen can be rearranged without a cable.
//! - [`mock::MockDevice`] is a scripted in-memory device that records every
//!   write.  It is used by integration tests and by UI development.
//!
//! A USB transport would live next to these as a third implementation of the
//! same trait.
//!
//! [`DeviceService`]: crate::application::device::DeviceService

use crate::application::device::HotplugEvent;

pub mod mock;
pub mod offline;

/// Turns two successive attached-device listings into hotplug events.
///
/// Detaches are reported before attaches so a controller that only handles
/// one device at a time frees its session first.
pub fn hotplug_events(previous: &[String], current: &[String]) -> Vec<HotplugEvent> {
    let detached = previous
        .iter()
        .filter(|id| !current.contains(id))
        .map(|id| HotplugEvent::Detached(id.clone()));
    let attached = current
        .iter()
        .filter(|id| !previous.contains(id))
        .map(|id| HotplugEvent::Attached(id.clone()));
    detached.chain(attached).collect()
}
