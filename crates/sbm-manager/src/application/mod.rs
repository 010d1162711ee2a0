//! Application layer use cases for SBManager.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `sbm_core`) and the infrastructure (device backends, disk,
//! the UI bridge).
//!
//! Code in this layer:
//!
//! - **Orchestrates** domain objects to fulfil a user goal ("load the home
//!   screen of this device", "write my changes back").
//! - **Depends on abstractions** (the [`device::DeviceService`] and
//!   [`icon_loader::ImageStore`] traits), so backends can be swapped and
//!   mocked in tests.
//! - **Performs no file system access of its own**.
//!
//! # Sub-modules
//!
//! - **`device`**      – The Device Service port and its error taxonomy.
//! - **`icon_loader`** – Fetches icon images on worker tasks and hands them
//!   back to the coordinating context through a channel.
//! - **`session`**     – The Session Controller: owns the layout, the
//!   placement engine, and the last-known device document for one device.

pub mod device;
pub mod icon_loader;
pub mod session;
