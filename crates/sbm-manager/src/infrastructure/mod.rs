//! Infrastructure layer for SBManager.
//!
//! Contains the outward-facing adapters: device backends, the configuration
//! file and image cache, and the command bridge used by the front end.
//!
//! **Dependency rule**: this layer may depend on `application` and `sbm_core`,
//! but MUST NOT be imported by the `application` or domain layers.

pub mod device;
pub mod storage;
pub mod ui_bridge;
