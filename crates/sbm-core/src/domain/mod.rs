//! Domain entities for SBManager.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain** (or "entities" layer).  Domain code:
//!
//! - Contains the core business rules of the application.
//! - Has **no** imports from device transports, file systems, or UI toolkits.
//! - Can be compiled and tested on any platform without any external setup.
//!
//! Here the rules are those of the device home screen: how many icons fit on
//! a page or in the dock, what happens when a full page receives one more
//! icon, and how folders hold their members.

/// Device-reported layout parameters and document format selection.
pub mod config;

/// Stage coordinates: where each slot sits on the replica screen.
pub mod geometry;

/// Icons: applications and folders.
pub mod icon;

/// The dock/pages/folders container model.
///
/// See [`layout::Layout`] for the main type.
pub mod layout;

/// Drag resolution, page overflow, and folder view choreography.
pub mod placement;
