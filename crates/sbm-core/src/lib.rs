//! # sbm-core
//!
//! Shared library for SBManager containing the icon-state document codec,
//! the home screen layout model, and the placement engine that re-flows icons
//! while the user drags them.
//!
//! This crate has zero dependencies on device transports, UI toolkits, or
//! async runtimes.  Everything here is plain data plus the rules that keep it
//! consistent, so it can be unit-tested in isolation.
//!
//! # Architecture overview (for beginners)
//!
//! An Apple mobile device stores its home screen arrangement ("SpringBoard
//! icon state") as a nested property-list document.  SBManager reads that
//! document, shows a replica of the home screen on the desktop, lets the user
//! rearrange icons, and writes the result back.
//!
//! This crate (`sbm-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Pure business logic.  The [`Layout`] holds the dock, the
//!   pages, and folder membership; the [`PlacementEngine`] turns a stream of
//!   pointer events into layout changes and a list of render commands.
//!
//! - **`iconstate`** – How the layout travels to and from the device.  The
//!   codec converts between the two on-device schema versions and the
//!   [`Layout`]; the change detector decides whether a write-back is needed.

pub mod domain;
pub mod iconstate;

pub use domain::config::{DeviceLayoutConfig, FormatVersion, VersionTriple};
pub use domain::geometry::{Point, StageGeometry};
pub use domain::icon::{AppIcon, Folder, Icon, IconId, IconKind};
pub use domain::layout::{Container, Layout, LayoutError, Slot};
pub use domain::placement::{
    DragPhase, FolderViewState, PlacementEngine, PointerEvent, RenderCommand, Transition,
};
pub use iconstate::codec::{decode_document, encode_layout, DecodedDocument, DocumentError, EncodeParams};
pub use iconstate::diff::document_changed;
