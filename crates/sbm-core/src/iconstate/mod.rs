//! The on-device icon state document.
//!
//! SpringBoard stores the home screen as a property list: an array whose first
//! element is the dock and whose remaining elements are pages.  [`codec`]
//! converts that document to and from a [`crate::Layout`]; [`diff`] decides
//! whether a freshly encoded document is worth writing back.
//!
//! Both modules work on [`plist::Value`] trees and never touch the device.

pub mod codec;
pub mod diff;

pub use codec::{decode_document, encode_layout, DecodedDocument, DocumentError, EncodeParams};
pub use diff::document_changed;

/// Key holding an application's (or web clip's) identifier.
pub const KEY_DISPLAY_IDENTIFIER: &str = "displayIdentifier";
/// Key holding a folder's user-visible name.
pub const KEY_DISPLAY_NAME: &str = "displayName";
/// Key holding a folder's member lists.
pub const KEY_ICON_LISTS: &str = "iconLists";
