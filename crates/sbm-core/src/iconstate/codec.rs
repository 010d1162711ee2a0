//! Icon state document codec.
//!
//! Document shape:
//! ```text
//! format 1:  [ [[dock…, 0, 0]],  [[row], [row], …],  … ]   rows padded with 0
//! format 2:  [ [dock…],          [icon, icon, …],    … ]   no padding
//!
//! icon   := { displayIdentifier }
//! folder := { displayName, iconLists: [[icon, …], …] }
//! ```
//!
//! Decoding stops at the first structural error.  The one tolerated defect is
//! an icon reference without a `displayIdentifier`, which is skipped and
//! counted in [`DecodedDocument::skipped`].

use plist::{Dictionary, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::config::{DeviceLayoutConfig, FormatVersion};
use crate::domain::icon::{AppIcon, Icon};
use crate::domain::layout::{Layout, LayoutError};
use crate::iconstate::{KEY_DISPLAY_IDENTIFIER, KEY_DISPLAY_NAME, KEY_ICON_LISTS};

/// Structural problems found while decoding a document.
#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    /// The outer array has no elements (not even a dock).
    #[error("icon state document is empty")]
    EmptyDocument,

    /// A node had the wrong type for its position.
    #[error("malformed document at {path}: expected {expected}")]
    UnexpectedNode { path: String, expected: &'static str },

    /// A folder reference without a `displayName` string.
    #[error("malformed document at {path}: folder has no display name")]
    FolderWithoutName { path: String },

    /// A folder listed as a member of another folder.
    #[error("malformed document at {path}: folders cannot contain folders")]
    NestedFolder { path: String },
}

/// The result of a successful decode.
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    pub dock: Vec<Icon>,
    /// `pages[i]` is document element `i + 1`.  Empty pages are kept here and
    /// dropped by [`DecodedDocument::into_layout`].
    pub pages: Vec<Vec<Icon>>,
    /// Number of dock slots in the document, empty markers included.
    ///
    /// Format 1 write-back pads the dock to this many slots.
    pub dock_slots: usize,
    /// Icon references skipped because they had no `displayIdentifier`.
    pub skipped: usize,
}

impl DecodedDocument {
    /// Builds a [`Layout`] with the capacities from `config`.
    ///
    /// A format 1 dock is fixed-width on the device, so its capacity is also
    /// capped at the slot count seen here.  A dock that grew past it would
    /// encode to a row the change detector cannot compare.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DuplicateIcon`] only if ids collide, which
    /// freshly decoded icons never do.
    pub fn into_layout(self, config: &DeviceLayoutConfig) -> Result<Layout, LayoutError> {
        let dock_capacity = match config.format_version {
            FormatVersion::V1 => config.dock_capacity.min(self.dock_slots).max(self.dock.len()),
            FormatVersion::V2 => config.dock_capacity,
        };
        Layout::from_parts(self.dock, self.pages, dock_capacity, config.page_capacity())
    }
}

/// Parameters for [`encode_layout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: FormatVersion,
    /// Row width for format 1 pages.
    pub columns: usize,
    /// Format 1 dock slot count (as seen at decode time).
    pub dock_slots: usize,
}

impl EncodeParams {
    pub fn new(config: &DeviceLayoutConfig, dock_slots: usize) -> Self {
        Self {
            format: config.format_version,
            columns: config.page_columns,
            dock_slots,
        }
    }
}

// ── Decode ────────────────────────────────────────────────────────────────────

/// Decodes a raw icon state document.
///
/// # Errors
///
/// Returns [`DocumentError`] on the first structural violation.
pub fn decode_document(document: &Value, format: FormatVersion) -> Result<DecodedDocument, DocumentError> {
    let top = as_array(document, "root", "array of pages")?;
    let (dock_node, page_nodes) = top.split_first().ok_or(DocumentError::EmptyDocument)?;

    let mut skipped = 0;
    let dock_slots_nodes = match format {
        FormatVersion::V1 => flatten_rows(dock_node, "dock")?,
        FormatVersion::V2 => as_array(dock_node, "dock", "array of icons")?.iter().collect(),
    };
    let dock_slots = dock_slots_nodes.len();
    let dock = decode_slots(&dock_slots_nodes, "dock", &mut skipped)?;

    let mut pages = Vec::with_capacity(page_nodes.len());
    for (i, node) in page_nodes.iter().enumerate() {
        let path = format!("page[{}]", i + 1);
        let slots = match format {
            FormatVersion::V1 => flatten_rows(node, &path)?,
            FormatVersion::V2 => as_array(node, &path, "array of icons")?.iter().collect(),
        };
        pages.push(decode_slots(&slots, &path, &mut skipped)?);
    }

    debug!(
        format = format.as_u8(),
        dock = dock.len(),
        dock_slots,
        pages = pages.len(),
        skipped,
        "decoded icon state document"
    );
    Ok(DecodedDocument {
        dock,
        pages,
        dock_slots,
        skipped,
    })
}

fn as_array<'a>(node: &'a Value, path: &str, expected: &'static str) -> Result<&'a Vec<Value>, DocumentError> {
    node.as_array().ok_or_else(|| DocumentError::UnexpectedNode {
        path: path.to_string(),
        expected,
    })
}

/// Format 1 container: an array of rows, each an array of slots.
fn flatten_rows<'a>(node: &'a Value, path: &str) -> Result<Vec<&'a Value>, DocumentError> {
    let mut slots = Vec::new();
    for (r, row) in as_array(node, path, "array of rows")?.iter().enumerate() {
        let row_path = format!("{path}/row[{r}]");
        slots.extend(as_array(row, &row_path, "array of slots")?);
    }
    Ok(slots)
}

fn decode_slots(slots: &[&Value], path: &str, skipped: &mut usize) -> Result<Vec<Icon>, DocumentError> {
    let mut icons = Vec::with_capacity(slots.len());
    for (i, slot) in slots.iter().enumerate() {
        let slot_path = format!("{path}/slot[{i}]");
        match slot {
            Value::Dictionary(dict) => {
                if let Some(icon) = decode_icon_ref(dict, &slot_path, skipped)? {
                    icons.push(icon);
                }
            }
            Value::Integer(_) | Value::Boolean(_) => {}
            _ => {
                return Err(DocumentError::UnexpectedNode {
                    path: slot_path,
                    expected: "icon reference or empty marker",
                })
            }
        }
    }
    Ok(icons)
}

fn decode_icon_ref(dict: &Dictionary, path: &str, skipped: &mut usize) -> Result<Option<Icon>, DocumentError> {
    if let Some(lists) = dict.get(KEY_ICON_LISTS) {
        let name = dict
            .get(KEY_DISPLAY_NAME)
            .and_then(Value::as_string)
            .ok_or_else(|| DocumentError::FolderWithoutName { path: path.to_string() })?;
        let members = decode_folder_members(lists, path, skipped)?;
        return Ok(Some(Icon::folder(name, members)));
    }
    match display_identifier(dict) {
        Some(identity) => Ok(Some(Icon::application(identity))),
        None => {
            warn!(path, "skipping icon reference without displayIdentifier");
            *skipped += 1;
            Ok(None)
        }
    }
}

/// `iconLists` holds one or more member lists; they are concatenated.
fn decode_folder_members(lists: &Value, path: &str, skipped: &mut usize) -> Result<Vec<AppIcon>, DocumentError> {
    let mut members = Vec::new();
    let lists_path = format!("{path}/{KEY_ICON_LISTS}");
    for (l, list) in as_array(lists, &lists_path, "array of member lists")?.iter().enumerate() {
        let list_path = format!("{lists_path}[{l}]");
        for (m, member) in as_array(list, &list_path, "array of icons")?.iter().enumerate() {
            let member_path = format!("{list_path}/member[{m}]");
            let dict = match member {
                Value::Dictionary(dict) => dict,
                Value::Integer(_) | Value::Boolean(_) => continue,
                _ => {
                    return Err(DocumentError::UnexpectedNode {
                        path: member_path,
                        expected: "icon reference",
                    })
                }
            };
            if dict.contains_key(KEY_ICON_LISTS) {
                return Err(DocumentError::NestedFolder { path: member_path });
            }
            match display_identifier(dict) {
                Some(identity) => members.push(AppIcon::new(identity)),
                None => {
                    warn!(path = %member_path, "skipping folder member without displayIdentifier");
                    *skipped += 1;
                }
            }
        }
    }
    Ok(members)
}

fn display_identifier(dict: &Dictionary) -> Option<&str> {
    dict.get(KEY_DISPLAY_IDENTIFIER).and_then(Value::as_string)
}

// ── Encode ────────────────────────────────────────────────────────────────────

/// Encodes a layout into a raw icon state document.
///
/// Empty pages are omitted.  Format 1 pads the dock with empty markers up to
/// `params.dock_slots` and every page row up to `params.columns`.
pub fn encode_layout(layout: &Layout, params: &EncodeParams) -> Value {
    let mut document = Vec::with_capacity(layout.page_count() + 1);
    let pages = layout.pages().iter().filter(|p| !p.is_empty());

    match params.format {
        FormatVersion::V1 => {
            let columns = params.columns.max(1);
            let mut dock: Vec<Value> = layout.dock().iter().map(encode_icon).collect();
            let slots = params.dock_slots.max(dock.len());
            dock.resize_with(slots, empty_marker);
            document.push(Value::Array(vec![Value::Array(dock)]));

            for page in pages {
                let rows = page
                    .chunks(columns)
                    .map(|row| {
                        let mut cells: Vec<Value> = row.iter().map(encode_icon).collect();
                        cells.resize_with(columns, empty_marker);
                        Value::Array(cells)
                    })
                    .collect();
                document.push(Value::Array(rows));
            }
        }
        FormatVersion::V2 => {
            document.push(Value::Array(layout.dock().iter().map(encode_icon).collect()));
            for page in pages {
                document.push(Value::Array(page.iter().map(encode_icon).collect()));
            }
        }
    }
    Value::Array(document)
}

fn empty_marker() -> Value {
    Value::Integer(0i64.into())
}

fn app_ref(identity: &str) -> Value {
    let mut dict = Dictionary::new();
    dict.insert(KEY_DISPLAY_IDENTIFIER.to_string(), Value::String(identity.to_string()));
    Value::Dictionary(dict)
}

fn encode_icon(icon: &Icon) -> Value {
    match icon.as_folder() {
        Some(folder) => {
            let members = folder
                .members
                .iter()
                .map(|m| app_ref(&m.display_identifier))
                .collect();
            let mut dict = Dictionary::new();
            dict.insert(KEY_DISPLAY_NAME.to_string(), Value::String(folder.display_name.clone()));
            dict.insert(
                KEY_ICON_LISTS.to_string(),
                Value::Array(vec![Value::Array(members)]),
            );
            Value::Dictionary(dict)
        }
        None => app_ref(icon.display_identifier().unwrap_or_default()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
