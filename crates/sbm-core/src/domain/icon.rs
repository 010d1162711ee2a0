//! Home screen icons.
//!
//! An [`Icon`] is either an application reference or a folder.  Folders hold
//! [`AppIcon`]s only, so "a folder inside a folder" cannot be expressed.

use serde::Serialize;
use uuid::Uuid;

/// Unique identifier of one icon instance, derived from UUID v4.
///
/// Two icons may reference the same application (the document does not forbid
/// it), so the instance id, not the display identifier, is what the layout
/// tracks.
pub type IconId = Uuid;

/// An application icon.  This is the only kind of icon a folder can hold.
#[derive(Debug, Clone, Serialize)]
pub struct AppIcon {
    /// Instance identifier.
    pub id: IconId,
    /// The `displayIdentifier` used to resolve the backing application or bookmark.
    pub display_identifier: String,
    /// Cleared while a drag is in flight to suppress re-entrant presses.
    pub enabled: bool,
}

impl AppIcon {
    /// Creates a new enabled application icon with a fresh id.
    pub fn new(display_identifier: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_identifier: display_identifier.into(),
            enabled: true,
        }
    }
}

/// The contents of a folder icon.
#[derive(Debug, Clone, Serialize)]
pub struct Folder {
    /// User-editable folder name.
    pub display_name: String,
    /// Ordered folder contents.
    pub members: Vec<AppIcon>,
}

/// What an [`Icon`] represents.
#[derive(Debug, Clone, Serialize)]
pub enum IconKind {
    Application { display_identifier: String },
    Folder(Folder),
}

/// One home screen entry.
#[derive(Debug, Clone, Serialize)]
pub struct Icon {
    pub id: IconId,
    pub kind: IconKind,
    /// Transient interaction flag; never persisted.
    pub enabled: bool,
}

impl Icon {
    /// Creates an application icon with a fresh id.
    pub fn application(display_identifier: impl Into<String>) -> Self {
        AppIcon::new(display_identifier).into()
    }

    /// Creates a folder icon with a fresh id.
    pub fn folder(display_name: impl Into<String>, members: Vec<AppIcon>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: IconKind::Folder(Folder {
                display_name: display_name.into(),
                members,
            }),
            enabled: true,
        }
    }

    /// Returns the `displayIdentifier` of an application icon, `None` for folders.
    pub fn display_identifier(&self) -> Option<&str> {
        match &self.kind {
            IconKind::Application { display_identifier } => Some(display_identifier),
            IconKind::Folder(_) => None,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, IconKind::Folder(_))
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match &self.kind {
            IconKind::Folder(folder) => Some(folder),
            IconKind::Application { .. } => None,
        }
    }

    pub fn as_folder_mut(&mut self) -> Option<&mut Folder> {
        match &mut self.kind {
            IconKind::Folder(folder) => Some(folder),
            IconKind::Application { .. } => None,
        }
    }

    /// Converts into an [`AppIcon`] so it can join a folder.
    ///
    /// Folders are handed back unchanged in the `Err` variant.
    pub fn into_app(self) -> Result<AppIcon, Icon> {
        match self.kind {
            IconKind::Application { display_identifier } => Ok(AppIcon {
                id: self.id,
                display_identifier,
                enabled: self.enabled,
            }),
            IconKind::Folder(_) => Err(self),
        }
    }

    /// Compares what the icon shows, ignoring instance ids and interaction state.
    ///
    /// Two decodes of the same document produce icons with different ids, so
    /// round-trip checks use this instead of field-wise equality.
    pub fn same_content(&self, other: &Icon) -> bool {
        match (&self.kind, &other.kind) {
            (
                IconKind::Application { display_identifier: a },
                IconKind::Application { display_identifier: b },
            ) => a == b,
            (IconKind::Folder(a), IconKind::Folder(b)) => {
                a.display_name == b.display_name
                    && a.members.len() == b.members.len()
                    && a
                        .members
                        .iter()
                        .zip(&b.members)
                        .all(|(x, y)| x.display_identifier == y.display_identifier)
            }
            _ => false,
        }
    }
}

impl From<AppIcon> for Icon {
    fn from(app: AppIcon) -> Self {
        Self {
            id: app.id,
            kind: IconKind::Application {
                display_identifier: app.display_identifier,
            },
            enabled: app.enabled,
        }
    }
}
