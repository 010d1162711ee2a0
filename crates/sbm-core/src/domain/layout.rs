//! Home screen layout domain entity.
//!
//! The [`Layout`] is the in-memory aggregate of the dock, the pages, and the
//! folder contents.  It is a pure container: it knows capacities and order
//! but makes no placement decisions.  Those live in
//! [`crate::domain::placement`].
//!
//! Invariants enforced here:
//!
//! - An icon instance appears in at most one container.
//! - Folders hold application icons only.
//! - Pages built with [`Layout::from_parts`] are never empty; pages that
//!   become empty during a drag are removed with [`Layout::prune_empty_pages`].

use serde::Serialize;
use thiserror::Error;

use crate::domain::icon::{AppIcon, Folder, Icon, IconId};

/// Where an icon can live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Container {
    Dock,
    Page(usize),
    /// The members of the folder icon with this id.
    Folder(IconId),
}

/// An addressable position: a container plus an index inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Slot {
    pub container: Container,
    pub index: usize,
}

impl Slot {
    pub const fn new(container: Container, index: usize) -> Self {
        Self { container, index }
    }
}

/// Contract violations raised by the layout.
///
/// These indicate a caller bug rather than a runtime condition worth retrying.
#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    /// The icon (or one of its folder members) is already placed somewhere.
    #[error("icon {0} is already a member of the layout")]
    DuplicateIcon(IconId),

    /// A folder was offered as a folder member.
    #[error("folder {0} cannot be placed inside another folder")]
    NestedFolder(IconId),

    /// The container does not exist (page index past the end, unknown folder).
    #[error("container does not exist: {0:?}")]
    UnknownContainer(Container),

    /// The index is past the end of the container.
    #[error("index {index} out of range for {container:?} with {len} members")]
    IndexOutOfRange {
        container: Container,
        index: usize,
        len: usize,
    },

    /// No container holds an icon with this id.
    #[error("icon not found: {0}")]
    IconNotFound(IconId),
}

/// The dock, the pages, and (through folder icons) the folder contents.
#[derive(Debug, Clone)]
pub struct Layout {
    dock: Vec<Icon>,
    pages: Vec<Vec<Icon>>,
    dock_capacity: usize,
    page_capacity: usize,
}

impl Default for Layout {
    /// An empty layout with the default 4-icon dock and 4×4 pages.
    fn default() -> Self {
        Self::new(4, 16)
    }
}

impl Layout {
    /// Creates an empty layout with the given capacities.
    pub fn new(dock_capacity: usize, page_capacity: usize) -> Self {
        Self {
            dock: Vec::new(),
            pages: Vec::new(),
            dock_capacity,
            page_capacity,
        }
    }

    /// Builds a layout from decoded parts, dropping empty pages.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DuplicateIcon`] if any icon id occurs twice.
    pub fn from_parts(
        dock: Vec<Icon>,
        pages: Vec<Vec<Icon>>,
        dock_capacity: usize,
        page_capacity: usize,
    ) -> Result<Self, LayoutError> {
        let mut layout = Self::new(dock_capacity, page_capacity);
        for icon in dock {
            let index = layout.dock.len();
            layout.insert(Slot::new(Container::Dock, index), icon)?;
        }
        for page in pages.into_iter().filter(|p| !p.is_empty()) {
            let page_index = layout.push_page();
            for icon in page {
                let index = layout.pages[page_index].len();
                layout.insert(Slot::new(Container::Page(page_index), index), icon)?;
            }
        }
        Ok(layout)
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn dock(&self) -> &[Icon] {
        &self.dock
    }

    pub fn pages(&self) -> &[Vec<Icon>] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&[Icon]> {
        self.pages.get(index).map(Vec::as_slice)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn dock_capacity(&self) -> usize {
        self.dock_capacity
    }

    pub fn page_capacity(&self) -> usize {
        self.page_capacity
    }

    /// Returns `true` if the layout holds no icons at all.
    pub fn is_empty(&self) -> bool {
        self.dock.is_empty() && self.pages.iter().all(Vec::is_empty)
    }

    /// Capacity of a container; `None` means unbounded (folders).
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownContainer`] if the container does not exist.
    pub fn capacity_of(&self, container: Container) -> Result<Option<usize>, LayoutError> {
        match container {
            Container::Dock => Ok(Some(self.dock_capacity)),
            Container::Page(n) if n < self.pages.len() => Ok(Some(self.page_capacity)),
            Container::Folder(id) if self.folder(id).is_some() => Ok(None),
            other => Err(LayoutError::UnknownContainer(other)),
        }
    }

    /// Number of members in a container.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownContainer`] if the container does not exist.
    pub fn len_of(&self, container: Container) -> Result<usize, LayoutError> {
        match container {
            Container::Dock => Ok(self.dock.len()),
            Container::Page(n) => self
                .pages
                .get(n)
                .map(Vec::len)
                .ok_or(LayoutError::UnknownContainer(container)),
            Container::Folder(id) => self
                .folder(id)
                .map(|f| f.members.len())
                .ok_or(LayoutError::UnknownContainer(container)),
        }
    }

    /// Ordered member ids of a container.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownContainer`] if the container does not exist.
    pub fn member_ids(&self, container: Container) -> Result<Vec<IconId>, LayoutError> {
        match container {
            Container::Dock => Ok(self.dock.iter().map(|i| i.id).collect()),
            Container::Page(n) => self
                .pages
                .get(n)
                .map(|p| p.iter().map(|i| i.id).collect())
                .ok_or(LayoutError::UnknownContainer(container)),
            Container::Folder(id) => self
                .folder(id)
                .map(|f| f.members.iter().map(|m| m.id).collect())
                .ok_or(LayoutError::UnknownContainer(container)),
        }
    }

    /// Locates an icon, including icons inside folders.
    pub fn index_of(&self, id: IconId) -> Option<Slot> {
        if let Some(index) = self.dock.iter().position(|i| i.id == id) {
            return Some(Slot::new(Container::Dock, index));
        }
        for (page_index, page) in self.pages.iter().enumerate() {
            if let Some(index) = page.iter().position(|i| i.id == id) {
                return Some(Slot::new(Container::Page(page_index), index));
            }
        }
        self.top_level()
            .filter_map(|icon| icon.as_folder().map(|f| (icon.id, f)))
            .find_map(|(folder_id, folder)| {
                folder
                    .members
                    .iter()
                    .position(|m| m.id == id)
                    .map(|index| Slot::new(Container::Folder(folder_id), index))
            })
    }

    pub fn contains(&self, id: IconId) -> bool {
        self.index_of(id).is_some()
    }

    /// Dock and page icons (not folder members), dock first.
    pub fn top_level(&self) -> impl Iterator<Item = &Icon> {
        self.dock.iter().chain(self.pages.iter().flatten())
    }

    /// A dock or page icon by id.
    pub fn icon(&self, id: IconId) -> Option<&Icon> {
        self.top_level().find(|i| i.id == id)
    }

    pub fn icon_mut(&mut self, id: IconId) -> Option<&mut Icon> {
        self.dock
            .iter_mut()
            .chain(self.pages.iter_mut().flatten())
            .find(|i| i.id == id)
    }

    /// A folder member by id.
    pub fn folder_member(&self, id: IconId) -> Option<&AppIcon> {
        self.top_level()
            .filter_map(Icon::as_folder)
            .flat_map(|f| f.members.iter())
            .find(|m| m.id == id)
    }

    pub fn folder(&self, id: IconId) -> Option<&Folder> {
        self.icon(id).and_then(Icon::as_folder)
    }

    pub fn folder_mut(&mut self, id: IconId) -> Option<&mut Folder> {
        self.icon_mut(id).and_then(Icon::as_folder_mut)
    }

    /// The interaction flag of any icon, folder members included.
    pub fn is_enabled(&self, id: IconId) -> Option<bool> {
        self.icon(id)
            .map(|i| i.enabled)
            .or_else(|| self.folder_member(id).map(|m| m.enabled))
    }

    /// Sets the interaction flag; returns `false` if the icon is unknown.
    pub fn set_enabled(&mut self, id: IconId, enabled: bool) -> bool {
        if let Some(icon) = self.icon_mut(id) {
            icon.enabled = enabled;
            return true;
        }
        let member = self
            .dock
            .iter_mut()
            .chain(self.pages.iter_mut().flatten())
            .filter_map(Icon::as_folder_mut)
            .flat_map(|f| f.members.iter_mut())
            .find(|m| m.id == id);
        match member {
            Some(m) => {
                m.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Compares dock, pages, and folder contents by what they show.
    ///
    /// Instance ids and interaction flags are ignored.
    pub fn same_arrangement(&self, other: &Layout) -> bool {
        fn same(a: &[Icon], b: &[Icon]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_content(y))
        }
        same(&self.dock, &other.dock)
            && self.pages.len() == other.pages.len()
            && self.pages.iter().zip(&other.pages).all(|(a, b)| same(a, b))
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    /// Appends an empty page and returns its index.
    ///
    /// The page must receive an icon (or be pruned) before the layout is next
    /// read wholesale.
    pub fn push_page(&mut self) -> usize {
        self.pages.push(Vec::new());
        self.pages.len() - 1
    }

    /// Inserts `icon` at `slot`.
    ///
    /// Capacity is not checked here; the decoder must accept whatever the
    /// device sends, and the placement engine enforces capacities itself.
    ///
    /// # Errors
    ///
    /// - [`LayoutError::DuplicateIcon`] if the icon (or a member) is already placed.
    /// - [`LayoutError::NestedFolder`] if a folder is inserted into a folder.
    /// - [`LayoutError::UnknownContainer`] / [`LayoutError::IndexOutOfRange`] for bad slots.
    pub fn insert(&mut self, slot: Slot, icon: Icon) -> Result<(), LayoutError> {
        if self.contains(icon.id) {
            return Err(LayoutError::DuplicateIcon(icon.id));
        }
        if let Some(folder) = icon.as_folder() {
            if let Some(m) = folder.members.iter().find(|m| self.contains(m.id)) {
                return Err(LayoutError::DuplicateIcon(m.id));
            }
        }

        let len = self.len_of(slot.container)?;
        if slot.index > len {
            return Err(LayoutError::IndexOutOfRange {
                container: slot.container,
                index: slot.index,
                len,
            });
        }

        match slot.container {
            Container::Dock => self.dock.insert(slot.index, icon),
            Container::Page(n) => self.pages[n].insert(slot.index, icon),
            Container::Folder(folder_id) => {
                let app = icon.into_app().map_err(|f| LayoutError::NestedFolder(f.id))?;
                let folder = self
                    .folder_mut(folder_id)
                    .ok_or(LayoutError::UnknownContainer(slot.container))?;
                folder.members.insert(slot.index, app);
            }
        }
        Ok(())
    }

    /// Removes the icon at `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownContainer`] or [`LayoutError::IndexOutOfRange`].
    pub fn remove_at(&mut self, slot: Slot) -> Result<Icon, LayoutError> {
        let len = self.len_of(slot.container)?;
        if slot.index >= len {
            return Err(LayoutError::IndexOutOfRange {
                container: slot.container,
                index: slot.index,
                len,
            });
        }
        match slot.container {
            Container::Dock => Ok(self.dock.remove(slot.index)),
            Container::Page(n) => Ok(self.pages[n].remove(slot.index)),
            Container::Folder(folder_id) => self
                .folder_mut(folder_id)
                .map(|f| Icon::from(f.members.remove(slot.index)))
                .ok_or(LayoutError::UnknownContainer(slot.container)),
        }
    }

    /// Removes an icon wherever it is and returns it with its former slot.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::IconNotFound`] if no container holds the icon.
    pub fn remove(&mut self, id: IconId) -> Result<(Slot, Icon), LayoutError> {
        let slot = self.index_of(id).ok_or(LayoutError::IconNotFound(id))?;
        let icon = self.remove_at(slot)?;
        Ok((slot, icon))
    }

    /// Removes every empty page and returns the removed indices in ascending
    /// order (as they were numbered before removal).
    pub fn prune_empty_pages(&mut self) -> Vec<usize> {
        let removed: Vec<usize> = self
            .pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_empty())
            .map(|(i, _)| i)
            .collect();
        self.pages.retain(|p| !p.is_empty());
        removed
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
