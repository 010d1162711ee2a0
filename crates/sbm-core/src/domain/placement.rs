//! Placement engine: turns pointer events into layout changes.
//!
//! The engine is fed an explicit event stream ([`PointerEvent`]) and answers
//! each event with a list of [`RenderCommand`]s for the rendering collaborator.
//! It never draws anything itself and never reports errors to the user:
//! malformed interaction state (a move without a press, a press while another
//! drag is active) is silently ignored.
//!
//! # Drag session lifecycle
//!
//! ```text
//! Idle ──Press──► Dragging ──Move──► Resolving ──► Dragging ──Release──► Released ──► Idle
//! ```
//!
//! `Resolving` and `Released` only exist while [`PlacementEngine::handle`]
//! runs; between events the engine is either `Idle` or `Dragging`.
//!
//! # Resolution (every move sample)
//!
//! 1. Pick the target container from the pointer's vertical band: dock band,
//!    open folder panel, or the visible page.
//! 2. Take the dragged icon out of its current container so it never counts
//!    twice toward capacity.
//! 3. Find the insertion index with [`insertion_index`].
//! 4. If the target is a full page, the page's last icon is pushed to the
//!    front of the next page, cascading forward and appending a page when the
//!    chain runs off the end.
//!
//! Empty pages are only pruned on release.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::domain::geometry::{GridSpec, Point, Rect, StageGeometry};
use crate::domain::icon::IconId;
use crate::domain::layout::{Container, Layout, LayoutError, Slot};

/// Pointer input forwarded by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// The pointer went down on an icon.  `at` is in stage coordinates.
    Press { icon: IconId, at: Point },
    /// The pointer moved while pressed.  `time` is any monotonic clock.
    Move { at: Point, time: Duration },
    /// The pointer was released.
    Release,
}

/// Animated effects the rendering collaborator plays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Transition {
    /// Split the screen at `split_y` and slide the halves apart to reveal `panel`.
    FolderOpen { folder: IconId, split_y: f32, panel: Rect },
    /// Slide the halves back together.
    FolderClose { folder: IconId, split_y: f32 },
}

/// Rendering work produced by the engine, returned as data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenderCommand {
    /// Position an icon's visual at `position` (container-local) in `slot`.
    MoveIcon {
        icon: IconId,
        slot: Slot,
        position: Point,
        animated: bool,
    },
    /// Drop an icon's visual (the icon left the layout).
    RemoveIcon { icon: IconId },
    /// Lift an icon above the others; it now follows the pointer.
    BeginDrag { icon: IconId },
    /// The icon stops following the pointer.
    EndDrag { icon: IconId },
    AddPageIndicator { page: usize },
    RemovePageIndicator { page: usize },
    ShowPage { page: usize, animated: bool },
    /// Dim (or undim) every icon except `except`.
    SetDimmed { dimmed: bool, except: Option<IconId> },
    /// Capture the "before" images above and below `split_y`.
    CaptureSplitImages { split_y: f32 },
    PlayTransition(Transition),
    /// Show the editable folder name in the folder panel.
    ShowFolderName { folder: IconId, name: String },
    /// A folder's name changed and should be redrawn under its icon.
    RenameFolder { folder: IconId, name: String },
    /// Hide the folder's member visuals (folder panel closed).
    HideFolderMembers { folder: IconId },
}

/// Where the drag state machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DragPhase {
    Idle,
    Dragging,
    Resolving,
    Released,
}

/// An open (or opening/closing) folder panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FolderView {
    pub folder: IconId,
    /// The line along which the home screen splits.
    pub split_y: f32,
    /// Panel bounds in stage coordinates.
    pub panel: Rect,
    /// Dock folders open above the dock; page folders open below their row.
    pub opens_upward: bool,
}

/// Folder view state machine: `Closed → Opening → Open → Closing → Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FolderViewState {
    Closed,
    Opening(FolderView),
    Open(FolderView),
    Closing(FolderView),
}

impl FolderViewState {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    fn view(&self) -> Option<&FolderView> {
        match self {
            Self::Closed => None,
            Self::Opening(v) | Self::Open(v) | Self::Closing(v) => Some(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerZone {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct DragSession {
    icon: IconId,
    /// Pointer position minus the icon's top-left corner at press time.
    grab_offset: Point,
    last_pointer_x: f32,
    /// Trigger zone the icon centre is in, and since when.
    dwell: Option<(TriggerZone, Duration)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    slot: Slot,
    position: Point,
}

/// Returns the index at which an icon dragged to `moving` is inserted among
/// `existing` (the other members' positions, in visual row-major order).
///
/// Both sides are linearised with [`GridSpec::linear_x`].  The result is the
/// first member whose linear x is at or beyond the moving icon's by less
/// than `cell_threshold`, or `existing.len()` if there is none.
pub fn insertion_index(existing: &[Point], moving: Point, grid: &GridSpec, cell_threshold: f32) -> usize {
    let moving_x = grid.linear_x(moving);
    existing
        .iter()
        .position(|p| {
            let d = grid.linear_x(*p) - moving_x;
            d >= 0.0 && d < cell_threshold
        })
        .unwrap_or(existing.len())
}

/// The drag/drop state machine plus the currently displayed page.
///
/// The engine owns no icons: the [`Layout`] is passed in by reference on
/// every call and is only ever touched from the caller's context.
#[derive(Debug)]
pub struct PlacementEngine {
    geometry: StageGeometry,
    current_page: usize,
    phase: DragPhase,
    drag: Option<DragSession>,
    folder_view: FolderViewState,
    /// Last position handed to the renderer for each icon.
    placed: HashMap<IconId, Placement>,
    last_page_switch: Option<Duration>,
}

impl PlacementEngine {
    pub fn new(geometry: StageGeometry) -> Self {
        Self {
            geometry,
            current_page: 0,
            phase: DragPhase::Idle,
            drag: None,
            folder_view: FolderViewState::Closed,
            placed: HashMap::new(),
            last_page_switch: None,
        }
    }

    pub fn geometry(&self) -> &StageGeometry {
        &self.geometry
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn drag_phase(&self) -> DragPhase {
        self.phase
    }

    /// The icon currently being dragged, if any.
    pub fn dragged_icon(&self) -> Option<IconId> {
        self.drag.as_ref().map(|d| d.icon)
    }

    pub fn folder_view(&self) -> FolderViewState {
        self.folder_view
    }

    /// Forgets all interaction state (used when a new layout replaces the old one).
    pub fn reset(&mut self) {
        self.current_page = 0;
        self.phase = DragPhase::Idle;
        self.drag = None;
        self.folder_view = FolderViewState::Closed;
        self.placed.clear();
        self.last_page_switch = None;
    }

    /// Positions every dock and page icon from scratch.
    pub fn layout_all(&mut self, layout: &Layout) -> Vec<RenderCommand> {
        self.placed.clear();
        let mut commands: Vec<RenderCommand> = (0..layout.page_count())
            .map(|page| RenderCommand::AddPageIndicator { page })
            .collect();
        self.relayout_everything(layout, None, false, &mut commands);
        self.current_page = self.current_page.min(layout.page_count().saturating_sub(1));
        commands.push(RenderCommand::ShowPage {
            page: self.current_page,
            animated: false,
        });
        commands
    }

    /// Switches the visible page (page indicator click).  Ignored while a
    /// folder is open or the page does not exist.
    pub fn show_page(&mut self, layout: &Layout, page: usize) -> Vec<RenderCommand> {
        if !self.folder_view.is_closed() || page >= layout.page_count() || page == self.current_page {
            return Vec::new();
        }
        self.current_page = page;
        vec![RenderCommand::ShowPage { page, animated: true }]
    }

    /// Feeds one pointer event through the drag state machine.
    pub fn handle(&mut self, layout: &mut Layout, event: PointerEvent) -> Vec<RenderCommand> {
        match event {
            PointerEvent::Press { icon, at } => self.on_press(layout, icon, at),
            PointerEvent::Move { at, time } => self.on_move(layout, at, time),
            PointerEvent::Release => self.on_release(layout),
        }
    }

    // ── Press / move / release ────────────────────────────────────────────────

    fn on_press(&mut self, layout: &mut Layout, icon: IconId, at: Point) -> Vec<RenderCommand> {
        if let Some(active) = &self.drag {
            debug!(active = %active.icon, rejected = %icon, "press rejected: a drag is already active");
            return Vec::new();
        }
        let Some(slot) = layout.index_of(icon) else {
            return Vec::new();
        };
        let pressable = match self.folder_view {
            FolderViewState::Closed => !matches!(slot.container, Container::Folder(_)),
            FolderViewState::Open(view) => slot.container == Container::Folder(view.folder),
            FolderViewState::Opening(_) | FolderViewState::Closing(_) => false,
        };
        if !pressable || layout.is_enabled(icon) != Some(true) {
            return Vec::new();
        }

        let local = self
            .placed
            .get(&icon)
            .map(|p| p.position)
            .unwrap_or_else(|| self.grid_for(layout, slot.container).position(slot.index));
        let stage = self.local_to_stage(slot.container, local);

        layout.set_enabled(icon, false);
        self.drag = Some(DragSession {
            icon,
            grab_offset: Point::new(at.x - stage.x, at.y - stage.y),
            last_pointer_x: at.x,
            dwell: None,
        });
        self.phase = DragPhase::Dragging;
        vec![RenderCommand::BeginDrag { icon }]
    }

    fn on_move(&mut self, layout: &mut Layout, at: Point, time: Duration) -> Vec<RenderCommand> {
        let Some(mut drag) = self.drag.take() else {
            return Vec::new();
        };
        self.phase = DragPhase::Resolving;
        let mut commands = Vec::new();

        let direction = if at.x >= drag.last_pointer_x {
            Direction::Right
        } else {
            Direction::Left
        };
        drag.last_pointer_x = at.x;
        let moving = Point::new(at.x - drag.grab_offset.x, at.y - drag.grab_offset.y);

        if self.folder_view.is_closed() {
            self.navigate_pages(layout, &mut drag, moving, time, &mut commands);
        }

        let target = self.target_container(layout, drag.icon, at);
        self.resolve(layout, drag.icon, target, moving, direction, &mut commands);

        self.drag = Some(drag);
        self.phase = DragPhase::Dragging;
        commands
    }

    fn on_release(&mut self, layout: &mut Layout) -> Vec<RenderCommand> {
        let Some(drag) = self.drag.take() else {
            return Vec::new();
        };
        self.phase = DragPhase::Released;
        layout.set_enabled(drag.icon, true);

        let mut commands = vec![RenderCommand::EndDrag { icon: drag.icon }];
        self.housekeeping(layout, &mut commands);
        self.relayout_everything(layout, None, true, &mut commands);

        if let Some(slot) = layout.index_of(drag.icon) {
            let position = self.grid_for(layout, slot.container).position(slot.index);
            self.placed.insert(drag.icon, Placement { slot, position });
            commands.push(RenderCommand::MoveIcon {
                icon: drag.icon,
                slot,
                position,
                animated: true,
            });
        }

        self.phase = DragPhase::Idle;
        commands
    }

    // ── Resolution ────────────────────────────────────────────────────────────

    fn target_container(&self, layout: &Layout, icon: IconId, pointer: Point) -> Container {
        let page = Container::Page(self.current_page);
        if let FolderViewState::Open(view) = self.folder_view {
            let is_folder = layout.icon(icon).is_some_and(|i| i.is_folder());
            if view.panel.contains(pointer) && !is_folder {
                return Container::Folder(view.folder);
            }
            return page;
        }
        if pointer.y >= self.geometry.dock_top() {
            let already_docked = layout.index_of(icon).map(|s| s.container) == Some(Container::Dock);
            let others = layout.dock().len() - usize::from(already_docked);
            if others < layout.dock_capacity() {
                return Container::Dock;
            }
        }
        page
    }

    fn resolve(
        &mut self,
        layout: &mut Layout,
        icon: IconId,
        target: Container,
        moving: Point,
        direction: Direction,
        commands: &mut Vec<RenderCommand>,
    ) {
        if let Container::Page(n) = target {
            while layout.page_count() <= n {
                let page = layout.push_page();
                commands.push(RenderCommand::AddPageIndicator { page });
            }
        }

        let grid = self.grid_for(layout, target);
        let members = layout.member_ids(target).unwrap_or_default();
        let existing: Vec<Point> = members
            .iter()
            .enumerate()
            .filter(|(_, id)| **id != icon)
            .map(|(i, id)| {
                self.placed
                    .get(id)
                    .filter(|p| p.slot.container == target)
                    .map(|p| p.position)
                    .unwrap_or_else(|| grid.position(i))
            })
            .collect();

        let local = self.stage_to_local(target, moving);
        let spacing = match target {
            Container::Folder(_) => self.geometry.folder_spacing(),
            _ => self.geometry.spacing,
        };
        let threshold = match direction {
            Direction::Right => self.geometry.icon_width + spacing,
            Direction::Left => self.geometry.icon_width + 2.0 * spacing,
        };
        let mut index = insertion_index(&existing, local, &grid, threshold);

        let previous = layout.index_of(icon);
        if previous == Some(Slot::new(target, index)) {
            return;
        }

        let (old_slot, dragged) = match layout.remove(icon) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(icon = %icon, error = %e, "dragged icon vanished from the layout");
                return;
            }
        };

        let len = layout.len_of(target).unwrap_or(0);
        index = index.min(len);
        let capacity = layout.page_capacity().max(1);
        if matches!(target, Container::Page(_)) && len >= capacity {
            index = index.min(capacity - 1);
        }

        if let Err(e) = layout.insert(Slot::new(target, index), dragged.clone()) {
            debug!(icon = %icon, error = %e, "cannot place icon here, restoring");
            if let Err(e) = layout.insert(old_slot, dragged) {
                warn!(icon = %icon, error = %e, "failed to restore dragged icon");
            }
            return;
        }
        trace!(icon = %icon, ?target, index, "resolved drag position");

        let mut touched = vec![old_slot.container, target];
        if let Container::Page(n) = target {
            match self.cascade_overflow(layout, n, commands) {
                Ok(pages) => touched.extend(pages.into_iter().map(Container::Page)),
                Err(e) => warn!(error = %e, "page overflow cascade failed"),
            }
        }

        touched.dedup();
        for container in touched {
            self.relayout(layout, container, Some(icon), true, commands);
        }
        self.refresh_folder_panel(layout);
    }

    /// Pushes icons past capacity forward one page at a time, appending a page
    /// if the chain runs off the end.  Returns the pages that received icons.
    fn cascade_overflow(
        &mut self,
        layout: &mut Layout,
        start: usize,
        commands: &mut Vec<RenderCommand>,
    ) -> Result<Vec<usize>, LayoutError> {
        let capacity = layout.page_capacity().max(1);
        let mut touched = Vec::new();
        let mut page = start;
        loop {
            let len = layout.len_of(Container::Page(page))?;
            if len <= capacity {
                break;
            }
            let next = page + 1;
            if next >= layout.page_count() {
                let created = layout.push_page();
                debug!(page = created, "overflow created a new page");
                commands.push(RenderCommand::AddPageIndicator { page: created });
            }
            for last in (capacity..len).rev() {
                let evicted = layout.remove_at(Slot::new(Container::Page(page), last))?;
                layout.insert(Slot::new(Container::Page(next), 0), evicted)?;
            }
            touched.push(next);
            page = next;
        }
        Ok(touched)
    }

    fn navigate_pages(
        &mut self,
        layout: &mut Layout,
        drag: &mut DragSession,
        moving: Point,
        time: Duration,
        commands: &mut Vec<RenderCommand>,
    ) {
        let center = self.geometry.icon_center(moving);
        let zone = if self.geometry.in_left_trigger(center) {
            TriggerZone::Left
        } else if self.geometry.in_right_trigger(center) {
            TriggerZone::Right
        } else {
            drag.dwell = None;
            return;
        };

        let since = match drag.dwell {
            Some((current, since)) if current == zone => since,
            _ => {
                drag.dwell = Some((zone, time));
                return;
            }
        };
        let dwell = self.geometry.page_switch_dwell;
        if time.saturating_sub(since) < dwell {
            return;
        }
        if let Some(last) = self.last_page_switch {
            if time.saturating_sub(last) < dwell {
                return;
            }
        }

        let target = match zone {
            TriggerZone::Left => self.current_page.checked_sub(1),
            TriggerZone::Right if self.current_page + 1 < layout.page_count() => Some(self.current_page + 1),
            TriggerZone::Right => {
                let has_others = layout
                    .member_ids(Container::Page(self.current_page))
                    .map(|ids| ids.iter().any(|id| *id != drag.icon))
                    .unwrap_or(false);
                if has_others {
                    let page = layout.push_page();
                    debug!(page, "navigation created a new page");
                    commands.push(RenderCommand::AddPageIndicator { page });
                    Some(page)
                } else {
                    None
                }
            }
        };

        if let Some(page) = target {
            self.current_page = page;
            self.last_page_switch = Some(time);
            drag.dwell = Some((zone, time));
            commands.push(RenderCommand::ShowPage { page, animated: true });
        }
    }

    /// Removes empty pages (and their indicators) and clamps the visible page.
    fn housekeeping(&mut self, layout: &mut Layout, commands: &mut Vec<RenderCommand>) {
        let removed = layout.prune_empty_pages();
        if !removed.is_empty() {
            debug!(?removed, "pruned empty pages");
        }
        for page in removed.iter().rev() {
            commands.push(RenderCommand::RemovePageIndicator { page: *page });
        }
        let count = layout.page_count();
        if self.current_page >= count {
            self.current_page = count.saturating_sub(1);
            commands.push(RenderCommand::ShowPage {
                page: self.current_page,
                animated: true,
            });
        }
    }

    // ── Folder view ───────────────────────────────────────────────────────────

    /// Opens the folder panel for `folder`.
    ///
    /// Ignored unless the folder view is closed and no drag is active.
    pub fn open_folder(&mut self, layout: &Layout, folder: IconId) -> Vec<RenderCommand> {
        if self.drag.is_some() || !self.folder_view.is_closed() {
            return Vec::new();
        }
        let (Some(contents), Some(slot)) = (layout.folder(folder), layout.index_of(folder)) else {
            return Vec::new();
        };

        let height = self.geometry.folder_panel_height(contents.members.len());
        let view = match slot.container {
            Container::Dock => {
                let split_y = self.geometry.dock_top();
                FolderView {
                    folder,
                    split_y,
                    panel: Rect { x: 0.0, y: split_y - height, width: self.geometry.width, height },
                    opens_upward: true,
                }
            }
            _ => {
                let split_y = self.geometry.page_grid().position(slot.index).y + self.geometry.row_height;
                FolderView {
                    folder,
                    split_y,
                    panel: Rect { x: 0.0, y: split_y, width: self.geometry.width, height },
                    opens_upward: false,
                }
            }
        };

        let mut commands = vec![
            RenderCommand::SetDimmed {
                dimmed: true,
                except: Some(folder),
            },
            RenderCommand::CaptureSplitImages { split_y: view.split_y },
            RenderCommand::PlayTransition(Transition::FolderOpen {
                folder,
                split_y: view.split_y,
                panel: view.panel,
            }),
            RenderCommand::ShowFolderName {
                folder,
                name: contents.display_name.clone(),
            },
        ];
        self.folder_view = FolderViewState::Opening(view);
        self.relayout(layout, Container::Folder(folder), None, false, &mut commands);
        commands
    }

    /// Closes the folder panel, persisting `edited_name` if it differs from
    /// the folder's current name.  A folder left without members is removed.
    pub fn close_folder(&mut self, layout: &mut Layout, edited_name: Option<&str>) -> Vec<RenderCommand> {
        let FolderViewState::Open(view) = self.folder_view else {
            return Vec::new();
        };
        if self.drag.is_some() {
            return Vec::new();
        }
        let mut commands = Vec::new();

        let member_ids = layout.member_ids(Container::Folder(view.folder)).unwrap_or_default();
        if let (Some(name), Some(folder)) = (edited_name.map(str::trim), layout.folder_mut(view.folder)) {
            if !name.is_empty() && folder.display_name != name {
                debug!(folder = %view.folder, from = %folder.display_name, to = %name, "folder renamed");
                folder.display_name = name.to_string();
                commands.push(RenderCommand::RenameFolder {
                    folder: view.folder,
                    name: name.to_string(),
                });
            }
        }

        commands.push(RenderCommand::HideFolderMembers { folder: view.folder });
        commands.push(RenderCommand::PlayTransition(Transition::FolderClose {
            folder: view.folder,
            split_y: view.split_y,
        }));
        commands.push(RenderCommand::SetDimmed {
            dimmed: false,
            except: None,
        });
        for id in &member_ids {
            self.placed.remove(id);
        }

        if member_ids.is_empty() && layout.remove(view.folder).is_ok() {
            debug!(folder = %view.folder, "removed empty folder");
            self.placed.remove(&view.folder);
            commands.push(RenderCommand::RemoveIcon { icon: view.folder });
            self.housekeeping(layout, &mut commands);
            self.relayout_everything(layout, None, true, &mut commands);
        }

        self.folder_view = FolderViewState::Closing(view);
        commands
    }

    /// Reports that the rendering collaborator finished the running folder
    /// transition (`Opening → Open`, `Closing → Closed`).
    pub fn transition_finished(&mut self) {
        self.folder_view = match self.folder_view {
            FolderViewState::Opening(view) => FolderViewState::Open(view),
            FolderViewState::Closing(_) => FolderViewState::Closed,
            other => other,
        };
    }

    fn refresh_folder_panel(&mut self, layout: &Layout) {
        let FolderViewState::Open(mut view) = self.folder_view else {
            return;
        };
        let members = layout.len_of(Container::Folder(view.folder)).unwrap_or(0);
        view.panel.height = self.geometry.folder_panel_height(members);
        if view.opens_upward {
            view.panel.y = view.split_y - view.panel.height;
        }
        self.folder_view = FolderViewState::Open(view);
    }

    // ── Positioning ───────────────────────────────────────────────────────────

    fn grid_for(&self, layout: &Layout, container: Container) -> GridSpec {
        match container {
            Container::Dock => self.geometry.dock_grid(layout.dock().len()),
            Container::Page(_) => self.geometry.page_grid(),
            Container::Folder(_) => self.geometry.folder_grid(),
        }
    }

    /// Folder slots are panel-local; everything else already is in stage space.
    fn local_to_stage(&self, container: Container, p: Point) -> Point {
        match (container, self.folder_view.view()) {
            (Container::Folder(_), Some(view)) => p.offset(view.panel.x, view.panel.y),
            _ => p,
        }
    }

    fn stage_to_local(&self, container: Container, p: Point) -> Point {
        match (container, self.folder_view.view()) {
            (Container::Folder(_), Some(view)) => p.offset(-view.panel.x, -view.panel.y),
            _ => p,
        }
    }

    /// Emits a move for every member of `container` whose slot or position
    /// changed since it was last placed.  `skip` (the dragged icon) gets its
    /// placement recorded without a command; it follows the pointer instead.
    fn relayout(
        &mut self,
        layout: &Layout,
        container: Container,
        skip: Option<IconId>,
        animated: bool,
        commands: &mut Vec<RenderCommand>,
    ) {
        if let Container::Folder(folder) = container {
            if self.folder_view.view().map(|v| v.folder) != Some(folder) {
                return;
            }
        }
        let Ok(ids) = layout.member_ids(container) else {
            return;
        };
        let grid = self.grid_for(layout, container);
        for (index, id) in ids.into_iter().enumerate() {
            let placement = Placement {
                slot: Slot::new(container, index),
                position: grid.position(index),
            };
            let unchanged = self.placed.get(&id) == Some(&placement);
            self.placed.insert(id, placement);
            if unchanged || Some(id) == skip {
                continue;
            }
            commands.push(RenderCommand::MoveIcon {
                icon: id,
                slot: placement.slot,
                position: placement.position,
                animated,
            });
        }
    }

    fn relayout_everything(
        &mut self,
        layout: &Layout,
        skip: Option<IconId>,
        animated: bool,
        commands: &mut Vec<RenderCommand>,
    ) {
        self.relayout(layout, Container::Dock, skip, animated, commands);
        for page in 0..layout.page_count() {
            self.relayout(layout, Container::Page(page), skip, animated, commands);
        }
        if let Some(view) = self.folder_view.view().copied() {
            self.relayout(layout, Container::Folder(view.folder), skip, animated, commands);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
