//! Stage geometry for the replica home screen.
//!
//! The "stage" is the rendered device screen: a page grid at the top, the dock
//! band at the bottom, and (while a folder is open) a folder panel in between.
//! Positions are expressed in container-local coordinates:
//!
//! - Page slots are relative to their own page (the renderer adds the page's
//!   horizontal offset), so every page uses the same grid.
//! - Dock slots are relative to the stage, inside the dock band.
//! - Folder slots are relative to the folder panel, independent of the page
//!   the folder lives on.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::config::DeviceLayoutConfig;

/// Default replica stage size in points (the classic 320×480 screen).
pub const DEFAULT_STAGE_WIDTH: f32 = 320.0;
pub const DEFAULT_STAGE_HEIGHT: f32 = 480.0;
pub const DEFAULT_DOCK_HEIGHT: f32 = 90.0;

/// Distance from the top of a page to the first icon row.
const PAGE_TOP_INSET: f32 = 16.0;
/// Height reserved under each icon for its label.
const LABEL_HEIGHT: f32 = 31.0;
/// Vertical padding between the dock band's top edge and the dock icons.
const DOCK_TOP_PADDING: f32 = 8.0;
/// Folder panels always use a four-column grid.
pub const FOLDER_COLUMNS: usize = 4;
/// Padding above the first and below the last folder row.
const FOLDER_INSET: f32 = 12.0;
/// Width of the page-switch trigger zones flanking the visible page.
const TRIGGER_ZONE_WIDTH: f32 = 32.0;
/// How long the dragged icon must dwell in a trigger zone before the page switches.
pub const DEFAULT_PAGE_SWITCH_DWELL: Duration = Duration::from_millis(1000);

/// A point in stage (or container-local) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Returns `true` if `p` lies inside the rectangle (right/bottom exclusive).
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

/// A row-major icon grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub columns: usize,
    /// X of the first column.
    pub left: f32,
    /// Y of the first row (the grid's top inset).
    pub top: f32,
    /// Horizontal distance between two column origins.
    pub column_stride: f32,
    pub row_height: f32,
    /// Width of the container; used to linearise rows into one x axis.
    pub width: f32,
}

impl GridSpec {
    /// Top-left corner of the icon at `index`.
    pub fn position(&self, index: usize) -> Point {
        let columns = self.columns.max(1);
        let col = index % columns;
        let row = index / columns;
        Point::new(
            self.left + col as f32 * self.column_stride,
            self.top + row as f32 * self.row_height,
        )
    }

    /// Row that a y coordinate falls into; coordinates above the grid map to row 0.
    pub fn row_of(&self, y: f32) -> usize {
        if self.row_height <= 0.0 {
            return 0;
        }
        ((y - self.top) / self.row_height).floor().max(0.0) as usize
    }

    /// Linearises a 2-D position into a single x ordinate (`x + row × width`).
    pub fn linear_x(&self, p: Point) -> f32 {
        p.x.max(0.0) + self.row_of(p.y) as f32 * self.width
    }
}

/// All stage measurements derived from a [`DeviceLayoutConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct StageGeometry {
    pub width: f32,
    pub height: f32,
    pub dock_height: f32,
    pub icon_width: f32,
    pub icon_height: f32,
    pub columns: usize,
    pub rows: usize,
    /// Horizontal gap between page columns (and before the first one).
    pub spacing: f32,
    pub row_height: f32,
    pub page_switch_dwell: Duration,
}

impl StageGeometry {
    /// Geometry for the default 320×480 stage.
    pub fn new(config: &DeviceLayoutConfig) -> Self {
        Self::with_stage(config, DEFAULT_STAGE_WIDTH, DEFAULT_STAGE_HEIGHT, DEFAULT_DOCK_HEIGHT)
    }

    /// Geometry for a custom stage size.
    pub fn with_stage(config: &DeviceLayoutConfig, width: f32, height: f32, dock_height: f32) -> Self {
        let icon_width = config.icon_width as f32;
        let icon_height = config.icon_height as f32;
        let columns = config.page_columns.max(1);
        Self {
            width,
            height,
            dock_height,
            icon_width,
            icon_height,
            columns,
            rows: config.page_rows.max(1),
            spacing: Self::gap(width, icon_width, columns),
            row_height: icon_height + LABEL_HEIGHT,
            page_switch_dwell: DEFAULT_PAGE_SWITCH_DWELL,
        }
    }

    /// Overrides the trigger-zone dwell time.
    pub fn with_page_switch_dwell(mut self, dwell: Duration) -> Self {
        self.page_switch_dwell = dwell;
        self
    }

    fn gap(width: f32, icon_width: f32, columns: usize) -> f32 {
        ((width - columns as f32 * icon_width) / (columns as f32 + 1.0)).max(0.0)
    }

    /// Y coordinate of the dock band's top edge; pointers below it target the dock.
    pub fn dock_top(&self) -> f32 {
        self.height - self.dock_height
    }

    /// The page grid, identical for every page.
    pub fn page_grid(&self) -> GridSpec {
        GridSpec {
            columns: self.columns,
            left: self.spacing,
            top: PAGE_TOP_INSET,
            column_stride: self.icon_width + self.spacing,
            row_height: self.row_height,
            width: self.width,
        }
    }

    /// The dock row, horizontally centred for `count` icons.
    pub fn dock_grid(&self, count: usize) -> GridSpec {
        let count = count.max(1);
        let total = count as f32 * self.icon_width + (count as f32 - 1.0) * self.spacing;
        GridSpec {
            columns: count,
            left: ((self.width - total) / 2.0).max(0.0),
            top: self.dock_top() + DOCK_TOP_PADDING,
            column_stride: self.icon_width + self.spacing,
            row_height: self.dock_height,
            width: self.width,
        }
    }

    /// The folder panel grid in panel-local coordinates.
    pub fn folder_grid(&self) -> GridSpec {
        let spacing = Self::gap(self.width, self.icon_width, FOLDER_COLUMNS);
        GridSpec {
            columns: FOLDER_COLUMNS,
            left: spacing,
            top: FOLDER_INSET,
            column_stride: self.icon_width + spacing,
            row_height: self.row_height,
            width: self.width,
        }
    }

    /// Spacing used by the folder grid (narrower columns than most pages).
    pub fn folder_spacing(&self) -> f32 {
        Self::gap(self.width, self.icon_width, FOLDER_COLUMNS)
    }

    /// Height of a folder panel holding `members` icons (at least one row).
    pub fn folder_panel_height(&self, members: usize) -> f32 {
        let rows = members.div_ceil(FOLDER_COLUMNS).max(1);
        rows as f32 * self.row_height + 2.0 * FOLDER_INSET
    }

    /// Centre of an icon whose top-left corner is at `p`.
    pub fn icon_center(&self, p: Point) -> Point {
        p.offset(self.icon_width / 2.0, self.icon_height / 2.0)
    }

    /// `true` if `center` lies in the left page-switch zone.
    pub fn in_left_trigger(&self, center: Point) -> bool {
        center.x < TRIGGER_ZONE_WIDTH && center.y < self.dock_top()
    }

    /// `true` if `center` lies in the right page-switch zone.
    pub fn in_right_trigger(&self, center: Point) -> bool {
        center.x > self.width - TRIGGER_ZONE_WIDTH && center.y < self.dock_top()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> StageGeometry {
        StageGeometry::new(&DeviceLayoutConfig::default())
    }

    #[test]
    fn test_page_grid_positions_are_row_major() {
        let grid = geometry().page_grid();
        let first = grid.position(0);
        let fifth = grid.position(4);
        assert_eq!(first.y, fifth.y - grid.row_height);
        assert_eq!(first.x, fifth.x, "index 4 wraps to the first column of row 1");
    }

    #[test]
    fn test_row_of_clamps_negative_offsets_to_zero() {
        let grid = geometry().page_grid();
        assert_eq!(grid.row_of(-100.0), 0);
        assert_eq!(grid.row_of(grid.top + grid.row_height * 2.5), 2);
    }

    #[test]
    fn test_linear_x_adds_one_container_width_per_row() {
        let grid = geometry().page_grid();
        let p = grid.position(5);
        assert_eq!(grid.linear_x(p), p.x + grid.width);
    }

    #[test]
    fn test_dock_grid_is_centred() {
        let geo = geometry();
        let grid = geo.dock_grid(2);
        let last = grid.position(1);
        let right_margin = geo.width - (last.x + geo.icon_width);
        assert!((grid.left - right_margin).abs() < 0.01);
        assert!(grid.top > geo.dock_top());
    }

    #[test]
    fn test_folder_panel_grows_by_rows_of_four() {
        let geo = geometry();
        assert_eq!(geo.folder_panel_height(0), geo.folder_panel_height(4));
        assert!(geo.folder_panel_height(5) > geo.folder_panel_height(4));
    }

    #[test]
    fn test_trigger_zones_flank_the_page() {
        let geo = geometry();
        assert!(geo.in_left_trigger(Point::new(5.0, 100.0)));
        assert!(geo.in_right_trigger(Point::new(geo.width - 5.0, 100.0)));
        assert!(!geo.in_left_trigger(Point::new(160.0, 100.0)));
        assert!(!geo.in_left_trigger(Point::new(5.0, geo.height - 10.0)), "dock band is excluded");
    }

    #[test]
    fn test_rect_contains_is_right_exclusive() {
        let r = Rect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        assert!(r.contains(Point::new(0.0, 9.9)));
        assert!(!r.contains(Point::new(10.0, 5.0)));
    }
}
