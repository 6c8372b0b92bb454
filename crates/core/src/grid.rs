//! Grid geometry: pixel <-> cell conversion, snapping and parent clamping.
//!
//! Every function here is total. Out-of-range input is clamped to the
//! nearest legal value instead of being rejected, because these run on
//! every pointer-move event during a gesture.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A rectangle in grid-cell units, relative to the parent's content grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRect {
    pub col: i32,
    pub row: i32,
    pub columns_count: i32,
    pub rows_count: i32,
}

impl GridRect {
    pub fn new(col: i32, row: i32, columns_count: i32, rows_count: i32) -> Self {
        Self {
            col,
            row,
            columns_count,
            rows_count,
        }
    }

    /// First column to the right of the rectangle.
    pub fn right(&self) -> i32 {
        self.col + self.columns_count
    }

    /// First row below the rectangle.
    pub fn bottom(&self) -> i32 {
        self.row + self.rows_count
    }

    /// Whether two rectangles share at least one cell. Touching edges do
    /// not count.
    pub fn overlaps(&self, other: &GridRect) -> bool {
        self.col < other.right()
            && other.col < self.right()
            && self.row < other.bottom()
            && other.row < self.bottom()
    }

    pub fn translate(&self, d_col: i32, d_row: i32) -> Self {
        Self {
            col: self.col + d_col,
            row: self.row + d_row,
            ..*self
        }
    }

    pub fn with_size(&self, size: GridSize) -> Self {
        Self {
            columns_count: size.columns,
            rows_count: size.rows,
            ..*self
        }
    }

    pub fn size(&self) -> GridSize {
        GridSize {
            columns: self.columns_count,
            rows: self.rows_count,
        }
    }
}

/// A cell position inside a content grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridPoint {
    pub col: i32,
    pub row: i32,
}

impl GridPoint {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

/// Extent of a content grid in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridSize {
    pub columns: i32,
    pub rows: i32,
}

/// Pixel size of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f64,
    pub height: f64,
}

/// A container-relative rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Whether clamping may grow the parent vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentPolicy {
    /// The parent keeps its size; the child is clamped into it.
    Clamp,
    /// The parent's row count grows to fit the child.
    Grow,
}

/// Result of [`resolve_parent_bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounded {
    pub rect: GridRect,
    pub parent: GridSize,
}

// ---------------------------------------------------------------------------
// Snapping and conversion
// ---------------------------------------------------------------------------

/// Snap a raw pixel delta to the nearest multiple of `cell_size`.
pub fn normalize(distance: f64, cell_size: f64) -> f64 {
    if !distance.is_finite() || !(cell_size > 0.0) || !cell_size.is_finite() {
        return 0.0;
    }
    (distance / cell_size).round() * cell_size
}

/// Number of whole cells a pixel delta snaps to.
pub fn cells(distance: f64, cell_size: f64) -> i32 {
    if !(cell_size > 0.0) {
        return 0;
    }
    to_i32(normalize(distance, cell_size) / cell_size)
}

/// Convert a container-relative pixel rectangle into grid cells.
///
/// Position snaps to the nearest cell and is never negative; extent is at
/// least one cell in each direction.
pub fn pixel_to_grid(rect: PixelRect, cell: CellSize) -> GridRect {
    let cell = sanitize_cell(cell);
    GridRect {
        col: cells(rect.x, cell.width).max(0),
        row: cells(rect.y, cell.height).max(0),
        columns_count: cells(rect.width, cell.width).max(1),
        rows_count: cells(rect.height, cell.height).max(1),
    }
}

/// Convert a grid rectangle into container-relative pixels.
pub fn grid_to_pixel(rect: GridRect, cell: CellSize) -> PixelRect {
    let cell = sanitize_cell(cell);
    PixelRect {
        x: f64::from(rect.col) * cell.width,
        y: f64::from(rect.row) * cell.height,
        width: f64::from(rect.columns_count) * cell.width,
        height: f64::from(rect.rows_count) * cell.height,
    }
}

/// Per-cell pixel size of a container given its pixel rectangle and grid.
pub fn cell_size_of(parent_px: PixelRect, parent_grid: GridSize) -> CellSize {
    let columns = f64::from(parent_grid.columns.max(1));
    let width = parent_px.width / columns;
    // Canvases grow vertically, so row height follows the column width
    // unless the parent reports a fixed row grid.
    let height = if parent_grid.rows > 0 {
        parent_px.height / f64::from(parent_grid.rows)
    } else {
        width
    };
    sanitize_cell(CellSize { width, height })
}

// ---------------------------------------------------------------------------
// Parent clamping
// ---------------------------------------------------------------------------

/// Clamp `rect` so it lies inside a parent grid of size `parent`.
///
/// Horizontally the child is always clamped: at least one column wide, never
/// wider than the parent, shifted left if it overhangs. Vertically,
/// [`ParentPolicy::Clamp`] shifts/shrinks the child to fit the parent's rows
/// while [`ParentPolicy::Grow`] leaves the child alone and grows the parent.
pub fn resolve_parent_bounds(rect: GridRect, parent: GridSize, policy: ParentPolicy) -> Bounded {
    let parent_columns = parent.columns.max(1);
    let columns_count = rect.columns_count.clamp(1, parent_columns);
    let col = rect.col.clamp(0, parent_columns - columns_count);

    let mut parent = parent;
    let (row, rows_count) = match policy {
        ParentPolicy::Clamp => {
            let parent_rows = parent.rows.max(1);
            let rows_count = rect.rows_count.clamp(1, parent_rows);
            (rect.row.clamp(0, parent_rows - rows_count), rows_count)
        }
        ParentPolicy::Grow => {
            let rows_count = rect.rows_count.max(1);
            let row = rect.row.max(0);
            parent.rows = parent.rows.max(row + rows_count);
            (row, rows_count)
        }
    };

    Bounded {
        rect: GridRect {
            col,
            row,
            columns_count,
            rows_count,
        },
        parent,
    }
}

/// Candidate rectangle for a resize whose handle moved by a pixel delta.
///
/// The top-left corner stays put; extent snaps to whole cells and never
/// drops below one cell.
pub fn resize_candidate(original: GridRect, delta_x: f64, delta_y: f64, cell: CellSize) -> GridRect {
    let cell = sanitize_cell(cell);
    GridRect {
        columns_count: (original.columns_count + cells(delta_x, cell.width)).max(1),
        rows_count: (original.rows_count + cells(delta_y, cell.height)).max(1),
        ..original
    }
}

/// Pixel-space entry point: snap `rect` onto the parent's grid (derived from
/// its pixel rectangle and grid size), then clamp it.
pub fn resolve_pixel_bounds(
    rect: PixelRect,
    parent_px: PixelRect,
    parent_grid: GridSize,
    policy: ParentPolicy,
) -> Bounded {
    let cell = cell_size_of(parent_px, parent_grid);
    resolve_parent_bounds(pixel_to_grid(rect, cell), parent_grid, policy)
}

fn sanitize_cell(cell: CellSize) -> CellSize {
    let fix = |v: f64| if v.is_finite() && v > 0.0 { v } else { 1.0 };
    CellSize {
        width: fix(cell.width),
        height: fix(cell.height),
    }
}

fn to_i32(v: f64) -> i32 {
    // `as` saturates at the i32 bounds and maps NaN to 0.
    v.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: CellSize = CellSize {
        width: 10.0,
        height: 10.0,
    };

    #[test]
    fn normalize_snaps_to_nearest_cell() {
        assert_eq!(normalize(14.0, 10.0), 10.0);
        assert_eq!(normalize(15.0, 10.0), 20.0);
        assert_eq!(normalize(-16.0, 10.0), -20.0);
        assert_eq!(normalize(3.0, 10.0), 0.0);
    }

    #[test]
    fn normalize_is_total() {
        assert_eq!(normalize(12.0, 0.0), 0.0);
        assert_eq!(normalize(12.0, -5.0), 0.0);
        assert_eq!(normalize(f64::NAN, 10.0), 0.0);
        assert_eq!(normalize(f64::INFINITY, 10.0), 0.0);
    }

    #[test]
    fn cells_counts_snapped_units() {
        assert_eq!(cells(26.0, 10.0), 3);
        assert_eq!(cells(-26.0, 10.0), -3);
        assert_eq!(cells(26.0, 0.0), 0);
    }

    #[test]
    fn pixel_grid_conversion() {
        let px = PixelRect {
            x: 21.0,
            y: 39.0,
            width: 41.0,
            height: 18.0,
        };
        let grid = pixel_to_grid(px, CELL);
        assert_eq!(grid, GridRect::new(2, 4, 4, 2));

        let back = grid_to_pixel(grid, CELL);
        assert_eq!(back.x, 20.0);
        assert_eq!(back.y, 40.0);
        assert_eq!(back.width, 40.0);
        assert_eq!(back.height, 20.0);
    }

    #[test]
    fn pixel_to_grid_clamps_negative_and_empty() {
        let px = PixelRect {
            x: -50.0,
            y: -1.0,
            width: 0.0,
            height: 2.0,
        };
        assert_eq!(pixel_to_grid(px, CELL), GridRect::new(0, 0, 1, 1));
    }

    #[test]
    fn overlap_ignores_touching_edges() {
        let a = GridRect::new(0, 0, 4, 2);
        assert!(a.overlaps(&GridRect::new(3, 1, 4, 2)));
        assert!(!a.overlaps(&GridRect::new(4, 0, 4, 2)));
        assert!(!a.overlaps(&GridRect::new(0, 2, 4, 2)));
    }

    #[test]
    fn clamp_shifts_overhanging_child_left() {
        let parent = GridSize {
            columns: 32,
            rows: 10,
        };
        let b = resolve_parent_bounds(GridRect::new(30, 0, 4, 2), parent, ParentPolicy::Clamp);
        assert_eq!(b.rect, GridRect::new(28, 0, 4, 2));
        assert_eq!(b.parent, parent);
    }

    #[test]
    fn clamp_never_grows_parent() {
        let parent = GridSize {
            columns: 8,
            rows: 4,
        };
        let b = resolve_parent_bounds(GridRect::new(0, 3, 12, 6), parent, ParentPolicy::Clamp);
        assert_eq!(b.rect, GridRect::new(0, 0, 8, 4));
        assert_eq!(b.parent, parent);
    }

    #[test]
    fn grow_extends_parent_rows() {
        let parent = GridSize {
            columns: 32,
            rows: 0,
        };
        let b = resolve_parent_bounds(GridRect::new(-2, 3, 4, 2), parent, ParentPolicy::Grow);
        assert_eq!(b.rect, GridRect::new(0, 3, 4, 2));
        assert_eq!(b.parent.rows, 5);
    }

    #[test]
    fn resize_candidate_snaps_extent() {
        let original = GridRect::new(3, 1, 4, 2);
        assert_eq!(
            resize_candidate(original, 26.0, -4.0, CELL),
            GridRect::new(3, 1, 7, 2)
        );
        assert_eq!(
            resize_candidate(original, -100.0, -100.0, CELL),
            GridRect::new(3, 1, 1, 1)
        );
    }

    #[test]
    fn pixel_bounds_uses_parent_cell_size() {
        let parent_px = PixelRect {
            x: 0.0,
            y: 0.0,
            width: 320.0,
            height: 0.0,
        };
        let parent_grid = GridSize {
            columns: 32,
            rows: 0,
        };
        let rect = PixelRect {
            x: 318.0,
            y: 12.0,
            width: 40.0,
            height: 20.0,
        };
        let b = resolve_pixel_bounds(rect, parent_px, parent_grid, ParentPolicy::Grow);
        assert_eq!(b.rect, GridRect::new(28, 1, 4, 2));
        assert_eq!(b.parent.rows, 3);
    }
}
