//! Shared occupancy grid with incremental change tracking.
//!
//! The grid is a fixed square of tri-state cells (1 cell = 1 cm). Map
//! coordinates use a center-origin convention with the Y axis inverted:
//!
//! ```text
//! index_x = center_x + map_x
//! index_y = center_y - map_y
//! ```
//!
//! Every write is also appended to one of two delta buffers (newly opened,
//! newly obstructed). Display consumers receive only these deltas via
//! [`OccupancyGrid::drain_deltas`], never the full grid.
//!
//! ## Sensor updates
//!
//! - [`OccupancyGrid::draw_ray`]: IR range reading, open path plus optional obstacle
//! - [`OccupancyGrid::draw_segment`]: camera-detected obstacle segment

mod ray_update;

pub use ray_update::RayResult;

use crate::core::types::{CellState, GridCell, MapPoint};
use crate::error::{FusionError, Result};

/// Cells written since the last drain, split by the state written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapDelta {
    /// Cells marked [`CellState::Open`].
    pub opened: Vec<GridCell>,
    /// Cells marked [`CellState::Obstacle`].
    pub obstructed: Vec<GridCell>,
}

impl MapDelta {
    pub fn is_empty(&self) -> bool {
        self.opened.is_empty() && self.obstructed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.opened.len() + self.obstructed.len()
    }
}

/// Cell counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellCounts {
    pub unknown: usize,
    pub open: usize,
    pub obstacle: usize,
}

/// Fixed-size square occupancy grid.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    /// Row-major storage: index = y * size + x
    cells: Vec<CellState>,
    size: usize,
    center_x: usize,
    center_y: usize,
    delta: MapDelta,
}

impl OccupancyGrid {
    /// Allocate a `size × size` grid with every cell [`CellState::Unknown`].
    ///
    /// `center_x`/`center_y` are the indices of map coordinate (0, 0).
    pub fn new(size: usize, center_x: usize, center_y: usize) -> Self {
        Self {
            cells: vec![CellState::Unknown; size * size],
            size,
            center_x,
            center_y,
            delta: MapDelta::default(),
        }
    }

    /// Rebuild a grid from row-major cells (used by the map file loader).
    pub fn from_cells(
        size: usize,
        center_x: usize,
        center_y: usize,
        cells: Vec<CellState>,
    ) -> Result<Self> {
        if cells.len() != size * size {
            return Err(FusionError::MapFile(format!(
                "expected {} cells for a {}x{} grid, got {}",
                size * size,
                size,
                size,
                cells.len()
            )));
        }
        Ok(Self {
            cells,
            size,
            center_x,
            center_y,
            delta: MapDelta::default(),
        })
    }

    /// Side length in cells.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Indices of map coordinate (0, 0).
    #[inline]
    pub fn center(&self) -> (usize, usize) {
        (self.center_x, self.center_y)
    }

    /// Row-major cell states.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    #[inline]
    fn cell_index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    #[inline]
    pub fn is_valid_cell(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    /// Get cell state. Out-of-range cells read as [`CellState::Unknown`].
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> CellState {
        if self.is_valid_cell(x, y) {
            self.cells[self.cell_index(x, y)]
        } else {
            CellState::Unknown
        }
    }

    /// Get the state of the cell under a map point.
    pub fn get_at(&self, point: MapPoint) -> CellState {
        let (ix, iy) = self.map_to_index(point);
        if ix < 0 || iy < 0 {
            return CellState::Unknown;
        }
        self.get(ix as usize, iy as usize)
    }

    /// Convert map coordinates to (possibly out-of-range) signed indices.
    #[inline]
    pub fn map_to_index(&self, point: MapPoint) -> (i64, i64) {
        (
            self.center_x as i64 + point.x as i64,
            self.center_y as i64 - point.y as i64,
        )
    }

    /// Clamp signed indices into `[0, size)`.
    #[inline]
    pub fn clamp_index(&self, ix: i64, iy: i64) -> GridCell {
        let max = self.size.saturating_sub(1) as i64;
        GridCell::new(ix.clamp(0, max) as usize, iy.clamp(0, max) as usize)
    }

    /// Map point to its grid cell, clamped to the grid bounds.
    #[inline]
    pub fn clamped_cell(&self, point: MapPoint) -> GridCell {
        let (ix, iy) = self.map_to_index(point);
        self.clamp_index(ix, iy)
    }

    /// Write a cell and record it in the matching delta buffer.
    ///
    /// Returns `false` (and writes nothing) when the indices are out of range.
    /// Writing [`CellState::Unknown`] changes the cell but is not tracked.
    pub fn set_cell(&mut self, x: usize, y: usize, state: CellState) -> bool {
        if !self.is_valid_cell(x, y) {
            log::trace!("Ignoring out-of-range cell write ({}, {})", x, y);
            return false;
        }

        let idx = self.cell_index(x, y);
        self.cells[idx] = state;

        let cell = GridCell::new(x, y);
        match state {
            CellState::Open => self.delta.opened.push(cell),
            CellState::Obstacle => self.delta.obstructed.push(cell),
            CellState::Unknown => {}
        }
        true
    }

    /// Take the accumulated deltas, leaving both buffers empty.
    pub fn drain_deltas(&mut self) -> MapDelta {
        std::mem::take(&mut self.delta)
    }

    /// Number of cells waiting in the delta buffers.
    pub fn pending_deltas(&self) -> usize {
        self.delta.len()
    }

    /// Count cells by state.
    pub fn count_by_state(&self) -> CellCounts {
        let mut counts = CellCounts::default();
        for cell in &self.cells {
            match cell {
                CellState::Unknown => counts.unknown += 1,
                CellState::Open => counts.open += 1,
                CellState::Obstacle => counts.obstacle += 1,
            }
        }
        counts
    }
}
