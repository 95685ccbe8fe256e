//! Core foundation: shared types and geometry primitives.
//!
//! Nothing in this layer holds state; everything above builds on it.

pub mod math;
pub mod raster;
pub mod types;

pub use math::{rotate, rotate_truncated};
pub use raster::{BresenhamLine, rasterize_line};
pub use types::{CellState, GridCell, MapPoint, RobotId, RobotPose};
