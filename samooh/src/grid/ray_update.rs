//! Sensor ray updates for the occupancy grid.
//!
//! A range reading becomes a ray from the robot to the measured point:
//! - every rasterized cell on the way is marked Open
//! - if the reading is shorter than the sensor's max range, the final cell is
//!   marked Obstacle
//! - otherwise the ray is foreshortened to exactly max range and no obstacle
//!   is recorded (the sensor saw nothing, but the space up to max range is clear)
//!
//! Endpoints are clamped into the grid before rasterization, so readings that
//! overflow the map under sensor noise still land on the border cells.

use super::OccupancyGrid;
use crate::core::raster::BresenhamLine;
use crate::core::types::{CellState, GridCell, MapPoint};

/// Result of drawing one ray.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RayResult {
    /// Cells marked Open.
    pub cells_open: usize,
    /// Cell marked Obstacle, if the ray hit something within range.
    pub obstacle: Option<GridCell>,
}

impl OccupancyGrid {
    /// Draw a sensor ray from `origin` to `target` (map frame, cm).
    pub fn draw_ray(&mut self, origin: MapPoint, target: MapPoint, max_range: f64) -> RayResult {
        let length = origin.distance(&target);
        let hit = length < max_range;

        let end = if hit || length == 0.0 {
            target
        } else {
            // Shorten to max range along the same direction
            let scale = max_range / length;
            MapPoint::new(
                origin.x.saturating_add((scale * (target.x as f64 - origin.x as f64)) as i32),
                origin.y.saturating_add((scale * (target.y as f64 - origin.y as f64)) as i32),
            )
        };

        let start = self.clamped_cell(origin);
        let stop = self.clamped_cell(end);

        let mut result = RayResult::default();
        let line = BresenhamLine::new(
            start.x as i32,
            start.y as i32,
            stop.x as i32,
            stop.y as i32,
        );

        for (x, y) in line {
            let cell = GridCell::new(x as usize, y as usize);
            if hit && cell == stop {
                continue;
            }
            if self.set_cell(cell.x, cell.y, CellState::Open) {
                result.cells_open += 1;
            }
        }

        if hit && self.set_cell(stop.x, stop.y, CellState::Obstacle) {
            result.obstacle = Some(stop);
        }

        result
    }

    /// Mark the segment `a`→`b` as obstacles, clearing the line of sight from
    /// `robot` to every segment cell.
    ///
    /// Returns the number of segment cells marked Obstacle.
    pub fn draw_segment(&mut self, robot: MapPoint, a: MapPoint, b: MapPoint) -> usize {
        let robot_cell = self.clamped_cell(robot);
        let a_cell = self.clamped_cell(a);
        let b_cell = self.clamped_cell(b);

        let segment = BresenhamLine::new(
            a_cell.x as i32,
            a_cell.y as i32,
            b_cell.x as i32,
            b_cell.y as i32,
        );

        let mut obstacles = 0;
        for (sx, sy) in segment {
            if self.set_cell(sx as usize, sy as usize, CellState::Obstacle) {
                obstacles += 1;
            }

            let sight: Vec<(i32, i32)> =
                BresenhamLine::new(robot_cell.x as i32, robot_cell.y as i32, sx, sy).collect();
            if let Some((_, clear)) = sight.split_last() {
                for &(x, y) in clear {
                    self.set_cell(x as usize, y as usize, CellState::Open);
                }
            }
        }

        obstacles
    }
}
