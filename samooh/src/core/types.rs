//! Shared value types.
//!
//! Units: map coordinates are centimeters, headings are integer degrees,
//! grid coordinates are cell indices (1 cell = 1 cm).

use serde::{Deserialize, Serialize};

/// Hardware-assigned robot identifier.
pub type RobotId = i32;

/// A point in the shared map frame (centimeters, +Y up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: i32,
    pub y: i32,
}

impl MapPoint {
    pub const ORIGIN: MapPoint = MapPoint { x: 0, y: 0 };

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point, exact in integer arithmetic.
    ///
    /// Saturates at `i64::MAX` for points near opposite ends of the `i32` range.
    #[inline]
    pub fn distance_squared(&self, other: &MapPoint) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &MapPoint) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }
}

/// A cell index in the occupancy grid (column, row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: usize,
    pub y: usize,
}

impl GridCell {
    #[inline]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Tri-state occupancy. Last write wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellState {
    /// Never observed
    #[default]
    Unknown,
    /// A sensor ray passed through
    Open,
    /// A sensor ray terminated here within range
    Obstacle,
}

impl CellState {
    /// Single-character form used by the map file.
    pub fn as_char(self) -> char {
        match self {
            CellState::Unknown => '?',
            CellState::Open => '.',
            CellState::Obstacle => '#',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '?' => Some(CellState::Unknown),
            '.' => Some(CellState::Open),
            '#' => Some(CellState::Obstacle),
            _ => None,
        }
    }
}

/// Pose of one registered robot.
///
/// `position`/`heading` are overwritten wholesale on every report. The origin
/// pose is captured at registration and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotPose {
    /// Current position (cm, map frame).
    pub position: MapPoint,
    /// Current heading (degrees, 90 = facing +Y).
    pub heading: i32,
    origin: MapPoint,
    origin_heading: i32,
}

impl RobotPose {
    /// Create a pose at its own origin.
    pub fn new(x: i32, y: i32, theta: i32) -> Self {
        let origin = MapPoint::new(x, y);
        Self {
            position: origin,
            heading: theta,
            origin,
            origin_heading: theta,
        }
    }

    /// Rebuild a pose with a current state that differs from its origin.
    pub(crate) fn with_origin(
        current: MapPoint,
        heading: i32,
        origin: MapPoint,
        origin_heading: i32,
    ) -> Self {
        Self {
            position: current,
            heading,
            origin,
            origin_heading,
        }
    }

    /// Position captured at registration.
    #[inline]
    pub fn origin(&self) -> MapPoint {
        self.origin
    }

    /// Heading captured at registration.
    #[inline]
    pub fn origin_heading(&self) -> i32 {
        self.origin_heading
    }
}
