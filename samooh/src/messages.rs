//! Message types exchanged with the fusion core.
//!
//! Inbound messages come from the transport (already decoded), the UI, and the
//! camera subscriber. Outbound messages go back to the transport and the
//! display. Everything is passed by value over channels; the grid and registry
//! themselves never leave the fusion thread.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{GridCell, RobotId, RobotPose};

/// Number of IR range sensors on a robot.
pub const IR_SENSOR_COUNT: usize = 4;

/// Number of entries in a flattened 5×5 covariance matrix.
pub const COVARIANCE_LEN: usize = 25;

/// Pose and ranging report from one robot.
///
/// `x`/`y` are millimeters and `theta` degrees, all relative to the robot's
/// own start pose (the robot integrates odometry from zero). IR offsets are
/// millimeters in the body frame: +x forward, +y to the right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    pub id: RobotId,
    pub x: i32,
    pub y: i32,
    pub theta: i32,
    pub ir: [(i32, i32); IR_SENSOR_COUNT],
    /// Row-major 5×5 covariance from the robot's state estimator.
    pub covariance: Option<[f32; COVARIANCE_LEN]>,
}

impl SensorReport {
    /// Report without covariance.
    pub fn new(id: RobotId, x: i32, y: i32, theta: i32, ir: [(i32, i32); IR_SENSOR_COUNT]) -> Self {
        Self {
            id,
            x,
            y,
            theta,
            ir,
            covariance: None,
        }
    }

    pub fn with_covariance(mut self, covariance: [f32; COVARIANCE_LEN]) -> Self {
        self.covariance = Some(covariance);
        self
    }
}

/// Registration answer for a robot: its start pose in the map frame (cm, degrees).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationInit {
    pub id: RobotId,
    pub x: i32,
    pub y: i32,
    pub theta: i32,
}

/// User navigation command. Targets are map-frame centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Send the closest robot to the target.
    Automatic { x: i32, y: i32 },
    /// Send a specific robot to the target.
    Manual { id: RobotId, x: i32, y: i32 },
}

/// Obstacle segment seen by the front camera.
///
/// `start_mm`/`width_mm` are lateral offsets and `distance_mm` the forward
/// distance to the segment. All zeros means nothing was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraReport {
    pub id: RobotId,
    pub start_mm: i32,
    pub width_mm: i32,
    pub distance_mm: i32,
}

impl CameraReport {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start_mm == 0 && self.width_mm == 0 && self.distance_mm == 0
    }
}

/// Request for the UI to supply a start pose for an unknown robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub id: RobotId,
}

/// Target displacement for a robot, in its own start-pose frame (mm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub id: RobotId,
    pub body_x_mm: i32,
    pub body_y_mm: i32,
}

/// Periodic update for the display.
///
/// Carries only the cells written since the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    /// Poses in registry index order.
    pub poses: Vec<RobotPose>,
    pub id_index: HashMap<RobotId, usize>,
    pub new_open: Vec<GridCell>,
    pub new_obstacle: Vec<GridCell>,
}

impl DisplaySnapshot {
    /// Whether the snapshot carries any map change.
    pub fn has_map_changes(&self) -> bool {
        !self.new_open.is_empty() || !self.new_obstacle.is_empty()
    }
}
