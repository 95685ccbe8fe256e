//! Fusion engine: the single owner of the shared map and robot registry.
//!
//! Every inbound event is handled to completion by one `&mut self` call. The
//! engine never touches a channel; each entry point returns what should be
//! sent onwards and the fusion thread does the I/O.
//!
//! # Robot lifecycle
//!
//! ```text
//! Unknown ──first report──► Pending ──RegistrationInit──► Active
//!            (request sent)    │
//!                              └── further reports dropped
//! ```
//!
//! # Frames
//!
//! - Reported `x`/`y`/`theta` are relative to the robot's start pose (mm, deg).
//!   They are re-projected from the origin pose on every report, never
//!   accumulated.
//! - IR offsets are body-frame mm with +y to the right; they are flipped into
//!   the counter-clockwise convention, rotated by the current heading, and
//!   translated by the current position.

mod commands;

pub use commands::{drive_command_for, translate_command};

use std::path::Path;

use crate::config::{SamoohConfig, SensorConfig};
use crate::core::math::{rotate, rotate_truncated};
use crate::core::types::{MapPoint, RobotId, RobotPose};
use crate::error::Result;
use crate::grid::{CellCounts, OccupancyGrid};
use crate::io::{PositionLog, load_map, save_map};
use crate::messages::{
    COVARIANCE_LEN, CameraReport, Command, DisplaySnapshot, DriveCommand, RegistrationInit,
    SensorReport,
};
use crate::registry::RobotRegistry;

/// What happened to a sensor report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// First report from an unknown robot; a registration request must be sent.
    RegistrationRequested(RobotId),
    /// Robot is awaiting registration; the report was dropped.
    AwaitingRegistration(RobotId),
    /// Pose and map were updated.
    Integrated {
        pose_changed: bool,
        cells_open: usize,
        obstacles: usize,
    },
}

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FusionStats {
    pub reports_integrated: u64,
    pub reports_dropped: u64,
    pub registration_requests: u64,
    pub registrations: u64,
    pub commands_translated: u64,
    pub camera_segments: u64,
    pub positions_logged: u64,
}

/// Owner of the occupancy grid and robot registry.
#[derive(Debug)]
pub struct FusionEngine {
    grid: OccupancyGrid,
    registry: RobotRegistry,
    sensor: SensorConfig,
    position_log: Option<PositionLog>,
    stats: FusionStats,
}

impl FusionEngine {
    /// Empty map and registry sized from the configuration.
    pub fn new(config: &SamoohConfig) -> Self {
        let grid = OccupancyGrid::new(config.map.size, config.map.center_x, config.map.center_y);
        Self::from_parts(grid, RobotRegistry::new(), config)
    }

    /// Engine around an existing grid and registry.
    pub fn from_parts(grid: OccupancyGrid, registry: RobotRegistry, config: &SamoohConfig) -> Self {
        Self {
            grid,
            registry,
            sensor: config.sensor.clone(),
            position_log: None,
            stats: FusionStats::default(),
        }
    }

    /// Resume from a saved map snapshot.
    ///
    /// The grid geometry comes from the file; sensor settings from `config`.
    pub fn from_map_file(path: impl AsRef<Path>, config: &SamoohConfig) -> Result<Self> {
        let path = path.as_ref();
        let (grid, registry) = load_map(path)?;

        let configured = (config.map.center_x, config.map.center_y);
        if grid.size() != config.map.size || grid.center() != configured {
            log::warn!(
                "Map {} is {} cells centered at {:?}, config says {} at ({}, {}); using the file",
                path.display(),
                grid.size(),
                grid.center(),
                config.map.size,
                config.map.center_x,
                config.map.center_y
            );
        }
        log::info!(
            "Loaded map {} with {} robot(s)",
            path.display(),
            registry.len()
        );
        Ok(Self::from_parts(grid, registry, config))
    }

    /// Attach a position log.
    pub fn with_position_log(mut self, log: PositionLog) -> Self {
        self.position_log = Some(log);
        self
    }

    // ========================================================================
    // Event handlers
    // ========================================================================

    /// Integrate a pose and IR report.
    pub fn handle_report(&mut self, report: &SensorReport) -> ReportOutcome {
        let id = report.id;

        if !self.registry.is_registered(id) {
            self.stats.reports_dropped += 1;
            return if self.registry.mark_pending(id) {
                self.stats.registration_requests += 1;
                log::info!("Robot {} is not registered, requesting registration", id);
                ReportOutcome::RegistrationRequested(id)
            } else {
                log::trace!("Dropping report from robot {} (registration pending)", id);
                ReportOutcome::AwaitingRegistration(id)
            };
        }

        let Ok(&previous) = self.registry.get(id) else {
            return ReportOutcome::AwaitingRegistration(id);
        };

        let pose = integrate_pose(&previous, report);
        if let Err(e) = self
            .registry
            .update_pose(id, pose.position.x, pose.position.y, pose.heading)
        {
            log::warn!("Pose update failed: {}", e);
        }

        let mut cells_open = 0;
        let mut obstacles = 0;
        for &(ir_x, ir_y) in &report.ir {
            let target = ir_to_map(&pose, ir_x, ir_y);
            let ray = self
                .grid
                .draw_ray(pose.position, target, self.sensor.ir_max_range);
            cells_open += ray.cells_open;
            if ray.obstacle.is_some() {
                obstacles += 1;
            }
        }

        let pose_changed = pose.position != previous.position || pose.heading != previous.heading;
        if pose_changed {
            self.log_position(id, &pose, report.covariance.as_ref());
        }

        self.stats.reports_integrated += 1;
        ReportOutcome::Integrated {
            pose_changed,
            cells_open,
            obstacles,
        }
    }

    /// Register a robot at its start pose. Returns the assigned index.
    pub fn handle_registration(&mut self, init: &RegistrationInit) -> Result<usize> {
        let index = self.registry.register(init.id, init.x, init.y, init.theta)?;
        self.stats.registrations += 1;
        log::info!(
            "Registered robot {} at ({}, {}) heading {} as index {}",
            init.id,
            init.x,
            init.y,
            init.theta,
            index
        );
        Ok(index)
    }

    /// Translate a navigation command into a drive command.
    pub fn handle_command(&mut self, command: &Command) -> Result<DriveCommand> {
        let drive = translate_command(&self.registry, command)?;
        self.stats.commands_translated += 1;
        log::info!(
            "Drive command for robot {}: body ({}, {}) mm",
            drive.id,
            drive.body_x_mm,
            drive.body_y_mm
        );
        Ok(drive)
    }

    /// Draw a camera-detected obstacle segment. Returns the number of cells
    /// marked as obstacle.
    ///
    /// Empty detections are ignored. Reports from robots that are not active
    /// fail with `UnknownRobot` and do not trigger a registration request.
    pub fn handle_camera(&mut self, report: &CameraReport) -> Result<usize> {
        if report.is_empty() {
            log::trace!("Empty camera report from robot {}", report.id);
            return Ok(0);
        }

        let pose = *self.registry.get(report.id)?;
        let (a, b) = camera_segment(&pose, report, self.sensor.camera_mount_offset_mm);
        let obstacles = self.grid.draw_segment(pose.position, a, b);
        self.stats.camera_segments += 1;
        log::debug!(
            "Camera segment from robot {}: {:?} -> {:?} ({} cells)",
            report.id,
            a,
            b,
            obstacles
        );
        Ok(obstacles)
    }

    /// Drain map deltas and copy the current poses for the display.
    pub fn snapshot(&mut self) -> DisplaySnapshot {
        let delta = self.grid.drain_deltas();
        DisplaySnapshot {
            poses: self.registry.poses().to_vec(),
            id_index: self.registry.id_index().clone(),
            new_open: delta.opened,
            new_obstacle: delta.obstructed,
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Save grid and registry.
    pub fn save_map(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        save_map(path, &self.grid, &self.registry)?;
        let counts = self.grid.count_by_state();
        log::info!(
            "Saved map to {} ({} open, {} obstacle cells, {} robots)",
            path.display(),
            counts.open,
            counts.obstacle,
            self.registry.len()
        );
        Ok(())
    }

    /// Flush the position log, if any.
    pub fn flush_log(&mut self) -> Result<()> {
        if let Some(log) = self.position_log.as_mut() {
            log.flush()?;
        }
        Ok(())
    }

    fn log_position(
        &mut self,
        id: RobotId,
        pose: &RobotPose,
        covariance: Option<&[f32; COVARIANCE_LEN]>,
    ) {
        let Some(log) = self.position_log.as_mut() else {
            return;
        };
        match log.record(id, pose, covariance) {
            Ok(()) => self.stats.positions_logged += 1,
            Err(e) => log::warn!("Failed to write position record: {}", e),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn registry(&self) -> &RobotRegistry {
        &self.registry
    }

    pub fn stats(&self) -> FusionStats {
        self.stats
    }

    pub fn cell_counts(&self) -> CellCounts {
        self.grid.count_by_state()
    }

    /// Current pose of a registered robot.
    pub fn pose(&self, id: RobotId) -> Result<RobotPose> {
        self.registry.get(id).copied()
    }

    pub fn ir_max_range(&self) -> f64 {
        self.sensor.ir_max_range
    }
}

/// Re-project a report from the robot's origin pose.
///
/// Positions saturate at the `i32` range and the heading is normalized to
/// `[0, 360)`, so no report value can overflow.
fn integrate_pose(previous: &RobotPose, report: &SensorReport) -> RobotPose {
    let origin = previous.origin();
    let (dx, dy) = rotate_truncated(report.x / 10, report.y / 10, previous.origin_heading());

    let mut pose = *previous;
    pose.position = MapPoint::new(origin.x.saturating_add(dx), origin.y.saturating_add(dy));
    pose.heading = normalize_heading(report.theta as i64 + previous.origin_heading() as i64);
    pose
}

/// Wrap a heading into `[0, 360)`.
#[inline]
fn normalize_heading(degrees: i64) -> i32 {
    degrees.rem_euclid(360) as i32
}

/// Body-frame IR offset (mm, +y right) to map point (cm).
fn ir_to_map(pose: &RobotPose, ir_x: i32, ir_y: i32) -> MapPoint {
    let (rx, ry) = rotate(ir_x as f64, -(ir_y as f64), pose.heading as f64);
    MapPoint::new(
        pose.position.x.saturating_add((rx / 10.0).round() as i32),
        pose.position.y.saturating_add((ry / 10.0).round() as i32),
    )
}

/// Camera segment endpoints in the map frame (cm).
///
/// The camera frame has x lateral (to the right) and y forward, so it lines up
/// with the map at heading 90°.
fn camera_segment(
    pose: &RobotPose,
    report: &CameraReport,
    mount_offset_mm: i32,
) -> (MapPoint, MapPoint) {
    let distance_cm = (report.distance_mm as i64 + mount_offset_mm as i64) / 10;
    let start_cm = report.start_mm as i64 / 10;
    let end_cm = (report.start_mm as i64 + report.width_mm as i64) / 10;
    let rotation = pose.heading as f64 - 90.0;

    let to_map = |lateral_cm: i64| {
        let (x, y) = rotate(lateral_cm as f64, distance_cm as f64, rotation);
        MapPoint::new(
            pose.position.x.saturating_add(x.round() as i32),
            pose.position.y.saturating_add(y.round() as i32),
        )
    };
    (to_map(start_cm), to_map(end_cm))
}
