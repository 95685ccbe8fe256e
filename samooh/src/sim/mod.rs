//! Simulated robots for exercising the fusion core without hardware.
//!
//! Each robot random-walks inside a square room centered on the map origin and
//! reports what a real robot would: its odometry relative to where it started
//! (mm, degrees) and four IR offsets in its body frame (+x forward, +y right).
//! The true start pose is what the UI would enter when registering the robot.

use rand::Rng;
use std::f64::consts::PI;

use crate::core::math::rotate;
use crate::core::types::RobotId;
use crate::messages::{CameraReport, RegistrationInit, SensorReport};

/// IR offset reported when nothing is within range (mm).
pub const NOTHING_SEEN_MM: i32 = 1000;

/// Simulation parameters.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Half the side length of the square room (cm).
    pub room_half_cm: f64,
    /// Distance travelled per step (mm).
    pub speed_mm: f64,
    /// Steps between random direction changes.
    pub steps_per_turn: u32,
    /// Longest IR reading a sensor reports as a hit (mm).
    pub ir_range_mm: f64,
    /// Longest camera detection distance (mm).
    pub camera_range_mm: f64,
    /// Steer back toward the center beyond this fraction of the room.
    pub edge_fraction: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            room_half_cm: 150.0,
            speed_mm: 30.0,
            steps_per_turn: 40,
            ir_range_mm: 500.0,
            camera_range_mm: 400.0,
            edge_fraction: 0.75,
        }
    }
}

/// One simulated robot.
#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    id: RobotId,
    /// Start pose in the map frame (cm, deg).
    start: (i32, i32, i32),
    /// True position in the map frame (mm).
    x_mm: f64,
    y_mm: f64,
    /// True heading in the map frame (deg).
    heading_deg: f64,
    steps: u32,
    config: SimConfig,
}

impl SimulatedRobot {
    /// Robot standing at map pose `(x_cm, y_cm, theta_deg)`.
    pub fn new(id: RobotId, x_cm: i32, y_cm: i32, theta_deg: i32, config: SimConfig) -> Self {
        Self {
            id,
            start: (x_cm, y_cm, theta_deg),
            x_mm: x_cm as f64 * 10.0,
            y_mm: y_cm as f64 * 10.0,
            heading_deg: theta_deg as f64,
            steps: 0,
            config,
        }
    }

    /// Robot at a random pose inside the central part of the room.
    pub fn random<R: Rng>(id: RobotId, config: SimConfig, rng: &mut R) -> Self {
        let limit = (config.room_half_cm * 0.5) as i32;
        let x = rng.gen_range(-limit..=limit);
        let y = rng.gen_range(-limit..=limit);
        let theta = rng.gen_range(-180..180);
        Self::new(id, x, y, theta, config)
    }

    pub fn id(&self) -> RobotId {
        self.id
    }

    /// Registration answer carrying the true start pose.
    pub fn registration(&self) -> RegistrationInit {
        let (x, y, theta) = self.start;
        RegistrationInit {
            id: self.id,
            x,
            y,
            theta,
        }
    }

    /// True map position (cm, truncated) and heading (deg, rounded).
    pub fn true_pose(&self) -> (i32, i32, i32) {
        (
            (self.x_mm / 10.0) as i32,
            (self.y_mm / 10.0) as i32,
            self.heading_deg.round() as i32,
        )
    }

    /// Advance one step, turning first when it is time to.
    pub fn step<R: Rng>(&mut self, rng: &mut R) {
        if self.steps % self.config.steps_per_turn.max(1) == 0 {
            self.choose_direction(rng);
        }
        self.steps += 1;

        let (dx, dy) = rotate(self.config.speed_mm, 0.0, self.heading_deg);
        let wall_mm = self.config.room_half_cm * 10.0;
        self.x_mm = (self.x_mm + dx).clamp(-wall_mm, wall_mm);
        self.y_mm = (self.y_mm + dy).clamp(-wall_mm, wall_mm);
    }

    fn choose_direction<R: Rng>(&mut self, rng: &mut R) {
        let edge_mm = self.config.room_half_cm * 10.0 * self.config.edge_fraction;
        let angle = if self.x_mm.abs() > edge_mm || self.y_mm.abs() > edge_mm {
            (-self.y_mm).atan2(-self.x_mm)
        } else {
            rng.gen_range(-PI..PI)
        };
        self.heading_deg = angle.to_degrees();
    }

    /// Odometry and IR report as the robot would send it.
    pub fn report(&self) -> SensorReport {
        let (start_x, start_y, start_theta) = self.start;

        // Odometry is relative to the start pose, in the start heading's frame
        let (odo_x, odo_y) = rotate(
            self.x_mm - start_x as f64 * 10.0,
            self.y_mm - start_y as f64 * 10.0,
            -(start_theta as f64),
        );
        let theta = (self.heading_deg - start_theta as f64).round() as i32;

        let range = self.config.ir_range_mm;
        let ir = [
            self.ir_offset(0.0, range, |d| (d, 0)),
            self.ir_offset(180.0, range, |d| (-d, 0)),
            self.ir_offset(-90.0, range, |d| (0, d)),
            self.ir_offset(90.0, range, |d| (0, -d)),
        ];

        SensorReport::new(self.id, odo_x.round() as i32, odo_y.round() as i32, theta, ir)
    }

    /// Camera detection of the wall straight ahead, if close enough.
    pub fn camera_report(&self) -> Option<CameraReport> {
        let distance = self.wall_distance_mm(self.heading_deg)?;
        if distance > self.config.camera_range_mm {
            return None;
        }
        Some(CameraReport {
            id: self.id,
            start_mm: -50,
            width_mm: 100,
            distance_mm: distance.round() as i32,
        })
    }

    /// Body-frame IR offset for a sensor pointing `bearing_deg` from forward
    /// (counter-clockwise).
    fn ir_offset(
        &self,
        bearing_deg: f64,
        range_mm: f64,
        axis: impl Fn(i32) -> (i32, i32),
    ) -> (i32, i32) {
        match self.wall_distance_mm(self.heading_deg + bearing_deg) {
            Some(d) if d < range_mm => axis(d.round() as i32),
            _ => axis(NOTHING_SEEN_MM),
        }
    }

    /// Distance to the room wall along map direction `direction_deg` (mm).
    fn wall_distance_mm(&self, direction_deg: f64) -> Option<f64> {
        let wall = self.config.room_half_cm * 10.0;
        let (dx, dy) = rotate(1.0, 0.0, direction_deg);

        let along = |position: f64, delta: f64| -> Option<f64> {
            if delta > 1e-9 {
                Some((wall - position) / delta)
            } else if delta < -1e-9 {
                Some((-wall - position) / delta)
            } else {
                None
            }
        };

        match (along(self.x_mm, dx), along(self.y_mm, dy)) {
            (Some(tx), Some(ty)) => Some(tx.min(ty)),
            (Some(t), None) | (None, Some(t)) => Some(t),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamoohConfig;
    use crate::engine::FusionEngine;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_report_at_start_is_zero() {
        let robot = SimulatedRobot::new(1, 20, -30, 45, SimConfig::default());
        let report = robot.report();
        assert_eq!((report.x, report.y, report.theta), (0, 0, 0));
    }

    #[test]
    fn test_ir_sees_near_wall() {
        // Facing +X, 30 cm from the east wall
        let robot = SimulatedRobot::new(1, 120, 0, 0, SimConfig::default());
        let report = robot.report();
        assert_eq!(report.ir[0], (300, 0));
        assert_eq!(report.ir[1], (-NOTHING_SEEN_MM, 0));
    }

    #[test]
    fn test_ir_right_side_is_positive_y() {
        // Facing +Y with the east wall 20 cm to the right
        let robot = SimulatedRobot::new(1, 130, 0, 90, SimConfig::default());
        let report = robot.report();
        assert_eq!(report.ir[2], (0, 200));
    }

    #[test]
    fn test_stays_in_room() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = SimConfig::default();
        let wall = config.room_half_cm as i32;
        let mut robot = SimulatedRobot::random(1, config, &mut rng);

        for _ in 0..2000 {
            robot.step(&mut rng);
            let (x, y, _) = robot.true_pose();
            assert!(x.abs() <= wall && y.abs() <= wall);
        }
    }

    #[test]
    fn test_engine_tracks_true_pose() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut robot = SimulatedRobot::random(5, SimConfig::default(), &mut rng);
        let mut engine = FusionEngine::new(&SamoohConfig::default());
        engine.handle_registration(&robot.registration()).unwrap();

        for _ in 0..300 {
            robot.step(&mut rng);
            engine.handle_report(&robot.report());

            let (x, y, theta) = robot.true_pose();
            let pose = engine.pose(5).unwrap();
            // mm to cm truncation before and after the rotation, plus in true_pose
            assert!((pose.position.x - x).abs() <= 3, "{:?} vs {:?}", pose, (x, y));
            assert!((pose.position.y - y).abs() <= 3, "{:?} vs {:?}", pose, (x, y));
            let heading_error = (pose.heading - theta).rem_euclid(360);
            assert!(heading_error <= 1 || heading_error >= 359);
        }
    }

    #[test]
    fn test_camera_sees_wall_ahead() {
        let robot = SimulatedRobot::new(2, 0, 120, 90, SimConfig::default());
        let camera = robot.camera_report().unwrap();
        assert_eq!(camera.distance_mm, 300);

        let far = SimulatedRobot::new(2, 0, 0, 90, SimConfig::default());
        assert!(far.camera_report().is_none());
    }
}
