//! Navigation command translation.
//!
//! A robot only knows its own start-pose frame (millimeters, relative to where
//! it was switched on). A map-frame target is therefore expressed relative to
//! the robot's origin pose, scaled cm → mm, and rotated back by the origin
//! heading. This is the inverse of the pose integration in the engine.

use crate::core::math::rotate;
use crate::core::types::{RobotId, RobotPose};
use crate::error::Result;
use crate::messages::{Command, DriveCommand};
use crate::registry::RobotRegistry;

/// Resolve the target robot of a command and convert its target into that
/// robot's body frame.
///
/// Fails with `NoRobotsRegistered` for an automatic command on an empty
/// registry and with `UnknownRobot` for a manual command naming an
/// unregistered robot.
pub fn translate_command(registry: &RobotRegistry, command: &Command) -> Result<DriveCommand> {
    let (id, x, y) = match *command {
        Command::Automatic { x, y } => (registry.find_closest(x, y)?, x, y),
        Command::Manual { id, x, y } => (id, x, y),
    };
    let pose = registry.get(id)?;
    Ok(drive_command_for(id, pose, x, y))
}

/// Body-frame displacement (mm) that takes a robot from its origin to the
/// map-frame target `(x, y)` (cm).
///
/// Computed in wide arithmetic; a displacement beyond the `i32` range
/// saturates instead of wrapping.
pub fn drive_command_for(id: RobotId, pose: &RobotPose, x: i32, y: i32) -> DriveCommand {
    let origin = pose.origin();
    let dx_mm = (x as i64 - origin.x as i64) * 10;
    let dy_mm = (y as i64 - origin.y as i64) * 10;
    let (body_x, body_y) = rotate(
        dx_mm as f64,
        dy_mm as f64,
        -(pose.origin_heading() as f64),
    );
    DriveCommand {
        id,
        body_x_mm: body_x as i32,
        body_y_mm: body_y as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FusionError;

    fn registry_with(robots: &[(RobotId, i32, i32, i32)]) -> RobotRegistry {
        let mut registry = RobotRegistry::new();
        for &(id, x, y, theta) in robots {
            registry.register(id, x, y, theta).unwrap();
        }
        registry
    }

    #[test]
    fn test_target_at_origin_is_zero() {
        let registry = registry_with(&[(3, 25, -40, 137)]);
        let cmd = translate_command(&registry, &Command::Manual { id: 3, x: 25, y: -40 }).unwrap();
        assert_eq!(
            cmd,
            DriveCommand {
                id: 3,
                body_x_mm: 0,
                body_y_mm: 0
            }
        );
    }

    #[test]
    fn test_heading_zero_scales_to_mm() {
        let registry = registry_with(&[(1, 10, 10, 0)]);
        let cmd = translate_command(&registry, &Command::Manual { id: 1, x: 15, y: 7 }).unwrap();
        assert_eq!((cmd.body_x_mm, cmd.body_y_mm), (50, -30));
    }

    #[test]
    fn test_heading_ninety_maps_plus_y_to_forward() {
        // Facing +Y: a target straight "up" the map is straight ahead
        let registry = registry_with(&[(1, 0, 0, 90)]);
        let cmd = translate_command(&registry, &Command::Manual { id: 1, x: 0, y: 20 }).unwrap();
        assert_eq!(cmd.body_x_mm, 200);
        assert!(cmd.body_y_mm.abs() <= 1);
    }

    #[test]
    fn test_uses_origin_not_current_pose() {
        let mut registry = registry_with(&[(1, 0, 0, 0)]);
        registry.update_pose(1, 50, 50, 45).unwrap();
        let cmd = translate_command(&registry, &Command::Manual { id: 1, x: 10, y: 0 }).unwrap();
        assert_eq!((cmd.body_x_mm, cmd.body_y_mm), (100, 0));
    }

    #[test]
    fn test_automatic_picks_closest() {
        let registry = registry_with(&[(1, 0, 0, 0), (2, 100, 100, 0)]);
        let cmd = translate_command(&registry, &Command::Automatic { x: 90, y: 95 }).unwrap();
        assert_eq!(cmd.id, 2);
        assert_eq!((cmd.body_x_mm, cmd.body_y_mm), (-100, -50));
    }

    #[test]
    fn test_far_targets_saturate() {
        let registry = registry_with(&[(1, -10, 0, 0), (2, 0, 0, i32::MIN)]);

        let cmd = translate_command(&registry, &Command::Automatic { x: i32::MAX, y: 0 }).unwrap();
        assert_eq!(cmd.id, 2);

        let cmd =
            translate_command(&registry, &Command::Manual { id: 1, x: 300_000_000, y: 0 }).unwrap();
        assert_eq!((cmd.body_x_mm, cmd.body_y_mm), (i32::MAX, 0));

        let cmd =
            translate_command(&registry, &Command::Manual { id: 1, x: i32::MIN, y: 0 }).unwrap();
        assert_eq!(cmd.body_x_mm, i32::MIN);
    }

    #[test]
    fn test_automatic_without_robots() {
        let registry = RobotRegistry::new();
        assert!(matches!(
            translate_command(&registry, &Command::Automatic { x: 0, y: 0 }),
            Err(FusionError::NoRobotsRegistered)
        ));
    }

    #[test]
    fn test_manual_unknown_robot() {
        let registry = registry_with(&[(1, 0, 0, 0)]);
        assert!(matches!(
            translate_command(&registry, &Command::Manual { id: 9, x: 0, y: 0 }),
            Err(FusionError::UnknownRobot(9))
        ));
    }
}
