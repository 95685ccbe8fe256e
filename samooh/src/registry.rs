//! Robot registry: per-robot pose state keyed by hardware identifier.
//!
//! Poses live in a dense array; a map from robot id to array index gives O(1)
//! lookup. Index assignment is monotonic and stable, so display consumers can
//! correlate array positions with ids through the same map.
//!
//! A separate pending set tracks ids that have reported but are not yet
//! registered, so each unknown robot triggers at most one registration request.

use std::collections::{HashMap, HashSet};

use crate::core::types::{MapPoint, RobotId, RobotPose};
use crate::error::{FusionError, Result};

/// Registry of all robots known to the fusion core.
#[derive(Debug, Clone, Default)]
pub struct RobotRegistry {
    poses: Vec<RobotPose>,
    id_index: HashMap<RobotId, usize>,
    pending: HashSet<RobotId>,
}

impl RobotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from `(id, pose)` pairs in index order.
    pub fn from_poses(entries: Vec<(RobotId, RobotPose)>) -> Result<Self> {
        let mut registry = Self::new();
        for (id, pose) in entries {
            if registry.id_index.contains_key(&id) {
                return Err(FusionError::DuplicateRegistration(id));
            }
            registry.id_index.insert(id, registry.poses.len());
            registry.poses.push(pose);
        }
        Ok(registry)
    }

    /// Register a robot at its origin pose and return its index.
    ///
    /// Clears the pending mark for `id`.
    pub fn register(&mut self, id: RobotId, x: i32, y: i32, theta: i32) -> Result<usize> {
        if self.id_index.contains_key(&id) {
            return Err(FusionError::DuplicateRegistration(id));
        }

        let index = self.poses.len();
        self.poses.push(RobotPose::new(x, y, theta));
        self.id_index.insert(id, index);
        self.pending.remove(&id);
        Ok(index)
    }

    /// Overwrite the current pose of a registered robot.
    pub fn update_pose(&mut self, id: RobotId, x: i32, y: i32, theta: i32) -> Result<()> {
        let index = self.index_of(id)?;
        let pose = &mut self.poses[index];
        pose.position = MapPoint::new(x, y);
        pose.heading = theta;
        Ok(())
    }

    /// Get the pose of a registered robot.
    pub fn get(&self, id: RobotId) -> Result<&RobotPose> {
        let index = self.index_of(id)?;
        Ok(&self.poses[index])
    }

    /// Dense index assigned to `id`.
    pub fn index_of(&self, id: RobotId) -> Result<usize> {
        self.id_index
            .get(&id)
            .copied()
            .ok_or(FusionError::UnknownRobot(id))
    }

    /// Find the robot closest to `(x, y)`.
    ///
    /// Distances are compared exactly (squared integer distance); on a tie the
    /// lowest id wins.
    pub fn find_closest(&self, x: i32, y: i32) -> Result<RobotId> {
        let target = MapPoint::new(x, y);

        self.id_index
            .iter()
            .map(|(&id, &index)| (self.poses[index].position.distance_squared(&target), id))
            .min()
            .map(|(_, id)| id)
            .ok_or(FusionError::NoRobotsRegistered)
    }

    /// Mark `id` as awaiting registration.
    ///
    /// Returns `true` if the mark is new, `false` if the id was already
    /// pending or is registered.
    pub fn mark_pending(&mut self, id: RobotId) -> bool {
        if self.id_index.contains_key(&id) {
            return false;
        }
        self.pending.insert(id)
    }

    #[inline]
    pub fn is_pending(&self, id: RobotId) -> bool {
        self.pending.contains(&id)
    }

    #[inline]
    pub fn is_registered(&self, id: RobotId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Number of registered robots.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Poses in index order.
    pub fn poses(&self) -> &[RobotPose] {
        &self.poses
    }

    /// Robot id to pose index.
    pub fn id_index(&self) -> &HashMap<RobotId, usize> {
        &self.id_index
    }

    /// `(id, pose)` pairs in index order.
    pub fn entries(&self) -> Vec<(RobotId, RobotPose)> {
        let mut entries: Vec<(usize, RobotId)> =
            self.id_index.iter().map(|(&id, &index)| (index, id)).collect();
        entries.sort_unstable();
        entries
            .into_iter()
            .map(|(index, id)| (id, self.poses[index]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_monotonic_indices() {
        let mut registry = RobotRegistry::new();
        assert_eq!(registry.register(7, 0, 0, 90).unwrap(), 0);
        assert_eq!(registry.register(3, 10, 10, 0).unwrap(), 1);
        assert_eq!(registry.register(42, -5, 5, 180).unwrap(), 2);

        assert_eq!(registry.index_of(7).unwrap(), 0);
        assert_eq!(registry.index_of(3).unwrap(), 1);
        assert_eq!(registry.index_of(42).unwrap(), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let mut registry = RobotRegistry::new();
        registry.register(1, 0, 0, 0).unwrap();
        assert!(matches!(
            registry.register(1, 5, 5, 5),
            Err(FusionError::DuplicateRegistration(1))
        ));
        // Original pose untouched
        assert_eq!(registry.get(1).unwrap().origin(), MapPoint::ORIGIN);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_pose_keeps_origin() {
        let mut registry = RobotRegistry::new();
        registry.register(5, 10, 20, 90).unwrap();
        registry.update_pose(5, 15, 25, 100).unwrap();

        let pose = registry.get(5).unwrap();
        assert_eq!(pose.position, MapPoint::new(15, 25));
        assert_eq!(pose.heading, 100);
        assert_eq!(pose.origin(), MapPoint::new(10, 20));
        assert_eq!(pose.origin_heading(), 90);
    }

    #[test]
    fn test_unknown_robot() {
        let mut registry = RobotRegistry::new();
        assert!(matches!(registry.get(9), Err(FusionError::UnknownRobot(9))));
        assert!(matches!(
            registry.update_pose(9, 0, 0, 0),
            Err(FusionError::UnknownRobot(9))
        ));
    }

    #[test]
    fn test_find_closest() {
        let mut registry = RobotRegistry::new();
        registry.register(1, 0, 0, 90).unwrap();
        registry.register(2, 100, 100, 90).unwrap();

        assert_eq!(registry.find_closest(1, 1).unwrap(), 1);
        assert_eq!(registry.find_closest(90, 80).unwrap(), 2);
    }

    #[test]
    fn test_find_closest_uses_current_position() {
        let mut registry = RobotRegistry::new();
        registry.register(1, 0, 0, 90).unwrap();
        registry.register(2, 100, 100, 90).unwrap();
        registry.update_pose(2, 2, 2, 90).unwrap();

        assert_eq!(registry.find_closest(3, 3).unwrap(), 2);
    }

    #[test]
    fn test_find_closest_tie_lowest_id() {
        let mut registry = RobotRegistry::new();
        registry.register(9, 10, 0, 0).unwrap();
        registry.register(4, -10, 0, 0).unwrap();
        registry.register(6, 0, 10, 0).unwrap();

        assert_eq!(registry.find_closest(0, 0).unwrap(), 4);
    }

    #[test]
    fn test_find_closest_empty() {
        let registry = RobotRegistry::new();
        assert!(matches!(
            registry.find_closest(0, 0),
            Err(FusionError::NoRobotsRegistered)
        ));
    }

    #[test]
    fn test_pending_lifecycle() {
        let mut registry = RobotRegistry::new();
        assert!(registry.mark_pending(8));
        assert!(!registry.mark_pending(8));
        assert!(registry.is_pending(8));
        assert!(!registry.is_registered(8));

        registry.register(8, 0, 0, 0).unwrap();
        assert!(!registry.is_pending(8));
        assert!(registry.is_registered(8));
        assert!(!registry.mark_pending(8));
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_entries_in_index_order() {
        let mut registry = RobotRegistry::new();
        registry.register(30, 0, 0, 0).unwrap();
        registry.register(10, 1, 1, 0).unwrap();
        registry.register(20, 2, 2, 0).unwrap();

        let ids: Vec<_> = registry.entries().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![30, 10, 20]);

        let rebuilt = RobotRegistry::from_poses(registry.entries()).unwrap();
        assert_eq!(rebuilt.index_of(10).unwrap(), 1);
        assert_eq!(rebuilt.poses(), registry.poses());
    }
}
