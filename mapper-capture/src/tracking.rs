//! Pose tracking shared by all frame sources.

use mapper_data::{TrackingState, Transform};

/// Turns raw device poses into tracked poses.
///
/// Handles enable/disable, re-anchoring on reset and the short search phase
/// a tracker goes through before it locks.
#[derive(Debug, Clone)]
pub struct PoseTracker {
    enabled: bool,
    /// Maps raw poses into the tracking frame.
    origin: Transform,
    last_raw: Transform,
    searching_frames: u32,
    frames_until_lock: u32,
}

impl PoseTracker {
    /// Tracker that reports `Searching` for `searching_frames` frames after enabling.
    pub fn new(searching_frames: u32) -> Self {
        Self {
            enabled: false,
            origin: Transform::IDENTITY,
            last_raw: Transform::IDENTITY,
            searching_frames,
            frames_until_lock: searching_frames,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        self.frames_until_lock = self.searching_frames;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Make the most recent raw pose map onto `transform`.
    pub fn reset(&mut self, transform: Transform) {
        self.origin = transform * self.last_raw.inverse();
    }

    /// Track one raw pose. `raw_state` is the device's own confidence.
    pub fn track(&mut self, raw: Transform, raw_state: TrackingState) -> (Transform, TrackingState) {
        self.last_raw = raw;
        if !self.enabled {
            return (Transform::IDENTITY, TrackingState::Off);
        }

        let pose = self.origin * raw;
        if self.frames_until_lock > 0 {
            self.frames_until_lock -= 1;
            return (pose, TrackingState::Searching);
        }
        (pose, raw_state)
    }
}

impl Default for PoseTracker {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_disabled_tracker_reports_off() {
        let mut tracker = PoseTracker::default();
        let raw = Transform::from_translation(Vec3::X);
        let (pose, state) = tracker.track(raw, TrackingState::Ok);
        assert_eq!(state, TrackingState::Off);
        assert_eq!(pose, Transform::IDENTITY);
    }

    #[test]
    fn test_searching_then_locked() {
        let mut tracker = PoseTracker::new(2);
        tracker.enable();
        let raw = Transform::IDENTITY;
        assert_eq!(tracker.track(raw, TrackingState::Ok).1, TrackingState::Searching);
        assert_eq!(tracker.track(raw, TrackingState::Ok).1, TrackingState::Searching);
        assert_eq!(tracker.track(raw, TrackingState::Ok).1, TrackingState::Ok);
    }

    #[test]
    fn test_reset_reanchors_current_pose() {
        let mut tracker = PoseTracker::new(0);
        tracker.enable();
        let raw = Transform::new(Quat::from_rotation_y(0.7), Vec3::new(1.0, 2.0, 3.0));
        tracker.track(raw, TrackingState::Ok);
        tracker.reset(Transform::IDENTITY);

        let (pose, _) = tracker.track(raw, TrackingState::Ok);
        assert!(pose.translation.length() < 1e-5);

        // Motion after the reset is preserved relative to the new origin.
        let moved = raw * Transform::from_translation(Vec3::new(0.0, 0.0, -1.0));
        let (pose, _) = tracker.track(moved, TrackingState::Ok);
        assert!((pose.translation - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-4);
    }
}
