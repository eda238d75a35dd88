//! A procedurally rendered room for running the mapper without a camera.
//!
//! The camera orbits inside a box-shaped room containing a sphere. Color
//! and depth are ray cast on the CPU, so the output is exact and repeatable.

use crate::source::{CaptureError, FrameSource};
use crate::tracking::PoseTracker;
use glam::Vec3;
use image::{Rgb, RgbImage};
use mapper_data::{CameraParameters, DepthMap, Frame, TrackingState, Transform};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Settings for [`SyntheticSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    pub horizontal_fov: f32,
    /// Orbit radius around the room center, meters.
    pub orbit_radius: f32,
    /// Orbit angular speed, radians per second of stream time.
    pub orbit_speed: f32,
    pub camera_height: f32,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
    /// Sleep so frames arrive at `fps`.
    pub realtime: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            fps: 30.0,
            horizontal_fov: 90.0,
            orbit_radius: 1.0,
            orbit_speed: 0.4,
            camera_height: 1.2,
            max_frames: None,
            realtime: true,
        }
    }
}

const ROOM_MIN: Vec3 = Vec3::new(-2.0, 0.0, -2.0);
const ROOM_MAX: Vec3 = Vec3::new(2.0, 2.5, 2.0);
const SPHERE_CENTER: Vec3 = Vec3::new(0.0, 0.5, 0.0);
const SPHERE_RADIUS: f32 = 0.5;

/// Frame source rendering the synthetic room.
pub struct SyntheticSource {
    config: SyntheticConfig,
    calibration: CameraParameters,
    tracker: PoseTracker,
    frame_count: u64,
    next_due: Option<Instant>,
    active: bool,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let calibration =
            CameraParameters::from_horizontal_fov(config.width, config.height, config.horizontal_fov);
        info!(
            "Synthetic room: {}x{} @ {} fps",
            config.width, config.height, config.fps
        );
        Self {
            config,
            calibration,
            tracker: PoseTracker::default(),
            frame_count: 0,
            next_due: None,
            active: true,
        }
    }

    /// Ground-truth camera pose at stream time `t`.
    pub fn pose_at(&self, t: f64) -> Transform {
        let angle = (t as f32) * self.config.orbit_speed;
        let eye = Vec3::new(
            angle.cos() * self.config.orbit_radius,
            self.config.camera_height,
            angle.sin() * self.config.orbit_radius,
        );
        // Look outwards at the walls, slightly down.
        let target = eye + Vec3::new(angle.cos(), -0.35, angle.sin());
        Transform::looking_at(eye, target)
    }

    /// Ray cast color and depth for the camera at `pose`.
    pub fn render(&self, pose: &Transform) -> (RgbImage, DepthMap) {
        let (w, h) = (self.config.width, self.config.height);
        let mut image = RgbImage::new(w, h);
        let mut depth = Vec::with_capacity((w * h) as usize);

        for v in 0..h {
            for u in 0..w {
                // Ray with unit z-depth, so the hit parameter is the z-depth.
                let dir_cam = self.calibration.unproject(u as f32 + 0.5, v as f32 + 0.5, 1.0);
                let dir = pose.rotation * dir_cam;
                let (t, color) = cast(pose.translation, dir);
                image.put_pixel(u, v, color);
                depth.push(t);
            }
        }

        let depth = DepthMap::from_raw(w, h, depth).unwrap_or_else(|| DepthMap::filled(w, h, 0.0));
        (image, depth)
    }

    fn pace(&mut self) {
        if !self.config.realtime || self.config.fps <= 0.0 {
            return;
        }
        let period = Duration::from_secs_f32(1.0 / self.config.fps);
        let now = Instant::now();
        let due = self.next_due.unwrap_or(now);
        if due > now {
            std::thread::sleep(due - now);
        }
        self.next_due = Some(due.max(now) + period);
    }
}

/// Nearest hit of a ray starting inside the room.
fn cast(origin: Vec3, dir: Vec3) -> (f32, Rgb<u8>) {
    let (mut t_hit, mut color) = room_hit(origin, dir);

    let oc = origin - SPHERE_CENTER;
    let a = dir.length_squared();
    let b = 2.0 * dir.dot(oc);
    let c = oc.length_squared() - SPHERE_RADIUS * SPHERE_RADIUS;
    let disc = b * b - 4.0 * a * c;
    if disc >= 0.0 {
        let t = (-b - disc.sqrt()) / (2.0 * a);
        if t > 0.0 && t < t_hit {
            t_hit = t;
            let normal = (origin + dir * t - SPHERE_CENTER).normalize_or_zero();
            let shade = 0.4 + 0.6 * normal.y.max(0.0);
            color = Rgb([(220.0 * shade) as u8, (120.0 * shade) as u8, (40.0 * shade) as u8]);
        }
    }
    (t_hit, color)
}

fn room_hit(origin: Vec3, dir: Vec3) -> (f32, Rgb<u8>) {
    let mut best = (f32::MAX, 0usize, false);
    for axis in 0..3 {
        let d = dir[axis];
        if d.abs() < 1e-9 {
            continue;
        }
        let positive = d > 0.0;
        let bound = if positive { ROOM_MAX[axis] } else { ROOM_MIN[axis] };
        let t = (bound - origin[axis]) / d;
        if t > 0.0 && t < best.0 {
            best = (t, axis, positive);
        }
    }

    let (t, axis, positive) = best;
    let p = origin + dir * t;
    // Quarter-meter checker keeps surfaces textured for the texture pass.
    let checker = ((p.x * 4.0).floor() + (p.y * 4.0).floor() + (p.z * 4.0).floor()) as i32 & 1 == 0;
    let base = match (axis, positive) {
        (1, false) => [150, 150, 150],
        (1, true) => [235, 235, 225],
        (0, _) => [70, 130, 180],
        _ => [120, 170, 90],
    };
    let k = if checker { 1.0 } else { 0.75 };
    let color = Rgb(base.map(|c: u8| (c as f32 * k) as u8));
    (t, color)
}

impl FrameSource for SyntheticSource {
    fn pull(&mut self) -> Result<Option<Frame>, CaptureError> {
        if !self.active {
            return Ok(None);
        }
        if self
            .config
            .max_frames
            .is_some_and(|max| self.frame_count >= max)
        {
            info!("Synthetic stream finished after {} frames", self.frame_count);
            self.active = false;
            return Ok(None);
        }
        self.pace();

        let timestamp = self.frame_count as f64 / self.config.fps.max(1.0) as f64;
        let truth = self.pose_at(timestamp);
        let (image, depth) = self.render(&truth);
        let (pose, tracking_state) = self.tracker.track(truth, TrackingState::Ok);

        let frame_number = self.frame_count;
        self.frame_count += 1;
        debug!("Rendered synthetic frame {} at {:.3}s", frame_number, timestamp);

        Ok(Some(
            Frame::new(image, pose, tracking_state, timestamp, frame_number).with_depth(depth),
        ))
    }

    fn calibration(&self) -> CameraParameters {
        self.calibration
    }

    fn enable_pose_tracking(&mut self) -> Result<(), CaptureError> {
        self.tracker.enable();
        Ok(())
    }

    fn disable_pose_tracking(&mut self) {
        self.tracker.disable();
    }

    fn reset_pose(&mut self, transform: Transform) {
        self.tracker.reset(transform);
    }

    fn frame_rate(&self) -> Option<f32> {
        Some(self.config.fps)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn close(&mut self) {
        self.active = false;
        info!("Synthetic source closed after {} frames", self.frame_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline(max_frames: Option<u64>) -> SyntheticSource {
        SyntheticSource::new(SyntheticConfig {
            width: 32,
            height: 24,
            realtime: false,
            max_frames,
            ..SyntheticConfig::default()
        })
    }

    #[test]
    fn test_every_pixel_hits_the_room() {
        let source = offline(None);
        let (_, depth) = source.render(&source.pose_at(0.0));
        assert_eq!(depth.valid_count(), 32 * 24);
        for v in 0..24 {
            for u in 0..32 {
                assert!(depth.get(u, v).unwrap() < 6.0);
            }
        }
    }

    #[test]
    fn test_depth_backprojects_onto_room_surfaces() {
        let source = offline(None);
        let pose = source.pose_at(1.0);
        let (_, depth) = source.render(&pose);
        let calib = source.calibration();

        let d = depth.get(16, 12).unwrap();
        let world = pose.transform_point(calib.unproject(16.5, 12.5, d));
        let on_wall = (0..3).any(|a| {
            (world[a] - ROOM_MIN[a]).abs() < 1e-3 || (world[a] - ROOM_MAX[a]).abs() < 1e-3
        });
        let on_sphere = ((world - SPHERE_CENTER).length() - SPHERE_RADIUS).abs() < 1e-3;
        assert!(on_wall || on_sphere);
    }

    #[test]
    fn test_stream_stops_at_max_frames() {
        let mut source = offline(Some(2));
        source.enable_pose_tracking().unwrap();
        assert!(source.pull().unwrap().is_some());
        assert!(source.pull().unwrap().is_some());
        assert!(source.pull().unwrap().is_none());
        assert!(!source.is_active());
    }

    #[test]
    fn test_tracking_locks_after_search() {
        let mut source = offline(None);
        source.enable_pose_tracking().unwrap();
        let states: Vec<TrackingState> = (0..5)
            .map(|_| source.pull().unwrap().unwrap().tracking_state)
            .collect();
        assert_eq!(states[0], TrackingState::Searching);
        assert_eq!(states[4], TrackingState::Ok);
    }
}
