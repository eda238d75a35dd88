//! The user-facing side of a session.

use crate::session::Phase;
use mapper_data::{
    CameraParameters, Frame, IncrementalMap, MapType, MappingState, TrackingState, Transform,
};

/// Status shown alongside each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub pose: Transform,
    pub tracking_state: TrackingState,
    pub mapping_state: MappingState,
    pub phase: Phase,
}

/// Shows frames and the growing map, and collects user input.
pub trait DisplaySink {
    /// Called once before the first frame.
    fn init(&mut self, _calibration: &CameraParameters, _map_type: MapType) {}

    /// Draw `frame`. Returns `true` when the user asked to toggle mapping.
    fn render(&mut self, frame: &Frame, state: &RenderState) -> bool;

    /// Whether the display has consumed the previous map update.
    fn chunks_ready(&self) -> bool;

    /// Chunks flagged `updated` in `map` changed since the last call.
    fn notify_chunks_updated(&mut self, map: &IncrementalMap);

    /// Drop any cached map geometry.
    fn clear_cached_mesh(&mut self);

    /// `false` once the user closed the display.
    fn is_available(&self) -> bool;
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn init(&mut self, calibration: &CameraParameters, map_type: MapType) {
        (**self).init(calibration, map_type)
    }

    fn render(&mut self, frame: &Frame, state: &RenderState) -> bool {
        (**self).render(frame, state)
    }

    fn chunks_ready(&self) -> bool {
        (**self).chunks_ready()
    }

    fn notify_chunks_updated(&mut self, map: &IncrementalMap) {
        (**self).notify_chunks_updated(map)
    }

    fn clear_cached_mesh(&mut self) {
        (**self).clear_cached_mesh()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
