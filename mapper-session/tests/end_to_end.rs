//! A full run over the synthetic room with the voxel engine.

use mapper_capture::{SyntheticConfig, SyntheticSource};
use mapper_data::{CameraParameters, Frame, IncrementalMap, MapType};
use mapper_mapping::VoxelMappingEngine;
use mapper_session::{
    DisplaySink, FileExporter, ManualClock, Phase, RenderState, SessionConfig, SessionController,
};

struct Script {
    toggle_on: Vec<usize>,
    max_renders: usize,
    renders: usize,
    updates: usize,
}

impl DisplaySink for Script {
    fn render(&mut self, _frame: &Frame, _state: &RenderState) -> bool {
        let toggle = self.toggle_on.contains(&self.renders);
        self.renders += 1;
        toggle
    }

    fn chunks_ready(&self) -> bool {
        true
    }

    fn notify_chunks_updated(&mut self, _map: &IncrementalMap) {
        self.updates += 1;
    }

    fn clear_cached_mesh(&mut self) {}

    fn is_available(&self) -> bool {
        self.renders < self.max_renders
    }
}

fn synthetic() -> SyntheticSource {
    SyntheticSource::new(SyntheticConfig {
        width: 64,
        height: 48,
        realtime: false,
        ..SyntheticConfig::default()
    })
}

fn run(map_type: MapType, file_name: &str) -> String {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("mapping_data").join(file_name);

    let mut config = SessionConfig::default();
    config.output_path = output.clone();
    config.mapping.resolution_meters = 0.05;
    config.mapping.range_meters = 4.0;
    config.mapping.map_type = map_type;

    let source = synthetic();
    let calibration: CameraParameters = mapper_capture::FrameSource::calibration(&source);
    let engine = VoxelMappingEngine::new(calibration).with_pixel_stride(1);
    let display = Script {
        toggle_on: vec![5, 45],
        max_renders: 50,
        renders: 0,
        updates: 0,
    };
    let clock = ManualClock::new(0.0);

    let mut controller =
        SessionController::start(source, engine, display, FileExporter, clock.clone(), config)
            .unwrap();
    while controller.session().phase != Phase::Stopped {
        controller.tick();
        clock.advance(1.0 / 30.0);
    }

    let stats = controller.stats();
    assert_eq!(stats.finalizes, 1);
    assert_eq!(stats.export_failures, 0);
    assert!(stats.requests > 0);
    std::fs::read_to_string(&output).unwrap()
}

#[test]
fn test_synthetic_room_mesh_is_exported() {
    let obj = run(MapType::Mesh, "mesh_gen.obj");
    assert!(obj.lines().filter(|l| l.starts_with("v ")).count() > 100);
    assert!(obj.lines().any(|l| l.starts_with("f ")));
}

#[test]
fn test_synthetic_room_point_cloud_is_exported() {
    let ply = run(MapType::FusedPointCloud, "cloud.ply");
    assert!(ply.starts_with("ply"));
    assert!(!ply.contains("element face"));
}
