//! Spatial Mapper
//!
//! Tracks a camera, incrementally reconstructs the scene while mapping is
//! toggled on, and writes the finished mesh or point cloud to disk.
//!
//! Input comes from a recorded sequence (positional path), a live webcam
//! (`webcam` feature) or a synthetic room (`--synthetic`).

mod app;
mod display;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Spatial Mapper - incremental 3D reconstruction from a tracked camera
#[derive(Parser, Debug)]
#[command(name = "mapper")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Recorded sequence (directory or sequence.json). Live capture if omitted.
    pub input: Option<PathBuf>,

    /// Use the synthetic room instead of a camera
    #[arg(long)]
    pub synthetic: bool,

    /// Live camera device index
    #[arg(long, default_value_t = 0)]
    pub device: u32,

    /// Live camera resolution
    #[arg(long, value_enum, default_value_t = ResolutionArg::Hd1080)]
    pub camera_resolution: ResolutionArg,

    /// Session config file (JSON); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Voxel size in meters [default: 0.025]
    #[arg(long)]
    pub resolution: Option<f32>,

    /// Maximum depth integrated, in meters [default: 2.0]
    #[arg(long)]
    pub range: Option<f32>,

    /// Seconds between map retrievals [default: 1.5]
    #[arg(long)]
    pub period: Option<f64>,

    /// Minimum seconds between update requests [default: 0.5]
    #[arg(long)]
    pub request_interval: Option<f64>,

    /// Record keyframes and texture the final mesh
    #[arg(long)]
    pub save_texture: bool,

    /// Kind of map to build [default: mesh]
    #[arg(long, value_enum)]
    pub map_type: Option<MapTypeArg>,

    /// Where the finished map is written (.obj or .ply) [default: mapping_data/mesh_gen.obj]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// How frames are shown and mapping is toggled
    #[arg(long, value_enum, default_value_t = DisplayKind::Terminal)]
    pub display: DisplayKind,

    /// Frames at which the scripted display toggles mapping
    #[arg(long, value_delimiter = ',')]
    pub toggle_at: Vec<u64>,

    /// Stop the scripted display after this many frames
    #[arg(long, required_if_eq("display", "scripted"))]
    pub max_frames: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Stream spans to Tracy (requires the `tracy` feature)
    #[arg(long)]
    pub tracy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MapTypeArg {
    Mesh,
    PointCloud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisplayKind {
    Terminal,
    Scripted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResolutionArg {
    Hd2k,
    Hd1080,
    Hd720,
    Vga,
}

fn main() {
    let args = Args::parse();

    app::init_logging(&app::LoggingConfig {
        level: args.log_level.clone(),
        enable_tracy: args.tracy,
    });

    if let Err(e) = app::run(args) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["mapper"]).unwrap();
        assert!(args.input.is_none());
        assert!(!args.synthetic);
        assert_eq!(args.display, DisplayKind::Terminal);
        assert_eq!(args.camera_resolution, ResolutionArg::Hd1080);
        assert!(args.resolution.is_none());
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_scripted_run_flags() {
        let args = Args::try_parse_from([
            "mapper",
            "recordings/room",
            "--display",
            "scripted",
            "--toggle-at",
            "10,200",
            "--max-frames",
            "250",
            "--map-type",
            "point-cloud",
            "--resolution",
            "0.05",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("recordings/room")));
        assert_eq!(args.display, DisplayKind::Scripted);
        assert_eq!(args.toggle_at, vec![10, 200]);
        assert_eq!(args.max_frames, Some(250));
        assert_eq!(args.map_type, Some(MapTypeArg::PointCloud));
        assert_eq!(args.resolution, Some(0.05));
    }

    #[test]
    fn test_scripted_display_needs_max_frames() {
        assert!(Args::try_parse_from(["mapper", "--display", "scripted"]).is_err());
        assert!(
            Args::try_parse_from(["mapper", "--display", "scripted", "--max-frames", "10"]).is_ok()
        );
    }
}
