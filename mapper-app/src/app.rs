//! Wiring of the command-line mapper.

use crate::display::{ScriptedDisplay, TerminalDisplay};
use crate::{Args, DisplayKind, MapTypeArg, ResolutionArg};
use mapper_capture::{CameraResolution, FrameSource, InitConfig, open_source};
use mapper_data::MapType;
use mapper_mapping::VoxelMappingEngine;
use mapper_session::{
    DisplaySink, FileExporter, SessionConfig, SessionController, StartupError, SystemClock,
};
use std::error::Error;
use tracing::{info, warn};

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
    pub enable_tracy: bool,
}

pub fn init_logging(logging: &LoggingConfig) {
    #[cfg(feature = "tracy")]
    {
        if logging.enable_tracy {
            use tracing_subscriber::Layer;
            use tracing_subscriber::layer::SubscriberExt;
            use tracing_subscriber::util::SubscriberInitExt;
            tracing_subscriber::registry()
                .with(tracing_tracy::TracyLayer::default())
                .with(
                    tracing_subscriber::fmt::layer().with_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| logging.level.clone().into()),
                    ),
                )
                .init();
            return;
        }
    }
    #[cfg(not(feature = "tracy"))]
    {
        if logging.enable_tracy {
            eprintln!("Tracy support not compiled in; rebuild with --features tracy");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level)),
        )
        .with_target(false)
        .init();
}

/// Load the config file, if any, and apply command-line overrides.
pub fn session_config(args: &Args) -> Result<SessionConfig, StartupError> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };

    if let Some(resolution) = args.resolution {
        config.mapping.resolution_meters = resolution;
    }
    if let Some(range) = args.range {
        config.mapping.range_meters = range;
    }
    if let Some(period) = args.period {
        config.update_period_seconds = period;
    }
    if let Some(interval) = args.request_interval {
        config.request_interval_seconds = interval;
    }
    if args.save_texture {
        config.mapping.save_texture = true;
    }
    if let Some(map_type) = args.map_type {
        config.mapping.map_type = match map_type {
            MapTypeArg::Mesh => MapType::Mesh,
            MapTypeArg::PointCloud => MapType::FusedPointCloud,
        };
    }
    if let Some(output) = &args.output {
        config.output_path = output.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Pick the frame source from the arguments.
pub fn init_config(args: &Args) -> InitConfig {
    let resolution = match args.camera_resolution {
        ResolutionArg::Hd2k => CameraResolution::Hd2k,
        ResolutionArg::Hd1080 => CameraResolution::Hd1080,
        ResolutionArg::Hd720 => CameraResolution::Hd720,
        ResolutionArg::Vga => CameraResolution::Vga,
    };
    let init = match &args.input {
        Some(path) => InitConfig::recording(path.clone()),
        None if args.synthetic => InitConfig::synthetic(),
        None if cfg!(feature = "webcam") => InitConfig::live(args.device),
        None => {
            warn!("Built without webcam support, using the synthetic room");
            InitConfig::synthetic()
        }
    };
    init.with_resolution(resolution)
}

pub fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = session_config(&args)?;
    let source = open_source(&init_config(&args)).map_err(StartupError::OpenSource)?;
    let engine = VoxelMappingEngine::new(source.calibration());

    let display: Box<dyn DisplaySink> = match args.display {
        DisplayKind::Terminal => Box::new(TerminalDisplay::new()),
        DisplayKind::Scripted => Box::new(ScriptedDisplay::new(
            args.toggle_at.clone(),
            args.max_frames,
        )),
    };

    let mut controller = SessionController::start(
        source,
        engine,
        display,
        FileExporter,
        SystemClock::new(),
        config,
    )?;
    let stats = controller.run();

    info!(
        "Done: {} frames, {} maps finalized, {} export failures",
        stats.ticks - stats.skipped_ticks,
        stats.finalizes,
        stats.export_failures
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use mapper_capture::InputSource;
    use std::path::PathBuf;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("mapper").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = session_config(&parse(&[
            "--resolution",
            "0.05",
            "--period",
            "2.0",
            "--save-texture",
            "--output",
            "out/room.ply",
        ]))
        .unwrap();
        assert_eq!(config.mapping.resolution_meters, 0.05);
        assert_eq!(config.update_period_seconds, 2.0);
        assert_eq!(config.request_interval_seconds, 0.5);
        assert!(config.mapping.save_texture);
        assert_eq!(config.output_path, PathBuf::from("out/room.ply"));
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{ "update_period_seconds": 1.0, "mapping": { "range_meters": 3.5 } }"#,
        )
        .unwrap();
        let path = path.to_string_lossy().into_owned();

        let config = session_config(&parse(&["--config", &path, "--period", "0.75"])).unwrap();
        assert_eq!(config.update_period_seconds, 0.75);
        assert_eq!(config.mapping.range_meters, 3.5);
    }

    #[test]
    fn test_invalid_override_is_a_startup_error() {
        assert!(matches!(
            session_config(&parse(&["--resolution", "5.0"])),
            Err(StartupError::Config(_))
        ));
    }

    #[test]
    fn test_source_selection() {
        assert_eq!(
            init_config(&parse(&["rec"])).input,
            InputSource::Recording(PathBuf::from("rec"))
        );
        assert_eq!(
            init_config(&parse(&["--synthetic"])).input,
            InputSource::Synthetic
        );
        let live = init_config(&parse(&["--device", "2"])).input;
        if cfg!(feature = "webcam") {
            assert_eq!(live, InputSource::Live { device: 2 });
        } else {
            assert_eq!(live, InputSource::Synthetic);
        }
    }
}
