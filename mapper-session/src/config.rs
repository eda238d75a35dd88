//! Session configuration.

use mapper_data::{MappingParameters, MeshFilter, ParameterError, TextureFormat};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Where finalized maps are written unless configured otherwise.
pub const DEFAULT_OUTPUT_PATH: &str = "mapping_data/mesh_gen.obj";

/// Errors loading or validating a [`SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid mapping parameters: {0}")]
    Parameters(#[from] ParameterError),

    #[error("{name} must be a non-negative number of seconds, got {value}")]
    Interval { name: &'static str, value: f64 },
}

/// Policy for one mapping run.
///
/// Every field has a default, so a JSON file only needs the values it
/// changes:
///
/// ```json
/// { "update_period_seconds": 1.0, "mapping": { "resolution_meters": 0.05 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum time between two asynchronous update requests.
    pub request_interval_seconds: f64,
    /// Retrieval period of the sampling gate.
    pub update_period_seconds: f64,
    /// Template for the parameters built on each enable.
    pub mapping: MappingParameters,
    pub output_path: PathBuf,
    /// Filter strength applied to meshes before export.
    pub mesh_filter: MeshFilter,
    pub texture_format: TextureFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_interval_seconds: 0.5,
            update_period_seconds: 1.5,
            mapping: MappingParameters::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            mesh_filter: MeshFilter::Medium,
            texture_format: TextureFormat::Rgba,
        }
    }
}

impl SessionConfig {
    /// Load a config from a JSON file and validate it.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SessionConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        info!("Loaded session config");
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("request_interval_seconds", self.request_interval_seconds),
            ("update_period_seconds", self.update_period_seconds),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigError::Interval { name, value });
            }
        }
        self.mapping.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapper_data::MapType;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = SessionConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.output_path, PathBuf::from("mapping_data/mesh_gen.obj"));
        assert_eq!(config.mesh_filter, MeshFilter::Medium);
    }

    #[test]
    fn test_partial_mapping_section() {
        let config = SessionConfig::from_json_str(
            r#"{ "update_period_seconds": 1.0,
                 "mapping": { "resolution_meters": 0.05, "map_type": "fused_point_cloud" } }"#,
        )
        .unwrap();
        assert_eq!(config.update_period_seconds, 1.0);
        assert_eq!(config.request_interval_seconds, 0.5);
        assert_eq!(config.mapping.resolution_meters, 0.05);
        assert_eq!(config.mapping.range_meters, 2.0);
        assert_eq!(config.mapping.map_type, MapType::FusedPointCloud);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            SessionConfig::from_json_str(r#"{ "request_interval_seconds": -1.0 }"#),
            Err(ConfigError::Interval { .. })
        ));
        assert!(matches!(
            SessionConfig::from_json_str(r#"{ "mapping": { "range_meters": 0.0 } }"#),
            Err(ConfigError::Parameters(_))
        ));
        assert!(matches!(
            SessionConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{ "output_path": "out/map.ply" }"#).unwrap();
        let config = SessionConfig::from_json_file(&path).unwrap();
        assert_eq!(config.output_path, PathBuf::from("out/map.ply"));

        assert!(matches!(
            SessionConfig::from_json_file(&dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
