//! Stage configuration.
//!
//! Defaults reproduce the reference layout. A JSON file may override any
//! subset of fields (`#[serde(default)]` everywhere).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Geometry constants for the four formations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationConfig {
    /// Table columns before wrapping to the next row
    pub table_columns: usize,

    /// Table cell size [x, y]
    pub table_cell: [f64; 2],

    /// Table origin: x = column·cell.x − origin.x, y = −row·cell.y + origin.y
    pub table_origin: [f64; 2],

    pub sphere_radius: f64,

    pub helix_radius: f64,

    /// Height drop per record index
    pub helix_pitch: f64,

    /// Height of index 0
    pub helix_top: f64,

    /// Azimuth advance per record index (radians).
    ///
    /// Zero reproduces the observed layout where each strand is a vertical
    /// line; a non-zero step turns the strands into a real spiral.
    pub helix_angular_step: f64,

    /// Grid cells per layer [x, y]; layers grow along z
    pub grid_dims: [usize; 2],

    /// Grid spacing [x, y, z]
    pub grid_cell: [f64; 3],

    /// Grid origin: (cx·x − ox, −cy·y + oy, cz·z − oz)
    pub grid_origin: [f64; 3],
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            table_columns: 20,
            table_cell: [140.0, 180.0],
            table_origin: [1330.0, 990.0],
            sphere_radius: 800.0,
            helix_radius: 900.0,
            helix_pitch: 16.0,
            helix_top: 450.0,
            helix_angular_step: 0.0,
            grid_dims: [5, 4],
            grid_cell: [400.0, 400.0, 1000.0],
            grid_origin: [800.0, 600.0, 4500.0],
        }
    }
}

/// Perspective camera and orbit controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f64,
    pub near: f64,
    pub far: f64,

    /// Initial distance along +z from the origin
    pub distance: f64,

    pub min_distance: f64,
    pub max_distance: f64,

    /// Fraction of pending motion dropped per tick
    pub damping: f64,

    pub rotate_speed: f64,
    pub zoom_speed: f64,
    pub pan_speed: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 40.0,
            near: 1.0,
            far: 10_000.0,
            distance: 3000.0,
            min_distance: 500.0,
            max_distance: 6000.0,
            damping: 0.2,
            rotate_speed: 1.0,
            zoom_speed: 1.2,
            pan_speed: 0.3,
        }
    }
}

/// Top-level stage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Base transition duration in milliseconds; each object draws from [base, 2·base)
    pub base_duration_ms: u64,

    /// Cards start scattered uniformly in [-extent, extent) on each axis
    pub scatter_extent: f64,

    pub formation: FormationConfig,

    pub camera: CameraConfig,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            base_duration_ms: 2000,
            scatter_extent: 2000.0,
            formation: FormationConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl StageConfig {
    /// Loads and validates a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: StageConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn base_duration(&self) -> Duration {
        Duration::from_millis(self.base_duration_ms)
    }

    /// Rejects settings that would make a formation or the camera degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_duration_ms == 0 {
            return Err(ConfigError::Invalid("base_duration_ms must be > 0".into()));
        }
        if self.formation.table_columns == 0 {
            return Err(ConfigError::Invalid("table_columns must be > 0".into()));
        }
        if self.formation.grid_dims.contains(&0) {
            return Err(ConfigError::Invalid("grid_dims must be > 0".into()));
        }
        let cam = &self.camera;
        if !(cam.min_distance > 0.0 && cam.min_distance <= cam.max_distance) {
            return Err(ConfigError::Invalid(format!(
                "camera distance range [{}, {}] is empty",
                cam.min_distance, cam.max_distance
            )));
        }
        if !(cam.distance >= cam.min_distance && cam.distance <= cam.max_distance) {
            return Err(ConfigError::Invalid(format!(
                "camera distance {} outside [{}, {}]",
                cam.distance, cam.min_distance, cam.max_distance
            )));
        }
        if !(cam.near > 0.0 && cam.near < cam.far) {
            return Err(ConfigError::Invalid("camera clip planes need 0 < near < far".into()));
        }
        if !(cam.fov_deg > 0.0 && cam.fov_deg < 180.0) {
            return Err(ConfigError::Invalid("camera fov_deg must be in (0, 180)".into()));
        }
        if [cam.rotate_speed, cam.zoom_speed, cam.pan_speed]
            .iter()
            .any(|speed| !speed.is_finite())
        {
            return Err(ConfigError::Invalid("camera speeds must be finite".into()));
        }
        if !(cam.damping > 0.0 && cam.damping <= 1.0) {
            return Err(ConfigError::Invalid("camera damping must be in (0, 1]".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = StageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_duration(), Duration::from_millis(2000));
        assert_eq!(config.formation.table_columns, 20);
        assert_eq!(config.formation.helix_angular_step, 0.0);
    }

    #[test]
    fn test_partial_json_override() {
        let json = r#"{ "base_duration_ms": 500, "formation": { "sphere_radius": 400.0 } }"#;
        let config: StageConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.base_duration_ms, 500);
        assert_eq!(config.formation.sphere_radius, 400.0);
        assert_eq!(config.formation.helix_radius, 900.0);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = StageConfig::default();
        config.base_duration_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = StageConfig::default();
        config.formation.grid_dims = [5, 0];
        assert!(config.validate().is_err());

        let mut config = StageConfig::default();
        config.camera.min_distance = 7000.0;
        assert!(config.validate().is_err());

        let mut config = StageConfig::default();
        config.camera.distance = 0.0;
        assert!(config.validate().is_err());

        let mut config = StageConfig::default();
        config.camera.distance = 9000.0;
        assert!(config.validate().is_err());

        let mut config = StageConfig::default();
        config.camera.near = 0.0;
        assert!(config.validate().is_err());

        let mut config = StageConfig::default();
        config.camera.far = 0.5;
        assert!(config.validate().is_err());

        let mut config = StageConfig::default();
        config.camera.fov_deg = 180.0;
        assert!(config.validate().is_err());

        let mut config = StageConfig::default();
        config.camera.fov_deg = 0.0;
        assert!(config.validate().is_err());

        let mut config = StageConfig::default();
        config.camera.zoom_speed = f64::NAN;
        assert!(config.validate().is_err());
    }
}
