use std::fs;
use std::path::Path;
use std::thread;

use serde::{ Serialize, Deserialize };

use crate::camera::CameraSpec;
use crate::error::ConfigError;
use crate::consts::{ DEFAULT_GAMMA, DEFAULT_RESOLUTION, MAX_PIXELS, MAX_RECURSION_DEPTH, RAY_EPSILON };

/// Render settings that are not part of the scene itself.
///
/// Every field has a default, so a config file only needs to name what it
/// changes:
///
/// ```json
/// { "resolution": [640, 480], "max_depth": 8 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Output size; overrides the camera's own resolution.
    pub resolution: Option<[usize; 2]>,

    /// Recursion bound for reflection and refraction rays.
    pub max_depth: usize,

    /// Self-intersection offset for secondary and shadow rays.
    pub epsilon: f64,

    /// Render worker count.
    pub threads: usize,

    /// Display gamma applied when the image is written.
    pub gamma: f64,
}

impl Default for RenderConfig {
    fn default() -> RenderConfig {
        RenderConfig {
            resolution: None,
            max_depth: MAX_RECURSION_DEPTH,
            epsilon: RAY_EPSILON,
            threads: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            gamma: DEFAULT_GAMMA,
        }
    }
}

impl RenderConfig {
    /// Reads a JSON config file; missing fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RenderConfig, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

        let config: RenderConfig = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some([w, h]) = self.resolution {
            if w == 0 || h == 0 {
                return Err(ConfigError::Invalid(
                    format!("resolution must be positive, got {}x{}", w, h)));
            }
            if !within_pixel_budget(w, h) {
                return Err(ConfigError::Invalid(
                    format!("resolution {}x{} exceeds {} pixels", w, h, MAX_PIXELS)));
            }
        }

        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".to_string()));
        }

        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(ConfigError::Invalid(
                format!("epsilon must be a small positive number, got {}", self.epsilon)));
        }

        if !(self.gamma > 0.0 && self.gamma.is_finite()) {
            return Err(ConfigError::Invalid(
                format!("gamma must be positive, got {}", self.gamma)));
        }

        Ok(())
    }

    /// Output size: this config's resolution, then the camera's, then the
    /// square default.
    pub fn resolution_for(&self, camera: &CameraSpec) -> (usize, usize) {
        self.resolution
            .map(|[w, h]| (w, h))
            .or(camera.resolution)
            .unwrap_or((DEFAULT_RESOLUTION, DEFAULT_RESOLUTION))
    }
}

/// Whether a `width` x `height` image fits in `MAX_PIXELS`.
pub fn within_pixel_budget(width: usize, height: usize) -> bool {
    width.checked_mul(height).map_or(false, |n| n <= MAX_PIXELS)
}

#[test]
fn empty_object_is_all_defaults() {
    let c: RenderConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(c, RenderConfig::default());
    assert!(c.validate().is_ok());
}

#[test]
fn partial_config_overrides_named_fields() {
    let c: RenderConfig = serde_json::from_str(
        r#"{ "resolution": [320, 200], "max_depth": 2, "gamma": 1.0 }"#).unwrap();

    assert_eq!(c.resolution, Some([320, 200]));
    assert_eq!(c.max_depth, 2);
    assert_eq!(c.gamma, 1.0);
    assert_eq!(c.epsilon, RAY_EPSILON);
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(serde_json::from_str::<RenderConfig>(r#"{ "depth": 3 }"#).is_err());
}

#[test]
fn invalid_values_fail_validation() {
    let zero = RenderConfig { resolution: Some([0, 10]), ..Default::default() };
    assert!(zero.validate().is_err());

    let idle = RenderConfig { threads: 0, ..Default::default() };
    assert!(idle.validate().is_err());

    let flat = RenderConfig { epsilon: 0.0, ..Default::default() };
    assert!(flat.validate().is_err());
}

#[test]
fn oversized_resolution_fails_validation() {
    let huge = RenderConfig { resolution: Some([100_000, 100_000]), ..Default::default() };
    assert!(matches!(huge.validate(), Err(ConfigError::Invalid(_))));

    let wraps = RenderConfig { resolution: Some([usize::MAX, 2]), ..Default::default() };
    assert!(wraps.validate().is_err());

    let edge = RenderConfig { resolution: Some([8192, 8192]), ..Default::default() };
    assert!(edge.validate().is_ok());
}

#[test]
fn resolution_priority() {
    let mut camera = CameraSpec::default();
    let mut config = RenderConfig::default();
    assert_eq!(config.resolution_for(&camera), (DEFAULT_RESOLUTION, DEFAULT_RESOLUTION));

    camera.resolution = Some((64, 48));
    assert_eq!(config.resolution_for(&camera), (64, 48));

    config.resolution = Some([800, 600]);
    assert_eq!(config.resolution_for(&camera), (800, 600));
}

#[test]
fn missing_file_is_an_io_error() {
    match RenderConfig::load("no/such/config.json") {
        Err(ConfigError::Io { .. }) => {},
        other => panic!("unexpected {:?}", other),
    }
}
