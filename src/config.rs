use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// What to do with a frame the image decoder rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Log an error and leave the frame out of every stack.
    #[default]
    Skip,
    /// Fail the whole load.
    Abort,
}

/// Construction parameters for a session.
///
/// Can be read from JSON; missing fields fall back to the defaults below.
///
/// ```json
/// { "exposure_time_ms": 2.5, "pattern": "*.png", "trap_radius": 3.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Exposure time (ms) of the acquisition to load.
    pub exposure_time_ms: f64,
    /// Glob pattern matched against file names.
    pub pattern: String,
    /// Allowed difference between derived and requested exposure time.
    pub tolerance_ms: f64,
    /// Coordinate file name, looked up in the frame directory.
    pub trap_file_name: String,
    /// Trap used when a mask request names no traps (the central trap).
    pub default_trap_id: i64,
    /// Default half-width of the square around each trap, in pixels.
    pub trap_radius: f64,
    pub decode_policy: DecodePolicy,
    /// Decode frames on the rayon thread pool.
    pub parallel: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exposure_time_ms: 30.0,
            pattern: "*.png".to_string(),
            tolerance_ms: 1e-8,
            trap_file_name: "trap_positions.json".to_string(),
            default_trap_id: 54,
            trap_radius: 4.0,
            decode_policy: DecodePolicy::Skip,
            parallel: true,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON config and validate it.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&text).map_err(|e| Error::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.exposure_time_ms.is_finite() {
            return Err(invalid(format!(
                "exposure_time_ms must be finite, got {}",
                self.exposure_time_ms
            )));
        }
        if !(self.tolerance_ms >= 0.0 && self.tolerance_ms.is_finite()) {
            return Err(invalid(format!(
                "tolerance_ms must be finite and non-negative, got {}",
                self.tolerance_ms
            )));
        }
        if !(self.trap_radius > 0.0 && self.trap_radius.is_finite()) {
            return Err(Error::InvalidRadius {
                radius: self.trap_radius,
            });
        }
        if self.pattern.is_empty() {
            return Err(invalid("pattern must not be empty".to_string()));
        }
        if self.trap_file_name.is_empty() {
            return Err(invalid("trap_file_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_exposure_time_ms(mut self, exposure_time_ms: f64) -> Self {
        self.exposure_time_ms = exposure_time_ms;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_tolerance_ms(mut self, tolerance_ms: f64) -> Self {
        self.tolerance_ms = tolerance_ms;
        self
    }

    pub fn with_trap_file_name(mut self, name: impl Into<String>) -> Self {
        self.trap_file_name = name.into();
        self
    }

    pub fn with_default_trap_id(mut self, id: i64) -> Self {
        self.default_trap_id = id;
        self
    }

    pub fn with_trap_radius(mut self, radius: f64) -> Self {
        self.trap_radius = radius;
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

fn invalid(reason: String) -> Error {
    Error::InvalidConfig { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.exposure_time_ms, 30.0);
        assert_eq!(config.pattern, "*.png");
        assert_eq!(config.default_trap_id, 54);
        assert_eq!(config.trap_radius, 4.0);
        assert_eq!(config.decode_policy, DecodePolicy::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            SessionConfig::from_json_str(r#"{"exposure_time_ms": 2.5, "decode_policy": "abort"}"#)
                .unwrap();
        assert_eq!(config.exposure_time_ms, 2.5);
        assert_eq!(config.decode_policy, DecodePolicy::Abort);
        assert_eq!(config.trap_file_name, "trap_positions.json");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = SessionConfig::from_json_str(r#"{"exposure": 2.5}"#);
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_invalid_radius_rejected() {
        let config = SessionConfig::default().with_trap_radius(0.0);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidRadius { .. })
        ));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let config = SessionConfig::default().with_tolerance_ms(-1.0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = SessionConfig::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(Error::ConfigFile { .. })));
    }
}
