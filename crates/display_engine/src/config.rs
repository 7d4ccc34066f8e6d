use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_BRIGHTNESS: u8 = 15;

/// How a retained render key is refreshed when its descriptor is unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    #[default]
    SkipUnchanged,
    Always,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub frames_directory: PathBuf,
    pub supported_formats: Vec<String>,
    pub frame_rate: u32,
    pub ticks_per_second: u32,
    pub video_width: u32,
    pub video_height: u32,
    pub scale: f32,
    pub x_offset: f32,
    pub height_above_anchor: f32,
    pub z_offset: f32,
    pub loop_enabled: bool,
    pub double_sided: bool,
    pub brightness: u8,
    pub billboard: bool,
    pub teleport_duration: u32,
    pub interpolation_duration: u32,
    pub use_custom_disc: bool,
    pub accept_regular_discs: bool,
    pub detect_feeder_insertion: bool,
    pub trigger_delay_ticks: u64,
    pub update_policy: UpdatePolicy,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frames_directory: PathBuf::from("bad_apple_frames"),
            supported_formats: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
            frame_rate: 20,
            ticks_per_second: 20,
            video_width: 64,
            video_height: 48,
            scale: 4.0,
            x_offset: 0.5,
            height_above_anchor: 2.0,
            z_offset: 0.5,
            loop_enabled: false,
            double_sided: true,
            brightness: MAX_BRIGHTNESS,
            billboard: false,
            teleport_duration: 1,
            interpolation_duration: 1,
            use_custom_disc: true,
            accept_regular_discs: false,
            detect_feeder_insertion: true,
            trigger_delay_ticks: 2,
            update_policy: UpdatePolicy::SkipUnchanged,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path} at {field}: {message}")]
    Parse {
        path: PathBuf,
        field: String,
        message: String,
    },
    #[error("invalid config value at {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl PlaybackConfig {
    /// Reads a JSON config. A missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw, path)
    }

    pub fn from_json_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config = serde_path_to_error::deserialize::<_, PlaybackConfig>(&mut deserializer)
            .map_err(|error| {
                let field = error.path().to_string();
                let source = error.into_inner();
                ConfigError::Parse {
                    path: origin.to_path_buf(),
                    field: if field.is_empty() { ".".to_string() } else { field },
                    message: source.to_string(),
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(expected_actual("frame_rate", "value > 0", self.frame_rate));
        }
        if self.ticks_per_second == 0 {
            return Err(expected_actual(
                "ticks_per_second",
                "value > 0",
                self.ticks_per_second,
            ));
        }
        if self.video_width == 0 {
            return Err(expected_actual("video_width", "value > 0", self.video_width));
        }
        if self.video_height == 0 {
            return Err(expected_actual(
                "video_height",
                "value > 0",
                self.video_height,
            ));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(expected_actual("scale", "finite value > 0", self.scale));
        }
        for (field, value) in [
            ("x_offset", self.x_offset),
            ("height_above_anchor", self.height_above_anchor),
            ("z_offset", self.z_offset),
        ] {
            if !value.is_finite() {
                return Err(expected_actual(field, "finite number", value));
            }
        }
        if self.brightness > MAX_BRIGHTNESS {
            return Err(expected_actual(
                "brightness",
                format!("value <= {MAX_BRIGHTNESS}"),
                self.brightness,
            ));
        }
        if self.supported_formats.iter().all(|ext| ext.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "supported_formats",
                message: "at least one extension is required".to_string(),
            });
        }
        Ok(())
    }
}

fn expected_actual(
    field: &'static str,
    expected: impl Display,
    actual: impl Display,
) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: format!("expected {expected}, got {actual}"),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        PlaybackConfig::default().validate().expect("valid defaults");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().expect("tempdir");
        let config =
            PlaybackConfig::load_or_default(&temp.path().join("absent.json")).expect("defaults");
        assert_eq!(config, PlaybackConfig::default());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("playback.json");
        fs::write(
            &path,
            r#"{ "frame_rate": 10, "loop_enabled": true, "update_policy": "always" }"#,
        )
        .expect("write config");

        let config = PlaybackConfig::load_or_default(&path).expect("config");
        assert_eq!(config.frame_rate, 10);
        assert!(config.loop_enabled);
        assert_eq!(config.update_policy, UpdatePolicy::Always);
        assert_eq!(config.video_width, 64);
        assert!(config.double_sided);
    }

    #[test]
    fn parse_error_names_the_field_path() {
        let err = PlaybackConfig::from_json_str(
            r#"{ "frame_rate": "fast" }"#,
            Path::new("playback.json"),
        )
        .expect_err("type error");
        match err {
            ConfigError::Parse { field, .. } => assert_eq!(field, "frame_rate"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_rejects_zero_frame_rate_and_bad_brightness() {
        let err = PlaybackConfig::from_json_str(r#"{ "frame_rate": 0 }"#, Path::new("c.json"))
            .expect_err("zero rate");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "frame_rate",
                ..
            }
        ));

        let config = PlaybackConfig {
            brightness: 16,
            ..PlaybackConfig::default()
        };
        let err = config.validate().expect_err("brightness");
        assert_eq!(
            err.to_string(),
            "invalid config value at brightness: expected value <= 15, got 16"
        );
    }

    #[test]
    fn validation_rejects_non_finite_geometry() {
        let config = PlaybackConfig {
            scale: f32::INFINITY,
            ..PlaybackConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PlaybackConfig {
            z_offset: f32::NAN,
            ..PlaybackConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
