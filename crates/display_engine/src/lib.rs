use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod config;
pub mod frames;
pub mod metrics;
pub mod playback;
pub mod render;
#[cfg(test)]
mod test_support;

pub use config::{ConfigError, PlaybackConfig, UpdatePolicy, MAX_BRIGHTNESS};
pub use frames::{
    load_frames, Frame, FrameDecodeError, FrameError, FrameLoadError, FrameLoadOptions, FrameStore,
    Rgba,
};
pub use metrics::{MetricsAccumulator, MetricsHandle, TickMetricsSnapshot};
pub use playback::{
    recognizer_from_config, AnchorKey, AnyDisc, DiscItem, DiscRecognizer, FrameClock,
    IgnoreReason, MaterialDisc, PlaybackHost, PlaybackManager, PlaybackSession, StartOutcome,
    StopReason, TaggedDisc, TickReport, TriggerDisposition, TriggerEvent, TriggerOutcome,
    TriggerScheduler, CUSTOM_DISC_MATERIAL, CUSTOM_DISC_TAG, REGULAR_DISC_MATERIAL,
};
pub use render::{
    project_frame, Billboard, Brightness, DescriptorSet, EntityApi, EntityApiError,
    EntityDescriptor, EntityStyle, ProjectionConfig, ReconcileStats, RenderGroup, RenderKey, Side,
    TEXT_DISPLAY_UNIT_SQUARE,
};

pub const ROOT_ENV_VAR: &str = "DISPLAY_DISK_ROOT";
pub const CONFIG_ENV_VAR: &str = "DISPLAY_DISK_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Directory the frames directory is resolved against.
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("DISPLAY_DISK_ROOT is set but is not a directory: {path}")]
    InvalidEnvRoot { path: PathBuf },
}

/// Resolves the data root and config file. A config path given on the
/// command line wins over the environment.
pub fn resolve_data_paths(cli_config: Option<PathBuf>) -> Result<DataPaths, StartupError> {
    let root = resolve_root()?;
    let config_path = match cli_config {
        Some(path) => Some(path),
        None => read_env_path(CONFIG_ENV_VAR)?,
    };
    Ok(DataPaths { root, config_path })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match read_env_path(ROOT_ENV_VAR)? {
        Some(raw) => {
            let normalized = normalize_path(&raw);
            if normalized.is_dir() {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        None => env::current_dir()
            .map(|dir| normalize_path(&dir))
            .map_err(StartupError::CurrentDir),
    }
}

fn read_env_path(var: &'static str) -> Result<Option<PathBuf>, StartupError> {
    match env::var(var) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(PathBuf::from(value))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(StartupError::EnvVar { var, source }),
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
