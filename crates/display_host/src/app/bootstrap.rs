use std::env;
use std::path::PathBuf;

use display_engine::{resolve_data_paths, DataPaths, PlaybackConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::loop_runner::LoopConfig;
use super::scenario::Scenario;

const SCENARIO_ENV_VAR: &str = "DISPLAY_DISK_SCENARIO";

pub(crate) struct AppWiring {
    pub(crate) playback: PlaybackConfig,
    pub(crate) paths: DataPaths,
    pub(crate) scenario: Scenario,
    pub(crate) loop_config: LoopConfig,
}

/// Usage: `display_host [config.json] [scenario.json]`.
pub(crate) fn build_app() -> Result<AppWiring, String> {
    init_tracing();
    info!("=== Display Disk Startup ===");

    let mut args = env::args_os().skip(1);
    let cli_config = args.next().map(PathBuf::from);
    let cli_scenario = args.next().map(PathBuf::from);

    let paths =
        resolve_data_paths(cli_config).map_err(|error| format!("resolve data paths: {error}"))?;
    let playback = match &paths.config_path {
        Some(path) => PlaybackConfig::load_or_default(path)
            .map_err(|error| format!("load config: {error}"))?,
        None => PlaybackConfig::default(),
    };
    let scenario = match cli_scenario.or_else(scenario_path_from_env) {
        Some(path) => Scenario::load(&path)?,
        None => Scenario::demo(),
    };

    info!(
        root = %paths.root.display(),
        config = ?paths.config_path,
        frames_dir = %paths.root.join(&playback.frames_directory).display(),
        frame_rate = playback.frame_rate,
        loop_enabled = playback.loop_enabled,
        jukeboxes = scenario.jukeboxes.len(),
        scripted_events = scenario.events.len(),
        "startup_config"
    );

    let loop_config = LoopConfig::for_playback(&playback);
    Ok(AppWiring {
        playback,
        paths,
        scenario,
        loop_config,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn scenario_path_from_env() -> Option<PathBuf> {
    env::var_os(SCENARIO_ENV_VAR)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}
