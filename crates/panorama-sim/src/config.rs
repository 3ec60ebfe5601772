//! Simulator configuration.
//!
//! Everything lives in `panorama-config.yaml`: the `map` section is the
//! host's [`MapOptions`] document, exactly as a page would pass it, and the
//! `simulation` section sets the simulated engine's timings plus a script
//! of timed user actions. Missing file or missing sections fall back to
//! defaults. The `map` section may instead live in its own JSON or YAML
//! file named by `simulation.map_file`, so a page's options document can be
//! replayed unchanged. The tile provider key can be supplied through
//! `PANORAMA_API_KEY` so it never has to be committed.

use std::path::{Path, PathBuf};

use panorama_types::MapOptions;
use serde::Deserialize;
use tracing::info;

use crate::error::SimError;

/// Default config file name, resolved against the working directory.
pub const CONFIG_FILE: &str = "panorama-config.yaml";

/// Environment variable that overrides `map.apiKey`.
pub const API_KEY_ENV: &str = "PANORAMA_API_KEY";

/// Complete simulator configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimConfig {
    /// Host options handed to the session.
    pub map: MapOptions,
    /// Simulated engine timings and scripted actions.
    pub simulation: SimulationSettings,
}

impl SimConfig {
    /// Replace the tile provider key when `key` is present and non-empty.
    #[must_use]
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            info!(source = API_KEY_ENV, "Tile provider key taken from environment");
            self.map.api_key = key;
        }
        self
    }
}

/// Timings of the simulated engine and the action script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Milliseconds until the engine script finishes loading.
    pub script_load_ms: u64,
    /// Whether the script load fails instead.
    pub script_fails: bool,
    /// Milliseconds the mount target stays zero-size.
    pub layout_delay_ms: u64,
    /// Milliseconds from construction to the style `load` event.
    pub style_load_ms: u64,
    /// Milliseconds from `load` to the first `idle` event.
    pub idle_after_ms: u64,
    /// Milliseconds between animation frames.
    pub frame_interval_ms: u64,
    /// Total run length before the session is torn down.
    pub run_for_ms: u64,
    /// User actions, by offset from start.
    pub actions: Vec<ScriptedAction>,
    /// Options file replacing the `map` section, relative to the config
    /// file.
    pub map_file: Option<PathBuf>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            script_load_ms: 150,
            script_fails: false,
            layout_delay_ms: 250,
            style_load_ms: 400,
            idle_after_ms: 600,
            frame_interval_ms: 16,
            run_for_ms: 20_000,
            actions: Vec::new(),
            map_file: None,
        }
    }
}

/// One scripted user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScriptedAction {
    /// Offset from the start of the run, in milliseconds.
    pub at_ms: u64,
    /// What the user does.
    pub action: Action,
    /// Point index for [`Action::GoTo`].
    #[serde(default)]
    pub point: Option<usize>,
}

/// A user action the simulator can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Select a point from the location list.
    GoTo,
    /// Open or close the location list.
    ToggleList,
    /// Scroll on the map.
    Wheel,
    /// Press a pointer button on the map.
    MouseDown,
    /// Touch the map.
    TouchStart,
}

/// Load the config file, or defaults when it does not exist.
///
/// # Errors
///
/// Returns [`SimError`] if the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<SimConfig, SimError> {
    if !path.exists() {
        info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(SimConfig::default());
    }
    let contents = std::fs::read_to_string(path)?;
    let mut config = parse(&contents)?;

    if let Some(map_file) = &config.simulation.map_file {
        let resolved = path
            .parent()
            .map_or_else(|| map_file.clone(), |dir| dir.join(map_file));
        info!(path = %resolved.display(), "Loading map options file");
        config.map = panorama_core::config::from_file(&resolved)?;
    }
    Ok(config)
}

/// Parse config text, extracting the `map` and `simulation` sections.
///
/// # Errors
///
/// Returns [`SimError::Section`] if the document or a section is malformed.
pub fn parse(contents: &str) -> Result<SimConfig, SimError> {
    if contents.trim().is_empty() {
        return Ok(SimConfig::default());
    }
    let raw: serde_yml::Value = serde_yml::from_str(contents).map_err(|e| SimError::Section {
        section: "root",
        message: e.to_string(),
    })?;

    let map = raw
        .get("map")
        .map(|value| serde_yml::from_value::<MapOptions>(value.clone()))
        .transpose()
        .map_err(|e| SimError::Section {
            section: "map",
            message: e.to_string(),
        })?
        .unwrap_or_default();

    let simulation = raw
        .get("simulation")
        .map(|value| serde_yml::from_value::<SimulationSettings>(value.clone()))
        .transpose()
        .map_err(|e| SimError::Section {
            section: "simulation",
            message: e.to_string(),
        })?
        .unwrap_or_default();

    Ok(SimConfig { map, simulation })
}
