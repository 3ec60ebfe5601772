//! Configuration resolution for a map session.
//!
//! The host supplies a [`MapOptions`] document in which every group and
//! every field may be omitted. [`RuntimeConfig::resolve`] turns it into a
//! fully populated record: each group starts from its fixed defaults and
//! the caller's fields replace them one at a time. Merging is shallow per
//! group, so supplying `camera.zoom` keeps the default `camera.center`.
//!
//! Values are not range-checked. A negative duration or an out-of-range
//! pitch is carried through unchanged; the map engine is the authority on
//! what it accepts.
//!
//! Resolution happens once, when a session mounts. The result is treated
//! as immutable for the lifetime of that session.

use std::path::Path;

use panorama_types::{
    AnimationOptions, BootstrapOptions, CameraOptions, ListAlign, LngLat, MapLibreOptions,
    MapOptions, MarkerDimension, MarkerOptions, RotationOptions, StepScheduler, StyleOptions,
    TerrainOptions, UiOptions,
};

/// Errors that can occur when reading host options from text or disk.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the options file from disk.
    #[error("failed to read options file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse JSON content.
    #[error("failed to parse options JSON: {source}")]
    Json {
        /// The underlying JSON parse error.
        #[from]
        source: serde_json::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse options YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Parse host options from a JSON document.
///
/// # Errors
///
/// Returns [`ConfigError::Json`] if the text is not valid JSON of the
/// expected shape.
pub fn parse_json(json: &str) -> Result<MapOptions, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse host options from a YAML document. An empty document yields
/// [`MapOptions::default`].
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] if the text is not valid YAML of the
/// expected shape.
pub fn parse_yaml(yaml: &str) -> Result<MapOptions, ConfigError> {
    if yaml.trim().is_empty() {
        return Ok(MapOptions::default());
    }
    Ok(serde_yml::from_str(yaml)?)
}

/// Load host options from a file. Files ending in `.json` are read as
/// JSON, everything else as YAML.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, or a parse
/// error for malformed content.
pub fn from_file(path: &Path) -> Result<MapOptions, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_json(&contents)
    } else {
        parse_yaml(&contents)
    }
}

/// Fully resolved configuration of one map session.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Tile provider key. May be empty; see [`Self::has_api_key`].
    pub api_key: String,
    /// Provider map style name.
    pub map_name: String,
    /// Initial camera.
    pub camera: CameraConfig,
    /// 3-D terrain.
    pub terrain: TerrainConfig,
    /// Idle rotation.
    pub rotation: RotationConfig,
    /// Fly-to animation.
    pub animation: AnimationConfig,
    /// Color tokens.
    pub style: StyleConfig,
    /// Controls and location list.
    pub ui: UiConfig,
    /// Marker icon size.
    pub marker: MarkerConfig,
    /// Engine runtime locations.
    pub resources: EngineResources,
    /// Mount-target polling and pan range.
    pub bootstrap: BootstrapConfig,
}

impl RuntimeConfig {
    /// Resolve host options into a complete runtime configuration.
    ///
    /// The top-level shorthands seed group defaults: `rotating` becomes the
    /// default of `rotation.enabled` and `bgColor` the default of
    /// `style.bgColor`.
    pub fn resolve(options: &MapOptions) -> Self {
        let rotating = options.rotating.unwrap_or(false);
        let bg_color = options.bg_color.clone().unwrap_or_else(default_bg_color);
        let legacy_step = options
            .animation
            .as_ref()
            .and_then(|animation| animation.rotation_step);

        Self {
            api_key: options.api_key.clone(),
            map_name: options.map_name.clone().unwrap_or_else(default_map_name),
            camera: CameraConfig::resolve(options.camera.as_ref()),
            terrain: TerrainConfig::resolve(options.terrain.as_ref()),
            rotation: RotationConfig::resolve(options.rotation.as_ref(), rotating, legacy_step),
            animation: AnimationConfig::resolve(options.animation.as_ref()),
            style: StyleConfig::resolve(options.style.as_ref(), &bg_color),
            ui: UiConfig::resolve(options.ui.as_ref()),
            marker: MarkerConfig::resolve(options.marker.as_ref()),
            resources: EngineResources::resolve(options.map_libre.as_ref()),
            bootstrap: BootstrapConfig::resolve(options.bootstrap.as_ref()),
        }
    }

    /// Whether a usable tile provider key was supplied.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// URL of the provider style document for this map.
    pub fn style_url(&self) -> String {
        format!(
            "https://api.maptiler.com/maps/{}/style.json?key={}",
            self.map_name, self.api_key
        )
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::resolve(&MapOptions::default())
    }
}

/// Initial camera placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    /// Center as `[lng, lat]`.
    pub center: LngLat,
    /// Zoom level.
    pub zoom: f64,
    /// Tilt in degrees.
    pub pitch: f64,
    /// Rotation in degrees.
    pub bearing: f64,
}

impl CameraConfig {
    /// Overlay a partial camera group on the defaults.
    pub fn resolve(partial: Option<&CameraOptions>) -> Self {
        let defaults = Self::default();
        let Some(partial) = partial else {
            return defaults;
        };
        Self {
            center: partial.center.unwrap_or(defaults.center),
            zoom: partial.zoom.unwrap_or(defaults.zoom),
            pitch: partial.pitch.unwrap_or(defaults.pitch),
            bearing: partial.bearing.unwrap_or(defaults.bearing),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            center: default_center(),
            zoom: 12.0,
            pitch: 50.0,
            bearing: -90.0,
        }
    }
}

/// 3-D terrain settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainConfig {
    /// Whether terrain is activated.
    pub enabled: bool,
    /// Vertical exaggeration factor.
    pub exaggeration: f64,
    /// Identifier of the elevation source.
    pub source: String,
}

impl TerrainConfig {
    /// Overlay a partial terrain group on the defaults.
    pub fn resolve(partial: Option<&TerrainOptions>) -> Self {
        let defaults = Self::default();
        let Some(partial) = partial else {
            return defaults;
        };
        Self {
            enabled: partial.enabled.unwrap_or(defaults.enabled),
            exaggeration: partial.exaggeration.unwrap_or(defaults.exaggeration),
            source: partial.source.clone().unwrap_or(defaults.source),
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exaggeration: 1.5,
            source: "terrainSource".to_owned(),
        }
    }
}

/// Idle rotation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationConfig {
    /// Whether rotation starts once the map is idle.
    pub enabled: bool,
    /// Degrees turned per step.
    pub degrees_per_step: f64,
    /// Milliseconds each step takes.
    pub step_duration_ms: f64,
    /// Bearing the first step starts from.
    pub initial_bearing: f64,
    /// How the next step is scheduled.
    pub scheduler: StepScheduler,
}

impl RotationConfig {
    /// Overlay a partial rotation group on the defaults.
    ///
    /// `enabled` defaults to the top-level `rotating` flag. The step size
    /// comes from `rotation.speed`, then `animation.rotationStep`, then the
    /// fixed default.
    pub fn resolve(
        partial: Option<&RotationOptions>,
        rotating: bool,
        legacy_step: Option<f64>,
    ) -> Self {
        let defaults = Self {
            enabled: rotating,
            degrees_per_step: legacy_step.unwrap_or(DEFAULT_DEGREES_PER_STEP),
            ..Self::default()
        };
        let Some(partial) = partial else {
            return defaults;
        };
        Self {
            enabled: partial.enabled.unwrap_or(defaults.enabled),
            degrees_per_step: partial.speed.unwrap_or(defaults.degrees_per_step),
            step_duration_ms: partial.step_duration.unwrap_or(defaults.step_duration_ms),
            initial_bearing: partial.initial_bearing.unwrap_or(defaults.initial_bearing),
            scheduler: partial.scheduler.unwrap_or(defaults.scheduler),
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            degrees_per_step: DEFAULT_DEGREES_PER_STEP,
            step_duration_ms: 12_000.0,
            initial_bearing: -90.0,
            scheduler: StepScheduler::Timeout,
        }
    }
}

/// Fly-to animation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    /// Milliseconds a fly-to takes.
    pub fly_to_duration_ms: f64,
    /// Destination zoom of a fly-to.
    pub zoom_level: f64,
}

impl AnimationConfig {
    /// Overlay a partial animation group on the defaults.
    pub fn resolve(partial: Option<&AnimationOptions>) -> Self {
        let defaults = Self::default();
        let Some(partial) = partial else {
            return defaults;
        };
        Self {
            fly_to_duration_ms: partial.fly_to_duration.unwrap_or(defaults.fly_to_duration_ms),
            zoom_level: partial.zoom_level.unwrap_or(defaults.zoom_level),
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fly_to_duration_ms: 2_400.0,
            zoom_level: 16.0,
        }
    }
}

/// Color tokens for controls and popups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleConfig {
    /// Background color.
    pub bg_color: String,
    /// Control and list button color.
    pub button_color: String,
    /// Popup background color.
    pub popup_bg_color: String,
    /// Popup text color.
    pub popup_text_color: String,
}

impl StyleConfig {
    /// Overlay a partial style group on the defaults. Both the background
    /// and the button color fall back to the top-level `bgColor`.
    pub fn resolve(partial: Option<&StyleOptions>, bg_color: &str) -> Self {
        let empty = StyleOptions::default();
        let partial = partial.unwrap_or(&empty);
        Self {
            button_color: partial
                .button_color
                .clone()
                .unwrap_or_else(|| bg_color.to_owned()),
            popup_bg_color: partial
                .popup_bg_color
                .clone()
                .unwrap_or_else(|| "rgba(0,0,0,0.8)".to_owned()),
            popup_text_color: partial
                .popup_text_color
                .clone()
                .unwrap_or_else(|| "#fff".to_owned()),
            bg_color: partial.bg_color.clone().unwrap_or_else(|| bg_color.to_owned()),
        }
    }

    /// CSS custom properties the host stylesheet reads.
    pub fn css_variables(&self) -> Vec<(&'static str, String)> {
        vec![
            ("--map-button-bg", self.button_color.clone()),
            ("--map-button-color", "#fff".to_owned()),
            ("--popup-bg", self.popup_bg_color.clone()),
            ("--popup-text", self.popup_text_color.clone()),
        ]
    }
}

/// Controls and location list settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiConfig {
    /// Show the navigation control.
    pub show_navigation: bool,
    /// Show the fullscreen control.
    pub show_fullscreen: bool,
    /// Show the location list.
    pub show_sidebar: bool,
    /// Legacy list width in pixels.
    pub sidebar_width: f64,
    /// Pin the list beside the map.
    pub list_always_visible: bool,
    /// Side the list is drawn on.
    pub list_align: ListAlign,
    /// List width in pixels.
    pub list_size: f64,
}

impl UiConfig {
    /// Overlay a partial UI group on the defaults. An explicit
    /// `sidebarWidth` stands in for a missing `listSize`.
    pub fn resolve(partial: Option<&UiOptions>) -> Self {
        let defaults = Self::default();
        let Some(partial) = partial else {
            return defaults;
        };
        Self {
            show_navigation: partial.show_navigation.unwrap_or(defaults.show_navigation),
            show_fullscreen: partial.show_fullscreen.unwrap_or(defaults.show_fullscreen),
            show_sidebar: partial.show_sidebar.unwrap_or(defaults.show_sidebar),
            sidebar_width: partial.sidebar_width.unwrap_or(defaults.sidebar_width),
            list_always_visible: partial
                .list_always_visible
                .unwrap_or(defaults.list_always_visible),
            list_align: partial.location_list_align.unwrap_or(defaults.list_align),
            list_size: partial
                .list_size
                .or(partial.sidebar_width)
                .unwrap_or(defaults.list_size),
        }
    }

    /// How the location list is laid out.
    pub const fn list_layout(&self) -> ListLayout {
        ListLayout {
            visible: self.show_sidebar,
            pinned: self.show_sidebar && self.list_always_visible,
            align: self.list_align,
            width_px: self.list_size,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_navigation: true,
            show_fullscreen: false,
            show_sidebar: true,
            sidebar_width: 300.0,
            list_always_visible: false,
            list_align: ListAlign::Left,
            list_size: 320.0,
        }
    }
}

/// Resolved placement of the location list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListLayout {
    /// Whether the list is shown at all.
    pub visible: bool,
    /// Whether it is pinned beside the map rather than toggled.
    pub pinned: bool,
    /// Side it is drawn on.
    pub align: ListAlign,
    /// Width in pixels.
    pub width_px: f64,
}

/// Marker icon size.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerConfig {
    /// Icon width.
    pub width: MarkerDimension,
    /// Icon height.
    pub height: MarkerDimension,
}

impl MarkerConfig {
    /// Overlay a partial marker group on the defaults.
    pub fn resolve(partial: Option<&MarkerOptions>) -> Self {
        let defaults = Self::default();
        let Some(partial) = partial else {
            return defaults;
        };
        Self {
            width: partial.width.clone().unwrap_or(defaults.width),
            height: partial.height.clone().unwrap_or(defaults.height),
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            width: MarkerDimension::Pixels(20.0),
            height: MarkerDimension::Pixels(20.0),
        }
    }
}

/// Where the engine runtime is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResources {
    /// Engine release tag.
    pub version: String,
    /// Script URL.
    pub script_url: String,
    /// Stylesheet URL.
    pub stylesheet_url: String,
}

impl EngineResources {
    /// Overlay a partial resource group on the defaults. Empty URLs are
    /// treated as absent and derived from the version tag.
    pub fn resolve(partial: Option<&MapLibreOptions>) -> Self {
        let version = partial
            .and_then(|p| p.version.clone())
            .unwrap_or_else(default_engine_version);
        let non_empty = |url: Option<&String>| url.filter(|u| !u.trim().is_empty()).cloned();
        Self {
            script_url: non_empty(partial.and_then(|p| p.script_url.as_ref()))
                .unwrap_or_else(|| engine_asset_url(&version, "maplibre-gl.js")),
            stylesheet_url: non_empty(partial.and_then(|p| p.css_url.as_ref()))
                .unwrap_or_else(|| engine_asset_url(&version, "maplibre-gl.css")),
            version,
        }
    }
}

impl Default for EngineResources {
    fn default() -> Self {
        Self::resolve(None)
    }
}

/// Mount-target polling and pan range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapConfig {
    /// Milliseconds between mount-target measurements.
    pub poll_interval_ms: u64,
    /// Measurements before giving up (0 = never give up).
    pub max_layout_attempts: u32,
    /// Radius around the initial center the camera may pan within.
    pub bounds_radius_km: f64,
}

impl BootstrapConfig {
    /// Overlay a partial bootstrap group on the defaults.
    pub fn resolve(partial: Option<&BootstrapOptions>) -> Self {
        let defaults = Self::default();
        let Some(partial) = partial else {
            return defaults;
        };
        Self {
            poll_interval_ms: partial.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
            max_layout_attempts: partial
                .max_layout_attempts
                .unwrap_or(defaults.max_layout_attempts),
            bounds_radius_km: partial.bounds_radius_km.unwrap_or(defaults.bounds_radius_km),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            max_layout_attempts: 600,
            bounds_radius_km: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const DEFAULT_DEGREES_PER_STEP: f64 = 30.0;

fn default_map_name() -> String {
    "outdoor".to_owned()
}

fn default_bg_color() -> String {
    "#333".to_owned()
}

const fn default_center() -> LngLat {
    LngLat::new(8.763_649_918_607_726, 46.680_068_941_177_24)
}

fn default_engine_version() -> String {
    "3.6.2".to_owned()
}

fn engine_asset_url(version: &str, file: &str) -> String {
    format!("https://unpkg.com/maplibre-gl@{version}/dist/{file}")
}
