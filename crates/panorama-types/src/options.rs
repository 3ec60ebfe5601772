//! Partial configuration groups supplied by the host page.
//!
//! Every group and every field is optional. The host sends only what it
//! wants to override; the controller's config resolver fills the rest from
//! fixed defaults, field by field. Nothing here is validated: a negative
//! duration is carried through as-is and left for the map engine to judge.
//!
//! All groups use `camelCase` keys so the same JSON document the page
//! already builds for the component deserializes directly.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::LngLat;
use crate::point::PointOfInterest;

/// The complete configuration surface of one map session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default, rename_all = "camelCase")]
pub struct MapOptions {
    /// Map tile provider key. Required: an empty key yields the
    /// missing-key placeholder instead of a map.
    pub api_key: String,
    /// Points of interest, in display order.
    pub points: Vec<PointOfInterest>,
    /// Provider map style name (for example `outdoor`).
    pub map_name: Option<String>,
    /// Shorthand that seeds `rotation.enabled`.
    pub rotating: Option<bool>,
    /// Shorthand that seeds the style background and button colors.
    pub bg_color: Option<String>,
    /// Initial camera.
    pub camera: Option<CameraOptions>,
    /// 3-D terrain.
    pub terrain: Option<TerrainOptions>,
    /// Idle camera rotation.
    pub rotation: Option<RotationOptions>,
    /// Fly-to animation.
    pub animation: Option<AnimationOptions>,
    /// Color tokens.
    pub style: Option<StyleOptions>,
    /// Controls and location list.
    pub ui: Option<UiOptions>,
    /// Marker icon size.
    pub marker: Option<MarkerOptions>,
    /// Engine script and stylesheet locations.
    pub map_libre: Option<MapLibreOptions>,
    /// Mount-target polling and pan limits.
    pub bootstrap: Option<BootstrapOptions>,
}

/// Initial camera placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default, rename_all = "camelCase")]
pub struct CameraOptions {
    /// Center as `[lng, lat]`.
    pub center: Option<LngLat>,
    /// Zoom level.
    pub zoom: Option<f64>,
    /// Tilt in degrees.
    pub pitch: Option<f64>,
    /// Rotation in degrees.
    pub bearing: Option<f64>,
}

/// 3-D terrain settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default, rename_all = "camelCase")]
pub struct TerrainOptions {
    /// Whether terrain is activated.
    pub enabled: Option<bool>,
    /// Vertical exaggeration factor.
    pub exaggeration: Option<f64>,
    /// Identifier of the elevation source.
    pub source: Option<String>,
}

/// How the next rotation step is scheduled once the previous one ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum StepScheduler {
    /// A zero-delay timer.
    #[default]
    Timeout,
    /// The engine's next animation frame.
    AnimationFrame,
}

/// Idle camera rotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default, rename_all = "camelCase")]
pub struct RotationOptions {
    /// Whether the camera rotates once the map is idle.
    pub enabled: Option<bool>,
    /// Degrees turned per step.
    pub speed: Option<f64>,
    /// Milliseconds each step takes.
    pub step_duration: Option<f64>,
    /// Bearing the rotation starts from.
    pub initial_bearing: Option<f64>,
    /// Step scheduling mechanism.
    pub scheduler: Option<StepScheduler>,
}

/// Fly-to animation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationOptions {
    /// Milliseconds a fly-to takes.
    pub fly_to_duration: Option<f64>,
    /// Degrees per rotation step, used when `rotation.speed` is not given.
    pub rotation_step: Option<f64>,
    /// Destination zoom of a fly-to.
    pub zoom_level: Option<f64>,
}

/// Color tokens for controls and popups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default, rename_all = "camelCase")]
pub struct StyleOptions {
    /// Background color.
    pub bg_color: Option<String>,
    /// Control and list button color.
    pub button_color: Option<String>,
    /// Popup background color.
    pub popup_bg_color: Option<String>,
    /// Popup text color.
    pub popup_text_color: Option<String>,
}

/// Side of the map the location list is drawn on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum ListAlign {
    /// Left edge.
    #[default]
    Left,
    /// Right edge.
    Right,
}

/// Map controls and location list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default, rename_all = "camelCase")]
pub struct UiOptions {
    /// Show the zoom/rotate/pitch control.
    pub show_navigation: Option<bool>,
    /// Show the fullscreen control.
    pub show_fullscreen: Option<bool>,
    /// Show the location list at all.
    pub show_sidebar: Option<bool>,
    /// Legacy list width in pixels.
    pub sidebar_width: Option<f64>,
    /// Pin the list open beside the map instead of a toggled overlay.
    pub list_always_visible: Option<bool>,
    /// Side the list is drawn on.
    pub location_list_align: Option<ListAlign>,
    /// List width in pixels.
    pub list_size: Option<f64>,
}

/// A marker side length: a number of pixels or any CSS length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(untagged)]
pub enum MarkerDimension {
    /// Pixels.
    Pixels(f64),
    /// A CSS length such as `2rem`.
    Css(String),
}

impl MarkerDimension {
    /// The dimension as a CSS length.
    pub fn to_css(&self) -> String {
        match self {
            Self::Pixels(px) => format!("{px}px"),
            Self::Css(css) => css.clone(),
        }
    }
}

/// Marker icon size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerOptions {
    /// Icon width.
    pub width: Option<MarkerDimension>,
    /// Icon height.
    pub height: Option<MarkerDimension>,
}

/// Where the map engine's runtime is fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default, rename_all = "camelCase")]
pub struct MapLibreOptions {
    /// Script URL. Empty means "derive from version".
    pub script_url: Option<String>,
    /// Stylesheet URL. Empty means "derive from version".
    pub css_url: Option<String>,
    /// Engine release tag.
    pub version: Option<String>,
}

/// Mount-target polling and pan range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default, rename_all = "camelCase")]
pub struct BootstrapOptions {
    /// Milliseconds between mount-target measurements.
    pub poll_interval_ms: Option<u64>,
    /// Measurements before giving up (0 = never give up).
    pub max_layout_attempts: Option<u32>,
    /// Radius around the initial center the camera may pan within.
    pub bounds_radius_km: Option<f64>,
}
