//! The map engine boundary.
//!
//! The rendering engine is an external collaborator: it fetches tiles,
//! draws, hit-tests and animates the camera. The controller only ever
//! *requests* work from it through [`MapEngine`], and learns what the engine
//! did through [`EngineEvent`]s.
//!
//! Event subscription works through a channel rather than registered
//! callbacks. The engine receives an [`EngineEventSender`] at construction
//! and pushes every event into it; the session driver is the only reader,
//! and decides per event and per stage whether it is a one-shot signal
//! (the first `load`, the post-build `idle`) or a recurring one.
//!
//! A [`MapRuntime`] is what the loaded engine script provides: a factory for
//! engine instances. The host hands one over when the script finishes
//! loading (see [`HostDocument`](crate::host::HostDocument)).

use panorama_types::{BoundingBox, LngLat};
use tokio::sync::mpsc;

/// Errors surfaced by the engine boundary.
///
/// Only construction is fallible from the controller's point of view. Tile,
/// style and network failures after construction belong to the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine refused to construct a map instance.
    #[error("engine construction failed: {reason}")]
    Construct {
        /// Explanation from the engine.
        reason: String,
    },
}

/// Identifier of a requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(pub u64);

/// Something the engine reports back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The base style finished loading.
    Load,
    /// All pending rendering for the current view has finished.
    Idle,
    /// A camera transition ended.
    MoveEnd,
    /// The user pressed a pointer button on the map.
    MouseDown,
    /// The user touched the map.
    TouchStart,
    /// The user scrolled the map.
    Wheel,
    /// A previously requested animation frame fired.
    AnimationFrame(FrameId),
}

impl EngineEvent {
    /// Whether the event originates from direct user input on the map.
    pub const fn is_user_interaction(self) -> bool {
        matches!(self, Self::MouseDown | Self::TouchStart | Self::Wheel)
    }
}

/// Channel end handed to the engine for delivering [`EngineEvent`]s.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Terrain activation block.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainSpec {
    /// Elevation source identifier.
    pub source: String,
    /// Vertical exaggeration factor.
    pub exaggeration: f64,
}

/// Everything the engine needs to construct a map instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Identifier of the element the map renders into.
    pub container: String,
    /// Style document URL.
    pub style_url: String,
    /// Initial center.
    pub center: LngLat,
    /// Initial zoom.
    pub zoom: f64,
    /// Initial pitch in degrees.
    pub pitch: f64,
    /// Initial bearing in degrees.
    pub bearing: f64,
    /// Pan limit.
    pub max_bounds: BoundingBox,
    /// Terrain block, present only when terrain is enabled.
    pub terrain: Option<TerrainSpec>,
}

/// Descriptor of a raster elevation source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationSource {
    /// Source type, always `raster-dem`.
    pub kind: String,
    /// Tile manifest URL.
    pub url: String,
    /// Tile size in pixels.
    pub tile_size: u32,
    /// Highest zoom level the source serves.
    pub max_zoom: u32,
}

/// A built-in map control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Zoom and rotate buttons.
    Navigation {
        /// Whether the compass also visualizes pitch.
        visualize_pitch: bool,
    },
    /// Fullscreen toggle.
    Fullscreen,
}

/// Corner a control is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPosition {
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    BottomRight,
}

/// Popup attached to a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupSpec {
    /// Static markup shown inside the popup.
    pub html: String,
    /// Distance from the marker in pixels.
    pub offset_px: f64,
    /// Whether a close button is drawn.
    pub close_button: bool,
    /// Whether clicking the map closes the popup.
    pub close_on_click: bool,
}

/// One marker with its popup.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    /// Anchor position.
    pub position: LngLat,
    /// Icon width as a CSS length.
    pub width: String,
    /// Icon height as a CSS length.
    pub height: String,
    /// Icon image URL.
    pub icon: Option<String>,
    /// Popup revealed when the marker is clicked.
    pub popup: PopupSpec,
}

/// Easing curve of a camera transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    /// Constant angular speed.
    Linear,
}

/// Camera ease request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EaseTo {
    /// Center to hold.
    pub center: LngLat,
    /// Target bearing in degrees.
    pub bearing: f64,
    /// Transition length in milliseconds.
    pub duration_ms: f64,
    /// Easing curve.
    pub easing: Easing,
    /// Run even when the user prefers reduced motion.
    pub essential: bool,
}

/// Camera fly-to request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyTo {
    /// Destination center.
    pub center: LngLat,
    /// Destination zoom.
    pub zoom: f64,
    /// Transition length in milliseconds.
    pub duration_ms: f64,
}

/// A constructed map instance.
///
/// Methods are fire-and-forget requests; their effects are reported, if at
/// all, through [`EngineEvent`]s.
pub trait MapEngine: Send {
    /// Register an elevation data source.
    fn add_source(&mut self, id: &str, source: &ElevationSource);

    /// Activate 3-D terrain from a registered source.
    fn set_terrain(&mut self, terrain: &TerrainSpec);

    /// Attach a built-in control.
    fn add_control(&mut self, kind: ControlKind, position: ControlPosition);

    /// Attach a marker and its popup.
    fn add_marker(&mut self, marker: MarkerSpec);

    /// Start a camera ease. Ends with [`EngineEvent::MoveEnd`].
    fn ease_to(&mut self, request: &EaseTo);

    /// Start a camera fly-to. Ends with [`EngineEvent::MoveEnd`].
    fn fly_to(&mut self, request: &FlyTo);

    /// Request a callback on the next animation frame, delivered as
    /// [`EngineEvent::AnimationFrame`].
    fn request_animation_frame(&mut self) -> FrameId;

    /// Cancel a frame request that has not fired yet.
    fn cancel_animation_frame(&mut self, id: FrameId);

    /// Destroy the instance and release everything it holds.
    fn remove(&mut self);
}

/// Factory for engine instances, provided by the loaded engine runtime.
pub trait MapRuntime: Send + 'static {
    /// Engine instance type.
    type Engine: MapEngine + 'static;

    /// Construct a map instance that reports its events into `events`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Construct`] if the engine rejects the options.
    fn construct(
        &mut self,
        options: &EngineOptions,
        events: EngineEventSender,
    ) -> Result<Self::Engine, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pointer_touch_and_wheel_are_interactions() {
        assert!(EngineEvent::MouseDown.is_user_interaction());
        assert!(EngineEvent::TouchStart.is_user_interaction());
        assert!(EngineEvent::Wheel.is_user_interaction());
        assert!(!EngineEvent::MoveEnd.is_user_interaction());
        assert!(!EngineEvent::Idle.is_user_interaction());
        assert!(!EngineEvent::AnimationFrame(FrameId(1)).is_user_interaction());
    }
}
