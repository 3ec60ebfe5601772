//! Feature layers attached once the base style has loaded.
//!
//! Order matters to the engine: the elevation source must exist before
//! terrain is activated from it. Controls and markers follow. One marker
//! is attached per point of interest, in list order, each with a popup
//! rendered from the point's fields.

use panorama_types::PointOfInterest;
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::engine::{
    ControlKind, ControlPosition, ElevationSource, MapEngine, MarkerSpec, PopupSpec, TerrainSpec,
};
use crate::popup::PopupRenderer;

/// Distance between a marker and its popup, in pixels.
pub const POPUP_OFFSET_PX: f64 = 25.0;

/// What [`build_layers`] attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerSummary {
    /// Whether the elevation source and terrain were attached.
    pub terrain: bool,
    /// Number of controls attached.
    pub controls: usize,
    /// Number of markers attached.
    pub markers: usize,
}

/// Elevation source served by the tile provider for the given key.
pub fn elevation_source(api_key: &str) -> ElevationSource {
    ElevationSource {
        kind: "raster-dem".to_owned(),
        url: format!("https://api.maptiler.com/tiles/terrain-rgb/tiles.json?key={api_key}"),
        tile_size: 512,
        max_zoom: 14,
    }
}

/// Attach terrain, controls and markers to a freshly loaded engine.
///
/// A popup that fails to render is logged and attached empty; one bad
/// point never blocks the rest of the tour.
pub fn build_layers<E, P>(
    engine: &mut E,
    config: &RuntimeConfig,
    points: &[PointOfInterest],
    renderer: &P,
) -> LayerSummary
where
    E: MapEngine + ?Sized,
    P: PopupRenderer + ?Sized,
{
    let mut summary = LayerSummary::default();

    let source_id = config.terrain.source.as_str();
    engine.add_source(source_id, &elevation_source(&config.api_key));
    if config.terrain.enabled {
        engine.set_terrain(&TerrainSpec {
            source: source_id.to_owned(),
            exaggeration: config.terrain.exaggeration,
        });
        summary.terrain = true;
    }

    if config.ui.show_navigation {
        engine.add_control(
            ControlKind::Navigation {
                visualize_pitch: true,
            },
            ControlPosition::TopRight,
        );
        summary.controls = summary.controls.saturating_add(1);
    }
    if config.ui.show_fullscreen {
        engine.add_control(ControlKind::Fullscreen, ControlPosition::TopLeft);
        summary.controls = summary.controls.saturating_add(1);
    }

    let width = config.marker.width.to_css();
    let height = config.marker.height.to_css();
    for (index, point) in points.iter().enumerate() {
        let html = renderer.render(point).unwrap_or_else(|e| {
            warn!(index, title = %point.title, error = %e, "Popup render failed");
            String::new()
        });
        engine.add_marker(MarkerSpec {
            position: point.position(),
            width: width.clone(),
            height: height.clone(),
            icon: point.pin.clone(),
            popup: PopupSpec {
                html,
                offset_px: POPUP_OFFSET_PX,
                close_button: true,
                close_on_click: true,
            },
        });
        debug!(index, key = %point.key(index), "Marker attached");
        summary.markers = summary.markers.saturating_add(1);
    }

    info!(
        terrain = summary.terrain,
        controls = summary.controls,
        markers = summary.markers,
        "Feature layers attached"
    );
    summary
}
