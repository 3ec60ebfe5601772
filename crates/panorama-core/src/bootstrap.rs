//! Mount-target polling and engine construction.
//!
//! A host layout tool may keep the mount target at zero size for a while
//! after the session starts. The engine cannot render into a zero-size
//! element, so the session measures the target first and only constructs
//! the engine once both dimensions are positive. The first measurement is
//! immediate and later ones follow at a fixed interval.
//!
//! Polling is bounded: after `max_attempts` zero-size measurements the
//! session gives up. A limit of zero disables the bound.

use std::time::Duration;

use panorama_types::Dimensions;
use tracing::{debug, info, warn};

use crate::config::{BootstrapConfig, RuntimeConfig};
use crate::engine::{EngineError, EngineEventSender, EngineOptions, MapRuntime, TerrainSpec};
use crate::geo::bounds_around;
use crate::host::MountTarget;

/// Result of one mount-target measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// The target has a renderable size.
    Ready(Dimensions),
    /// The target is still zero-size; measure again after the delay.
    Retry(Duration),
    /// The attempt limit was reached without a renderable size.
    Exhausted {
        /// Number of measurements taken.
        attempts: u32,
    },
}

/// Bounded mount-target polling state.
#[derive(Debug, Clone)]
pub struct LayoutPoll {
    interval: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl LayoutPoll {
    /// Create a poller from the resolved bootstrap settings.
    pub const fn from_config(config: &BootstrapConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_layout_attempts,
            attempts: 0,
        }
    }

    /// Measure the target once.
    pub fn poll<T: MountTarget + ?Sized>(&mut self, target: &T) -> PollOutcome {
        self.attempts = self.attempts.saturating_add(1);
        let dimensions = target.dimensions();
        if dimensions.is_measurable() {
            debug!(
                attempts = self.attempts,
                width = dimensions.width,
                height = dimensions.height,
                "Mount target measurable"
            );
            return PollOutcome::Ready(dimensions);
        }
        if self.max_attempts > 0 && self.attempts >= self.max_attempts {
            warn!(attempts = self.attempts, "Mount target never became measurable");
            return PollOutcome::Exhausted {
                attempts: self.attempts,
            };
        }
        PollOutcome::Retry(self.interval)
    }

    /// Measurements taken so far.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Build the engine construction options for a resolved configuration.
///
/// The terrain block is present only when terrain is enabled. The pan
/// limit is the configured radius around the initial center.
pub fn engine_options(config: &RuntimeConfig, container: &str) -> EngineOptions {
    let camera = config.camera;
    let terrain = config.terrain.enabled.then(|| TerrainSpec {
        source: config.terrain.source.clone(),
        exaggeration: config.terrain.exaggeration,
    });
    EngineOptions {
        container: container.to_owned(),
        style_url: config.style_url(),
        center: camera.center,
        zoom: camera.zoom,
        pitch: camera.pitch,
        bearing: camera.bearing,
        max_bounds: bounds_around(camera.center, config.bootstrap.bounds_radius_km),
        terrain,
    }
}

/// Construct the engine into a measured mount target.
///
/// # Errors
///
/// Returns [`EngineError`] if the runtime rejects the options.
pub fn construct_engine<R: MapRuntime>(
    runtime: &mut R,
    config: &RuntimeConfig,
    container: &str,
    events: EngineEventSender,
) -> Result<R::Engine, EngineError> {
    let options = engine_options(config, container);
    let engine = runtime.construct(&options, events)?;
    info!(
        container,
        zoom = options.zoom,
        pitch = options.pitch,
        bearing = options.bearing,
        terrain = options.terrain.is_some(),
        "Map engine constructed"
    );
    Ok(engine)
}
