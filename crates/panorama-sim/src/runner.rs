//! Runs one scripted tour against the simulated world.
//!
//! The run mounts a session, replays the configured actions at their
//! offsets, waits out the configured run length and tears the session
//! down. The returned [`RunReport`] captures the session status just before
//! teardown and what the world looked like afterwards.

use std::sync::Arc;
use std::time::Duration;

use panorama_core::config::RuntimeConfig;
use panorama_core::engine::EngineEvent;
use panorama_core::popup::TemplatePopupRenderer;
use panorama_core::session::{self, SessionHandle, SessionStatus};
use panorama_types::{Dimensions, PointOfInterest};
use serde::Serialize;
use tokio::time::{Instant, sleep_until};
use tracing::{info, warn};

use crate::config::{Action, ScriptedAction, SimConfig};
use crate::error::SimError;
use crate::observer::{LoggingObserver, ObservedCounts};
use crate::world::{SimDocument, SimProbe, SimTarget, SimTimings};

/// Size the simulated mount target settles at.
pub const VIEWPORT: Dimensions = Dimensions::new(1_280.0, 800.0);

/// Outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Session status just before teardown.
    pub status: SessionStatus,
    /// Session status after teardown.
    pub final_status: SessionStatus,
    /// Times the map reported ready.
    pub ready_notices: usize,
    /// Selection notices delivered.
    pub selection_notices: usize,
    /// Markers the engine received.
    pub markers: usize,
    /// Rotation steps requested from the engine.
    pub eases: usize,
    /// Fly-to requests the engine received.
    pub flights: usize,
    /// Script and stylesheet directives still in the document.
    pub leaked_assets: usize,
    /// Whether the engine instance was destroyed.
    pub engine_removed: bool,
    /// CSS custom properties the host stylesheet would receive.
    pub theme: Vec<(String, String)>,
    /// Location list panel as the host would draw it.
    pub list: ListPanel,
}

/// Contents and placement of the location list panel.
#[derive(Debug, Clone, Serialize)]
pub struct ListPanel {
    /// Whether the list is shown at all.
    pub visible: bool,
    /// Whether it is pinned beside the map.
    pub pinned: bool,
    /// Width in pixels.
    pub width_px: f64,
    /// Entry titles, in point order.
    pub entries: Vec<String>,
}

impl ListPanel {
    fn describe(config: &RuntimeConfig, points: &[PointOfInterest]) -> Self {
        let layout = config.ui.list_layout();
        let entries: Vec<String> = points.iter().map(|p| p.title.clone()).collect();
        if layout.visible && entries.is_empty() {
            info!("No locations available");
        }
        Self {
            visible: layout.visible,
            pinned: layout.pinned,
            width_px: layout.width_px,
            entries,
        }
    }
}

/// Check that every scripted selection names an existing point.
///
/// # Errors
///
/// Returns [`SimError::UnknownPoint`] for the first action that does not.
pub fn validate(config: &SimConfig) -> Result<(), SimError> {
    let available = config.map.points.len();
    for action in &config.simulation.actions {
        if action.action != Action::GoTo {
            continue;
        }
        let index = action.point.unwrap_or_default();
        if index >= available {
            return Err(SimError::UnknownPoint {
                at_ms: action.at_ms,
                index,
                available,
            });
        }
    }
    Ok(())
}

/// Mount a session, replay the action script and tear it down.
///
/// # Errors
///
/// Returns [`SimError`] if the script is invalid or the popup template
/// fails to compile.
pub async fn run(config: &SimConfig) -> Result<RunReport, SimError> {
    validate(config)?;

    let timings = SimTimings::from_settings(&config.simulation);
    let probe = Arc::new(SimProbe::default());
    let counts = Arc::new(ObservedCounts::default());

    let mut handle = session::mount(
        &config.map,
        SimDocument::new(timings, Arc::clone(&probe)),
        SimTarget::new(timings.layout_delay, VIEWPORT),
        LoggingObserver::new(Arc::clone(&counts)),
        TemplatePopupRenderer::new()?,
    );

    info!(
        session_id = %handle.id(),
        points = config.map.points.len(),
        actions = config.simulation.actions.len(),
        run_for_ms = config.simulation.run_for_ms,
        "Tour started"
    );

    let start = Instant::now();
    let run_for = Duration::from_millis(config.simulation.run_for_ms);

    let mut actions = config.simulation.actions.clone();
    actions.sort_by_key(|a| a.at_ms);

    // --- Replay the action script ---
    for scripted in &actions {
        let offset = Duration::from_millis(scripted.at_ms);
        if offset > run_for {
            warn!(at_ms = scripted.at_ms, "Action scheduled after the run ends, skipped");
            continue;
        }
        sleep_until(offset_from(start, offset)).await;
        perform(&handle, &probe, config, scripted);
    }

    sleep_until(offset_from(start, run_for)).await;
    let status = handle.status();

    // --- Teardown ---
    handle.teardown().await;

    let report = RunReport {
        status,
        final_status: handle.status(),
        ready_notices: counts.ready(),
        selection_notices: counts.clicks(),
        markers: probe.markers(),
        eases: probe.eases(),
        flights: probe.flights(),
        leaked_assets: probe.live_assets(),
        engine_removed: probe.engine_removed(),
        theme: handle
            .config()
            .style
            .css_variables()
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect(),
        list: ListPanel::describe(handle.config(), &config.map.points),
    };

    info!(
        ready = report.status.ready,
        rotation_steps = report.status.rotation_steps,
        flights = report.flights,
        leaked_assets = report.leaked_assets,
        "Tour finished"
    );

    Ok(report)
}

fn offset_from(start: Instant, offset: Duration) -> Instant {
    start.checked_add(offset).unwrap_or(start)
}

fn perform(handle: &SessionHandle, probe: &SimProbe, config: &SimConfig, scripted: &ScriptedAction) {
    let delivered = match scripted.action {
        Action::GoTo => {
            let index = scripted.point.unwrap_or_default();
            config
                .map
                .points
                .get(index)
                .is_some_and(|point| handle.go_to(point.clone(), index))
        }
        Action::ToggleList => handle.toggle_list(),
        Action::Wheel => probe.user_input(EngineEvent::Wheel),
        Action::MouseDown => probe.user_input(EngineEvent::MouseDown),
        Action::TouchStart => probe.user_input(EngineEvent::TouchStart),
    };

    if delivered {
        info!(at_ms = scripted.at_ms, action = ?scripted.action, "Action performed");
    } else {
        warn!(at_ms = scripted.at_ms, action = ?scripted.action, "Action had no receiver");
    }
}
