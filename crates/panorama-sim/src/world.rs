//! A timed, in-process stand-in for the page and the rendering engine.
//!
//! [`SimDocument`] "loads" the engine script after a delay, [`SimTarget`]
//! stays zero-size until layout settles, and [`SimEngine`] turns every
//! camera request into a `moveend` after the requested duration. Every
//! delay runs on the Tokio clock, so a paused test clock drives the whole
//! world deterministically.
//!
//! [`SimProbe`] counts what the session acquired and released, so a run can
//! verify that teardown left nothing behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use panorama_core::engine::{
    ControlKind, ControlPosition, EaseTo, ElevationSource, EngineError, EngineEvent,
    EngineEventSender, EngineOptions, FlyTo, FrameId, MapEngine, MapRuntime, MarkerSpec,
    TerrainSpec,
};
use panorama_core::host::{AssetId, HostDocument, MountTarget, ScriptCompletion};
use panorama_core::loader::LoadError;
use panorama_core::navigator::delay_from_ms;
use panorama_types::Dimensions;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::SimulationSettings;

/// Delays of the simulated world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimTimings {
    /// Time until the engine script loads.
    pub script_load: Duration,
    /// Whether the script load fails.
    pub script_fails: bool,
    /// Time the mount target stays zero-size.
    pub layout_delay: Duration,
    /// Time from construction to the style `load` event.
    pub style_load: Duration,
    /// Time from `load` to the first `idle` event.
    pub idle_after: Duration,
    /// Time between an animation frame request and its callback.
    pub frame_interval: Duration,
}

impl SimTimings {
    /// Derive timings from the simulation settings.
    pub const fn from_settings(settings: &SimulationSettings) -> Self {
        Self {
            script_load: Duration::from_millis(settings.script_load_ms),
            script_fails: settings.script_fails,
            layout_delay: Duration::from_millis(settings.layout_delay_ms),
            style_load: Duration::from_millis(settings.style_load_ms),
            idle_after: Duration::from_millis(settings.idle_after_ms),
            frame_interval: Duration::from_millis(settings.frame_interval_ms),
        }
    }
}

/// Counters shared by every part of the simulated world.
#[derive(Debug, Default)]
pub struct SimProbe {
    live_assets: AtomicUsize,
    markers: AtomicUsize,
    flights: AtomicUsize,
    eases: AtomicUsize,
    engine_removed: AtomicBool,
    input: OnceLock<EngineEventSender>,
}

impl SimProbe {
    /// Script and stylesheet directives currently in the document.
    pub fn live_assets(&self) -> usize {
        self.live_assets.load(Ordering::SeqCst)
    }

    /// Markers attached to the engine.
    pub fn markers(&self) -> usize {
        self.markers.load(Ordering::SeqCst)
    }

    /// Fly-to requests the engine received.
    pub fn flights(&self) -> usize {
        self.flights.load(Ordering::SeqCst)
    }

    /// Ease requests the engine received.
    pub fn eases(&self) -> usize {
        self.eases.load(Ordering::SeqCst)
    }

    /// Whether the engine instance was destroyed.
    pub fn engine_removed(&self) -> bool {
        self.engine_removed.load(Ordering::SeqCst)
    }

    /// Deliver a user input event to the engine, as if the user touched
    /// the map. Returns `false` if no engine is running.
    pub fn user_input(&self, event: EngineEvent) -> bool {
        self.input
            .get()
            .is_some_and(|events| events.send(event).is_ok())
    }
}

/// Simulated page document.
pub struct SimDocument {
    timings: SimTimings,
    probe: Arc<SimProbe>,
    next_asset: u64,
}

impl SimDocument {
    /// Create a document whose script loads after `timings.script_load`.
    pub const fn new(timings: SimTimings, probe: Arc<SimProbe>) -> Self {
        Self {
            timings,
            probe,
            next_asset: 0,
        }
    }

    fn insert(&mut self, url: &str, kind: &str) -> AssetId {
        self.next_asset = self.next_asset.saturating_add(1);
        self.probe.live_assets.fetch_add(1, Ordering::SeqCst);
        debug!(asset = self.next_asset, kind, url, "Asset inserted");
        AssetId(self.next_asset)
    }
}

impl HostDocument for SimDocument {
    type Runtime = SimRuntime;

    fn append_stylesheet(&mut self, href: &str) -> AssetId {
        self.insert(href, "stylesheet")
    }

    fn append_script(&mut self, src: &str) -> (AssetId, ScriptCompletion<SimRuntime>) {
        let id = self.insert(src, "script");
        let (tx, rx) = oneshot::channel();
        let timings = self.timings;
        let probe = Arc::clone(&self.probe);
        let url = src.to_owned();

        tokio::spawn(async move {
            sleep(timings.script_load).await;
            let outcome = if timings.script_fails {
                Err(LoadError::Failed {
                    url,
                    reason: "simulated network failure".to_owned(),
                })
            } else {
                Ok(SimRuntime { timings, probe })
            };
            if tx.send(outcome).is_err() {
                debug!("Script finished loading after the session stopped waiting");
            }
        });

        (id, rx)
    }

    fn remove_asset(&mut self, id: AssetId) {
        self.probe.live_assets.fetch_sub(1, Ordering::SeqCst);
        debug!(asset = id.0, "Asset removed");
    }
}

/// Simulated mount target that becomes measurable after a delay.
pub struct SimTarget {
    mounted_at: Instant,
    layout_delay: Duration,
    size: Dimensions,
}

impl SimTarget {
    /// A target of `size` that reports zero size for `layout_delay`.
    pub fn new(layout_delay: Duration, size: Dimensions) -> Self {
        Self {
            mounted_at: Instant::now(),
            layout_delay,
            size,
        }
    }
}

impl MountTarget for SimTarget {
    fn id(&self) -> &str {
        "map"
    }

    fn dimensions(&self) -> Dimensions {
        if self.mounted_at.elapsed() < self.layout_delay {
            Dimensions::default()
        } else {
            self.size
        }
    }
}

/// Engine factory handed over once the simulated script has loaded.
pub struct SimRuntime {
    timings: SimTimings,
    probe: Arc<SimProbe>,
}

impl MapRuntime for SimRuntime {
    type Engine = SimEngine;

    fn construct(
        &mut self,
        options: &EngineOptions,
        events: EngineEventSender,
    ) -> Result<SimEngine, EngineError> {
        if options.container.is_empty() {
            return Err(EngineError::Construct {
                reason: "no container".to_owned(),
            });
        }
        if self.probe.input.set(events.clone()).is_err() {
            warn!("Engine constructed more than once");
        }

        let timings = self.timings;
        let style_events = events.clone();
        let style = tokio::spawn(async move {
            sleep(timings.style_load).await;
            if style_events.send(EngineEvent::Load).is_err() {
                return;
            }
            sleep(timings.idle_after).await;
            let _ = style_events.send(EngineEvent::Idle);
        });

        info!(
            container = %options.container,
            zoom = options.zoom,
            pitch = options.pitch,
            terrain = options.terrain.is_some(),
            "Simulated engine constructed"
        );

        Ok(SimEngine {
            events,
            timings,
            probe: Arc::clone(&self.probe),
            style: Some(style),
            motion: None,
            frames: HashMap::new(),
            next_frame: 0,
        })
    }
}

/// Simulated map instance.
pub struct SimEngine {
    events: EngineEventSender,
    timings: SimTimings,
    probe: Arc<SimProbe>,
    style: Option<JoinHandle<()>>,
    motion: Option<JoinHandle<()>>,
    frames: HashMap<FrameId, JoinHandle<()>>,
    next_frame: u64,
}

impl SimEngine {
    /// Start a camera motion that ends with `moveend`, interrupting any
    /// motion in flight.
    fn start_motion(&mut self, duration_ms: f64) {
        if let Some(previous) = self.motion.take() {
            previous.abort();
        }
        let events = self.events.clone();
        let duration = delay_from_ms(duration_ms);
        self.motion = Some(tokio::spawn(async move {
            sleep(duration).await;
            let _ = events.send(EngineEvent::MoveEnd);
        }));
    }
}

impl MapEngine for SimEngine {
    fn add_source(&mut self, id: &str, source: &ElevationSource) {
        debug!(id, url = %source.url, "Source added");
    }

    fn set_terrain(&mut self, terrain: &TerrainSpec) {
        debug!(
            source = %terrain.source,
            exaggeration = terrain.exaggeration,
            "Terrain enabled"
        );
    }

    fn add_control(&mut self, kind: ControlKind, position: ControlPosition) {
        debug!(?kind, ?position, "Control added");
    }

    fn add_marker(&mut self, marker: MarkerSpec) {
        self.probe.markers.fetch_add(1, Ordering::SeqCst);
        debug!(
            lng = marker.position.lng(),
            lat = marker.position.lat(),
            popup_len = marker.popup.html.len(),
            "Marker added"
        );
    }

    fn ease_to(&mut self, request: &EaseTo) {
        self.probe.eases.fetch_add(1, Ordering::SeqCst);
        self.start_motion(request.duration_ms);
    }

    fn fly_to(&mut self, request: &FlyTo) {
        self.probe.flights.fetch_add(1, Ordering::SeqCst);
        info!(
            lng = request.center.lng(),
            lat = request.center.lat(),
            zoom = request.zoom,
            "Flying"
        );
        self.start_motion(request.duration_ms);
    }

    fn request_animation_frame(&mut self) -> FrameId {
        self.frames.retain(|_, task| !task.is_finished());
        self.next_frame = self.next_frame.saturating_add(1);
        let id = FrameId(self.next_frame);
        let events = self.events.clone();
        let interval = self.timings.frame_interval;
        let task = tokio::spawn(async move {
            sleep(interval).await;
            let _ = events.send(EngineEvent::AnimationFrame(id));
        });
        self.frames.insert(id, task);
        id
    }

    fn cancel_animation_frame(&mut self, id: FrameId) {
        if let Some(task) = self.frames.remove(&id) {
            task.abort();
        }
    }

    fn remove(&mut self) {
        if let Some(style) = self.style.take() {
            style.abort();
        }
        if let Some(motion) = self.motion.take() {
            motion.abort();
        }
        for (_, task) in self.frames.drain() {
            task.abort();
        }
        self.probe.engine_removed.store(true, Ordering::SeqCst);
        info!("Simulated engine removed");
    }
}
