//! In-memory host document, engine runtime and observer for driving a
//! session from tests.
//!
//! Every fake shares one [`World`] behind a mutex, so a test can complete
//! the script load, push engine events and inspect every call the session
//! made, in order.

#![allow(dead_code, clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use panorama_core::engine::{
    ControlKind, ControlPosition, EaseTo, ElevationSource, EngineError, EngineEvent,
    EngineEventSender, EngineOptions, FlyTo, FrameId, MapEngine, MapRuntime, MarkerSpec,
    TerrainSpec,
};
use panorama_core::host::{AssetId, HostDocument, MountTarget, ScriptCompletion};
use panorama_core::loader::LoadError;
use panorama_core::popup::TemplatePopupRenderer;
use panorama_core::session::{self, SessionHandle, SessionObserver, SessionStatus};
use panorama_types::{Dimensions, MapOptions, PointOfInterest};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

/// One call the session made on the engine or runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Construct(EngineOptions),
    AddSource(String),
    SetTerrain(TerrainSpec),
    AddControl(ControlKind, ControlPosition),
    AddMarker(MarkerSpec),
    EaseTo(EaseTo),
    FlyTo(FlyTo),
    RequestFrame(FrameId),
    CancelFrame(FrameId),
    Remove,
}

/// Everything the fakes record.
#[derive(Default)]
pub struct World {
    pub calls: Vec<EngineCall>,
    pub inserted: Vec<String>,
    pub removed: Vec<AssetId>,
    pub script: Option<oneshot::Sender<Result<FakeRuntime, LoadError>>>,
    pub events: Option<EngineEventSender>,
    pub construct_error: Option<String>,
    pub dimensions: Dimensions,
    next_asset: u64,
    next_frame: u64,
}

/// Shared handle to the [`World`].
#[derive(Clone)]
pub struct Shared(Arc<Mutex<World>>);

impl Shared {
    pub fn new(dimensions: Dimensions) -> Self {
        Self(Arc::new(Mutex::new(World {
            dimensions,
            ..World::default()
        })))
    }

    pub fn lock(&self) -> MutexGuard<'_, World> {
        self.0.lock().unwrap()
    }

    /// Wait until the session has inserted its script directive.
    async fn script_requested(&self) {
        for _ in 0..100 {
            if self.lock().script.is_some() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("session never requested the engine script");
    }

    pub async fn complete_script(&self) {
        self.script_requested().await;
        let sender = self.lock().script.take().unwrap();
        assert!(sender.send(Ok(FakeRuntime(self.clone()))).is_ok());
    }

    pub async fn fail_script(&self, reason: &str) {
        self.script_requested().await;
        let sender = self.lock().script.take().unwrap();
        let error = LoadError::Failed {
            url: "engine.js".to_owned(),
            reason: reason.to_owned(),
        };
        assert!(sender.send(Err(error)).is_ok());
    }

    pub fn script_abandoned(&self) -> bool {
        self.lock()
            .script
            .as_ref()
            .is_none_or(oneshot::Sender::is_closed)
    }

    pub fn emit(&self, event: EngineEvent) {
        let world = self.lock();
        let events = world.events.as_ref().unwrap();
        assert!(events.send(event).is_ok());
    }

    pub fn set_dimensions(&self, dimensions: Dimensions) {
        self.lock().dimensions = dimensions;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&EngineCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| matches(c)).count()
    }

    pub fn eases(&self) -> Vec<EaseTo> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::EaseTo(ease) => Some(*ease),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, call: &EngineCall) -> Option<usize> {
        self.lock().calls.iter().position(|c| c == call)
    }

    fn record(&self, call: EngineCall) {
        self.lock().calls.push(call);
    }
}

pub struct FakeDocument(pub Shared);

impl HostDocument for FakeDocument {
    type Runtime = FakeRuntime;

    fn append_stylesheet(&mut self, href: &str) -> AssetId {
        let mut world = self.0.lock();
        world.inserted.push(href.to_owned());
        world.next_asset += 1;
        AssetId(world.next_asset)
    }

    fn append_script(&mut self, src: &str) -> (AssetId, ScriptCompletion<FakeRuntime>) {
        let mut world = self.0.lock();
        world.inserted.push(src.to_owned());
        world.next_asset += 1;
        let (tx, rx) = oneshot::channel();
        world.script = Some(tx);
        (AssetId(world.next_asset), rx)
    }

    fn remove_asset(&mut self, id: AssetId) {
        self.0.lock().removed.push(id);
    }
}

pub struct FakeRuntime(Shared);

impl MapRuntime for FakeRuntime {
    type Engine = FakeEngine;

    fn construct(
        &mut self,
        options: &EngineOptions,
        events: EngineEventSender,
    ) -> Result<FakeEngine, EngineError> {
        let mut world = self.0.lock();
        if let Some(reason) = world.construct_error.clone() {
            return Err(EngineError::Construct { reason });
        }
        world.calls.push(EngineCall::Construct(options.clone()));
        world.events = Some(events);
        Ok(FakeEngine(self.0.clone()))
    }
}

pub struct FakeEngine(Shared);

impl MapEngine for FakeEngine {
    fn add_source(&mut self, id: &str, _source: &ElevationSource) {
        self.0.record(EngineCall::AddSource(id.to_owned()));
    }

    fn set_terrain(&mut self, terrain: &TerrainSpec) {
        self.0.record(EngineCall::SetTerrain(terrain.clone()));
    }

    fn add_control(&mut self, kind: ControlKind, position: ControlPosition) {
        self.0.record(EngineCall::AddControl(kind, position));
    }

    fn add_marker(&mut self, marker: MarkerSpec) {
        self.0.record(EngineCall::AddMarker(marker));
    }

    fn ease_to(&mut self, request: &EaseTo) {
        self.0.record(EngineCall::EaseTo(*request));
    }

    fn fly_to(&mut self, request: &FlyTo) {
        self.0.record(EngineCall::FlyTo(*request));
    }

    fn request_animation_frame(&mut self) -> FrameId {
        let mut world = self.0.lock();
        world.next_frame += 1;
        let id = FrameId(world.next_frame);
        world.calls.push(EngineCall::RequestFrame(id));
        id
    }

    fn cancel_animation_frame(&mut self, id: FrameId) {
        self.0.record(EngineCall::CancelFrame(id));
    }

    fn remove(&mut self) {
        self.0.record(EngineCall::Remove);
    }
}

pub struct FakeTarget(pub Shared);

impl MountTarget for FakeTarget {
    fn id(&self) -> &str {
        "map"
    }

    fn dimensions(&self) -> Dimensions {
        self.0.lock().dimensions
    }
}

/// What the observer saw, stamped with the clock.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Ready(Instant),
    Click {
        index: usize,
        title: String,
        at: Instant,
    },
}

pub struct RecordingObserver(pub mpsc::UnboundedSender<Observed>);

impl SessionObserver for RecordingObserver {
    fn on_map_ready(&mut self) {
        let _ = self.0.send(Observed::Ready(Instant::now()));
    }

    fn on_marker_click(&mut self, point: &PointOfInterest, index: usize) {
        let _ = self.0.send(Observed::Click {
            index,
            title: point.title.clone(),
            at: Instant::now(),
        });
    }
}

/// A mounted session and the handles to drive it.
pub struct Harness {
    pub handle: SessionHandle,
    pub world: Shared,
    pub observed: mpsc::UnboundedReceiver<Observed>,
    pub status: watch::Receiver<SessionStatus>,
}

pub fn lake() -> PointOfInterest {
    PointOfInterest::new(46.68, 8.76, "Lake")
}

pub fn keyed(options: MapOptions) -> MapOptions {
    MapOptions {
        api_key: "test-key".to_owned(),
        points: vec![lake()],
        ..options
    }
}

/// Mount a session against a target of the given size.
pub fn mount_with(options: &MapOptions, dimensions: Dimensions) -> Harness {
    let world = Shared::new(dimensions);
    let (tx, observed) = mpsc::unbounded_channel();
    let handle = session::mount(
        options,
        FakeDocument(world.clone()),
        FakeTarget(world.clone()),
        RecordingObserver(tx),
        TemplatePopupRenderer::new().unwrap(),
    );
    let status = handle.subscribe();
    Harness {
        handle,
        world,
        observed,
        status,
    }
}

/// Mount a session against a measurable target.
pub fn mount(options: &MapOptions) -> Harness {
    mount_with(options, Dimensions::new(800.0, 600.0))
}

impl Harness {
    /// Wait until the published status satisfies `check`.
    pub async fn wait_for(&mut self, check: impl FnMut(&SessionStatus) -> bool) -> SessionStatus {
        self.status.wait_for(check).await.unwrap().clone()
    }

    /// Walk the session through load, style load and first idle.
    pub async fn bootstrap(&mut self) {
        self.world.complete_script().await;
        self.wait_for(|s| s.stage == session::SessionStage::AwaitingStyle)
            .await;
        self.world.emit(EngineEvent::Load);
        self.wait_for(|s| s.stage == session::SessionStage::AwaitingIdle)
            .await;
        self.world.emit(EngineEvent::Idle);
        self.wait_for(|s| s.ready).await;
    }

    /// Drain everything the observer has seen so far.
    pub fn drain_observed(&mut self) -> Vec<Observed> {
        let mut seen = Vec::new();
        while let Ok(event) = self.observed.try_recv() {
            seen.push(event);
        }
        seen
    }
}

/// Let the driver run until it has nothing left to do right now.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Poll `check` while letting the driver run, failing after a bound.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if check() {
            return;
        }
        settle().await;
    }
    panic!("condition never became true");
}
