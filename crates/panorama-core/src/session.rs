//! The session lifecycle manager.
//!
//! [`mount`] resolves the host options and spawns one driver task per map.
//! The driver exclusively owns the session state: the resource loader, the
//! engine instance, the rotation animator, every pending deadline and the
//! readiness flag. Nothing else ever holds the engine. Callers interact
//! through a [`SessionHandle`], which sends commands to the driver and
//! watches the published [`SessionStatus`].
//!
//! Bootstrap proceeds through fixed stages, each waiting on one signal:
//!
//! ```text
//! LoadingRuntime ─script loaded─▶ AwaitingLayout ─target measurable─▶
//! AwaitingStyle ─engine load─▶ AwaitingIdle ─engine idle─▶ Ready
//! ```
//!
//! Any stage before `Ready` may end in `Failed`. Teardown may happen at any
//! point. It cancels every pending deadline and animation frame, removes
//! the inserted script and stylesheet, and destroys the engine if one was
//! constructed. It runs exactly once, whether triggered by
//! [`SessionHandle::teardown`], by dropping the handle, or by the driver
//! task being dropped with its runtime.

use panorama_types::{MapOptions, PointOfInterest, SessionId, StepScheduler};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::bootstrap::{self, LayoutPoll, PollOutcome};
use crate::config::RuntimeConfig;
use crate::engine::{EngineEvent, EngineEventSender, FrameId, MapEngine, MapRuntime};
use crate::features;
use crate::host::{HostDocument, MountTarget};
use crate::loader::{LoadError, ResourceLoader};
use crate::navigator::CameraNavigator;
use crate::popup::PopupRenderer;
use crate::rotation::{PendingStep, RotationAnimator, RotationPhase};

/// Why a session could not finish bootstrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapFailure {
    /// The engine script or stylesheet failed to load.
    #[error("engine resources failed to load: {0}")]
    ResourceLoad(String),

    /// The mount target never reached a renderable size.
    #[error("mount target not measurable after {attempts} attempts")]
    LayoutTimeout {
        /// Measurements taken.
        attempts: u32,
    },

    /// The engine refused to construct a map instance.
    #[error("engine construction failed: {0}")]
    EngineConstruct(String),
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    /// No tile provider key was configured; nothing was started.
    MissingApiKey,
    /// Waiting for the engine script to load.
    LoadingRuntime,
    /// Waiting for the mount target to become measurable.
    AwaitingLayout,
    /// Engine constructed; waiting for the base style to load.
    AwaitingStyle,
    /// Feature layers attached; waiting for the first idle signal.
    AwaitingIdle,
    /// Fully bootstrapped.
    Ready,
    /// Bootstrap stopped for good.
    Failed(BootstrapFailure),
    /// Every acquired resource has been released.
    TornDown,
}

/// Snapshot of a session published after every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    /// Lifecycle stage.
    pub stage: SessionStage,
    /// Whether the map finished its first render. Never reverts to `false`.
    pub ready: bool,
    /// Whether the toggled location list is open.
    pub list_open: bool,
    /// Rotation phase.
    pub rotation: RotationPhase,
    /// Rotation steps the engine reported finished.
    pub rotation_steps: u64,
    /// Bearing of the latest rotation step.
    pub bearing: f64,
}

impl SessionStatus {
    fn at(stage: SessionStage, bearing: f64) -> Self {
        Self {
            stage,
            ready: false,
            list_open: false,
            rotation: RotationPhase::Idle,
            rotation_steps: 0,
            bearing,
        }
    }
}

/// Receives the session's externally visible events.
///
/// Both methods run on the driver task and must not block.
pub trait SessionObserver: Send + 'static {
    /// The map finished its first render after features were attached.
    /// Called exactly once per session, and never after teardown.
    fn on_map_ready(&mut self) {}

    /// A point selected through [`SessionHandle::go_to`] is about to come
    /// into view.
    fn on_marker_click(&mut self, _point: &PointOfInterest, _index: usize) {}
}

/// An observer that ignores every event.
pub struct NoOpObserver;

impl SessionObserver for NoOpObserver {}

/// Requests sent from a [`SessionHandle`] to its driver.
#[derive(Debug, Clone)]
enum SessionCommand {
    GoTo { point: PointOfInterest, index: usize },
    ToggleList,
}

/// Caller's side of a mounted session.
///
/// Dropping the handle tears the session down in the background; call
/// [`teardown`](Self::teardown) to wait for it.
pub struct SessionHandle {
    id: SessionId,
    config: RuntimeConfig,
    status: watch::Receiver<SessionStatus>,
    commands: Option<mpsc::UnboundedSender<SessionCommand>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Session identifier, also attached to every log line of the driver.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Resolved configuration of this session.
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Latest published status.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// A receiver that observes every future status change.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Whether the map finished its first render.
    pub fn is_ready(&self) -> bool {
        self.status.borrow().ready
    }

    /// Fly to `point` and notify the observer when it comes into view.
    ///
    /// Ignored by the driver until the engine has been constructed.
    /// Returns `false` if the session is no longer running.
    pub fn go_to(&self, point: PointOfInterest, index: usize) -> bool {
        self.send(SessionCommand::GoTo { point, index })
    }

    /// Open or close the location list. Has no effect when the list is
    /// hidden or pinned. Returns `false` if the session is no longer
    /// running.
    pub fn toggle_list(&self) -> bool {
        self.send(SessionCommand::ToggleList)
    }

    fn send(&self, command: SessionCommand) -> bool {
        self.commands
            .as_ref()
            .is_some_and(|commands| commands.send(command).is_ok())
    }

    /// Tear the session down and wait until every resource is released.
    ///
    /// Safe to call repeatedly; later calls return immediately.
    pub async fn teardown(&mut self) {
        self.commands = None;
        if let Some(shutdown) = self.shutdown.take() {
            if shutdown.send(()).is_err() {
                debug!(session_id = %self.id, "Session driver already stopped");
            }
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(session_id = %self.id, error = %e, "Session driver ended abnormally");
            }
        }
    }
}

/// Mount a map session.
///
/// Resolves `options` and, when a tile provider key is present, spawns the
/// driver task that bootstraps the map. Without a key the session stays in
/// [`SessionStage::MissingApiKey`] and nothing is loaded.
///
/// Must be called from within a Tokio runtime.
pub fn mount<D, T, O, P>(
    options: &MapOptions,
    document: D,
    target: T,
    observer: O,
    renderer: P,
) -> SessionHandle
where
    D: HostDocument,
    T: MountTarget,
    O: SessionObserver,
    P: PopupRenderer + 'static,
{
    let id = SessionId::new();
    let config = RuntimeConfig::resolve(options);
    let initial_bearing = config.rotation.initial_bearing;

    if !config.has_api_key() {
        warn!(session_id = %id, "No tile provider key configured, map not started");
        let (_, status) = watch::channel(SessionStatus::at(
            SessionStage::MissingApiKey,
            initial_bearing,
        ));
        return SessionHandle {
            id,
            config,
            status,
            commands: None,
            shutdown: None,
            task: None,
        };
    }

    let (status_tx, status) = watch::channel(SessionStatus::at(
        SessionStage::LoadingRuntime,
        initial_bearing,
    ));
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let state = SessionState {
        id,
        config: config.clone(),
        points: options.points.clone(),
        loader: ResourceLoader::new(document),
        runtime: None,
        target,
        layout: LayoutPoll::from_config(&config.bootstrap),
        layout_due: None,
        engine: None,
        events: event_tx,
        rotation: RotationAnimator::new(config.rotation, config.camera.center),
        navigator: CameraNavigator::from_config(config.animation, &config.ui),
        selections: Vec::new(),
        stage: SessionStage::LoadingRuntime,
        ready: false,
        list_open: false,
        observer,
        renderer,
        status: status_tx,
    };

    info!(
        session_id = %id,
        points = options.points.len(),
        rotation = config.rotation.enabled,
        terrain = config.terrain.enabled,
        "Session mounted"
    );

    let span = info_span!("session", session_id = %id);
    let task = tokio::spawn(drive(state, event_rx, command_rx, shutdown_rx).instrument(span));

    SessionHandle {
        id,
        config,
        status,
        commands: Some(command_tx),
        shutdown: Some(shutdown_tx),
        task: Some(task),
    }
}

/// A selection notice waiting for its flight to land.
struct PendingSelection {
    due: Instant,
    point: PointOfInterest,
    index: usize,
}

type EngineOf<D> = <<D as HostDocument>::Runtime as MapRuntime>::Engine;

/// Everything one session owns. Only the driver task touches it.
struct SessionState<D, T, O, P>
where
    D: HostDocument,
    T: MountTarget,
    O: SessionObserver,
    P: PopupRenderer,
{
    id: SessionId,
    config: RuntimeConfig,
    points: Vec<PointOfInterest>,
    loader: ResourceLoader<D>,
    runtime: Option<D::Runtime>,
    target: T,
    layout: LayoutPoll,
    layout_due: Option<Instant>,
    engine: Option<EngineOf<D>>,
    events: EngineEventSender,
    rotation: RotationAnimator,
    navigator: CameraNavigator,
    selections: Vec<PendingSelection>,
    stage: SessionStage,
    ready: bool,
    list_open: bool,
    observer: O,
    renderer: P,
    status: watch::Sender<SessionStatus>,
}

impl<D, T, O, P> SessionState<D, T, O, P>
where
    D: HostDocument,
    T: MountTarget,
    O: SessionObserver,
    P: PopupRenderer,
{
    fn begin(&mut self) {
        let resources = &self.config.resources;
        self.loader
            .load(&resources.script_url, &resources.stylesheet_url);
    }

    fn publish(&self) {
        self.status.send_replace(SessionStatus {
            stage: self.stage.clone(),
            ready: self.ready,
            list_open: self.list_open,
            rotation: self.rotation.phase(),
            rotation_steps: self.rotation.steps_completed(),
            bearing: self.rotation.bearing(),
        });
    }

    fn set_stage(&mut self, stage: SessionStage) {
        debug!(from = ?self.stage, to = ?stage, "Session stage changed");
        self.stage = stage;
        self.publish();
    }

    fn fail(&mut self, failure: BootstrapFailure) {
        error!(error = %failure, "Session bootstrap failed");
        self.layout_due = None;
        self.set_stage(SessionStage::Failed(failure));
    }

    // -----------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------

    fn on_runtime(&mut self, result: Result<D::Runtime, LoadError>) {
        match result {
            Ok(runtime) => {
                info!("Engine runtime loaded");
                self.runtime = Some(runtime);
                self.layout_due = Some(Instant::now());
                self.set_stage(SessionStage::AwaitingLayout);
            }
            Err(e) => self.fail(BootstrapFailure::ResourceLoad(e.to_string())),
        }
    }

    fn poll_layout(&mut self) {
        self.layout_due = None;
        if self.stage != SessionStage::AwaitingLayout {
            return;
        }
        match self.layout.poll(&self.target) {
            PollOutcome::Ready(_) => self.construct(),
            PollOutcome::Retry(delay) => self.layout_due = Instant::now().checked_add(delay),
            PollOutcome::Exhausted { attempts } => {
                self.fail(BootstrapFailure::LayoutTimeout { attempts });
            }
        }
    }

    fn construct(&mut self) {
        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        let result = bootstrap::construct_engine(
            runtime,
            &self.config,
            self.target.id(),
            self.events.clone(),
        );
        match result {
            Ok(engine) => {
                self.engine = Some(engine);
                self.set_stage(SessionStage::AwaitingStyle);
            }
            Err(e) => self.fail(BootstrapFailure::EngineConstruct(e.to_string())),
        }
    }

    // -----------------------------------------------------------------
    // Engine events
    // -----------------------------------------------------------------

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Load => self.on_style_loaded(),
            EngineEvent::Idle => self.on_idle(),
            EngineEvent::MoveEnd => self.on_move_end(),
            EngineEvent::AnimationFrame(id) => {
                if self.rotation.pending() == Some(PendingStep::Frame(id)) {
                    self.run_rotation_step();
                }
            }
            event if event.is_user_interaction() => self.on_user_interaction(event),
            // Covered by the interaction arm above.
            EngineEvent::MouseDown | EngineEvent::TouchStart | EngineEvent::Wheel => {}
        }
    }

    fn on_style_loaded(&mut self) {
        if self.stage != SessionStage::AwaitingStyle {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        features::build_layers(engine, &self.config, &self.points, &self.renderer);
        self.set_stage(SessionStage::AwaitingIdle);
    }

    fn on_idle(&mut self) {
        if self.stage != SessionStage::AwaitingIdle {
            return;
        }
        if let Some(ease) = self.rotation.start() {
            if let Some(engine) = self.engine.as_mut() {
                engine.ease_to(&ease);
            }
            info!(
                degrees_per_step = self.config.rotation.degrees_per_step,
                step_duration_ms = self.config.rotation.step_duration_ms,
                "Rotation started"
            );
        }
        self.ready = true;
        self.set_stage(SessionStage::Ready);
        info!("Map ready");
        self.observer.on_map_ready();
    }

    fn on_move_end(&mut self) {
        if !self.rotation.on_move_end() {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let step = match self.rotation.scheduler() {
            StepScheduler::Timeout => PendingStep::Timer {
                due: Instant::now(),
            },
            StepScheduler::AnimationFrame => PendingStep::Frame(engine.request_animation_frame()),
        };
        if let Some(PendingStep::Frame(stale)) = self.rotation.schedule(step) {
            engine.cancel_animation_frame(stale);
        }
        self.publish();
    }

    fn on_user_interaction(&mut self, event: EngineEvent) {
        if self.rotation.phase() != RotationPhase::Stepping {
            return;
        }
        self.stop_rotation();
        info!(?event, "Rotation stopped by user input");
        self.publish();
    }

    fn stop_rotation(&mut self) {
        if let Some(PendingStep::Frame(id)) = self.rotation.interrupt() {
            self.cancel_frame(id);
        }
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel_animation_frame(id);
        }
    }

    fn run_rotation_step(&mut self) {
        let Some(ease) = self.rotation.next_step() else {
            return;
        };
        if let Some(engine) = self.engine.as_mut() {
            engine.ease_to(&ease);
        }
        debug!(bearing = ease.bearing, "Rotation step requested");
        self.publish();
    }

    // -----------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::GoTo { point, index } => self.go_to(point, index),
            SessionCommand::ToggleList => {
                let layout = self.config.ui.list_layout();
                if layout.visible && !layout.pinned {
                    self.list_open = !self.list_open;
                    self.publish();
                }
            }
        }
    }

    fn go_to(&mut self, point: PointOfInterest, index: usize) {
        if self.engine.is_none() {
            debug!(index, "Engine not constructed yet, ignoring navigation");
            return;
        }
        let navigation = self.navigator.plan(&point);

        self.stop_rotation();
        if let Some(engine) = self.engine.as_mut() {
            engine.fly_to(&navigation.request);
        }

        info!(
            index,
            title = %point.title,
            duration_ms = navigation.request.duration_ms,
            "Flying to point"
        );

        if let Some(due) = Instant::now().checked_add(navigation.notify_after) {
            self.selections.push(PendingSelection { due, point, index });
        }
        if navigation.close_list {
            self.list_open = false;
        }
        self.publish();
    }

    fn next_selection_due(&self) -> Option<Instant> {
        self.selections.iter().map(|s| s.due).min()
    }

    fn fire_due_selections(&mut self) {
        let now = Instant::now();
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.selections)
            .into_iter()
            .partition(|s| s.due <= now);
        self.selections = pending;
        due.sort_by_key(|s| s.due);
        for selection in due {
            debug!(index = selection.index, "Selection notice fired");
            self.observer
                .on_marker_click(&selection.point, selection.index);
        }
    }

    // -----------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------

    fn teardown(&mut self) {
        if self.stage == SessionStage::TornDown {
            return;
        }

        if let Some(PendingStep::Frame(id)) = self.rotation.stop() {
            self.cancel_frame(id);
        }
        self.selections.clear();
        self.layout_due = None;
        self.loader.release();

        let had_engine = self
            .engine
            .take()
            .map(|mut engine| engine.remove())
            .is_some();
        self.runtime = None;

        self.set_stage(SessionStage::TornDown);
        info!(engine_removed = had_engine, "Session torn down");
    }
}

impl<D, T, O, P> Drop for SessionState<D, T, O, P>
where
    D: HostDocument,
    T: MountTarget,
    O: SessionObserver,
    P: PopupRenderer,
{
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Resolve at `deadline`, or never when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// The driver loop. Returns after teardown.
async fn drive<D, T, O, P>(
    mut state: SessionState<D, T, O, P>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    mut shutdown: oneshot::Receiver<()>,
) where
    D: HostDocument,
    T: MountTarget,
    O: SessionObserver,
    P: PopupRenderer,
{
    state.begin();

    loop {
        let layout_due = state.layout_due;
        let rotation_due = state.rotation.timer_due();
        let selection_due = state.next_selection_due();
        let loading = state.loader.is_pending();

        tokio::select! {
            biased;

            // --- Teardown: explicit request or dropped handle ---
            _ = &mut shutdown => break,

            command = commands.recv() => match command {
                Some(command) => state.on_command(command),
                None => break,
            },

            result = state.loader.completion(), if loading => state.on_runtime(result),

            () = wait_until(layout_due) => state.poll_layout(),

            Some(event) = events.recv() => state.on_engine_event(event),

            () = wait_until(rotation_due) => state.run_rotation_step(),

            () = wait_until(selection_due) => state.fire_due_selections(),
        }
    }

    state.teardown();
}
