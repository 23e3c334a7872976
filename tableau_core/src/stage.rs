//! Stage - the context object that owns one visualization session.
//!
//! This module ties the pure pieces (records, formations, transitions,
//! camera) to the environment context and a render bridge.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Stage                              │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │              Context: StageContext                   │   │
//! │  │  • now() → transition start / progress               │   │
//! │  │  • random_unit() → scatter + durations               │   │
//! │  │  • sleep() → frame pacing                            │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                              │                              │
//! │  ┌─────────┐ ┌───────────┐ ┌────────────┐ ┌─────────────┐   │
//! │  │ Records │ │ Formation │ │ Transition │ │   Camera +  │   │
//! │  │ + Scene │ │    Set    │ │   Engine   │ │  Controller │   │
//! │  └─────────┘ └───────────┘ └────────────┘ └─────────────┘   │
//! │                              │                              │
//! │                       RenderBridge                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use tableau_core::{Stage, StageConfig, RecordStore, FrameCounter};
//! use tableau_env::TokioContext;
//!
//! let records = RecordStore::from_sheet_json(&json)?;
//! let mut stage = Stage::new(TokioContext::shared(), records, StageConfig::default(),
//!                            FrameCounter::new(), 1280, 720)?;
//!
//! stage.select_sphere();
//! stage.run(Duration::from_millis(16), 300).await;
//! ```

use crate::camera::{Camera, CameraController, ControlInput, DampedOrbitController};
use crate::config::StageConfig;
use crate::error::StageError;
use crate::formation::{FormationKind, FormationSet};
use crate::record::RecordStore;
use crate::render::RenderBridge;
use crate::scene::Scene;
use crate::transition::{TickOutcome, TransitionEngine};

use std::sync::Arc;
use std::time::Duration;
use tableau_env::StageContext;
use tracing::{debug, info};

/// Messages the host delivers to the stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageEvent {
    Select(FormationKind),
    Resize { width: u32, height: u32 },
    Rotate { dx: f64, dy: f64 },
    Zoom { delta: f64 },
    Pan { dx: f64, dy: f64 },
}

/// What one scheduler tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub transition: TickOutcome,
    pub camera_moved: bool,

    /// Paints issued during this tick
    pub rendered: u32,
}

/// One visualization session.
///
/// Generic over the environment context and render bridge so the same
/// stage runs under the wall clock or the simulation's virtual clock.
pub struct Stage<Ctx, R>
where
    Ctx: StageContext,
    R: RenderBridge,
{
    context: Arc<Ctx>,
    config: StageConfig,
    records: RecordStore,
    formations: FormationSet,
    scene: Scene,
    engine: TransitionEngine,
    camera: Camera,
    controller: Box<dyn CameraController>,
    renderer: R,

    /// Last formation selected
    formation: FormationKind,

    tick_count: u64,
    frames_rendered: u64,
}

impl<Ctx, R> Stage<Ctx, R>
where
    Ctx: StageContext,
    R: RenderBridge,
{
    /// Builds the session and starts the initial move into the Table formation.
    ///
    /// Cards start scattered at random; the first formation goes through the
    /// regular transition path rather than snapping into place.
    pub fn new(
        context: Arc<Ctx>,
        records: RecordStore,
        config: StageConfig,
        mut renderer: R,
        width: u32,
        height: u32,
    ) -> Result<Self, StageError> {
        if records.is_empty() {
            return Err(StageError::EmptyRecordStore);
        }
        config.validate()?;

        let formations = FormationSet::build(records.len(), &config.formation);
        let scene = Scene::scatter(&records, config.scatter_extent, || context.random_unit());
        let camera = Camera::new(&config.camera, width, height);
        let controller = Box::new(DampedOrbitController::new(&config.camera));
        renderer.set_size(width, height);

        info!(
            records = records.len(),
            seed = context.seed(),
            width,
            height,
            "Stage constructed"
        );

        let mut stage = Self {
            context,
            config,
            records,
            formations,
            scene,
            engine: TransitionEngine::new(),
            camera,
            controller,
            renderer,
            formation: FormationKind::Table,
            tick_count: 0,
            frames_rendered: 0,
        };
        stage.select_table();

        Ok(stage)
    }

    /// Replaces the default orbit controller.
    pub fn with_controller(mut self, controller: impl CameraController + 'static) -> Self {
        self.controller = Box::new(controller);
        self
    }

    pub fn select_table(&mut self) {
        self.select(FormationKind::Table);
    }

    pub fn select_sphere(&mut self) {
        self.select(FormationKind::Sphere);
    }

    pub fn select_helix(&mut self) {
        self.select(FormationKind::Helix);
    }

    pub fn select_grid(&mut self) {
        self.select(FormationKind::Grid);
    }

    /// Moves every card to `kind` with the configured base duration.
    pub fn select(&mut self, kind: FormationKind) {
        self.transition_to(kind, self.config.base_duration());
    }

    /// Cancels whatever is in flight and starts a move to `kind`.
    pub fn transition_to(&mut self, kind: FormationKind, base: Duration) {
        let now = self.context.now();
        let context = &self.context;

        let scheduled = self.engine.transition_to(
            self.scene.objects(),
            self.formations.get(kind),
            base,
            now,
            || context.random_unit(),
        );
        self.formation = kind;

        info!(
            formation = %kind,
            tweens = scheduled,
            base_ms = base.as_millis() as u64,
            "Formation switch"
        );
    }

    /// One scheduler tick.
    ///
    /// Advances every transition (the render ticker repaints while the
    /// envelope is open), then the camera controller (repaints only if the
    /// camera moved). An idle stage with a still camera does not paint.
    pub fn tick(&mut self) -> TickReport {
        self.tick_count += 1;
        let now = self.context.now();
        let mut rendered = 0;

        let transition = self.engine.advance(self.scene.objects_mut(), now);
        if transition.repaint {
            self.render();
            rendered += 1;
        }
        if transition.settled {
            info!(formation = %self.formation, tick = self.tick_count, "Transition settled");
        }

        let camera_moved = self.controller.update(&mut self.camera);
        if camera_moved {
            self.render();
            rendered += 1;
        }

        if self.tick_count % 60 == 0 {
            debug!(
                tick = self.tick_count,
                active = self.engine.active_count(),
                frames = self.frames_rendered,
                "Stage tick"
            );
        }

        TickReport {
            tick: self.tick_count,
            transition,
            camera_moved,
            rendered,
        }
    }

    /// Dispatches a host event synchronously.
    pub fn handle(&mut self, event: StageEvent) {
        match event {
            StageEvent::Select(kind) => self.select(kind),
            StageEvent::Resize { width, height } => self.on_resize(width, height),
            StageEvent::Rotate { dx, dy } => self.controller.handle_input(ControlInput::Rotate { dx, dy }),
            StageEvent::Zoom { delta } => self.controller.handle_input(ControlInput::Zoom { delta }),
            StageEvent::Pan { dx, dy } => self.controller.handle_input(ControlInput::Pan { dx, dy }),
        }
    }

    /// Updates camera aspect and surface size, then paints once.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
        self.renderer.set_size(width, height);
        debug!(width, height, "Viewport resized");
        self.render();
    }

    /// Drives the stage from the context clock for `frames` ticks.
    pub async fn run(&mut self, frame_interval: Duration, frames: u64) {
        for _ in 0..frames {
            self.tick();
            self.context.sleep(frame_interval).await;
        }
    }

    fn render(&mut self) {
        self.renderer.render(&self.scene, &self.camera);
        self.frames_rendered += 1;
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn formations(&self) -> &FormationSet {
        &self.formations
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn current_formation(&self) -> FormationKind {
        self.formation
    }

    /// True while any tween or the render ticker is running.
    pub fn is_animating(&self) -> bool {
        self.engine.is_animating()
    }

    pub fn transitions(&self) -> &TransitionEngine {
        &self.engine
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Consumes the stage and hands back the render bridge.
    pub fn into_renderer(self) -> R {
        self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FrameCounter;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Mutex;

    /// Manually advanced clock with a seeded RNG.
    struct ManualContext {
        now: Mutex<Duration>,
        rng: Mutex<StdRng>,
    }

    impl ManualContext {
        fn shared(seed: u64) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Duration::ZERO),
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    #[async_trait]
    impl StageContext for ManualContext {
        fn now(&self) -> Duration {
            *self.now.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            self.advance(duration);
        }

        fn random_unit(&self) -> f64 {
            self.rng.lock().unwrap().gen()
        }

        fn seed(&self) -> u64 {
            0
        }
    }

    const FRAME: Duration = Duration::from_millis(16);

    fn records(n: usize) -> RecordStore {
        let rows: Vec<Vec<String>> = (0..n)
            .map(|i| {
                vec![
                    format!("card-{}", i),
                    "https://img/c.png".into(),
                    "29".into(),
                    "Japan".into(),
                    "Go".into(),
                    "$125,000".into(),
                ]
            })
            .collect();
        RecordStore::from_rows(&rows).unwrap()
    }

    fn stage(n: usize) -> (Arc<ManualContext>, Stage<ManualContext, FrameCounter>) {
        let ctx = ManualContext::shared(9);
        let stage = Stage::new(
            ctx.clone(),
            records(n),
            StageConfig::default(),
            FrameCounter::new(),
            1280,
            720,
        )
        .unwrap();
        (ctx, stage)
    }

    fn run_for(ctx: &ManualContext, stage: &mut Stage<ManualContext, FrameCounter>, span: Duration) {
        let end = ctx.now() + span;
        while ctx.now() < end {
            ctx.advance(FRAME);
            stage.tick();
        }
    }

    #[test]
    fn test_empty_store_rejected() {
        let result = Stage::new(
            ManualContext::shared(1),
            RecordStore::default(),
            StageConfig::default(),
            FrameCounter::new(),
            800,
            600,
        );
        assert!(matches!(result, Err(StageError::EmptyRecordStore)));
    }

    #[test]
    fn test_initial_table_is_animated() {
        let (ctx, mut stage) = stage(25);
        let table = stage.formations().get(FormationKind::Table).to_vec();

        assert_eq!(stage.current_formation(), FormationKind::Table);
        assert!(stage.is_animating());
        assert!(stage.scene().max_position_error(&table) > 1.0);
        assert_eq!(stage.renderer().size(), (1280, 720));

        run_for(&ctx, &mut stage, Duration::from_millis(4000));

        assert!(!stage.is_animating());
        assert!(stage.scene().max_position_error(&table) < 1e-9);
    }

    #[test]
    fn test_table_then_sphere_reaches_sphere() {
        let (ctx, mut stage) = stage(3);
        stage.select_table();
        stage.select_sphere();

        run_for(&ctx, &mut stage, Duration::from_millis(4000));

        let sphere = stage.formations().get(FormationKind::Sphere);
        let table = stage.formations().get(FormationKind::Table);
        assert!(stage.scene().max_position_error(sphere) < 1e-9);
        assert!(stage.scene().max_rotation_error(sphere) < 1e-9);
        assert!(stage.scene().max_position_error(table) > 100.0);
    }

    #[test]
    fn test_mid_flight_switch_converges_to_second() {
        let (ctx, mut stage) = stage(40);
        stage.select_grid();
        run_for(&ctx, &mut stage, Duration::from_millis(1500));

        stage.handle(StageEvent::Select(FormationKind::Helix));
        assert_eq!(stage.transitions().generation(), 3);
        run_for(&ctx, &mut stage, Duration::from_millis(4000));

        let helix = stage.formations().get(FormationKind::Helix);
        assert_eq!(helix.len(), 80);
        assert!(stage.scene().max_position_error(helix) < 1e-9);
    }

    #[test]
    fn test_repaint_every_tick_in_envelope_then_idle() {
        let (ctx, mut stage) = stage(10);

        let mut ticks = 0;
        while stage.is_animating() {
            ctx.advance(FRAME);
            let report = stage.tick();
            assert_eq!(report.rendered, 1);
            ticks += 1;
        }
        assert_eq!(stage.frames_rendered(), ticks);
        assert_eq!(ticks, 250);

        for _ in 0..30 {
            ctx.advance(FRAME);
            assert_eq!(stage.tick().rendered, 0);
        }
        assert_eq!(stage.renderer().frames(), ticks);
    }

    #[test]
    fn test_resize_repaints_once() {
        let (_ctx, mut stage) = stage(4);
        stage.handle(StageEvent::Resize { width: 1000, height: 500 });

        assert_eq!(stage.camera().aspect, 2.0);
        assert_eq!(stage.renderer().size(), (1000, 500));
        assert_eq!(stage.frames_rendered(), 1);
    }

    #[test]
    fn test_camera_motion_repaints_when_idle() {
        let (ctx, mut stage) = stage(4);
        run_for(&ctx, &mut stage, Duration::from_millis(4000));
        let before = stage.frames_rendered();

        stage.handle(StageEvent::Zoom { delta: 0.2 });
        ctx.advance(FRAME);
        let report = stage.tick();

        assert!(report.camera_moved);
        assert_eq!(report.rendered, 1);
        assert_eq!(stage.frames_rendered(), before + 1);
        assert!(stage.camera().distance() < 3000.0);
    }

    #[test]
    fn test_helix_object_alignment() {
        let (ctx, mut stage) = stage(5);
        stage.select_helix();
        run_for(&ctx, &mut stage, Duration::from_millis(4000));

        let helix = stage.formations().get(FormationKind::Helix);
        for (i, object) in stage.scene().objects().iter().enumerate() {
            assert!((object.position - helix[i].position).norm() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_run_advances_clock() {
        let (ctx, mut stage) = stage(6);
        // The first tick runs at t=0, so the envelope closes on tick 251.
        stage.run(FRAME, 251).await;

        assert_eq!(stage.tick_count(), 251);
        assert_eq!(ctx.now(), FRAME * 251);
        assert!(!stage.is_animating());
    }
}
