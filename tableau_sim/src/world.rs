//! SimWorld - The simulation harness container.

use crate::context::SimContext;
use crate::dataset;
use crate::exporter::FrameRecorder;

use std::sync::Arc;
use std::time::Duration;
use tableau_core::{RecordStore, RenderBridge, Stage, StageConfig, StageError, StageEvent, TickReport};
use tableau_env::StageContext;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Synthetic records to generate when no sheet is supplied
    pub num_records: usize,

    /// Scheduler ticks per simulated second
    pub frame_rate_hz: u32,

    /// Initial viewport
    pub width: u32,
    pub height: u32,

    pub stage: StageConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_records: 100,
            frame_rate_hz: 60,
            width: 1280,
            height: 720,
            stage: StageConfig::default(),
        }
    }
}

impl SimConfig {
    /// Virtual time between scheduler ticks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz.max(1) as f64)
    }
}

/// The SimWorld - a stage driven by a virtual clock.
pub struct SimWorld<R: RenderBridge = FrameRecorder> {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    stage: Stage<SimContext, R>,

    /// Current tick count
    tick_count: u64,
}

impl SimWorld<FrameRecorder> {
    /// World over `config.num_records` synthetic records with a counting recorder.
    pub fn synthetic(config: SimConfig) -> Result<Self, StageError> {
        let records = dataset::synthetic_store(dataset::data_seed(config.seed), config.num_records)?;
        Self::new(config, records, FrameRecorder::new())
    }
}

impl<R: RenderBridge> SimWorld<R> {
    /// Creates a new SimWorld over the given records and render bridge.
    pub fn new(config: SimConfig, records: RecordStore, renderer: R) -> Result<Self, StageError> {
        let context = SimContext::shared(config.seed);
        Self::with_context(config, context, records, renderer)
    }

    /// Like `new`, with a caller-supplied context (e.g. one shared with a capturing recorder).
    pub fn with_context(
        config: SimConfig,
        context: Arc<SimContext>,
        records: RecordStore,
        renderer: R,
    ) -> Result<Self, StageError> {
        let stage = Stage::new(
            context.clone(),
            records,
            config.stage.clone(),
            renderer,
            config.width,
            config.height,
        )?;

        Ok(Self {
            config,
            context,
            stage,
            tick_count: 0,
        })
    }

    /// Advances the virtual clock by one frame and ticks the stage.
    pub fn tick(&mut self) -> TickReport {
        self.context.advance_time(self.config.frame_interval());
        self.tick_count += 1;
        self.stage.tick()
    }

    /// Ticks until `duration` of virtual time has passed. Returns paints issued.
    pub fn run_for(&mut self, duration: Duration) -> u64 {
        let end = self.context.now() + duration;
        let mut rendered = 0;
        while self.context.now() < end {
            rendered += self.tick().rendered as u64;
        }
        rendered
    }

    /// Ticks until nothing is animating, up to `max_ticks`. Returns ticks spent.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> u64 {
        let mut ticks = 0;
        while self.stage.is_animating() && ticks < max_ticks {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    /// Delivers a host event to the stage.
    pub fn handle(&mut self, event: StageEvent) {
        self.stage.handle(event);
    }

    pub fn stage(&self) -> &Stage<SimContext, R> {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage<SimContext, R> {
        &mut self.stage
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    /// Returns the current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn into_renderer(self) -> R {
        self.stage.into_renderer()
    }
}
