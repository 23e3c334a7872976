//! Scenario runner - executes deterministic stage scenarios.

use crate::context::SimContext;
use crate::dataset;
use crate::exporter::{FrameRecorder, SimExport};
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use std::collections::HashSet;
use tableau_core::{FormationKind, RecordStore, StageConfig, StageError, StageEvent};
use tracing::{debug, info, warn};

/// Largest accepted distance (position units or radians) from a settled card to its target.
const TOLERANCE: f64 = 1e-6;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Cards on stage
    pub record_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Paints issued over the whole run
    pub paints: u64,

    /// Formation switches issued
    pub transitions: u64,

    /// Longest switch, in ticks
    pub max_settle_ticks: u64,

    /// Paints observed while the stage should have been quiet
    pub idle_paints: u64,

    /// Paints caused by camera motion alone
    pub camera_paints: u64,

    /// Largest settled distance from a card to its target
    pub max_error: f64,
}

type Outcome = Result<(), String>;

/// Runs stage scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Synthetic records when no record store is supplied
    num_records: usize,

    /// Tick rate in Hz
    frame_rate_hz: u32,

    stage_config: StageConfig,

    records: Option<RecordStore>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_records: usize) -> Self {
        Self {
            seed,
            num_records,
            frame_rate_hz: 60,
            stage_config: StageConfig::default(),
            records: None,
        }
    }

    /// Sets the tick rate.
    pub fn with_frame_rate(mut self, hz: u32) -> Self {
        self.frame_rate_hz = hz;
        self
    }

    pub fn with_config(mut self, config: StageConfig) -> Self {
        self.stage_config = config;
        self
    }

    /// Uses these records instead of synthetic ones.
    pub fn with_records(mut self, records: RecordStore) -> Self {
        self.records = Some(records);
        self
    }

    fn sim_config(&self) -> SimConfig {
        SimConfig {
            seed: self.seed,
            num_records: self.num_records,
            frame_rate_hz: self.frame_rate_hz,
            stage: self.stage_config.clone(),
            ..Default::default()
        }
    }

    fn records(&self) -> Result<RecordStore, StageError> {
        match &self.records {
            Some(records) => Ok(records.clone()),
            None => Ok(dataset::synthetic_store(dataset::data_seed(self.seed), self.num_records)?),
        }
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let world = self
            .records()
            .and_then(|records| SimWorld::new(self.sim_config(), records, FrameRecorder::new()));

        match world {
            Ok(mut world) => self.execute(scenario, &mut world),
            Err(e) => self.construction_failed(scenario, e),
        }
    }

    /// Runs a scenario while capturing every `capture_every`-th paint.
    pub fn run_with_export(&self, scenario: ScenarioId, capture_every: u64) -> (ScenarioResult, SimExport) {
        info!("Starting scenario: {} (seed={}) with export", scenario.name(), self.seed);

        let context = SimContext::shared(self.seed);
        let recorder = FrameRecorder::capturing((*context).clone(), capture_every);
        let world = self
            .records()
            .and_then(|records| SimWorld::with_context(self.sim_config(), context, records, recorder));

        let mut world = match world {
            Ok(world) => world,
            Err(e) => {
                let result = self.construction_failed(scenario, e);
                let export = SimExport::new(scenario.name(), self.seed, 0);
                return (result, export);
            }
        };

        let result = self.execute(scenario, &mut world);

        let mut export = SimExport::new(scenario.name(), self.seed, result.record_count);
        for frame in world.stage_mut().renderer_mut().take_frames() {
            export.add_frame(frame);
        }
        export.finalize(
            result.passed,
            result.metrics.paints,
            result.final_time_secs,
            Some(result.metrics.max_error),
        );

        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, world: &mut SimWorld) -> ScenarioResult {
        let mut metrics = ScenarioMetrics::default();

        let outcome = match scenario {
            ScenarioId::InitialTable => self.run_initial_table(world, &mut metrics),
            ScenarioId::SphereSweep => self.run_sphere_sweep(world, &mut metrics),
            ScenarioId::Supersession => self.run_supersession(world, &mut metrics),
            ScenarioId::HelixPairs => self.run_helix_pairs(world, &mut metrics),
            ScenarioId::GridLayers => self.run_grid_layers(world, &mut metrics),
            ScenarioId::Resize => self.run_resize(world, &mut metrics),
            ScenarioId::IdleQuiet => self.run_idle_quiet(world, &mut metrics),
            ScenarioId::Tour => self.run_tour(world, &mut metrics),
        };

        metrics.paints = world.stage().frames_rendered();
        if let Err(reason) = &outcome {
            warn!("Scenario {} failed: {}", scenario.name(), reason);
        }

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: outcome.is_ok(),
            total_ticks: world.tick_count(),
            final_time_secs: world.time(),
            record_count: world.stage().records().len(),
            failure_reason: outcome.err(),
            metrics,
        }
    }

    fn construction_failed(&self, scenario: ScenarioId, error: StageError) -> ScenarioResult {
        warn!("Scenario {} could not build a stage: {}", scenario.name(), error);
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            final_time_secs: 0.0,
            record_count: 0,
            failure_reason: Some(format!("Stage construction failed: {}", error)),
            metrics: ScenarioMetrics::default(),
        }
    }

    /// TAB-001: InitialTable - scattered cards settle into the table.
    fn run_initial_table(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Outcome {
        metrics.transitions += 1;
        if world.stage().current_formation() != FormationKind::Table {
            return Err(format!("Stage opened on {}", world.stage().current_formation()));
        }

        settle(world, FormationKind::Table, metrics, true)?;
        expect_quiet(world, 60, metrics)
    }

    /// TAB-002: SphereSweep - every formation in turn.
    fn run_sphere_sweep(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Outcome {
        metrics.transitions += 1;
        settle(world, FormationKind::Table, metrics, true)?;

        for kind in [
            FormationKind::Sphere,
            FormationKind::Helix,
            FormationKind::Grid,
            FormationKind::Table,
        ] {
            let ticks = select_and_settle(world, kind, metrics)?;
            debug!("  {} settled in {} ticks", kind, ticks);
        }

        expect_quiet(world, 30, metrics)
    }

    /// TAB-003: Supersession - grid interrupted by helix at half time.
    fn run_supersession(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Outcome {
        metrics.transitions += 1;
        settle(world, FormationKind::Table, metrics, true)?;

        let half = world.stage().config().base_duration() / 2;
        world.handle(StageEvent::Select(FormationKind::Grid));
        metrics.transitions += 1;
        world.run_for(half);

        if !world.stage().is_animating() {
            return Err("Grid switch finished before it was interrupted".to_string());
        }

        let grid = world.stage().formations().get(FormationKind::Grid);
        if world.stage().scene().max_position_error(grid) <= TOLERANCE {
            return Err("Cards reached the grid before half time".to_string());
        }

        select_and_settle(world, FormationKind::Helix, metrics)?;

        let generation = world.stage().transitions().generation();
        if generation != metrics.transitions {
            return Err(format!("Expected {} switches, engine saw {}", metrics.transitions, generation));
        }

        let grid = world.stage().formations().get(FormationKind::Grid);
        let grid_error = world.stage().scene().max_position_error(grid);
        if grid_error < 1.0 {
            return Err(format!("Cards ended near the superseded grid ({:.3})", grid_error));
        }

        Ok(())
    }

    /// TAB-004: HelixPairs - 2N targets, pairs share height, opposite azimuth.
    fn run_helix_pairs(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Outcome {
        metrics.transitions += 1;
        settle(world, FormationKind::Table, metrics, true)?;

        let count = world.stage().records().len();
        let radius = world.stage().config().formation.helix_radius;
        let helix = world.stage().formations().get(FormationKind::Helix);

        if helix.len() != 2 * count {
            return Err(format!("Helix has {} targets for {} records", helix.len(), count));
        }

        for (k, pair) in helix.chunks_exact(2).enumerate() {
            let (a, b) = (pair[0].position, pair[1].position);

            if (a.y - b.y).abs() > TOLERANCE {
                return Err(format!("Helix pair {} heights differ: {} vs {}", k, a.y, b.y));
            }
            if (a.x + b.x).abs() > TOLERANCE || (a.z + b.z).abs() > TOLERANCE {
                return Err(format!("Helix pair {} strands are not half a turn apart", k));
            }
            if (a.x.hypot(a.z) - radius).abs() > TOLERANCE {
                return Err(format!("Helix pair {} is off the cylinder", k));
            }
        }

        select_and_settle(world, FormationKind::Helix, metrics)?;
        Ok(())
    }

    /// TAB-005: GridLayers - unique cells, ceil(N / cells-per-layer) layers.
    fn run_grid_layers(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Outcome {
        metrics.transitions += 1;
        settle(world, FormationKind::Table, metrics, true)?;

        let count = world.stage().records().len();
        let [dx, dy] = world.stage().config().formation.grid_dims;
        let grid = world.stage().formations().get(FormationKind::Grid);

        let cells: HashSet<(i64, i64, i64)> = grid
            .iter()
            .map(|t| {
                (
                    t.position.x.round() as i64,
                    t.position.y.round() as i64,
                    t.position.z.round() as i64,
                )
            })
            .collect();
        if cells.len() != count {
            return Err(format!("{} grid cells for {} records", cells.len(), count));
        }

        let layers: HashSet<i64> = cells.iter().map(|c| c.2).collect();
        let expected = count.div_ceil(dx * dy);
        if layers.len() != expected {
            return Err(format!("{} grid layers, expected {}", layers.len(), expected));
        }

        select_and_settle(world, FormationKind::Grid, metrics)?;
        Ok(())
    }

    /// TAB-006: Resize - one paint per resize, aspect follows the viewport.
    fn run_resize(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Outcome {
        metrics.transitions += 1;
        settle(world, FormationKind::Table, metrics, true)?;

        for (width, height) in [(800, 600), (1920, 1080), (640, 0)] {
            let before = world.stage().frames_rendered();
            world.handle(StageEvent::Resize { width, height });

            let paints = world.stage().frames_rendered() - before;
            if paints != 1 {
                return Err(format!("Resize to {}x{} painted {} times", width, height, paints));
            }

            let expected = width as f64 / height.max(1) as f64;
            if (world.stage().camera().aspect - expected).abs() > 1e-12 {
                return Err(format!("Aspect {} after resize, expected {}", world.stage().camera().aspect, expected));
            }
            if world.stage().renderer().size() != (width, height) {
                return Err(format!("Surface size not updated to {}x{}", width, height));
            }
        }

        expect_quiet(world, 30, metrics)
    }

    /// TAB-007: IdleQuiet - no paints while idle; a flick coasts, then stops.
    fn run_idle_quiet(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Outcome {
        metrics.transitions += 1;
        settle(world, FormationKind::Table, metrics, true)?;
        expect_quiet(world, 120, metrics)?;

        world.handle(StageEvent::Rotate { dx: 0.05, dy: 0.02 });

        let mut moving_ticks = 0;
        loop {
            let report = world.tick();
            if !report.camera_moved {
                break;
            }
            moving_ticks += 1;
            metrics.camera_paints += report.rendered as u64;

            if moving_ticks > 10_000 {
                return Err("Camera never came to rest".to_string());
            }
        }

        if moving_ticks < 2 {
            return Err(format!("Camera flick moved for only {} ticks", moving_ticks));
        }

        expect_quiet(world, 60, metrics)?;

        // Camera motion never moves the cards
        check_converged(world, FormationKind::Table, metrics)
    }

    /// TAB-008: Tour - switches issued mid-flight, mixed with camera input.
    fn run_tour(&self, world: &mut SimWorld, metrics: &mut ScenarioMetrics) -> Outcome {
        let base = world.stage().config().base_duration();

        metrics.transitions += 1;
        settle(world, FormationKind::Table, metrics, true)?;

        world.handle(StageEvent::Select(FormationKind::Sphere));
        metrics.transitions += 1;
        world.run_for(base / 2);

        world.handle(StageEvent::Rotate { dx: 0.1, dy: -0.05 });
        world.handle(StageEvent::Zoom { delta: 0.3 });
        world.run_for(base / 4);

        world.handle(StageEvent::Select(FormationKind::Helix));
        metrics.transitions += 1;
        settle(world, FormationKind::Helix, metrics, false)?;

        world.handle(StageEvent::Pan { dx: 0.05, dy: 0.0 });
        world.handle(StageEvent::Select(FormationKind::Grid));
        metrics.transitions += 1;
        settle(world, FormationKind::Grid, metrics, false)?;

        world.handle(StageEvent::Resize { width: 1024, height: 768 });
        select_and_settle(world, FormationKind::Table, metrics)?;

        let camera = &world.stage().config().camera;
        let distance = world.stage().camera().distance();
        if distance < camera.min_distance - TOLERANCE || distance > camera.max_distance + TOLERANCE {
            return Err(format!("Camera distance {:.1} outside its limits", distance));
        }

        expect_quiet(world, 60, metrics)
    }
}

/// Upper bound on ticks for one switch: twice the envelope.
fn max_settle_ticks(world: &SimWorld) -> u64 {
    let envelope = world.stage().config().base_duration() * 2;
    let frame = world.config.frame_interval();
    2 * (envelope.as_nanos() / frame.as_nanos().max(1)) as u64 + 2
}

/// Runs the in-flight switch to completion and checks the cards landed.
///
/// With a still camera every tick of the envelope paints exactly once.
fn settle(world: &mut SimWorld, kind: FormationKind, metrics: &mut ScenarioMetrics, still_camera: bool) -> Result<u64, String> {
    let before = world.stage().frames_rendered();
    let limit = max_settle_ticks(world);
    let ticks = world.run_until_idle(limit);

    if world.stage().is_animating() {
        return Err(format!("{} did not settle within {} ticks", kind, ticks));
    }

    let paints = world.stage().frames_rendered() - before;
    if still_camera && paints != ticks {
        return Err(format!("{} painted {} times over {} ticks", kind, paints, ticks));
    }

    metrics.max_settle_ticks = metrics.max_settle_ticks.max(ticks);
    check_converged(world, kind, metrics)?;

    debug!("  t={:.2}s | {} settled | paints={}", world.time(), kind, paints);
    Ok(ticks)
}

fn select_and_settle(world: &mut SimWorld, kind: FormationKind, metrics: &mut ScenarioMetrics) -> Result<u64, String> {
    world.handle(StageEvent::Select(kind));
    metrics.transitions += 1;
    settle(world, kind, metrics, true)
}

fn check_converged(world: &SimWorld, kind: FormationKind, metrics: &mut ScenarioMetrics) -> Outcome {
    let targets = world.stage().formations().get(kind);
    let scene = world.stage().scene();
    let position = scene.max_position_error(targets);
    let rotation = scene.max_rotation_error(targets);

    metrics.max_error = metrics.max_error.max(position);

    if position > TOLERANCE || rotation > TOLERANCE {
        return Err(format!(
            "{} off target by {:.3e} (rotation {:.3e})",
            kind, position, rotation
        ));
    }
    Ok(())
}

/// Ticks `ticks` times and fails on any paint.
fn expect_quiet(world: &mut SimWorld, ticks: u64, metrics: &mut ScenarioMetrics) -> Outcome {
    let paints: u64 = (0..ticks).map(|_| world.tick().rendered as u64).sum();
    metrics.idle_paints += paints;

    if paints > 0 {
        return Err(format!("{} paints over {} idle ticks", paints, ticks));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_passed(result: &ScenarioResult) {
        assert!(
            result.passed,
            "{} failed: {:?}",
            result.scenario,
            result.failure_reason
        );
    }

    #[test]
    fn test_all_scenarios_pass() {
        let runner = ScenarioRunner::new(42, 60);

        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert_passed(&result);
            assert_eq!(result.record_count, 60);
            assert_eq!(result.metrics.idle_paints, 0);
        }
    }

    #[test]
    fn test_three_records() {
        let runner = ScenarioRunner::new(7, 3);

        let result = runner.run(ScenarioId::SphereSweep);
        assert_passed(&result);
        assert_eq!(result.metrics.transitions, 5);
    }

    #[test]
    fn test_supersession_counts_switches() {
        let runner = ScenarioRunner::new(11, 45);

        let result = runner.run(ScenarioId::Supersession);
        assert_passed(&result);
        assert_eq!(result.metrics.transitions, 3);
    }

    #[test]
    fn test_idle_quiet_camera_paints() {
        let runner = ScenarioRunner::new(42, 20);

        let result = runner.run(ScenarioId::IdleQuiet);
        assert_passed(&result);
        assert!(result.metrics.camera_paints >= 2);
    }

    #[test]
    fn test_other_frame_rate() {
        let runner = ScenarioRunner::new(42, 25).with_frame_rate(30);

        let result = runner.run(ScenarioId::Tour);
        assert_passed(&result);
    }

    #[test]
    fn test_custom_config() {
        let mut config = StageConfig::default();
        config.base_duration_ms = 500;
        config.formation.helix_angular_step = 0.175;

        let runner = ScenarioRunner::new(5, 30).with_config(config);
        assert_passed(&runner.run(ScenarioId::HelixPairs));
        assert_passed(&runner.run(ScenarioId::Supersession));
    }

    #[test]
    fn test_supplied_records() {
        let records = dataset::synthetic_store(99, 8).unwrap();
        let runner = ScenarioRunner::new(1, 500).with_records(records);

        let result = runner.run(ScenarioId::GridLayers);
        assert_passed(&result);
        assert_eq!(result.record_count, 8);
    }

    #[test]
    fn test_empty_records_fail_cleanly() {
        let runner = ScenarioRunner::new(1, 0);

        let result = runner.run(ScenarioId::InitialTable);
        assert!(!result.passed);
        assert_eq!(result.total_ticks, 0);
        assert!(result.failure_reason.unwrap().contains("empty record store"));
    }

    #[test]
    fn test_tour_deterministic() {
        let runner1 = ScenarioRunner::new(42, 50);
        let runner2 = ScenarioRunner::new(42, 50);

        let result1 = runner1.run(ScenarioId::Tour);
        let result2 = runner2.run(ScenarioId::Tour);

        assert_eq!(result1.total_ticks, result2.total_ticks);
        assert_eq!(result1.metrics.paints, result2.metrics.paints);
    }

    #[test]
    fn test_export_captures_frames() {
        let runner = ScenarioRunner::new(42, 12);

        let (result, export) = runner.run_with_export(ScenarioId::InitialTable, 10);
        assert_passed(&result);
        assert!(export.passed);
        assert_eq!(export.records, 12);
        assert_eq!(export.paints, result.metrics.paints);
        assert_eq!(export.frames.len() as u64, result.metrics.paints.div_ceil(10));
        assert!(export.frames.iter().all(|f| f.cards.len() == 12));
    }
}
