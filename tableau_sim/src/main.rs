//! Tableau DST Simulator CLI
//!
//! Run deterministic stage scenarios, export captured frames, or drive a
//! stage against the wall clock.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tableau_core::{FormationKind, FrameCounter, RecordStore, Stage, StageConfig, StageError};
use tableau_env::TokioContext;
use tableau_sim::scenarios::ScenarioId;
use tableau_sim::{dataset, RerunBridge, ScenarioResult, ScenarioRunner, SimConfig, SimWorld};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Tableau Deterministic Simulation Testing CLI
#[derive(Parser, Debug)]
#[command(name = "tableau-sim")]
#[command(about = "Run deterministic simulation tests for the Tableau stage", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of synthetic records (ignored with --data)
    #[arg(short, long, default_value = "100")]
    records: usize,

    /// Scenario to run (initial_table, sphere_sweep, supersession, helix_pairs,
    /// grid_layers, resize, idle_quiet, tour, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Scheduler ticks per simulated second
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Sheet response JSON ({"values": [[...], ...]}) to use instead of synthetic rows
    #[arg(long)]
    data: Option<PathBuf>,

    /// Stage configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Export captured frames of a single scenario to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Capture every n-th paint when exporting
    #[arg(long, default_value = "10")]
    capture_every: u64,

    /// Drive the stage against the wall clock instead of running scenarios
    #[arg(long)]
    realtime: bool,

    /// Stream a simulated formation cycle to a Rerun viewer
    #[arg(long)]
    rerun: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Tableau DST Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let config = match &args.config {
        Some(path) => StageConfig::load(path).unwrap_or_else(|e| {
            error!("Failed to load config {}: {}", path.display(), e);
            std::process::exit(1);
        }),
        None => StageConfig::default(),
    };

    let records = args.data.as_ref().map(|path| {
        dataset::load_sheet(path).unwrap_or_else(|e| {
            error!("Failed to load records from {}: {}", path.display(), e);
            std::process::exit(1);
        })
    });

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if args.realtime {
        let records = match records {
            Some(records) => records,
            None => synthetic_or_exit(base_seed, args.records),
        };
        std::process::exit(run_realtime(records, config, args.fps));
    }

    if args.rerun {
        let records = match records {
            Some(records) => records,
            None => synthetic_or_exit(base_seed, args.records),
        };
        std::process::exit(run_rerun(base_seed, records, config, args.fps));
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!(
                "Available scenarios: {}, all",
                ScenarioId::all().iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
            );
            std::process::exit(1);
        })]
    };

    let runner_for = |seed: u64| {
        let runner = ScenarioRunner::new(seed, args.records)
            .with_frame_rate(args.fps)
            .with_config(config.clone());
        match &records {
            Some(records) => runner.with_records(records.clone()),
            None => runner,
        }
    };

    // Handle --export mode for replay
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        info!("Running with export to: {}", export_path);

        let (result, export) = runner_for(base_seed).run_with_export(scenarios[0], args.capture_every);

        if let Err(e) = export.write_to_file(export_path) {
            error!("Failed to write export: {:?}", e);
        } else {
            info!("Exported {} frames to {}", export.frames.len(), export_path);
        }

        if result.passed {
            info!("✓ {} (seed={}) PASSED - exported to {}", scenarios[0].name(), base_seed, export_path);
        } else {
            error!(
                "✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        return;
    }

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = runner_for(seed);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED | ticks={} paints={}",
                        scenario.name(),
                        seed,
                        result.total_ticks,
                        result.metrics.paints
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "records": r.record_count,
                    "ticks": r.total_ticks,
                    "time_secs": r.final_time_secs,
                    "paints": r.metrics.paints,
                    "transitions": r.metrics.transitions,
                    "max_error": r.metrics.max_error,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            // List failed seeds
            for result in &all_results {
                if !result.passed {
                    error!(
                        "  - {} seed={}: {}",
                        result.scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

fn synthetic_or_exit(seed: u64, count: usize) -> RecordStore {
    dataset::synthetic_store(dataset::data_seed(seed), count).unwrap_or_else(|e| {
        error!("Failed to generate records: {}", e);
        std::process::exit(1);
    })
}

/// Formation order after the opening table.
const CYCLE: [FormationKind; 4] = [
    FormationKind::Sphere,
    FormationKind::Helix,
    FormationKind::Grid,
    FormationKind::Table,
];

/// Cycles through every formation on the wall clock. Returns the exit code.
fn run_realtime(records: RecordStore, config: StageConfig, fps: u32) -> i32 {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return 1;
        }
    };

    match runtime.block_on(realtime_cycle(records, config, fps)) {
        Ok(paints) => {
            info!("✓ Realtime cycle finished with {} paints", paints);
            0
        }
        Err(e) => {
            error!("✗ Realtime cycle failed: {}", e);
            1
        }
    }
}

async fn realtime_cycle(records: RecordStore, config: StageConfig, fps: u32) -> Result<u64, StageError> {
    let fps = fps.max(1);
    let frame = Duration::from_secs_f64(1.0 / fps as f64);
    let frames_per_switch = ((config.base_duration() * 2).as_secs_f64() * fps as f64).ceil() as u64 + 1;

    let mut stage = Stage::new(TokioContext::shared(), records, config, FrameCounter::new(), 1280, 720)?;
    stage.run(frame, frames_per_switch).await;

    for kind in CYCLE {
        stage.select(kind);
        stage.run(frame, frames_per_switch).await;
        info!("{} reached after {} ticks", kind, stage.tick_count());
    }

    Ok(stage.frames_rendered())
}

/// Simulated formation cycle streamed to Rerun. Returns the exit code.
fn run_rerun(seed: u64, records: RecordStore, config: StageConfig, fps: u32) -> i32 {
    let bridge = RerunBridge::new("tableau_sim");
    if !bridge.is_enabled() {
        error!("Rerun viewer unavailable");
        return 1;
    }

    let sim_config = SimConfig {
        seed,
        frame_rate_hz: fps,
        stage: config,
        ..Default::default()
    };
    let mut world = match SimWorld::new(sim_config, records, bridge) {
        Ok(world) => world,
        Err(e) => {
            error!("Failed to build stage: {}", e);
            return 1;
        }
    };

    let limit = 10 * fps.max(1) as u64 * world.stage().config().base_duration().as_secs().max(1);
    world.run_until_idle(limit);
    for kind in CYCLE {
        world.handle(tableau_core::StageEvent::Select(kind));
        world.run_until_idle(limit);
        info!("t={:.1}s | {} settled", world.time(), kind);
    }

    info!("Streamed {} paints to Rerun", world.into_renderer().paints());
    0
}
