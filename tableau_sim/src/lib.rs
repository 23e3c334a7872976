//! Tableau Deterministic Simulation Testing (DST) Harness
//!
//! Runs a full stage under a virtual clock so transitions, repaint behaviour
//! and camera motion can be checked tick by tick and replayed from a seed.
//!
//! # Core Principle: The Reactor Pattern
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: Virtual clock advances one frame per scheduler tick
//! - **Randomness**: Scatter and transition durations come from one 64-bit seed
//! - **Data**: Synthetic sheet rows derived from the same seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (Virtual Clock + ChaCha8 RNG)             │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                          │                                  │
//! │                    ┌─────▼─────┐      StageEvent            │
//! │                    │   Stage   │◄──── (select, resize,      │
//! │                    └─────┬─────┘       rotate, zoom, pan)   │
//! │                          │ render                           │
//! │         ┌────────────────┴───────────────┐                  │
//! │  ┌──────▼────────┐               ┌───────▼──────┐           │
//! │  │ FrameRecorder │               │ RerunBridge  │           │
//! │  │ (JSON export) │               │ (optional)   │           │
//! │  └───────────────┘               └──────────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use tableau_sim::{ScenarioRunner, ScenarioId};
//!
//! let runner = ScenarioRunner::new(42, 100);
//! let result = runner.run(ScenarioId::Supersession);
//! assert!(result.passed);
//! ```

mod context;
pub mod dataset;
mod exporter;
mod runner;
pub mod scenarios;
mod visualizer;
mod world;

pub use context::SimContext;
pub use dataset::{DatasetError, DatasetGenerator};
pub use exporter::{CardFrame, FrameRecorder, SimExport, SimFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use visualizer::RerunBridge;
pub use world::{SimConfig, SimWorld};
