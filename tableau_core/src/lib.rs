//! Tableau Core - animated 3D card gallery over a tabular data source
//!
//! Each record of a six-column sheet becomes a card in 3D space. The stage
//! moves every card between four precomputed formations:
//! 1. **Table**: a flat grid of 20 columns
//! 2. **Sphere**: evenly spread over a sphere, facing outward
//! 3. **Helix**: a double strand, cards facing away from the axis
//! 4. **Grid**: a 5×4×k volumetric lattice
//!
//! Switches are eased with randomized per-card durations, and the surface
//! only repaints while something is moving.

pub mod camera;
pub mod config;
pub mod error;
pub mod formation;
pub mod record;
pub mod render;
pub mod scene;
pub mod stage;
pub mod transition;

// Re-export key types for convenience
pub use camera::{Camera, CameraController, ControlInput, DampedOrbitController};
pub use config::{CameraConfig, FormationConfig, StageConfig};
pub use error::{ConfigError, IngestError, StageError};
pub use formation::{FormationKind, FormationSet, FormationTarget};
pub use record::{NetWorthTier, Record, RecordStore};
pub use render::{FrameCounter, RenderBridge};
pub use scene::{Scene, VisualObject};
pub use stage::{Stage, StageEvent, TickReport};
pub use transition::{TickOutcome, TransitionEngine};
