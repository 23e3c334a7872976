//! Tableau Environment Abstraction Layer
//!
//! This crate provides the abstraction that lets the Tableau stage run in
//! both **Realtime** (tokio, wall clock) and **Simulation** (virtual clock)
//! environments.
//!
//! # Core Concept: The Frame Driver
//!
//! The stage never reads the clock or an RNG directly. Everything that would
//! make a run non-reproducible goes through the context:
//! - Time (`now()`, `sleep()`)
//! - Randomness (`random_unit()`)
//!
//! A simulation context derives all entropy from one 64-bit seed and only
//! moves its clock when told to, so any transition can be replayed exactly.
//!
//! # Example
//!
//! ```ignore
//! use tableau_env::StageContext;
//!
//! async fn frame_loop<Ctx: StageContext>(ctx: &Ctx, stage: &mut Stage<Ctx>) {
//!     loop {
//!         stage.tick();
//!         ctx.sleep(Duration::from_millis(16)).await;
//!     }
//! }
//! ```

mod context;
mod tokio_impl;

pub use context::StageContext;
pub use tokio_impl::TokioContext;
