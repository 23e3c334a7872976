//! Core environment context trait for the Tableau stage.

use async_trait::async_trait;
use std::time::Duration;

/// The central interface for environment interaction.
///
/// This trait abstracts the host so that the stage can run against the
/// wall clock (realtime) or a virtual clock (simulation).
///
/// # Implementations
///
/// - **Realtime**: `TokioContext` - wraps `Instant`, `tokio::time`, an entropy-seeded RNG
/// - **Simulation**: `SimContext` - virtual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// Everything that would normally introduce non-determinism (time,
/// randomness) is controlled by the implementation.
#[async_trait]
pub trait StageContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Transition start times and elapsed fractions are measured against this.
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends the frame driver for the given duration.
    ///
    /// In realtime: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock
    async fn sleep(&self, duration: Duration);

    /// Returns a uniformly distributed value in `[0, 1)`.
    ///
    /// Used for scattered start positions and randomized transition durations.
    fn random_unit(&self) -> f64;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In realtime, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;
}
