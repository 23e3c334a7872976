//! The Transition Engine - eased, time-boxed moves between formations.
//!
//! A formation switch replaces everything in flight (last writer wins, no
//! blending) with two tweens per object (position and rotation, each with
//! its own random duration in `[base, 2·base)`) plus one render ticker that
//! spans the whole envelope `2·base`.
//!
//! Tweens live in an index-stable arena. A finished tween is only flagged;
//! slots are dropped all at once when the next switch starts or when every
//! slot has finished.

use crate::formation::FormationTarget;
use crate::scene::VisualObject;
use nalgebra::Vector3;
use std::time::Duration;

/// Exponential ease-in-out on `[0, 1]`.
///
/// Near-zero rate at both ends, steepest at the midpoint, symmetric about
/// `(0.5, 0.5)`. Exact at the endpoints.
pub fn ease_exponential_in_out(t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let t = t * 2.0;
    if t < 1.0 {
        0.5 * 1024f64.powf(t - 1.0)
    } else {
        0.5 * (2.0 - 2f64.powf(-10.0 * (t - 1.0)))
    }
}

/// Which transform component a tween drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Position,
    Rotation,
}

/// One in-flight interpolation of one object's channel.
#[derive(Debug, Clone)]
pub struct Tween {
    pub object_index: usize,
    pub channel: Channel,

    /// Value captured when the switch began
    pub start: Vector3<f64>,

    pub target: Vector3<f64>,

    pub start_time: Duration,
    pub duration: Duration,

    complete: bool,
}

impl Tween {
    /// Normalized elapsed time, clamped to `[0, 1]`. Zero duration is done at once.
    pub fn progress(&self, now: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start_time);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Eased value at `now`.
    pub fn value_at(&self, now: Duration) -> Vector3<f64> {
        let eased = ease_exponential_in_out(self.progress(now));
        self.start + (self.target - self.start) * eased
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Bookkeeping timer that keeps the surface repainting for the full envelope.
#[derive(Debug, Clone, Copy)]
struct RenderTicker {
    start_time: Duration,
    duration: Duration,
}

impl RenderTicker {
    fn is_done(&self, now: Duration) -> bool {
        now.saturating_sub(self.start_time) >= self.duration
    }
}

/// What one scheduler tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Tweens that wrote a value this tick
    pub advanced: usize,

    /// Tweens that finished this tick
    pub completed: usize,

    /// The render ticker was active this tick
    pub repaint: bool,

    /// The last tween and the ticker finished this tick
    pub settled: bool,
}

/// Owner of all active tweens.
#[derive(Debug, Default)]
pub struct TransitionEngine {
    tweens: Vec<Tween>,
    ticker: Option<RenderTicker>,

    /// Number of formation switches issued so far
    generation: u64,
}

impl TransitionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every in-flight tween and the ticker. Objects keep whatever
    /// value they reached.
    pub fn cancel_all(&mut self) {
        self.tweens.clear();
        self.ticker = None;
    }

    /// Starts a switch of every object toward `targets`.
    ///
    /// `targets[i]` is the destination of `objects[i]`. Callers must pass
    /// at least one target per object; only the aligned prefix is scheduled.
    /// `random_unit` supplies `[0, 1)` draws, two per object (position then
    /// rotation).
    ///
    /// Returns the number of tweens scheduled.
    pub fn transition_to<F>(
        &mut self,
        objects: &[VisualObject],
        targets: &[FormationTarget],
        base: Duration,
        now: Duration,
        mut random_unit: F,
    ) -> usize
    where
        F: FnMut() -> f64,
    {
        debug_assert!(
            targets.len() >= objects.len(),
            "formation has {} targets for {} objects",
            targets.len(),
            objects.len()
        );

        self.cancel_all();
        self.generation += 1;

        for (object, target) in objects.iter().zip(targets) {
            let position_duration = base + base.mul_f64(random_unit());
            let rotation_duration = base + base.mul_f64(random_unit());

            self.tweens.push(Tween {
                object_index: object.index,
                channel: Channel::Position,
                start: object.position,
                target: target.position,
                start_time: now,
                duration: position_duration,
                complete: false,
            });
            self.tweens.push(Tween {
                object_index: object.index,
                channel: Channel::Rotation,
                start: object.rotation,
                target: target.rotation,
                start_time: now,
                duration: rotation_duration,
                complete: false,
            });
        }

        self.ticker = Some(RenderTicker {
            start_time: now,
            duration: base * 2,
        });

        self.tweens.len()
    }

    /// Advances every active tween to `now`, then the render ticker.
    pub fn advance(&mut self, objects: &mut [VisualObject], now: Duration) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let was_active = self.is_animating();

        for tween in self.tweens.iter_mut().filter(|t| !t.complete) {
            let Some(object) = objects.get_mut(tween.object_index) else {
                continue;
            };

            let value = tween.value_at(now);
            match tween.channel {
                Channel::Position => object.position = value,
                Channel::Rotation => object.rotation = value,
            }
            outcome.advanced += 1;

            if tween.progress(now) >= 1.0 {
                tween.complete = true;
                outcome.completed += 1;
            }
        }

        if let Some(ticker) = self.ticker {
            outcome.repaint = true;
            if ticker.is_done(now) {
                self.ticker = None;
            }
        }

        if self.tweens.iter().all(Tween::is_complete) {
            self.tweens.clear();
        }

        outcome.settled = was_active && !self.is_animating();
        outcome
    }

    /// Tweens that have not finished.
    pub fn active_count(&self) -> usize {
        self.tweens.iter().filter(|t| !t.complete).count()
    }

    /// Arena slots currently held (finished slots included).
    pub fn slot_count(&self) -> usize {
        self.tweens.len()
    }

    /// True while any tween or the render ticker is running.
    pub fn is_animating(&self) -> bool {
        self.ticker.is_some() || self.active_count() > 0
    }

    /// Time at which the current envelope ends, if a switch is in flight.
    pub fn envelope_end(&self) -> Option<Duration> {
        self.ticker.map(|t| t.start_time + t.duration)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tweens(&self) -> &[Tween] {
        &self.tweens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordStore;
    use crate::scene::Scene;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn scene(n: usize) -> Scene {
        let rows: Vec<Vec<String>> = (0..n)
            .map(|i| {
                vec![
                    format!("r{}", i),
                    "https://img/x.png".into(),
                    "40".into(),
                    "Peru".into(),
                    "Llamas".into(),
                    "$10".into(),
                ]
            })
            .collect();
        let records = RecordStore::from_rows(&rows).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        Scene::scatter(&records, 2000.0, || rng.gen::<f64>())
    }

    fn targets(n: usize, offset: f64) -> Vec<FormationTarget> {
        (0..n)
            .map(|i| FormationTarget {
                position: Vector3::new(i as f64 * 10.0 + offset, -offset, offset),
                rotation: Vector3::new(0.1 * i as f64, offset / 1000.0, 0.0),
            })
            .collect()
    }

    const BASE: Duration = Duration::from_millis(2000);
    const FRAME: Duration = Duration::from_millis(16);

    #[test]
    fn test_easing_shape() {
        assert_eq!(ease_exponential_in_out(0.0), 0.0);
        assert_eq!(ease_exponential_in_out(1.0), 1.0);
        assert_relative_eq!(ease_exponential_in_out(0.5), 0.5);

        // Symmetric about the midpoint
        for t in [0.05, 0.2, 0.35, 0.45] {
            assert_relative_eq!(
                ease_exponential_in_out(t) + ease_exponential_in_out(1.0 - t),
                1.0,
                epsilon = 1e-12
            );
        }

        // Monotone, slow at the ends
        let mut last = 0.0;
        for step in 1..=100 {
            let v = ease_exponential_in_out(step as f64 / 100.0);
            assert!(v >= last);
            last = v;
        }
        assert!(ease_exponential_in_out(0.05) < 0.001);
    }

    #[test]
    fn test_durations_within_range() {
        let mut scene = scene(20);
        let mut engine = TransitionEngine::new();
        let mut rng = StdRng::seed_from_u64(1);

        let scheduled =
            engine.transition_to(scene.objects(), &targets(20, 0.0), BASE, Duration::ZERO, || rng.gen());
        assert_eq!(scheduled, 40);

        for tween in engine.tweens() {
            assert!(tween.duration >= BASE);
            assert!(tween.duration < BASE * 2);
        }
        assert_eq!(engine.envelope_end(), Some(BASE * 2));

        engine.advance(scene.objects_mut(), FRAME);
        assert_eq!(engine.active_count(), 40);
    }

    #[test]
    fn test_converges_after_envelope() {
        let mut scene = scene(12);
        let goal = targets(12, 250.0);
        let mut engine = TransitionEngine::new();
        let mut rng = StdRng::seed_from_u64(2);

        engine.transition_to(scene.objects(), &goal, BASE, Duration::ZERO, || rng.gen());

        let mut now = Duration::ZERO;
        while now < BASE * 2 {
            now += FRAME;
            engine.advance(scene.objects_mut(), now);
        }

        assert!(!engine.is_animating());
        assert_eq!(engine.slot_count(), 0);
        assert!(scene.max_position_error(&goal) < 1e-9);
        assert!(scene.max_rotation_error(&goal) < 1e-9);
    }

    #[test]
    fn test_supersession_discards_first_target() {
        let mut scene = scene(6);
        let first = targets(6, -900.0);
        let second = targets(6, 700.0);
        let mut engine = TransitionEngine::new();
        let mut rng = StdRng::seed_from_u64(3);

        engine.transition_to(scene.objects(), &first, BASE, Duration::ZERO, || rng.gen());
        engine.advance(scene.objects_mut(), BASE / 2);

        engine.transition_to(scene.objects(), &second, BASE, BASE / 2, || rng.gen());
        assert_eq!(engine.generation(), 2);
        assert_eq!(engine.slot_count(), 12);
        assert!(engine.tweens().iter().all(|t| t.start_time == BASE / 2));

        let mut now = BASE / 2;
        let end = BASE / 2 + BASE * 2;
        while now < end {
            now += FRAME;
            engine.advance(scene.objects_mut(), now);
        }

        assert!(scene.max_position_error(&second) < 1e-9);
    }

    #[test]
    fn test_ticker_repaints_whole_envelope() {
        let mut scene = scene(3);
        let mut engine = TransitionEngine::new();

        // Every object draws the shortest duration; the ticker still runs to 2·base.
        engine.transition_to(scene.objects(), &targets(3, 1.0), BASE, Duration::ZERO, || 0.0);

        let outcome = engine.advance(scene.objects_mut(), BASE);
        assert_eq!(outcome.completed, 6);
        assert!(outcome.repaint);
        assert!(!outcome.settled);
        assert_eq!(engine.active_count(), 0);
        assert!(engine.is_animating());

        let outcome = engine.advance(scene.objects_mut(), BASE * 2);
        assert!(outcome.repaint);
        assert!(outcome.settled);

        let outcome = engine.advance(scene.objects_mut(), BASE * 3);
        assert!(!outcome.repaint);
        assert_eq!(outcome, TickOutcome::default());
    }

    #[test]
    fn test_start_captured_at_switch() {
        let mut scene = scene(2);
        let before = scene.objects()[1].position;
        let mut engine = TransitionEngine::new();

        engine.transition_to(scene.objects(), &targets(2, 5.0), BASE, Duration::ZERO, || 0.5);
        let tween = &engine.tweens()[2];
        assert_eq!(tween.object_index, 1);
        assert_eq!(tween.channel, Channel::Position);
        assert_eq!(tween.start, before);

        // Nothing moves until the clock does
        engine.advance(scene.objects_mut(), Duration::ZERO);
        assert_eq!(scene.objects()[1].position, before);
    }

    #[test]
    fn test_zero_base_duration_jumps() {
        let mut scene = scene(4);
        let goal = targets(4, 42.0);
        let mut engine = TransitionEngine::new();

        engine.transition_to(scene.objects(), &goal, Duration::ZERO, Duration::ZERO, || 0.3);
        let outcome = engine.advance(scene.objects_mut(), Duration::ZERO);

        assert!(outcome.settled);
        assert!(scene.max_position_error(&goal) < 1e-9);
    }
}
