//! Animation Module: curve-interpolated values driven by the game loop.
//!
//! Responsibilities:
//! - Easing curves (Linear, Ease, EaseIn, EaseOut)
//! - Single animations: delayed start, one-shot or looping, completion notice
//! - Animator registry (start, cancel, chain, advance)

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::game_loop::TimedAction;

// ============================================================================
// Curves
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    #[default]
    Linear,
    /// Quadratic ease-in-out.
    Ease,
    EaseIn,
    EaseOut,
}

impl Curve {
    /// Map normalized progress `t` in `[0, 1]` through the curve.
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Curve::Linear => t,
            Curve::EaseIn => t * t,
            Curve::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Curve::Ease => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

// ============================================================================
// Targets and Observers
// ============================================================================

/// Receives interpolated values.
pub trait AnimationTarget: Send {
    fn set_value(&mut self, value: f64);
}

impl<F> AnimationTarget for F
where
    F: FnMut(f64) + Send,
{
    fn set_value(&mut self, value: f64) {
        self(value)
    }
}

/// Notified once when a one-shot animation completes.
pub trait AnimationObserver: Send {
    fn animation_finished(&mut self);
}

impl<F> AnimationObserver for F
where
    F: FnMut() + Send,
{
    fn animation_finished(&mut self) {
        self()
    }
}

// ============================================================================
// Animation
// ============================================================================

/// Interpolates from `from` to `to` over `duration` seconds.
pub struct Animation {
    from: f64,
    to: f64,
    duration: f64,
    delay: f64,
    start_time: f64,
    curve: Curve,
    loops: bool,
    running: bool,
    completed: bool,
    target: Option<Box<dyn AnimationTarget>>,
    observer: Option<Box<dyn AnimationObserver>>,
}

impl Animation {
    pub fn new(from: f64, to: f64, duration: f64) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            delay: 0.0,
            start_time: 0.0,
            curve: Curve::Linear,
            loops: false,
            running: false,
            completed: false,
            target: None,
            observer: None,
        }
    }

    pub fn with_curve(mut self, curve: Curve) -> Self {
        self.curve = curve;
        self
    }

    /// Seconds between `set_start_time` and the first interpolated value.
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    pub fn looping(mut self, loops: bool) -> Self {
        self.loops = loops;
        self
    }

    pub fn with_target(mut self, target: impl AnimationTarget + 'static) -> Self {
        self.target = Some(Box::new(target));
        self
    }

    pub fn with_observer(mut self, observer: impl AnimationObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Arm the animation: it begins at `time + delay`.
    pub fn set_start_time(&mut self, time: f64) {
        self.start_time = time + self.delay;
        self.running = true;
        self.completed = false;
    }

    /// Stop without completing. The observer is not notified.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn from(&self) -> f64 {
        self.from
    }

    pub fn to(&self) -> f64 {
        self.to
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn loops(&self) -> bool {
        self.loops
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Normalized progress in `[0, 1]` before the curve is applied.
    pub fn progress(&self, time: f64) -> f64 {
        let elapsed = time - self.start_time;
        if elapsed <= 0.0 {
            return 0.0;
        }
        if self.duration <= 0.0 {
            return 1.0;
        }
        if self.loops {
            elapsed.rem_euclid(self.duration) / self.duration
        } else {
            (elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Interpolated value at `time`. Before the start this is `from`.
    pub fn value_at(&self, time: f64) -> f64 {
        let alpha = self.curve.apply(self.progress(time));
        self.from + (self.to - self.from) * alpha
    }

    /// Whether a one-shot animation has run past its end. The first query
    /// that observes completion notifies the observer; later ones do not.
    /// Looping animations never finish.
    pub fn is_finished(&mut self, time: f64) -> bool {
        if self.loops {
            return false;
        }
        if self.completed {
            return true;
        }
        if !self.running || time <= self.start_time + self.duration {
            return false;
        }

        self.running = false;
        self.completed = true;
        if let Some(observer) = self.observer.as_mut() {
            observer.animation_finished();
        }
        true
    }
}

impl TimedAction for Animation {
    fn update(&mut self, time: f64, _delta: f64) {
        if !self.running || time < self.start_time {
            return;
        }
        let value = self.value_at(time);
        if let Some(target) = self.target.as_mut() {
            target.set_value(value);
        }
        self.is_finished(time);
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("duration", &self.duration)
            .field("delay", &self.delay)
            .field("start_time", &self.start_time)
            .field("curve", &self.curve)
            .field("loops", &self.loops)
            .field("running", &self.running)
            .field("completed", &self.completed)
            .finish()
    }
}

// ============================================================================
// Animator
// ============================================================================

#[derive(Debug)]
struct Entry {
    id: u32,
    animation: Animation,
    /// Waiting for a chained predecessor to complete.
    pending: bool,
}

/// Owns a set of animations and advances them together.
///
/// Register the animator itself as a timed action; every animation it holds
/// shares the loop's time base.
#[derive(Debug)]
pub struct Animator {
    entries: Vec<Entry>,
    /// predecessor id -> successor id
    chains: HashMap<u32, u32>,
    next_id: u32,
    now: f64,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            chains: HashMap::new(),
            next_id: 1,
            now: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn get(&self, id: u32) -> Option<&Animation> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.animation)
    }

    pub fn is_pending(&self, id: u32) -> Option<bool> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.pending)
    }

    /// Time of the most recent advance.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Start `animation` at the current time and return its id.
    pub fn start(&mut self, mut animation: Animation) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        animation.set_start_time(self.now);
        self.entries.push(Entry {
            id,
            animation,
            pending: false,
        });
        debug!(id, now = self.now, "animation started");
        id
    }

    /// Drop an animation. Its value stays wherever it was. Successors
    /// chained behind it can no longer start, so they are dropped too.
    pub fn cancel(&mut self, id: u32) -> Result<()> {
        if !self.contains(id) {
            return Err(Error::AnimationNotFound(id));
        }
        self.chains.retain(|_, next| *next != id);

        let mut dropped = vec![id];
        let mut current = id;
        while let Some(next) = self.chains.remove(&current) {
            dropped.push(next);
            current = next;
        }
        self.entries.retain(|e| !dropped.contains(&e.id));
        debug!(id, dropped = dropped.len(), "animation cancelled");
        Ok(())
    }

    /// Hold `next` until `after` completes, then start it from the beginning.
    ///
    /// `after` must be a one-shot animation other than `next`, and the chain
    /// may not loop back on itself. A successor already chained to `after`
    /// is replaced and dropped.
    pub fn chain(&mut self, after: u32, next: u32) -> Result<()> {
        let predecessor = self.get(after).ok_or(Error::AnimationNotFound(after))?;
        if !self.contains(next) {
            return Err(Error::AnimationNotFound(next));
        }
        if after == next || predecessor.loops() || self.runs_before(next, after) {
            return Err(Error::InvalidChain { after, next });
        }

        if let Some(replaced) = self.chains.remove(&after) {
            if replaced != next {
                self.cancel(replaced)?;
            }
        }
        self.chains.retain(|_, successor| *successor != next);
        self.chains.insert(after, next);

        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == next) {
            entry.pending = true;
            entry.animation.stop();
        }
        Ok(())
    }

    /// Whether `later` is reached by following chains from `first`.
    fn runs_before(&self, first: u32, later: u32) -> bool {
        let mut current = first;
        while let Some(&next) = self.chains.get(&current) {
            if next == later {
                return true;
            }
            current = next;
        }
        false
    }

    /// Advance every active animation to `time`. Completed one-shot
    /// animations are removed and their successors started.
    pub fn advance(&mut self, time: f64, delta: f64) {
        self.now = time;
        let mut completed = Vec::new();

        for entry in &mut self.entries {
            if entry.pending {
                continue;
            }
            entry.animation.update(time, delta);
            if entry.animation.is_completed() {
                completed.push(entry.id);
            }
        }

        for id in &completed {
            if let Some(next) = self.chains.remove(id) {
                if let Some(entry) = self.entries.iter_mut().find(|e| e.id == next) {
                    entry.pending = false;
                    entry.animation.set_start_time(time);
                }
            }
        }

        if !completed.is_empty() {
            self.entries.retain(|e| !completed.contains(&e.id));
            debug!(count = completed.len(), "animations completed");
        }
    }
}

impl TimedAction for Animator {
    fn update(&mut self, time: f64, delta: f64) {
        self.advance(time, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_curve_endpoints() {
        for curve in [Curve::Linear, Curve::Ease, Curve::EaseIn, Curve::EaseOut] {
            assert!(approx(curve.apply(0.0), 0.0), "{curve:?} at 0");
            assert!(approx(curve.apply(1.0), 1.0), "{curve:?} at 1");
        }
    }

    #[test]
    fn test_curve_midpoints() {
        assert!(approx(Curve::Linear.apply(0.5), 0.5));
        assert!(approx(Curve::EaseIn.apply(0.5), 0.25));
        assert!(approx(Curve::EaseOut.apply(0.5), 0.75));
        assert!(approx(Curve::Ease.apply(0.5), 0.5));
        assert!(Curve::Ease.apply(0.25) < 0.25);
    }

    #[test]
    fn test_linear_value_at_midpoint() {
        let mut anim = Animation::new(0.0, 10.0, 2.0);
        anim.set_start_time(0.0);
        assert!(approx(anim.value_at(1.0), 5.0));
    }

    #[test]
    fn test_value_before_start_is_from() {
        let mut anim = Animation::new(3.0, 10.0, 2.0).with_delay(1.0);
        anim.set_start_time(5.0);
        assert!(approx(anim.start_time(), 6.0));
        assert!(approx(anim.value_at(5.5), 3.0));
        assert!(approx(anim.value_at(7.0), 6.5));
    }

    #[test]
    fn test_completion_reports_end_value_once() {
        let values = Arc::new(Mutex::new(Vec::new()));
        let finished = Arc::new(AtomicUsize::new(0));

        let sink = Arc::clone(&values);
        let counter = Arc::clone(&finished);
        let mut anim = Animation::new(0.0, 10.0, 2.0)
            .with_target(move |v: f64| sink.lock().unwrap().push(v))
            .with_observer(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        anim.set_start_time(0.0);

        anim.update(2.5, 2.5);
        anim.update(3.0, 0.5);

        assert_eq!(*values.lock().unwrap(), vec![10.0]);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(anim.is_finished(4.0));
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_is_finished_fires_once() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);
        let mut anim = Animation::new(0.0, 1.0, 1.0).with_observer(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        anim.set_start_time(0.0);

        assert!(!anim.is_finished(0.5));
        assert!(!anim.is_finished(1.0));
        assert!(anim.is_finished(1.5));
        assert!(anim.is_finished(2.0));
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_looping_never_completes() {
        let mut anim = Animation::new(0.0, 4.0, 1.0).looping(true);
        anim.set_start_time(0.0);

        assert!(approx(anim.value_at(100.25), 1.0));
        assert!(!anim.is_finished(1000.0));
        anim.update(1000.0, 1.0);
        assert!(anim.is_running());
        assert!(!anim.is_completed());
    }

    #[test]
    fn test_zero_duration_jumps_to_end() {
        let mut anim = Animation::new(2.0, 8.0, 0.0);
        anim.set_start_time(1.0);
        assert!(approx(anim.value_at(1.5), 8.0));
        assert!(anim.is_finished(1.5));
    }

    #[test]
    fn test_unstarted_animation_ignores_updates() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let mut anim = Animation::new(0.0, 1.0, 1.0).with_target(move |_v: f64| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        anim.update(0.5, 0.5);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!anim.is_finished(5.0));
    }

    #[test]
    fn test_animator_removes_completed() {
        let mut animator = Animator::new();
        let id = animator.start(Animation::new(0.0, 1.0, 0.5));
        assert!(animator.contains(id));

        animator.advance(0.25, 0.25);
        assert!(animator.contains(id));
        animator.advance(0.75, 0.5);
        assert!(!animator.contains(id));
        assert!(animator.is_empty());
    }

    #[test]
    fn test_animator_starts_at_current_time() {
        let mut animator = Animator::new();
        animator.advance(3.0, 3.0);
        let id = animator.start(Animation::new(0.0, 1.0, 1.0));
        assert!(approx(animator.get(id).unwrap().start_time(), 3.0));
    }

    #[test]
    fn test_cancel_nonexistent() {
        let mut animator = Animator::new();
        assert!(matches!(
            animator.cancel(42),
            Err(Error::AnimationNotFound(42))
        ));
    }

    #[test]
    fn test_chain_activates_successor_on_completion() {
        let mut animator = Animator::new();
        let a = animator.start(Animation::new(0.0, 1.0, 0.5));
        let b = animator.start(Animation::new(0.0, 1.0, 0.3));
        animator.chain(a, b).unwrap();
        assert_eq!(animator.is_pending(b), Some(true));

        // B holds while A runs
        animator.advance(0.3, 0.3);
        assert_eq!(animator.is_pending(b), Some(true));

        animator.advance(0.6, 0.3);
        assert!(!animator.contains(a));
        assert_eq!(animator.is_pending(b), Some(false));
        assert!(approx(animator.get(b).unwrap().start_time(), 0.6));
    }

    #[test]
    fn test_cancel_predecessor_drops_successors() {
        let mut animator = Animator::new();
        let a = animator.start(Animation::new(0.0, 1.0, 0.5));
        let b = animator.start(Animation::new(0.0, 1.0, 0.3));
        let c = animator.start(Animation::new(0.0, 1.0, 0.3));
        let other = animator.start(Animation::new(0.0, 1.0, 5.0));
        animator.chain(a, b).unwrap();
        animator.chain(b, c).unwrap();

        animator.cancel(a).unwrap();
        assert!(!animator.contains(b));
        assert!(!animator.contains(c));
        assert!(animator.contains(other));
        assert_eq!(animator.len(), 1);
    }

    #[test]
    fn test_cancel_middle_of_chain_detaches_it() {
        let mut animator = Animator::new();
        let a = animator.start(Animation::new(0.0, 1.0, 0.5));
        let b = animator.start(Animation::new(0.0, 1.0, 0.3));
        let c = animator.start(Animation::new(0.0, 1.0, 0.3));
        animator.chain(a, b).unwrap();
        animator.chain(b, c).unwrap();

        animator.cancel(b).unwrap();
        assert!(animator.contains(a));
        assert!(!animator.contains(c));

        animator.advance(1.0, 1.0);
        assert!(animator.is_empty());
    }

    #[test]
    fn test_chain_rejects_self_loop_and_cycle() {
        let mut animator = Animator::new();
        let a = animator.start(Animation::new(0.0, 1.0, 0.5));
        let b = animator.start(Animation::new(0.0, 1.0, 0.5));

        assert!(matches!(
            animator.chain(a, a),
            Err(Error::InvalidChain { after, next }) if after == a && next == a
        ));
        assert_eq!(animator.is_pending(a), Some(false));

        animator.chain(a, b).unwrap();
        assert!(matches!(
            animator.chain(b, a),
            Err(Error::InvalidChain { .. })
        ));
        assert_eq!(animator.is_pending(a), Some(false));
    }

    #[test]
    fn test_chain_rejects_looping_predecessor() {
        let mut animator = Animator::new();
        let spinner = animator.start(Animation::new(0.0, 1.0, 1.0).looping(true));
        let b = animator.start(Animation::new(0.0, 1.0, 0.5));

        assert!(matches!(
            animator.chain(spinner, b),
            Err(Error::InvalidChain { .. })
        ));
        assert_eq!(animator.is_pending(b), Some(false));
    }

    #[test]
    fn test_rechain_replaces_successor() {
        let mut animator = Animator::new();
        let a = animator.start(Animation::new(0.0, 1.0, 0.5));
        let b = animator.start(Animation::new(0.0, 1.0, 0.5));
        let c = animator.start(Animation::new(0.0, 1.0, 0.5));
        animator.chain(a, b).unwrap();
        animator.chain(a, c).unwrap();

        assert!(!animator.contains(b));
        animator.advance(0.6, 0.6);
        assert_eq!(animator.is_pending(c), Some(false));
        assert_eq!(animator.len(), 1);
    }

    #[test]
    fn test_chain_invalid_ids_return_error() {
        let mut animator = Animator::new();
        let a = animator.start(Animation::new(0.0, 1.0, 0.5));
        assert!(animator.chain(9999, a).is_err());
        assert!(animator.chain(a, 9999).is_err());
    }
}
