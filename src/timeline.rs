//! Duration-based animation timeline.
//!
//! The timeline does not tick on its own: progress is derived from the wall
//! clock (`now - started_at`) every time it is sampled, so frame hooks only
//! poll it.  Every method takes `now` explicitly; the switcher reads it from
//! the host ([`Compositor::now`](crate::traits::Compositor::now)) which lets
//! tests run against a manual clock.

use crate::easing::Easing;
use std::time::{Duration, Instant};

/// One axis of an in-flight slide, in workspace cells relative to the
/// workspace that was current when the switch started.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transition {
    pub start: f64,
    pub end: f64,
}

impl Transition {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Value at (already eased) progress `t`.
    pub fn at(&self, t: f64) -> f64 {
        self.start + (self.end - self.start) * t
    }
}

/// Elapsed-time progress calculator.
#[derive(Debug, Clone)]
pub struct Timeline {
    duration: Duration,
    easing: Easing,
    started_at: Option<Instant>,
}

impl Timeline {
    pub fn new(duration: Duration, easing: Easing) -> Self {
        Self {
            duration,
            easing,
            started_at: None,
        }
    }

    /// Reset elapsed time to zero.
    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    /// `elapsed / duration`, saturating at `1.0`.  A timeline that was never
    /// started, or has zero duration, is complete.
    pub fn progress(&self, now: Instant) -> f64 {
        let Some(started) = self.started_at else {
            return 1.0;
        };
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(started);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn running(&self, now: Instant) -> bool {
        self.progress(now) < 1.0
    }

    /// Interpolated value of `transition` at `now`, after easing.
    pub fn value(&self, transition: &Transition, now: Instant) -> f64 {
        transition.at(self.easing.apply(self.progress(now)))
    }
}

/// Live interpolation state for both axes of a workspace slide.
#[derive(Debug, Clone)]
pub struct SlideAnimation {
    pub dx: Transition,
    pub dy: Transition,
    timeline: Timeline,
}

impl SlideAnimation {
    /// A fresh animation at rest on the starting workspace, clock running.
    pub fn started(duration: Duration, easing: Easing, now: Instant) -> Self {
        let mut timeline = Timeline::new(duration, easing);
        timeline.start(now);
        Self {
            dx: Transition::default(),
            dy: Transition::default(),
            timeline,
        }
    }

    /// Point the animation at a new `(end_x, end_y)`.
    ///
    /// The new transitions start from the value currently on screen, not
    /// from their original start, and the clock restarts, so the slide never
    /// jumps.
    pub fn redirect(&mut self, end_x: f64, end_y: f64, now: Instant) {
        let (x, y) = self.offset(now);
        self.dx = Transition::new(x, end_x);
        self.dy = Transition::new(y, end_y);
        self.timeline.start(now);
    }

    /// Current viewport offset in workspace cells.
    pub fn offset(&self, now: Instant) -> (f64, f64) {
        (
            self.timeline.value(&self.dx, now),
            self.timeline.value(&self.dy, now),
        )
    }

    /// Final offset the slide is heading to.
    pub fn target(&self) -> (f64, f64) {
        (self.dx.end, self.dy.end)
    }

    pub fn progress(&self, now: Instant) -> f64 {
        self.timeline.progress(now)
    }

    pub fn running(&self, now: Instant) -> bool {
        self.timeline.running(now)
    }
}

//  Tests
