// THEORY:
// The `GestureSegmenter` cuts the continuous per-frame stream of tracker output
// into discrete gestures. It plays the role the `Moment` lifecycle plays for
// tracked objects: birth, growth, and completion, but for a single wand tip.
//
// It is an explicit three-state machine. Each state owns exactly the data it
// needs, so invalid combinations (a cooldown without a trace, a trace while
// idle) cannot be represented:
//
//   Idle { streak }          --N consecutive, jump-free points-->  Active
//   Active { trace }         --miss or out-of-bound jump------->  Cooldown
//   Cooldown { trace, missed } --point within bound------------->  Active (same trace)
//   Cooldown                 --missed reaches M----------------->  Idle (+ Completed | Discarded)
//
// Three independent noise sources get three independent knobs:
// - entry debounce (N) suppresses single-frame flicker starting a gesture;
// - the jump bound rejects tracking hops onto another bright object;
// - the cooldown (M) absorbs brief dropouts before declaring the gesture over.
//
// On completion the trace is *moved* out in the event. The segmenter keeps
// nothing, so a finished trace can never be appended to again.

use crate::core_modules::trace::{CandidatePoint, GestureTrace};
use crate::error::ConfigError;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct SegmenterConfig {
    /// Consecutive frames with a point needed to start a gesture (N).
    pub debounce_frames: u32,
    /// Consecutive frames without an acceptable point that end a gesture (M).
    pub cooldown_frames: u32,
    /// Largest per-frame displacement, in pixels, still treated as the same tip.
    pub max_jump_px: f64,
    /// Minimum number of points in an emitted trace.
    pub min_points: usize,
    /// Minimum bounding-box diagonal, in pixels, of an emitted trace.
    pub min_extent_px: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            debounce_frames: 3,
            cooldown_frames: 15,
            max_jump_px: 120.0,
            min_points: 15,
            min_extent_px: 40.0,
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_frames == 0 {
            return Err(ConfigError::invalid("debounce_frames", "must be at least 1"));
        }
        if self.cooldown_frames == 0 {
            return Err(ConfigError::invalid("cooldown_frames", "must be at least 1"));
        }
        if !(self.max_jump_px.is_finite() && self.max_jump_px > 0.0) {
            return Err(ConfigError::invalid("max_jump_px", "must be a positive number"));
        }
        if self.min_points < 2 {
            return Err(ConfigError::invalid("min_points", "a gesture needs at least 2 points"));
        }
        if !(self.min_extent_px.is_finite() && self.min_extent_px >= 0.0) {
            return Err(ConfigError::invalid("min_extent_px", "must be a non-negative number"));
        }
        Ok(())
    }
}

/// The segmenter's state, with the data each state owns.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmenterState {
    /// Waiting for a gesture. `streak` holds the debounce run collected so far.
    Idle { streak: Vec<CandidatePoint> },
    /// A gesture is being traced.
    Active { trace: GestureTrace },
    /// The tip was lost; `missed` counts consecutive frames without a usable point.
    Cooldown { trace: GestureTrace, missed: u32 },
}

impl Default for SegmenterState {
    fn default() -> Self {
        Self::Idle { streak: Vec::new() }
    }
}

/// Data-free summary of `SegmenterState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
    Cooldown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiscardReason {
    TooFewPoints { found: usize, required: usize },
    TooSmall { extent: f64, required: f64 },
}

/// What a single `step` did.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// Idle and nothing seen.
    Nothing,
    /// Idle, debounce run in progress.
    Arming { streak: usize },
    /// Debounce satisfied; the trace starts with the first point of the run.
    Started { trace_len: usize },
    /// Point appended to the active trace.
    Extended { trace_len: usize },
    /// Tip lost (or jumped out of bound) for `missed` consecutive frames.
    Paused { missed: u32, jump_rejected: bool },
    /// Tip reacquired during cooldown; accumulation continues in the same trace.
    Resumed { trace_len: usize },
    /// Gesture over and long/large enough to classify.
    Completed(GestureTrace),
    /// Gesture over but too short or too small; nothing is emitted.
    Discarded(DiscardReason),
}

/// Input to a transition, after jump gating.
enum Observation {
    Point(CandidatePoint),
    Miss { jump_rejected: bool },
}

pub struct GestureSegmenter {
    config: SegmenterConfig,
    state: SegmenterState,
}

impl GestureSegmenter {
    pub fn new(config: SegmenterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: SegmenterState::default(),
        })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn state(&self) -> &SegmenterState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            SegmenterState::Idle { .. } => Phase::Idle,
            SegmenterState::Active { .. } => Phase::Active,
            SegmenterState::Cooldown { .. } => Phase::Cooldown,
        }
    }

    /// Points in the trace being accumulated; zero while idle.
    pub fn trace_len(&self) -> usize {
        match &self.state {
            SegmenterState::Idle { .. } => 0,
            SegmenterState::Active { trace } | SegmenterState::Cooldown { trace, .. } => trace.len(),
        }
    }

    /// Feeds the tracker output for one frame. A point with a non-finite
    /// coordinate counts as a frame without a point.
    pub fn step(&mut self, point: Option<CandidatePoint>) -> SegmentEvent {
        let point = point.filter(|p| {
            if !p.is_finite() {
                trace!(x = p.x, y = p.y, "non-finite point treated as a miss");
            }
            p.is_finite()
        });
        let (next, event) = match std::mem::take(&mut self.state) {
            SegmenterState::Idle { streak } => self.from_idle(streak, point),
            SegmenterState::Active { trace } => {
                let observation = self.gate(&trace, 1, point);
                self.from_active(trace, observation)
            }
            SegmenterState::Cooldown { trace, missed } => {
                let observation = self.gate(&trace, missed + 1, point);
                self.from_cooldown(trace, missed, observation)
            }
        };
        self.state = next;
        event
    }

    /// Drops any in-progress trace and returns to idle without emitting.
    /// Returns the number of points thrown away.
    pub fn reset(&mut self) -> usize {
        let dropped = self.trace_len();
        if dropped > 0 {
            debug!(points = dropped, "in-progress gesture discarded by reset");
        }
        self.state = SegmenterState::default();
        dropped
    }

    /// Applies the jump bound. `frames_since_last` widens the bound when frames
    /// were missed, since the tip kept moving while it was not seen.
    fn gate(
        &self,
        trace: &GestureTrace,
        frames_since_last: u32,
        point: Option<CandidatePoint>,
    ) -> Observation {
        match (point, trace.last()) {
            (None, _) => Observation::Miss { jump_rejected: false },
            (Some(p), Some(last)) => {
                let bound = self.config.max_jump_px * frames_since_last as f64;
                let jump = p.distance_to(last);
                if jump > bound {
                    trace!(jump, bound, "point rejected as tracking jump");
                    Observation::Miss { jump_rejected: true }
                } else {
                    Observation::Point(p)
                }
            }
            (Some(p), None) => Observation::Point(p),
        }
    }

    fn from_idle(
        &self,
        mut streak: Vec<CandidatePoint>,
        point: Option<CandidatePoint>,
    ) -> (SegmenterState, SegmentEvent) {
        let Some(point) = point else {
            if !streak.is_empty() {
                trace!(streak = streak.len(), "debounce run broken");
            }
            return (SegmenterState::default(), SegmentEvent::Nothing);
        };

        let continues = streak
            .last()
            .is_none_or(|last| point.distance_to(last) <= self.config.max_jump_px);
        if !continues {
            streak.clear();
        }
        streak.push(point);

        if streak.len() >= self.config.debounce_frames as usize {
            let trace_len = streak.len();
            debug!(x = streak[0].x, y = streak[0].y, "gesture started");
            let trace = GestureTrace::from_points(streak);
            (SegmenterState::Active { trace }, SegmentEvent::Started { trace_len })
        } else {
            let len = streak.len();
            (SegmenterState::Idle { streak }, SegmentEvent::Arming { streak: len })
        }
    }

    fn from_active(
        &self,
        mut trace: GestureTrace,
        observation: Observation,
    ) -> (SegmenterState, SegmentEvent) {
        match observation {
            Observation::Point(p) => {
                trace.push(p);
                let trace_len = trace.len();
                (SegmenterState::Active { trace }, SegmentEvent::Extended { trace_len })
            }
            Observation::Miss { jump_rejected } => {
                debug!(points = trace.len(), "gesture paused");
                self.count_miss(trace, 1, jump_rejected)
            }
        }
    }

    fn from_cooldown(
        &self,
        mut trace: GestureTrace,
        missed: u32,
        observation: Observation,
    ) -> (SegmenterState, SegmentEvent) {
        match observation {
            Observation::Point(p) => {
                trace.push(p);
                let trace_len = trace.len();
                debug!(after_missed = missed, points = trace_len, "gesture resumed");
                (SegmenterState::Active { trace }, SegmentEvent::Resumed { trace_len })
            }
            Observation::Miss { jump_rejected } => self.count_miss(trace, missed + 1, jump_rejected),
        }
    }

    fn count_miss(
        &self,
        trace: GestureTrace,
        missed: u32,
        jump_rejected: bool,
    ) -> (SegmenterState, SegmentEvent) {
        if missed >= self.config.cooldown_frames {
            (SegmenterState::default(), self.finish(trace))
        } else {
            (
                SegmenterState::Cooldown { trace, missed },
                SegmentEvent::Paused { missed, jump_rejected },
            )
        }
    }

    /// Cooldown elapsed: emit the trace if it is long and large enough.
    fn finish(&self, trace: GestureTrace) -> SegmentEvent {
        if trace.len() < self.config.min_points {
            trace!(points = trace.len(), "trace discarded: too few points");
            return SegmentEvent::Discarded(DiscardReason::TooFewPoints {
                found: trace.len(),
                required: self.config.min_points,
            });
        }
        let extent = trace.extent();
        if extent < self.config.min_extent_px {
            trace!(extent, "trace discarded: too small");
            return SegmentEvent::Discarded(DiscardReason::TooSmall {
                extent,
                required: self.config.min_extent_px,
            });
        }
        debug!(points = trace.len(), extent, duration_ms = trace.duration_ms(), "gesture completed");
        SegmentEvent::Completed(trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SegmenterConfig {
        SegmenterConfig {
            debounce_frames: 3,
            cooldown_frames: 4,
            max_jump_px: 30.0,
            min_points: 5,
            min_extent_px: 20.0,
        }
    }

    fn pt(x: f64, y: f64, t: u64) -> Option<CandidatePoint> {
        Some(CandidatePoint::new(x, y, 250.0, t))
    }

    /// Feeds a horizontal line of `n` points, 10 px apart, starting at `x0`.
    fn feed_line(seg: &mut GestureSegmenter, x0: f64, n: usize) -> Vec<SegmentEvent> {
        (0..n).map(|i| seg.step(pt(x0 + 10.0 * i as f64, 100.0, i as u64))).collect()
    }

    #[test]
    fn debounce_starts_gesture_on_nth_point_with_whole_run() {
        let mut seg = GestureSegmenter::new(config()).unwrap();
        let events = feed_line(&mut seg, 0.0, 3);
        assert_eq!(events[0], SegmentEvent::Arming { streak: 1 });
        assert_eq!(events[1], SegmentEvent::Arming { streak: 2 });
        assert_eq!(events[2], SegmentEvent::Started { trace_len: 3 });
        assert_eq!(seg.phase(), Phase::Active);
        match seg.state() {
            SegmenterState::Active { trace } => assert_eq!(trace.first().unwrap().x, 0.0),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn single_frame_flicker_never_starts_a_gesture() {
        let mut seg = GestureSegmenter::new(config()).unwrap();
        for t in 0..10 {
            let obs = if t % 2 == 0 { pt(50.0, 50.0, t) } else { None };
            seg.step(obs);
            assert_eq!(seg.phase(), Phase::Idle);
        }
    }

    #[test]
    fn jump_during_debounce_restarts_the_run() {
        let mut seg = GestureSegmenter::new(config()).unwrap();
        seg.step(pt(0.0, 0.0, 0));
        seg.step(pt(10.0, 0.0, 1));
        assert_eq!(seg.step(pt(200.0, 0.0, 2)), SegmentEvent::Arming { streak: 1 });
    }

    #[test]
    fn jump_while_active_counts_as_a_miss_and_is_not_appended() {
        let mut seg = GestureSegmenter::new(config()).unwrap();
        feed_line(&mut seg, 0.0, 4);
        let event = seg.step(pt(500.0, 500.0, 10));
        assert_eq!(event, SegmentEvent::Paused { missed: 1, jump_rejected: true });
        assert_eq!(seg.phase(), Phase::Cooldown);
        assert_eq!(seg.trace_len(), 4);
    }

    #[test]
    fn cooldown_elapsing_emits_completed_trace() {
        let mut seg = GestureSegmenter::new(config()).unwrap();
        feed_line(&mut seg, 0.0, 8);
        let mut events = Vec::new();
        for t in 0..4 {
            events.push(seg.step(None));
            if t < 3 {
                assert_eq!(seg.phase(), Phase::Cooldown);
            }
        }
        match events.last().unwrap() {
            SegmentEvent::Completed(trace) => assert_eq!(trace.len(), 8),
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(seg.phase(), Phase::Idle);
        assert_eq!(seg.trace_len(), 0);
        assert_eq!(seg.step(None), SegmentEvent::Nothing);
    }

    #[test]
    fn point_during_cooldown_resumes_same_trace() {
        let mut seg = GestureSegmenter::new(config()).unwrap();
        feed_line(&mut seg, 0.0, 5);
        seg.step(None);
        seg.step(None);
        // 2 frames missed: allowed jump widens to 3 * 30 px.
        let event = seg.step(pt(120.0, 100.0, 20));
        assert_eq!(event, SegmentEvent::Resumed { trace_len: 6 });
        assert_eq!(seg.phase(), Phase::Active);
    }

    #[test]
    fn short_trace_is_discarded() {
        let mut seg = GestureSegmenter::new(config()).unwrap();
        feed_line(&mut seg, 0.0, 3);
        let last = (0..4).map(|_| seg.step(None)).last().unwrap();
        assert_eq!(
            last,
            SegmentEvent::Discarded(DiscardReason::TooFewPoints { found: 3, required: 5 })
        );
    }

    #[test]
    fn tiny_trace_is_discarded() {
        let mut seg = GestureSegmenter::new(config()).unwrap();
        for t in 0..10 {
            seg.step(pt(100.0 + (t % 2) as f64, 100.0, t));
        }
        let last = (0..4).map(|_| seg.step(None)).last().unwrap();
        assert!(matches!(last, SegmentEvent::Discarded(DiscardReason::TooSmall { .. })));
    }

    #[test]
    fn reset_discards_in_progress_trace() {
        let mut seg = GestureSegmenter::new(config()).unwrap();
        feed_line(&mut seg, 0.0, 6);
        assert_eq!(seg.reset(), 6);
        assert_eq!(seg.phase(), Phase::Idle);
        assert_eq!(seg.step(None), SegmentEvent::Nothing);
    }

    #[test]
    fn zero_cooldown_is_rejected() {
        let mut bad = config();
        bad.cooldown_frames = 0;
        assert!(GestureSegmenter::new(bad).is_err());
    }

    #[test]
    fn non_finite_points_count_as_misses() {
        let mut seg = GestureSegmenter::new(config()).unwrap();
        assert_eq!(seg.step(pt(f64::NAN, 100.0, 0)), SegmentEvent::Nothing);
        feed_line(&mut seg, 0.0, 6);

        let event = seg.step(pt(f64::NAN, 100.0, 6));
        assert_eq!(event, SegmentEvent::Paused { missed: 1, jump_rejected: false });
        assert_eq!(seg.step(pt(70.0, f64::INFINITY, 7)), SegmentEvent::Paused { missed: 2, jump_rejected: false });
        assert_eq!(seg.step(pt(70.0, 100.0, 8)), SegmentEvent::Resumed { trace_len: 7 });

        let trace = (0..4)
            .map(|_| seg.step(None))
            .find_map(|e| match e {
                SegmentEvent::Completed(trace) => Some(trace),
                _ => None,
            })
            .unwrap();
        assert_eq!(trace.len(), 7);
        assert!(trace.points().iter().all(CandidatePoint::is_finite));
    }
}
