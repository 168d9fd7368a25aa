// THEORY:
// The display is an output adapter. The session calls it at fixed points in the
// gesture lifecycle and never waits on it for anything. Real front ends (a
// window, an LED strip, a sound board) implement `SpellDisplay`; the crate ships
// a headless logger, a no-op sink and a recorder for tests and tooling.

use crate::core_modules::classifier::RecognitionResult;
use crate::core_modules::spells::SpellInfo;
use crate::core_modules::trace::CandidatePoint;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub trait SpellDisplay: Send {
    /// The session is idle and waiting for a gesture.
    fn show_ready(&mut self);

    /// A gesture is being traced and currently holds `point_count` points.
    fn show_tracking(&mut self, point_count: usize);

    /// The tip was located in the current frame. Debug views only.
    fn show_candidate(&mut self, _point: &CandidatePoint) {}

    fn show_spell(&mut self, spell: &SpellInfo, result: &RecognitionResult);

    fn show_unrecognized(&mut self, result: &RecognitionResult);
}

/// Writes every display call to the log.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl SpellDisplay for LogDisplay {
    fn show_ready(&mut self) {
        info!("ready, waiting for a gesture");
    }

    fn show_tracking(&mut self, point_count: usize) {
        debug!(points = point_count, "tracking gesture");
    }

    fn show_spell(&mut self, spell: &SpellInfo, result: &RecognitionResult) {
        info!(
            spell = %spell.name,
            incantation = %spell.incantation,
            color = %spell.color,
            confidence = format_args!("{:.2}", result.confidence),
            "{}!",
            spell.name
        );
    }

    fn show_unrecognized(&mut self, result: &RecognitionResult) {
        info!(
            confidence = format_args!("{:.2}", result.confidence),
            "gesture not recognized"
        );
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl SpellDisplay for NullDisplay {
    fn show_ready(&mut self) {}
    fn show_tracking(&mut self, _point_count: usize) {}
    fn show_spell(&mut self, _spell: &SpellInfo, _result: &RecognitionResult) {}
    fn show_unrecognized(&mut self, _result: &RecognitionResult) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    Ready,
    Tracking(usize),
    Candidate(CandidatePoint),
    Spell { key: String, confidence: f64 },
    Unrecognized { confidence: f64 },
}

/// Records calls into a shared list that outlives the session owning it.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    events: Arc<Mutex<Vec<DisplayEvent>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, event: DisplayEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl SpellDisplay for RecordingDisplay {
    fn show_ready(&mut self) {
        self.record(DisplayEvent::Ready);
    }

    fn show_tracking(&mut self, point_count: usize) {
        self.record(DisplayEvent::Tracking(point_count));
    }

    fn show_candidate(&mut self, point: &CandidatePoint) {
        self.record(DisplayEvent::Candidate(*point));
    }

    fn show_spell(&mut self, spell: &SpellInfo, result: &RecognitionResult) {
        self.record(DisplayEvent::Spell {
            key: spell.key.clone(),
            confidence: result.confidence,
        });
    }

    fn show_unrecognized(&mut self, result: &RecognitionResult) {
        self.record(DisplayEvent::Unrecognized {
            confidence: result.confidence,
        });
    }
}
