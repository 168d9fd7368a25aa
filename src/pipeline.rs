// THEORY:
// The `pipeline` module is the top-level API of the recognizer. A
// `RecognitionSession` wires the stages together for one camera stream:
//
//   Frame -> SpotTracker -> GestureSegmenter -> PathNormalizer -> SpellClassifier
//
// and reports, once per frame, what happened. Exactly one frame is in flight at
// a time; the caller's capture loop drives the session.
//
// The session owns an immutable snapshot of the configuration and the trained
// model it was built with. Both are checked at construction, so a session that
// exists can always classify. Problems with a single frame (wrong shape, a
// classifier dimension mismatch) come back as a `FrameFault` and the next frame
// is processed normally.
//
// Display calls happen at fixed points: `show_ready` when idle again,
// `show_tracking` while a gesture grows, and exactly one of `show_spell` or
// `show_unrecognized` per classified gesture. A discarded gesture produces no
// result, only a return to ready.

use crate::config::SpellcasterConfig;
use crate::core_modules::classifier::{RecognitionResult, SpellClassifier, SpellOutcome};
use crate::core_modules::frame::Frame;
use crate::core_modules::model::SpellModel;
use crate::core_modules::normalizer::PathNormalizer;
use crate::core_modules::segmenter::{GestureSegmenter, SegmentEvent, SegmenterState};
use crate::core_modules::spot_tracker::{RegionVerdict, SpotTracker};
use crate::core_modules::trace::{CandidatePoint, GestureTrace};
use crate::display::{NullDisplay, SpellDisplay};
use crate::error::{ClassifyError, FrameError, FrameFault, SessionError};
use std::sync::Arc;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::segmenter::{DiscardReason, Phase};

/// The outcome of one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Idle, nothing to show.
    Nothing,
    /// A gesture is arming, active or in cooldown.
    Tracking {
        candidate: Option<CandidatePoint>,
        phase: Phase,
        trace_len: usize,
    },
    /// A gesture ended but was too short or too small to classify.
    Discarded(DiscardReason),
    /// A gesture was classified.
    Cast(RecognitionResult),
}

impl Report {
    pub fn result(&self) -> Option<&RecognitionResult> {
        match self {
            Self::Cast(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub faults: u64,
    pub recognized: u64,
    pub unrecognized: u64,
    pub discarded: u64,
}

/// Normalizer and classifier, shared between the frame loop and any workers.
#[derive(Debug, Clone)]
pub struct Recognizer {
    normalizer: PathNormalizer,
    classifier: SpellClassifier,
}

impl Recognizer {
    /// Builds the classifier from `model`, using the configuration's spell
    /// order as tie-break priority. Model and configuration must name the same
    /// spells.
    pub fn new(model: SpellModel, config: &SpellcasterConfig) -> Result<Self, SessionError> {
        let normalizer = PathNormalizer::new(model.features);
        let classifier = SpellClassifier::new(model, config.classifier_config())?;
        Ok(Self {
            normalizer,
            classifier,
        })
    }

    pub fn classifier(&self) -> &SpellClassifier {
        &self.classifier
    }

    pub fn recognize(&self, trace: &GestureTrace) -> Result<RecognitionResult, ClassifyError> {
        let features = self.normalizer.normalize(trace);
        let classification = self.classifier.classify(&features)?;
        debug!(
            points = trace.len(),
            scores = ?classification
                .scores
                .iter()
                .map(|s| (s.label.as_str(), (s.score * 1000.0).round() / 1000.0))
                .collect::<Vec<_>>(),
            "gesture classified"
        );
        let ended_at = trace.last().map(|p| p.timestamp_ms).unwrap_or_default();
        Ok(classification.at(ended_at))
    }
}

pub struct RecognitionSession {
    config: Arc<SpellcasterConfig>,
    tracker: SpotTracker,
    segmenter: GestureSegmenter,
    recognizer: Arc<Recognizer>,
    display: Box<dyn SpellDisplay>,
    stats: SessionStats,
}

impl RecognitionSession {
    /// Validates `config`, checks it against `model` and builds every stage.
    pub fn new(config: SpellcasterConfig, model: SpellModel) -> Result<Self, SessionError> {
        config.validate()?;
        let tracker = SpotTracker::new(config.tracker_config())?;
        let segmenter = GestureSegmenter::new(config.segmenter_config())?;
        let recognizer = Recognizer::new(model, &config)?;
        info!(
            spells = config.spells.len(),
            resolution = ?config.resolution(),
            min_confidence = config.gesture.min_confidence,
            "recognition session ready"
        );
        Ok(Self {
            config: Arc::new(config),
            tracker,
            segmenter,
            recognizer: Arc::new(recognizer),
            display: Box::new(NullDisplay),
            stats: SessionStats::default(),
        })
    }

    /// Replaces the display adapter and shows the ready screen on it.
    pub fn with_display(mut self, display: Box<dyn SpellDisplay>) -> Self {
        self.display = display;
        self.display.show_ready();
        self
    }

    pub fn config(&self) -> &SpellcasterConfig {
        &self.config
    }

    pub fn recognizer(&self) -> Arc<Recognizer> {
        Arc::clone(&self.recognizer)
    }

    pub fn phase(&self) -> Phase {
        self.segmenter.phase()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Points collected for the gesture in progress, including an arming run.
    pub fn current_trace(&self) -> &[CandidatePoint] {
        match self.segmenter.state() {
            SegmenterState::Idle { streak } => streak,
            SegmenterState::Active { trace } | SegmenterState::Cooldown { trace, .. } => trace.points(),
        }
    }

    /// Every bright region in `frame` with the tracker's verdict, for
    /// calibration views. Does not advance the session.
    pub fn scan(&self, frame: &Frame) -> Vec<RegionVerdict> {
        self.tracker.scan(frame)
    }

    pub fn process_frame(&mut self, frame: &Frame) -> Result<Report, FrameFault> {
        self.stats.frames += 1;

        // --- 1. Shape check ---
        let expected = self.config.resolution();
        if frame.dimensions() != expected {
            self.stats.faults += 1;
            let fault = FrameError::ShapeMismatch {
                expected,
                found: frame.dimensions(),
            };
            warn!(error = %fault, timestamp_ms = frame.timestamp_ms(), "frame dropped");
            return Err(fault.into());
        }

        // --- 2. Spot tracking ---
        let candidate = self.tracker.detect(frame);
        if let Some(point) = &candidate {
            self.display.show_candidate(point);
        }

        // --- 3. Segmentation and classification ---
        self.advance(candidate)
    }

    /// Feeds tracker output directly, bypassing pixel processing. Used by
    /// capture adapters that locate the tip themselves, and by tests.
    pub fn process_candidate(&mut self, candidate: Option<CandidatePoint>) -> Result<Report, FrameFault> {
        self.stats.frames += 1;
        self.advance(candidate)
    }

    /// Drops any gesture in progress and returns to idle without a result.
    pub fn reset(&mut self) {
        let dropped = self.segmenter.reset();
        self.tracker.forget();
        info!(dropped_points = dropped, "session reset");
        self.display.show_ready();
    }

    fn advance(&mut self, candidate: Option<CandidatePoint>) -> Result<Report, FrameFault> {
        let event = self.segmenter.step(candidate);
        let tracking = |segmenter: &GestureSegmenter| Report::Tracking {
            candidate,
            phase: segmenter.phase(),
            trace_len: segmenter.trace_len(),
        };

        match event {
            SegmentEvent::Nothing => Ok(Report::Nothing),
            SegmentEvent::Arming { .. } | SegmentEvent::Paused { .. } => Ok(tracking(&self.segmenter)),
            SegmentEvent::Started { trace_len }
            | SegmentEvent::Extended { trace_len }
            | SegmentEvent::Resumed { trace_len } => {
                self.display.show_tracking(trace_len);
                Ok(tracking(&self.segmenter))
            }
            SegmentEvent::Discarded(reason) => {
                self.stats.discarded += 1;
                self.display.show_ready();
                Ok(Report::Discarded(reason))
            }
            SegmentEvent::Completed(trace) => {
                let result = self.recognizer.recognize(&trace);
                self.deliver(result).map(Report::Cast)
            }
        }
    }

    fn deliver(
        &mut self,
        result: Result<RecognitionResult, ClassifyError>,
    ) -> Result<RecognitionResult, FrameFault> {
        let result = match result {
            Ok(result) => result,
            Err(err) => {
                self.stats.faults += 1;
                warn!(error = %err, "gesture dropped");
                self.display.show_ready();
                return Err(err.into());
            }
        };

        match &result.outcome {
            SpellOutcome::Recognized(key) => match self.config.spell(key) {
                Some(spell) => {
                    self.stats.recognized += 1;
                    info!(spell = %spell.name, confidence = result.confidence, "spell recognized");
                    self.display.show_spell(spell, &result);
                }
                None => {
                    // Construction guarantees every model label is configured.
                    warn!(label = %key, "recognized label has no spell metadata");
                    self.stats.unrecognized += 1;
                    self.display.show_unrecognized(&result);
                }
            },
            SpellOutcome::Unrecognized => {
                self.stats.unrecognized += 1;
                debug!(confidence = result.confidence, "gesture not recognized");
                self.display.show_unrecognized(&result);
            }
        }
        self.display.show_ready();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::synthetic::{SceneSpec, circle_path};
    use crate::core_modules::templates::standard_model;
    use crate::display::{DisplayEvent, RecordingDisplay};
    use crate::error::ConfigError;

    fn session() -> RecognitionSession {
        RecognitionSession::new(SpellcasterConfig::defaults(), standard_model().unwrap()).unwrap()
    }

    #[test]
    fn wrong_frame_shape_is_a_fault_and_session_continues() {
        let mut session = session();
        let small = SceneSpec {
            width: 320,
            height: 240,
            ..SceneSpec::default()
        };
        let fault = session.process_frame(&small.blank(0)).unwrap_err();
        assert_eq!(
            fault,
            FrameFault::Frame(FrameError::ShapeMismatch {
                expected: (640, 480),
                found: (320, 240)
            })
        );
        let report = session.process_frame(&SceneSpec::default().blank(33)).unwrap();
        assert_eq!(report, Report::Nothing);
        assert_eq!(session.stats().faults, 1);
        assert_eq!(session.stats().frames, 2);
    }

    #[test]
    fn rendered_circle_is_cast_once_as_alohomora() {
        let recorder = RecordingDisplay::new();
        let mut session = session().with_display(Box::new(recorder.clone()));
        let scene = SceneSpec::default();
        let frames = scene.render_path(&circle_path((320.0, 240.0), 100.0, 40, true), 20);

        let casts: Vec<RecognitionResult> = frames
            .iter()
            .filter_map(|frame| session.process_frame(frame).unwrap().result().cloned())
            .collect();
        assert_eq!(casts.len(), 1);
        assert_eq!(casts[0].label(), Some("alohomora"));
        assert!(casts[0].confidence >= 0.7);
        assert_eq!(session.phase(), Phase::Idle);

        let events = recorder.events();
        assert_eq!(events.first(), Some(&DisplayEvent::Ready));
        assert_eq!(events.last(), Some(&DisplayEvent::Ready));
        let spells: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, DisplayEvent::Spell { .. } | DisplayEvent::Unrecognized { .. }))
            .collect();
        assert_eq!(spells.len(), 1);
        assert!(matches!(spells[0], DisplayEvent::Spell { key, .. } if key == "alohomora"));
    }

    #[test]
    fn reset_drops_the_gesture_in_progress() {
        let mut session = session();
        for (i, (x, y)) in circle_path((320.0, 240.0), 100.0, 40, true).into_iter().take(20).enumerate() {
            session
                .process_candidate(Some(CandidatePoint::new(x, y, 255.0, i as u64 * 33)))
                .unwrap();
        }
        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.current_trace().len(), 20);

        session.reset();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.current_trace().is_empty());
        for _ in 0..30 {
            assert_eq!(session.process_candidate(None).unwrap(), Report::Nothing);
        }
    }

    #[test]
    fn model_and_configuration_must_name_the_same_spells() {
        let mut config = SpellcasterConfig::defaults();
        config.spells.retain(|s| s.key != "revelio");
        match RecognitionSession::new(config, standard_model().unwrap()) {
            Err(SessionError::Config(ConfigError::LabelMismatch { only_in_model, only_in_config })) => {
                assert_eq!(only_in_model, vec!["revelio".to_string()]);
                assert!(only_in_config.is_empty());
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("session built with mismatched labels"),
        }
    }
}
