// THEORY:
// This file is the entry point of the `wand_vision` library crate. It exposes a
// real-time recognizer for spell gestures drawn with an IR-reflective wand tip
// in front of an IR camera.
//
// The high-level interface is `pipeline::RecognitionSession` (one frame at a
// time, results synchronously) and `parallel_pipeline::ParallelSession`
// (classification on tokio workers, results in gesture order). Both are built
// from a `config::SpellcasterConfig` and a trained `SpellModel`. The stages they
// compose live in `core_modules` and can be used on their own, e.g. a
// calibration tool that only needs the spot tracker.

pub mod config;
pub mod core_modules;
pub mod display;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::SpellcasterConfig;
pub use core_modules::classifier::{RecognitionResult, SpellOutcome};
pub use core_modules::frame::Frame;
pub use core_modules::model::SpellModel;
pub use core_modules::trace::CandidatePoint;
pub use error::{ConfigError, FrameFault, ModelError, SessionError};
pub use pipeline::{RecognitionSession, Report};
