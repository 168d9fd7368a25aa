// THEORY:
// Errors are split by *when* they can happen, because the caller must react to
// them differently:
// - Construction-time (`ConfigError`, `ModelError`, wrapped by `SessionError`)
//   are fatal. A session that cannot load its model must never come up in an
//   "everything is unrecognized" mode.
// - Per-frame (`FrameError`, `ClassifyError`, wrapped by `FrameFault`) are
//   degraded conditions. The offending frame or gesture is dropped and the
//   pipeline keeps running with the next frame.
// "No spot in this frame" and "trace too short" are not errors at all; they are
// ordinary outcomes carried by `Option` and `SegmentEvent`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(
        "spell labels disagree between model and configuration \
         (only in model: {only_in_model:?}, only in configuration: {only_in_config:?})"
    )]
    LabelMismatch {
        only_in_model: Vec<String>,
        only_in_config: Vec<String>,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("trained model unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported model format version {found} (expected {expected})")]
    UnsupportedVersion { expected: u32, found: u32 },
    #[error("model contains no trained spells")]
    NoSpells,
    #[error("spell `{label}` has no reference exemplars")]
    NoExemplars { label: String },
    #[error("spell `{0}` appears more than once in the model")]
    DuplicateLabel(String),
    #[error("exemplar for `{label}` has {found} features, model layout requires {expected}")]
    DimensionMismatch {
        label: String,
        expected: usize,
        found: usize,
    },
    #[error("similarity scale must be positive and finite, got {0}")]
    InvalidSimilarityScale(f64),
    #[error("feature layout needs at least 2 resample points, got {0}")]
    InvalidResampleCount(usize),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("frame buffer holds {found} bytes, {expected} expected")]
    BufferLength { expected: usize, found: usize },
    #[error("frame is {found:?}, session expects {expected:?}")]
    ShapeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("feature vector has {found} dimensions, classifier expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// A frame that could not be processed. The session stays usable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameFault {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

/// Fatal construction failure of a recognition session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelError),
}
