// THEORY:
// The `SpellClassifier` is a nearest-exemplar classifier over feature vectors.
//
// For every spell label it finds the closest exemplar (RMS distance) and turns
// that distance into a similarity score in [0, 1]:
//
//     score = exp(-(distance / similarity_scale)^2)
//
// An exact match scores 1.0 and the score falls off smoothly with distance.
// The label with the highest score wins. If that score is below the configured
// minimum confidence the result is the explicit "unrecognized" outcome, which
// carries no label.
//
// Ties at the maximum score are resolved by a fixed priority order over labels
// (by default the order of the spells in the configuration). The templates are
// sorted into that order once at construction and the arg-max keeps the first
// maximum it sees, so the result is the same on every run.

use crate::core_modules::model::{SpellModel, SpellTemplate};
use crate::core_modules::normalizer::{FeatureSpec, FeatureVector};
use crate::error::{ClassifyError, ConfigError, SessionError};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Scores below this are reported as unrecognized.
    pub min_confidence: f64,
    /// Tie-break order, highest priority first. Empty means model order.
    pub priority: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            priority: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpellOutcome {
    Recognized(String),
    Unrecognized,
}

impl SpellOutcome {
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Recognized(label) => Some(label),
            Self::Unrecognized => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Classifier verdict for one feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub outcome: SpellOutcome,
    /// Score of the best label, whether or not it cleared the threshold.
    pub confidence: f64,
    /// Every label's score, in priority order.
    pub scores: Vec<LabelScore>,
}

impl Classification {
    pub fn at(self, timestamp_ms: u64) -> RecognitionResult {
        RecognitionResult {
            outcome: self.outcome,
            confidence: self.confidence,
            timestamp_ms,
        }
    }
}

/// What the display layer receives once per completed gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub outcome: SpellOutcome,
    pub confidence: f64,
    /// Time the gesture ended.
    pub timestamp_ms: u64,
}

impl RecognitionResult {
    pub fn label(&self) -> Option<&str> {
        self.outcome.label()
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self.outcome, SpellOutcome::Recognized(_))
    }
}

#[derive(Debug, Clone)]
pub struct SpellClassifier {
    /// Templates sorted by tie-break priority.
    templates: Vec<SpellTemplate>,
    features: FeatureSpec,
    similarity_scale: f64,
    min_confidence: f64,
}

impl SpellClassifier {
    /// Builds a classifier, failing if the model is unusable or the priority
    /// order does not name exactly the model's labels.
    pub fn new(model: SpellModel, config: ClassifierConfig) -> Result<Self, SessionError> {
        model.validate()?;
        if !(0.0..=1.0).contains(&config.min_confidence) {
            return Err(ConfigError::invalid("min_confidence", "must lie in [0, 1]").into());
        }

        let SpellModel {
            features,
            similarity_scale,
            spells,
            ..
        } = model;
        let templates = if config.priority.is_empty() {
            spells
        } else {
            order_by_priority(spells, &config.priority)?
        };

        Ok(Self {
            templates,
            features,
            similarity_scale,
            min_confidence: config.min_confidence,
        })
    }

    /// Labels in tie-break priority order.
    pub fn labels(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.label.as_str()).collect()
    }

    pub fn features(&self) -> &FeatureSpec {
        &self.features
    }

    pub fn dimension(&self) -> usize {
        self.features.dimension()
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<Classification, ClassifyError> {
        let expected = self.dimension();
        if features.len() != expected {
            return Err(ClassifyError::DimensionMismatch {
                expected,
                found: features.len(),
            });
        }

        let scores: Vec<LabelScore> = self
            .templates
            .iter()
            .map(|template| LabelScore {
                label: template.label.clone(),
                score: self.similarity(features, template),
            })
            .collect();

        let mut best = 0;
        for (i, candidate) in scores.iter().enumerate().skip(1) {
            if candidate.score > scores[best].score {
                best = i;
            }
        }
        let confidence = scores[best].score;
        let outcome = if confidence >= self.min_confidence {
            SpellOutcome::Recognized(scores[best].label.clone())
        } else {
            debug!(
                best = %scores[best].label,
                confidence,
                threshold = self.min_confidence,
                "gesture below confidence threshold"
            );
            SpellOutcome::Unrecognized
        };

        Ok(Classification {
            outcome,
            confidence,
            scores,
        })
    }

    fn similarity(&self, features: &FeatureVector, template: &SpellTemplate) -> f64 {
        let nearest = template
            .exemplars
            .iter()
            .map(|exemplar| features.rms_distance(exemplar))
            .fold(f64::INFINITY, f64::min);
        let score = (-(nearest / self.similarity_scale).powi(2)).exp();
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }
}

fn order_by_priority(
    mut spells: Vec<SpellTemplate>,
    priority: &[String],
) -> Result<Vec<SpellTemplate>, ConfigError> {
    let model_labels: HashSet<&str> = spells.iter().map(|s| s.label.as_str()).collect();
    let priority_labels: HashSet<&str> = priority.iter().map(String::as_str).collect();
    if model_labels != priority_labels || priority.len() != priority_labels.len() {
        let mut only_in_model: Vec<String> = model_labels
            .difference(&priority_labels)
            .map(|s| s.to_string())
            .collect();
        let mut only_in_config: Vec<String> = priority_labels
            .difference(&model_labels)
            .map(|s| s.to_string())
            .collect();
        only_in_model.sort();
        only_in_config.sort();
        return Err(ConfigError::LabelMismatch {
            only_in_model,
            only_in_config,
        });
    }

    spells.sort_by_key(|s| priority.iter().position(|p| *p == s.label));
    Ok(spells)
}
