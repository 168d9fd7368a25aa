// THEORY:
// A `SpellModel` is the trained artifact the classifier runs on: the feature
// layout it was trained with, the similarity scale, and one or more reference
// feature vectors (exemplars) per spell label. It is produced offline by the
// `ModelTrainer`, stored as versioned JSON, and injected into a session at
// construction. Nothing in the process holds it globally; several sessions can
// run side by side on independent models.
//
// Loading is strict. A missing file, an unknown format version, an empty label
// set or an exemplar of the wrong dimension are all load-time errors, never a
// model that quietly recognizes nothing.

use crate::core_modules::normalizer::FeatureSpec;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

pub const MODEL_FORMAT_VERSION: u32 = 1;
/// RMS feature distance at which similarity falls to 1/e.
pub const DEFAULT_SIMILARITY_SCALE: f64 = 0.25;

/// Reference exemplars for one spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellTemplate {
    pub label: String,
    pub exemplars: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellModel {
    pub format_version: u32,
    /// Free-form name of the spell set the model was trained for.
    pub spell_set: String,
    pub features: FeatureSpec,
    pub similarity_scale: f64,
    pub spells: Vec<SpellTemplate>,
}

impl SpellModel {
    /// Reads and validates a model artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ModelError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let model = Self::from_json_str(&text)?;
        info!(
            path = %path.display(),
            spell_set = %model.spell_set,
            spells = model.spells.len(),
            "spell model loaded"
        );
        Ok(model)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ModelError> {
        let model: SpellModel = serde_json::from_str(text)?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json_string(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let io_error = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, self.to_json_string()?).map_err(io_error)?;
        info!(path = %path.display(), "spell model saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                expected: MODEL_FORMAT_VERSION,
                found: self.format_version,
            });
        }
        if self.features.resample_points < 2 {
            return Err(ModelError::InvalidResampleCount(self.features.resample_points));
        }
        if !(self.similarity_scale.is_finite() && self.similarity_scale > 0.0) {
            return Err(ModelError::InvalidSimilarityScale(self.similarity_scale));
        }
        if self.spells.is_empty() {
            return Err(ModelError::NoSpells);
        }

        let expected = self.dimension();
        let mut seen = HashSet::new();
        for spell in &self.spells {
            if !seen.insert(spell.label.as_str()) {
                return Err(ModelError::DuplicateLabel(spell.label.clone()));
            }
            if spell.exemplars.is_empty() {
                return Err(ModelError::NoExemplars {
                    label: spell.label.clone(),
                });
            }
            if let Some(bad) = spell.exemplars.iter().find(|e| e.len() != expected) {
                return Err(ModelError::DimensionMismatch {
                    label: spell.label.clone(),
                    expected,
                    found: bad.len(),
                });
            }
        }
        Ok(())
    }

    pub fn labels(&self) -> Vec<&str> {
        self.spells.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn dimension(&self) -> usize {
        self.features.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::normalizer::ScaleMode;

    fn tiny_model() -> SpellModel {
        SpellModel {
            format_version: MODEL_FORMAT_VERSION,
            spell_set: "test".into(),
            features: FeatureSpec {
                resample_points: 2,
                scale: ScaleMode::BoundingBoxDiagonal,
                directions: false,
            },
            similarity_scale: DEFAULT_SIMILARITY_SCALE,
            spells: vec![SpellTemplate {
                label: "lumos".into(),
                exemplars: vec![vec![0.0, -0.5, 0.0, 0.5]],
            }],
        }
    }

    #[test]
    fn json_round_trip_preserves_model() {
        let model = tiny_model();
        let text = model.to_json_string().unwrap();
        assert!(text.contains("\"bounding_box_diagonal\""));
        assert_eq!(SpellModel::from_json_str(&text).unwrap(), model);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = SpellModel::load("/definitely/not/here/model.json").unwrap_err();
        assert!(matches!(err, ModelError::Unavailable { .. }));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut model = tiny_model();
        model.format_version = 99;
        assert!(matches!(
            model.validate(),
            Err(ModelError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn wrong_exemplar_dimension_is_rejected() {
        let mut model = tiny_model();
        model.spells[0].exemplars.push(vec![1.0, 2.0]);
        assert!(matches!(
            model.validate(),
            Err(ModelError::DimensionMismatch { expected: 4, found: 2, .. })
        ));
    }

    #[test]
    fn empty_and_duplicate_label_sets_are_rejected() {
        let mut empty = tiny_model();
        empty.spells.clear();
        assert!(matches!(empty.validate(), Err(ModelError::NoSpells)));

        let mut duplicated = tiny_model();
        duplicated.spells.push(duplicated.spells[0].clone());
        assert!(matches!(duplicated.validate(), Err(ModelError::DuplicateLabel(_))));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("wand_vision_model_{}", std::process::id()));
        let path = dir.join("nested").join("model.json");
        tiny_model().save(&path).unwrap();
        assert_eq!(SpellModel::load(&path).unwrap(), tiny_model());
        let _ = fs::remove_dir_all(dir);
    }
}
