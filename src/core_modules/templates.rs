// THEORY:
// Training happens offline and produces a `SpellModel`. The `ModelTrainer`
// collects labelled example paths, runs each through the same `PathNormalizer`
// the live session uses, and stores the resulting feature vectors as exemplars.
//
// Examples can come from recorded traces or from the built-in template shapes.
// A template shape is added together with a few rotated copies, so a gesture
// drawn slightly tilted still lands next to an exemplar. Features compare
// point by point, so a closed shape (a circle, a triangle) started somewhere
// else on its loop looks like a different gesture. Closed shapes are therefore
// also added restarted at evenly spaced points around the loop. Rotations and
// restart points are fixed lists, so training the same shapes twice gives the
// same model byte for byte.
//
// Template coordinates use image orientation: x grows to the right, y grows
// downward, and "clockwise" is clockwise as seen on screen.

use crate::core_modules::model::{DEFAULT_SIMILARITY_SCALE, MODEL_FORMAT_VERSION, SpellModel, SpellTemplate};
use crate::core_modules::normalizer::{FeatureSpec, PathNormalizer, resample};
use crate::core_modules::trace::GestureTrace;
use crate::error::ModelError;
use std::f64::consts::{PI, TAU};
use tracing::info;

/// Points generated per template before normalization resamples them.
const TEMPLATE_POINTS: usize = 64;
/// Rotations (radians) applied to every template shape.
pub const ROTATION_VARIANTS: [f64; 5] = [-0.2, -0.1, 0.0, 0.1, 0.2];
/// Start points tried around a closed shape, evenly spaced along the loop.
pub const START_PHASES: usize = 12;
pub const STANDARD_SPELL_SET: &str = "standard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateShape {
    CircleClockwise,
    CircleCounterClockwise,
    FlickUp,
    FlickDown,
    DiagonalWave,
    SCurve,
    SwishFlick,
    HorizontalSweep,
    Triangle,
    Zigzag,
    CheckMark,
}

impl TemplateShape {
    pub const ALL: [TemplateShape; 11] = [
        Self::CircleClockwise,
        Self::CircleCounterClockwise,
        Self::FlickUp,
        Self::FlickDown,
        Self::DiagonalWave,
        Self::SCurve,
        Self::SwishFlick,
        Self::HorizontalSweep,
        Self::Triangle,
        Self::Zigzag,
        Self::CheckMark,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CircleClockwise => "circle_cw",
            Self::CircleCounterClockwise => "circle_ccw",
            Self::FlickUp => "flick_up",
            Self::FlickDown => "flick_down",
            Self::DiagonalWave => "diagonal_wave",
            Self::SCurve => "s_curve",
            Self::SwishFlick => "swish_flick",
            Self::HorizontalSweep => "horizontal_sweep",
            Self::Triangle => "triangle",
            Self::Zigzag => "zigzag",
            Self::CheckMark => "check_mark",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|shape| shape.name() == name)
    }

    /// Whether the shape ends where it starts, so it may be drawn from any
    /// point on the loop.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::CircleClockwise | Self::CircleCounterClockwise | Self::Triangle
        )
    }

    /// The shape as `points` samples in a roughly unit-sized box.
    pub fn path(&self, points: usize) -> Vec<(f64, f64)> {
        let points = points.max(2);
        let ts = |n: usize| (0..n).map(move |i| i as f64 / (n - 1) as f64);
        match self {
            Self::CircleClockwise => ts(points).map(|t| ((t * TAU).cos(), (t * TAU).sin())).collect(),
            Self::CircleCounterClockwise => ts(points).map(|t| ((t * TAU).cos(), -(t * TAU).sin())).collect(),
            Self::FlickUp => ts(points).map(|t| (0.25 * (t * PI * 0.3).sin(), -t)).collect(),
            Self::FlickDown => ts(points).map(|t| (0.25 * (t * PI * 0.3).sin(), t)).collect(),
            Self::DiagonalWave => ts(points).map(|t| (t + 0.2 * (t * 3.0 * PI).sin(), -t)).collect(),
            Self::SCurve => ts(points).map(|t| (0.5 * (t * TAU).sin(), t)).collect(),
            Self::SwishFlick => {
                // Horizontal swish, then a sharp upward flick.
                let half = points / 2;
                let swish = ts(half).map(|t| {
                    let t = t * 0.5;
                    (t * 2.0, -0.2 * (t * TAU).sin())
                });
                let flick = ts(points - half).map(|t| {
                    let t = 0.5 + t * 0.5;
                    (1.0 + 0.3 * (t - 0.5), -(t - 0.5) * 2.0)
                });
                swish.chain(flick).collect()
            }
            Self::HorizontalSweep => ts(points).map(|t| (t, -0.1 * (t * PI).sin())).collect(),
            Self::Triangle => resample(&[(0.5, 0.0), (0.0, 1.0), (1.0, 1.0), (0.5, 0.0)], points),
            Self::Zigzag => resample(
                &[(0.0, 0.0), (0.25, 1.0), (0.5, 0.0), (0.75, 1.0), (1.0, 0.0)],
                points,
            ),
            Self::CheckMark => resample(&[(0.0, 0.6), (0.35, 1.0), (1.0, 0.0)], points),
        }
    }
}

/// The template shape the standard spell set trains for `key`.
pub fn standard_shape(key: &str) -> Option<TemplateShape> {
    let shape = match key {
        "alohomora" => TemplateShape::CircleClockwise,
        "lumos" => TemplateShape::FlickUp,
        "nox" => TemplateShape::FlickDown,
        "incendio" => TemplateShape::DiagonalWave,
        "aguamenti" => TemplateShape::SCurve,
        "wingardium_leviosa" => TemplateShape::SwishFlick,
        "arresto_momentum" => TemplateShape::HorizontalSweep,
        "revelio" => TemplateShape::CircleCounterClockwise,
        _ => return None,
    };
    Some(shape)
}

/// Restarts a closed `path` at sample `offset`, keeping its direction of
/// travel. The last sample is expected to repeat the first.
pub fn restart(path: &[(f64, f64)], offset: usize) -> Vec<(f64, f64)> {
    let Some((_, ring)) = path.split_last() else {
        return Vec::new();
    };
    if ring.is_empty() {
        return path.to_vec();
    }
    let offset = offset % ring.len();
    let mut restarted: Vec<(f64, f64)> = ring[offset..].iter().chain(&ring[..offset]).copied().collect();
    restarted.push(restarted[0]);
    restarted
}

/// Rotates `path` by `angle` radians about its centroid.
pub fn rotate(path: &[(f64, f64)], angle: f64) -> Vec<(f64, f64)> {
    if path.is_empty() {
        return Vec::new();
    }
    let count = path.len() as f64;
    let cx = path.iter().map(|p| p.0).sum::<f64>() / count;
    let cy = path.iter().map(|p| p.1).sum::<f64>() / count;
    let (sin, cos) = angle.sin_cos();
    path.iter()
        .map(|&(x, y)| {
            let (dx, dy) = (x - cx, y - cy);
            (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
        })
        .collect()
}

pub struct ModelTrainer {
    normalizer: PathNormalizer,
    spell_set: String,
    similarity_scale: f64,
    /// Labels in the order they were first added.
    spells: Vec<SpellTemplate>,
}

impl ModelTrainer {
    pub fn new(features: FeatureSpec) -> Self {
        Self {
            normalizer: PathNormalizer::new(features),
            spell_set: String::from("custom"),
            similarity_scale: DEFAULT_SIMILARITY_SCALE,
            spells: Vec::new(),
        }
    }

    pub fn with_spell_set(mut self, name: impl Into<String>) -> Self {
        self.spell_set = name.into();
        self
    }

    pub fn with_similarity_scale(mut self, scale: f64) -> Self {
        self.similarity_scale = scale;
        self
    }

    /// Adds one example path for `label`. Paths shorter than two points carry
    /// no shape and are ignored.
    pub fn add_path(&mut self, label: &str, path: &[(f64, f64)]) -> &mut Self {
        if path.len() < 2 {
            return self;
        }
        let exemplar = self.normalizer.normalize_path(path).into_vec();
        match self.spells.iter_mut().find(|s| s.label == label) {
            Some(spell) => spell.exemplars.push(exemplar),
            None => self.spells.push(SpellTemplate {
                label: label.to_string(),
                exemplars: vec![exemplar],
            }),
        }
        self
    }

    /// Adds a recorded gesture as an example.
    pub fn add_trace(&mut self, label: &str, trace: &GestureTrace) -> &mut Self {
        self.add_path(label, &trace.path())
    }

    /// Adds a template shape and its rotated variants. Closed shapes are
    /// added once per start phase.
    pub fn add_shape(&mut self, label: &str, shape: TemplateShape) -> &mut Self {
        let base = shape.path(TEMPLATE_POINTS);
        let phases = if shape.is_closed() { START_PHASES } else { 1 };
        let ring = TEMPLATE_POINTS - 1;
        for phase in 0..phases {
            let start = restart(&base, ring * phase / phases);
            for angle in ROTATION_VARIANTS {
                self.add_path(label, &rotate(&start, angle));
            }
        }
        self
    }

    pub fn exemplar_count(&self) -> usize {
        self.spells.iter().map(|s| s.exemplars.len()).sum()
    }

    pub fn build(self) -> Result<SpellModel, ModelError> {
        let model = SpellModel {
            format_version: MODEL_FORMAT_VERSION,
            spell_set: self.spell_set,
            features: *self.normalizer.spec(),
            similarity_scale: self.similarity_scale,
            spells: self.spells,
        };
        model.validate()?;
        info!(
            spell_set = %model.spell_set,
            spells = model.spells.len(),
            dimension = model.dimension(),
            "spell model trained"
        );
        Ok(model)
    }
}

/// Trains the eight-spell standard model from template shapes.
pub fn standard_model() -> Result<SpellModel, ModelError> {
    let mut trainer = ModelTrainer::new(FeatureSpec::default()).with_spell_set(STANDARD_SPELL_SET);
    for spell in crate::core_modules::spells::standard_spells() {
        if let Some(shape) = standard_shape(&spell.key) {
            trainer.add_shape(&spell.key, shape);
        }
    }
    trainer.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::classifier::{ClassifierConfig, SpellClassifier};
    use crate::core_modules::spells::standard_spells;

    #[test]
    fn every_shape_has_a_unique_round_trippable_name() {
        for shape in TemplateShape::ALL {
            assert_eq!(TemplateShape::from_name(shape.name()), Some(shape));
            assert_eq!(shape.path(40).len(), 40);
        }
        assert_eq!(TemplateShape::from_name("pentagram"), None);
    }

    #[test]
    fn clockwise_circle_turns_clockwise_on_screen() {
        // With y pointing down, a clockwise turn has a positive cross product.
        let path = TemplateShape::CircleClockwise.path(16);
        let (a, b, c) = (path[0], path[1], path[2]);
        let cross = (b.0 - a.0) * (c.1 - b.1) - (b.1 - a.1) * (c.0 - b.0);
        assert!(cross > 0.0);
    }

    #[test]
    fn rotation_preserves_centroid_and_radius() {
        let square = [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)];
        let turned = rotate(&square, PI / 2.0);
        for (before, after) in square.iter().zip(&turned) {
            let r0 = (before.0 - 1.0).hypot(before.1 - 1.0);
            let r1 = (after.0 - 1.0).hypot(after.1 - 1.0);
            assert!((r0 - r1).abs() < 1e-12);
        }
        assert!((turned[0].0 - 2.0).abs() < 1e-12 && turned[0].1.abs() < 1e-12);
    }

    #[test]
    fn trainer_groups_exemplars_by_label_in_insertion_order() {
        let mut trainer = ModelTrainer::new(FeatureSpec::default());
        trainer
            .add_shape("b", TemplateShape::Zigzag)
            .add_shape("a", TemplateShape::Triangle)
            .add_path("b", &TemplateShape::CheckMark.path(20))
            .add_path("a", &[(1.0, 1.0)]);
        assert_eq!(trainer.exemplar_count(), 6 + 5 * START_PHASES);
        let model = trainer.build().unwrap();
        assert_eq!(model.labels(), vec!["b", "a"]);
        assert_eq!(model.spells[0].exemplars.len(), 6);
        assert_eq!(model.spells[1].exemplars.len(), 5 * START_PHASES);
    }

    #[test]
    fn empty_trainer_fails_to_build() {
        let trainer = ModelTrainer::new(FeatureSpec::default());
        assert!(matches!(trainer.build(), Err(ModelError::NoSpells)));
    }

    #[test]
    fn training_is_deterministic() {
        assert_eq!(standard_model().unwrap(), standard_model().unwrap());
    }

    #[test]
    fn standard_model_recognizes_each_template_at_any_size_and_place() {
        let model = standard_model().unwrap();
        let keys: Vec<String> = standard_spells().into_iter().map(|s| s.key).collect();
        assert_eq!(model.labels(), keys.iter().map(String::as_str).collect::<Vec<_>>());

        let normalizer = PathNormalizer::new(model.features);
        let config = ClassifierConfig {
            min_confidence: 0.7,
            priority: keys.clone(),
        };
        let classifier = SpellClassifier::new(model, config).unwrap();
        for key in &keys {
            let shape = standard_shape(key).unwrap();
            let drawn: Vec<(f64, f64)> = shape
                .path(45)
                .into_iter()
                .map(|(x, y)| (250.0 + 140.0 * x, 180.0 + 140.0 * y))
                .collect();
            let result = classifier.classify(&normalizer.normalize_path(&drawn)).unwrap();
            assert_eq!(result.outcome.label(), Some(key.as_str()), "drawing {}", shape.name());
            assert!(result.confidence > 0.9, "{key}: {}", result.confidence);
        }
    }

    #[test]
    fn restart_keeps_the_loop_closed_and_its_direction() {
        let square = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)];
        let restarted = restart(&square, 2);
        assert_eq!(
            restarted,
            vec![(1.0, 1.0), (0.0, 1.0), (0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]
        );
        assert_eq!(restart(&square, 4), square.to_vec());
        assert!(restart(&[], 3).is_empty());
    }

    #[test]
    fn only_loops_get_start_phase_variants() {
        let mut trainer = ModelTrainer::new(FeatureSpec::default());
        trainer.add_shape("open", TemplateShape::FlickUp);
        assert_eq!(trainer.exemplar_count(), ROTATION_VARIANTS.len());
        trainer.add_shape("loop", TemplateShape::CircleClockwise);
        assert_eq!(
            trainer.exemplar_count(),
            ROTATION_VARIANTS.len() * (1 + START_PHASES)
        );
    }

    #[test]
    fn circles_are_recognized_from_any_start_angle() {
        let model = standard_model().unwrap();
        let normalizer = PathNormalizer::new(model.features);
        let config = ClassifierConfig {
            min_confidence: 0.7,
            priority: standard_spells().into_iter().map(|s| s.key).collect(),
        };
        let classifier = SpellClassifier::new(model, config).unwrap();
        for (clockwise, key) in [(true, "alohomora"), (false, "revelio")] {
            let turn = if clockwise { 1.0 } else { -1.0 };
            for degrees in (0..360).step_by(15) {
                let start = (degrees as f64).to_radians();
                let drawn: Vec<(f64, f64)> = (0..40)
                    .map(|i| {
                        let angle = start + turn * TAU * i as f64 / 39.0;
                        (320.0 + 100.0 * angle.cos(), 240.0 + 100.0 * angle.sin())
                    })
                    .collect();
                let result = classifier.classify(&normalizer.normalize_path(&drawn)).unwrap();
                assert_eq!(result.outcome.label(), Some(key), "{key} from {degrees} degrees");
                assert!(result.confidence > 0.9, "{key} from {degrees}: {}", result.confidence);
            }
        }
    }
}
