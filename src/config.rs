// THEORY:
// All tunables live in one `SpellcasterConfig`, read from a YAML file and then
// overridden by a handful of environment variables. A session takes a snapshot
// of it at construction and never sees later edits, so changing thresholds
// means building a new session.
//
// Every section falls back to its defaults field by field, so a file only
// needs the keys it wants to change. Validation runs after the overrides and
// rejects anything the pipeline cannot run with; it never clamps silently.

use crate::core_modules::classifier::ClassifierConfig;
use crate::core_modules::segmenter::SegmenterConfig;
use crate::core_modules::spells::{SpellInfo, standard_spells};
use crate::core_modules::spot_tracker::TrackerConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

pub const ENV_IR_THRESHOLD: &str = "WAND_IR_THRESHOLD";
pub const ENV_MIN_CONFIDENCE: &str = "WAND_MIN_CONFIDENCE";
pub const ENV_MIN_BLOB_AREA: &str = "WAND_MIN_BLOB_AREA";
pub const ENV_MAX_BLOB_AREA: &str = "WAND_MAX_BLOB_AREA";
pub const ENV_MODEL_PATH: &str = "WAND_MODEL_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Expected frame size as `[width, height]`.
    pub resolution: [u32; 2],
    /// Pixels strictly brighter than this belong to a spot (0-255).
    pub ir_threshold: u16,
    pub min_blob_area: u32,
    pub max_blob_area: u32,
    /// Gaussian pre-blur sigma; 0 disables it.
    pub blur_sigma: f32,
    pub min_fill_ratio: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let tracker = TrackerConfig::default();
        Self {
            resolution: [640, 480],
            ir_threshold: u16::from(tracker.brightness_threshold),
            min_blob_area: tracker.min_area,
            max_blob_area: tracker.max_area,
            blur_sigma: tracker.blur_sigma,
            min_fill_ratio: tracker.min_fill_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub debounce_frames: u32,
    pub cooldown_frames: u32,
    pub max_jump_px: f64,
    pub min_points: usize,
    pub min_extent_px: f64,
    pub min_confidence: f64,
    pub model_path: PathBuf,
}

impl Default for GestureConfig {
    fn default() -> Self {
        let segmenter = SegmenterConfig::default();
        Self {
            debounce_frames: segmenter.debounce_frames,
            cooldown_frames: segmenter.cooldown_frames,
            max_jump_px: segmenter.max_jump_px,
            min_points: segmenter.min_points,
            min_extent_px: segmenter.min_extent_px,
            min_confidence: ClassifierConfig::default().min_confidence,
            model_path: PathBuf::from("models/spell_model.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellcasterConfig {
    pub camera: CameraConfig,
    pub gesture: GestureConfig,
    /// Known spells; the order is the classifier's tie-break priority.
    pub spells: Vec<SpellInfo>,
}

impl Default for SpellcasterConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            gesture: GestureConfig::default(),
            spells: standard_spells(),
        }
    }
}

impl SpellcasterConfig {
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Reads `path`, applies environment overrides, then validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_yaml::from_str(&text)?;
        config.apply_env_overrides();
        config.validate()?;
        info!(path = %path.display(), spells = config.spells.len(), "configuration loaded");
        Ok(config)
    }

    /// Parses and validates YAML without consulting the environment.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, self.to_yaml_string()?).map_err(io_error)
    }

    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        self.apply_env_overrides_with(|key| std::env::var(key).ok())
    }

    /// Applies overrides found through `lookup` and returns the keys applied.
    /// Values that do not parse are logged and ignored.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();
        if let Some(v) = parse_override(&lookup, ENV_IR_THRESHOLD) {
            self.camera.ir_threshold = v;
            applied.push(ENV_IR_THRESHOLD);
        }
        if let Some(v) = parse_override(&lookup, ENV_MIN_CONFIDENCE) {
            self.gesture.min_confidence = v;
            applied.push(ENV_MIN_CONFIDENCE);
        }
        if let Some(v) = parse_override(&lookup, ENV_MIN_BLOB_AREA) {
            self.camera.min_blob_area = v;
            applied.push(ENV_MIN_BLOB_AREA);
        }
        if let Some(v) = parse_override(&lookup, ENV_MAX_BLOB_AREA) {
            self.camera.max_blob_area = v;
            applied.push(ENV_MAX_BLOB_AREA);
        }
        if let Some(v) = lookup(ENV_MODEL_PATH).filter(|v| !v.trim().is_empty()) {
            self.gesture.model_path = PathBuf::from(v);
            applied.push(ENV_MODEL_PATH);
        }
        applied
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let [width, height] = self.camera.resolution;
        if width == 0 || height == 0 {
            return Err(ConfigError::invalid("resolution", "width and height must be non-zero"));
        }
        if self.camera.ir_threshold > u16::from(u8::MAX) {
            return Err(ConfigError::invalid(
                "ir_threshold",
                format!("must lie in 0..=255, got {}", self.camera.ir_threshold),
            ));
        }
        if !(0.0..=1.0).contains(&self.gesture.min_confidence) {
            return Err(ConfigError::invalid("min_confidence", "must lie in [0, 1]"));
        }
        self.tracker_config().validate()?;
        self.segmenter_config().validate()?;

        if self.spells.is_empty() {
            return Err(ConfigError::invalid("spells", "at least one spell is required"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.spells.iter().find(|s| !seen.insert(s.key.as_str())) {
            return Err(ConfigError::invalid("spells", format!("duplicate key `{}`", dup.key)));
        }
        Ok(())
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.camera.resolution[0], self.camera.resolution[1])
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            brightness_threshold: u8::try_from(self.camera.ir_threshold).unwrap_or(u8::MAX),
            min_area: self.camera.min_blob_area,
            max_area: self.camera.max_blob_area,
            blur_sigma: self.camera.blur_sigma,
            min_fill_ratio: self.camera.min_fill_ratio,
        }
    }

    pub fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig {
            debounce_frames: self.gesture.debounce_frames,
            cooldown_frames: self.gesture.cooldown_frames,
            max_jump_px: self.gesture.max_jump_px,
            min_points: self.gesture.min_points,
            min_extent_px: self.gesture.min_extent_px,
        }
    }

    /// Classifier settings, with the spell order as tie-break priority.
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            min_confidence: self.gesture.min_confidence,
            priority: self.spell_keys(),
        }
    }

    pub fn spell_keys(&self) -> Vec<String> {
        self.spells.iter().map(|s| s.key.clone()).collect()
    }

    pub fn spell(&self, key: &str) -> Option<&SpellInfo> {
        crate::core_modules::spells::find(&self.spells, key)
    }
}

fn parse_override<T, F>(lookup: &F, key: &'static str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "ignoring unparsable environment override");
            None
        }
    }
}
