// An example runner for the `wand_vision` library.
//
// Without a camera attached it plays back synthetic frames: a clockwise circle
// (Alohomora), an upward flick (Lumos) and a short jitter that is too small to
// count as a gesture. Set RUST_LOG=debug to see the tracking and scores.
//
// Usage: wand_vision [config.yaml] [overlay.png]

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wand_vision::core_modules::overlay::render_overlay;
use wand_vision::core_modules::synthetic::{SceneSpec, circle_path, line_path};
use wand_vision::core_modules::templates::{TemplateShape, standard_model};
use wand_vision::core_modules::utils::image_helper::save_png;
use wand_vision::display::LogDisplay;
use wand_vision::{ModelError, RecognitionSession, SpellModel, SpellcasterConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let overlay_path = args.next().map(PathBuf::from);

    info!("Wand Vision - Example Runner");
    let config = load_config(config_path.as_deref())?;
    let model = load_or_train_model(&config.gesture.model_path)?;

    let mut session = RecognitionSession::new(config, model)
        .context("failed to start recognition session")?
        .with_display(Box::new(LogDisplay));

    let scene = SceneSpec::default();
    let flick: Vec<(f64, f64)> = TemplateShape::FlickUp
        .path(25)
        .into_iter()
        .map(|(x, y)| (300.0 + 250.0 * x, 370.0 + 250.0 * y))
        .collect();
    let gestures = [
        circle_path((320.0, 240.0), 100.0, 40, true),
        flick,
        line_path((100.0, 100.0), (104.0, 102.0), 4),
    ];

    let mut clock = 0u64;
    for gesture in &gestures {
        let tips = gesture.iter().copied().map(Some).chain(std::iter::repeat_n(None, 20));
        for tip in tips {
            let frame = match tip {
                Some(center) => scene.with_tip(center, clock),
                None => scene.blank(clock),
            };
            clock += scene.frame_interval_ms;

            if let Some(path) = &overlay_path {
                let trail = session.current_trace();
                if trail.len() > 1 {
                    save_png(path, &render_overlay(&frame, trail, trail.last()))
                        .with_context(|| format!("failed to write overlay to {}", path.display()))?;
                }
            }

            if let Err(fault) = session.process_frame(&frame) {
                warn!(%fault, "frame skipped");
            }
        }
    }

    let stats = session.stats();
    info!(
        frames = stats.frames,
        recognized = stats.recognized,
        unrecognized = stats.unrecognized,
        discarded = stats.discarded,
        "demo finished"
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SpellcasterConfig> {
    match path {
        Some(path) => SpellcasterConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => {
            let mut config = SpellcasterConfig::defaults();
            config.apply_env_overrides();
            config.validate().context("invalid configuration")?;
            Ok(config)
        }
    }
}

/// Loads the trained model, training and saving the standard one if the file
/// does not exist yet. Any other load failure is fatal.
fn load_or_train_model(path: &Path) -> Result<SpellModel> {
    match SpellModel::load(path) {
        Ok(model) => Ok(model),
        Err(ModelError::Unavailable { .. }) => {
            warn!(path = %path.display(), "no trained model found, training the standard spell set");
            let model = standard_model().context("failed to train standard model")?;
            model.save(path).context("failed to save trained model")?;
            Ok(model)
        }
        Err(err) => Err(err).with_context(|| format!("failed to load model from {}", path.display())),
    }
}
