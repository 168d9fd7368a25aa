// THEORY:
// The core modules are the recognition stack, lowest layer first:
// frames and regions (pixels), the tracker and segmenter (time), the
// normalizer and classifier (shape), and the model artifacts they share.
// `pipeline` and `parallel_pipeline` compose them; nothing in here knows about
// configuration files or display adapters.

pub mod bright_region;
pub mod classifier;
pub mod frame;
pub mod model;
pub mod normalizer;
pub mod overlay;
pub mod region_finder;
pub mod segmenter;
pub mod spells;
pub mod spot_tracker;
pub mod synthetic;
pub mod templates;
pub mod trace;
pub mod utils;
