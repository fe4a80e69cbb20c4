// Settings module
// Player configuration loaded from a JSON file

#[allow(clippy::module_inception)]
mod settings;

pub use settings::{PlayerSettings, DEFAULT_VOLUME_MULTIPLIER};
