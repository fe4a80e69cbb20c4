// gamesound - named sound streams for game sound effects and music
// Module declarations
pub mod audio;
pub mod error;
pub mod library;
pub mod settings;

pub use audio::{AudioPlayer, OutputFormat, PlaybackEvent};
pub use error::{AudioError, Result};
pub use library::{SoundData, SoundId, SoundLibrary};
pub use settings::PlayerSettings;
