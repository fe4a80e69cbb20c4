//! gamesound CLI: play sounds from a settings file

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use gamesound::library::SoundScanner;
use gamesound::{AudioPlayer, PlaybackEvent, PlayerSettings, SoundId};

#[derive(Parser)]
#[command(name = "gamesound", about = "Play named game sounds", version)]
struct Cli {
    /// Settings file listing the sounds
    #[arg(short, long, default_value = "sounds.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the sounds registered in the settings file
    List,
    /// Play a sound and wait for it to finish
    Play {
        id: String,
        /// Repeat the sound until the time limit
        #[arg(long = "loop")]
        looping: bool,
        /// Stop everything else first
        #[arg(long)]
        exclusive: bool,
        /// Stop after this many seconds
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
    /// Show the sounds found in an asset directory
    Scan { dir: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::List => {
            let settings = PlayerSettings::load(&cli.settings)
                .with_context(|| format!("Failed to load {}", cli.settings.display()))?;
            for (id, path) in &settings.sounds {
                println!("{:<24} {}", id.as_str(), settings.resolve_path(path).display());
            }
        }
        Command::Play { id, looping, exclusive, seconds } => {
            let settings = PlayerSettings::load(&cli.settings)
                .with_context(|| format!("Failed to load {}", cli.settings.display()))?;
            let mut player = AudioPlayer::new(&settings).context("Failed to open audio output")?;
            let id = SoundId::from(id);

            let started = if exclusive {
                player.play_track_exclusive(&id, looping)
            } else {
                player.play_track(&id, looping)
            };
            started.with_context(|| format!("Failed to play {}", id))?;

            let deadline = Instant::now() + Duration::from_secs(seconds);
            while Instant::now() < deadline {
                let finished = player.process_events().iter().any(|event| {
                    matches!(event, PlaybackEvent::Completed { sound, .. } if *sound == id)
                });
                if finished || player.stream_count() == 0 {
                    break;
                }
                thread::sleep(Duration::from_millis(50));
            }

            player.stop_all();
            info!("Done playing {}", id);
        }
        Command::Scan { dir } => {
            for (id, path) in SoundScanner::scan(&dir) {
                println!("{:<24} {}", id.as_str(), path.display());
            }
        }
    }

    Ok(())
}
