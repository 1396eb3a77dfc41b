// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use looptone::audio;
use looptone::config::{Assets, Audio, Melody, Monitor, SystemConfig};
use looptone::melody::{self, sampler::DEFAULT_BASE_NOTE, MelodyCompiler, DEFAULT_NOTE_SECONDS};
use looptone::registry::HandleId;
use looptone::session::SessionNamer;
use looptone::util::{asset_base_name, duration_minutes_seconds};
use looptone::{AudioSystem, HostEvent};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Melody synthesis and software-looped playback."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Compiles a score file into a WAV asset named for this run.
    Compile {
        /// The path to the score.
        score_path: String,
        /// The tempo for beat-fraction durations.
        #[arg[short, long]]
        bpm: Option<f64>,
        /// The directory to write the asset to.
        #[arg[short, long]]
        out_dir: Option<String>,
        /// The base name of the asset. Defaults to the score's file name.
        #[arg[short, long]]
        name: Option<String>,
    },
    /// Plays a score through the audio interface.
    Play {
        /// The path to the score.
        score_path: String,
        /// The device name to play through.
        #[arg[short, long, default_value = "default"]]
        device_name: String,
        /// Loops the score until interrupted or the duration elapses.
        #[arg[short, long]]
        r#loop: bool,
        /// How long to play, e.g. 30s.
        #[arg[short = 't', long]]
        duration: Option<String>,
        /// Shifts the pitch by the given number of semitones.
        #[arg[short, long, allow_hyphen_values = true]]
        pitch: Option<f64>,
        /// Plays the score on this WAV recording instead of the synth.
        #[arg[short, long]]
        sample: Option<String>,
        /// The note the sample was recorded at.
        #[arg[short, long, default_value = DEFAULT_BASE_NOTE]]
        base_note: String,
    },
    /// Start will play a score in a loop with the given config until interrupted.
    Start {
        /// The path to the looptone config.
        config_path: String,
        /// The path to the score.
        score_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Compile {
            score_path,
            bpm,
            out_dir,
            name,
        } => {
            let score_path = PathBuf::from(score_path);
            let score = fs::read_to_string(&score_path)?;
            let compiler =
                MelodyCompiler::new(bpm.unwrap_or(melody::DEFAULT_BPM), DEFAULT_NOTE_SECONDS);
            let notes = compiler.compile(&score)?;

            let melody_config = Melody::default();
            let buffer = melody_config
                .synth(Audio::default().sample_rate())?
                .render(&notes)?;

            let directory = out_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| Assets::default().directory());
            let base = name.unwrap_or_else(|| asset_base_name(&score_path).to_string());
            let path = SessionNamer::process().persist(&buffer, &directory, &base)?;

            println!(
                "Compiled {} notes ({}) to {}",
                notes.len(),
                duration_minutes_seconds(buffer.duration()),
                path.display()
            );
        }
        Commands::Play {
            score_path,
            device_name,
            r#loop,
            duration,
            pitch,
            sample,
            base_note,
        } => {
            let duration = match duration {
                Some(duration) => Some(Duration::from(DurationString::from_string(duration)?)),
                None => None,
            };
            let config = SystemConfig::new(
                Audio::new(&device_name),
                Melody::default(),
                Monitor::default(),
                Assets::default(),
            );
            let system = AudioSystem::initialize(&config)?;

            let score = fs::read_to_string(&score_path)?;
            let mut buffer = match sample {
                Some(sample) => {
                    let sampler = system.sampler_from_wav(Path::new(&sample), &base_note)?;
                    system.render_sampled(&score, &sampler)?
                }
                None => system.render_score(&score)?,
            };
            if let Some(semitones) = pitch {
                buffer = system.pitch_shift(&buffer, semitones)?;
            }
            let label = asset_base_name(Path::new(&score_path)).to_string();
            let id = system.play(buffer, r#loop, &label)?;

            wait_for_exit(&system, id, duration).await;
            let report = system.handle_host_event(HostEvent::WindowDestroyed);
            info!(?report, "Playback ended.");
        }
        Commands::Start {
            config_path,
            score_path,
        } => {
            let config = SystemConfig::deserialize(Path::new(&config_path))?;
            let system = AudioSystem::initialize(&config)?;
            let label = asset_base_name(Path::new(&score_path)).to_string();
            let id = system.play_score(&fs::read_to_string(&score_path)?, true, &label)?;

            wait_for_exit(&system, id, None).await;
            let report = system.handle_host_event(HostEvent::WindowDestroyed);
            info!(?report, "Shut down.");
        }
    }

    Ok(())
}

/// Waits for Ctrl-C, for the duration to elapse or for the sound to finish,
/// whichever comes first. Stands in for the host window's lifetime.
async fn wait_for_exit(system: &AudioSystem, id: HandleId, duration: Option<Duration>) {
    let finished = async {
        let mut interval = tokio::time::interval(Duration::from_millis(50));
        loop {
            interval.tick().await;
            system.handle_host_event(HostEvent::FrameTick);
            if !system.registry().is_active(id) {
                return;
            }
        }
    };
    let elapsed = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted."),
        _ = elapsed => info!("Duration elapsed."),
        _ = finished => info!("Playback finished."),
    }
}
