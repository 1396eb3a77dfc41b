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

//! The audio system as seen by the host.
//!
//! The host creates one `AudioSystem` at startup, forwards its frame ticks and
//! its window-destroyed event, and the system takes care of the rest.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{info, span, Level};

use crate::{
    audio::{self, resample, Device, SampleBuffer},
    config::SystemConfig,
    error::AudioError,
    melody::{MelodyCompiler, Note, Sampler, Synth},
    monitor::LoopMonitor,
    registry::{HandleId, HandleInfo, PollReport, SoundRegistry},
    session::{self, SessionNamer},
    shutdown::{ShutdownCoordinator, ShutdownReport},
};

/// Events delivered by the host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// One frame of the host's update loop.
    FrameTick,
    /// The host window is gone. Playback must be torn down before returning.
    WindowDestroyed,
}

/// Owns the device, the sound registry, the loop monitor and the shutdown
/// coordinator for the lifetime of a host.
pub struct AudioSystem {
    device: Arc<dyn Device>,
    registry: Arc<SoundRegistry>,
    coordinator: ShutdownCoordinator,
    compiler: MelodyCompiler,
    synth: Synth,
    namer: SessionNamer,
    asset_directory: PathBuf,
    host_driven: bool,
}

impl AudioSystem {
    /// Opens the configured device and starts the loop monitor.
    pub fn initialize(config: &SystemConfig) -> Result<AudioSystem, AudioError> {
        let device = audio::get_device(config.audio())?;
        AudioSystem::with_device(config, device)
    }

    /// Builds the system around an already opened device.
    pub fn with_device(
        config: &SystemConfig,
        device: Arc<dyn Device>,
    ) -> Result<AudioSystem, AudioError> {
        let span = span!(Level::INFO, "initialize audio system");
        let _enter = span.enter();

        let compiler = config.melody().compiler()?;
        let synth = config.melody().synth(config.audio().sample_rate())?;
        let registry = Arc::new(SoundRegistry::new());

        let monitor = if config.monitor().enabled() {
            Some(LoopMonitor::spawn(
                registry.clone(),
                config.monitor().rate_hz(),
            )?)
        } else {
            None
        };
        let host_driven = monitor.is_none();

        info!(
            device = %device,
            sample_rate = synth.sample_rate(),
            waveform = %synth.waveform(),
            host_driven,
            "Audio system initialized."
        );

        Ok(AudioSystem {
            device,
            coordinator: ShutdownCoordinator::new(registry.clone(), monitor),
            registry,
            compiler,
            synth,
            namer: SessionNamer::process().clone(),
            asset_directory: config.assets().directory(),
            host_driven,
        })
    }

    /// Uses a different namer for persisted assets.
    pub fn with_namer(mut self, namer: SessionNamer) -> AudioSystem {
        self.namer = namer;
        self
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    pub fn registry(&self) -> &Arc<SoundRegistry> {
        &self.registry
    }

    pub fn synth(&self) -> &Synth {
        &self.synth
    }

    pub fn asset_directory(&self) -> &Path {
        &self.asset_directory
    }

    /// Compiles a score with the configured tempo and default duration.
    pub fn compile(&self, score: &str) -> Result<Vec<Note>, AudioError> {
        Ok(self.compiler.compile(score)?)
    }

    /// Compiles and renders a score into one buffer.
    pub fn render_score(&self, score: &str) -> Result<SampleBuffer, AudioError> {
        Ok(self.synth.render(&self.compile(score)?)?)
    }

    /// Loads a WAV to play scores on. The recording is taken to sound at the
    /// base note.
    pub fn sampler_from_wav(&self, path: &Path, base_note: &str) -> Result<Sampler, AudioError> {
        let sample = session::load_wav(path)?;
        info!(
            path = %path.display(),
            base_note,
            duration = ?sample.duration(),
            "Loaded sample."
        );
        Ok(Sampler::new(sample, base_note)?)
    }

    /// Compiles a score and renders it on the sampler.
    pub fn render_sampled(
        &self,
        score: &str,
        sampler: &Sampler,
    ) -> Result<SampleBuffer, AudioError> {
        Ok(sampler.render(&self.compile(score)?)?)
    }

    /// Compiles a score, renders it on the sampler and plays it.
    pub fn play_sampled(
        &self,
        score: &str,
        sampler: &Sampler,
        loop_requested: bool,
        label: &str,
    ) -> Result<HandleId, AudioError> {
        self.play(self.render_sampled(score, sampler)?, loop_requested, label)
    }

    /// Shifts a buffer's pitch by the given number of semitones.
    pub fn pitch_shift(
        &self,
        buffer: &SampleBuffer,
        semitones: f64,
    ) -> Result<SampleBuffer, AudioError> {
        Ok(resample::pitch_shift(buffer, semitones)?)
    }

    /// Starts playing the buffer.
    pub fn play(
        &self,
        buffer: SampleBuffer,
        loop_requested: bool,
        label: &str,
    ) -> Result<HandleId, AudioError> {
        self.registry
            .start(self.device.as_ref(), buffer, loop_requested, label)
    }

    /// Compiles, renders and plays a score.
    pub fn play_score(
        &self,
        score: &str,
        loop_requested: bool,
        label: &str,
    ) -> Result<HandleId, AudioError> {
        self.play(self.render_score(score)?, loop_requested, label)
    }

    /// Stops a sound. Returns false if it had already finished.
    pub fn stop(&self, id: HandleId) -> Result<bool, AudioError> {
        Ok(self.registry.stop(id)?)
    }

    /// Lists the sounds currently playing.
    pub fn active(&self) -> Vec<HandleInfo> {
        self.registry.snapshot()
    }

    /// Writes the buffer to the asset directory under this run's name.
    pub fn persist(&self, buffer: &SampleBuffer, base: &str) -> Result<PathBuf, AudioError> {
        Ok(self.namer.persist(buffer, &self.asset_directory, base)?)
    }

    /// Polls the registry when the host drives the cadence. Does nothing when
    /// the monitor thread is running or after shutdown.
    pub fn on_frame_tick(&self) -> Option<PollReport> {
        if !self.host_driven || self.registry.is_drained() {
            return None;
        }
        Some(self.registry.poll())
    }

    /// Dispatches a host event. Returns the shutdown report when the window
    /// is destroyed.
    pub fn handle_host_event(&self, event: HostEvent) -> Option<ShutdownReport> {
        match event {
            HostEvent::FrameTick => {
                self.on_frame_tick();
                None
            }
            HostEvent::WindowDestroyed => Some(self.shutdown()),
        }
    }

    /// Closes every session and stops the monitor. Blocks until done.
    pub fn shutdown(&self) -> ShutdownReport {
        self.coordinator.on_host_shutdown_signal()
    }

    pub fn is_shut_down(&self) -> bool {
        self.coordinator.is_shut_down()
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            self.shutdown();
        }
    }
}
