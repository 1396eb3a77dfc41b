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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, span, warn, Level};

use super::{resample::convert_rate, DeviceError, SampleBuffer};
use crate::config;

/// Global atomic counter for naming session threads.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// How long to wait on the output thread before giving up on a session.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// A small wrapper around a cpal::Device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Playback state shared between a session and its output callback.
struct Playback {
    /// The buffer converted to the device rate, normalized.
    samples: Vec<f32>,
    /// Device sample rate.
    sample_rate: u32,
    /// Next frame to emit. Holds at `samples.len()` at end of track.
    position: AtomicUsize,
    /// False until the first play command.
    playing: AtomicBool,
    /// Set by the stream error callback.
    failed: AtomicBool,
}

impl Playback {
    /// Fills the output with the next frames, copying mono to every channel.
    fn fill<T: cpal::Sample + cpal::FromSample<f32>>(&self, data: &mut [T], channels: usize) {
        if !self.playing.load(Ordering::Acquire) {
            data.fill(T::EQUILIBRIUM);
            return;
        }

        let start = self.position.load(Ordering::Acquire);
        let mut position = start;
        for frame in data.chunks_mut(channels) {
            let value = match self.samples.get(position) {
                Some(sample) => {
                    position += 1;
                    T::from_sample(*sample)
                }
                None => T::EQUILIBRIUM,
            };
            frame.fill(value);
        }
        // A restart during the fill wins over the advance.
        let _ = self.position.compare_exchange(
            start,
            position,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Commands sent to a session's output thread.
enum Command {
    Close,
}

/// One cpal output stream. The stream lives on its own thread because cpal
/// streams aren't Send on every host.
pub struct Session {
    id: u64,
    playback: Arc<Playback>,
    commands: Sender<Command>,
    closed: Receiver<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn super::Device>>, DeviceError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn super::Device> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, DeviceError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout().map_err(|e| DeviceError::Open(e.to_string()))?;
        let _shh_stderr = shh::stderr().map_err(|e| DeviceError::Open(e.to_string()))?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host = match cpal::host_from_id(host_id) {
                Ok(host) => host,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to open host"
                    );
                    continue;
                }
            };
            let host_devices = match host.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let max_channels = match device.supported_output_configs() {
                    Ok(configs) => configs.map(|config| config.channels()).max().unwrap_or(0),
                    Err(_) => continue,
                };

                if max_channels > 0 {
                    let name = match device.name() {
                        Ok(name) => name,
                        Err(_) => continue,
                    };
                    devices.push(Device {
                        name,
                        max_channels,
                        host_id,
                        device,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device. "default" selects the default host's default
    /// output.
    pub fn get(config: &config::Audio) -> Result<Device, DeviceError> {
        let name = config.device();
        if name == config::DEFAULT_DEVICE {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| DeviceError::NotFound(name.to_string()))?;
            let max_channels = device
                .default_output_config()
                .map_err(|e| DeviceError::Open(e.to_string()))?
                .channels();
            return Ok(Device {
                name: device.name().unwrap_or_else(|_| name.to_string()),
                max_channels,
                host_id: host.id(),
                device,
            });
        }

        Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
            .ok_or_else(|| DeviceError::NotFound(name.to_string()))
    }
}

impl super::Device for Device {
    fn open(&self, buffer: SampleBuffer) -> Result<Box<dyn super::Session>, DeviceError> {
        let span = span!(Level::INFO, "open session (cpal)");
        let _enter = span.enter();

        let id = SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let (ready_tx, ready_rx) = bounded::<Result<Arc<Playback>, DeviceError>>(1);
        let (command_tx, command_rx) = bounded::<Command>(1);
        let (closed_tx, closed_rx) = bounded::<()>(1);

        let device = self.device.clone();
        let thread = thread::Builder::new()
            .name(format!("looptone-session-{}", id))
            .spawn(move || run_output_thread(device, buffer, ready_tx, command_rx, closed_tx))
            .map_err(|e| DeviceError::Open(e.to_string()))?;

        let playback = match ready_rx.recv_timeout(COMMAND_TIMEOUT) {
            Ok(Ok(playback)) => playback,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(RecvTimeoutError::Timeout) => return Err(DeviceError::Timeout(COMMAND_TIMEOUT)),
            Err(RecvTimeoutError::Disconnected) => return Err(DeviceError::Disconnected),
        };

        info!(
            device = self.name,
            session = id,
            sample_rate = playback.sample_rate,
            frames = playback.samples.len(),
            "Opened session."
        );

        Ok(Box::new(Session {
            id,
            playback,
            commands: command_tx,
            closed: closed_rx,
            thread: Some(thread),
        }))
    }
}

/// Builds the stream, reports readiness and keeps the stream alive until the
/// session is closed.
fn run_output_thread(
    device: cpal::Device,
    buffer: SampleBuffer,
    ready_tx: Sender<Result<Arc<Playback>, DeviceError>>,
    command_rx: Receiver<Command>,
    closed_tx: Sender<()>,
) {
    let (stream, playback) = match build_stream(&device, &buffer) {
        Ok(built) => built,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(DeviceError::Play(e.to_string())));
        return;
    }
    if ready_tx.send(Ok(playback)).is_err() {
        // The opener gave up waiting.
        return;
    }

    // Wait for a close or for the session to be dropped.
    match command_rx.recv() {
        Ok(Command::Close) | Err(_) => {}
    }

    drop(stream);
    let _ = closed_tx.send(());
}

fn build_stream(
    device: &cpal::Device,
    buffer: &SampleBuffer,
) -> Result<(cpal::Stream, Arc<Playback>), DeviceError> {
    let supported = device
        .default_output_config()
        .map_err(|e| DeviceError::Open(e.to_string()))?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.config();
    let channels = config.channels as usize;

    let converted = convert_rate(buffer, config.sample_rate.0)
        .map_err(|e| DeviceError::Rejected(e.to_string()))?;
    let playback = Arc::new(Playback {
        samples: converted.to_f32(),
        sample_rate: config.sample_rate.0,
        position: AtomicUsize::new(0),
        playing: AtomicBool::new(false),
        failed: AtomicBool::new(false),
    });

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_typed::<f32>(device, &config, channels, &playback),
        cpal::SampleFormat::I16 => build_typed::<i16>(device, &config, channels, &playback),
        cpal::SampleFormat::U16 => build_typed::<u16>(device, &config, channels, &playback),
        other => Err(DeviceError::UnsupportedFormat(format!("{:?}", other))),
    }?;

    Ok((stream, playback))
}

fn build_typed<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    playback: &Arc<Playback>,
) -> Result<cpal::Stream, DeviceError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let for_callback = playback.clone();
    let for_errors = playback.clone();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for_callback.fill(data, channels);
            },
            move |err| {
                error!("CPAL output stream error: {}", err);
                for_errors.failed.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|e| DeviceError::Rejected(e.to_string()))
}

impl super::Session for Session {
    fn play_from_start(&mut self) -> Result<(), DeviceError> {
        if self.playback.failed.load(Ordering::Acquire) {
            return Err(DeviceError::Disconnected);
        }
        self.playback.position.store(0, Ordering::Release);
        self.playback.playing.store(true, Ordering::Release);
        debug!(session = self.id, "Play from start.");
        Ok(())
    }

    fn position(&self) -> Result<Duration, DeviceError> {
        if self.playback.failed.load(Ordering::Acquire) {
            return Err(DeviceError::Position("output stream failed".into()));
        }
        let frames = self.playback.position.load(Ordering::Acquire);
        Ok(Duration::from_secs_f64(
            frames as f64 / self.playback.sample_rate as f64,
        ))
    }

    fn close(mut self: Box<Self>) -> Result<(), DeviceError> {
        if self.commands.send(Command::Close).is_err() {
            return Err(DeviceError::Disconnected);
        }
        match self.closed.recv_timeout(COMMAND_TIMEOUT) {
            Ok(()) => {
                if let Some(thread) = self.thread.take() {
                    let _ = thread.join();
                }
                debug!(session = self.id, "Closed session.");
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(session = self.id, "Output thread did not stop in time");
                Err(DeviceError::Timeout(COMMAND_TIMEOUT))
            }
            Err(RecvTimeoutError::Disconnected) => Err(DeviceError::Disconnected),
        }
    }
}
