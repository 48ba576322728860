//! Output device backend using cpal.
//!
//! The cpal stream is not `Send`, so it lives on a dedicated thread for its
//! whole life. The backend handle talks to it over channels: scheduled
//! buffers go straight to the device callback's mixer, resume and shutdown
//! requests go to the owning thread.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};

use crate::backend::{AudioBackend, BackendError, BackendResult, ContextState};

const STATE_RUNNING: u8 = 0;
const STATE_SUSPENDED: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// State shared between the handle, the owning thread and the callback.
struct Shared {
    frames: AtomicU64,
    state: AtomicU8,
}

impl Shared {
    fn set_state(&self, state: ContextState) {
        let raw = match state {
            ContextState::Running => STATE_RUNNING,
            ContextState::Suspended => STATE_SUSPENDED,
            ContextState::Closed => STATE_CLOSED,
        };
        self.state.store(raw, Ordering::Release);
    }

    fn state(&self) -> ContextState {
        match self.state.load(Ordering::Acquire) {
            STATE_RUNNING => ContextState::Running,
            STATE_SUSPENDED => ContextState::Suspended,
            _ => ContextState::Closed,
        }
    }
}

enum Control {
    Resume,
    Shutdown,
}

struct ScheduledBuffer {
    samples: Vec<f32>,
    start_frame: u64,
    gain: f32,
    pos: usize,
}

/// Sums every scheduled buffer into the device's interleaved output.
struct Mixer {
    incoming: Receiver<ScheduledBuffer>,
    active: Vec<ScheduledBuffer>,
}

impl Mixer {
    fn fill<T: SizedSample + FromSample<f32>>(&mut self, data: &mut [T], channels: usize, shared: &Shared) {
        while let Ok(buf) = self.incoming.try_recv() {
            self.active.push(buf);
        }

        let start = shared.frames.load(Ordering::Acquire);
        let mut frames = 0u64;
        for frame in data.chunks_mut(channels) {
            let now = start + frames;
            let mut mix = 0.0f32;
            for buf in self.active.iter_mut() {
                if now >= buf.start_frame {
                    if let Some(s) = buf.samples.get(buf.pos) {
                        mix += s * buf.gain;
                        buf.pos += 1;
                    }
                }
            }
            let value = T::from_sample(mix.clamp(-1.0, 1.0));
            for out in frame.iter_mut() {
                *out = value;
            }
            frames += 1;
        }

        self.active.retain(|b| b.pos < b.samples.len());
        shared.frames.fetch_add(frames, Ordering::AcqRel);
    }
}

/// Backend that plays rendered voices on an output device.
pub struct CpalBackend {
    shared: Arc<Shared>,
    sample_rate: u32,
    voices: Sender<ScheduledBuffer>,
    control: Sender<Control>,
    thread: Option<JoinHandle<()>>,
}

impl CpalBackend {
    /// Open `device_name` (or the host default) and start it running.
    /// `sample_rate` is honored when the device supports it.
    pub fn open(device_name: Option<&str>, sample_rate: Option<u32>) -> BackendResult<Self> {
        let shared = Arc::new(Shared {
            frames: AtomicU64::new(0),
            state: AtomicU8::new(STATE_SUSPENDED),
        });
        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let device_name = device_name.map(str::to_string);
        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("beatgrid-output".to_string())
            .spawn(move || {
                output_thread(device_name, sample_rate, thread_shared, voice_rx, control_rx, ready_tx)
            })?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(BackendError("output thread exited during startup".to_string()));
            }
        };

        log::info!(target: "audio", "output running at {} Hz", sample_rate);
        Ok(Self {
            shared,
            sample_rate,
            voices: voice_tx,
            control: control_tx,
            thread: Some(thread),
        })
    }

    /// Names of the host's output devices.
    pub fn available_devices() -> Vec<String> {
        cpal::default_host()
            .output_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }
}

impl AudioBackend for CpalBackend {
    fn state(&self) -> ContextState {
        self.shared.state()
    }

    fn resume(&self) -> BackendResult {
        if self.shared.state() == ContextState::Closed {
            return Err(BackendError("output closed".to_string()));
        }
        self.control
            .send(Control::Resume)
            .map_err(|_| BackendError("output thread disconnected".to_string()))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.shared.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn play_buffer(&self, samples: Vec<f32>, when: f64, gain: f32) -> BackendResult {
        let now = self.shared.frames.load(Ordering::Acquire);
        let requested = (when.max(0.0) * self.sample_rate as f64) as u64;
        self.voices
            .send(ScheduledBuffer {
                samples,
                start_frame: requested.max(now),
                gain,
                pos: 0,
            })
            .map_err(|_| BackendError("output stream gone".to_string()))
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn find_device(name: Option<&str>) -> BackendResult<Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        let found = host
            .output_devices()
            .map_err(|e| BackendError(format!("Failed to list output devices: {}", e)))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false));
        match found {
            Some(device) => return Ok(device),
            None => log::warn!(target: "audio", "output device '{}' not found, using default", name),
        }
    }
    host.default_output_device()
        .ok_or_else(|| BackendError("No output device available".to_string()))
}

fn build_stream(
    device: &Device,
    sample_rate: Option<u32>,
    shared: Arc<Shared>,
    incoming: Receiver<ScheduledBuffer>,
) -> BackendResult<(Stream, u32)> {
    let default = device
        .default_output_config()
        .map_err(|e| BackendError(format!("Failed to get output config: {}", e)))?;

    let supported = match sample_rate {
        Some(rate) if rate != default.sample_rate().0 => device
            .supported_output_configs()
            .ok()
            .and_then(|mut configs| {
                configs.find(|c| {
                    c.sample_format() == default.sample_format()
                        && c.min_sample_rate().0 <= rate
                        && rate <= c.max_sample_rate().0
                })
            })
            .map(|c| c.with_sample_rate(cpal::SampleRate(rate)))
            .unwrap_or_else(|| {
                log::warn!(target: "audio", "{} Hz unsupported, using device default", rate);
                default.clone()
            }),
        _ => default,
    };

    let format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let rate = config.sample_rate.0;
    let mixer = Mixer { incoming, active: Vec::new() };

    let stream = match format {
        SampleFormat::F32 => build_typed::<f32>(device, &config, mixer, shared),
        SampleFormat::I16 => build_typed::<i16>(device, &config, mixer, shared),
        SampleFormat::U16 => build_typed::<u16>(device, &config, mixer, shared),
        other => Err(BackendError(format!("Unsupported sample format {:?}", other))),
    }?;
    Ok((stream, rate))
}

fn build_typed<T: SizedSample + FromSample<f32>>(
    device: &Device,
    config: &StreamConfig,
    mut mixer: Mixer,
    shared: Arc<Shared>,
) -> BackendResult<Stream> {
    let channels = config.channels as usize;
    let error_shared = Arc::clone(&shared);
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                mixer.fill(data, channels, &shared);
            },
            move |err| {
                log::error!(target: "audio", "Audio output error: {}", err);
                if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                    error_shared.set_state(ContextState::Closed);
                }
            },
            None,
        )
        .map_err(|e| BackendError(format!("Failed to build output stream: {}", e)))
}

fn output_thread(
    device_name: Option<String>,
    sample_rate: Option<u32>,
    shared: Arc<Shared>,
    incoming: Receiver<ScheduledBuffer>,
    control: Receiver<Control>,
    ready: Sender<BackendResult<u32>>,
) {
    let opened = find_device(device_name.as_deref())
        .and_then(|device| build_stream(&device, sample_rate, Arc::clone(&shared), incoming));
    let stream = match opened {
        Ok((stream, rate)) => match stream.play() {
            Ok(()) => {
                shared.set_state(ContextState::Running);
                let _ = ready.send(Ok(rate));
                stream
            }
            Err(e) => {
                shared.set_state(ContextState::Closed);
                let _ = ready.send(Err(BackendError(format!("Failed to start output: {}", e))));
                return;
            }
        },
        Err(e) => {
            shared.set_state(ContextState::Closed);
            let _ = ready.send(Err(e));
            return;
        }
    };

    loop {
        match control.recv() {
            Ok(Control::Resume) => match stream.play() {
                Ok(()) => shared.set_state(ContextState::Running),
                Err(e) => log::warn!(target: "audio", "resume failed: {}", e),
            },
            Ok(Control::Shutdown) | Err(_) => break,
        }
    }

    shared.set_state(ContextState::Closed);
    log::debug!(target: "audio", "output thread exiting");
}
