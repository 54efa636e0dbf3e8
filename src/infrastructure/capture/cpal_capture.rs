//! Microphone capture using cpal
//!
//! `cpal::Stream` is not `Send`, so each acquired device lives on its own
//! thread. The returned [`CaptureStream`] handle drives that thread over a
//! control channel. Captured samples are converted to signed 16-bit PCM,
//! optionally downmixed to mono, and emitted as little-endian `audio/L16`
//! fragments once per timeslice. Stream errors reported by the backend end
//! the capture with [`CaptureEvent::Failed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::application::ports::{
    AcquisitionError, CaptureConstraints, CaptureDevice, CaptureEvent, CaptureEventSender,
    CaptureStream,
};
use crate::domain::recording::AudioMimeType;

type StartAck = oneshot::Sender<Result<(), AcquisitionError>>;

enum Control {
    Start(CaptureEventSender, StartAck),
    Pause,
    Resume,
    Stop,
    Release,
}

/// Negotiated stream parameters reported back by the capture thread
#[derive(Debug, Clone, Copy)]
struct StreamFormat {
    sample_rate: u32,
    channels: u16,
}

/// Capture device backed by the default cpal input
#[derive(Debug, Default)]
pub struct CpalCaptureDevice;

impl CpalCaptureDevice {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CaptureDevice for CpalCaptureDevice {
    async fn request_access(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, AcquisitionError> {
        let (control_tx, control_rx) = std_mpsc::channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let constraints = constraints.clone();

        std::thread::Builder::new()
            .name("recordify-capture".into())
            .spawn(move || run_capture_thread(constraints, control_rx, ready_tx))
            .map_err(|e| AcquisitionError::Unavailable(e.to_string()))?;

        let format = ready_rx.await.map_err(|_| {
            AcquisitionError::Unavailable("capture thread exited before opening the device".into())
        })??;

        info!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            "microphone opened"
        );

        Ok(Box::new(CpalCaptureStream {
            control: control_tx,
            mime_type: AudioMimeType::L16 {
                rate: format.sample_rate,
                channels: format.channels,
            },
            released: false,
        }))
    }
}

/// Handle to a device held by a capture thread
struct CpalCaptureStream {
    control: std_mpsc::Sender<Control>,
    mime_type: AudioMimeType,
    released: bool,
}

impl CpalCaptureStream {
    fn send(&self, message: Control) -> bool {
        self.control.send(message).is_ok()
    }
}

#[async_trait]
impl CaptureStream for CpalCaptureStream {
    fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    async fn start(&mut self, events: CaptureEventSender) -> Result<(), AcquisitionError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.released || !self.send(Control::Start(events, ack_tx)) {
            return Err(AcquisitionError::Unavailable(
                "capture thread is no longer running".into(),
            ));
        }
        ack_rx.await.map_err(|_| {
            AcquisitionError::Unavailable("capture thread exited before capture started".into())
        })?
    }

    fn pause(&mut self) {
        self.send(Control::Pause);
    }

    fn resume(&mut self) {
        self.send(Control::Resume);
    }

    fn stop(&mut self) {
        self.send(Control::Stop);
    }

    fn stop_tracks(&mut self) {
        if !self.released {
            self.released = true;
            self.send(Control::Release);
        }
    }
}

impl Drop for CpalCaptureStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

/// Writes converted samples into the shared buffer while capturing
struct SampleSink {
    buffer: Arc<StdMutex<Vec<i16>>>,
    capturing: Arc<AtomicBool>,
    channels: u16,
    mono: bool,
}

impl SampleSink {
    fn push(&self, samples: &[i16]) {
        if !self.capturing.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(mut buffer) = self.buffer.lock() {
            if self.mono {
                buffer.extend(downmix(samples, self.channels));
            } else {
                buffer.extend_from_slice(samples);
            }
        }
    }
}

fn run_capture_thread(
    constraints: CaptureConstraints,
    control: std_mpsc::Receiver<Control>,
    ready: oneshot::Sender<Result<StreamFormat, AcquisitionError>>,
) {
    let buffer = Arc::new(StdMutex::new(Vec::new()));
    let capturing = Arc::new(AtomicBool::new(false));
    let (fault_tx, faults) = std_mpsc::channel();

    let opened = open_stream(&constraints, &buffer, &capturing, fault_tx);
    let (stream, format) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(format)).is_err() {
        debug!("acquisition abandoned; closing microphone");
        return;
    }

    let mut events: Option<CaptureEventSender> = None;
    let flush = |events: &Option<CaptureEventSender>| {
        let Some(events) = events else { return };
        let samples = match buffer.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(_) => return,
        };
        if !samples.is_empty() {
            let _ = events.send(CaptureEvent::DataAvailable(encode_le(&samples)));
        }
    };

    let fail = |events: &mut Option<CaptureEventSender>, reason: String| {
        capturing.store(false, Ordering::SeqCst);
        flush(events);
        if let Some(events) = events.take() {
            let _ = events.send(CaptureEvent::Failed(AcquisitionError::Interrupted(reason)));
        }
    };

    loop {
        if let Ok(reason) = faults.try_recv() {
            fail(&mut events, reason);
            break;
        }
        match control.recv_timeout(constraints.timeslice) {
            Ok(Control::Start(sender, ack)) => {
                if let Err(e) = stream.play() {
                    warn!(error = %e, "failed to start input stream");
                    let _ = ack.send(Err(classify_play_error(e)));
                    break;
                }
                capturing.store(true, Ordering::SeqCst);
                events = Some(sender);
                let _ = ack.send(Ok(()));
            }
            Ok(Control::Pause) => {
                capturing.store(false, Ordering::SeqCst);
                flush(&events);
                if let Err(e) = stream.pause() {
                    debug!(error = %e, "input stream does not support pausing");
                }
            }
            Ok(Control::Resume) => {
                if let Err(e) = stream.play() {
                    warn!(error = %e, "failed to resume input stream");
                    fail(&mut events, e.to_string());
                    break;
                }
                capturing.store(true, Ordering::SeqCst);
            }
            Ok(Control::Stop) => {
                capturing.store(false, Ordering::SeqCst);
                flush(&events);
                if let Some(events) = events.take() {
                    let _ = events.send(CaptureEvent::Finalized);
                }
                break;
            }
            Ok(Control::Release) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if capturing.load(Ordering::SeqCst) {
                    flush(&events);
                }
            }
        }
    }

    capturing.store(false, Ordering::SeqCst);
    drop(stream);
    debug!("microphone released");
}

fn open_stream(
    constraints: &CaptureConstraints,
    buffer: &Arc<StdMutex<Vec<i16>>>,
    capturing: &Arc<AtomicBool>,
    faults: std_mpsc::Sender<String>,
) -> Result<(cpal::Stream, StreamFormat), AcquisitionError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AcquisitionError::DeviceNotFound)?;
    let (config, sample_format) = select_input_config(&device, constraints)?;

    let mono = constraints.channels == Some(1) && config.channels > 1;
    let format = StreamFormat {
        sample_rate: config.sample_rate.0,
        channels: if mono { 1 } else { config.channels },
    };
    let sink = SampleSink {
        buffer: Arc::clone(buffer),
        capturing: Arc::clone(capturing),
        channels: config.channels,
        mono,
    };
    let on_error = move |err: cpal::StreamError| {
        warn!(error = %err, "audio stream error");
        let _ = faults.send(err.to_string());
    };

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| sink.push(data),
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let converted: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                sink.push(&converted);
            },
            on_error,
            None,
        ),
        other => {
            return Err(AcquisitionError::Unavailable(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(classify_build_error)?;

    Ok((stream, format))
}

fn select_input_config(
    device: &cpal::Device,
    constraints: &CaptureConstraints,
) -> Result<(StreamConfig, SampleFormat), AcquisitionError> {
    let default = device.default_input_config().map_err(|e| match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => AcquisitionError::DeviceNotFound,
        other => classify_message(other.to_string()),
    })?;
    let sample_format = default.sample_format();
    let mut config = default.config();

    if let Some(rate) = constraints.sample_rate {
        let supported = device
            .supported_input_configs()
            .map_err(|e| match e {
                cpal::SupportedStreamConfigsError::DeviceNotAvailable => {
                    AcquisitionError::DeviceNotFound
                }
                other => classify_message(other.to_string()),
            })?
            .any(|range| {
                range.channels() == config.channels
                    && range.sample_format() == sample_format
                    && range.min_sample_rate().0 <= rate
                    && rate <= range.max_sample_rate().0
            });
        if supported {
            config.sample_rate = SampleRate(rate);
        } else {
            debug!(rate, "requested sample rate unsupported, using device default");
        }
    }

    Ok((config, sample_format))
}

fn classify_build_error(err: cpal::BuildStreamError) -> AcquisitionError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => AcquisitionError::DeviceNotFound,
        other => classify_message(other.to_string()),
    }
}

fn classify_play_error(err: cpal::PlayStreamError) -> AcquisitionError {
    match err {
        cpal::PlayStreamError::DeviceNotAvailable => AcquisitionError::DeviceNotFound,
        other => classify_message(other.to_string()),
    }
}

/// Map backend error text onto an acquisition category
fn classify_message(message: String) -> AcquisitionError {
    let lower = message.to_lowercase();
    if ["permission", "denied", "not allowed"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        AcquisitionError::PermissionDenied(message)
    } else {
        AcquisitionError::Unavailable(message)
    }
}

/// Average interleaved frames down to one channel
fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn encode_le(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
