//! Microphone recording with cpal, encoded to WAV with hound.
//!
//! The input stream runs on a blocking thread. Frames are downmixed to mono,
//! and a [`SilenceDetector`] ends the recording once the speaker has been
//! quiet for `silence_seconds` after speaking, or at `max_record_seconds`.

use super::{AudioCapture, CapturedAudio};
use crate::config::VoiceSettings;
use crate::error::{Result, UzhavanError};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, StreamConfig, StreamError};
use hound::{WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Bits per sample for WAV encoding.
const BITS_PER_SAMPLE: u16 = 16;

/// Loudness is judged over windows of this length.
const WINDOW: Duration = Duration::from_millis(100);

/// How long to wait for the device before checking the deadline again.
const POLL: Duration = Duration::from_millis(200);

/// Extra time allowed past `max_record_seconds` for a stalled device.
const STALL_GRACE: Duration = Duration::from_secs(5);

/// Records one utterance from the default (or configured) microphone.
#[derive(Debug, Clone)]
pub struct MicrophoneCapture {
    device_name: Option<String>,
    silence_seconds: f32,
    silence_threshold: f32,
    max_record_seconds: u32,
}

impl MicrophoneCapture {
    pub fn from_settings(settings: &VoiceSettings) -> Self {
        Self {
            device_name: settings.input_device.clone(),
            silence_seconds: settings.silence_seconds,
            silence_threshold: settings.silence_threshold,
            max_record_seconds: settings.max_record_seconds,
        }
    }

    fn record_blocking(&self) -> Result<(Vec<i16>, u32)> {
        let device = find_input_device(self.device_name.as_deref())?;
        let config: StreamConfig = device
            .default_input_config()
            .map_err(|e| UzhavanError::CaptureFailure(format!("No usable input format: {}", e)))?
            .config();
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate.0;

        let (tx, rx) = mpsc::channel::<Vec<f32>>();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(downmix(data, channels));
                },
                log_stream_error,
                None,
            )
            .map_err(|e| UzhavanError::CaptureFailure(format!("Failed to open input stream: {}", e)))?;
        stream
            .play()
            .map_err(|e| UzhavanError::CaptureFailure(format!("Failed to start recording: {}", e)))?;

        info!("Recording at {} Hz from {} channel(s)", sample_rate, channels);

        let mut detector = SilenceDetector::new(
            sample_rate,
            self.silence_threshold,
            Duration::from_secs_f32(self.silence_seconds.max(0.0)),
            Duration::from_secs(self.max_record_seconds as u64),
        );
        let deadline =
            Instant::now() + Duration::from_secs(self.max_record_seconds as u64) + STALL_GRACE;
        let mut samples = Vec::new();

        loop {
            match rx.recv_timeout(POLL) {
                Ok(frame) => {
                    samples.extend(frame.iter().map(|&s| to_pcm16(s)));
                    if detector.push(&frame) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) if Instant::now() < deadline => continue,
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Input device stopped delivering audio");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        drop(stream);

        if !detector.heard_speech() {
            debug!("No speech above the silence threshold");
            samples.clear();
        }

        Ok((samples, sample_rate))
    }
}

#[async_trait]
impl AudioCapture for MicrophoneCapture {
    #[instrument(skip(self))]
    async fn capture(&self) -> Result<CapturedAudio> {
        let recorder = self.clone();
        let (samples, sample_rate) = tokio::task::spawn_blocking(move || recorder.record_blocking())
            .await
            .map_err(|e| UzhavanError::CaptureFailure(format!("Recording thread failed: {}", e)))??;

        let bytes = encode_wav(&samples, sample_rate)?;
        debug!("Captured {} samples ({} bytes)", samples.len(), bytes.len());
        Ok(CapturedAudio::new(bytes, "capture.wav"))
    }
}

/// Name of the input device that would be used, for diagnostics.
pub fn input_device_name(preferred: Option<&str>) -> Result<String> {
    let device = find_input_device(preferred)?;
    device
        .name()
        .map_err(|e| UzhavanError::CaptureFailure(format!("Unreadable device name: {}", e)))
}

/// The named input device, or the host default when no name is given.
fn find_input_device(preferred: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    match preferred.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => host
            .input_devices()
            .map_err(|e| UzhavanError::CaptureFailure(format!("Cannot list input devices: {}", e)))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| UzhavanError::CaptureFailure(format!("Input device not found: {}", name))),
        None => host
            .default_input_device()
            .ok_or_else(|| UzhavanError::CaptureFailure("No input device".to_string())),
    }
}

fn log_stream_error(error: StreamError) {
    warn!("Audio stream error: {}", error);
}

/// Average interleaved frames down to one channel.
fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Encode mono 16-bit PCM as an in-memory WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };
    let wav_error = |e: hound::Error| UzhavanError::CaptureFailure(format!("WAV encoding failed: {}", e));

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(wav_error)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }
    Ok(cursor.into_inner())
}

/// Decides when a recording is over, from RMS loudness per window.
///
/// Leading silence never ends a recording; only silence after speech does,
/// apart from the hard length limit.
#[derive(Debug)]
pub struct SilenceDetector {
    window_len: usize,
    threshold: f32,
    silence_limit: usize,
    max_len: usize,
    window: Vec<f32>,
    total: usize,
    quiet_run: usize,
    heard_speech: bool,
}

impl SilenceDetector {
    pub fn new(sample_rate: u32, threshold: f32, trailing_silence: Duration, max_length: Duration) -> Self {
        let rate = sample_rate as f64;
        Self {
            window_len: ((rate * WINDOW.as_secs_f64()) as usize).max(1),
            threshold,
            silence_limit: (rate * trailing_silence.as_secs_f64()) as usize,
            max_len: (rate * max_length.as_secs_f64()) as usize,
            window: Vec::new(),
            total: 0,
            quiet_run: 0,
            heard_speech: false,
        }
    }

    /// Feed mono samples. Returns true once recording should stop.
    pub fn push(&mut self, samples: &[f32]) -> bool {
        for &sample in samples {
            self.window.push(sample);
            self.total += 1;

            if self.window.len() == self.window_len {
                if rms(&self.window) >= self.threshold {
                    self.heard_speech = true;
                    self.quiet_run = 0;
                } else {
                    self.quiet_run += self.window_len;
                }
                self.window.clear();
            }

            if self.heard_speech && self.quiet_run >= self.silence_limit {
                return true;
            }
            if self.total >= self.max_len {
                return true;
            }
        }
        false
    }

    pub fn heard_speech(&self) -> bool {
        self.heard_speech
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}
