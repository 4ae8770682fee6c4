//! Audio output
//!
//! [`AudioSink`] is the seam between the sequencer and the sound device. The
//! production implementation drives cpal; tests substitute their own sink.
//!
//! cpal streams are not Send, so [`CpalSink`] runs a dedicated thread that
//! owns the stream and receives commands over a channel. One verse plays at
//! a time; starting a new verse replaces whatever is sounding.

use crate::audio::types::VerseAudio;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Resolves when the sink finishes with a verse.
///
/// `ended()` returns true only when the buffer played to its natural end;
/// a stop or a replacement resolves false.
pub struct Completion {
    rx: oneshot::Receiver<()>,
}

impl Completion {
    pub async fn ended(self) -> bool {
        self.rx.await.is_ok()
    }
}

/// Sink-side handle for signalling completion.
pub struct CompletionSignal {
    tx: oneshot::Sender<()>,
}

impl CompletionSignal {
    /// Signal natural end of playback.
    pub fn finish(self) {
        let _ = self.tx.send(());
    }
    // Dropping without finish() resolves the Completion as interrupted.
}

pub fn completion_pair() -> (CompletionSignal, Completion) {
    let (tx, rx) = oneshot::channel();
    (CompletionSignal { tx }, Completion { rx })
}

/// Output device abstraction.
///
/// Implementations must guarantee single-utterance playback: `start` on a
/// busy sink replaces the current verse, resolving its completion as
/// interrupted before the new audio sounds.
pub trait AudioSink: Send + Sync {
    /// Begin playing a decoded verse, replacing any current one.
    fn start(&self, audio: Arc<VerseAudio>) -> Result<Completion>;

    /// Stop the current verse, if any. Idempotent.
    fn stop(&self) -> Result<()>;

    /// Release the output device.
    fn close(&self);
}

enum Command {
    Start(Arc<VerseAudio>, CompletionSignal),
    Stop,
    Close,
}

/// Playback position within the active buffer, shared with the device
/// callback.
struct Active {
    audio: Arc<VerseAudio>,
    /// Fractional source frame position, stepped by the rate ratio
    pos: f64,
    step: f64,
    signal: Option<CompletionSignal>,
}

impl Active {
    /// Next source sample for the given output channel, or None when the
    /// buffer is exhausted.
    fn next_sample(&mut self, channel: usize, out_channels: usize) -> Option<f32> {
        let frame = self.pos as usize;
        if frame >= self.audio.frames() {
            return None;
        }
        let src_channels = self.audio.channels as usize;
        let src_channel = if channel < src_channels { channel } else { 0 };
        let sample = self.audio.samples[frame * src_channels + src_channel];
        if channel + 1 == out_channels {
            self.pos += self.step;
        }
        Some(sample)
    }
}

type ActiveSlot = Arc<Mutex<Option<Active>>>;

/// cpal-backed audio sink.
pub struct CpalSink {
    tx: Mutex<mpsc::Sender<Command>>,
}

impl CpalSink {
    /// Spawn the audio thread. The device itself is opened lazily on the
    /// first start so a headless host can still serve content endpoints.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("lectio-audio".to_string())
            .spawn(move || audio_thread(rx))
            .expect("spawn audio thread");
        Self { tx: Mutex::new(tx) }
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.tx
            .lock()
            .map_err(|_| Error::AudioOutput("audio command channel poisoned".to_string()))?
            .send(cmd)
            .map_err(|_| Error::AudioOutput("audio thread exited".to_string()))
    }
}

impl Default for CpalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for CpalSink {
    fn start(&self, audio: Arc<VerseAudio>) -> Result<Completion> {
        let (signal, completion) = completion_pair();
        self.send(Command::Start(audio, signal))?;
        Ok(completion)
    }

    fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    fn close(&self) {
        let _ = self.send(Command::Close);
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        if let Ok(tx) = self.tx.lock() {
            let _ = tx.send(Command::Close);
        }
    }
}

struct DeviceStream {
    stream: cpal::Stream,
    sample_rate: u32,
    channels: usize,
}

fn audio_thread(rx: mpsc::Receiver<Command>) {
    let active: ActiveSlot = Arc::new(Mutex::new(None));
    let mut device: Option<DeviceStream> = None;

    while let Ok(cmd) = rx.recv() {
        match cmd {
            Command::Start(audio, signal) => {
                if device.is_none() {
                    match open_stream(Arc::clone(&active)) {
                        Ok(d) => device = Some(d),
                        Err(e) => {
                            tracing::error!("failed to open audio output: {}", e);
                            // Dropping the signal reports the interruption
                            continue;
                        }
                    }
                }
                let d = device.as_ref().unwrap();
                let step = audio.sample_rate as f64 / d.sample_rate as f64;
                {
                    let mut slot = active.lock().unwrap();
                    // Replacing drops any previous signal, resolving its
                    // completion as interrupted.
                    *slot = Some(Active {
                        audio,
                        pos: 0.0,
                        step,
                        signal: Some(signal),
                    });
                }
                if let Err(e) = d.stream.play() {
                    tracing::error!("failed to start audio stream: {}", e);
                    active.lock().unwrap().take();
                }
            }
            Command::Stop => {
                active.lock().unwrap().take();
            }
            Command::Close => {
                active.lock().unwrap().take();
                device = None;
                break;
            }
        }
    }
}

fn open_stream(active: ActiveSlot) -> Result<DeviceStream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::AudioOutput("no output device available".to_string()))?;
    let config = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("no default output config: {}", e)))?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let stream_config: cpal::StreamConfig = config.config();

    let err_fn = |e| tracing::error!("audio stream error: {}", e);

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| fill_output(data, channels, &active),
                err_fn,
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("failed to build stream: {}", e)))?,
        cpal::SampleFormat::I16 => device
            .build_output_stream(
                &stream_config,
                move |data: &mut [i16], _| {
                    let mut buf = vec![0.0f32; data.len()];
                    fill_output(&mut buf, channels, &active);
                    for (out, s) in data.iter_mut().zip(buf.iter()) {
                        *out = (s * i16::MAX as f32) as i16;
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("failed to build stream: {}", e)))?,
        other => {
            return Err(Error::AudioOutput(format!(
                "unsupported output sample format: {:?}",
                other
            )))
        }
    };

    stream
        .play()
        .map_err(|e| Error::AudioOutput(format!("failed to start stream: {}", e)))?;

    tracing::info!(sample_rate, channels, "audio output opened");

    Ok(DeviceStream {
        stream,
        sample_rate,
        channels,
    })
}

/// Device callback body. Nearest-neighbor rate conversion is sufficient for
/// speech; silence is written once the buffer runs out and the completion
/// signal fires.
fn fill_output(data: &mut [f32], channels: usize, active: &ActiveSlot) {
    let mut slot = active.lock().unwrap();
    let mut finished = false;
    let mut written = 0;

    if let Some(playing) = slot.as_mut() {
        'frames: for frame in data.chunks_mut(channels) {
            for (ch, out) in frame.iter_mut().enumerate() {
                match playing.next_sample(ch, channels) {
                    Some(sample) => {
                        *out = sample;
                        written += 1;
                    }
                    None => {
                        finished = true;
                        break 'frames;
                    }
                }
            }
        }
        if finished {
            if let Some(signal) = playing.signal.take() {
                signal.finish();
            }
        }
    }

    if finished {
        *slot = None;
    }
    for out in data[written..].iter_mut() {
        *out = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::{CHANNELS, SAMPLE_RATE};

    #[tokio::test]
    async fn test_completion_resolves_on_finish() {
        let (signal, completion) = completion_pair();
        signal.finish();
        assert!(completion.ended().await);
    }

    #[tokio::test]
    async fn test_completion_resolves_false_on_drop() {
        let (signal, completion) = completion_pair();
        drop(signal);
        assert!(!completion.ended().await);
    }

    #[test]
    fn test_active_exhausts_buffer() {
        let audio = Arc::new(VerseAudio::new(vec![0.1, 0.2, 0.3], SAMPLE_RATE, CHANNELS));
        let mut active = Active {
            audio,
            pos: 0.0,
            step: 1.0,
            signal: None,
        };
        assert_eq!(active.next_sample(0, 1), Some(0.1));
        assert_eq!(active.next_sample(0, 1), Some(0.2));
        assert_eq!(active.next_sample(0, 1), Some(0.3));
        assert_eq!(active.next_sample(0, 1), None);
    }

    #[test]
    fn test_mono_source_duplicated_to_stereo() {
        let audio = Arc::new(VerseAudio::new(vec![0.5, -0.5], SAMPLE_RATE, CHANNELS));
        let mut active = Active {
            audio,
            pos: 0.0,
            step: 1.0,
            signal: None,
        };
        assert_eq!(active.next_sample(0, 2), Some(0.5));
        assert_eq!(active.next_sample(1, 2), Some(0.5));
        assert_eq!(active.next_sample(0, 2), Some(-0.5));
        assert_eq!(active.next_sample(1, 2), Some(-0.5));
        assert_eq!(active.next_sample(0, 2), None);
    }
}
