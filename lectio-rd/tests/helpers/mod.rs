//! Shared test doubles for the playback engine
//!
//! `MockSink` records sink calls and can complete verses automatically or
//! under test control. `ScriptedSource` produces deterministic PCM whose
//! length encodes the verse text, so recorded frame counts identify which
//! verse was started.

use futures::future::BoxFuture;
use futures::FutureExt;
use lectio_common::events::PlaybackState;
use lectio_rd::audio::{completion_pair, AudioSink, Completion, CompletionSignal, VerseAudio};
use lectio_rd::error::{Error, Result};
use lectio_rd::gemini::VerseAudioSource;
use lectio_rd::state::SharedState;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    /// A verse started; payload is the buffer's frame count
    Start(usize),
    Stop,
}

type Pending = Arc<Mutex<Option<(u64, CompletionSignal)>>>;

pub struct MockSink {
    calls: Mutex<Vec<SinkCall>>,
    auto_complete: bool,
    pending: Pending,
    seq: AtomicU64,
    overlaps: AtomicUsize,
}

impl MockSink {
    /// Sink that finishes each verse by itself after a few milliseconds.
    pub fn auto() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    /// Sink that holds each verse until `complete_current` is called.
    pub fn manual() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    fn build(auto_complete: bool) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            auto_complete,
            pending: Arc::new(Mutex::new(None)),
            seq: AtomicU64::new(0),
            overlaps: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn starts(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::Start(frames) => Some(frames),
                SinkCall::Stop => None,
            })
            .collect()
    }

    /// Times start() found a verse still sounding. The sequencer must stop
    /// before starting, so this should stay zero.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// Finish the currently held verse as a natural end.
    pub fn complete_current(&self) -> bool {
        match self.pending.lock().unwrap().take() {
            Some((_, signal)) => {
                signal.finish();
                true
            }
            None => false,
        }
    }
}

impl AudioSink for MockSink {
    fn start(&self, audio: Arc<VerseAudio>) -> Result<Completion> {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::Start(audio.frames()));
        let (signal, completion) = completion_pair();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut pending = self.pending.lock().unwrap();
            if pending.is_some() {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            *pending = Some((seq, signal));
        }
        if self.auto_complete {
            let pending = Arc::clone(&self.pending);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                let mut pending = pending.lock().unwrap();
                if matches!(*pending, Some((s, _)) if s == seq) {
                    if let Some((_, signal)) = pending.take() {
                        signal.finish();
                    }
                }
            });
        }
        Ok(completion)
    }

    fn stop(&self) -> Result<()> {
        self.calls.lock().unwrap().push(SinkCall::Stop);
        // Dropping the signal resolves the completion as interrupted
        self.pending.lock().unwrap().take();
        Ok(())
    }

    fn close(&self) {}
}

pub struct ScriptedSource {
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    delay: Duration,
    fail_texts: Mutex<HashSet<String>>,
}

impl ScriptedSource {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
            delay,
            fail_texts: Mutex::new(HashSet::new()),
        })
    }

    pub fn fail_on(&self, text: &str) {
        self.fail_texts.lock().unwrap().insert(text.to_string());
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().unwrap().get(text).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl VerseAudioSource for ScriptedSource {
    fn verse_audio(&self, text: &str, _voice_id: &str) -> BoxFuture<'static, Result<Vec<u8>>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(text.to_string())
            .or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail_texts.lock().unwrap().contains(text);
        let delay = self.delay;
        // Two bytes per sample: decoded frame count equals text length
        let bytes = vec![0u8; 2 * text.len()];
        async move {
            tokio::time::sleep(delay).await;
            if fail {
                Err(Error::Service("scripted failure".to_string()))
            } else {
                Ok(bytes)
            }
        }
        .boxed()
    }
}

/// Poll until the state reaches `expected` or the timeout elapses.
pub async fn wait_for_status(state: &SharedState, expected: PlaybackState, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if state.status().await == expected {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "timed out waiting for {:?}, still {:?}",
                expected,
                state.status().await
            );
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Poll until the given verse index is the active one.
pub async fn wait_for_active(state: &SharedState, index: usize, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if state.active_verse().await == Some(index) {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "timed out waiting for verse {}, active is {:?}",
                index,
                state.active_verse().await
            );
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
