//! The per-utterance streaming session: a background producer task
//! synthesizes chunks strictly in order and pushes frames into a
//! bounded queue that the consumer drains through [`AudioStream`].

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::TtsError;
use crate::segment::Chunk;
use crate::voice::{LoadedVoice, VoiceCache};

/// One frame of raw 16-bit little-endian PCM, tagged with the chunk
/// that produced it. Ownership moves to the consumer on pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub chunk_index: usize,
    pub data: Vec<u8>,
    pub sample_rate: u32,
    pub num_channels: u16,
}

impl AudioFrame {
    /// Playback duration of this frame in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        let samples = (self.data.len() / 2) as u64 / self.num_channels.max(1) as u64;
        samples * 1000 / self.sample_rate.max(1) as u64
    }
}

enum Terminal {
    Eos,
    Cancelled,
    Failed(TtsError),
}

/// Pull side of a streaming session.
///
/// Each pull yields the next frame in chunk order, `Ok(None)` at end
/// of stream, or an error. Terminal results repeat on every later
/// pull; they never hang and never change.
pub struct AudioStream {
    rx: mpsc::Receiver<Result<AudioFrame, TtsError>>,
    cancel: CancellationToken,
    terminal: Option<Terminal>,
}

impl AudioStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<Result<AudioFrame, TtsError>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            rx,
            cancel,
            terminal: None,
        }
    }

    /// A stream that is already at end of input; the normal outcome
    /// for input with no speakable content.
    pub(crate) fn drained() -> Self {
        let (_tx, rx) = mpsc::channel(1);
        Self {
            rx,
            cancel: CancellationToken::new(),
            terminal: Some(Terminal::Eos),
        }
    }

    /// Pull the next audio frame.
    ///
    /// Suspends only while the session is still running and no frame
    /// is queued. Once cancellation has been observed, queued frames
    /// are discarded and every pull returns [`TtsError::Cancelled`].
    pub async fn next(&mut self) -> Result<Option<AudioFrame>, TtsError> {
        match &self.terminal {
            Some(Terminal::Eos) => return Ok(None),
            Some(Terminal::Cancelled) => return Err(TtsError::Cancelled),
            Some(Terminal::Failed(e)) => return Err(e.clone()),
            None => {}
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.rx.close();
                self.terminal = Some(Terminal::Cancelled);
                Err(TtsError::Cancelled)
            }
            item = self.rx.recv() => match item {
                Some(Ok(frame)) => Ok(Some(frame)),
                Some(Err(e)) => {
                    self.terminal = Some(Terminal::Failed(e.clone()));
                    Err(e)
                }
                None => {
                    self.terminal = Some(Terminal::Eos);
                    Ok(None)
                }
            }
        }
    }

    /// Request cancellation. Idempotent and safe to call from any
    /// task at any time, including after the stream has closed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle for cancelling this stream from another task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Consume the pull interface into a `futures` stream. The stream
    /// ends after the first terminal result.
    pub fn into_stream(
        mut self,
    ) -> impl futures_core::Stream<Item = Result<AudioFrame, TtsError>> {
        async_stream::stream! {
            loop {
                match self.next().await {
                    Ok(Some(frame)) => yield Ok(frame),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        // Releases the producer task when the consumer goes away.
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.terminal {
            None => "running",
            Some(Terminal::Eos) => "closed",
            Some(Terminal::Cancelled) => "cancelled",
            Some(Terminal::Failed(_)) => "failed",
        };
        f.debug_struct("AudioStream").field("state", &state).finish()
    }
}

pub(crate) struct SessionParams {
    pub cache: Arc<VoiceCache>,
    pub model_path: PathBuf,
    pub chunks: Vec<Chunk>,
    pub tx: mpsc::Sender<Result<AudioFrame, TtsError>>,
    pub cancel: CancellationToken,
}

/// Producer side of one streaming session. Processes chunks strictly
/// in order; the bounded channel provides backpressure against a slow
/// consumer.
pub(crate) async fn run_session(params: SessionParams) {
    let SessionParams {
        cache,
        model_path,
        chunks,
        tx,
        cancel,
    } = params;
    let total = chunks.len();

    for chunk in chunks {
        if cancel.is_cancelled() {
            debug!(chunk = chunk.index, "session cancelled before chunk start");
            return;
        }

        let voice = match cache.acquire(&model_path).await {
            Ok(v) => v,
            Err(e) => {
                error!("voice model unavailable: {e}");
                send_error(&tx, &cancel, e).await;
                return;
            }
        };

        let index = chunk.index;
        debug!(chunk = index, total, "synthesizing chunk");
        let frame = match run_inference(voice, chunk, &cancel).await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                error!("synthesis failed, abandoning utterance: {e}");
                send_error(&tx, &cancel, e).await;
                return;
            }
            None => {
                debug!(chunk = index, "session cancelled with inference in flight");
                return;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // Cancellation observed: discard, never queue.
                debug!(chunk = index, "session cancelled, discarding frame");
                return;
            }
            sent = tx.send(Ok(frame)) => {
                if sent.is_err() {
                    debug!(chunk = index, "consumer dropped, stopping session");
                    return;
                }
            }
        }
    }

    info!(chunks = total, "streaming synthesis complete");
    // tx drops here, closing the queue and signalling end of stream.
}

/// Deliver a terminal error unless cancellation wins the race. A
/// cancelled consumer no longer drains the queue, so the producer
/// must not park on a full channel.
async fn send_error(
    tx: &mpsc::Sender<Result<AudioFrame, TtsError>>,
    cancel: &CancellationToken,
    err: TtsError,
) {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {}
        _ = tx.send(Err(err)) => {}
    }
}

/// Run one blocking inference call on a worker thread. Returns `None`
/// when cancellation wins the race; the in-flight call is abandoned
/// and its output discarded.
async fn run_inference(
    voice: Arc<LoadedVoice>,
    chunk: Chunk,
    cancel: &CancellationToken,
) -> Option<Result<AudioFrame, TtsError>> {
    let sample_rate = voice.sample_rate();
    let num_channels = voice.num_channels();
    let index = chunk.index;

    // Whitespace-only chunk text short-circuits without touching the model.
    if chunk.text.trim().is_empty() {
        return Some(Ok(AudioFrame {
            chunk_index: index,
            data: Vec::new(),
            sample_rate,
            num_channels,
        }));
    }

    let text = chunk.text;
    let text_prefix: String = text.chars().take(32).collect();
    let handle = tokio::task::spawn_blocking(move || voice.infer(&text));

    let joined = tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        joined = handle => joined,
    };

    Some(match joined {
        Ok(Ok(data)) => Ok(AudioFrame {
            chunk_index: index,
            data,
            sample_rate,
            num_channels,
        }),
        Ok(Err(e)) => Err(TtsError::Inference {
            chunk_index: index,
            text_prefix,
            message: e.to_string(),
        }),
        Err(join_err) => Err(TtsError::Worker(join_err.to_string())),
    })
}
