//! Real-time streaming text-to-speech pipeline.
//!
//! Turns arbitrary text into an ordered, cancellable stream of PCM
//! audio frames with low time-to-first-byte. Input text is segmented
//! into short speakable chunks (the first one deliberately smaller so
//! first audio returns quickly), each chunk is synthesized on a
//! blocking worker through a narrow [`VoiceEngine`] seam, and frames
//! are delivered strictly in chunk order through a bounded queue.
//!
//! The neural model itself, the conversational agent framework and
//! any network transport live outside this crate; a concrete engine
//! adapter (see the `piper_engine` crate) plugs in at the
//! [`VoiceEngine`] boundary.

pub mod audio;
mod config;
mod engine;
mod error;
mod segment;
mod stream;
mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use config::SynthesizerConfig;
pub use engine::{EngineError, Voice, VoiceEngine};
pub use error::TtsError;
pub use segment::{segment_text, Chunk};
pub use stream::{AudioFrame, AudioStream};
pub use voice::{LoadedVoice, VoiceCache};

/// Stream capabilities declared to the consuming agent framework.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Capabilities {
    pub streaming: bool,
    pub sample_rate: u32,
    pub num_channels: u16,
}

/// Public entry point of the pipeline.
///
/// A `Synthesizer` is bound to one model path and is reusable; every
/// [`Synthesizer::synthesize`] call creates an independent single-use
/// streaming session. Synthesizers sharing a [`VoiceCache`] load the
/// same model path at most once per process.
#[derive(Debug)]
pub struct Synthesizer {
    cache: Arc<VoiceCache>,
    model_path: PathBuf,
    config: SynthesizerConfig,
}

impl Synthesizer {
    pub fn new(
        engine: Arc<dyn VoiceEngine>,
        model_path: impl Into<PathBuf>,
        config: SynthesizerConfig,
    ) -> Self {
        let cache = Arc::new(VoiceCache::new(engine, config.model_is_thread_safe));
        Self::with_cache(cache, model_path, config)
    }

    /// Build a synthesizer on a shared voice cache.
    pub fn with_cache(
        cache: Arc<VoiceCache>,
        model_path: impl Into<PathBuf>,
        config: SynthesizerConfig,
    ) -> Self {
        Self {
            cache,
            model_path: model_path.into(),
            config,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            streaming: true,
            sample_rate: self.config.sample_rate,
            num_channels: self.config.num_channels,
        }
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Start synthesizing `text`. Returns immediately with a
    /// pull-based stream; synthesis runs on a background task spawned
    /// onto the current Tokio runtime, so this must be called from
    /// within one and panics otherwise.
    ///
    /// Input with no speakable content yields an already-drained
    /// stream with zero frames and no error.
    pub fn synthesize(&self, text: &str) -> AudioStream {
        let chunks = segment_text(
            text,
            self.config.max_chunk_chars,
            self.config.first_chunk_chars,
        );
        if chunks.is_empty() {
            debug!("no speakable content, returning drained stream");
            return AudioStream::drained();
        }

        info!(chunks = chunks.len(), "starting streaming synthesis");
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let cancel = CancellationToken::new();
        tokio::spawn(stream::run_session(stream::SessionParams {
            cache: Arc::clone(&self.cache),
            model_path: self.model_path.clone(),
            chunks,
            tx,
            cancel: cancel.clone(),
        }));
        AudioStream::new(rx, cancel)
    }
}
