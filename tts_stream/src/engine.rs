//! The seam between the pipeline and a concrete voice model.
//!
//! The pipeline depends only on these two traits; one adapter per
//! underlying engine implements them (see the `piper_engine` crate).

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

/// Errors produced at the engine boundary. The session wraps these
/// into [`crate::TtsError`] with path or chunk context attached.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model load failed: {0}")]
    Load(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Loads voice models from the filesystem.
pub trait VoiceEngine: Send + Sync + 'static {
    /// Load the model at `path`. Blocking and potentially slow; the
    /// pipeline always calls this off the async runtime.
    fn load(&self, path: &Path) -> Result<Arc<dyn Voice>, EngineError>;
}

/// A loaded voice model.
pub trait Voice: Send + Sync + 'static {
    /// Synthesize `text` into 16-bit little-endian mono PCM. Blocking
    /// and CPU-bound; the pipeline runs it on a worker thread.
    fn infer(&self, text: &str) -> Result<Vec<u8>, EngineError>;

    /// Sample rate of the PCM produced by [`Voice::infer`].
    fn sample_rate(&self) -> u32;

    fn num_channels(&self) -> u16 {
        1
    }
}
