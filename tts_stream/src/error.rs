use thiserror::Error;

/// Pipeline error types.
///
/// `Clone` is required so a terminal stream result can be returned
/// again on every subsequent pull.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TtsError {
    /// The voice model could not be loaded. Fatal to the requesting
    /// call only; nothing is cached, a later call retries the load.
    #[error("failed to load voice model {path}: {message}")]
    ModelLoad { path: String, message: String },

    /// Inference failed for one chunk. Fatal to the whole utterance:
    /// partial audio with a gap is worse than no audio in a live
    /// conversation, so the stream moves to Failed and stops.
    #[error("synthesis failed on chunk {chunk_index} ({text_prefix:?}): {message}")]
    Inference {
        chunk_index: usize,
        text_prefix: String,
        message: String,
    },

    /// The stream was cancelled before completing.
    #[error("synthesis cancelled")]
    Cancelled,

    /// A background worker task failed to join.
    #[error("synthesis worker failed: {0}")]
    Worker(String),
}
