//! Lazily-loaded, process-wide shared voice models.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::info;

use crate::engine::{EngineError, Voice, VoiceEngine};
use crate::error::TtsError;

/// A loaded voice model shared by all sessions using the same path.
pub struct LoadedVoice {
    voice: Arc<dyn Voice>,
    // Serializes inference when the engine is not reentrant.
    infer_gate: Option<Mutex<()>>,
}

impl LoadedVoice {
    fn new(voice: Arc<dyn Voice>, model_is_thread_safe: bool) -> Self {
        let infer_gate = (!model_is_thread_safe).then(|| Mutex::new(()));
        Self { voice, infer_gate }
    }

    /// Run inference, holding the single-writer gate for engines that
    /// do not support concurrent calls. Blocking; run on a worker.
    pub fn infer(&self, text: &str) -> Result<Vec<u8>, EngineError> {
        match &self.infer_gate {
            Some(gate) => {
                let _held = gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                self.voice.infer(text)
            }
            None => self.voice.infer(text),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.voice.sample_rate()
    }

    pub fn num_channels(&self) -> u16 {
        self.voice.num_channels()
    }
}

impl std::fmt::Debug for LoadedVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedVoice")
            .field("sample_rate", &self.sample_rate())
            .field("serialized", &self.infer_gate.is_some())
            .finish()
    }
}

/// Maps a model path to its lazily-loaded voice.
///
/// The first caller for a path performs the load; concurrent callers
/// for the same path wait for and share the result. A failed load
/// caches nothing, so a later call retries.
pub struct VoiceCache {
    engine: Arc<dyn VoiceEngine>,
    model_is_thread_safe: bool,
    cells: DashMap<PathBuf, Arc<OnceCell<Arc<LoadedVoice>>>>,
}

impl VoiceCache {
    pub fn new(engine: Arc<dyn VoiceEngine>, model_is_thread_safe: bool) -> Self {
        Self {
            engine,
            model_is_thread_safe,
            cells: DashMap::new(),
        }
    }

    /// Get the loaded voice for `path`, loading it on first use. The
    /// load itself runs on a blocking worker thread.
    pub async fn acquire(&self, path: &Path) -> Result<Arc<LoadedVoice>, TtsError> {
        let cell = {
            let entry = self
                .cells
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };

        cell.get_or_try_init(|| async {
            let engine = Arc::clone(&self.engine);
            let load_path = path.to_path_buf();
            info!(path = %load_path.display(), "loading voice model");
            let voice = tokio::task::spawn_blocking(move || engine.load(&load_path))
                .await
                .map_err(|e| TtsError::Worker(e.to_string()))?
                .map_err(|e| TtsError::ModelLoad {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            info!(path = %path.display(), "voice model loaded");
            Ok(Arc::new(LoadedVoice::new(voice, self.model_is_thread_safe)))
        })
        .await
        .cloned()
    }
}

impl std::fmt::Debug for VoiceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCache")
            .field("loaded_paths", &self.cells.len())
            .field("model_is_thread_safe", &self.model_is_thread_safe)
            .finish()
    }
}
