//! Piper voice engine adapter.
//!
//! Implements the `tts_stream` engine seam on top of `piper-rs`. A
//! voice is addressed by its Piper config path (`*.onnx.json`); the
//! model weights referenced by the config are loaded alongside it.
//!
//! Piper inference is not reentrant-safe, so leave
//! `model_is_thread_safe` at its default (`false`) when pairing this
//! engine with a `Synthesizer`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use piper_rs::synth::{PiperSpeechStreamParallel, PiperSpeechSynthesizer};
use tracing::info;

use tts_stream::{EngineError, Voice, VoiceEngine};

/// Factory for Piper voices.
#[derive(Debug, Default)]
pub struct PiperEngine;

impl PiperEngine {
    pub fn new() -> Self {
        Self
    }
}

impl VoiceEngine for PiperEngine {
    fn load(&self, path: &Path) -> Result<Arc<dyn Voice>, EngineError> {
        let sample_rate =
            read_sample_rate(path).map_err(|e| EngineError::Load(e.to_string()))?;

        info!(path = %path.display(), sample_rate, "loading piper voice");
        let model = piper_rs::from_config_path(path)
            .map_err(|e| EngineError::Load(format!("piper load error: {e}")))?;
        let synth = PiperSpeechSynthesizer::new(model)
            .map_err(|e| EngineError::Load(format!("piper synthesizer error: {e}")))?;

        Ok(Arc::new(PiperVoice { synth, sample_rate }))
    }
}

struct PiperVoice {
    synth: PiperSpeechSynthesizer,
    sample_rate: u32,
}

impl Voice for PiperVoice {
    fn infer(&self, text: &str) -> Result<Vec<u8>, EngineError> {
        let iter: PiperSpeechStreamParallel = self
            .synth
            .synthesize_parallel(text.to_string(), None)
            .map_err(|e| EngineError::Inference(format!("piper synth error: {e}")))?;

        let mut samples: Vec<f32> = Vec::new();
        for part in iter {
            samples.extend(
                part.map_err(|e| EngineError::Inference(format!("chunk error: {e}")))?
                    .into_vec(),
            );
        }

        Ok(f32_to_i16_le(&samples))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Read `audio.sample_rate` from the Piper model config JSON.
fn read_sample_rate(cfg_path: &Path) -> anyhow::Result<u32> {
    let text = fs::read_to_string(cfg_path)
        .with_context(|| format!("Failed to read config file: {}", cfg_path.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| "Config file is not valid JSON")?;

    let sample_rate = json
        .get("audio")
        .and_then(|a| a.get("sample_rate"))
        .and_then(|sr| sr.as_u64())
        .ok_or_else(|| anyhow::anyhow!("Missing or invalid 'audio.sample_rate' in config"))?;

    Ok(sample_rate as u32)
}

/// Convert f32 samples in [-1.0, 1.0] to 16-bit little-endian PCM.
fn f32_to_i16_le(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}
