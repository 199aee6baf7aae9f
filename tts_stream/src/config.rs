// Configuration for the streaming synthesis pipeline

#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    /// Upper bound on non-first chunk size, in characters.
    pub max_chunk_chars: usize,
    /// Upper bound on the very first chunk. Smaller than
    /// `max_chunk_chars`: a shorter first chunk returns first audio
    /// sooner at the cost of slightly more fragmented prosody.
    pub first_chunk_chars: usize,
    /// Whether the underlying engine supports concurrent inference.
    /// When false, inference calls per loaded model are serialized.
    pub model_is_thread_safe: bool,
    /// Capacity of the frame queue between producer and consumer.
    pub queue_capacity: usize,
    /// Declared output sample rate of the configured model.
    pub sample_rate: u32,
    /// Declared output channel count of the configured model.
    pub num_channels: u16,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 60,
            first_chunk_chars: 35,
            model_is_thread_safe: false,
            queue_capacity: 4,
            sample_rate: 22_050,
            num_channels: 1,
        }
    }
}

impl SynthesizerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_chunk_chars = std::env::var("TTS_MAX_CHUNK_CHARS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_chunk_chars);

        let first_chunk_chars = std::env::var("TTS_FIRST_CHUNK_CHARS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.first_chunk_chars);

        let model_is_thread_safe = std::env::var("TTS_MODEL_THREAD_SAFE")
            .ok()
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(defaults.model_is_thread_safe);

        let queue_capacity = std::env::var("TTS_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.queue_capacity);

        let sample_rate = std::env::var("TTS_SAMPLE_RATE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.sample_rate);

        Self {
            max_chunk_chars,
            first_chunk_chars,
            model_is_thread_safe,
            queue_capacity,
            sample_rate,
            num_channels: defaults.num_channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_budgets() {
        let config = SynthesizerConfig::default();
        assert_eq!(config.max_chunk_chars, 60);
        assert_eq!(config.first_chunk_chars, 35);
        assert!(!config.model_is_thread_safe);
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.sample_rate, 22_050);
        assert_eq!(config.num_channels, 1);
    }
}
