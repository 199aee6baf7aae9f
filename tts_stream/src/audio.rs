//! Helpers for consumers that want a whole-utterance blob instead of
//! (or in addition to) the frame stream.

use base64::{engine::general_purpose, Engine as _};
use std::io::Cursor;

/// Wrap 16-bit little-endian PCM in a WAV (RIFF) container.
pub fn encode_wav(pcm: &[u8], sample_rate: u32, num_channels: u16) -> anyhow::Result<Vec<u8>> {
    if pcm.len() % 2 != 0 {
        anyhow::bail!("PCM byte length must be even for 16-bit samples");
    }

    let spec = hound::WavSpec {
        channels: num_channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(44 + pcm.len()));
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| anyhow::anyhow!("wav write err: {e}"))?;
    for sample in pcm.chunks_exact(2) {
        let v = i16::from_le_bytes([sample[0], sample[1]]);
        writer
            .write_sample(v)
            .map_err(|e| anyhow::anyhow!("wav sample err: {e}"))?;
    }
    writer
        .finalize()
        .map_err(|e| anyhow::anyhow!("wav finalize err: {e}"))?;

    Ok(cursor.into_inner())
}

/// WAV container encoded to Base64, for JSON transports.
pub fn encode_wav_base64(
    pcm: &[u8],
    sample_rate: u32,
    num_channels: u16,
) -> anyhow::Result<String> {
    let wav = encode_wav(pcm, sample_rate, num_channels)?;
    Ok(general_purpose::STANDARD.encode(wav))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_riff_header() {
        let pcm: Vec<u8> = (0..64u8).collect();
        let wav = encode_wav(&pcm, 22_050, 1).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header plus the sample data
        assert_eq!(wav.len(), 44 + pcm.len());
    }

    #[test]
    fn rejects_odd_pcm_length() {
        assert!(encode_wav(&[0u8; 3], 22_050, 1).is_err());
    }

    #[test]
    fn base64_round_trips_the_container() {
        let pcm = [0u8, 1, 2, 3];
        let encoded = encode_wav_base64(&pcm, 22_050, 1).unwrap();
        let decoded = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded, encode_wav(&pcm, 22_050, 1).unwrap());
    }
}
