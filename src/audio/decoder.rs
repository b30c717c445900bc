//! # Upload Decoding
//!
//! Turns the bytes of an uploaded audio file into model-ready samples:
//! decode (WAV or raw PCM), downmix to mono, convert to f32 in [-1, 1],
//! and resample to 16kHz.
//!
//! ## Supported inputs:
//! - **WAV** (RIFF): 8/16/24-bit integer PCM and 32-bit float, any channel
//!   count and sample rate
//! - **Raw PCM fallback**: headerless data is treated as 16-bit
//!   little-endian mono at 16kHz, matching what browser recorder widgets
//!   commonly produce
//!
//! Compressed containers (MP3, OGG, FLAC, MP4/M4A) are recognized by their
//! magic bytes and rejected rather than misread as PCM.

use byteorder::{LittleEndian, ReadBytesExt};
use crate::error::AppError;
use crate::transcription::model::SAMPLE_RATE;
use std::io::Cursor;

/// Decode uploaded audio bytes into 16kHz mono f32 samples.
pub fn decode_upload(bytes: &[u8]) -> Result<Vec<f32>, AppError> {
    if bytes.is_empty() {
        return Err(AppError::ValidationError("Audio data is empty".to_string()));
    }

    if bytes.len() >= 4 && &bytes[..4] == b"RIFF" {
        return decode_wav(bytes);
    }

    // A compressed container fed through the raw-PCM path would "succeed"
    // and hand the model noise, so recognizable formats are rejected up front
    if let Some(format) = sniff_compressed_format(bytes) {
        return Err(AppError::ValidationError(format!(
            "Unsupported audio format ({}); upload WAV or raw 16-bit PCM",
            format
        )));
    }

    decode_raw_pcm(bytes)
}

/// Identify common compressed audio containers by their magic bytes.
fn sniff_compressed_format(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }

    if &bytes[..3] == b"ID3" {
        return Some("MP3");
    }
    // MPEG audio frame sync: eleven set bits at the start of the frame
    if bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0 {
        return Some("MP3");
    }
    if &bytes[..4] == b"OggS" {
        return Some("OGG");
    }
    if &bytes[..4] == b"fLaC" {
        return Some("FLAC");
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return Some("MP4/M4A");
    }

    None
}

/// Decode a RIFF/WAV container.
fn decode_wav(bytes: &[u8]) -> Result<Vec<f32>, AppError> {
    let mut cursor = Cursor::new(bytes);
    let (header, data) = wav::read(&mut cursor)
        .map_err(|e| AppError::ValidationError(format!("Invalid WAV file: {}", e)))?;

    let channels = header.channel_count as usize;
    if channels == 0 {
        return Err(AppError::ValidationError(
            "WAV header declares zero channels".to_string(),
        ));
    }

    let interleaved: Vec<f32> = match data {
        wav::BitDepth::Eight(samples) => samples
            .into_iter()
            // 8-bit WAV is unsigned with a 128 midpoint
            .map(|s| (s as f32 - 128.0) / 128.0)
            .collect(),
        wav::BitDepth::Sixteen(samples) => {
            samples.into_iter().map(|s| s as f32 / 32768.0).collect()
        }
        wav::BitDepth::TwentyFour(samples) => samples
            .into_iter()
            .map(|s| s as f32 / 8_388_608.0)
            .collect(),
        wav::BitDepth::ThirtyTwoFloat(samples) => samples,
        wav::BitDepth::Empty => {
            return Err(AppError::ValidationError(
                "WAV file contains no audio data".to_string(),
            ))
        }
    };

    if interleaved.is_empty() {
        return Err(AppError::ValidationError(
            "WAV file contains no audio data".to_string(),
        ));
    }

    let mono = downmix_to_mono(&interleaved, channels);
    Ok(resample(&mono, header.sampling_rate as usize, SAMPLE_RATE))
}

/// Decode headerless bytes as 16-bit little-endian mono PCM at 16kHz.
fn decode_raw_pcm(bytes: &[u8]) -> Result<Vec<f32>, AppError> {
    if bytes.len() % 2 != 0 {
        return Err(AppError::ValidationError(
            "Raw PCM data length must be even for 16-bit samples".to_string(),
        ));
    }

    let mut cursor = Cursor::new(bytes);
    let mut samples = Vec::with_capacity(bytes.len() / 2);
    while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
        samples.push(sample as f32 / 32768.0);
    }

    if samples.is_empty() {
        return Err(AppError::ValidationError(
            "No PCM samples found in upload".to_string(),
        ));
    }

    Ok(samples)
}

/// Average interleaved channels down to a single mono channel.
fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation resampling.
///
/// Good enough for speech into Whisper; anything fancier (windowed sinc)
/// would be wasted on a model that renormalizes its own input.
fn resample(samples: &[f32], from_rate: usize, to_rate: usize) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;

        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }

    out
}
