//! # Audio Upload Handling
//!
//! Converts uploaded audio bytes into the 16kHz mono f32 samples the
//! Whisper model expects. Beyond a presence check and format decode there
//! is deliberately no audio validation or preprocessing.

pub mod decoder;

pub use decoder::decode_upload;
