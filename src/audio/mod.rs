//! Audio normalization
//!
//! The backend only accepts 16 kHz / 16-bit / mono little-endian PCM. Uploads
//! in any container/codec symphonia understands are decoded and converted here
//! before they reach the session manager.

mod decode;
mod file;
mod pcm;

pub use decode::{decode, is_supported, normalize, prepare};
pub use file::AudioFile;
pub use pcm::PcmAudio;
