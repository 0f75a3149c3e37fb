pub mod interface;
pub mod elevenlabs;
pub mod storage;

pub use interface::SpeechSynthesizer;
pub use elevenlabs::ElevenLabsTTS;
pub use storage::{AudioStore, AudioWriter, AUDIO_ROUTE};
