pub mod elevenlabs;
pub mod openai_speech;

pub use elevenlabs::ElevenLabsSpeechProvider;
pub use openai_speech::OpenAiSpeechProvider;
