pub mod engine;
pub mod mock;
pub mod narration;

pub use engine::{
    create_tts, split_for_speech, GoogleTranslateTts, OpenAiTts, SpeechOutput, TtsProvider, TtsRequest, SPEECH_MIME_TYPE,
};
pub use mock::MockTts;
pub use narration::{Narration, NarrationComposer};
