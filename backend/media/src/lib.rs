//! Media handling for scans: image normalization on the way in, narration
//! audio delivery on the way out.

pub mod audio;
pub mod image;
pub mod media_server;
pub mod mime_detect;

pub use audio::AudioStore;
pub use image::ImageNormalizer;
pub use media_server::audio_router;
pub use mime_detect::{detect_mime_type, is_audio, is_image, sniff_mime_type};
