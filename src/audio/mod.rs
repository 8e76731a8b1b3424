// Audio module - clip decoding, resampling and fixed-length normalization

pub mod loader;
pub mod resample;

// Re-export commonly used functions for convenience
pub use loader::{fix_length, is_supported_audio, load_wav, SUPPORTED_EXTENSIONS};
pub use resample::resample;
