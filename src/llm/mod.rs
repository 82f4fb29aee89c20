pub mod gemini;
pub mod media;

pub use gemini::{GeminiImageClient, ImageTransformer, TransformError};
