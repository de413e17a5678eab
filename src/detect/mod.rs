pub mod pipeline;
pub mod types;

pub use pipeline::DetectPipeline;
pub use types::{DetectionResult, Diagnosis, ModelInfo, Prediction};
