pub mod loader;
pub mod preprocessing;

pub use loader::{ImageInfo, ImageLoader};
pub use preprocessing::ImagePreprocessor;
