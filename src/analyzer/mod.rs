//! AI vision analysis of skin photos.

pub mod image_prep;
pub mod prompts;
pub mod types;
pub mod vision;

pub use image_prep::{prepare_data_url, prepare_image, prepare_image_file};
pub use types::*;
pub use vision::analyze_image;
