//! Stand-in generator for commands that never call the model.

use async_trait::async_trait;
use tryon_core::{ImageData, ImageGenerator, Result, TryOnError};

/// Fails every generation with the reason the real client was unavailable.
pub struct OfflineGenerator {
    reason: String,
}

impl OfflineGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn unavailable(&self) -> Result<ImageData> {
        Err(TryOnError::Config {
            message: format!("Image generation unavailable: {}", self.reason),
        })
    }
}

#[async_trait]
impl ImageGenerator for OfflineGenerator {
    async fn apply_garments(&self, _base: &ImageData, _garments: &[ImageData]) -> Result<ImageData> {
        self.unavailable()
    }

    async fn change_pose(&self, _base: &ImageData, _pose_instruction: &str) -> Result<ImageData> {
        self.unavailable()
    }

    async fn remove_background(&self, _image: &ImageData) -> Result<ImageData> {
        self.unavailable()
    }

    async fn generate_model_image(&self, _photo: &ImageData) -> Result<ImageData> {
        self.unavailable()
    }
}
