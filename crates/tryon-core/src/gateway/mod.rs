//! Generation gateway.
//!
//! A uniform front over the external image-generation capability. The
//! [`ImageGenerator`] trait is the seam: [`GeminiClient`] talks to the hosted
//! model, tests plug in scripted fakes. [`GenerationGateway`] adds the parts
//! every caller needs regardless of backend: loading image references,
//! rejecting unsupported encodings before any call is made, and padding
//! results to a square. It never retries.

mod aspect;
mod fetch;
mod gemini;
pub mod prompts;
pub mod usage;

pub use aspect::enforce_square;
pub use fetch::ImageFetcher;
pub use gemini::GeminiClient;

use crate::config::is_supported_mime;
use crate::error::{Result, TryOnError};
use crate::models::{ImageData, ImageRef, ImageSource};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// The external image-generation capability.
///
/// Each call takes image payloads plus auxiliary inputs and yields exactly
/// one image, or fails with a classified error.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Dress the person in `base` in all of `garments`.
    async fn apply_garments(&self, base: &ImageData, garments: &[ImageData]) -> Result<ImageData>;

    /// Re-render `base` from the camera angle described by `pose_instruction`.
    async fn change_pose(&self, base: &ImageData, pose_instruction: &str) -> Result<ImageData>;

    /// Isolate the subject of `image` on a transparent background.
    async fn remove_background(&self, image: &ImageData) -> Result<ImageData>;

    /// Turn a casual photo into a studio-style full-body model picture.
    async fn generate_model_image(&self, photo: &ImageData) -> Result<ImageData>;
}

pub type DynImageGenerator = Arc<dyn ImageGenerator>;

/// Backend-independent front for image generation.
#[derive(Clone)]
pub struct GenerationGateway {
    generator: DynImageGenerator,
    fetcher: ImageFetcher,
}

impl std::fmt::Debug for GenerationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationGateway").finish_non_exhaustive()
    }
}

impl GenerationGateway {
    pub fn new(generator: DynImageGenerator) -> Result<Self> {
        Ok(Self {
            generator,
            fetcher: ImageFetcher::new()?,
        })
    }

    pub fn with_fetcher(generator: DynImageGenerator, fetcher: ImageFetcher) -> Self {
        Self { generator, fetcher }
    }

    /// Dress `base` in `garments` and return the squared result.
    pub async fn apply_garments(&self, base: &ImageRef, garments: &[ImageRef]) -> Result<ImageRef> {
        if garments.is_empty() {
            return Err(TryOnError::validation(
                "garments",
                "Select at least one garment to apply",
            ));
        }
        let base = self.load(base).await?;
        let garments = try_join_all(garments.iter().map(|g| self.load(g))).await?;
        debug!("Applying {} garment(s)", garments.len());
        let output = self.generator.apply_garments(&base, &garments).await?;
        Self::finish(output)
    }

    /// Re-render `base` under `pose_instruction` and return the squared result.
    pub async fn change_pose(&self, base: &ImageRef, pose_instruction: &str) -> Result<ImageRef> {
        let base = self.load(base).await?;
        debug!("Changing pose to '{}'", pose_instruction);
        let output = self.generator.change_pose(&base, pose_instruction).await?;
        Self::finish(output)
    }

    /// Remove the background of an image. The result keeps its own shape.
    pub async fn remove_background(&self, image: &ImageData) -> Result<ImageData> {
        Self::check_supported(image)?;
        self.generator.remove_background(image).await
    }

    /// Produce a square studio model picture from a photo.
    pub async fn generate_model_image(&self, photo: &ImageData) -> Result<ImageRef> {
        Self::check_supported(photo)?;
        let output = self.generator.generate_model_image(photo).await?;
        Self::finish(output)
    }

    /// Load the bytes behind a reference.
    pub async fn load(&self, reference: &ImageRef) -> Result<ImageData> {
        let data = match reference.source()? {
            ImageSource::Inline(data) => data,
            ImageSource::Remote(url) => self.fetcher.fetch(&url).await?,
        };
        Self::check_supported(&data)?;
        Ok(data)
    }

    fn check_supported(image: &ImageData) -> Result<()> {
        if is_supported_mime(&image.mime_type) {
            Ok(())
        } else {
            Err(TryOnError::UnsupportedInput {
                mime_type: image.mime_type.clone(),
            })
        }
    }

    fn finish(output: ImageData) -> Result<ImageRef> {
        let squared = enforce_square(output)?;
        Ok(ImageRef::from(&squared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{solid_png, ScriptedGenerator};

    fn gateway() -> (Arc<ScriptedGenerator>, GenerationGateway) {
        let generator = Arc::new(ScriptedGenerator::new());
        let gateway = GenerationGateway::new(generator.clone()).unwrap();
        (generator, gateway)
    }

    #[tokio::test]
    async fn test_apply_garments_requires_garments() {
        let (generator, gateway) = gateway();
        let base = ImageRef::from(&solid_png(4, 4, [1, 1, 1]));
        let err = gateway.apply_garments(&base, &[]).await.unwrap_err();
        assert!(matches!(err, TryOnError::Validation { .. }));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_input_is_rejected_before_calling() {
        let (generator, gateway) = gateway();
        let base = ImageRef::from(&ImageData::new("image/avif", vec![0, 1, 2]));
        let err = gateway.change_pose(&base, "Side profile view").await.unwrap_err();
        assert!(matches!(err, TryOnError::UnsupportedInput { mime_type } if mime_type == "image/avif"));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_outputs_are_squared() {
        let (generator, gateway) = gateway();
        generator.set_output_size(6, 3);
        let base = ImageRef::from(&solid_png(4, 4, [1, 1, 1]));

        let posed = gateway.change_pose(&base, "Side profile view").await.unwrap();
        let data = posed.inline_data().unwrap().unwrap();
        assert_eq!(data.dimensions().unwrap(), (6, 6));

        // Background removal keeps the generator's shape
        let cut = gateway
            .remove_background(&solid_png(4, 4, [1, 1, 1]))
            .await
            .unwrap();
        assert_eq!(cut.dimensions().unwrap(), (6, 3));
    }

    #[tokio::test]
    async fn test_generator_errors_propagate() {
        let (generator, gateway) = gateway();
        generator.fail_next(TryOnError::Blocked {
            reason: "SAFETY".into(),
            message: String::new(),
        });
        let base = ImageRef::from(&solid_png(4, 4, [1, 1, 1]));
        let garment = ImageRef::from(&solid_png(2, 2, [9, 9, 9]));
        let err = gateway.apply_garments(&base, &[garment]).await.unwrap_err();
        assert!(matches!(err, TryOnError::Blocked { .. }));
        assert_eq!(generator.call_count(), 1);
    }
}
