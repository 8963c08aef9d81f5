//! User model lifecycle.

use crate::error::Result;
use crate::models::{ImageData, ImageRef, UserModel};
use crate::outfit::Dispatch;
use crate::TryOnStudio;
use tracing::info;

impl TryOnStudio {
    /// The saved model picture, if any.
    pub async fn load_model(&self) -> Result<Option<UserModel>> {
        self.store().await?.user_model().get()
    }

    /// Save `image` as the model picture. Any open session is discarded.
    pub async fn save_model(&self, image: &ImageRef) -> Result<UserModel> {
        let model = self.store().await?.user_model().put(image)?;
        self.drop_session();
        info!("Saved model picture {}", image);
        Ok(model)
    }

    /// Save an image payload as the model picture.
    pub async fn save_model_image(&self, image: &ImageData) -> Result<UserModel> {
        let image = self.gateway().load(&ImageRef::from(image)).await?;
        self.save_model(&ImageRef::from(&image)).await
    }

    /// Generate a studio model picture from a photo and save it.
    pub async fn create_model_from_photo(&self, photo: &ImageData) -> Result<UserModel> {
        let image = self.gateway().generate_model_image(photo).await?;
        self.save_model(&image).await
    }

    /// Delete the saved model picture and discard the session.
    pub async fn delete_model(&self) -> Result<bool> {
        let deleted = self.store().await?.user_model().delete()?;
        self.drop_session();
        Ok(deleted)
    }

    /// Throw away the model and the outfit built on it.
    ///
    /// Ignored while the session is busy. The session is only reset once the
    /// model is gone, so a failed delete leaves both intact. The wardrobe is
    /// untouched.
    pub async fn start_over(&self) -> Result<Dispatch> {
        let session = self.current_session();
        if session.as_ref().is_some_and(|s| s.is_busy()) {
            return Ok(Dispatch::Ignored);
        }
        self.delete_model().await?;
        if let Some(session) = session {
            session.start_over();
        }
        info!("Started over");
        Ok(Dispatch::Applied)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::TryOnError;
    use crate::models::{ImageData, ImageRef, ItemCategory, WardrobeItem};
    use crate::outfit::Dispatch;
    use crate::testing::{solid_png, GeneratorCall, ScriptedGenerator};
    use crate::TryOnStudio;
    use std::sync::Arc;

    async fn studio() -> (Arc<ScriptedGenerator>, TryOnStudio) {
        let generator = Arc::new(ScriptedGenerator::new());
        let studio = TryOnStudio::builder("unused")
            .in_memory(true)
            .with_generator(generator.clone())
            .build()
            .await
            .unwrap();
        (generator, studio)
    }

    #[tokio::test]
    async fn test_model_round_trip() {
        let (_generator, studio) = studio().await;
        assert!(studio.load_model().await.unwrap().is_none());

        let image = ImageRef::from(&solid_png(4, 4, [1, 2, 3]));
        studio.save_model(&image).await.unwrap();
        assert_eq!(studio.load_model().await.unwrap().unwrap().image_url, image);

        assert!(studio.delete_model().await.unwrap());
        assert!(studio.load_model().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_model_from_photo_saves_square_result() {
        let (generator, studio) = studio().await;
        generator.set_output_size(3, 5);

        let model = studio
            .create_model_from_photo(&solid_png(8, 8, [7, 7, 7]))
            .await
            .unwrap();
        assert_eq!(generator.calls(), vec![GeneratorCall::GenerateModel]);
        let saved = model.image_url.inline_data().unwrap().unwrap();
        assert_eq!(saved.dimensions().unwrap(), (5, 5));
        assert_eq!(studio.load_model().await.unwrap().unwrap(), model);
    }

    #[tokio::test]
    async fn test_unsupported_model_image_is_rejected() {
        let (_generator, studio) = studio().await;
        let err = studio
            .save_model_image(&ImageData::new("application/pdf", vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, TryOnError::UnsupportedInput { .. }));
    }

    #[tokio::test]
    async fn test_start_over_deletes_model_and_session() {
        let (_generator, studio) = studio().await;
        studio
            .save_model(&ImageRef::from(&solid_png(4, 4, [1, 2, 3])))
            .await
            .unwrap();
        studio.session().await.unwrap();

        assert_eq!(studio.start_over().await.unwrap(), Dispatch::Applied);
        assert!(studio.load_model().await.unwrap().is_none());
        assert!(studio.current_session().is_none());
    }

    #[tokio::test]
    async fn test_failed_start_over_keeps_session() {
        let (_generator, studio) = studio().await;
        studio
            .save_model(&ImageRef::from(&solid_png(4, 4, [1, 2, 3])))
            .await
            .unwrap();
        let session = studio.session().await.unwrap();
        session.toggle_garment(WardrobeItem::new(
            "tee",
            "Tee",
            ImageRef::from(&solid_png(2, 2, [9, 9, 9])),
            ItemCategory::Top,
        ));
        session.fit_outfit().await.unwrap();

        studio.store().await.unwrap().close().unwrap();
        let err = studio.start_over().await.unwrap_err();
        assert!(matches!(err, TryOnError::Storage { .. }));

        let current = studio.current_session().unwrap();
        assert!(Arc::ptr_eq(&current, &session));
        assert_eq!(session.layer_count(), 1);
    }
}
