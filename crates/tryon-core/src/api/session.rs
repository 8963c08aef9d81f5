//! Outfit session and cache maintenance.

use crate::error::{Result, TryOnError};
use crate::outfit::OutfitStackManager;
use crate::TryOnStudio;
use std::sync::Arc;
use tracing::{debug, info};

impl TryOnStudio {
    /// The outfit session for the saved model, starting one if needed.
    ///
    /// Fails with a validation error when no model has been saved.
    pub async fn session(&self) -> Result<Arc<OutfitStackManager>> {
        if let Some(session) = self.current_session() {
            return Ok(session);
        }

        let model = self.load_model().await?.ok_or_else(|| {
            TryOnError::validation("model", "No model picture saved; set or create one first")
        })?;

        let mut slot = self.session.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        // Another caller may have started one while the model loaded
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }
        let session = Arc::new(OutfitStackManager::new(
            model.image_url,
            self.gateway().clone(),
            self.poses().clone(),
        ));
        *slot = Some(Arc::clone(&session));
        info!("Started outfit session");
        Ok(session)
    }

    /// The open session, if any.
    pub fn current_session(&self) -> Option<Arc<OutfitStackManager>> {
        self.current_session_slot().clone()
    }

    /// Delete expired cache entries now. Returns how many were removed.
    pub async fn purge_expired_cache(&self) -> Result<usize> {
        let purged = self.store().await?.cache().purge_expired()?;
        debug!("Purged {} cache entries", purged);
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::TryOnError;
    use crate::models::ImageRef;
    use crate::store::ManualClock;
    use crate::testing::{solid_png, ScriptedGenerator};
    use crate::TryOnStudio;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_session_requires_model() {
        let studio = TryOnStudio::builder("unused")
            .in_memory(true)
            .with_generator(Arc::new(ScriptedGenerator::new()))
            .build()
            .await
            .unwrap();
        assert!(matches!(
            studio.session().await.unwrap_err(),
            TryOnError::Validation { .. }
        ));

        let model = ImageRef::from(&solid_png(4, 4, [1, 2, 3]));
        studio.save_model(&model).await.unwrap();
        let first = studio.session().await.unwrap();
        let second = studio.session().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.model_image(), &model);

        // A new model starts a fresh session
        studio
            .save_model(&ImageRef::from(&solid_png(4, 4, [3, 2, 1])))
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &studio.session().await.unwrap()));
    }

    #[tokio::test]
    async fn test_purge_expired_cache() {
        let clock = ManualClock::default();
        let studio = TryOnStudio::builder("unused")
            .in_memory(true)
            .with_clock(Arc::new(clock.clone()))
            .with_generator(Arc::new(ScriptedGenerator::new()))
            .build()
            .await
            .unwrap();
        let cache = studio.store().await.unwrap().cache();
        cache.put("a", &1).unwrap();
        clock.advance(Duration::from_secs(25 * 3600));
        cache.put("b", &2).unwrap();

        assert_eq!(studio.purge_expired_cache().await.unwrap(), 1);
        assert_eq!(cache.get::<i32>("b").unwrap(), Some(2));
    }
}
