//! Try-On Core - outfit layering and pose-image caching for virtual try-on.
//!
//! The crate is headless: a presentation layer drives it through
//! [`TryOnStudio`] and renders the [`OutfitView`] snapshots it hands back.
//!
//! # Example
//!
//! ```rust,no_run
//! use tryon_core::{ImageData, TryOnStudio};
//!
//! #[tokio::main]
//! async fn main() -> tryon_core::Result<()> {
//!     let studio = TryOnStudio::builder("./tryon-data")
//!         .auto_create_dirs(true)
//!         .build()
//!         .await?;
//!
//!     studio.save_model_image(&ImageData::from_path("me.png")?).await?;
//!     let session = studio.session().await?;
//!
//!     let jeans = studio.wardrobe_item("jeans-main").await.expect("seeded");
//!     session.toggle_garment(jeans);
//!     session.fit_outfit().await?;
//!     session.select_pose(2).await?;
//!
//!     println!("{}", session.view().display_image);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod outfit;
pub mod store;
pub mod wardrobe;

mod api;

#[cfg(test)]
mod testing;

pub use error::{ErrorKind, ErrorNotice, Result, TryOnError};
pub use gateway::{DynImageGenerator, GeminiClient, GenerationGateway, ImageGenerator};
pub use models::{
    default_wardrobe, CropRect, ImageData, ImageRef, ItemCategory, UserModel, WardrobeItem,
};
pub use outfit::{
    Dispatch, LayerHandle, OutfitLayer, OutfitStackManager, OutfitView, PendingSelection,
    PoseCatalog, PoseImageResolver, PoseState,
};
pub use store::{CacheRepository, Clock, LazyStore, ManualClock, Store, StoreLocation, SystemClock};
pub use wardrobe::{GarmentImport, GarmentImporter, WardrobeCatalog};

pub use api::TryOnStudioBuilder;

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Entry point for the try-on core.
///
/// Owns the lazily opened store, the generation gateway, the wardrobe
/// catalog and at most one outfit session for the saved model.
pub struct TryOnStudio {
    /// Directory holding the database
    data_dir: PathBuf,
    store: LazyStore,
    gateway: GenerationGateway,
    poses: PoseCatalog,
    /// Loaded on first use
    wardrobe: tokio::sync::Mutex<Option<WardrobeCatalog>>,
    session: RwLock<Option<Arc<OutfitStackManager>>>,
}

impl std::fmt::Debug for TryOnStudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TryOnStudio")
            .field("data_dir", &self.data_dir)
            .field("store", self.store.location())
            .finish_non_exhaustive()
    }
}

impl TryOnStudio {
    /// Create a builder for TryOnStudio.
    ///
    /// ```rust,ignore
    /// let studio = TryOnStudio::builder("./tryon-data")
    ///     .auto_create_dirs(true)
    ///     .build()
    ///     .await?;
    /// ```
    pub fn builder(data_dir: impl Into<PathBuf>) -> TryOnStudioBuilder {
        TryOnStudioBuilder::new(data_dir)
    }

    /// Open a studio over an existing data directory, generating with
    /// the hosted model configured from the environment.
    pub async fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(data_dir).build().await
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_location(&self) -> &StoreLocation {
        self.store.location()
    }

    pub fn poses(&self) -> &PoseCatalog {
        &self.poses
    }

    pub fn gateway(&self) -> &GenerationGateway {
        &self.gateway
    }

    /// The store, opened on first use.
    pub async fn store(&self) -> Result<&Store> {
        self.store.get().await
    }

    /// Close the store if it was opened. Later store access fails.
    pub fn close(&self) -> Result<()> {
        self.drop_session();
        match self.store.get_if_open() {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }

    fn current_session_slot(&self) -> std::sync::RwLockReadGuard<'_, Option<Arc<OutfitStackManager>>> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace_session(&self, session: Option<Arc<OutfitStackManager>>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn drop_session(&self) {
        self.replace_session(None);
    }
}
