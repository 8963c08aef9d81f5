//! Builder for configuring TryOnStudio initialization.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::{Result, TryOnError};
use crate::gateway::{DynImageGenerator, GeminiClient, GenerationGateway};
use crate::outfit::PoseCatalog;
use crate::store::{Clock, LazyStore, StoreLocation, SystemClock};
use crate::TryOnStudio;

/// Builder for configuring TryOnStudio initialization.
///
/// # Example
///
/// ```rust,ignore
/// let studio = TryOnStudio::builder("./tryon-data")
///     .auto_create_dirs(true)
///     .with_generator(Arc::new(my_generator))
///     .build()
///     .await?;
/// ```
pub struct TryOnStudioBuilder {
    data_dir: PathBuf,
    auto_create_dirs: bool,
    in_memory: bool,
    generator: Option<DynImageGenerator>,
    clock: Option<Arc<dyn Clock>>,
    poses: Option<PoseCatalog>,
}

impl TryOnStudioBuilder {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            auto_create_dirs: false,
            in_memory: false,
            generator: None,
            clock: None,
            poses: None,
        }
    }

    /// Create the data directory if it doesn't exist.
    ///
    /// Default: `false` (the directory must exist)
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    /// Keep everything in a private in-memory database.
    ///
    /// The data directory is neither checked nor created.
    pub fn in_memory(mut self, enable: bool) -> Self {
        self.in_memory = enable;
        self
    }

    /// Use this generator instead of the hosted model.
    ///
    /// Default: a [`GeminiClient`] configured from the environment
    pub fn with_generator(mut self, generator: DynImageGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Time source for cache expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_poses(mut self, poses: PoseCatalog) -> Self {
        self.poses = Some(poses);
        self
    }

    fn prepare_data_dir(&self) -> Result<()> {
        if self.in_memory {
            return Ok(());
        }
        if self.auto_create_dirs {
            if !self.data_dir.exists() {
                std::fs::create_dir_all(&self.data_dir).map_err(|e| TryOnError::Io {
                    message: format!("Failed to create data directory: {}", self.data_dir.display()),
                    path: Some(self.data_dir.clone()),
                    source: Some(e),
                })?;
            }
        } else if !self.data_dir.exists() {
            return Err(TryOnError::Config {
                message: format!("Data directory does not exist: {}", self.data_dir.display()),
            });
        }
        Ok(())
    }

    /// Database path inside a data directory.
    pub fn db_path(data_dir: &Path) -> PathBuf {
        data_dir.join(StoreConfig::DB_FILE_NAME)
    }

    /// Build the TryOnStudio instance.
    ///
    /// The store is not opened here; the first operation that needs it does.
    pub async fn build(self) -> Result<TryOnStudio> {
        self.prepare_data_dir()?;

        let generator: DynImageGenerator = match self.generator {
            Some(generator) => generator,
            None => Arc::new(GeminiClient::from_env()?),
        };
        let gateway = GenerationGateway::new(generator)?;

        let location = if self.in_memory {
            StoreLocation::Memory
        } else {
            StoreLocation::File(Self::db_path(&self.data_dir))
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        tracing::debug!("Building try-on studio over {:?}", location);
        Ok(TryOnStudio {
            data_dir: self.data_dir,
            store: LazyStore::new(location, clock),
            gateway,
            poses: self.poses.unwrap_or_default(),
            wardrobe: tokio::sync::Mutex::new(None),
            session: std::sync::RwLock::new(None),
        })
    }
}
