//! The wardrobe catalog and garment import.
//!
//! The in-memory catalog is authoritative for the session. Every change is
//! written through to the store when one is attached; a failed write is
//! logged and the session carries on with the in-memory state.

use crate::config::{is_supported_mime, WardrobeConfig};
use crate::error::{Result, TryOnError};
use crate::gateway::GenerationGateway;
use crate::models::{default_wardrobe, CropRect, ImageData, ImageRef, ItemCategory, WardrobeItem};
use crate::store::{CacheRepository, Store, WardrobeRepository};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The user's garments.
#[derive(Debug)]
pub struct WardrobeCatalog {
    items: Vec<WardrobeItem>,
    repo: Option<WardrobeRepository>,
}

impl WardrobeCatalog {
    /// A catalog that is never persisted.
    pub fn in_memory(items: Vec<WardrobeItem>) -> Self {
        Self { items, repo: None }
    }

    /// Load the saved catalog, seeding the defaults into an empty store.
    ///
    /// Never fails: storage errors fall back to the default catalog.
    pub fn load_or_seed(store: Option<&Store>) -> Self {
        let Some(store) = store else {
            return Self::in_memory(default_wardrobe());
        };
        let repo = store.wardrobe();

        let items = match repo.get_all() {
            Ok(items) if !items.is_empty() => {
                debug!("Loaded {} wardrobe items", items.len());
                items
            }
            Ok(_) => {
                let defaults = default_wardrobe();
                match repo.put_all(&defaults) {
                    Ok(()) => info!("Seeded wardrobe with {} default items", defaults.len()),
                    Err(e) => warn!("Failed to seed wardrobe: {}", e),
                }
                defaults
            }
            Err(e) => {
                warn!("Failed to load wardrobe, using defaults: {}", e);
                default_wardrobe()
            }
        };

        Self {
            items,
            repo: Some(repo),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.repo.is_some()
    }

    pub fn items(&self) -> &[WardrobeItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&WardrobeItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Add an item unless one with the same id exists. Returns whether it was added.
    pub fn add(&mut self, item: WardrobeItem) -> bool {
        if self.get(&item.id).is_some() {
            debug!("Wardrobe already contains {}", item.id);
            return false;
        }
        self.persist(&item);
        self.items.push(item);
        true
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<&WardrobeItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TryOnError::validation("name", "Item name must not be empty"));
        }
        let name = name.to_string();
        self.update(id, |item| item.name = name)
    }

    pub fn recategorize(&mut self, id: &str, category: ItemCategory) -> Result<&WardrobeItem> {
        self.update(id, |item| item.category = category)
    }

    /// Remove an item, returning it if it existed.
    pub fn remove(&mut self, id: &str) -> Option<WardrobeItem> {
        let idx = self.items.iter().position(|i| i.id == id)?;
        let item = self.items.remove(idx);
        if let Some(repo) = &self.repo {
            if let Err(e) = repo.delete(id) {
                warn!("Failed to delete wardrobe item {}: {}", id, e);
            }
        }
        Some(item)
    }

    /// Non-empty categories in display order, items in catalog order.
    pub fn grouped(&self) -> Vec<(ItemCategory, Vec<&WardrobeItem>)> {
        ItemCategory::ALL
            .into_iter()
            .map(|category| {
                let items: Vec<_> = self.items.iter().filter(|i| i.category == category).collect();
                (category, items)
            })
            .filter(|(_, items)| !items.is_empty())
            .collect()
    }

    fn update(&mut self, id: &str, change: impl FnOnce(&mut WardrobeItem)) -> Result<&WardrobeItem> {
        let idx = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| TryOnError::validation("id", format!("No wardrobe item with id {id}")))?;
        change(&mut self.items[idx]);
        self.persist(&self.items[idx]);
        Ok(&self.items[idx])
    }

    fn persist(&self, item: &WardrobeItem) {
        if let Some(repo) = &self.repo {
            if let Err(e) = repo.put(item) {
                warn!("Failed to save wardrobe item {}: {}", item.id, e);
            }
        }
    }
}

/// An uploaded garment picture and what to do with it.
#[derive(Debug, Clone)]
pub struct GarmentImport {
    pub image: ImageData,
    /// Original file name; the item name defaults to its stem.
    pub file_name: Option<String>,
    pub name: Option<String>,
    pub category: ItemCategory,
    pub crop: Option<CropRect>,
    pub remove_background: bool,
}

impl GarmentImport {
    pub fn new(image: ImageData, category: ItemCategory) -> Self {
        Self {
            image,
            file_name: None,
            name: None,
            category,
            crop: None,
            remove_background: false,
        }
    }

    /// Read the picture from disk, remembering its file name.
    pub fn from_path(path: impl AsRef<Path>, category: ItemCategory) -> Result<Self> {
        let path = path.as_ref();
        let mut import = Self::new(ImageData::from_path(path)?, category);
        import.file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(import)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_crop(mut self, crop: CropRect) -> Self {
        self.crop = Some(crop);
        self
    }

    pub fn with_background_removal(mut self, remove: bool) -> Self {
        self.remove_background = remove;
        self
    }

    /// Explicit name, else the file stem, else the default.
    pub fn item_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| self.file_name.as_deref().and_then(name_from_file))
            .unwrap_or_else(|| WardrobeConfig::DEFAULT_ITEM_NAME.to_string())
    }
}

fn name_from_file(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().trim().to_string())
        .filter(|stem| !stem.is_empty())
}

/// Turns uploads into wardrobe items.
pub struct GarmentImporter<'a> {
    gateway: &'a GenerationGateway,
    cache: Option<CacheRepository>,
}

impl<'a> GarmentImporter<'a> {
    pub fn new(gateway: &'a GenerationGateway, cache: Option<CacheRepository>) -> Self {
        Self { gateway, cache }
    }

    /// Build a new item from an upload.
    ///
    /// Background removal is memoized in the cache collection by content
    /// hash, so re-importing the same picture within the TTL costs no call.
    pub async fn import(&self, request: GarmentImport) -> Result<WardrobeItem> {
        if !is_supported_mime(&request.image.mime_type) {
            return Err(TryOnError::UnsupportedInput {
                mime_type: request.image.mime_type.clone(),
            });
        }
        let name = request.item_name();

        let mut image = request.image;
        if let Some(rect) = request.crop {
            image = image.crop(rect)?;
        }

        let url = if request.remove_background {
            self.remove_background_cached(&image).await?
        } else {
            ImageRef::from(&image)
        };

        let item = WardrobeItem::new(
            format!("{}{}", WardrobeConfig::CUSTOM_ID_PREFIX, Uuid::new_v4()),
            name,
            url,
            request.category,
        );
        info!("Imported garment {} ({})", item.id, item.name);
        Ok(item)
    }

    async fn remove_background_cached(&self, image: &ImageData) -> Result<ImageRef> {
        let key = format!("{}{}", WardrobeConfig::BACKGROUND_CACHE_PREFIX, image.sha256_hex());

        if let Some(cache) = &self.cache {
            match cache.get::<ImageRef>(&key) {
                Ok(Some(hit)) => {
                    debug!("Background removal cache hit");
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to read background removal cache: {}", e),
            }
        }

        let cut = self.gateway.remove_background(image).await?;
        let url = ImageRef::from(&cut);
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&key, &url) {
                warn!("Failed to cache background removal: {}", e);
            }
        }
        Ok(url)
    }
}
