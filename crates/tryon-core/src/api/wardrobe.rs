//! Wardrobe operations.

use crate::error::Result;
use crate::models::{ItemCategory, WardrobeItem};
use crate::wardrobe::{GarmentImport, GarmentImporter, WardrobeCatalog};
use crate::TryOnStudio;
use tokio::sync::{MappedMutexGuard, MutexGuard};
use tracing::warn;

impl TryOnStudio {
    /// The catalog, loading or seeding it on first use.
    ///
    /// If the store cannot be opened the catalog falls back to the defaults
    /// and stays in memory for the rest of the process.
    async fn catalog(&self) -> MappedMutexGuard<'_, WardrobeCatalog> {
        let mut guard = self.wardrobe.lock().await;
        if guard.is_none() {
            let catalog = match self.store().await {
                Ok(store) => WardrobeCatalog::load_or_seed(Some(store)),
                Err(e) => {
                    warn!("Store unavailable, wardrobe will not be saved: {}", e);
                    WardrobeCatalog::load_or_seed(None)
                }
            };
            *guard = Some(catalog);
        }
        MutexGuard::map(guard, |slot| {
            slot.get_or_insert_with(|| WardrobeCatalog::load_or_seed(None))
        })
    }

    /// All garments in catalog order.
    pub async fn wardrobe_items(&self) -> Vec<WardrobeItem> {
        self.catalog().await.items().to_vec()
    }

    pub async fn wardrobe_item(&self, id: &str) -> Option<WardrobeItem> {
        self.catalog().await.get(id).cloned()
    }

    /// Garments grouped by category in display order.
    pub async fn wardrobe_grouped(&self) -> Vec<(ItemCategory, Vec<WardrobeItem>)> {
        self.catalog()
            .await
            .grouped()
            .into_iter()
            .map(|(category, items)| (category, items.into_iter().cloned().collect()))
            .collect()
    }

    /// Add a garment unless its id is taken. Returns whether it was added.
    pub async fn add_wardrobe_item(&self, item: WardrobeItem) -> bool {
        self.catalog().await.add(item)
    }

    pub async fn rename_wardrobe_item(&self, id: &str, name: &str) -> Result<WardrobeItem> {
        self.catalog().await.rename(id, name).cloned()
    }

    pub async fn recategorize_wardrobe_item(
        &self,
        id: &str,
        category: ItemCategory,
    ) -> Result<WardrobeItem> {
        self.catalog().await.recategorize(id, category).cloned()
    }

    pub async fn remove_wardrobe_item(&self, id: &str) -> Option<WardrobeItem> {
        self.catalog().await.remove(id)
    }

    /// Turn an upload into a garment and add it to the wardrobe.
    pub async fn import_garment(&self, request: GarmentImport) -> Result<WardrobeItem> {
        let cache = match self.store().await {
            Ok(store) => Some(store.cache()),
            Err(e) => {
                warn!("Store unavailable, background removal will not be cached: {}", e);
                None
            }
        };
        let item = GarmentImporter::new(self.gateway(), cache)
            .import(request)
            .await?;
        self.add_wardrobe_item(item.clone()).await;
        Ok(item)
    }
}
