//! The wardrobe catalog collection.

use super::Store;
use crate::error::{Result, TryOnError};
use crate::models::{ImageRef, ItemCategory, WardrobeItem};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const UPSERT_ITEM: &str = "INSERT INTO wardrobe (id, name, url, category) VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(id) DO UPDATE SET
         name = excluded.name,
         url = excluded.url,
         category = excluded.category";

/// Access to the `wardrobe` collection.
///
/// Items come back in first-insertion order; updating an item keeps its slot.
#[derive(Debug, Clone)]
pub struct WardrobeRepository {
    store: Store,
}

impl WardrobeRepository {
    pub(crate) fn new(store: Store) -> Self {
        Self { store }
    }

    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn into_item(
        (id, name, url, category): (String, String, String, String),
    ) -> Result<WardrobeItem> {
        let category: ItemCategory = category.parse().map_err(|_| {
            TryOnError::storage(format!("Wardrobe item {id} has unknown category '{category}'"))
        })?;
        Ok(WardrobeItem {
            id,
            name,
            url: ImageRef::new(url),
            category,
        })
    }

    fn upsert(conn: &Connection, item: &WardrobeItem) -> Result<()> {
        conn.execute(
            UPSERT_ITEM,
            params![item.id, item.name, item.url.as_str(), item.category.as_str()],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<WardrobeItem>> {
        let row = self.store.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name, url, category FROM wardrobe WHERE id = ?1",
                    params![id],
                    Self::row_to_item,
                )
                .optional()?)
        })?;
        row.map(Self::into_item).transpose()
    }

    pub fn get_all(&self) -> Result<Vec<WardrobeItem>> {
        let rows = self.store.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, url, category FROM wardrobe ORDER BY rowid")?;
            let rows = stmt
                .query_map([], Self::row_to_item)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;
        rows.into_iter().map(Self::into_item).collect()
    }

    /// Insert or replace one item.
    pub fn put(&self, item: &WardrobeItem) -> Result<()> {
        self.store.with_conn(|conn| Self::upsert(conn, item))?;
        debug!("Saved wardrobe item {}", item.id);
        Ok(())
    }

    /// Insert or replace many items in one transaction: all or nothing.
    pub fn put_all(&self, items: &[WardrobeItem]) -> Result<()> {
        self.store.with_conn(|conn| {
            let tx = conn.transaction()?;
            for item in items {
                Self::upsert(&tx, item)?;
            }
            tx.commit()?;
            Ok(())
        })?;
        debug!("Saved {} wardrobe items", items.len());
        Ok(())
    }

    /// Delete an item. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.store.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM wardrobe WHERE id = ?1", params![id])?)
        })?;
        Ok(deleted > 0)
    }

    pub fn count(&self) -> Result<usize> {
        self.store.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM wardrobe", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_wardrobe;

    fn item(id: &str, category: ItemCategory) -> WardrobeItem {
        WardrobeItem::new(
            id,
            id.to_uppercase(),
            ImageRef::new(format!("https://example.com/{id}.png")),
            category,
        )
    }

    #[test]
    fn test_crud() {
        let store = Store::open_in_memory().unwrap();
        let repo = store.wardrobe();

        repo.put(&item("coat", ItemCategory::Outerwear)).unwrap();
        assert_eq!(repo.get("coat").unwrap().unwrap().name, "COAT");
        assert!(repo.get("missing").unwrap().is_none());

        let mut renamed = item("coat", ItemCategory::Outerwear);
        renamed.name = "Winter coat".into();
        repo.put(&renamed).unwrap();
        assert_eq!(repo.get("coat").unwrap().unwrap().name, "Winter coat");
        assert_eq!(repo.count().unwrap(), 1);

        assert!(repo.delete("coat").unwrap());
        assert!(!repo.delete("coat").unwrap());
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_get_all_keeps_insertion_order_across_updates() {
        let store = Store::open_in_memory().unwrap();
        let repo = store.wardrobe();
        repo.put_all(&default_wardrobe()).unwrap();

        let mut first = default_wardrobe().remove(0);
        first.category = ItemCategory::Outerwear;
        repo.put(&first).unwrap();

        let ids: Vec<_> = repo.get_all().unwrap().into_iter().map(|i| i.id).collect();
        let expected: Vec<_> = default_wardrobe().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, expected);
        assert_eq!(
            repo.get(&first.id).unwrap().unwrap().category,
            ItemCategory::Outerwear
        );
    }

    #[test]
    fn test_put_all_is_atomic() {
        let store = Store::open_in_memory().unwrap();
        let repo = store.wardrobe();
        repo.put(&item("keep", ItemCategory::Top)).unwrap();

        // A failing insert on the last row rolls back the whole batch
        store
            .with_conn(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_poison BEFORE INSERT ON wardrobe
                     WHEN NEW.id = 'poison'
                     BEGIN SELECT RAISE(ABORT, 'poisoned'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        let batch = vec![
            item("a", ItemCategory::Top),
            item("b", ItemCategory::Bottom),
            item("poison", ItemCategory::Shoes),
        ];
        assert!(repo.put_all(&batch).is_err());

        let ids: Vec<_> = repo.get_all().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["keep"]);
    }

    #[test]
    fn test_unknown_category_is_a_storage_error() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO wardrobe (id, name, url, category) VALUES ('x', 'X', 'u', 'hat')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        let err = store.wardrobe().get("x").unwrap_err();
        assert!(matches!(err, TryOnError::Storage { .. }));
    }
}
