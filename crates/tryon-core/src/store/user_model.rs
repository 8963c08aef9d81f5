//! The singleton user-model collection.

use super::Store;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::models::{ImageRef, UserModel};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

/// Access to the `user_model` collection.
#[derive(Debug, Clone)]
pub struct UserModelRepository {
    store: Store,
}

impl UserModelRepository {
    pub(crate) fn new(store: Store) -> Self {
        Self { store }
    }

    /// Load the saved model, if any.
    pub fn get(&self) -> Result<Option<UserModel>> {
        self.store.with_conn(|conn| {
            let image_url: Option<String> = conn
                .query_row(
                    "SELECT image_url FROM user_model WHERE id = ?1",
                    params![StoreConfig::USER_MODEL_ID],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(image_url.map(|url| UserModel {
                id: StoreConfig::USER_MODEL_ID.to_string(),
                image_url: ImageRef::new(url),
            }))
        })
    }

    /// Create or overwrite the saved model.
    pub fn put(&self, image_url: &ImageRef) -> Result<UserModel> {
        let now = self.store.now().to_rfc3339();
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_model (id, image_url, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                     image_url = excluded.image_url,
                     updated_at = excluded.updated_at",
                params![StoreConfig::USER_MODEL_ID, image_url.as_str(), now],
            )?;
            Ok(())
        })?;
        debug!("Saved user model");
        Ok(UserModel {
            id: StoreConfig::USER_MODEL_ID.to_string(),
            image_url: image_url.clone(),
        })
    }

    /// Delete the saved model. Returns whether one existed.
    pub fn delete(&self) -> Result<bool> {
        let deleted = self.store.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM user_model WHERE id = ?1",
                params![StoreConfig::USER_MODEL_ID],
            )?)
        })?;
        debug!("Deleted user model ({} rows)", deleted);
        Ok(deleted > 0)
    }
}
