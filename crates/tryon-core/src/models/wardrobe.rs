//! Wardrobe and user-model types.

use super::ImageRef;
use crate::error::{Result, TryOnError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Garment category. Each outfit holds at most one garment per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Top,
    Bottom,
    Outerwear,
    Shoes,
    Accessory,
}

impl ItemCategory {
    /// All categories in display order.
    pub const ALL: [ItemCategory; 5] = [
        ItemCategory::Top,
        ItemCategory::Bottom,
        ItemCategory::Outerwear,
        ItemCategory::Shoes,
        ItemCategory::Accessory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Top => "top",
            ItemCategory::Bottom => "bottom",
            ItemCategory::Outerwear => "outerwear",
            ItemCategory::Shoes => "shoes",
            ItemCategory::Accessory => "accessory",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCategory {
    type Err = TryOnError;

    fn from_str(s: &str) -> Result<Self> {
        ItemCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TryOnError::validation("category", format!("Unknown category: {s}")))
    }
}

/// A garment in the user's wardrobe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeItem {
    pub id: String,
    pub name: String,
    pub url: ImageRef,
    pub category: ItemCategory,
}

impl WardrobeItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: ImageRef,
        category: ItemCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url,
            category,
        }
    }
}

/// The singleton model record: the picture garments are applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserModel {
    pub id: String,
    pub image_url: ImageRef,
}

const CATALOG_BASE: &str = "https://raw.githubusercontent.com/daniele21/smart-wardrobe/main/examples";

/// The catalog seeded into an empty wardrobe.
pub fn default_wardrobe() -> Vec<WardrobeItem> {
    let item = |id: &str, name: &str, file: &str, category| {
        WardrobeItem::new(
            id,
            name,
            ImageRef::new(format!("{CATALOG_BASE}/{file}")),
            category,
        )
    };

    vec![
        item("white-tshirt", "White T-shirt", "tshirt.png", ItemCategory::Top),
        item("lightblue-shirt", "Lightblue", "shirt.png", ItemCategory::Top),
        item("polo-shirt", "Polo", "polo.png", ItemCategory::Top),
        item("jeans-main", "Jeans", "pant1.png", ItemCategory::Bottom),
        item("pants-blue", "Pants1", "pant2.png", ItemCategory::Bottom),
        item("pants-brown", "Pants2", "pant3.png", ItemCategory::Bottom),
    ]
}
