//! The garment selection waiting to be fitted.

use crate::models::{ItemCategory, WardrobeItem};
use serde::Serialize;

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Selected,
    Deselected,
    /// Another garment of the same category was swapped out.
    Replaced,
}

/// At most one garment per category, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PendingSelection {
    items: Vec<WardrobeItem>,
}

impl PendingSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle `item` into its category slot.
    ///
    /// Re-toggling the selected garment clears the slot. A different garment
    /// takes the slot over and moves to the end of the selection order.
    pub fn toggle(&mut self, item: WardrobeItem) -> SelectionChange {
        match self.items.iter().position(|i| i.category == item.category) {
            Some(idx) if self.items[idx].id == item.id => {
                self.items.remove(idx);
                SelectionChange::Deselected
            }
            Some(idx) => {
                self.items.remove(idx);
                self.items.push(item);
                SelectionChange::Replaced
            }
            None => {
                self.items.push(item);
                SelectionChange::Selected
            }
        }
    }

    pub fn get(&self, category: ItemCategory) -> Option<&WardrobeItem> {
        self.items.iter().find(|i| i.category == category)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    pub fn items(&self) -> &[WardrobeItem] {
        &self.items
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageRef;
    use std::collections::HashSet;

    fn item(id: &str, category: ItemCategory) -> WardrobeItem {
        WardrobeItem::new(id, id, ImageRef::new(format!("https://example.com/{id}.png")), category)
    }

    #[test]
    fn test_toggle_same_item_deselects() {
        let mut selection = PendingSelection::new();
        let shirt = item("shirt", ItemCategory::Top);
        assert_eq!(selection.toggle(shirt.clone()), SelectionChange::Selected);
        assert_eq!(selection.toggle(shirt), SelectionChange::Deselected);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_same_category_replaces_and_moves_to_end() {
        let mut selection = PendingSelection::new();
        selection.toggle(item("shirt", ItemCategory::Top));
        selection.toggle(item("jeans", ItemCategory::Bottom));
        assert_eq!(selection.toggle(item("polo", ItemCategory::Top)), SelectionChange::Replaced);

        assert_eq!(selection.ids(), vec!["jeans", "polo"]);
        assert_eq!(selection.get(ItemCategory::Top).unwrap().id, "polo");
        assert!(!selection.contains("shirt"));
    }

    #[test]
    fn test_at_most_one_per_category_over_any_sequence() {
        let pool = [
            item("a", ItemCategory::Top),
            item("b", ItemCategory::Top),
            item("c", ItemCategory::Bottom),
            item("d", ItemCategory::Shoes),
            item("e", ItemCategory::Bottom),
        ];
        let mut selection = PendingSelection::new();
        // Deterministic pseudo-random walk over the pool
        let mut state: u32 = 7;
        for _ in 0..200 {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let pick = &pool[(state >> 16) as usize % pool.len()];
            selection.toggle(pick.clone());

            let categories: HashSet<_> = selection.items().iter().map(|i| i.category).collect();
            assert_eq!(categories.len(), selection.len());
        }
    }
}
