//! Outfit layers and their per-pose image caches.

use crate::models::{ImageRef, WardrobeItem};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a layer; the single-flight key half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerKey(u64);

impl LayerKey {
    fn next() -> Self {
        Self(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What a layer shows.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// The unmodified model picture at the bottom of every stack.
    Base { model_image: ImageRef },
    /// A set of garments applied on top of the layer beneath.
    Dressed { garments: Vec<WardrobeItem> },
}

/// One applied outfit state.
///
/// The pose map only ever grows; entries are kept in the order they were
/// resolved, and the oldest one is the layer's canonical image.
#[derive(Debug)]
pub struct OutfitLayer {
    key: LayerKey,
    kind: LayerKind,
    pose_images: RwLock<Vec<(String, ImageRef)>>,
}

pub type LayerHandle = Arc<OutfitLayer>;

impl OutfitLayer {
    pub(crate) fn base(model_image: ImageRef) -> LayerHandle {
        Arc::new(Self {
            key: LayerKey::next(),
            kind: LayerKind::Base { model_image },
            pose_images: RwLock::new(Vec::new()),
        })
    }

    pub(crate) fn dressed(
        garments: Vec<WardrobeItem>,
        pose: impl Into<String>,
        image: ImageRef,
    ) -> LayerHandle {
        Arc::new(Self {
            key: LayerKey::next(),
            kind: LayerKind::Dressed { garments },
            pose_images: RwLock::new(vec![(pose.into(), image)]),
        })
    }

    pub fn key(&self) -> LayerKey {
        self.key
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn is_base(&self) -> bool {
        matches!(self.kind, LayerKind::Base { .. })
    }

    /// Garments in selection order; empty for the base layer.
    pub fn garments(&self) -> &[WardrobeItem] {
        match &self.kind {
            LayerKind::Base { .. } => &[],
            LayerKind::Dressed { garments } => garments,
        }
    }

    pub fn pose_image(&self, pose: &str) -> Option<ImageRef> {
        self.read()
            .iter()
            .find(|(p, _)| p == pose)
            .map(|(_, image)| image.clone())
    }

    /// The first image ever stored on this layer.
    pub fn canonical_image(&self) -> Option<ImageRef> {
        self.read().first().map(|(_, image)| image.clone())
    }

    /// Image to show for `pose`, falling back to the canonical image and,
    /// on the base layer, to the model picture.
    pub fn display_image(&self, pose: &str) -> Option<ImageRef> {
        self.pose_image(pose)
            .or_else(|| self.canonical_image())
            .or_else(|| match &self.kind {
                LayerKind::Base { model_image } => Some(model_image.clone()),
                LayerKind::Dressed { .. } => None,
            })
    }

    /// Poses resolved so far, oldest first.
    pub fn resolved_poses(&self) -> Vec<String> {
        self.read().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn pose_count(&self) -> usize {
        self.read().len()
    }

    /// Record an image for `pose`. A second write for the same pose replaces
    /// the image but keeps the entry's position.
    pub(crate) fn insert_pose_image(&self, pose: &str, image: ImageRef) {
        let mut entries = self.pose_images.write().unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|(p, _)| p == pose) {
            Some(entry) => entry.1 = image,
            None => entries.push((pose.to_string(), image)),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<(String, ImageRef)>> {
        self.pose_images.read().unwrap_or_else(PoisonError::into_inner)
    }
}
