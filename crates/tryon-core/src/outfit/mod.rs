//! Outfit layers, pose-image caching and the session state machine.
//!
//! - [`PoseCatalog`]: the enumerated pose instructions
//! - [`OutfitLayer`]: one applied garment set with its pose-keyed images
//! - [`PoseImageResolver`]: cache lookup plus single-flight generation
//! - [`OutfitStackManager`]: the layer stack, selection and busy protocol

mod layer;
mod manager;
mod pose_state;
mod poses;
mod resolver;
mod selection;

pub use layer::{LayerHandle, LayerKey, LayerKind, OutfitLayer};
pub use manager::{Dispatch, OutfitStackManager, OutfitView};
pub use pose_state::{reduce, PoseEvent, PoseState};
pub use poses::PoseCatalog;
pub use resolver::PoseImageResolver;
pub use selection::{PendingSelection, SelectionChange};
