//! The outfit stack and the session state around it.
//!
//! All state lives behind one synchronous lock that is never held across a
//! generation call. A `busy` flag admits at most one mutating operation
//! (fit, pose change, layer pop, start over) at a time; requests made while
//! it is set are answered with [`Dispatch::Ignored`] rather than queued.
//! Every failure restores the last committed state exactly.

use super::layer::{LayerHandle, OutfitLayer};
use super::pose_state::{reduce, PoseEvent, PoseState};
use super::poses::PoseCatalog;
use super::resolver::PoseImageResolver;
use super::selection::PendingSelection;
use crate::error::{ErrorNotice, Result, TryOnError};
use crate::gateway::GenerationGateway;
use crate::models::{ImageRef, WardrobeItem};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

const FIT_CONTEXT: &str = "Failed to apply outfit";
const POSE_CONTEXT: &str = "Failed to change pose";

/// Whether a request was acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    /// Rejected as a no-op: busy, or nothing to do.
    Ignored,
}

/// Read-only snapshot for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitView {
    pub display_image: ImageRef,
    pub pose_index: usize,
    pub pose_instruction: String,
    /// Slot showing a loading affordance while a pose is generated.
    pub loading_pose: Option<usize>,
    /// Poses already available for the top layer, oldest first.
    pub resolved_poses: Vec<String>,
    pub layer_count: usize,
    pub can_change_pose: bool,
    pub busy: bool,
    pub error: Option<ErrorNotice>,
    pub pending_selection: Vec<WardrobeItem>,
    /// Ids of every garment worn across all layers, bottom to top.
    pub worn_garment_ids: Vec<String>,
}

struct SessionState {
    base: LayerHandle,
    layers: Vec<LayerHandle>,
    pose: PoseState,
    pending: PendingSelection,
    busy: bool,
    error: Option<ErrorNotice>,
}

impl SessionState {
    fn top(&self) -> &LayerHandle {
        self.layers.last().unwrap_or(&self.base)
    }
}

/// Owns one try-on session: the layer stack over a model picture.
pub struct OutfitStackManager {
    model_image: ImageRef,
    resolver: PoseImageResolver,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for OutfitStackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("OutfitStackManager")
            .field("layers", &state.layers.len())
            .field("pose", &state.pose)
            .field("busy", &state.busy)
            .finish_non_exhaustive()
    }
}

/// Clears `busy` if an operation's future is dropped before it settles.
struct BusyGuard<'a> {
    manager: &'a OutfitStackManager,
    armed: bool,
}

impl<'a> BusyGuard<'a> {
    fn settle(mut self) -> MutexGuard<'a, SessionState> {
        self.armed = false;
        let manager = self.manager;
        let mut state = manager.lock();
        state.busy = false;
        state
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.manager.lock();
            state.busy = false;
            state.pose = reduce(state.pose, PoseEvent::Failed);
            warn!("Outfit operation abandoned before completion");
        }
    }
}

impl OutfitStackManager {
    pub fn new(model_image: ImageRef, gateway: GenerationGateway, poses: PoseCatalog) -> Self {
        Self {
            state: Mutex::new(SessionState {
                base: OutfitLayer::base(model_image.clone()),
                layers: Vec::new(),
                pose: PoseState::default(),
                pending: PendingSelection::new(),
                busy: false,
                error: None,
            }),
            model_image,
            resolver: PoseImageResolver::new(gateway, poses),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> BusyGuard<'_> {
        BusyGuard {
            manager: self,
            armed: true,
        }
    }

    fn pose_name(&self, index: usize) -> &str {
        self.resolver.poses().get(index).unwrap_or(self.resolver.poses().first())
    }

    /// Toggle a garment in the pending selection. Ignored while busy.
    pub fn toggle_garment(&self, item: WardrobeItem) -> Dispatch {
        let mut state = self.lock();
        if state.busy {
            return Dispatch::Ignored;
        }
        let id = item.id.clone();
        let change = state.pending.toggle(item);
        debug!("Garment {} {:?}", id, change);
        Dispatch::Applied
    }

    /// Apply the pending selection as a new layer.
    ///
    /// The new layer is rendered from whatever is on screen and keeps the
    /// pose the user was looking at. With no layers that is the bare
    /// model's rendering for the current pose (else its first rendering)
    /// when one exists, not the raw model picture; the raw picture is used
    /// only while the base layer has no rendering to show. On failure the stack is untouched and the
    /// selection is kept for a retry.
    pub async fn fit_outfit(&self) -> Result<Dispatch> {
        let (base_image, garments, pose) = {
            let mut state = self.lock();
            if state.busy {
                return Ok(Dispatch::Ignored);
            }
            if state.pending.is_empty() {
                let err = TryOnError::validation("selection", "Select at least one garment to fit");
                state.error = Some(err.notice(FIT_CONTEXT));
                return Err(err);
            }
            state.busy = true;
            state.error = None;
            let pose = self.pose_name(state.pose.visible_index()).to_string();
            let base_image = state
                .top()
                .display_image(&pose)
                .unwrap_or_else(|| self.model_image.clone());
            (base_image, state.pending.items().to_vec(), pose)
        };

        let guard = self.begin();
        let result = self.resolver.dress(&base_image, &garments).await;
        let mut state = guard.settle();

        match result {
            Ok(image) => {
                state.layers.push(OutfitLayer::dressed(garments, pose, image));
                state.pending.clear();
                info!("Outfit layer added; stack depth {}", state.layers.len());
                Ok(Dispatch::Applied)
            }
            Err(err) => {
                warn!("Fitting outfit failed: {}", err);
                state.error = Some(err.notice(FIT_CONTEXT));
                Err(err)
            }
        }
    }

    /// Pop the top layer and return to the first pose.
    ///
    /// Poses resolved for the removed layer are dropped with it.
    pub fn remove_last_layer(&self) -> Dispatch {
        let mut state = self.lock();
        if state.busy {
            return Dispatch::Ignored;
        }
        match state.layers.pop() {
            Some(layer) => {
                state.pose = reduce(state.pose, PoseEvent::Reset);
                state.error = None;
                info!(
                    "Removed outfit layer ({} garment(s)); stack depth {}",
                    layer.garments().len(),
                    state.layers.len()
                );
                Dispatch::Applied
            }
            None => Dispatch::Ignored,
        }
    }

    /// Clear every layer, the selection, the pose and the error.
    ///
    /// Renderings of the bare model picture are kept.
    pub fn start_over(&self) -> Dispatch {
        let mut state = self.lock();
        if state.busy {
            return Dispatch::Ignored;
        }
        state.layers.clear();
        state.pending.clear();
        state.pose = reduce(state.pose, PoseEvent::Reset);
        state.error = None;
        info!("Outfit session reset");
        Dispatch::Applied
    }

    /// Show the top layer in pose `index`.
    ///
    /// A cached pose switches at once. Otherwise the index moves
    /// optimistically while the image is generated, and snaps back to the
    /// previous one if generation fails.
    pub async fn select_pose(&self, index: usize) -> Result<Dispatch> {
        let Some(pose) = self.resolver.poses().get(index).map(str::to_string) else {
            return Err(TryOnError::validation(
                "pose",
                format!(
                    "Pose index {index} is out of range (0..{})",
                    self.resolver.poses().len()
                ),
            ));
        };

        let layer = {
            let mut state = self.lock();
            if state.busy || state.pose.visible_index() == index {
                return Ok(Dispatch::Ignored);
            }
            let layer = state.top().clone();
            let cached = layer.pose_image(&pose).is_some();
            state.pose = reduce(state.pose, PoseEvent::Requested { target: index, cached });
            state.error = None;
            if cached {
                debug!("Switched to cached pose {}", index);
                return Ok(Dispatch::Applied);
            }
            state.busy = true;
            layer
        };

        let guard = self.begin();
        let result = self.resolver.resolve(&layer, &pose).await;
        let mut state = guard.settle();

        match result {
            Ok(_) => {
                state.pose = reduce(state.pose, PoseEvent::Resolved);
                Ok(Dispatch::Applied)
            }
            Err(err) => {
                warn!("Changing pose to {} failed: {}", index, err);
                state.pose = reduce(state.pose, PoseEvent::Failed);
                state.error = Some(err.notice(POSE_CONTEXT));
                Err(err)
            }
        }
    }

    /// Current display state.
    pub fn view(&self) -> OutfitView {
        let state = self.lock();
        let pose_index = state.pose.visible_index();
        let pose_instruction = self.pose_name(pose_index).to_string();
        let top = state.top();
        OutfitView {
            display_image: top
                .display_image(&pose_instruction)
                .unwrap_or_else(|| self.model_image.clone()),
            pose_index,
            pose_instruction,
            loading_pose: state.pose.pending_target(),
            resolved_poses: top.resolved_poses(),
            layer_count: state.layers.len(),
            can_change_pose: !state.busy,
            busy: state.busy,
            error: state.error.clone(),
            pending_selection: state.pending.items().to_vec(),
            worn_garment_ids: state
                .layers
                .iter()
                .flat_map(|layer| layer.garments().iter().map(|g| g.id.clone()))
                .collect(),
        }
    }

    pub fn model_image(&self) -> &ImageRef {
        &self.model_image
    }

    pub fn poses(&self) -> &PoseCatalog {
        self.resolver.poses()
    }

    pub fn resolver(&self) -> &PoseImageResolver {
        &self.resolver
    }

    pub fn base_layer(&self) -> LayerHandle {
        self.lock().base.clone()
    }

    /// Layers above the base, bottom first.
    pub fn layers(&self) -> Vec<LayerHandle> {
        self.lock().layers.clone()
    }

    pub fn top_layer(&self) -> Option<LayerHandle> {
        self.lock().layers.last().cloned()
    }

    pub fn layer_count(&self) -> usize {
        self.lock().layers.len()
    }

    pub fn pose_index(&self) -> usize {
        self.lock().pose.visible_index()
    }

    pub fn pose_state(&self) -> PoseState {
        self.lock().pose
    }

    pub fn pending_selection(&self) -> PendingSelection {
        self.lock().pending.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    pub fn last_error(&self) -> Option<ErrorNotice> {
        self.lock().error.clone()
    }

    pub fn clear_error(&self) {
        self.lock().error = None;
    }
}
