//! Resolve "layer L in pose P" to an image, generating at most once.
//!
//! Cache hits are answered from the layer's pose map without suspending.
//! Misses go through a per-(layer, pose) async lock: the first caller
//! generates and stores the image, and anyone who queued behind it finds the
//! entry on re-check and returns it without another call.

use super::layer::{LayerHandle, LayerKey, LayerKind};
use super::poses::PoseCatalog;
use crate::error::{Result, TryOnError};
use crate::gateway::GenerationGateway;
use crate::models::{ImageRef, WardrobeItem};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

type FlightKey = (LayerKey, String);
type Flight = Arc<tokio::sync::Mutex<()>>;

pub struct PoseImageResolver {
    gateway: GenerationGateway,
    poses: PoseCatalog,
    flights: Mutex<HashMap<FlightKey, Flight>>,
}

impl std::fmt::Debug for PoseImageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseImageResolver")
            .field("poses", &self.poses.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl PoseImageResolver {
    pub fn new(gateway: GenerationGateway, poses: PoseCatalog) -> Self {
        Self {
            gateway,
            poses,
            flights: Mutex::new(HashMap::new()),
        }
    }

    pub fn poses(&self) -> &PoseCatalog {
        &self.poses
    }

    pub fn gateway(&self) -> &GenerationGateway {
        &self.gateway
    }

    /// Return the image of `layer` in `pose`, generating it if needed.
    ///
    /// The pose transform is driven by a reference image so every variation
    /// of one outfit stays consistent: the canonical image for a dressed
    /// layer, and the first-pose rendering for the base model (itself
    /// generated once from the raw model picture). A first-pose rendering
    /// made on the way is only stored once the requested pose succeeds, so
    /// failures leave every pose map untouched.
    pub async fn resolve(&self, layer: &LayerHandle, pose: &str) -> Result<ImageRef> {
        if let Some(image) = layer.pose_image(pose) {
            debug!("Pose '{}' cached on layer {:?}", pose, layer.key());
            return Ok(image);
        }

        match layer.kind() {
            LayerKind::Base { model_image } => {
                let first = self.poses.first();
                if pose == first {
                    return self.fill(layer, pose, model_image, None).await;
                }
                match layer.pose_image(first) {
                    Some(reference) => self.fill(layer, pose, &reference, None).await,
                    None => {
                        let reference = self.render(layer, first, model_image).await?;
                        self.fill(layer, pose, &reference, Some((first, &reference)))
                            .await
                    }
                }
            }
            LayerKind::Dressed { .. } => {
                let reference = layer.canonical_image().ok_or_else(|| {
                    TryOnError::Other(format!("Layer {:?} has no images", layer.key()))
                })?;
                self.fill(layer, pose, &reference, None).await
            }
        }
    }

    /// Apply `garments` to `base`, producing the first image of a new layer.
    pub async fn dress(&self, base: &ImageRef, garments: &[WardrobeItem]) -> Result<ImageRef> {
        let urls: Vec<ImageRef> = garments.iter().map(|g| g.url.clone()).collect();
        info!(
            "Applying outfit: {}",
            garments
                .iter()
                .map(|g| g.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.gateway.apply_garments(base, &urls).await
    }

    /// Number of (layer, pose) pairs with a generation outstanding or queued.
    pub fn in_flight(&self) -> usize {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Generate `pose` for `layer` from `reference` under the flight lock.
    ///
    /// `staged` is an image generated earlier in the same resolution; it is
    /// stored ahead of `pose` only when this generation succeeds.
    async fn fill(
        &self,
        layer: &LayerHandle,
        pose: &str,
        reference: &ImageRef,
        staged: Option<(&str, &ImageRef)>,
    ) -> Result<ImageRef> {
        let ticket = self.join_flight((layer.key(), pose.to_string()));
        let _guard = ticket.flight.lock().await;

        let image = match layer.pose_image(pose) {
            Some(image) => {
                debug!("Pose '{}' filled by a concurrent request", pose);
                image
            }
            None => {
                info!("Generating pose '{}' for layer {:?}", pose, layer.key());
                self.gateway.change_pose(reference, pose).await?
            }
        };

        if let Some((staged_pose, staged_image)) = staged {
            if layer.pose_image(staged_pose).is_none() {
                layer.insert_pose_image(staged_pose, staged_image.clone());
            }
        }
        if layer.pose_image(pose).is_none() {
            layer.insert_pose_image(pose, image.clone());
        }
        Ok(image)
    }

    /// Generate `pose` for `layer` without storing it.
    async fn render(&self, layer: &LayerHandle, pose: &str, reference: &ImageRef) -> Result<ImageRef> {
        let ticket = self.join_flight((layer.key(), pose.to_string()));
        let _guard = ticket.flight.lock().await;

        if let Some(image) = layer.pose_image(pose) {
            return Ok(image);
        }
        info!("Rendering reference pose '{}' for layer {:?}", pose, layer.key());
        self.gateway.change_pose(reference, pose).await
    }

    fn join_flight(&self, key: FlightKey) -> FlightTicket<'_> {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        let flight = Arc::clone(flights.entry(key.clone()).or_default());
        FlightTicket {
            resolver: self,
            key,
            flight,
        }
    }
}

/// Membership in a flight; leaving removes the map entry once nobody else
/// holds or waits on it.
struct FlightTicket<'a> {
    resolver: &'a PoseImageResolver,
    key: FlightKey,
    flight: Flight,
}

impl Drop for FlightTicket<'_> {
    fn drop(&mut self) {
        let mut flights = self
            .resolver
            .flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // The map's handle plus ours
        if Arc::strong_count(&self.flight) == 2 {
            flights.remove(&self.key);
        }
    }
}
