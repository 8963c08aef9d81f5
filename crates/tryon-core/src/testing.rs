//! Test doubles shared by unit tests.

use crate::error::{Result, TryOnError};
use crate::gateway::ImageGenerator;
use crate::models::ImageData;
use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A tiny opaque PNG of one colour.
pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> ImageData {
    let [r, g, b] = rgb;
    let img = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
    ImageData::encode_png(&DynamicImage::ImageRgba8(img)).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorCall {
    ApplyGarments(usize),
    ChangePose(String),
    RemoveBackground,
    GenerateModel,
}

#[derive(Default)]
struct Script {
    calls: Vec<GeneratorCall>,
    pose_inputs: Vec<ImageData>,
    apply_inputs: Vec<ImageData>,
    /// One slot per upcoming call; `None` lets that call succeed.
    failures: VecDeque<Option<TryOnError>>,
    size: Option<(u32, u32)>,
    produced: u8,
}

/// Generator that records calls, suspends once per call so concurrent
/// callers interleave, and returns a fresh solid-colour image each time.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<Script>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with `err`. Queued failures apply in order.
    pub fn fail_next(&self, err: TryOnError) {
        self.script.lock().unwrap().failures.push_back(Some(err));
    }

    /// Let the next `n - 1` calls succeed and fail the `n`th with `err`.
    pub fn fail_nth(&self, n: usize, err: TryOnError) {
        let mut script = self.script.lock().unwrap();
        for _ in 1..n {
            script.failures.push_back(None);
        }
        script.failures.push_back(Some(err));
    }

    pub fn set_output_size(&self, width: u32, height: u32) {
        self.script.lock().unwrap().size = Some((width, height));
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().unwrap().calls.len()
    }

    /// Base images passed to `change_pose`, in call order.
    pub fn pose_inputs(&self) -> Vec<ImageData> {
        self.script.lock().unwrap().pose_inputs.clone()
    }

    /// Base images passed to `apply_garments`, in call order.
    pub fn apply_inputs(&self) -> Vec<ImageData> {
        self.script.lock().unwrap().apply_inputs.clone()
    }

    async fn respond(&self, call: GeneratorCall) -> Result<ImageData> {
        self.script.lock().unwrap().calls.push(call);
        tokio::task::yield_now().await;

        let mut script = self.script.lock().unwrap();
        if let Some(Some(err)) = script.failures.pop_front() {
            return Err(err);
        }
        script.produced = script.produced.wrapping_add(1);
        let (width, height) = script.size.unwrap_or((4, 4));
        let shade = script.produced.wrapping_mul(37);
        Ok(solid_png(width, height, [shade, 255 - shade, 128]))
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn apply_garments(&self, base: &ImageData, garments: &[ImageData]) -> Result<ImageData> {
        self.script.lock().unwrap().apply_inputs.push(base.clone());
        self.respond(GeneratorCall::ApplyGarments(garments.len())).await
    }

    async fn change_pose(&self, base: &ImageData, pose_instruction: &str) -> Result<ImageData> {
        self.script.lock().unwrap().pose_inputs.push(base.clone());
        self.respond(GeneratorCall::ChangePose(pose_instruction.to_string()))
            .await
    }

    async fn remove_background(&self, _image: &ImageData) -> Result<ImageData> {
        self.respond(GeneratorCall::RemoveBackground).await
    }

    async fn generate_model_image(&self, _photo: &ImageData) -> Result<ImageData> {
        self.respond(GeneratorCall::GenerateModel).await
    }
}
