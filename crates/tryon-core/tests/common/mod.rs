//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tryon_core::{ImageData, ImageGenerator, Result, TryOnError};

pub fn png(width: u32, height: u32, rgb: [u8; 3]) -> ImageData {
    let [r, g, b] = rgb;
    let img = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
    ImageData::encode_png(&DynamicImage::ImageRgba8(img)).expect("encode png")
}

/// Counts calls and can be told to fail the next one.
#[derive(Default)]
pub struct CountingGenerator {
    calls: AtomicUsize,
    pose_calls: Mutex<Vec<String>>,
    fail_next: Mutex<Option<TryOnError>>,
}

impl CountingGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn pose_calls(&self) -> Vec<String> {
        self.pose_calls.lock().unwrap().clone()
    }

    pub fn fail_next(&self, err: TryOnError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    async fn produce(&self) -> Result<ImageData> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        let shade = (n * 29 % 256) as u8;
        Ok(png(8, 8, [shade, shade / 2, 200]))
    }
}

#[async_trait]
impl ImageGenerator for CountingGenerator {
    async fn apply_garments(&self, _base: &ImageData, _garments: &[ImageData]) -> Result<ImageData> {
        self.produce().await
    }

    async fn change_pose(&self, _base: &ImageData, pose_instruction: &str) -> Result<ImageData> {
        self.pose_calls
            .lock()
            .unwrap()
            .push(pose_instruction.to_string());
        self.produce().await
    }

    async fn remove_background(&self, _image: &ImageData) -> Result<ImageData> {
        self.produce().await
    }

    async fn generate_model_image(&self, _photo: &ImageData) -> Result<ImageData> {
        self.produce().await
    }
}
