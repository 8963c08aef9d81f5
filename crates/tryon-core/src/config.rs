//! Centralized configuration for the try-on core.
//!
//! Constants for persistence, image generation, the wardrobe catalog and the
//! pose catalog.

use std::time::Duration;

/// Persistent store configuration.
pub struct StoreConfig;

impl StoreConfig {
    pub const DB_FILE_NAME: &'static str = "tryon.sqlite";
    /// Schema version this build expects on disk.
    pub const SCHEMA_VERSION: i64 = 2;
    pub const BUSY_TIMEOUT_MS: u64 = 5_000;
    /// Entries in the generic cache collection expire after this long.
    pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
    /// Key of the singleton user-model record.
    pub const USER_MODEL_ID: &'static str = "currentUser";
}

/// Image generation configuration.
pub struct GenerationConfig;

impl GenerationConfig {
    pub const MODEL: &'static str = "gemini-2.5-flash-image";
    pub const API_BASE: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
    pub const USER_AGENT: &'static str = concat!("tryon-core/", env!("CARGO_PKG_VERSION"));
    /// Environment variables searched, in order, for the API key.
    pub const API_KEY_ENV_VARS: [&'static str; 2] = ["GEMINI_API_KEY", "API_KEY"];
    /// Background used when padding a generated image to a square.
    pub const SQUARE_FILL_RGB: [u8; 3] = [0xf0, 0xf0, 0xf0];
    /// Images within this distance of 1:1 are returned untouched.
    pub const ASPECT_TOLERANCE: f64 = 0.01;
    pub const SUPPORTED_MIME_TYPES: [&'static str; 5] = [
        "image/png",
        "image/jpeg",
        "image/webp",
        "image/heic",
        "image/heif",
    ];
}

/// Wardrobe catalog configuration.
pub struct WardrobeConfig;

impl WardrobeConfig {
    pub const DEFAULT_ITEM_NAME: &'static str = "New Item";
    pub const CUSTOM_ID_PREFIX: &'static str = "custom-";
    /// Cache-collection key prefix for background-removal results.
    pub const BACKGROUND_CACHE_PREFIX: &'static str = "background-removed:";
}

/// Shared directory and path configuration.
pub struct PathsConfig;

impl PathsConfig {
    pub const APP_DIR_NAME: &'static str = "tryon";
}

/// The reference pose catalog, in display order.
pub const POSE_INSTRUCTIONS: [&str; 6] = [
    "Full frontal view, hands on hips",
    "Slightly turned, 3/4 view",
    "Side profile view",
    "Jumping in the air, mid-action shot",
    "Walking towards camera",
    "Leaning against a wall",
];

/// Check whether a MIME type can be sent to the generation model.
pub fn is_supported_mime(mime_type: &str) -> bool {
    GenerationConfig::SUPPORTED_MIME_TYPES
        .iter()
        .any(|m| m.eq_ignore_ascii_case(mime_type))
}
