//! Data models shared by the store, the gateway and the outfit subsystem.

mod image;
mod wardrobe;

pub use self::image::*;
pub use self::wardrobe::*;
