//! API implementation submodules.
//!
//! Each submodule contains `impl TryOnStudio` blocks for one concern. The
//! struct definition remains in `lib.rs`.

mod builder;
mod model;
mod session;
mod wardrobe;

pub use builder::TryOnStudioBuilder;
