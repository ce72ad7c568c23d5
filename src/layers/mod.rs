#[macro_use]
pub mod macros;

pub mod base;
pub mod cache;
pub mod content;
pub mod debug;
pub mod image;
pub mod manager;
pub mod marker;
pub mod overlay;

pub use base::{BuiltContent, LayerId, LayerKind, LayerOptions, LayerProperties, LayerProvider, LayerStyle, TileContext};
pub use manager::LayerStack;
