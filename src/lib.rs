pub mod bench;
pub mod config;
pub mod constraints;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod math;
pub mod model;
pub mod snapping;
pub mod tessellation;
pub mod tooling;
pub mod weave;

pub use error::{HeartError, Result};
