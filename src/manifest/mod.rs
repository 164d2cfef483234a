//! Manifest assembly and emission

pub mod emitter;

pub use emitter::{emit, Manifest, OutputFormat};
