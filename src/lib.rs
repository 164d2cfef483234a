//! pipeforge - A CI pipeline manifest generator

pub mod cli;
pub mod core;
pub mod error;
pub mod graph;
pub mod manifest;

// Re-export commonly used types
pub use crate::core::config::{SourceConfig, Synthesis};
pub use crate::core::{
    BuildEvent, EnvValue, Pipeline, PipelineKind, PullPolicy, Step, StepDefaults, Trigger, Volume,
    VolumeKind, VolumeMount, VolumeRegistry,
};
pub use error::GenError;
pub use graph::{pipeline_order, validate, ValidationReport};
pub use manifest::{emit, Manifest, OutputFormat};
