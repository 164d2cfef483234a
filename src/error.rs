//! Generation error taxonomy
//!
//! Every violation is detected during a single generation pass and reported
//! with the names of the offending entities. Generation is deterministic, so
//! none of these are recoverable by retry; the fix is always in the source
//! definitions.

use thiserror::Error;

/// A violation detected while synthesizing or validating a manifest
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    /// Two entities share a name inside the same scope
    #[error("duplicate name '{name}' in {scope}")]
    DuplicateName { name: String, scope: String },

    /// A dependency name has no matching sibling step or pipeline
    #[error("'{owner}' depends on unknown name '{dependency}' in {scope}")]
    UnresolvedDependency {
        owner: String,
        dependency: String,
        scope: String,
    },

    /// The dependency graph contains a cycle, reported as the full path
    #[error("dependency cycle in {scope}: {}", .cycle.join(" -> "))]
    CycleDetected { scope: String, cycle: Vec<String> },

    /// A step mounts a volume absent from the registry
    #[error("step '{step}' mounts unknown volume '{volume}'")]
    UnknownVolume { step: String, volume: String },

    /// Trigger axes are combined in a way the runner cannot honor
    #[error("invalid trigger on pipeline '{pipeline}': {reason}")]
    InvalidTrigger { pipeline: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_renders_path() {
        let err = GenError::CycleDetected {
            scope: "pipeline 'default'".to_string(),
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle in pipeline 'default': a -> b -> a"
        );
    }

    #[test]
    fn test_duplicate_name_message() {
        let err = GenError::DuplicateName {
            name: "build".to_string(),
            scope: "pipeline 'default'".to_string(),
        };
        assert!(err.to_string().contains("duplicate name 'build'"));
    }
}
