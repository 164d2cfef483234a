//! Step domain model

use crate::core::config::StepConfig;
use crate::core::merge::merge_overriding;
use crate::core::trigger::Trigger;
use crate::core::volume::{VolumeMount, VolumeRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An environment value: plain text or a by-name secret reference.
///
/// The engine never sees secret values; the reference is emitted verbatim
/// for the runner's secrets mechanism to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Plain(String),
    Secret { from_secret: String },
}

impl EnvValue {
    pub fn plain(value: &str) -> Self {
        EnvValue::Plain(value.to_string())
    }

    pub fn secret(name: &str) -> Self {
        EnvValue::Secret {
            from_secret: name.to_string(),
        }
    }
}

/// Image pull policy carried through to the emitted step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PullPolicy {
    #[default]
    Always,
    IfNotExists,
    Never,
}

/// Baseline applied to every step before the caller-supplied overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefaults {
    /// Standard build image, already carrying the registry address
    pub image: String,

    /// Default platform environment set
    pub environment: BTreeMap<String, EnvValue>,
}

impl Default for StepDefaults {
    fn default() -> Self {
        let mut environment = BTreeMap::new();
        environment.insert("CI".to_string(), EnvValue::plain("true"));
        environment.insert("PLATFORM".to_string(), EnvValue::plain("linux/amd64"));

        StepDefaults {
            image: "build-tools:latest".to_string(),
            environment,
        }
    }
}

/// A single unit of work within a pipeline
///
/// Steps are immutable value objects. Dependency and volume names are kept
/// as plain references; resolution and cycle detection happen in the graph
/// validator so steps may be declared before all their dependents exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Step name, unique within its pipeline
    pub name: String,

    /// Display target the command is synthesized from
    pub target: String,

    /// Container image the step runs in
    pub image: String,

    /// Invoked command list
    pub commands: Vec<String>,

    /// Whether the step runs privileged
    pub privileged: bool,

    /// Merged environment mapping, overlay keys winning
    pub environment: BTreeMap<String, EnvValue>,

    /// Mounted volume names: the registry's full set plus step extras
    pub volumes: Vec<String>,

    /// Names of sibling steps this step depends on
    pub depends_on: Vec<String>,

    /// Optional step-level trigger filter, evaluated independently of the
    /// pipeline trigger
    pub when: Option<Trigger>,

    /// Image pull policy
    pub pull: PullPolicy,
}

impl Step {
    /// Build a step from its configuration.
    ///
    /// The command is synthesized deterministically as `build <target>`,
    /// target defaulting to the step name; an explicit `commands` override
    /// in the configuration replaces the synthesized list. Repeated calls
    /// with identical input produce value-equal steps.
    pub fn from_config(
        config: &StepConfig,
        defaults: &StepDefaults,
        registry: &VolumeRegistry,
    ) -> Self {
        let target = config.target.clone().unwrap_or_else(|| config.name.clone());

        let commands = if config.commands.is_empty() {
            vec![format!("build {}", target)]
        } else {
            config.commands.clone()
        };

        let mut volumes = registry.names();
        for extra in &config.volumes {
            if !volumes.contains(extra) {
                volumes.push(extra.clone());
            }
        }

        Step {
            name: config.name.clone(),
            image: config
                .image
                .clone()
                .unwrap_or_else(|| defaults.image.clone()),
            commands,
            target,
            privileged: config.privileged,
            environment: merge_overriding(&defaults.environment, &config.environment),
            volumes,
            depends_on: config.depends_on.clone(),
            when: config.when.clone(),
            pull: config.pull.unwrap_or_default(),
        }
    }

    /// Resolve the mounted-volume names against the registry.
    ///
    /// Names unknown to the registry are skipped here; the validator has
    /// already reported them as `UnknownVolume` before emission. Mounts are
    /// deduplicated by mount path, first occurrence winning.
    pub fn mounts(&self, registry: &VolumeRegistry) -> Vec<VolumeMount> {
        let mut mounts: Vec<VolumeMount> = Vec::new();
        for name in &self.volumes {
            if let Some(volume) = registry.resolve(name) {
                if !mounts.iter().any(|m| m.path == volume.mount_path) {
                    mounts.push(VolumeMount {
                        name: volume.name.clone(),
                        path: volume.mount_path.clone(),
                    });
                }
            }
        }
        mounts
    }
}
