//! Source definitions loaded from YAML
//!
//! The source definition is the declarative input the manifest is generated
//! from: extra volumes on top of the standard set, the pipelines with their
//! steps and triggers, and an optional override of the aggregate
//! notification pipeline.

use crate::core::pipeline::{Pipeline, PipelineKind};
use crate::core::step::{EnvValue, PullPolicy, StepDefaults};
use crate::core::trigger::Trigger;
use crate::core::volume::{Volume, VolumeKind, VolumeRegistry};
use crate::error::GenError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Placeholder in image names substituted with the configured registry address
const REGISTRY_PLACEHOLDER: &str = "{registry}";

/// Top-level source definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Container registry address, substituted verbatim into image names
    #[serde(default)]
    pub registry: Option<String>,

    /// Extra volumes registered on top of the standard set
    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,

    /// Pipeline definitions, in manifest order
    pub pipelines: Vec<PipelineConfig>,

    /// Override of the synthesized aggregate notification pipeline
    #[serde(default)]
    pub notify: Option<NotifyConfig>,
}

/// Volume definition as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub name: String,
    pub kind: VolumeKind,
    pub mount_path: String,

    #[serde(default)]
    pub host_path: Option<String>,
}

impl From<&VolumeConfig> for Volume {
    fn from(config: &VolumeConfig) -> Self {
        Volume {
            name: config.name.clone(),
            kind: config.kind,
            mount_path: config.mount_path.clone(),
            host_path: config.host_path.clone(),
        }
    }
}

/// Pipeline definition as written in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,

    #[serde(default)]
    pub kind: PipelineKind,

    /// Names of pipelines that must resolve before this one fires
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Attach the privileged build-service container
    #[serde(default)]
    pub service_container: bool,

    /// Skip the implicit source checkout
    #[serde(default)]
    pub disable_clone: bool,

    #[serde(default)]
    pub trigger: Option<Trigger>,

    pub steps: Vec<StepConfig>,
}

/// Step definition as written in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,

    /// Display target; the command is synthesized from it
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub image: Option<String>,

    /// Explicit command override for plugin-like steps
    #[serde(default)]
    pub commands: Vec<String>,

    #[serde(default)]
    pub privileged: bool,

    /// Names of sibling steps this step depends on
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Environment overlay, keys winning over the baseline
    #[serde(default)]
    pub environment: BTreeMap<String, EnvValue>,

    /// Extra volume names mounted on top of the registry set
    #[serde(default)]
    pub volumes: Vec<String>,

    /// Step-level trigger filter
    #[serde(default)]
    pub when: Option<Trigger>,

    #[serde(default)]
    pub pull: Option<PullPolicy>,
}

/// Aggregate notification pipeline override
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Channel the notification is delivered to
    #[serde(default)]
    pub channel: Option<String>,

    /// Notification plugin image
    #[serde(default)]
    pub image: Option<String>,
}

/// Everything the validator and emitter need, produced in one pass
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub registry: VolumeRegistry,
    pub defaults: StepDefaults,
    pub pipelines: Vec<Pipeline>,
    pub notify: Option<NotifyConfig>,

    /// Violations found during synthesis (duplicate volume registrations);
    /// the validator appends its own findings to these
    pub violations: Vec<GenError>,
}

impl SourceConfig {
    /// Load a source definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!("failed to read source definition {}", path.as_ref().display())
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a source definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SourceConfig =
            serde_yaml::from_str(yaml).context("failed to parse source definition")?;
        Ok(config)
    }

    /// The step baseline derived from this definition
    pub fn step_defaults(&self) -> StepDefaults {
        let mut defaults = StepDefaults::default();
        if let Some(registry) = &self.registry {
            defaults.image = format!("{}/{}", registry, defaults.image);
        }
        defaults
    }

    /// Construct the registry, the baseline, and every pipeline value.
    ///
    /// Synthesis never fails outright: duplicate volume registrations are
    /// collected so a single run surfaces every needed fix alongside the
    /// validator's findings.
    pub fn synthesize(&self) -> Synthesis {
        let mut violations = Vec::new();

        let mut registry = VolumeRegistry::standard();
        for volume_config in &self.volumes {
            if let Err(violation) = registry.register(Volume::from(volume_config)) {
                violations.push(violation);
            }
        }
        debug!(volumes = registry.len(), "volume registry initialized");

        let defaults = self.step_defaults();
        let expanded = self.with_expanded_images();

        let pipelines: Vec<Pipeline> = expanded
            .pipelines
            .iter()
            .map(|pipeline_config| Pipeline::from_config(pipeline_config, &defaults, &registry))
            .collect();
        debug!(pipelines = pipelines.len(), "pipelines synthesized");

        Synthesis {
            registry,
            defaults,
            pipelines,
            notify: self.notify.clone(),
            violations,
        }
    }

    /// Substitute the registry placeholder in every step image
    fn with_expanded_images(&self) -> SourceConfig {
        let Some(registry) = &self.registry else {
            return self.clone();
        };

        let mut expanded = self.clone();
        for pipeline in &mut expanded.pipelines {
            for step in &mut pipeline.steps {
                if let Some(image) = &step.image {
                    step.image = Some(image.replace(REGISTRY_PLACEHOLDER, registry));
                }
            }
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_definition() {
        let yaml = r#"
pipelines:
  - name: default
    steps:
      - name: build
      - name: unit-tests
        depends_on: [build]
"#;

        let config = SourceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.pipelines.len(), 1);
        assert_eq!(config.pipelines[0].steps[1].depends_on, vec!["build"]);
    }

    #[test]
    fn test_parse_full_definition() {
        let yaml = r#"
registry: registry.example.com
volumes:
  - name: ceph
    kind: host-path
    mount_path: /var/lib/ceph
    host_path: /var/lib/ceph
pipelines:
  - name: default
    service_container: true
    steps:
      - name: build
        environment:
          TOKEN: { from_secret: registry_token }
          PLATFORM: linux/arm64
  - name: e2e-cloud
    kind: hosted-cloud
    depends_on: [default]
    trigger:
      event:
        include: [tag]
    steps:
      - name: e2e
notify:
  channel: proj-ci
"#;

        let config = SourceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.registry.as_deref(), Some("registry.example.com"));
        assert_eq!(config.volumes[0].kind, VolumeKind::HostPath);
        assert_eq!(config.pipelines[1].kind, PipelineKind::HostedCloud);

        let env = &config.pipelines[0].steps[0].environment;
        assert_eq!(env.get("TOKEN"), Some(&EnvValue::secret("registry_token")));
        assert_eq!(env.get("PLATFORM"), Some(&EnvValue::plain("linux/arm64")));

        let trigger = config.pipelines[1].trigger.as_ref().unwrap();
        assert_eq!(trigger.event.include, vec!["tag"]);
    }

    #[test]
    fn test_default_image_carries_registry_address() {
        let config = SourceConfig {
            registry: Some("registry.example.com".to_string()),
            ..SourceConfig::default()
        };
        assert_eq!(
            config.step_defaults().image,
            "registry.example.com/build-tools:latest"
        );
    }

    #[test]
    fn test_registry_placeholder_expansion() {
        let yaml = r#"
registry: registry.example.com
pipelines:
  - name: default
    steps:
      - name: build
        image: "{registry}/custom-builder:v2"
      - name: lint
"#;

        let config = SourceConfig::from_yaml(yaml).unwrap();
        let synthesis = config.synthesize();

        let pipeline = &synthesis.pipelines[0];
        assert_eq!(
            pipeline.step("build").unwrap().image,
            "registry.example.com/custom-builder:v2"
        );
        assert_eq!(
            pipeline.step("lint").unwrap().image,
            "registry.example.com/build-tools:latest"
        );
    }

    #[test]
    fn test_duplicate_volume_collected_not_fatal() {
        let yaml = r#"
volumes:
  - name: dockersock
    kind: ephemeral-temp
    mount_path: /var/run
pipelines:
  - name: default
    steps:
      - name: build
"#;

        let synthesis = SourceConfig::from_yaml(yaml).unwrap().synthesize();
        assert_eq!(synthesis.violations.len(), 1);
        assert!(matches!(
            synthesis.violations[0],
            GenError::DuplicateName { .. }
        ));
        // Synthesis still produced the pipeline for further validation
        assert_eq!(synthesis.pipelines.len(), 1);
    }
}
