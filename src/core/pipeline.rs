//! Pipeline domain model

use crate::core::config::PipelineConfig;
use crate::core::step::{Step, StepDefaults};
use crate::core::trigger::Trigger;
use crate::core::volume::{Volume, VolumeRegistry};
use serde::{Deserialize, Serialize};

/// Where a pipeline runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    /// Container pipeline on the shared runner pool
    #[default]
    Standard,
    /// Pipeline dispatched to a hosted cloud runner with its own instance
    HostedCloud,
}

/// A privileged build-service container attached alongside the steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContainer {
    pub name: String,
    pub image: String,
    pub privileged: bool,
    /// Mounted volume names, resolved against the same registry as steps
    pub volumes: Vec<String>,
}

impl ServiceContainer {
    /// The container-runtime service required by privileged builds
    fn build_service(registry: &VolumeRegistry) -> Self {
        ServiceContainer {
            name: "runtime".to_string(),
            image: "docker:27.3.1-dind".to_string(),
            privileged: true,
            volumes: registry.names(),
        }
    }
}

/// Compute placement for hosted-cloud pipelines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudInstance {
    pub size: String,
    pub region: String,
}

impl Default for CloudInstance {
    fn default() -> Self {
        CloudInstance {
            size: "large".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

/// A named, ordered collection of steps plus the metadata controlling when
/// and how it runs
///
/// Pipelines are immutable value objects constructed once per generation
/// run. Dependency names reference other pipelines in the manifest and stay
/// unresolved until the graph validator runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Pipeline name, unique within the manifest
    pub name: String,

    /// Runner placement kind
    pub kind: PipelineKind,

    /// Ordered step sequence
    pub steps: Vec<Step>,

    /// Attached service containers
    pub services: Vec<ServiceContainer>,

    /// Pipeline-scope volume declarations, derived from the registry
    pub volumes: Vec<Volume>,

    /// Names of pipelines that must resolve before this one fires
    pub depends_on: Vec<String>,

    /// Activation predicate
    pub trigger: Trigger,

    /// Skip the implicit source checkout
    pub clone_disabled: bool,

    /// Injected compute placement for hosted-cloud pipelines
    pub instance: Option<CloudInstance>,
}

impl Pipeline {
    /// Build a pipeline from its configuration.
    ///
    /// The full pipeline-scope volume declarations come from the registry so
    /// every contained step can mount them without redeclaring. The
    /// with-service-container flag attaches the privileged build service;
    /// the hosted-cloud kind injects default compute placement instead.
    pub fn from_config(
        config: &PipelineConfig,
        defaults: &StepDefaults,
        registry: &VolumeRegistry,
    ) -> Self {
        let steps = config
            .steps
            .iter()
            .map(|step_config| Step::from_config(step_config, defaults, registry))
            .collect();

        let kind = config.kind;
        let (services, instance) = match kind {
            PipelineKind::Standard => {
                let services = if config.service_container {
                    vec![ServiceContainer::build_service(registry)]
                } else {
                    Vec::new()
                };
                (services, None)
            }
            PipelineKind::HostedCloud => (Vec::new(), Some(CloudInstance::default())),
        };

        Pipeline {
            name: config.name.clone(),
            kind,
            steps,
            services,
            volumes: registry.pipeline_volumes(),
            depends_on: config.depends_on.clone(),
            trigger: config.trigger.clone().unwrap_or_default(),
            clone_disabled: config.disable_clone,
            instance,
        }
    }

    /// Get a step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Names of the contained steps, in declaration order
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StepConfig;

    fn config(name: &str) -> PipelineConfig {
        PipelineConfig {
            name: name.to_string(),
            steps: vec![StepConfig {
                name: "build".to_string(),
                ..StepConfig::default()
            }],
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_service_container_attached_on_flag() {
        let mut cfg = config("default");
        cfg.service_container = true;

        let registry = VolumeRegistry::standard();
        let pipeline = Pipeline::from_config(&cfg, &StepDefaults::default(), &registry);

        assert_eq!(pipeline.services.len(), 1);
        let service = &pipeline.services[0];
        assert!(service.privileged);
        assert_eq!(service.volumes, registry.names());
        assert!(pipeline.instance.is_none());
    }

    #[test]
    fn test_hosted_cloud_injects_instance_instead_of_service() {
        let mut cfg = config("e2e-cloud");
        cfg.kind = PipelineKind::HostedCloud;
        cfg.service_container = true;

        let pipeline = Pipeline::from_config(
            &cfg,
            &StepDefaults::default(),
            &VolumeRegistry::standard(),
        );

        assert!(pipeline.services.is_empty());
        let instance = pipeline.instance.expect("hosted-cloud pipeline has an instance");
        assert_eq!(instance.size, "large");
        assert_eq!(instance.region, "us-east-1");
    }

    #[test]
    fn test_pipeline_receives_registry_volume_declarations() {
        let registry = VolumeRegistry::standard();
        let pipeline = Pipeline::from_config(
            &config("default"),
            &StepDefaults::default(),
            &registry,
        );

        assert_eq!(pipeline.volumes, registry.pipeline_volumes());
        // Each contained step can mount the declared set without redeclaring
        for step in &pipeline.steps {
            for volume in &pipeline.volumes {
                assert!(step.volumes.contains(&volume.name));
            }
        }
    }

    #[test]
    fn test_dependency_names_stored_unresolved() {
        let mut cfg = config("release");
        cfg.depends_on = vec!["default".to_string(), "missing".to_string()];

        let pipeline = Pipeline::from_config(
            &cfg,
            &StepDefaults::default(),
            &VolumeRegistry::standard(),
        );
        assert_eq!(pipeline.depends_on, vec!["default", "missing"]);
    }
}
