//! Manifest assembly and serialization
//!
//! Flattens the validated pipeline set into the ordered sequence the
//! external runner consumes. Emission is all-or-nothing: callers serialize
//! only after a clean validation report.

use crate::core::config::{NotifyConfig, PipelineConfig, StepConfig, Synthesis};
use crate::core::pipeline::{Pipeline, PipelineKind, ServiceContainer};
use crate::core::step::{EnvValue, PullPolicy, Step};
use crate::core::trigger::Trigger;
use crate::core::volume::{Volume, VolumeKind, VolumeMount, VolumeRegistry};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Serialization format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// The full ordered pipeline sequence consumed by the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub pipelines: Vec<Pipeline>,
}

impl Manifest {
    /// Flatten the synthesized pipelines, preserving first-definition order,
    /// and append the aggregate notification pipeline whose dependency set
    /// is every other pipeline name, so it fires only after all others have
    /// resolved.
    pub fn assemble(synthesis: &Synthesis) -> Manifest {
        let mut pipelines = synthesis.pipelines.clone();

        let all_names: Vec<String> = pipelines.iter().map(|p| p.name.clone()).collect();
        let notify = notify_pipeline(synthesis, all_names);
        pipelines.push(notify);

        Manifest { pipelines }
    }

    /// Names of the emitted pipelines, in emission order
    pub fn pipeline_names(&self) -> Vec<String> {
        self.pipelines.iter().map(|p| p.name.clone()).collect()
    }
}

/// Build the cross-cutting notification pipeline from its optional override
fn notify_pipeline(synthesis: &Synthesis, depends_on: Vec<String>) -> Pipeline {
    let notify = synthesis.notify.clone().unwrap_or_default();
    let config = PipelineConfig {
        name: "notify".to_string(),
        depends_on,
        disable_clone: true,
        steps: vec![notify_step(&notify)],
        ..PipelineConfig::default()
    };
    Pipeline::from_config(&config, &synthesis.defaults, &synthesis.registry)
}

fn notify_step(notify: &NotifyConfig) -> StepConfig {
    let mut environment = BTreeMap::new();
    environment.insert(
        "NOTIFY_CHANNEL".to_string(),
        EnvValue::plain(notify.channel.as_deref().unwrap_or("ci")),
    );
    environment.insert(
        "NOTIFY_WEBHOOK".to_string(),
        EnvValue::secret("notify_webhook"),
    );

    StepConfig {
        name: "notify".to_string(),
        image: Some(
            notify
                .image
                .clone()
                .unwrap_or_else(|| "plugins/slack:latest".to_string()),
        ),
        commands: vec!["send-notification".to_string()],
        environment,
        ..StepConfig::default()
    }
}

/// Serialize a manifest into the runner format.
///
/// YAML output is one document per pipeline, `---` separated; JSON output is
/// a single array.
pub fn emit(manifest: &Manifest, registry: &VolumeRegistry, format: OutputFormat) -> Result<String> {
    let docs: Vec<PipelineDoc> = manifest
        .pipelines
        .iter()
        .map(|p| pipeline_doc(p, registry))
        .collect();

    match format {
        OutputFormat::Yaml => {
            let mut out = String::new();
            for doc in &docs {
                let yaml = serde_yaml::to_string(doc).context("failed to serialize pipeline")?;
                out.push_str("---\n");
                out.push_str(&yaml);
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let mut out =
                serde_json::to_string_pretty(&docs).context("failed to serialize manifest")?;
            out.push('\n');
            Ok(out)
        }
    }
}

// Runner document shapes. Empty fields are trimmed so the emitted manifest
// only carries what the runner needs to see.

#[derive(Debug, Serialize)]
struct PipelineDoc {
    kind: &'static str,

    #[serde(rename = "type")]
    runner: &'static str,

    name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    clone: Option<CloneDoc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<InstanceDoc>,

    steps: Vec<StepDoc>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    services: Vec<ServiceDoc>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<VolumeDoc>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    trigger: Option<Trigger>,
}

#[derive(Debug, Serialize)]
struct CloneDoc {
    disable: bool,
}

#[derive(Debug, Serialize)]
struct InstanceDoc {
    size: String,
    region: String,
}

#[derive(Debug, Serialize)]
struct StepDoc {
    name: String,
    image: String,
    pull: PullPolicy,
    commands: Vec<String>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    privileged: bool,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    environment: BTreeMap<String, EnvValue>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<MountDoc>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    when: Option<Trigger>,
}

#[derive(Debug, Serialize)]
struct ServiceDoc {
    name: String,
    image: String,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    privileged: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<MountDoc>,
}

#[derive(Debug, Serialize)]
struct MountDoc {
    name: String,
    path: String,
}

#[derive(Debug, Serialize)]
struct VolumeDoc {
    name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    temp: Option<TempDoc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<HostDoc>,
}

#[derive(Debug, Serialize)]
struct TempDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    medium: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct HostDoc {
    path: String,
}

fn pipeline_doc(pipeline: &Pipeline, registry: &VolumeRegistry) -> PipelineDoc {
    let runner = match pipeline.kind {
        PipelineKind::Standard => "docker",
        PipelineKind::HostedCloud => "aws",
    };

    PipelineDoc {
        kind: "pipeline",
        runner,
        name: pipeline.name.clone(),
        clone: pipeline.clone_disabled.then_some(CloneDoc { disable: true }),
        instance: pipeline.instance.as_ref().map(|i| InstanceDoc {
            size: i.size.clone(),
            region: i.region.clone(),
        }),
        steps: pipeline
            .steps
            .iter()
            .map(|s| step_doc(s, registry))
            .collect(),
        services: pipeline
            .services
            .iter()
            .map(|s| service_doc(s, registry))
            .collect(),
        volumes: pipeline.volumes.iter().map(volume_doc).collect(),
        depends_on: pipeline.depends_on.clone(),
        trigger: (!pipeline.trigger.is_empty()).then(|| pipeline.trigger.clone()),
    }
}

fn step_doc(step: &Step, registry: &VolumeRegistry) -> StepDoc {
    StepDoc {
        name: step.name.clone(),
        image: step.image.clone(),
        pull: step.pull,
        commands: step.commands.clone(),
        privileged: step.privileged,
        environment: step.environment.clone(),
        volumes: step.mounts(registry).into_iter().map(mount_doc).collect(),
        depends_on: step.depends_on.clone(),
        when: step.when.clone(),
    }
}

fn service_doc(service: &ServiceContainer, registry: &VolumeRegistry) -> ServiceDoc {
    let mounts = service
        .volumes
        .iter()
        .filter_map(|name| registry.resolve(name))
        .map(|v| MountDoc {
            name: v.name.clone(),
            path: v.mount_path.clone(),
        })
        .collect();

    ServiceDoc {
        name: service.name.clone(),
        image: service.image.clone(),
        privileged: service.privileged,
        volumes: mounts,
    }
}

fn mount_doc(mount: VolumeMount) -> MountDoc {
    MountDoc {
        name: mount.name,
        path: mount.path,
    }
}

fn volume_doc(volume: &Volume) -> VolumeDoc {
    let (temp, host) = match volume.kind {
        VolumeKind::EphemeralTemp => (Some(TempDoc { medium: None }), None),
        VolumeKind::MemoryTemp => (
            Some(TempDoc {
                medium: Some("memory"),
            }),
            None,
        ),
        VolumeKind::HostPath => (
            None,
            Some(HostDoc {
                path: volume.host_path.clone().unwrap_or_default(),
            }),
        ),
    };

    VolumeDoc {
        name: volume.name.clone(),
        temp,
        host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SourceConfig;

    fn synthesis(yaml: &str) -> Synthesis {
        SourceConfig::from_yaml(yaml).unwrap().synthesize()
    }

    const BASIC: &str = r#"
pipelines:
  - name: default
    service_container: true
    steps:
      - name: build
  - name: release
    depends_on: [default]
    steps:
      - name: push
        depends_on: []
"#;

    #[test]
    fn test_aggregate_depends_on_every_other_pipeline() {
        let manifest = Manifest::assemble(&synthesis(BASIC));

        assert_eq!(manifest.pipeline_names(), vec!["default", "release", "notify"]);
        let notify = manifest.pipelines.last().unwrap();
        assert_eq!(notify.depends_on, vec!["default", "release"]);
        assert!(notify.clone_disabled);
    }

    #[test]
    fn test_notify_override_changes_channel() {
        let synthesis = synthesis(
            r#"
pipelines:
  - name: default
    steps:
      - name: build
notify:
  channel: proj-ci
"#,
        );

        let manifest = Manifest::assemble(&synthesis);
        let step = &manifest.pipelines.last().unwrap().steps[0];
        assert_eq!(
            step.environment.get("NOTIFY_CHANNEL"),
            Some(&EnvValue::plain("proj-ci"))
        );
        assert_eq!(
            step.environment.get("NOTIFY_WEBHOOK"),
            Some(&EnvValue::secret("notify_webhook"))
        );
    }

    #[test]
    fn test_yaml_emission_is_multi_document() {
        let synthesis = synthesis(BASIC);
        let manifest = Manifest::assemble(&synthesis);
        let out = emit(&manifest, &synthesis.registry, OutputFormat::Yaml).unwrap();

        assert_eq!(out.matches("---\n").count(), 3);
        assert!(out.contains("kind: pipeline"));
        assert!(out.contains("type: docker"));
        assert!(out.contains("commands:\n"));
    }

    #[test]
    fn test_empty_fields_are_trimmed() {
        let synthesis = synthesis(BASIC);
        let manifest = Manifest::assemble(&synthesis);
        let out = emit(&manifest, &synthesis.registry, OutputFormat::Yaml).unwrap();

        assert!(!out.contains("privileged: false"));
        assert!(!out.contains("when:"));
        // The release pipeline has no services but the default one does
        assert_eq!(out.matches("services:").count(), 1);
    }

    #[test]
    fn test_json_emission_is_an_array() {
        let synthesis = synthesis(BASIC);
        let manifest = Manifest::assemble(&synthesis);
        let out = emit(&manifest, &synthesis.registry, OutputFormat::Json).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        let docs = parsed.as_array().unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0]["type"], "docker");
        assert_eq!(docs[0]["steps"][0]["commands"][0], "build build");
    }

    #[test]
    fn test_volume_declarations_carry_backing_kind() {
        let synthesis = synthesis(BASIC);
        let manifest = Manifest::assemble(&synthesis);
        let out = emit(&manifest, &synthesis.registry, OutputFormat::Json).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        let volumes = parsed[0]["volumes"].as_array().unwrap();
        assert_eq!(volumes[0]["name"], "dockersock");
        assert!(volumes[0]["temp"].is_object());
        assert_eq!(volumes[1]["host"]["path"], "/var/ci-docker");
        assert_eq!(volumes[3]["temp"]["medium"], "memory");
    }

    #[test]
    fn test_emission_is_deterministic() {
        let config = SourceConfig::from_yaml(BASIC).unwrap();

        let first_synth = config.synthesize();
        let first = emit(
            &Manifest::assemble(&first_synth),
            &first_synth.registry,
            OutputFormat::Yaml,
        )
        .unwrap();

        let second_synth = config.synthesize();
        let second = emit(
            &Manifest::assemble(&second_synth),
            &second_synth.registry,
            OutputFormat::Yaml,
        )
        .unwrap();

        assert_eq!(first, second);
    }
}
