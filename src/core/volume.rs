//! Shared volume declarations and the canonical registry

use crate::error::GenError;
use serde::{Deserialize, Serialize};

/// Backing storage for a shared volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeKind {
    /// Scratch space created for the pipeline and discarded afterwards
    EphemeralTemp,
    /// Bind mount of a path on the runner host
    HostPath,
    /// Memory-backed scratch space
    MemoryTemp,
}

/// A named shared mount point available to steps and pipelines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// Volume name, unique within the registry
    pub name: String,

    /// Backing storage kind
    pub kind: VolumeKind,

    /// Path the volume is mounted at inside every step that uses it
    pub mount_path: String,

    /// Host path for `HostPath` volumes
    pub host_path: Option<String>,
}

impl Volume {
    pub fn ephemeral(name: &str, mount_path: &str) -> Self {
        Volume {
            name: name.to_string(),
            kind: VolumeKind::EphemeralTemp,
            mount_path: mount_path.to_string(),
            host_path: None,
        }
    }

    pub fn host(name: &str, mount_path: &str, host_path: &str) -> Self {
        Volume {
            name: name.to_string(),
            kind: VolumeKind::HostPath,
            mount_path: mount_path.to_string(),
            host_path: Some(host_path.to_string()),
        }
    }

    pub fn memory(name: &str, mount_path: &str) -> Self {
        Volume {
            name: name.to_string(),
            kind: VolumeKind::MemoryTemp,
            mount_path: mount_path.to_string(),
            host_path: None,
        }
    }
}

/// A step-level mount derived from a registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub name: String,
    pub path: String,
}

/// Canonical set of shared volumes for one generation run
///
/// Written once during initialization and read-only afterwards. Every step
/// and pipeline derives its volume list from the same registry, so a build
/// cache or a privileged daemon socket mounted by two otherwise-independent
/// steps always resolves to identical names and paths.
#[derive(Debug, Clone, Default)]
pub struct VolumeRegistry {
    volumes: Vec<Volume>,
}

impl VolumeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in shared set every generated manifest carries: the
    /// container-runtime socket, the outer runtime socket, host devices,
    /// and memory-backed scratch space.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for volume in [
            Volume::ephemeral("dockersock", "/var/run"),
            Volume::host("outer-dockersock", "/var/outer-run", "/var/ci-docker"),
            Volume::host("dev", "/dev", "/dev"),
            Volume::memory("tmp", "/tmp"),
        ] {
            // Names are literals distinct by construction
            registry.register(volume).ok();
        }
        registry
    }

    /// Register a volume, rejecting duplicate names
    pub fn register(&mut self, volume: Volume) -> Result<(), GenError> {
        if self.resolve(&volume.name).is_some() {
            return Err(GenError::DuplicateName {
                name: volume.name,
                scope: "volume registry".to_string(),
            });
        }
        self.volumes.push(volume);
        Ok(())
    }

    /// Look a volume up by name
    pub fn resolve(&self, name: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.name == name)
    }

    /// Names of every registered volume, in registration order
    pub fn names(&self) -> Vec<String> {
        self.volumes.iter().map(|v| v.name.clone()).collect()
    }

    /// Per-step derivation: the mount list for the full registry set
    pub fn step_mounts(&self) -> Vec<VolumeMount> {
        self.volumes
            .iter()
            .map(|v| VolumeMount {
                name: v.name.clone(),
                path: v.mount_path.clone(),
            })
            .collect()
    }

    /// Per-pipeline derivation: the declaration list for the full registry set
    pub fn pipeline_volumes(&self) -> Vec<Volume> {
        self.volumes.clone()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}
