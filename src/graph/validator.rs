//! Graph validation over the assembled object graph
//!
//! Runs after every step and pipeline is constructed. Dependency names are
//! resolved through a lookup table built once per graph (arena-plus-index),
//! never as direct object links, which keeps cycle detection a pure
//! graph-algorithm concern. Validation is exhaustive: every violation found
//! in a single run is collected so one regeneration attempt surfaces every
//! needed fix.

use crate::core::config::Synthesis;
use crate::core::pipeline::Pipeline;
use crate::core::volume::VolumeRegistry;
use crate::error::GenError;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Every violation found in a single validation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<GenError>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for violation in &self.violations {
            writeln!(f, "{}", violation)?;
        }
        Ok(())
    }
}

/// Validate a synthesized manifest, collecting every violation.
///
/// Seeds the report with the violations synthesis already found (duplicate
/// volume registrations), then runs the name, graph, volume, and trigger
/// passes.
pub fn validate(synthesis: &Synthesis) -> ValidationReport {
    let mut violations = synthesis.violations.clone();

    check_pipeline_names(&synthesis.pipelines, &mut violations);

    for pipeline in &synthesis.pipelines {
        let scope = format!("pipeline '{}'", pipeline.name);
        check_step_names(pipeline, &scope, &mut violations);

        let nodes: Vec<(String, Vec<String>)> = pipeline
            .steps
            .iter()
            .map(|s| (s.name.clone(), s.depends_on.clone()))
            .collect();
        check_graph(&scope, &nodes, &mut violations);

        check_volumes(pipeline, &synthesis.registry, &mut violations);
        check_triggers(pipeline, &mut violations);
    }

    let nodes: Vec<(String, Vec<String>)> = synthesis
        .pipelines
        .iter()
        .map(|p| (p.name.clone(), p.depends_on.clone()))
        .collect();
    check_graph("manifest", &nodes, &mut violations);

    debug!(violations = violations.len(), "validation finished");
    ValidationReport { violations }
}

/// Topological order of the manifest's pipelines, dependencies first.
///
/// Errors with the first cycle found; unresolved names are ignored here
/// because `validate` reports them separately.
pub fn pipeline_order(pipelines: &[Pipeline]) -> Result<Vec<String>, GenError> {
    let nodes: Vec<(String, Vec<String>)> = pipelines
        .iter()
        .map(|p| (p.name.clone(), p.depends_on.clone()))
        .collect();

    let mut violations = Vec::new();
    let order = check_graph("manifest", &nodes, &mut violations);

    match violations
        .into_iter()
        .find(|v| matches!(v, GenError::CycleDetected { .. }))
    {
        Some(cycle) => Err(cycle),
        None => Ok(order),
    }
}

fn check_pipeline_names(pipelines: &[Pipeline], violations: &mut Vec<GenError>) {
    let mut seen: Vec<&str> = Vec::new();
    for pipeline in pipelines {
        if seen.contains(&pipeline.name.as_str()) {
            violations.push(GenError::DuplicateName {
                name: pipeline.name.clone(),
                scope: "manifest".to_string(),
            });
        } else {
            seen.push(&pipeline.name);
        }
    }
}

fn check_step_names(pipeline: &Pipeline, scope: &str, violations: &mut Vec<GenError>) {
    let mut seen: Vec<&str> = Vec::new();
    for step in &pipeline.steps {
        if seen.contains(&step.name.as_str()) {
            violations.push(GenError::DuplicateName {
                name: step.name.clone(),
                scope: scope.to_string(),
            });
        } else {
            seen.push(&step.name);
        }
    }
}

fn check_volumes(pipeline: &Pipeline, registry: &VolumeRegistry, violations: &mut Vec<GenError>) {
    for step in &pipeline.steps {
        for volume in &step.volumes {
            if registry.resolve(volume).is_none() {
                violations.push(GenError::UnknownVolume {
                    step: step.name.clone(),
                    volume: volume.clone(),
                });
            }
        }
    }
}

fn check_triggers(pipeline: &Pipeline, violations: &mut Vec<GenError>) {
    if let Some(reason) = pipeline.trigger.gating_conflict() {
        violations.push(GenError::InvalidTrigger {
            pipeline: pipeline.name.clone(),
            reason,
        });
    }

    for step in &pipeline.steps {
        if let Some(reason) = step.when.as_ref().and_then(|w| w.gating_conflict()) {
            violations.push(GenError::InvalidTrigger {
                pipeline: pipeline.name.clone(),
                reason: format!("step '{}': {}", step.name, reason),
            });
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Resolve dependency names and topologically sort one graph level.
///
/// Unresolved names are reported and their edges skipped; each back edge
/// found during the sort is reported as a full cycle path, closed on the
/// starting node. Returns the topological order of the resolvable nodes,
/// dependencies first.
fn check_graph(
    scope: &str,
    nodes: &[(String, Vec<String>)],
    violations: &mut Vec<GenError>,
) -> Vec<String> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (name.as_str(), i))
        .collect();

    // Resolve edges up front so the sort only walks known nodes
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, (name, deps)) in nodes.iter().enumerate() {
        for dep in deps {
            match index.get(dep.as_str()) {
                Some(&j) => edges[i].push(j),
                None => violations.push(GenError::UnresolvedDependency {
                    owner: name.clone(),
                    dependency: dep.clone(),
                    scope: scope.to_string(),
                }),
            }
        }
    }

    let mut state = vec![Visit::Unvisited; nodes.len()];
    let mut path: Vec<usize> = Vec::new();
    let mut order: Vec<String> = Vec::new();

    for start in 0..nodes.len() {
        if state[start] == Visit::Unvisited {
            visit(
                start, nodes, &edges, scope, &mut state, &mut path, &mut order, violations,
            );
        }
    }

    order
}

#[allow(clippy::too_many_arguments)]
fn visit(
    node: usize,
    nodes: &[(String, Vec<String>)],
    edges: &[Vec<usize>],
    scope: &str,
    state: &mut [Visit],
    path: &mut Vec<usize>,
    order: &mut Vec<String>,
    violations: &mut Vec<GenError>,
) {
    state[node] = Visit::InProgress;
    path.push(node);

    for &dep in &edges[node] {
        match state[dep] {
            Visit::Unvisited => {
                visit(dep, nodes, edges, scope, state, path, order, violations);
            }
            Visit::InProgress => {
                // Back edge: the cycle runs from the dependency's position
                // in the current path back to this node
                let from = path.iter().position(|&n| n == dep).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[from..].iter().map(|&n| nodes[n].0.clone()).collect();
                cycle.push(nodes[dep].0.clone());
                violations.push(GenError::CycleDetected {
                    scope: scope.to_string(),
                    cycle,
                });
            }
            Visit::Done => {}
        }
    }

    path.pop();
    state[node] = Visit::Done;
    order.push(nodes[node].0.clone());
}
