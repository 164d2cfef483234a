//! Trigger predicate model
//!
//! A trigger is the predicate structure emitted in the manifest; evaluation
//! against live events is the runner's job. The in-crate [`Trigger::matches`]
//! exists so validation and tests can exercise the same semantics the runner
//! is expected to apply.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Include/exclude sets for one trigger axis
///
/// Entries may contain `*` wildcards (`renovate/*`). Exclude entries take
/// precedence over include entries on the same axis; an axis with neither
/// set is vacuously true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl AxisFilter {
    /// An axis restricted to the given include set
    pub fn including<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        AxisFilter {
            include: values.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    /// An axis rejecting the given exclude set
    pub fn excluding<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        AxisFilter {
            include: Vec::new(),
            exclude: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Check one value against this axis. Exclude wins over include.
    pub fn passes(&self, value: &str) -> bool {
        if self.exclude.iter().any(|p| pattern_matches(p, value)) {
            return false;
        }
        if !self.include.is_empty() {
            return self.include.iter().any(|p| pattern_matches(p, value));
        }
        true
    }
}

/// Match a pattern that may contain `*` wildcards against a value.
///
/// The pattern is anchored at both ends; a malformed pattern falls back to
/// literal comparison, the same degradation the condition patterns apply.
fn pattern_matches(pattern: &str, value: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == value;
    }
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    match Regex::new(&format!("^{}$", escaped)) {
        Ok(regex) => regex.is_match(value),
        Err(_) => pattern == value,
    }
}

/// Predicate over incoming build events controlling pipeline activation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "AxisFilter::is_empty")]
    pub event: AxisFilter,

    #[serde(default, skip_serializing_if = "AxisFilter::is_empty")]
    pub branch: AxisFilter,

    /// Cron schedule names this trigger fires for; cron-gated pipelines
    /// require a matching schedule name on the event
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cron: Vec<String>,

    /// Promotion target labels; target-gated pipelines require a matching
    /// requested label on the event
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target: Vec<String>,
}

/// An incoming build event, as the runner would present it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEvent {
    /// Event kind: push, pull_request, tag, promote, cron, ...
    pub event: String,

    /// Branch the event refers to, empty for pure tag events
    pub branch: String,

    /// Tag ref for tag events
    pub tag_ref: Option<String>,

    /// Cron schedule name for cron events
    pub schedule: Option<String>,

    /// Requested promotion target labels
    pub targets: Vec<String>,
}

impl Trigger {
    pub fn is_empty(&self) -> bool {
        self.event.is_empty()
            && self.branch.is_empty()
            && self.cron.is_empty()
            && self.target.is_empty()
    }

    /// Check an event against every present axis; all must pass.
    pub fn matches(&self, event: &BuildEvent) -> bool {
        if !self.event.passes(&event.event) {
            return false;
        }

        // Tag events carry no branch; the branch axis then applies to the ref
        let branch_value = if event.branch.is_empty() {
            event.tag_ref.as_deref().unwrap_or("")
        } else {
            event.branch.as_str()
        };
        if !self.branch.passes(branch_value) {
            return false;
        }

        if !self.cron.is_empty() {
            let matched = event
                .schedule
                .as_deref()
                .map(|s| self.cron.iter().any(|p| pattern_matches(p, s)))
                .unwrap_or(false);
            if !matched {
                return false;
            }
        }

        if !self.target.is_empty() {
            let matched = event
                .targets
                .iter()
                .any(|t| self.target.iter().any(|p| pattern_matches(p, t)));
            if !matched {
                return false;
            }
        }

        true
    }

    /// Gating conflict the runner cannot honor: a pipeline cannot be both
    /// cron-gated and promotion-target-gated.
    pub fn gating_conflict(&self) -> Option<String> {
        if !self.cron.is_empty() && !self.target.is_empty() {
            Some("cron and promotion-target gating are mutually exclusive".to_string())
        } else {
            None
        }
    }
}
