//! Test utility functions for pipeforge

use pipeforge::{
    emit, validate, Manifest, OutputFormat, SourceConfig, Synthesis, ValidationReport,
};

/// Parse and synthesize a source definition from YAML
pub fn synthesize(yaml: &str) -> Synthesis {
    SourceConfig::from_yaml(yaml)
        .unwrap_or_else(|e| panic!("Failed to parse source definition: {}", e))
        .synthesize()
}

/// Run the full generation flow, asserting a clean validation report
pub fn generate(yaml: &str, format: OutputFormat) -> String {
    let synthesis = synthesize(yaml);
    let report = validate(&synthesis);
    assert_clean(&report);

    let manifest = Manifest::assemble(&synthesis);
    emit(&manifest, &synthesis.registry, format)
        .unwrap_or_else(|e| panic!("Failed to emit manifest: {}", e))
}

/// Synthesize and validate, returning the report
pub fn check(yaml: &str) -> ValidationReport {
    validate(&synthesize(yaml))
}

/// Assert a report has no violations
pub fn assert_clean(report: &ValidationReport) {
    assert!(
        report.is_clean(),
        "expected no violations, got:\n{}",
        report
    );
}

/// The release definition from the build/test/release family: a final
/// aggregation step depending on every packaging step by name.
pub fn release_definition() -> &'static str {
    r#"
registry: registry.example.com
pipelines:
  - name: release
    service_container: true
    trigger:
      event:
        include: [tag]
    steps:
      - name: build
      - name: cloud-images
        depends_on: [build]
      - name: cni-bundle
        depends_on: [build]
      - name: images
        depends_on: [build]
      - name: sbcs
        depends_on: [build]
      - name: iso
        depends_on: [build]
      - name: push
        depends_on: [images]
      - name: release-notes
        depends_on: [build]
      - name: release
        depends_on: [cloud-images, cni-bundle, images, sbcs, iso, push]
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_definition_is_clean() {
        assert_clean(&check(release_definition()));
    }

    #[test]
    fn test_generate_produces_output() {
        let out = generate(release_definition(), OutputFormat::Yaml);
        assert!(out.starts_with("---\n"));
    }
}
