mod cli;
mod core;
mod error;
mod graph;
mod manifest;

use anyhow::{Context, Result};
use cli::commands::{GenerateCommand, ListCommand, ValidateCommand};
use cli::output::*;
use cli::{Cli, Command};
use crate::core::config::SourceConfig;
use manifest::Manifest;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; diagnostics go to stderr so the emitted manifest
    // owns stdout
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Generate(cmd) => generate_manifest(cmd)?,
        Command::Validate(cmd) => validate_definition(cmd)?,
        Command::List(cmd) => list_pipelines(cmd)?,
    }

    Ok(())
}

fn generate_manifest(cmd: &GenerateCommand) -> Result<()> {
    let config = SourceConfig::from_file(&cmd.file)
        .context("Failed to load source definition")?;

    let synthesis = config.synthesize();
    let report = graph::validate(&synthesis);

    if !report.is_clean() {
        for violation in &report.violations {
            eprintln!("{}", format_violation(violation));
        }
        eprintln!("{}", format_report_summary(&report));
        std::process::exit(1);
    }

    let manifest = Manifest::assemble(&synthesis);
    debug!(pipelines = manifest.pipelines.len(), "manifest assembled");

    let out = manifest::emit(&manifest, &synthesis.registry, cmd.format.into())?;
    print!("{}", out);

    Ok(())
}

fn validate_definition(cmd: &ValidateCommand) -> Result<()> {
    eprintln!("{} Validating source definition...", INFO);

    let config = SourceConfig::from_file(&cmd.file)
        .context("Failed to load source definition")?;

    let synthesis = config.synthesize();
    let report = graph::validate(&synthesis);

    if cmd.json {
        let data = serde_json::json!({
            "valid": report.is_clean(),
            "pipelines": synthesis.pipelines.len(),
            "violations": report.violations.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for violation in &report.violations {
            println!("{}", format_violation(violation));
        }
        println!("{}", format_report_summary(&report));
        if report.is_clean() {
            println!("  Pipelines: {}", style(synthesis.pipelines.len()).cyan());
            println!("  Volumes: {}", style(synthesis.registry.len()).cyan());
        }
    }

    if !report.is_clean() {
        std::process::exit(1);
    }

    Ok(())
}

fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let config = SourceConfig::from_file(&cmd.file)
        .context("Failed to load source definition")?;

    let synthesis = config.synthesize();
    let manifest = Manifest::assemble(&synthesis);

    if cmd.json {
        let pipelines: Vec<_> = manifest
            .pipelines
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "steps": p.step_names(),
                    "depends_on": p.depends_on,
                })
            })
            .collect();
        let data = serde_json::json!({ "pipelines": pipelines });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Pipelines in emission order:", INFO);
    for pipeline in &manifest.pipelines {
        println!("{}", format_pipeline_line(pipeline));
    }

    match graph::pipeline_order(&manifest.pipelines) {
        Ok(order) => println!(
            "{} Execution order: {}",
            INFO,
            style(order.join(" -> ")).dim()
        ),
        Err(err) => println!("{} {}", WARN, style(err).yellow()),
    }

    Ok(())
}
