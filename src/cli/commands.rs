//! CLI command definitions

use crate::manifest::OutputFormat;
use clap::Args;

/// Generate the manifest from a source definition
#[derive(Debug, Args, Clone)]
pub struct GenerateCommand {
    /// Path to the source-definition YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormatArg::Yaml)]
    pub format: OutputFormatArg,
}

/// Validate a source definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the source-definition YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List the pipelines a source definition would emit
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Path to the source-definition YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Output format argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormatArg {
    Yaml,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Yaml => OutputFormat::Yaml,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}
