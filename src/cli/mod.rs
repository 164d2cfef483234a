//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{GenerateCommand, ListCommand, ValidateCommand};

/// CI pipeline manifest generator
#[derive(Debug, Parser, Clone)]
#[command(name = "pipeforge")]
#[command(author = "Pipeforge Contributors")]
#[command(version = "0.1.0")]
#[command(about = "A CI pipeline manifest generator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Generate the manifest from a source definition
    Generate(GenerateCommand),

    /// Validate a source definition
    Validate(ValidateCommand),

    /// List the pipelines a source definition would emit
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
