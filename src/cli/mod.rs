// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for reflow.

pub mod list;
pub mod run;
pub mod show;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineFile;

/// Reactive pipeline runner
///
/// Runs the built-in demonstration pipelines or your own pipeline files.
#[derive(Parser, Debug)]
#[clap(
    name = "reflow",
    version,
    about = "Run reactive stream pipelines and watch their signals",
    long_about = None,
    after_help = "Examples:\n\
        reflow list                          List available pipelines\n\
        reflow run zip-flux                  Run one pipeline\n\
        reflow run --all --seed 7            Run every built-in pipeline reproducibly\n\
        reflow run mine -p pipelines.yaml    Run a pipeline from a file\n\n\
        See 'reflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available pipelines
    List {
        /// Also list pipelines from this file
        #[clap(short, long)]
        pipeline: Option<PathBuf>,
    },

    /// Print a pipeline definition as YAML
    Show {
        /// Pipeline name
        name: String,

        /// Look in this file before the built-ins
        #[clap(short, long)]
        pipeline: Option<PathBuf>,
    },

    /// Validate a pipeline file (the built-ins when omitted)
    Validate {
        /// Pipeline file to validate
        pipeline: Option<PathBuf>,
    },

    /// Run pipelines, printing every signal
    Run {
        /// Pipelines to run, in order
        names: Vec<String>,

        /// Run every pipeline (from the file when given, else the built-ins)
        #[clap(short, long, conflicts_with = "names")]
        all: bool,

        /// Look in this file before the built-ins
        #[clap(short, long)]
        pipeline: Option<PathBuf>,

        /// Seed for random sources
        #[clap(short, long, env = "REFLOW_SEED")]
        seed: Option<u64>,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Load an optional pipeline file for a command
pub(crate) fn load_file(path: Option<&Path>) -> miette::Result<Option<PipelineFile>> {
    match path {
        Some(path) => {
            let file = PipelineFile::from_file(path)?;
            tracing::debug!(path = %path.display(), pipelines = file.pipelines.len(), "loaded pipeline file");
            Ok(Some(file))
        }
        None => Ok(None),
    }
}
