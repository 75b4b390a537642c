// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! reflow - reactive pipeline runner
//!
//! Run declarative Mono/Flux pipelines and print every signal they emit.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with delivered items
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reflow=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    reflow::utils::init_colors();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::List { pipeline } => reflow::cli::list::run(pipeline, cli.verbose).await,
        Commands::Show { name, pipeline } => {
            reflow::cli::show::run(name, pipeline, cli.verbose).await
        }
        Commands::Validate { pipeline } => {
            reflow::cli::validate::run(pipeline, cli.verbose).await
        }
        Commands::Run {
            names,
            all,
            pipeline,
            seed,
            format,
        } => reflow::cli::run::run(names, all, pipeline, seed, format, cli.verbose).await,
    }
}
