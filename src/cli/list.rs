// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! List command - show available pipelines

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{catalog, Pipeline};
use crate::utils::print_section;

/// Run the list command
pub async fn run(pipeline_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    let file = super::load_file(pipeline_path.as_deref())?;

    if let Some(file) = &file {
        let title = pipeline_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        print_section(&title);
        print_pipelines(&file.pipelines, verbose);
    }

    print_section("Built-in pipelines");
    print_pipelines(&catalog::builtin()?.pipelines, verbose);

    Ok(())
}

fn print_pipelines(pipelines: &[Pipeline], verbose: bool) {
    let width = pipelines.iter().map(|p| p.name.len()).max().unwrap_or(0);

    for pipeline in pipelines {
        let description = pipeline.description.as_deref().unwrap_or("");
        println!(
            "  {:width$}  {}",
            pipeline.name.bold(),
            description.dimmed(),
            width = width
        );

        if verbose {
            let stages: Vec<&str> = pipeline.stages.iter().map(|s| s.kind()).collect();
            let chain = std::iter::once(pipeline.source.kind())
                .chain(stages)
                .collect::<Vec<_>>()
                .join(" → ");
            println!("  {:width$}  {}", "", chain.cyan(), width = width);
        }
    }
}
