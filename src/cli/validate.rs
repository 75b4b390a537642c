// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Validate command - check pipeline definitions

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{catalog, PipelineFile, PipelineValidator};

/// Run the validate command
pub async fn run(pipeline_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipelines...".bold());
    println!();

    let file = match &pipeline_path {
        Some(path) => match PipelineFile::from_file(path) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("  {} Failed to parse {}", "✗".red(), path.display());
                eprintln!();
                return Err(e.into());
            }
        },
        None => catalog::builtin()?,
    };

    match &pipeline_path {
        Some(path) => println!("  {} {} parsed", "✓".green(), path.display()),
        None => println!("  {} Built-in pipelines parsed", "✓".green()),
    }

    let validation = PipelineValidator::validate(&file);

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Summary".bold());
        if let Some(seed) = file.settings.seed {
            println!("  Seed: {}", seed);
        }
        for pipeline in &file.pipelines {
            println!(
                "    - {} ({}, {} stage{})",
                pipeline.name,
                pipeline.source.kind(),
                pipeline.stages.len(),
                if pipeline.stages.len() == 1 { "" } else { "s" }
            );
        }
    }

    println!();

    if !validation.is_valid() {
        Err(miette::miette!("Pipeline validation failed"))
    } else if validation.has_warnings() {
        println!("{}", "Pipelines are valid but have warnings.".yellow().bold());
        Ok(())
    } else {
        println!("{}", "Pipelines are valid!".green().bold());
        Ok(())
    }
}
