// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Run command - execute pipelines

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::OutputFormat;
use crate::errors::FlowError;
use crate::flow::{ConsoleSubscriber, FnSubscriber};
use crate::pipeline::{catalog, Pipeline, PipelineExecutor, RunReport};

/// Run pipelines
pub async fn run(
    names: Vec<String>,
    all: bool,
    pipeline_path: Option<PathBuf>,
    seed: Option<u64>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let file = super::load_file(pipeline_path.as_deref())?;

    let pipelines: Vec<Pipeline> = if all {
        match &file {
            Some(file) => file.pipelines.clone(),
            None => catalog::builtin()?.pipelines,
        }
    } else if names.is_empty() {
        return Err(miette::miette!(
            "No pipeline given\n\n\
             Pass one or more names, or --all. Run 'reflow list' to see what is available."
        ));
    } else {
        names
            .iter()
            .map(|name| catalog::find(name, file.as_ref()))
            .collect::<Result<_, _>>()?
    };

    let seed = seed.or_else(|| file.as_ref().and_then(|f| f.settings.seed));
    let executor = match seed {
        Some(seed) => {
            tracing::debug!(seed, "using seeded random source");
            PipelineExecutor::seeded(seed)
        }
        None => PipelineExecutor::unseeded(),
    };

    let mut reports = Vec::with_capacity(pipelines.len());

    match format {
        OutputFormat::Text => {
            let executor = executor.with_notices(Arc::new(|notice: &str| println!("{}", notice)));
            let show_headers = pipelines.len() > 1;

            for (i, pipeline) in pipelines.iter().enumerate() {
                if show_headers {
                    if i > 0 {
                        println!();
                    }
                    println!("{}", format!("== {} ==", pipeline.name).bold());
                }

                let subscriber = ConsoleSubscriber::stdout().with_error_style(pipeline.error_output);
                let report = executor.execute(pipeline, subscriber).await?;

                if verbose {
                    print_summary(&report);
                }
                reports.push(report);
            }
        }
        OutputFormat::Json => {
            for pipeline in &pipelines {
                let sink = FnSubscriber::new(|_: String| {}, |_: FlowError| {});
                reports.push(executor.execute(pipeline, sink).await?);
            }

            let json = serde_json::to_string_pretty(&reports)
                .map_err(|e| miette::miette!("Failed to serialize reports: {}", e))?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    let (mark, status) = if report.succeeded() {
        ("✓".green(), report.status.to_string().green())
    } else {
        ("✗".red(), report.status.to_string().red())
    };

    println!(
        "  {} {} {} ({} item{}, {}ms)",
        mark,
        report.pipeline.bold(),
        status,
        report.delivered,
        if report.delivered == 1 { "" } else { "s" },
        report.elapsed_ms
    );
}
