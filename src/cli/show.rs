// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Show command - print a pipeline definition

use miette::Result;
use std::path::PathBuf;

use crate::pipeline::catalog;

/// Run the show command
pub async fn run(name: String, pipeline_path: Option<PathBuf>, _verbose: bool) -> Result<()> {
    let file = super::load_file(pipeline_path.as_deref())?;
    let pipeline = catalog::find(&name, file.as_ref())?;

    print!("{}", pipeline.to_yaml()?);

    Ok(())
}
