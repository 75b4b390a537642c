// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Declarative pipelines
//!
//! Pipelines are written as YAML, TOML or JSON, checked by the validator and
//! turned into a running [`Flux`](crate::flow::Flux) by the executor.

pub mod catalog;
mod definition;
mod executor;
mod validation;

pub use definition::*;
pub use executor::{PipelineExecutor, RunReport};
pub use validation::{PipelineValidator, ValidationResult};
