// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! # reflow - Reactive pipeline runner
//!
//! `reflow` demonstrates reactive stream pipelines: lazy single-value and
//! sequence containers, operators over them, and the two ways a producer
//! can fail.
//!
//! ## Features
//!
//! - **Lazy containers** - [`Mono`] and [`Flux`] replay their source on every subscription
//! - **Operators** - map, zip, merge, delay, repeat and retry
//! - **Signaled and disruptive failures** - returned errors and caught panics travel the same error channel
//! - **Reproducible randomness** - seed every random source from one value
//! - **Declarative pipelines** - describe a pipeline in YAML, TOML or JSON and run it
//!
//! ## Quick Start
//!
//! ```bash
//! # See the built-in pipelines
//! reflow list
//!
//! # Run one
//! reflow run zip-flux
//!
//! # Run them all, reproducibly
//! reflow run --all --seed 42
//! ```

pub mod cli;
pub mod errors;
pub mod flow;
pub mod pipeline;
pub mod runner;
pub mod utils;

// Re-export commonly used types
pub use errors::{FlowError, FlowResult};
pub use flow::{Flux, Mono, Outcome, Subscriber};
pub use pipeline::{Pipeline, PipelineExecutor, RunReport};
pub use runner::{FailurePolicy, PipelineRunner, RetryReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
