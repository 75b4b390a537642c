// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Error types
//!
//! Every failure a pipeline can observe is a [`FlowError`]. Errors travel
//! through the error channel of a subscription as values, so the type is
//! cheap to clone and carries no borrowed data.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for reflow operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Main error type for reflow
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum FlowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline Signals
    // ─────────────────────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(reflow::signaled))]
    Signaled { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(reflow::fault),
        help("A generator panicked; return a FlowResult instead to signal failures")
    )]
    Fault { message: String },

    #[error("Retries exhausted after {attempts} attempt{}", plural(.attempts))]
    #[diagnostic(
        code(reflow::retries_exhausted),
        help("Every attempt failed; raise max_retries or loosen the generator's bounds")
    )]
    RetriesExhausted {
        attempts: usize,
        #[source]
        last: Box<FlowError>,
    },

    #[error("Zipped sources differ in length: {longer} side still had an item at index {index}")]
    #[diagnostic(
        code(reflow::zip_length_mismatch),
        help("Use the truncating zip policy to stop at the shorter source")
    )]
    ZipLengthMismatch { index: usize, longer: String },

    #[error("Range of {count} from {start} overflows a 64-bit integer")]
    #[diagnostic(
        code(reflow::range_overflow),
        help("Lower the start or the count so the last value fits in an i64")
    )]
    RangeOverflow { start: i64, count: usize },

    #[error("Subscription task failed: {message}")]
    #[diagnostic(code(reflow::subscription_failed))]
    SubscriptionFailed { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline Definition Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(reflow::pipeline_file_not_found),
        help("Pass an existing file with --pipeline or run a built-in pipeline by name")
    )]
    PipelineFileNotFound { path: PathBuf },

    #[error("Unknown pipeline '{name}'")]
    #[diagnostic(code(reflow::unknown_pipeline), help("Available pipelines: {available}"))]
    UnknownPipeline { name: String, available: String },

    #[error("Invalid pipeline configuration: {reason}")]
    #[diagnostic(code(reflow::invalid_pipeline))]
    InvalidPipeline {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/Parsing Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(reflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(reflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(reflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(reflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(reflow::toml_error))]
    Toml { message: String },
}

fn plural(count: &usize) -> &'static str {
    if *count == 1 {
        ""
    } else {
        "s"
    }
}

impl From<std::io::Error> for FlowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for FlowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for FlowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl FlowError {
    /// Create a signaled failure
    pub fn signaled(message: impl Into<String>) -> Self {
        Self::Signaled {
            message: message.into(),
        }
    }

    /// Translate a panic payload into a fault
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "generator panicked".to_string()
        };

        Self::Fault { message }
    }

    /// Whether this error originated from a panic rather than a returned error
    pub fn is_fault(&self) -> bool {
        match self {
            Self::Fault { .. } => true,
            Self::RetriesExhausted { last, .. } => last.is_fault(),
            _ => false,
        }
    }

    /// Render the error followed by its chain of causes, one per line
    pub fn trace(&self) -> String {
        let mut out = format!("{}: {}", self.kind(), self);
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        out
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Signaled { .. } => "SignaledError",
            Self::Fault { .. } => "Fault",
            Self::RetriesExhausted { .. } => "RetriesExhausted",
            Self::ZipLengthMismatch { .. } => "ZipLengthMismatch",
            Self::RangeOverflow { .. } => "RangeOverflow",
            Self::SubscriptionFailed { .. } => "SubscriptionFailed",
            Self::PipelineFileNotFound { .. }
            | Self::UnknownPipeline { .. }
            | Self::InvalidPipeline { .. } => "PipelineError",
            Self::FileReadError { .. } | Self::Io { .. } => "IoError",
            Self::Yaml { .. } | Self::Json { .. } | Self::Toml { .. } => "ParseError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signaled_message() {
        let err = FlowError::signaled("this is an error");
        assert_eq!(err.to_string(), "this is an error");
        assert!(!err.is_fault());
    }

    #[test]
    fn test_from_panic_payloads() {
        let err = FlowError::from_panic(Box::new("Too low number"));
        assert_eq!(err.to_string(), "Too low number");
        assert!(err.is_fault());

        let err = FlowError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.to_string(), "owned");

        let err = FlowError::from_panic(Box::new(42u8));
        assert_eq!(err.to_string(), "generator panicked");
    }

    #[test]
    fn test_trace_includes_causes() {
        let err = FlowError::RetriesExhausted {
            attempts: 6,
            last: Box::new(FlowError::signaled("Too low number")),
        };

        let trace = err.trace();
        assert!(trace.starts_with("RetriesExhausted: Retries exhausted after 6 attempts"));
        assert!(trace.contains("caused by: Too low number"));
    }

    #[test]
    fn test_exhausted_fault_is_fault() {
        let err = FlowError::RetriesExhausted {
            attempts: 1,
            last: Box::new(FlowError::Fault {
                message: "boom".into(),
            }),
        };
        assert!(err.is_fault());
        assert_eq!(err.to_string(), "Retries exhausted after 1 attempt");
    }
}
