// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Pipeline definition structures
//!
//! Defines the schema for pipeline files. A file holds any number of named
//! pipelines; each one is a source, an ordered list of stages, and a
//! termination mode.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{FlowError, FlowResult};
use crate::flow::{ErrorStyle, ZipPolicy};
use crate::runner::{FailurePolicy, DEFAULT_THRESHOLD};

/// A pipeline file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFile {
    /// File format version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Settings applied to every run from this file
    #[serde(default)]
    pub settings: Settings,

    /// Pipelines defined in this file
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
}

fn default_version() -> String {
    "1".to_string()
}

impl PipelineFile {
    /// Load from disk, choosing the format by extension (`.toml`, `.json`,
    /// anything else is YAML)
    pub fn from_file(path: &Path) -> FlowResult<Self> {
        if !path.exists() {
            return Err(FlowError::PipelineFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FlowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    pub fn from_yaml(yaml: &str) -> FlowResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    pub fn from_toml(text: &str) -> FlowResult<Self> {
        toml::from_str(text).map_err(Into::into)
    }

    pub fn from_json(json: &str) -> FlowResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Get a pipeline by name
    pub fn get(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    /// Get all pipeline names
    pub fn names(&self) -> Vec<&str> {
        self.pipelines.iter().map(|p| p.name.as_str()).collect()
    }
}

/// File-wide settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Seed for random sources; unseeded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// A named pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline name (must be unique within a file)
    pub name: String,

    /// Pipeline description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Where items come from
    pub source: Source,

    /// Operators applied to the source, in order
    #[serde(default)]
    pub stages: Vec<Stage>,

    /// How the run is driven to completion
    #[serde(default)]
    pub termination: Termination,

    /// How a terminal error is printed
    #[serde(default)]
    pub error_output: ErrorStyle,
}

impl Pipeline {
    /// Serialize pipeline to YAML
    pub fn to_yaml(&self) -> FlowResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }
}

/// A source with its own stages, used inside `zip` and `merge`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    pub source: Source,

    #[serde(default)]
    pub stages: Vec<Stage>,
}

/// Item sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Source {
    /// A single value
    Just { value: String },

    /// A signaled error, no items
    Error { message: String },

    /// A fixed list of items
    Items { items: Vec<String> },

    /// `count` consecutive integers from `start`
    Range { start: i64, count: usize },

    /// One draw in `lower..=upper` per subscription; draws below
    /// `threshold` fail
    Random {
        lower: i64,
        upper: i64,
        #[serde(default = "default_threshold")]
        threshold: i64,
        #[serde(default)]
        failure: FailurePolicy,
    },

    /// Two flows combined positionally
    Zip {
        left: Box<Flow>,
        right: Box<Flow>,
        #[serde(default)]
        combiner: Combiner,
        #[serde(default)]
        policy: ZipPolicy,
    },

    /// Flows interleaved in arrival order
    Merge { flows: Vec<Flow> },
}

fn default_threshold() -> i64 {
    DEFAULT_THRESHOLD
}

impl Source {
    /// Source type name as written in pipeline files
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Just { .. } => "just",
            Self::Error { .. } => "error",
            Self::Items { .. } => "items",
            Self::Range { .. } => "range",
            Self::Random { .. } => "random",
            Self::Zip { .. } => "zip",
            Self::Merge { .. } => "merge",
        }
    }

    /// Whether the source holds at most one value
    pub fn is_single(&self) -> bool {
        matches!(self, Self::Just { .. } | Self::Error { .. } | Self::Random { .. })
    }

    /// Whether a subscription to this source can end in an error
    pub fn can_fail(&self) -> bool {
        match self {
            Self::Error { .. } | Self::Random { .. } => true,
            Self::Zip { left, right, policy, .. } => {
                *policy == ZipPolicy::Strict || left.can_fail() || right.can_fail()
            }
            Self::Merge { flows } => flows.iter().any(Flow::can_fail),
            Self::Just { .. } | Self::Items { .. } | Self::Range { .. } => false,
        }
    }
}

impl Flow {
    pub fn can_fail(&self) -> bool {
        self.source.can_fail()
    }
}

/// Pipeline stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Stage {
    /// Apply a transform to each item
    Map {
        transform: Transform,
        /// Argument for `prefix` and `suffix`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },

    /// Delay each item
    Delay { millis: u64 },

    /// Replay the whole source after it completes
    Repeat { times: usize },

    /// Resubscribe after errors
    Retry { max_retries: usize },

    /// Publish a notice on every error passing through
    OnError { message: String },
}

impl Stage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Map { .. } => "map",
            Self::Delay { .. } => "delay",
            Self::Repeat { .. } => "repeat",
            Self::Retry { .. } => "retry",
            Self::OnError { .. } => "on-error",
        }
    }
}

/// Item transforms
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Uppercase,
    Lowercase,
    Reverse,
    Trim,
    Prefix,
    Suffix,
}

impl Transform {
    /// Whether the transform needs a `value` argument
    pub fn takes_value(&self) -> bool {
        matches!(self, Self::Prefix | Self::Suffix)
    }

    pub fn apply(&self, value: Option<&str>, input: &str) -> String {
        match self {
            Self::Uppercase => input.to_uppercase(),
            Self::Lowercase => input.to_lowercase(),
            Self::Reverse => input.chars().rev().collect(),
            Self::Trim => input.trim().to_string(),
            Self::Prefix => format!("{}{}", value.unwrap_or_default(), input),
            Self::Suffix => format!("{}{}", input, value.unwrap_or_default()),
        }
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uppercase => write!(f, "uppercase"),
            Self::Lowercase => write!(f, "lowercase"),
            Self::Reverse => write!(f, "reverse"),
            Self::Trim => write!(f, "trim"),
            Self::Prefix => write!(f, "prefix"),
            Self::Suffix => write!(f, "suffix"),
        }
    }
}

/// How zipped pairs become one item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Combiner {
    /// `left`, separator, `right`
    Join {
        #[serde(default = "default_separator")]
        separator: String,
    },

    /// Text with `{left}` and `{right}` placeholders
    Template { template: String },
}

fn default_separator() -> String {
    "-".to_string()
}

impl Default for Combiner {
    fn default() -> Self {
        Self::Join {
            separator: default_separator(),
        }
    }
}

impl Combiner {
    pub fn combine(&self, left: &str, right: &str) -> String {
        match self {
            Self::Join { separator } => format!("{}{}{}", left, separator, right),
            Self::Template { template } => template
                .replace("{left}", left)
                .replace("{right}", right),
        }
    }
}

/// How a run is driven
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// Deliver on a spawned task; the run waits for it to finish
    #[default]
    Subscribe,
    /// Deliver on the caller's task and keep the last item
    BlockLast,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version: "1"
settings:
  seed: 7
pipelines:
  - name: shout
    source:
      type: items
      items: [a, b]
    stages:
      - type: map
        transform: uppercase
      - type: repeat
        times: 1
  - name: pairs
    source:
      type: zip
      left:
        source: { type: range, start: 1, count: 2 }
      right:
        source: { type: items, items: [x, y] }
      combiner: { type: template, template: "{left}:{right}" }
    termination: block-last
"#;

    #[test]
    fn test_parse_yaml() {
        let file = PipelineFile::from_yaml(SAMPLE).unwrap();

        assert_eq!(file.settings.seed, Some(7));
        assert_eq!(file.names(), vec!["shout", "pairs"]);

        let shout = file.get("shout").unwrap();
        assert_eq!(shout.stages.len(), 2);
        assert_eq!(shout.termination, Termination::Subscribe);
        assert_eq!(shout.error_output, ErrorStyle::Message);

        let pairs = file.get("pairs").unwrap();
        assert_eq!(pairs.termination, Termination::BlockLast);
        match &pairs.source {
            Source::Zip {
                combiner, policy, ..
            } => {
                assert_eq!(combiner.combine("1", "x"), "1:x");
                assert_eq!(*policy, ZipPolicy::Truncate);
            }
            other => panic!("expected zip source, got {}", other.kind()),
        }
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
[[pipelines]]
name = "retry"
error_output = "trace"

[pipelines.source]
type = "random"
lower = 1
upper = 60
failure = "disruptive"

[[pipelines.stages]]
type = "retry"
max_retries = 5
"#;
        let file = PipelineFile::from_toml(text).unwrap();
        let pipeline = file.get("retry").unwrap();

        assert_eq!(pipeline.error_output, ErrorStyle::Trace);
        match &pipeline.source {
            Source::Random {
                threshold, failure, ..
            } => {
                assert_eq!(*threshold, DEFAULT_THRESHOLD);
                assert_eq!(*failure, FailurePolicy::Disruptive);
            }
            other => panic!("expected random source, got {}", other.kind()),
        }
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"pipelines":[{"name":"one","source":{"type":"just","value":"x"}}]}"#;
        let file = PipelineFile::from_json(json).unwrap();
        assert_eq!(file.version, "1");
        assert!(file.get("one").unwrap().source.is_single());
    }

    #[test]
    fn test_unknown_source_type_is_rejected() {
        let yaml = "pipelines:\n  - name: bad\n    source:\n      type: bogus\n";
        assert!(matches!(
            PipelineFile::from_yaml(yaml),
            Err(FlowError::Yaml { .. })
        ));
    }

    #[test]
    fn test_yaml_round_trip_keeps_name() {
        let file = PipelineFile::from_yaml(SAMPLE).unwrap();
        let yaml = file.get("shout").unwrap().to_yaml().unwrap();
        assert!(yaml.contains("name: shout"));
        assert!(yaml.contains("type: items"));
    }

    #[test]
    fn test_transforms() {
        assert_eq!(Transform::Uppercase.apply(None, "first-mono"), "FIRST-MONO");
        assert_eq!(Transform::Reverse.apply(None, "abc"), "cba");
        assert_eq!(Transform::Prefix.apply(Some("> "), "x"), "> x");
        assert_eq!(Transform::Suffix.apply(None, "x"), "x");
        assert!(Transform::Suffix.takes_value());
        assert!(!Transform::Trim.takes_value());
    }

    #[test]
    fn test_can_fail() {
        let strict = Source::Zip {
            left: Box::new(Flow {
                source: Source::Range { start: 1, count: 1 },
                stages: vec![],
            }),
            right: Box::new(Flow {
                source: Source::Just { value: "x".into() },
                stages: vec![],
            }),
            combiner: Combiner::default(),
            policy: ZipPolicy::Strict,
        };
        assert!(strict.can_fail());
        assert!(!Source::Items { items: vec![] }.can_fail());
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineFile::from_file(Path::new("/nonexistent/reflow.yaml")).unwrap_err();
        assert!(matches!(err, FlowError::PipelineFileNotFound { .. }));
    }
}
