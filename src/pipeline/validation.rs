// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Pipeline validation
//!
//! Validates pipeline definitions before execution.

use std::collections::HashSet;

use crate::flow::Flux;
use crate::pipeline::{Flow, Pipeline, PipelineFile, Source, Stage};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate every pipeline in a file
    pub fn validate(file: &PipelineFile) -> ValidationResult {
        let mut result = ValidationResult::new();

        if file.pipelines.is_empty() {
            result.add_error("File defines no pipelines");
        }

        let mut seen_names = HashSet::new();
        for pipeline in &file.pipelines {
            if !seen_names.insert(&pipeline.name) {
                result.add_error(&format!("Duplicate pipeline name: '{}'", pipeline.name));
            }
        }

        for pipeline in &file.pipelines {
            Self::validate_pipeline(pipeline, &mut result);
        }

        result
    }

    /// Validate a single pipeline
    pub fn validate_pipeline(pipeline: &Pipeline, result: &mut ValidationResult) {
        if pipeline.name.trim().is_empty() {
            result.add_error("Pipeline has an empty name");
        }

        let label = format!("Pipeline '{}'", pipeline.name);
        Self::validate_flow(&label, &pipeline.source, &pipeline.stages, result);
    }

    fn validate_flow(label: &str, source: &Source, stages: &[Stage], result: &mut ValidationResult) {
        Self::validate_source(label, source, result);

        // exhausted retries still end in an error, so no stage clears this
        let can_fail = source.can_fail();
        for (i, stage) in stages.iter().enumerate() {
            let at = format!("{}, stage {} ({})", label, i + 1, stage.kind());
            match stage {
                Stage::Map { transform, value } => {
                    if transform.takes_value() && value.is_none() {
                        result.add_error(&format!("{}: '{}' needs a value", at, transform));
                    } else if !transform.takes_value() && value.is_some() {
                        result.add_warning(&format!("{}: '{}' ignores its value", at, transform));
                    }
                }
                Stage::Delay { millis } => {
                    if *millis == 0 {
                        result.add_warning(&format!("{}: zero delay has no effect", at));
                    }
                }
                Stage::Repeat { .. } => {
                    if can_fail {
                        result.add_warning(&format!(
                            "{}: repetition stops at the first error of the source",
                            at
                        ));
                    }
                }
                Stage::Retry { .. } => {
                    if !can_fail {
                        result.add_warning(&format!("{}: nothing before it can fail", at));
                    }
                }
                Stage::OnError { message } => {
                    if !can_fail {
                        result.add_warning(&format!("{}: will never fire", at));
                    }
                    if message.is_empty() {
                        result.add_warning(&format!("{}: empty message", at));
                    }
                }
            }
        }
    }

    fn validate_source(label: &str, source: &Source, result: &mut ValidationResult) {
        match source {
            Source::Random {
                lower,
                upper,
                threshold,
                ..
            } => {
                if lower > upper {
                    result.add_error(&format!(
                        "{}: random bounds are reversed ({} > {})",
                        label, lower, upper
                    ));
                } else if threshold > upper {
                    result.add_warning(&format!(
                        "{}: threshold {} is above the upper bound, every draw fails",
                        label, threshold
                    ));
                } else if threshold <= lower {
                    result.add_warning(&format!(
                        "{}: threshold {} is at or below the lower bound, no draw fails",
                        label, threshold
                    ));
                }
            }
            Source::Items { items } => {
                if items.is_empty() {
                    result.add_warning(&format!("{}: item list is empty", label));
                }
            }
            Source::Range { start, count } => {
                if *count == 0 {
                    result.add_warning(&format!("{}: range is empty", label));
                } else if !Flux::range_fits(*start, *count) {
                    result.add_error(&format!(
                        "{}: range of {} from {} overflows a 64-bit integer",
                        label, count, start
                    ));
                }
            }
            Source::Zip { left, right, .. } => {
                Self::validate_sub_flow(&format!("{} > zip left", label), left, result);
                Self::validate_sub_flow(&format!("{} > zip right", label), right, result);
            }
            Source::Merge { flows } => {
                if flows.is_empty() {
                    result.add_error(&format!("{}: merge has no flows", label));
                }
                for (i, flow) in flows.iter().enumerate() {
                    Self::validate_sub_flow(&format!("{} > merge[{}]", label, i), flow, result);
                }
            }
            Source::Just { .. } | Source::Error { .. } => {}
        }
    }

    fn validate_sub_flow(label: &str, flow: &Flow, result: &mut ValidationResult) {
        Self::validate_flow(label, &flow.source, &flow.stages, result);
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(yaml: &str) -> ValidationResult {
        PipelineValidator::validate(&PipelineFile::from_yaml(yaml).unwrap())
    }

    #[test]
    fn test_validate_empty_file() {
        let result = validate("pipelines: []\n");
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("no pipelines"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let result = validate(
            r#"
pipelines:
  - name: dup
    source: { type: just, value: a }
  - name: dup
    source: { type: just, value: b }
"#,
        );
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn test_validate_reversed_random_bounds() {
        let result = validate(
            r#"
pipelines:
  - name: bad
    source: { type: random, lower: 60, upper: 1 }
"#,
        );
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("reversed"));
    }

    #[test]
    fn test_validate_threshold_warnings() {
        let result = validate(
            r#"
pipelines:
  - name: always-fails
    source: { type: random, lower: 1, upper: 10, threshold: 50 }
  - name: never-fails
    source: { type: random, lower: 60, upper: 90, threshold: 50 }
"#,
        );
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("every draw fails")));
        assert!(result.warnings.iter().any(|w| w.contains("no draw fails")));
    }

    #[test]
    fn test_validate_prefix_needs_value() {
        let result = validate(
            r#"
pipelines:
  - name: prefixed
    source: { type: just, value: a }
    stages:
      - { type: map, transform: prefix }
"#,
        );
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("needs a value"));
    }

    #[test]
    fn test_validate_pointless_retry() {
        let result = validate(
            r#"
pipelines:
  - name: steady
    source: { type: items, items: [a] }
    stages:
      - { type: retry, max_retries: 3 }
      - { type: on-error, message: oops }
"#,
        );
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("nothing before it can fail")));
        assert!(result.warnings.iter().any(|w| w.contains("never fire")));
    }

    #[test]
    fn test_validate_nested_flows() {
        let result = validate(
            r#"
pipelines:
  - name: nested
    source:
      type: merge
      flows:
        - source: { type: items, items: [] }
        - source: { type: random, lower: 5, upper: 1 }
"#,
        );
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("merge[1]"));
        assert!(result.warnings.iter().any(|w| w.contains("merge[0]")));
    }

    #[test]
    fn test_validate_range_overflow() {
        let result = validate(
            r#"
pipelines:
  - name: big
    source: { type: range, start: 9223372036854775806, count: 3 }
  - name: edge
    source: { type: range, start: 9223372036854775806, count: 2 }
"#,
        );
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("'big'"));
        assert!(result.errors[0].contains("overflows"));
    }

    #[test]
    fn test_validate_empty_merge() {
        let result = validate(
            r#"
pipelines:
  - name: nothing
    source: { type: merge, flows: [] }
"#,
        );
        assert!(!result.is_valid());
    }
}
