// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

//! Built-in pipelines
//!
//! The demonstration scenarios, written in the same format users write
//! their own pipelines in.

use crate::errors::{FlowError, FlowResult};
use crate::pipeline::{Pipeline, PipelineFile};

const BUILTIN: &str = r#"
version: "1"
pipelines:
  - name: just
    description: Deliver a single value
    source:
      type: just
      value: first-mono

  - name: mono-operator
    description: Upper-case a single value before delivery
    source:
      type: just
      value: first-mono
    stages:
      - type: map
        transform: uppercase

  - name: mono-error
    description: Signal an error and print its message
    source:
      type: error
      message: this is an error

  - name: first-flux
    description: Deliver a fixed sequence in order
    source:
      type: items
      items: [One, Two, Three, Four]

  - name: zip-flux
    description: Pair a range with a word list
    source:
      type: zip
      left:
        source: { type: range, start: 1, count: 4 }
      right:
        source: { type: items, items: [One, Two, Three, Four] }
      combiner: { type: join, separator: "-" }

  - name: merge-delayed-flux
    description: Merge two delayed sequences in arrival order
    source:
      type: merge
      flows:
        - source: { type: items, items: [One, Two, Three, Four] }
          stages:
            - { type: delay, millis: 500 }
        - source: { type: range, start: 1, count: 4 }
          stages:
            - { type: delay, millis: 1000 }
    termination: block-last

  - name: repeat-flux
    description: Deliver a sequence five times back to back
    source:
      type: items
      items: [One, Two, Three, Four]
    stages:
      - type: repeat
        times: 4

  - name: retry-mono
    description: Retry a random draw that signals failure below 50
    source:
      type: random
      lower: 1
      upper: 60
      failure: signaled
    stages:
      - type: on-error
        message: "Error happened."
      - type: retry
        max_retries: 5
    error_output: trace

  - name: retry-mono-fault
    description: Retry a random draw that panics below 50
    source:
      type: random
      lower: 1
      upper: 60
      failure: disruptive
    stages:
      - type: on-error
        message: "Error happened."
      - type: retry
        max_retries: 5
    error_output: trace
"#;

/// The built-in pipelines
pub fn builtin() -> FlowResult<PipelineFile> {
    PipelineFile::from_yaml(BUILTIN)
}

/// Find a pipeline by name, looking in `file` first and then the built-ins
pub fn find(name: &str, file: Option<&PipelineFile>) -> FlowResult<Pipeline> {
    if let Some(pipeline) = file.and_then(|f| f.get(name)) {
        return Ok(pipeline.clone());
    }

    let builtin = builtin()?;
    if let Some(pipeline) = builtin.get(name) {
        return Ok(pipeline.clone());
    }

    let mut available: Vec<&str> = builtin.names();
    if let Some(file) = file {
        available.extend(file.names());
    }

    Err(FlowError::UnknownPipeline {
        name: name.to_string(),
        available: available.join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineValidator, Source};

    #[test]
    fn test_builtin_parses() {
        let file = builtin().unwrap();
        assert_eq!(
            file.names(),
            vec![
                "just",
                "mono-operator",
                "mono-error",
                "first-flux",
                "zip-flux",
                "merge-delayed-flux",
                "repeat-flux",
                "retry-mono",
                "retry-mono-fault",
            ]
        );
    }

    #[test]
    fn test_builtin_validates_cleanly() {
        let file = builtin().unwrap();
        let result = PipelineValidator::validate(&file);
        assert!(result.is_valid(), "errors: {:?}", result.errors);
        assert!(!result.has_warnings(), "warnings: {:?}", result.warnings);
    }

    #[test]
    fn test_find_prefers_file() {
        let file = PipelineFile::from_yaml(
            "pipelines:\n  - name: just\n    source: { type: items, items: [x] }\n",
        )
        .unwrap();

        let pipeline = find("just", Some(&file)).unwrap();
        assert!(matches!(pipeline.source, Source::Items { .. }));

        let pipeline = find("just", None).unwrap();
        assert!(matches!(pipeline.source, Source::Just { .. }));
    }

    #[test]
    fn test_find_unknown_lists_available() {
        match find("nope", None) {
            Err(FlowError::UnknownPipeline { name, available }) => {
                assert_eq!(name, "nope");
                assert!(available.contains("zip-flux"));
            }
            other => panic!("expected unknown pipeline, got {:?}", other.map(|p| p.name)),
        }
    }
}
