//! Error types for the buildflow engine.
//!
//! Configuration errors (duplicate task names, sequential tasks sharing a
//! stage) are fatal at graph-construction time. Validation errors surface
//! per task at execution time. Cancellation is not an error and is carried
//! in [`crate::execute::RunOutcome`] instead.

use thiserror::Error;

/// The main error type for buildflow operations.
#[derive(Debug, Error)]
pub enum BuildFlowError {
    /// A configuration error found while building the stage graph.
    #[error("{0}")]
    Graph(#[from] GraphBuildError),

    /// A context or task failed its validity check.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A task's options could not be parsed from the context arguments.
    #[error("failed to parse options for task '{task}': {message}")]
    OptionParse {
        /// The task whose options failed to parse.
        task: String,
        /// The parser's error message.
        message: String,
    },

    /// A pipeline document could not be read or written.
    #[error("document error: {0}")]
    Document(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors raised while building the stage graph.
///
/// These are correctness contracts, not recoverable conditions: pipeline
/// creation is aborted and nothing is silently dropped.
#[derive(Debug, Clone, Error)]
pub enum GraphBuildError {
    /// Two included tasks carry the same name.
    #[error("duplicate task name '{name}' in pipeline '{pipeline}'")]
    DuplicateTaskName {
        /// The pipeline being built.
        pipeline: String,
        /// The repeated task name.
        name: String,
    },

    /// Two tasks share an order value but at least one of them is not
    /// concurrency-capable.
    #[error(
        "tasks '{existing}' and '{incoming}' share order {order} but must both declare concurrent=true"
    )]
    SequentialConflict {
        /// The task already placed in the stage.
        existing: String,
        /// The task being added to the stage.
        incoming: String,
        /// The shared order value.
        order: i32,
    },
}

/// Error raised when a context or task fails its validity check.
#[derive(Debug, Clone, Error)]
#[error("{subject}: {message}")]
pub struct ValidationError {
    /// What failed validation (a context or task name).
    pub subject: String,
    /// Why it failed.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_display() {
        let err = GraphBuildError::DuplicateTaskName {
            pipeline: "release".to_string(),
            name: "compile".to_string(),
        };
        assert!(err.to_string().contains("compile"));
        assert!(err.to_string().contains("release"));
    }

    #[test]
    fn test_sequential_conflict_display() {
        let err = GraphBuildError::SequentialConflict {
            existing: "a".to_string(),
            incoming: "b".to_string(),
            order: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("'a'"));
        assert!(msg.contains("'b'"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_validation_error() {
        let err = ValidationError::new("compile", "missing SDK");
        assert_eq!(err.to_string(), "compile: missing SDK");
    }

    #[test]
    fn test_graph_error_into_buildflow_error() {
        let err: BuildFlowError = GraphBuildError::DuplicateTaskName {
            pipeline: "p".to_string(),
            name: "t".to_string(),
        }
        .into();
        assert!(matches!(err, BuildFlowError::Graph(_)));
    }
}
