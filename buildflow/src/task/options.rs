//! Command-line-convertible task options.

use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// How option values are rendered into arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatMethod {
    /// Emit every option regardless of whether it still holds its default.
    Complete,
    /// Emit only options that differ from their default value.
    #[default]
    Simplify,
}

/// Configuration attached to a task, convertible to and from an argument
/// vector.
///
/// Parsing of unrecognized arguments must be lenient: a context hands the
/// same raw argument list to every task, and each options object picks out
/// what it understands.
pub trait TaskOptions: Send + Sync + Debug {
    /// Renders this options object as an argument vector.
    fn format_args(&self, method: FormatMethod) -> Vec<String>;

    /// Overrides option values from an argument vector.
    fn override_from_args(&mut self, args: &[String]) -> Result<(), String>;

    /// Checks option values for consistency.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Options carrier for tasks with nothing to configure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOptions;

impl TaskOptions for NoOptions {
    fn format_args(&self, _method: FormatMethod) -> Vec<String> {
        Vec::new()
    }

    fn override_from_args(&mut self, _args: &[String]) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_options_formats_empty() {
        let opts = NoOptions;
        assert!(opts.format_args(FormatMethod::Complete).is_empty());
        assert!(opts.format_args(FormatMethod::Simplify).is_empty());
    }

    #[test]
    fn test_no_options_ignores_arguments() {
        let mut opts = NoOptions;
        let args = vec!["--anything".to_string(), "value".to_string()];
        assert!(opts.override_from_args(&args).is_ok());
        assert!(opts.validate().is_ok());
    }
}
