//! Build tasks: named, orderable units of work with declared execution
//! traits.

mod options;

pub use options::{FormatMethod, NoOptions, TaskOptions};

use crate::cancellation::CancellationToken;
use crate::context::{BuildContext, RequirementSet};
use crate::errors::ValidationError;
use crate::observer::TaskObserver;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Statically declared execution traits of a task.
///
/// The original design read these from class annotations; here they are
/// plain data attached at registration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSettings {
    /// Task name, unique within one pipeline instance.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Priority. Tasks sharing an order value form one stage.
    pub order: i32,
    /// Whether the task may share a stage with others.
    #[serde(default)]
    pub concurrent: bool,
    /// Whether a multi-task stage must block on this task's result.
    #[serde(default = "default_wait_result")]
    pub wait_result: bool,
    /// Declared but not consulted by the executor; kept for forward
    /// compatibility with callers that inspect it.
    #[serde(default)]
    pub may_fail: bool,
}

const fn default_wait_result() -> bool {
    true
}

impl TaskSettings {
    /// Creates settings with the given name and order; traits default to
    /// sequential, waited, must-succeed.
    #[must_use]
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            order,
            concurrent: false,
            wait_result: true,
            may_fail: false,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the task as concurrency-capable.
    #[must_use]
    pub fn concurrent(mut self) -> Self {
        self.concurrent = true;
        self
    }

    /// Marks the task as fire-and-forget: a multi-task stage will not wait
    /// for it.
    #[must_use]
    pub fn fire_and_forget(mut self) -> Self {
        self.wait_result = false;
        self
    }

    /// Marks the task as allowed to fail.
    #[must_use]
    pub fn may_fail(mut self) -> Self {
        self.may_fail = true;
        self
    }
}

/// A single orderable unit of build work.
///
/// Tasks are created during discovery and mutated only by option overrides
/// applied before the stage graph is built.
#[async_trait]
pub trait BuildTask: Send + Sync + Debug {
    /// Returns the task's declared settings.
    fn settings(&self) -> &TaskSettings;

    /// Returns the task name.
    fn name(&self) -> &str {
        &self.settings().name
    }

    /// Returns the task's priority.
    fn order(&self) -> i32 {
        self.settings().order
    }

    /// Environment requirements checked before execution.
    fn requirements(&self) -> Option<&RequirementSet> {
        None
    }

    /// Pre-filter: whether this task applies to the context at all.
    fn accept(&self, _context: &BuildContext) -> bool {
        true
    }

    /// The task's options, if it has any.
    fn options(&self) -> Option<&dyn TaskOptions> {
        None
    }

    /// Mutable access to the task's options.
    fn options_mut(&mut self) -> Option<&mut dyn TaskOptions> {
        None
    }

    /// Renders the task's option arguments.
    fn format_options_args(&self, method: FormatMethod) -> Vec<String> {
        self.options().map_or_else(Vec::new, |o| o.format_args(method))
    }

    /// Overrides the task's options from an argument vector.
    fn override_options(&mut self, args: &[String]) -> Result<(), String> {
        match self.options_mut() {
            Some(options) => options.override_from_args(args),
            None => Ok(()),
        }
    }

    /// Checks that the task can be executed: environment requirements and
    /// option validity.
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(requirements) = self.requirements() {
            requirements.check().map_err(|message| {
                ValidationError::new(
                    self.name().to_string(),
                    format!("does not have the necessary environment: {message}"),
                )
            })?;
        }

        if let Some(options) = self.options() {
            options.validate()?;
        }

        Ok(())
    }

    /// Executes the task in-process.
    ///
    /// Implementations should poll `cancel` at convenient points and wind
    /// down cooperatively; the engine never kills an in-process task.
    /// Returns a process-style exit code, 0 for success.
    async fn execute(
        &self,
        context: &BuildContext,
        observer: &TaskObserver,
        cancel: &CancellationToken,
    ) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = TaskSettings::new("compile", 100);
        assert_eq!(settings.name, "compile");
        assert_eq!(settings.order, 100);
        assert!(!settings.concurrent);
        assert!(settings.wait_result);
        assert!(!settings.may_fail);
    }

    #[test]
    fn test_settings_builders() {
        let settings = TaskSettings::new("upload", 300)
            .with_description("uploads artifacts")
            .concurrent()
            .fire_and_forget()
            .may_fail();

        assert!(settings.concurrent);
        assert!(!settings.wait_result);
        assert!(settings.may_fail);
        assert_eq!(settings.description, "uploads artifacts");
    }

    #[test]
    fn test_settings_deserialize_defaults_wait_result() {
        let settings: TaskSettings =
            serde_json::from_str(r#"{"name": "compile", "order": 100}"#).unwrap();
        assert!(settings.wait_result);
        assert!(!settings.concurrent);
    }
}
