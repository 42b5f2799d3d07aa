//! Build context: which pipeline to run and how to select its tasks.

mod requirements;

pub use requirements::{EnvironmentRequirement, FixedRequirement, RequirementSet};

use crate::errors::ValidationError;
use crate::task::FormatMethod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How task selection treats the include list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartMode {
    /// Only tasks explicitly selected by the include list run.
    #[default]
    Common,
    /// Start from the first selected task and run everything at or after
    /// its priority.
    StartPoint,
}

impl fmt::Display for StartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Common => write!(f, "common"),
            Self::StartPoint => write!(f, "start-point"),
        }
    }
}

/// How discovery treats the candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectMode {
    /// Filter candidates and build an executable graph.
    #[default]
    Common,
    /// Keep every candidate without filtering. Enumeration only; a
    /// pure-collect selection must not be executed.
    PureCollect,
}

/// External configuration selecting which pipeline and which tasks to run.
///
/// Immutable for the duration of one graph build except for the option
/// overrides applied to tasks during collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildContext {
    name: String,
    friendly_name: Option<String>,
    plugin_name: String,
    /// Task names to include; empty means "every accepted task".
    #[serde(default)]
    pub task_names: Vec<String>,
    /// Task names to exclude.
    #[serde(default)]
    pub exclude_task_names: Vec<String>,
    /// The start mode.
    #[serde(default)]
    pub start_mode: StartMode,
    /// The collect mode.
    #[serde(default)]
    pub collect_mode: CollectMode,
    /// Raw context-level arguments, handed to each task's option parser.
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(skip)]
    requirements: RequirementSet,
}

impl BuildContext {
    /// Creates a context for the given plugin and pipeline name.
    #[must_use]
    pub fn new(plugin_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            friendly_name: None,
            plugin_name: plugin_name.into(),
            task_names: Vec::new(),
            exclude_task_names: Vec::new(),
            start_mode: StartMode::default(),
            collect_mode: CollectMode::default(),
            arguments: Vec::new(),
            requirements: RequirementSet::new(),
        }
    }

    /// Sets a display name.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Sets the include list.
    #[must_use]
    pub fn with_tasks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.task_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the exclude list.
    #[must_use]
    pub fn with_excludes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_task_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the start mode.
    #[must_use]
    pub fn with_start_mode(mut self, mode: StartMode) -> Self {
        self.start_mode = mode;
        self
    }

    /// Sets the collect mode.
    #[must_use]
    pub fn with_collect_mode(mut self, mode: CollectMode) -> Self {
        self.collect_mode = mode;
        self
    }

    /// Sets the raw context arguments.
    #[must_use]
    pub fn with_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an environment requirement.
    #[must_use]
    pub fn with_requirement(
        mut self,
        requirement: std::sync::Arc<dyn EnvironmentRequirement>,
    ) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the display name, falling back to the pipeline name.
    #[must_use]
    pub fn friendly_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.name)
    }

    /// Returns the plugin identifier used for re-invocation.
    #[must_use]
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Returns the environment requirements.
    #[must_use]
    pub fn requirements(&self) -> &RequirementSet {
        &self.requirements
    }

    /// Whether the include list selects the given task name.
    ///
    /// An empty include list selects everything. Matching is
    /// ASCII-case-insensitive.
    #[must_use]
    pub fn includes(&self, task_name: &str) -> bool {
        self.task_names.is_empty()
            || self
                .task_names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(task_name))
    }

    /// Whether the exclude list names the given task.
    #[must_use]
    pub fn excludes(&self, task_name: &str) -> bool {
        self.exclude_task_names
            .iter()
            .any(|n| n.eq_ignore_ascii_case(task_name))
    }

    /// Checks the context's own validity (environment requirements).
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.requirements.check().map_err(|message| {
            ValidationError::new(
                self.name.clone(),
                format!("does not have the necessary environment: {message}"),
            )
        })
    }

    /// Formats this context's own argument vector.
    ///
    /// `Simplify` omits values equal to their defaults; `Complete` emits
    /// everything.
    #[must_use]
    pub fn format_args(&self, method: FormatMethod) -> Vec<String> {
        let mut args = Vec::new();

        for name in &self.task_names {
            args.push("--task".to_string());
            args.push(name.clone());
        }
        for name in &self.exclude_task_names {
            args.push("--exclude".to_string());
            args.push(name.clone());
        }
        if method == FormatMethod::Complete || self.start_mode != StartMode::default() {
            args.push("--mode".to_string());
            args.push(self.start_mode.to_string());
        }

        args
    }

    /// Formats context arguments scoped to exactly the given task subset.
    ///
    /// The include list is replaced by the subset and the exclude list is
    /// cleared, so the produced arguments re-select precisely those tasks.
    #[must_use]
    pub fn format_args_for_tasks(&self, task_names: &[&str], method: FormatMethod) -> Vec<String> {
        let mut scoped = self.clone();
        scoped.task_names = task_names.iter().map(|n| (*n).to_string()).collect();
        scoped.exclude_task_names.clear();
        scoped.format_args(method)
    }
}

impl fmt::Display for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_empty_include_selects_everything() {
        let ctx = BuildContext::new("buildflow", "release");
        assert!(ctx.includes("compile"));
        assert!(ctx.includes("anything"));
    }

    #[test]
    fn test_include_matching_is_case_insensitive() {
        let ctx = BuildContext::new("buildflow", "release").with_tasks(["Compile"]);
        assert!(ctx.includes("compile"));
        assert!(ctx.includes("COMPILE"));
        assert!(!ctx.includes("package"));
    }

    #[test]
    fn test_excludes() {
        let ctx = BuildContext::new("buildflow", "release").with_excludes(["docs"]);
        assert!(ctx.excludes("docs"));
        assert!(ctx.excludes("Docs"));
        assert!(!ctx.excludes("compile"));
    }

    #[test]
    fn test_validate_fails_on_unsatisfied_requirement() {
        let ctx = BuildContext::new("buildflow", "release")
            .with_requirement(Arc::new(FixedRequirement::failing("sdk", "missing")));

        let err = ctx.validate().unwrap_err();
        assert_eq!(err.subject, "release");
        assert!(err.message.contains("sdk: missing"));
    }

    #[test]
    fn test_format_args_simplify_omits_default_mode() {
        let ctx = BuildContext::new("buildflow", "release").with_tasks(["compile"]);
        let args = ctx.format_args(FormatMethod::Simplify);
        assert_eq!(args, vec!["--task", "compile"]);
    }

    #[test]
    fn test_format_args_complete_includes_mode() {
        let ctx = BuildContext::new("buildflow", "release").with_tasks(["compile"]);
        let args = ctx.format_args(FormatMethod::Complete);
        assert_eq!(args, vec!["--task", "compile", "--mode", "common"]);
    }

    #[test]
    fn test_format_args_non_default_mode_always_present() {
        let ctx = BuildContext::new("buildflow", "release").with_start_mode(StartMode::StartPoint);
        let args = ctx.format_args(FormatMethod::Simplify);
        assert_eq!(args, vec!["--mode", "start-point"]);
    }

    #[test]
    fn test_format_args_for_tasks_scopes_subset() {
        let ctx = BuildContext::new("buildflow", "release")
            .with_tasks(["compile", "package", "upload"])
            .with_excludes(["docs"]);

        let args = ctx.format_args_for_tasks(&["package"], FormatMethod::Simplify);
        assert_eq!(args, vec!["--task", "package"]);
    }

    #[test]
    fn test_friendly_name_fallback() {
        let ctx = BuildContext::new("buildflow", "release");
        assert_eq!(ctx.friendly_name(), "release");

        let ctx = ctx.with_friendly_name("Release Build");
        assert_eq!(ctx.friendly_name(), "Release Build");
    }

    #[test]
    fn test_start_mode_serialize() {
        let json = serde_json::to_string(&StartMode::StartPoint).unwrap();
        assert_eq!(json, r#""start-point""#);
    }
}
