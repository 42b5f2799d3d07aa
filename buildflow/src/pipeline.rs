//! A pipeline: one context bound to its built stage graph.

use crate::collect::collect_tasks;
use crate::context::{BuildContext, CollectMode};
use crate::errors::{BuildFlowError, ValidationError};
use crate::graph::TaskGraph;
use crate::registry::TaskRegistry;
use crate::task::FormatMethod;
use std::fmt;
use std::fmt::Write as _;

/// A context and the stage graph built for it.
///
/// Assembly is fallible; there is no half-built pipeline value. A pipeline
/// is immutable once assembled and can be shared across threads.
pub struct Pipeline {
    context: BuildContext,
    graph: TaskGraph,
}

impl Pipeline {
    /// Collects, filters and arranges tasks for the context.
    ///
    /// Fails if the context's environment requirements are unsatisfied, if
    /// any task rejects the context arguments, or if the graph cannot be
    /// built.
    pub fn assemble(
        context: BuildContext,
        registry: &dyn TaskRegistry,
    ) -> Result<Self, BuildFlowError> {
        if let Err(err) = context.validate() {
            tracing::error!(pipeline = %context.name(), "{err}");
            return Err(err.into());
        }

        let selection = collect_tasks(registry, &context)?;
        let graph = TaskGraph::build(&context, selection.include, selection.exclude)?;

        tracing::debug!(
            pipeline = %context.name(),
            stages = graph.stage_count(),
            tasks = graph.include_tasks().count(),
            "pipeline assembled"
        );

        Ok(Self { context, graph })
    }

    pub(crate) fn from_parts(context: BuildContext, graph: TaskGraph) -> Self {
        Self { context, graph }
    }

    /// The context this pipeline was built for.
    #[must_use]
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// The stage graph.
    #[must_use]
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Whether this pipeline may be executed.
    ///
    /// A pure-collect pipeline enumerates tasks only.
    #[must_use]
    pub fn executable(&self) -> bool {
        self.context.collect_mode != CollectMode::PureCollect
    }

    /// Checks the context and every included task for executability.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.context.validate()?;

        for task in self.graph.include_tasks() {
            task.validate().map_err(|err| {
                ValidationError::new(
                    task.name().to_string(),
                    format!("task {} can't be executed: {}", task.name(), err.message),
                )
            })?;
        }

        Ok(())
    }

    /// Builds the argument vector that re-invokes this pipeline scoped to
    /// exactly the given tasks.
    ///
    /// Layout: plugin name, context name, scoped context arguments, then
    /// each named task's option arguments in the order given.
    #[must_use]
    pub fn task_command_line(&self, task_names: &[&str], method: FormatMethod) -> Vec<String> {
        let mut args = vec![
            self.context.plugin_name().to_string(),
            self.context.name().to_string(),
        ];
        args.extend(self.context.format_args_for_tasks(task_names, method));

        for name in task_names {
            if let Some(task) = self.graph.find_task(name) {
                args.extend(task.format_options_args(method));
            }
        }

        args
    }

    /// Renders a one-line-per-task listing of every collected task.
    #[must_use]
    pub fn help_text(&self) -> String {
        let mut text = format!("{}:\n", self.context.friendly_name());
        for task in self.graph.all_tasks() {
            let settings = task.settings();
            let _ = writeln!(
                text,
                "  [{}] {} - {}",
                settings.order, settings.name, settings.description
            );
        }
        text
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("context", &self.context.name())
            .field("stages", &self.graph.stage_count())
            .finish()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.context.friendly_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FixedRequirement;
    use crate::registry::StaticTaskRegistry;
    use crate::testing::{OptionedTask, ScriptedTask};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn registry() -> StaticTaskRegistry {
        let mut registry = StaticTaskRegistry::new();
        registry.register(|| Box::new(ScriptedTask::new("compile", 100)));
        registry.register(|| Box::new(ScriptedTask::new("package", 200)));
        registry
    }

    #[test]
    fn test_assemble_builds_graph() {
        let pipeline = Pipeline::assemble(BuildContext::new("buildflow", "release"), &registry())
            .unwrap();

        assert_eq!(pipeline.graph().stage_count(), 2);
        assert!(pipeline.executable());
    }

    #[test]
    fn test_assemble_fails_on_unsatisfied_context_requirement() {
        let ctx = BuildContext::new("buildflow", "release")
            .with_requirement(Arc::new(FixedRequirement::failing("sdk", "not installed")));

        let err = Pipeline::assemble(ctx, &registry()).unwrap_err();
        assert!(matches!(err, BuildFlowError::Validation(_)));
    }

    #[test]
    fn test_pure_collect_pipeline_is_not_executable() {
        let ctx = BuildContext::new("buildflow", "release")
            .with_collect_mode(CollectMode::PureCollect);
        let pipeline = Pipeline::assemble(ctx, &registry()).unwrap();
        assert!(!pipeline.executable());
    }

    #[test]
    fn test_validate_reports_failing_task() {
        let mut registry = StaticTaskRegistry::new();
        registry.register(|| {
            Box::new(ScriptedTask::new("broken", 100).with_requirement(
                FixedRequirement::failing("compiler", "missing"),
            ))
        });

        let pipeline =
            Pipeline::assemble(BuildContext::new("buildflow", "release"), &registry).unwrap();
        let err = pipeline.validate().unwrap_err();

        assert_eq!(err.subject, "broken");
        assert!(err.message.contains("can't be executed"));
    }

    #[test]
    fn test_task_command_line_layout() {
        let mut registry = StaticTaskRegistry::new();
        registry.register(|| Box::new(OptionedTask::new("compile", 100)));
        registry.register(|| Box::new(ScriptedTask::new("package", 200)));

        let ctx = BuildContext::new("buildflow", "release");
        let pipeline = Pipeline::assemble(ctx, &registry).unwrap();

        let args = pipeline.task_command_line(&["compile"], FormatMethod::Simplify);
        assert_eq!(args[0], "buildflow");
        assert_eq!(args[1], "release");
        assert_eq!(args[2], "--task");
        assert_eq!(args[3], "compile");
    }

    #[test]
    fn test_task_command_line_complete_emits_task_options() {
        let mut registry = StaticTaskRegistry::new();
        registry.register(|| Box::new(OptionedTask::new("compile", 100)));

        let pipeline =
            Pipeline::assemble(BuildContext::new("buildflow", "release"), &registry).unwrap();

        let simplify = pipeline.task_command_line(&["compile"], FormatMethod::Simplify);
        let complete = pipeline.task_command_line(&["compile"], FormatMethod::Complete);

        // Default-valued options only show up under Complete.
        assert!(complete.len() > simplify.len());
        assert!(complete.contains(&"--level".to_string()));
        assert!(!simplify.contains(&"--level".to_string()));
    }

    #[test]
    fn test_help_text_lists_all_tasks() {
        let pipeline = Pipeline::assemble(
            BuildContext::new("buildflow", "release").with_tasks(["compile"]),
            &registry(),
        )
        .unwrap();

        let text = pipeline.help_text();
        assert!(text.contains("[100] compile"));
        assert!(text.contains("[200] package"));
    }
}
