//! Pipeline documents: a serialized snapshot of a pipeline's context and
//! per-task option values.
//!
//! A document captures enough to rebuild an equivalent pipeline later or on
//! another machine, given the same task registry. Options are captured in
//! complete form so defaults survive even if they change between versions.

use crate::collect::collect_tasks;
use crate::context::{BuildContext, StartMode};
use crate::errors::BuildFlowError;
use crate::graph::TaskGraph;
use crate::pipeline::Pipeline;
use crate::registry::TaskRegistry;
use crate::task::FormatMethod;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Captured option arguments of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOptionRecord {
    /// The task name.
    pub task: String,
    /// The task's option arguments, complete form.
    pub args: Vec<String>,
}

/// A serializable snapshot of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDocument {
    /// The pipeline name.
    pub pipeline: String,
    /// The plugin identifier.
    pub plugin: String,
    /// The start mode.
    #[serde(default)]
    pub start_mode: StartMode,
    /// The include list.
    #[serde(default)]
    pub task_names: Vec<String>,
    /// The exclude list.
    #[serde(default)]
    pub exclude_task_names: Vec<String>,
    /// The raw context arguments.
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Captured per-task option arguments.
    #[serde(default)]
    pub task_options: Vec<TaskOptionRecord>,
}

impl PipelineDocument {
    /// Captures a snapshot of the given pipeline.
    #[must_use]
    pub fn capture(pipeline: &Pipeline) -> Self {
        let context = pipeline.context();
        let task_options = pipeline
            .graph()
            .include_tasks()
            .map(|task| TaskOptionRecord {
                task: task.name().to_string(),
                args: task.format_options_args(FormatMethod::Complete),
            })
            .collect();

        Self {
            pipeline: context.name().to_string(),
            plugin: context.plugin_name().to_string(),
            start_mode: context.start_mode,
            task_names: context.task_names.clone(),
            exclude_task_names: context.exclude_task_names.clone(),
            arguments: context.arguments.clone(),
            task_options,
        }
    }

    /// Rebuilds a bare context from the snapshot.
    #[must_use]
    pub fn to_context(&self) -> BuildContext {
        BuildContext::new(self.plugin.clone(), self.pipeline.clone())
            .with_tasks(self.task_names.clone())
            .with_excludes(self.exclude_task_names.clone())
            .with_start_mode(self.start_mode)
            .with_arguments(self.arguments.clone())
    }

    /// Writes the document as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BuildFlowError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BuildFlowError::Document(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads a document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BuildFlowError> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| BuildFlowError::Document(e.to_string()))
    }
}

/// Rebuilds a pipeline from a document against the given registry.
///
/// Captured per-task options are re-applied after collection. A task whose
/// captured options no longer parse keeps its defaults and the failure is
/// logged; the rebuild itself does not fail for that. With
/// `force_all_tasks` the document's include/exclude lists are ignored and
/// every accepted task runs.
pub fn pipeline_from_document(
    document: &PipelineDocument,
    registry: &dyn TaskRegistry,
    force_all_tasks: bool,
) -> Result<Pipeline, BuildFlowError> {
    let mut context = document.to_context();
    if force_all_tasks {
        context.task_names.clear();
        context.exclude_task_names.clear();
    }

    context.validate()?;
    let mut selection = collect_tasks(registry, &context)?;

    for record in &document.task_options {
        let Some(task) = selection
            .include
            .iter_mut()
            .find(|t| t.name() == record.task)
        else {
            continue;
        };
        if let Err(message) = task.override_options(&record.args) {
            tracing::warn!(
                task = %record.task,
                "captured options no longer parse, keeping defaults: {message}"
            );
        }
    }

    let graph = TaskGraph::build(&context, selection.include, selection.exclude)?;
    Ok(Pipeline::from_parts(context, graph))
}
