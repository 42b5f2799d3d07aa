//! Discovery filtering.
//!
//! Reduces the full set of registered candidate tasks to the set that
//! should actually run for a context. Filtering is pure and deterministic
//! given the same inputs; its only side effect is the option override
//! applied to each accepted task.

use crate::context::{BuildContext, CollectMode, StartMode};
use crate::errors::BuildFlowError;
use crate::registry::TaskRegistry;
use crate::task::BuildTask;

/// The outcome of collection: which tasks run and which were filtered out.
///
/// Excluded tasks are kept for diagnostics; they still appear in the
/// graph's all-tasks list.
#[derive(Debug, Default)]
pub struct TaskSelection {
    /// Tasks that will run, sorted ascending by order.
    pub include: Vec<Box<dyn BuildTask>>,
    /// Tasks filtered out, in the same sorted order.
    pub exclude: Vec<Box<dyn BuildTask>>,
}

impl TaskSelection {
    /// Total number of collected tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.include.len() + self.exclude.len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Collects candidate tasks from the registry and filters them for the
/// context.
///
/// Candidates are pre-filtered by [`BuildTask::accept`], have their options
/// overridden from the context arguments (in `Common` collect mode), and
/// are then filtered by the include/exclude lists according to the start
/// mode. `PureCollect` retains everything untouched - it exists to
/// enumerate tasks for documentation and must not be executed.
pub fn collect_tasks(
    registry: &dyn TaskRegistry,
    context: &BuildContext,
) -> Result<TaskSelection, BuildFlowError> {
    let pure = context.collect_mode == CollectMode::PureCollect;

    let mut candidates: Vec<Box<dyn BuildTask>> = Vec::new();
    for mut task in registry.collect(context) {
        if !pure && !task.accept(context) {
            continue;
        }

        if !pure && !context.arguments.is_empty() {
            if let Err(message) = task.override_options(&context.arguments) {
                return Err(BuildFlowError::OptionParse {
                    task: task.name().to_string(),
                    message,
                });
            }
        }

        candidates.push(task);
    }

    // Stable sort: ties keep discovery order.
    candidates.sort_by_key(|t| t.order());

    if pure {
        return Ok(TaskSelection {
            include: candidates,
            exclude: Vec::new(),
        });
    }

    let mut selection = TaskSelection::default();
    let mut start_order: Option<i32> = None;

    for task in candidates {
        let retained = match context.start_mode {
            StartMode::Common => accepts(context, task.as_ref()),
            StartMode::StartPoint => {
                if accepts(context, task.as_ref()) {
                    true
                } else {
                    // Past the start point: pull in everything at or after
                    // the first retained task's priority, unless excluded.
                    start_order.is_some_and(|order| order <= task.order())
                        && !context.excludes(task.name())
                }
            }
        };

        if retained {
            if start_order.is_none() {
                start_order = Some(task.order());
            }
            selection.include.push(task);
        } else {
            selection.exclude.push(task);
        }
    }

    Ok(selection)
}

fn accepts(context: &BuildContext, task: &dyn BuildTask) -> bool {
    context.includes(task.name()) && !context.excludes(task.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StartMode;
    use crate::registry::StaticTaskRegistry;
    use crate::testing::ScriptedTask;

    fn registry_of(tasks: &[(&'static str, i32)]) -> StaticTaskRegistry {
        let mut registry = StaticTaskRegistry::new();
        for (name, order) in tasks.iter().copied() {
            registry.register(move || Box::new(ScriptedTask::new(name, order)));
        }
        registry
    }

    fn names(tasks: &[Box<dyn BuildTask>]) -> Vec<&str> {
        tasks.iter().map(|t| t.name()).collect()
    }

    fn four_tasks() -> StaticTaskRegistry {
        registry_of(&[("t1", 1), ("t2", 2), ("t3", 3), ("t4", 4)])
    }

    #[test]
    fn test_common_mode_empty_include_retains_all() {
        let ctx = BuildContext::new("buildflow", "p");
        let selection = collect_tasks(&four_tasks(), &ctx).unwrap();

        assert_eq!(names(&selection.include), vec!["t1", "t2", "t3", "t4"]);
        assert!(selection.exclude.is_empty());
    }

    #[test]
    fn test_common_mode_retains_only_named_task() {
        let ctx = BuildContext::new("buildflow", "p").with_tasks(["t3"]);
        let selection = collect_tasks(&four_tasks(), &ctx).unwrap();

        assert_eq!(names(&selection.include), vec!["t3"]);
        assert_eq!(names(&selection.exclude), vec!["t1", "t2", "t4"]);
    }

    #[test]
    fn test_start_point_mode_pulls_in_later_tasks() {
        let ctx = BuildContext::new("buildflow", "p")
            .with_tasks(["t3"])
            .with_start_mode(StartMode::StartPoint);
        let selection = collect_tasks(&four_tasks(), &ctx).unwrap();

        assert_eq!(names(&selection.include), vec!["t3", "t4"]);
        assert_eq!(names(&selection.exclude), vec!["t1", "t2"]);
    }

    #[test]
    fn test_start_point_mode_still_honors_excludes() {
        let ctx = BuildContext::new("buildflow", "p")
            .with_tasks(["t2"])
            .with_excludes(["t3"])
            .with_start_mode(StartMode::StartPoint);
        let selection = collect_tasks(&four_tasks(), &ctx).unwrap();

        assert_eq!(names(&selection.include), vec!["t2", "t4"]);
        assert_eq!(names(&selection.exclude), vec!["t1", "t3"]);
    }

    #[test]
    fn test_exclude_beats_include() {
        let ctx = BuildContext::new("buildflow", "p")
            .with_tasks(["t1", "t2"])
            .with_excludes(["t2"]);
        let selection = collect_tasks(&four_tasks(), &ctx).unwrap();

        assert_eq!(names(&selection.include), vec!["t1"]);
    }

    #[test]
    fn test_pure_collect_bypasses_filtering() {
        let ctx = BuildContext::new("buildflow", "p")
            .with_tasks(["t3"])
            .with_collect_mode(CollectMode::PureCollect);
        let selection = collect_tasks(&four_tasks(), &ctx).unwrap();

        assert_eq!(selection.include.len(), 4);
        assert!(selection.exclude.is_empty());
    }

    #[test]
    fn test_candidates_sorted_by_order() {
        let registry = registry_of(&[("late", 30), ("early", 10), ("mid", 20)]);
        let ctx = BuildContext::new("buildflow", "p");
        let selection = collect_tasks(&registry, &ctx).unwrap();

        assert_eq!(names(&selection.include), vec!["early", "mid", "late"]);
    }

    #[test]
    fn test_rejecting_task_is_dropped_entirely() {
        let mut registry = StaticTaskRegistry::new();
        registry.register(|| Box::new(ScriptedTask::new("picky", 10).rejecting()));
        registry.register(|| Box::new(ScriptedTask::new("plain", 20)));

        let ctx = BuildContext::new("buildflow", "p");
        let selection = collect_tasks(&registry, &ctx).unwrap();

        assert_eq!(names(&selection.include), vec!["plain"]);
        assert!(selection.exclude.is_empty());
    }
}
