//! The stage graph: tasks grouped into priority-ordered stages.
//!
//! Tasks and stages live in flat arenas inside the graph and reference each
//! other by index, so there is no back-pointer cycle between task, stage
//! and pipeline. The graph is immutable once built.

use crate::context::BuildContext;
use crate::errors::GraphBuildError;
use crate::task::BuildTask;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Which tasks to look up relative to a task's own stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AssociateKind {
    /// All tasks in the task's own stage.
    #[default]
    All,
    /// Tasks in the immediately preceding stage.
    Previous,
    /// Tasks in the immediately following stage.
    Next,
    /// Tasks in every preceding stage, flattened in stage order.
    PreviousAll,
    /// Tasks in every following stage, flattened in stage order.
    NextAll,
}

#[derive(Debug)]
struct StageNode {
    order: i32,
    tasks: Vec<usize>,
}

/// The ordered chain of stages plus lookup structures.
#[derive(Debug)]
pub struct TaskGraph {
    pipeline_name: String,
    tasks: Vec<Arc<dyn BuildTask>>,
    include: Vec<usize>,
    exclude: Vec<usize>,
    all: Vec<usize>,
    stages: Vec<StageNode>,
    by_name: HashMap<String, usize>,
}

impl TaskGraph {
    /// Builds the graph from filtered include/exclude task lists.
    ///
    /// The include list is stably sorted ascending by order and grouped
    /// into one stage per distinct order value. Fails fatally on duplicate
    /// task names and on co-staged tasks that are not all
    /// concurrency-capable.
    pub fn build(
        context: &BuildContext,
        include: Vec<Box<dyn BuildTask>>,
        exclude: Vec<Box<dyn BuildTask>>,
    ) -> Result<Self, GraphBuildError> {
        let include_count = include.len();

        let mut tasks: Vec<Arc<dyn BuildTask>> = Vec::with_capacity(include_count + exclude.len());
        tasks.extend(include.into_iter().map(Arc::from));
        tasks.extend(exclude.into_iter().map(Arc::from));

        let mut include_idx: Vec<usize> = (0..include_count).collect();
        include_idx.sort_by_key(|&i| tasks[i].order());
        let exclude_idx: Vec<usize> = (include_count..tasks.len()).collect();

        let mut all: Vec<usize> = (0..tasks.len()).collect();
        all.sort_by_key(|&i| tasks[i].order());

        let mut stages: Vec<StageNode> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for &idx in &include_idx {
            let task = &tasks[idx];

            if by_name.contains_key(task.name()) {
                let err = GraphBuildError::DuplicateTaskName {
                    pipeline: context.name().to_string(),
                    name: task.name().to_string(),
                };
                tracing::error!("{err}");
                return Err(err);
            }
            by_name.insert(task.name().to_string(), idx);

            match stages.last_mut() {
                Some(stage) if stage.order == task.order() => {
                    // A shared order value requires every member to opt in
                    // to concurrency.
                    let first = &tasks[stage.tasks[0]];
                    if !first.settings().concurrent || !task.settings().concurrent {
                        return Err(GraphBuildError::SequentialConflict {
                            existing: first.name().to_string(),
                            incoming: task.name().to_string(),
                            order: task.order(),
                        });
                    }
                    stage.tasks.push(idx);
                }
                _ => stages.push(StageNode {
                    order: task.order(),
                    tasks: vec![idx],
                }),
            }
        }

        Ok(Self {
            pipeline_name: context.name().to_string(),
            tasks,
            include: include_idx,
            exclude: exclude_idx,
            all,
            stages,
            by_name,
        })
    }

    /// Returns the owning pipeline's name.
    #[must_use]
    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns a view of the stage at the given position in the chain.
    #[must_use]
    pub fn stage(&self, index: usize) -> Option<StageRef<'_>> {
        (index < self.stages.len()).then_some(StageRef { graph: self, index })
    }

    /// Iterates stages in ascending order-value sequence.
    pub fn stages(&self) -> impl Iterator<Item = StageRef<'_>> {
        (0..self.stages.len()).map(|index| StageRef { graph: self, index })
    }

    /// Tasks that will run, in stage order.
    pub fn include_tasks(&self) -> impl Iterator<Item = &Arc<dyn BuildTask>> {
        self.include.iter().map(|&i| &self.tasks[i])
    }

    /// Tasks filtered out of this pipeline, kept for diagnostics.
    pub fn exclude_tasks(&self) -> impl Iterator<Item = &Arc<dyn BuildTask>> {
        self.exclude.iter().map(|&i| &self.tasks[i])
    }

    /// Every collected task, include and exclude, sorted by order.
    pub fn all_tasks(&self) -> impl Iterator<Item = &Arc<dyn BuildTask>> {
        self.all.iter().map(|&i| &self.tasks[i])
    }

    /// Looks up an included task by name.
    #[must_use]
    pub fn find_task(&self, name: &str) -> Option<&Arc<dyn BuildTask>> {
        self.by_name.get(name).map(|&i| &self.tasks[i])
    }

    /// Returns the tasks associated with the named task relative to its
    /// stage.
    ///
    /// Returns an empty vector if the task is not part of the include set.
    #[must_use]
    pub fn associate_tasks(&self, name: &str, kind: AssociateKind) -> Vec<Arc<dyn BuildTask>> {
        let Some(task) = self.find_task(name) else {
            return Vec::new();
        };
        let Some(position) = self.stages.iter().position(|s| s.order == task.order()) else {
            return Vec::new();
        };

        let collect = |range: &[StageNode]| -> Vec<Arc<dyn BuildTask>> {
            range
                .iter()
                .flat_map(|s| s.tasks.iter().map(|&i| Arc::clone(&self.tasks[i])))
                .collect()
        };

        match kind {
            AssociateKind::All => collect(&self.stages[position..=position]),
            AssociateKind::Previous => position
                .checked_sub(1)
                .map_or_else(Vec::new, |p| collect(&self.stages[p..=p])),
            AssociateKind::Next => self
                .stages
                .get(position + 1)
                .map_or_else(Vec::new, |s| collect(std::slice::from_ref(s))),
            AssociateKind::PreviousAll => collect(&self.stages[..position]),
            AssociateKind::NextAll => collect(&self.stages[position + 1..]),
        }
    }
}

/// A borrowed view of one stage in the chain.
#[derive(Clone, Copy)]
pub struct StageRef<'g> {
    graph: &'g TaskGraph,
    index: usize,
}

impl<'g> StageRef<'g> {
    /// The stage's shared order value.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.graph.stages[self.index].order
    }

    /// The stage's position in the chain.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The tasks in this stage, in launch order.
    #[must_use]
    pub fn tasks(&self) -> Vec<&'g Arc<dyn BuildTask>> {
        self.graph.stages[self.index]
            .tasks
            .iter()
            .map(|&i| &self.graph.tasks[i])
            .collect()
    }

    /// Number of tasks in this stage.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.stages[self.index].tasks.len()
    }

    /// Returns true if the stage has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.stages[self.index].tasks.is_empty()
    }

    /// The previous stage in the chain, if any.
    #[must_use]
    pub fn previous(&self) -> Option<StageRef<'g>> {
        self.index.checked_sub(1).map(|index| StageRef {
            graph: self.graph,
            index,
        })
    }

    /// The next stage in the chain, if any.
    #[must_use]
    pub fn next(&self) -> Option<StageRef<'g>> {
        self.graph.stage(self.index + 1)
    }
}

impl fmt::Display for StageRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]-({})", self.order(), self.len())?;
        for task in self.tasks() {
            write!(f, " {},", task.name())?;
        }
        Ok(())
    }
}

impl fmt::Debug for StageRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRef")
            .field("order", &self.order())
            .field("tasks", &self.len())
            .finish()
    }
}
