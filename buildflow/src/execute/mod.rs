//! The execute service: drives a pipeline's stages to completion.
//!
//! Stages run strictly in order; a stage must fully finish before the next
//! begins. Inside a multi-task stage every task is launched concurrently,
//! and the stage blocks on all of them if any task wants its result waited
//! on. The run aborts at the first failing stage.


use crate::cancellation::CancellationToken;
use crate::observer::{ExecuteObserver, TaskObserver};
use crate::pipeline::Pipeline;
use crate::process::{ProcessRunner, ReinvokeTarget, TokioProcessRunner};
use crate::task::{BuildTask, FormatMethod};
use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Where task bodies run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecuteMode {
    /// Run each task's `execute` body inside this process.
    #[default]
    InProcess,
    /// Re-invoke a worker process per task, scoped to that one task.
    External,
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every stage finished with exit code 0.
    Completed,
    /// A stage returned a non-zero exit code and the run was aborted.
    Failed(i32),
    /// Cancellation was acknowledged before the run could complete.
    Cancelled(Option<String>),
}

impl RunOutcome {
    /// The process-style exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::Failed(code) => *code,
            Self::Cancelled(_) => -1,
        }
    }

    /// Whether the run completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed(code) => write!(f, "failed with code {code}"),
            Self::Cancelled(Some(reason)) => write!(f, "cancelled: {reason}"),
            Self::Cancelled(None) => write!(f, "cancelled"),
        }
    }
}

/// The record of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// How the run ended.
    pub outcome: RunOutcome,
}

impl RunSummary {
    /// Whether the run completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Drives pipeline execution.
///
/// Cheap to clone; clones share the process runner.
#[derive(Debug, Clone)]
pub struct ExecuteService {
    runner: Arc<dyn ProcessRunner>,
    reinvoke: Option<ReinvokeTarget>,
}

impl Default for ExecuteService {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecuteService {
    /// Creates a service with the production process runner and no worker
    /// binary configured. External mode requires [`Self::with_reinvoke`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            runner: Arc::new(TokioProcessRunner::new()),
            reinvoke: None,
        }
    }

    /// Replaces the process runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Sets the worker binary used for external execution.
    #[must_use]
    pub fn with_reinvoke(mut self, target: ReinvokeTarget) -> Self {
        self.reinvoke = Some(target);
        self
    }

    /// Locates the default worker binary and configures it for external
    /// execution.
    pub fn with_located_worker(self) -> io::Result<Self> {
        let target = ReinvokeTarget::locate()?;
        Ok(self.with_reinvoke(target))
    }

    /// Runs the pipeline to completion, failure or cancellation.
    pub async fn execute_pipeline(
        &self,
        pipeline: &Arc<Pipeline>,
        observer: &Arc<dyn ExecuteObserver>,
        cancel: &Arc<CancellationToken>,
        mode: ExecuteMode,
    ) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();

        tracing::info!(
            run = %run_id,
            pipeline = %pipeline.context().name(),
            stages = pipeline.graph().stage_count(),
            ?mode,
            "pipeline run started"
        );

        let outcome = self.run_stages(pipeline, observer, cancel, mode).await;
        let duration = timer.elapsed();

        tracing::info!(
            run = %run_id,
            pipeline = %pipeline.context().name(),
            %outcome,
            elapsed = ?duration,
            "pipeline run finished"
        );

        RunSummary {
            run_id,
            started_at,
            duration,
            outcome,
        }
    }

    async fn run_stages(
        &self,
        pipeline: &Arc<Pipeline>,
        observer: &Arc<dyn ExecuteObserver>,
        cancel: &Arc<CancellationToken>,
        mode: ExecuteMode,
    ) -> RunOutcome {
        if !pipeline.executable() {
            let scoped = TaskObserver::new(pipeline.context().name(), Arc::clone(observer));
            scoped.error("a pure-collect pipeline can't be executed");
            return RunOutcome::Failed(-1);
        }

        for index in 0..pipeline.graph().stage_count() {
            if cancel.is_cancelled() {
                return Self::acknowledge_cancel(observer, cancel);
            }

            let code = self.execute_stage(pipeline, index, observer, cancel, mode).await;

            // A non-zero code caused by cancellation reports as cancelled,
            // not failed.
            if cancel.is_cancelled() {
                return Self::acknowledge_cancel(observer, cancel);
            }
            if code != 0 {
                return RunOutcome::Failed(code);
            }
        }

        RunOutcome::Completed
    }

    fn acknowledge_cancel(
        observer: &Arc<dyn ExecuteObserver>,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        observer.on_cancelled();
        RunOutcome::Cancelled(cancel.reason())
    }

    async fn execute_stage(
        &self,
        pipeline: &Arc<Pipeline>,
        index: usize,
        observer: &Arc<dyn ExecuteObserver>,
        cancel: &Arc<CancellationToken>,
        mode: ExecuteMode,
    ) -> i32 {
        let Some(stage) = pipeline.graph().stage(index) else {
            return 0;
        };
        let tasks: Vec<Arc<dyn BuildTask>> = stage.tasks().into_iter().map(Arc::clone).collect();

        tracing::debug!(stage = %stage, "entering stage");

        match tasks.len() {
            0 => 0,
            1 => {
                self.execute_task(pipeline, &tasks[0], observer, cancel, mode)
                    .await
            }
            _ => {
                let mut need_wait = false;
                let mut handles = Vec::with_capacity(tasks.len());

                for task in tasks {
                    need_wait |= task.settings().wait_result;

                    let service = self.clone();
                    let pipeline = Arc::clone(pipeline);
                    let observer = Arc::clone(observer);
                    let cancel = Arc::clone(cancel);
                    handles.push(tokio::spawn(async move {
                        service
                            .execute_task(&pipeline, &task, &observer, &cancel, mode)
                            .await
                    }));
                }

                if !need_wait {
                    // Every task is fire-and-forget; the stage is done the
                    // moment they are all launched.
                    return 0;
                }

                // join_all preserves launch order, so the first non-zero
                // result is the stage's.
                let mut code = 0;
                for result in futures::future::join_all(handles).await {
                    let task_code = result.unwrap_or(-1);
                    if code == 0 && task_code != 0 {
                        code = task_code;
                    }
                }
                code
            }
        }
    }

    async fn execute_task(
        &self,
        pipeline: &Arc<Pipeline>,
        task: &Arc<dyn BuildTask>,
        observer: &Arc<dyn ExecuteObserver>,
        cancel: &CancellationToken,
        mode: ExecuteMode,
    ) -> i32 {
        let scoped = TaskObserver::new(task.name(), Arc::clone(observer));

        if let Err(err) = task.validate() {
            scoped.error(&format!(
                "task {} can't be executed: {}",
                task.name(),
                err.message
            ));
            return -1;
        }

        let label = format!("[{}]<<<{}>>>", task.order(), task.name());
        scoped.info(&format!("begin execute task {label}"));
        let timer = Instant::now();

        let code = match mode {
            ExecuteMode::InProcess => task.execute(pipeline.context(), &scoped, cancel).await,
            ExecuteMode::External => {
                self.run_external(pipeline, task.name(), &scoped, cancel).await
            }
        };

        scoped.info(&format!(
            "finish execute task {label}, code {code}, elapsed {:.2?}",
            timer.elapsed()
        ));
        code
    }

    async fn run_external(
        &self,
        pipeline: &Pipeline,
        task_name: &str,
        scoped: &TaskObserver,
        cancel: &CancellationToken,
    ) -> i32 {
        let Some(target) = &self.reinvoke else {
            scoped.error("no worker binary configured for external execution");
            return -1;
        };

        let args = pipeline.task_command_line(&[task_name], FormatMethod::Simplify);
        let (program, args) = target.command_line(&args);

        match self.runner.run(&program, &args, scoped, cancel).await {
            Ok(code) => code,
            Err(err) => {
                scoped.error(&format!("failed to launch worker process: {err}"));
                -1
            }
        }
    }
}
