//! # Buildflow
//!
//! A staged build-task orchestration engine.
//!
//! Buildflow takes a named pipeline context, selects the tasks that apply to
//! it, arranges them into priority-ordered stages and drives their execution:
//!
//! - **Task selection**: include/exclude name lists with `Common` and
//!   `StartPoint` start modes
//! - **Stage graph**: one stage per distinct task order value, with
//!   concurrency validation for co-staged tasks
//! - **Execution**: stages run strictly in order; tasks within a stage run
//!   concurrently, either in-process or by re-invoking an external worker
//!   process per task
//! - **Observability**: log/progress/cancellation events forwarded to an
//!   observer, structured logging via `tracing`
//! - **Cancellation**: a single cooperative token threaded through every
//!   task invocation
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use buildflow::prelude::*;
//!
//! let mut registry = StaticTaskRegistry::new();
//! registry.register(|| Box::new(CompileTask::new()));
//! registry.register(|| Box::new(PackageTask::new()));
//!
//! let context = BuildContext::new("buildflow", "release");
//! let pipeline = Arc::new(Pipeline::assemble(context, &registry)?);
//!
//! let service = ExecuteService::new();
//! let summary = service
//!     .execute_pipeline(&pipeline, &observer, &cancel, ExecuteMode::InProcess)
//!     .await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod collect;
pub mod context;
pub mod document;
pub mod errors;
pub mod execute;
pub mod graph;
pub mod observability;
pub mod observer;
pub mod pipeline;
pub mod process;
pub mod registry;
pub mod task;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::collect::{collect_tasks, TaskSelection};
    pub use crate::context::{
        BuildContext, CollectMode, EnvironmentRequirement, FixedRequirement, RequirementSet,
        StartMode,
    };
    pub use crate::document::{pipeline_from_document, PipelineDocument, TaskOptionRecord};
    pub use crate::errors::{BuildFlowError, GraphBuildError, ValidationError};
    pub use crate::execute::{ExecuteMode, ExecuteService, RunOutcome, RunSummary};
    pub use crate::graph::{AssociateKind, StageRef, TaskGraph};
    pub use crate::observer::{
        CollectingObserver, ExecuteObserver, LogLevel, NoOpObserver, TaskObserver,
        TracingObserver,
    };
    pub use crate::pipeline::Pipeline;
    pub use crate::process::{ProcessRunner, ReinvokeTarget, TokioProcessRunner};
    pub use crate::registry::{StaticTaskRegistry, TaskRegistry};
    pub use crate::task::{BuildTask, FormatMethod, NoOptions, TaskOptions, TaskSettings};
}
