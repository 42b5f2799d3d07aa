//! Execution observers.
//!
//! The execute service forwards log, progress and cancellation events to an
//! [`ExecuteObserver`]. Each task invocation sees a [`TaskObserver`] wrapper
//! that tags every forwarded event with the task's name.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Severity of a forwarded log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Diagnostic chatter.
    Verbose,
    /// Normal progress information.
    Info,
    /// Something suspicious but not fatal.
    Warning,
    /// A failure.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verbose => write!(f, "verbose"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Receives execution events for a pipeline run.
///
/// Implementations must be cheap and non-blocking; they are called from
/// concurrently running tasks.
pub trait ExecuteObserver: Send + Sync {
    /// A log event tagged with its originating task (or subsystem) name.
    fn on_event(&self, level: LogLevel, tag: &str, message: &str);

    /// Progress of a task, 0-100.
    fn on_progress(&self, task: &str, progress: u8);

    /// An external process has been handed off and the engine is waiting.
    fn on_idle(&self) {}

    /// Cancellation has been acknowledged. Fired exactly once per run.
    fn on_cancelled(&self) {}
}

/// Observer handed to a single task invocation.
///
/// Adds the task name as the tag of every forwarded event, so a task only
/// reports about itself.
pub struct TaskObserver {
    task: String,
    inner: Arc<dyn ExecuteObserver>,
}

impl TaskObserver {
    /// Creates a wrapper bound to the given task name.
    #[must_use]
    pub fn new(task: impl Into<String>, inner: Arc<dyn ExecuteObserver>) -> Self {
        Self {
            task: task.into(),
            inner,
        }
    }

    /// The bound task name.
    #[must_use]
    pub fn task_name(&self) -> &str {
        &self.task
    }

    /// Forwards a log event tagged with the task name.
    pub fn log(&self, level: LogLevel, message: &str) {
        self.inner.on_event(level, &self.task, message);
    }

    /// Forwards an info event.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Forwards a warning event.
    pub fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    /// Forwards an error event.
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Forwards task progress, clamped to 0-100.
    pub fn progress(&self, progress: u8) {
        self.inner.on_progress(&self.task, progress.min(100));
    }

    /// Forwards the idle notification.
    pub fn idle(&self) {
        self.inner.on_idle();
    }
}

impl fmt::Debug for TaskObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskObserver")
            .field("task", &self.task)
            .finish()
    }
}

/// An observer that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl ExecuteObserver for NoOpObserver {
    fn on_event(&self, _level: LogLevel, _tag: &str, _message: &str) {}

    fn on_progress(&self, _task: &str, _progress: u8) {}
}

/// An observer that logs events through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ExecuteObserver for TracingObserver {
    fn on_event(&self, level: LogLevel, tag: &str, message: &str) {
        match level {
            LogLevel::Verbose => debug!(task = %tag, "{message}"),
            LogLevel::Info => info!(task = %tag, "{message}"),
            LogLevel::Warning => warn!(task = %tag, "{message}"),
            LogLevel::Error => error!(task = %tag, "{message}"),
        }
    }

    fn on_progress(&self, task: &str, progress: u8) {
        debug!(task = %task, progress, "task progress");
    }

    fn on_cancelled(&self) {
        warn!("pipeline cancellation acknowledged");
    }
}

/// A recorded log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedEvent {
    /// The event severity.
    pub level: LogLevel,
    /// The originating task name.
    pub tag: String,
    /// The message.
    pub message: String,
}

/// A collecting observer for tests.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: RwLock<Vec<ObservedEvent>>,
    progress: RwLock<Vec<(String, u8)>>,
    cancelled: AtomicUsize,
    idle: AtomicUsize,
}

impl CollectingObserver {
    /// Creates a new collecting observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.read().clone()
    }

    /// Returns recorded events with the given tag.
    #[must_use]
    pub fn events_for(&self, tag: &str) -> Vec<ObservedEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.tag == tag)
            .cloned()
            .collect()
    }

    /// Returns recorded progress callbacks.
    #[must_use]
    pub fn progress(&self) -> Vec<(String, u8)> {
        self.progress.read().clone()
    }

    /// How many times cancellation was acknowledged.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// How many times the idle notification fired.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.load(Ordering::SeqCst)
    }
}

impl ExecuteObserver for CollectingObserver {
    fn on_event(&self, level: LogLevel, tag: &str, message: &str) {
        self.events.write().push(ObservedEvent {
            level,
            tag: tag.to_string(),
            message: message.to_string(),
        });
    }

    fn on_progress(&self, task: &str, progress: u8) {
        self.progress.write().push((task.to_string(), progress));
    }

    fn on_idle(&self) {
        self.idle.fetch_add(1, Ordering::SeqCst);
    }

    fn on_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_observer_tags_events() {
        let sink = Arc::new(CollectingObserver::new());
        let observer = TaskObserver::new("compile", sink.clone());

        observer.info("starting");
        observer.error("boom");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tag, "compile");
        assert_eq!(events[0].level, LogLevel::Info);
        assert_eq!(events[1].level, LogLevel::Error);
        assert_eq!(events[1].message, "boom");
    }

    #[test]
    fn test_task_observer_clamps_progress() {
        let sink = Arc::new(CollectingObserver::new());
        let observer = TaskObserver::new("compile", sink.clone());

        observer.progress(250);
        assert_eq!(sink.progress(), vec![("compile".to_string(), 100)]);
    }

    #[test]
    fn test_collecting_observer_filters_by_tag() {
        let sink = CollectingObserver::new();
        sink.on_event(LogLevel::Info, "a", "one");
        sink.on_event(LogLevel::Info, "b", "two");
        sink.on_event(LogLevel::Warning, "a", "three");

        assert_eq!(sink.events_for("a").len(), 2);
        assert_eq!(sink.events_for("b").len(), 1);
    }

    #[test]
    fn test_noop_observer_does_not_panic() {
        let sink = NoOpObserver;
        sink.on_event(LogLevel::Error, "x", "y");
        sink.on_progress("x", 50);
        sink.on_idle();
        sink.on_cancelled();
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Verbose.to_string(), "verbose");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }
}
