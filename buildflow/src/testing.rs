//! Scriptable tasks and option carriers for tests and examples.
//!
//! Available outside `cfg(test)` so downstream crates can drive the engine
//! in their own tests.

use crate::cancellation::CancellationToken;
use crate::context::{BuildContext, FixedRequirement, RequirementSet};
use crate::errors::ValidationError;
use crate::observer::TaskObserver;
use crate::task::{BuildTask, FormatMethod, TaskOptions, TaskSettings};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A build task with scripted behavior.
///
/// Defaults to accepting every context and returning exit code 0
/// immediately. Builder methods script the interesting behaviors.
#[derive(Debug)]
pub struct ScriptedTask {
    settings: TaskSettings,
    requirements: Option<RequirementSet>,
    accepting: bool,
    result: i32,
    delay: Option<Duration>,
    cancel_reason: Option<String>,
    calls: Arc<AtomicUsize>,
    run_log: Option<Arc<RwLock<Vec<String>>>>,
}

impl ScriptedTask {
    /// Creates a task with the given name and order.
    #[must_use]
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self {
            settings: TaskSettings::new(name, order),
            requirements: None,
            accepting: true,
            result: 0,
            delay: None,
            cancel_reason: None,
            calls: Arc::new(AtomicUsize::new(0)),
            run_log: None,
        }
    }

    /// Makes `accept` reject every context.
    #[must_use]
    pub fn rejecting(mut self) -> Self {
        self.accepting = false;
        self
    }

    /// Marks the task concurrency-capable.
    #[must_use]
    pub fn concurrent(mut self) -> Self {
        self.settings = self.settings.concurrent();
        self
    }

    /// Marks the task fire-and-forget.
    #[must_use]
    pub fn fire_and_forget(mut self) -> Self {
        self.settings = self.settings.fire_and_forget();
        self
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.settings = self.settings.with_description(description);
        self
    }

    /// Attaches an environment requirement.
    #[must_use]
    pub fn with_requirement(mut self, requirement: FixedRequirement) -> Self {
        let set = self.requirements.get_or_insert_with(RequirementSet::new);
        set.push(Arc::new(requirement));
        self
    }

    /// Sets the exit code `execute` returns.
    #[must_use]
    pub fn with_result(mut self, result: i32) -> Self {
        self.result = result;
        self
    }

    /// Makes `execute` sleep before returning.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes `execute` trigger cancellation with the given reason.
    #[must_use]
    pub fn cancelling(mut self, reason: impl Into<String>) -> Self {
        self.cancel_reason = Some(reason.into());
        self
    }

    /// Records the task name into the shared log when `execute` starts.
    #[must_use]
    pub fn recording(mut self, log: Arc<RwLock<Vec<String>>>) -> Self {
        self.run_log = Some(log);
        self
    }

    /// A handle counting how many times `execute` ran.
    #[must_use]
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl BuildTask for ScriptedTask {
    fn settings(&self) -> &TaskSettings {
        &self.settings
    }

    fn requirements(&self) -> Option<&RequirementSet> {
        self.requirements.as_ref()
    }

    fn accept(&self, _context: &BuildContext) -> bool {
        self.accepting
    }

    async fn execute(
        &self,
        _context: &BuildContext,
        observer: &TaskObserver,
        cancel: &CancellationToken,
    ) -> i32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.run_log {
            log.write().push(self.name().to_string());
        }

        if let Some(reason) = &self.cancel_reason {
            cancel.cancel(reason.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        observer.progress(100);
        self.result
    }
}

/// Options with a default-valued `--level` flag, for format and override
/// tests.
#[derive(Debug, Clone)]
pub struct LevelOptions {
    /// The configured level.
    pub level: String,
}

impl Default for LevelOptions {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
        }
    }
}

impl TaskOptions for LevelOptions {
    fn format_args(&self, method: FormatMethod) -> Vec<String> {
        if method == FormatMethod::Complete || self.level != "debug" {
            vec!["--level".to_string(), self.level.clone()]
        } else {
            Vec::new()
        }
    }

    fn override_from_args(&mut self, args: &[String]) -> Result<(), String> {
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "--level" {
                match iter.next() {
                    Some(value) => self.level = value.clone(),
                    None => return Err("--level requires a value".to_string()),
                }
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.level.is_empty() {
            return Err(ValidationError::new("options", "level must not be empty"));
        }
        Ok(())
    }
}

/// A task carrying [`LevelOptions`].
#[derive(Debug)]
pub struct OptionedTask {
    settings: TaskSettings,
    options: LevelOptions,
}

impl OptionedTask {
    /// Creates a task with default options.
    #[must_use]
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self {
            settings: TaskSettings::new(name, order),
            options: LevelOptions::default(),
        }
    }

    /// The current option values.
    #[must_use]
    pub fn level(&self) -> &str {
        &self.options.level
    }
}

#[async_trait]
impl BuildTask for OptionedTask {
    fn settings(&self) -> &TaskSettings {
        &self.settings
    }

    fn options(&self) -> Option<&dyn TaskOptions> {
        Some(&self.options)
    }

    fn options_mut(&mut self) -> Option<&mut dyn TaskOptions> {
        Some(&mut self.options)
    }

    async fn execute(
        &self,
        _context: &BuildContext,
        _observer: &TaskObserver,
        _cancel: &CancellationToken,
    ) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::CollectingObserver;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_scripted_task_counts_calls() {
        let task = ScriptedTask::new("compile", 100).with_result(3);
        let calls = task.calls();

        let observer = TaskObserver::new("compile", Arc::new(CollectingObserver::new()));
        let ctx = BuildContext::new("buildflow", "p");
        let cancel = CancellationToken::new();

        let code = task.execute(&ctx, &observer, &cancel).await;
        assert_eq!(code, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancelling_task_triggers_token() {
        let task = ScriptedTask::new("abort", 100).cancelling("scripted stop");
        let observer = TaskObserver::new("abort", Arc::new(CollectingObserver::new()));
        let ctx = BuildContext::new("buildflow", "p");
        let cancel = CancellationToken::new();

        tokio_test::block_on(task.execute(&ctx, &observer, &cancel));
        assert!(cancel.is_cancelled());
        assert_eq!(cancel.reason(), Some("scripted stop".to_string()));
    }

    #[test]
    fn test_level_options_formatting() {
        let opts = LevelOptions::default();
        assert!(opts.format_args(FormatMethod::Simplify).is_empty());
        assert_eq!(
            opts.format_args(FormatMethod::Complete),
            vec!["--level", "debug"]
        );

        let changed = LevelOptions {
            level: "release".to_string(),
        };
        assert_eq!(
            changed.format_args(FormatMethod::Simplify),
            vec!["--level", "release"]
        );
    }

    #[test]
    fn test_level_options_override() {
        let mut opts = LevelOptions::default();
        let args = vec!["--other".to_string(), "--level".to_string(), "release".to_string()];
        opts.override_from_args(&args).unwrap();
        assert_eq!(opts.level, "release");

        let err = opts
            .override_from_args(&["--level".to_string()])
            .unwrap_err();
        assert!(err.contains("requires a value"));
    }
}
