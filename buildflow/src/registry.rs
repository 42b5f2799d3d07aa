//! Task registration.
//!
//! The engine never discovers tasks itself; it asks a registry for the
//! candidates applicable to a context. How tasks got registered (plugins,
//! static wiring, scripts) is the caller's business.

use crate::context::BuildContext;
use crate::task::BuildTask;
use std::fmt;

/// Supplies candidate tasks for a context.
///
/// Each call must produce fresh task instances: collection mutates task
/// options, and one registry may serve many pipeline builds.
pub trait TaskRegistry: Send + Sync {
    /// Produces the candidate tasks for the given context, in no particular
    /// order.
    fn collect(&self, context: &BuildContext) -> Vec<Box<dyn BuildTask>>;
}

type TaskFactory = Box<dyn Fn() -> Box<dyn BuildTask> + Send + Sync>;

/// A registry backed by an explicit list of task factories.
#[derive(Default)]
pub struct StaticTaskRegistry {
    factories: Vec<TaskFactory>,
}

impl StaticTaskRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task factory.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn BuildTask> + Send + Sync + 'static,
    {
        self.factories.push(Box::new(factory));
    }

    /// Returns the number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for StaticTaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTaskRegistry")
            .field("factories", &self.factories.len())
            .finish()
    }
}

impl TaskRegistry for StaticTaskRegistry {
    fn collect(&self, _context: &BuildContext) -> Vec<Box<dyn BuildTask>> {
        self.factories.iter().map(|f| f()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTask;

    #[test]
    fn test_static_registry_produces_fresh_instances() {
        let mut registry = StaticTaskRegistry::new();
        registry.register(|| Box::new(ScriptedTask::new("compile", 100)));

        let ctx = BuildContext::new("buildflow", "release");
        let first = registry.collect(&ctx);
        let second = registry.collect(&ctx);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].name(), "compile");
    }

    #[test]
    fn test_empty_registry() {
        let registry = StaticTaskRegistry::new();
        assert!(registry.is_empty());

        let ctx = BuildContext::new("buildflow", "release");
        assert!(registry.collect(&ctx).is_empty());
    }
}
