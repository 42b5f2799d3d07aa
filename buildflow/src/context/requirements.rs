//! Environment requirement checks for contexts and tasks.

use std::fmt::Debug;
use std::sync::Arc;

/// A single environment precondition (a tool on PATH, an SDK, a variable).
///
/// Requirements are checked before a context or task is allowed to run;
/// detection itself lives outside the engine.
pub trait EnvironmentRequirement: Send + Sync + Debug {
    /// A short human-readable description of the requirement.
    fn description(&self) -> String;

    /// Checks the requirement, returning a failure message if unsatisfied.
    fn check(&self) -> Result<(), String>;
}

/// An ordered collection of environment requirements.
#[derive(Debug, Clone, Default)]
pub struct RequirementSet {
    items: Vec<Arc<dyn EnvironmentRequirement>>,
}

impl RequirementSet {
    /// Creates an empty requirement set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a requirement.
    pub fn push(&mut self, requirement: Arc<dyn EnvironmentRequirement>) {
        self.items.push(requirement);
    }

    /// Returns the number of requirements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checks every requirement, returning the combined failure message of
    /// all unsatisfied ones.
    pub fn check(&self) -> Result<(), String> {
        let failures: Vec<String> = self
            .items
            .iter()
            .filter_map(|r| r.check().err().map(|m| format!("{}: {m}", r.description())))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("; "))
        }
    }
}

/// A requirement that is always satisfied or always failing, for wiring and
/// tests.
#[derive(Debug, Clone)]
pub struct FixedRequirement {
    description: String,
    failure: Option<String>,
}

impl FixedRequirement {
    /// A requirement that always passes.
    #[must_use]
    pub fn satisfied(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            failure: None,
        }
    }

    /// A requirement that always fails with the given message.
    #[must_use]
    pub fn failing(description: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            failure: Some(message.into()),
        }
    }
}

impl EnvironmentRequirement for FixedRequirement {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn check(&self) -> Result<(), String> {
        match &self.failure {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_passes() {
        let set = RequirementSet::new();
        assert!(set.check().is_ok());
        assert!(set.is_empty());
    }

    #[test]
    fn test_satisfied_requirements_pass() {
        let mut set = RequirementSet::new();
        set.push(Arc::new(FixedRequirement::satisfied("git")));
        set.push(Arc::new(FixedRequirement::satisfied("cmake")));

        assert!(set.check().is_ok());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_failures_are_combined() {
        let mut set = RequirementSet::new();
        set.push(Arc::new(FixedRequirement::satisfied("git")));
        set.push(Arc::new(FixedRequirement::failing("ndk", "not installed")));
        set.push(Arc::new(FixedRequirement::failing("jdk", "wrong version")));

        let message = set.check().unwrap_err();
        assert!(message.contains("ndk: not installed"));
        assert!(message.contains("jdk: wrong version"));
    }
}
