// Core data types for the state engine

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::engine::traits::{AsyncFnAction, FnAction, TaskAction};

/// Identifier of a state in the machine graph
pub type StateId = String;

/// A named unit of work. Cloning a task shares the underlying action.
#[derive(Clone)]
pub struct Task {
    name: String,
    action: Arc<dyn TaskAction>,
}

impl Task {
    pub fn new(name: impl Into<String>, action: impl TaskAction + 'static) -> Self {
        Self {
            name: name.into(),
            action: Arc::new(action),
        }
    }

    /// Build a task from a synchronous closure
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::new(name, FnAction(f))
    }

    /// Build a task from a closure returning a future
    pub fn from_async<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::new(name, AsyncFnAction(f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &dyn TaskAction {
        self.action.as_ref()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Work and default successor for one state
#[derive(Debug, Clone)]
pub struct StateDefinition {
    pub task: Option<Task>,
    pub tasks: Vec<Task>,
    pub next_state: StateId,
}

impl StateDefinition {
    /// A state with no work that moves straight on to `next_state`
    pub fn new(next_state: impl Into<StateId>) -> Self {
        Self {
            task: None,
            tasks: Vec::new(),
            next_state: next_state.into(),
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.task = Some(task);
        self
    }

    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Ordered work for this state: the single task first, then the sequence.
    pub fn work_list(&self) -> Vec<Task> {
        self.task
            .iter()
            .chain(self.tasks.iter())
            .cloned()
            .collect()
    }
}

/// Final result of a run that was not aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Numeric outcome: 0 for success, 1 for failure
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::Failure => 1,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl From<Outcome> for i32 {
    fn from(outcome: Outcome) -> Self {
        outcome.exit_code()
    }
}

/// What the engine does after consulting the error handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryDecision {
    Resume(StateId),
    Halt,
}

/// Record of a completed run.
///
/// Only counters are kept, so a run that loops through the same states for a
/// long time reports in constant space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: Outcome,
    /// Number of times a state's work was started. The terminal marker is not counted.
    pub states_entered: u64,
    pub recoveries: u32,
    /// Last state whose work was started
    pub final_state: Option<StateId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Task {
        Task::from_fn(name, || Ok(()))
    }

    #[test]
    fn test_work_list_puts_single_task_first() {
        let state = StateDefinition::new("next")
            .with_tasks(vec![noop("b"), noop("c")])
            .with_task(noop("a"));

        let names: Vec<_> = state.work_list().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_work_list_empty_state() {
        let state = StateDefinition::new("next");
        assert!(state.work_list().is_empty());
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(Outcome::Success.exit_code(), 0);
        assert_eq!(Outcome::Failure.exit_code(), 1);
        assert_eq!(i32::from(Outcome::Failure), 1);
        assert!(Outcome::Success.is_success());
        assert!(!Outcome::Failure.is_success());
    }

    #[test]
    fn test_task_debug_shows_name() {
        let task = noop("compile");
        assert!(format!("{task:?}").contains("compile"));
    }
}
