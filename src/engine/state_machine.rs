// State engine - walks the state graph, running each state's work and
// consulting the error handler when that work fails

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

use crate::engine::errors::{EngineError, TaskFailure};
use crate::engine::task_runner::TaskRunner;
use crate::engine::traits::{ErrorHandler, FnErrorHandler};
use crate::engine::types::{Outcome, RecoveryDecision, RunReport, StateDefinition, StateId, Task};
use crate::telemetry::{create_run_span, generate_run_id};

/// Immutable description of a machine: its states, entry and exit points,
/// recovery policy and cleanup work.
#[derive(Clone)]
pub struct MachineConfig {
    pub initial_state: StateId,
    pub terminate_state: StateId,
    pub states: HashMap<StateId, StateDefinition>,
    pub error_handler: Option<Arc<dyn ErrorHandler>>,
    pub cleanup_tasks: Vec<Task>,
}

impl MachineConfig {
    pub fn new(initial_state: impl Into<StateId>, terminate_state: impl Into<StateId>) -> Self {
        Self {
            initial_state: initial_state.into(),
            terminate_state: terminate_state.into(),
            states: HashMap::new(),
            error_handler: None,
            cleanup_tasks: Vec::new(),
        }
    }

    pub fn with_state(mut self, id: impl Into<StateId>, state: StateDefinition) -> Self {
        self.states.insert(id.into(), state);
        self
    }

    pub fn with_error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Install a synchronous closure as the error handler
    pub fn with_error_handler_fn<F>(self, handler: F) -> Self
    where
        F: Fn(&anyhow::Error) -> anyhow::Result<Option<StateId>> + Send + Sync + 'static,
    {
        self.with_error_handler(FnErrorHandler(handler))
    }

    pub fn with_cleanup_tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        self.cleanup_tasks.extend(tasks);
        self
    }

    pub fn is_terminal(&self, state: &str) -> bool {
        self.terminate_state == state
    }

    /// Shape checks the engine relies on before a run can start
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.initial_state.is_empty() {
            return Err(EngineError::InvalidConfig("initial state is empty".to_string()));
        }
        if self.terminate_state.is_empty() {
            return Err(EngineError::InvalidConfig("terminate state is empty".to_string()));
        }
        if !self.is_terminal(&self.initial_state) && !self.states.contains_key(&self.initial_state) {
            return Err(EngineError::InvalidConfig(format!(
                "initial state '{}' is not defined",
                self.initial_state
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MachineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut states: Vec<_> = self.states.keys().collect();
        states.sort();
        f.debug_struct("MachineConfig")
            .field("initial_state", &self.initial_state)
            .field("terminate_state", &self.terminate_state)
            .field("states", &states)
            .field("error_handler", &self.error_handler.is_some())
            .field("cleanup_tasks", &self.cleanup_tasks)
            .finish()
    }
}

/// Per-run counters; constant size however long the run loops
#[derive(Debug, Default)]
struct Progress {
    states_entered: u64,
    recoveries: u32,
    last_state: Option<StateId>,
}

impl Progress {
    fn enter(&mut self, state: &str) {
        self.states_entered += 1;
        if self.last_state.as_deref() != Some(state) {
            self.last_state = Some(state.to_string());
        }
    }
}

/// Where a traversal ended before cleanup
enum Traversal {
    Finished(Outcome),
    Aborted(EngineError),
}

/// Handle for running a configured machine.
///
/// Cloning is cheap and every clone shares the same configuration. Each call
/// to [`StateMachine::start`] or [`StateMachine::run`] is an independent run
/// with its own current-state pointer.
#[derive(Debug, Clone)]
pub struct StateMachine {
    config: Arc<MachineConfig>,
    runner: TaskRunner,
}

impl StateMachine {
    pub fn new(config: MachineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            runner: TaskRunner::new(),
        })
    }

    /// Run the machine to completion and return its outcome.
    ///
    /// Resolves to [`Outcome::Success`] when the terminal marker is reached and
    /// [`Outcome::Failure`] when a task failure could not be recovered. A fault
    /// raised by the error handler is returned as `Err` with cleanup skipped.
    pub async fn start(&self) -> Result<Outcome, EngineError> {
        self.run().await.map(|report| report.outcome)
    }

    /// Same as [`StateMachine::start`] but returns the full run report
    pub async fn run(&self) -> Result<RunReport, EngineError> {
        let run_id = generate_run_id();
        let span = create_run_span(&run_id, &self.config.initial_state);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: String) -> Result<RunReport, EngineError> {
        let started_at = Utc::now();
        let mut progress = Progress::default();

        let outcome = match self.traverse(&mut progress).await {
            Traversal::Finished(outcome) => outcome,
            Traversal::Aborted(err) => {
                error!(
                    error = %err,
                    last_state = ?progress.last_state,
                    states_entered = progress.states_entered,
                    "Run aborted"
                );
                return Err(err);
            }
        };

        self.run_cleanup().await;

        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds();
        info!(
            outcome = ?outcome,
            exit_code = outcome.exit_code(),
            states_entered = progress.states_entered,
            recoveries = progress.recoveries,
            duration_ms,
            "Run finished"
        );

        Ok(RunReport {
            run_id,
            outcome,
            states_entered: progress.states_entered,
            recoveries: progress.recoveries,
            final_state: progress.last_state,
            started_at,
            finished_at,
            duration_ms,
        })
    }

    async fn traverse(&self, progress: &mut Progress) -> Traversal {
        let mut current = self.config.initial_state.clone();

        loop {
            if self.config.is_terminal(&current) {
                return Traversal::Finished(Outcome::Success);
            }

            let Some(state) = self.config.states.get(&current) else {
                return Traversal::Aborted(EngineError::UnknownState(current));
            };

            debug!(state = %current, "Entering state");
            progress.enter(&current);

            let failure = match self.runner.run(&state.work_list()).await {
                Ok(()) => {
                    current = state.next_state.clone();
                    continue;
                }
                Err(failure) => failure,
            };

            match self.recover(&current, failure).await {
                Ok(RecoveryDecision::Resume(next)) => {
                    progress.recoveries += 1;
                    current = next;
                }
                Ok(RecoveryDecision::Halt) => return Traversal::Finished(Outcome::Failure),
                Err(err) => return Traversal::Aborted(err),
            }
        }
    }

    /// Ask the error handler where to go after `failure`, validating its answer
    /// against the known states.
    async fn recover(&self, state: &str, failure: TaskFailure) -> Result<RecoveryDecision, EngineError> {
        let Some(handler) = self.config.error_handler.as_ref() else {
            info!(state, task = %failure.task_name, "No error handler configured, halting");
            return Ok(RecoveryDecision::Halt);
        };

        let task_name = failure.task_name.clone();
        let raw = handler
            .handle(&failure.into_error())
            .await
            .map_err(EngineError::HandlerFault)?;

        let decision = self.decide(raw);
        match &decision {
            RecoveryDecision::Resume(next) => {
                info!(state, task = %task_name, resume = %next, "Error handled, resuming");
            }
            RecoveryDecision::Halt => {
                info!(state, task = %task_name, "Error handler declined to resume, halting");
            }
        }
        Ok(decision)
    }

    fn decide(&self, raw: Option<StateId>) -> RecoveryDecision {
        match raw {
            Some(next) if self.config.states.contains_key(&next) => RecoveryDecision::Resume(next),
            _ => RecoveryDecision::Halt,
        }
    }

    /// Cleanup failures are logged and never change an already-decided outcome.
    async fn run_cleanup(&self) {
        if self.config.cleanup_tasks.is_empty() {
            return;
        }
        if let Err(failure) = self.runner.run(&self.config.cleanup_tasks).await {
            warn!(
                task = %failure.task_name,
                error = %failure.error,
                "Cleanup task failed, keeping run outcome"
            );
        }
    }
}
