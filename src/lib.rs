// task-fsm - finite-state task orchestration
// Core engine plus the declarative graph loader and ambient plumbing used by the CLI

pub mod config;
pub mod engine;
pub mod graph;
pub mod telemetry;

// Re-export key types for easy access
pub use crate::config::{DotenvStatus, EngineSettings};
pub use engine::{
    EngineError, ErrorHandler, MachineConfig, Outcome, RecoveryDecision, RunReport,
    StateDefinition, StateId, StateMachine, Task, TaskAction, TaskFailure, TaskRunner,
};
pub use graph::{GraphError, GraphFile};
pub use telemetry::{create_run_span, generate_run_id, init_telemetry};
