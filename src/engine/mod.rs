// State Engine Module
//
// Task runner, state traversal and error recovery. Everything the engine needs
// from the caller (task actions, recovery policy) comes in through traits.

pub mod errors;
pub mod state_machine;
pub mod task_runner;
pub mod traits;
pub mod types;

pub use errors::{EngineError, TaskFailure};
pub use state_machine::{MachineConfig, StateMachine};
pub use task_runner::TaskRunner;
pub use traits::{AsyncFnAction, ErrorHandler, FnAction, FnErrorHandler, TaskAction};
pub use types::{Outcome, RecoveryDecision, RunReport, StateDefinition, StateId, Task};

#[cfg(feature = "testing")]
pub use traits::MockErrorHandler;
