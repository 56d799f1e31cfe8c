//! Error handling scenarios for the state machine
//!
//! Two states S1 -> S2 -> TERMINATE where S1 fails and the error handler
//! decides whether the run recovers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use task_fsm::{EngineError, MachineConfig, Outcome, StateDefinition, StateMachine, Task};

fn machine_config() -> MachineConfig {
    MachineConfig::new("S1", "TERMINATE")
        .with_state("S1", StateDefinition::new("S2"))
        .with_state("S2", StateDefinition::new("TERMINATE"))
}

fn task() -> Task {
    Task::from_fn("task", || Ok(()))
}

fn task_error() -> Task {
    Task::from_fn("error", || Err(anyhow::anyhow!("error")))
}

fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
    let counter = Arc::clone(counter);
    Task::from_fn("counted", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

fn set_tasks(config: &mut MachineConfig, state: &str, tasks: Vec<Task>) {
    config
        .states
        .get_mut(state)
        .expect("state exists in test config")
        .tasks = tasks;
}

#[tokio::test]
async fn test_handled_error_with_valid_resume_state_exits_zero() {
    let s2_runs = Arc::new(AtomicUsize::new(0));

    let mut config = machine_config().with_error_handler_fn(|_| Ok(Some("S2".to_string())));
    set_tasks(&mut config, "S1", vec![task_error()]);
    set_tasks(&mut config, "S2", vec![task(), counting_task(&s2_runs)]);

    let machine = StateMachine::new(config).unwrap();
    let outcome = machine.start().await.unwrap();

    assert_eq!(outcome, Outcome::Success);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(s2_runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unhandled_error_exits_one_and_skips_remaining_tasks() {
    let after_failure = Arc::new(AtomicUsize::new(0));

    let mut config = machine_config();
    set_tasks(&mut config, "S1", vec![task_error(), counting_task(&after_failure)]);
    set_tasks(&mut config, "S2", vec![]);

    let machine = StateMachine::new(config).unwrap();
    let outcome = machine.start().await.unwrap();

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(after_failure.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handler_returning_unknown_state_exits_one() {
    let mut config = machine_config().with_error_handler_fn(|_| Ok(Some("S10".to_string())));
    set_tasks(&mut config, "S1", vec![task_error(), task()]);
    set_tasks(&mut config, "S2", vec![]);

    let machine = StateMachine::new(config).unwrap();

    assert_eq!(machine.start().await.unwrap(), Outcome::Failure);
}

#[tokio::test]
async fn test_handler_returning_nothing_exits_one() {
    let mut config = machine_config().with_error_handler_fn(|_| Ok(None));
    set_tasks(&mut config, "S1", vec![task_error()]);

    let machine = StateMachine::new(config).unwrap();

    assert_eq!(machine.start().await.unwrap().exit_code(), 1);
}

#[tokio::test]
async fn test_handler_returning_terminate_marker_exits_one() {
    // The terminal marker is not a state, so it is not a valid resume target
    let mut config = machine_config().with_error_handler_fn(|_| Ok(Some("TERMINATE".to_string())));
    set_tasks(&mut config, "S1", vec![task_error()]);

    let machine = StateMachine::new(config).unwrap();

    assert_eq!(machine.start().await.unwrap(), Outcome::Failure);
}

#[derive(Debug, thiserror::Error)]
#[error("Cannot set property 'c' of undefined")]
struct HandlerBug;

#[tokio::test]
async fn test_error_thrown_from_handler_is_propagated() {
    let mut config = machine_config().with_error_handler_fn(|_| Err(HandlerBug.into()));
    set_tasks(&mut config, "S1", vec![task_error(), task()]);
    set_tasks(&mut config, "S2", vec![]);

    let machine = StateMachine::new(config).unwrap();
    let err = machine.start().await.unwrap_err();

    assert_eq!(err.to_string(), "Cannot set property 'c' of undefined");
    match err {
        EngineError::HandlerFault(inner) => assert!(inner.downcast_ref::<HandlerBug>().is_some()),
        other => panic!("expected handler fault, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handler_can_route_back_to_failing_state() {
    // S1 fails on its first attempt only; the handler retries it
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_in_task = Arc::clone(&attempts);
    let flaky = Task::from_fn("flaky", move || {
        if attempts_in_task.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("transient");
        }
        Ok(())
    });

    let mut config = machine_config().with_error_handler_fn(|err| {
        Ok((err.to_string() == "transient").then(|| "S1".to_string()))
    });
    set_tasks(&mut config, "S1", vec![flaky]);

    let machine = StateMachine::new(config).unwrap();
    let report = machine.run().await.unwrap();

    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.states_entered, 3);
    assert_eq!(report.final_state.as_deref(), Some("S2"));
    assert_eq!(report.recoveries, 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}
