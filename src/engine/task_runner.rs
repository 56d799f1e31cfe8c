// Sequential task execution

use tracing::{debug, warn};

use crate::engine::errors::TaskFailure;
use crate::engine::types::Task;

/// Runs an ordered list of tasks one at a time, stopping at the first failure.
///
/// The runner is stateless; the same instance can serve any number of runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskRunner;

impl TaskRunner {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, tasks: &[Task]) -> Result<(), TaskFailure> {
        for task in tasks {
            debug!(task = task.name(), "Starting task");
            if let Err(error) = task.action().execute().await {
                warn!(task = task.name(), error = %error, "Task failed");
                return Err(TaskFailure::new(task.name(), error));
            }
            debug!(task = task.name(), "Task completed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_task(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Task {
        let log = Arc::clone(log);
        Task::from_fn(name, move || {
            log.lock().unwrap().push(name);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_empty_list_succeeds() {
        assert!(TaskRunner::new().run(&[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_runs_tasks_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tasks = vec![
            recording_task("first", &log),
            recording_task("second", &log),
            recording_task("third", &log),
        ];

        TaskRunner::new().run(&tasks).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tasks = vec![
            recording_task("before", &log),
            Task::from_fn("broken", || Err(anyhow::anyhow!("disk full"))),
            recording_task("after", &log),
        ];

        let failure = TaskRunner::new().run(&tasks).await.unwrap_err();

        assert_eq!(failure.task_name, "broken");
        assert_eq!(failure.error.to_string(), "disk full");
        assert_eq!(*log.lock().unwrap(), vec!["before"]);
    }

    #[tokio::test]
    async fn test_awaits_async_tasks_before_continuing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let slow_log = Arc::clone(&log);
        let tasks = vec![
            Task::from_async("slow", move || {
                let log = Arc::clone(&slow_log);
                async move {
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    log.lock().unwrap().push("slow");
                    Ok(())
                }
            }),
            recording_task("fast", &log),
        ];

        TaskRunner::new().run(&tasks).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["slow", "fast"]);
    }

    #[test]
    fn test_runner_blocking_on_current_thread() {
        let tasks = vec![Task::from_fn("noop", || Ok(()))];
        let result = tokio_test::block_on(TaskRunner::new().run(&tasks));
        assert!(result.is_ok());
    }
}
