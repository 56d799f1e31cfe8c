// TOML graph files
//
// A graph file declares the whole machine: states with their shell tasks,
// the terminal marker, an optional routed error handler and cleanup tasks.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::engine::{MachineConfig, StateDefinition, StateMachine, Task};
use crate::graph::command::CommandAction;
use crate::graph::errors::GraphError;
use crate::graph::handler::RouteErrorHandler;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GraphFile {
    pub initial_state: String,
    pub terminate_state: String,
    #[serde(default)]
    pub states: BTreeMap<String, StateSpec>,
    #[serde(default)]
    pub error_handler: Option<ErrorHandlerSpec>,
    #[serde(default)]
    pub cleanup_tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StateSpec {
    #[serde(default)]
    pub task: Option<TaskSpec>,
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
    pub next_state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSpec {
    pub name: String,
    /// Command line handed to the configured shell
    pub run: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorHandlerSpec {
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    /// Regex matched against the failure message
    pub pattern: String,
    pub resume: String,
}

impl GraphFile {
    pub fn from_toml_str(source: &str) -> Result<Self, GraphError> {
        let graph: GraphFile = toml::from_str(source)?;
        graph.validate()?;
        Ok(graph)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| GraphError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&source)
    }

    /// Structural checks on the declared graph.
    ///
    /// Successors and resume targets are not required to exist: the engine
    /// treats an unknown successor as a fault and an unknown resume target as
    /// a halt, and both are legitimate ways to write a graph. A state may share
    /// its id with the terminate marker; reaching that id ends the run, so its
    /// tasks never execute.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.initial_state != self.terminate_state && !self.states.contains_key(&self.initial_state) {
            return Err(GraphError::Invalid(format!(
                "initial_state '{}' is neither a declared state nor the terminate state",
                self.initial_state
            )));
        }

        for (id, state) in &self.states {
            for task in state.task.iter().chain(&state.tasks) {
                validate_task(task, &format!("state '{id}'"))?;
            }
        }
        for task in &self.cleanup_tasks {
            validate_task(task, "cleanup_tasks")?;
        }
        Ok(())
    }

    /// State ids that declare a successor which is neither a state nor the terminal marker
    pub fn dangling_successors(&self) -> Vec<(&str, &str)> {
        self.states
            .iter()
            .filter(|(_, s)| s.next_state != self.terminate_state && !self.states.contains_key(&s.next_state))
            .map(|(id, s)| (id.as_str(), s.next_state.as_str()))
            .collect()
    }

    pub fn to_machine_config(&self, shell: &str) -> Result<MachineConfig, GraphError> {
        let mut config = MachineConfig::new(&self.initial_state, &self.terminate_state);

        for (id, spec) in &self.states {
            let mut state = StateDefinition::new(&spec.next_state)
                .with_tasks(spec.tasks.iter().map(|t| t.to_task(shell)));
            state.task = spec.task.as_ref().map(|t| t.to_task(shell));
            config = config.with_state(id, state);
        }

        if let Some(handler) = &self.error_handler {
            config = config.with_error_handler(handler.build()?);
        }

        Ok(config.with_cleanup_tasks(self.cleanup_tasks.iter().map(|t| t.to_task(shell))))
    }

    pub fn build_machine(&self, shell: &str) -> Result<StateMachine, GraphError> {
        Ok(StateMachine::new(self.to_machine_config(shell)?)?)
    }
}

impl TaskSpec {
    fn to_task(&self, shell: &str) -> Task {
        Task::new(&self.name, CommandAction::new(shell, &self.run))
    }
}

impl ErrorHandlerSpec {
    pub fn build(&self) -> Result<RouteErrorHandler, GraphError> {
        let routes = self
            .routes
            .iter()
            .map(|route| {
                Regex::new(&route.pattern)
                    .map(|re| (re, route.resume.clone()))
                    .map_err(|source| GraphError::InvalidPattern {
                        pattern: route.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RouteErrorHandler::new(routes, self.fallback.clone()))
    }
}

fn validate_task(task: &TaskSpec, owner: &str) -> Result<(), GraphError> {
    if task.name.trim().is_empty() {
        return Err(GraphError::Invalid(format!("{owner} has a task with an empty name")));
    }
    if task.run.trim().is_empty() {
        return Err(GraphError::Invalid(format!(
            "task '{}' in {owner} has an empty command",
            task.name
        )));
    }
    Ok(())
}
