// Pattern-routed error handler for graph files

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use crate::engine::{ErrorHandler, StateId};

/// Picks a resume state by matching the failure text against regex routes.
///
/// Routes are tried in order and the first match wins. When nothing matches
/// the fallback is returned, or no value at all, which halts the run.
#[derive(Debug, Clone)]
pub struct RouteErrorHandler {
    routes: Vec<(Regex, StateId)>,
    fallback: Option<StateId>,
}

impl RouteErrorHandler {
    pub fn new(routes: Vec<(Regex, StateId)>, fallback: Option<StateId>) -> Self {
        Self { routes, fallback }
    }

    pub fn route(&self, message: &str) -> Option<StateId> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.is_match(message))
            .map(|(_, state)| state.clone())
            .or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl ErrorHandler for RouteErrorHandler {
    async fn handle(&self, error: &anyhow::Error) -> Result<Option<StateId>> {
        Ok(self.route(&format!("{error:#}")))
    }
}
