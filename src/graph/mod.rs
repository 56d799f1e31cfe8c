// Declarative machine definitions loaded from TOML graph files

pub mod command;
pub mod errors;
pub mod file;
pub mod handler;

pub use command::CommandAction;
pub use errors::GraphError;
pub use file::{ErrorHandlerSpec, GraphFile, RouteSpec, StateSpec, TaskSpec};
pub use handler::RouteErrorHandler;
