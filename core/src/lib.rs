//! Todo domain, storage and command/query dispatch.
//!
//! # Overview
//! HTTP-agnostic core of the todo backend. Callers build a command or query
//! value and hand it to a `Dispatcher`, which opens a unit of work on the
//! configured store, runs the single handler registered for that message
//! type, and commits or rolls back.
//!
//! # Design
//! - Commands (`CreateTodo`, `UpdateTodo`, `DeleteTodo`, `DeleteAllTodos`)
//!   mutate; queries (`GetTodo`, `GetAllTodos`) only read.
//! - Storage is either in-memory or SQLite behind the same
//!   `UnitOfWorkManager` contract, chosen at runtime via `StoreConfig`.
//! - `dispatcher` is the one place where message types are bound to
//!   handlers; it refuses to build if any message is left unhandled.

pub mod commands;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod queries;
pub mod repository;
pub mod types;

use std::sync::Arc;

pub use commands::{CreateTodo, DeleteAllTodos, DeleteTodo, UpdateTodo};
pub use dispatcher::{DispatchStep, Dispatcher, LoggingStep, TimingStep};
pub use error::{RegistrationError, TodoError};
pub use queries::{GetAllTodos, GetTodo};
pub use repository::{StoreConfig, UnitOfWorkManager};
pub use types::{Field, TodoId, TodoInput, TodoLinks, TodoResource, TodoSort};

use commands::{CreateTodoHandler, DeleteAllTodosHandler, DeleteTodoHandler, UpdateTodoHandler};
use queries::{GetAllTodosHandler, GetTodoHandler};

/// Build the application dispatcher with every todo handler registered and
/// logging plus timing wrapped around each message.
pub fn dispatcher(
    store: Arc<dyn UnitOfWorkManager>,
    links: TodoLinks,
) -> Result<Dispatcher, RegistrationError> {
    Dispatcher::builder(store)
        .step(LoggingStep)
        .step(TimingStep::default())
        .command::<CreateTodo, _>(CreateTodoHandler::new(links.clone()))
        .command::<UpdateTodo, _>(UpdateTodoHandler::new(links.clone()))
        .command::<DeleteTodo, _>(DeleteTodoHandler)
        .command::<DeleteAllTodos, _>(DeleteAllTodosHandler)
        .query::<GetTodo, _>(GetTodoHandler::new(links.clone()))
        .query::<GetAllTodos, _>(GetAllTodosHandler::new(links))
        .require_command::<CreateTodo>()
        .require_command::<UpdateTodo>()
        .require_command::<DeleteTodo>()
        .require_command::<DeleteAllTodos>()
        .require_query::<GetTodo>()
        .require_query::<GetAllTodos>()
        .build()
}
