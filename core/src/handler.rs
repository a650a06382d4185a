//! Message and handler traits shared by commands and queries.
//!
//! A message type names itself and its output; a handler is bound to exactly
//! one message type and receives the repository of the current unit of work.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::{error::TodoError, repository::TodoRepository};

/// A request to mutate todos.
pub trait Command: Debug + Send + 'static {
    const NAME: &'static str;
    type Output: Send + 'static;
}

/// A request to read todos. Its unit of work is never committed.
pub trait Query: Debug + Send + 'static {
    const NAME: &'static str;
    type Output: Send + 'static;
}

#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, todos: &mut dyn TodoRepository, command: C)
        -> Result<C::Output, TodoError>;
}

#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, todos: &mut dyn TodoRepository, query: Q) -> Result<Q::Output, TodoError>;
}
