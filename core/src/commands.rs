//! Mutating messages and their handlers.
//!
//! Every handler validates its input before touching the repository, so a
//! rejected command never opens a write. Committing is left to the
//! dispatcher.

use async_trait::async_trait;

use crate::{
    error::TodoError,
    handler::{Command, CommandHandler},
    repository::TodoRepository,
    types::{TodoId, TodoInput, TodoLinks, TodoResource},
};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CreateTodo {
    pub input: TodoInput,
}

impl Command for CreateTodo {
    const NAME: &'static str = "CreateTodo";
    type Output = TodoResource;
}

#[derive(Debug, Clone)]
pub struct UpdateTodo {
    pub id: TodoId,
    pub input: TodoInput,
}

impl Command for UpdateTodo {
    const NAME: &'static str = "UpdateTodo";
    type Output = TodoResource;
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteTodo {
    pub id: TodoId,
}

impl Command for DeleteTodo {
    const NAME: &'static str = "DeleteTodo";
    type Output = ();
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteAllTodos;

impl Command for DeleteAllTodos {
    const NAME: &'static str = "DeleteAllTodos";
    type Output = ();
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CreateTodoHandler {
    links: TodoLinks,
}

impl CreateTodoHandler {
    pub fn new(links: TodoLinks) -> Self {
        Self { links }
    }
}

#[async_trait]
impl CommandHandler<CreateTodo> for CreateTodoHandler {
    async fn handle(
        &self,
        todos: &mut dyn TodoRepository,
        command: CreateTodo,
    ) -> Result<TodoResource, TodoError> {
        let new = command.input.validate()?.into_new();
        let todo = todos.add(new).await?;
        tracing::debug!(id = %todo.id, "todo created");
        Ok(self.links.resource(todo))
    }
}

#[derive(Debug, Clone)]
pub struct UpdateTodoHandler {
    links: TodoLinks,
}

impl UpdateTodoHandler {
    pub fn new(links: TodoLinks) -> Self {
        Self { links }
    }
}

#[async_trait]
impl CommandHandler<UpdateTodo> for UpdateTodoHandler {
    async fn handle(
        &self,
        todos: &mut dyn TodoRepository,
        command: UpdateTodo,
    ) -> Result<TodoResource, TodoError> {
        let patch = command.input.validate()?;
        let todo = todos.update(command.id, patch).await?;
        Ok(self.links.resource(todo))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteTodoHandler;

#[async_trait]
impl CommandHandler<DeleteTodo> for DeleteTodoHandler {
    async fn handle(
        &self,
        todos: &mut dyn TodoRepository,
        command: DeleteTodo,
    ) -> Result<(), TodoError> {
        todos.delete(command.id).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteAllTodosHandler;

#[async_trait]
impl CommandHandler<DeleteAllTodos> for DeleteAllTodosHandler {
    async fn handle(
        &self,
        todos: &mut dyn TodoRepository,
        _command: DeleteAllTodos,
    ) -> Result<(), TodoError> {
        todos.clear().await
    }
}
