//! Read-only messages and their handlers.

use async_trait::async_trait;

use crate::{
    error::TodoError,
    handler::{Query, QueryHandler},
    repository::TodoRepository,
    types::{TodoId, TodoLinks, TodoResource, TodoSort},
};

#[derive(Debug, Clone, Copy)]
pub struct GetTodo {
    pub id: TodoId,
}

impl Query for GetTodo {
    const NAME: &'static str = "GetTodo";
    type Output = TodoResource;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetAllTodos {
    pub sort: TodoSort,
}

impl Query for GetAllTodos {
    const NAME: &'static str = "GetAllTodos";
    type Output = Vec<TodoResource>;
}

#[derive(Debug, Clone)]
pub struct GetTodoHandler {
    links: TodoLinks,
}

impl GetTodoHandler {
    pub fn new(links: TodoLinks) -> Self {
        Self { links }
    }
}

#[async_trait]
impl QueryHandler<GetTodo> for GetTodoHandler {
    async fn handle(
        &self,
        todos: &mut dyn TodoRepository,
        query: GetTodo,
    ) -> Result<TodoResource, TodoError> {
        let todo = todos.get_by_id(query.id).await?;
        Ok(self.links.resource(todo))
    }
}

#[derive(Debug, Clone)]
pub struct GetAllTodosHandler {
    links: TodoLinks,
}

impl GetAllTodosHandler {
    pub fn new(links: TodoLinks) -> Self {
        Self { links }
    }
}

#[async_trait]
impl QueryHandler<GetAllTodos> for GetAllTodosHandler {
    async fn handle(
        &self,
        todos: &mut dyn TodoRepository,
        query: GetAllTodos,
    ) -> Result<Vec<TodoResource>, TodoError> {
        let all = todos.get_all(query.sort).await?;
        Ok(all.into_iter().map(|todo| self.links.resource(todo)).collect())
    }
}
