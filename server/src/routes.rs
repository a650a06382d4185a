//! HTTP controller: maps verbs and paths onto commands and queries.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use todo_core::{
    CreateTodo, DeleteAllTodos, DeleteTodo, GetAllTodos, GetTodo, TodoId, TodoInput,
    TodoResource, TodoSort, UpdateTodo,
};

use crate::{
    error::ApiError,
    extract::{AppJson, AppPath, AppQuery},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub sort: TodoSort,
}

pub async fn list_todos(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<Vec<TodoResource>>, ApiError> {
    let todos = state
        .dispatcher
        .fetch(GetAllTodos { sort: params.sort })
        .await?;
    Ok(Json(todos))
}

pub async fn create_todo(
    State(state): State<AppState>,
    AppJson(input): AppJson<TodoInput>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = state.dispatcher.send(CreateTodo { input }).await?;
    let location = todo.url.clone();
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(todo)))
}

pub async fn get_todo(
    State(state): State<AppState>,
    AppPath(id): AppPath<TodoId>,
) -> Result<Json<TodoResource>, ApiError> {
    let todo = state.dispatcher.fetch(GetTodo { id }).await?;
    Ok(Json(todo))
}

pub async fn update_todo(
    State(state): State<AppState>,
    AppPath(id): AppPath<TodoId>,
    AppJson(input): AppJson<TodoInput>,
) -> Result<Json<TodoResource>, ApiError> {
    let todo = state.dispatcher.send(UpdateTodo { id, input }).await?;
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    AppPath(id): AppPath<TodoId>,
) -> Result<StatusCode, ApiError> {
    state.dispatcher.send(DeleteTodo { id }).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_all_todos(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.dispatcher.send(DeleteAllTodos).await?;
    Ok(StatusCode::NO_CONTENT)
}
