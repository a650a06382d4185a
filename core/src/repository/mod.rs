//! Storage contract for todos and the unit-of-work that scopes it.
//!
//! # Design
//! A `UnitOfWorkManager` opens one `UnitOfWork` per dispatched message.
//! Handlers only ever see the `TodoRepository` bound to that unit; the
//! dispatcher decides whether the unit is committed or rolled back.
//! Dropping a unit without committing discards its writes, so release is
//! guaranteed on every exit path.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::TodoError,
    types::{NewTodo, Todo, TodoId, TodoPatch, TodoSort},
};

mod memory;
mod sqlite;

pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use sqlite::{SqliteStore, SqliteUnitOfWork};

/// CRUD operations over the canonical todo collection.
#[async_trait]
pub trait TodoRepository: Send {
    /// Store a new todo under a freshly generated identifier.
    async fn add(&mut self, new: NewTodo) -> Result<Todo, TodoError>;

    async fn get_by_id(&mut self, id: TodoId) -> Result<Todo, TodoError>;

    async fn get_all(&mut self, sort: TodoSort) -> Result<Vec<Todo>, TodoError>;

    /// Apply a partial update; fields absent from `patch` keep their value.
    async fn update(&mut self, id: TodoId, patch: TodoPatch) -> Result<Todo, TodoError>;

    async fn delete(&mut self, id: TodoId) -> Result<(), TodoError>;

    /// Remove every todo. Succeeds on an empty collection.
    async fn clear(&mut self) -> Result<(), TodoError>;
}

/// A set of repository operations committed or discarded together.
#[async_trait]
pub trait UnitOfWork: Send {
    fn todos(&mut self) -> &mut dyn TodoRepository;

    async fn commit(self: Box<Self>) -> Result<(), TodoError>;

    async fn rollback(self: Box<Self>) -> Result<(), TodoError>;
}

/// Opens units of work against one backing store.
#[async_trait]
pub trait UnitOfWorkManager: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, TodoError>;
}

/// Which backing store to open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoreConfig {
    #[default]
    InMemory,
    Sqlite { database_url: String },
}

/// Open the configured store, creating the relational schema if needed.
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn UnitOfWorkManager>, TodoError> {
    match config {
        StoreConfig::InMemory => Ok(Arc::new(InMemoryStore::new())),
        StoreConfig::Sqlite { database_url } => {
            Ok(Arc::new(SqliteStore::connect(database_url).await?))
        }
    }
}
