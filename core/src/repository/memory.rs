//! Process-lifetime store backed by an ordered map.
//!
//! A unit holds the store lock for as long as it lives, so units run one
//! after another. Writes go to a copy-on-write snapshot that only replaces
//! the shared state on commit.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{TodoRepository, UnitOfWork, UnitOfWorkManager};
use crate::{
    error::TodoError,
    types::{NewTodo, Todo, TodoId, TodoPatch, TodoSort},
};

#[derive(Debug, Clone, Default)]
struct Snapshot {
    todos: BTreeMap<TodoId, Todo>,
    last_id: i64,
}

impl Snapshot {
    fn next_id(&mut self) -> TodoId {
        self.last_id += 1;
        TodoId::new(self.last_id)
    }
}

/// In-memory todo store. Clones share the same collection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<Snapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitOfWorkManager for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, TodoError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            staged: None,
        }))
    }
}

/// Unit of work over an `InMemoryStore`.
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Snapshot>,
    staged: Option<Snapshot>,
}

impl InMemoryUnitOfWork {
    fn current(&self) -> &Snapshot {
        self.staged.as_ref().unwrap_or(&*self.guard)
    }

    fn staged(&mut self) -> &mut Snapshot {
        let committed = &self.guard;
        self.staged.get_or_insert_with(|| Snapshot::clone(committed))
    }
}

#[async_trait]
impl TodoRepository for InMemoryUnitOfWork {
    async fn add(&mut self, new: NewTodo) -> Result<Todo, TodoError> {
        let snapshot = self.staged();
        let todo = new.into_todo(snapshot.next_id());
        snapshot.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn get_by_id(&mut self, id: TodoId) -> Result<Todo, TodoError> {
        self.current()
            .todos
            .get(&id)
            .cloned()
            .ok_or(TodoError::NotFound(id))
    }

    async fn get_all(&mut self, sort: TodoSort) -> Result<Vec<Todo>, TodoError> {
        let mut todos: Vec<Todo> = self.current().todos.values().cloned().collect();
        if sort == TodoSort::Order {
            todos.sort_by_key(|todo| (todo.order, todo.id));
        }
        Ok(todos)
    }

    async fn update(&mut self, id: TodoId, patch: TodoPatch) -> Result<Todo, TodoError> {
        if !self.current().todos.contains_key(&id) {
            return Err(TodoError::NotFound(id));
        }
        let todo = self
            .staged()
            .todos
            .get_mut(&id)
            .ok_or(TodoError::NotFound(id))?;
        todo.apply(patch);
        Ok(todo.clone())
    }

    async fn delete(&mut self, id: TodoId) -> Result<(), TodoError> {
        if !self.current().todos.contains_key(&id) {
            return Err(TodoError::NotFound(id));
        }
        self.staged().todos.remove(&id);
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), TodoError> {
        self.staged().todos.clear();
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    fn todos(&mut self) -> &mut dyn TodoRepository {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), TodoError> {
        let mut unit = *self;
        if let Some(staged) = unit.staged.take() {
            *unit.guard = staged;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), TodoError> {
        Ok(())
    }
}
