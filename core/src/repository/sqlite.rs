//! SQLite store using `sqlx`. Each unit of work is one transaction.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE todos (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     title TEXT NOT NULL,
//!     completed BOOLEAN NOT NULL DEFAULT FALSE,
//!     sort_order INTEGER NOT NULL DEFAULT 0
//! );
//! ```
//!
//! `AUTOINCREMENT` keeps identifiers unique even after the table is
//! cleared.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool, Transaction,
};

use super::{TodoRepository, UnitOfWork, UnitOfWorkManager};
use crate::{
    error::TodoError,
    types::{NewTodo, Todo, TodoId, TodoPatch, TodoSort},
};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    completed BOOLEAN NOT NULL DEFAULT FALSE,
    sort_order INTEGER NOT NULL DEFAULT 0
)";

const COLUMNS: &str = "id, title, completed, sort_order";

#[derive(Debug, sqlx::FromRow)]
struct TodoRow {
    id: i64,
    title: String,
    completed: bool,
    sort_order: i64,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Todo {
            id: TodoId::new(row.id),
            title: row.title,
            completed: row.completed,
            order: row.sort_order,
        }
    }
}

/// Pooled SQLite store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url` and create the `todos` table if absent.
    ///
    /// An in-memory database lives only as long as its connection, so it
    /// gets a single connection that is never recycled.
    pub async fn connect(database_url: &str) -> Result<Self, TodoError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        tracing::info!(database_url, "sqlite store ready");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), TodoError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWorkManager for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, TodoError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteUnitOfWork { tx }))
    }
}

/// Unit of work wrapping one SQLite transaction. Dropping it rolls back.
pub struct SqliteUnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl TodoRepository for SqliteUnitOfWork {
    async fn add(&mut self, new: NewTodo) -> Result<Todo, TodoError> {
        let row: TodoRow = sqlx::query_as(&format!(
            "INSERT INTO todos (title, completed, sort_order) VALUES (?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(new.title)
        .bind(new.completed)
        .bind(new.order)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn get_by_id(&mut self, id: TodoId) -> Result<Todo, TodoError> {
        let row: Option<TodoRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM todos WHERE id = ?"))
                .bind(id.get())
                .fetch_optional(&mut *self.tx)
                .await?;
        row.map(Todo::from).ok_or(TodoError::NotFound(id))
    }

    async fn get_all(&mut self, sort: TodoSort) -> Result<Vec<Todo>, TodoError> {
        let order_by = match sort {
            TodoSort::Id => "id",
            TodoSort::Order => "sort_order, id",
        };
        let rows: Vec<TodoRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM todos ORDER BY {order_by}"))
                .fetch_all(&mut *self.tx)
                .await?;
        Ok(rows.into_iter().map(Todo::from).collect())
    }

    async fn update(&mut self, id: TodoId, patch: TodoPatch) -> Result<Todo, TodoError> {
        let row: Option<TodoRow> = sqlx::query_as(&format!(
            "UPDATE todos SET \
                title = COALESCE(?, title), \
                completed = COALESCE(?, completed), \
                sort_order = COALESCE(?, sort_order) \
             WHERE id = ? RETURNING {COLUMNS}"
        ))
        .bind(patch.title)
        .bind(patch.completed)
        .bind(patch.order)
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Todo::from).ok_or(TodoError::NotFound(id))
    }

    async fn delete(&mut self, id: TodoId) -> Result<(), TodoError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TodoError::NotFound(id));
        }
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), TodoError> {
        sqlx::query("DELETE FROM todos").execute(&mut *self.tx).await?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    fn todos(&mut self) -> &mut dyn TodoRepository {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), TodoError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), TodoError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
