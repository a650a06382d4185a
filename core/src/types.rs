//! Todo domain model, inbound payloads and the outbound resource shape.
//!
//! # Design
//! `Todo` is what the repository stores. `TodoResource` is what clients see:
//! the same fields plus a `url` derived from the identifier, with the
//! identifier rendered as a string. Inbound bodies deserialize into
//! `TodoInput`, whose fields are tri-state (`Field`) so that an explicit
//! `null` can be rejected while an absent field means "keep" or "default".

use std::fmt;

use serde::{
    de::{IgnoredAny, MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};

use crate::error::TodoError;

/// Store-generated identifier of a todo. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored todo item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub completed: bool,
    pub order: i64,
}

impl Todo {
    /// Overwrite the fields present in `patch`; the identifier never changes.
    pub fn apply(&mut self, patch: TodoPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
    }
}

/// Field values for a todo that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub completed: bool,
    pub order: i64,
}

impl NewTodo {
    pub fn into_todo(self, id: TodoId) -> Todo {
        Todo {
            id,
            title: self.title,
            completed: self.completed,
            order: self.order,
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound payloads
// ---------------------------------------------------------------------------

/// A JSON field that may be absent, explicitly `null`, or carry a value.
///
/// The containing type starts every field at `Missing`; a `null` in the
/// body deserializes to `Null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<T> {
    #[default]
    Missing,
    Null,
    Value(T),
}

impl<T> Field<T> {
    fn into_option(self, name: &str) -> Result<Option<T>, TodoError> {
        match self {
            Field::Missing => Ok(None),
            Field::Null => Err(TodoError::validation(format!("`{name}` must not be null"))),
            Field::Value(value) => Ok(Some(value)),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Field::Null, Field::Value))
    }
}

/// Request body for creating or updating a todo. Unknown fields such as
/// `id` or `url` echoed back by clients are ignored.
///
/// Only a JSON object is accepted; arrays and scalars are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoInput {
    pub title: Field<String>,
    pub completed: Field<bool>,
    pub order: Field<i64>,
}

impl<'de> Deserialize<'de> for TodoInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TodoInputVisitor)
    }
}

struct TodoInputVisitor;

impl<'de> Visitor<'de> for TodoInputVisitor {
    type Value = TodoInput;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a todo object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<TodoInput, A::Error> {
        let mut input = TodoInput::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "title" => input.title = map.next_value()?,
                "completed" => input.completed = map.next_value()?,
                "order" => input.order = map.next_value()?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(input)
    }
}

impl TodoInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Field::Value(title.into()),
            ..Self::default()
        }
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Field::Value(completed);
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Field::Value(order);
        self
    }

    /// Reject explicit nulls; absent fields become `None`.
    pub fn validate(self) -> Result<TodoPatch, TodoError> {
        Ok(TodoPatch {
            title: self.title.into_option("title")?,
            completed: self.completed.into_option("completed")?,
            order: self.order.into_option("order")?,
        })
    }
}

/// Validated partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub order: Option<i64>,
}

impl TodoPatch {
    pub fn into_new(self) -> NewTodo {
        NewTodo {
            title: self.title.unwrap_or_default(),
            completed: self.completed.unwrap_or(false),
            order: self.order.unwrap_or(0),
        }
    }
}

/// Ordering requested for a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoSort {
    /// Ascending identifier, i.e. creation order.
    #[default]
    Id,
    /// Ascending `order` field, ties broken by identifier.
    Order,
}

// ---------------------------------------------------------------------------
// Outbound resource
// ---------------------------------------------------------------------------

/// A todo as returned to API clients. Every field is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoResource {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub order: i64,
    pub url: String,
}

/// Builds hyperlinks for todos relative to the public base URL.
#[derive(Debug, Clone)]
pub struct TodoLinks {
    base_url: String,
}

impl TodoLinks {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, id: TodoId) -> String {
        format!("{}/todos/{id}", self.base_url)
    }

    pub fn resource(&self, todo: Todo) -> TodoResource {
        TodoResource {
            id: todo.id.to_string(),
            url: self.url(todo.id),
            title: todo.title,
            completed: todo.completed,
            order: todo.order,
        }
    }
}
