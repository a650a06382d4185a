//! Type-keyed dispatch of commands and queries to their handlers.
//!
//! # Design
//! Handlers are registered explicitly on a `DispatcherBuilder`, keyed by the
//! `TypeId` of the message they accept. `build` fails when a type was
//! registered twice or when a required type has no handler, so a bad
//! registry is caught at startup rather than on the first request.
//!
//! Each dispatched message gets its own unit of work. Commands commit it when
//! the handler succeeds and roll it back otherwise; queries always roll back.
//! Registered `DispatchStep`s run `before` in registration order and `after`
//! in reverse order around the whole unit.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::Instrument;
use uuid::Uuid;

use crate::{
    error::{RegistrationError, TodoError},
    handler::{Command, CommandHandler, Query, QueryHandler},
    repository::UnitOfWorkManager,
};

type ErasedHandler = Box<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Command,
    Query,
}

/// Describes one in-flight dispatch to the cross-cutting steps.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub kind: MessageKind,
    pub name: &'static str,
    /// Identifier of the unit of work, for correlating log lines.
    pub unit: Uuid,
    started: Instant,
}

impl Dispatch {
    fn new(kind: MessageKind, name: &'static str) -> Self {
        Self {
            kind,
            name,
            unit: Uuid::new_v4(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Cross-cutting behaviour wrapped around every dispatched message.
pub trait DispatchStep: Send + Sync {
    fn before(&self, _dispatch: &Dispatch, _message: &dyn Debug) {}

    fn after(&self, _dispatch: &Dispatch, _outcome: Result<(), &TodoError>) {}
}

/// Logs every message and its outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingStep;

impl DispatchStep for LoggingStep {
    fn before(&self, dispatch: &Dispatch, message: &dyn Debug) {
        tracing::debug!(kind = ?dispatch.kind, payload = ?message, "handling {}", dispatch.name);
    }

    fn after(&self, dispatch: &Dispatch, outcome: Result<(), &TodoError>) {
        match outcome {
            Ok(()) => tracing::info!(kind = ?dispatch.kind, "{} handled", dispatch.name),
            Err(error @ (TodoError::NotFound(_) | TodoError::Validation(_))) => {
                tracing::info!(kind = ?dispatch.kind, %error, "{} rejected", dispatch.name);
            }
            Err(error) => {
                tracing::error!(kind = ?dispatch.kind, %error, "{} failed", dispatch.name);
            }
        }
    }
}

/// Reports how long each message took, warning above a threshold.
#[derive(Debug, Clone, Copy)]
pub struct TimingStep {
    slow: Duration,
}

impl TimingStep {
    pub fn new(slow: Duration) -> Self {
        Self { slow }
    }
}

impl Default for TimingStep {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl DispatchStep for TimingStep {
    fn after(&self, dispatch: &Dispatch, _outcome: Result<(), &TodoError>) {
        let elapsed = dispatch.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        if elapsed > self.slow {
            tracing::warn!(elapsed_ms, "slow {}", dispatch.name);
        } else {
            tracing::debug!(elapsed_ms, "{} timing", dispatch.name);
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

struct Requirement {
    kind: MessageKind,
    type_id: TypeId,
    name: &'static str,
}

/// Collects handlers and steps, then validates the registry in `build`.
pub struct DispatcherBuilder {
    store: Arc<dyn UnitOfWorkManager>,
    commands: HashMap<TypeId, ErasedHandler>,
    queries: HashMap<TypeId, ErasedHandler>,
    steps: Vec<Arc<dyn DispatchStep>>,
    required: Vec<Requirement>,
    errors: Vec<RegistrationError>,
}

impl DispatcherBuilder {
    pub fn command<C, H>(mut self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        if self
            .commands
            .insert(TypeId::of::<C>(), Box::new(handler))
            .is_some()
        {
            self.errors.push(RegistrationError::Duplicate(C::NAME));
        }
        self
    }

    pub fn query<Q, H>(mut self, handler: H) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let handler: Arc<dyn QueryHandler<Q>> = Arc::new(handler);
        if self
            .queries
            .insert(TypeId::of::<Q>(), Box::new(handler))
            .is_some()
        {
            self.errors.push(RegistrationError::Duplicate(Q::NAME));
        }
        self
    }

    /// Fail `build` unless a handler for `C` has been registered.
    pub fn require_command<C: Command>(mut self) -> Self {
        self.required.push(Requirement {
            kind: MessageKind::Command,
            type_id: TypeId::of::<C>(),
            name: C::NAME,
        });
        self
    }

    /// Fail `build` unless a handler for `Q` has been registered.
    pub fn require_query<Q: Query>(mut self) -> Self {
        self.required.push(Requirement {
            kind: MessageKind::Query,
            type_id: TypeId::of::<Q>(),
            name: Q::NAME,
        });
        self
    }

    pub fn step(mut self, step: impl DispatchStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn build(self) -> Result<Dispatcher, RegistrationError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }
        for requirement in &self.required {
            let registry = match requirement.kind {
                MessageKind::Command => &self.commands,
                MessageKind::Query => &self.queries,
            };
            if !registry.contains_key(&requirement.type_id) {
                return Err(RegistrationError::Missing(requirement.name));
            }
        }
        Ok(Dispatcher {
            store: self.store,
            commands: self.commands,
            queries: self.queries,
            steps: self.steps,
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes commands and queries to their single registered handler.
pub struct Dispatcher {
    store: Arc<dyn UnitOfWorkManager>,
    commands: HashMap<TypeId, ErasedHandler>,
    queries: HashMap<TypeId, ErasedHandler>,
    steps: Vec<Arc<dyn DispatchStep>>,
}

impl Dispatcher {
    pub fn builder(store: Arc<dyn UnitOfWorkManager>) -> DispatcherBuilder {
        DispatcherBuilder {
            store,
            commands: HashMap::new(),
            queries: HashMap::new(),
            steps: Vec::new(),
            required: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Handle `command` in a fresh unit of work, committing on success.
    pub async fn send<C: Command>(&self, command: C) -> Result<C::Output, TodoError> {
        let handler = self
            .commands
            .get(&TypeId::of::<C>())
            .and_then(|handler| handler.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .ok_or(TodoError::Unregistered(C::NAME))?;

        let dispatch = Dispatch::new(MessageKind::Command, C::NAME);
        let span = tracing::info_span!("command", name = C::NAME, unit = %dispatch.unit);
        self.before(&dispatch, &command);
        let result: Result<C::Output, TodoError> = async {
            let mut unit = self.store.begin().await?;
            match handler.handle(unit.todos(), command).await {
                Ok(output) => {
                    unit.commit().await?;
                    Ok(output)
                }
                Err(error) => {
                    if let Err(rollback) = unit.rollback().await {
                        tracing::error!(error = %rollback, "rollback failed");
                    }
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await;
        self.after(&dispatch, result.as_ref().map(|_| ()));
        result
    }

    /// Handle `query` in a read-only unit of work that is always released
    /// without committing.
    pub async fn fetch<Q: Query>(&self, query: Q) -> Result<Q::Output, TodoError> {
        let handler = self
            .queries
            .get(&TypeId::of::<Q>())
            .and_then(|handler| handler.downcast_ref::<Arc<dyn QueryHandler<Q>>>())
            .ok_or(TodoError::Unregistered(Q::NAME))?;

        let dispatch = Dispatch::new(MessageKind::Query, Q::NAME);
        let span = tracing::info_span!("query", name = Q::NAME, unit = %dispatch.unit);
        self.before(&dispatch, &query);
        let result: Result<Q::Output, TodoError> = async {
            let mut unit = self.store.begin().await?;
            let result = handler.handle(unit.todos(), query).await;
            if let Err(rollback) = unit.rollback().await {
                tracing::warn!(error = %rollback, "releasing read unit failed");
            }
            result
        }
        .instrument(span)
        .await;
        self.after(&dispatch, result.as_ref().map(|_| ()));
        result
    }

    fn before(&self, dispatch: &Dispatch, message: &dyn Debug) {
        for step in &self.steps {
            step.before(dispatch, message);
        }
    }

    fn after(&self, dispatch: &Dispatch, outcome: Result<(), &TodoError>) {
        for step in self.steps.iter().rev() {
            step.after(dispatch, outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::repository::{InMemoryStore, TodoRepository};
    use crate::types::{TodoInput, TodoSort};

    #[derive(Debug)]
    struct Ping;

    impl Command for Ping {
        const NAME: &'static str = "Ping";
        type Output = usize;
    }

    #[derive(Debug)]
    struct Count;

    impl Query for Count {
        const NAME: &'static str = "Count";
        type Output = usize;
    }

    /// Adds a todo, then fails when `fail` is set.
    struct AddThen {
        fail: bool,
    }

    #[async_trait]
    impl CommandHandler<Ping> for AddThen {
        async fn handle(&self, todos: &mut dyn TodoRepository, _: Ping) -> Result<usize, TodoError> {
            let new = TodoInput::titled("ping").validate()?.into_new();
            todos.add(new).await?;
            if self.fail {
                return Err(TodoError::Storage("boom".to_string()));
            }
            Ok(todos.get_all(TodoSort::Id).await?.len())
        }
    }

    struct Counter;

    #[async_trait]
    impl QueryHandler<Count> for Counter {
        async fn handle(&self, todos: &mut dyn TodoRepository, _: Count) -> Result<usize, TodoError> {
            Ok(todos.get_all(TodoSort::Id).await?.len())
        }
    }

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl DispatchStep for Recorder {
        fn before(&self, dispatch: &Dispatch, _message: &dyn Debug) {
            self.log
                .lock()
                .unwrap()
                .push(format!("before {} {}", self.label, dispatch.name));
        }

        fn after(&self, dispatch: &Dispatch, outcome: Result<(), &TodoError>) {
            self.log.lock().unwrap().push(format!(
                "after {} {} ok={}",
                self.label,
                dispatch.name,
                outcome.is_ok()
            ));
        }
    }

    fn store() -> Arc<dyn UnitOfWorkManager> {
        Arc::new(InMemoryStore::new())
    }

    #[test]
    fn duplicate_registration_fails_to_build() {
        let result = Dispatcher::builder(store())
            .command::<Ping, _>(AddThen { fail: false })
            .command::<Ping, _>(AddThen { fail: true })
            .build();
        assert_eq!(result.err(), Some(RegistrationError::Duplicate("Ping")));
    }

    #[test]
    fn missing_required_handler_fails_to_build() {
        let result = Dispatcher::builder(store())
            .command::<Ping, _>(AddThen { fail: false })
            .require_command::<Ping>()
            .require_query::<Count>()
            .build();
        assert_eq!(result.err(), Some(RegistrationError::Missing("Count")));
    }

    #[tokio::test]
    async fn unregistered_message_is_an_error() {
        let dispatcher = Dispatcher::builder(store()).build().unwrap();
        let err = dispatcher.fetch(Count).await.unwrap_err();
        assert!(matches!(err, TodoError::Unregistered("Count")));
    }

    #[tokio::test]
    async fn successful_command_commits() {
        let dispatcher = Dispatcher::builder(store())
            .command::<Ping, _>(AddThen { fail: false })
            .query::<Count, _>(Counter)
            .build()
            .unwrap();

        assert_eq!(dispatcher.send(Ping).await.unwrap(), 1);
        assert_eq!(dispatcher.send(Ping).await.unwrap(), 2);
        assert_eq!(dispatcher.fetch(Count).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn failed_command_rolls_back() {
        let dispatcher = Dispatcher::builder(store())
            .command::<Ping, _>(AddThen { fail: true })
            .query::<Count, _>(Counter)
            .build()
            .unwrap();

        let err = dispatcher.send(Ping).await.unwrap_err();
        assert!(matches!(err, TodoError::Storage(_)));
        assert_eq!(dispatcher.fetch(Count).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn steps_wrap_dispatch_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::builder(store())
            .step(Recorder {
                label: "outer",
                log: Arc::clone(&log),
            })
            .step(Recorder {
                label: "inner",
                log: Arc::clone(&log),
            })
            .query::<Count, _>(Counter)
            .build()
            .unwrap();

        dispatcher.fetch(Count).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            [
                "before outer Count",
                "before inner Count",
                "after inner Count ok=true",
                "after outer Count ok=true",
            ]
        );
    }
}
