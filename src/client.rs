use crate::broker::{Broker, Connection};
use crate::canvas::{Chain, Chord, Group, Signature, Task, TaskArgs};
use crate::error::CeleryError;
use crate::messaging::TaskId;
use crate::options::ClientOptions;
use crate::result::AsyncResult;
use chrono::{DateTime, TimeZone};
use std::sync::Arc;

/// Queue used when no routing key is given.
pub const DEFAULT_ROUTING_KEY: &str = "default";

/// Entry point for submitting tasks: builds task graphs that all share one broker.
#[derive(Debug)]
pub struct Celery<B = Connection> {
    broker: Arc<B>,
}

impl<B> Clone for Celery<B> {
    fn clone(&self) -> Self {
        Self { broker: self.broker.clone() }
    }
}

impl Celery<Connection> {
    /// A client for the broker described by `options`. Nothing is opened until the first command or [`Celery::connect`].
    pub fn new(options: ClientOptions) -> Self {
        Self::with_broker(Connection::new(options))
    }

    /// Open the broker connection now, or replace one broken by an earlier failure.
    pub async fn connect(&self) -> Result<(), CeleryError> {
        self.broker.connect().await
    }

    /// Whether the broker connection is open.
    pub async fn is_connected(&self) -> bool {
        self.broker.is_connected().await
    }
}

impl<B> Celery<B> {
    pub fn with_broker(broker: B) -> Self {
        Self { broker: Arc::new(broker) }
    }

    pub fn broker(&self) -> &Arc<B> {
        &self.broker
    }

    pub fn task<N, A>(&self, name: N, args: A) -> Task<B>
    where
        N: Into<String>,
        A: Into<TaskArgs>,
    {
        Task::new(self.broker.clone(), name, args)
    }

    pub fn group(&self, tasks: Vec<Task<B>>) -> Result<Group<B>, CeleryError> {
        Group::new(tasks)
    }

    pub fn chain(&self, tasks: Vec<Task<B>>) -> Result<Chain<B>, CeleryError> {
        Chain::new(tasks)
    }

    pub fn chord(&self, tasks: Vec<Task<B>>, finalizer: Task<B>) -> Result<Chord<B>, CeleryError> {
        Chord::new(tasks, finalizer)
    }

    /// Handle on the result of a task submitted elsewhere, e.g. by an earlier process.
    pub fn async_result(&self, task_id: TaskId) -> AsyncResult<B> {
        AsyncResult::new(self.broker.clone(), task_id, task_id.to_string(), Vec::new())
    }
}

impl<B: Broker> Celery<B> {
    /// Build a task and submit it in one step.
    pub async fn post_task<N, A, Tz>(
        &self,
        name: N,
        args: A,
        routing_key: &str,
        eta: Option<DateTime<Tz>>,
    ) -> Result<AsyncResult<B>, CeleryError>
    where
        N: Into<String>,
        A: Into<TaskArgs>,
        Tz: TimeZone,
    {
        let mut task = self.task(name, args);
        if let Some(eta) = eta {
            task = task.with_eta(eta);
        }
        task.apply_async(routing_key).await
    }
}
