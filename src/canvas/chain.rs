use crate::broker::{Broker, Connection};
use crate::canvas::{publish, Signature, Task};
use crate::error::CeleryError;
use crate::messaging::TaskMessage;
use crate::result::{AsyncResult, GroupResult};

/// Tasks run strictly one after another.
///
/// Only the first task is pushed; the rest ride along as nested callbacks, so the workers themselves move from one task
/// to the next.
///
#[derive(Debug)]
pub struct Chain<B = Connection> {
    head: Task<B>,
    result: AsyncResult<B>,
    parents: GroupResult<B>,
}

impl<B> Chain<B> {
    /// # Errors
    ///
    /// [`CeleryError::Validation`] for an empty chain.
    ///
    pub fn new(tasks: Vec<Task<B>>) -> Result<Self, CeleryError> {
        let mut tasks = tasks.into_iter();
        let head = tasks
            .next()
            .ok_or_else(|| CeleryError::Validation("a chain needs at least one task".to_owned()))?;
        let head = tasks.fold(head, Task::link);

        let result = head.callbacks().last().unwrap_or(&head).result().clone();
        let earlier = head.callbacks().count();
        let parents = std::iter::once(&head).chain(head.callbacks()).take(earlier).map(|t| t.result().clone());
        let parents = GroupResult::new(parents.collect());

        Ok(Self { head, result, parents })
    }

    /// The first task, with every later task linked behind it.
    pub fn head(&self) -> &Task<B> {
        &self.head
    }

    /// Result of the last task in the chain.
    pub fn result(&self) -> &AsyncResult<B> {
        &self.result
    }

    /// Results of every task but the last.
    pub fn parents(&self) -> &GroupResult<B> {
        &self.parents
    }

    pub fn message(&self) -> TaskMessage {
        self.head.message()
    }
}

impl<B: Broker> Signature for Chain<B> {
    type Result = AsyncResult<B>;

    async fn apply_async(&self, routing_key: &str) -> Result<Self::Result, CeleryError> {
        publish(self.result.broker().as_ref(), routing_key, &self.message()).await?;
        Ok(self.result.clone())
    }
}
