use crate::broker::{Broker, Connection};
use crate::canvas::{Signature, Task};
use crate::error::CeleryError;
use crate::result::GroupResult;

/// Independent tasks submitted together and run concurrently by the workers.
#[derive(Debug)]
pub struct Group<B = Connection> {
    tasks: Vec<Task<B>>,
    result: GroupResult<B>,
}

impl<B> Group<B> {
    /// # Errors
    ///
    /// [`CeleryError::Validation`] for an empty group.
    ///
    pub fn new(tasks: Vec<Task<B>>) -> Result<Self, CeleryError> {
        if tasks.is_empty() {
            return Err(CeleryError::Validation("a group needs at least one task".to_owned()));
        }
        let result = GroupResult::new(tasks.iter().map(|task| task.result().clone()).collect());
        Ok(Self { tasks, result })
    }

    pub fn tasks(&self) -> &[Task<B>] {
        &self.tasks
    }

    pub fn result(&self) -> &GroupResult<B> {
        &self.result
    }
}

impl<B: Broker> Signature for Group<B> {
    type Result = GroupResult<B>;

    /// Each member is submitted on its own; there is no combined message.
    async fn apply_async(&self, routing_key: &str) -> Result<Self::Result, CeleryError> {
        for task in &self.tasks {
            task.apply_async(routing_key).await?;
        }
        Ok(self.result.clone())
    }
}
