use crate::broker::{Broker, Connection};
use crate::canvas::{publish, Signature, Task};
use crate::error::CeleryError;
use crate::messaging::{
    taskset_key, ChordFinalizer, ChordOptions, FollowUp, TaskId, TaskMessage, TasksetRecord, TASKSET_TTL_SECS,
};
use crate::result::{AsyncResult, GroupResult};
use log::debug;

/// A group of tasks plus a finalizer that runs once every member has finished.
///
/// The finalizer is never pushed by the producer. Each member carries the finalizer and the group size, and whichever
/// worker completes the last member runs it.
///
#[derive(Debug)]
pub struct Chord<B = Connection> {
    group_id: TaskId,
    tasks: Vec<Task<B>>,
    finalizer: Task<B>,
    parents: GroupResult<B>,
}

impl<B> Chord<B> {
    /// # Errors
    ///
    /// [`CeleryError::Validation`] when there are no member tasks.
    ///
    pub fn new(tasks: Vec<Task<B>>, finalizer: Task<B>) -> Result<Self, CeleryError> {
        if tasks.is_empty() {
            return Err(CeleryError::Validation("a chord needs at least one member task".to_owned()));
        }

        let group_id = TaskId::generate();
        let tasks: Vec<_> = tasks
            .into_iter()
            .map(|mut task| {
                task.taskset = Some(group_id);
                task
            })
            .collect();
        let parents = GroupResult::new(tasks.iter().map(|task| task.result().clone()).collect());

        Ok(Self { group_id, tasks, finalizer, parents })
    }

    /// ID of the taskset registered for the members.
    pub fn group_id(&self) -> TaskId {
        self.group_id
    }

    pub fn tasks(&self) -> &[Task<B>] {
        &self.tasks
    }

    pub fn finalizer(&self) -> &Task<B> {
        &self.finalizer
    }

    /// Result of the finalizer.
    pub fn result(&self) -> &AsyncResult<B> {
        self.finalizer.result()
    }

    /// Results of the member tasks.
    pub fn parents(&self) -> &GroupResult<B> {
        &self.parents
    }

    /// The taskset record registered before any member is pushed.
    pub fn taskset(&self) -> TasksetRecord {
        TasksetRecord::new(self.group_id, self.tasks.iter().map(Task::id))
    }

    /// One descriptor per member, each pointing at the finalizer.
    pub fn messages(&self) -> Vec<TaskMessage> {
        let finalizer = ChordFinalizer {
            fields: self.finalizer.fields(),
            options: ChordOptions { task_id: self.finalizer.id() },
            chord_size: self.tasks.len(),
        };

        self.tasks
            .iter()
            .map(|task| TaskMessage {
                fields: task.fields(),
                id: task.id(),
                follow_up: FollowUp::Chord(finalizer.clone()),
            })
            .collect()
    }
}

impl<B: Broker> Signature for Chord<B> {
    type Result = AsyncResult<B>;

    async fn apply_async(&self, routing_key: &str) -> Result<Self::Result, CeleryError> {
        let broker = self.finalizer.result().broker().as_ref();

        let key = taskset_key(&self.group_id);
        let record = serde_json::to_vec(&self.taskset())?;
        debug!(group_id = self.group_id, size = self.tasks.len(); "Registering chord taskset");
        let reply = broker.setex(&key, TASKSET_TTL_SECS, &record).await?;
        if !reply.is_ack() {
            return Err(CeleryError::Submission(format!("taskset {}", self.group_id)));
        }

        for message in self.messages() {
            publish(broker, routing_key, &message).await?;
        }
        Ok(self.result().clone())
    }
}
