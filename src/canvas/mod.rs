//!
//! Task graphs: single tasks, groups, chains, and chords.
//!
//! Every node turns into one or more task descriptors pushed onto a queue. Only the producer side lives here; workers
//! run the tasks, follow callback links, and trigger chord finalizers on their own.
//!

mod args;
mod chain;
mod chord;
mod group;
mod task;

pub use args::*;
pub use chain::*;
pub use chord::*;
pub use group::*;
pub use task::*;

use crate::broker::Broker;
use crate::error::CeleryError;
use crate::messaging::{Envelope, TaskMessage};
use log::debug;
use std::future::Future;

/// A node of a task graph that can be submitted.
pub trait Signature {
    /// Handle on the outcome of the node.
    type Result;

    /// Push the node onto the queue named `routing_key`.
    ///
    /// # Returns
    ///
    /// The node's result handle.
    ///
    fn apply_async(&self, routing_key: &str) -> impl Future<Output = Result<Self::Result, CeleryError>> + Send;
}

/// Wrap one descriptor and push it, failing unless the store acknowledges the push.
pub(crate) async fn publish<B: Broker>(
    broker: &B,
    routing_key: &str,
    message: &TaskMessage,
) -> Result<(), CeleryError> {
    let envelope = Envelope::wrap(message, routing_key)?;
    debug!(task_id = message.id, task = message.fields.task.as_str(), routing_key; "Pushing task");

    let reply = broker.lpush(routing_key, envelope.to_json()?.as_bytes()).await?;
    if !reply.is_ack() {
        return Err(CeleryError::Submission(format!("task {}", message.fields.task)));
    }
    Ok(())
}
