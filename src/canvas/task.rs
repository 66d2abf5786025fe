use crate::broker::{Broker, Connection};
use crate::canvas::{publish, Signature, TaskArgs};
use crate::error::CeleryError;
use crate::messaging::{format_eta, Callback, FollowUp, TaskFields, TaskId, TaskMessage};
use crate::result::AsyncResult;
use chrono::{DateTime, FixedOffset, TimeZone};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A single named unit of work, optionally followed by callbacks the workers run after it.
pub struct Task<B = Connection> {
    id: TaskId,
    name: String,
    args: Vec<Value>,
    kwargs: Map<String, Value>,
    immutable: bool,
    eta: Option<DateTime<FixedOffset>>,
    /// Run in order after this task. Each entry's own list is always empty.
    callbacks: Vec<Task<B>>,
    pub(crate) taskset: Option<TaskId>,
    result: AsyncResult<B>,
}

impl<B> Task<B> {
    /// Create a task with a fresh ID, bound to a result on the same broker.
    pub fn new<N, A>(broker: Arc<B>, name: N, args: A) -> Self
    where
        N: Into<String>,
        A: Into<TaskArgs>,
    {
        let name = name.into();
        let TaskArgs { args, kwargs } = args.into();
        let id = TaskId::generate();
        let result = AsyncResult::new(broker, id, name.clone(), args.clone());

        Self {
            id,
            name,
            args,
            kwargs,
            immutable: true,
            eta: None,
            callbacks: Vec::new(),
            taskset: None,
            result,
        }
    }

    /// Postpone execution until `eta`.
    pub fn with_eta<Tz: TimeZone>(mut self, eta: DateTime<Tz>) -> Self {
        self.eta = Some(eta.fixed_offset());
        self
    }

    /// Postpone execution until an RFC 3339 timestamp.
    ///
    /// # Errors
    ///
    /// [`CeleryError::Validation`] if `eta` isn't a valid RFC 3339 timestamp.
    ///
    pub fn with_eta_str(self, eta: &str) -> Result<Self, CeleryError> {
        let eta = DateTime::parse_from_rfc3339(eta)
            .map_err(|e| CeleryError::Validation(format!("eta {eta:?} is not a date-time: {e}")))?;
        Ok(self.with_eta(eta))
    }

    /// Run `next` after this task and after every callback already linked. Callbacks of `next` follow it.
    pub fn link(mut self, mut next: Task<B>) -> Self {
        let rest = std::mem::take(&mut next.callbacks);
        self.callbacks.push(next);
        self.callbacks.extend(rest);
        self
    }

    /// Callbacks in the order the workers will run them.
    pub fn callbacks(&self) -> impl Iterator<Item = &Task<B>> {
        self.callbacks.iter()
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    /// Whether callbacks are kept from receiving this task's result as an extra argument. Always true.
    pub fn immutable(&self) -> bool {
        self.immutable
    }

    pub fn eta(&self) -> Option<&DateTime<FixedOffset>> {
        self.eta.as_ref()
    }

    pub fn taskset(&self) -> Option<TaskId> {
        self.taskset
    }

    pub fn result(&self) -> &AsyncResult<B> {
        &self.result
    }

    pub(crate) fn fields(&self) -> TaskFields {
        TaskFields {
            task: self.name.clone(),
            args: self.args.clone(),
            kwargs: self.kwargs.clone(),
            immutable: self.immutable,
            taskset: self.taskset,
            eta: self.eta.as_ref().map(format_eta),
        }
    }

    /// The one descriptor pushed for this task, carrying its callbacks nested inside.
    pub fn message(&self) -> TaskMessage {
        let callbacks: Vec<_> = self.callbacks().map(|task| (task.id, task.fields())).collect();
        TaskMessage {
            fields: self.fields(),
            id: self.id,
            follow_up: FollowUp::Callbacks(Callback::nest(callbacks)),
        }
    }
}

impl<B> std::fmt::Debug for Task<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .field("eta", &self.eta)
            .field("taskset", &self.taskset)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl<B: Broker> Signature for Task<B> {
    type Result = AsyncResult<B>;

    async fn apply_async(&self, routing_key: &str) -> Result<Self::Result, CeleryError> {
        publish(self.result.broker().as_ref(), routing_key, &self.message()).await?;
        Ok(self.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;
    use crate::messaging::Envelope;
    use chrono::Utc;
    use serde_json::json;

    fn task(broker: &Arc<MemoryBroker>, name: &str) -> Task<MemoryBroker> {
        Task::new(broker.clone(), name, TaskArgs::new().arg(1).kwarg("k", "v"))
    }

    #[test]
    fn result_is_bound_to_task_id() {
        let broker = Arc::new(MemoryBroker::new());
        let task = task(&broker, "a");
        assert_eq!(task.result().id(), task.id());
        assert_eq!(task.result().task_name(), "a");
        assert!(task.immutable());
    }

    #[test]
    fn message_without_callbacks() -> Result<(), anyhow::Error> {
        let broker = Arc::new(MemoryBroker::new());
        let task = task(&broker, "a");
        let value = serde_json::to_value(task.message())?;

        assert_eq!(value["id"], task.id().to_string());
        assert_eq!(value["args"], json!([1]));
        assert_eq!(value["kwargs"], json!({"k": "v"}));
        assert_eq!(value["callbacks"], Value::Null);
        assert_eq!(value["eta"], Value::Null);
        Ok(())
    }

    #[test]
    fn empty_kwargs_serialize_as_object() -> Result<(), anyhow::Error> {
        let broker = Arc::new(MemoryBroker::new());
        let task = Task::new(broker, "a", vec![json!(1)]);
        let value = serde_json::to_value(task.message())?;
        assert_eq!(value["kwargs"], json!({}));
        Ok(())
    }

    #[test]
    fn linked_callbacks_keep_order() -> Result<(), anyhow::Error> {
        let broker = Arc::new(MemoryBroker::new());
        let (b, c) = (task(&broker, "b"), task(&broker, "c"));
        let (b_id, c_id) = (b.id(), c.id());
        let a = task(&broker, "a").link(b).link(c);

        assert_eq!(a.callbacks().map(Task::id).collect::<Vec<_>>(), vec![b_id, c_id]);

        let value = serde_json::to_value(a.message())?;
        assert_eq!(value["callbacks"][0]["options"]["task_id"], b_id.to_string());
        assert_eq!(value["callbacks"][0]["options"]["link"][0]["options"]["task_id"], c_id.to_string());
        Ok(())
    }

    #[test]
    fn linking_a_task_with_callbacks_keeps_them_behind_it() {
        let broker = Arc::new(MemoryBroker::new());
        let (b, c, d) = (task(&broker, "b"), task(&broker, "c"), task(&broker, "d"));
        let ids = vec![b.id(), c.id(), d.id()];
        let a = task(&broker, "a").link(b.link(c)).link(d);

        assert_eq!(a.callbacks().map(Task::id).collect::<Vec<_>>(), ids);
        assert!(a.callbacks().all(|t| t.callbacks().next().is_none()));
    }

    #[test]
    fn long_callback_sequences_stay_flat() {
        let broker = Arc::new(MemoryBroker::new());
        let head = (0..20_000).fold(task(&broker, "head"), |head, i| head.link(task(&broker, &format!("t{i}"))));
        assert_eq!(head.callbacks().count(), 20_000);
        assert_eq!(head.callbacks().last().map(Task::name), Some("t19999"));
    }

    #[test]
    fn eta_is_serialized_as_rfc3339() -> Result<(), anyhow::Error> {
        let broker = Arc::new(MemoryBroker::new());
        let eta = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).single().ok_or_else(|| anyhow::anyhow!("bad date"))?;
        let task = task(&broker, "a").with_eta(eta);
        let value = serde_json::to_value(task.message())?;
        assert_eq!(value["eta"], "2030-01-02T03:04:05+00:00");
        Ok(())
    }

    #[test]
    fn invalid_eta_is_rejected() {
        let broker = Arc::new(MemoryBroker::new());
        let result = task(&broker, "a").with_eta_str("tomorrow-ish");
        assert!(matches!(result, Err(CeleryError::Validation(_))));
    }

    #[tokio::test]
    async fn apply_async_pushes_one_envelope() -> Result<(), anyhow::Error> {
        let broker = Arc::new(MemoryBroker::new());
        let task = task(&broker, "a");
        let result = task.apply_async("default").await?;

        assert_eq!(result.id(), task.id());
        let pushed = broker.list("default").await;
        assert_eq!(pushed.len(), 1);

        let envelope: Envelope = serde_json::from_slice(&pushed[0])?;
        assert_eq!(envelope.properties.delivery_tag, task.id());
        let body: Value = envelope.decode_body()?;
        assert_eq!(body["task"], "a");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_push_is_a_submission_error() {
        let broker = Arc::new(MemoryBroker::new());
        broker.reject_pushes(true).await;
        let result = task(&broker, "a").apply_async("default").await;
        assert!(matches!(result, Err(CeleryError::Submission(_))));
    }
}
