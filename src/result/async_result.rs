use crate::broker::{Broker, Connection};
use crate::error::CeleryError;
use crate::messaging::{task_meta_key, TaskId};
use crate::result::{RawTaskMeta, TaskMeta, TaskStatus};
use log::{debug, trace, warn};
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::Instant;

/// Handle on one task's outcome in the result store.
///
/// Reads go to the store until the task reaches a terminal state; from then on the outcome is cached and the store is
/// never asked again. Clones share the cache.
///
pub struct AsyncResult<B = Connection> {
    inner: Arc<Inner<B>>,
}

struct Inner<B> {
    broker: Arc<B>,
    task_id: TaskId,
    task_name: String,
    task_args: Vec<Value>,
    body: OnceLock<TaskMeta>,
}

impl<B> Clone for AsyncResult<B> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<B> Debug for AsyncResult<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncResult")
            .field("task_id", &self.inner.task_id)
            .field("task_name", &self.inner.task_name)
            .field("body", &self.inner.body.get())
            .finish()
    }
}

impl<B> AsyncResult<B> {
    /// Bind a result to a task. `task_name` and `task_args` are only used to describe the task in errors.
    pub fn new<N: Into<String>>(broker: Arc<B>, task_id: TaskId, task_name: N, task_args: Vec<Value>) -> Self {
        let inner = Inner {
            broker,
            task_id,
            task_name: task_name.into(),
            task_args,
            body: OnceLock::new(),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn id(&self) -> TaskId {
        self.inner.task_id
    }

    pub fn task_name(&self) -> &str {
        &self.inner.task_name
    }

    pub fn broker(&self) -> &Arc<B> {
        &self.inner.broker
    }

    /// The cached outcome, if the task was already seen finished.
    pub fn cached(&self) -> Option<&TaskMeta> {
        self.inner.body.get()
    }

    pub fn get_status(&self) -> Result<TaskStatus, CeleryError> {
        Ok(self.terminal("get_status")?.status.clone())
    }

    pub fn get_result(&self) -> Result<Value, CeleryError> {
        Ok(self.terminal("get_result")?.result.clone())
    }

    pub fn get_traceback(&self) -> Result<Value, CeleryError> {
        Ok(self.terminal("get_traceback")?.traceback.clone())
    }

    fn terminal(&self, accessor: &'static str) -> Result<&TaskMeta, CeleryError> {
        self.inner.body.get().ok_or(CeleryError::State(accessor))
    }
}

impl<B: Broker> AsyncResult<B> {
    /// Whether the task has finished, reading the store unless the outcome is already cached.
    pub async fn is_ready(&self) -> Result<bool, CeleryError> {
        if self.inner.body.get().is_some() {
            return Ok(true);
        }

        let key = task_meta_key(&self.inner.task_id);
        let Some(bytes) = self.inner.broker.get(&key).await? else {
            trace!(task_id = self.inner.task_id; "No result record yet");
            return Ok(false);
        };

        let raw: RawTaskMeta = serde_json::from_slice(&bytes)?;
        match raw.into_terminal() {
            Some(meta) => {
                debug!(task_id = self.inner.task_id, status = meta.status.as_str(); "Task finished");
                let _ = self.inner.body.set(meta);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether the task has finished with `SUCCESS`.
    pub async fn is_success(&self) -> Result<bool, CeleryError> {
        Ok(self.is_ready().await? && self.get_status()? == TaskStatus::Success)
    }

    /// Current status, `PENDING` while the task is still in flight.
    pub async fn status(&self) -> Result<TaskStatus, CeleryError> {
        match self.is_ready().await? {
            true => self.get_status(),
            false => Ok(TaskStatus::Pending),
        }
    }

    /// The task's return value, `None` while the task is still in flight.
    pub async fn result(&self) -> Result<Option<Value>, CeleryError> {
        match self.is_ready().await? {
            true => self.get_result().map(Some),
            false => Ok(None),
        }
    }

    /// The task's traceback, `None` while the task is still in flight.
    pub async fn traceback(&self) -> Result<Option<Value>, CeleryError> {
        match self.is_ready().await? {
            true => self.get_traceback().map(Some),
            false => Ok(None),
        }
    }

    /// Wait for the task to finish and return its result.
    ///
    /// Polls the store every `interval` until the task is ready or `timeout` of wall-clock time has passed.
    ///
    /// # Errors
    ///
    /// [`CeleryError::Timeout`] naming the task and its arguments if it hasn't finished in time.
    ///
    pub async fn get(&self, timeout: Duration, interval: Duration) -> Result<Value, CeleryError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.is_ready().await? {
                return self.get_result();
            }
            let remaining = timeout.saturating_sub(start.elapsed());
            tokio::time::sleep(interval.min(remaining)).await;
        }

        if self.is_ready().await? {
            return self.get_result();
        }

        warn!(task_id = self.inner.task_id, task = self.inner.task_name.as_str(); "Timed out waiting for task");
        Err(CeleryError::Timeout {
            name: self.inner.task_name.clone(),
            args: serde_json::to_string(&self.inner.task_args)?,
            timeout,
        })
    }
}
