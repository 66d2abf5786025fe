use crate::broker::{Broker, Connection};
use crate::error::CeleryError;
use crate::result::{AsyncResult, TaskStatus};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// Results of a fixed set of tasks, queried together.
///
/// Readiness and success hold only when they hold for every member; other queries return one entry per member, in
/// member order.
///
pub struct GroupResult<B = Connection> {
    children: Vec<AsyncResult<B>>,
}

impl<B> Clone for GroupResult<B> {
    fn clone(&self) -> Self {
        Self { children: self.children.clone() }
    }
}

impl<B> std::fmt::Debug for GroupResult<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupResult").field("children", &self.children).finish()
    }
}

impl<B> GroupResult<B> {
    pub fn new(children: Vec<AsyncResult<B>>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[AsyncResult<B>] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn get_statuses(&self) -> Result<Vec<TaskStatus>, CeleryError> {
        self.children.iter().map(AsyncResult::get_status).collect()
    }

    pub fn get_results(&self) -> Result<Vec<Value>, CeleryError> {
        self.children.iter().map(AsyncResult::get_result).collect()
    }

    pub fn get_tracebacks(&self) -> Result<Vec<Value>, CeleryError> {
        self.children.iter().map(AsyncResult::get_traceback).collect()
    }
}

impl<B: Broker> GroupResult<B> {
    /// Whether every member has finished. Every member is checked, so finished ones get cached along the way.
    pub async fn is_ready(&self) -> Result<bool, CeleryError> {
        let mut all = true;
        for child in &self.children {
            all &= child.is_ready().await?;
        }
        Ok(all)
    }

    /// Whether every member has finished with `SUCCESS`.
    pub async fn is_success(&self) -> Result<bool, CeleryError> {
        let mut all = true;
        for child in &self.children {
            all &= child.is_success().await?;
        }
        Ok(all)
    }

    pub async fn statuses(&self) -> Result<Vec<TaskStatus>, CeleryError> {
        let mut statuses = Vec::with_capacity(self.children.len());
        for child in &self.children {
            statuses.push(child.status().await?);
        }
        Ok(statuses)
    }

    pub async fn results(&self) -> Result<Vec<Option<Value>>, CeleryError> {
        let mut results = Vec::with_capacity(self.children.len());
        for child in &self.children {
            results.push(child.result().await?);
        }
        Ok(results)
    }

    pub async fn tracebacks(&self) -> Result<Vec<Option<Value>>, CeleryError> {
        let mut tracebacks = Vec::with_capacity(self.children.len());
        for child in &self.children {
            tracebacks.push(child.traceback().await?);
        }
        Ok(tracebacks)
    }

    /// Wait for every member in turn. `timeout` bounds the whole wait, not each member.
    ///
    /// # Errors
    ///
    /// [`CeleryError::Timeout`] for the first member still unfinished at the deadline, reporting the group's `timeout`.
    ///
    pub async fn get(&self, timeout: Duration, interval: Duration) -> Result<Vec<Value>, CeleryError> {
        let deadline = Instant::now() + timeout;
        let mut results = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match child.get(remaining, interval).await {
                Ok(value) => results.push(value),
                Err(CeleryError::Timeout { name, args, .. }) => return Err(CeleryError::Timeout { name, args, timeout }),
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;
    use crate::messaging::{task_meta_key, TaskId};
    use serde_json::json;
    use std::sync::Arc;

    fn group_on(broker: &MemoryBroker, size: usize) -> GroupResult<MemoryBroker> {
        let broker = Arc::new(broker.clone());
        let children = (0..size)
            .map(|i| AsyncResult::new(broker.clone(), TaskId::generate(), format!("tasks.t{i}"), vec![]))
            .collect();
        GroupResult::new(children)
    }

    async fn finish(broker: &MemoryBroker, result: &AsyncResult<MemoryBroker>, status: &str, value: Value) {
        let record = json!({"status": status, "result": value, "traceback": null});
        broker.set(&task_meta_key(&result.id()), record.to_string()).await;
    }

    #[tokio::test]
    async fn ready_only_when_every_member_is() -> Result<(), anyhow::Error> {
        let broker = MemoryBroker::new();
        let group = group_on(&broker, 3);
        finish(&broker, &group.children()[0], "SUCCESS", json!(1)).await;
        finish(&broker, &group.children()[1], "SUCCESS", json!(2)).await;

        assert!(!group.is_ready().await?);
        assert_eq!(group.statuses().await?, vec![TaskStatus::Success, TaskStatus::Success, TaskStatus::Pending]);

        finish(&broker, &group.children()[2], "SUCCESS", json!(3)).await;
        assert!(group.is_ready().await?);
        assert!(group.is_success().await?);
        assert_eq!(group.get_results()?, vec![json!(1), json!(2), json!(3)]);
        Ok(())
    }

    #[tokio::test]
    async fn one_failure_fails_the_group() -> Result<(), anyhow::Error> {
        let broker = MemoryBroker::new();
        let group = group_on(&broker, 2);
        finish(&broker, &group.children()[0], "SUCCESS", json!(1)).await;
        finish(&broker, &group.children()[1], "FAILURE", json!("boom")).await;

        assert!(group.is_ready().await?);
        assert!(!group.is_success().await?);
        assert_eq!(group.get_statuses()?, vec![TaskStatus::Success, TaskStatus::Failure]);
        Ok(())
    }

    #[tokio::test]
    async fn accessors_fail_while_any_member_is_pending() {
        let broker = MemoryBroker::new();
        let group = group_on(&broker, 2);
        assert!(matches!(group.get_results(), Err(CeleryError::State(_))));
    }

    #[tokio::test]
    async fn get_collects_results_in_member_order() -> Result<(), anyhow::Error> {
        let broker = MemoryBroker::new();
        let group = group_on(&broker, 2);
        finish(&broker, &group.children()[1], "SUCCESS", json!("second")).await;
        finish(&broker, &group.children()[0], "SUCCESS", json!("first")).await;

        let results = group.get(Duration::from_secs(1), Duration::from_millis(10)).await?;
        assert_eq!(results, vec![json!("first"), json!("second")]);
        Ok(())
    }

    #[tokio::test]
    async fn timeout_reports_the_whole_budget() -> Result<(), anyhow::Error> {
        let broker = MemoryBroker::new();
        let group = group_on(&broker, 2);
        finish(&broker, &group.children()[0], "SUCCESS", json!(1)).await;

        match group.get(Duration::from_millis(100), Duration::from_millis(10)).await {
            Err(CeleryError::Timeout { name, timeout, .. }) => {
                assert_eq!(name, "tasks.t1");
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
        Ok(())
    }
}
