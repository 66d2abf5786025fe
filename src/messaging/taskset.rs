use crate::messaging::TaskId;
use serde::{Deserialize, Serialize};

/// Prefix of the key holding a taskset record.
pub const TASKSET_KEY_PREFIX: &str = "celery-taskset-meta-";

/// Prefix of the key holding a task's result record.
pub const TASK_META_KEY_PREFIX: &str = "celery-task-meta-";

/// How long a taskset record lives, in seconds.
pub const TASKSET_TTL_SECS: u64 = 24 * 60 * 60;

pub fn taskset_key(group_id: &TaskId) -> String {
    format!("{TASKSET_KEY_PREFIX}{group_id}")
}

pub fn task_meta_key(task_id: &TaskId) -> String {
    format!("{TASK_META_KEY_PREFIX}{task_id}")
}

/// Membership of a chord's group, registered before any member is pushed so workers can tell when the group is done.
///
/// Serialized as `{"result": [group_id, [[member_id, null], ...]]}`.
///
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TasksetRecord {
    pub result: (TaskId, Vec<(TaskId, Option<TaskId>)>),
}

impl TasksetRecord {
    pub fn new<I>(group_id: TaskId, members: I) -> Self
    where
        I: IntoIterator<Item = TaskId>,
    {
        let members = members.into_iter().map(|id| (id, None)).collect();
        Self { result: (group_id, members) }
    }

    pub fn group_id(&self) -> TaskId {
        self.result.0
    }

    pub fn member_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.result.1.iter().map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_group_and_members() -> Result<(), anyhow::Error> {
        let group = TaskId::generate();
        let (a, b) = (TaskId::generate(), TaskId::generate());
        let record = TasksetRecord::new(group, [a, b]);

        assert_eq!(
            serde_json::to_value(&record)?,
            json!({"result": [group.to_string(), [[a.to_string(), null], [b.to_string(), null]]]})
        );
        assert_eq!(record.member_ids().collect::<Vec<_>>(), vec![a, b]);
        Ok(())
    }

    #[test]
    fn keys_use_celery_prefixes() -> Result<(), anyhow::Error> {
        let id: TaskId = "0b5b6c5e-8c1f-4f7c-9d2a-3a1e2f4b5c6d".parse()?;
        assert_eq!(taskset_key(&id), "celery-taskset-meta-0b5b6c5e-8c1f-4f7c-9d2a-3a1e2f4b5c6d");
        assert_eq!(task_meta_key(&id), "celery-task-meta-0b5b6c5e-8c1f-4f7c-9d2a-3a1e2f4b5c6d");
        Ok(())
    }
}
