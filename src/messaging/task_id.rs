use crate::error::CeleryError;
use log::kv::{ToValue, Value};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a task or taskset: a random (version 4) UUID in hyphenated form.
#[derive(Debug, Copy, Clone, Hash, Ord, PartialOrd, Eq, PartialEq)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh random ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for TaskId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for TaskId {
    type Err = CeleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CeleryError::Validation(format!("invalid task id {s:?}: {e}")))
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl ToValue for TaskId {
    fn to_value(&self) -> Value {
        Value::from_display(self)
    }
}

impl Serialize for TaskId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let task_id_str = String::deserialize(deserializer)?;
        task_id_str.parse().map_err(|e| D::Error::custom(format!("{e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_version_4() {
        for _ in 0..100 {
            let id = TaskId::generate().to_string();
            let bytes = id.as_bytes();

            assert_eq!(id.len(), 36);
            assert_eq!(bytes[14], b'4', "version nibble in {id}");
            assert!(matches!(bytes[19], b'8' | b'9' | b'a' | b'b'), "variant bits in {id}");
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<TaskId> = (0..10_000).map(|_| TaskId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn task_id_serializes_to_string() -> Result<(), anyhow::Error> {
        let task_id: TaskId = "0b5b6c5e-8c1f-4f7c-9d2a-3a1e2f4b5c6d".parse()?;
        let task_id_str = serde_json::to_string(&task_id)?;
        assert_eq!(task_id_str, "\"0b5b6c5e-8c1f-4f7c-9d2a-3a1e2f4b5c6d\"");
        Ok(())
    }

    #[test]
    fn task_id_deserialization_fails_on_invalid_string() {
        let result = serde_json::from_str::<TaskId>("\"123-0\"");
        assert!(result.is_err());
    }
}
