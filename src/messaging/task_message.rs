use crate::messaging::TaskId;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Serialize;
use serde_json::{Map, Value};

/// Fields every serialized task carries, whether it's the pushed task, a callback, or a chord finalizer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskFields {
    pub task: String,
    pub args: Vec<Value>,
    /// Always an object on the wire, even when empty.
    pub kwargs: Map<String, Value>,
    pub immutable: bool,
    pub taskset: Option<TaskId>,
    pub eta: Option<String>,
}

/// The descriptor pushed to the broker for one task.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskMessage {
    #[serde(flatten)]
    pub fields: TaskFields,
    pub id: TaskId,
    #[serde(flatten)]
    pub follow_up: FollowUp,
}

/// What a worker does once the task finishes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FollowUp {
    /// Run the linked callbacks, `null` when there are none.
    Callbacks(Option<Vec<Callback>>),

    /// Count towards a chord and run its finalizer once the whole group is done.
    Chord(ChordFinalizer),
}

/// One link in a callback sequence, holding the rest of the sequence in `options.link`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Callback {
    #[serde(flatten)]
    pub fields: TaskFields,
    pub options: CallbackOptions,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CallbackOptions {
    pub task_id: TaskId,
    pub link: Option<Vec<Callback>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChordFinalizer {
    #[serde(flatten)]
    pub fields: TaskFields,
    pub options: ChordOptions,
    pub chord_size: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChordOptions {
    pub task_id: TaskId,
}

impl Callback {
    /// Nest an ordered sequence of callbacks, first to run outermost.
    ///
    /// Returns `None` for an empty sequence so the wire value is `null`.
    ///
    pub fn nest<I>(callbacks: I) -> Option<Vec<Callback>>
    where
        I: IntoIterator<Item = (TaskId, TaskFields)>,
        I::IntoIter: DoubleEndedIterator,
    {
        callbacks.into_iter().rev().fold(None, |link, (task_id, fields)| {
            Some(vec![Callback { fields, options: CallbackOptions { task_id, link } }])
        })
    }
}

/// Format an ETA the way workers parse it, e.g. `2024-05-01T12:30:00+02:00`.
pub fn format_eta(eta: &DateTime<FixedOffset>) -> String {
    eta.to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(name: &str) -> TaskFields {
        TaskFields {
            task: name.to_owned(),
            args: vec![json!(1)],
            kwargs: Map::new(),
            immutable: true,
            taskset: None,
            eta: None,
        }
    }

    #[test]
    fn no_callbacks_serialize_as_null() -> Result<(), anyhow::Error> {
        let id = TaskId::generate();
        let message = TaskMessage { fields: fields("a"), id, follow_up: FollowUp::Callbacks(None) };
        let value = serde_json::to_value(&message)?;

        assert_eq!(
            value,
            json!({
                "task": "a",
                "args": [1],
                "kwargs": {},
                "immutable": true,
                "taskset": null,
                "eta": null,
                "id": id.to_string(),
                "callbacks": null,
            })
        );
        Ok(())
    }

    #[test]
    fn callbacks_nest_first_outermost() -> Result<(), anyhow::Error> {
        let (b, c) = (TaskId::generate(), TaskId::generate());
        let nested = Callback::nest(vec![(b, fields("b")), (c, fields("c"))]);
        let value = serde_json::to_value(&nested)?;

        assert_eq!(value[0]["task"], "b");
        assert_eq!(value[0]["options"]["task_id"], b.to_string());
        assert_eq!(value[0]["options"]["link"][0]["task"], "c");
        assert_eq!(value[0]["options"]["link"][0]["options"]["task_id"], c.to_string());
        assert_eq!(value[0]["options"]["link"][0]["options"]["link"], Value::Null);
        Ok(())
    }

    #[test]
    fn empty_callbacks_nest_to_none() {
        assert_eq!(Callback::nest(Vec::new()), None);
    }

    #[test]
    fn chord_member_has_no_callbacks_key() -> Result<(), anyhow::Error> {
        let finalizer = TaskId::generate();
        let message = TaskMessage {
            fields: fields("member"),
            id: TaskId::generate(),
            follow_up: FollowUp::Chord(ChordFinalizer {
                fields: fields("final"),
                options: ChordOptions { task_id: finalizer },
                chord_size: 2,
            }),
        };
        let value = serde_json::to_value(&message)?;

        assert!(value.get("callbacks").is_none());
        assert_eq!(value["chord"]["task"], "final");
        assert_eq!(value["chord"]["chord_size"], 2);
        assert_eq!(value["chord"]["options"]["task_id"], finalizer.to_string());
        Ok(())
    }

    #[test]
    fn eta_uses_numeric_offset() -> Result<(), anyhow::Error> {
        let eta = DateTime::parse_from_rfc3339("2024-05-01T10:30:00Z")?;
        assert_eq!(format_eta(&eta), "2024-05-01T10:30:00+00:00");
        Ok(())
    }
}
