use crate::error::CeleryError;
use serde_json::{Map, Value};

/// Key of one entry in a mixed argument list: a position or a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgKey {
    Position(u64),
    Name(String),
}

impl From<u64> for ArgKey {
    fn from(value: u64) -> Self {
        ArgKey::Position(value)
    }
}

impl From<&str> for ArgKey {
    fn from(value: &str) -> Self {
        ArgKey::Name(value.to_owned())
    }
}

impl From<String> for ArgKey {
    fn from(value: String) -> Self {
        ArgKey::Name(value)
    }
}

/// Positional and keyword arguments of a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskArgs {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl TaskArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<V: Into<Value>>(mut self, value: V) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Split a mixed list into positional and keyword arguments.
    ///
    /// Positional entries are ordered by ascending position regardless of input order; keyword entries keep their
    /// input order.
    ///
    pub fn from_mixed<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<ArgKey>,
    {
        let mut positional = Vec::new();
        let mut kwargs = Map::new();
        for (key, value) in entries {
            match key.into() {
                ArgKey::Position(position) => positional.push((position, value)),
                ArgKey::Name(name) => {
                    kwargs.insert(name, value);
                }
            }
        }
        positional.sort_by_key(|(position, _)| *position);

        let args = positional.into_iter().map(|(_, value)| value).collect();
        Self { args, kwargs }
    }

    /// Arguments from JSON: an array is all positional, an object is split like [`TaskArgs::from_mixed`] with
    /// integer-like keys taken as positions, and `null` means no arguments.
    ///
    /// # Errors
    ///
    /// [`CeleryError::Validation`] for any other JSON value.
    ///
    pub fn from_json(value: Value) -> Result<Self, CeleryError> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Array(args) => Ok(Self { args, kwargs: Map::new() }),
            Value::Object(map) => Ok(Self::from_mixed(map.into_iter().map(|(key, value)| {
                let key = match key.parse::<u64>() {
                    Ok(position) => ArgKey::Position(position),
                    Err(_) => ArgKey::Name(key),
                };
                (key, value)
            }))),
            other => Err(CeleryError::Validation(format!("args should be an array or an object, got {other}"))),
        }
    }
}

impl From<Vec<Value>> for TaskArgs {
    fn from(args: Vec<Value>) -> Self {
        Self { args, kwargs: Map::new() }
    }
}

impl From<Map<String, Value>> for TaskArgs {
    fn from(kwargs: Map<String, Value>) -> Self {
        Self { args: Vec::new(), kwargs }
    }
}
