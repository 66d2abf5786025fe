use std::time::Duration;
use thiserror::Error;

/// Every way a broker, canvas, or result operation can fail.
#[derive(Debug, Error)]
pub enum CeleryError {
    /// The socket could not be opened, or a read/write on it failed.
    #[error("broker connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The store replied with an error, or with bytes that aren't a valid reply.
    #[error("broker protocol error: {0}")]
    Protocol(String),

    /// The store did not acknowledge a push or registration.
    #[error("failed to submit {0}")]
    Submission(String),

    /// A result accessor was called before the task reached a terminal state.
    #[error("called {0} before task was ready")]
    State(&'static str),

    /// A blocking wait ran out of time.
    #[error("task {name}({args}) did not return after {} seconds", .timeout.as_secs_f64())]
    Timeout {
        name: String,
        args: String,
        timeout: Duration,
    },

    /// A task or canvas was built from malformed input.
    #[error("invalid task input: {0}")]
    Validation(String),

    /// A message or result record could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CeleryError {
    pub(crate) fn connection<M: Into<String>>(message: M, source: std::io::Error) -> Self {
        Self::Connection { message: message.into(), source: Some(source) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_names_task_and_args() {
        let error = CeleryError::Timeout {
            name: "tasks.add".to_owned(),
            args: "[2,3]".to_owned(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(error.to_string(), "task tasks.add([2,3]) did not return after 1 seconds");
    }

    #[test]
    fn state_error_names_accessor() {
        let error = CeleryError::State("get_status");
        assert_eq!(error.to_string(), "called get_status before task was ready");
    }
}
