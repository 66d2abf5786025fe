use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::time::Duration;

/// Options for connecting to the broker.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientOptions {
    /// The host to connect to.
    pub host: String,

    /// The port to connect on.
    pub port: u16,

    /// Database index selected right after connecting.
    pub db: u32,

    /// Password sent once with `AUTH` right after connecting.
    pub password: Option<String>,

    /// Upper bound on opening the socket. Unbounded when absent.
    #[serde(with = "optional_secs")]
    pub connect_timeout: Option<Duration>,
}

impl ClientOptions {
    pub fn new<H: Into<String>>(host: H, port: u16) -> Self {
        Self { host: host.into(), port, ..Self::default() }
    }

    pub fn with_db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    pub fn with_password<P: Into<String>>(mut self, password: P) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// `host:port` as passed to the socket.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Debug for ClientOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 6379,
            db: 0,
            password: None,
            connect_timeout: None,
        }
    }
}

mod optional_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        secs.map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_broker() {
        let options = ClientOptions::default();
        assert_eq!(options.address(), "127.0.0.1:6379");
        assert_eq!(options.db, 0);
        assert_eq!(options.password, None);
    }

    #[test]
    fn debug_hides_password() {
        let options = ClientOptions::default().with_password("hunter2");
        let printed = format!("{:?}", crate::Celery::new(options));
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn deserializes_partial_options() -> Result<(), anyhow::Error> {
        let options: ClientOptions = serde_json::from_str(r#"{"port": 6380, "connect_timeout": 2.5}"#)?;
        assert_eq!(options.host, "127.0.0.1");
        assert_eq!(options.port, 6380);
        assert_eq!(options.connect_timeout, Some(Duration::from_millis(2500)));
        Ok(())
    }
}
