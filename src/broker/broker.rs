use crate::error::CeleryError;
use crate::protocol::{Command, Reply};
use std::future::Future;

/// Anything that can execute a command against the key/list store.
///
/// Commands are strictly request/reply: an implementation must hand back exactly one reply per command, and must not
/// interleave concurrent callers on the same underlying stream.
///
pub trait Broker: Send + Sync {
    /// Execute one command and wait for its reply.
    fn execute_command(&self, command: Command) -> impl Future<Output = Result<Reply, CeleryError>> + Send;

    /// `GET key`, returning `None` when the key is absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, CeleryError>> + Send {
        let command = Command::get(key);
        async move { self.execute_command(command).await?.into_bulk() }
    }

    /// `SETEX key ttl value`.
    fn setex(&self, key: &str, ttl_secs: u64, value: &[u8]) -> impl Future<Output = Result<Reply, CeleryError>> + Send {
        self.execute_command(Command::setex(key, ttl_secs, value))
    }

    /// `LPUSH key value`.
    fn lpush(&self, key: &str, value: &[u8]) -> impl Future<Output = Result<Reply, CeleryError>> + Send {
        self.execute_command(Command::lpush(key, value))
    }
}
