//!
//! A trivial, in-process stand-in for the broker.
//!
//! Understands exactly the commands this client sends (`AUTH`, `SELECT`, `GET`, `SETEX`, `LPUSH`) and records every
//! command it receives, so tests and local tooling can inspect what would have gone over the wire. Expiry is recorded
//! but never enforced.
//!

use crate::broker::Broker;
use crate::error::CeleryError;
use crate::protocol::{Command, Reply};
use log::trace;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    log: Arc<Mutex<Vec<Command>>>,
    strings: Arc<Mutex<HashMap<String, (Vec<u8>, Option<u64>)>>>,
    lists: Arc<Mutex<HashMap<String, Vec<Vec<u8>>>>>,
    reject_pushes: Arc<Mutex<bool>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw string value, as a worker writing a result record would.
    pub async fn set<V: AsRef<[u8]>>(&self, key: &str, value: V) {
        self.strings.lock().await.insert(key.to_owned(), (value.as_ref().to_vec(), None));
    }

    /// Value and TTL of a string key.
    pub async fn string(&self, key: &str) -> Option<(Vec<u8>, Option<u64>)> {
        self.strings.lock().await.get(key).cloned()
    }

    /// Entries of a list, head first (most recently pushed first).
    pub async fn list(&self, key: &str) -> Vec<Vec<u8>> {
        self.lists.lock().await.get(key).cloned().unwrap_or_default()
    }

    /// Every command received so far, in order.
    pub async fn commands(&self) -> Vec<Command> {
        self.log.lock().await.clone()
    }

    /// Number of received commands with the given name.
    pub async fn count(&self, name: &str) -> usize {
        let name = name.to_ascii_uppercase();
        self.log.lock().await.iter().filter(|c| c.name() == name).count()
    }

    /// Make subsequent `LPUSH` commands report that nothing was pushed.
    pub async fn reject_pushes(&self, reject: bool) {
        *self.reject_pushes.lock().await = reject;
    }
}

impl Broker for MemoryBroker {
    async fn execute_command(&self, command: Command) -> Result<Reply, CeleryError> {
        trace!(command:?; "Executing command in memory");
        self.log.lock().await.push(command.clone());

        let args = command.args();
        let key = |i: usize| -> Result<String, CeleryError> {
            args.get(i)
                .map(|a| String::from_utf8_lossy(a).into_owned())
                .ok_or_else(|| CeleryError::Protocol(format!("ERR wrong number of arguments for '{}'", command.name())))
        };

        match command.name().as_str() {
            "AUTH" | "SELECT" => Ok(Reply::Status("OK".to_owned())),

            "GET" => {
                let strings = self.strings.lock().await;
                Ok(match strings.get(&key(0)?) {
                    Some((value, _)) => Reply::Bulk(value.clone()),
                    None => Reply::Nil,
                })
            }

            "SETEX" => {
                let ttl = key(1)?
                    .parse::<u64>()
                    .map_err(|_| CeleryError::Protocol("ERR value is not an integer or out of range".to_owned()))?;
                let value = args.get(2).cloned().unwrap_or_default();
                self.strings.lock().await.insert(key(0)?, (value, Some(ttl)));
                Ok(Reply::Status("OK".to_owned()))
            }

            "LPUSH" => {
                if *self.reject_pushes.lock().await {
                    return Ok(Reply::Integer("0".to_owned()));
                }
                let mut lists = self.lists.lock().await;
                let list = lists.entry(key(0)?).or_default();
                for value in &args[1..] {
                    list.insert(0, value.clone());
                }
                Ok(Reply::Integer(list.len().to_string()))
            }

            other => Err(CeleryError::Protocol(format!("ERR unknown command '{other}'"))),
        }
    }
}
