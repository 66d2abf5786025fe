//!
//! Producer-side client for a Celery-compatible worker pool.
//!
//! Tasks and task graphs (groups, chains, chords) are serialized into the workers' message format and pushed onto
//! queues of a key/list store; outcomes are read back from the same store by polling.
//!

pub mod broker;
pub mod canvas;
pub mod client;
pub mod error;
pub mod messaging;
pub mod options;
pub mod protocol;
pub mod result;
pub mod runtime;

pub use broker::{Broker, Connection, MemoryBroker};
pub use canvas::{Chain, Chord, Group, Signature, Task, TaskArgs};
pub use client::{Celery, DEFAULT_ROUTING_KEY};
pub use error::CeleryError;
pub use messaging::TaskId;
pub use options::ClientOptions;
pub use result::{AsyncResult, GroupResult, TaskStatus};
