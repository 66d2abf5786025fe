mod broker;
mod connection;
mod in_memory;

pub use broker::*;
pub use connection::*;
pub use in_memory::*;
