//!
//! The subset of the key/list store's request/reply protocol this client speaks.
//!
//! Requests are arrays of byte strings (`*<count>\r\n` then `$<len>\r\n<bytes>\r\n` per argument).
//! Replies are decoded one at a time from a buffered stream; see [`read_reply`].
//!

mod command;
mod reply;

pub use command::*;
pub use reply::*;
