mod async_result;
mod group_result;
mod meta;

pub use async_result::*;
pub use group_result::*;
pub use meta::*;
