mod envelope;
mod task_id;
mod task_message;
mod taskset;

pub use envelope::*;
pub use task_id::*;
pub use task_message::*;
pub use taskset::*;
