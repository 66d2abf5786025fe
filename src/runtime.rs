//! A process-wide Tokio runtime for callers that aren't async themselves, such as the CLI.

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// The shared single-threaded runtime, built on first use with IO and timers enabled.
pub fn async_runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()
            .expect("failed to build Tokio runtime")
    })
}

/// Drive `future` to completion on the shared runtime, blocking the calling thread.
pub fn block_on<F: Future>(future: F) -> F::Output {
    async_runtime().block_on(future)
}
