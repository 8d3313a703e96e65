// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use chunk_sort_core::worker::WorkerSummary;
use chunk_sort_core::worker_runtime::WorkerRuntime;
use chunk_sort_core::{Result, SortError};
use std::future::Future;
use std::thread::{self, JoinHandle};

/// Thread-based runtime: every worker gets an OS thread with its own
/// single-threaded tokio runtime
pub struct ThreadRuntime;

impl WorkerRuntime for ThreadRuntime {
    type Handle = JoinHandle<Result<WorkerSummary>>;

    fn spawn<F, Fut>(f: F) -> Self::Handle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<WorkerSummary>> + Send + 'static,
    {
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| SortError::allocation(0, format!("worker runtime: {}", e)))?;
            runtime.block_on(f())
        })
    }

    async fn join(handle: Self::Handle) -> Result<WorkerSummary> {
        let joined = tokio::task::spawn_blocking(move || handle.join()).await?;
        joined.map_err(|_| SortError::join("worker thread panicked"))?
    }
}
