// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::Result;
use crate::worker::WorkerSummary;
use crate::Rank;
use std::future::Future;
use tokio::task::{self, JoinHandle};

/// Trait for abstracting where a worker loop runs (tasks, threads)
pub trait WorkerRuntime: Send + 'static {
    type Handle: Send;

    /// Spawn a worker loop; the closure builds the future on the target runtime
    fn spawn<F, Fut>(f: F) -> Self::Handle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<WorkerSummary>> + Send + 'static;

    /// Wait for the worker loop to return
    fn join(handle: Self::Handle) -> impl Future<Output = Result<WorkerSummary>> + Send;
}

/// Tokio task-based runtime
#[derive(Clone, Copy)]
pub struct TokioRuntime;

impl WorkerRuntime for TokioRuntime {
    type Handle = JoinHandle<Result<WorkerSummary>>;

    fn spawn<F, Fut>(f: F) -> Self::Handle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<WorkerSummary>> + Send + 'static,
    {
        task::spawn(f())
    }

    async fn join(handle: Self::Handle) -> Result<WorkerSummary> {
        handle.await?
    }
}

/// Handles of the worker loops of one run
pub struct WorkerPool<R: WorkerRuntime> {
    handles: Vec<(Rank, R::Handle)>,
}

impl<R: WorkerRuntime> Default for WorkerPool<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: WorkerRuntime> WorkerPool<R> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn spawn<F, Fut>(&mut self, rank: Rank, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<WorkerSummary>> + Send + 'static,
    {
        self.handles.push((rank, R::spawn(f)));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker, in rank order of spawning. The first failure
    /// is returned after all workers have been joined.
    pub async fn join_all(self) -> Result<Vec<WorkerSummary>> {
        let mut summaries = Vec::with_capacity(self.handles.len());
        let mut first_error = None;

        for (rank, handle) in self.handles {
            match R::join(handle).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    tracing::error!(worker = rank, error = %e, "worker failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(summaries),
        }
    }
}

