// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::arena::NumberArena;
use crate::error::{Result, SortError};
use crate::job_layout::JobLayout;
use crate::message::{Envelope, JobIndex, WorkMessage};
use crate::sort_engine::SortEngine;
use crate::transport::Transport;
use crate::{Rank, COORDINATOR};
use std::mem;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace};

/// Idle -> Receiving -> Sorting -> Sending -> Idle per chunk, and
/// Receiving -> Terminated on the termination tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Receiving,
    Sorting,
    Sending,
    Terminated,
}

/// What a worker did before it was terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub rank: Rank,
    /// Job indices in the order they were sorted
    pub jobs: Vec<JobIndex>,
}

impl WorkerSummary {
    pub fn chunks_sorted(&self) -> usize {
        self.jobs.len()
    }
}

/// Receives chunks from the coordinator, sorts them and sends them back
/// until the termination tag arrives.
pub struct Worker<T: Transport> {
    transport: T,
    layout: JobLayout,
    engine: Arc<SortEngine>,
    scratch: NumberArena,
    coordinator: Rank,
    straggle_delay: Option<Duration>,
    state: WorkerState,
    state_observer: Option<UnboundedSender<WorkerState>>,
}

impl<T: Transport> Worker<T> {
    pub fn new(transport: T, layout: JobLayout, engine: SortEngine) -> Result<Self> {
        let scratch = NumberArena::new(layout.payload_size(), layout.array_length())?;
        Ok(Self {
            transport,
            layout,
            engine: Arc::new(engine),
            scratch,
            coordinator: COORDINATOR,
            straggle_delay: None,
            state: WorkerState::Idle,
            state_observer: None,
        })
    }

    pub fn with_coordinator(mut self, coordinator: Rank) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Sleep after every sorted chunk, to simulate a slow machine
    pub fn with_straggle_delay(mut self, delay: Option<Duration>) -> Self {
        self.straggle_delay = delay.filter(|d| !d.is_zero());
        self
    }

    pub fn rank(&self) -> Rank {
        self.transport.rank()
    }

    /// Report every state the worker enters, starting with the first `Idle`
    pub fn with_state_observer(mut self, observer: UnboundedSender<WorkerState>) -> Self {
        self.state_observer = Some(observer);
        self
    }

    fn transition(&mut self, next: WorkerState) {
        trace!(worker = self.rank(), from = ?self.state, to = ?next, "state change");
        self.state = next;
        if let Some(observer) = &self.state_observer {
            // A dropped observer only stops the notifications
            let _ = observer.send(next);
        }
    }

    pub async fn run(mut self) -> Result<WorkerSummary> {
        let rank = self.rank();
        let mut jobs = Vec::new();

        loop {
            self.transition(WorkerState::Idle);
            let envelope = self.transport.probe_any().await?;
            if envelope.source != self.coordinator {
                return Err(SortError::protocol(
                    rank,
                    format!(
                        "tag {} from rank {}, only the coordinator (rank {}) may send to a worker",
                        envelope.tag, envelope.source, self.coordinator
                    ),
                ));
            }

            self.transition(WorkerState::Receiving);
            match self.layout.decode(envelope.tag) {
                Some(WorkMessage::Terminate) => {
                    // Whatever the payload, nothing stays buffered
                    let dropped = self.transport.discard(envelope).await?;
                    self.transition(WorkerState::Terminated);
                    debug!(worker = rank, dropped, "termination consumed");
                    info!(worker = rank, chunks = jobs.len(), "worker terminated");
                    return Ok(WorkerSummary { rank, jobs });
                }
                Some(WorkMessage::Assignment(job)) => {
                    self.process(envelope, job).await?;
                    jobs.push(job);
                }
                None => {
                    return Err(SortError::protocol(
                        rank,
                        format!(
                            "tag {} from rank {} is neither a job index nor termination",
                            envelope.tag, envelope.source
                        ),
                    ));
                }
            }
        }
    }

    async fn process(&mut self, envelope: Envelope, job: JobIndex) -> Result<()> {
        self.transport
            .receive_from(envelope, self.scratch.as_mut_slice())
            .await?;
        debug!(worker = self.rank(), job, "chunk received");

        self.transition(WorkerState::Sorting);
        let engine = Arc::clone(&self.engine);
        let mut scratch = mem::take(&mut self.scratch);
        self.scratch = tokio::task::spawn_blocking(move || {
            engine.sort_rows(&mut scratch);
            scratch
        })
        .await?;

        if let Some(delay) = self.straggle_delay {
            tokio::time::sleep(delay).await;
        }

        self.transition(WorkerState::Sending);
        self.transport
            .send(self.scratch.as_slice(), envelope.tag, self.coordinator)
            .await?;
        debug!(worker = self.rank(), job, "result sent");
        Ok(())
    }
}
