// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::arena::NumberArena;
use crate::error::{Result, SortError};
use crate::job_layout::JobLayout;
use crate::message::{JobIndex, WorkMessage};
use crate::transport::Transport;
use crate::Rank;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A chunk handed to a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub job: JobIndex,
    pub worker: Rank,
}

/// Record of one coordinator run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Every assignment, in dispatch order
    pub assignments: Vec<Assignment>,
    /// Every received result, in receipt order
    pub completions: Vec<Assignment>,
    /// Workers that received a chunk in the seeding round
    pub seeded: usize,
    /// Results consumed while chunks were still unassigned
    pub dispatch_results: usize,
    /// Results consumed after the last chunk was assigned
    pub drain_results: usize,
    /// Workers sent the termination signal, in order
    pub terminated: Vec<Rank>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn jobs_per_worker(&self) -> BTreeMap<Rank, usize> {
        let mut counts = BTreeMap::new();
        for assignment in &self.completions {
            *counts.entry(assignment.worker).or_insert(0) += 1;
        }
        counts
    }
}

/// Worker ranks for a run with `num_workers` workers and the coordinator at rank 0
pub fn worker_ranks(num_workers: usize) -> Vec<Rank> {
    (1..=num_workers).collect()
}

/// Greedy work-queue scheduler.
///
/// Seeds every worker with one chunk, then hands the next unassigned chunk to
/// whichever worker returns a result first. Once every chunk is assigned it
/// drains the outstanding results and terminates all workers.
pub struct Coordinator<T: Transport> {
    transport: T,
    layout: JobLayout,
    workers: Vec<Rank>,
    outstanding: HashMap<Rank, JobIndex>,
}

impl<T: Transport> Coordinator<T> {
    pub fn new(transport: T, layout: JobLayout, workers: Vec<Rank>) -> Result<Self> {
        if workers.is_empty() {
            return Err(SortError::config("coordinator needs at least one worker"));
        }
        let unique: HashSet<_> = workers.iter().collect();
        if unique.len() != workers.len() {
            return Err(SortError::config("worker ranks must be distinct"));
        }
        if unique.contains(&transport.rank()) {
            return Err(SortError::config(format!(
                "coordinator rank {} cannot also be a worker",
                transport.rank()
            )));
        }

        Ok(Self {
            transport,
            layout,
            workers,
            outstanding: HashMap::new(),
        })
    }

    pub fn rank(&self) -> Rank {
        self.transport.rank()
    }

    pub fn workers(&self) -> &[Rank] {
        &self.workers
    }

    /// Sort every array of `dataset` by farming chunks out to the workers.
    /// Results are written back in place.
    pub async fn run(&mut self, dataset: &mut NumberArena) -> Result<RunReport> {
        if dataset.rows() != self.layout.total_arrays()
            || dataset.columns() != self.layout.array_length()
        {
            return Err(SortError::config(format!(
                "dataset is {}x{}, layout expects {}x{}",
                dataset.rows(),
                dataset.columns(),
                self.layout.total_arrays(),
                self.layout.array_length()
            )));
        }

        let start = Instant::now();
        let mut report = RunReport::default();
        let layout = self.layout;
        let mut jobs = layout.job_indices();
        self.outstanding.clear();

        info!(
            jobs = self.layout.num_jobs(),
            workers = self.workers.len(),
            "dispatch started"
        );

        // Seed
        let workers = self.workers.clone();
        for &worker in &workers {
            let Some(job) = jobs.next() else {
                break;
            };
            self.assign(dataset, worker, job, &mut report).await?;
            report.seeded += 1;
        }
        if report.seeded < workers.len() {
            warn!(
                seeded = report.seeded,
                workers = workers.len(),
                "fewer chunks than workers, some workers stay idle"
            );
        }

        // Dispatch remaining
        for job in jobs {
            let worker = self.collect_result(dataset, &mut report).await?;
            report.dispatch_results += 1;
            self.assign(dataset, worker, job, &mut report).await?;
        }
        info!(assigned = report.assignments.len(), "all chunks assigned");

        // Drain
        while !self.outstanding.is_empty() {
            self.collect_result(dataset, &mut report).await?;
            report.drain_results += 1;
        }
        info!(drained = report.drain_results, "drain complete");

        // Terminate
        let termination_tag = layout.encode(WorkMessage::Terminate);
        for &worker in &workers {
            self.transport.send(&[], termination_tag, worker).await?;
            report.terminated.push(worker);
        }
        info!(workers = report.terminated.len(), "termination sent");

        report.elapsed = start.elapsed();
        Ok(report)
    }

    async fn assign(
        &mut self,
        dataset: &NumberArena,
        worker: Rank,
        job: JobIndex,
        report: &mut RunReport,
    ) -> Result<()> {
        if let Some(&busy) = self.outstanding.get(&worker) {
            return Err(SortError::protocol(
                self.rank(),
                format!("worker {} is still busy with job {}", worker, busy),
            ));
        }

        let chunk = dataset
            .rows_slice(job, self.layout.payload_size())
            .ok_or_else(|| SortError::protocol(self.rank(), format!("job {} out of range", job)))?;
        let tag = self.layout.encode(WorkMessage::Assignment(job));
        self.transport.send(chunk, tag, worker).await?;

        self.outstanding.insert(worker, job);
        report.assignments.push(Assignment { job, worker });
        debug!(worker, job, "chunk assigned");
        Ok(())
    }

    /// Wait for a result from any worker, write it back and return the
    /// worker that is now free.
    async fn collect_result(
        &mut self,
        dataset: &mut NumberArena,
        report: &mut RunReport,
    ) -> Result<Rank> {
        let rank = self.rank();
        let envelope = self.transport.probe_any().await?;
        let worker = envelope.source;

        let job = match self.layout.decode(envelope.tag) {
            Some(WorkMessage::Assignment(job)) => job,
            Some(WorkMessage::Terminate) | None => {
                error!(worker, tag = envelope.tag, "unexpected tag");
                return Err(SortError::protocol(
                    rank,
                    format!("rank {} sent tag {}, not a job index", worker, envelope.tag),
                ));
            }
        };

        match self.outstanding.get(&worker) {
            Some(&expected) if expected == job => {}
            Some(&expected) => {
                error!(worker, job, expected, "result for the wrong job");
                return Err(SortError::protocol(
                    rank,
                    format!(
                        "rank {} returned job {} while assigned job {}",
                        worker, job, expected
                    ),
                ));
            }
            None => {
                error!(worker, job, "result from a worker with no assignment");
                return Err(SortError::protocol(
                    rank,
                    format!("rank {} returned job {} without an assignment", worker, job),
                ));
            }
        }

        let region = dataset
            .rows_slice_mut(job, self.layout.payload_size())
            .ok_or_else(|| SortError::protocol(rank, format!("job {} out of range", job)))?;
        self.transport.receive_from(envelope, region).await?;

        self.outstanding.remove(&worker);
        report.completions.push(Assignment { job, worker });
        debug!(worker, job, "result received");
        Ok(worker)
    }
}
