// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The test plays every worker by hand over the channel transport, so the
//! completion order seen by the coordinator is fully controlled.

use chunk_sort_core::arena::NumberArena;
use chunk_sort_core::channel_transport::ChannelTransport;
use chunk_sort_core::coordinator::{worker_ranks, Assignment, Coordinator, RunReport};
use chunk_sort_core::dataset::{generate, DatasetKind};
use chunk_sort_core::job_layout::JobLayout;
use chunk_sort_core::message::{JobIndex, WorkMessage};
use chunk_sort_core::transport::Transport;
use chunk_sort_core::{Result, SortError, COORDINATOR};
use tokio::task::JoinHandle;

struct ScriptedWorker {
    transport: ChannelTransport,
    layout: JobLayout,
}

impl ScriptedWorker {
    /// Wait for the next message and return it decoded, with its payload
    async fn next(&mut self) -> (WorkMessage, Vec<i32>) {
        let envelope = self.transport.probe_from(COORDINATOR).await.unwrap();
        let message = self.layout.decode(envelope.tag).unwrap();
        let len = match message {
            WorkMessage::Assignment(_) => self.layout.chunk_len(),
            WorkMessage::Terminate => 0,
        };
        let mut payload = vec![0; len];
        self.transport
            .receive_from(envelope, &mut payload)
            .await
            .unwrap();
        (message, payload)
    }

    async fn expect_job(&mut self) -> (JobIndex, Vec<i32>) {
        match self.next().await {
            (WorkMessage::Assignment(job), payload) => (job, payload),
            (other, _) => panic!("expected an assignment, got {:?}", other),
        }
    }

    async fn expect_terminate(&mut self) {
        let (message, _) = self.next().await;
        assert_eq!(message, WorkMessage::Terminate);
    }

    async fn reply_sorted(&mut self, job: JobIndex, mut payload: Vec<i32>) {
        for row in payload.chunks_mut(self.layout.array_length()) {
            row.sort_unstable();
        }
        self.transport
            .send(&payload, job as u32, COORDINATOR)
            .await
            .unwrap();
    }
}

fn setup(
    layout: JobLayout,
    num_workers: usize,
) -> (
    JoinHandle<Result<(NumberArena, RunReport)>>,
    Vec<ScriptedWorker>,
) {
    let mut transports = ChannelTransport::create_network(num_workers + 1, 8);
    let coordinator_transport = transports.remove(0);
    let workers = transports
        .into_iter()
        .map(|transport| ScriptedWorker { transport, layout })
        .collect();

    let mut dataset = generate(&layout, DatasetKind::Descending, None).unwrap();
    let mut coordinator =
        Coordinator::new(coordinator_transport, layout, worker_ranks(num_workers)).unwrap();
    let handle = tokio::spawn(async move {
        let report = coordinator.run(&mut dataset).await?;
        Ok((dataset, report))
    });

    (handle, workers)
}

#[tokio::test]
async fn test_fast_worker_gets_next_chunk() {
    // Arrange
    let layout = JobLayout::new(8, 4, 2).unwrap();
    let (handle, mut workers) = setup(layout, 2);

    // Act
    let (job_a, payload_a) = workers[0].expect_job().await;
    let (job_b, payload_b) = workers[1].expect_job().await;

    workers[0].reply_sorted(job_a, payload_a).await;
    let (job_c, payload_c) = workers[0].expect_job().await;

    workers[1].reply_sorted(job_b, payload_b).await;
    let (job_d, payload_d) = workers[1].expect_job().await;

    workers[0].reply_sorted(job_c, payload_c).await;
    workers[1].reply_sorted(job_d, payload_d).await;
    workers[0].expect_terminate().await;
    workers[1].expect_terminate().await;

    let (dataset, report) = handle.await.unwrap().unwrap();

    // Assert
    assert_eq!((job_a, job_b, job_c, job_d), (0, 2, 4, 6));
    assert_eq!(
        report.assignments,
        vec![
            Assignment { job: 0, worker: 1 },
            Assignment { job: 2, worker: 2 },
            Assignment { job: 4, worker: 1 },
            Assignment { job: 6, worker: 2 },
        ]
    );
    assert_eq!(report.seeded, 2);
    assert_eq!(report.dispatch_results, 2);
    assert_eq!(report.drain_results, 2);
    assert_eq!(report.terminated, vec![1, 2]);
    assert!(dataset.is_sorted_rows());
    assert_eq!(dataset.row(0), Some(&[29, 30, 31, 32][..]));
    assert_eq!(dataset.row(7), Some(&[1, 2, 3, 4][..]));
}

#[tokio::test]
async fn test_second_worker_finishing_first_is_served_first() {
    // Arrange
    let layout = JobLayout::new(8, 4, 2).unwrap();
    let (handle, mut workers) = setup(layout, 2);

    // Act
    let (job_a, payload_a) = workers[0].expect_job().await;
    let (job_b, payload_b) = workers[1].expect_job().await;

    workers[1].reply_sorted(job_b, payload_b).await;
    let (job_c, payload_c) = workers[1].expect_job().await;
    workers[1].reply_sorted(job_c, payload_c).await;
    let (job_d, payload_d) = workers[1].expect_job().await;

    workers[1].reply_sorted(job_d, payload_d).await;
    workers[0].reply_sorted(job_a, payload_a).await;
    workers[0].expect_terminate().await;
    workers[1].expect_terminate().await;

    let (dataset, report) = handle.await.unwrap().unwrap();

    // Assert
    assert_eq!((job_c, job_d), (4, 6));
    assert_eq!(report.jobs_per_worker().get(&1), Some(&1));
    assert_eq!(report.jobs_per_worker().get(&2), Some(&3));
    assert!(dataset.is_sorted_rows());
}

#[tokio::test]
async fn test_chunks_equal_workers_needs_no_dispatch() {
    // Arrange
    let layout = JobLayout::new(6, 4, 2).unwrap();
    let (handle, mut workers) = setup(layout, 3);

    // Act
    let mut jobs = Vec::new();
    for worker in workers.iter_mut() {
        jobs.push(worker.expect_job().await);
    }
    for (worker, (job, payload)) in workers.iter_mut().zip(jobs).rev() {
        worker.reply_sorted(job, payload).await;
    }
    for worker in workers.iter_mut() {
        worker.expect_terminate().await;
    }
    let (dataset, report) = handle.await.unwrap().unwrap();

    // Assert
    assert_eq!(report.seeded, 3);
    assert_eq!(report.dispatch_results, 0);
    assert_eq!(report.drain_results, 3);
    assert_eq!(report.terminated, vec![1, 2, 3]);
    assert!(dataset.is_sorted_rows());
}

#[tokio::test]
async fn test_more_workers_than_chunks_terminates_idle_workers() {
    // Arrange
    let layout = JobLayout::new(2, 4, 2).unwrap();
    let (handle, mut workers) = setup(layout, 3);

    // Act
    let (job, payload) = workers[0].expect_job().await;
    workers[0].reply_sorted(job, payload).await;
    for worker in workers.iter_mut() {
        worker.expect_terminate().await;
    }
    let (dataset, report) = handle.await.unwrap().unwrap();

    // Assert
    assert_eq!(report.seeded, 1);
    assert_eq!(report.assignments, vec![Assignment { job: 0, worker: 1 }]);
    assert_eq!(report.drain_results, 1);
    assert_eq!(report.terminated, vec![1, 2, 3]);
    assert_eq!(dataset.row(1), Some(&[1, 2, 3, 4][..]));
}

#[tokio::test]
async fn test_result_with_invalid_tag_is_protocol_violation() {
    // Arrange
    let layout = JobLayout::new(8, 4, 2).unwrap();
    let (handle, mut workers) = setup(layout, 2);
    let (_, payload) = workers[0].expect_job().await;

    // Act
    workers[0]
        .transport
        .send(&payload, 3, COORDINATOR)
        .await
        .unwrap();
    let result = handle.await.unwrap();

    // Assert
    assert!(matches!(
        result,
        Err(SortError::ProtocolViolation { rank: 0, .. })
    ));
}

#[tokio::test]
async fn test_result_for_another_workers_job_is_protocol_violation() {
    // Arrange
    let layout = JobLayout::new(8, 4, 2).unwrap();
    let (handle, mut workers) = setup(layout, 2);
    let (_, payload) = workers[0].expect_job().await;
    let (job_b, _) = workers[1].expect_job().await;

    // Act
    workers[0].reply_sorted(job_b, payload).await;
    let result = handle.await.unwrap();

    // Assert
    assert!(result.unwrap_err().is_protocol_violation());
}

#[tokio::test]
async fn test_termination_tag_sent_to_coordinator_is_protocol_violation() {
    // Arrange
    let layout = JobLayout::new(8, 4, 2).unwrap();
    let (handle, mut workers) = setup(layout, 1);
    workers[0].expect_job().await;

    // Act
    workers[0]
        .transport
        .send(&[], layout.termination_tag(), COORDINATOR)
        .await
        .unwrap();
    let result = handle.await.unwrap();

    // Assert
    assert!(result.unwrap_err().is_protocol_violation());
}

#[tokio::test]
async fn test_dataset_shape_must_match_layout() {
    // Arrange
    let layout = JobLayout::new(8, 4, 2).unwrap();
    let mut transports = ChannelTransport::create_network(2, 4);
    let mut coordinator =
        Coordinator::new(transports.remove(0), layout, worker_ranks(1)).unwrap();
    let mut dataset = NumberArena::new(8, 5).unwrap();

    // Act
    let result = coordinator.run(&mut dataset).await;

    // Assert
    assert!(matches!(result, Err(SortError::Config { .. })));
}

#[tokio::test]
async fn test_invalid_worker_sets_rejected() {
    // Arrange
    let layout = JobLayout::new(8, 4, 2).unwrap();

    // Act & Assert
    let mut transports = ChannelTransport::create_network(3, 4);
    assert!(Coordinator::new(transports.remove(0), layout, vec![]).is_err());

    let mut transports = ChannelTransport::create_network(3, 4);
    assert!(Coordinator::new(transports.remove(0), layout, vec![1, 1]).is_err());

    let mut transports = ChannelTransport::create_network(3, 4);
    assert!(Coordinator::new(transports.remove(0), layout, vec![0, 1]).is_err());
}
