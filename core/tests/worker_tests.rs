// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use chunk_sort_core::channel_transport::ChannelTransport;
use chunk_sort_core::job_layout::JobLayout;
use chunk_sort_core::message::{Envelope, WorkMessage};
use chunk_sort_core::sort_engine::SortEngine;
use chunk_sort_core::transport::Transport;
use chunk_sort_core::worker::{Worker, WorkerState};
use chunk_sort_core::SortError;
use tokio::sync::mpsc;

fn setup() -> (JobLayout, ChannelTransport, ChannelTransport) {
    let layout = JobLayout::new(8, 4, 2).unwrap();
    let mut transports = ChannelTransport::create_network(2, 4);
    let worker = transports.pop().unwrap();
    let coordinator = transports.pop().unwrap();
    (layout, coordinator, worker)
}

#[tokio::test]
async fn test_worker_reports_state_transitions() {
    // Arrange
    let (layout, mut coordinator, transport) = setup();
    let (observer, mut states) = mpsc::unbounded_channel();
    let worker = Worker::new(transport, layout, SortEngine::new(1).unwrap())
        .unwrap()
        .with_state_observer(observer);
    assert_eq!(worker.rank(), 1);
    let handle = tokio::spawn(worker.run());

    // Act
    coordinator.send(&[8, 7, 6, 5, 4, 3, 2, 1], 2, 1).await.unwrap();
    let envelope = coordinator.probe_any().await.unwrap();
    let mut result = [0; 8];
    coordinator.receive_from(envelope, &mut result).await.unwrap();
    coordinator.send(&[], layout.termination_tag(), 1).await.unwrap();
    handle.await.unwrap().unwrap();

    // Assert
    let mut seen = Vec::new();
    while let Some(state) = states.recv().await {
        seen.push(state);
    }
    assert_eq!(
        seen,
        vec![
            WorkerState::Idle,
            WorkerState::Receiving,
            WorkerState::Sorting,
            WorkerState::Sending,
            WorkerState::Idle,
            WorkerState::Receiving,
            WorkerState::Terminated,
        ]
    );
}

#[tokio::test]
async fn test_worker_returns_sorted_chunk_with_same_tag() {
    // Arrange
    let (layout, mut coordinator, transport) = setup();
    let worker = Worker::new(transport, layout, SortEngine::new(2).unwrap()).unwrap();
    let handle = tokio::spawn(worker.run());

    // Act
    coordinator
        .send(&[4, 3, 2, 1, 8, 6, 7, 5], 6, 1)
        .await
        .unwrap();
    let envelope = coordinator.probe_any().await.unwrap();
    let mut result = [0; 8];
    coordinator.receive_from(envelope, &mut result).await.unwrap();
    coordinator
        .send(&[], layout.encode(WorkMessage::Terminate), 1)
        .await
        .unwrap();
    let summary = handle.await.unwrap().unwrap();

    // Assert
    assert_eq!(envelope, Envelope::new(1, 6));
    assert_eq!(result, [1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(summary.jobs, vec![6]);
}

#[tokio::test]
async fn test_worker_exits_on_termination_without_work() {
    // Arrange
    let (layout, mut coordinator, transport) = setup();
    let worker = Worker::new(transport, layout, SortEngine::new(1).unwrap()).unwrap();
    coordinator
        .send(&[], layout.termination_tag(), 1)
        .await
        .unwrap();

    // Act
    let summary = worker.run().await.unwrap();

    // Assert
    assert_eq!(summary.rank, 1);
    assert_eq!(summary.chunks_sorted(), 0);
}

#[tokio::test]
async fn test_worker_processes_chunks_one_at_a_time() {
    // Arrange
    let (layout, mut coordinator, transport) = setup();
    let worker = Worker::new(transport, layout, SortEngine::new(2).unwrap()).unwrap();
    let handle = tokio::spawn(worker.run());

    // Act
    let mut results = Vec::new();
    for job in [0u32, 2, 4] {
        coordinator.send(&[2, 1, 0, -1, 9, 8, 7, 6], job, 1).await.unwrap();
        let envelope = coordinator.probe_from(1).await.unwrap();
        let mut result = [0; 8];
        coordinator.receive_from(envelope, &mut result).await.unwrap();
        results.push((envelope.tag, result));
    }
    coordinator.send(&[], layout.termination_tag(), 1).await.unwrap();
    let summary = handle.await.unwrap().unwrap();

    // Assert
    assert_eq!(summary.jobs, vec![0, 2, 4]);
    for (tag, result) in results {
        assert!(tag % 2 == 0);
        assert_eq!(result, [-1, 0, 1, 2, 6, 7, 8, 9]);
    }
}

#[tokio::test]
async fn test_worker_rejects_unknown_tag() {
    // Arrange
    let (layout, mut coordinator, transport) = setup();
    let worker = Worker::new(transport, layout, SortEngine::new(1).unwrap()).unwrap();
    coordinator.send(&[0; 8], 3, 1).await.unwrap();

    // Act
    let result = worker.run().await;

    // Assert
    assert!(matches!(result, Err(SortError::ProtocolViolation { rank: 1, .. })));
}

#[tokio::test]
async fn test_worker_rejects_short_payload() {
    // Arrange
    let (layout, mut coordinator, transport) = setup();
    let worker = Worker::new(transport, layout, SortEngine::new(1).unwrap()).unwrap();
    coordinator.send(&[1, 2, 3], 0, 1).await.unwrap();

    // Act
    let result = worker.run().await;

    // Assert
    assert!(result.unwrap_err().is_protocol_violation());
}

#[tokio::test]
async fn test_worker_accepts_termination_with_payload() {
    // Arrange
    let (layout, mut coordinator, transport) = setup();
    let worker = Worker::new(transport, layout, SortEngine::new(1).unwrap()).unwrap();
    coordinator
        .send(&[1], layout.termination_tag(), 1)
        .await
        .unwrap();

    // Act
    let summary = worker.run().await.unwrap();

    // Assert
    assert_eq!(summary.rank, 1);
    assert!(summary.jobs.is_empty());
}

#[tokio::test]
async fn test_worker_rejects_message_from_other_worker() {
    // Arrange
    let layout = JobLayout::new(8, 4, 2).unwrap();
    let mut transports = ChannelTransport::create_network(3, 4);
    let mut other = transports.pop().unwrap();
    let transport = transports.pop().unwrap();
    let _coordinator = transports.pop().unwrap();
    let worker = Worker::new(transport, layout, SortEngine::new(1).unwrap()).unwrap();
    other.send(&[0; 8], 0, 1).await.unwrap();

    // Act
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), worker.run())
        .await
        .expect("worker should fail instead of waiting");

    // Assert
    assert!(matches!(result, Err(SortError::ProtocolViolation { rank: 1, .. })));
}
