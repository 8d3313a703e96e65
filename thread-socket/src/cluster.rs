// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::socket_transport::SocketTransport;
use crate::thread_runtime::ThreadRuntime;
use chunk_sort_core::arena::NumberArena;
use chunk_sort_core::config::Config;
use chunk_sort_core::coordinator::{worker_ranks, Coordinator, RunReport};
use chunk_sort_core::job_layout::JobLayout;
use chunk_sort_core::sort_engine::SortEngine;
use chunk_sort_core::worker::{Worker, WorkerSummary};
use chunk_sort_core::worker_runtime::WorkerPool;
use chunk_sort_core::{Rank, Result, SortError, COORDINATOR};
use std::net::{SocketAddr, TcpListener};
use tracing::info;

/// Outcome of a run over sockets
pub struct ClusterRun {
    pub dataset: NumberArena,
    pub report: RunReport,
    pub workers: Vec<WorkerSummary>,
}

/// Bind one loopback listener per rank, on `base_port + rank`, or on
/// ephemeral ports when `base_port` is 0.
pub fn bind_listeners(
    num_ranks: usize,
    base_port: u16,
) -> Result<(Vec<TcpListener>, Vec<SocketAddr>)> {
    let mut listeners = Vec::with_capacity(num_ranks);
    let mut addrs = Vec::with_capacity(num_ranks);

    for rank in 0..num_ranks {
        let port = if base_port == 0 {
            0
        } else {
            u16::try_from(rank)
                .ok()
                .and_then(|offset| base_port.checked_add(offset))
                .ok_or_else(|| SortError::config(format!("no port left for rank {}", rank)))?
        };

        let listener = TcpListener::bind(("127.0.0.1", port)).map_err(|e| {
            SortError::transport_with_source(rank, format!("cannot bind port {}", port), e)
        })?;
        let addr = listener
            .local_addr()
            .map_err(|e| SortError::transport_with_source(rank, "cannot read local address", e))?;
        listeners.push(listener);
        addrs.push(addr);
    }

    Ok((listeners, addrs))
}

/// Run the coordinator on the calling thread and every worker on its own
/// thread, all talking over TCP on the loopback interface.
pub fn run_cluster(config: &Config, layout: JobLayout, dataset: NumberArena) -> Result<ClusterRun> {
    let (mut listeners, peers) = bind_listeners(config.num_workers + 1, config.base_port)?;
    let coordinator_listener = listeners.remove(0);

    let mut pool = WorkerPool::<ThreadRuntime>::new();
    for (index, listener) in listeners.into_iter().enumerate() {
        let rank: Rank = index + 1;
        let peers = peers.clone();
        let buffer = config.channel_buffer;
        let delay = config.straggle_delay_for(rank);
        let engine = SortEngine::new(config.sort_threads)?;

        pool.spawn(rank, move || async move {
            let transport = SocketTransport::from_std(rank, listener, peers, buffer, layout.chunk_len())?;
            Worker::new(transport, layout, engine)?
                .with_straggle_delay(delay)
                .run()
                .await
        });
    }
    info!(workers = pool.len(), "worker threads started");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| SortError::allocation(0, format!("coordinator runtime: {}", e)))?;

    runtime.block_on(async move {
        let mut dataset = dataset;
        let transport = SocketTransport::from_std(
            COORDINATOR,
            coordinator_listener,
            peers,
            config.channel_buffer,
            layout.chunk_len(),
        )?;
        let mut coordinator = Coordinator::new(transport, layout, worker_ranks(config.num_workers))?;

        let report = coordinator.run(&mut dataset).await?;
        let workers = pool.join_all().await?;

        Ok(ClusterRun {
            dataset,
            report,
            workers,
        })
    })
}
