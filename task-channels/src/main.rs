// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use chunk_sort_core::channel_transport::ChannelTransport;
use chunk_sort_core::config::Config;
use chunk_sort_core::coordinator::{worker_ranks, Coordinator};
use chunk_sort_core::sort_engine::SortEngine;
use chunk_sort_core::transport::Transport;
use chunk_sort_core::utils::{generate_test_data, print_preview, print_run_summary, verify};
use chunk_sort_core::worker::Worker;
use chunk_sort_core::worker_runtime::{TokioRuntime, WorkerPool};
use chunk_sort_core::Result;
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Greedy chunk sort with workers as tokio tasks
#[derive(Parser, Debug)]
#[command(name = "chunk-sort-task-channels")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Override the number of workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("chunk sort failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool> {
    let start_time = Instant::now();

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(workers) = args.workers {
        config.num_workers = workers;
    }
    let layout = config.validate()?;

    println!("=== CHUNK SORT (Task-Channels) ===");
    config.print_summary();

    let mut dataset = generate_test_data(&config, &layout)?;
    print_preview(&dataset);
    let fingerprints = dataset.fingerprints();

    let mut transports =
        ChannelTransport::create_network(config.num_workers + 1, config.channel_buffer);
    let coordinator_transport = transports.remove(0);

    let mut pool = WorkerPool::<TokioRuntime>::new();
    for transport in transports {
        let rank = transport.rank();
        let worker = Worker::new(transport, layout, SortEngine::new(config.sort_threads)?)?
            .with_straggle_delay(config.straggle_delay_for(rank));
        pool.spawn(rank, move || worker.run());
    }

    println!("\n=== SORTING ===");
    println!("Distributing chunks to {} workers...", config.num_workers);
    let mut coordinator =
        Coordinator::new(coordinator_transport, layout, worker_ranks(config.num_workers))?;
    let report = coordinator.run(&mut dataset).await?;
    let summaries = pool.join_all().await?;
    println!("All workers terminated");

    println!("\n=== RESULTS ===");
    print_preview(&dataset);
    print_run_summary(&report, &summaries);

    let sorted = verify(&dataset, &fingerprints);
    println!(
        "\nVerification: {}",
        if sorted { "PASS" } else { "FAIL" }
    );

    println!("\n=== PROGRAM COMPLETE ===");
    println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(sorted)
}
