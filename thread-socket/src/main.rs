// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use chunk_sort_core::config::Config;
use chunk_sort_core::utils::{generate_test_data, print_preview, print_run_summary, verify};
use chunk_sort_core::Result;
use chunk_sort_thread_socket::cluster::run_cluster;
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Greedy chunk sort with workers as threads talking over TCP
#[derive(Parser, Debug)]
#[command(name = "chunk-sort-thread-socket")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Override the number of workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Override the first listening port (0 = ephemeral)
    #[arg(long)]
    base_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("chunk sort failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let start_time = Instant::now();

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(workers) = args.workers {
        config.num_workers = workers;
    }
    if let Some(base_port) = args.base_port {
        config.base_port = base_port;
    }
    let layout = config.validate()?;

    println!("=== CHUNK SORT (Thread-Socket) ===");
    config.print_summary();
    println!("  - Base port: {}", config.base_port);

    let dataset = generate_test_data(&config, &layout)?;
    print_preview(&dataset);
    let fingerprints = dataset.fingerprints();

    println!("\n=== SORTING ===");
    println!("Distributing chunks to {} worker threads...", config.num_workers);
    let run = run_cluster(&config, layout, dataset)?;
    println!("All workers terminated");

    println!("\n=== RESULTS ===");
    print_preview(&run.dataset);
    print_run_summary(&run.report, &run.workers);

    let sorted = verify(&run.dataset, &fingerprints);
    println!(
        "\nVerification: {}",
        if sorted { "PASS" } else { "FAIL" }
    );

    println!("\n=== PROGRAM COMPLETE ===");
    println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(sorted)
}
