// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::arena::{NumberArena, RowFingerprint};
use crate::config::Config;
use crate::coordinator::RunReport;
use crate::dataset;
use crate::error::Result;
use crate::job_layout::JobLayout;
use crate::worker::WorkerSummary;
use crate::COORDINATOR;

pub fn generate_test_data(config: &Config, layout: &JobLayout) -> Result<NumberArena> {
    println!("\nPreparing arrays...");
    let data = dataset::generate(layout, config.dataset, config.seed)?;
    println!(
        "Generated {} arrays of {} numbers",
        data.rows(),
        data.columns()
    );
    Ok(data)
}

pub fn print_preview(dataset: &NumberArena) {
    println!("First 5 arrays:");
    for line in dataset.preview(COORDINATOR, 5) {
        println!("{}", line);
    }
}

/// True when every row is sorted and still holds the same multiset of values
pub fn verify(dataset: &NumberArena, before: &[RowFingerprint]) -> bool {
    dataset.is_sorted_rows() && dataset.fingerprints() == before
}

pub fn print_run_summary(report: &RunReport, summaries: &[WorkerSummary]) {
    println!("\n=== LOAD BALANCE ===");
    println!("  - Seeded workers: {}", report.seeded);
    println!("  - Results during dispatch: {}", report.dispatch_results);
    println!("  - Results during drain: {}", report.drain_results);
    for summary in summaries {
        println!(
            "  - Worker {}: {} chunks",
            summary.rank,
            summary.chunks_sorted()
        );
    }
    println!("  - Dispatch time: {:.2}s", report.elapsed.as_secs_f64());
}
