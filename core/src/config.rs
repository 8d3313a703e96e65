// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::dataset::DatasetKind;
use crate::error::{Result, SortError};
use crate::job_layout::JobLayout;
use crate::sort_engine::DEFAULT_SORT_THREADS;
use crate::Rank;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of arrays in the dataset (A)
    pub total_arrays: usize,
    /// Elements per array (L)
    pub array_length: usize,
    /// Arrays per chunk (P)
    pub payload_size: usize,
    /// Number of worker ranks (W)
    pub num_workers: usize,
    /// Threads in each worker's sort pool
    #[serde(default = "default_sort_threads")]
    pub sort_threads: usize,
    #[serde(default)]
    pub dataset: DatasetKind,
    /// Seed for the random dataset; a fresh seed is drawn when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Capacity of each rank's inbound channel
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,
    /// First TCP port for the socket transport (0 = ephemeral ports)
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    /// Worker rank that sleeps after every chunk
    #[serde(default)]
    pub straggler_rank: Option<Rank>,
    #[serde(default)]
    pub straggler_delay_ms: u64,
}

fn default_sort_threads() -> usize {
    DEFAULT_SORT_THREADS
}

fn default_channel_buffer() -> usize {
    16
}

fn default_base_port() -> u16 {
    9300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            total_arrays: 1_000,
            array_length: 10_000,
            payload_size: 8,
            num_workers: 4,
            sort_threads: DEFAULT_SORT_THREADS,
            dataset: DatasetKind::Descending,
            seed: None,
            channel_buffer: default_channel_buffer(),
            base_port: default_base_port(),
            straggler_rank: None,
            straggler_delay_ms: 0,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            SortError::config_with_source(format!("cannot read {}", path.display()), e)
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            SortError::config_with_source(format!("cannot parse {}", path.display()), e)
        })
    }

    /// Load `path`, or fall back to the defaults when the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::metadata(path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            _ => Self::load(path),
        }
    }

    /// Check the run parameters and derive the chunk layout
    pub fn validate(&self) -> Result<JobLayout> {
        if self.num_workers == 0 {
            return Err(SortError::config("at least one worker is required"));
        }
        if self.sort_threads == 0 {
            return Err(SortError::config("sort_threads must be at least 1"));
        }

        let layout = JobLayout::new(self.total_arrays, self.array_length, self.payload_size)?;
        if layout.num_jobs() < self.num_workers {
            warn!(
                jobs = layout.num_jobs(),
                workers = self.num_workers,
                "fewer chunks than workers"
            );
        }
        Ok(layout)
    }

    pub fn straggle_delay_for(&self, rank: Rank) -> Option<Duration> {
        match self.straggler_rank {
            Some(straggler) if straggler == rank && self.straggler_delay_ms > 0 => {
                Some(Duration::from_millis(self.straggler_delay_ms))
            }
            _ => None,
        }
    }

    pub fn print_summary(&self) {
        println!("Configuration:");
        println!("  - Arrays: {}", self.total_arrays);
        println!("  - Numbers per array: {}", self.array_length);
        println!("  - Arrays per chunk: {}", self.payload_size);
        println!("  - Workers: {}", self.num_workers);
        println!("  - Sort threads per worker: {}", self.sort_threads);
        println!("  - Dataset: {:?}", self.dataset);
        if let Some(rank) = self.straggler_rank {
            println!(
                "  - Straggler: worker {} (+{}ms per chunk)",
                rank, self.straggler_delay_ms
            );
        }
    }
}
