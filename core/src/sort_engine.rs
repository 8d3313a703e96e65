// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::arena::NumberArena;
use crate::error::{Result, SortError};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Default pool size, independent of payload size and worker count
pub const DEFAULT_SORT_THREADS: usize = 8;

/// Sorts every row of a batch independently on a dedicated Rayon pool.
///
/// Each row is handed to exactly one pool thread, so rows never observe one
/// another and their relative order is preserved.
pub struct SortEngine {
    pool: ThreadPool,
}

impl SortEngine {
    pub fn new(num_threads: usize) -> Result<Self> {
        if num_threads == 0 {
            return Err(SortError::config("sort pool needs at least one thread"));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("sort-{}", index))
            .build()
            .map_err(|e| SortError::allocation(num_threads, e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Sort each row of `batch` ascending, in place. Blocks until done.
    pub fn sort_rows(&self, batch: &mut NumberArena) {
        let columns = batch.columns();
        if columns == 0 {
            return;
        }
        let data = batch.as_mut_slice();
        self.pool.install(|| {
            data.par_chunks_exact_mut(columns)
                .for_each(|row| row.sort_unstable());
        });
    }
}
