// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::{Result, SortError};
use crate::message::{JobIndex, Tag, WorkMessage};

/// Dimensions of a run: A arrays of length L, split into chunks of P arrays.
///
/// The job index of a chunk is the index of its first array, so the valid
/// indices are the multiples of P in `[0, A)`. The termination tag is `A + 1`,
/// which can never collide with a job index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobLayout {
    total_arrays: usize,
    array_length: usize,
    payload_size: usize,
}

impl JobLayout {
    pub fn new(total_arrays: usize, array_length: usize, payload_size: usize) -> Result<Self> {
        if total_arrays == 0 || array_length == 0 || payload_size == 0 {
            return Err(SortError::config(format!(
                "dimensions must be non-zero (arrays={}, length={}, payload={})",
                total_arrays, array_length, payload_size
            )));
        }
        if total_arrays % payload_size != 0 {
            return Err(SortError::config(format!(
                "total arrays ({}) must be divisible by payload size ({})",
                total_arrays, payload_size
            )));
        }
        if total_arrays >= Tag::MAX as usize {
            return Err(SortError::config(format!(
                "total arrays ({}) does not fit the tag space",
                total_arrays
            )));
        }
        if total_arrays.checked_mul(array_length).is_none() {
            return Err(SortError::config("dataset size overflows usize"));
        }

        Ok(Self {
            total_arrays,
            array_length,
            payload_size,
        })
    }

    pub fn total_arrays(&self) -> usize {
        self.total_arrays
    }

    pub fn array_length(&self) -> usize {
        self.array_length
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Number of chunks (A / P)
    pub fn num_jobs(&self) -> usize {
        self.total_arrays / self.payload_size
    }

    /// Elements carried by one assignment or result (P * L)
    pub fn chunk_len(&self) -> usize {
        self.payload_size * self.array_length
    }

    /// Job indices in dispatch order
    pub fn job_indices(&self) -> impl Iterator<Item = JobIndex> {
        (0..self.total_arrays).step_by(self.payload_size)
    }

    pub fn termination_tag(&self) -> Tag {
        self.total_arrays as Tag + 1
    }

    pub fn encode(&self, message: WorkMessage) -> Tag {
        match message {
            WorkMessage::Assignment(job) => job as Tag,
            WorkMessage::Terminate => self.termination_tag(),
        }
    }

    /// Decode a raw tag, returning `None` for tags outside both ranges.
    pub fn decode(&self, tag: Tag) -> Option<WorkMessage> {
        if tag == self.termination_tag() {
            return Some(WorkMessage::Terminate);
        }
        let job = tag as usize;
        if job < self.total_arrays && job % self.payload_size == 0 {
            Some(WorkMessage::Assignment(job))
        } else {
            None
        }
    }
}
