// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::Rank;

/// Raw message tag as carried on the wire
pub type Tag = u32;

/// Index of the first array of a chunk
pub type JobIndex = usize;

/// Message types exchanged between coordinator and workers, decoded from a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkMessage {
    /// Chunk assignment (coordinator to worker) or its result (worker to coordinator)
    Assignment(JobIndex),
    /// Reserved tag telling a worker to leave its receive loop
    Terminate,
}

/// Tag and source of a pending message, known before its payload is consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Envelope {
    pub source: Rank,
    pub tag: Tag,
}

impl Envelope {
    pub fn new(source: Rank, tag: Tag) -> Self {
        Self { source, tag }
    }
}
