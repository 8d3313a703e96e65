// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod arena;
pub mod channel_transport;
pub mod config;
pub mod coordinator;
pub mod dataset;
pub mod error;
pub mod job_layout;
pub mod mailbox;
pub mod message;
pub mod sort_engine;
pub mod transport;
pub mod utils;
pub mod worker;
pub mod worker_runtime;

pub use error::{Result, SortError};

/// Element type of every array in the dataset
pub type Number = i32;

/// Process identifier within a run
pub type Rank = usize;

/// Rank of the coordinator; workers occupy ranks 1..=W
pub const COORDINATOR: Rank = 0;
