// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::Rank;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SortError {
    #[error("Allocation of {elements} elements failed: {message}")]
    Allocation { elements: usize, message: String },

    #[error("Transport error on rank {rank}: {message}")]
    Transport {
        rank: Rank,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Protocol violation on rank {rank}: {message}")]
    ProtocolViolation { rank: Rank, message: String },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Join error: {message}")]
    Join { message: String },
}

pub type Result<T> = std::result::Result<T, SortError>;

impl SortError {
    pub fn allocation(elements: usize, message: impl Into<String>) -> Self {
        Self::Allocation {
            elements,
            message: message.into(),
        }
    }

    pub fn transport(rank: Rank, message: impl Into<String>) -> Self {
        Self::Transport {
            rank,
            message: message.into(),
            source: None,
        }
    }

    pub fn transport_with_source(
        rank: Rank,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            rank,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn protocol(rank: Rank, message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            rank,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn join(message: impl Into<String>) -> Self {
        Self::Join {
            message: message.into(),
        }
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }
}

impl From<tokio::task::JoinError> for SortError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::join(err.to_string())
    }
}
