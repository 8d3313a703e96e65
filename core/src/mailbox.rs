// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::{Result, SortError};
use crate::message::{Envelope, Tag};
use crate::{Number, Rank};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::mpsc::{self, Receiver, Sender};

/// A message in flight: envelope plus payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub source: Rank,
    pub tag: Tag,
    pub payload: Vec<Number>,
}

impl Frame {
    pub fn envelope(&self) -> Envelope {
        Envelope::new(self.source, self.tag)
    }
}

/// What a delivery mechanism pushes into a mailbox; an error is surfaced to
/// the next probe or receive
pub type Inbound = Result<Frame>;

/// Receive side shared by all transports.
///
/// Frames arrive through an mpsc channel and are parked in a pending queue,
/// so a probe can inspect envelopes without consuming them and a receive can
/// take a specific `(tag, source)` out of order.
pub struct Mailbox {
    rank: Rank,
    inbound: Receiver<Inbound>,
    pending: VecDeque<Frame>,
}

impl Mailbox {
    pub fn channel(rank: Rank, buffer: usize) -> (Sender<Inbound>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let mailbox = Self {
            rank,
            inbound: rx,
            pending: VecDeque::new(),
        };
        (tx, mailbox)
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of frames received but not yet consumed
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn pull(&mut self) -> Result<()> {
        match self.inbound.recv().await {
            Some(Ok(frame)) => {
                self.pending.push_back(frame);
                Ok(())
            }
            Some(Err(e)) => Err(e),
            None => Err(SortError::transport(self.rank, "inbound channel closed")),
        }
    }

    pub async fn probe_any(&mut self) -> Result<Envelope> {
        loop {
            if let Some(frame) = self.pending.front() {
                return Ok(frame.envelope());
            }
            self.pull().await?;
        }
    }

    pub async fn probe_from(&mut self, source: Rank) -> Result<Envelope> {
        loop {
            if let Some(frame) = self.pending.iter().find(|frame| frame.source == source) {
                return Ok(frame.envelope());
            }
            self.pull().await?;
        }
    }

    async fn take(&mut self, tag: Tag, source: Rank) -> Result<Frame> {
        loop {
            if let Some(pos) = self
                .pending
                .iter()
                .position(|frame| frame.source == source && frame.tag == tag)
            {
                if let Some(frame) = self.pending.remove(pos) {
                    return Ok(frame);
                }
            }
            self.pull().await?;
        }
    }

    pub async fn receive_exact(
        &mut self,
        tag: Tag,
        source: Rank,
        buffer: &mut [Number],
    ) -> Result<()> {
        let frame = self.take(tag, source).await?;

        if frame.payload.len() != buffer.len() {
            return Err(SortError::protocol(
                self.rank,
                format!(
                    "message from rank {} with tag {} carries {} elements, expected {}",
                    source,
                    tag,
                    frame.payload.len(),
                    buffer.len()
                ),
            ));
        }
        buffer.copy_from_slice(&frame.payload);
        Ok(())
    }

    /// Consume the first message from `source` carrying `tag`, whatever its
    /// payload. Returns how many elements were dropped.
    pub async fn discard(&mut self, tag: Tag, source: Rank) -> Result<usize> {
        let frame = self.take(tag, source).await?;
        Ok(frame.payload.len())
    }
}
