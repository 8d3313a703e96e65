// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::{Result, SortError};
use crate::mailbox::{Frame, Inbound, Mailbox};
use crate::message::{Envelope, Tag};
use crate::transport::Transport;
use crate::{Number, Rank};
use tokio::sync::mpsc::Sender;

/// In-process transport over tokio mpsc channels
pub struct ChannelTransport {
    mailbox: Mailbox,
    peers: Vec<Sender<Inbound>>,
}

impl ChannelTransport {
    /// Create a fully connected set of endpoints; element `i` has rank `i`.
    pub fn create_network(num_ranks: usize, buffer: usize) -> Vec<Self> {
        let (senders, mailboxes): (Vec<_>, Vec<_>) = (0..num_ranks)
            .map(|rank| Mailbox::channel(rank, buffer))
            .unzip();

        mailboxes
            .into_iter()
            .map(|mailbox| Self {
                mailbox,
                peers: senders.clone(),
            })
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.mailbox.pending()
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> Rank {
        self.mailbox.rank()
    }

    async fn send(&mut self, payload: &[Number], tag: Tag, destination: Rank) -> Result<()> {
        let rank = self.rank();
        let peer = self.peers.get(destination).ok_or_else(|| {
            SortError::transport(rank, format!("unknown destination rank {}", destination))
        })?;

        let frame = Frame {
            source: rank,
            tag,
            payload: payload.to_vec(),
        };
        peer.send(Ok(frame)).await.map_err(|_| {
            SortError::transport(rank, format!("rank {} is no longer receiving", destination))
        })
    }

    async fn probe_any(&mut self) -> Result<Envelope> {
        self.mailbox.probe_any().await
    }

    async fn probe_from(&mut self, source: Rank) -> Result<Envelope> {
        self.mailbox.probe_from(source).await
    }

    async fn receive_exact(&mut self, tag: Tag, source: Rank, buffer: &mut [Number]) -> Result<()> {
        self.mailbox.receive_exact(tag, source, buffer).await
    }

    async fn discard(&mut self, envelope: Envelope) -> Result<usize> {
        self.mailbox.discard(envelope.tag, envelope.source).await
    }
}
