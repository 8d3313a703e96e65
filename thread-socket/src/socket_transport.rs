// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::frame_codec::{frame_limit, read_frame, write_frame};
use chunk_sort_core::mailbox::{Frame, Inbound, Mailbox};
use chunk_sort_core::message::{Envelope, Tag};
use chunk_sort_core::transport::Transport;
use chunk_sort_core::{Number, Rank, Result, SortError};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::Sender;
use tokio::task::{self, JoinHandle};
use tracing::{debug, warn};

/// TCP transport: one listener per rank, one persistent outbound connection
/// per destination, so frames to a peer arrive in send order.
pub struct SocketTransport {
    mailbox: Mailbox,
    peers: Vec<SocketAddr>,
    connections: HashMap<Rank, TcpStream>,
    listener_task: JoinHandle<()>,
}

impl SocketTransport {
    /// Take over a bound listener. `peers[r]` is the address of rank `r`.
    /// Inbound frames carrying more than `max_payload` numbers are refused.
    /// Must be called from within a tokio runtime.
    pub fn from_std(
        rank: Rank,
        listener: std::net::TcpListener,
        peers: Vec<SocketAddr>,
        buffer: usize,
        max_payload: usize,
    ) -> Result<Self> {
        listener
            .set_nonblocking(true)
            .map_err(|e| SortError::transport_with_source(rank, "cannot set nonblocking", e))?;
        let listener = TcpListener::from_std(listener)
            .map_err(|e| SortError::transport_with_source(rank, "cannot register listener", e))?;

        let (tx, mailbox) = Mailbox::channel(rank, buffer);
        let listener_task = task::spawn(accept_loop(rank, listener, tx, frame_limit(max_payload)));

        Ok(Self {
            mailbox,
            peers,
            connections: HashMap::new(),
            listener_task,
        })
    }

    async fn connection(&mut self, destination: Rank) -> Result<&mut TcpStream> {
        let rank = self.rank();
        if !self.connections.contains_key(&destination) {
            let addr = *self.peers.get(destination).ok_or_else(|| {
                SortError::transport(rank, format!("unknown destination rank {}", destination))
            })?;
            let stream = TcpStream::connect(addr).await.map_err(|e| {
                SortError::transport_with_source(rank, format!("cannot connect to {}", addr), e)
            })?;
            stream
                .set_nodelay(true)
                .map_err(|e| SortError::transport_with_source(rank, "cannot set nodelay", e))?;
            debug!(rank, destination, %addr, "connected");
            self.connections.insert(destination, stream);
        }

        self.connections.get_mut(&destination).ok_or_else(|| {
            SortError::transport(rank, format!("no connection to rank {}", destination))
        })
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.listener_task.abort();
    }
}

impl Transport for SocketTransport {
    fn rank(&self) -> Rank {
        self.mailbox.rank()
    }

    async fn send(&mut self, payload: &[Number], tag: Tag, destination: Rank) -> Result<()> {
        let rank = self.rank();
        let frame = Frame {
            source: rank,
            tag,
            payload: payload.to_vec(),
        };
        let stream = self.connection(destination).await?;
        write_frame(rank, stream, &frame).await
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

async fn accept_loop(rank: Rank, listener: TcpListener, tx: Sender<Inbound>, max_len: usize) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(rank, %peer, "accepted connection");
                task::spawn(read_loop(rank, stream, tx.clone(), max_len));
            }
            Err(e) => {
                warn!(rank, error = %e, "accept failed");
                let _ = tx
                    .send(Err(SortError::transport_with_source(rank, "accept failed", e)))
                    .await;
                return;
            }
        }
    }
}

async fn read_loop(rank: Rank, mut stream: TcpStream, tx: Sender<Inbound>, max_len: usize) {
    loop {
        match read_frame(rank, &mut stream, max_len).await {
            Ok(Some(frame)) => {
                if tx.send(Ok(frame)).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
}
