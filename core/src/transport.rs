// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::Result;
use crate::message::{Envelope, Tag};
use crate::{Number, Rank};
use std::future::Future;

/// Point-to-point messaging between ranks.
///
/// Implementations deliver every sent message exactly once to a matching
/// receive, and keep messages from one source to one destination in order.
/// Any error is fatal to the caller; nothing is retried.
pub trait Transport: Send {
    /// Rank of this endpoint
    fn rank(&self) -> Rank;

    /// Send `payload` to `destination` under `tag`
    fn send(
        &mut self,
        payload: &[Number],
        tag: Tag,
        destination: Rank,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Wait until a message from any source is pending and return its
    /// envelope without consuming the payload
    fn probe_any(&mut self) -> impl Future<Output = Result<Envelope>> + Send;

    /// Same as `probe_any`, restricted to messages from `source`
    fn probe_from(&mut self, source: Rank) -> impl Future<Output = Result<Envelope>> + Send;

    /// Wait for the first message from `source` carrying `tag` and copy its
    /// payload into `buffer`, which must match the payload length exactly
    fn receive_exact(
        &mut self,
        tag: Tag,
        source: Rank,
        buffer: &mut [Number],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Consume a probed message without reading its payload; returns the
    /// payload length
    fn discard(&mut self, envelope: Envelope) -> impl Future<Output = Result<usize>> + Send;

    /// Consume a message whose envelope was learned by a probe
    fn receive_from(
        &mut self,
        envelope: Envelope,
        buffer: &mut [Number],
    ) -> impl Future<Output = Result<()>> + Send {
        self.receive_exact(envelope.tag, envelope.source, buffer)
    }
}
