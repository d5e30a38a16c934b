//! Message manager: channels out, inbound delivery in
//!
//! Per superstep the manager
//! 1. hands out one [`Channel`] per thread for outgoing updates,
//! 2. delivers the previous superstep's inbound messages through
//!    [`parallel_process`](MessageManager::parallel_process),
//! 3. is flushed by the worker into an [`Outbox`] for the transport,
//!    which also resets the `force_continue` override.

use std::mem;

use super::channel::Channel;
use super::error::BspError;
use super::fragment::Fragment;
use super::message::{Message, MessagePayload, Outbox};
use super::parallel::ParallelEngine;
use super::vertex::{FragmentId, Vertex};

/// Result of flushing the channels at a superstep boundary
#[derive(Debug)]
pub struct FlushSummary<M> {
    /// Messages to hand to the transport
    pub outbox: Outbox<M>,
    /// Whether `force_continue` was requested during the superstep
    pub force_continue: bool,
    /// Messages sent during the superstep
    pub sent: usize,
}

impl<M> FlushSummary<M> {
    /// Whether this fragment has a reason to keep going regardless of its frontier
    pub fn wants_continue(&self) -> bool {
        self.force_continue || self.sent > 0
    }
}

/// Owns the per-thread channels and the inbound set of one fragment
#[derive(Debug)]
pub struct MessageManager<M> {
    fid: FragmentId,
    fnum: usize,
    channels: Vec<Channel<M>>,
    inbound: Vec<Message<M>>,
    force_continue: bool,
    sent_total: usize,
    received_total: usize,
}

impl<M: MessagePayload> MessageManager<M> {
    pub fn new(fid: FragmentId, fnum: usize) -> Self {
        Self {
            fid,
            fnum,
            channels: Vec::new(),
            inbound: Vec::new(),
            force_continue: false,
            sent_total: 0,
            received_total: 0,
        }
    }

    /// Allocate one channel per thread. Existing buffered messages are dropped.
    pub fn init_channels(&mut self, thread_num: usize) {
        self.channels = (0..thread_num.max(1)).map(|_| Channel::new()).collect();
    }

    pub fn channels(&self) -> &[Channel<M>] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Channel<M>] {
        &mut self.channels
    }

    /// Channel `index`, normally the calling thread's id
    pub fn channel(&mut self, index: usize) -> Result<&mut Channel<M>, BspError> {
        let count = self.channels.len();
        self.channels
            .get_mut(index)
            .ok_or(BspError::ChannelIndexOutOfRange { index, count })
    }

    /// Require at least one more superstep even if the frontier is empty
    pub fn force_continue(&mut self) {
        self.force_continue = true;
    }

    pub fn force_continue_requested(&self) -> bool {
        self.force_continue
    }

    /// Messages waiting for `parallel_process` this superstep
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Deliver every inbound message of this superstep.
    ///
    /// The inbound set is split into one contiguous chunk per thread and
    /// `callback(tid, v, payload)` runs once per message. `v` is the local
    /// handle of the target, which must be owned by `fragment`. There is no
    /// ordering or deduplication across messages for the same vertex: the
    /// callback merges. Returns the number of messages processed.
    pub fn parallel_process<F, C>(
        &mut self,
        engine: &ParallelEngine,
        fragment: &F,
        callback: C,
    ) -> Result<usize, BspError>
    where
        F: Fragment,
        C: Fn(usize, Vertex, M) -> Result<(), BspError> + Sync,
    {
        let inbound = mem::take(&mut self.inbound);
        let count = inbound.len();
        let fid = fragment.fid();

        engine.for_each_item(inbound, |tid, message| {
            let v = fragment
                .inner_vertex(message.target)
                .ok_or_else(|| BspError::target_not_owned(fid, message.target))?;
            callback(tid, v, message.payload)
        })?;

        Ok(count)
    }

    /// Drain every channel into an outbox and reset the per-superstep flag
    pub fn flush(&mut self) -> Result<FlushSummary<M>, BspError> {
        let mut outbox = Outbox::new(self.fnum);
        let mut sent = 0;
        for channel in &mut self.channels {
            sent += channel.drain_into(&mut outbox)?;
        }
        self.sent_total += sent;

        let force_continue = mem::take(&mut self.force_continue);
        tracing::trace!(fid = self.fid, sent, force_continue, "Flushed channels");

        Ok(FlushSummary {
            outbox,
            force_continue,
            sent,
        })
    }

    /// Install the messages received for the next superstep.
    ///
    /// Fails if the previous set was never passed through `parallel_process`;
    /// replacing it would lose those updates.
    pub fn deliver(&mut self, inbound: Vec<Message<M>>) -> Result<(), BspError> {
        if !self.inbound.is_empty() {
            return Err(BspError::UnprocessedMessages {
                fid: self.fid,
                count: self.inbound.len(),
            });
        }
        self.received_total += inbound.len();
        self.inbound = inbound;
        Ok(())
    }

    /// Messages sent over the whole run
    pub fn messages_sent(&self) -> usize {
        self.sent_total
    }

    /// Messages received over the whole run
    pub fn messages_received(&self) -> usize {
        self.received_total
    }
}
