//! Per-thread outgoing message buffers
//!
//! Each thread appends only to its own channel during a superstep, so no
//! synchronisation is needed on `send`. The message manager drains every
//! channel at the superstep boundary.

use super::error::BspError;
use super::fragment::Fragment;
use super::message::{Message, Outbox};
use super::vertex::{FragmentId, Gid, Vertex};

/// Ordered buffer of `(destination, message)` pairs written by one thread
#[derive(Debug, Clone)]
pub struct Channel<M> {
    entries: Vec<(FragmentId, Message<M>)>,
}

impl<M> Default for Channel<M> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<M> Channel<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message for vertex `target` owned by `destination`
    pub fn send(&mut self, destination: FragmentId, target: Gid, payload: M) {
        self.entries.push((destination, Message::new(target, payload)));
    }

    /// Send the new value of outer vertex `v` to the fragment that owns it
    pub fn sync_state_on_outer_vertex<F: Fragment>(
        &mut self,
        fragment: &F,
        v: Vertex,
        payload: M,
    ) -> Result<(), BspError> {
        if !fragment.is_outer(v) {
            return Err(BspError::NotOuterVertex(v));
        }
        let (owner, gid) = fragment
            .owner(v)
            .zip(fragment.gid(v))
            .ok_or(BspError::NotOuterVertex(v))?;
        self.send(owner, gid, payload);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffered entries in append order
    pub fn entries(&self) -> &[(FragmentId, Message<M>)] {
        &self.entries
    }

    /// Move every buffered message into `outbox`, leaving the channel empty.
    /// Returns the number of messages moved.
    pub fn drain_into(&mut self, outbox: &mut Outbox<M>) -> Result<usize, BspError> {
        let count = self.entries.len();
        for (destination, message) in self.entries.drain(..) {
            outbox.push(destination, message)?;
        }
        Ok(count)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
