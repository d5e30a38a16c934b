//! Message types exchanged between fragments
//!
//! A message addresses its target by global id; handles are fragment-local
//! and are resolved by the receiving fragment at delivery.

use serde::{Deserialize, Serialize};

use super::error::BspError;
use super::vertex::{FragmentId, Gid};

/// Trait bound for message payloads
pub trait MessagePayload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> MessagePayload for T {}

/// A vertex-state update addressed to the fragment owning `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<M> {
    pub target: Gid,
    pub payload: M,
}

impl<M> Message<M> {
    pub fn new(target: Gid, payload: M) -> Self {
        Self { target, payload }
    }
}

/// Flushed channel contents, bucketed by destination fragment
#[derive(Debug, Clone)]
pub struct Outbox<M> {
    buckets: Vec<Vec<Message<M>>>,
}

impl<M> Outbox<M> {
    /// Create an empty outbox for `fnum` destinations
    pub fn new(fnum: usize) -> Self {
        Self {
            buckets: (0..fnum).map(|_| Vec::new()).collect(),
        }
    }

    /// Number of destination fragments
    pub fn fnum(&self) -> usize {
        self.buckets.len()
    }

    /// Append a message for `destination`
    pub fn push(&mut self, destination: FragmentId, message: Message<M>) -> Result<(), BspError> {
        let fnum = self.buckets.len();
        self.buckets
            .get_mut(destination)
            .ok_or(BspError::UnknownFragment { fid: destination, fnum })?
            .push(message);
        Ok(())
    }

    /// Total message count
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Messages bound for `destination`
    pub fn bucket(&self, destination: FragmentId) -> &[Message<M>] {
        self.buckets.get(destination).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Consume into `(destination, messages)` pairs, skipping empty buckets
    pub fn into_buckets(self) -> impl Iterator<Item = (FragmentId, Vec<Message<M>>)> {
        self.buckets
            .into_iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_buckets() {
        let mut outbox = Outbox::new(3);
        outbox.push(2, Message::new(10, 1.5)).unwrap();
        outbox.push(2, Message::new(11, 0.5)).unwrap();
        outbox.push(0, Message::new(4, 9.0)).unwrap();

        assert_eq!(outbox.len(), 3);
        assert_eq!(outbox.bucket(2).len(), 2);
        assert!(outbox.bucket(1).is_empty());
        assert!(outbox.bucket(7).is_empty());

        let dests: Vec<_> = outbox.into_buckets().map(|(fid, msgs)| (fid, msgs.len())).collect();
        assert_eq!(dests, vec![(0, 1), (2, 2)]);
    }

    #[test]
    fn test_outbox_unknown_destination() {
        let mut outbox = Outbox::new(2);
        let err = outbox.push(2, Message::new(0, ())).unwrap_err();
        assert!(matches!(err, BspError::UnknownFragment { fid: 2, fnum: 2 }));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::new(42, 3.25f64);
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
