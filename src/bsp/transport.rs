//! Cross-fragment message exchange and convergence vote
//!
//! A [`Transport`] is the only point where fragments synchronise. Both
//! operations are collective: every fragment of the group must call them the
//! same number of times, in the same order.
//!
//! [`LocalTransport`] connects fragments running on threads of one process.

use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Barrier, Mutex};

use super::error::BspError;
use super::message::{Message, MessagePayload, Outbox};
use super::vertex::FragmentId;

/// Collective exchange between the fragments of one run
#[async_trait]
pub trait Transport<M: MessagePayload>: Send + Sync {
    /// Id of the calling fragment
    fn fid(&self) -> FragmentId;

    /// Number of fragments in the group
    fn fnum(&self) -> usize;

    /// Send `outbox` and return every message addressed to this fragment.
    ///
    /// Messages sent in round `k` are returned by round `k` on the receiver,
    /// never earlier and never later.
    async fn exchange(&self, outbox: Outbox<M>) -> Result<Vec<Message<M>>, BspError>;

    /// Global OR of every fragment's local `continue` vote
    async fn any_continue(&self, local: bool) -> Result<bool, BspError>;
}

struct Shared<M> {
    fnum: usize,
    mailboxes: Vec<Mutex<Vec<Message<M>>>>,
    votes: AtomicUsize,
    barrier: Barrier,
}

/// In-process transport backed by shared mailboxes and a barrier
pub struct LocalTransport<M> {
    fid: FragmentId,
    shared: Arc<Shared<M>>,
}

impl<M> std::fmt::Debug for LocalTransport<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("fid", &self.fid)
            .field("fnum", &self.shared.fnum)
            .finish()
    }
}

impl<M: MessagePayload> LocalTransport<M> {
    /// Create connected endpoints for fragments `0..fnum`, indexed by fid.
    /// An empty group has no endpoints.
    pub fn group(fnum: usize) -> Vec<Self> {
        if fnum == 0 {
            return Vec::new();
        }
        let shared = Arc::new(Shared {
            fnum,
            mailboxes: (0..fnum).map(|_| Mutex::new(Vec::new())).collect(),
            votes: AtomicUsize::new(0),
            barrier: Barrier::new(fnum),
        });
        (0..fnum)
            .map(|fid| Self {
                fid,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

#[async_trait]
impl<M: MessagePayload> Transport<M> for LocalTransport<M> {
    fn fid(&self) -> FragmentId {
        self.fid
    }

    fn fnum(&self) -> usize {
        self.shared.fnum
    }

    async fn exchange(&self, outbox: Outbox<M>) -> Result<Vec<Message<M>>, BspError> {
        if outbox.fnum() != self.shared.fnum {
            return Err(BspError::transport(format!(
                "outbox addresses {} fragments, group has {}",
                outbox.fnum(),
                self.shared.fnum
            )));
        }

        for (destination, messages) in outbox.into_buckets() {
            self.shared.mailboxes[destination].lock().await.extend(messages);
        }

        // every write of this round is in place
        self.shared.barrier.wait().await;
        let inbound = mem::take(&mut *self.shared.mailboxes[self.fid].lock().await);
        // no write of the next round before every read of this one
        self.shared.barrier.wait().await;

        tracing::trace!(fid = self.fid, received = inbound.len(), "Exchange complete");
        Ok(inbound)
    }

    async fn any_continue(&self, local: bool) -> Result<bool, BspError> {
        if local {
            self.shared.votes.fetch_add(1, Ordering::AcqRel);
        }
        self.shared.barrier.wait().await;
        let any = self.shared.votes.load(Ordering::Acquire) > 0;
        if self.shared.barrier.wait().await.is_leader() {
            self.shared.votes.store(0, Ordering::Release);
        }
        self.shared.barrier.wait().await;
        Ok(any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::try_join_all;
    use tokio_test::{assert_pending, assert_ready_ok, task};

    fn outbox(fnum: usize, sends: &[(FragmentId, u64, u32)]) -> Outbox<u32> {
        let mut outbox = Outbox::new(fnum);
        for &(dest, target, payload) in sends {
            outbox.push(dest, Message::new(target, payload)).unwrap();
        }
        outbox
    }

    #[tokio::test]
    async fn test_exchange_routes_by_destination() {
        let group = LocalTransport::<u32>::group(3);
        let outboxes = vec![
            outbox(3, &[(1, 10, 1), (2, 20, 2)]),
            outbox(3, &[(2, 21, 3)]),
            outbox(3, &[(0, 0, 4), (1, 11, 5)]),
        ];

        let results = try_join_all(
            group
                .iter()
                .zip(outboxes)
                .map(|(transport, outbox)| transport.exchange(outbox)),
        )
        .await
        .unwrap();

        let payloads: Vec<Vec<u32>> = results
            .into_iter()
            .map(|msgs| {
                let mut p: Vec<u32> = msgs.into_iter().map(|m| m.payload).collect();
                p.sort();
                p
            })
            .collect();
        assert_eq!(payloads, vec![vec![4], vec![1, 5], vec![2, 3]]);
    }

    #[tokio::test]
    async fn test_round_messages_not_seen_early_or_twice() {
        let group = LocalTransport::<u32>::group(2);

        let round1 = try_join_all([
            group[0].exchange(outbox(2, &[(1, 5, 100)])),
            group[1].exchange(outbox(2, &[])),
        ])
        .await
        .unwrap();
        assert!(round1[0].is_empty());
        assert_eq!(round1[1], vec![Message::new(5, 100)]);

        let round2 = try_join_all([
            group[0].exchange(outbox(2, &[])),
            group[1].exchange(outbox(2, &[])),
        ])
        .await
        .unwrap();
        assert!(round2.iter().all(Vec::is_empty));
    }

    #[tokio::test]
    async fn test_any_continue_is_global_or() {
        let group = LocalTransport::<u32>::group(3);

        let votes = try_join_all([
            group[0].any_continue(false),
            group[1].any_continue(true),
            group[2].any_continue(false),
        ])
        .await
        .unwrap();
        assert_eq!(votes, vec![true, true, true]);

        // the count resets between rounds
        let votes = try_join_all(group.iter().map(|t| t.any_continue(false)))
            .await
            .unwrap();
        assert_eq!(votes, vec![false, false, false]);
    }

    #[test]
    fn test_exchange_waits_for_all_peers() {
        let group = LocalTransport::<u32>::group(2);

        let mut first = task::spawn(group[0].exchange(outbox(2, &[(1, 3, 7)])));
        assert_pending!(first.poll());

        let mut second = task::spawn(group[1].exchange(outbox(2, &[])));
        assert_pending!(second.poll());

        let inbound = assert_ready_ok!(first.poll());
        assert!(inbound.is_empty());
        let inbound = assert_ready_ok!(second.poll());
        assert_eq!(inbound, vec![Message::new(3, 7)]);
    }

    #[tokio::test]
    async fn test_mismatched_outbox_is_rejected() {
        let group = LocalTransport::<u32>::group(2);
        let err = group[0].exchange(Outbox::new(3)).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_empty_group_has_no_endpoints() {
        assert!(LocalTransport::<u32>::group(0).is_empty());
        assert_eq!(LocalTransport::<u32>::group(3).len(), 3);
    }

    #[tokio::test]
    async fn test_single_fragment_group() {
        let group = LocalTransport::<u32>::group(1);
        let inbound = group[0].exchange(outbox(1, &[(0, 1, 9)])).await.unwrap();
        assert_eq!(inbound, vec![Message::new(1, 9)]);
        assert!(group[0].any_continue(true).await.unwrap());
        assert!(!group[0].any_continue(false).await.unwrap());
    }
}
