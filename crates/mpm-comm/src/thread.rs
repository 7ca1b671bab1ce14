//! Thread-backed communicator: SPMD ranks inside one process.
//!
//! Each rank owns the receiving end of an unbounded channel and a sender
//! to every rank. A collective sends one envelope to each peer and then
//! takes exactly one envelope from each peer. Channels are FIFO per
//! sender, so a fast rank that has already moved on to the next
//! collective cannot confuse a slow one: its early envelopes are parked
//! in a per-source queue until the slow rank asks for them.
//!
//! Dropping a `ThreadComm` notifies every peer. A peer blocked waiting
//! for a departed rank gets [`CommError::Disconnected`] instead of
//! hanging, which is how a failing rank aborts the whole group.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};

use crate::comm::{Communicator, Payload};
use crate::error::CommError;

enum Message {
    Data(Payload),
    Departed,
}

struct Envelope {
    source: usize,
    message: Message,
}

/// One rank of an in-process SPMD group.
///
/// Created in whole groups by [`ThreadComm::group`]; each member is then
/// moved to its own thread.
pub struct ThreadComm {
    rank: usize,
    peers: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    pending: Mutex<Vec<VecDeque<Message>>>,
}

impl ThreadComm {
    /// Create the `size` connected members of a group, in rank order.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| crossbeam_channel::unbounded()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| ThreadComm {
                rank,
                peers: senders.clone(),
                inbox,
                pending: Mutex::new((0..size).map(|_| VecDeque::new()).collect()),
            })
            .collect()
    }

    /// Take the oldest unconsumed payload from `source`, blocking if needed.
    fn next_from(
        &self,
        pending: &mut [VecDeque<Message>],
        source: usize,
    ) -> Result<Payload, CommError> {
        loop {
            match pending[source].pop_front() {
                Some(Message::Data(payload)) => return Ok(payload),
                Some(Message::Departed) => {
                    // Keep the marker so later collectives fail the same way.
                    pending[source].push_front(Message::Departed);
                    return Err(CommError::Disconnected { rank: source });
                }
                None => {}
            }
            let envelope = self
                .inbox
                .recv()
                .map_err(|_| CommError::Disconnected { rank: source })?;
            pending[envelope.source].push_back(envelope.message);
        }
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn exchange(&self, outgoing: Vec<Payload>) -> Result<Vec<Payload>, CommError> {
        let size = self.size();
        if outgoing.len() != size {
            return Err(CommError::WrongBufferCount {
                expected: size,
                found: outgoing.len(),
            });
        }
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        for (dest, payload) in outgoing.into_iter().enumerate() {
            if dest == self.rank {
                pending[dest].push_back(Message::Data(payload));
                continue;
            }
            let envelope = Envelope {
                source: self.rank,
                message: Message::Data(payload),
            };
            self.peers[dest]
                .send(envelope)
                .map_err(|_| CommError::Disconnected { rank: dest })?;
        }
        (0..size)
            .map(|source| self.next_from(&mut pending, source))
            .collect()
    }
}

impl Drop for ThreadComm {
    fn drop(&mut self) {
        for (dest, peer) in self.peers.iter().enumerate() {
            if dest != self.rank {
                // The peer may already be gone; nothing to notify then.
                let _ = peer.send(Envelope {
                    source: self.rank,
                    message: Message::Departed,
                });
            }
        }
    }
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.peers.len())
            .finish()
    }
}

/// Run `f` once per rank on `size` scoped threads.
///
/// Returns the per-rank results in rank order. If a rank panics, its
/// communicator is dropped (peers see [`CommError::Disconnected`]) and the
/// panic is re-raised here once every thread has finished.
///
/// # Examples
///
/// ```
/// use mpm_comm::{all_reduce_sum, run_spmd, Communicator};
///
/// let sums = run_spmd(4, |comm| all_reduce_sum(&*comm, comm.rank() as f64).unwrap());
/// assert_eq!(sums, vec![6.0; 4]);
/// ```
pub fn run_spmd<R, F>(size: usize, f: F) -> Vec<R>
where
    F: Fn(Arc<dyn Communicator>) -> R + Sync,
    R: Send,
{
    let comms = ThreadComm::group(size);
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| s.spawn(move || f(Arc::new(comm))))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}
