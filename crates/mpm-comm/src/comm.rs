//! The [`Communicator`] trait and the single-rank implementation.

use std::any::Any;

use crate::error::CommError;

/// Type-erased value carried by a collective.
pub type Payload = Box<dyn Any + Send>;

/// A group of SPMD ranks.
///
/// Object safe, so solvers hold an `Arc<dyn Communicator>` handle and stay
/// independent of the transport.
pub trait Communicator: Send + Sync {
    /// This rank's index in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group.
    fn size(&self) -> usize;

    /// Personalized all-to-all: `outgoing[r]` is delivered to rank `r`.
    ///
    /// Returns one payload per source rank, in rank order. Blocks until
    /// every rank has called `exchange`; there is no timeout.
    fn exchange(&self, outgoing: Vec<Payload>) -> Result<Vec<Payload>, CommError>;
}

/// Communicator of exactly one rank.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelfComm;

impl Communicator for SelfComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exchange(&self, outgoing: Vec<Payload>) -> Result<Vec<Payload>, CommError> {
        if outgoing.len() != 1 {
            return Err(CommError::WrongBufferCount {
                expected: 1,
                found: outgoing.len(),
            });
        }
        Ok(outgoing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_comm_returns_its_own_payload() {
        let out = SelfComm.exchange(vec![Box::new(5u32)]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(*out.into_iter().next().unwrap().downcast::<u32>().unwrap(), 5);
    }

    #[test]
    fn self_comm_rejects_wrong_count() {
        match SelfComm.exchange(vec![]) {
            Err(CommError::WrongBufferCount {
                expected: 1,
                found: 0,
            }) => {}
            other => panic!("expected WrongBufferCount, got {:?}", other.map(|v| v.len())),
        }
    }
}
