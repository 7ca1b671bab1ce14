//! Typed collectives built on [`Communicator::exchange`].
//!
//! Every function here is a blocking collective: all ranks must call the
//! same function, in the same order, with the same element type.

use crate::comm::{Communicator, Payload};
use crate::error::CommError;

fn downcast_all<T: 'static>(incoming: Vec<Payload>) -> Result<Vec<T>, CommError> {
    incoming
        .into_iter()
        .enumerate()
        .map(|(source, payload)| {
            payload
                .downcast::<T>()
                .map(|b| *b)
                .map_err(|_| CommError::PayloadType { source })
        })
        .collect()
}

/// Personalized all-to-all: `outgoing[r]` goes to rank `r`.
///
/// Returns the buffers received from each rank, in rank order.
pub fn all_to_all<T: Send + 'static>(
    comm: &dyn Communicator,
    outgoing: Vec<Vec<T>>,
) -> Result<Vec<Vec<T>>, CommError> {
    let payloads: Vec<Payload> = outgoing
        .into_iter()
        .map(|buf| Box::new(buf) as Payload)
        .collect();
    downcast_all(comm.exchange(payloads)?)
}

/// Gather one value from every rank onto every rank, in rank order.
pub fn all_gather<T: Clone + Send + 'static>(
    comm: &dyn Communicator,
    value: T,
) -> Result<Vec<T>, CommError> {
    let payloads: Vec<Payload> = (0..comm.size())
        .map(|_| Box::new(value.clone()) as Payload)
        .collect();
    downcast_all(comm.exchange(payloads)?)
}

/// Global sum of one `f64` per rank.
///
/// Summed in rank order, so every rank gets the bit-identical result.
pub fn all_reduce_sum(comm: &dyn Communicator, value: f64) -> Result<f64, CommError> {
    Ok(all_gather(comm, value)?.into_iter().sum())
}

/// Global maximum of one `f64` per rank.
pub fn all_reduce_max(comm: &dyn Communicator, value: f64) -> Result<f64, CommError> {
    Ok(all_gather(comm, value)?
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max))
}

/// Whether `flag` is set on at least one rank.
pub fn any(comm: &dyn Communicator, flag: bool) -> Result<bool, CommError> {
    Ok(all_gather(comm, flag)?.into_iter().any(|f| f))
}

/// Sum of `value` over all ranks below this one, plus the global total.
pub fn exclusive_scan_sum(comm: &dyn Communicator, value: u64) -> Result<(u64, u64), CommError> {
    let all = all_gather(comm, value)?;
    let offset = all[..comm.rank()].iter().sum();
    let total = all.iter().sum();
    Ok((offset, total))
}

/// Block until every rank has arrived.
pub fn barrier(comm: &dyn Communicator) -> Result<(), CommError> {
    all_gather(comm, ()).map(|_| ())
}
