//! SPMD communicators for the distributed MPM driver.
//!
//! Every rank runs the same program and meets the others only inside
//! collective calls. This crate defines the [`Communicator`] trait (one
//! blocking personalized all-to-all, [`Communicator::exchange`]), typed
//! collectives built on it, and two implementations:
//!
//! - [`SelfComm`]: a single rank; every collective is local.
//! - [`ThreadComm`]: ranks as threads in one process, connected by
//!   `crossbeam-channel`s. [`run_spmd`] launches a group.
//!
//! Collectives must be issued by every rank in the same order. That is a
//! caller discipline, not something this crate checks: out-of-order calls
//! deadlock or deliver payloads to the wrong call.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collective;
pub mod comm;
pub mod error;
pub mod thread;

pub use collective::{
    all_gather, all_reduce_max, all_reduce_sum, all_to_all, any, barrier, exclusive_scan_sum,
};
pub use comm::{Communicator, Payload, SelfComm};
pub use error::CommError;
pub use thread::{run_spmd, ThreadComm};
