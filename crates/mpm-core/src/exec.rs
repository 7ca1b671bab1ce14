//! Execution contexts: where per-particle kernels run.
//!
//! A solver is generic over one [`ExecutionSpace`]; the backend factory
//! instantiates one concrete solver type per enabled backend. Kernels are
//! expressed as `parallel_for` / `parallel_sum` over slices so the same
//! code runs in order ([`Serial`]) or across a rayon thread pool
//! ([`HostThreads`]).

use std::fmt;
#[cfg(feature = "openmp")]
use std::sync::Arc;

#[cfg(feature = "openmp")]
use rayon::prelude::*;

use crate::backend::Backend;

/// Capability interface of an execution context.
pub trait ExecutionSpace: Default + fmt::Debug + Send + Sync + 'static {
    /// The backend tag this context implements.
    const BACKEND: Backend;

    /// Number of concurrent workers the context may use.
    fn concurrency(&self) -> usize;

    /// Run `kernel(index, item)` for every element of `items`.
    ///
    /// Elements are disjoint, so kernels may run concurrently; no ordering
    /// between elements is guaranteed.
    fn parallel_for<T, F>(&self, items: &mut [T], kernel: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync;

    /// Sum `f(item)` over `items`.
    ///
    /// The reduction order is fixed for a given context and slice length,
    /// so repeated calls produce bit-identical results.
    fn parallel_sum<T, F>(&self, items: &[T], f: F) -> f64
    where
        T: Sync,
        F: Fn(&T) -> f64 + Sync;
}

// ── Serial ──────────────────────────────────────────────────────

/// In-order execution on the calling thread.
#[cfg(feature = "serial")]
#[derive(Clone, Copy, Debug, Default)]
pub struct Serial;

#[cfg(feature = "serial")]
impl ExecutionSpace for Serial {
    const BACKEND: Backend = Backend::Serial;

    fn concurrency(&self) -> usize {
        1
    }

    fn parallel_for<T, F>(&self, items: &mut [T], kernel: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        for (i, item) in items.iter_mut().enumerate() {
            kernel(i, item);
        }
    }

    fn parallel_sum<T, F>(&self, items: &[T], f: F) -> f64
    where
        T: Sync,
        F: Fn(&T) -> f64 + Sync,
    {
        items.iter().map(f).sum()
    }
}

// ── HostThreads ─────────────────────────────────────────────────

/// Host thread pool backing the `openmp` backend.
///
/// Kernels run on a persistent rayon pool owned by the context. Slices
/// are split into chunks of at least [`MIN_CHUNK`](HostThreads::MIN_CHUNK)
/// elements; shorter slices run on a single worker.
#[cfg(feature = "openmp")]
#[derive(Clone, Debug)]
pub struct HostThreads {
    threads: usize,
    // `None` if the dedicated pool could not be built; rayon's global
    // pool is used instead.
    pool: Option<Arc<rayon::ThreadPool>>,
}

#[cfg(feature = "openmp")]
impl HostThreads {
    /// Smallest number of elements handed to a single worker.
    pub const MIN_CHUNK: usize = 1024;

    /// Create a pool with an explicit thread count, clamped to `[1, 64]`.
    pub fn new(threads: usize) -> Self {
        let threads = threads.clamp(1, 64);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("mpm-exec-{i}"))
            .build()
            .ok()
            .map(Arc::new);
        Self { threads, pool }
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn chunk_len(&self, len: usize) -> usize {
        len.div_ceil(self.threads).max(Self::MIN_CHUNK)
    }
}

#[cfg(feature = "openmp")]
impl Default for HostThreads {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(cpus)
    }
}

#[cfg(feature = "openmp")]
impl ExecutionSpace for HostThreads {
    const BACKEND: Backend = Backend::OpenMp;

    fn concurrency(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads().min(self.threads),
        }
    }

    fn parallel_for<T, F>(&self, items: &mut [T], kernel: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        self.install(|| {
            items
                .par_iter_mut()
                .enumerate()
                .with_min_len(Self::MIN_CHUNK)
                .for_each(|(i, item)| kernel(i, item));
        });
    }

    fn parallel_sum<T, F>(&self, items: &[T], f: F) -> f64
    where
        T: Sync,
        F: Fn(&T) -> f64 + Sync,
    {
        // Chunk boundaries depend only on the slice length and the thread
        // count, and partial sums are added in chunk order.
        let chunk = self.chunk_len(items.len());
        if items.len() <= chunk {
            return items.iter().map(f).sum();
        }
        let partials: Vec<f64> = self.install(|| {
            items
                .par_chunks(chunk)
                .map(|slice| slice.iter().map(&f).sum::<f64>())
                .collect()
        });
        partials.into_iter().sum()
    }
}
