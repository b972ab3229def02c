//! Scheduler facade: "parallel for with thread-local scratch".
//!
//! The original keeps one `ThreadData { neighs, collisions }` per worker via
//! `ThreadLocal<ThreadData>` (`lib/gravity/NBodySolver.h`), has each thread
//! accumulate into its own scratch buffer without locking, then explicitly
//! reduces the per-worker buffers on the calling thread once the parallel
//! region ends (`core/gravity/NBodySolver.cpp`, `collide`, "reduce
//! thread-local containers"). [`Scheduler::for_each_indexed`] returns that
//! same per-worker scratch set back to the caller to reduce; it never
//! reduces on the caller's behalf.

use std::cell::RefCell;

use rayon::prelude::*;
use thread_local::ThreadLocal;

/// Runs `body` once per index in `0..len`, giving each invocation access to
/// a thread-local scratch value built lazily by `make_scratch`, and returns
/// every distinct scratch value that was touched for the caller to reduce.
///
/// Implementations may run indices in any order and on any number of
/// threads; `body` must not assume a particular interleaving, and the
/// returned `Vec` is in no particular order.
pub trait Scheduler {
    fn for_each_indexed<T, F>(&self, len: usize, make_scratch: impl Fn() -> T + Sync, body: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync;
}

/// Production scheduler: `rayon`'s work-stealing pool plus one scratch slot
/// per worker thread, freshly built every call.
#[derive(Default)]
pub struct RayonScheduler;

impl Scheduler for RayonScheduler {
    fn for_each_indexed<T, F>(&self, len: usize, make_scratch: impl Fn() -> T + Sync, body: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        let scratch: ThreadLocal<RefCell<T>> = ThreadLocal::new();
        (0..len).into_par_iter().for_each(|i| {
            let cell = scratch.get_or(|| RefCell::new(make_scratch()));
            body(i, &mut cell.borrow_mut());
        });
        scratch.into_iter().map(RefCell::into_inner).collect()
    }
}

/// Single-threaded scheduler with one persistent scratch value, used in
/// tests that need a fixed iteration order to assert exact results.
pub struct SequentialScheduler;

impl Scheduler for SequentialScheduler {
    fn for_each_indexed<T, F>(&self, len: usize, make_scratch: impl Fn() -> T + Sync, body: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        let mut scratch = make_scratch();
        for i in 0..len {
            body(i, &mut scratch);
        }
        vec![scratch]
    }
}
