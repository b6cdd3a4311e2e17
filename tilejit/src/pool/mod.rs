//! Bounded-concurrency tile download pool
//!
//! Dispatches many per-tile fetches across a fixed set of worker threads.
//! Workers pull pending coordinates from a shared queue; every dispatched
//! coordinate owns one result slot, so the returned collection always has
//! exactly one payload per requested coordinate regardless of per-tile
//! success. The pool's lifetime is scoped to one `fetch_all` call: workers
//! are spawned at the start and all joined before it returns.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::debug;

use crate::coord::TileCoord;
use crate::provider::{RawPayload, TileFetcher};

/// Default number of download workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Cooperative cancellation token for an in-flight query.
///
/// Cancelling stops the dispatch of further fetches; fetches already started
/// run to completion or time out. It never interrupts an in-progress
/// network read.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the query this token was passed to.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Fixed-size worker pool that downloads a batch of tiles.
pub struct DownloadPool {
    fetcher: TileFetcher,
    workers: usize,
}

impl DownloadPool {
    /// Create a pool with the default worker count.
    pub fn new(fetcher: TileFetcher) -> Self {
        Self::with_workers(fetcher, DEFAULT_WORKERS)
    }

    /// Create a pool with a custom worker count (minimum 1).
    pub fn with_workers(fetcher: TileFetcher, workers: usize) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
        }
    }

    /// Downloads every coordinate in `coords`, returning one payload per
    /// coordinate in the same order.
    ///
    /// This call blocks until every dispatched fetch has completed or the
    /// token is cancelled. A single tile failure never cancels sibling
    /// fetches; failed and undispatched tiles come back as failed payloads.
    pub fn fetch_all(&self, coords: &[TileCoord], cancel: &CancelToken) -> Vec<RawPayload> {
        if coords.is_empty() {
            return Vec::new();
        }

        let queue: Mutex<VecDeque<(usize, TileCoord)>> =
            Mutex::new(coords.iter().copied().enumerate().collect());
        let slots: Mutex<Vec<Option<RawPayload>>> = Mutex::new(vec![None; coords.len()]);

        let worker_count = self.workers.min(coords.len());
        thread::scope(|scope| {
            for _ in 0..worker_count {
                scope.spawn(|| loop {
                    // Cancellation is checked between dispatch iterations.
                    if cancel.is_cancelled() {
                        break;
                    }
                    let next = queue.lock().pop_front();
                    let Some((index, coord)) = next else { break };

                    let payload = self.fetcher.fetch(coord);
                    slots.lock()[index] = Some(payload);
                });
            }
        });

        let results: Vec<RawPayload> = slots
            .into_inner()
            .into_iter()
            .zip(coords)
            .map(|(slot, coord)| slot.unwrap_or_else(|| RawPayload::failed(*coord)))
            .collect();

        let succeeded = results.iter().filter(|p| p.is_success()).count();
        debug!(
            requested = coords.len(),
            succeeded,
            failed = coords.len() - succeeded,
            "tile batch complete"
        );
        results
    }
}
