//! Communicator handle for distributed search
//!
//! The search only needs a handful of collectives: rank and size queries, a
//! barrier, and an all-gather. [`Communicator`] exposes these through a
//! type-erased exchange so it stays object safe; the typed collectives live in
//! [`CommunicatorExt`].
//!
//! Every rank of a group must take part in each collective. A rank that skips
//! one leaves the others blocked.

use crate::error::{ContactSearchError, Result};
use std::any::Any;
use std::sync::{Arc, Barrier, Mutex, PoisonError};

/// Type-erased payload of an exchange
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Minimal collective interface
pub trait Communicator: Send + Sync {
    /// Rank of this process in the group
    fn rank(&self) -> usize;

    /// Number of ranks in the group
    fn size(&self) -> usize;

    /// Block until every rank reached the barrier
    fn barrier(&self);

    /// Contribute one payload, receive the payloads of all ranks ordered by rank
    fn exchange(&self, payload: Payload) -> Result<Vec<Payload>>;
}

/// Typed collectives on top of [`Communicator::exchange`]
pub trait CommunicatorExt {
    /// Gather one value from every rank on every rank, ordered by rank
    fn all_gather<T: Clone + Send + Sync + 'static>(&self, value: T) -> Result<Vec<T>>;

    /// Sum of one value over all ranks
    fn sum_all(&self, value: usize) -> Result<usize>;
}

impl<C: Communicator + ?Sized> CommunicatorExt for C {
    fn all_gather<T: Clone + Send + Sync + 'static>(&self, value: T) -> Result<Vec<T>> {
        self.exchange(Arc::new(value))?
            .into_iter()
            .enumerate()
            .map(|(rank, payload)| {
                payload.downcast_ref::<T>().cloned().ok_or_else(|| {
                    ContactSearchError::CommunicationError(format!(
                        "Rank {} contributed a payload of a different type than expected by rank {}",
                        rank,
                        self.rank()
                    ))
                })
            })
            .collect()
    }

    fn sum_all(&self, value: usize) -> Result<usize> {
        Ok(self.all_gather(value)?.into_iter().sum())
    }
}

/// Single-rank communicator
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn exchange(&self, payload: Payload) -> Result<Vec<Payload>> {
        Ok(vec![payload])
    }
}

fn poisoned<T>(_: PoisonError<T>) -> ContactSearchError {
    ContactSearchError::CommunicationError("Exchange slots poisoned".to_string())
}

struct SharedState {
    barrier: Barrier,
    slots: Mutex<Vec<Option<Payload>>>,
}

/// In-process rank of a group of threads
///
/// Each thread of a group owns one handle. Collectives synchronize on a shared
/// barrier and exchange payloads through shared slots.
#[derive(Clone)]
pub struct ThreadCommunicator {
    rank: usize,
    size: usize,
    shared: Arc<SharedState>,
}

impl ThreadCommunicator {
    /// Create handles for a group of `size` ranks, ordered by rank
    pub fn group(size: usize) -> Vec<ThreadCommunicator> {
        let size = size.max(1);
        let shared = Arc::new(SharedState {
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![None; size]),
        });
        (0..size)
            .map(|rank| ThreadCommunicator {
                rank,
                size,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl std::fmt::Debug for ThreadCommunicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadCommunicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl Communicator for ThreadCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn exchange(&self, payload: Payload) -> Result<Vec<Payload>> {
        // every rank passes both barriers, also with poisoned slots
        let stored = self
            .shared
            .slots
            .lock()
            .map(|mut slots| slots[self.rank] = Some(payload))
            .map_err(poisoned);
        self.shared.barrier.wait();

        let gathered = self
            .shared
            .slots
            .lock()
            .map(|slots| slots.iter().cloned().collect::<Option<Vec<Payload>>>())
            .map_err(poisoned);

        // slots must not be overwritten before every rank has read them
        self.shared.barrier.wait();

        stored?;
        gathered?.ok_or_else(|| {
            ContactSearchError::CommunicationError(format!(
                "Rank {} found an empty exchange slot",
                self.rank
            ))
        })
    }
}
