//! Single-flight arena for in-progress generations.
//!
//! The first cache miss for a key creates a [`Flight`]; later misses for the
//! same key subscribe to it and replay its log from the beginning. When the
//! last subscriber goes away before the flight finishes, its cancellation
//! token fires and the producer stops.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{GenerationError, GenerationResult};

#[derive(Debug, Default)]
struct FlightLog {
    chunks: Vec<String>,
    outcome: Option<GenerationResult<()>>,
}

#[derive(Debug, Default)]
struct Subscribers {
    count: usize,
    closed: bool,
}

/// Shared state of one in-progress generation.
#[derive(Debug)]
pub(crate) struct Flight {
    log: Mutex<FlightLog>,
    version: watch::Sender<u64>,
    subscribers: Mutex<Subscribers>,
    cancel: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Flight {
    /// Create a flight together with its first subscription.
    fn start() -> (Arc<Self>, Subscription) {
        let (version, _) = watch::channel(0);
        let flight = Arc::new(Self {
            log: Mutex::new(FlightLog::default()),
            version,
            subscribers: Mutex::new(Subscribers {
                count: 1,
                closed: false,
            }),
            cancel: CancellationToken::new(),
        });
        let subscription = Subscription::new(flight.clone());
        (flight, subscription)
    }

    fn try_subscribe(self: &Arc<Self>) -> Option<Subscription> {
        let mut subscribers = lock(&self.subscribers);
        if subscribers.closed {
            return None;
        }
        subscribers.count += 1;
        drop(subscribers);
        Some(Subscription::new(self.clone()))
    }

    fn unsubscribe(&self) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.count = subscribers.count.saturating_sub(1);
        if subscribers.count == 0 && !self.is_finished() {
            subscribers.closed = true;
            self.cancel.cancel();
        }
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn is_finished(&self) -> bool {
        lock(&self.log).outcome.is_some()
    }

    /// Append a chunk and wake subscribers.
    pub(crate) fn push(&self, chunk: String) {
        lock(&self.log).chunks.push(chunk);
        self.version.send_modify(|v| *v += 1);
    }

    /// Record the final outcome and wake subscribers.
    pub(crate) fn finish(&self, outcome: GenerationResult<()>) {
        lock(&self.log).outcome = Some(outcome);
        self.version.send_modify(|v| *v += 1);
    }
}

/// A reader of one flight's log.
#[derive(Debug)]
pub(crate) struct Subscription {
    flight: Arc<Flight>,
    updates: watch::Receiver<u64>,
    cursor: usize,
    ended: bool,
}

impl Subscription {
    fn new(flight: Arc<Flight>) -> Self {
        let updates = flight.version.subscribe();
        Self {
            flight,
            updates,
            cursor: 0,
            ended: false,
        }
    }

    /// Next chunk in produced order; `None` after success or after the error
    /// has been delivered once.
    pub(crate) async fn next(&mut self) -> Option<GenerationResult<String>> {
        loop {
            if self.ended {
                return None;
            }
            self.updates.borrow_and_update();
            {
                let log = lock(&self.flight.log);
                if let Some(chunk) = log.chunks.get(self.cursor) {
                    self.cursor += 1;
                    return Some(Ok(chunk.clone()));
                }
                match &log.outcome {
                    Some(Ok(())) => {
                        self.ended = true;
                        return None;
                    }
                    Some(Err(e)) => {
                        self.ended = true;
                        return Some(Err(e.clone()));
                    }
                    None => {}
                }
            }
            if self.updates.changed().await.is_err() {
                self.ended = true;
                return Some(Err(GenerationError::Incomplete));
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.flight.unsubscribe();
    }
}

/// How a caller joined the arena.
pub(crate) enum Join {
    /// A new flight was created; the caller must drive it.
    Leader(Arc<Flight>, Subscription),
    /// The caller attached to an existing flight.
    Follower(Subscription),
}

/// In-progress generations keyed by SMILES.
#[derive(Debug, Default)]
pub(crate) struct FlightArena {
    flights: DashMap<String, Arc<Flight>>,
}

impl FlightArena {
    pub(crate) fn join(&self, key: &str) -> Join {
        match self.flights.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                if let Some(subscription) = slot.get().try_subscribe() {
                    return Join::Follower(subscription);
                }
                // Abandoned flight still winding down; replace it.
                let (flight, subscription) = Flight::start();
                slot.insert(flight.clone());
                Join::Leader(flight, subscription)
            }
            Entry::Vacant(slot) => {
                let (flight, subscription) = Flight::start();
                slot.insert(flight.clone());
                Join::Leader(flight, subscription)
            }
        }
    }

    /// Remove `flight` if it is still the registered flight for `key`.
    pub(crate) fn remove(&self, key: &str, flight: &Arc<Flight>) {
        self.flights
            .remove_if(key, |_, current| Arc::ptr_eq(current, flight));
    }

    pub(crate) fn len(&self) -> usize {
        self.flights.len()
    }
}
