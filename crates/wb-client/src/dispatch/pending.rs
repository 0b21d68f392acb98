//! In-flight request bookkeeping

use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;

use wb_core::DispatchError;
use wb_protocol::Response;

/// Outcome delivered to a waiting caller
pub(crate) type Outcome = Result<Response, DispatchError>;

struct PendingRequest {
    /// Socket generation the request was written to
    generation: u64,
    created_at: Instant,
    tx: oneshot::Sender<Outcome>,
}

/// A claimed pending request, ready to be settled
pub(crate) struct Waiter {
    id: String,
    pending: PendingRequest,
}

impl Waiter {
    /// Id of the claimed request
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Deliver the response to the caller
    pub(crate) fn settle(self, response: Response) {
        tracing::trace!(
            "Request {} answered after {:?}",
            self.id,
            self.pending.created_at.elapsed()
        );
        let _ = self.pending.tx.send(Ok(response));
    }
}

/// Map of request id to waiting caller
///
/// Every entry is settled exactly once: by its response, by its timeout, or
/// by the closure of the socket it was written to. Whoever removes the entry
/// owns the settlement.
#[derive(Default)]
pub(crate) struct PendingRequests {
    map: DashMap<String, PendingRequest>,
}

impl PendingRequests {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a waiter under `id`
    ///
    /// Returns `None` if the id is already in flight.
    pub(crate) fn register(&self, id: &str, generation: u64) -> Option<oneshot::Receiver<Outcome>> {
        match self.map.entry(id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let (tx, rx) = oneshot::channel();
                slot.insert(PendingRequest {
                    generation,
                    created_at: Instant::now(),
                    tx,
                });
                Some(rx)
            }
        }
    }

    /// Claim the waiter for `id`, if one is registered
    pub(crate) fn take(&self, id: &str) -> Option<Waiter> {
        self.map.remove(id).map(|(id, pending)| Waiter { id, pending })
    }

    /// Drop a waiter without settling it
    pub(crate) fn remove(&self, id: &str) -> bool {
        self.map.remove(id).is_some()
    }

    /// Reject every request written to a socket up to `generation`
    pub(crate) fn reject_through(&self, generation: u64) -> usize {
        self.reject_where(|pending| pending.generation <= generation)
    }

    /// Reject every request
    pub(crate) fn reject_all(&self) -> usize {
        self.reject_where(|_| true)
    }

    fn reject_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&PendingRequest) -> bool,
    {
        let ids: Vec<String> = self
            .map
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut rejected = 0;
        for id in ids {
            if let Some((id, pending)) = self.map.remove(&id) {
                let _ = pending.tx.send(Err(DispatchError::ConnectionClosed { id }));
                rejected += 1;
            }
        }
        rejected
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}
