//! At most one in-flight generation per conversation thread.
//!
//! Starting a new request on a thread cancels the previous one. Cancellation
//! is cooperative: the generation loop polls its ticket between chunks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

#[derive(Default)]
pub struct InFlightRegistry {
    flights: Mutex<HashMap<Uuid, Arc<AtomicBool>>>,
}

/// Handle for one in-flight request. Dropping it releases the thread slot
/// if no newer request has taken it.
pub struct FlightTicket<'a> {
    registry: &'a InFlightRegistry,
    thread_id: Uuid,
    cancelled: Arc<AtomicBool>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request for `thread_id`, cancelling any earlier one.
    pub fn begin(&self, thread_id: Uuid) -> FlightTicket<'_> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut flights = self.lock();
        if let Some(previous) = flights.insert(thread_id, Arc::clone(&cancelled)) {
            previous.store(true, Ordering::SeqCst);
            tracing::info!(thread_id = %thread_id, "Superseded in-flight generation");
        }
        FlightTicket {
            registry: self,
            thread_id,
            cancelled,
        }
    }

    /// Cancel whatever is running on `thread_id`. Returns false when idle.
    pub fn cancel(&self, thread_id: &Uuid) -> bool {
        match self.lock().remove(thread_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, thread_id: &Uuid, flag: &Arc<AtomicBool>) {
        let mut flights = self.lock();
        if flights.get(thread_id).is_some_and(|current| Arc::ptr_eq(current, flag)) {
            flights.remove(thread_id);
        }
    }

    // A poisoned map still holds valid flags.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<AtomicBool>>> {
        self.flights
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FlightTicket<'_> {
    pub fn thread_id(&self) -> Uuid {
        self.thread_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for FlightTicket<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.thread_id, &self.cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_request_cancels_older() {
        let registry = InFlightRegistry::new();
        let thread = Uuid::new_v4();
        let first = registry.begin(thread);
        assert!(!first.is_cancelled());

        let second = registry.begin(thread);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(registry.in_flight(), 1);
    }

    #[test]
    fn threads_are_independent() {
        let registry = InFlightRegistry::new();
        let a = registry.begin(Uuid::new_v4());
        let b = registry.begin(Uuid::new_v4());
        assert!(!a.is_cancelled());
        assert!(!b.is_cancelled());
        assert_eq!(registry.in_flight(), 2);
    }

    #[test]
    fn drop_releases_slot() {
        let registry = InFlightRegistry::new();
        let thread = Uuid::new_v4();
        {
            let _ticket = registry.begin(thread);
            assert_eq!(registry.in_flight(), 1);
        }
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn stale_ticket_drop_keeps_newer_flight() {
        let registry = InFlightRegistry::new();
        let thread = Uuid::new_v4();
        let first = registry.begin(thread);
        let second = registry.begin(thread);
        drop(first);
        assert_eq!(registry.in_flight(), 1);
        assert!(!second.is_cancelled());
    }

    #[test]
    fn explicit_cancel() {
        let registry = InFlightRegistry::new();
        let thread = Uuid::new_v4();
        let ticket = registry.begin(thread);
        assert!(registry.cancel(&thread));
        assert!(ticket.is_cancelled());
        assert!(!registry.cancel(&thread));
    }
}
