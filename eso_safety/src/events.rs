//! Safety event publication: observers, bounded event queues and the
//! circular event log.
//!
//! Events are pushed synchronously at the moment of detection. Observers
//! that must not extend the supervisory cycle should register an
//! [`EventQueue`] and drain it from another thread.

use std::sync::Arc;

use eso_common::consts::{EVENT_LOG_DEPTH, EVENT_QUEUE_DEPTH, MAX_OBSERVERS};
use eso_common::safety::{EventRecord, SafetyError};
use heapless::Deque;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Receives every published safety event.
pub trait SafetyObserver: Send {
    fn on_event(&mut self, record: &EventRecord);
}

/// Observer wrapping a closure.
pub struct FnObserver<F>(pub F);

impl<F> SafetyObserver for FnObserver<F>
where
    F: FnMut(&EventRecord) + Send,
{
    fn on_event(&mut self, record: &EventRecord) {
        (self.0)(record)
    }
}

/// Handle returned by observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u32);

impl ObserverId {
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

// ─── Event Queue ────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct QueueInner {
    records: Deque<EventRecord, EVENT_QUEUE_DEPTH>,
    dropped: u64,
}

/// Bounded queue observer. Clones share the same queue.
///
/// When full the newest record is dropped and counted, so the
/// supervisory loop never waits on a slow consumer.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Arc<Mutex<QueueInner>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest queued record.
    pub fn pop(&self) -> Option<EventRecord> {
        self.inner.lock().records.pop_front()
    }

    /// Take every queued record, oldest first.
    pub fn drain(&self) -> Vec<EventRecord> {
        let mut inner = self.inner.lock();
        let mut out = Vec::with_capacity(inner.records.len());
        while let Some(record) = inner.records.pop_front() {
            out.push(record);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Records dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }
}

impl SafetyObserver for EventQueue {
    fn on_event(&mut self, record: &EventRecord) {
        let mut inner = self.inner.lock();
        if inner.records.push_back(record.clone()).is_err() {
            inner.dropped += 1;
        }
    }
}

// ─── Event Bus ──────────────────────────────────────────────────────

/// Observer table plus the circular event log.
pub struct EventBus {
    observers: heapless::Vec<(ObserverId, Box<dyn SafetyObserver>), MAX_OBSERVERS>,
    next_id: u32,
    log: Deque<EventRecord, EVENT_LOG_DEPTH>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            observers: heapless::Vec::new(),
            next_id: 0,
            log: Deque::new(),
        }
    }

    /// Add an observer.
    ///
    /// # Errors
    /// `ObserverLimit` when `MAX_OBSERVERS` are already registered.
    pub fn register(&mut self, observer: Box<dyn SafetyObserver>) -> Result<ObserverId, SafetyError> {
        let id = ObserverId(self.next_id);
        self.observers
            .push((id, observer))
            .map_err(|_| SafetyError::ObserverLimit(MAX_OBSERVERS))?;
        self.next_id = self.next_id.wrapping_add(1);
        debug!("Registered safety observer {}", id.0);
        Ok(id)
    }

    /// Remove an observer.
    ///
    /// # Errors
    /// `UnknownObserver` if `id` is not registered.
    pub fn unregister(&mut self, id: ObserverId) -> Result<(), SafetyError> {
        let index = self
            .observers
            .iter()
            .position(|(registered, _)| *registered == id)
            .ok_or(SafetyError::UnknownObserver(id.0))?;
        self.observers.remove(index);
        debug!("Unregistered safety observer {}", id.0);
        Ok(())
    }

    /// Record `record` in the log and push it to every observer.
    pub fn publish(&mut self, record: EventRecord) {
        for (_, observer) in self.observers.iter_mut() {
            observer.on_event(&record);
        }
        if self.log.is_full() {
            self.log.pop_front();
        }
        if self.log.push_back(record).is_err() {
            warn!("Safety event log rejected a record");
        }
    }

    /// Logged records, oldest first.
    pub fn log(&self) -> Vec<EventRecord> {
        self.log.iter().cloned().collect()
    }

    /// Most recent logged record.
    pub fn last(&self) -> Option<&EventRecord> {
        self.log.back()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eso_common::safety::event::reason;
    use eso_common::safety::{FaultCode, SafetyEvent, SafetyState};

    fn record(ts: u64) -> EventRecord {
        EventRecord {
            event: SafetyEvent::FaultDetected,
            timestamp_ms: ts,
            state: SafetyState::Fault,
            fault: FaultCode::OutputShort,
            channel: Some(1),
            reason: reason("test"),
        }
    }

    #[test]
    fn observers_receive_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut bus = EventBus::new();
        bus.register(Box::new(FnObserver(move |r: &EventRecord| {
            sink.lock().push(r.timestamp_ms)
        })))
        .unwrap();

        bus.publish(record(1));
        bus.publish(record(2));
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn observer_limit() {
        let mut bus = EventBus::new();
        for _ in 0..MAX_OBSERVERS {
            bus.register(Box::new(EventQueue::new())).unwrap();
        }
        assert_eq!(
            bus.register(Box::new(EventQueue::new())).unwrap_err(),
            SafetyError::ObserverLimit(MAX_OBSERVERS)
        );
    }

    #[test]
    fn unregister_stops_delivery() {
        let queue = EventQueue::new();
        let mut bus = EventBus::new();
        let id = bus.register(Box::new(queue.clone())).unwrap();
        bus.publish(record(1));
        bus.unregister(id).unwrap();
        bus.publish(record(2));
        assert_eq!(queue.len(), 1);
        assert_eq!(bus.unregister(id), Err(SafetyError::UnknownObserver(id.raw())));
    }

    #[test]
    fn full_queue_drops_newest() {
        let mut queue = EventQueue::new();
        for ts in 0..(EVENT_QUEUE_DEPTH as u64 + 3) {
            queue.on_event(&record(ts));
        }
        assert_eq!(queue.len(), EVENT_QUEUE_DEPTH);
        assert_eq!(queue.dropped(), 3);
        assert_eq!(queue.pop().unwrap().timestamp_ms, 0);
        let rest = queue.drain();
        assert_eq!(rest.len(), EVENT_QUEUE_DEPTH - 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn log_keeps_latest_depth_records() {
        let mut bus = EventBus::new();
        let total = EVENT_LOG_DEPTH as u64 + 5;
        for ts in 0..total {
            bus.publish(record(ts));
        }
        let log = bus.log();
        assert_eq!(log.len(), EVENT_LOG_DEPTH);
        assert_eq!(log.first().unwrap().timestamp_ms, 5);
        assert_eq!(bus.last().unwrap().timestamp_ms, total - 1);
    }
}
