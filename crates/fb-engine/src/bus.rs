//! Publish/subscribe delivery of [`GameEvent`]s with an optional event log.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::event::{EventKind, GameEvent};

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&GameEvent)>;

struct Subscriber {
    id: SubscriptionId,
    kind: Option<EventKind>,
    callback: Callback,
}

#[derive(Default)]
struct BusInner {
    subscribers: Vec<Subscriber>,
    removed: Vec<SubscriptionId>,
    next_id: u64,
    log: Option<Vec<GameEvent>>,
    queue: VecDeque<GameEvent>,
    dispatching: bool,
}

/// Cloneable handle to a shared event bus.
///
/// Every clone talks to the same subscribers and log. Events emitted from
/// inside a subscriber are queued and delivered after the current one, so
/// each subscriber sees events in emission order.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl EventBus {
    /// A bus without an event log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus that records every emitted event.
    pub fn with_log() -> Self {
        let bus = Self::new();
        bus.set_logging(true);
        bus
    }

    /// Turn the event log on or off. Turning it off discards the log.
    pub fn set_logging(&self, enabled: bool) {
        let mut inner = self.inner.borrow_mut();
        match (enabled, inner.log.is_some()) {
            (true, false) => inner.log = Some(Vec::new()),
            (false, true) => inner.log = None,
            _ => {}
        }
    }

    /// Whether the event log is on.
    pub fn is_logging(&self) -> bool {
        self.inner.borrow().log.is_some()
    }

    /// Call `callback` for every event of one kind.
    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl FnMut(&GameEvent) + 'static,
    ) -> SubscriptionId {
        self.add_subscriber(Some(kind), Box::new(callback))
    }

    /// Call `callback` for every event.
    pub fn subscribe_all(&self, callback: impl FnMut(&GameEvent) + 'static) -> SubscriptionId {
        self.add_subscriber(None, Box::new(callback))
    }

    fn add_subscriber(&self, kind: Option<EventKind>, callback: Callback) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push(Subscriber { id, kind, callback });
        id
    }

    /// Remove a subscription. Returns `false` when it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        if inner.subscribers.len() != before {
            return true;
        }
        // While dispatching, the live subscriber list is detached from `inner`.
        if inner.dispatching && !inner.removed.contains(&id) && id.0 < inner.next_id {
            inner.removed.push(id);
            return true;
        }
        false
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Publish an event to the log and every matching subscriber.
    pub fn emit(&self, event: GameEvent) {
        {
            let mut inner = self.inner.borrow_mut();
            debug!(event = %event.kind(), "emit");
            if let Some(log) = inner.log.as_mut() {
                log.push(event.clone());
            }
            inner.queue.push_back(event);
            if inner.dispatching {
                return;
            }
            inner.dispatching = true;
        }

        loop {
            let (event, mut subscribers) = {
                let mut inner = self.inner.borrow_mut();
                let Some(event) = inner.queue.pop_front() else {
                    inner.dispatching = false;
                    break;
                };
                let subscribers = std::mem::take(&mut inner.subscribers);
                (event, subscribers)
            };

            let kind = event.kind();
            for subscriber in subscribers.iter_mut() {
                if subscriber.kind.is_none_or(|k| k == kind) {
                    (subscriber.callback)(&event);
                }
            }

            let mut inner = self.inner.borrow_mut();
            let added = std::mem::take(&mut inner.subscribers);
            let removed = std::mem::take(&mut inner.removed);
            subscribers.retain(|s| !removed.contains(&s.id));
            subscribers.extend(added);
            inner.subscribers = subscribers;
        }
    }

    /// A copy of the logged events, oldest first. Empty when logging is off.
    pub fn events(&self) -> Vec<GameEvent> {
        self.inner.borrow().log.clone().unwrap_or_default()
    }

    /// Logged events of one kind.
    pub fn events_of(&self, kind: EventKind) -> Vec<GameEvent> {
        self.inner
            .borrow()
            .log
            .iter()
            .flatten()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    /// Empty the event log, keeping logging on.
    pub fn clear_log(&self) {
        if let Some(log) = self.inner.borrow_mut().log.as_mut() {
            log.clear();
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("subscribers", &inner.subscribers.len())
            .field("logged", &inner.log.as_ref().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(item: &str) -> GameEvent {
        GameEvent::InventoryAdd {
            item: item.to_string(),
        }
    }

    #[test]
    fn filtered_subscription() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(EventKind::InventoryAdd, move |e| sink.borrow_mut().push(e.clone()));

        bus.emit(GameEvent::GameStart);
        bus.emit(add("key"));

        assert_eq!(*seen.borrow(), vec![add("key")]);
    }

    #[test]
    fn subscribe_all_sees_everything() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let counter = count.clone();
        bus.subscribe_all(move |_| *counter.borrow_mut() += 1);

        bus.emit(GameEvent::GameStart);
        bus.emit(add("key"));
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let counter = count.clone();
        let id = bus.subscribe_all(move |_| *counter.borrow_mut() += 1);

        bus.emit(GameEvent::GameStart);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(GameEvent::GameStart);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn log_records_in_order_and_clears() {
        let bus = EventBus::with_log();
        bus.emit(add("a"));
        bus.emit(add("b"));
        assert_eq!(bus.events(), vec![add("a"), add("b")]);
        assert_eq!(bus.events_of(EventKind::InventoryAdd).len(), 2);

        bus.clear_log();
        assert!(bus.events().is_empty());
        assert!(bus.is_logging());
    }

    #[test]
    fn no_log_by_default() {
        let bus = EventBus::new();
        bus.emit(add("a"));
        assert!(bus.events().is_empty());
    }

    #[test]
    fn reentrant_emit_is_queued() {
        let bus = EventBus::with_log();
        let order = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = bus.clone();
        bus.subscribe(EventKind::GameStart, move |_| inner_bus.emit(add("from_handler")));

        let sink = order.clone();
        bus.subscribe_all(move |e| sink.borrow_mut().push(e.kind()));

        bus.emit(GameEvent::GameStart);

        assert_eq!(
            *order.borrow(),
            vec![EventKind::GameStart, EventKind::InventoryAdd]
        );
        assert_eq!(bus.events(), vec![GameEvent::GameStart, add("from_handler")]);
    }

    #[test]
    fn subscribe_during_dispatch() {
        let bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));

        let handle = bus.clone();
        let counter = count.clone();
        bus.subscribe(EventKind::GameStart, move |_| {
            let counter = counter.clone();
            handle.subscribe(EventKind::InventoryAdd, move |_| *counter.borrow_mut() += 1);
        });

        bus.emit(GameEvent::GameStart);
        bus.emit(add("a"));
        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.subscriber_count(), 2);
    }
}
