//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | EventHandler            | Trait for event handling                          | handle_event      |
// | HandlerId               | Handle returned at registration                   | new               |
// | HandlerRegistry         | Event type -> ordered handler sequence            | register          |
// |                         |                                                   | unregister        |
// |                         |                                                   | lookup            |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::error::{EventError, EventResult};
use super::types::{Event, EventType};

/// Event handler trait for processing events.
///
/// Handlers run one at a time on the engine's dispatch thread. Returning an
/// error does not stop dispatch; the failure is logged and the next handler runs.
///
/// Any `Fn(&Event) -> EventResult<()>` closure is a handler.
pub trait EventHandler: Send + Sync {
    /// Processes an event
    fn handle_event(&self, event: &Event) -> EventResult<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&Event) -> EventResult<()> + Send + Sync,
{
    fn handle_event(&self, event: &Event) -> EventResult<()> {
        self(event)
    }
}

/// Identifies one registration of a handler.
///
/// Registering the same handler twice yields two distinct ids, and each
/// id removes exactly one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerId(Uuid);

impl HandlerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

type HandlerEntry = (HandlerId, Arc<dyn EventHandler>);

/// Mapping from event type to the handlers registered for it, in
/// registration order.
///
/// Writers take the lock exclusively; [`HandlerRegistry::lookup`] clones a
/// snapshot so handlers are never invoked while the lock is held. A type keeps
/// its (possibly empty) sequence once it has been registered.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<EventType, Vec<HandlerEntry>>>,
}

// Trait objects are not Debug, so only the shape of the map is shown
impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let mut map = f.debug_map();
        for (event_type, entries) in handlers.iter() {
            map.entry(event_type, &entries.len());
        }
        map.finish()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the sequence for `event_type`.
    ///
    /// # Arguments
    /// * `event_type` - The type the handler wants to receive
    /// * `handler` - The handler; it may already be registered for this type
    ///
    /// # Returns
    /// The id to pass to [`HandlerRegistry::unregister`].
    pub fn register(&self, event_type: EventType, handler: Arc<dyn EventHandler>) -> HandlerId {
        let id = HandlerId::new();
        let mut handlers = self.handlers.write();
        let entries = handlers.entry(event_type.clone()).or_default();
        entries.push((id, handler));

        debug!(
            "Registered handler {} for event type {} ({} total)",
            id,
            event_type,
            entries.len()
        );
        id
    }

    /// Removes the registration identified by `id`.
    ///
    /// # Returns
    /// * `Ok(())` - The entry was removed; the others keep their order.
    /// * `Err(EventError::UnknownEventType)` - Nothing was ever registered for `event_type`.
    /// * `Err(EventError::HandlerNotRegistered)` - `id` is not in the sequence for `event_type`.
    pub fn unregister(&self, event_type: &EventType, id: HandlerId) -> EventResult<()> {
        self.remove_first(event_type, |(entry_id, _)| *entry_id == id)?;
        debug!("Unregistered handler {} from event type {}", id, event_type);
        Ok(())
    }

    /// Removes the first entry for `event_type` holding this exact handler.
    ///
    /// Identity is the allocation behind the `Arc`, so a handler registered
    /// twice must be unregistered twice.
    pub fn unregister_handler(
        &self,
        event_type: &EventType,
        handler: &Arc<dyn EventHandler>,
    ) -> EventResult<()> {
        let target = Arc::as_ptr(handler) as *const ();
        let (id, _) = self.remove_first(event_type, |(_, entry)| {
            Arc::as_ptr(entry) as *const () == target
        })?;
        debug!("Unregistered handler {} from event type {}", id, event_type);
        Ok(())
    }

    fn remove_first<P>(&self, event_type: &EventType, predicate: P) -> EventResult<HandlerEntry>
    where
        P: Fn(&HandlerEntry) -> bool,
    {
        let mut handlers = self.handlers.write();
        let entries = handlers
            .get_mut(event_type)
            .ok_or_else(|| EventError::UnknownEventType(event_type.clone()))?;

        let position = entries
            .iter()
            .position(predicate)
            .ok_or_else(|| EventError::HandlerNotRegistered {
                event_type: event_type.clone(),
            })?;

        Ok(entries.remove(position))
    }

    /// Returns a snapshot of the handlers for `event_type`, in registration order.
    pub fn lookup(&self, event_type: &EventType) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .get(event_type)
            .map(|entries| entries.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            .unwrap_or_default()
    }

    /// Returns the number of handlers registered for `event_type`.
    pub fn handler_count(&self, event_type: &EventType) -> usize {
        self.handlers.read().get(event_type).map_or(0, Vec::len)
    }

    /// Returns every type that has been registered, including emptied ones.
    pub fn event_types(&self) -> Vec<EventType> {
        self.handlers.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::{mock, Sequence};
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        pub Handler {}

        impl EventHandler for Handler {
            fn handle_event(&self, event: &Event) -> EventResult<()>;
        }
    }

    const ORDER: EventType = EventType::new("Order");

    fn noop() -> Arc<dyn EventHandler> {
        Arc::new(|_: &Event| -> EventResult<()> { Ok(()) })
    }

    fn dispatch(registry: &HandlerRegistry, event: &Event) {
        for handler in registry.lookup(event.event_type()) {
            handler.handle_event(event).unwrap();
        }
    }

    #[test]
    fn test_lookup_preserves_registration_order() {
        let registry = HandlerRegistry::new();
        let mut seq = Sequence::new();

        for _ in 0..3 {
            let mut handler = MockHandler::new();
            handler
                .expect_handle_event()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
            registry.register(ORDER, Arc::new(handler));
        }

        dispatch(&registry, &Event::new(ORDER));
    }

    #[test]
    fn test_type_isolation() {
        let registry = HandlerRegistry::new();
        let mut handler = MockHandler::new();
        handler.expect_handle_event().never();
        registry.register(EventType::new("A"), Arc::new(handler));

        dispatch(&registry, &Event::new("B"));
        assert!(registry.lookup(&EventType::new("B")).is_empty());
    }

    #[test]
    fn test_unregister_unknown_type() {
        let registry = HandlerRegistry::new();
        let id = registry.register(ORDER, noop());

        let err = registry.unregister(&EventType::new("Trade"), id).unwrap_err();
        assert_eq!(err, EventError::UnknownEventType(EventType::new("Trade")));
    }

    #[test]
    fn test_unregister_missing_handler() {
        let registry = HandlerRegistry::new();
        let id = registry.register(ORDER, noop());
        registry.register(ORDER, noop());

        registry.unregister(&ORDER, id).unwrap();
        let err = registry.unregister(&ORDER, id).unwrap_err();
        assert_eq!(err, EventError::HandlerNotRegistered { event_type: ORDER });
        assert_eq!(registry.handler_count(&ORDER), 1);
    }

    #[test]
    fn test_emptied_type_is_kept() {
        let registry = HandlerRegistry::new();
        let id = registry.register(ORDER, noop());
        registry.unregister(&ORDER, id).unwrap();

        assert_eq!(registry.handler_count(&ORDER), 0);
        assert_eq!(registry.event_types(), vec![ORDER]);
        assert!(matches!(
            registry.unregister_handler(&ORDER, &noop()),
            Err(EventError::HandlerNotRegistered { .. })
        ));
    }

    #[test]
    fn test_unregister_keeps_remaining_order() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut ids = Vec::new();
        for tag in 0..3 {
            let calls = Arc::clone(&calls);
            ids.push(registry.register(
                ORDER,
                Arc::new(move |_: &Event| -> EventResult<()> {
                    calls.lock().push(tag);
                    Ok(())
                }),
            ));
        }

        registry.unregister(&ORDER, ids[1]).unwrap();
        dispatch(&registry, &Event::new(ORDER));

        assert_eq!(*calls.lock(), vec![0, 2]);
    }

    #[test]
    fn test_duplicate_shared_handler() {
        let registry = HandlerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let handler: Arc<dyn EventHandler> = Arc::new(move |_: &Event| -> EventResult<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.register(ORDER, Arc::clone(&handler));
        registry.register(ORDER, Arc::clone(&handler));
        dispatch(&registry, &Event::new(ORDER));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        registry.unregister_handler(&ORDER, &handler).unwrap();
        dispatch(&registry, &Event::new(ORDER));
        assert_eq!(count.load(Ordering::SeqCst), 3);

        registry.unregister_handler(&ORDER, &handler).unwrap();
        assert_eq!(registry.handler_count(&ORDER), 0);
    }

    #[test]
    fn test_lookup_is_a_snapshot() {
        let registry = HandlerRegistry::new();
        registry.register(ORDER, noop());

        let snapshot = registry.lookup(&ORDER);
        registry.register(ORDER, noop());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.handler_count(&ORDER), 2);
    }
}
