/// Identifies a registered observer so it can be removed again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

type Observer<E> = Box<dyn FnMut(&E) + Send>;

/// Typed, single-owner event bus.
///
/// Publishing is explicit: [`EventBus::emit`] calls every observer in
/// registration order on the caller's thread, then buffers the event until
/// [`EventBus::drain`]. Observers that need another execution context must
/// forward the event themselves (e.g. onto a channel).
pub struct EventBus<E> {
    events: Vec<E>,
    observers: Vec<(ObserverId, Observer<E>)>,
    next_observer: u64,
    published: u64,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            observers: Vec::new(),
            next_observer: 0,
            published: 0,
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffered", &self.events.len())
            .field("observers", &self.observers.len())
            .field("published", &self.published)
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&E) + Send + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns `true` if the observer was registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub fn emit(&mut self, event: E) {
        for (_, observer) in &mut self.observers {
            observer(&event);
        }
        self.published += 1;
        self.events.push(event);
    }

    pub fn events(&self) -> &[E] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }

    /// Total number of events ever emitted on this bus.
    pub fn published(&self) -> u64 {
        self.published
    }
}
