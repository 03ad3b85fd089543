use std::fmt;
use tracing::warn;

use crate::element::HostElement;
use crate::session::SessionHandle;

/// Callback invoked with every appended batch before it lands in the stream
pub type Observer<E> = Box<dyn FnMut(&mut [E])>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// The host's live element collection with an explicit append hook.
///
/// Observers see each batch in subscription order, then the batch is
/// appended exactly once, in its original order. Observers cannot change
/// what gets appended or what `push` returns.
pub struct ElementStream<E> {
    items: Vec<E>,
    observers: Vec<(SubscriptionId, Observer<E>)>,
    next_id: u64,
}

impl<E> ElementStream<E> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            observers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&mut [E]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Append a batch; returns the new length.
    pub fn push(&mut self, batch: impl IntoIterator<Item = E>) -> usize {
        let mut batch: Vec<E> = batch.into_iter().collect();
        for (_, observer) in self.observers.iter_mut() {
            observer(&mut batch);
        }
        self.items.append(&mut batch);
        self.items.len()
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn retain(&mut self, f: impl FnMut(&E) -> bool) {
        self.items.retain(f);
    }
}

impl<E> Default for ElementStream<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: fmt::Debug> fmt::Debug for ElementStream<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementStream")
            .field("items", &self.items)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Routes appended elements into the session's decision engine.
#[derive(Clone)]
pub struct Interceptor {
    session: SessionHandle,
}

impl Interceptor {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }

    pub fn on_elements_appended<E: HostElement>(&self, elements: &mut [E]) {
        // Host appended from inside one of our own callbacks
        let Ok(mut session) = self.session.try_borrow_mut() else {
            warn!(count = elements.len(), "session busy, batch appended without routing");
            return;
        };
        session.route_elements(elements);
    }

    /// Subscribe to `stream` for as long as the subscription lives.
    pub fn attach<E: HostElement + 'static>(self, stream: &mut ElementStream<E>) -> SubscriptionId {
        stream.subscribe(move |batch: &mut [E]| self.on_elements_appended(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::SpawnedElement;
    use crate::rng::Dice;
    use crate::session::Session;
    use crate::settings::{MemorySettingsStore, Settings};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn handle() -> SessionHandle {
        let settings = Settings {
            min_bomb_hits: 1,
            min_ice_hits: 2,
            flower_skip_percentage: 0.0,
            ..Settings::default()
        };
        Session::new(settings, Box::new(MemorySettingsStore::new()), Dice::seeded(3)).into_handle()
    }

    #[test]
    fn push_returns_length_and_keeps_order() {
        let mut stream: ElementStream<u32> = ElementStream::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        stream.subscribe(move |batch: &mut [u32]| s.borrow_mut().extend_from_slice(batch));

        assert_eq!(stream.push([1, 2, 3]), 3);
        assert_eq!(stream.push([4]), 4);
        assert_eq!(stream.items(), &[1, 2, 3, 4]);
        assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn observers_run_in_subscription_order() {
        let mut stream: ElementStream<u8> = ElementStream::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = log.clone();
        let b = log.clone();
        stream.subscribe(move |_: &mut [u8]| a.borrow_mut().push("a"));
        let id = stream.subscribe(move |_: &mut [u8]| b.borrow_mut().push("b"));
        stream.push([0]);
        assert!(stream.unsubscribe(id));
        assert!(!stream.unsubscribe(id));
        stream.push([0]);
        assert_eq!(*log.borrow(), vec!["a", "b", "a"]);
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn interceptor_routes_and_stream_keeps_everything() {
        let session = handle();
        let mut stream: ElementStream<SpawnedElement> = ElementStream::new();
        Interceptor::new(session.clone()).attach(&mut stream);

        let clicks = Rc::new(Cell::new(0));
        let make = |kind: &str| {
            let c = clicks.clone();
            SpawnedElement::new(kind, move || c.set(c.get() + 1))
        };
        let len = stream.push(vec![make("CLOVER"), make("BOMB"), make("BOMB"), make("FREEZE")]);
        stream.push(vec![SpawnedElement::inert("CLOVER"), make("DOGS")]);

        assert_eq!(len, 4);
        assert_eq!(stream.len(), 6);
        assert_eq!(clicks.get(), 3);
        let consumed: Vec<bool> = stream.items().iter().map(|e| e.is_consumed()).collect();
        assert_eq!(consumed, vec![true, true, false, true, false, false]);

        let stats = *session.borrow().stats();
        assert_eq!(stats.bomb_hits, 1);
        assert_eq!(stats.ice_hits, 1);
        assert_eq!(stats.score, 0);
    }

    #[test]
    fn paused_session_appends_without_clicking() {
        let session = handle();
        let mut stream: ElementStream<SpawnedElement> = ElementStream::new();
        Interceptor::new(session.clone()).attach(&mut stream);

        stream.push(vec![SpawnedElement::new("CLOVER", || {})]);
        let before = *session.borrow().stats();
        session.borrow_mut().pause();

        stream.push((0..20).map(|_| SpawnedElement::new("CLOVER", || panic!("clicked while paused"))));
        assert_eq!(stream.len(), 21);
        assert_eq!(*session.borrow().stats(), before);

        session.borrow_mut().resume();
        stream.push(vec![SpawnedElement::new("CLOVER", || {})]);
        assert_eq!(session.borrow().stats().score, before.score + 1);
    }

    #[test]
    fn busy_session_still_appends() {
        let session = handle();
        let mut stream: ElementStream<SpawnedElement> = ElementStream::new();
        Interceptor::new(session.clone()).attach(&mut stream);

        let guard = session.borrow_mut();
        stream.push(vec![SpawnedElement::new("CLOVER", || {})]);
        drop(guard);

        assert_eq!(stream.len(), 1);
        assert_eq!(session.borrow().stats().score, 0);
    }
}
