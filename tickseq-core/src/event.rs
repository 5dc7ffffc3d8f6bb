use std::fmt;
use std::rc::Rc;

/// Handle returned by [`MultiEvent::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Multicast event: an ordered set of handlers fired in subscription order.
///
/// Firing works on a snapshot ([`MultiEvent::handlers`]), so a handler may
/// subscribe or unsubscribe on the owning object without disturbing the
/// delivery in progress. `H` is usually an unsized `dyn Fn(..)` type.
pub struct MultiEvent<H: ?Sized> {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Rc<H>)>,
}

impl<H: ?Sized> Default for MultiEvent<H> {
    fn default() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }
}

impl<H: ?Sized> fmt::Debug for MultiEvent<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiEvent")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<H: ?Sized> MultiEvent<H> {
    /// Event with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler; it fires after every handler subscribed before it.
    pub fn subscribe(&mut self, handler: Rc<H>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    /// Remove a handler. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub, _)| *sub != id);
        self.handlers.len() != before
    }

    /// Snapshot of the current handlers in firing order.
    #[must_use]
    pub fn handlers(&self) -> Vec<Rc<H>> {
        self.handlers.iter().map(|(_, h)| Rc::clone(h)).collect()
    }

    /// Number of subscribed handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Parameterless notification, e.g. change-begun.
pub type Notification = dyn Fn();

impl MultiEvent<Notification> {
    /// Fire every handler on a snapshot.
    pub fn fire(&self) {
        for handler in self.handlers() {
            handler();
        }
    }
}
