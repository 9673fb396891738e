//! Synchronous publish/subscribe.
//!
//! [`EventHub`] keeps one ordered subscriber list. `emit` snapshots the
//! matching listeners before calling them, so a listener may subscribe,
//! unsubscribe or emit again while it runs. There is no reentrancy guard:
//! a listener that re-triggers its own event recurses.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use trellis_dom::Element;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<A> = Rc<dyn Fn(&A)>;

struct Subscriber<K, A> {
    id: SubscriptionId,
    key: K,
    callback: Callback<A>,
}

struct HubInner<K, A> {
    next_id: u64,
    subscribers: Vec<Subscriber<K, A>>,
}

/// Keyed listener registry. Cloning yields another handle to the same hub.
pub struct EventHub<K, A> {
    inner: Rc<RefCell<HubInner<K, A>>>,
}

impl<K, A> Clone for EventHub<K, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: PartialEq, A> Default for EventHub<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq, A> EventHub<K, A> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(HubInner {
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn on(&self, key: K, callback: impl Fn(&A) + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            key,
            callback: Rc::new(callback),
        });
        id
    }

    /// Returns `false` if the subscription was already removed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        inner.subscribers.len() != before
    }

    /// Call every listener of `key` in subscription order; returns how many
    /// ran. Listeners added during the emission are not called by it, and
    /// listeners removed during it are skipped.
    pub fn emit(&self, key: &K, args: &A) -> usize {
        let listeners: SmallVec<[(SubscriptionId, Callback<A>); 4]> = self
            .inner
            .borrow()
            .subscribers
            .iter()
            .filter(|s| s.key == *key)
            .map(|s| (s.id, s.callback.clone()))
            .collect();
        let mut ran = 0;
        for (id, listener) in &listeners {
            if !self.is_subscribed(*id) {
                continue;
            }
            listener(args);
            ran += 1;
        }
        ran
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.inner.borrow().subscribers.iter().any(|s| s.id == id)
    }

    pub fn listener_count(&self, key: &K) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|s| s.key == *key)
            .count()
    }
}

/// The lifecycle events a component emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    BeforeConnect,
    Connect,
    Mount,
    BeforeUnmount,
    Disconnect,
    Unmount,
}

impl LifecycleKind {
    pub const ALL: [LifecycleKind; 6] = [
        LifecycleKind::BeforeConnect,
        LifecycleKind::Connect,
        LifecycleKind::Mount,
        LifecycleKind::BeforeUnmount,
        LifecycleKind::Disconnect,
        LifecycleKind::Unmount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleKind::BeforeConnect => "beforeConnect",
            LifecycleKind::Connect => "connect",
            LifecycleKind::Mount => "mount",
            LifecycleKind::BeforeUnmount => "beforeUnmount",
            LifecycleKind::Disconnect => "disconnect",
            LifecycleKind::Unmount => "unmount",
        }
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The freshly cloned, still detached root. Listeners may edit it before
    /// it is inserted.
    BeforeConnect(Element),
    Connect,
    Mount,
    BeforeUnmount,
    Disconnect,
    Unmount,
}

impl LifecycleEvent {
    pub fn kind(&self) -> LifecycleKind {
        match self {
            LifecycleEvent::BeforeConnect(_) => LifecycleKind::BeforeConnect,
            LifecycleEvent::Connect => LifecycleKind::Connect,
            LifecycleEvent::Mount => LifecycleKind::Mount,
            LifecycleEvent::BeforeUnmount => LifecycleKind::BeforeUnmount,
            LifecycleEvent::Disconnect => LifecycleKind::Disconnect,
            LifecycleEvent::Unmount => LifecycleKind::Unmount,
        }
    }
}
