use std::collections::HashMap;
use std::rc::Weak;

use trellis_dom::Element;

use crate::cancel::CancellationToken;
use crate::component::{Component, ComponentInner};
use crate::event::{EventHub, LifecycleEvent, LifecycleKind};

/// What lifecycle listeners receive.
pub(crate) struct Emission {
    pub component: Component,
    pub event: LifecycleEvent,
}

/// Where a component is registered. The parent link is weak; once the
/// parent is dropped the whole attachment reads as absent.
pub(crate) struct Attachment {
    pub parent: Weak<ComponentInner>,
    pub slot: String,
}

/// Mutable per-instance record of a component. Each component owns exactly
/// one; nothing else holds a reference to it.
#[derive(Default)]
pub(crate) struct ComponentState {
    pub hub: EventHub<LifecycleKind, Emission>,
    /// Present only while connected.
    pub token: Option<CancellationToken>,
    pub root: Option<Element>,
    pub refs: HashMap<String, Element>,
    /// Slot name -> anchor element.
    pub scope_refs: HashMap<String, Element>,
    /// Parent and slot, set and cleared together.
    pub attachment: Option<Attachment>,
    pub connected: bool,
    pub collapsed: bool,
}

impl ComponentState {
    /// Drop everything bound to the current connection and hand back its
    /// token. The caller cancels it once no borrow is held.
    pub fn release_connection(&mut self) -> Option<CancellationToken> {
        self.connected = false;
        self.root = None;
        self.refs.clear();
        self.scope_refs.clear();
        self.token.take()
    }
}
