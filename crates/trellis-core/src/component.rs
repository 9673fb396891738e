use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use trellis_dom::{
    DomEvent, Element, MarkupElement, RefAnnotation, Template, TemplateError, collect_refs,
    markup_config,
};

use crate::cancel::{CancellationToken, Dispose};
use crate::error::{Error, Result};
use crate::event::{LifecycleEvent, LifecycleKind, SubscriptionId};
use crate::hooks::{Hook, HookKind, HookResult, Hooks, run_guarded};
use crate::slot::SlotManager;
use crate::state::{ComponentState, Emission};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl ComponentId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ComponentId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a render layout produces.
#[derive(Clone, Debug)]
pub enum Rendered {
    Markup(String),
    Node(MarkupElement),
}

impl From<&str> for Rendered {
    fn from(s: &str) -> Self {
        Rendered::Markup(s.to_owned())
    }
}

impl From<String> for Rendered {
    fn from(s: String) -> Self {
        Rendered::Markup(s)
    }
}

impl From<MarkupElement> for Rendered {
    fn from(el: MarkupElement) -> Self {
        Rendered::Node(el)
    }
}

/// Source of a component's template.
#[derive(Clone)]
pub enum Layout {
    Markup(String),
    /// Called once per compilation with the component being compiled.
    Render(Rc<dyn Fn(&Component) -> Rendered>),
}

impl Layout {
    pub fn render<R: Into<Rendered>>(f: impl Fn(&Component) -> R + 'static) -> Self {
        Layout::Render(Rc::new(move |c: &Component| f(c).into()))
    }
}

impl From<&str> for Layout {
    fn from(s: &str) -> Self {
        Layout::Markup(s.to_owned())
    }
}

impl From<String> for Layout {
    fn from(s: String) -> Self {
        Layout::Markup(s)
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Markup(m) => f.debug_tuple("Markup").field(m).finish(),
            Layout::Render(_) => f.write_str("Render(..)"),
        }
    }
}

/// How a root-level mount composes with the container's existing children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MountMode {
    /// Clear the container first.
    #[default]
    Replace,
    Append,
    Prepend,
}

impl FromStr for MountMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "replace" => Ok(MountMode::Replace),
            "append" => Ok(MountMode::Append),
            "prepend" => Ok(MountMode::Prepend),
            other => Err(Error::Mode(other.to_owned())),
        }
    }
}

impl fmt::Display for MountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MountMode::Replace => "replace",
            MountMode::Append => "append",
            MountMode::Prepend => "prepend",
        })
    }
}

#[derive(Default)]
struct Source {
    layout: Option<Layout>,
    annotation: Option<RefAnnotation>,
    /// Compiled lazily; cleared by `set_layout`.
    template: Option<Template>,
}

pub(crate) struct ComponentInner {
    id: ComponentId,
    name: String,
    source: RefCell<Source>,
    pub(crate) state: RefCell<ComponentState>,
    pub(crate) slots: RefCell<SlotManager>,
    hooks: RefCell<Hooks>,
}

/// A node of the component forest.
///
/// Cloning yields another handle to the same instance; equality is identity.
/// A parent holds its children strongly through its slots, a child refers
/// back to its parent weakly.
#[derive(Clone)]
pub struct Component {
    pub(crate) inner: Rc<ComponentInner>,
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Component {
    /// A disconnected, unattached component with no layout yet. Never fails;
    /// layout problems surface on the first `mount`.
    pub fn new(name: impl Into<String>) -> Self {
        let component = Component {
            inner: Rc::new(ComponentInner {
                id: ComponentId::next(),
                name: name.into(),
                source: RefCell::new(Source::default()),
                state: RefCell::new(ComponentState::default()),
                slots: RefCell::new(SlotManager::new()),
                hooks: RefCell::new(Hooks::default()),
            }),
        };
        component.on_lifecycle(LifecycleKind::Connect, |c, _| {
            c.run_hook(HookKind::Connected)
        });
        component.on_lifecycle(LifecycleKind::Disconnect, |c, _| {
            c.run_hook(HookKind::Disconnected)
        });
        component
    }

    pub fn builder(name: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder::new(name)
    }

    pub(crate) fn from_inner(inner: Rc<ComponentInner>) -> Self {
        Component { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ComponentInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().connected
    }

    pub fn is_collapsed(&self) -> bool {
        self.inner.state.borrow().collapsed
    }

    /// The live root while connected.
    pub fn root(&self) -> Option<Element> {
        self.inner.state.borrow().root.clone()
    }

    pub fn parent(&self) -> Option<Component> {
        self.attachment().map(|(parent, _)| parent)
    }

    /// The slot of the parent this component is registered under.
    pub fn slot_name(&self) -> Option<String> {
        self.attachment().map(|(_, slot)| slot)
    }

    /// Parent and slot together, `None` once the parent is gone.
    pub(crate) fn attachment(&self) -> Option<(Component, String)> {
        let state = self.inner.state.borrow();
        let attachment = state.attachment.as_ref()?;
        let parent = attachment.parent.upgrade()?;
        Some((Component::from_inner(parent), attachment.slot.clone()))
    }

    /// Record a new template source and optional ref contract. The compiled
    /// template is dropped; the next mount compiles again.
    pub fn set_layout(&self, layout: impl Into<Layout>, annotation: Option<RefAnnotation>) {
        let mut source = self.inner.source.borrow_mut();
        source.layout = Some(layout.into());
        source.annotation = annotation;
        source.template = None;
    }

    fn compile_template(&self) -> Result<Template> {
        let layout = {
            let source = self.inner.source.borrow();
            if let Some(template) = &source.template {
                return Ok(template.clone());
            }
            source
                .layout
                .clone()
                .ok_or_else(|| Error::NoLayout(self.name().to_owned()))?
        };
        let template = match layout {
            Layout::Markup(markup) => self.parse_layout(&markup)?,
            Layout::Render(render) => match render(self) {
                Rendered::Markup(markup) => self.parse_layout(&markup)?,
                Rendered::Node(el) => Template::from_element(el),
            },
        };
        log::trace!("compiled template of `{}`", self.name());
        self.inner.source.borrow_mut().template = Some(template.clone());
        Ok(template)
    }

    fn parse_layout(&self, markup: &str) -> Result<Template> {
        Template::parse(markup).map_err(|err| match err {
            TemplateError::TopLevel { found } => Error::TopLevel {
                component: self.name().to_owned(),
                found,
            },
            TemplateError::Markup(source) => Error::Markup {
                component: self.name().to_owned(),
                source,
            },
        })
    }

    /// Insert a fresh copy of the template into `container` and connect it.
    ///
    /// A no-op if already connected. Listeners of
    /// [`LifecycleKind::BeforeConnect`] see the detached copy and may edit it
    /// before it is inserted.
    pub fn mount(&self, container: &Element, mode: MountMode) -> Result<()> {
        if !container.is_live() {
            return Err(Error::DeadContainer);
        }
        let template = self.compile_template()?;
        if self.is_connected() {
            return Ok(());
        }

        let root = template.instantiate(container.document());
        self.emit(LifecycleEvent::BeforeConnect(root.clone()));
        match mode {
            MountMode::Replace => {
                container.clear_children();
                container.append_child(&root)?;
            }
            MountMode::Append => container.append_child(&root)?,
            MountMode::Prepend => container.prepend_child(&root)?,
        }

        if let Err(err) = self.connect(&root) {
            if self.root().as_ref() != Some(&root) {
                root.remove();
                root.release();
            }
            return Err(err);
        }
        log::debug!("mounted `{}` ({mode})", self.name());
        self.emit(LifecycleEvent::Mount);
        Ok(())
    }

    /// Bind this component to `root`: resolve refs and slot anchors, check
    /// them against the ref annotation, open a cancellation scope and mount
    /// attached children.
    ///
    /// Fails without touching any state if already connected or if the
    /// annotation is violated.
    pub fn connect(&self, root: &Element) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected(self.name().to_owned()));
        }
        let scan = collect_refs(root);
        if let Some(annotation) = &self.inner.source.borrow().annotation {
            annotation
                .validate(&scan.refs)
                .map_err(|violations| Error::Contract {
                    component: self.name().to_owned(),
                    violations,
                })?;
        }
        {
            let mut state = self.inner.state.borrow_mut();
            state.token = Some(CancellationToken::new());
            state.refs = scan.refs;
            state.scope_refs = scan.slots;
            state.root = Some(root.clone());
            state.connected = true;
        }
        log::debug!("connected `{}`", self.name());

        self.mount_children()?;
        self.emit(LifecycleEvent::Connect);
        Ok(())
    }

    /// Drop refs and cancel every listener registered through [`on`](Self::on)
    /// during this connection. Children and the root node are left alone.
    pub fn disconnect(&self) {
        let token = {
            let mut state = self.inner.state.borrow_mut();
            if !state.connected {
                return;
            }
            state.release_connection()
        };
        if let Some(token) = token {
            token.cancel();
        }
        log::debug!("disconnected `{}`", self.name());
        self.emit(LifecycleEvent::Disconnect);
    }

    /// Disconnect, unmount every tracked child, then take the root out of
    /// the document and free it.
    pub fn unmount(&self) {
        let Some(root) = self.root() else {
            return;
        };
        self.emit(LifecycleEvent::BeforeUnmount);
        self.disconnect();
        self.unmount_components();
        root.remove();
        root.release();
        log::debug!("unmounted `{}`", self.name());
        self.emit(LifecycleEvent::Unmount);
    }

    /// Unmount and stay out of the document until [`expand`](Self::expand),
    /// even when the parent remounts this component's slot.
    pub fn collapse(&self) {
        self.unmount();
        self.inner.state.borrow_mut().collapsed = true;
        log::debug!("collapsed `{}`", self.name());
    }

    /// Clear the collapsed flag and, if attached to a connected parent, mount
    /// back into the same slot.
    pub fn expand(&self) -> Result<()> {
        self.inner.state.borrow_mut().collapsed = false;
        if self.is_connected() {
            return Ok(());
        }
        let (Some(parent), Some(slot)) = (self.parent(), self.slot_name()) else {
            return Ok(());
        };
        log::debug!("expanding `{}` into `{}`/{slot}", self.name(), parent.name());
        parent.mount_slot_components(&slot)
    }

    pub fn show(&self) {
        if let Some(root) = self.root() {
            root.remove_class(&markup_config().hidden_class);
        }
    }

    pub fn hide(&self) {
        if let Some(root) = self.root() {
            root.add_class(&markup_config().hidden_class);
        }
    }

    pub fn get_refs(&self) -> Result<HashMap<String, Element>> {
        let state = self.inner.state.borrow();
        if !state.connected {
            return Err(Error::NotConnected(self.name().to_owned()));
        }
        Ok(state.refs.clone())
    }

    pub fn get_ref(&self, name: &str) -> Result<Element> {
        let state = self.inner.state.borrow();
        if !state.connected {
            return Err(Error::NotConnected(self.name().to_owned()));
        }
        state.refs.get(name).cloned().ok_or_else(|| Error::UnknownRef {
            component: self.name().to_owned(),
            name: name.to_owned(),
        })
    }

    pub fn has_ref(&self, name: &str) -> bool {
        self.inner.state.borrow().refs.contains_key(name)
    }

    /// The anchor element of slot `name` while connected.
    pub fn slot_anchor(&self, name: &str) -> Option<Element> {
        self.inner.state.borrow().scope_refs.get(name).cloned()
    }

    /// Listen to `event` on `element` for the rest of the current connection.
    /// The listener is removed on the next disconnect, or earlier through
    /// the returned guard.
    pub fn on(
        &self,
        element: &Element,
        event: &str,
        f: impl Fn(&DomEvent) + 'static,
    ) -> Result<Dispose> {
        let token = self
            .inner
            .state
            .borrow()
            .token
            .clone()
            .ok_or_else(|| Error::NotConnected(self.name().to_owned()))?;
        token.listen(element, event, f)
    }

    pub fn on_lifecycle(
        &self,
        kind: LifecycleKind,
        f: impl Fn(&Component, &LifecycleEvent) + 'static,
    ) -> SubscriptionId {
        let hub = self.inner.state.borrow().hub.clone();
        hub.on(kind, move |e: &Emission| f(&e.component, &e.event))
    }

    pub fn off_lifecycle(&self, id: SubscriptionId) -> bool {
        let hub = self.inner.state.borrow().hub.clone();
        hub.off(id)
    }

    fn emit(&self, event: LifecycleEvent) {
        let hub = self.inner.state.borrow().hub.clone();
        let kind = event.kind();
        log::trace!("`{}` emits {kind}", self.name());
        hub.emit(
            &kind,
            &Emission {
                component: self.clone(),
                event,
            },
        );
    }

    /// Replace the hook run after every connect.
    pub fn on_connected(&self, f: impl Fn(&Component) -> HookResult + 'static) {
        self.inner
            .hooks
            .borrow_mut()
            .set(HookKind::Connected, Rc::new(f));
    }

    /// Replace the hook run after every disconnect.
    pub fn on_disconnected(&self, f: impl Fn(&Component) -> HookResult + 'static) {
        self.inner
            .hooks
            .borrow_mut()
            .set(HookKind::Disconnected, Rc::new(f));
    }

    fn run_hook(&self, kind: HookKind) {
        let hook = self.inner.hooks.borrow().get(kind);
        if let Some(hook) = hook {
            run_guarded(self, kind, &hook);
        }
    }
}

/// Builder for [`Component`].
///
/// ```rust
/// use trellis_core::prelude::*;
///
/// let card = Component::builder("card")
///     .layout(r#"<div><h2 data-ref="title"></h2><ul data-slot="items"></ul></div>"#)
///     .refs(RefAnnotation::new().require("title", RefType::tag("h2")))
///     .slots(["items"])
///     .on_connected(|c| {
///         c.get_ref("title")?.append_text("Hello")?;
///         Ok(())
///     })
///     .build();
/// assert_eq!(card.slot_names(), vec!["items"]);
/// ```
#[must_use]
pub struct ComponentBuilder {
    name: String,
    layout: Option<Layout>,
    annotation: Option<RefAnnotation>,
    slots: Vec<String>,
    connected: Option<Hook>,
    disconnected: Option<Hook>,
}

impl ComponentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: None,
            annotation: None,
            slots: Vec::new(),
            connected: None,
            disconnected: None,
        }
    }

    pub fn layout(mut self, layout: impl Into<Layout>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn refs(mut self, annotation: RefAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn slots<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.slots.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn on_connected(mut self, f: impl Fn(&Component) -> HookResult + 'static) -> Self {
        self.connected = Some(Rc::new(f));
        self
    }

    pub fn on_disconnected(mut self, f: impl Fn(&Component) -> HookResult + 'static) -> Self {
        self.disconnected = Some(Rc::new(f));
        self
    }

    pub fn build(self) -> Component {
        let component = Component::new(self.name);
        if let Some(layout) = self.layout {
            component.set_layout(layout, self.annotation);
        } else if self.annotation.is_some() {
            component.inner.source.borrow_mut().annotation = self.annotation;
        }
        component.define_slots(self.slots);
        {
            let mut hooks = component.inner.hooks.borrow_mut();
            if let Some(hook) = self.connected {
                hooks.set(HookKind::Connected, hook);
            }
            if let Some(hook) = self.disconnected {
                hooks.set(HookKind::Disconnected, hook);
            }
        }
        component
    }
}
