//! # Document and element handles
//!
//! A [`Document`] is a single-threaded arena of nodes rooted at a `body`
//! element. [`Element`] is a cheap handle (document + key) in the spirit of
//! `web_sys::Element`: every accessor goes through the arena, so a handle
//! whose node was [released](Element::release) simply stops matching
//! anything.
//!
//! Detached subtrees stay in the arena until released; [`Element::remove`]
//! only unlinks a node from its parent.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::error::DomError;
use crate::markup::{MarkupElement, MarkupNode, escape_attr, escape_text, is_void};

new_key_type! {
    /// Key of a node inside its document's arena.
    pub struct NodeId;
    /// Key of a registered DOM listener.
    pub struct ListenerId;
}

pub type Listener = Rc<dyn Fn(&DomEvent)>;

type Attrs = SmallVec<[(String, String); 4]>;

enum NodeKind {
    Element { tag: String, attrs: Attrs },
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: SmallVec<[ListenerId; 2]>,
}

impl NodeData {
    fn element(tag: String, attrs: Attrs) -> Self {
        Self {
            kind: NodeKind::Element { tag, attrs },
            parent: None,
            children: Vec::new(),
            listeners: SmallVec::new(),
        }
    }

    fn text(text: String) -> Self {
        Self {
            kind: NodeKind::Text(text),
            parent: None,
            children: Vec::new(),
            listeners: SmallVec::new(),
        }
    }

    fn attrs(&self) -> Option<&Attrs> {
        match &self.kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            NodeKind::Text(_) => None,
        }
    }

    fn attrs_mut(&mut self) -> Option<&mut Attrs> {
        match &mut self.kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            NodeKind::Text(_) => None,
        }
    }

    fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }
}

struct ListenerEntry {
    node: NodeId,
    event: String,
    callback: Listener,
}

struct Tree {
    nodes: SlotMap<NodeId, NodeData>,
    listeners: SlotMap<ListenerId, ListenerEntry>,
    body: NodeId,
}

impl Tree {
    fn detach(&mut self, id: NodeId) {
        let parent = match self.nodes.get_mut(id) {
            Some(node) => node.parent.take(),
            None => return,
        };
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Detach `id` and free it together with its whole subtree.
    fn free(&mut self, id: NodeId) {
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                for listener in node.listeners {
                    self.listeners.remove(listener);
                }
                stack.extend(node.children);
            }
        }
    }

    fn build(&mut self, el: &MarkupElement) -> NodeId {
        let attrs: Attrs = el.attrs.iter().cloned().collect();
        let id = self.nodes.insert(NodeData::element(el.tag.clone(), attrs));
        for child in &el.children {
            let child_id = match child {
                MarkupNode::Element(el) => self.build(el),
                MarkupNode::Text(text) => self.nodes.insert(NodeData::text(text.clone())),
            };
            if let Some(node) = self.nodes.get_mut(child_id) {
                node.parent = Some(id);
            }
            if let Some(node) = self.nodes.get_mut(id) {
                node.children.push(child_id);
            }
        }
        id
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if is_void(tag) && node.children.is_empty() {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    fn write_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in &node.children {
                    self.write_text(*child, out);
                }
            }
        }
    }
}

/// Shared handle to a document arena.
#[derive(Clone)]
pub struct Document {
    tree: Rc<RefCell<Tree>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(NodeData::element("body".into(), Attrs::new()));
        Self {
            tree: Rc::new(RefCell::new(Tree {
                nodes,
                listeners: SlotMap::with_key(),
                body,
            })),
        }
    }

    /// The document's root element. Elements are "attached" when their
    /// ancestor chain reaches it.
    pub fn body(&self) -> Element {
        let body = self.tree.borrow().body;
        self.handle(body)
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: impl Into<String>) -> Element {
        let tag = tag.into().to_ascii_lowercase();
        let id = self
            .tree
            .borrow_mut()
            .nodes
            .insert(NodeData::element(tag, Attrs::new()));
        self.handle(id)
    }

    /// Build a detached copy of `markup`.
    pub fn instantiate(&self, markup: &MarkupElement) -> Element {
        let id = self.tree.borrow_mut().build(markup);
        self.handle(id)
    }

    /// Number of nodes (elements and text) currently held by the arena.
    pub fn node_count(&self) -> usize {
        self.tree.borrow().nodes.len()
    }

    /// Number of registered DOM listeners across the whole document.
    pub fn listener_count(&self) -> usize {
        self.tree.borrow().listeners.len()
    }

    /// Unregister a listener. Returns `false` if it was already gone.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut tree = self.tree.borrow_mut();
        match tree.listeners.remove(id) {
            Some(entry) => {
                if let Some(node) = tree.nodes.get_mut(entry.node) {
                    node.listeners.retain(|l| *l != id);
                }
                true
            }
            None => false,
        }
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree)
    }

    fn handle(&self, id: NodeId) -> Element {
        Element {
            doc: self.clone(),
            id,
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Event delivered to DOM listeners.
#[derive(Clone, Debug)]
pub struct DomEvent {
    name: String,
    target: Element,
    current_target: Element,
}

impl DomEvent {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element the event was dispatched on.
    pub fn target(&self) -> &Element {
        &self.target
    }

    /// Element whose listener is currently running.
    pub fn current_target(&self) -> &Element {
        &self.current_target
    }
}

/// Handle to an element node.
#[derive(Clone)]
pub struct Element {
    doc: Document,
    id: NodeId,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.doc.ptr_eq(&other.doc)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            Some(tag) => write!(f, "Element(<{tag}> {:?})", self.id),
            None => write!(f, "Element(<released> {:?})", self.id),
        }
    }
}

impl Element {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Whether the node still exists in its document.
    pub fn is_live(&self) -> bool {
        self.doc.tree.borrow().nodes.contains_key(self.id)
    }

    /// Whether the node is reachable from the document body.
    pub fn is_attached(&self) -> bool {
        let tree = self.doc.tree.borrow();
        tree.nodes.contains_key(self.id) && tree.is_ancestor_or_self(tree.body, self.id)
    }

    pub fn tag(&self) -> Option<String> {
        match &self.doc.tree.borrow().nodes.get(self.id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        let tree = self.doc.tree.borrow();
        tree.nodes
            .get(self.id)?
            .attrs()?
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        let tree = self.doc.tree.borrow();
        tree.nodes
            .get(self.id)
            .and_then(NodeData::attrs)
            .is_some_and(|attrs| attrs.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)))
    }

    /// Names are stored lowercased.
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let mut tree = self.doc.tree.borrow_mut();
        let attrs = tree
            .nodes
            .get_mut(self.id)
            .and_then(NodeData::attrs_mut)
            .ok_or(DomError::StaleNode)?;
        let value = value.into();
        match attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => attrs.push((name, value)),
        }
        Ok(())
    }

    /// Returns `true` if the attribute was present.
    pub fn remove_attribute(&self, name: &str) -> bool {
        let mut tree = self.doc.tree.borrow_mut();
        let Some(attrs) = tree.nodes.get_mut(self.id).and_then(NodeData::attrs_mut) else {
            return false;
        };
        let name = name.to_ascii_lowercase();
        let before = attrs.len();
        attrs.retain(|(n, _)| *n != name);
        attrs.len() != before
    }

    pub fn classes(&self) -> Vec<String> {
        self.attribute("class")
            .map(|c| c.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }

    /// Returns `true` if the class was added.
    pub fn add_class(&self, class: &str) -> bool {
        let mut classes = self.classes();
        if !self.is_live() || classes.iter().any(|c| c == class) {
            return false;
        }
        classes.push(class.to_owned());
        self.set_attribute("class", classes.join(" ")).is_ok()
    }

    /// Returns `true` if the class was present.
    pub fn remove_class(&self, class: &str) -> bool {
        let mut classes = self.classes();
        let before = classes.len();
        classes.retain(|c| c != class);
        if classes.len() == before {
            return false;
        }
        if classes.is_empty() {
            self.remove_attribute("class");
        } else {
            let _ = self.set_attribute("class", classes.join(" "));
        }
        true
    }

    /// Flip `class`; returns whether it is present afterwards.
    pub fn toggle_class(&self, class: &str) -> bool {
        if self.remove_class(class) {
            false
        } else {
            self.add_class(class)
        }
    }

    pub fn parent(&self) -> Option<Element> {
        let parent = self.doc.tree.borrow().nodes.get(self.id)?.parent?;
        Some(self.doc.handle(parent))
    }

    /// Element children in document order (text nodes are skipped).
    pub fn children(&self) -> Vec<Element> {
        let tree = self.doc.tree.borrow();
        let Some(node) = tree.nodes.get(self.id) else {
            return Vec::new();
        };
        node.children
            .iter()
            .filter(|c| tree.nodes.get(**c).is_some_and(NodeData::is_element))
            .map(|c| self.doc.handle(*c))
            .collect()
    }

    pub fn append_child(&self, child: &Element) -> Result<(), DomError> {
        self.insert(child, false)
    }

    pub fn prepend_child(&self, child: &Element) -> Result<(), DomError> {
        self.insert(child, true)
    }

    pub fn append_text(&self, text: impl Into<String>) -> Result<(), DomError> {
        let mut tree = self.doc.tree.borrow_mut();
        if !tree.nodes.contains_key(self.id) {
            return Err(DomError::StaleNode);
        }
        let mut node = NodeData::text(text.into());
        node.parent = Some(self.id);
        let text_id = tree.nodes.insert(node);
        if let Some(parent) = tree.nodes.get_mut(self.id) {
            parent.children.push(text_id);
        }
        Ok(())
    }

    fn insert(&self, child: &Element, at_front: bool) -> Result<(), DomError> {
        if !self.doc.ptr_eq(&child.doc) {
            return Err(DomError::ForeignNode);
        }
        let mut tree = self.doc.tree.borrow_mut();
        if !tree.nodes.contains_key(self.id) || !tree.nodes.contains_key(child.id) {
            return Err(DomError::StaleNode);
        }
        if child.id == tree.body || tree.is_ancestor_or_self(child.id, self.id) {
            return Err(DomError::Hierarchy);
        }
        tree.detach(child.id);
        if let Some(node) = tree.nodes.get_mut(child.id) {
            node.parent = Some(self.id);
        }
        if let Some(parent) = tree.nodes.get_mut(self.id) {
            if at_front {
                parent.children.insert(0, child.id);
            } else {
                parent.children.push(child.id);
            }
        }
        Ok(())
    }

    /// Unlink from the parent. The subtree stays alive and can be reinserted.
    pub fn remove(&self) {
        self.doc.tree.borrow_mut().detach(self.id);
    }

    /// Detach every child. Text children are freed, element children are
    /// left detached.
    pub fn clear_children(&self) {
        let mut tree = self.doc.tree.borrow_mut();
        let children = match tree.nodes.get_mut(self.id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            let is_text = match tree.nodes.get_mut(child) {
                Some(node) => {
                    node.parent = None;
                    !node.is_element()
                }
                None => false,
            };
            if is_text {
                tree.free(child);
            }
        }
    }

    /// Detach and free this element, its subtree, and their listeners.
    /// The body cannot be released.
    pub fn release(&self) {
        let mut tree = self.doc.tree.borrow_mut();
        if self.id != tree.body {
            tree.free(self.id);
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.doc.tree.borrow().write_text(self.id, &mut out);
        out
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.doc.tree.borrow().write_html(self.id, &mut out);
        out
    }

    pub fn inner_html(&self) -> String {
        let tree = self.doc.tree.borrow();
        let mut out = String::new();
        if let Some(node) = tree.nodes.get(self.id) {
            for child in &node.children {
                tree.write_html(*child, &mut out);
            }
        }
        out
    }

    /// First element (in document order, starting with `self`) whose
    /// attribute `name` equals `value`.
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<Element> {
        let mut stack = vec![self.clone()];
        while let Some(el) = stack.pop() {
            if el.attribute(name).as_deref() == Some(value) {
                return Some(el);
            }
            stack.extend(el.children().into_iter().rev());
        }
        None
    }

    pub fn add_event_listener(
        &self,
        event: impl Into<String>,
        callback: impl Fn(&DomEvent) + 'static,
    ) -> Result<ListenerId, DomError> {
        let mut tree = self.doc.tree.borrow_mut();
        if !tree.nodes.contains_key(self.id) {
            return Err(DomError::StaleNode);
        }
        let id = tree.listeners.insert(ListenerEntry {
            node: self.id,
            event: event.into(),
            callback: Rc::new(callback),
        });
        if let Some(node) = tree.nodes.get_mut(self.id) {
            node.listeners.push(id);
        }
        Ok(id)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.doc.remove_event_listener(id)
    }

    /// Listeners registered directly on this element.
    pub fn listener_count(&self) -> usize {
        self.doc
            .tree
            .borrow()
            .nodes
            .get(self.id)
            .map_or(0, |n| n.listeners.len())
    }

    /// Deliver `event` to this element's listeners, then to each ancestor's
    /// (bubbling). Returns how many listeners ran.
    ///
    /// No borrow of the document is held while a listener runs, so listeners
    /// may mutate the tree. A listener removed by an earlier one in the same
    /// dispatch is skipped.
    pub fn dispatch(&self, event: &str) -> usize {
        let route: Vec<(NodeId, ListenerId, Listener)> = {
            let tree = self.doc.tree.borrow();
            let mut route = Vec::new();
            let mut current = tree.nodes.contains_key(self.id).then_some(self.id);
            while let Some(id) = current {
                let Some(node) = tree.nodes.get(id) else {
                    break;
                };
                for listener in &node.listeners {
                    if let Some(entry) = tree.listeners.get(*listener)
                        && entry.event == event
                    {
                        route.push((id, *listener, entry.callback.clone()));
                    }
                }
                current = node.parent;
            }
            route
        };

        let mut invoked = 0;
        for (node, listener, callback) in route {
            if !self.doc.tree.borrow().listeners.contains_key(listener) {
                continue;
            }
            let ev = DomEvent {
                name: event.to_owned(),
                target: self.clone(),
                current_target: self.doc.handle(node),
            };
            callback(&ev);
            invoked += 1;
        }
        invoked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn append_and_prepend_keep_order() {
        let doc = Document::new();
        let body = doc.body();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        body.append_child(&b).unwrap();
        body.append_child(&c).unwrap();
        body.prepend_child(&a).unwrap();
        assert_eq!(body.children(), vec![a.clone(), b, c]);
        assert_eq!(a.parent(), Some(body));
        assert!(a.is_attached());
    }

    #[test]
    fn attribute_names_ignore_case() {
        let doc = Document::new();
        let div = doc.create_element("div");
        div.set_attribute("Title", "a").unwrap();
        div.set_attribute("TITLE", "b").unwrap();
        assert_eq!(div.outer_html(), r#"<div title="b"></div>"#);
        assert_eq!(div.attribute("Title").as_deref(), Some("b"));
        assert!(div.has_attribute("title"));
        assert!(div.remove_attribute("TiTlE"));
        assert!(!div.has_attribute("title"));
    }

    #[test]
    fn reinserting_moves_the_node() {
        let doc = Document::new();
        let left = doc.create_element("div");
        let right = doc.create_element("div");
        let item = doc.create_element("span");
        left.append_child(&item).unwrap();
        right.append_child(&item).unwrap();
        assert!(left.children().is_empty());
        assert_eq!(right.children(), vec![item]);
    }

    #[test]
    fn hierarchy_violations_are_rejected() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        outer.append_child(&inner).unwrap();
        assert_eq!(inner.append_child(&outer), Err(DomError::Hierarchy));
        assert_eq!(outer.append_child(&outer), Err(DomError::Hierarchy));
        assert_eq!(outer.append_child(&doc.body()), Err(DomError::Hierarchy));

        let other = Document::new();
        assert_eq!(
            outer.append_child(&other.create_element("p")),
            Err(DomError::ForeignNode)
        );
    }

    #[test]
    fn release_frees_subtree_and_listeners() {
        let doc = Document::new();
        let body = doc.body();
        let list = doc.create_element("ul");
        let item = doc.create_element("li");
        list.append_child(&item).unwrap();
        item.append_text("one").unwrap();
        body.append_child(&list).unwrap();
        item.add_event_listener("click", |_| {}).unwrap();
        assert_eq!(doc.node_count(), 4);
        assert_eq!(doc.listener_count(), 1);

        list.release();
        assert!(!list.is_live());
        assert!(!item.is_live());
        assert!(body.children().is_empty());
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.listener_count(), 0);
        assert_eq!(list.append_child(&doc.create_element("li")), Err(DomError::StaleNode));
    }

    #[test]
    fn classes_toggle() {
        let doc = Document::new();
        let el = doc.create_element("div");
        assert!(el.add_class("a"));
        assert!(!el.add_class("a"));
        assert!(el.add_class("b"));
        assert_eq!(el.attribute("class").as_deref(), Some("a b"));
        assert!(!el.toggle_class("a"));
        assert!(el.toggle_class("a"));
        assert_eq!(el.classes(), vec!["b".to_string(), "a".to_string()]);
        el.remove_class("a");
        el.remove_class("b");
        assert!(!el.has_attribute("class"));
    }

    #[test]
    fn dispatch_bubbles_in_registration_order() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let button = doc.create_element("button");
        outer.append_child(&button).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        for label in ["button-1", "button-2"] {
            let seen = seen.clone();
            button
                .add_event_listener("click", move |ev| {
                    assert_eq!(ev.name(), "click");
                    seen.borrow_mut().push(label);
                })
                .unwrap();
        }
        {
            let seen = seen.clone();
            outer
                .add_event_listener("click", move |ev| {
                    assert_eq!(ev.target().tag().as_deref(), Some("button"));
                    assert_eq!(ev.current_target().tag().as_deref(), Some("div"));
                    seen.borrow_mut().push("outer");
                })
                .unwrap();
        }
        outer.add_event_listener("input", |_| panic!("wrong event")).unwrap();

        assert_eq!(button.dispatch("click"), 3);
        assert_eq!(*seen.borrow(), vec!["button-1", "button-2", "outer"]);
    }

    #[test]
    fn listener_removed_mid_dispatch_is_skipped() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let second: Rc<RefCell<Option<ListenerId>>> = Rc::new(RefCell::new(None));
        {
            let second = second.clone();
            let handle = el.clone();
            el.add_event_listener("ping", move |_| {
                if let Some(id) = *second.borrow() {
                    handle.remove_event_listener(id);
                }
            })
            .unwrap();
        }
        let id = el.add_event_listener("ping", |_| panic!("removed")).unwrap();
        *second.borrow_mut() = Some(id);
        assert_eq!(el.dispatch("ping"), 1);
        assert!(!doc.remove_event_listener(id));
    }

    #[test]
    fn html_serialization_escapes() {
        let doc = Document::new();
        let el = doc.create_element("p");
        el.set_attribute("title", "a \"quote\"").unwrap();
        el.append_text("1 < 2 & 3").unwrap();
        el.append_child(&doc.create_element("br")).unwrap();
        assert_eq!(
            el.outer_html(),
            "<p title=\"a &quot;quote&quot;\">1 &lt; 2 &amp; 3<br></p>"
        );
        assert_eq!(el.text_content(), "1 < 2 & 3");
    }

    #[test]
    fn clear_children_detaches_elements() {
        let doc = Document::new();
        let host = doc.create_element("div");
        let kept = doc.create_element("span");
        host.append_child(&kept).unwrap();
        host.append_text("gone").unwrap();
        host.clear_children();
        assert!(host.inner_html().is_empty());
        assert!(kept.is_live());
        assert_eq!(kept.parent(), None);
        assert_eq!(doc.node_count(), 3);
    }
}
