//! Slot composition and recursive mounting.
//!
//! Children are attached to declared slots of a parent. While the parent is
//! connected, each slot's non-collapsed members are mounted, in attachment
//! order, into the anchor element its markup marks for that slot. Mounting is
//! depth-first: a child's `connect` mounts its own children before the
//! parent's mount call returns.

use trellis_dom::Element;

use crate::component::{Component, MountMode};
use crate::error::{Error, Result};
use crate::state::Attachment;

impl Component {
    /// Declare slot names. Must run before children are attached to them;
    /// declaring an existing name again changes nothing.
    pub fn define_slots<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut slots = self.inner.slots.borrow_mut();
        for name in names {
            slots.add_slot(&name.into());
        }
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.inner.slots.borrow().has_slot(name)
    }

    pub fn slot_names(&self) -> Vec<String> {
        self.inner.slots.borrow().slot_names()
    }

    pub fn slot_members(&self, name: &str) -> Vec<Component> {
        self.inner
            .slots
            .borrow()
            .slot(name)
            .map(|s| s.members().to_vec())
            .unwrap_or_default()
    }

    /// Every tracked child across all slots, in attachment order.
    pub fn children(&self) -> Vec<Component> {
        self.inner.slots.borrow().tracked().to_vec()
    }

    /// Whether `self` appears on `other`'s parent chain.
    pub fn is_ancestor_of(&self, other: &Component) -> bool {
        let mut current = other.parent();
        while let Some(parent) = current {
            if parent == *self {
                return true;
            }
            current = parent.parent();
        }
        false
    }

    /// Attach `children` to `slot`.
    ///
    /// Every child is checked before anything changes: the slot must be
    /// declared, a child may not be this component or one of its ancestors,
    /// and a child attached elsewhere must be removed from there first.
    /// Re-adding a child to the slot it already occupies does nothing.
    ///
    /// If this component is connected, the slot is mounted right away.
    pub fn add_child_component<'a>(
        &self,
        slot: &str,
        children: impl IntoIterator<Item = &'a Component>,
    ) -> Result<()> {
        if !self.has_slot(slot) {
            return Err(Error::UndeclaredSlot {
                component: self.name().to_owned(),
                slot: slot.to_owned(),
            });
        }
        let children: Vec<Component> = children.into_iter().cloned().collect();
        for child in &children {
            if child == self || child.is_ancestor_of(self) {
                return Err(Error::Cycle {
                    parent: self.name().to_owned(),
                    child: child.name().to_owned(),
                });
            }
            if let Some((parent, current)) = child.attachment() {
                if parent != *self || current != slot {
                    return Err(Error::AttachedElsewhere {
                        child: child.name().to_owned(),
                        parent: parent.name().to_owned(),
                        slot: current,
                    });
                }
            }
        }

        let added = self
            .inner
            .slots
            .borrow_mut()
            .add_components_to_slot(slot, &children);
        for child in &added {
            child.inner.state.borrow_mut().attachment = Some(Attachment {
                parent: self.downgrade(),
                slot: slot.to_owned(),
            });
            log::debug!("attached `{}` to `{}`/{slot}", child.name(), self.name());
        }

        if self.is_connected() {
            self.mount_slot_components(slot)?;
        }
        Ok(())
    }

    /// Detach `child` if this component is its parent; returns whether it
    /// was. The child's mount state is left as it is.
    pub fn remove_child_component(&self, child: &Component) -> bool {
        if child.parent().as_ref() != Some(self) {
            return false;
        }
        child.inner.state.borrow_mut().attachment = None;
        log::debug!("detached `{}` from `{}`", child.name(), self.name());
        self.inner.slots.borrow_mut().remove_child_component(child)
    }

    /// Unmount and detach every member of `name`. The slot stays declared.
    pub fn clear_slot(&self, name: &str) {
        for member in self.slot_members(name) {
            member.unmount();
            self.remove_child_component(&member);
        }
    }

    /// Clear the slot, then forget it.
    pub fn remove_slot(&self, name: &str) -> bool {
        self.clear_slot(name);
        self.inner.slots.borrow_mut().remove_slot(name).is_some()
    }

    /// Mount every slot. Does nothing while disconnected.
    pub fn mount_children(&self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        for name in self.slot_names() {
            self.mount_slot_components(&name)?;
        }
        Ok(())
    }

    /// Mount the non-collapsed members of `name` into its anchor, appending
    /// in attachment order. Members already connected are left in place.
    ///
    /// A missing slot or anchor is logged and skips this slot only.
    pub fn mount_slot_components(&self, name: &str) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        if !self.has_slot(name) {
            log::warn!("`{}` has no slot `{name}`; nothing mounted", self.name());
            return Ok(());
        }
        let Some(anchor) = self.slot_anchor(name) else {
            log::warn!(
                "markup of `{}` has no anchor for slot `{name}`; nothing mounted",
                self.name()
            );
            return Ok(());
        };
        self.mount_members(name, &anchor)
    }

    fn mount_members(&self, name: &str, anchor: &Element) -> Result<()> {
        for member in self.slot_members(name) {
            if member.is_collapsed() {
                continue;
            }
            member.mount(anchor, MountMode::Append)?;
        }
        Ok(())
    }

    pub fn unmount_slot_components(&self, name: &str) {
        for member in self.slot_members(name) {
            member.unmount();
        }
    }

    /// Unmount every tracked child, whatever its slot.
    pub fn unmount_components(&self) {
        for child in self.children() {
            child.unmount();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_dom::Document;

    fn leaf(name: &str) -> Component {
        Component::builder(name)
            .layout(format!("<span>{name}</span>"))
            .build()
    }

    #[test]
    fn define_slots_is_idempotent() {
        let p = Component::new("p");
        p.define_slots(["a", "b"]);
        p.define_slots(["b", "c"]);
        assert_eq!(p.slot_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn undeclared_slot_is_rejected() {
        let p = Component::new("p");
        let x = leaf("x");
        let err = p.add_child_component("nope", [&x]).unwrap_err();
        assert!(matches!(err, Error::UndeclaredSlot { .. }));
        assert!(x.parent().is_none());
    }

    #[test]
    fn attach_sets_back_reference() {
        let p = Component::builder("p").slots(["a"]).build();
        let (x, y) = (leaf("x"), leaf("y"));
        p.add_child_component("a", [&x, &y]).unwrap();
        assert_eq!(x.parent(), Some(p.clone()));
        assert_eq!(y.slot_name().as_deref(), Some("a"));
        assert_eq!(p.slot_members("a"), vec![x.clone(), y.clone()]);

        // same parent, same slot
        p.add_child_component("a", [&x]).unwrap();
        assert_eq!(p.children().len(), 2);
    }

    #[test]
    fn cycles_are_rejected() {
        let a = Component::builder("a").slots(["s"]).build();
        let b = Component::builder("b").slots(["s"]).build();
        let c = Component::builder("c").slots(["s"]).build();
        a.add_child_component("s", [&b]).unwrap();
        b.add_child_component("s", [&c]).unwrap();

        assert!(matches!(
            c.add_child_component("s", [&a]),
            Err(Error::Cycle { .. })
        ));
        assert!(matches!(
            a.add_child_component("s", [&a]),
            Err(Error::Cycle { .. })
        ));
        assert!(a.is_ancestor_of(&c));
        assert!(!c.is_ancestor_of(&a));
    }

    #[test]
    fn reattachment_elsewhere_requires_removal() {
        let p = Component::builder("p").slots(["a", "b"]).build();
        let q = Component::builder("q").slots(["a"]).build();
        let x = leaf("x");
        p.add_child_component("a", [&x]).unwrap();

        let err = p.add_child_component("b", [&x]).unwrap_err();
        assert!(matches!(err, Error::AttachedElsewhere { ref slot, .. } if slot == "a"));
        assert!(matches!(
            q.add_child_component("a", [&x]),
            Err(Error::AttachedElsewhere { .. })
        ));
        assert!(p.slot_members("b").is_empty());

        assert!(p.remove_child_component(&x));
        q.add_child_component("a", [&x]).unwrap();
        assert_eq!(x.parent(), Some(q));
    }

    #[test]
    fn dropped_parent_clears_slot_name() {
        let x = leaf("x");
        {
            let p = Component::builder("p").slots(["a"]).build();
            p.add_child_component("a", [&x]).unwrap();
            assert_eq!(x.slot_name().as_deref(), Some("a"));
        }
        assert!(x.parent().is_none());
        assert!(x.slot_name().is_none());

        let q = Component::builder("q").slots(["b"]).build();
        q.add_child_component("b", [&x]).unwrap();
        assert_eq!(x.parent(), Some(q));
        assert_eq!(x.slot_name().as_deref(), Some("b"));
    }

    #[test]
    fn attaching_to_connected_parent_mounts_only_that_slot() {
        let doc = Document::new();
        let p = Component::builder("p")
            .layout(r#"<div><ul data-slot="a"></ul><ol data-slot="b"></ol></div>"#)
            .slots(["a", "b"])
            .build();
        let (x, y) = (leaf("x"), leaf("y"));
        p.add_child_component("b", [&y]).unwrap();
        p.mount(&doc.body(), MountMode::Replace).unwrap();
        p.unmount_slot_components("b");
        assert!(!y.is_connected());

        p.add_child_component("a", [&x]).unwrap();
        assert!(x.is_connected());
        assert!(!y.is_connected());
        assert_eq!(p.slot_anchor("a").unwrap().inner_html(), "<span>x</span>");
    }

    #[test]
    fn missing_anchor_only_skips_that_slot() {
        let doc = Document::new();
        let p = Component::builder("p")
            .layout(r#"<div><ul data-slot="b"></ul></div>"#)
            .slots(["a", "b"])
            .build();
        let (x, y) = (leaf("x"), leaf("y"));
        p.add_child_component("a", [&x]).unwrap();
        p.add_child_component("b", [&y]).unwrap();

        p.mount(&doc.body(), MountMode::Replace).unwrap();
        assert!(p.is_connected());
        assert!(!x.is_connected());
        assert!(y.is_connected());
    }

    #[test]
    fn clear_and_remove_slot() {
        let doc = Document::new();
        let p = Component::builder("p")
            .layout(r#"<div data-slot="a"></div>"#)
            .slots(["a"])
            .build();
        let (x, y) = (leaf("x"), leaf("y"));
        p.add_child_component("a", [&x, &y]).unwrap();
        p.mount(&doc.body(), MountMode::Replace).unwrap();

        p.clear_slot("a");
        assert!(p.has_slot("a"));
        assert!(p.children().is_empty());
        assert!(!x.is_connected() && x.parent().is_none());
        assert_eq!(p.root().unwrap().inner_html(), "");

        p.add_child_component("a", [&x]).unwrap();
        assert!(x.is_connected());
        assert!(p.remove_slot("a"));
        assert!(!p.has_slot("a"));
        assert!(!x.is_connected());
        assert!(!p.remove_slot("a"));
    }
}
