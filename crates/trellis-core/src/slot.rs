//! Slot bookkeeping.
//!
//! A [`SlotManager`] only records who is attached where. Mounting members
//! into their anchors is driven by the owning component (see
//! `composition.rs`), which needs its connection state and refs.

use crate::component::Component;

/// A named bucket of child components. Member order is mount order.
#[derive(Debug)]
pub struct Slot {
    name: String,
    members: Vec<Component>,
}

impl Slot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Component] {
        &self.members
    }

    pub fn contains(&self, component: &Component) -> bool {
        self.members.contains(component)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn remove(&mut self, component: &Component) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != component);
        self.members.len() != before
    }
}

/// All slots of one component plus the flattened set of every child tracked
/// across them.
#[derive(Debug, Default)]
pub struct SlotManager {
    slots: Vec<Slot>,
    tracked: Vec<Component>,
}

impl SlotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create-or-fetch.
    pub fn add_slot(&mut self, name: &str) -> &mut Slot {
        let idx = match self.slots.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.slots.push(Slot::new(name));
                self.slots.len() - 1
            }
        };
        &mut self.slots[idx]
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name == name)
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Declaration order.
    pub fn slot_names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.clone()).collect()
    }

    /// Drop the slot record and untrack its members. Unmounting them is the
    /// caller's job.
    pub fn remove_slot(&mut self, name: &str) -> Option<Slot> {
        let idx = self.slots.iter().position(|s| s.name == name)?;
        let slot = self.slots.remove(idx);
        self.tracked.retain(|c| !slot.contains(c));
        Some(slot)
    }

    /// Register `children` under `name`, creating the slot if needed.
    /// Children already tracked by this manager (under any slot) are skipped.
    /// Returns the newly registered ones, in order.
    pub fn add_components_to_slot(&mut self, name: &str, children: &[Component]) -> Vec<Component> {
        let mut added = Vec::new();
        for child in children {
            if self.tracked.contains(child) {
                continue;
            }
            self.tracked.push(child.clone());
            self.add_slot(name).members.push(child.clone());
            added.push(child.clone());
        }
        added
    }

    /// Untrack `child` from every slot; returns whether it was tracked.
    pub fn remove_child_component(&mut self, child: &Component) -> bool {
        for slot in &mut self.slots {
            slot.remove(child);
        }
        let before = self.tracked.len();
        self.tracked.retain(|c| c != child);
        self.tracked.len() != before
    }

    pub fn tracked(&self) -> &[Component] {
        &self.tracked
    }

    pub fn is_tracked(&self, child: &Component) -> bool {
        self.tracked.contains(child)
    }

    pub fn slot_of(&self, child: &Component) -> Option<&str> {
        self.slots
            .iter()
            .find(|s| s.contains(child))
            .map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_slot_is_create_or_fetch() {
        let mut slots = SlotManager::new();
        slots.add_slot("a");
        slots.add_slot("b");
        slots.add_slot("a");
        assert_eq!(slots.slot_names(), vec!["a", "b"]);
        assert!(slots.has_slot("b"));
        assert!(!slots.has_slot("c"));
    }

    #[test]
    fn registration_dedups_across_slots() {
        let (x, y, z) = (
            Component::new("x"),
            Component::new("y"),
            Component::new("z"),
        );
        let mut slots = SlotManager::new();

        let added = slots.add_components_to_slot("a", &[x.clone(), y.clone(), x.clone()]);
        assert_eq!(added, vec![x.clone(), y.clone()]);

        // lazily created, and x is skipped because "a" already tracks it
        let added = slots.add_components_to_slot("b", &[x.clone(), z.clone()]);
        assert_eq!(added, vec![z.clone()]);
        assert_eq!(slots.slot("b").map(Slot::len), Some(1));
        assert_eq!(slots.slot_of(&x), Some("a"));
        assert_eq!(slots.tracked(), &[x.clone(), y.clone(), z.clone()]);
    }

    #[test]
    fn removal_untracks_everywhere() {
        let (x, y) = (Component::new("x"), Component::new("y"));
        let mut slots = SlotManager::new();
        slots.add_components_to_slot("a", &[x.clone(), y.clone()]);

        assert!(slots.remove_child_component(&x));
        assert!(!slots.remove_child_component(&x));
        assert!(!slots.is_tracked(&x));
        assert_eq!(slots.slot("a").map(|s| s.members().to_vec()), Some(vec![y.clone()]));

        let removed = slots.remove_slot("a").unwrap();
        assert_eq!(removed.name(), "a");
        assert!(slots.tracked().is_empty());
        assert!(slots.remove_slot("a").is_none());
    }
}
