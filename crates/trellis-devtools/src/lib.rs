use serde::Serialize;

use trellis_core::Component;

/// One component and everything attached below it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeSnapshot {
    pub name: String,
    pub id: u64,
    pub connected: bool,
    pub collapsed: bool,
    /// The parent slot this component is attached to.
    pub slot: Option<String>,
    pub slots: Vec<SlotSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotSnapshot {
    pub name: String,
    /// Whether the owner's markup currently resolves an anchor for this slot.
    /// Always `false` while the owner is disconnected.
    pub anchored: bool,
    pub members: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    pub fn capture(component: &Component) -> Self {
        let slots = component
            .slot_names()
            .into_iter()
            .map(|name| SlotSnapshot {
                anchored: component.slot_anchor(&name).is_some(),
                members: component
                    .slot_members(&name)
                    .iter()
                    .map(TreeSnapshot::capture)
                    .collect(),
                name,
            })
            .collect();
        Self {
            name: component.name().to_owned(),
            id: component.id().0,
            connected: component.is_connected(),
            collapsed: component.is_collapsed(),
            slot: component.slot_name(),
            slots,
        }
    }

    /// Indented outline, one component or slot per line. Ids are left out so
    /// the output is stable across runs.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        self.write_lines(0, &mut lines);
        lines.join("\n")
    }

    fn write_lines(&self, depth: usize, lines: &mut Vec<String>) {
        let state = match (self.connected, self.collapsed) {
            (true, _) => "connected",
            (false, true) => "collapsed",
            (false, false) => "disconnected",
        };
        lines.push(format!("{}{} [{state}]", "  ".repeat(depth), self.name));
        for slot in &self.slots {
            let note = if self.connected && !slot.anchored {
                " (no anchor)"
            } else {
                ""
            };
            lines.push(format!("{}#{}{note}", "  ".repeat(depth + 1), slot.name));
            for member in &slot.members {
                member.write_lines(depth + 2, lines);
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or("{}".into())
    }

    /// Depth-first, `self` first.
    pub fn walk(&self, f: &mut impl FnMut(&TreeSnapshot)) {
        f(self);
        for slot in &self.slots {
            for member in &slot.members {
                member.walk(f);
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub components: usize,
    pub connected: usize,
    pub collapsed: usize,
    pub slots: usize,
    /// Slots of connected components whose anchor is missing.
    pub unanchored_slots: usize,
}

impl Metrics {
    pub fn of(snapshot: &TreeSnapshot) -> Self {
        let mut m = Metrics::default();
        snapshot.walk(&mut |node| {
            m.components += 1;
            m.connected += usize::from(node.connected);
            m.collapsed += usize::from(node.collapsed);
            m.slots += node.slots.len();
            if node.connected {
                m.unanchored_slots += node.slots.iter().filter(|s| !s.anchored).count();
            }
        });
        m
    }
}

pub struct Hud {
    pub enabled: bool,
    inspections: u64,
    pub metrics: Option<Metrics>,
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud {
    pub fn new() -> Self {
        Self {
            enabled: false,
            inspections: 0,
            metrics: None,
        }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// One-line summary of the last inspection, `None` while disabled.
    pub fn status_line(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let mut parts = vec![format!("inspections: {}", self.inspections)];
        if let Some(m) = &self.metrics {
            parts.push(format!("components: {}", m.components));
            parts.push(format!("connected: {}", m.connected));
            parts.push(format!("collapsed: {}", m.collapsed));
            if m.unanchored_slots > 0 {
                parts.push(format!("unanchored slots: {}", m.unanchored_slots));
            }
        }
        Some(parts.join("  |  "))
    }
}

pub struct Inspector {
    pub hud: Hud,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self { hud: Hud::new() }
    }

    /// Snapshot the forest under `root` and refresh the HUD metrics.
    pub fn inspect(&mut self, root: &Component) -> TreeSnapshot {
        let snapshot = TreeSnapshot::capture(root);
        let metrics = Metrics::of(&snapshot);
        if metrics.unanchored_slots > 0 {
            log::warn!(
                "{} slot(s) under `{}` have no anchor",
                metrics.unanchored_slots,
                root.name()
            );
        }
        self.hud.inspections += 1;
        self.hud.metrics = Some(metrics);
        snapshot
    }
}
