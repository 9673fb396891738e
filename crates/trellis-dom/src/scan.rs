use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::document::Element;
use crate::locals::markup_config;

/// Named elements found in one component's own markup.
#[derive(Clone, Debug, Default)]
pub struct RefScan {
    pub refs: HashMap<String, Element>,
    /// Slot name -> anchor element children are appended to.
    pub slots: HashMap<String, Element>,
}

/// Walk `root`'s element subtree (root included) in document order and
/// collect refs and slot anchors.
///
/// A slot anchor is a scope boundary: whatever lives inside it belongs to
/// child components, so the walk records the anchor and does not descend.
/// The first element to claim a name wins.
pub fn collect_refs(root: &Element) -> RefScan {
    let config = markup_config();
    let mut scan = RefScan::default();
    let mut stack = vec![root.clone()];

    while let Some(el) = stack.pop() {
        if let Some(name) = el.attribute(&config.ref_attr) {
            claim(&mut scan.refs, name, &el, "ref");
        }
        if let Some(name) = el.attribute(&config.slot_attr) {
            claim(&mut scan.slots, name, &el, "slot anchor");
            continue;
        }
        stack.extend(el.children().into_iter().rev());
    }
    scan
}

fn claim(map: &mut HashMap<String, Element>, name: String, el: &Element, what: &str) {
    match map.entry(name) {
        Entry::Vacant(slot) => {
            slot.insert(el.clone());
        }
        Entry::Occupied(existing) => {
            log::warn!(
                "duplicate {what} `{}`: keeping {:?}, ignoring {:?}",
                existing.key(),
                existing.get(),
                el
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, MarkupConfig, Template, with_markup_config};

    #[test]
    fn stops_at_slot_anchors() {
        let doc = Document::new();
        let root = Template::parse(
            r#"<div data-ref="root">
                 <h1 data-ref="title">T</h1>
                 <section data-slot="body" data-ref="bodyRef"></section>
               </div>"#,
        )
        .unwrap()
        .instantiate(&doc);

        // A child component mounted into the anchor.
        let anchor = root.find_by_attribute("data-slot", "body").unwrap();
        let child = Template::parse(r#"<p data-ref="title"><i data-slot="inner"></i></p>"#)
            .unwrap()
            .instantiate(&doc);
        anchor.append_child(&child).unwrap();

        let scan = collect_refs(&root);
        let mut refs: Vec<_> = scan.refs.keys().cloned().collect();
        refs.sort();
        assert_eq!(refs, vec!["bodyRef", "root", "title"]);
        assert_eq!(scan.refs["title"].tag().as_deref(), Some("h1"));
        assert_eq!(scan.slots.len(), 1);
        assert_eq!(scan.slots["body"], anchor);
    }

    #[test]
    fn never_ascends_past_root() {
        let doc = Document::new();
        let outer = Template::parse(r#"<div data-ref="outer"><span data-ref="inner"></span></div>"#)
            .unwrap()
            .instantiate(&doc);
        let inner = outer.children().remove(0);
        let scan = collect_refs(&inner);
        assert_eq!(scan.refs.len(), 1);
        assert!(scan.refs.contains_key("inner"));
    }

    #[test]
    fn first_claim_wins() {
        let doc = Document::new();
        let root = Template::parse(r#"<div><b data-ref="x"></b><i data-ref="x"></i></div>"#)
            .unwrap()
            .instantiate(&doc);
        let scan = collect_refs(&root);
        assert_eq!(scan.refs["x"].tag().as_deref(), Some("b"));
    }

    #[test]
    fn honours_configured_attributes() {
        let doc = Document::new();
        let root = Template::parse(r#"<div ref="a"><ul scope-ref="items"></ul></div>"#)
            .unwrap()
            .instantiate(&doc);
        let config = MarkupConfig {
            ref_attr: "ref".into(),
            slot_attr: "scope-ref".into(),
            ..MarkupConfig::default()
        };
        let scan = with_markup_config(config, || collect_refs(&root));
        assert!(scan.refs.contains_key("a"));
        assert!(scan.slots.contains_key("items"));
        assert!(collect_refs(&root).refs.is_empty());
    }
}
