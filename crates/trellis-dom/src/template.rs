use std::rc::Rc;

use crate::document::{Document, Element};
use crate::error::TemplateError;
use crate::markup::{self, MarkupElement, MarkupNode};

/// A compiled layout: exactly one top-level element, immutable, cheap to
/// clone. Every [`instantiate`](Template::instantiate) produces a fresh
/// detached subtree.
#[derive(Clone, Debug)]
pub struct Template {
    root: Rc<MarkupElement>,
}

impl Template {
    pub fn parse(markup: &str) -> Result<Self, TemplateError> {
        Self::from_nodes(markup::parse(markup)?)
    }

    /// Text between top-level elements is ignored; only elements count.
    pub fn from_nodes(nodes: Vec<MarkupNode>) -> Result<Self, TemplateError> {
        let mut elements: Vec<MarkupElement> = nodes
            .into_iter()
            .filter_map(|node| match node {
                MarkupNode::Element(el) => Some(el),
                MarkupNode::Text(_) => None,
            })
            .collect();
        match elements.len() {
            1 => Ok(Self::from_element(elements.remove(0))),
            found => Err(TemplateError::TopLevel { found }),
        }
    }

    pub fn from_element(root: MarkupElement) -> Self {
        Self {
            root: Rc::new(root),
        }
    }

    pub fn root(&self) -> &MarkupElement {
        &self.root
    }

    pub fn instantiate(&self, doc: &Document) -> Element {
        doc.instantiate(&self.root)
    }
}
