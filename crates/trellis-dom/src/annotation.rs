//! Declared ref contracts.
//!
//! A component may state which refs its markup must provide and what kind of
//! element each one has to be. The contract is checked against the refs
//! actually resolved when the component connects.

use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

use crate::document::Element;

bitflags! {
    /// What an element can do, derived from its tag (and `type` for inputs).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ElementCaps: u16 {
        const CONTAINER    = 1 << 0;
        const TEXT_ENTRY   = 1 << 1;
        const ACTIVATABLE  = 1 << 2;
        const FORM_CONTROL = 1 << 3;
        const LIST         = 1 << 4;
        const TABLE        = 1 << 5;
        const MEDIA        = 1 << 6;
        const LINK         = 1 << 7;
    }
}

impl ElementCaps {
    pub fn of(el: &Element) -> Self {
        let Some(tag) = el.tag() else {
            return Self::empty();
        };
        match tag.as_str() {
            "input" => match el.attribute("type").as_deref() {
                Some("button" | "submit" | "reset" | "checkbox" | "radio") => {
                    Self::ACTIVATABLE | Self::FORM_CONTROL
                }
                _ => Self::TEXT_ENTRY | Self::FORM_CONTROL,
            },
            "textarea" => Self::TEXT_ENTRY | Self::FORM_CONTROL,
            "select" => Self::FORM_CONTROL,
            "button" => Self::ACTIVATABLE | Self::FORM_CONTROL | Self::CONTAINER,
            "a" => Self::ACTIVATABLE | Self::LINK | Self::CONTAINER,
            "ul" | "ol" => Self::LIST | Self::CONTAINER,
            "table" | "thead" | "tbody" | "tfoot" | "tr" => Self::TABLE | Self::CONTAINER,
            "img" | "video" | "audio" | "canvas" | "picture" => Self::MEDIA,
            "br" | "hr" | "wbr" | "meta" | "link" | "source" | "col" | "area" => Self::empty(),
            _ => Self::CONTAINER,
        }
    }
}

/// Expected shape of one ref.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefType {
    Any,
    Tag(String),
    /// Every listed capability must be present.
    Caps(ElementCaps),
}

impl RefType {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into().to_ascii_lowercase())
    }

    pub fn matches(&self, el: &Element) -> bool {
        match self {
            RefType::Any => true,
            RefType::Tag(tag) => el.tag().as_deref() == Some(tag.as_str()),
            RefType::Caps(caps) => ElementCaps::of(el).contains(*caps),
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefType::Any => f.write_str("any element"),
            RefType::Tag(tag) => write!(f, "<{tag}>"),
            RefType::Caps(caps) => write!(f, "element with {caps:?}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("ref `{name}` is missing (expected {expected})")]
    Missing { name: String, expected: RefType },
    #[error("ref `{name}` is <{found}>, expected {expected}")]
    Mismatch {
        name: String,
        expected: RefType,
        found: String,
    },
}

/// Every violation found by one [`RefAnnotation::validate`] call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}", join_violations(.0))]
pub struct ContractViolations(pub Vec<Violation>);

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Ordered list of required refs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefAnnotation {
    entries: Vec<(String, RefType)>,
}

impl RefAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a ref named `name` of type `ty`. Re-declaring a name replaces
    /// its type.
    pub fn require(mut self, name: impl Into<String>, ty: RefType) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = ty,
            None => self.entries.push((name, ty)),
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Refs not mentioned by the annotation are allowed.
    pub fn validate(&self, refs: &HashMap<String, Element>) -> Result<(), ContractViolations> {
        let violations: Vec<Violation> = self
            .entries
            .iter()
            .filter_map(|(name, expected)| match refs.get(name) {
                None => Some(Violation::Missing {
                    name: name.clone(),
                    expected: expected.clone(),
                }),
                Some(el) if !expected.matches(el) => Some(Violation::Mismatch {
                    name: name.clone(),
                    expected: expected.clone(),
                    found: el.tag().unwrap_or_default(),
                }),
                Some(_) => None,
            })
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ContractViolations(violations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, Template, collect_refs};

    fn refs_of(markup: &str) -> HashMap<String, Element> {
        let doc = Document::new();
        collect_refs(&Template::parse(markup).unwrap().instantiate(&doc)).refs
    }

    #[test]
    fn caps_follow_tag_and_input_type() {
        let doc = Document::new();
        let text = doc.create_element("input");
        let check = doc.create_element("input");
        check.set_attribute("type", "checkbox").unwrap();
        assert!(ElementCaps::of(&text).contains(ElementCaps::TEXT_ENTRY));
        assert!(!ElementCaps::of(&check).contains(ElementCaps::TEXT_ENTRY));
        assert!(ElementCaps::of(&check).contains(ElementCaps::ACTIVATABLE));
        assert_eq!(
            ElementCaps::of(&doc.create_element("ol")),
            ElementCaps::LIST | ElementCaps::CONTAINER
        );
    }

    #[test]
    fn accepts_matching_refs() {
        let refs = refs_of(
            r#"<form><input data-ref="query"><button data-ref="go">Go</button><i data-ref="extra"></i></form>"#,
        );
        let annotation = RefAnnotation::new()
            .require("query", RefType::Caps(ElementCaps::TEXT_ENTRY))
            .require("go", RefType::tag("BUTTON"))
            .require("go", RefType::tag("button"));
        assert_eq!(annotation.names().collect::<Vec<_>>(), vec!["query", "go"]);
        assert_eq!(annotation.validate(&refs), Ok(()));
    }

    #[test]
    fn reports_every_violation() {
        let refs = refs_of(r#"<div><span data-ref="go"></span></div>"#);
        let annotation = RefAnnotation::new()
            .require("go", RefType::tag("button"))
            .require("list", RefType::Any);
        let err = annotation.validate(&refs).unwrap_err();
        assert_eq!(
            err,
            ContractViolations(vec![
                Violation::Mismatch {
                    name: "go".into(),
                    expected: RefType::tag("button"),
                    found: "span".into(),
                },
                Violation::Missing {
                    name: "list".into(),
                    expected: RefType::Any,
                },
            ])
        );
        assert_eq!(
            err.to_string(),
            "ref `go` is <span>, expected <button>; ref `list` is missing (expected any element)"
        );
    }

    #[test]
    fn violations_are_errors() {
        let refs = refs_of(r#"<div></div>"#);
        let err = RefAnnotation::new()
            .require("save", RefType::Caps(ElementCaps::ACTIVATABLE))
            .validate(&refs)
            .unwrap_err();
        let boxed: Box<dyn std::error::Error> = Box::new(err.clone());
        assert_eq!(boxed.to_string(), err.0[0].to_string());
        assert!(boxed.to_string().starts_with("ref `save` is missing"));
    }
}
