//! # Documents, markup and refs
//!
//! `trellis-dom` is the document side of Trellis. Components never talk to a
//! browser directly; they work against the small model here:
//!
//! - [`Document`] / [`Element`]: a single-threaded node arena with
//!   `web-sys`-like element handles, class lists and bubbling listeners.
//! - [`markup::parse`] / [`MarkupElement`]: the HTML subset layouts are
//!   written in, or built programmatically.
//! - [`Template`]: a layout compiled to exactly one top-level element,
//!   instantiated into a document as a detached subtree.
//! - [`collect_refs`]: finds the named elements and slot anchors of one
//!   component's markup, stopping at slot anchors (the scope boundary).
//! - [`RefAnnotation`]: a declared contract checked against resolved refs.
//! - [`with_markup_config`]: which attributes mark refs and slot anchors.
//!
//! ```rust
//! use trellis_dom::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = Document::new();
//! let card = Template::parse(r#"<div><h2 data-ref="title"></h2><ul data-slot="items"></ul></div>"#)?
//!     .instantiate(&doc);
//! doc.body().append_child(&card)?;
//!
//! let scan = collect_refs(&card);
//! assert!(scan.refs.contains_key("title"));
//! assert!(scan.slots.contains_key("items"));
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod document;
pub mod error;
pub mod locals;
pub mod markup;
pub mod scan;
pub mod template;

pub use annotation::{ContractViolations, ElementCaps, RefAnnotation, RefType, Violation};
pub use document::{DomEvent, Document, Element, Listener, ListenerId, NodeId};
pub use error::{DomError, MarkupError, TemplateError};
pub use locals::{MarkupConfig, markup_config, with_markup_config};
pub use markup::{MarkupElement, MarkupNode};
pub use scan::{RefScan, collect_refs};
pub use template::Template;
