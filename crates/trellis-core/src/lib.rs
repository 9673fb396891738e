//! # Components, Slots, and Lifecycle
//!
//! Trellis builds a UI out of independently defined components that are
//! combined into a forest, mounted into a document, and torn down again.
//! There are four main pieces:
//!
//! - [`Component`]: a layout (compiled once into a [`trellis_dom::Template`]),
//!   lifecycle state, refs, and a set of named slots for children.
//! - Slots: named insertion points. Children attached to a slot are mounted
//!   into the element the parent's markup marks with `data-slot="name"`.
//! - [`EventHub`]: ordered, synchronous lifecycle events.
//! - [`CancellationToken`]: everything registered through [`Component::on`]
//!   during one connection is removed on disconnect.
//!
//! ## Mounting
//!
//! ```rust
//! use trellis_core::prelude::*;
//! use trellis_dom::Document;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let page = Component::builder("page")
//!     .layout(r#"<main><h1 data-ref="title"></h1><section data-slot="body"></section></main>"#)
//!     .slots(["body"])
//!     .build();
//!
//! let card = Component::builder("card").layout("<article>hi</article>").build();
//! page.add_child_component("body", [&card])?;
//!
//! let doc = Document::new();
//! page.mount(&doc.body(), MountMode::Replace)?;
//! assert!(card.is_connected());
//! # Ok(())
//! # }
//! ```
//!
//! `mount` clones the template, emits `BeforeConnect` with the detached copy,
//! inserts it, then calls `connect`. `connect` resolves refs and slot anchors
//! from the new root, opens a cancellation scope, and mounts every attached,
//! non-collapsed child into its anchor, depth-first, before emitting
//! `Connect`. A parent's `Connect` therefore fires after all of its children
//! have connected.
//!
//! ## Refs and the scope boundary
//!
//! Elements marked `data-ref="name"` are the component's refs while it is
//! connected. Resolution stops at slot anchors: whatever is inside them
//! belongs to child components.
//!
//! ```rust
//! # use trellis_core::prelude::*;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let doc = trellis_dom::Document::new();
//! # let page = Component::builder("page")
//! #     .layout(r#"<main><h1 data-ref="title"></h1><section data-slot="body"></section></main>"#)
//! #     .slots(["body"])
//! #     .build();
//! # page.mount(&doc.body(), MountMode::Replace)?;
//! let title = page.get_ref("title")?;
//! page.on(&title, "click", |_| log::info!("clicked"))?;
//! assert_eq!(title.dispatch("click"), 1);
//!
//! page.disconnect();
//! assert_eq!(title.dispatch("click"), 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Teardown
//!
//! - `disconnect` drops refs and cancels listeners; the node stays put.
//! - `unmount` disconnects, unmounts every tracked child, removes the root.
//! - `collapse` unmounts and keeps the component out of its slot until
//!   `expand`.
//!
//! Teardown is idempotent. Child attachment survives it: an unmounted child is
//! still tracked by its parent until `remove_child_component`.
//!
//! ## Hooks
//!
//! `on_connected` / `on_disconnected` hooks return [`HookResult`]. Errors and
//! panics are logged with `log::error!` and never reach the caller of the
//! lifecycle operation.

pub mod cancel;
pub mod component;
mod composition;
pub mod error;
pub mod event;
pub mod hooks;
pub mod prelude;
pub mod slot;
mod state;

pub use cancel::{CancellationToken, Dispose};
pub use component::{Component, ComponentBuilder, ComponentId, Layout, MountMode, Rendered};
pub use error::{Error, ErrorKind, Result};
pub use event::{EventHub, LifecycleEvent, LifecycleKind, SubscriptionId};
pub use hooks::{HookError, HookResult};
pub use slot::{Slot, SlotManager};
