//! # Markup configuration
//!
//! The attribute names used to mark refs and slot anchors, and the class
//! used to hide a component's root, are read from a thread-local stack of
//! configuration frames. Override them for a region of code with
//! [`with_markup_config`]:
//!
//! ```rust
//! use trellis_dom::*;
//!
//! let legacy = MarkupConfig {
//!     ref_attr: "ref".into(),
//!     slot_attr: "scope-ref".into(),
//!     ..MarkupConfig::default()
//! };
//!
//! with_markup_config(legacy, || {
//!     // refs are found through `ref="..."` here
//!     assert_eq!(markup_config().ref_attr, "ref");
//! });
//! assert_eq!(markup_config().ref_attr, "data-ref");
//! ```

use std::cell::RefCell;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupConfig {
    /// Attribute naming an element as a ref of the enclosing component.
    pub ref_attr: String,
    /// Attribute marking a slot anchor; also the scope boundary.
    pub slot_attr: String,
    /// Class toggled by `show`/`hide`.
    pub hidden_class: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            ref_attr: "data-ref".into(),
            slot_attr: "data-slot".into(),
            hidden_class: "is-hidden".into(),
        }
    }
}

thread_local! {
    static CONFIG_STACK: RefCell<Vec<MarkupConfig>> = const { RefCell::new(Vec::new()) };
}

pub fn with_markup_config<R>(config: MarkupConfig, f: impl FnOnce() -> R) -> R {
    // pops on unwind too
    struct Guard;
    impl Drop for Guard {
        fn drop(&mut self) {
            CONFIG_STACK.with(|st| {
                st.borrow_mut().pop();
            });
        }
    }
    CONFIG_STACK.with(|st| st.borrow_mut().push(config));
    let _guard = Guard;
    f()
}

/// The innermost configuration frame, or the defaults.
pub fn markup_config() -> MarkupConfig {
    CONFIG_STACK.with(|st| st.borrow().last().cloned().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_nest_and_unwind() {
        assert_eq!(markup_config().ref_attr, "data-ref");
        let outer = MarkupConfig {
            ref_attr: "ref".into(),
            ..MarkupConfig::default()
        };
        with_markup_config(outer, || {
            assert_eq!(markup_config().ref_attr, "ref");
            let inner = MarkupConfig {
                hidden_class: "hidden".into(),
                ..MarkupConfig::default()
            };
            with_markup_config(inner, || {
                assert_eq!(markup_config().ref_attr, "data-ref");
                assert_eq!(markup_config().hidden_class, "hidden");
            });
            assert_eq!(markup_config().ref_attr, "ref");
        });
        assert_eq!(markup_config(), MarkupConfig::default());
    }
}
