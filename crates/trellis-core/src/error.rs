use thiserror::Error;
use trellis_dom::{ContractViolations, DomError, MarkupError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of [`Error`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The layout does not compile to a single top-level element.
    Construction,
    /// The operation does not fit the component's current state.
    State,
    /// Resolved refs break the declared ref annotation.
    Contract,
    /// An argument is not usable (dead container, foreign node).
    Type,
    /// Unknown mount mode.
    Mode,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("layout of `{component}` must compile to exactly one top-level element, found {found}")]
    TopLevel { component: String, found: usize },

    #[error("layout of `{component}` is not valid markup")]
    Markup {
        component: String,
        #[source]
        source: MarkupError,
    },

    #[error("`{0}` is already connected")]
    AlreadyConnected(String),

    #[error("`{0}` is not connected")]
    NotConnected(String),

    #[error("`{0}` has no layout to compile")]
    NoLayout(String),

    #[error("slot `{slot}` is not declared on `{component}`")]
    UndeclaredSlot { component: String, slot: String },

    #[error("`{component}` has no ref named `{name}`")]
    UnknownRef { component: String, name: String },

    #[error("attaching `{child}` under `{parent}` would create a cycle")]
    Cycle { parent: String, child: String },

    #[error("`{child}` is already attached to slot `{slot}` of `{parent}`")]
    AttachedElsewhere {
        child: String,
        parent: String,
        slot: String,
    },

    #[error("refs of `{component}` violate their annotation: {violations}")]
    Contract {
        component: String,
        violations: ContractViolations,
    },

    #[error("mount container is not a live element")]
    DeadContainer,

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("unknown mount mode `{0}` (expected replace, append or prepend)")]
    Mode(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TopLevel { .. } | Error::Markup { .. } => ErrorKind::Construction,
            Error::AlreadyConnected(_)
            | Error::NotConnected(_)
            | Error::NoLayout(_)
            | Error::UndeclaredSlot { .. }
            | Error::UnknownRef { .. }
            | Error::Cycle { .. }
            | Error::AttachedElsewhere { .. } => ErrorKind::State,
            Error::Contract { .. } => ErrorKind::Contract,
            Error::DeadContainer | Error::Dom(_) => ErrorKind::Type,
            Error::Mode(_) => ErrorKind::Mode,
        }
    }
}
