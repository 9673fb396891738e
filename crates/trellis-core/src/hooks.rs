//! Error boundary for user lifecycle hooks.
//!
//! `on_connected` / `on_disconnected` hooks run from one default lifecycle
//! listener each. Whatever a hook does wrong, returning an error or
//! panicking, is logged here and goes no further: the remaining listeners of
//! the same emission still run and the lifecycle transition completes.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::component::Component;

pub type HookError = Box<dyn std::error::Error>;
pub type HookResult = Result<(), HookError>;

pub(crate) type Hook = Rc<dyn Fn(&Component) -> HookResult>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HookKind {
    Connected,
    Disconnected,
}

impl HookKind {
    fn label(self) -> &'static str {
        match self {
            HookKind::Connected => "connected",
            HookKind::Disconnected => "disconnected",
        }
    }
}

#[derive(Default)]
pub(crate) struct Hooks {
    pub connected: Option<Hook>,
    pub disconnected: Option<Hook>,
}

impl Hooks {
    pub fn get(&self, kind: HookKind) -> Option<Hook> {
        match kind {
            HookKind::Connected => self.connected.clone(),
            HookKind::Disconnected => self.disconnected.clone(),
        }
    }

    pub fn set(&mut self, kind: HookKind, hook: Hook) {
        match kind {
            HookKind::Connected => self.connected = Some(hook),
            HookKind::Disconnected => self.disconnected = Some(hook),
        }
    }
}

/// Run `hook` for `component`; returns whether it succeeded.
pub(crate) fn run_guarded(component: &Component, kind: HookKind, hook: &Hook) -> bool {
    match catch_unwind(AssertUnwindSafe(|| hook(component))) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            log::error!(
                "{} hook of `{}` failed: {err}",
                kind.label(),
                component.name()
            );
            false
        }
        Err(payload) => {
            log::error!(
                "{} hook of `{}` panicked: {}",
                kind.label(),
                component.name(),
                panic_message(&*payload)
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
