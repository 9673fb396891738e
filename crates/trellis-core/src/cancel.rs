use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use trellis_dom::{DomEvent, Element};

use crate::error::Result;

/// A cleanup action that runs at most once, no matter how many clones of
/// the guard call [`Dispose::run`].
#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// A guard with nothing left to do.
    pub fn noop() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    /// Runs at most once (safe to call multiple times).
    pub fn run(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn is_done(&self) -> bool {
        self.0.borrow().is_none()
    }
}

impl fmt::Debug for Dispose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispose")
            .field("done", &self.is_done())
            .finish()
    }
}

struct TokenInner {
    cancelled: Cell<bool>,
    disposers: RefCell<Vec<Dispose>>,
}

/// Owns the DOM listeners registered during one connection cycle.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Rc<TokenInner>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(TokenInner {
                cancelled: Cell::new(false),
                disposers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// Attach `f` to `event` on `element` until the token is cancelled or
    /// the returned guard runs.
    ///
    /// On a cancelled token the listener is detached again before this
    /// returns, and the guard comes back already spent.
    pub fn listen(
        &self,
        element: &Element,
        event: &str,
        f: impl Fn(&DomEvent) + 'static,
    ) -> Result<Dispose> {
        let id = element.add_event_listener(event, f)?;
        let doc = element.document().clone();
        let dispose = Dispose::new(move || {
            doc.remove_event_listener(id);
        });
        if self.is_cancelled() {
            dispose.run();
        } else {
            self.add_disposer(dispose.clone());
        }
        Ok(dispose)
    }

    pub fn add_disposer(&self, dispose: Dispose) {
        if self.is_cancelled() {
            dispose.run();
            return;
        }
        self.inner.disposers.borrow_mut().push(dispose);
    }

    /// Run every recorded disposer in registration order. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.replace(true) {
            return;
        }
        let disposers = std::mem::take(&mut *self.inner.disposers.borrow_mut());
        log::trace!("cancelling token with {} disposer(s)", disposers.len());
        for d in disposers {
            d.run();
        }
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("pending", &self.inner.disposers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_dom::Document;

    #[test]
    fn dispose_runs_once() {
        let hits = Rc::new(Cell::new(0));
        let d = {
            let hits = hits.clone();
            Dispose::new(move || hits.set(hits.get() + 1))
        };
        let d2 = d.clone();
        d.run();
        d2.run();
        d.run();
        assert_eq!(hits.get(), 1);
        assert!(d2.is_done());
        assert!(Dispose::noop().is_done());
    }

    #[test]
    fn cancel_detaches_listeners() {
        let doc = Document::new();
        let button = doc.create_element("button");
        let clicks = Rc::new(Cell::new(0));
        let token = CancellationToken::new();
        let guard = {
            let clicks = clicks.clone();
            token
                .listen(&button, "click", move |_| clicks.set(clicks.get() + 1))
                .unwrap()
        };
        button.dispatch("click");
        assert_eq!(clicks.get(), 1);

        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(button.listener_count(), 0);
        button.dispatch("click");
        assert_eq!(clicks.get(), 1);
        guard.run();
    }

    #[test]
    fn manual_dispose_before_cancel() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let token = CancellationToken::new();
        let a = token.listen(&el, "x", |_| {}).unwrap();
        let _b = token.listen(&el, "x", |_| {}).unwrap();
        a.run();
        assert_eq!(el.listener_count(), 1);
        token.cancel();
        assert_eq!(el.listener_count(), 0);
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn listening_on_cancelled_token_is_inert() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let token = CancellationToken::new();
        token.cancel();
        let guard = token.listen(&el, "x", |_| panic!("detached")).unwrap();
        assert!(guard.is_done());
        assert_eq!(el.dispatch("x"), 0);
    }

    #[test]
    fn stale_element_is_an_error() {
        let doc = Document::new();
        let el = doc.create_element("div");
        el.release();
        let token = CancellationToken::new();
        assert!(token.listen(&el, "x", |_| {}).is_err());
    }
}
