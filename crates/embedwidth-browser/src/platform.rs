//! Frame and timer scheduling on the browser event loop.
//!
//! Callbacks reach the owning session through a [`SinkSlot`], a weak
//! reference bound once the session is mounted. A callback that outlives its
//! session finds the slot empty and does nothing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use gloo_timers::callback::Timeout;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Window;

use embedwidth_core::{
    Container, MutationSource, PlatformError, SchedulePlatform, Session, Signal, SourceProvider,
    Ticket,
};

/// What browser callbacks deliver into.
pub trait SessionSink {
    fn frame(&mut self, ticket: Ticket);

    fn timer(&mut self, ticket: Ticket);

    fn signal(&mut self, signal: Signal);
}

impl<C, S, M> SessionSink for Session<C, S, BrowserPlatform, M>
where
    C: Container,
    S: SourceProvider<C::Node>,
    M: MutationSource<C::Root>,
{
    fn frame(&mut self, ticket: Ticket) {
        self.on_frame(ticket);
    }

    fn timer(&mut self, ticket: Ticket) {
        self.on_timer(ticket);
    }

    fn signal(&mut self, signal: Signal) {
        Session::signal(self, signal);
    }
}

/// Late-bound weak handle to a session, shared by everything that calls back into it.
#[derive(Clone, Default)]
pub struct SinkSlot {
    inner: Rc<RefCell<Option<Weak<RefCell<dyn SessionSink>>>>>,
}

impl SinkSlot {
    pub fn bind(&self, sink: Weak<RefCell<dyn SessionSink>>) {
        *self.inner.borrow_mut() = Some(sink);
    }

    /// Run `f` against the session if it is still alive and not already borrowed.
    pub fn deliver(&self, f: impl FnOnce(&mut dyn SessionSink)) {
        let Some(sink) = self.inner.borrow().as_ref().and_then(Weak::upgrade) else {
            tracing::trace!("delivery without a live session dropped");
            return;
        };
        let Ok(mut sink) = sink.try_borrow_mut() else {
            tracing::warn!("session busy, delivery dropped");
            return;
        };
        f(&mut *sink);
    }
}

impl std::fmt::Debug for SinkSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound = self.inner.borrow().as_ref().is_some_and(|w| w.strong_count() > 0);
        f.debug_struct("SinkSlot").field("bound", &bound).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    Frame,
    Timer,
}

enum Scheduled {
    Frame {
        handle: i32,
        _callback: Closure<dyn FnMut()>,
    },
    Timer(Timeout),
}

#[derive(Default)]
struct Callbacks {
    pending: HashMap<(Kind, Ticket), Scheduled>,
    // Callbacks that already ran. Dropped on the next schedule, never from
    // inside their own invocation.
    fired: Vec<Scheduled>,
}

impl Callbacks {
    fn insert(&mut self, kind: Kind, ticket: Ticket, scheduled: Scheduled) {
        self.fired.clear();
        self.pending.insert((kind, ticket), scheduled);
    }

    fn mark_fired(&mut self, kind: Kind, ticket: Ticket) {
        if let Some(scheduled) = self.pending.remove(&(kind, ticket)) {
            self.fired.push(scheduled);
        }
    }
}

/// `SchedulePlatform` backed by `requestAnimationFrame` and `gloo-timers` timeouts.
pub struct BrowserPlatform {
    window: Window,
    sink: SinkSlot,
    callbacks: Rc<RefCell<Callbacks>>,
}

impl BrowserPlatform {
    pub fn new(sink: SinkSlot) -> Result<Self, PlatformError> {
        let window = web_sys::window().ok_or_else(|| PlatformError::from("no window"))?;
        Ok(Self {
            window,
            sink,
            callbacks: Rc::default(),
        })
    }

    /// Number of frames and timers still waiting to fire.
    pub fn pending(&self) -> usize {
        self.callbacks.borrow().pending.len()
    }

    /// Callback body shared by frames and timers.
    fn deliver(&self, kind: Kind, ticket: Ticket) -> impl FnOnce() + 'static {
        let sink = self.sink.clone();
        let callbacks = Rc::downgrade(&self.callbacks);
        move || {
            sink.deliver(|session| match kind {
                Kind::Frame => session.frame(ticket),
                Kind::Timer => session.timer(ticket),
            });
            if let Some(callbacks) = callbacks.upgrade() {
                callbacks.borrow_mut().mark_fired(kind, ticket);
            }
        }
    }

    fn cancel(&self, kind: Kind, ticket: Ticket) {
        let Some(scheduled) = self.callbacks.borrow_mut().pending.remove(&(kind, ticket)) else {
            return;
        };
        match scheduled {
            Scheduled::Frame { handle, .. } => {
                if let Err(e) = self.window.cancel_animation_frame(handle) {
                    tracing::warn!(error = ?e, "failed to cancel frame");
                }
            }
            // Dropping a pending timeout clears it.
            Scheduled::Timer(timeout) => drop(timeout),
        }
    }
}

impl SchedulePlatform for BrowserPlatform {
    fn request_frame(&self, ticket: Ticket) {
        let callback = Closure::once(self.deliver(Kind::Frame, ticket));
        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(handle) => self.callbacks.borrow_mut().insert(
                Kind::Frame,
                ticket,
                Scheduled::Frame {
                    handle,
                    _callback: callback,
                },
            ),
            Err(e) => tracing::warn!(error = ?e, "failed to request animation frame"),
        }
    }

    fn cancel_frame(&self, ticket: Ticket) {
        self.cancel(Kind::Frame, ticket);
    }

    fn set_timer(&self, ticket: Ticket, delay: Duration) {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        let timeout = Timeout::new(millis, self.deliver(Kind::Timer, ticket));
        self.callbacks
            .borrow_mut()
            .insert(Kind::Timer, ticket, Scheduled::Timer(timeout));
    }

    fn cancel_timer(&self, ticket: Ticket) {
        self.cancel(Kind::Timer, ticket);
    }
}

impl Drop for BrowserPlatform {
    fn drop(&mut self) {
        let pending: Vec<_> = self.callbacks.borrow().pending.keys().copied().collect();
        for (kind, ticket) in pending {
            self.cancel(kind, ticket);
        }
    }
}
