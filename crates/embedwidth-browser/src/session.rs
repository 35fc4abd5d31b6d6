//! Mounting sessions on DOM containers.
//!
//! A mounted session lives in an `Rc<RefCell<_>>` owned by a
//! [`SessionHandle`]. Browser callbacks only hold weak references, so
//! dropping the handle tears the session down and silences every callback
//! still queued.

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use web_sys::Element;

use embedwidth_core::{
    MutationSource, NoMutations, PassReport, Phase, PlatformError, Session, Signal,
    SourceProvider, ValidatedConfig,
};

use crate::dom::{DomContainer, DomEmbed};
use crate::observer::DomMutationSource;
use crate::platform::{BrowserPlatform, SessionSink, SinkSlot};

/// Session over a live editing surface.
pub type LiveSession<S> = Session<DomContainer, S, BrowserPlatform, DomMutationSource>;

/// Session over a rendered read view.
pub type ReadSession<S> = Session<DomContainer, S, BrowserPlatform, NoMutations>;

/// Owner of a mounted session.
pub struct SessionHandle<T> {
    inner: Rc<RefCell<T>>,
}

impl<T: SessionSink + 'static> SessionHandle<T> {
    fn bind(session: T, slot: &SinkSlot) -> Self {
        let inner = Rc::new(RefCell::new(session));
        let weak: Weak<RefCell<T>> = Rc::downgrade(&inner);
        slot.bind(weak);
        Self { inner }
    }

    /// Run `f` against the session unless a callback currently holds it.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        match self.inner.try_borrow_mut() {
            Ok(mut session) => Some(f(&mut session)),
            Err(_) => {
                tracing::warn!("session busy");
                None
            }
        }
    }

    pub fn signal(&self, signal: Signal) {
        self.with(|session| session.signal(signal));
    }
}

impl<S, M> SessionHandle<Session<DomContainer, S, BrowserPlatform, M>>
where
    S: SourceProvider<DomEmbed> + 'static,
    M: MutationSource<Element> + 'static,
{
    pub fn phase(&self) -> Option<Phase> {
        self.with(|session| session.phase())
    }

    pub fn reconcile_now(&self) -> Option<PassReport> {
        self.with(|session| session.reconcile_now()).flatten()
    }

    pub fn teardown(&self) {
        self.with(|session| session.teardown());
    }

    /// Whether the source held a directive at the last document change or pass.
    pub fn directive_hint(&self) -> Option<bool> {
        let session = self.inner.try_borrow().ok()?;
        Some(session.directive_hint())
    }

    /// Borrow the source provider, e.g. to feed it new host state.
    pub fn source(&self) -> Option<Ref<'_, S>> {
        let session = self.inner.try_borrow().ok()?;
        Some(Ref::map(session, |session| session.source()))
    }
}

/// Start reconciling a live editing surface.
///
/// `root` is observed for mutations and searched for embeds; the marker class
/// goes on `marker_target`.
pub fn mount_live<S>(
    root: Element,
    marker_target: Element,
    source: S,
    config: &ValidatedConfig,
) -> Result<SessionHandle<LiveSession<S>>, PlatformError>
where
    S: SourceProvider<DomEmbed> + 'static,
{
    let container = DomContainer::new(root, marker_target, Rc::new(config.names.clone()))?;
    let slot = SinkSlot::default();
    let platform = BrowserPlatform::new(slot.clone())?;
    let mutations = DomMutationSource::new(slot.clone());
    let session = Session::live(container, source, platform, mutations, config)?;
    Ok(SessionHandle::bind(session, &slot))
}

/// Start reconciling a rendered read view. Passes are driven by the host's
/// signals and the retry ladder; nothing is observed.
pub fn mount_read<S>(
    root: Element,
    marker_target: Element,
    source: S,
    config: &ValidatedConfig,
) -> Result<SessionHandle<ReadSession<S>>, PlatformError>
where
    S: SourceProvider<DomEmbed> + 'static,
{
    let container = DomContainer::new(root, marker_target, Rc::new(config.names.clone()))?;
    let slot = SinkSlot::default();
    let platform = BrowserPlatform::new(slot.clone())?;
    let session = Session::read(container, source, platform, config);
    Ok(SessionHandle::bind(session, &slot))
}
