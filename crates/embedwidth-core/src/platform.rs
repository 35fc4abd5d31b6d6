//! Platform abstraction traits for reconciliation.
//!
//! These traits define the interface between the reconciliation logic and the
//! render surface that owns the embeds (browser DOM, test doubles). The core
//! never creates or removes nodes; it only reads identifiers and writes
//! annotations through these seams.

use std::ops::Range;
use std::time::Duration;

use smol_str::SmolStr;

use crate::directive::Directive;
use crate::error::PlatformError;
use crate::schedule::Ticket;

/// A rendered embed element.
pub trait EmbedNode {
    /// The referenced target, read from the node's identifier attribute.
    fn identifier(&self) -> Option<SmolStr>;

    /// The current annotation, if any.
    fn directive(&self) -> Option<SmolStr>;

    /// Set or clear the annotation.
    fn set_directive(&self, directive: Option<&Directive>);
}

/// The subtree holding one view instance's embeds, plus its marker.
pub trait Container {
    type Node: EmbedNode;

    /// Root handed to mutation observation.
    type Root;

    fn root(&self) -> &Self::Root;

    /// Currently mounted embeds.
    ///
    /// Must be a live query against the render surface, never a cached list:
    /// nodes remount and change identity between passes.
    fn embed_nodes(&self) -> Vec<Self::Node>;

    /// Current marker state.
    fn marker(&self) -> bool;

    /// Toggle the marker.
    fn set_marker(&self, active: bool);
}

/// Access to the source text behind a container.
///
/// Generic over the node type so that text-only providers (the read view's
/// file content) work with any node implementation.
pub trait SourceProvider<N> {
    /// The full source text, or `None` when it is not available right now.
    fn source_text(&self) -> Option<String>;

    /// Byte offset in `source` corresponding to `node`'s rendered position.
    ///
    /// `Ok(None)` means the surface cannot map the node right now (for
    /// example mid-reflow). Surfaces without a position mapping keep the
    /// default.
    fn position_of(&self, _node: &N, _source: &str) -> Result<Option<usize>, PlatformError> {
        Ok(None)
    }

    /// Byte range of `source` to search first when looking `node` up by identifier.
    fn scope_of(&self, _node: &N, _source: &str) -> Option<Range<usize>> {
        None
    }
}

/// Deferred execution on the host's rendering loop.
///
/// Implementations call back into the owning session with the same ticket:
/// `Session::on_frame` for frames, `Session::on_timer` for timers. Cancelled
/// tickets must never be delivered.
pub trait SchedulePlatform {
    /// Run at the next rendering opportunity.
    fn request_frame(&self, ticket: Ticket);

    fn cancel_frame(&self, ticket: Ticket);

    /// Run after `delay`.
    fn set_timer(&self, ticket: Ticket, delay: Duration);

    fn cancel_timer(&self, ticket: Ticket);
}

/// What to observe under a container root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObserveFilter {
    /// Child additions and removals.
    pub child_list: bool,
    /// Whole subtree rather than direct children.
    pub subtree: bool,
    /// Attribute names whose changes count as mutations. Empty disables attribute observation.
    pub attributes: Vec<SmolStr>,
}

/// Subscription to subtree mutations.
///
/// Implementations deliver `Signal::DomMutated` to the owning session.
pub trait MutationSource<R> {
    type Subscription;

    fn subscribe(&self, root: &R, filter: &ObserveFilter) -> Result<Self::Subscription, PlatformError>;

    fn unsubscribe(&self, subscription: Self::Subscription);
}

/// Mutation source for surfaces without observation (the read view).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMutations;

impl<R> MutationSource<R> for NoMutations {
    type Subscription = ();

    fn subscribe(&self, _root: &R, _filter: &ObserveFilter) -> Result<(), PlatformError> {
        Ok(())
    }

    fn unsubscribe(&self, _subscription: ()) {}
}
