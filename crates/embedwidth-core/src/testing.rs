//! In-memory doubles for the platform traits.
//!
//! Enabled for this crate's tests and, through the `testing` feature, for
//! downstream crates. Everything here is single-threaded and shares state
//! through `Rc`, so a test can keep a handle to a node or platform after
//! handing a clone to a session.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;
use std::time::Duration;

use smol_str::SmolStr;

use crate::directive::Directive;
use crate::error::PlatformError;
use crate::platform::{
    Container, EmbedNode, MutationSource, ObserveFilter, SchedulePlatform, SourceProvider,
};
use crate::reconcile::PassReport;
use crate::schedule::Ticket;
use crate::session::Session;

thread_local! {
    static NEXT_NODE_ID: Cell<u64> = const { Cell::new(0) };
}

/// Time between a frame request and its delivery.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug)]
struct NodeState {
    identifier: Option<SmolStr>,
    directive: Option<SmolStr>,
    writes: usize,
}

/// A rendered embed. Clones share state.
#[derive(Debug, Clone)]
pub struct FakeNode {
    id: u64,
    state: Rc<RefCell<NodeState>>,
}

impl FakeNode {
    pub fn new(identifier: impl Into<SmolStr>) -> Self {
        Self::with_identifier(Some(identifier.into()))
    }

    /// A node without an identifier attribute.
    pub fn anonymous() -> Self {
        Self::with_identifier(None)
    }

    fn with_identifier(identifier: Option<SmolStr>) -> Self {
        let id = NEXT_NODE_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            id,
            state: Rc::new(RefCell::new(NodeState {
                identifier,
                directive: None,
                writes: 0,
            })),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Annotation writes performed on this node, including clears.
    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }
}

impl PartialEq for FakeNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FakeNode {}

impl EmbedNode for FakeNode {
    fn identifier(&self) -> Option<SmolStr> {
        self.state.borrow().identifier.clone()
    }

    fn directive(&self) -> Option<SmolStr> {
        self.state.borrow().directive.clone()
    }

    fn set_directive(&self, directive: Option<&Directive>) {
        let mut state = self.state.borrow_mut();
        state.directive = directive.map(|d| SmolStr::new(d.keyword()));
        state.writes += 1;
    }
}

/// A container whose node list can change between passes.
#[derive(Debug, Default)]
pub struct FakeContainer {
    root: (),
    nodes: RefCell<Vec<FakeNode>>,
    marker: Cell<bool>,
    marker_writes: Cell<usize>,
}

impl FakeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: impl IntoIterator<Item = FakeNode>) -> Self {
        let container = Self::new();
        container.nodes.borrow_mut().extend(nodes);
        container
    }

    pub fn mount(&self, node: FakeNode) {
        self.nodes.borrow_mut().push(node);
    }

    pub fn unmount(&self, node: &FakeNode) {
        self.nodes.borrow_mut().retain(|n| n != node);
    }

    pub fn marker_writes(&self) -> usize {
        self.marker_writes.get()
    }
}

impl Container for FakeContainer {
    type Node = FakeNode;
    type Root = ();

    fn root(&self) -> &() {
        &self.root
    }

    fn embed_nodes(&self) -> Vec<FakeNode> {
        self.nodes.borrow().clone()
    }

    fn marker(&self) -> bool {
        self.marker.get()
    }

    fn set_marker(&self, active: bool) {
        self.marker.set(active);
        self.marker_writes.set(self.marker_writes.get() + 1);
    }
}

#[derive(Debug, Clone, Copy)]
enum PositionAnswer {
    At(usize),
    Stale,
}

/// Source text with scripted position and scope answers per node.
///
/// Nodes without a scripted position are unmappable (`Ok(None)`).
#[derive(Debug, Default)]
pub struct FakeSource {
    text: RefCell<Option<String>>,
    positions: RefCell<HashMap<u64, PositionAnswer>>,
    scopes: RefCell<HashMap<u64, Range<usize>>>,
}

impl FakeSource {
    pub fn new(text: impl Into<String>) -> Self {
        let source = Self::default();
        source.set_text(text);
        source
    }

    /// A source whose text cannot be read.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.borrow_mut() = Some(text.into());
    }

    pub fn clear_text(&self) {
        *self.text.borrow_mut() = None;
    }

    pub fn set_position(&self, node: &FakeNode, offset: usize) {
        self.positions
            .borrow_mut()
            .insert(node.id(), PositionAnswer::At(offset));
    }

    /// Position lookups for `node` fail, as for a detached element.
    pub fn set_stale(&self, node: &FakeNode) {
        self.positions
            .borrow_mut()
            .insert(node.id(), PositionAnswer::Stale);
    }

    pub fn set_scope(&self, node: &FakeNode, scope: Range<usize>) {
        self.scopes.borrow_mut().insert(node.id(), scope);
    }
}

impl SourceProvider<FakeNode> for FakeSource {
    fn source_text(&self) -> Option<String> {
        self.text.borrow().clone()
    }

    fn position_of(&self, node: &FakeNode, _source: &str) -> Result<Option<usize>, PlatformError> {
        match self.positions.borrow().get(&node.id()) {
            Some(PositionAnswer::At(offset)) => Ok(Some(*offset)),
            Some(PositionAnswer::Stale) => Err("node is not mapped to the document".into()),
            None => Ok(None),
        }
    }

    fn scope_of(&self, node: &FakeNode, _source: &str) -> Option<Range<usize>> {
        self.scopes.borrow().get(&node.id()).cloned()
    }
}

/// A delivery from [`ManualPlatform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
    Frame(Ticket),
    Timer(Ticket),
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    at: Duration,
    seq: u64,
    due: Due,
}

#[derive(Debug, Default)]
struct Clock {
    now: Duration,
    seq: u64,
    pending: Vec<Pending>,
}

impl Clock {
    fn push(&mut self, at: Duration, due: Due) {
        self.seq += 1;
        let seq = self.seq;
        self.pending.push(Pending { at, seq, due });
    }

    fn remove(&mut self, due: Due) {
        self.pending.retain(|p| p.due != due);
    }
}

/// Virtual clock standing in for the browser's frame and timer queues.
///
/// Frames are due one [`FRAME_INTERVAL`] after the request, timers after
/// their delay. Nothing runs until the test pops it.
#[derive(Debug, Clone, Default)]
pub struct ManualPlatform {
    clock: Rc<RefCell<Clock>>,
}

impl ManualPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    /// Remove and return the earliest delivery due at or before `until`,
    /// moving the clock to its due time.
    pub fn pop_due(&self, until: Duration) -> Option<Due> {
        let mut clock = self.clock.borrow_mut();
        let (index, next) = clock
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.at <= until)
            .min_by_key(|(_, p)| (p.at, p.seq))
            .map(|(i, p)| (i, *p))?;
        clock.pending.remove(index);
        clock.now = clock.now.max(next.at);
        Some(next.due)
    }

    pub fn advance_to(&self, until: Duration) {
        let mut clock = self.clock.borrow_mut();
        clock.now = clock.now.max(until);
    }

    pub fn pending_frames(&self) -> usize {
        self.frame_tickets().len()
    }

    pub fn pending_timers(&self) -> usize {
        self.clock
            .borrow()
            .pending
            .iter()
            .filter(|p| matches!(p.due, Due::Timer(_)))
            .count()
    }

    /// Pending frame tickets in request order.
    pub fn frame_tickets(&self) -> Vec<Ticket> {
        let clock = self.clock.borrow();
        let mut frames: Vec<_> = clock
            .pending
            .iter()
            .filter_map(|p| match p.due {
                Due::Frame(ticket) => Some((p.seq, ticket)),
                Due::Timer(_) => None,
            })
            .collect();
        frames.sort_unstable();
        frames.into_iter().map(|(_, ticket)| ticket).collect()
    }
}

impl SchedulePlatform for ManualPlatform {
    fn request_frame(&self, ticket: Ticket) {
        let mut clock = self.clock.borrow_mut();
        let at = clock.now + FRAME_INTERVAL;
        clock.push(at, Due::Frame(ticket));
    }

    fn cancel_frame(&self, ticket: Ticket) {
        self.clock.borrow_mut().remove(Due::Frame(ticket));
    }

    fn set_timer(&self, ticket: Ticket, delay: Duration) {
        let mut clock = self.clock.borrow_mut();
        let at = clock.now + delay;
        clock.push(at, Due::Timer(ticket));
    }

    fn cancel_timer(&self, ticket: Ticket) {
        self.clock.borrow_mut().remove(Due::Timer(ticket));
    }
}

#[derive(Debug, Default)]
struct MutationLog {
    next: u64,
    active: Vec<u64>,
    filters: Vec<ObserveFilter>,
    unsubscribed: usize,
    fail: bool,
}

/// Records subscriptions instead of observing anything.
#[derive(Debug, Clone, Default)]
pub struct FakeMutations {
    log: Rc<RefCell<MutationLog>>,
}

impl FakeMutations {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose subscriptions are refused.
    pub fn failing() -> Self {
        let mutations = Self::default();
        mutations.log.borrow_mut().fail = true;
        mutations
    }

    pub fn active(&self) -> usize {
        self.log.borrow().active.len()
    }

    pub fn unsubscribed(&self) -> usize {
        self.log.borrow().unsubscribed
    }

    pub fn last_filter(&self) -> Option<ObserveFilter> {
        self.log.borrow().filters.last().cloned()
    }
}

impl MutationSource<()> for FakeMutations {
    type Subscription = u64;

    fn subscribe(&self, _root: &(), filter: &ObserveFilter) -> Result<u64, PlatformError> {
        let mut log = self.log.borrow_mut();
        if log.fail {
            return Err("observation unavailable".into());
        }
        log.next += 1;
        let id = log.next;
        log.active.push(id);
        log.filters.push(filter.clone());
        Ok(id)
    }

    fn unsubscribe(&self, subscription: u64) {
        let mut log = self.log.borrow_mut();
        log.active.retain(|&id| id != subscription);
        log.unsubscribed += 1;
    }
}

/// Deliver every frame and timer due up to `until`, then move the clock there.
///
/// Returns the reports of the passes that ran.
pub fn run_until<C, S, M>(
    session: &mut Session<C, S, ManualPlatform, M>,
    until: Duration,
) -> Vec<PassReport>
where
    C: Container,
    S: SourceProvider<C::Node>,
    M: MutationSource<C::Root>,
{
    let platform = session.platform().clone();
    let mut reports = Vec::new();
    while let Some(due) = platform.pop_due(until) {
        match due {
            Due::Frame(ticket) => reports.extend(session.on_frame(ticket)),
            Due::Timer(ticket) => session.on_timer(ticket),
        }
    }
    platform.advance_to(until);
    reports
}
