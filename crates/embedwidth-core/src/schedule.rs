//! When reconciliation passes run.
//!
//! One `Scheduler` per container. It never runs a pass itself: it asks the
//! platform for frames and timers, and reports through [`Scheduler::on_frame`]
//! whether a delivered frame should run a pass.
//!
//! # Signals
//!
//! | signal | effect |
//! | --- | --- |
//! | `DocumentChanged` | debounced frame pass, retry ladder (re)started |
//! | `ViewportChanged`, `GeometryChanged`, `FocusChanged`, `DomMutated` | debounced frame pass |
//! | `LayoutChanged`, `ActiveViewChanged` | delayed rescan timer, then frame pass |
//! | `RetryTick` | frame pass (issued internally by the ladder) |
//!
//! Debouncing is cancel-and-reissue: a new request cancels the pending frame
//! and asks for another, so any burst within one frame yields one pass.
//! Every request carries a fresh [`Ticket`]; deliveries with a superseded or
//! cancelled ticket are ignored.

use std::time::Duration;

use crate::error::ConfigError;
use crate::platform::SchedulePlatform;

/// Offsets (ms from the document change) used when none are configured.
pub const DEFAULT_RETRY_LADDER_MS: [u32; 7] = [50, 100, 250, 500, 1000, 2000, 4000];

/// Identifies one scheduled frame or timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Events that may trigger a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    DocumentChanged,
    ViewportChanged,
    GeometryChanged,
    FocusChanged,
    DomMutated,
    LayoutChanged,
    ActiveViewChanged,
    RetryTick,
}

/// Coarse scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing pending.
    Idle,
    /// A frame pass or delayed rescan is pending, no ladder.
    PassScheduled,
    /// The retry ladder is running (a pass may also be pending).
    RetrySequenceActive,
    /// Torn down; every call is ignored.
    TornDown,
}

/// Ascending delays after a document change at which extra passes run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryLadder {
    offsets: Vec<Duration>,
}

impl RetryLadder {
    /// Build from millisecond offsets. Offsets must be positive and strictly
    /// ascending; an empty ladder disables retries.
    pub fn new(offsets_ms: &[u32]) -> Result<Self, ConfigError> {
        let ascending = offsets_ms.windows(2).all(|w| w[0] < w[1]);
        if !ascending || offsets_ms.first() == Some(&0) {
            return Err(ConfigError::Ladder(offsets_ms.to_vec()));
        }

        Ok(Self {
            offsets: offsets_ms
                .iter()
                .map(|&ms| Duration::from_millis(u64::from(ms)))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offsets from the document change.
    pub fn offsets(&self) -> &[Duration] {
        &self.offsets
    }

    /// Wait between the previous step (or the change itself) and `step`.
    fn delay_before(&self, step: usize) -> Option<Duration> {
        let at = *self.offsets.get(step)?;
        let prev = step
            .checked_sub(1)
            .and_then(|p| self.offsets.get(p).copied())
            .unwrap_or_default();
        Some(at - prev)
    }
}

impl Default for RetryLadder {
    fn default() -> Self {
        Self {
            offsets: DEFAULT_RETRY_LADDER_MS
                .iter()
                .map(|&ms| Duration::from_millis(u64::from(ms)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LadderStep {
    ticket: Ticket,
    step: usize,
}

/// Per-container pass scheduling state machine.
#[derive(Debug)]
pub struct Scheduler {
    ladder: RetryLadder,
    rescan_delay: Duration,
    next_ticket: u64,
    frame: Option<Ticket>,
    retry: Option<LadderStep>,
    rescan: Option<Ticket>,
    torn_down: bool,
}

impl Scheduler {
    pub fn new(ladder: RetryLadder, rescan_delay: Duration) -> Self {
        Self {
            ladder,
            rescan_delay,
            next_ticket: 0,
            frame: None,
            retry: None,
            rescan: None,
            torn_down: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.torn_down {
            Phase::TornDown
        } else if self.retry.is_some() {
            Phase::RetrySequenceActive
        } else if self.frame.is_some() || self.rescan.is_some() {
            Phase::PassScheduled
        } else {
            Phase::Idle
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Current ladder step, if the ladder is running.
    pub fn retry_step(&self) -> Option<usize> {
        self.retry.map(|r| r.step)
    }

    pub fn signal<P: SchedulePlatform>(&mut self, signal: Signal, platform: &P) {
        if self.torn_down {
            tracing::trace!(?signal, "signal after teardown ignored");
            return;
        }

        tracing::trace!(?signal, phase = ?self.phase(), "scheduler signal");

        match signal {
            Signal::DocumentChanged => {
                self.request_pass(platform);
                self.restart_ladder(platform);
            }
            Signal::ViewportChanged
            | Signal::GeometryChanged
            | Signal::FocusChanged
            | Signal::DomMutated
            | Signal::RetryTick => self.request_pass(platform),
            Signal::LayoutChanged | Signal::ActiveViewChanged => self.restart_rescan(platform),
        }
    }

    /// A frame was delivered. Returns true when the caller should run a pass now.
    pub fn on_frame(&mut self, ticket: Ticket) -> bool {
        if self.torn_down || self.frame != Some(ticket) {
            tracing::trace!(ticket = ticket.get(), "stale frame ignored");
            return false;
        }
        self.frame = None;
        true
    }

    /// A timer was delivered.
    pub fn on_timer<P: SchedulePlatform>(&mut self, ticket: Ticket, platform: &P) {
        if self.torn_down {
            return;
        }

        if let Some(current) = self.retry.filter(|r| r.ticket == ticket) {
            tracing::trace!(step = current.step, "retry ladder step");
            self.signal(Signal::RetryTick, platform);
            self.arm_step(current.step + 1, platform);
        } else if self.rescan == Some(ticket) {
            self.rescan = None;
            self.request_pass(platform);
        } else {
            tracing::trace!(ticket = ticket.get(), "stale timer ignored");
        }
    }

    /// Cancel everything pending. Later calls are ignored.
    pub fn teardown<P: SchedulePlatform>(&mut self, platform: &P) {
        if self.torn_down {
            return;
        }
        if let Some(ticket) = self.frame.take() {
            platform.cancel_frame(ticket);
        }
        if let Some(current) = self.retry.take() {
            platform.cancel_timer(current.ticket);
        }
        if let Some(ticket) = self.rescan.take() {
            platform.cancel_timer(ticket);
        }
        self.torn_down = true;
        tracing::debug!("scheduler torn down");
    }

    fn issue(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    fn request_pass<P: SchedulePlatform>(&mut self, platform: &P) {
        if let Some(pending) = self.frame.take() {
            platform.cancel_frame(pending);
        }
        let ticket = self.issue();
        platform.request_frame(ticket);
        self.frame = Some(ticket);
    }

    fn restart_ladder<P: SchedulePlatform>(&mut self, platform: &P) {
        if let Some(current) = self.retry.take() {
            platform.cancel_timer(current.ticket);
        }
        self.arm_step(0, platform);
    }

    fn arm_step<P: SchedulePlatform>(&mut self, step: usize, platform: &P) {
        match self.ladder.delay_before(step) {
            Some(delay) => {
                let ticket = self.issue();
                platform.set_timer(ticket, delay);
                self.retry = Some(LadderStep { ticket, step });
            }
            None => {
                if step > 0 {
                    tracing::debug!(steps = step, "retry ladder finished");
                }
                self.retry = None;
            }
        }
    }

    fn restart_rescan<P: SchedulePlatform>(&mut self, platform: &P) {
        if let Some(pending) = self.rescan.take() {
            platform.cancel_timer(pending);
        }
        let ticket = self.issue();
        platform.set_timer(ticket, self.rescan_delay);
        self.rescan = Some(ticket);
    }
}
