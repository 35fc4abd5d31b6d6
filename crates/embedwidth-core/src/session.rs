//! One view instance's reconciliation lifecycle.
//!
//! A `Session` ties a container and its source to a scheduler. The host
//! forwards signals plus frame and timer deliveries; the session runs passes
//! when the scheduler says so and stops everything on teardown.
//!
//! Construction schedules the initial pass and starts the retry ladder, so
//! embeds that finish mounting shortly after the view opens are still
//! picked up without another edit.

use web_time::Instant;

use crate::config::ValidatedConfig;
use crate::error::PlatformError;
use crate::locate::Locator;
use crate::platform::{Container, MutationSource, NoMutations, SchedulePlatform, SourceProvider};
use crate::reconcile::{PassOutcome, PassReport, Reconciler};
use crate::scan::has_any_directive;
use crate::schedule::{Phase, Scheduler, Signal, Ticket};

pub struct Session<C, S, P, M>
where
    C: Container,
    S: SourceProvider<C::Node>,
    P: SchedulePlatform,
    M: MutationSource<C::Root>,
{
    container: C,
    source: S,
    platform: P,
    mutations: M,
    subscription: Option<M::Subscription>,
    scheduler: Scheduler,
    reconciler: Reconciler,
    directive_hint: bool,
    passes: u64,
}

impl<C, S, P, M> Session<C, S, P, M>
where
    C: Container,
    S: SourceProvider<C::Node>,
    P: SchedulePlatform,
    M: MutationSource<C::Root>,
{
    /// Session for a live editing surface: position lookup first, mutations
    /// observed under the container root.
    pub fn live(
        container: C,
        source: S,
        platform: P,
        mutations: M,
        config: &ValidatedConfig,
    ) -> Result<Self, PlatformError> {
        let subscription = mutations.subscribe(container.root(), &config.observe_filter())?;
        Ok(Self::start(
            container,
            source,
            platform,
            mutations,
            Some(subscription),
            config,
            Locator::live(),
        ))
    }

    fn start(
        container: C,
        source: S,
        platform: P,
        mutations: M,
        subscription: Option<M::Subscription>,
        config: &ValidatedConfig,
        locator: Locator,
    ) -> Self {
        let mut session = Self {
            container,
            source,
            platform,
            mutations,
            subscription,
            scheduler: config.scheduler(),
            reconciler: Reconciler::new(config.directives.clone(), locator),
            directive_hint: false,
            passes: 0,
        };
        tracing::debug!(
            strategies = ?session.reconciler.locator().strategies(),
            "reconciliation session started"
        );
        session.signal(Signal::DocumentChanged);
        session
    }

    /// Forward a host event.
    pub fn signal(&mut self, signal: Signal) {
        if self.scheduler.is_torn_down() {
            return;
        }
        if signal == Signal::DocumentChanged {
            self.refresh_hint();
        }
        self.scheduler.signal(signal, &self.platform);
    }

    /// A frame requested through the platform was delivered.
    pub fn on_frame(&mut self, ticket: Ticket) -> Option<PassReport> {
        if !self.scheduler.on_frame(ticket) {
            return None;
        }
        Some(self.run_pass())
    }

    /// A timer set through the platform fired.
    pub fn on_timer(&mut self, ticket: Ticket) {
        self.scheduler.on_timer(ticket, &self.platform);
    }

    /// Run a pass immediately, outside the schedule.
    pub fn reconcile_now(&mut self) -> Option<PassReport> {
        if self.scheduler.is_torn_down() {
            return None;
        }
        Some(self.run_pass())
    }

    /// Cancel pending work and stop observing. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.scheduler.teardown(&self.platform);
        if let Some(subscription) = self.subscription.take() {
            self.mutations.unsubscribe(subscription);
        }
    }

    pub fn phase(&self) -> Phase {
        self.scheduler.phase()
    }

    /// Whether the source contained a directive at the last check.
    ///
    /// Advisory only: annotations always come from a full pass.
    pub fn directive_hint(&self) -> bool {
        self.directive_hint
    }

    /// Passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    fn refresh_hint(&mut self) {
        if let Some(text) = self.source.source_text() {
            self.directive_hint = has_any_directive(&text, self.reconciler.directives());
        }
    }

    fn run_pass(&mut self) -> PassReport {
        let started = Instant::now();
        let report = self.reconciler.reconcile(&self.container, &self.source);
        self.passes += 1;

        match report.outcome {
            PassOutcome::Reconciled => self.directive_hint = true,
            PassOutcome::NoDirectives => self.directive_hint = false,
            PassOutcome::NoSource => {}
        }

        tracing::debug!(
            pass = self.passes,
            outcome = ?report.outcome,
            nodes = report.nodes,
            annotated = report.annotated,
            unresolved = report.unresolved,
            writes = report.writes,
            marker = report.marker,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "reconciliation pass"
        );
        report
    }
}

impl<C, S, P> Session<C, S, P, NoMutations>
where
    C: Container,
    S: SourceProvider<C::Node>,
    P: SchedulePlatform,
{
    /// Session for a rendered read view: identifier search only, driven by
    /// section and layout signals rather than mutation observation.
    pub fn read(container: C, source: S, platform: P, config: &ValidatedConfig) -> Self {
        Self::start(container, source, platform, NoMutations, None, config, Locator::read())
    }
}

impl<C, S, P, M> Drop for Session<C, S, P, M>
where
    C: Container,
    S: SourceProvider<C::Node>,
    P: SchedulePlatform,
    M: MutationSource<C::Root>,
{
    fn drop(&mut self) {
        self.teardown();
    }
}
