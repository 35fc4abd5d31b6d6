//! Full-sweep reconciliation of one container.
//!
//! Every pass re-derives every mounted node's annotation from source and then
//! the container marker from the nodes. Nothing is diffed against the
//! previous pass: embeds remount and change identity too often for per-node
//! bookkeeping to stay correct.

use serde::Serialize;

use crate::directive::{Directive, DirectiveSet};
use crate::locate::Locator;
use crate::platform::{Container, EmbedNode, SourceProvider};
use crate::scan::has_any_directive;

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcome {
    /// Nodes were located and classified.
    Reconciled,
    /// The source has no directive anywhere; every node was cleared without lookup.
    NoDirectives,
    /// The source text was unavailable; nothing was written.
    NoSource,
}

/// Summary of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub outcome: PassOutcome,
    /// Mounted nodes seen.
    pub nodes: usize,
    /// Nodes left carrying a directive.
    pub annotated: usize,
    /// Nodes no strategy could locate.
    pub unresolved: usize,
    /// Attribute and class writes performed.
    pub writes: usize,
    /// Marker value after the pass.
    pub marker: bool,
}

impl PassReport {
    fn new(outcome: PassOutcome, nodes: usize) -> Self {
        Self {
            outcome,
            nodes,
            annotated: 0,
            unresolved: 0,
            writes: 0,
            marker: false,
        }
    }
}

/// Locates, classifies and annotates a container's embeds.
#[derive(Debug, Clone)]
pub struct Reconciler {
    directives: DirectiveSet,
    locator: Locator,
}

impl Reconciler {
    pub fn new(directives: DirectiveSet, locator: Locator) -> Self {
        Self { directives, locator }
    }

    pub fn directives(&self) -> &DirectiveSet {
        &self.directives
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Run one pass over `container`.
    ///
    /// Writes only where the value changes, so a repeated pass with no
    /// intervening change performs no writes.
    pub fn reconcile<C, P>(&self, container: &C, provider: &P) -> PassReport
    where
        C: Container,
        P: SourceProvider<C::Node>,
    {
        let Some(source) = provider.source_text() else {
            tracing::debug!("source text unavailable, pass skipped");
            let mut report = PassReport::new(PassOutcome::NoSource, 0);
            report.marker = container.marker();
            return report;
        };

        let nodes = container.embed_nodes();
        let gated = !has_any_directive(&source, &self.directives);
        let outcome = if gated {
            PassOutcome::NoDirectives
        } else {
            PassOutcome::Reconciled
        };
        let mut report = PassReport::new(outcome, nodes.len());

        for node in &nodes {
            let desired = if gated {
                None
            } else {
                self.classify(node, provider, &source, &mut report)
            };

            if desired.is_some() {
                report.annotated += 1;
            }
            if write_directive(node, desired) {
                report.writes += 1;
            }
        }

        let marker = report.annotated > 0;
        if container.marker() != marker {
            container.set_marker(marker);
            report.writes += 1;
        }
        report.marker = marker;

        report
    }

    fn classify<N, P>(
        &self,
        node: &N,
        provider: &P,
        source: &str,
        report: &mut PassReport,
    ) -> Option<&Directive>
    where
        N: EmbedNode,
        P: SourceProvider<N>,
    {
        let Some(located) = self.locator.locate(node, provider, source) else {
            report.unresolved += 1;
            tracing::trace!(identifier = ?node.identifier(), "embed left unclassified");
            return None;
        };

        let directive = self.directives.match_snippet(located.snippet);
        tracing::trace!(
            identifier = ?node.identifier(),
            strategy = located.strategy.name(),
            directive = ?directive.map(Directive::keyword),
            "embed classified"
        );
        directive
    }
}

fn write_directive<N: EmbedNode>(node: &N, desired: Option<&Directive>) -> bool {
    if node.directive().as_deref() == desired.map(Directive::keyword) {
        return false;
    }
    node.set_directive(desired);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeContainer, FakeNode, FakeSource};

    fn live() -> Reconciler {
        Reconciler::new(DirectiveSet::default(), Locator::live())
    }

    fn read() -> Reconciler {
        Reconciler::new(DirectiveSet::default(), Locator::read())
    }

    #[test]
    fn test_single_wide_embed() {
        let text = "![[chart.png|wide]]";
        let node = FakeNode::new("chart.png");
        let container = FakeContainer::with_nodes([node.clone()]);
        let source = FakeSource::new(text);
        source.set_position(&node, 0);

        let report = live().reconcile(&container, &source);
        assert_eq!(node.directive().as_deref(), Some("wide"));
        assert!(container.marker());
        assert_eq!(report.outcome, PassOutcome::Reconciled);
        assert_eq!(report.annotated, 1);
    }

    #[test]
    fn test_size_modifier_only() {
        let text = "![[chart.png|200]]";
        let node = FakeNode::new("chart.png");
        let container = FakeContainer::with_nodes([node.clone()]);
        container.set_marker(true);
        let source = FakeSource::new(text);

        let report = live().reconcile(&container, &source);
        assert_eq!(node.directive(), None);
        assert!(!container.marker());
        assert_eq!(report.outcome, PassOutcome::NoDirectives);
    }

    #[test]
    fn test_shared_line_no_cross_contamination() {
        let text = "![[a.png]] ![[b.png|full]]";
        let a = FakeNode::new("a.png");
        let b = FakeNode::new("b.png");
        let container = FakeContainer::with_nodes([a.clone(), b.clone()]);
        let source = FakeSource::new(text);
        source.set_position(&a, 0);
        source.set_position(&b, 11);

        live().reconcile(&container, &source);
        assert_eq!(a.directive(), None);
        assert_eq!(b.directive().as_deref(), Some("full"));
        assert!(container.marker());

        // Same outcome when only identifier search is available.
        let a2 = FakeNode::new("a.png");
        let b2 = FakeNode::new("b.png");
        let container = FakeContainer::with_nodes([a2.clone(), b2.clone()]);
        read().reconcile(&container, &FakeSource::new(text));
        assert_eq!(a2.directive(), None);
        assert_eq!(b2.directive().as_deref(), Some("full"));
    }

    #[test]
    fn test_shared_line_positions_at_line_start() {
        let text = "![[a.png]] ![[b.png|full]]";
        let a = FakeNode::new("a.png");
        let b = FakeNode::new("b.png");
        let container = FakeContainer::with_nodes([a.clone(), b.clone()]);
        let source = FakeSource::new(text);
        // Both widgets report the start of the line.
        source.set_position(&a, 0);
        source.set_position(&b, 0);

        let report = live().reconcile(&container, &source);
        assert_eq!(a.directive(), None);
        assert_eq!(b.directive().as_deref(), Some("full"));
        assert_eq!(report.annotated, 1);
        assert_eq!(report.unresolved, 0);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let text = "![[a.png|max]]\n![[b.png]]\n![[c.png|wide full]]";
        let nodes = [FakeNode::new("a.png"), FakeNode::new("b.png"), FakeNode::new("c.png")];
        let container = FakeContainer::with_nodes(nodes.clone());
        let source = FakeSource::new(text);

        let first = live().reconcile(&container, &source);
        let annotations: Vec<_> = nodes.iter().map(EmbedNode::directive).collect();
        let second = live().reconcile(&container, &source);
        let again: Vec<_> = nodes.iter().map(EmbedNode::directive).collect();

        assert_eq!(annotations, again);
        assert_eq!(first.marker, second.marker);
        assert_eq!(second.writes, 0);
        assert_eq!(annotations[2].as_deref(), Some("wide"));
    }

    #[test]
    fn test_unresolved_node_is_cleared() {
        let text = "![[a.png|wide]]";
        let stray = FakeNode::new("gone.png");
        stray.set_directive(DirectiveSet::default().get("max"));
        let container = FakeContainer::with_nodes([stray.clone()]);

        let report = live().reconcile(&container, &FakeSource::new(text));
        assert_eq!(stray.directive(), None);
        assert_eq!(report.unresolved, 1);
        assert!(!container.marker());
    }

    #[test]
    fn test_missing_source_is_noop() {
        let node = FakeNode::new("a.png");
        node.set_directive(DirectiveSet::default().get("wide"));
        let container = FakeContainer::with_nodes([node.clone()]);
        container.set_marker(true);

        let report = live().reconcile(&container, &FakeSource::unavailable());
        assert_eq!(report.outcome, PassOutcome::NoSource);
        assert_eq!(report.writes, 0);
        assert_eq!(node.directive().as_deref(), Some("wide"));
        assert!(container.marker());
    }

    #[test]
    fn test_empty_container_clears_marker() {
        let container = FakeContainer::new();
        container.set_marker(true);
        let report = live().reconcile(&container, &FakeSource::new("![[a.png|wide]]"));
        assert_eq!(report.nodes, 0);
        assert!(!container.marker());
    }

    #[test]
    fn test_duplicate_targets_take_first_match() {
        let text = "![[a.png|wide]]\n![[a.png]]";
        let first = FakeNode::new("a.png");
        let second = FakeNode::new("a.png");
        let container = FakeContainer::with_nodes([first.clone(), second.clone()]);
        let source = FakeSource::new(text);

        for _ in 0..3 {
            read().reconcile(&container, &source);
            assert_eq!(first.directive().as_deref(), Some("wide"));
            assert_eq!(second.directive().as_deref(), Some("wide"));
            assert!(container.marker());
        }
    }

    #[test]
    fn test_report_snapshot() {
        let text = "![[a.png]] ![[b.png|full]]\n![[c.png|widescreen]]\n![[d.png|max]]";
        let container = FakeContainer::with_nodes([
            FakeNode::new("a.png"),
            FakeNode::new("b.png"),
            FakeNode::new("c.png"),
            FakeNode::new("d.png"),
            FakeNode::new("missing.png"),
        ]);
        let report = read().reconcile(&container, &FakeSource::new(text));
        insta::assert_yaml_snapshot!(report);
    }
}
