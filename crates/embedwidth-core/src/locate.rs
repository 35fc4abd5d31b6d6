//! Mapping rendered embeds back to their source snippet.
//!
//! A `Locator` is an ordered list of strategies; the first one that yields a
//! snippet wins. Strategy failures are expected (unmapped nodes mid-reflow,
//! stale offsets, missing identifiers) and never surface as errors.
//!
//! # Known limitation
//!
//! Identifier search cannot tell apart two references to the same target.
//! The first textual match inside the search scope is used, so duplicated
//! transclusions with different directives all take the first one's
//! directive. The choice is deterministic, so repeated passes agree.

use crate::platform::{EmbedNode, SourceProvider};
use crate::reference::{self, EmbedRef};
use crate::text;

/// One way of finding a node's source snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Ask the surface for the node's source offset and take the reference on that line.
    Position,
    /// Search the source for a reference whose target equals the node's identifier.
    IdentifierSearch,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Position => "position",
            Strategy::IdentifierSearch => "identifier",
        }
    }

    fn attempt<'s, N, P>(self, node: &N, provider: &P, source: &'s str) -> Option<&'s str>
    where
        N: EmbedNode,
        P: SourceProvider<N>,
    {
        match self {
            Strategy::Position => by_position(node, provider, source),
            Strategy::IdentifierSearch => by_identifier(node, provider, source),
        }
    }
}

/// A located snippet and the strategy that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located<'s> {
    pub snippet: &'s str,
    pub strategy: Strategy,
}

/// Ordered strategy list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    strategies: Vec<Strategy>,
}

impl Locator {
    /// Position first, identifier search as fallback.
    pub fn live() -> Self {
        Self::with_strategies([Strategy::Position, Strategy::IdentifierSearch])
    }

    /// Identifier search only; the read view has no position mapping.
    pub fn read() -> Self {
        Self::with_strategies([Strategy::IdentifierSearch])
    }

    pub fn with_strategies(strategies: impl IntoIterator<Item = Strategy>) -> Self {
        Self {
            strategies: strategies.into_iter().collect(),
        }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn locate<'s, N, P>(&self, node: &N, provider: &P, source: &'s str) -> Option<Located<'s>>
    where
        N: EmbedNode,
        P: SourceProvider<N>,
    {
        self.strategies.iter().find_map(|&strategy| {
            strategy
                .attempt(node, provider, source)
                .map(|snippet| Located { snippet, strategy })
        })
    }
}

fn by_position<'s, N, P>(node: &N, provider: &P, source: &'s str) -> Option<&'s str>
where
    N: EmbedNode,
    P: SourceProvider<N>,
{
    let offset = match provider.position_of(node, source) {
        Ok(Some(offset)) if offset <= source.len() => offset,
        Ok(Some(offset)) => {
            tracing::trace!(offset, len = source.len(), "position past end of source");
            return None;
        }
        Ok(None) => return None,
        Err(e) => {
            tracing::trace!(error = %e, "position lookup failed");
            return None;
        }
    };

    let line = text::line_range(source, offset);
    let line_text = &source[line.clone()];
    let in_line = offset.saturating_sub(line.start);
    let refs: Vec<EmbedRef<'s>> = reference::references(line_text).collect();
    let identifier = node.identifier();
    let identifier = identifier.as_deref().map(str::trim).filter(|id| !id.is_empty());

    // Several embeds can share a line; pick the one this node renders. A
    // known identifier must agree with the chosen reference's target.
    let chosen = match identifier {
        Some(id) => {
            let mut same_target = refs.iter().filter(|r| r.target == id);
            let containing = same_target.clone().find(|r| r.span.contains(&in_line));
            let following = same_target.clone().find(|r| r.span.start >= in_line);
            containing.or(following).or_else(|| same_target.next())
        }
        None => refs
            .iter()
            .find(|r| r.span.contains(&in_line))
            .or_else(|| match refs.as_slice() {
                [only] => Some(only),
                _ => None,
            }),
    };
    let Some(chosen) = chosen else {
        tracing::trace!(?identifier, offset, "no matching reference on position line");
        return None;
    };

    Some(chosen.text)
}

fn by_identifier<'s, N, P>(node: &N, provider: &P, source: &'s str) -> Option<&'s str>
where
    N: EmbedNode,
    P: SourceProvider<N>,
{
    let identifier = node.identifier()?;
    if identifier.trim().is_empty() {
        return None;
    }

    let pattern = match reference::identifier_pattern(&identifier) {
        Ok(pattern) => pattern,
        Err(e) => {
            tracing::trace!(%identifier, error = %e, "identifier pattern failed to compile");
            return None;
        }
    };

    let scoped = provider
        .scope_of(node, source)
        .and_then(|scope| source.get(scope))
        .and_then(|scope| pattern.find(scope));

    scoped
        .or_else(|| pattern.find(source))
        .map(|m| m.as_str())
}
