//! embedwidth-core: width directive reconciliation without DOM dependencies.
//!
//! This crate provides:
//! - `DirectiveSet` - ordered keyword matcher for embed modifier text
//! - `references` / `has_any_directive` - source text parsing and the cheap global scan
//! - `Locator` - maps a rendered embed back to its source snippet
//! - `Reconciler` - full-sweep annotation of a container's embeds
//! - `Scheduler` / `Session` - debounced, retried, cancellable passes per container
//!
//! The DOM side lives behind the traits in `platform`, implemented by
//! `embedwidth-browser` for the browser and by `testing` for native tests.

pub mod config;
pub mod directive;
pub mod error;
pub mod locate;
pub mod platform;
pub mod reconcile;
pub mod reference;
pub mod scan;
pub mod schedule;
pub mod session;
pub mod text;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{DomNames, ValidatedConfig, WidthConfig};
pub use directive::{Directive, DirectiveSet};
pub use error::{ConfigError, PlatformError};
pub use locate::{Located, Locator, Strategy};
pub use platform::{
    Container, EmbedNode, MutationSource, NoMutations, ObserveFilter, SchedulePlatform,
    SourceProvider,
};
pub use reconcile::{PassOutcome, PassReport, Reconciler};
pub use reference::{EmbedRef, identifier_pattern, references};
pub use scan::has_any_directive;
pub use schedule::{Phase, RetryLadder, Scheduler, Signal, Ticket};
pub use session::Session;
pub use smol_str::SmolStr;
