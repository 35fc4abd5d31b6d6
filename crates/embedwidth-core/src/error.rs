//! Error types for configuration and platform collaborators.

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while validating a [`WidthConfig`](crate::WidthConfig).
///
/// These are the only errors that reach the host. Everything that can go
/// wrong at runtime degrades to "left unannotated this pass" instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The directive list is empty.
    #[error("no width directives configured")]
    NoDirectives,

    /// A directive keyword is empty or whitespace.
    #[error("width directive at position {0} is blank")]
    BlankDirective(usize),

    /// A directive keyword contains reference syntax or whitespace.
    #[error("width directive `{0}` contains whitespace, `|`, `[` or `]`")]
    InvalidDirective(SmolStr),

    /// The same keyword appears twice.
    #[error("duplicate width directive `{0}`")]
    DuplicateDirective(SmolStr),

    /// Retry ladder offsets are zero or not strictly ascending.
    #[error("retry ladder must be positive and strictly ascending, got {0:?}")]
    Ladder(Vec<u32>),

    /// A selector or attribute name is empty.
    #[error("`{0}` must not be blank")]
    Blank(&'static str),

    /// The annotation attribute is also observed, which would echo every pass.
    #[error("directive attribute `{0}` must not be a tracked attribute")]
    TrackedDirectiveAttribute(SmolStr),

    /// A directive pattern failed to compile.
    #[error("invalid directive pattern: {0}")]
    Pattern(String),
}

impl From<regex_lite::Error> for ConfigError {
    fn from(e: regex_lite::Error) -> Self {
        ConfigError::Pattern(e.to_string())
    }
}

/// Error reported by a platform collaborator (editor bridge, DOM, observer).
///
/// Never propagated out of a pass; callers log it and fall through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}
