//! Width directive matching.
//!
//! A directive is a keyword placed in an embed's modifier segment:
//! `![[chart.png|wide]]`. Directives are evaluated in configured priority
//! order and the first one found wins, regardless of where the keywords sit
//! in the text.

use std::fmt;

use regex_lite::Regex;
use smol_str::SmolStr;

use crate::error::ConfigError;

/// Keywords recognised when no configuration is supplied, highest priority first.
pub const DEFAULT_DIRECTIVES: [&str; 3] = ["wide", "max", "full"];

/// One width directive keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Directive {
    keyword: SmolStr,
}

impl Directive {
    /// The keyword as written in source and in the annotation attribute.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keyword)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    directive: Directive,
    pattern: Regex,
}

/// Ordered set of directives with their compiled patterns.
#[derive(Debug, Clone)]
pub struct DirectiveSet {
    entries: Vec<Entry>,
}

impl DirectiveSet {
    /// Build a set from keywords in priority order.
    pub fn new<I, S>(keywords: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries: Vec<Entry> = Vec::new();

        for (idx, keyword) in keywords.into_iter().enumerate() {
            let keyword = keyword.as_ref();
            if keyword.trim().is_empty() {
                return Err(ConfigError::BlankDirective(idx));
            }
            if keyword
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '|' | '[' | ']'))
            {
                return Err(ConfigError::InvalidDirective(keyword.into()));
            }
            if entries.iter().any(|e| e.directive.keyword() == keyword) {
                return Err(ConfigError::DuplicateDirective(keyword.into()));
            }

            // Inside one reference (no brackets between `![[` and `]]`),
            // after a pipe, bounded as a whole word.
            let pattern = Regex::new(&format!(
                r"!\[\[[^\[\]]*\|[^\[\]]*?\b{}\b[^\[\]]*\]\]",
                regex_lite::escape(keyword)
            ))?;

            entries.push(Entry {
                directive: Directive {
                    keyword: keyword.into(),
                },
                pattern,
            });
        }

        if entries.is_empty() {
            return Err(ConfigError::NoDirectives);
        }

        Ok(Self { entries })
    }

    /// Directives in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Directive> {
        self.entries.iter().map(|e| &e.directive)
    }

    /// Number of configured directives.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed set; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a directive by keyword.
    pub fn get(&self, keyword: &str) -> Option<&Directive> {
        self.iter().find(|d| d.keyword() == keyword)
    }

    /// Classify a snippet holding (at most) one embed reference.
    ///
    /// Returns the highest-priority directive whose keyword sits in the
    /// reference's modifier segment.
    pub fn match_snippet(&self, snippet: &str) -> Option<&Directive> {
        self.entries
            .iter()
            .find(|e| e.pattern.is_match(snippet))
            .map(|e| &e.directive)
    }

    /// True when `text` contains any keyword as a plain substring.
    ///
    /// Necessary but not sufficient for a match; used as a cheap prefilter.
    pub(crate) fn any_keyword_in(&self, text: &str) -> bool {
        self.entries
            .iter()
            .any(|e| text.contains(e.directive.keyword()))
    }
}

impl Default for DirectiveSet {
    fn default() -> Self {
        match Self::new(DEFAULT_DIRECTIVES) {
            Ok(set) => set,
            Err(e) => unreachable!("default directives are valid: {e}"),
        }
    }
}
