//! Whole-document directive scan.

use crate::directive::DirectiveSet;
use crate::reference::references;

/// Does any embed reference in `text` carry a directive?
///
/// Equal by construction to OR-ing [`DirectiveSet::match_snippet`] over every
/// reference, with a substring prefilter so documents without embeds or
/// keywords never reach the regex engine.
pub fn has_any_directive(text: &str, directives: &DirectiveSet) -> bool {
    if !text.contains("![[") || !directives.any_keyword_in(text) {
        return false;
    }

    references(text).any(|r| directives.match_snippet(r.text).is_some())
}
