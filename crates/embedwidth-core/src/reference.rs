//! Embed references in source text.
//!
//! An embed reference is `![[target]]` or `![[target|modifiers]]`. References
//! are never stored; callers iterate borrowed views over the text they hold.

use std::ops::Range;
use std::sync::LazyLock;

use regex_lite::Regex;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[\[([^\[\]|]*)(?:\|([^\[\]]*))?\]\]").expect("embed reference pattern is valid")
});

/// A borrowed embed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedRef<'a> {
    /// Full reference text, `![[` through `]]`.
    pub text: &'a str,
    /// Target name, trimmed.
    pub target: &'a str,
    /// Everything after the first pipe, untrimmed.
    pub modifiers: Option<&'a str>,
    /// Byte span of `text` within the searched haystack.
    pub span: Range<usize>,
}

/// Iterate the embed references in `text`, left to right.
pub fn references(text: &str) -> impl Iterator<Item = EmbedRef<'_>> {
    REFERENCE.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(EmbedRef {
            text: whole.as_str(),
            target: caps.get(1).map_or("", |m| m.as_str().trim()),
            modifiers: caps.get(2).map(|m| m.as_str()),
            span: whole.range(),
        })
    })
}

/// Pattern matching an embed reference whose target is exactly `identifier`.
///
/// The identifier is escaped, so names like `chart (v2).png` match literally.
/// Whitespace around the target inside the brackets is tolerated.
pub fn identifier_pattern(identifier: &str) -> Result<Regex, regex_lite::Error> {
    Regex::new(&format!(
        r"!\[\[\s*{}\s*(?:\|[^\[\]]*)?\]\]",
        regex_lite::escape(identifier.trim())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_reference() {
        let refs: Vec<_> = references("see ![[chart.png|wide]] here").collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].text, "![[chart.png|wide]]");
        assert_eq!(refs[0].target, "chart.png");
        assert_eq!(refs[0].modifiers, Some("wide"));
        assert_eq!(refs[0].span, 4..23);
    }

    #[test]
    fn test_multiple_on_one_line() {
        let refs: Vec<_> = references("![[a.png]] ![[b.png|full]]").collect();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].target, "a.png");
        assert_eq!(refs[0].modifiers, None);
        assert_eq!(refs[0].span, 0..10);
        assert_eq!(refs[1].target, "b.png");
        assert_eq!(refs[1].modifiers, Some("full"));
        assert_eq!(refs[1].span, 11..26);
    }

    #[test]
    fn test_plain_links_are_not_embeds() {
        assert_eq!(references("[[note|wide]] and [text](url)").count(), 0);
    }

    #[test]
    fn test_modifiers_keep_extra_pipes() {
        let refs: Vec<_> = references("![[img.png|300|wide]]").collect();
        assert_eq!(refs[0].modifiers, Some("300|wide"));
    }

    #[test]
    fn test_identifier_pattern_is_literal() {
        let pattern = identifier_pattern("chart (v2).png").unwrap();
        assert!(pattern.is_match("![[chart (v2).png|wide]]"));
        assert!(pattern.is_match("![[ chart (v2).png ]]"));
        assert!(!pattern.is_match("![[chart v2.png]]"));
        assert!(!pattern.is_match("![[chart (v2).png.bak]]"));
    }

    #[test]
    fn test_identifier_pattern_first_match() {
        let pattern = identifier_pattern("a.png").unwrap();
        let text = "![[b.png|wide]] ![[a.png|max]] ![[a.png]]";
        let found = pattern.find(text).map(|m| m.as_str());
        assert_eq!(found, Some("![[a.png|max]]"));
    }
}
