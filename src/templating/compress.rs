//! Output compaction for rendered blocks.
//!
//! Each block's rendered output is passed through a [`Compressor`] before it
//! is interpolated into the caller. The default [`HtmlCompressor`] collapses
//! whitespace runs and strips comments while leaving the content of
//! whitespace-sensitive elements alone.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Post-processes rendered output.
pub trait Compressor: Send + Sync {
    fn compress(&self, text: &str) -> String;
}

/// Compressor that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCompressor;

impl Compressor for IdentityCompressor {
    fn compress(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Whitespace and comment compaction for HTML.
///
/// - every whitespace run becomes a single space
/// - `<!-- ... -->` comments are removed when `remove_comments` is set,
///   except conditional comments (`<!--[if ...]>`, `<!--<![endif]-->`)
/// - `<pre>`, `<textarea>`, `<script>` and `<style>` elements are copied as-is
/// - leading and trailing whitespace is trimmed
#[derive(Debug, Clone, Copy)]
pub struct HtmlCompressor {
    remove_comments: bool,
}

impl HtmlCompressor {
    pub fn new(remove_comments: bool) -> Self {
        Self {
            remove_comments,
        }
    }
}

impl Default for HtmlCompressor {
    fn default() -> Self {
        Self::new(true)
    }
}

fn preserved_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
        )
        .expect("preserved element pattern is valid")
    })
}

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--(.*?)-->").expect("comment pattern is valid"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

impl HtmlCompressor {
    fn compact_segment(&self, segment: &str, out: &mut String) {
        let without_comments = if self.remove_comments {
            comment_regex().replace_all(segment, |caps: &Captures<'_>| {
                let body = caps.get(1).map_or("", |m| m.as_str());
                if body.starts_with("[if") || body.starts_with("<![endif") {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
        } else {
            std::borrow::Cow::Borrowed(segment)
        };
        out.push_str(&whitespace_regex().replace_all(&without_comments, " "));
    }
}

impl Compressor for HtmlCompressor {
    fn compress(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for preserved in preserved_regex().find_iter(text) {
            self.compact_segment(&text[cursor..preserved.start()], &mut out);
            out.push_str(preserved.as_str());
            cursor = preserved.end();
        }
        self.compact_segment(&text[cursor..], &mut out);
        out.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        let html = "\n  <div class=\"better\">\n    <p>Content</p>\n  </div>\n";
        assert_eq!(
            HtmlCompressor::default().compress(html),
            "<div class=\"better\"> <p>Content</p> </div>"
        );
    }

    #[test]
    fn test_removes_comments_but_keeps_conditionals() {
        let html = "<p>a</p><!-- note --><!--[if IE]><p>ie</p><![endif]-->";
        assert_eq!(
            HtmlCompressor::default().compress(html),
            "<p>a</p><!--[if IE]><p>ie</p><![endif]-->"
        );
    }

    #[test]
    fn test_keeps_comments_when_disabled() {
        let html = "<!--  card.html  -->";
        assert_eq!(HtmlCompressor::new(false).compress(html), "<!-- card.html -->");
    }

    #[test]
    fn test_preserves_whitespace_sensitive_elements() {
        let html = "<div>\n  <pre>  keep\n    this  </pre>\n  <script>\n  var a  = 1;\n</script>\n</div>";
        assert_eq!(
            HtmlCompressor::default().compress(html),
            "<div> <pre>  keep\n    this  </pre> <script>\n  var a  = 1;\n</script> </div>"
        );
    }

    #[test]
    fn test_identity() {
        assert_eq!(IdentityCompressor.compress("  a  \n b "), "  a  \n b ");
    }
}
