//! Margin removal for block content.
//!
//! Inner content of a template block is usually indented to match the
//! surrounding markup. Markdown treats four or more leading spaces as a code
//! block, so the margin has to go before conversion.
//!
//! The rule is deliberately simple: the margin is the whitespace run at the
//! start of the first non-blank line, and that run (or as much of it as a
//! line shares) is removed from every line. It is not a common-prefix dedent;
//! lines indented deeper than the first keep their extra indentation and
//! lines indented less lose only what they share with the margin.

/// Remove leading blank lines and the first line's margin from `text`.
///
/// Applying the function twice yields the same result as applying it once:
/// after the first pass the first line starts with a non-whitespace
/// character, so the second pass finds no margin and no blank lead.
///
/// # Examples
///
/// ```
/// use nestplate::markdown::indent::normalize;
///
/// let text = "\n    # Heading\n\n    Content\n";
/// assert_eq!(normalize(text), "# Heading\n\nContent\n");
/// ```
pub fn normalize(text: &str) -> String {
    let text = strip_blank_lead(text);

    let margin_len = text.bytes().take_while(|b| *b == b' ' || *b == b'\t').count();
    if margin_len == 0 {
        return text.to_string();
    }
    let margin = &text[..margin_len];

    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let shared = line.bytes().zip(margin.bytes()).take_while(|(a, b)| a == b).count();
        out.push_str(&line[shared..]);
    }
    out
}

/// Drop the run of whitespace-only lines at the start of `text`.
///
/// Only complete lines (terminated by `\n`) are dropped; a trailing
/// whitespace-only fragment without a newline is left for the margin pass.
fn strip_blank_lead(text: &str) -> &str {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.ends_with('\n') && line.trim().is_empty() {
            offset += line.len();
        } else {
            break;
        }
    }
    &text[offset..]
}
