//! Text wrapping for message bodies.

use std::borrow::Cow;

/// Wrap plain text to `width` columns. Embedded newlines are kept as breaks.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }
    textwrap::wrap(text, width)
        .into_iter()
        .map(Cow::into_owned)
        .collect()
}

/// Wrap `text` to `width` columns with every line prefixed by `indent`.
///
/// Blank input still produces a single (indented) line.
pub fn wrap_indented(text: &str, width: usize, indent: &str) -> Vec<String> {
    if width <= indent.len() {
        return wrap_text(text, width);
    }
    let options = textwrap::Options::new(width)
        .initial_indent(indent)
        .subsequent_indent(indent);
    let lines: Vec<String> = textwrap::wrap(text, options)
        .into_iter()
        .map(Cow::into_owned)
        .collect();
    if lines.is_empty() {
        vec![indent.to_string()]
    } else {
        lines
    }
}
