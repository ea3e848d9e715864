//! Hand-typed article bodies → HTML.
//!
//! Editors who paste text straight into the body field get one paragraph per
//! non-blank line. Lines are trimmed, blank lines dropped, and the rest joined
//! with blank lines so CommonMark sees separate paragraphs. Inline Markdown
//! (`*em*`, `**strong**`, `[links](…)`) comes along for free.

use pulldown_cmark::{html, Options, Parser};

/// Render typed text as HTML paragraphs. Returns an empty string when the
/// text has no non-blank lines.
pub fn format_body(text: &str) -> String {
    let markdown = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if markdown.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(markdown.len() + markdown.len() / 4);
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_SMART_PUNCTUATION;
    html::push_html(&mut out, Parser::new_ext(&markdown, options));
    out.trim_end().to_string()
}
