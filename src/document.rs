//! Google Docs body → minimal semantic HTML.
//!
//! The Docs API returns a document as a list of structural blocks. Only
//! paragraph blocks carry prose; each paragraph is a list of elements, and
//! only text-run elements carry text. A text run is a span of characters that
//! share one style.
//!
//! ```text
//! body.content[]            ─ block: paragraph | table | sectionBreak | …
//!   └─ paragraph.elements[] ─ element: textRun | inlineObjectElement | …
//!        └─ textRun { content, textStyle { bold, italic, link { url } } }
//! ```
//!
//! [`convert`] keeps paragraphs and text runs, drops everything else, and
//! emits one `<p>` per non-empty paragraph. Each run gets at most one tag.
//!
//! ## Run spacing
//!
//! Writers often split a sentence across runs, and the Docs export of those
//! runs loses the boundary whitespace once each run is trimmed. A single
//! space is therefore appended after a run's text unless
//!
//! * the raw run ends with `\n` (the run closes its paragraph),
//! * the text ends with an opening double quote (the next run continues the
//!   quotation), or
//! * no later non-empty run follows in the paragraph.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Quote characters after which no space is inserted.
const OPENING_QUOTES: [char; 2] = ['\u{201C}', '"'];

// ── Model ────────────────────────────────────────────────────────────────

/// A document as returned by `GET documents/{documentId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: DocumentBody,
}

impl Document {
    /// Render the document body as HTML.
    pub fn to_html(&self) -> String {
        convert(&self.body)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentBody {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

/// One block of the body. Blocks other than paragraphs deserialize with
/// `paragraph: None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuralElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<Paragraph>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub elements: Vec<ParagraphElement>,
}

/// One element of a paragraph. Inline images, footnote references and the
/// like deserialize with `text_run: None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub text_style: TextStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// Link target. Internal links (`headingId`, `bookmarkId`) have no `url`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// ── Construction helpers ─────────────────────────────────────────────────

impl DocumentBody {
    pub fn from_paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            content: paragraphs
                .into_iter()
                .map(|p| StructuralElement { paragraph: Some(p) })
                .collect(),
        }
    }
}

impl Paragraph {
    pub fn from_runs(runs: Vec<TextRun>) -> Self {
        Self {
            elements: runs
                .into_iter()
                .map(|r| ParagraphElement { text_run: Some(r) })
                .collect(),
        }
    }
}

impl TextRun {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            text_style: TextStyle::default(),
        }
    }

    pub fn bold(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            text_style: TextStyle {
                bold: Some(true),
                ..TextStyle::default()
            },
        }
    }

    pub fn italic(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            text_style: TextStyle {
                italic: Some(true),
                ..TextStyle::default()
            },
        }
    }

    pub fn link(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            text_style: TextStyle {
                link: Some(Link {
                    url: Some(url.into()),
                }),
                ..TextStyle::default()
            },
        }
    }
}

// ── Conversion ───────────────────────────────────────────────────────────

/// A run after trimming, before spacing is decided.
struct RenderedRun {
    open: String,
    close: &'static str,
    text: String,
    /// Raw content ended in `\n` or the text opens a quotation.
    no_space: bool,
}

/// Convert a document body to HTML: one `<p>` per non-empty paragraph,
/// newline-separated, with leading/trailing whitespace trimmed.
///
/// Run text and link targets are HTML-escaped, so `&`, `<` and `>` come out
/// as entities rather than as the raw characters typed in the document.
pub fn convert(body: &DocumentBody) -> String {
    let mut html = String::new();

    for block in &body.content {
        let Some(ref paragraph) = block.paragraph else {
            continue;
        };

        let paragraph_body = render_paragraph(paragraph);
        if paragraph_body.is_empty() {
            continue;
        }

        html.push_str("<p>");
        html.push_str(&paragraph_body);
        html.push_str("</p>\n");
    }

    html.trim().to_string()
}

/// Render the runs of one paragraph; empty when no run has visible text.
fn render_paragraph(paragraph: &Paragraph) -> String {
    let runs: Vec<RenderedRun> = paragraph
        .elements
        .iter()
        .filter_map(|el| el.text_run.as_ref())
        .filter_map(render_run)
        .collect();

    let mut out = String::new();
    let last = runs.len().saturating_sub(1);
    for (i, run) in runs.iter().enumerate() {
        out.push_str(&run.open);
        out.push_str(&run.text);
        if i < last && !run.no_space {
            out.push(' ');
        }
        out.push_str(run.close);
    }
    out
}

fn render_run(run: &TextRun) -> Option<RenderedRun> {
    let (open, close) = style_tags(&run.text_style);

    let ends_paragraph = run.content.ends_with('\n');
    let text = run.content.trim();
    if text.is_empty() {
        return None;
    }
    let opens_quote = text.ends_with(OPENING_QUOTES);

    Some(RenderedRun {
        open,
        close,
        text: escape_text(text),
        no_space: ends_paragraph || opens_quote,
    })
}

/// Pick the single tag pair for a run. Italic wins over bold; a link is only
/// used when the run is neither.
fn style_tags(style: &TextStyle) -> (String, &'static str) {
    if style.italic == Some(true) {
        return ("<em>".to_string(), "</em>");
    }
    if style.bold == Some(true) {
        return ("<strong>".to_string(), "</strong>");
    }
    match style.link.as_ref().and_then(|l| l.url.as_deref()) {
        Some(url) => (format!("<a href='{}'>", escape_attr(url)), "</a>"),
        None => (String::new(), ""),
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('\'', "&#39;")
}

// ── Document URLs ────────────────────────────────────────────────────────

static RE_DOC_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/d/([A-Za-z0-9_-]+)").unwrap());

/// Extract the document ID from a Docs share URL
/// (`https://docs.google.com/document/d/<id>/edit`).
pub fn document_id_from_url(url: &str) -> Option<&str> {
    RE_DOC_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
