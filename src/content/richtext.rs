//! Structured rich text
//!
//! Article bodies arrive from the content API as a sequence of typed blocks
//! (`paragraph`, `heading2`, `list-item`, ...). Each block carries its text and
//! a list of character-range spans (bold, italic, links). This module models
//! those blocks as a tagged enum and renders them either as plain text (for
//! word counting) or as HTML (for article pages).

use serde::{Deserialize, Serialize};

/// An ordered rich-text document
pub type RichText = Vec<RichTextNode>;

/// A single block of rich text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNode", into = "RawNode")]
pub enum RichTextNode {
    Paragraph(TextBlock),
    Heading(u8, TextBlock),
    Preformatted(TextBlock),
    ListItem(TextBlock),
    OrderedListItem(TextBlock),
    Image(ImageBlock),
    Embed(EmbedBlock),
    /// A block kind this renderer does not know about
    Unknown(String),
}

/// Text with inline spans
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub spans: Vec<Span>,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    pub fn with_span(mut self, start: usize, end: usize, kind: SpanKind) -> Self {
        self.spans.push(Span { start, end, kind });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbedBlock {
    pub embed_url: Option<String>,
    pub html: Option<String>,
}

/// An inline span over `[start, end)` character offsets of the block text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSpan", into = "RawSpan")]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink { url: String, target: Option<String> },
    Label(String),
    Other(String),
}

impl RichTextNode {
    /// Text content of the block, if it has any
    pub fn text(&self) -> Option<&str> {
        self.text_block().map(|b| b.text.as_str())
    }

    fn text_block(&self) -> Option<&TextBlock> {
        match self {
            RichTextNode::Paragraph(b)
            | RichTextNode::Heading(_, b)
            | RichTextNode::Preformatted(b)
            | RichTextNode::ListItem(b)
            | RichTextNode::OrderedListItem(b) => Some(b),
            RichTextNode::Image(_) | RichTextNode::Embed(_) | RichTextNode::Unknown(_) => None,
        }
    }
}

/// Render rich text as plain text, joining blocks with a single space
pub fn as_text(nodes: &[RichTextNode]) -> String {
    nodes
        .iter()
        .filter_map(RichTextNode::text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render rich text as HTML
///
/// Consecutive list items are grouped into a single `<ul>` / `<ol>`.
pub fn as_html(nodes: &[RichTextNode]) -> String {
    let mut out = String::new();
    let mut open_list: Option<&'static str> = None;

    for node in nodes {
        let list_tag = match node {
            RichTextNode::ListItem(_) => Some("ul"),
            RichTextNode::OrderedListItem(_) => Some("ol"),
            _ => None,
        };

        if open_list != list_tag {
            if let Some(tag) = open_list {
                out.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list_tag {
                out.push_str(&format!("<{}>", tag));
            }
            open_list = list_tag;
        }

        match node {
            RichTextNode::Paragraph(b) => wrap(&mut out, "p", b),
            RichTextNode::Heading(level, b) => {
                let tag = format!("h{}", (*level).clamp(1, 6));
                wrap(&mut out, &tag, b);
            }
            RichTextNode::Preformatted(b) => wrap(&mut out, "pre", b),
            RichTextNode::ListItem(b) | RichTextNode::OrderedListItem(b) => wrap(&mut out, "li", b),
            RichTextNode::Image(img) => {
                out.push_str(&format!(
                    r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                    escape(&img.url),
                    escape(img.alt.as_deref().unwrap_or(""))
                ));
            }
            RichTextNode::Embed(embed) => {
                out.push_str(&format!(
                    r#"<div data-oembed="{}">{}</div>"#,
                    escape(embed.embed_url.as_deref().unwrap_or("")),
                    embed.html.as_deref().unwrap_or("")
                ));
            }
            RichTextNode::Unknown(kind) => {
                tracing::debug!("Skipping unknown rich text block: {}", kind);
            }
        }
    }

    if let Some(tag) = open_list {
        out.push_str(&format!("</{}>", tag));
    }

    out
}

fn wrap(out: &mut String, tag: &str, block: &TextBlock) {
    out.push_str(&format!("<{}>", tag));
    out.push_str(&render_spans(&block.text, &block.spans));
    out.push_str(&format!("</{}>", tag));
}

/// Render text with spans applied
///
/// Spans are expected to nest; overlapping spans are closed and reopened
/// around the boundary so the output stays well-formed.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut sorted: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.end <= len && !matches!(s.kind, SpanKind::Other(_)))
        .collect();
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<&Span> = Vec::new();
    let mut next = 0;

    for pos in 0..=len {
        if stack.iter().any(|s| s.end == pos) {
            let mut reopen = Vec::new();
            while let Some(top) = stack.pop() {
                out.push_str(close_tag(&top.kind));
                if top.end != pos {
                    reopen.push(top);
                }
                if !stack.iter().any(|s| s.end == pos) {
                    break;
                }
            }
            for span in reopen.into_iter().rev() {
                out.push_str(&open_tag(&span.kind));
                stack.push(span);
            }
        }

        while next < sorted.len() && sorted[next].start == pos {
            out.push_str(&open_tag(&sorted[next].kind));
            stack.push(sorted[next]);
            next += 1;
        }

        if pos < len {
            match chars[pos] {
                '\n' => out.push_str("<br />"),
                c => push_escaped(&mut out, c),
            }
        }
    }

    out
}

fn open_tag(kind: &SpanKind) -> String {
    match kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink { url, target } => match target {
            Some(target) => format!(
                r#"<a href="{}" target="{}" rel="noopener">"#,
                escape(url),
                escape(target)
            ),
            None => format!(r#"<a href="{}">"#, escape(url)),
        },
        SpanKind::Label(label) => format!(r#"<span class="{}">"#, escape(label)),
        SpanKind::Other(_) => String::new(),
    }
}

fn close_tag(kind: &SpanKind) -> &'static str {
    match kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink { .. } => "</a>",
        SpanKind::Label(_) => "</span>",
        SpanKind::Other(_) => "",
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        c => out.push(c),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        push_escaped(&mut out, c);
    }
    out
}

// Wire representation. Blocks without a `type` but with text are treated as
// paragraphs.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    spans: Vec<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    oembed: Option<RawOembed>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawOembed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    html: Option<String>,
}

impl From<RawNode> for RichTextNode {
    fn from(raw: RawNode) -> Self {
        let block = || TextBlock {
            text: raw.text.clone().unwrap_or_default(),
            spans: raw.spans.clone(),
        };

        match raw.kind.as_deref() {
            Some("paragraph") => RichTextNode::Paragraph(block()),
            Some("preformatted") => RichTextNode::Preformatted(block()),
            Some("list-item") => RichTextNode::ListItem(block()),
            Some("o-list-item") => RichTextNode::OrderedListItem(block()),
            Some(kind) if kind.starts_with("heading") => match kind[7..].parse::<u8>() {
                Ok(level @ 1..=6) => RichTextNode::Heading(level, block()),
                _ => RichTextNode::Unknown(kind.to_string()),
            },
            Some("image") => RichTextNode::Image(ImageBlock {
                url: raw.url.clone().unwrap_or_default(),
                alt: raw.alt.clone(),
            }),
            Some("embed") => {
                let oembed = raw.oembed.clone().unwrap_or_default();
                RichTextNode::Embed(EmbedBlock {
                    embed_url: oembed.embed_url,
                    html: oembed.html,
                })
            }
            Some(kind) => RichTextNode::Unknown(kind.to_string()),
            None if raw.text.is_some() => RichTextNode::Paragraph(block()),
            None => RichTextNode::Unknown(String::new()),
        }
    }
}

impl From<RichTextNode> for RawNode {
    fn from(node: RichTextNode) -> Self {
        let text = |kind: String, b: TextBlock| RawNode {
            kind: Some(kind),
            text: Some(b.text),
            spans: b.spans,
            ..Default::default()
        };

        match node {
            RichTextNode::Paragraph(b) => text("paragraph".into(), b),
            RichTextNode::Heading(level, b) => text(format!("heading{}", level), b),
            RichTextNode::Preformatted(b) => text("preformatted".into(), b),
            RichTextNode::ListItem(b) => text("list-item".into(), b),
            RichTextNode::OrderedListItem(b) => text("o-list-item".into(), b),
            RichTextNode::Image(img) => RawNode {
                kind: Some("image".into()),
                url: Some(img.url),
                alt: img.alt,
                ..Default::default()
            },
            RichTextNode::Embed(embed) => RawNode {
                kind: Some("embed".into()),
                oembed: Some(RawOembed {
                    embed_url: embed.embed_url,
                    html: embed.html,
                }),
                ..Default::default()
            },
            RichTextNode::Unknown(kind) => RawNode {
                kind: (!kind.is_empty()).then_some(kind),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSpan {
    start: usize,
    end: usize,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl From<RawSpan> for Span {
    fn from(raw: RawSpan) -> Self {
        let data_str = |key: &str| {
            raw.data
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        let kind = match raw.kind.as_str() {
            "strong" => SpanKind::Strong,
            "em" => SpanKind::Em,
            "hyperlink" => SpanKind::Hyperlink {
                url: data_str("url").unwrap_or_default(),
                target: data_str("target"),
            },
            "label" => SpanKind::Label(data_str("label").unwrap_or_default()),
            other => SpanKind::Other(other.to_string()),
        };

        Span {
            start: raw.start,
            end: raw.end,
            kind,
        }
    }
}

impl From<Span> for RawSpan {
    fn from(span: Span) -> Self {
        let (kind, data) = match span.kind {
            SpanKind::Strong => ("strong".to_string(), None),
            SpanKind::Em => ("em".to_string(), None),
            SpanKind::Hyperlink { url, target } => {
                let mut data = serde_json::json!({ "link_type": "Web", "url": url });
                if let Some(target) = target {
                    data["target"] = serde_json::Value::String(target);
                }
                ("hyperlink".to_string(), Some(data))
            }
            SpanKind::Label(label) => (
                "label".to_string(),
                Some(serde_json::json!({ "label": label })),
            ),
            SpanKind::Other(kind) => (kind, None),
        };

        RawSpan {
            start: span.start,
            end: span.end,
            kind,
            data,
        }
    }
}
