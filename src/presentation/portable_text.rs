//! Portable-text to HTML.
//!
//! Only text blocks render. Consecutive list items with the same list kind
//! collapse into one `<ul>`/`<ol>`. All text is escaped. Link annotations
//! become anchors when the target is http(s), mailto or a site path.

use std::fmt::Write;

use url::Url;

use crate::domain::content::Block;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Number,
}

impl ListKind {
    fn from_block(block: &Block) -> Option<Self> {
        match block.list_item.as_deref()? {
            "number" => Some(ListKind::Number),
            _ => Some(ListKind::Bullet),
        }
    }

    fn tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "ul",
            ListKind::Number => "ol",
        }
    }
}

pub fn render_blocks(blocks: &[Block]) -> String {
    let mut html = String::new();
    let mut open_list: Option<ListKind> = None;

    for block in blocks.iter().filter(|block| block.is_text()) {
        let list = ListKind::from_block(block);
        if open_list != list {
            if let Some(kind) = open_list {
                let _ = write!(html, "</{}>", kind.tag());
            }
            if let Some(kind) = list {
                let _ = write!(html, "<{}>", kind.tag());
            }
            open_list = list;
        }

        let inline = render_spans(block);
        if list.is_some() {
            let _ = write!(html, "<li>{inline}</li>");
            continue;
        }

        let tag = match block.style.as_deref() {
            Some(style @ ("h2" | "h3" | "h4")) => style,
            Some("blockquote") => "blockquote",
            _ => "p",
        };
        let _ = write!(html, "<{tag}>{inline}</{tag}>");
    }

    if let Some(kind) = open_list {
        let _ = write!(html, "</{}>", kind.tag());
    }

    html
}

fn render_spans(block: &Block) -> String {
    let mut html = String::new();
    for span in &block.children {
        let mut text = escape_html(&span.text);
        for mark in span.marks.iter().rev() {
            text = match mark.as_str() {
                tag @ ("strong" | "em" | "code") => format!("<{tag}>{text}</{tag}>"),
                key => match link_target(block, key) {
                    Some(Target::Internal(href)) => {
                        format!("<a href=\"{}\">{text}</a>", escape_html(href))
                    }
                    Some(Target::External(href)) => format!(
                        "<a href=\"{}\" target=\"_blank\" rel=\"noopener\">{text}</a>",
                        escape_html(href)
                    ),
                    None => text,
                },
            };
        }
        html.push_str(&text);
    }
    html
}

enum Target<'a> {
    Internal(&'a str),
    External(&'a str),
}

fn link_target<'a>(block: &'a Block, key: &str) -> Option<Target<'a>> {
    let def = block.mark_def(key).filter(|def| def.kind == "link")?;
    let href = def.href.as_deref()?.trim();

    if (href.starts_with('/') && !href.starts_with("//")) || href.starts_with('#') {
        return Some(Target::Internal(href));
    }
    match Url::parse(href).ok()?.scheme() {
        "http" | "https" => Some(Target::External(href)),
        "mailto" => Some(Target::Internal(href)),
        _ => None,
    }
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blocks(value: serde_json::Value) -> Vec<Block> {
        serde_json::from_value(value).expect("blocks")
    }

    #[test]
    fn renders_styles_and_groups_lists() {
        let html = render_blocks(&blocks(json!([
            {"_type": "block", "style": "h2", "children": [{"text": "Ore types"}]},
            {"_type": "block", "listItem": "bullet", "children": [{"text": "Iron"}]},
            {"_type": "block", "listItem": "bullet", "children": [{"text": "Lyst", "marks": ["strong"]}]},
            {"_type": "image", "asset": {"_ref": "image-1"}},
            {"_type": "block", "style": "normal", "children": [{"text": "Done."}]}
        ])));

        assert_eq!(
            html,
            "<h2>Ore types</h2><ul><li>Iron</li><li><strong>Lyst</strong></li></ul><p>Done.</p>"
        );
    }

    #[test]
    fn link_annotations_render_as_anchors() {
        let html = render_blocks(&blocks(json!([{
            "_type": "block",
            "markDefs": [
                {"_key": "k1", "_type": "link", "href": "https://pool.example/status?a=1&b=2"},
                {"_key": "k2", "_type": "link", "href": "/guides/first-rig"},
                {"_key": "k3", "_type": "link", "href": "javascript:alert(1)"}
            ],
            "children": [
                {"text": "Pool status", "marks": ["k1", "strong"]},
                {"text": " and "},
                {"text": "your first rig", "marks": ["k2"]},
                {"text": " or ", "marks": []},
                {"text": "this", "marks": ["k3"]}
            ]
        }])));

        assert_eq!(
            html,
            "<p><a href=\"https://pool.example/status?a=1&amp;b=2\" target=\"_blank\" rel=\"noopener\">\
             <strong>Pool status</strong></a> and <a href=\"/guides/first-rig\">your first rig</a> or this</p>"
        );
    }

    #[test]
    fn unknown_mark_keys_leave_text_plain() {
        let html = render_blocks(&blocks(json!([
            {"_type": "block", "children": [{"text": "Orphan", "marks": ["missing"]}]}
        ])));
        assert_eq!(html, "<p>Orphan</p>");
    }

    #[test]
    fn escapes_author_text() {
        let html = render_blocks(&blocks(json!([
            {"_type": "block", "children": [{"text": "<script>alert('x')</script>"}]}
        ])));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
