//! Flattens the document into styled terminal text for the panel preview.
//!
//! Block-level elements become line breaks, hidden elements are skipped,
//! and inline `color:` declarations map to RGB terminal colors so the
//! recolored spans show up the way the page would render them.

use crate::document::{Document, dom};
use markup5ever_rcdom::{Handle, NodeData};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};

/// Elements that force a line break around their content.
fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "main"
            | "aside"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "li"
            | "table"
            | "tr"
            | "blockquote"
            | "pre"
            | "br"
            | "hr"
    )
}

/// Elements whose content never reaches the preview.
fn is_hidden(name: &str) -> bool {
    matches!(
        name,
        "script" | "style" | "noscript" | "template" | "head" | "title"
    )
}

/// Render the document body as terminal lines.
pub fn render_document(document: &Document) -> Text<'static> {
    let mut renderer = Renderer::default();
    if let Some(body) = document.body() {
        renderer.walk(&body, None);
    }
    renderer.flush();
    if renderer.lines.is_empty() {
        renderer.lines.push(Line::from("(empty document)"));
    }
    Text::from(renderer.lines)
}

#[derive(Default)]
struct Renderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
}

impl Renderer {
    fn walk(&mut self, node: &Handle, inherited: Option<Style>) {
        match &node.data {
            NodeData::Text { contents } => {
                let collapsed = collapse_whitespace(&contents.borrow());
                if collapsed.is_empty() {
                    return;
                }
                // Padding only matters mid-line; never start a line with it.
                if collapsed.trim().is_empty() && self.spans.is_empty() {
                    return;
                }
                self.spans.push(match inherited {
                    Some(style) => Span::styled(collapsed, style),
                    None => Span::raw(collapsed),
                });
            }
            NodeData::Element { name, .. } => {
                let tag = &*name.local;
                if is_hidden(tag) {
                    return;
                }
                let style = element_style(node).or(inherited);
                let block = is_block(tag);
                if block {
                    self.flush();
                }
                let children = node.children.borrow().clone();
                for child in &children {
                    self.walk(child, style);
                }
                if block {
                    self.flush();
                }
            }
            _ => {
                let children = node.children.borrow().clone();
                for child in &children {
                    self.walk(child, inherited);
                }
            }
        }
    }

    /// Close the current line, dropping it when it holds no visible text.
    fn flush(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        if spans.iter().any(|s| !s.content.trim().is_empty()) {
            self.lines.push(Line::from(spans));
        }
    }
}

/// An element's inline `color:` declaration as a terminal style.
fn element_style(node: &Handle) -> Option<Style> {
    let style_attr = dom::get_attribute(node, "style")?;
    for declaration in style_attr.split(';') {
        let Some((name, value)) = declaration.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("color")
            && let Ok(color) = crate::settings::Color::parse(value.trim())
        {
            let (r, g, b) = color.to_rgb();
            return Some(Style::default().fg(Color::Rgb(r, g, b)));
        }
    }
    None
}

/// Whitespace runs become a single space; a run at either edge stays as one
/// space so adjacent inline nodes do not fuse.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_blocks_become_lines_and_hidden_is_skipped() {
        let document = Document::parse(
            "<h1>Title</h1><p>one</p><script>var x = 1;</script><p>two\n   three</p>",
        );
        let text = render_document(&document);
        let lines: Vec<String> = text.lines.iter().map(line_text).collect();
        assert_eq!(lines, vec!["Title", "one", "two three"]);
    }

    #[test]
    fn test_colored_spans_carry_rgb_styles() {
        let document = Document::parse(
            "<p><span style=\"color: #FF0000;\">a</span><span style=\"color: #0000FF;\">b</span></p>",
        );
        let text = render_document(&document);
        assert_eq!(text.lines.len(), 1);
        let line = &text.lines[0];
        assert_eq!(line_text(line), "ab");
        assert_eq!(line.spans[0].style.fg, Some(Color::Rgb(255, 0, 0)));
        assert_eq!(line.spans[1].style.fg, Some(Color::Rgb(0, 0, 255)));
    }

    #[test]
    fn test_inline_children_inherit_color() {
        let document =
            Document::parse("<p><span style=\"color: #00FF00;\">a<b>deep</b></span></p>");
        let text = render_document(&document);
        let line = &text.lines[0];
        assert_eq!(line_text(line), "adeep");
        for span in &line.spans {
            assert_eq!(span.style.fg, Some(Color::Rgb(0, 255, 0)));
        }
    }

    #[test]
    fn test_whitespace_only_lines_are_dropped() {
        let document = Document::parse("<p>   </p><p>keep</p><div>\n\t</div>");
        let text = render_document(&document);
        let lines: Vec<String> = text.lines.iter().map(line_text).collect();
        assert_eq!(lines, vec!["keep"]);
    }

    #[test]
    fn test_empty_document_placeholder() {
        let document = Document::parse("");
        let text = render_document(&document);
        assert_eq!(text.lines.len(), 1);
        assert_eq!(line_text(&text.lines[0]), "(empty document)");
    }
}
