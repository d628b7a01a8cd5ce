//! Markup renderers.
//!
//! Handlers write replies in Markdown. Backends whose service only accepts
//! plain text run outgoing bodies through a [`Renderer`] first.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Converts Markdown into whatever a backend can display.
pub trait Renderer: Send + Sync {
    /// Converts a Markdown document.
    fn convert(&self, markdown: &str) -> String;
}

/// Renders Markdown as plain text.
///
/// Formatting is dropped, block structure is kept: paragraphs are separated
/// by a blank line, list items keep a `- ` or `N. ` marker and link targets
/// are appended in parentheses when they differ from the link text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl TextRenderer {
    /// Creates a plain-text renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for TextRenderer {
    fn convert(&self, markdown: &str) -> String {
        let mut out = String::with_capacity(markdown.len());
        // One entry per open list: next ordinal for ordered lists.
        let mut lists: Vec<Option<u64>> = Vec::new();
        // Open links: destination and where their text starts in `out`.
        let mut links: Vec<(String, usize)> = Vec::new();

        for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
            match event {
                Event::Start(
                    Tag::Paragraph | Tag::Heading { .. } | Tag::CodeBlock(_) | Tag::HtmlBlock,
                ) => {
                    if lists.is_empty() {
                        block_break(&mut out);
                    }
                }
                Event::Start(Tag::List(start)) => {
                    if lists.is_empty() {
                        block_break(&mut out);
                    } else {
                        line_break(&mut out);
                    }
                    lists.push(start);
                }
                Event::End(TagEnd::List(_)) => {
                    lists.pop();
                }
                Event::Start(Tag::Item) => {
                    line_break(&mut out);
                    let indent = "  ".repeat(lists.len().saturating_sub(1));
                    out.push_str(&indent);
                    match lists.last_mut() {
                        Some(Some(ordinal)) => {
                            out.push_str(&format!("{ordinal}. "));
                            *ordinal += 1;
                        }
                        _ => out.push_str("- "),
                    }
                }
                Event::Start(Tag::Link { dest_url, .. }) => {
                    links.push((dest_url.to_string(), out.len()));
                }
                Event::End(TagEnd::Link) => {
                    if let Some((url, start)) = links.pop()
                        && !url.is_empty()
                        && out[start..] != *url
                    {
                        out.push_str(&format!(" ({url})"));
                    }
                }
                // Angle-bracket text such as `Vec<T>` parses as HTML; keep it as written.
                Event::Text(text)
                | Event::Code(text)
                | Event::Html(text)
                | Event::InlineHtml(text) => out.push_str(&text),
                Event::SoftBreak | Event::HardBreak => out.push('\n'),
                Event::Rule => {
                    block_break(&mut out);
                    out.push_str("---");
                }
                Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
                _ => {}
            }
        }

        out.trim_end().to_string()
    }
}

/// Starts a new block separated by a blank line.
fn block_break(out: &mut String) {
    if out.is_empty() {
        return;
    }
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out.push_str("\n\n");
}

/// Starts a new line unless already at the start of one.
fn line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        TextRenderer::new().convert(markdown)
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        assert_eq!(render("hello world"), "hello world");
    }

    #[test]
    fn test_emphasis_is_stripped() {
        assert_eq!(render("**hello** _world_ ~~gone~~"), "hello world gone");
    }

    #[test]
    fn test_heading_and_paragraphs() {
        assert_eq!(
            render("# Title\n\nfirst paragraph\n\nsecond"),
            "Title\n\nfirst paragraph\n\nsecond"
        );
    }

    #[test]
    fn test_lists_keep_markers() {
        assert_eq!(render("intro\n\n- one\n- two"), "intro\n\n- one\n- two");
        assert_eq!(render("1. a\n2. b\n3. c"), "1. a\n2. b\n3. c");
    }

    #[test]
    fn test_nested_list_is_indented() {
        assert_eq!(render("- outer\n  - inner"), "- outer\n  - inner");
    }

    #[test]
    fn test_links() {
        assert_eq!(
            render("see [docs](https://example.com/docs)"),
            "see docs (https://example.com/docs)"
        );
        assert_eq!(render("<https://example.com>"), "https://example.com");
    }

    #[test]
    fn test_code_is_verbatim() {
        assert_eq!(render("run `cargo *test*`"), "run cargo *test*");
        assert_eq!(
            render("```\nfn main() {}\n```"),
            "fn main() {}"
        );
    }

    #[test]
    fn test_inline_html_is_kept() {
        assert_eq!(render("use Vec<T> here"), "use Vec<T> here");
        assert_eq!(
            render("press <kbd>Enter</kbd> now"),
            "press <kbd>Enter</kbd> now"
        );
    }

    #[test]
    fn test_html_block_is_kept() {
        assert_eq!(render("<div>\nhello\n</div>"), "<div>\nhello\n</div>");
        assert_eq!(
            render("before\n\n<div>\nhello\n</div>"),
            "before\n\n<div>\nhello\n</div>"
        );
    }

    #[test]
    fn test_line_breaks_survive() {
        assert_eq!(render("line one\nline two"), "line one\nline two");
    }
}
