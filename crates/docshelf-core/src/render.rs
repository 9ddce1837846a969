//! Turning stored document bytes into something a browser can show.
//!
//! `.md` files go through `pulldown-cmark`; everything else is served as
//! plain text. The generated HTML is not sanitized.

use pulldown_cmark::{Options, Parser};

/// How a document is presented, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Markdown,
    Text,
}

impl DocumentKind {
    /// `.md` is markdown; any other name is plain text.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.ends_with(".md") {
            Self::Markdown
        } else {
            Self::Text
        }
    }
}

/// A rendered document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// HTML fragment to serve as `text/html`.
    Html(String),
    /// Raw text to serve as `text/plain`.
    Text(String),
}

/// Convert markdown to an HTML fragment.
#[must_use]
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut html = String::with_capacity(markdown.len().saturating_mul(3) / 2);
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

/// Render document `name` with the given contents.
///
/// Invalid UTF-8 is replaced rather than rejected.
#[must_use]
pub fn render(name: &str, content: &[u8]) -> Rendered {
    let text = String::from_utf8_lossy(content);
    match DocumentKind::from_name(name) {
        DocumentKind::Markdown => Rendered::Html(render_markdown(&text)),
        DocumentKind::Text => Rendered::Text(text.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_extension() {
        assert_eq!(DocumentKind::from_name("sample_markdown.md"), DocumentKind::Markdown);
        assert_eq!(DocumentKind::from_name("herstory.txt"), DocumentKind::Text);
        assert_eq!(DocumentKind::from_name("notes.markdown"), DocumentKind::Text);
    }

    #[test]
    fn markdown_becomes_html() {
        let html = render_markdown("# Title\n\nThis is a *sample* paragraph.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>sample</em>"));
    }

    #[test]
    fn tables_are_enabled() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"), "{html}");
    }

    #[test]
    fn text_is_passed_through_untouched() {
        let rendered = render("herstory.txt", b"# not a heading");
        assert_eq!(rendered, Rendered::Text("# not a heading".to_owned()));
    }

    #[test]
    fn markdown_file_renders_as_html() {
        let rendered = render("sample_markdown.md", b"This is a sample paragraph.");
        assert_eq!(
            rendered,
            Rendered::Html("<p>This is a sample paragraph.</p>\n".to_owned())
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let Rendered::Text(text) = render("bytes.txt", &[b'o', b'k', 0xff]) else {
            unreachable!("txt files render as text");
        };
        assert!(text.starts_with("ok"));
    }
}
