//! Server-side splicing of code into rendered post content.
//!
//! Content is opaque, already-rendered HTML of arbitrary structure, so the
//! splicer never builds a tree: it locates paragraphs and images with
//! patterns over the raw markup and inserts at byte offsets.

use std::sync::LazyLock;

use regex::Regex;

use crate::ContentPosition;

/// A `<p>` element (attributes allowed) up to the nearest `</p>`, across lines.
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>.*?</p\s*>").expect("valid paragraph regex"));

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").expect("valid image regex"));

#[derive(Clone, Copy)]
enum Side {
    Before,
    After,
}

/// Insert `code` into `content` at `position`.
///
/// `paragraph_number` is 1-based and only read by the paragraph positions.
/// Missing anchors (too few paragraphs, no image) leave `content` unchanged.
///
/// ```
/// use snippet_injector::{ContentPosition, splice::splice};
///
/// let out = splice("<p>A</p><p>B</p>", "<hr>", ContentPosition::AfterParagraph, 1);
/// assert_eq!(out, "<p>A</p><hr><p>B</p>");
/// ```
#[must_use]
pub fn splice(content: &str, code: &str, position: ContentPosition, paragraph_number: u32) -> String {
    match position {
        ContentPosition::BeforePost | ContentPosition::BeforeContent => {
            let mut out = String::with_capacity(code.len() + content.len());
            out.push_str(code);
            out.push_str(content);
            out
        }
        ContentPosition::AfterContent => {
            let mut out = String::with_capacity(code.len() + content.len());
            out.push_str(content);
            out.push_str(code);
            out
        }
        ContentPosition::BeforeParagraph => {
            at_paragraph(content, code, paragraph_number, Side::Before)
        }
        ContentPosition::AfterParagraph => {
            at_paragraph(content, code, paragraph_number, Side::After)
        }
        ContentPosition::BeforeImage => at_first_image(content, code, Side::Before),
        ContentPosition::AfterImage => at_first_image(content, code, Side::After),
    }
}

/// Number of paragraph elements the splicer can anchor to.
#[must_use]
pub fn paragraph_count(content: &str) -> usize {
    PARAGRAPH.find_iter(content).count()
}

fn at_paragraph(content: &str, code: &str, number: u32, side: Side) -> String {
    if number == 0 {
        return content.to_owned();
    }
    let Some(found) = PARAGRAPH.find_iter(content).nth(number as usize - 1) else {
        return content.to_owned();
    };
    let offset = match side {
        Side::Before => found.start(),
        Side::After => found.end(),
    };
    insert_at(content, offset, code)
}

fn at_first_image(content: &str, code: &str, side: Side) -> String {
    match IMAGE.find(content) {
        Some(found) => {
            let offset = match side {
                Side::Before => found.start(),
                Side::After => found.end(),
            };
            insert_at(content, offset, code)
        }
        None => content.to_owned(),
    }
}

fn insert_at(content: &str, offset: usize, code: &str) -> String {
    let mut out = String::with_capacity(content.len() + code.len());
    out.push_str(&content[..offset]);
    out.push_str(code);
    out.push_str(&content[offset..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn before_and_after_content() {
        assert_eq!(
            splice("<p>A</p>", "X", ContentPosition::BeforeContent, 1),
            "X<p>A</p>"
        );
        assert_eq!(
            splice("<p>A</p>", "X", ContentPosition::BeforePost, 1),
            "X<p>A</p>"
        );
        assert_eq!(
            splice("<p>A</p>", "X", ContentPosition::AfterContent, 1),
            "<p>A</p>X"
        );
    }

    #[test]
    fn after_first_paragraph() {
        assert_eq!(
            splice("<p>A</p><p>B</p>", "<hr>", ContentPosition::AfterParagraph, 1),
            "<p>A</p><hr><p>B</p>"
        );
    }

    #[test]
    fn before_second_paragraph() {
        assert_eq!(
            splice("<p>A</p>\n<p>B</p>", "<hr>", ContentPosition::BeforeParagraph, 2),
            "<p>A</p>\n<hr><p>B</p>"
        );
    }

    #[test]
    fn paragraph_overflow_is_noop() {
        let content = "<p>A</p><p>B</p>";
        assert_eq!(
            splice(content, "<hr>", ContentPosition::BeforeParagraph, 999),
            content
        );
        assert_eq!(
            splice(content, "<hr>", ContentPosition::AfterParagraph, 0),
            content
        );
    }

    #[test]
    fn paragraphs_are_case_insensitive_and_multiline() {
        let content = "<P class=\"lead\">one\ntwo</P><div>x</div><p>three</p>";
        assert_eq!(paragraph_count(content), 2);
        assert_eq!(
            splice(content, "[ad]", ContentPosition::AfterParagraph, 1),
            "<P class=\"lead\">one\ntwo</P>[ad]<div>x</div><p>three</p>"
        );
    }

    #[test]
    fn pre_and_param_are_not_paragraphs() {
        let content = "<pre>code</pre><param name=\"a\"><p>real</p>";
        assert_eq!(paragraph_count(content), 1);
        assert_eq!(
            splice(content, "X", ContentPosition::BeforeParagraph, 1),
            "<pre>code</pre><param name=\"a\">X<p>real</p>"
        );
    }

    #[test]
    fn paragraph_match_is_non_greedy() {
        let content = "<p>A</p>middle<p>B</p>";
        assert_eq!(
            splice(content, "X", ContentPosition::AfterParagraph, 1),
            "<p>A</p>Xmiddle<p>B</p>"
        );
    }

    #[test]
    fn image_positions() {
        let content = "<p>t</p><IMG src=\"a.png\" alt=\"a\"><img src=\"b.png\">";
        assert_eq!(
            splice(content, "X", ContentPosition::BeforeImage, 1),
            "<p>t</p>X<IMG src=\"a.png\" alt=\"a\"><img src=\"b.png\">"
        );
        assert_eq!(
            splice(content, "X", ContentPosition::AfterImage, 1),
            "<p>t</p><IMG src=\"a.png\" alt=\"a\">X<img src=\"b.png\">"
        );
    }

    #[test]
    fn no_image_is_noop() {
        let content = "<p>no pictures</p><imgur>not an image</imgur>";
        assert_eq!(splice(content, "X", ContentPosition::BeforeImage, 1), content);
        assert_eq!(splice(content, "X", ContentPosition::AfterImage, 1), content);
    }

    #[test]
    fn multibyte_content_offsets() {
        let content = "<p>héllo 🎉</p><p>wörld</p>";
        assert_eq!(
            splice(content, "✂", ContentPosition::AfterParagraph, 1),
            "<p>héllo 🎉</p>✂<p>wörld</p>"
        );
    }
}
