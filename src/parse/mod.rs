//! Parsers for the markup and selectors the client runtime handles.

mod error;
mod html;
mod selector;

pub use error::ParseError;
pub use html::{HtmlNode, decode_entities, escape_attr, escape_text, is_raw_text, is_void, parse_html};
pub use selector::{AttrSelector, Combinator, ComplexSelector, Compound, SelectorList};

/// Parse a CSS selector list such as `main > .post, #sidebar`.
///
/// Supports type, universal, id, class and attribute (`[a]`, `[a=v]`)
/// selectors with the descendant and child combinators.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not a supported selector.
pub fn parse_selector(input: &str) -> Result<SelectorList, ParseError> {
    use winnow::Parser;
    selector::selector_list
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}
