use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_until, take_while};

/// A node of a parsed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<HtmlNode>,
    },
    Text(String),
    Comment(String),
}

impl HtmlNode {
    #[must_use]
    pub fn element(tag: &str, attrs: Vec<(String, String)>, children: Vec<HtmlNode>) -> Self {
        Self::Element {
            tag: tag.to_ascii_lowercase(),
            attrs,
            children,
        }
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }
}

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements that never have children or an end tag.
#[must_use]
pub fn is_void(tag: &str) -> bool {
    VOID.contains(&tag)
}

/// Elements whose content is raw text up to the matching end tag.
#[must_use]
pub fn is_raw_text(tag: &str) -> bool {
    tag == "script" || tag == "style"
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Start {
        tag: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End(String),
    Text(String),
    Comment(String),
    Declaration,
}

// -- Names & values ---------------------------------------------------------

fn tag_name(input: &mut &str) -> ModalResult<String> {
    (
        one_of(|c: char| c.is_ascii_alphabetic()),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '-' || c == ':'),
    )
        .take()
        .map(str::to_ascii_lowercase)
        .parse_next(input)
}

fn attr_name(input: &mut &str) -> ModalResult<String> {
    take_while(1.., |c: char| {
        !c.is_whitespace() && !matches!(c, '>' | '/' | '=' | '"' | '\'' | '<')
    })
    .map(str::to_ascii_lowercase)
    .parse_next(input)
}

fn attr_value<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
        take_while(1.., |c: char| !c.is_whitespace() && c != '>'),
    ))
    .parse_next(input)
}

fn attribute(input: &mut &str) -> ModalResult<(String, String)> {
    let name = attr_name.parse_next(input)?;
    let value = opt(preceded((multispace0, '=', multispace0), attr_value)).parse_next(input)?;
    Ok((name, value.map(decode_entities).unwrap_or_default()))
}

// -- Tokens -----------------------------------------------------------------

fn comment(input: &mut &str) -> ModalResult<Token> {
    delimited("<!--", take_until(0.., "-->"), "-->")
        .map(|body: &str| Token::Comment(body.to_owned()))
        .parse_next(input)
}

fn declaration(input: &mut &str) -> ModalResult<Token> {
    ("<!", take_till(0.., '>'), '>')
        .value(Token::Declaration)
        .parse_next(input)
}

fn end_tag(input: &mut &str) -> ModalResult<Token> {
    delimited("</", tag_name, (take_till(0.., '>'), '>'))
        .map(Token::End)
        .parse_next(input)
}

fn start_tag(input: &mut &str) -> ModalResult<Token> {
    '<'.parse_next(input)?;
    let tag = tag_name.parse_next(input)?;
    let attrs: Vec<(String, String)> =
        repeat(0.., preceded(multispace1, attribute)).parse_next(input)?;
    multispace0.parse_next(input)?;
    let self_closing = opt('/').parse_next(input)?.is_some();
    '>'.parse_next(input)?;
    Ok(Token::Start {
        tag,
        attrs,
        self_closing,
    })
}

fn text(input: &mut &str) -> ModalResult<Token> {
    take_till(1.., '<')
        .map(|raw: &str| Token::Text(decode_entities(raw)))
        .parse_next(input)
}

fn token(input: &mut &str) -> ModalResult<Token> {
    alt((
        comment,
        end_tag,
        declaration,
        start_tag,
        text,
        // A '<' that opens nothing is literal text.
        '<'.value(Token::Text("<".to_owned())),
    ))
    .parse_next(input)
}

fn tokenize(mut input: &str) -> Vec<Token> {
    let mut out = Vec::new();
    while !input.is_empty() {
        let Ok(tok) = token.parse_next(&mut input) else {
            out.push(Token::Text(input.to_owned()));
            break;
        };
        let raw = match &tok {
            Token::Start {
                tag,
                self_closing: false,
                ..
            } if is_raw_text(tag) => Some(format!("</{tag}")),
            _ => None,
        };
        out.push(tok);
        if let Some(close) = raw {
            // ASCII lowercasing keeps byte offsets intact.
            let end = input
                .to_ascii_lowercase()
                .find(&close)
                .unwrap_or(input.len());
            if end > 0 {
                out.push(Token::Text(input[..end].to_owned()));
            }
            input = &input[end..];
        }
    }
    out
}

// -- Tree building ----------------------------------------------------------

struct Open {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<HtmlNode>,
}

fn push_node(stack: &mut [Open], root: &mut Vec<HtmlNode>, node: HtmlNode) {
    let siblings = match stack.last_mut() {
        Some(open) => &mut open.children,
        None => root,
    };
    if let HtmlNode::Text(more) = &node {
        if let Some(HtmlNode::Text(prev)) = siblings.last_mut() {
            prev.push_str(more);
            return;
        }
    }
    siblings.push(node);
}

fn close_top(stack: &mut Vec<Open>, root: &mut Vec<HtmlNode>) {
    if let Some(open) = stack.pop() {
        let node = HtmlNode::Element {
            tag: open.tag,
            attrs: open.attrs,
            children: open.children,
        };
        push_node(stack, root, node);
    }
}

/// Parse an HTML fragment into a forest of nodes.
///
/// Parsing is lenient: stray `<` becomes text, unmatched end tags are
/// dropped and unclosed elements are closed at the end of input. `<p>`
/// and `<li>` close an open sibling of the same kind.
///
/// ```
/// use snippet_injector::parse::{HtmlNode, parse_html};
///
/// let nodes = parse_html("<b>hi</b><!-- note -->");
/// assert_eq!(nodes.len(), 2);
/// assert_eq!(nodes[0].tag(), Some("b"));
/// assert_eq!(nodes[1], HtmlNode::Comment(" note ".into()));
/// ```
#[must_use]
pub fn parse_html(input: &str) -> Vec<HtmlNode> {
    let mut root = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    for tok in tokenize(input) {
        match tok {
            Token::Start {
                tag,
                attrs,
                self_closing,
            } => {
                if (tag == "p" || tag == "li") && stack.last().is_some_and(|o| o.tag == tag) {
                    close_top(&mut stack, &mut root);
                }
                if self_closing || is_void(&tag) {
                    push_node(&mut stack, &mut root, HtmlNode::element(&tag, attrs, Vec::new()));
                } else {
                    stack.push(Open {
                        tag,
                        attrs,
                        children: Vec::new(),
                    });
                }
            }
            Token::End(tag) => {
                if let Some(depth) = stack.iter().rposition(|o| o.tag == tag) {
                    while stack.len() > depth {
                        close_top(&mut stack, &mut root);
                    }
                }
            }
            Token::Text(text) => push_node(&mut stack, &mut root, HtmlNode::Text(text)),
            Token::Comment(body) => push_node(&mut stack, &mut root, HtmlNode::Comment(body)),
            Token::Declaration => {}
        }
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut root);
    }
    root
}

// -- Entities ---------------------------------------------------------------

/// Decode the character references attribute values and text commonly carry.
/// Unknown references are kept verbatim.
#[must_use]
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';').filter(|&i| i <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let name = &rest[1..semi];
        let decoded = match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => numeric_reference(name),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn numeric_reference(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

#[must_use]
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[must_use]
pub fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
