use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

/// A comma-separated selector list. Matches if any member matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Compound selectors joined by combinators, left to right.
///
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub compounds: Vec<Compound>,
    pub combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: any ancestor.
    Descendant,
    /// `>`: the direct parent.
    Child,
}

/// Simple selectors that must all hold for one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrSelector {
    Exists(String),
    Equals(String, String),
}

impl Compound {
    /// Whether an element with this tag and these attributes satisfies the compound.
    #[must_use]
    pub fn matches(&self, tag: &str, attrs: &[(String, String)]) -> bool {
        let attr = |name: &str| attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());

        if let Some(want) = &self.tag {
            if !want.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(want) = &self.id {
            if attr("id") != Some(want.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let have = attr("class").unwrap_or("");
            if !self
                .classes
                .iter()
                .all(|c| have.split_ascii_whitespace().any(|h| h == c))
            {
                return false;
            }
        }
        self.attrs.iter().all(|sel| match sel {
            AttrSelector::Exists(name) => attr(name).is_some(),
            AttrSelector::Equals(name, value) => attr(name) == Some(value.as_str()),
        })
    }
}

#[derive(Clone)]
enum Simple {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Attr(AttrSelector),
}

// -- Identifiers ------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '-' || c == '_').parse_next(input)
}

fn quoted(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .map(str::to_owned)
    .parse_next(input)
}

// -- Simple selectors -------------------------------------------------------

fn attr_selector(input: &mut &str) -> ModalResult<AttrSelector> {
    '['.parse_next(input)?;
    multispace0.parse_next(input)?;
    let name = ident.parse_next(input)?.to_ascii_lowercase();
    multispace0.parse_next(input)?;
    let value = opt(preceded(
        ('=', multispace0),
        alt((quoted, ident.map(str::to_owned))),
    ))
    .parse_next(input)?;
    (multispace0, ']').parse_next(input)?;
    Ok(match value {
        Some(v) => AttrSelector::Equals(name, v),
        None => AttrSelector::Exists(name),
    })
}

fn simple(input: &mut &str) -> ModalResult<Simple> {
    alt((
        preceded('#', ident).map(|s: &str| Simple::Id(s.to_owned())),
        preceded('.', ident).map(|s: &str| Simple::Class(s.to_owned())),
        attr_selector.map(Simple::Attr),
        '*'.value(Simple::Universal),
        ident.map(|s: &str| Simple::Tag(s.to_ascii_lowercase())),
    ))
    .parse_next(input)
}

fn compound(input: &mut &str) -> ModalResult<Compound> {
    let parts: Vec<Simple> = repeat(1.., simple)
        .context(StrContext::Expected(StrContextValue::Description(
            "selector",
        )))
        .parse_next(input)?;
    let mut out = Compound::default();
    for part in parts {
        match part {
            Simple::Universal => {}
            Simple::Tag(t) => out.tag = Some(t),
            Simple::Id(id) => out.id = Some(id),
            Simple::Class(c) => out.classes.push(c),
            Simple::Attr(a) => out.attrs.push(a),
        }
    }
    Ok(out)
}

// -- Combinators ------------------------------------------------------------

fn combinator(input: &mut &str) -> ModalResult<Combinator> {
    alt((
        delimited(multispace0, '>', multispace0).value(Combinator::Child),
        multispace1.value(Combinator::Descendant),
    ))
    .parse_next(input)
}

fn complex(input: &mut &str) -> ModalResult<ComplexSelector> {
    let first = compound.parse_next(input)?;
    let rest: Vec<(Combinator, Compound)> = repeat(0.., (combinator, compound)).parse_next(input)?;
    let mut compounds = vec![first];
    let mut combinators = Vec::with_capacity(rest.len());
    for (comb, next) in rest {
        combinators.push(comb);
        compounds.push(next);
    }
    Ok(ComplexSelector {
        compounds,
        combinators,
    })
}

// -- Top-level parser -------------------------------------------------------

pub fn selector_list(input: &mut &str) -> ModalResult<SelectorList> {
    let list: Vec<ComplexSelector> =
        separated(1.., delimited(multispace0, complex, multispace0), ',').parse_next(input)?;
    Ok(SelectorList(list))
}

#[cfg(test)]
mod tests {
    use crate::parse::parse_selector;

    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn parse_id() {
        let list = parse_selector("#main").unwrap();
        assert_eq!(list.0.len(), 1);
        assert_eq!(list.0[0].compounds[0].id.as_deref(), Some("main"));
    }

    #[test]
    fn parse_compound_parts() {
        let list = parse_selector("DIV.card.wide[data-slot=top]").unwrap();
        let c = &list.0[0].compounds[0];
        assert_eq!(c.tag.as_deref(), Some("div"));
        assert_eq!(c.classes, vec!["card", "wide"]);
        assert_eq!(
            c.attrs,
            vec![AttrSelector::Equals("data-slot".into(), "top".into())]
        );
    }

    #[test]
    fn parse_combinators() {
        let list = parse_selector("main > article .body").unwrap();
        let sel = &list.0[0];
        assert_eq!(sel.compounds.len(), 3);
        assert_eq!(
            sel.combinators,
            vec![Combinator::Child, Combinator::Descendant]
        );
    }

    #[test]
    fn parse_child_without_spaces() {
        let list = parse_selector("ul>li").unwrap();
        assert_eq!(list.0[0].combinators, vec![Combinator::Child]);
    }

    #[test]
    fn parse_list_with_whitespace() {
        let list = parse_selector("  #a , .b  ").unwrap();
        assert_eq!(list.0.len(), 2);
    }

    #[test]
    fn parse_quoted_attribute() {
        let list = parse_selector("[data-x=\"a b\"]").unwrap();
        assert_eq!(
            list.0[0].compounds[0].attrs,
            vec![AttrSelector::Equals("data-x".into(), "a b".into())]
        );
    }

    #[test]
    fn reject_invalid() {
        assert!(parse_selector("").is_err());
        assert!(parse_selector("div >").is_err());
        assert!(parse_selector("#").is_err());
        assert!(parse_selector("a,,b").is_err());
        assert!(parse_selector("[unclosed").is_err());
    }

    #[test]
    fn compound_matching() {
        let list = parse_selector("div#hero.big[data-on]").unwrap();
        let c = &list.0[0].compounds[0];
        assert!(c.matches("div", &attrs(&[("id", "hero"), ("class", "x big"), ("data-on", "")])));
        assert!(!c.matches("span", &attrs(&[("id", "hero"), ("class", "big"), ("data-on", "")])));
        assert!(!c.matches("div", &attrs(&[("id", "hero"), ("class", "bigger"), ("data-on", "")])));
        assert!(!c.matches("div", &attrs(&[("id", "hero"), ("class", "big")])));
    }

    #[test]
    fn universal_matches_anything() {
        let list = parse_selector("*").unwrap();
        assert!(list.0[0].compounds[0].matches("section", &[]));
    }
}
