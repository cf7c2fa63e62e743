use crate::{Alignment, EngineConfig};

/// Wrap `code` in the positioning container for `alignment`, using the
/// default class prefix and gutter.
///
/// Not idempotent: every call adds another wrapper.
///
/// ```
/// use snippet_injector::{Alignment, align};
///
/// assert_eq!(align::wrap("<b>x</b>", Alignment::None), "<b>x</b>");
/// assert!(align::wrap("<b>x</b>", Alignment::Left).ends_with("<div style=\"clear:both;\"></div>"));
/// ```
#[must_use]
pub fn wrap(code: &str, alignment: Alignment) -> String {
    wrap_with(code, alignment, &EngineConfig::default())
}

/// [`wrap`] with explicit presentation settings.
#[must_use]
pub fn wrap_with(code: &str, alignment: Alignment, config: &EngineConfig) -> String {
    let prefix = &config.class_prefix;
    let gutter = &config.float_gutter;
    match alignment {
        Alignment::None => code.to_owned(),
        Alignment::Left => format!(
            "<div class=\"{prefix}-left\" style=\"float:left;margin:0 {gutter} {gutter} 0;\">{code}</div>{CLEAR}"
        ),
        Alignment::Right => format!(
            "<div class=\"{prefix}-right\" style=\"float:right;margin:0 0 {gutter} {gutter};\">{code}</div>{CLEAR}"
        ),
        Alignment::Center => format!(
            "<div class=\"{prefix}-center\" style=\"display:block;margin:0 auto;text-align:center;\">{code}</div>"
        ),
    }
}

const CLEAR: &str = "<div style=\"clear:both;\"></div>";
