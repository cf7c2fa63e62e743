use crate::Rule;

/// The active variant's code. Stale indices fall back to the first variant.
#[must_use]
pub fn resolve(rule: &Rule) -> &str {
    let variants = rule.variants();
    let index = rule.active_variant_index();
    variants.get(index).map_or("", |v| v.code.as_str())
}

/// Like [`resolve`], but whitespace-only code counts as no code at all.
#[must_use]
pub fn resolve_non_blank(rule: &Rule) -> Option<&str> {
    let code = resolve(rule);
    if code.trim().is_empty() {
        None
    } else {
        Some(code)
    }
}
