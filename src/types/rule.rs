use std::fmt;

use serde::{Deserialize, Serialize};

use super::mode::{Alignment, DeviceTarget, MatchMode};
use super::position::Position;

/// Opaque rule identifier. Assigned by a store, never reused after deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub u64);

impl RuleId {
    /// Id carried by a rule that has not been stored yet.
    pub const UNASSIGNED: RuleId = RuleId(0);
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One named code alternative attached to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub code: String,
}

impl Variant {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// One injection directive: match condition, code variants and placement.
///
/// Rules are read-only snapshots as far as matching and injection are
/// concerned. Construct them with [`Rule::builder()`]; the variant list is
/// never empty and the active index always points into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    id: RuleId,
    pub name: String,
    pub active: bool,
    pub match_mode: MatchMode,
    pub page_id: u64,
    pub category_id: u64,
    pub selector: String,
    pub position: Position,
    pub paragraph_number: u32,
    pub device_target: DeviceTarget,
    pub alignment: Alignment,
    variants: Vec<Variant>,
    active_variant: usize,
}

/// Reasons a rule can never fire, reported by [`Rule::incomplete_reasons()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incompleteness {
    /// Standard position without a CSS selector.
    MissingSelector,
    /// Active variant code is empty or whitespace.
    BlankCode,
    /// `page` mode with `page_id == 0`.
    PageUnset,
    /// Category mode with `category_id == 0`.
    CategoryUnset,
    /// Paragraph position with `paragraph_number == 0`.
    ParagraphUnset,
}

impl fmt::Display for Incompleteness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Incompleteness::MissingSelector => "css selector not set",
            Incompleteness::BlankCode => "active variant has no code",
            Incompleteness::PageUnset => "page id not set for page mode",
            Incompleteness::CategoryUnset => "category id not set for category mode",
            Incompleteness::ParagraphUnset => "paragraph number not set",
        };
        f.write_str(msg)
    }
}

impl Rule {
    #[must_use]
    pub fn builder(name: &str) -> RuleBuilder {
        RuleBuilder::new(name)
    }

    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: RuleId) {
        self.id = id;
    }

    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Index of the active variant, clamped to 0 when stale.
    #[must_use]
    pub fn active_variant_index(&self) -> usize {
        if self.active_variant < self.variants.len() {
            self.active_variant
        } else {
            0
        }
    }

    #[must_use]
    pub fn active_variant(&self) -> &Variant {
        &self.variants[self.active_variant_index()]
    }

    /// Select the active variant. Out-of-range indices select the first.
    pub fn set_active_variant(&mut self, index: usize) {
        self.active_variant = if index < self.variants.len() { index } else { 0 };
    }

    pub fn push_variant(&mut self, variant: Variant) {
        self.variants.push(variant);
    }

    /// Remove a variant. The last remaining variant is replaced by an empty
    /// one rather than leaving the list empty.
    pub fn remove_variant(&mut self, index: usize) -> Option<Variant> {
        if index >= self.variants.len() {
            return None;
        }
        let removed = self.variants.remove(index);
        if self.variants.is_empty() {
            self.variants.push(Variant::default());
        }
        if self.active_variant == index || self.active_variant >= self.variants.len() {
            self.active_variant = 0;
        } else if self.active_variant > index {
            self.active_variant -= 1;
        }
        Some(removed)
    }

    /// Everything that stops this rule from ever firing. Empty for a
    /// complete configuration.
    #[must_use]
    pub fn incomplete_reasons(&self) -> Vec<Incompleteness> {
        let mut reasons = Vec::new();
        match self.position {
            Position::Standard(_) => {
                if self.selector.trim().is_empty() {
                    reasons.push(Incompleteness::MissingSelector);
                }
            }
            Position::Content(p) => {
                if p.uses_paragraph() && self.paragraph_number == 0 {
                    reasons.push(Incompleteness::ParagraphUnset);
                }
            }
        }
        if self.active_variant().code.trim().is_empty() {
            reasons.push(Incompleteness::BlankCode);
        }
        if self.match_mode.needs_page() && self.page_id == 0 {
            reasons.push(Incompleteness::PageUnset);
        }
        if self.match_mode.needs_category() && self.category_id == 0 {
            reasons.push(Incompleteness::CategoryUnset);
        }
        reasons
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rule#{} '{}' ({}, {}, {} variants)",
            self.id,
            self.name,
            self.match_mode,
            self.position,
            self.variants.len(),
        )
    }
}

/// Builder for [`Rule`]. Defaults: active, site-wide, append, both devices,
/// no alignment, paragraph 1, a single empty variant.
#[derive(Debug, Clone)]
#[must_use]
pub struct RuleBuilder {
    rule: Rule,
}

impl RuleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            rule: Rule {
                id: RuleId::UNASSIGNED,
                name: name.to_owned(),
                active: true,
                match_mode: MatchMode::SiteWide,
                page_id: 0,
                category_id: 0,
                selector: String::new(),
                position: Position::default(),
                paragraph_number: 1,
                device_target: DeviceTarget::Both,
                alignment: Alignment::None,
                variants: Vec::new(),
                active_variant: 0,
            },
        }
    }

    pub fn id(mut self, id: RuleId) -> Self {
        self.rule.id = id;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.rule.active = active;
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.rule.match_mode = mode;
        self
    }

    pub fn page(mut self, page_id: u64) -> Self {
        self.rule.match_mode = MatchMode::Page;
        self.rule.page_id = page_id;
        self
    }

    pub fn page_id(mut self, page_id: u64) -> Self {
        self.rule.page_id = page_id;
        self
    }

    pub fn category_id(mut self, category_id: u64) -> Self {
        self.rule.category_id = category_id;
        self
    }

    pub fn selector(mut self, selector: &str) -> Self {
        self.rule.selector = selector.to_owned();
        self
    }

    pub fn position(mut self, position: impl Into<Position>) -> Self {
        self.rule.position = position.into();
        self
    }

    pub fn paragraph(mut self, number: u32) -> Self {
        self.rule.paragraph_number = number;
        self
    }

    pub fn device(mut self, target: DeviceTarget) -> Self {
        self.rule.device_target = target;
        self
    }

    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.rule.alignment = alignment;
        self
    }

    /// Shorthand for a single variant named "Default".
    pub fn code(self, code: &str) -> Self {
        self.variant("Default", code)
    }

    pub fn variant(mut self, name: &str, code: &str) -> Self {
        self.rule.variants.push(Variant::new(name, code));
        self
    }

    pub fn variants(mut self, variants: impl IntoIterator<Item = Variant>) -> Self {
        self.rule.variants.extend(variants);
        self
    }

    pub fn active_variant(mut self, index: usize) -> Self {
        self.rule.active_variant = index;
        self
    }

    /// Finish the rule, enforcing the variant invariants.
    #[must_use]
    pub fn build(mut self) -> Rule {
        if self.rule.variants.is_empty() {
            self.rule.variants.push(Variant::new("Default", ""));
        }
        if self.rule.active_variant >= self.rule.variants.len() {
            self.rule.active_variant = 0;
        }
        self.rule
    }
}
