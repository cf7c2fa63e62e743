use std::fmt;

use crate::{MatchMode, PageContext, Rule};

/// Why a rule did or did not apply to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched,
    Inactive,
    DeviceMismatch,
    /// The mode needs a page or category id and it is 0.
    TargetUnset,
    ScopeMismatch,
}

impl MatchOutcome {
    #[must_use]
    pub fn is_match(self) -> bool {
        self == MatchOutcome::Matched
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchOutcome::Matched => "matched",
            MatchOutcome::Inactive => "inactive",
            MatchOutcome::DeviceMismatch => "device mismatch",
            MatchOutcome::TargetUnset => "target id unset",
            MatchOutcome::ScopeMismatch => "out of scope",
        };
        f.write_str(s)
    }
}

/// Whether `rule` applies to the page described by `ctx`.
#[must_use]
pub fn matches(rule: &Rule, ctx: &PageContext) -> bool {
    explain(rule, ctx).is_match()
}

/// Evaluate a rule, short-circuiting in a fixed order: activity, device,
/// then content scope. A zero target id is "not configured", never a wildcard.
#[must_use]
pub fn explain(rule: &Rule, ctx: &PageContext) -> MatchOutcome {
    if !rule.active {
        return MatchOutcome::Inactive;
    }
    if !rule.device_target.allows(ctx.is_mobile) {
        return MatchOutcome::DeviceMismatch;
    }
    if (rule.match_mode.needs_page() && rule.page_id == 0)
        || (rule.match_mode.needs_category() && rule.category_id == 0)
    {
        return MatchOutcome::TargetUnset;
    }
    if scope_matches(rule, ctx) {
        MatchOutcome::Matched
    } else {
        MatchOutcome::ScopeMismatch
    }
}

fn scope_matches(rule: &Rule, ctx: &PageContext) -> bool {
    match rule.match_mode {
        MatchMode::SiteWide => true,
        MatchMode::SinglePosts => ctx.is_single_post,
        MatchMode::CategoryArchive => {
            ctx.is_category_archive && ctx.archive_category_id == rule.category_id
        }
        MatchMode::SinglePostsCategory => {
            ctx.is_single_post && ctx.post_has_category(rule.category_id)
        }
        MatchMode::Page => ctx.is_page && ctx.id == rule.page_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceTarget;

    fn rule(mode: MatchMode) -> crate::RuleBuilder {
        Rule::builder("r").match_mode(mode).code("<b>x</b>").selector("#a")
    }

    #[test]
    fn site_wide_matches_everything() {
        let r = rule(MatchMode::SiteWide).build();
        assert!(matches(&r, &PageContext::new()));
        assert!(matches(&r, &PageContext::single_post(1)));
        assert!(matches(&r, &PageContext::page(2)));
        assert!(matches(&r, &PageContext::category_archive(3)));
    }

    #[test]
    fn inactive_never_matches() {
        let r = rule(MatchMode::SiteWide).active(false).build();
        assert_eq!(explain(&r, &PageContext::new()), MatchOutcome::Inactive);
    }

    #[test]
    fn device_checks() {
        let desktop = rule(MatchMode::SiteWide).device(DeviceTarget::Desktop).build();
        let mobile = rule(MatchMode::SiteWide).device(DeviceTarget::Mobile).build();
        let phone = PageContext::new().mobile(true);
        let pc = PageContext::new();

        assert_eq!(explain(&desktop, &phone), MatchOutcome::DeviceMismatch);
        assert!(matches(&desktop, &pc));
        assert_eq!(explain(&mobile, &pc), MatchOutcome::DeviceMismatch);
        assert!(matches(&mobile, &phone));
    }

    #[test]
    fn inactive_checked_before_device() {
        let r = rule(MatchMode::SiteWide)
            .active(false)
            .device(DeviceTarget::Mobile)
            .build();
        assert_eq!(explain(&r, &PageContext::new()), MatchOutcome::Inactive);
    }

    #[test]
    fn single_posts() {
        let r = rule(MatchMode::SinglePosts).build();
        assert!(matches(&r, &PageContext::single_post(5)));
        assert_eq!(
            explain(&r, &PageContext::page(5)),
            MatchOutcome::ScopeMismatch
        );
    }

    #[test]
    fn category_archive_requires_same_category() {
        let r = rule(MatchMode::CategoryArchive).category_id(4).build();
        assert!(matches(&r, &PageContext::category_archive(4)));
        assert!(!matches(&r, &PageContext::category_archive(5)));
        assert!(!matches(&r, &PageContext::single_post(1).in_categories([4])));
    }

    #[test]
    fn single_posts_category() {
        let r = rule(MatchMode::SinglePostsCategory).category_id(4).build();
        assert!(matches(&r, &PageContext::single_post(1).in_categories([2, 4])));
        assert!(!matches(&r, &PageContext::single_post(1).in_categories([2])));
        assert!(!matches(&r, &PageContext::category_archive(4)));
    }

    #[test]
    fn page_mode() {
        let r = Rule::builder("r").page(9).code("x").selector("#a").build();
        assert!(matches(&r, &PageContext::page(9)));
        assert!(!matches(&r, &PageContext::page(8)));
        assert!(!matches(&r, &PageContext::single_post(9)));
    }

    #[test]
    fn zero_page_id_is_not_a_wildcard() {
        let r = Rule::builder("r").page(0).code("x").selector("#a").build();
        assert_eq!(explain(&r, &PageContext::page(0)), MatchOutcome::TargetUnset);
    }

    #[test]
    fn zero_category_is_not_a_wildcard() {
        let r = rule(MatchMode::SinglePostsCategory).category_id(0).build();
        let ctx = PageContext::single_post(1).in_categories([0]);
        assert_eq!(explain(&r, &ctx), MatchOutcome::TargetUnset);

        let archive = rule(MatchMode::CategoryArchive).build();
        assert_eq!(
            explain(&archive, &PageContext::category_archive(0)),
            MatchOutcome::TargetUnset
        );
    }

    #[test]
    fn outcome_display() {
        assert_eq!(MatchOutcome::TargetUnset.to_string(), "target id unset");
        assert_eq!(MatchOutcome::Matched.to_string(), "matched");
    }
}
