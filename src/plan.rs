use std::fmt;

use crate::evaluate::explain;
use crate::transport::{self, TransportError};
use crate::{
    ContentPosition, EngineConfig, InjectionPayload, PageContext, Position, Rule, RuleId,
    RuleStore, align, splice, variant,
};

/// Host hook applied to every DOM-runtime payload before delivery.
///
/// Returning `None` drops the payload. A returned payload is validated
/// again, so a filter cannot smuggle out an empty selector or blank code.
pub trait PayloadFilter: Send + Sync {
    fn filter(&self, payload: InjectionPayload, rule: &Rule) -> Option<InjectionPayload>;
}

impl<F> PayloadFilter for F
where
    F: Fn(InjectionPayload, &Rule) -> Option<InjectionPayload> + Send + Sync,
{
    fn filter(&self, payload: InjectionPayload, rule: &Rule) -> Option<InjectionPayload> {
        self(payload, rule)
    }
}

/// One content-family rule, resolved and wrapped, ready to splice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSplice {
    pub rule_id: RuleId,
    pub code: String,
    pub position: ContentPosition,
    pub paragraph_number: u32,
}

impl ContentSplice {
    /// The pure `(content) -> content` transformer for this rule.
    #[must_use]
    pub fn apply(&self, content: &str) -> String {
        splice::splice(content, &self.code, self.position, self.paragraph_number)
    }
}

/// Everything a render needs: ordered content splices and client payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct RenderPlan {
    splices: Vec<ContentSplice>,
    payloads: Vec<InjectionPayload>,
}

impl RenderPlan {
    #[must_use]
    pub fn splices(&self) -> &[ContentSplice] {
        &self.splices
    }

    #[must_use]
    pub fn payloads(&self) -> &[InjectionPayload] {
        &self.payloads
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.splices.is_empty() && self.payloads.is_empty()
    }

    /// Run every splice over `content`, each receiving the previous output.
    #[must_use]
    pub fn apply_content(&self, content: &str) -> String {
        self.splices
            .iter()
            .fold(content.to_owned(), |acc, step| step.apply(&acc))
    }

    /// The global-array assignment for the client runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the payloads cannot be serialized.
    pub fn transport_script(&self, config: &EngineConfig) -> Result<String, TransportError> {
        transport::global_script(&self.payloads, config)
    }

    /// The page's transport markup: the global assignment, followed by the
    /// module script that consumes it when a runtime module is configured.
    /// Emit once per page.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the payloads cannot be serialized.
    pub fn page_html(&self, config: &EngineConfig) -> Result<String, TransportError> {
        let mut html = format!("<script>{}</script>", self.transport_script(config)?);
        if let Some(bootstrap) = transport::bootstrap_script(config) {
            html.push_str("<script type=\"module\">");
            html.push_str(&bootstrap);
            html.push_str("</script>");
        }
        Ok(html)
    }
}

impl fmt::Display for RenderPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RenderPlan({} splices, {} payloads)",
            self.splices.len(),
            self.payloads.len()
        )
    }
}

/// Routes matched rules to the content splicer or the client runtime.
///
/// ```
/// use snippet_injector::{PageContext, Planner, Rule, StandardPosition};
///
/// let rules = vec![
///     Rule::builder("banner")
///         .selector("#top")
///         .position(StandardPosition::Prepend)
///         .code("<b>Sale!</b>")
///         .build(),
/// ];
/// let plan = Planner::new().plan(&rules, &PageContext::new());
/// assert_eq!(plan.payloads().len(), 1);
/// assert_eq!(plan.payloads()[0].selector, "#top");
/// ```
#[derive(Default)]
pub struct Planner {
    config: EngineConfig,
    filter: Option<Box<dyn PayloadFilter>>,
}

impl fmt::Debug for Planner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Planner")
            .field("config", &self.config)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl Planner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl PayloadFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Plan a render from the rules a store lists.
    pub fn plan_from_store(&self, store: &impl RuleStore, ctx: &PageContext) -> RenderPlan {
        self.plan(&store.list_rules(), ctx)
    }

    /// Evaluate `rules` in order against `ctx`.
    ///
    /// Rules that do not match, or whose configuration is incomplete, are
    /// skipped without error.
    pub fn plan(&self, rules: &[Rule], ctx: &PageContext) -> RenderPlan {
        let mut plan = RenderPlan::default();
        for rule in rules {
            let outcome = explain(rule, ctx);
            if !outcome.is_match() {
                tracing::trace!(rule_id = %rule.id(), %outcome, "rule skipped");
                continue;
            }
            let Some(code) = variant::resolve_non_blank(rule) else {
                tracing::debug!(rule_id = %rule.id(), "rule matched but active variant is blank");
                continue;
            };
            let code = align::wrap_with(code, rule.alignment, &self.config);

            match rule.position {
                Position::Content(position) => {
                    if position.uses_paragraph() && rule.paragraph_number == 0 {
                        tracing::debug!(rule_id = %rule.id(), "paragraph number unset");
                        continue;
                    }
                    plan.splices.push(ContentSplice {
                        rule_id: rule.id(),
                        code,
                        position,
                        paragraph_number: rule.paragraph_number,
                    });
                }
                Position::Standard(position) => {
                    if let Some(payload) = self.payload_for(rule, position, code) {
                        plan.payloads.push(payload);
                    }
                }
            }
        }
        tracing::debug!(
            rules = rules.len(),
            splices = plan.splices.len(),
            payloads = plan.payloads.len(),
            "render planned"
        );
        plan
    }

    fn payload_for(
        &self,
        rule: &Rule,
        position: crate::StandardPosition,
        code: String,
    ) -> Option<InjectionPayload> {
        let payload = InjectionPayload::new(rule.selector.trim(), position, code);
        if !payload.is_deliverable() {
            tracing::debug!(
                rule_id = %rule.id(),
                reasons = ?rule.incomplete_reasons(),
                "rule matched but is not deliverable"
            );
            return None;
        }
        let payload = match &self.filter {
            Some(filter) => filter.filter(payload, rule)?,
            None => payload,
        };
        if payload.is_deliverable() {
            Some(payload)
        } else {
            tracing::debug!(rule_id = %rule.id(), "payload filter left nothing to deliver");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Alignment, InMemoryRuleStore, MatchMode, StandardPosition};

    fn dom_rule(name: &str, selector: &str, code: &str) -> Rule {
        Rule::builder(name)
            .selector(selector)
            .position(StandardPosition::Append)
            .code(code)
            .build()
    }

    fn content_rule(name: &str, position: ContentPosition, paragraph: u32, code: &str) -> Rule {
        Rule::builder(name)
            .position(position)
            .paragraph(paragraph)
            .code(code)
            .build()
    }

    #[test]
    fn routes_by_position_family() {
        let rules = vec![
            dom_rule("dom", "#a", "<b>x</b>"),
            content_rule("content", ContentPosition::AfterContent, 1, "<hr>"),
        ];
        let plan = Planner::new().plan(&rules, &PageContext::new());
        assert_eq!(plan.payloads().len(), 1);
        assert_eq!(plan.splices().len(), 1);
        assert_eq!(plan.to_string(), "RenderPlan(1 splices, 1 payloads)");
    }

    #[test]
    fn content_rules_compose_in_order() {
        let rules = vec![
            content_rule("first", ContentPosition::AfterParagraph, 1, "[1]"),
            content_rule("second", ContentPosition::AfterParagraph, 1, "[2]"),
            content_rule("top", ContentPosition::BeforeContent, 1, "[top]"),
        ];
        let plan = Planner::new().plan(&rules, &PageContext::new());
        assert_eq!(
            plan.apply_content("<p>A</p><p>B</p>"),
            "[top]<p>A</p>[2][1]<p>B</p>"
        );
    }

    #[test]
    fn blank_code_and_missing_selector_are_dropped() {
        let rules = vec![
            dom_rule("blank", "#a", "   "),
            dom_rule("no selector", "", "<b>x</b>"),
            content_rule("blank content", ContentPosition::AfterContent, 1, "\n"),
        ];
        let plan = Planner::new().plan(&rules, &PageContext::new());
        assert!(plan.is_empty());
    }

    #[test]
    fn unmatched_rules_are_skipped() {
        let rules = vec![
            Rule::builder("page")
                .page(3)
                .selector("#a")
                .code("x")
                .build(),
            Rule::builder("posts")
                .match_mode(MatchMode::SinglePosts)
                .selector("#a")
                .code("y")
                .build(),
        ];
        let plan = Planner::new().plan(&rules, &PageContext::page(3));
        assert_eq!(plan.payloads().len(), 1);
        assert_eq!(plan.payloads()[0].code, "x");
    }

    #[test]
    fn alignment_is_applied_once() {
        let rule = Rule::builder("r")
            .selector("#a")
            .alignment(Alignment::Center)
            .code("X")
            .build();
        let plan = Planner::new().plan(&[rule], &PageContext::new());
        assert_eq!(plan.payloads()[0].code, align::wrap("X", Alignment::Center));
    }

    #[test]
    fn selector_is_trimmed() {
        let plan = Planner::new().plan(&[dom_rule("r", "  #a ", "x")], &PageContext::new());
        assert_eq!(plan.payloads()[0].selector, "#a");
    }

    #[test]
    fn zero_paragraph_content_rule_is_dropped() {
        let rule = content_rule("p0", ContentPosition::BeforeParagraph, 0, "x");
        assert!(Planner::new().plan(&[rule], &PageContext::new()).is_empty());
    }

    #[test]
    fn filter_can_rewrite_and_drop() {
        let planner = Planner::new().with_filter(|mut payload: InjectionPayload, rule: &Rule| {
            if rule.name == "drop" {
                return None;
            }
            payload.code = format!("<!-- {} -->{}", rule.name, payload.code);
            Some(payload)
        });
        let rules = vec![dom_rule("keep", "#a", "x"), dom_rule("drop", "#b", "y")];
        let plan = planner.plan(&rules, &PageContext::new());
        assert_eq!(plan.payloads().len(), 1);
        assert_eq!(plan.payloads()[0].code, "<!-- keep -->x");
    }

    #[test]
    fn filter_output_is_revalidated() {
        let planner = Planner::new().with_filter(|mut payload: InjectionPayload, _: &Rule| {
            payload.selector.clear();
            Some(payload)
        });
        let plan = planner.plan(&[dom_rule("r", "#a", "x")], &PageContext::new());
        assert!(plan.payloads().is_empty());
    }

    #[test]
    fn plan_from_store_preserves_order() {
        let store: InMemoryRuleStore = [
            dom_rule("one", "#a", "1"),
            dom_rule("two", "#a", "2"),
        ]
        .into_iter()
        .collect();
        let plan = Planner::new().plan_from_store(&store, &PageContext::new());
        let codes: Vec<_> = plan.payloads().iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["1", "2"]);
        assert_eq!(plan.splices().len(), 0);
    }

    #[test]
    fn transport_script_uses_config_global() {
        let planner = Planner::new().with_config(EngineConfig {
            payload_global: "injected".into(),
            ..EngineConfig::default()
        });
        let plan = planner.plan(&[dom_rule("r", "#a", "x")], &PageContext::new());
        let script = plan.transport_script(planner.config()).unwrap();
        assert!(script.starts_with("window.injected = [{"));
    }

    #[test]
    fn page_html_loads_the_runtime_after_the_payloads() {
        let planner = Planner::new().with_config(EngineConfig {
            runtime_module: Some("/pkg/snippet_injector.js".into()),
            ..EngineConfig::default()
        });
        let plan = planner.plan(&[dom_rule("r", "#a", "x")], &PageContext::new());
        let html = plan.page_html(planner.config()).unwrap();
        let assign = html.find("window.sdiPayloads = [{").unwrap();
        let call = html.find("injectPayloads(\"sdiPayloads\")").unwrap();
        assert!(assign < call);
        assert!(html.contains("<script type=\"module\">import init"));
    }

    #[test]
    fn page_html_without_runtime_is_just_the_global() {
        let plan = Planner::new().plan(&[], &PageContext::new());
        let html = plan.page_html(&EngineConfig::default()).unwrap();
        assert_eq!(html, "<script>window.sdiPayloads = [];</script>");
    }
}
