use snippet_injector::{
    Alignment, ContentPosition, DeviceTarget, EngineConfig, InMemoryRuleStore, Incompleteness,
    MatchMode, MatchOutcome, PageContext, Planner, Rule, RuleId, RuleRecord, RuleStore,
    StandardPosition, explain, matches,
};

#[test]
fn category_archive_needs_the_same_category() {
    let rule = Rule::builder("news")
        .match_mode(MatchMode::CategoryArchive)
        .category_id(5)
        .selector("#a")
        .code("x")
        .build();
    assert!(matches(&rule, &PageContext::category_archive(5)));
    assert_eq!(
        explain(&rule, &PageContext::category_archive(6)),
        MatchOutcome::ScopeMismatch
    );
    // A post filed under the category is not the archive.
    assert!(!matches(
        &rule,
        &PageContext::single_post(1).in_categories([5])
    ));
}

#[test]
fn single_posts_in_category() {
    let rule = Rule::builder("r")
        .match_mode(MatchMode::SinglePostsCategory)
        .category_id(3)
        .selector("#a")
        .code("x")
        .build();
    assert!(matches(&rule, &PageContext::single_post(9).in_categories([1, 3])));
    assert!(!matches(&rule, &PageContext::single_post(9).in_categories([1])));
    assert!(!matches(&rule, &PageContext::category_archive(3)));
}

#[test]
fn device_check_precedes_scope() {
    let rule = Rule::builder("desktop page")
        .page(0)
        .device(DeviceTarget::Desktop)
        .build();
    assert_eq!(
        explain(&rule, &PageContext::page(1).mobile(true)),
        MatchOutcome::DeviceMismatch
    );
    assert_eq!(
        explain(&rule, &PageContext::page(1)),
        MatchOutcome::TargetUnset
    );
}

#[test]
fn stale_active_variant_falls_back_to_first() {
    let mut rule = Rule::builder("ab")
        .selector("#a")
        .variant("A", "<b>A</b>")
        .variant("B", "<b>B</b>")
        .active_variant(1)
        .build();
    assert_eq!(rule.active_variant().name, "B");
    rule.remove_variant(1);
    assert_eq!(rule.active_variant().name, "A");
    rule.set_active_variant(99);
    assert_eq!(rule.active_variant_index(), 0);
}

#[test]
fn last_variant_removal_leaves_blank_variant() {
    let mut rule = Rule::builder("r").selector("#a").code("x").build();
    rule.remove_variant(0);
    assert_eq!(rule.variants().len(), 1);
    assert!(rule.incomplete_reasons().contains(&Incompleteness::BlankCode));
    assert!(
        Planner::new()
            .plan(&[rule], &PageContext::new())
            .is_empty()
    );
}

#[test]
fn incomplete_reasons_cover_every_gap() {
    let rule = Rule::builder("broken")
        .match_mode(MatchMode::SinglePostsCategory)
        .position(StandardPosition::Before)
        .build();
    assert_eq!(
        rule.incomplete_reasons(),
        vec![
            Incompleteness::MissingSelector,
            Incompleteness::BlankCode,
            Incompleteness::CategoryUnset,
        ]
    );

    let content = Rule::builder("para")
        .page(0)
        .position(ContentPosition::BeforeParagraph)
        .paragraph(0)
        .code("x")
        .build();
    assert_eq!(
        content.incomplete_reasons(),
        vec![Incompleteness::ParagraphUnset, Incompleteness::PageUnset]
    );
}

#[test]
fn content_rules_ignore_selector() {
    let rule = Rule::builder("after")
        .position(ContentPosition::AfterContent)
        .code("<hr>")
        .build();
    assert!(rule.incomplete_reasons().is_empty());
    let plan = Planner::new().plan(&[rule], &PageContext::new());
    assert_eq!(plan.apply_content("<p>x</p>"), "<p>x</p><hr>");
}

#[test]
fn aligned_content_splice() {
    let rule = Rule::builder("centered")
        .position(ContentPosition::BeforeImage)
        .alignment(Alignment::Center)
        .code("AD")
        .build();
    let plan = Planner::new()
        .with_config(EngineConfig {
            class_prefix: "promo".into(),
            ..EngineConfig::default()
        })
        .plan(&[rule], &PageContext::new());
    assert_eq!(
        plan.apply_content("<p>t</p><img src=\"a.png\">"),
        "<p>t</p><div class=\"promo-center\" style=\"display:block;margin:0 auto;text-align:center;\">AD</div><img src=\"a.png\">"
    );
    assert_eq!(plan.apply_content("<p>no image</p>"), "<p>no image</p>");
}

#[test]
fn record_import_rejects_unknown_values() {
    let record = RuleRecord::from_pairs([
        ("name", "bad"),
        ("match_mode", "page_category"),
        ("page_id", "2"),
    ])
    .unwrap();
    let err = Rule::from_record(&record).unwrap_err();
    assert_eq!(err.to_string(), "unknown match mode 'page_category'");
    assert!(RuleRecord::from_pairs([("page_id", "two")]).is_err());
}

#[test]
fn record_round_trip_keeps_active_variant_only() {
    let rule = Rule::builder("ab")
        .page(12)
        .selector(".post")
        .position(StandardPosition::After)
        .device(DeviceTarget::Mobile)
        .alignment(Alignment::Right)
        .variant("A", "a")
        .variant("B", "b")
        .active_variant(1)
        .build();
    let record = rule.to_record();
    assert_eq!(record.variant_name, "B");
    let back = Rule::from_record(&record).unwrap();
    assert_eq!(back.variants().len(), 1);
    assert_eq!(back.active_variant().code, "b");
    assert_eq!(back.to_record(), record);
}

#[test]
fn store_lifecycle() {
    let mut store = InMemoryRuleStore::new();
    let a = store.insert(Rule::builder("a").selector("#a").code("1").build());
    let b = store.insert(Rule::builder("b").selector("#b").code("2").build());
    let copy = store.duplicate(a).unwrap();
    store.remove(b);
    let names: Vec<_> = store.list_rules().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["a", "a (copy)"]);
    assert_eq!(copy, RuleId(3));
    assert_eq!(
        store.insert(Rule::builder("c").build()),
        RuleId(4),
        "ids keep increasing after removal"
    );
}

#[test]
fn rule_display() {
    let rule = Rule::builder("Banner")
        .id(RuleId(4))
        .position(ContentPosition::AfterContent)
        .variant("A", "a")
        .variant("B", "b")
        .build();
    assert_eq!(
        rule.to_string(),
        "Rule#4 'Banner' (site_wide, after_content, 2 variants)"
    );
}
