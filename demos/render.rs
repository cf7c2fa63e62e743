use snippet_injector::runtime::{Injector, MemoryDom};
use snippet_injector::{
    Alignment, ContentPosition, EngineConfig, InMemoryRuleStore, MatchMode, PageContext, Planner,
    Rule, StandardPosition,
};

fn main() {
    let mut store = InMemoryRuleStore::new();
    store.insert(
        Rule::builder("Header banner")
            .selector("#masthead")
            .position(StandardPosition::Prepend)
            .alignment(Alignment::Center)
            .variant("Spring", "<b>Spring sale!</b>")
            .variant("Summer", "<b>Summer sale!</b>")
            .active_variant(1)
            .build(),
    );
    store.insert(
        Rule::builder("In-article ad")
            .match_mode(MatchMode::SinglePosts)
            .position(ContentPosition::AfterParagraph)
            .paragraph(1)
            .alignment(Alignment::Right)
            .code("<aside>Ad</aside>")
            .build(),
    );

    for rule in store.iter() {
        println!("{rule}");
    }

    let ctx = PageContext::single_post(12).in_categories([3]);
    let planner = Planner::new();
    let plan = planner.plan_from_store(&store, &ctx);
    println!("{plan}");

    // Server side: splice into the post body and emit the transport script.
    let content = plan.apply_content("<p>First paragraph.</p><p>Second paragraph.</p>");
    println!("content: {content}");
    let script = plan
        .transport_script(planner.config())
        .expect("payloads serialize");
    println!("script: {script}");

    // With a wasm build of the `web` feature, the page also loads the runtime.
    let config = EngineConfig {
        runtime_module: Some("/pkg/snippet_injector.js".to_owned()),
        ..planner.config().clone()
    };
    println!("page scripts: {}", plan.page_html(&config).expect("payloads serialize"));

    // Client side: run the payloads against an in-memory page.
    let json = snippet_injector::transport::to_json(plan.payloads()).expect("payloads serialize");
    let dom = MemoryDom::new("<header id=\"masthead\"><h1>Blog</h1></header>");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime");
    let report = runtime
        .block_on(Injector::new(&dom).run_json(&json))
        .expect("valid payload json");
    println!("{report}");
    println!("page: {}", dom.body_html());
}
