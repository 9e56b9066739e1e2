//! Comprehensive tests for bem-runtime
//!
//! Blocks bound to parsed markup: scanning, live initialization,
//! delegation, element lookup, content mutation and teardown.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bem_core::{listener, BlockDecl, BlockHost, Flow, ListenerFn, ModPattern, ModVal};
use bem_dom::{ElementQuery, NodeId};
use bem_runtime::{dom_handler, BemDom, BlockQuery, Config, DomCtx, DomHandler, NodeSet, Target};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn load(body: &str) -> BemDom {
    init_tracing();
    let config = Config {
        auto_init_scope: false,
        ..Config::default()
    };
    BemDom::with_markup(&format!("<body>{body}</body>"), config).unwrap()
}

fn node(dom: &BemDom, selector: &str) -> NodeId {
    dom.tree().query_selector(dom.scope(), selector).unwrap().unwrap()
}

fn counting_handler() -> (Rc<Cell<u32>>, Rc<DomHandler>) {
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    let handler = dom_handler(move |_, _| {
        h.set(h.get() + 1);
        Flow::Continue
    });
    (hits, handler)
}

fn counting_listener() -> (Rc<Cell<u32>>, Rc<ListenerFn<BemDom>>) {
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    let l = listener(move |_, _, _| {
        h.set(h.get() + 1);
        Flow::Continue
    });
    (hits, l)
}

// ============================================================================
// SCANNING
// ============================================================================

#[test]
fn test_scan_constructs_declared_blocks() {
    let mut dom = load(
        r#"<div class="header i-bem" data-bem='{"header":{}}'></div>
           <div class="footer i-bem footer_theme_dark" data-bem='{"footer":{"year":2024}}'></div>"#,
    );
    dom.decl(BlockDecl::new("header")).unwrap();
    dom.decl(BlockDecl::new("footer")).unwrap();

    let report = dom.init_scope();
    assert_eq!(report.blocks.len(), 2);
    assert_eq!(report.deferred, 0);

    let footer = report.blocks[1];
    let mut ctx = dom.block(footer);
    assert_eq!(ctx.name(), "footer");
    assert!(ctx.is_inited());
    assert_eq!(ctx.get_mod("theme"), ModVal::from("dark"));
    assert_eq!(ctx.param("year"), Some(Value::from(2024)));
    assert!(ctx.uniq_id().is_some());
}

#[test]
fn test_shared_id_binds_one_instance() {
    let mut dom = load(
        r#"<div class="menu i-bem" data-bem='{"menu":{"id":"main"}}'>a</div>
           <p>between</p>
           <div class="menu i-bem" data-bem='{"menu":{"id":"main"}}'>b</div>
           <div class="menu i-bem" data-bem='{"menu":{}}'>c</div>"#,
    );
    dom.decl(BlockDecl::new("menu")).unwrap();

    let report = dom.init_scope();
    assert_eq!(report.blocks.len(), 2);
    assert_eq!(dom.instance_count(), 2);

    let shared = report.blocks[0];
    let nodes = dom.block_nodes(shared);
    assert_eq!(nodes.len(), 2);
    assert_eq!(dom.tree().text_content(nodes.nodes()[0]), "a");
    assert_eq!(dom.tree().text_content(nodes.nodes()[1]), "b");
    assert_eq!(dom.block_nodes(report.blocks[1]).len(), 1);
}

#[test]
fn test_with_markup_scans_by_default() {
    init_tracing();
    let dom = BemDom::with_markup(
        r#"<body><div class="x i-bem" data-bem='{"x":{}}'></div></body>"#,
        Config::default(),
    )
    .unwrap();
    // Undeclared types are declared live and wait for an event
    assert!(dom.is_declared("x"));
    assert_eq!(dom.instance_count(), 0);
}

#[test]
fn test_custom_params_attribute() {
    init_tracing();
    let config = Config::from_json(r#"{"params_attr": "data-block", "auto_init_scope": false}"#).unwrap();
    let mut dom = BemDom::with_markup(
        r#"<body><div class="card i-bem" data-block='{"card":{"size":"s"}}'></div></body>"#,
        config,
    )
    .unwrap();
    dom.decl(BlockDecl::new("card")).unwrap();

    let id = dom.init_scope().blocks[0];
    assert_eq!(dom.block(id).param("size"), Some(Value::from("s")));
}

#[test]
fn test_block_on_and_create() {
    let mut dom = load(r#"<div class="tooltip" data-bem='{"tooltip":{"delay":5}}'></div>"#);
    dom.decl(BlockDecl::new("tooltip").live(true)).unwrap();
    dom.decl(BlockDecl::new("popup")).unwrap();

    let tooltip = node(&dom, ".tooltip");
    let id = dom.block_on(tooltip, "tooltip").unwrap();
    assert!(dom.block(id).is_inited());
    assert!(dom.tree().has_class(tooltip, "i-bem"));
    assert_eq!(dom.block_on(tooltip, "tooltip").unwrap(), id);

    let popup = dom.create("popup", serde_json::json!({"modal": true})).unwrap();
    assert_eq!(dom.block(popup).param("modal"), Some(Value::Bool(true)));
    let popup_node = dom.block_nodes(popup).first().unwrap();
    let scope = dom.scope();
    dom.append(scope, popup_node).unwrap();
    assert_eq!(dom.blocks_on(popup_node), vec![popup]);
    assert_eq!(dom.instance_count(), 2);
}

// ============================================================================
// LIVE INITIALIZATION AND DELEGATION
// ============================================================================

#[test]
fn test_counter_increments_through_delegation() {
    let mut dom = load(
        r#"<div class="counter i-bem counter_count_0" data-bem='{"counter":{}}'>
             <button class="counter__btn">+</button>
           </div>"#,
    );
    dom.decl(BlockDecl::new("counter").live_with(|dom: &mut BemDom, name: &str| {
        dom.live_bind_to(
            name,
            "btn",
            "click",
            dom_handler(|ctx, _| {
                let n: u32 = ctx.get_mod("count").as_str().parse().unwrap_or(0);
                ctx.set_mod("count", n + 1);
                Flow::Continue
            }),
        );
        true
    }))
    .unwrap();
    let (changes, l) = counting_listener();
    dom.on_type_mod("counter", "count", ModPattern::Any, l).unwrap();

    let report = dom.init_scope();
    assert_eq!(report.deferred, 1);
    assert_eq!(dom.instance_count(), 0);

    let btn = node(&dom, ".counter__btn");
    for _ in 0..3 {
        dom.dispatch(btn, "click");
    }

    let ids = dom.instances_of("counter");
    assert_eq!(ids.len(), 1);
    assert_eq!(dom.block(ids[0]).get_mod("count"), ModVal::from("3"));
    assert_eq!(changes.get(), 3);
    let counter = node(&dom, ".counter");
    assert!(dom.tree().has_class(counter, "counter_count_3"));
    assert!(!dom.tree().has_class(counter, "counter_count_0"));
}

fn nested_list(stop_at_label: bool) -> (BemDom, Rc<RefCell<Vec<&'static str>>>) {
    let mut dom = load(
        r#"<div class="list i-bem" data-bem='{"list":{}}'>
             <div class="list__item"><span class="list__label">x</span></div>
           </div>"#,
    );
    let order = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&order);
    dom.decl(BlockDecl::new("list").live_with(move |dom: &mut BemDom, name: &str| {
        let item = Rc::clone(&seen);
        let label = Rc::clone(&seen);
        dom.live_bind_to(
            name,
            "item",
            "click",
            dom_handler(move |_, _| {
                item.borrow_mut().push("item");
                Flow::Continue
            }),
        );
        dom.live_bind_to(
            name,
            "label",
            "click",
            dom_handler(move |_, _| {
                label.borrow_mut().push("label");
                if stop_at_label { Flow::Stop } else { Flow::Continue }
            }),
        );
        true
    }))
    .unwrap();
    dom.init_scope();
    (dom, order)
}

#[test]
fn test_live_handlers_run_innermost_first() {
    let (mut dom, order) = nested_list(false);
    let label = node(&dom, ".list__label");

    let event = dom.dispatch(label, "click");
    assert_eq!(*order.borrow(), vec!["label", "item"]);
    assert!(!event.is_default_prevented());

    let ids = dom.instances_of("list");
    assert_eq!(ids.len(), 1);
    assert!(dom.block(ids[0]).is_inited());
}

#[test]
fn test_live_stop_halts_outer_matches() {
    let (mut dom, order) = nested_list(true);
    let label = node(&dom, ".list__label");

    let event = dom.dispatch(label, "click");
    assert_eq!(*order.borrow(), vec!["label"]);
    assert!(event.is_default_prevented());
    assert!(!event.is_propagation_stopped());
}

#[test]
fn test_live_init_on_event_runs_once() {
    let mut dom = load(r#"<div class="lazy i-bem" data-bem='{"lazy":{}}'><i>icon</i></div>"#);
    let (hits, handler) = counting_handler();
    dom.decl(BlockDecl::new("lazy").live_with(move |dom: &mut BemDom, name: &str| {
        dom.live_init_on_event(name, "", "focus", Some(Rc::clone(&handler)));
        true
    }))
    .unwrap();
    dom.init_scope();

    let icon = dom.tree().get_elements_by_tag_name(dom.scope(), "i")[0];
    dom.dispatch(icon, "focus");
    dom.dispatch(icon, "focus");

    assert_eq!(hits.get(), 1);
    assert_eq!(dom.instances_of("lazy").len(), 1);
}

#[test]
fn test_live_unbind_stops_delegation() {
    let mut dom = load(r#"<div class="nav i-bem" data-bem='{"nav":{}}'><a class="nav__link">x</a></div>"#);
    let (hits, handler) = counting_handler();
    let bound = Rc::clone(&handler);
    dom.decl(BlockDecl::new("nav").live_with(move |dom: &mut BemDom, name: &str| {
        dom.live_bind_to(name, "link", "click", Rc::clone(&bound));
        true
    }))
    .unwrap();
    dom.init_scope();
    let link = node(&dom, ".nav__link");

    dom.dispatch(link, "click");
    assert_eq!(hits.get(), 1);

    dom.live_unbind_from("nav", "link", "click", Some(&handler));
    assert!(!dom.has_live("click"));
    dom.dispatch(link, "click");
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_live_init_on_block_event() {
    let mut dom = load(r#"<form class="form validator i-bem" data-bem='{"form":{},"validator":{}}'></form>"#);
    dom.decl(BlockDecl::new("form")).unwrap();
    dom.decl(BlockDecl::new("validator").live(true)).unwrap();
    let (hits, l) = counting_listener();
    dom.live_init_on_block_event("validator", "submit", "form", Some(l)).unwrap();

    let report = dom.init_scope();
    assert_eq!(report.blocks.len(), 1);
    assert_eq!(report.deferred, 1);
    let form = report.blocks[0];

    dom.block(form).emit("submit", Value::Null);
    assert_eq!(hits.get(), 1);
    let validators = dom.instances_of("validator");
    assert_eq!(validators.len(), 1);
    assert!(dom.block(validators[0]).is_inited());
}

#[test]
fn test_live_init_on_block_inside_event() {
    let mut dom = load(
        r#"<div class="dialog i-bem" data-bem='{"dialog":{}}'>
             <div class="close i-bem" data-bem='{"close":{}}'></div>
           </div>"#,
    );
    dom.decl(BlockDecl::new("dialog").live(true)).unwrap();
    dom.decl(BlockDecl::new("close")).unwrap();
    let (hits, l) = counting_listener();
    dom.live_init_on_block_inside_event("dialog", "press", "close", Some(l))
        .unwrap();

    let report = dom.init_scope();
    let close = report.blocks[0];
    assert_eq!(dom.instances_of("dialog").len(), 0);

    dom.block(close).emit("press", Value::Null);
    assert_eq!(hits.get(), 1);
    assert_eq!(dom.instances_of("dialog").len(), 1);
}

// ============================================================================
// ELEMENTS
// ============================================================================

fn tabs() -> (BemDom, bem_core::BlockId) {
    let mut dom = load(
        r#"<div class="tabs i-bem" data-bem='{"tabs":{}}'>
             <div class="tabs__tab tabs__tab_active">a</div>
             <div class="tabs__tab">b</div>
             <div class="tabs__panel" data-bem='{"tabs__panel":{"index":0}}'>p</div>
           </div>"#,
    );
    dom.decl(BlockDecl::new("tabs")).unwrap();
    let id = dom.init_scope().blocks[0];
    (dom, id)
}

#[test]
fn test_elem_lookup_and_cache() {
    let (mut dom, id) = tabs();

    let tab = dom.elem(id, "tab");
    assert_eq!(tab.len(), 2);
    assert_eq!(tab.elem_name(), Some("tab"));
    assert_eq!(dom.find_elem(id, "tab panel").len(), 3);

    let block_node = dom.block_nodes(id).first().unwrap();
    let extra = dom.tree_mut().create_element_with_attrs("div", [("class", "tabs__tab")]);
    dom.tree_mut().append_child(block_node, extra).unwrap();

    assert_eq!(dom.elem(id, "tab").len(), 2);
    assert_eq!(dom.find_elem(id, "tab").len(), 3);
    dom.drop_elem_cache(id, None, None);
    assert_eq!(dom.block(id).elem("tab").len(), 3);
}

#[test]
fn test_elem_modifiers_in_classes() {
    let (mut dom, id) = tabs();
    let active = ModVal::Present;

    assert_eq!(dom.elem_with_mod(id, "tab", Some(("active", &active))).len(), 1);

    let tabs = dom.elem(id, "tab");
    let second = NodeSet::one(tabs.nodes()[1]).named("tab");
    let mut ctx = dom.block(id);
    assert!(ctx.elem_has_mod(&tabs, "active"));
    assert!(!ctx.elem_has_mod(&second, "active"));
    ctx.set_elem_mod(&second, "active", true);
    assert!(ctx.elem_has_mod(&second, "active"));

    assert_eq!(dom.elem_with_mod(id, "tab", Some(("active", &active))).len(), 2);
    assert!(dom.tree().has_class(tabs.nodes()[1], "tabs__tab_active"));
}

#[test]
fn test_elem_modifier_across_several_nodes() {
    let (mut dom, id) = tabs();
    let tabs = dom.elem(id, "tab");
    dom.block(id).set_elem_mod(&tabs, "size", "l");
    for node in &tabs {
        assert!(dom.tree().has_class(node, "tabs__tab_size_l"));
    }
    dom.block(id).del_elem_mod(&tabs, "size");
    for node in &tabs {
        assert!(!dom.tree().has_class(node, "tabs__tab_size_l"));
    }
}

#[test]
fn test_elem_params_and_closest() {
    let (mut dom, id) = tabs();
    let panel = dom.elem(id, "panel");
    let params = dom.elem_params(id, &panel);
    assert_eq!(params.get("index"), Some(&Value::from(0)));

    let panel_node = panel.first().unwrap();
    assert_eq!(dom.closest_elem(id, panel_node, "panel"), Some(panel_node));
    assert_eq!(dom.closest_elem(id, panel_node, "tab"), None);
    assert!(dom.contains_node(id, panel_node));
    assert!(!dom.contains_node(id, dom.scope()));
}

#[test]
fn test_strict_lookup_skips_nested_block() {
    let mut dom = load(
        r#"<div class="menu i-bem" data-bem='{"menu":{}}'>
             <div class="menu__item">1</div>
             <div class="menu i-bem" data-bem='{"menu":{}}'>
               <div class="menu__item">nested</div>
             </div>
           </div>"#,
    );
    dom.decl(BlockDecl::new("menu")).unwrap();
    let report = dom.init_scope();
    assert_eq!(report.blocks.len(), 2);
    let outer = report.blocks[0];

    let own = dom.block_nodes(outer);
    assert_eq!(dom.find_elem_in(outer, Some(&own), "item", None, false).len(), 2);
    let strict = dom.find_elem_in(outer, Some(&own), "item", None, true);
    assert_eq!(strict.len(), 1);
    assert_eq!(dom.tree().text_content(strict.first().unwrap()), "1");
}

// ============================================================================
// FINDING BLOCKS
// ============================================================================

#[test]
fn test_find_blocks_initializes_pending() {
    let mut dom = load(
        r#"<div class="page i-bem" data-bem='{"page":{}}'>
             <div class="popup i-bem" data-bem='{"popup":{}}'></div>
             <div class="popup popup_visible i-bem" data-bem='{"popup":{}}'></div>
           </div>"#,
    );
    dom.decl(BlockDecl::new("page")).unwrap();
    dom.decl(BlockDecl::new("popup").live(true)).unwrap();
    let report = dom.init_scope();
    assert_eq!(report.deferred, 2);
    let page = report.blocks[0];

    let popups = dom.find_blocks_inside(page, None, "popup");
    assert_eq!(popups.len(), 2);
    assert!(popups.iter().all(|&id| dom.block(id).is_inited()));
    assert_eq!(dom.find_blocks_inside(page, None, "popup"), popups);

    let visible = dom.find_block_inside(page, None, BlockQuery::new("popup").with_mod("visible", true));
    assert_eq!(visible, Some(popups[1]));

    assert_eq!(dom.find_block_outside(popups[0], None, "page"), Some(page));
    assert_eq!(dom.find_blocks_outside(popups[0], None, "page"), vec![page]);
    assert!(dom.find_blocks_on(page, None, "popup").is_empty());
}

#[test]
fn test_find_nested_blocks_of_same_type() {
    let mut dom = load(
        r#"<div class="menu i-bem" data-bem='{"menu":{}}'>
             <div class="menu i-bem" data-bem='{"menu":{}}'></div>
           </div>"#,
    );
    dom.decl(BlockDecl::new("menu")).unwrap();
    let report = dom.init_scope();
    let (outer, inner) = (report.blocks[0], report.blocks[1]);

    assert_eq!(dom.find_blocks_inside(outer, None, "menu"), vec![inner]);
    assert_eq!(dom.find_block_inside(outer, None, "menu"), Some(inner));
    assert!(dom.find_blocks_inside(inner, None, "menu").is_empty());

    assert_eq!(dom.find_blocks_outside(inner, None, "menu"), vec![outer]);
    assert!(dom.find_blocks_outside(outer, None, "menu").is_empty());
    assert_eq!(dom.find_block_outside(inner, None, "menu"), Some(inner));
    assert_eq!(dom.find_blocks_on(inner, None, "menu"), vec![inner]);
}

#[test]
fn test_find_blocks_on_shared_node() {
    let mut dom = load(r#"<div class="input focusable i-bem" data-bem='{"input":{},"focusable":{}}'></div>"#);
    dom.decl(BlockDecl::new("input")).unwrap();
    dom.decl(BlockDecl::new("focusable")).unwrap();
    let report = dom.init_scope();
    assert_eq!(report.blocks.len(), 2);

    let input = dom.instances_of("input")[0];
    let focusable = dom.instances_of("focusable")[0];
    assert_eq!(dom.block(input).find_block_on(None, "focusable"), Some(focusable));
}

// ============================================================================
// DIRECT BINDINGS
// ============================================================================

fn button() -> (BemDom, bem_core::BlockId) {
    let mut dom = load(r#"<div class="btn i-bem" data-bem='{"btn":{}}'><span class="btn__icon">i</span></div>"#);
    dom.decl(BlockDecl::new("btn")).unwrap();
    let id = dom.init_scope().blocks[0];
    (dom, id)
}

#[test]
fn test_bind_and_unbind_on_block_nodes() {
    let (mut dom, id) = button();
    let (hits, handler) = counting_handler();
    dom.block(id).bind_to("click", Rc::clone(&handler));
    let icon = node(&dom, ".btn__icon");

    dom.dispatch(icon, "click");
    assert_eq!(hits.get(), 1);

    dom.block(id).unbind_from("click", Some(&handler));
    dom.dispatch(icon, "click");
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_direct_stop_ends_bubbling() {
    let (mut dom, id) = button();
    let (outer, outer_handler) = counting_handler();
    dom.block(id)
        .bind_to_elem("icon", "click", dom_handler(|_, _| Flow::Stop))
        .bind_to("click", outer_handler);
    let icon = node(&dom, ".btn__icon");

    let event = dom.dispatch(icon, "click");
    assert!(event.is_default_prevented());
    assert!(event.is_propagation_stopped());
    assert_eq!(outer.get(), 0);
}

#[test]
fn test_document_binding_released_on_destruct() {
    let (mut dom, id) = button();
    let (hits, handler) = counting_handler();
    dom.block(id).bind_to_doc("keydown", handler);
    assert!(dom.block(id).ext().unwrap().needs_special_unbind());
    assert_eq!(dom.bound_count(Target::document(), "keydown"), 1);

    let icon = node(&dom, ".btn__icon");
    dom.dispatch(icon, "keydown");
    assert_eq!(hits.get(), 1);

    let btn = dom.block_nodes(id).first().unwrap();
    dom.destruct(btn, false);
    assert!(!dom.is_alive(id));
    assert_eq!(dom.bound_count(Target::document(), "keydown"), 0);
    assert!(!dom.tree().is_connected(btn));
}

#[test]
fn test_window_binding() {
    let (mut dom, id) = button();
    let (hits, handler) = counting_handler();
    dom.block(id).bind_to_win("resize", Rc::clone(&handler));
    let scope = dom.scope();
    dom.dispatch(scope, "resize");
    assert_eq!(hits.get(), 1);

    dom.block(id).unbind_from_win("resize", None);
    dom.dispatch(scope, "resize");
    assert_eq!(hits.get(), 1);
}

// ============================================================================
// CONTEXT SUBSCRIPTIONS
// ============================================================================

#[test]
fn test_ctx_events_filtered_by_container() {
    let mut dom = load(
        r#"<div id="area"><div class="item i-bem" data-bem='{"item":{}}'></div></div>
           <div class="item i-bem" data-bem='{"item":{}}'></div>"#,
    );
    dom.decl(BlockDecl::new("item")).unwrap();
    let items = dom.init_scope().blocks;
    assert_eq!(items.len(), 2);
    let area = dom.tree().get_element_by_id("area").unwrap();
    let (hits, l) = counting_listener();

    dom.on_ctx("item", &NodeSet::one(area), "ping", Rc::clone(&l));
    for &id in &items {
        dom.block(id).emit("ping", Value::Null);
    }
    assert_eq!(hits.get(), 1);

    dom.un_ctx("item", &NodeSet::one(area), "ping", Some(&l));
    dom.block(items[0]).emit("ping", Value::Null);
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_ctx_events_reach_detached_blocks() {
    let mut dom = load(r#"<div id="area"><div class="item i-bem" data-bem='{"item":{}}'></div></div>"#);
    dom.decl(BlockDecl::new("item")).unwrap();
    dom.init_scope();
    let (hits, l) = counting_listener();
    let scope = dom.scope();
    dom.on_ctx_mod("item", &NodeSet::one(scope), "js", ModPattern::Any, l);

    let area = dom.tree().get_element_by_id("area").unwrap();
    dom.destruct(area, false);
    assert_eq!(dom.instance_count(), 0);
    assert_eq!(hits.get(), 1);
}

// ============================================================================
// CONTENT MUTATION
// ============================================================================

fn holder() -> (BemDom, NodeId) {
    let mut dom = load(r#"<div id="root"><div class="old i-bem" data-bem='{"old":{}}'></div></div>"#);
    dom.decl(BlockDecl::new("old")).unwrap();
    dom.decl(BlockDecl::new("fresh")).unwrap();
    dom.init_scope();
    let root = dom.tree().get_element_by_id("root").unwrap();
    (dom, root)
}

#[test]
fn test_update_swaps_blocks() {
    let (mut dom, root) = holder();
    let old = dom.instances_of("old")[0];

    let inserted = dom
        .update(root, r#"<div class="fresh i-bem" data-bem='{"fresh":{}}'></div>"#)
        .unwrap();
    assert_eq!(inserted.len(), 1);
    assert!(!dom.is_alive(old));
    assert_eq!(dom.instances_of("fresh").len(), 1);
    assert_eq!(dom.tree().element_children(root), inserted);
}

#[test]
fn test_replace_and_insertions() {
    let (mut dom, root) = holder();
    let old_node = node(&dom, ".old");

    let replaced = dom.replace(old_node, "<p>a</p><p>b</p>").unwrap();
    assert_eq!(replaced.len(), 2);
    assert_eq!(dom.instance_count(), 0);
    assert_eq!(dom.tree().text_content(root), "ab");

    dom.append(root, "<p>c</p>").unwrap();
    dom.prepend(root, "<p>0</p>").unwrap();
    dom.before(replaced[1], "<p>1</p>").unwrap();
    dom.after(replaced[1], r#"<div class="fresh i-bem" data-bem='{"fresh":{}}'>2</div>"#)
        .unwrap();
    assert_eq!(dom.tree().text_content(root), "0a1b2c");
    assert_eq!(dom.instances_of("fresh").len(), 1);
}

#[test]
fn test_reinit_restores_modifiers_from_markup() {
    let (mut dom, root) = holder();
    let html = r#"<div class="toggle i-bem toggle_state_on toggle_size_l" data-bem='{"toggle":{}}'></div>"#;
    dom.decl(BlockDecl::new("toggle")).unwrap();

    dom.update(root, html).unwrap();
    let first = dom.instances_of("toggle")[0];
    let before = dom.block(first).get_mods(&[]);
    assert_eq!(before.get("state"), Some(&ModVal::from("on")));

    dom.destruct(root, true);
    assert!(dom.instances_of("toggle").is_empty());

    dom.update(root, html).unwrap();
    let second = dom.instances_of("toggle")[0];
    assert_ne!(first, second);
    assert_eq!(dom.block(second).get_mods(&[]), before);
}
