//! Entity binding tests
use crate::*;
use minibind_evaluator::Value;

fn runtime(children: Vec<Fragment>) -> Runtime {
    Runtime::new(Document::from_fragments(&children), RuntimeConfig::default())
}

fn find(rt: &Runtime, selector: &str) -> NodeId {
    let doc = rt.document();
    doc.query_selector(doc.root(), selector).unwrap()
}

fn text(rt: &Runtime, selector: &str) -> String {
    rt.document().text_content(find(rt, selector))
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

#[test]
fn test_text_follows_variable() {
    let mut rt = runtime(vec![Fragment::element("span")
        .attr("id", "out")
        .attr(":text", "count * 2")]);
    rt.set_variable("count", num(1.0));

    assert!(rt.start().is_ok());
    assert_eq!(text(&rt, "#out"), "2");

    assert!(rt.set_variable("count", num(5.0)).is_ok());
    assert_eq!(text(&rt, "#out"), "10");
}

#[test]
fn test_undefined_result_leaves_content() {
    let mut rt = runtime(vec![Fragment::element("span")
        .attr("id", "out")
        .attr(":text", "missing")
        .child(Fragment::text("placeholder"))]);

    assert!(rt.start().is_ok());
    assert_eq!(text(&rt, "#out"), "placeholder");

    rt.set_variable("missing", Value::from(""));
    assert_eq!(text(&rt, "#out"), "");
}

#[test]
fn test_each_regenerates_children() {
    let mut rt = runtime(vec![Fragment::element("ul")
        .attr("id", "list")
        .attr(":each", "n in items")
        .child(Fragment::element("li").attr(":text", "n"))]);
    rt.set_variable("items", Value::Array(vec![num(1.0), num(2.0), num(3.0)]));

    assert!(rt.start().is_ok());
    let list = find(&rt, "#list");
    let texts: Vec<String> = rt
        .document()
        .element_children(list)
        .into_iter()
        .map(|li| rt.document().text_content(li))
        .collect();
    assert_eq!(texts, vec!["1", "2", "3"]);
    assert_eq!(rt.registry().len(), 4);

    rt.set_variable("items", Value::Array(vec![num(7.0)]));
    assert_eq!(rt.document().element_children(list).len(), 1);
    assert_eq!(text(&rt, "#list"), "7");
    assert_eq!(rt.registry().len(), 2);
}

#[test]
fn test_each_index_and_text_nodes() {
    let mut rt = runtime(vec![Fragment::element("ol")
        .attr("id", "list")
        .attr(":each", "name, i in names")
        .child(
            Fragment::element("li")
                .attr("data-kind", "i")
                .child(Fragment::text("i: name")),
        )]);
    rt.set_variable(
        "names",
        Value::Array(vec![Value::from("ann"), Value::from("bo")]),
    );

    assert!(rt.start().is_ok());
    let list = find(&rt, "#list");
    let items = rt.document().element_children(list);
    assert_eq!(rt.document().text_content(items[0]), "0: ann");
    assert_eq!(rt.document().text_content(items[1]), "1: bo");
    // Plain attributes keep their text
    assert_eq!(rt.document().attribute(items[1], "data-kind"), Some("i"));
}

#[test]
fn test_each_rejects_non_array() {
    let mut rt = runtime(vec![Fragment::element("ul")
        .attr(":each", "n in items")
        .child(Fragment::element("li"))]);
    rt.set_variable("items", num(3.0));

    let report = rt.start();
    let failure = report.for_attribute(":each").next().unwrap();
    assert!(failure.error.to_string().contains("not iterable"));
}

#[test]
fn test_each_falls_back_on_unparsable_item_binding() {
    let mut rt = runtime(vec![Fragment::element("ul")
        .attr("id", "list")
        .attr(":each", "n in items")
        .child(Fragment::element("li").attr(":text", "n +"))]);
    rt.set_variable("items", Value::Array(vec![num(1.0), num(2.0)]));

    let report = rt.start();
    let items = rt.document().element_children(find(&rt, "#list"));
    assert_eq!(items.len(), 2);
    assert_eq!(rt.document().attribute(items[0], ":text"), Some("1 +"));
    assert_eq!(rt.document().attribute(items[1], ":text"), Some("2 +"));
    assert!(report.for_attribute(":text").next().is_some());
}

#[test]
fn test_scopes_are_isolated() {
    let counter = || {
        Fragment::element("div")
            .attr(":scope", "")
            .child(Fragment::element("button").attr("onclick", "el.count = (el.count || 0) + 1"))
            .child(Fragment::element("span").attr(":text", "el.count"))
    };
    let mut rt = runtime(vec![counter().attr("id", "a"), counter().attr("id", "b")]);
    assert!(rt.start().is_ok());

    let first = find(&rt, "#a button");
    rt.dispatch(HostEvent::click(first));
    rt.dispatch(HostEvent::click(first));

    assert_eq!(text(&rt, "#a span"), "2");
    assert_eq!(text(&rt, "#b span"), "");

    rt.dispatch(HostEvent::click(find(&rt, "#b button")));
    assert_eq!(text(&rt, "#a span"), "2");
    assert_eq!(text(&rt, "#b span"), "1");
}

#[test]
fn test_scope_root_discovered_without_marker() {
    let mut rt = runtime(vec![Fragment::element("div")
        .attr("id", "solo")
        .attr(":load", "el.greeting = 'hi'")
        .attr(":text", "el.greeting")]);

    assert!(rt.start().is_ok());
    assert_eq!(text(&rt, "#solo"), "hi");

    let entity = rt.entity_for(find(&rt, "#solo")).unwrap();
    assert!(entity.is_scope_root());
}

#[test]
fn test_disposed_scope_root_reports_resolution_error() {
    let mut rt = runtime(vec![Fragment::element("div")
        .attr("id", "root")
        .attr(":scope", "")
        .child(Fragment::element("span").attr(":text", "el.name"))]);
    assert!(rt.start().is_ok());

    let root_id = rt.entity_for(find(&rt, "#root")).unwrap().id.clone();
    let span_id = rt.entity_for(find(&rt, "#root span")).unwrap().id.clone();
    rt.dispose_entity(&root_id).unwrap();

    let report = rt.evaluate_entity(&span_id).unwrap();
    let failure = report.for_attribute(":text").next().unwrap();
    assert!(matches!(failure.error, RuntimeError::ScopeResolution { .. }));
}

#[test]
fn test_stale_entity_errors() {
    let mut rt = runtime(vec![Fragment::element("span").attr("id", "x")]);
    assert!(rt.start().is_ok());

    let id = rt.entity_for(find(&rt, "#x")).unwrap().id.clone();
    rt.dispose_entity(&id).unwrap();

    assert_eq!(rt.entity_state(&id), EntityState::Disposed);
    assert!(matches!(rt.dispose_entity(&id), Err(RuntimeError::StaleEntity { .. })));
    assert!(matches!(rt.evaluate_entity(&id), Err(RuntimeError::StaleEntity { .. })));
}

#[test]
fn test_class_keeps_base_classes() {
    let mut rt = runtime(vec![Fragment::element("div")
        .attr("id", "card")
        .attr("class", "card hidden")
        .attr(":class", "{ active: on, hidden: !on }")]);
    rt.set_variable("on", Value::Bool(true));

    assert!(rt.start().is_ok());
    let card = find(&rt, "#card");
    assert_eq!(rt.document().class_name(card), "card active");

    rt.set_variable("on", Value::Bool(false));
    assert_eq!(rt.document().class_name(card), "card hidden");
}

#[test]
fn test_value_and_checked_both_directions() {
    let mut rt = runtime(vec![
        Fragment::element("input").attr("id", "name").attr(":value", "name"),
        Fragment::element("input")
            .attr("id", "done")
            .attr("type", "checkbox")
            .attr(":checked", "done"),
    ]);
    rt.set_variable("name", Value::from("Ann"));
    rt.set_variable("done", Value::Bool(true));

    assert!(rt.start().is_ok());
    assert_eq!(rt.document().value(find(&rt, "#name")), "Ann");
    assert!(rt.document().checked(find(&rt, "#done")));

    rt.set_variable("done", Value::Bool(false));
    assert!(!rt.document().checked(find(&rt, "#done")));
}

#[test]
fn test_dynamic_attribute_sets_property() {
    let mut rt = runtime(vec![Fragment::element("a")
        .attr("id", "link")
        .attr(":title", "'Open ' + page")]);
    rt.set_variable("page", Value::from("docs"));

    assert!(rt.start().is_ok());
    let link = find(&rt, "#link");
    assert_eq!(rt.document().property(link, "title"), Value::from("Open docs"));

    let entity = rt.entity_for(link).unwrap();
    assert_eq!(entity.dynamic_attributes, vec![":title"]);
}

#[test]
fn test_load_runs_once() {
    let mut rt = runtime(vec![Fragment::element("div")
        .attr("id", "box")
        .attr(":load", "loads = loads + 1")
        .attr(":text", "loads")]);
    rt.set_variable("loads", num(0.0));

    assert!(rt.start().is_ok());
    assert_eq!(text(&rt, "#box"), "1");

    let id = rt.entity_for(find(&rt, "#box")).unwrap().id.clone();
    assert!(rt.evaluate_entity(&id).unwrap().is_ok());
    assert_eq!(rt.variable("loads"), Some(num(1.0)));
}

#[test]
fn test_lifecycle_reaches_evaluated() {
    let mut rt = runtime(vec![Fragment::element("p").attr("id", "p").attr(":text", "1")]);
    assert!(rt.start().is_ok());

    let entity = rt.entity_for(find(&rt, "#p")).unwrap();
    assert_eq!(entity.state, EntityState::Evaluated);
}

#[test]
fn test_change_writes_back() {
    let mut rt = runtime(vec![
        Fragment::element("input")
            .attr("id", "price")
            .attr(":change", "price = Number(this.value)"),
        Fragment::element("span").attr("id", "total").attr(":text", "price * 2"),
    ]);
    rt.set_variable("price", num(1.0));
    assert!(rt.start().is_ok());
    assert_eq!(text(&rt, "#total"), "2");

    let input = find(&rt, "#price");
    let report = rt.dispatch(HostEvent::new("input", input).with_value("21"));
    assert!(report.is_ok());
    assert_eq!(rt.variable("price"), Some(num(21.0)));
    assert_eq!(text(&rt, "#total"), "42");
}

#[test]
fn test_checkbox_change_listens_to_change() {
    let mut rt = runtime(vec![Fragment::element("input")
        .attr("id", "agree")
        .attr("type", "checkbox")
        .attr(":change", "agreed = this.checked")]);
    assert!(rt.start().is_ok());

    let input = find(&rt, "#agree");
    rt.dispatch(HostEvent::new("input", input).with_checked(true));
    assert_eq!(rt.variable("agreed"), None);

    rt.dispatch(HostEvent::new("change", input).with_checked(true));
    assert_eq!(rt.variable("agreed"), Some(Value::Bool(true)));
}

#[test]
fn test_clickout_ignores_inside_clicks() {
    let mut rt = runtime(vec![
        Fragment::element("div")
            .attr("id", "menu")
            .attr(":clickout", "open = false")
            .child(Fragment::element("button").attr("id", "inside")),
        Fragment::element("button").attr("id", "outside"),
    ]);
    rt.set_variable("open", Value::Bool(true));
    assert!(rt.start().is_ok());

    rt.dispatch(HostEvent::click(find(&rt, "#inside")));
    assert_eq!(rt.variable("open"), Some(Value::Bool(true)));

    rt.dispatch(HostEvent::click(find(&rt, "#outside")));
    assert_eq!(rt.variable("open"), Some(Value::Bool(false)));
}

#[test]
fn test_press_accepts_click_and_activation_keys() {
    let mut rt = runtime(vec![Fragment::element("div")
        .attr("id", "btn")
        .attr(":press", "presses++")]);
    rt.set_variable("presses", num(0.0));
    assert!(rt.start().is_ok());

    let btn = find(&rt, "#btn");
    rt.dispatch(HostEvent::key_up(btn, "Enter"));
    rt.dispatch(HostEvent::click(btn));
    rt.dispatch(HostEvent::key_up(btn, " "));
    rt.dispatch(HostEvent::key_up(btn, "a"));
    assert_eq!(rt.variable("presses"), Some(num(3.0)));
}

#[test]
fn test_keyup_filters_by_key() {
    let mut rt = runtime(vec![Fragment::element("input")
        .attr("id", "field")
        .attr(":keyup.enter", "sent = event.key")]);
    assert!(rt.start().is_ok());

    let field = find(&rt, "#field");
    rt.dispatch(HostEvent::key_up(field, "x"));
    assert_eq!(rt.variable("sent"), None);

    rt.dispatch(HostEvent::key_up(field, "Enter"));
    assert_eq!(rt.variable("sent"), Some(Value::from("Enter")));
}

#[test]
fn test_click_bubbles_to_ancestors() {
    let mut rt = runtime(vec![Fragment::element("div")
        .attr("onclick", "order = order + 'outer'")
        .child(
            Fragment::element("button")
                .attr("id", "inner")
                .attr("onclick", "order = order + 'inner,'"),
        )]);
    rt.set_variable("order", Value::from(""));
    assert!(rt.start().is_ok());

    rt.dispatch(HostEvent::click(find(&rt, "#inner")));
    assert_eq!(rt.variable("order"), Some(Value::from("inner,outer")));
}

#[test]
fn test_handler_failure_is_reported() {
    let mut rt = runtime(vec![Fragment::element("button")
        .attr("id", "b")
        .attr("onclick", "nothing()")]);
    assert!(rt.start().is_ok());

    let report = rt.dispatch(HostEvent::click(find(&rt, "#b")));
    assert_eq!(report.for_attribute("onclick").count(), 1);
}

#[test]
fn test_function_names_are_not_state() {
    let mut rt = runtime(vec![
        Fragment::element("script").child(Fragment::text("format = x => '#' + x")),
        Fragment::element("span")
            .attr("id", "label")
            .attr(":text", "format(count)"),
    ]);
    rt.set_variable("count", num(4.0));

    assert!(rt.start().is_ok());
    assert_eq!(text(&rt, "#label"), "#4");
    let entity = rt.entity_for(find(&rt, "#label")).unwrap();
    assert_eq!(entity.variables, vec!["count"]);
}

#[test]
fn test_builtin_names_become_state_when_shadowed() {
    let mut rt = runtime(Vec::new());
    assert!(!rt.is_state_name("Math"));
    assert!(!rt.is_state_name("parseInt"));
    assert!(!rt.is_state_name("__resolveScript"));
    assert!(rt.is_state_name("total"));
    assert!(rt.is_state_name("el.count"));

    rt.set_variable("Math", num(3.0));
    assert!(rt.is_state_name("Math"));
}
