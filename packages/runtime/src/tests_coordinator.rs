//! Mutation coordinator tests
use crate::*;
use minibind_evaluator::{EvalResult, Host, Value};

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

fn set_attribute(selector: &str, name: &str, value: &str) -> Mutation {
    Mutation::SetAttribute {
        selector: selector.to_string(),
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Leaves every block pending
#[derive(Default)]
struct Deferred;

impl BlockExecutor for Deferred {
    fn execute(&mut self, _id: &str, _source: &str, _host: &mut dyn Host) -> EvalResult<()> {
        Ok(())
    }
}

#[test]
fn test_start_is_idempotent() {
    let mut rt = runtime(vec![Fragment::element("span").attr(":text", "1")]);
    assert!(rt.start().is_ok());
    assert!(rt.is_observing());
    assert_eq!(rt.registry().len(), 1);

    assert!(rt.start().is_ok());
    assert_eq!(rt.registry().len(), 1);
}

#[test]
fn test_appended_subtree_is_bound() {
    let mut rt = runtime(vec![Fragment::element("div").attr("id", "host")]);
    rt.set_variable("who", Value::from("world"));
    assert!(rt.start().is_ok());

    let fragment = Fragment::element("p")
        .attr("id", "greeting")
        .child(Fragment::element("b").attr(":text", "'hello ' + who"));
    let report = rt
        .apply_mutation(&Mutation::AppendChild {
            selector: "#host".to_string(),
            fragment,
        })
        .unwrap();

    assert!(report.is_ok());
    assert_eq!(text(&rt, "#greeting"), "hello world");
    assert!(rt.entity_for(find(&rt, "#greeting b")).is_some());

    rt.set_variable("who", Value::from("there"));
    assert_eq!(text(&rt, "#greeting"), "hello there");
}

#[test]
fn test_removed_subtree_is_disposed() {
    let mut rt = runtime(vec![Fragment::element("div")
        .attr("id", "panel")
        .attr(":scope", "")
        .child(Fragment::element("button").attr("onclick", "el.n = 1"))]);
    assert!(rt.start().is_ok());

    let panel = find(&rt, "#panel");
    let ids = rt.entities_under(panel);
    assert_eq!(ids.len(), 2);
    assert_eq!(rt.listeners().len(), 1);

    rt.apply_mutation(&Mutation::RemoveNode {
        selector: "#panel".to_string(),
    })
    .unwrap();

    for id in &ids {
        assert_eq!(rt.entity_state(id), EntityState::Disposed);
    }
    assert!(rt.listeners().is_empty());
    assert_eq!(rt.scoped_variable(ids[0].as_str(), "n"), None);
}

#[test]
fn test_changed_binding_text_is_reevaluated() {
    let mut rt = runtime(vec![Fragment::element("span")
        .attr("id", "out")
        .attr(":text", "a")]);
    rt.set_variable("a", Value::from("first"));
    rt.set_variable("b", Value::from("second"));
    assert!(rt.start().is_ok());
    assert_eq!(text(&rt, "#out"), "first");

    rt.apply_mutation(&set_attribute("#out", ":text", "b")).unwrap();
    assert_eq!(text(&rt, "#out"), "second");

    let entity = rt.entity_for(find(&rt, "#out")).unwrap();
    assert_eq!(entity.variables, vec!["b"]);

    rt.set_variable("b", Value::from("third"));
    assert_eq!(text(&rt, "#out"), "third");
}

#[test]
fn test_removed_binding_stays_disposed() {
    let mut rt = runtime(vec![Fragment::element("span")
        .attr("id", "out")
        .attr(":text", "count")]);
    rt.set_variable("count", Value::Number(1.0));
    assert!(rt.start().is_ok());

    rt.apply_mutation(&Mutation::RemoveAttribute {
        selector: "#out".to_string(),
        name: ":text".to_string(),
    })
    .unwrap();
    rt.set_variable("count", Value::Number(2.0));
    assert_eq!(text(&rt, "#out"), "1");
}

#[test]
fn test_removed_binding_drops_its_variables() {
    let mut rt = runtime(vec![Fragment::element("span")
        .attr("id", "out")
        .attr(":text", "count")
        .attr(":title", "label")]);
    rt.set_variable("count", Value::Number(1.0));
    rt.set_variable("label", Value::from("total"));
    assert!(rt.start().is_ok());
    let out = find(&rt, "#out");
    assert_eq!(rt.entity_for(out).unwrap().variables, vec!["count", "label"]);

    let report = rt
        .apply_mutation(&Mutation::RemoveAttribute {
            selector: "#out".to_string(),
            name: ":text".to_string(),
        })
        .unwrap();
    assert!(report.is_ok());
    assert_eq!(rt.entity_for(out).unwrap().variables, vec!["label"]);
}

#[test]
fn test_new_dynamic_attribute_is_picked_up() {
    let mut rt = runtime(vec![Fragment::element("img").attr("id", "pic")]);
    rt.set_variable("src", Value::from("a.png"));
    assert!(rt.start().is_ok());

    rt.apply_mutation(&set_attribute("#pic", ":alt", "'photo ' + src"))
        .unwrap();
    let pic = find(&rt, "#pic");
    assert_eq!(rt.document().property(pic, "alt"), Value::from("photo a.png"));
    assert_eq!(rt.entity_for(pic).unwrap().dynamic_attributes, vec![":alt"]);
}

#[test]
fn test_event_binding_added_and_removed() {
    let mut rt = runtime(vec![Fragment::element("button").attr("id", "b")]);
    rt.set_variable("clicks", Value::Number(0.0));
    assert!(rt.start().is_ok());

    rt.apply_mutation(&set_attribute("#b", "onclick", "clicks++"))
        .unwrap();
    let button = find(&rt, "#b");
    rt.dispatch(HostEvent::click(button));
    assert_eq!(rt.variable("clicks"), Some(Value::Number(1.0)));

    rt.apply_mutation(&Mutation::RemoveAttribute {
        selector: "#b".to_string(),
        name: "onclick".to_string(),
    })
    .unwrap();
    rt.dispatch(HostEvent::click(button));
    assert_eq!(rt.variable("clicks"), Some(Value::Number(1.0)));
}

#[test]
fn test_stopped_runtime_ignores_changes() {
    let mut rt = runtime(vec![Fragment::element("div").attr("id", "host")]);
    assert!(rt.start().is_ok());
    rt.stop();
    rt.stop();
    assert!(!rt.is_observing());

    rt.apply_mutation(&Mutation::AppendChild {
        selector: "#host".to_string(),
        fragment: Fragment::element("span").attr(":text", "1"),
    })
    .unwrap();
    assert!(rt.entity_for(find(&rt, "#host span")).is_none());
}

#[test]
fn test_record_batches_processed_in_order() {
    let mut rt = runtime(vec![Fragment::element("div").attr("id", "host")]);
    assert!(rt.start().is_ok());

    let host = find(&rt, "#host");
    let first = rt.document_mut().instantiate(&Fragment::element("i").attr(":text", "1"));
    let second = rt.document_mut().instantiate(&Fragment::element("i").attr(":text", "2"));
    rt.document_mut().append_child(host, first);
    rt.document_mut().append_child(host, second);
    rt.document_mut().remove(first);

    assert!(rt.flush().is_ok());
    assert!(rt.entity_for(first).is_none());
    assert!(rt.entity_for(second).is_some());
    assert_eq!(rt.document().text_content(second), "2");
}

#[test]
fn test_code_block_runs_before_bindings() {
    let mut rt = runtime(vec![
        Fragment::element("script").child(Fragment::text("greeting = 'hi'")),
        Fragment::element("span").attr("id", "out").attr(":text", "greeting"),
    ]);
    assert!(rt.start().is_ok());
    assert_eq!(text(&rt, "#out"), "hi");

    let script = find(&rt, "script");
    let id = rt.blocks().id_of(script).unwrap().to_string();
    assert_eq!(rt.blocks().status(&id), Some(BlockStatus::Completed));
    assert_eq!(rt.document().text_content(script), "greeting = 'hi'");
    assert!(!rt.document().has_attribute(script, "data-mini-script-id"));
}

#[test]
fn test_throwing_block_is_reported() {
    let mut rt = runtime(vec![Fragment::element("script")
        .child(Fragment::text("setup()"))]);
    let report = rt.start();
    assert_eq!(report.for_attribute("script").count(), 1);

    let script = find(&rt, "script");
    let id = rt.blocks().id_of(script).unwrap().to_string();
    assert!(matches!(rt.blocks().status(&id), Some(BlockStatus::Failed(_))));
}

#[test]
fn test_deferred_block_stays_pending() {
    let mut rt = runtime(vec![Fragment::element("script")
        .child(Fragment::text("ready = true"))])
    .with_executor(Deferred);
    assert!(rt.start().is_ok());

    let script = find(&rt, "script");
    let id = rt.blocks().id_of(script).unwrap().to_string();
    assert_eq!(rt.blocks().status(&id), Some(BlockStatus::Pending));
    assert!(rt.document().has_attribute(script, "data-mini-script-id"));

    assert!(rt.resolve_block(&id));
    assert!(!rt.resolve_block(&id));
    assert_eq!(rt.blocks().status(&id), Some(BlockStatus::Completed));
    assert_eq!(rt.document().text_content(script), "ready = true");
}

#[tokio::test]
async fn test_await_pending_blocks_resolves() {
    let mut rt = runtime(vec![Fragment::element("section").child(
        Fragment::element("script").child(Fragment::text("ready = true")),
    )])
    .with_executor(Deferred);
    assert!(rt.start().is_ok());

    let section = find(&rt, "section");
    let waiting = rt.await_pending_blocks(&[section]);
    let id = rt.blocks().id_of(find(&rt, "script")).unwrap().to_string();
    rt.resolve_block(&id);

    assert!(waiting.await.is_ok());
}

#[tokio::test]
async fn test_await_pending_blocks_fails() {
    let mut rt = runtime(vec![
        Fragment::element("script").child(Fragment::text("fine = 1")),
        Fragment::element("script").child(Fragment::text("broken()")),
    ]);
    rt.start();

    let root = rt.document().root();
    let error = rt.await_pending_blocks(&[root]).await.unwrap_err();
    assert!(matches!(error, RuntimeError::BlockFailed { .. }));
}

#[test]
fn test_restamped_block_keeps_its_id() {
    let mut rt = runtime(vec![Fragment::element("script")
        .attr("data-mini-script-id", "preset")
        .child(Fragment::text("x = 1"))])
    .with_executor(Deferred);
    assert!(rt.start().is_ok());

    let script = find(&rt, "script");
    assert_eq!(rt.blocks().id_of(script), Some("preset"));
    assert!(rt.fail_block("preset", "gave up"));
    assert_eq!(
        rt.blocks().status("preset"),
        Some(BlockStatus::Failed("gave up".to_string()))
    );
}

#[test]
fn test_repeated_updates_reuse_node_slots() {
    let mut rt = runtime(vec![
        Fragment::element("span").attr("id", "count").attr(":text", "count"),
        Fragment::element("ul")
            .attr("id", "list")
            .attr(":each", "n in items")
            .child(Fragment::element("li").attr(":text", "n")),
    ]);
    let update = |rt: &mut Runtime, i: usize| {
        let n = i as f64;
        rt.set_variable("count", Value::Number(n));
        rt.set_variable("items", Value::Array(vec![Value::Number(n), Value::Number(n + 1.0)]));
    };
    update(&mut rt, 0);
    assert!(rt.start().is_ok());
    for i in 1..5 {
        update(&mut rt, i);
    }
    let slots = rt.document().slot_count();
    let live = rt.document().node_count();

    for i in 5..200 {
        update(&mut rt, i);
    }
    assert_eq!(text(&rt, "#count"), "199");
    assert_eq!(text(&rt, "#list"), "199200");
    assert_eq!(rt.document().slot_count(), slots);
    assert_eq!(rt.document().node_count(), live);
    assert_eq!(rt.registry().len(), 4);
}

#[test]
fn test_removed_block_is_forgotten() {
    let mut rt = runtime(vec![Fragment::element("div")
        .attr("id", "host")
        .child(Fragment::element("script").child(Fragment::text("ready = true")))])
    .with_executor(Deferred);
    assert!(rt.start().is_ok());
    assert_eq!(rt.blocks().len(), 1);

    rt.apply_mutation(&Mutation::RemoveNode {
        selector: "#host".to_string(),
    })
    .unwrap();
    assert!(rt.blocks().is_empty());
}
