//! Expression evaluation tests
use crate::*;

fn eval_with(host: &mut MemoryHost, text: &str) -> Value {
    evaluate(text, host, &mut Frame::new()).unwrap()
}

fn eval(text: &str) -> Value {
    eval_with(&mut MemoryHost::new(), text)
}

#[test]
fn test_arithmetic_and_precedence() {
    assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
    assert_eq!(eval("(1 + 2) * 3"), Value::Number(9.0));
    assert_eq!(eval("2 ** 3 ** 2"), Value::Number(512.0));
    assert_eq!(eval("7 % 4"), Value::Number(3.0));
    assert_eq!(eval("1 / 0"), Value::Number(f64::INFINITY));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval("'a' + 1"), Value::from("a1"));
    assert_eq!(eval("1 + 2 + 'px'"), Value::from("3px"));
    assert_eq!(eval("[1, 2] + ''"), Value::from("1,2"));
    assert_eq!(eval("`${1 + 1} items`"), Value::from("2 items"));
}

#[test]
fn test_comparisons() {
    assert_eq!(eval("count < 10"), Value::Bool(false));
    assert_eq!(eval("'2' == 2"), Value::Bool(true));
    assert_eq!(eval("'2' === 2"), Value::Bool(false));
    assert_eq!(eval("null == undefined"), Value::Bool(true));
    assert_eq!(eval("'apple' < 'banana'"), Value::Bool(true));
    assert_eq!(eval("'a' in { a: 1 }"), Value::Bool(true));
}

#[test]
fn test_logical_operators_return_operands() {
    assert_eq!(eval("0 || 'fallback'"), Value::from("fallback"));
    assert_eq!(eval("'x' && 'y'"), Value::from("y"));
    assert_eq!(eval("0 ?? 5"), Value::Number(0.0));
    assert_eq!(eval("missing ?? 5"), Value::Number(5.0));
    assert_eq!(eval("!''"), Value::Bool(true));
}

#[test]
fn test_unknown_names_read_as_undefined() {
    assert_eq!(eval("missing"), Value::Undefined);
    assert_eq!(eval("typeof missing"), Value::from("undefined"));
    assert_eq!(eval("missing?.deep"), Value::Undefined);
}

#[test]
fn test_member_access_on_undefined_fails() {
    let err = evaluate("missing.deep", &mut MemoryHost::new(), &mut Frame::new()).unwrap_err();
    assert!(matches!(err, EvalError::TypeError { .. }));
    assert!(err.to_string().contains("reading 'deep'"));
}

#[test]
fn test_globals_and_window() {
    let mut host = MemoryHost::new().with_global("count", 2.0);
    assert_eq!(eval_with(&mut host, "count * 10"), Value::Number(20.0));
    assert_eq!(eval_with(&mut host, "window.count"), Value::Number(2.0));

    eval_with(&mut host, "window.total = count + 1");
    assert_eq!(host.get("total"), Some(&Value::Number(3.0)));
}

#[test]
fn test_assignment_and_update() {
    let mut host = MemoryHost::new().with_global("count", 1.0);
    assert_eq!(eval_with(&mut host, "count++"), Value::Number(1.0));
    assert_eq!(eval_with(&mut host, "++count"), Value::Number(3.0));
    assert_eq!(eval_with(&mut host, "count += 2"), Value::Number(5.0));
    assert_eq!(eval_with(&mut host, "label ??= 'none'"), Value::from("none"));
    assert_eq!(eval_with(&mut host, "label ??= 'other'"), Value::from("none"));
    assert_eq!(host.get("count"), Some(&Value::Number(5.0)));
}

#[test]
fn test_nested_assignment_writes_back_container() {
    let mut host = MemoryHost::new();
    eval_with(&mut host, "user = { name: 'Ann', tags: ['a'] }");
    eval_with(&mut host, "user.name = 'Bea'");
    eval_with(&mut host, "user.tags[1] = 'b'");

    assert_eq!(eval_with(&mut host, "user.name"), Value::from("Bea"));
    assert_eq!(eval_with(&mut host, "user.tags.join('-')"), Value::from("a-b"));
}

#[test]
fn test_invalid_assignment_target() {
    let err = evaluate("f() = 1", &mut MemoryHost::new(), &mut Frame::new());
    assert!(err.is_err());
}

#[test]
fn test_scoped_namespace() {
    let mut host = MemoryHost::new();
    host.scopes.insert("E1".to_string(), Default::default());

    eval_with(&mut host, "__scopes['E1'].count = 4");
    assert_eq!(eval_with(&mut host, "__scopes['E1'].count + 1"), Value::Number(5.0));
    assert_eq!(host.scopes["E1"]["count"], Value::Number(4.0));

    let err = evaluate("__scopes['E9'].count", &mut host, &mut Frame::new()).unwrap_err();
    assert!(matches!(err, EvalError::Thrown { .. }));
}

#[test]
fn test_builtin_functions() {
    assert_eq!(eval("String(12)"), Value::from("12"));
    assert_eq!(eval("Number('3.5')"), Value::Number(3.5));
    assert_eq!(eval("parseInt('42px')"), Value::Number(42.0));
    assert_eq!(eval("isNaN('abc')"), Value::Bool(true));
    assert_eq!(eval("Math.max(1, 7, 3)"), Value::Number(7.0));
    assert_eq!(eval("Math.round(2.5)"), Value::Number(3.0));
    assert_eq!(eval("Object.keys({ a: 1, b: 2 }).join()"), Value::from("a,b"));
    assert_eq!(eval("Array.isArray([])"), Value::Bool(true));
    assert_eq!(eval("(1.005).toFixed(1)"), Value::from("1.0"));
}

#[test]
fn test_json_round_trip() {
    assert_eq!(
        eval("JSON.stringify({ a: [1, 'x', null] })"),
        Value::from(r#"{"a":[1,"x",null]}"#)
    );
    assert_eq!(eval("JSON.parse('{\"n\": 2}').n"), Value::Number(2.0));

    let err = evaluate("JSON.parse('{')", &mut MemoryHost::new(), &mut Frame::new()).unwrap_err();
    assert!(err.to_string().starts_with("SyntaxError"));
}

#[test]
fn test_string_methods() {
    assert_eq!(eval("'Hello'.toUpperCase()"), Value::from("HELLO"));
    assert_eq!(eval("'a,b,c'.split(',').length"), Value::Number(3.0));
    assert_eq!(eval("'hello'.slice(-3)"), Value::from("llo"));
    assert_eq!(eval("'hello'.substring(3, 1)"), Value::from("el"));
    assert_eq!(eval("'5'.padStart(3, '0')"), Value::from("005"));
    assert_eq!(eval("'a-b-c'.replaceAll('-', '+')"), Value::from("a+b+c"));
    assert_eq!(eval("'héllo'.indexOf('l')"), Value::Number(2.0));
}

#[test]
fn test_array_methods_with_callbacks() {
    assert_eq!(eval("[1, 2, 3].map(n => n * 2).join()"), Value::from("2,4,6"));
    assert_eq!(eval("[1, 2, 3, 4].filter(n => n % 2 == 0)"), eval("[2, 4]"));
    assert_eq!(eval("[1, 2, 3].reduce((sum, n) => sum + n, 0)"), Value::Number(6.0));
    assert_eq!(eval("[3, 1, 2].sort((a, b) => a - b)"), eval("[1, 2, 3]"));
    assert_eq!(eval("['b', 'a'].sort()"), eval("['a', 'b']"));
    assert_eq!(eval("[{ id: 1 }, { id: 2 }].find(x => x.id == 2).id"), Value::Number(2.0));
    assert_eq!(eval("[1, 2].some(n => n > 1)"), Value::Bool(true));
}

#[test]
fn test_collection_helpers() {
    assert_eq!(eval("['a', 'b', 'c'].nextItem('c')"), Value::from("a"));
    assert_eq!(eval("['a', 'b'].first"), Value::from("a"));
    assert_eq!(eval("['a', 'b'].last"), Value::from("b"));
    assert_eq!(eval("['a', 'b'].toggle('a')"), eval("['b']"));
    assert_eq!(eval("['a'].add('b').add('b')"), eval("['a', 'b']"));
    assert_eq!(eval("['Milk', 'Bread'].search('mil')"), eval("['Milk']"));
}

#[test]
fn test_closures_capture_locals() {
    let mut host = MemoryHost::new();
    let value = eval_with(&mut host, "let factor = 3; [1, 2].map(n => n * factor)");
    assert_eq!(value, eval("[3, 6]"));
}

#[test]
fn test_not_callable() {
    let err = evaluate("count()", &mut MemoryHost::new(), &mut Frame::new()).unwrap_err();
    assert_eq!(err, EvalError::not_callable("count"));
}

#[test]
fn test_console_maps_to_host_log() {
    let mut host = MemoryHost::new();
    eval_with(&mut host, "console.warn('low', { left: 1 })");
    assert_eq!(host.logs, vec![(LogLevel::Warn, r#"low {"left":1}"#.to_string())]);
}

#[test]
fn test_this_and_event_from_frame() {
    let mut host = MemoryHost::new();
    let mut frame = Frame::with_this(Value::from("el")).with_event(builtins::object([(
        "key",
        Value::from("Enter"),
    )]));

    let value = evaluate("this + ':' + event.key", &mut host, &mut frame).unwrap();
    assert_eq!(value, Value::from("el:Enter"));
}

#[test]
fn test_class_list_object_syntax() {
    let mut host = MemoryHost::new().with_global("active", true);
    let base = vec!["btn".to_string(), "hidden".to_string()];

    let classes = evaluate_class_list(
        "{ 'bg-blue text-white': active, hidden: !active }",
        &base,
        &mut host,
        &mut Frame::new(),
    )
    .unwrap();
    assert_eq!(classes, "btn bg-blue text-white");
}

#[test]
fn test_class_list_string_expression() {
    let mut host = MemoryHost::new().with_global("open", false);
    let base = vec!["menu open".to_string()];

    let classes = evaluate_class_list(
        "open ? 'open' : 'closed'",
        &base,
        &mut host,
        &mut Frame::new(),
    )
    .unwrap();
    assert_eq!(classes, "menu closed");
}

#[test]
fn test_class_list_accepts_empty_result() {
    let mut host = MemoryHost::new();
    let base = vec!["a".to_string()];
    let classes = evaluate_class_list("''", &base, &mut host, &mut Frame::new()).unwrap();
    assert_eq!(classes, "a");
}
