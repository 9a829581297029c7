//! Statement sequence tests (event handler bodies, code blocks)
use crate::*;

fn run(host: &mut MemoryHost, text: &str) -> EvalResult<Value> {
    evaluate(text, host, &mut Frame::new())
}

#[test]
fn test_sequence_yields_last_expression() {
    let mut host = MemoryHost::new();
    let value = run(&mut host, "a = 1; b = a + 1\n b * 10").unwrap();
    assert_eq!(value, Value::Number(20.0));
    assert_eq!(host.get("a"), Some(&Value::Number(1.0)));
}

#[test]
fn test_if_else() {
    let mut host = MemoryHost::new().with_global("count", 5.0);
    run(
        &mut host,
        "if (count > 3) { size = 'big' } else { size = 'small' }",
    )
    .unwrap();
    assert_eq!(host.get("size"), Some(&Value::from("big")));

    run(&mut host, "if (count > 10) size = 'huge'").unwrap();
    assert_eq!(host.get("size"), Some(&Value::from("big")));
}

#[test]
fn test_declarations_stay_local() {
    let mut host = MemoryHost::new();
    run(&mut host, "let step = 2; total = step * 3").unwrap();
    assert_eq!(host.get("total"), Some(&Value::Number(6.0)));
    assert_eq!(host.get("step"), None);
}

#[test]
fn test_block_scoping() {
    let mut host = MemoryHost::new();
    let value = run(&mut host, "let x = 1; { let x = 2; inner = x }; x").unwrap();
    assert_eq!(value, Value::Number(1.0));
    assert_eq!(host.get("inner"), Some(&Value::Number(2.0)));
}

#[test]
fn test_local_reassignment_does_not_leak() {
    let mut host = MemoryHost::new();
    run(&mut host, "let n = 1; n = n + 1; result = n").unwrap();
    assert_eq!(host.get("result"), Some(&Value::Number(2.0)));
    assert_eq!(host.get("n"), None);
}

#[test]
fn test_return_stops_execution() {
    let mut host = MemoryHost::new();
    let value = run(&mut host, "return 1; after = true").unwrap();
    assert_eq!(value, Value::Number(1.0));
    assert_eq!(host.get("after"), None);
}

#[test]
fn test_arrow_block_body() {
    let mut host = MemoryHost::new();
    let value = run(
        &mut host,
        "let classify = n => { if (n > 0) { return 'pos' } return 'non-pos' }; [1, -1].map(classify).join()",
    )
    .unwrap();
    assert_eq!(value, Value::from("pos,non-pos"));
}

#[test]
fn test_runaway_recursion_is_bounded() {
    let mut host = MemoryHost::new();
    let err = run(&mut host, "f = n => f(n + 1); f(0)").unwrap_err();
    assert_eq!(
        err,
        EvalError::DepthExceeded {
            limit: MAX_CALL_DEPTH
        }
    );
}

#[test]
fn test_error_aborts_remaining_statements() {
    let mut host = MemoryHost::new();
    let err = run(&mut host, "first = 1; missing.prop = 2; second = 2");
    assert!(err.is_err());
    // Side effects before the failure remain
    assert_eq!(host.get("first"), Some(&Value::Number(1.0)));
    assert_eq!(host.get("second"), None);
}

#[test]
fn test_parse_error_surfaces() {
    let mut host = MemoryHost::new();
    let err = run(&mut host, "if (").unwrap_err();
    assert!(matches!(err, EvalError::Parse(_)));
}

#[test]
fn test_host_functions() {
    struct Calls(Vec<String>);

    impl Host for Calls {
        fn lookup(&mut self, _name: &str) -> Option<Value> {
            None
        }
        fn assign(&mut self, _name: &str, _value: Value) -> EvalResult<()> {
            Ok(())
        }
        fn scoped_get(&mut self, _scope: &str, _name: &str) -> EvalResult<Value> {
            Ok(Value::Undefined)
        }
        fn scoped_set(&mut self, _scope: &str, _name: &str, _value: Value) -> EvalResult<()> {
            Ok(())
        }
        fn has_function(&self, name: &str) -> bool {
            name == "__resolveScript"
        }
        fn call_function(&mut self, name: &str, args: &[Value]) -> Option<EvalResult<Value>> {
            if name != "__resolveScript" {
                return None;
            }
            self.0.push(args.first().map(|v| v.to_string()).unwrap_or_default());
            Some(Ok(Value::Undefined))
        }
    }

    let mut host = Calls(Vec::new());
    evaluate("work = 1\n__resolveScript('S1')", &mut host, &mut Frame::new()).unwrap();
    assert_eq!(host.0, vec!["S1"]);
}
