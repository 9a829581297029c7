//! Identifier classification tests
use crate::*;
use std::collections::HashSet;

fn ids(source: &str) -> Identifiers {
    analyze(source, &AnalyzeOptions::default()).unwrap()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_bare_reference() {
    let result = ids("count + 1");
    assert_eq!(result.referenced, names(&["count"]));
    assert!(result.member.is_empty());
    assert!(result.assigned.is_empty());
}

#[test]
fn test_member_chain_root() {
    let result = ids("user.profile.name");
    assert_eq!(result.member, names(&["user"]));
    assert!(result.referenced.is_empty());
}

#[test]
fn test_update_and_assignment_targets() {
    assert_eq!(ids("count++").assigned, names(&["count"]));
    assert_eq!(ids("--count").assigned, names(&["count"]));

    let result = ids("total = price * qty");
    assert_eq!(result.assigned, names(&["total"]));
    assert_eq!(result.referenced, names(&["price", "qty"]));
}

#[test]
fn test_name_in_multiple_roles() {
    let result = ids("count = count + 1");
    assert_eq!(result.assigned, names(&["count"]));
    assert_eq!(result.referenced, names(&["count"]));
}

#[test]
fn test_assignment_through_chain_reports_root_as_member() {
    let result = ids("form.name = value");
    assert_eq!(result.member, names(&["form"]));
    assert!(result.assigned.is_empty());
    assert_eq!(result.referenced, names(&["value"]));
}

#[test]
fn test_scoped_variables() {
    assert_eq!(ids("el.count + 1").member, names(&["el.count"]));
    assert_eq!(ids("el.count = 5").assigned, names(&["el.count"]));
    assert_eq!(ids("el.count++").assigned, names(&["el.count"]));
    assert_eq!(ids("el.items.length").member, names(&["el.items"]));
}

#[test]
fn test_calls() {
    let result = ids("format(price, currency)");
    assert_eq!(result.referenced, names(&["format", "price", "currency"]));

    let result = ids("items.filter(item => item.done)");
    assert_eq!(result.member, names(&["items"]));
    assert!(result.referenced.is_empty());
}

#[test]
fn test_index_access() {
    let result = ids("rows[selected].label");
    assert_eq!(result.member, names(&["rows"]));
    assert_eq!(result.referenced, names(&["selected"]));
}

#[test]
fn test_object_keys_are_not_identifiers() {
    let result = ids("{ active: isActive, 'is-red': hasError }");
    assert_eq!(result.referenced, names(&["isActive", "hasError"]));

    assert_eq!(ids("{ count }").referenced, names(&["count"]));
}

#[test]
fn test_keywords_and_literals_excluded() {
    assert!(ids("this.value = true").is_empty());
    assert!(ids("typeof undefined === 'undefined' && null == NaN").is_empty());
}

#[test]
fn test_ignored_names() {
    let options = AnalyzeOptions::ignoring(["$", "window", "document", "console", "event"]);

    let result = analyze("$('#name').value = name", &options).unwrap();
    assert_eq!(result.referenced, names(&["name"]));
    assert!(result.member.is_empty());

    let result = analyze("console.log(event.key); window.title = title", &options).unwrap();
    assert_eq!(result.all(), names(&["title"]));
}

#[test]
fn test_local_declarations_excluded() {
    let result = ids("let step = 2; total += step * factor");
    assert_eq!(result.assigned, names(&["total"]));
    assert_eq!(result.referenced, names(&["factor"]));
}

#[test]
fn test_block_scoped_declaration() {
    let result = ids("if (ready) { const n = 1; count = n } else { count = n }");
    assert_eq!(result.referenced, names(&["ready", "n"]));
    assert_eq!(result.assigned, names(&["count"]));
}

#[test]
fn test_template_interpolation() {
    let result = ids("`Hello ${user.name}, ${count} new`");
    assert_eq!(result.member, names(&["user"]));
    assert_eq!(result.referenced, names(&["count"]));
}

#[test]
fn test_union_is_exactly_the_free_identifiers() {
    let result = ids("a + b.c - d(e) ? f : (g = h[i])");
    let union: HashSet<String> = result.all().into_iter().collect();
    let expected: HashSet<String> = ["a", "b", "d", "e", "f", "g", "h", "i"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(union, expected);
    assert!(!result.referenced.contains(&"b".to_string()));
}

#[test]
fn test_malformed_text_is_parse_error() {
    let err = analyze("items.filter(i => i", &AnalyzeOptions::default()).unwrap_err();
    assert_eq!(err.text(), "items.filter(i => i");

    assert!(analyze("'unterminated", &AnalyzeOptions::default()).is_err());
}

#[test]
fn test_deep_nesting_is_rejected() {
    let options = AnalyzeOptions::default();

    let unbalanced = "(".repeat(20_000);
    assert!(analyze(&unbalanced, &options).is_err());

    let depth = crate::parser::MAX_NESTING_DEPTH + 8;
    let balanced = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
    let err = analyze(&balanced, &options).unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { .. }));

    let negations = format!("{}x", "!".repeat(20_000));
    assert!(analyze(&negations, &options).is_err());

    let powers = format!("x{}", " ** x".repeat(20_000));
    assert!(analyze(&powers, &options).is_err());
}

#[test]
fn test_moderate_nesting_parses() {
    let result = ids(&format!("{}count{} + 1", "(".repeat(10), ")".repeat(10)));
    assert_eq!(result.referenced, names(&["count"]));

    let result = ids("`total: ${((a + b))}`");
    assert_eq!(result.referenced, names(&["a", "b"]));
}
