//! Source rewriting tests
use crate::*;

fn map(pairs: &[(&str, &str)]) -> SubstitutionMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_empty_map_is_noop() {
    let empty = SubstitutionMap::new();
    assert_eq!(rewrite("count  + 1", &empty, &[RewriteMode::Declared]).unwrap(), "count  + 1");
    // Not even parsed
    assert_eq!(rewrite("a +", &empty, &[RewriteMode::All]).unwrap(), "a +");
}

#[test]
fn test_declared_leaves_properties_alone() {
    let subs = map(&[("count", "total")]);
    assert_eq!(
        rewrite("count + user.count", &subs, &[RewriteMode::Declared]).unwrap(),
        "total + user.count"
    );
    assert_eq!(
        rewrite("{ count: count }", &subs, &[RewriteMode::Declared]).unwrap(),
        "{ count: total }"
    );
}

#[test]
fn test_declared_expands_shorthand() {
    let subs = map(&[("count", "total")]);
    assert_eq!(
        rewrite("{ count }", &subs, &[RewriteMode::Declared]).unwrap(),
        "{ count: total }"
    );
}

#[test]
fn test_all_mode_rewrites_every_identifier_token() {
    let subs = map(&[("count", "total")]);
    assert_eq!(
        rewrite("{ count: user.count }", &subs, &[RewriteMode::All]).unwrap(),
        "{ total: user.total }"
    );
}

#[test]
fn test_strings_and_comments_untouched() {
    let subs = map(&[("count", "total")]);
    assert_eq!(
        rewrite("'count' + count /* count */", &subs, &[RewriteMode::Declared]).unwrap(),
        "'count' + total /* count */"
    );
    assert_eq!(
        rewrite("\"count\" + count", &subs, &[RewriteMode::All]).unwrap(),
        "\"count\" + total"
    );
}

#[test]
fn test_whitespace_preserved() {
    let subs = map(&[("a", "x")]);
    assert_eq!(
        rewrite("a  +\n\t a * 'a  b'", &subs, &[RewriteMode::Declared]).unwrap(),
        "x  +\n\t x * 'a  b'"
    );
}

#[test]
fn test_scoped_chain_substitution() {
    let subs = map(&[("el.count", "__scopes['E1'].count")]);
    assert_eq!(
        rewrite("el.count + el.count * 2", &subs, &[RewriteMode::Declared]).unwrap(),
        "__scopes['E1'].count + __scopes['E1'].count * 2"
    );

    let subs = map(&[("el", "__scopes['E1']")]);
    assert_eq!(
        rewrite("el.items.length", &subs, &[RewriteMode::Declared]).unwrap(),
        "__scopes['E1'].items.length"
    );

    let subs = map(&[("el.count", "s.count")]);
    assert_eq!(rewrite("el.count++", &subs, &[RewriteMode::All]).unwrap(), "s.count++");
}

#[test]
fn test_local_bindings_not_rewritten() {
    let subs = map(&[("item", "selected")]);
    assert_eq!(
        rewrite("items.map(item => item.id) + item", &subs, &[RewriteMode::Declared]).unwrap(),
        "items.map(item => item.id) + selected"
    );
}

#[test]
fn test_template_interpolations() {
    let subs = map(&[("count", "total")]);
    assert_eq!(
        rewrite("`${count} of count`", &subs, &[RewriteMode::Declared]).unwrap(),
        "`${total} of count`"
    );
    assert_eq!(
        rewrite("`${count} of count`", &subs, &[RewriteMode::All]).unwrap(),
        "`${total} of count`"
    );
}

#[test]
fn test_inverse_map_restores_source() {
    let source = "total = price * qty + price";
    let forward = map(&[("price", "cost"), ("qty", "amount")]);
    let inverse = map(&[("cost", "price"), ("amount", "qty")]);

    let rewritten = rewrite(source, &forward, &[RewriteMode::Declared]).unwrap();
    assert_eq!(rewritten, "total = cost * amount + cost");
    assert_eq!(rewrite(&rewritten, &inverse, &[RewriteMode::Declared]).unwrap(), source);
}

#[test]
fn test_malformed_text_with_substitutions_fails() {
    let subs = map(&[("a", "b")]);
    assert!(rewrite("a + (", &subs, &[RewriteMode::Declared]).is_err());
}
