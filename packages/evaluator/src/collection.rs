//! Ordered-collection helpers exposed on array values.
//!
//! Every operation leaves its input alone and returns a new sequence.
//! Membership uses strict equality.

use crate::value::Value;

pub fn index_of(items: &[Value], item: &Value) -> Option<usize> {
    items.iter().position(|v| v.strict_equals(item))
}

pub fn first(items: &[Value]) -> Value {
    items.first().cloned().unwrap_or(Value::Undefined)
}

pub fn last(items: &[Value]) -> Value {
    items.last().cloned().unwrap_or(Value::Undefined)
}

/// Item after `item`, wrapping to the first; the first item when `item` is absent
pub fn next_item(items: &[Value], item: &Value) -> Value {
    let next = index_of(items, item).map(|i| i + 1).unwrap_or(0);
    if next >= items.len() {
        first(items)
    } else {
        items[next].clone()
    }
}

/// Item before `item`, wrapping to the last; the last item when `item` is absent
pub fn previous_item(items: &[Value], item: &Value) -> Value {
    match index_of(items, item) {
        Some(i) if i > 0 => items[i - 1].clone(),
        _ => last(items),
    }
}

/// Remove `value` when present, append it otherwise. An array argument
/// replaces the whole collection.
pub fn toggle(items: &[Value], value: &Value) -> Vec<Value> {
    if let Value::Array(replacement) = value {
        return replacement.clone();
    }
    match index_of(items, value) {
        Some(_) => remove(items, value),
        None => append(items, value),
    }
}

pub fn add(items: &[Value], value: &Value) -> Vec<Value> {
    match index_of(items, value) {
        Some(_) => items.to_vec(),
        None => append(items, value),
    }
}

/// Drop the first occurrence of `value`
pub fn remove(items: &[Value], value: &Value) -> Vec<Value> {
    let mut out = items.to_vec();
    if let Some(i) = index_of(items, value) {
        out.remove(i);
    }
    out
}

pub fn subtract(items: &[Value], other: &[Value]) -> Vec<Value> {
    items
        .iter()
        .filter(|item| index_of(other, item).is_none())
        .cloned()
        .collect()
}

/// Case-insensitive filter; every whitespace-separated term of `query`
/// must be a substring of the item
pub fn search(items: &[Value], query: &str) -> Vec<Value> {
    let query = query.to_lowercase();
    let terms: Vec<&str> = query.split_whitespace().collect();

    items
        .iter()
        .filter(|item| {
            let text = item.to_string().to_lowercase();
            terms.iter().all(|term| text.contains(term))
        })
        .cloned()
        .collect()
}

/// Concatenation semantics: an array argument is spread
fn append(items: &[Value], value: &Value) -> Vec<Value> {
    let mut out = items.to_vec();
    match value {
        Value::Array(more) => out.extend(more.iter().cloned()),
        other => out.push(other.clone()),
    }
    out
}
