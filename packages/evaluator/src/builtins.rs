//! Restricted built-in function set.

use crate::collection;
use crate::error::{EvalError, EvalResult};
use crate::host::LogLevel;
use crate::interpreter::Interpreter;
use crate::value::{format_number, Builtin, Namespace, Object, Value};

const GLOBAL_FUNCTIONS: &[&str] = &[
    "String",
    "Number",
    "Boolean",
    "parseInt",
    "parseFloat",
    "isNaN",
];

const NAMESPACES: &[&str] = &["Math", "JSON", "Object", "Array"];

const STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "includes",
    "startsWith",
    "endsWith",
    "indexOf",
    "split",
    "replace",
    "replaceAll",
    "slice",
    "substring",
    "padStart",
    "charAt",
    "toString",
];

const ARRAY_METHODS: &[&str] = &[
    "includes",
    "indexOf",
    "join",
    "map",
    "filter",
    "find",
    "findIndex",
    "some",
    "every",
    "forEach",
    "reduce",
    "concat",
    "slice",
    "reverse",
    "sort",
    "toString",
    // Ordered-collection helpers
    "nextItem",
    "previousItem",
    "toggle",
    "add",
    "remove",
    "subtract",
    "search",
];

const MATH_FUNCTIONS: &[&str] = &[
    "abs", "ceil", "floor", "round", "min", "max", "pow", "sqrt", "random",
];

pub fn is_string_method(name: &str) -> bool {
    STRING_METHODS.contains(&name)
}

pub fn is_array_method(name: &str) -> bool {
    ARRAY_METHODS.contains(&name)
}

pub fn is_number_method(name: &str) -> bool {
    matches!(name, "toFixed" | "toString")
}

/// Names the built-in set resolves on its own: global functions, the
/// `Math`/`JSON`/`Object`/`Array` namespaces and the numeric constants
pub fn is_builtin_name(name: &str) -> bool {
    GLOBAL_FUNCTIONS.contains(&name) || NAMESPACES.contains(&name) || is_constant(name)
}

fn is_constant(name: &str) -> bool {
    matches!(name, "NaN" | "Infinity")
}

/// Value of a built-in global name
pub fn global(name: &str) -> Option<Value> {
    match name {
        "NaN" => Some(Value::Number(f64::NAN)),
        "Infinity" => Some(Value::Number(f64::INFINITY)),
        "Math" => Some(Value::Namespace(Namespace::Math)),
        "JSON" => Some(Value::Namespace(Namespace::Json)),
        "Object" => Some(Value::Namespace(Namespace::Object)),
        "Array" => Some(Value::Namespace(Namespace::Array)),
        name if GLOBAL_FUNCTIONS.contains(&name) => Some(Value::Builtin(Builtin::global(name))),
        _ => None,
    }
}

pub fn namespace_member(namespace: &Namespace, key: &str) -> Value {
    let function = |prefix: &str| Value::Builtin(Builtin::global(format!("{}.{}", prefix, key)));

    match namespace {
        Namespace::Console if matches!(key, "log" | "info" | "warn" | "error" | "debug") => {
            function("console")
        }
        Namespace::Math => match key {
            "PI" => Value::Number(std::f64::consts::PI),
            "E" => Value::Number(std::f64::consts::E),
            key if MATH_FUNCTIONS.contains(&key) => function("Math"),
            _ => Value::Undefined,
        },
        Namespace::Json if matches!(key, "stringify" | "parse") => function("JSON"),
        Namespace::Object if matches!(key, "keys" | "values" | "entries") => function("Object"),
        Namespace::Array if key == "isArray" => function("Array"),
        _ => Value::Undefined,
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

pub fn call(interp: &mut Interpreter<'_>, builtin: &Builtin, args: Vec<Value>) -> EvalResult<Value> {
    let name = builtin.name.as_str();
    match builtin.receiver.as_deref() {
        None => call_global(interp, name, args),
        Some(Value::String(s)) => string_method(s, name, &args),
        Some(Value::Array(items)) => array_method(interp, items, name, args),
        Some(Value::Node(node)) => interp.host().call_method(*node, name, args),
        Some(receiver @ (Value::Number(_) | Value::Bool(_))) => number_method(receiver, name, &args),
        Some(other) => Err(EvalError::not_callable(format!("{}.{}", other, name))),
    }
}

fn call_global(interp: &mut Interpreter<'_>, name: &str, args: Vec<Value>) -> EvalResult<Value> {
    let number = |i: usize| arg(&args, i).to_number();

    let value = match name {
        "$" => return interp.host().query(&arg(&args, 0).to_string()),
        "String" => Value::String(args.first().map(|v| v.to_string()).unwrap_or_default()),
        "Number" => Value::Number(args.first().map(Value::to_number).unwrap_or(0.0)),
        "Boolean" => Value::Bool(arg(&args, 0).is_truthy()),
        "parseInt" => {
            let radix = match arg(&args, 1) {
                Value::Undefined => None,
                radix => Some(radix.to_number() as u32),
            };
            Value::Number(parse_int(&arg(&args, 0).to_string(), radix))
        }
        "parseFloat" => Value::Number(parse_float(&arg(&args, 0).to_string())),
        "isNaN" => Value::Bool(number(0).is_nan()),

        "Array.isArray" => Value::Bool(matches!(arg(&args, 0), Value::Array(_))),
        "Object.keys" | "Object.values" | "Object.entries" => {
            let entries: Vec<(String, Value)> = match arg(&args, 0) {
                Value::Object(map) => map.into_iter().collect(),
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v))
                    .collect(),
                _ => Vec::new(),
            };
            Value::Array(
                entries
                    .into_iter()
                    .map(|(k, v)| match name {
                        "Object.keys" => Value::String(k),
                        "Object.values" => v,
                        _ => Value::Array(vec![Value::String(k), v]),
                    })
                    .collect(),
            )
        }

        "JSON.stringify" => match arg(&args, 0) {
            Value::Undefined | Value::Function(_) | Value::Builtin(_) => Value::Undefined,
            value => Value::String(
                serde_json::to_string(&value.to_json())
                    .map_err(|e| EvalError::thrown(e.to_string()))?,
            ),
        },
        "JSON.parse" => {
            let text = arg(&args, 0).to_string();
            let json: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| EvalError::thrown(format!("SyntaxError: {}", e)))?;
            Value::from_json(&json)
        }

        "Math.abs" => Value::Number(number(0).abs()),
        "Math.ceil" => Value::Number(number(0).ceil()),
        "Math.floor" => Value::Number(number(0).floor()),
        "Math.round" => Value::Number((number(0) + 0.5).floor()),
        "Math.sqrt" => Value::Number(number(0).sqrt()),
        "Math.pow" => Value::Number(number(0).powf(number(1))),
        "Math.random" => Value::Number(rand::random::<f64>()),
        "Math.min" | "Math.max" => {
            let is_min = name == "Math.min";
            let mut result = if is_min {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
            for value in &args {
                let n = value.to_number();
                if n.is_nan() {
                    result = f64::NAN;
                    break;
                }
                result = if is_min { result.min(n) } else { result.max(n) };
            }
            Value::Number(result)
        }

        "console.log" | "console.info" | "console.warn" | "console.error" | "console.debug" => {
            let level = match name {
                "console.warn" => LogLevel::Warn,
                "console.error" => LogLevel::Error,
                "console.info" => LogLevel::Info,
                _ => LogLevel::Log,
            };
            let message = args.iter().map(log_repr).collect::<Vec<_>>().join(" ");
            interp.host().log(level, &message);
            Value::Undefined
        }

        _ => {
            return interp
                .host()
                .call_function(name, &args)
                .unwrap_or_else(|| Err(EvalError::not_callable(name)))
        }
    };

    Ok(value)
}

fn log_repr(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => value.to_json().to_string(),
        other => other.to_string(),
    }
}

fn string_method(s: &str, name: &str, args: &[Value]) -> EvalResult<Value> {
    let text = |i: usize| arg(args, i).to_string();
    let chars: Vec<char> = s.chars().collect();

    let value = match name {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim().to_string()),
        "toString" => Value::String(s.to_string()),
        "includes" => Value::Bool(s.contains(&text(0))),
        "startsWith" => Value::Bool(s.starts_with(&text(0))),
        "endsWith" => Value::Bool(s.ends_with(&text(0))),
        "indexOf" => Value::Number(match s.find(&text(0)) {
            Some(byte) => s[..byte].chars().count() as f64,
            None => -1.0,
        }),
        "split" => Value::Array(match arg(args, 0) {
            Value::Undefined => vec![Value::String(s.to_string())],
            separator => {
                let separator = separator.to_string();
                if separator.is_empty() {
                    chars.iter().map(|c| Value::String(c.to_string())).collect()
                } else {
                    s.split(separator.as_str())
                        .map(|part| Value::String(part.to_string()))
                        .collect()
                }
            }
        }),
        "replace" => Value::String(s.replacen(&text(0), &text(1), 1)),
        "replaceAll" => Value::String(s.replace(&text(0), &text(1))),
        "slice" => {
            let (start, end) = relative_range(chars.len(), &arg(args, 0), &arg(args, 1));
            Value::String(chars[start..end.max(start)].iter().collect())
        }
        "substring" => {
            let clamp = |v: Value, default: usize| match v {
                Value::Undefined => default,
                v => clamp_index(v.to_number(), chars.len()),
            };
            let a = clamp(arg(args, 0), 0);
            let b = clamp(arg(args, 1), chars.len());
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            Value::String(chars[start..end].iter().collect())
        }
        "padStart" => {
            let width = clamp_index(arg(args, 0).to_number(), usize::MAX);
            let fill = match arg(args, 1) {
                Value::Undefined => " ".to_string(),
                fill => fill.to_string(),
            };
            if width <= chars.len() || fill.is_empty() {
                Value::String(s.to_string())
            } else {
                let padding: String = fill.chars().cycle().take(width - chars.len()).collect();
                Value::String(format!("{}{}", padding, s))
            }
        }
        "charAt" => {
            let index = clamp_index(arg(args, 0).to_number(), usize::MAX);
            Value::String(chars.get(index).map(|c| c.to_string()).unwrap_or_default())
        }
        other => return Err(EvalError::not_callable(format!("string.{}", other))),
    };

    Ok(value)
}

fn number_method(receiver: &Value, name: &str, args: &[Value]) -> EvalResult<Value> {
    match name {
        "toFixed" => {
            let digits = clamp_index(arg(args, 0).to_number(), 100);
            let n = receiver.to_number();
            if n.is_finite() {
                Ok(Value::String(format!("{:.*}", digits, n)))
            } else {
                Ok(Value::String(format_number(n)))
            }
        }
        "toString" => Ok(Value::String(receiver.to_string())),
        other => Err(EvalError::not_callable(format!("number.{}", other))),
    }
}

fn array_method(
    interp: &mut Interpreter<'_>,
    items: &[Value],
    name: &str,
    args: Vec<Value>,
) -> EvalResult<Value> {
    let callback = arg(&args, 0);
    let mut apply = |interp: &mut Interpreter<'_>, item: &Value, index: usize| {
        interp.call_value(&callback, vec![item.clone(), Value::Number(index as f64)])
    };

    let value = match name {
        "includes" => Value::Bool(items.iter().any(|v| v.strict_equals(&arg(&args, 0)))),
        "indexOf" => Value::Number(
            collection::index_of(items, &arg(&args, 0))
                .map(|i| i as f64)
                .unwrap_or(-1.0),
        ),
        "join" | "toString" => {
            let separator = match arg(&args, 0) {
                Value::Undefined => ",".to_string(),
                sep if name == "join" => sep.to_string(),
                _ => ",".to_string(),
            };
            Value::String(
                items
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
                    .collect::<Vec<_>>()
                    .join(&separator),
            )
        }
        "map" => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(apply(interp, item, i)?);
            }
            Value::Array(out)
        }
        "filter" => {
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if apply(interp, item, i)?.is_truthy() {
                    out.push(item.clone());
                }
            }
            Value::Array(out)
        }
        "find" | "findIndex" => {
            let mut found = None;
            for (i, item) in items.iter().enumerate() {
                if apply(interp, item, i)?.is_truthy() {
                    found = Some(i);
                    break;
                }
            }
            match (name, found) {
                ("find", Some(i)) => items[i].clone(),
                ("find", None) => Value::Undefined,
                (_, Some(i)) => Value::Number(i as f64),
                (_, None) => Value::Number(-1.0),
            }
        }
        "some" => {
            let mut result = false;
            for (i, item) in items.iter().enumerate() {
                if apply(interp, item, i)?.is_truthy() {
                    result = true;
                    break;
                }
            }
            Value::Bool(result)
        }
        "every" => {
            let mut result = true;
            for (i, item) in items.iter().enumerate() {
                if !apply(interp, item, i)?.is_truthy() {
                    result = false;
                    break;
                }
            }
            Value::Bool(result)
        }
        "forEach" => {
            for (i, item) in items.iter().enumerate() {
                apply(interp, item, i)?;
            }
            Value::Undefined
        }
        "reduce" => {
            let mut iter = items.iter().enumerate();
            let mut accumulator = match args.get(1) {
                Some(initial) => initial.clone(),
                None => match iter.next() {
                    Some((_, first)) => first.clone(),
                    None => {
                        return Err(EvalError::type_error(
                            "Reduce of empty array with no initial value",
                        ))
                    }
                },
            };
            for (i, item) in iter {
                accumulator = interp.call_value(
                    &callback,
                    vec![accumulator, item.clone(), Value::Number(i as f64)],
                )?;
            }
            accumulator
        }
        "concat" => {
            let mut out = items.to_vec();
            for value in args.iter() {
                match value {
                    Value::Array(more) => out.extend(more.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Value::Array(out)
        }
        "slice" => {
            let (start, end) = relative_range(items.len(), &arg(&args, 0), &arg(&args, 1));
            Value::Array(items[start..end.max(start)].to_vec())
        }
        "reverse" => Value::Array(items.iter().rev().cloned().collect()),
        "sort" => {
            let mut out = items.to_vec();
            // Stable insertion sort; the comparator may call back into the interpreter
            for i in 1..out.len() {
                let mut j = i;
                while j > 0 {
                    let greater = match &callback {
                        Value::Undefined => out[j - 1].to_string() > out[j].to_string(),
                        compare => {
                            interp
                                .call_value(compare, vec![out[j - 1].clone(), out[j].clone()])?
                                .to_number()
                                > 0.0
                        }
                    };
                    if !greater {
                        break;
                    }
                    out.swap(j - 1, j);
                    j -= 1;
                }
            }
            Value::Array(out)
        }

        "nextItem" => collection::next_item(items, &arg(&args, 0)),
        "previousItem" => collection::previous_item(items, &arg(&args, 0)),
        "first" => collection::first(items),
        "last" => collection::last(items),
        "toggle" => Value::Array(collection::toggle(items, &arg(&args, 0))),
        "add" => Value::Array(collection::add(items, &arg(&args, 0))),
        "remove" => Value::Array(collection::remove(items, &arg(&args, 0))),
        "subtract" => Value::Array(collection::subtract(
            items,
            arg(&args, 0).as_array().unwrap_or_default(),
        )),
        "search" => Value::Array(collection::search(items, &arg(&args, 0).to_string())),

        other => return Err(EvalError::not_callable(format!("array.{}", other))),
    };

    Ok(value)
}

/// Start/end of a `slice` call with negative indices counted from the end
fn relative_range(len: usize, start: &Value, end: &Value) -> (usize, usize) {
    let resolve = |value: &Value, default: usize| {
        if matches!(value, Value::Undefined) {
            return default;
        }
        let n = value.to_number();
        if n.is_nan() {
            0
        } else if n < 0.0 {
            (len as f64 + n.trunc()).max(0.0) as usize
        } else {
            (n.trunc() as usize).min(len)
        }
    };
    (resolve(start, 0), resolve(end, len))
}

fn clamp_index(n: f64, max: usize) -> usize {
    if n.is_nan() || n <= 0.0 {
        0
    } else {
        (n.trunc() as usize).min(max)
    }
}

fn parse_int(text: &str, radix: Option<u32>) -> f64 {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (radix, digits) = match radix {
        Some(16) | None
            if digits.starts_with("0x") || digits.starts_with("0X") =>
        {
            (16, &digits[2..])
        }
        None | Some(0) => (10, digits),
        Some(radix) if (2..=36).contains(&radix) => (radix, digits),
        Some(_) => return f64::NAN,
    };

    let prefix: String = digits.chars().take_while(|c| c.is_digit(radix)).collect();
    if prefix.is_empty() {
        return f64::NAN;
    }
    let value = prefix
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * radix as f64 + d as f64);
    if negative {
        -value
    } else {
        value
    }
}

fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    if text.starts_with("Infinity") || text.starts_with("+Infinity") {
        return f64::INFINITY;
    }
    if text.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }

    // Longest prefix that parses as a number
    let candidate: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .collect();
    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Object from string keys, used by hosts building event objects
pub fn object<I, K>(entries: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Object(
        entries
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<Object>(),
    )
}
