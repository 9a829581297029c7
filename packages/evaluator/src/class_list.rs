//! `:class` micro-syntax.
//!
//! The expression is either an object mapping class tokens to conditions
//! (`{ 'bg-red text-white': hasError, hidden: !open }`) or anything that
//! evaluates to a class string. Every token the expression could produce is a
//! candidate; the applied list is the base classes without the candidates,
//! followed by the tokens the evaluation actually selected.

use crate::error::EvalResult;
use crate::host::Host;
use crate::interpreter::{Frame, Interpreter};
use crate::value::Value;
use minibind_parser::ast::*;
use minibind_parser::parse_source;

/// Evaluate `text` and return the net class string for an element whose
/// original classes are `base`
pub fn evaluate_class_list(
    text: &str,
    base: &[String],
    host: &mut dyn Host,
    frame: &mut Frame,
) -> EvalResult<String> {
    let source = parse_source(text)?;
    let candidates = class_candidates(&source);
    let value = Interpreter::new(host).run(&source, frame)?;
    Ok(net_class_list(base, &candidates, &selected_classes(&value)))
}

/// Tokens named by string literals and object keys anywhere in the expression
pub fn class_candidates(source: &Source) -> Vec<String> {
    let mut tokens = Vec::new();
    match source {
        Source::Expression(expr) => collect_expression(expr, &mut tokens),
        Source::Program(program) => {
            for statement in &program.body {
                collect_statement(statement, &mut tokens);
            }
        }
    }
    tokens
}

/// Tokens chosen by an evaluated class expression
pub fn selected_classes(value: &Value) -> Vec<String> {
    let mut tokens = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, condition) in map {
                if condition.is_truthy() {
                    push_tokens(&mut tokens, key);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                tokens.extend(selected_classes(item));
            }
        }
        Value::String(s) => push_tokens(&mut tokens, s),
        _ => {}
    }
    tokens
}

pub fn net_class_list(base: &[String], candidates: &[String], selected: &[String]) -> String {
    let mut classes: Vec<&str> = Vec::new();
    let base_tokens = base.iter().flat_map(|b| b.split_whitespace());

    for token in base_tokens.filter(|t| !candidates.iter().any(|c| c == t)) {
        if !classes.contains(&token) {
            classes.push(token);
        }
    }
    for token in selected {
        if !classes.contains(&token.as_str()) {
            classes.push(token);
        }
    }

    classes.join(" ")
}

fn push_tokens(tokens: &mut Vec<String>, text: &str) {
    for token in text.split_whitespace() {
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
}

fn collect_statement(statement: &Statement, tokens: &mut Vec<String>) {
    match statement {
        Statement::Expression(expr) => collect_expression(expr, tokens),
        Statement::Declare { init, .. } => {
            if let Some(init) = init {
                collect_expression(init, tokens);
            }
        }
        Statement::If {
            test,
            consequent,
            alternate,
            ..
        } => {
            collect_expression(test, tokens);
            collect_statement(consequent, tokens);
            if let Some(alternate) = alternate {
                collect_statement(alternate, tokens);
            }
        }
        Statement::Block { body, .. } => {
            for statement in body {
                collect_statement(statement, tokens);
            }
        }
        Statement::Return { value, .. } => {
            if let Some(value) = value {
                collect_expression(value, tokens);
            }
        }
        Statement::Empty { .. } => {}
    }
}

fn collect_expression(expr: &Expression, tokens: &mut Vec<String>) {
    match expr {
        Expression::String { value, .. } => push_tokens(tokens, value),
        Expression::Template { parts, .. } => {
            for part in parts {
                match part {
                    TemplatePart::Literal(text) => push_tokens(tokens, text),
                    TemplatePart::Expression(expr) => collect_expression(expr, tokens),
                }
            }
        }
        Expression::Object { properties, .. } => {
            for property in properties {
                match property {
                    Property::KeyValue { key, value, .. } => {
                        match key {
                            PropertyKey::Named { name, .. } => push_tokens(tokens, name),
                            PropertyKey::Computed(key) => collect_expression(key, tokens),
                        }
                        collect_expression(value, tokens);
                    }
                    Property::Shorthand { name, .. } => push_tokens(tokens, name),
                    Property::Spread(expr) => collect_expression(expr, tokens),
                }
            }
        }
        Expression::Array { elements, .. } => collect_items(elements, tokens),
        Expression::Call {
            callee, arguments, ..
        } => {
            collect_expression(callee, tokens);
            collect_items(arguments, tokens);
        }
        Expression::Member { object, .. } => collect_expression(object, tokens),
        Expression::Index { object, index, .. } => {
            collect_expression(object, tokens);
            collect_expression(index, tokens);
        }
        Expression::Unary { operand, .. } => collect_expression(operand, tokens),
        Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
            collect_expression(left, tokens);
            collect_expression(right, tokens);
        }
        Expression::Conditional {
            test,
            consequent,
            alternate,
            ..
        } => {
            collect_expression(test, tokens);
            collect_expression(consequent, tokens);
            collect_expression(alternate, tokens);
        }
        Expression::Assign { value, .. } => collect_expression(value, tokens),
        Expression::Arrow { body, .. } => match body {
            ArrowBody::Expression(body) => collect_expression(body, tokens),
            ArrowBody::Block(body) => {
                for statement in body {
                    collect_statement(statement, tokens);
                }
            }
        },
        Expression::Number { .. }
        | Expression::Boolean { .. }
        | Expression::Null { .. }
        | Expression::Undefined { .. }
        | Expression::This { .. }
        | Expression::Identifier { .. }
        | Expression::Update { .. } => {}
    }
}

fn collect_items(items: &[ListItem], tokens: &mut Vec<String>) {
    for item in items {
        match item {
            ListItem::Item(expr) | ListItem::Spread(expr) => collect_expression(expr, tokens),
        }
    }
}
