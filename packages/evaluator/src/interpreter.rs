//! AST-walking interpreter for binding expressions and statement sequences.

use crate::builtins;
use crate::error::{EvalError, EvalResult};
use crate::host::Host;
use crate::value::{format_number, Builtin, Closure, Namespace, Object, Value};
use minibind_parser::ast::*;
use minibind_parser::parse_source;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

/// Nested closure calls allowed before evaluation is aborted
pub const MAX_CALL_DEPTH: usize = 64;

/// Element methods resolved through [`Host::call_method`]
const NODE_METHODS: &[&str] = &[
    "getAttribute",
    "setAttribute",
    "removeAttribute",
    "hasAttribute",
    "focus",
    "blur",
    "querySelector",
    "querySelectorAll",
];

/// Evaluation context: `this`, the triggering event and local bindings
#[derive(Debug, Clone)]
pub struct Frame {
    pub this: Value,
    pub event: Option<Value>,
    locals: Vec<HashMap<String, Value>>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            this: Value::Undefined,
            event: None,
            locals: vec![HashMap::new()],
        }
    }

    pub fn with_this(this: Value) -> Self {
        Self {
            this,
            ..Self::new()
        }
    }

    pub fn with_event(mut self, event: Value) -> Self {
        self.event = Some(event);
        self
    }

    /// Bind a local in the innermost block
    pub fn bind(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.iter().rev().find_map(|scope| scope.get(name))
    }

    fn set_local(&mut self, name: &str, value: Value) -> Result<(), Value> {
        match self
            .locals
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
        {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(value),
        }
    }

    fn push(&mut self) {
        self.locals.push(HashMap::new());
    }

    fn pop(&mut self) {
        if self.locals.len() > 1 {
            self.locals.pop();
        }
    }

    fn captured(&self) -> HashMap<String, Value> {
        let mut captured = HashMap::new();
        if let Some(event) = &self.event {
            captured.insert("event".to_string(), event.clone());
        }
        for scope in &self.locals {
            for (name, value) in scope {
                captured.insert(name.clone(), value.clone());
            }
        }
        captured
    }
}

enum Flow {
    Normal(Value),
    Return(Value),
}

pub struct Interpreter<'h> {
    host: &'h mut dyn Host,
    depth: usize,
}

/// Parse and evaluate `text` (expression, or statements when it is not one)
pub fn evaluate(text: &str, host: &mut dyn Host, frame: &mut Frame) -> EvalResult<Value> {
    let source = parse_source(text)?;
    Interpreter::new(host).run(&source, frame)
}

impl<'h> Interpreter<'h> {
    pub fn new(host: &'h mut dyn Host) -> Self {
        Self { host, depth: 0 }
    }

    pub fn host(&mut self) -> &mut (dyn Host + 'h) {
        &mut *self.host
    }

    /// Expressions yield their value; statement sequences yield the value of
    /// a `return` or of the last expression statement
    pub fn run(&mut self, source: &Source, frame: &mut Frame) -> EvalResult<Value> {
        match source {
            Source::Expression(expr) => self.eval(expr, frame),
            Source::Program(program) => match self.exec_all(&program.body, frame)? {
                Flow::Normal(value) | Flow::Return(value) => Ok(value),
            },
        }
    }

    fn exec_all(&mut self, body: &[Statement], frame: &mut Frame) -> EvalResult<Flow> {
        let mut last = Value::Undefined;
        for statement in body {
            match self.exec(statement, frame)? {
                Flow::Normal(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn exec(&mut self, statement: &Statement, frame: &mut Frame) -> EvalResult<Flow> {
        match statement {
            Statement::Expression(expr) => Ok(Flow::Normal(self.eval(expr, frame)?)),
            Statement::Declare { name, init, .. } => {
                let value = match init {
                    Some(init) => self.eval(init, frame)?,
                    None => Value::Undefined,
                };
                frame.bind(name, value);
                Ok(Flow::Normal(Value::Undefined))
            }
            Statement::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                if self.eval(test, frame)?.is_truthy() {
                    self.exec(consequent, frame)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate, frame)
                } else {
                    Ok(Flow::Normal(Value::Undefined))
                }
            }
            Statement::Block { body, .. } => {
                frame.push();
                let flow = self.exec_all(body, frame);
                frame.pop();
                flow
            }
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.eval(value, frame)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Statement::Empty { .. } => Ok(Flow::Normal(Value::Undefined)),
        }
    }

    pub fn eval(&mut self, expr: &Expression, frame: &mut Frame) -> EvalResult<Value> {
        match expr {
            Expression::Number { value, .. } => Ok(Value::Number(*value)),
            Expression::String { value, .. } => Ok(Value::String(value.clone())),
            Expression::Boolean { value, .. } => Ok(Value::Bool(*value)),
            Expression::Null { .. } => Ok(Value::Null),
            Expression::Undefined { .. } => Ok(Value::Undefined),
            Expression::This { .. } => Ok(frame.this.clone()),

            Expression::Template { parts, .. } => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Literal(text) => out.push_str(text),
                        TemplatePart::Expression(expr) => {
                            out.push_str(&self.eval(expr, frame)?.to_string())
                        }
                    }
                }
                Ok(Value::String(out))
            }

            Expression::Identifier { name, .. } => self.lookup(name, frame),

            Expression::Array { elements, .. } => Ok(Value::Array(self.eval_items(elements, frame)?)),

            Expression::Object { properties, .. } => {
                let mut object = Object::new();
                for property in properties {
                    match property {
                        Property::KeyValue { key, value, .. } => {
                            let key = match key {
                                PropertyKey::Named { name, .. } => name.clone(),
                                PropertyKey::Computed(expr) => {
                                    property_key(&self.eval(expr, frame)?)
                                }
                            };
                            let value = self.eval(value, frame)?;
                            object.insert(key, value);
                        }
                        Property::Shorthand { name, .. } => {
                            let value = self.lookup(name, frame)?;
                            object.insert(name.clone(), value);
                        }
                        Property::Spread(expr) => match self.eval(expr, frame)? {
                            Value::Object(other) => object.extend(other),
                            Value::Array(items) => {
                                for (i, item) in items.into_iter().enumerate() {
                                    object.insert(i.to_string(), item);
                                }
                            }
                            _ => {}
                        },
                    }
                }
                Ok(Value::Object(object))
            }

            Expression::Member {
                object,
                property,
                optional,
                ..
            } => {
                let object = self.eval(object, frame)?;
                self.get_member(&object, property, *optional)
            }

            Expression::Index {
                object,
                index,
                optional,
                ..
            } => {
                let object = self.eval(object, frame)?;
                if *optional && object.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = property_key(&self.eval(index, frame)?);
                self.get_member(&object, &key, *optional)
            }

            Expression::Call {
                callee,
                arguments,
                optional,
                ..
            } => {
                let function = self.eval(callee, frame)?;
                if *optional && function.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let args = self.eval_items(arguments, frame)?;
                if !function.is_callable() {
                    return Err(EvalError::not_callable(describe(callee)));
                }
                self.call_value(&function, args)
            }

            Expression::Unary {
                operator, operand, ..
            } => {
                let value = self.eval(operand, frame)?;
                Ok(match operator {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Negate => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Typeof => Value::string(value.type_of()),
                })
            }

            Expression::Binary {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                binary(*operator, &left, &right)
            }

            Expression::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.eval(left, frame)?;
                let short_circuit = match operator {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, frame)
                }
            }

            Expression::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                if self.eval(test, frame)?.is_truthy() {
                    self.eval(consequent, frame)
                } else {
                    self.eval(alternate, frame)
                }
            }

            Expression::Assign {
                target,
                operator,
                value,
                ..
            } => self.eval_assign(target, *operator, value, frame),

            Expression::Update {
                target,
                operator,
                prefix,
                ..
            } => {
                let old = self.eval(target, frame)?.to_number();
                let new = match operator {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.assign_to(target, Value::Number(new), frame)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }

            Expression::Arrow { params, body, .. } => Ok(Value::Function(Rc::new(Closure {
                params: params.clone(),
                body: body.clone(),
                captured: frame.captured(),
                this: frame.this.clone(),
            }))),
        }
    }

    fn eval_items(&mut self, items: &[ListItem], frame: &mut Frame) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ListItem::Item(expr) => values.push(self.eval(expr, frame)?),
                ListItem::Spread(expr) => match self.eval(expr, frame)? {
                    Value::Array(items) => values.extend(items),
                    Value::String(s) => values.extend(s.chars().map(|c| Value::String(c.into()))),
                    other => {
                        return Err(EvalError::type_error(format!("{} is not iterable", other)))
                    }
                },
            }
        }
        Ok(values)
    }

    fn lookup(&mut self, name: &str, frame: &Frame) -> EvalResult<Value> {
        if let Some(value) = frame.local(name) {
            return Ok(value.clone());
        }
        if name == "event" {
            if let Some(event) = &frame.event {
                return Ok(event.clone());
            }
        }
        match name {
            "window" => return Ok(Value::Namespace(Namespace::Window)),
            "console" => return Ok(Value::Namespace(Namespace::Console)),
            "__scopes" => return Ok(Value::Namespace(Namespace::Scopes)),
            "document" => return Ok(self.host.document()),
            "$" => return Ok(Value::Builtin(Builtin::global("$"))),
            _ => {}
        }
        Ok(self.lookup_global(name))
    }

    /// Host namespace first, then host functions, then the built-in set
    fn lookup_global(&mut self, name: &str) -> Value {
        if let Some(value) = self.host.lookup(name) {
            return value;
        }
        if self.host.has_function(name) {
            return Value::Builtin(Builtin::global(name));
        }
        builtins::global(name).unwrap_or(Value::Undefined)
    }

    pub fn get_member(&mut self, object: &Value, key: &str, optional: bool) -> EvalResult<Value> {
        match object {
            Value::Undefined | Value::Null => {
                if optional {
                    Ok(Value::Undefined)
                } else {
                    Err(EvalError::type_error(format!(
                        "Cannot read properties of {} (reading '{}')",
                        object, key
                    )))
                }
            }
            Value::Namespace(namespace) => self.namespace_member(namespace, key),
            Value::Node(node) => {
                if NODE_METHODS.contains(&key) {
                    Ok(Value::Builtin(Builtin::method(key, object.clone())))
                } else {
                    self.host.get_property(*node, key)
                }
            }
            Value::String(s) => {
                if key == "length" {
                    Ok(Value::Number(s.chars().count() as f64))
                } else if let Ok(index) = key.parse::<usize>() {
                    Ok(s.chars()
                        .nth(index)
                        .map(|c| Value::String(c.into()))
                        .unwrap_or(Value::Undefined))
                } else if builtins::is_string_method(key) {
                    Ok(Value::Builtin(Builtin::method(key, object.clone())))
                } else {
                    Ok(Value::Undefined)
                }
            }
            Value::Array(items) => {
                if key == "length" {
                    Ok(Value::Number(items.len() as f64))
                } else if let Ok(index) = key.parse::<usize>() {
                    Ok(items.get(index).cloned().unwrap_or(Value::Undefined))
                } else if key == "first" || key == "last" {
                    // Getter-style collection accessors
                    builtins::call(self, &Builtin::method(key, object.clone()), Vec::new())
                } else if builtins::is_array_method(key) {
                    Ok(Value::Builtin(Builtin::method(key, object.clone())))
                } else {
                    Ok(Value::Undefined)
                }
            }
            Value::Object(map) => Ok(map.get(key).cloned().unwrap_or(Value::Undefined)),
            Value::Number(_) | Value::Bool(_) => {
                if builtins::is_number_method(key) {
                    Ok(Value::Builtin(Builtin::method(key, object.clone())))
                } else {
                    Ok(Value::Undefined)
                }
            }
            Value::Function(_) | Value::Builtin(_) => Ok(Value::Undefined),
        }
    }

    fn namespace_member(&mut self, namespace: &Namespace, key: &str) -> EvalResult<Value> {
        match namespace {
            Namespace::Window => Ok(self.lookup_global(key)),
            Namespace::Scopes => Ok(Value::Namespace(Namespace::Scope(key.to_string()))),
            Namespace::Scope(id) => self.host.scoped_get(id, key),
            other => Ok(builtins::namespace_member(other, key)),
        }
    }

    /// Invoke a callable value
    pub fn call_value(&mut self, function: &Value, args: Vec<Value>) -> EvalResult<Value> {
        match function {
            Value::Function(closure) => self.call_closure(closure, args),
            Value::Builtin(builtin) => builtins::call(self, builtin, args),
            other => Err(EvalError::not_callable(other.to_string())),
        }
    }

    fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvalError::DepthExceeded {
                limit: MAX_CALL_DEPTH,
            });
        }

        let mut frame = Frame {
            this: closure.this.clone(),
            event: None,
            locals: vec![closure.captured.clone()],
        };
        frame.push();
        let mut args = args.into_iter();
        for param in &closure.params {
            frame.bind(&param.name, args.next().unwrap_or(Value::Undefined));
        }

        self.depth += 1;
        trace!(depth = self.depth, "calling closure");
        let result = match &closure.body {
            ArrowBody::Expression(body) => self.eval(body, &mut frame),
            ArrowBody::Block(body) => self.exec_all(body, &mut frame).map(|flow| match flow {
                Flow::Return(value) => value,
                Flow::Normal(_) => Value::Undefined,
            }),
        };
        self.depth -= 1;
        result
    }

    fn eval_assign(
        &mut self,
        target: &Expression,
        operator: AssignOp,
        value: &Expression,
        frame: &mut Frame,
    ) -> EvalResult<Value> {
        if !target.is_assignable() {
            return Err(EvalError::invalid_assignment(describe(target)));
        }

        let new_value = match operator {
            AssignOp::Assign => self.eval(value, frame)?,
            AssignOp::Nullish | AssignOp::Or | AssignOp::And => {
                let current = self.eval(target, frame)?;
                let keep = match operator {
                    AssignOp::Nullish => !current.is_nullish(),
                    AssignOp::Or => current.is_truthy(),
                    _ => !current.is_truthy(),
                };
                if keep {
                    return Ok(current);
                }
                self.eval(value, frame)?
            }
            compound => {
                let current = self.eval(target, frame)?;
                let right = self.eval(value, frame)?;
                match compound.binary() {
                    Some(op) => binary(op, &current, &right)?,
                    None => right,
                }
            }
        };

        self.assign_to(target, new_value.clone(), frame)?;
        Ok(new_value)
    }

    /// Write `value` to an assignable expression; nested array/object slots
    /// are written back to their container as a whole
    fn assign_to(&mut self, target: &Expression, value: Value, frame: &mut Frame) -> EvalResult<()> {
        let (object, key) = match target {
            Expression::Identifier { name, .. } => {
                return match frame.set_local(name, value) {
                    Ok(()) => Ok(()),
                    Err(value) => self.host.assign(name, value),
                };
            }
            Expression::Member {
                object, property, ..
            } => (object, property.clone()),
            Expression::Index { object, index, .. } => {
                let key = property_key(&self.eval(index, frame)?);
                (object, key)
            }
            other => return Err(EvalError::invalid_assignment(describe(other))),
        };

        match self.eval(object, frame)? {
            Value::Namespace(Namespace::Window) => self.host.assign(&key, value),
            Value::Namespace(Namespace::Scope(id)) => self.host.scoped_set(&id, &key, value),
            Value::Node(node) => self.host.set_property(node, &key, value),
            Value::Object(mut map) => {
                map.insert(key, value);
                self.assign_to(object, Value::Object(map), frame)
            }
            Value::Array(mut items) => {
                let index = key
                    .parse::<usize>()
                    .map_err(|_| EvalError::invalid_assignment(describe(target)))?;
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
                self.assign_to(object, Value::Array(items), frame)
            }
            container @ (Value::Undefined | Value::Null) => Err(EvalError::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                container, key
            ))),
            _ => Err(EvalError::invalid_assignment(describe(target))),
        }
    }
}

/// Property key of a computed member access
fn property_key(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(*n),
        other => other.to_string(),
    }
}

pub(crate) fn binary(operator: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    let number = |f: fn(f64, f64) -> f64| Ok(Value::Number(f(left.to_number(), right.to_number())));

    match operator {
        BinaryOp::Add => {
            let numeric = |v: &Value| {
                matches!(
                    v,
                    Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
                )
            };
            if numeric(left) && numeric(right) {
                Ok(Value::Number(left.to_number() + right.to_number()))
            } else {
                Ok(Value::String(format!("{}{}", left, right)))
            }
        }
        BinaryOp::Subtract => number(|a, b| a - b),
        BinaryOp::Multiply => number(|a, b| a * b),
        BinaryOp::Divide => number(|a, b| a / b),
        BinaryOp::Remainder => number(|a, b| a % b),
        BinaryOp::Exponent => number(f64::powf),
        BinaryOp::Equals => Ok(Value::Bool(left.loose_equals(right))),
        BinaryOp::NotEquals => Ok(Value::Bool(!left.loose_equals(right))),
        BinaryOp::StrictEquals => Ok(Value::Bool(left.strict_equals(right))),
        BinaryOp::StrictNotEquals => Ok(Value::Bool(!left.strict_equals(right))),
        BinaryOp::LessThan
        | BinaryOp::LessThanOrEqual
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanOrEqual => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let result = match ordering {
                None => false,
                Some(ordering) => match operator {
                    BinaryOp::LessThan => ordering.is_lt(),
                    BinaryOp::LessThanOrEqual => ordering.is_le(),
                    BinaryOp::GreaterThan => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::In => {
            let key = property_key(left);
            match right {
                Value::Object(map) => Ok(Value::Bool(map.contains_key(&key))),
                Value::Array(items) => Ok(Value::Bool(
                    key == "length" || key.parse::<usize>().is_ok_and(|i| i < items.len()),
                )),
                other => Err(EvalError::type_error(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    key, other
                ))),
            }
        }
    }
}

/// Short source-like description of an expression for error messages
fn describe(expr: &Expression) -> String {
    match expr {
        Expression::Identifier { name, .. } => name.clone(),
        Expression::This { .. } => "this".to_string(),
        Expression::Member {
            object, property, ..
        } => format!("{}.{}", describe(object), property),
        Expression::Index { object, .. } => format!("{}[...]", describe(object)),
        Expression::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}
