//! # Identifier Analyzer
//!
//! Classifies the identifiers of binding expression text into three roles:
//!
//! - **referenced**: names read as bare values (`count`, `f(x)`)
//! - **member**: roots of property-access chains (`user` in `user.name`)
//! - **assigned**: targets of assignment or update (`count` in `count++`)
//!
//! Classification is purely syntactic. Nothing here knows whether a name
//! exists when the expression is finally evaluated.
//!
//! Chains rooted at the scoped-variable root `el` are reported with their
//! first property attached (`el.count`), which is the key the binding engine
//! uses for per-scope storage.

use crate::ast::*;
use crate::error::ParseResult;
use crate::parser::parse_source;
use crate::tokenizer::is_reserved_word;
use std::collections::HashSet;

/// Root name of locally scoped variables (`el.count`)
pub const SCOPE_ROOT: &str = "el";

/// Identifier sets produced by [`analyze`], each in first-occurrence order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifiers {
    pub referenced: Vec<String>,
    pub member: Vec<String>,
    pub assigned: Vec<String>,
}

impl Identifiers {
    /// Deduplicated union of all three sets
    pub fn all(&self) -> Vec<String> {
        let mut names = Vec::new();
        for name in self
            .referenced
            .iter()
            .chain(&self.member)
            .chain(&self.assigned)
        {
            push_unique(&mut names, name);
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.referenced.is_empty() && self.member.is_empty() && self.assigned.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub ignored_names: HashSet<String>,
}

impl AnalyzeOptions {
    pub fn ignoring<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored_names: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Referenced,
    Member,
    Assigned,
}

/// One free identifier occurrence in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// Root identifier as written
    pub name: String,
    pub span: Span,
    /// `el.<name>` form and the span covering it, for scoped chains
    pub scoped: Option<(String, Span)>,
    pub role: Role,
    /// Object literal shorthand (`{ count }`)
    pub shorthand: bool,
}

impl Occurrence {
    /// Name reported in the identifier sets
    pub fn reported_name(&self) -> &str {
        match &self.scoped {
            Some((scoped, _)) => scoped,
            None => &self.name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub identifiers: Identifiers,
    pub occurrences: Vec<Occurrence>,
}

/// Classify the identifiers of `source` (an expression or a statement sequence)
pub fn analyze(source: &str, options: &AnalyzeOptions) -> ParseResult<Identifiers> {
    let parsed = parse_source(source)?;
    Ok(analyze_source(&parsed, options).identifiers)
}

/// Walk an already parsed source
pub fn analyze_source(source: &Source, options: &AnalyzeOptions) -> Analysis {
    let mut walker = Walker {
        options,
        scopes: vec![HashSet::new()],
        analysis: Analysis::default(),
    };

    match source {
        Source::Expression(expr) => walker.visit(expr, Access::Read),
        Source::Program(program) => {
            for statement in &program.body {
                walker.visit_statement(statement);
            }
        }
    }

    walker.analysis
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

struct Walker<'a> {
    options: &'a AnalyzeOptions,
    /// Locally bound names (arrow params, declarations)
    scopes: Vec<HashSet<String>>,
    analysis: Analysis,
}

impl<'a> Walker<'a> {
    fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(expr) => self.visit(expr, Access::Read),
            Statement::Declare { name, init, .. } => {
                if let Some(init) = init {
                    self.visit(init, Access::Read);
                }
                self.declare(name);
            }
            Statement::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.visit(test, Access::Read);
                self.visit_statement(consequent);
                if let Some(alternate) = alternate {
                    self.visit_statement(alternate);
                }
            }
            Statement::Block { body, .. } => self.visit_block(body),
            Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.visit(value, Access::Read);
                }
            }
            Statement::Empty { .. } => {}
        }
    }

    fn visit_block(&mut self, body: &[Statement]) {
        self.scopes.push(HashSet::new());
        for statement in body {
            self.visit_statement(statement);
        }
        self.scopes.pop();
    }

    fn visit(&mut self, expr: &Expression, access: Access) {
        match expr {
            Expression::Identifier { name, span } => {
                let role = match access {
                    Access::Read => Role::Referenced,
                    Access::Write => Role::Assigned,
                };
                self.record(name, *span, None, role, false);
            }

            Expression::Member { .. } | Expression::Index { .. } | Expression::Call { .. } => {
                self.visit_chain(expr, access)
            }

            Expression::Assign { target, value, .. } => {
                self.visit(target, Access::Write);
                self.visit(value, Access::Read);
            }

            Expression::Update { target, .. } => self.visit(target, Access::Write),

            Expression::Arrow { params, body, .. } => {
                self.scopes
                    .push(params.iter().map(|p| p.name.clone()).collect());
                match body {
                    ArrowBody::Expression(body) => self.visit(body, Access::Read),
                    ArrowBody::Block(statements) => {
                        for statement in statements {
                            self.visit_statement(statement);
                        }
                    }
                }
                self.scopes.pop();
            }

            Expression::Array { elements, .. } => self.visit_items(elements),

            Expression::Object { properties, .. } => {
                for property in properties {
                    match property {
                        Property::KeyValue { key, value, .. } => {
                            if let PropertyKey::Computed(key) = key {
                                self.visit(key, Access::Read);
                            }
                            self.visit(value, Access::Read);
                        }
                        Property::Shorthand { name, span } => {
                            self.record(name, *span, None, Role::Referenced, true)
                        }
                        Property::Spread(expr) => self.visit(expr, Access::Read),
                    }
                }
            }

            Expression::Template { parts, .. } => {
                for part in parts {
                    if let TemplatePart::Expression(expr) = part {
                        self.visit(expr, Access::Read);
                    }
                }
            }

            Expression::Unary { operand, .. } => self.visit(operand, Access::Read),

            Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
                self.visit(left, Access::Read);
                self.visit(right, Access::Read);
            }

            Expression::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.visit(test, Access::Read);
                self.visit(consequent, Access::Read);
                self.visit(alternate, Access::Read);
            }

            Expression::Number { .. }
            | Expression::String { .. }
            | Expression::Boolean { .. }
            | Expression::Null { .. }
            | Expression::Undefined { .. }
            | Expression::This { .. } => {}
        }
    }

    /// Member/index/call chain: classify the root once, then walk the arguments
    fn visit_chain(&mut self, expr: &Expression, access: Access) {
        // Outermost link first; the last link sits directly on the root
        let mut links = Vec::new();
        let mut root = expr;
        loop {
            match root {
                Expression::Member { object, .. } | Expression::Index { object, .. } => {
                    links.push(root);
                    root = object;
                }
                Expression::Call { callee, .. } => {
                    links.push(root);
                    root = callee;
                }
                _ => break,
            }
        }

        match root {
            Expression::Identifier { name, span } => {
                let scoped = match links.last() {
                    Some(Expression::Member {
                        property,
                        property_span,
                        ..
                    }) if name == SCOPE_ROOT && !self.is_local(name) => Some((
                        format!("{}.{}", SCOPE_ROOT, property),
                        span.to(*property_span),
                    )),
                    _ => None,
                };

                let role = if scoped.is_some() {
                    if access == Access::Write && links.len() == 1 {
                        Role::Assigned
                    } else {
                        Role::Member
                    }
                } else if links
                    .iter()
                    .all(|link| matches!(link, Expression::Call { .. }))
                {
                    // f(x) is a plain reference to f
                    Role::Referenced
                } else {
                    Role::Member
                };

                self.record(name, *span, scoped, role, false);
            }
            other => self.visit(other, Access::Read),
        }

        for link in links.iter().rev() {
            match link {
                Expression::Index { index, .. } => self.visit(index, Access::Read),
                Expression::Call { arguments, .. } => self.visit_items(arguments),
                _ => {}
            }
        }
    }

    fn visit_items(&mut self, items: &[ListItem]) {
        for item in items {
            match item {
                ListItem::Item(expr) | ListItem::Spread(expr) => self.visit(expr, Access::Read),
            }
        }
    }

    fn record(
        &mut self,
        name: &str,
        span: Span,
        scoped: Option<(String, Span)>,
        role: Role,
        shorthand: bool,
    ) {
        if is_reserved_word(name) || self.is_local(name) {
            return;
        }

        let occurrence = Occurrence {
            name: name.to_string(),
            span,
            scoped,
            role,
            shorthand,
        };

        let reported = occurrence.reported_name().to_string();
        let ignored = self.options.ignored_names.contains(name)
            || self.options.ignored_names.contains(&reported);

        if !ignored {
            let identifiers = &mut self.analysis.identifiers;
            let set = match role {
                Role::Referenced => &mut identifiers.referenced,
                Role::Member => &mut identifiers.member,
                Role::Assigned => &mut identifiers.assigned,
            };
            push_unique(set, &reported);
        }

        self.analysis.occurrences.push(occurrence);
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}
