use serde::{Deserialize, Serialize};

/// Byte range of a node within the parsed source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

/// Parsed attribute text: either a single expression or a statement sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Source {
    Expression(Expression),
    Program(Program),
}

/// Statement sequence (event handler bodies, code blocks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Expression(Expression),

    Declare {
        kind: DeclKind,
        name: String,
        name_span: Span,
        init: Option<Expression>,
        span: Span,
    },

    If {
        test: Expression,
        consequent: Box<Statement>,
        alternate: Option<Box<Statement>>,
        span: Span,
    },

    Block { body: Vec<Statement>, span: Span },

    Return { value: Option<Expression>, span: Span },

    Empty { span: Span },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclKind {
    Let,
    Const,
    Var,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Number { value: f64, span: Span },

    String { value: String, span: Span },

    /// Template literal with `${...}` interpolation
    Template { parts: Vec<TemplatePart>, span: Span },

    Boolean { value: bool, span: Span },

    Null { span: Span },

    Undefined { span: Span },

    /// The bound element
    This { span: Span },

    Identifier { name: String, span: Span },

    Array { elements: Vec<ListItem>, span: Span },

    Object { properties: Vec<Property>, span: Span },

    /// `obj.prop` / `obj?.prop`
    Member {
        object: Box<Expression>,
        property: String,
        property_span: Span,
        optional: bool,
        span: Span,
    },

    /// `obj[index]`
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
        optional: bool,
        span: Span,
    },

    Call {
        callee: Box<Expression>,
        arguments: Vec<ListItem>,
        optional: bool,
        span: Span,
    },

    Unary {
        operator: UnaryOp,
        operand: Box<Expression>,
        span: Span,
    },

    Binary {
        left: Box<Expression>,
        operator: BinaryOp,
        right: Box<Expression>,
        span: Span,
    },

    /// Short-circuiting `&&`, `||`, `??`
    Logical {
        left: Box<Expression>,
        operator: LogicalOp,
        right: Box<Expression>,
        span: Span,
    },

    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
        span: Span,
    },

    Assign {
        target: Box<Expression>,
        operator: AssignOp,
        value: Box<Expression>,
        span: Span,
    },

    /// `++x`, `x--`
    Update {
        target: Box<Expression>,
        operator: UpdateOp,
        prefix: bool,
        span: Span,
    },

    Arrow {
        params: Vec<Param>,
        body: ArrowBody,
        span: Span,
    },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Number { span, .. }
            | Expression::String { span, .. }
            | Expression::Template { span, .. }
            | Expression::Boolean { span, .. }
            | Expression::Null { span }
            | Expression::Undefined { span }
            | Expression::This { span }
            | Expression::Identifier { span, .. }
            | Expression::Array { span, .. }
            | Expression::Object { span, .. }
            | Expression::Member { span, .. }
            | Expression::Index { span, .. }
            | Expression::Call { span, .. }
            | Expression::Unary { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Logical { span, .. }
            | Expression::Conditional { span, .. }
            | Expression::Assign { span, .. }
            | Expression::Update { span, .. }
            | Expression::Arrow { span, .. } => *span,
        }
    }

    /// Valid left-hand side of an assignment or update
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expression::Identifier { .. } | Expression::Member { .. } | Expression::Index { .. }
        )
    }
}

/// Array element or call argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListItem {
    Item(Expression),
    Spread(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property {
    KeyValue {
        key: PropertyKey,
        value: Expression,
        span: Span,
    },

    /// `{ count }`
    Shorthand { name: String, span: Span },

    Spread(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyKey {
    /// Identifier, string or number key
    Named { name: String, span: Span },

    /// `[expr]`
    Computed(Expression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrowBody {
    Expression(Box<Expression>),
    Block(Vec<Statement>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplatePart {
    Literal(String),
    Expression(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Exponent,
    Equals,
    NotEquals,
    StrictEquals,
    StrictNotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Remainder => "%",
            BinaryOp::Exponent => "**",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::StrictEquals => "===",
            BinaryOp::StrictNotEquals => "!==",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Exponent,
    Nullish,
    Or,
    And,
}

impl AssignOp {
    /// Binary operator applied by a compound assignment
    pub fn binary(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Subtract => Some(BinaryOp::Subtract),
            AssignOp::Multiply => Some(BinaryOp::Multiply),
            AssignOp::Divide => Some(BinaryOp::Divide),
            AssignOp::Remainder => Some(BinaryOp::Remainder),
            AssignOp::Exponent => Some(BinaryOp::Exponent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

/// `item[, index] in iterable` header of an `:each` binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EachHeader {
    pub item: String,
    pub index: Option<String>,
    /// Iterable expression text, exactly as written
    pub iterable_source: String,
    pub iterable: Expression,
}
