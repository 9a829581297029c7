use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Token types for binding expression text
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token<'src> {
    // Keywords and literals
    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    #[token("undefined")]
    Undefined,

    #[token("this")]
    This,

    #[token("typeof")]
    Typeof,

    #[token("in")]
    In,

    #[token("let")]
    Let,

    #[token("const")]
    Const,

    #[token("var")]
    Var,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("return")]
    Return,

    // `$` on its own is an identifier (the query shortcut)
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice())]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| lex.slice())]
    String(&'src str),

    #[regex(r"`([^`\\]|\\.)*`", |lex| lex.slice())]
    Template(&'src str),

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    #[regex(r"\.[0-9]+", |lex| lex.slice())]
    Number(&'src str),

    // Delimiters
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[token("?.")]
    QuestionDot,

    #[token("...")]
    Ellipsis,

    #[token("=>")]
    Arrow,

    #[token("?")]
    Question,

    // Operators
    #[token("=")]
    Equals,

    #[token("+=")]
    PlusEquals,

    #[token("-=")]
    MinusEquals,

    #[token("*=")]
    StarEquals,

    #[token("/=")]
    SlashEquals,

    #[token("%=")]
    PercentEquals,

    #[token("**=")]
    StarStarEquals,

    #[token("??=")]
    NullishEquals,

    #[token("||=")]
    OrEquals,

    #[token("&&=")]
    AndEquals,

    #[token("==")]
    EqualsEquals,

    #[token("!=")]
    NotEquals,

    #[token("===")]
    StrictEquals,

    #[token("!==")]
    StrictNotEquals,

    #[token("<")]
    LessThan,

    #[token("<=")]
    LessThanEquals,

    #[token(">")]
    GreaterThan,

    #[token(">=")]
    GreaterThanEquals,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("**")]
    StarStar,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("++")]
    PlusPlus,

    #[token("--")]
    MinusMinus,

    #[token("!")]
    Bang,

    #[token("&&")]
    And,

    #[token("||")]
    Or,

    #[token("??")]
    Nullish,
}

impl<'src> Token<'src> {
    /// Keyword tokens that may still appear as property names (`a.in`, `{ if: 1 }`)
    pub fn keyword_text(&self) -> Option<&'static str> {
        Some(match self {
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::Undefined => "undefined",
            Token::This => "this",
            Token::Typeof => "typeof",
            Token::In => "in",
            Token::Let => "let",
            Token::Const => "const",
            Token::Var => "var",
            Token::If => "if",
            Token::Else => "else",
            Token::Return => "return",
            _ => return None,
        })
    }
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(keyword) = self.keyword_text() {
            return write!(f, "keyword '{}'", keyword);
        }
        match self {
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::String(s) => write!(f, "string {}", s),
            Token::Template(s) => write!(f, "template {}", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Comma => write!(f, "','"),
            Token::Semicolon => write!(f, "';'"),
            Token::Colon => write!(f, "':'"),
            Token::Dot => write!(f, "'.'"),
            Token::QuestionDot => write!(f, "'?.'"),
            Token::Ellipsis => write!(f, "'...'"),
            Token::Arrow => write!(f, "'=>'"),
            Token::Question => write!(f, "'?'"),
            Token::Equals => write!(f, "'='"),
            Token::PlusEquals => write!(f, "'+='"),
            Token::MinusEquals => write!(f, "'-='"),
            Token::StarEquals => write!(f, "'*='"),
            Token::SlashEquals => write!(f, "'/='"),
            Token::PercentEquals => write!(f, "'%='"),
            Token::StarStarEquals => write!(f, "'**='"),
            Token::NullishEquals => write!(f, "'??='"),
            Token::OrEquals => write!(f, "'||='"),
            Token::AndEquals => write!(f, "'&&='"),
            Token::EqualsEquals => write!(f, "'=='"),
            Token::NotEquals => write!(f, "'!='"),
            Token::StrictEquals => write!(f, "'==='"),
            Token::StrictNotEquals => write!(f, "'!=='"),
            Token::LessThan => write!(f, "'<'"),
            Token::LessThanEquals => write!(f, "'<='"),
            Token::GreaterThan => write!(f, "'>'"),
            Token::GreaterThanEquals => write!(f, "'>='"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::StarStar => write!(f, "'**'"),
            Token::Slash => write!(f, "'/'"),
            Token::Percent => write!(f, "'%'"),
            Token::PlusPlus => write!(f, "'++'"),
            Token::MinusMinus => write!(f, "'--'"),
            Token::Bang => write!(f, "'!'"),
            Token::And => write!(f, "'&&'"),
            Token::Or => write!(f, "'||'"),
            Token::Nullish => write!(f, "'??'"),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Tokenize a source string, failing on the first unrecognized input
/// (unterminated strings and stray characters included)
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, Range<usize>)>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => return Err(ParseError::lexer_error(span.start, source)),
        }
    }
    Ok(tokens)
}

/// Byte ranges of the `${...}` interpolations inside a raw template token
/// (backticks included in `raw`), relative to the start of `raw`
pub fn template_segments(raw: &str) -> ParseResult<Vec<Range<usize>>> {
    let bytes = raw.as_bytes();
    let mut segments = Vec::new();
    let mut i = 1;
    let end = raw.len().saturating_sub(1);

    while i < end {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                let start = i + 2;
                let mut depth = 1;
                let mut j = start;
                let mut quote: Option<u8> = None;
                while j < end {
                    let b = bytes[j];
                    match quote {
                        Some(q) => {
                            if b == b'\\' {
                                j += 1;
                            } else if b == q {
                                quote = None;
                            }
                        }
                        None => match b {
                            b'\'' | b'"' => quote = Some(b),
                            b'{' => depth += 1,
                            b'}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        },
                    }
                    j += 1;
                }
                if depth != 0 {
                    return Err(ParseError::invalid_syntax(
                        i,
                        "Unterminated template interpolation",
                        raw,
                    ));
                }
                segments.push(start..j);
                i = j + 1;
            }
            _ => i += 1,
        }
    }

    Ok(segments)
}

/// Words that are never reported as identifiers
pub fn is_reserved_word(name: &str) -> bool {
    matches!(
        name,
        "true"
            | "false"
            | "null"
            | "undefined"
            | "this"
            | "typeof"
            | "in"
            | "let"
            | "const"
            | "var"
            | "if"
            | "else"
            | "return"
            | "NaN"
            | "Infinity"
    )
}
