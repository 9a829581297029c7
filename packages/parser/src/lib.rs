//! # Minibind Parser
//!
//! Front end for binding attribute expressions: tokenizing, parsing,
//! identifier classification and source-preserving rewriting.

pub mod analyzer;
pub mod ast;
pub mod error;
pub mod parser;
pub mod rewriter;
pub mod tokenizer;

#[cfg(test)]
mod tests_analyzer;

#[cfg(test)]
mod tests_rewriter;

pub use analyzer::{analyze, analyze_source, Analysis, AnalyzeOptions, Identifiers, Occurrence, Role, SCOPE_ROOT};
pub use ast::{EachHeader, Expression, Program, Source, Span, Statement};
pub use error::{ParseError, ParseResult};
pub use parser::{parse_each, parse_expression, parse_program, parse_source, Parser};
pub use rewriter::{rewrite, RewriteMode, SubstitutionMap};
pub use tokenizer::{is_reserved_word, tokenize, Token};
