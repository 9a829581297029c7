//! Source-preserving identifier substitution.
//!
//! Only identifier text is replaced; whitespace, literals, comments and
//! punctuation come out exactly as they went in.

use crate::analyzer::{analyze_source, AnalyzeOptions};
use crate::error::ParseResult;
use crate::parser::parse_source;
use crate::tokenizer::{template_segments, tokenize, Token};
use std::collections::HashMap;
use std::ops::Range;

pub type SubstitutionMap = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewriteMode {
    /// Free identifier occurrences only (object keys and property names
    /// are left alone)
    Declared,
    /// Every identifier token, property positions included
    All,
}

/// Replace identifiers of `source` according to `substitutions`.
///
/// An empty `modes` slice behaves like `[RewriteMode::Declared]`; `All` wins
/// when both are present. Keys of the form `el.name` match the whole chain.
pub fn rewrite(
    source: &str,
    substitutions: &SubstitutionMap,
    modes: &[RewriteMode],
) -> ParseResult<String> {
    if substitutions.is_empty() {
        return Ok(source.to_string());
    }

    let replacements = if modes.contains(&RewriteMode::All) {
        token_replacements(source, 0, substitutions)?
    } else {
        declared_replacements(source, substitutions)?
    };

    Ok(splice(source, replacements))
}

fn declared_replacements(
    source: &str,
    substitutions: &SubstitutionMap,
) -> ParseResult<Vec<(Range<usize>, String)>> {
    let parsed = parse_source(source)?;
    let analysis = analyze_source(&parsed, &AnalyzeOptions::default());

    let mut replacements = Vec::new();
    for occurrence in &analysis.occurrences {
        let scoped = occurrence
            .scoped
            .as_ref()
            .and_then(|(name, span)| substitutions.get(name).map(|r| (span, r)));

        let (span, replacement) = match scoped {
            Some(found) => found,
            None => match substitutions.get(&occurrence.name) {
                Some(replacement) => (&occurrence.span, replacement),
                None => continue,
            },
        };

        let text = if occurrence.shorthand {
            // `{ count }` keeps its key
            format!("{}: {}", occurrence.name, replacement)
        } else {
            replacement.clone()
        };
        replacements.push((span.start..span.end, text));
    }

    Ok(replacements)
}

fn token_replacements(
    source: &str,
    base: usize,
    substitutions: &SubstitutionMap,
) -> ParseResult<Vec<(Range<usize>, String)>> {
    let tokens = tokenize(source)?;
    let mut replacements = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let (token, range) = &tokens[i];
        let name = match token {
            Token::Ident(name) => Some(*name),
            Token::This => Some("this"),
            _ => None,
        };

        if let Some(name) = name {
            if let (Some((Token::Dot, _)), Some((Token::Ident(property), property_range))) =
                (tokens.get(i + 1), tokens.get(i + 2))
            {
                let dotted = format!("{}.{}", name, property);
                if let Some(replacement) = substitutions.get(&dotted) {
                    replacements.push((
                        base + range.start..base + property_range.end,
                        replacement.clone(),
                    ));
                    i += 3;
                    continue;
                }
            }
            if let Some(replacement) = substitutions.get(name) {
                replacements.push((base + range.start..base + range.end, replacement.clone()));
            }
        } else if let Token::Template(raw) = token {
            for segment in template_segments(raw)? {
                let inner = &raw[segment.clone()];
                replacements.extend(token_replacements(
                    inner,
                    base + range.start + segment.start,
                    substitutions,
                )?);
            }
        }

        i += 1;
    }

    Ok(replacements)
}

/// Apply non-overlapping replacements; later overlapping ones are dropped
fn splice(source: &str, mut replacements: Vec<(Range<usize>, String)>) -> String {
    replacements.sort_by_key(|(range, _)| range.start);

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (range, text) in replacements {
        if range.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..range.start]);
        out.push_str(&text);
        cursor = range.end;
    }
    out.push_str(&source[cursor..]);
    out
}
