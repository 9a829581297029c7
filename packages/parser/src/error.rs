use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Failure to parse binding expression text.
///
/// Every variant carries the offending source text so callers can report the
/// binding without holding on to the attribute value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found} in `{text}`")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
        text: String,
    },

    #[error("Unexpected end of input at {pos} in `{text}`")]
    UnexpectedEof { pos: usize, text: String },

    #[error("Invalid syntax at {pos}: {message} in `{text}`")]
    InvalidSyntax {
        pos: usize,
        message: String,
        text: String,
    },

    #[error("Unrecognized input at {pos} in `{text}`")]
    LexerError { pos: usize, text: String },
}

impl ParseError {
    pub fn unexpected_token(
        pos: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
            text: text.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, text: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            text: text.into(),
        }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>, text: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
            text: text.into(),
        }
    }

    pub fn lexer_error(pos: usize, text: impl Into<String>) -> Self {
        Self::LexerError {
            pos,
            text: text.into(),
        }
    }

    /// Byte offset of the failure within `text()`
    pub fn pos(&self) -> usize {
        match self {
            Self::UnexpectedToken { pos, .. }
            | Self::UnexpectedEof { pos, .. }
            | Self::InvalidSyntax { pos, .. }
            | Self::LexerError { pos, .. } => *pos,
        }
    }

    /// The expression text that failed to parse
    pub fn text(&self) -> &str {
        match self {
            Self::UnexpectedToken { text, .. }
            | Self::UnexpectedEof { text, .. }
            | Self::InvalidSyntax { text, .. }
            | Self::LexerError { text, .. } => text,
        }
    }

    /// Re-anchor the error onto an enclosing source (template interpolations)
    pub(crate) fn shifted(self, offset: usize, text: &str) -> Self {
        let text = text.to_string();
        match self {
            Self::UnexpectedToken {
                pos,
                expected,
                found,
                ..
            } => Self::UnexpectedToken {
                pos: pos + offset,
                expected,
                found,
                text,
            },
            Self::UnexpectedEof { pos, .. } => Self::UnexpectedEof {
                pos: pos + offset,
                text,
            },
            Self::InvalidSyntax { pos, message, .. } => Self::InvalidSyntax {
                pos: pos + offset,
                message,
                text,
            },
            Self::LexerError { pos, .. } => Self::LexerError {
                pos: pos + offset,
                text,
            },
        }
    }

    /// Render the error with a source snippet
    #[cfg(feature = "pretty-errors")]
    pub fn render(&self) -> String {
        use ariadne::{Label, Report, ReportKind, Source};

        let text = self.text();
        let start = self.pos().min(text.len());
        let end = (start + 1).min(text.len()).max(start);

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, (), start)
            .with_message("failed to parse binding expression")
            .with_label(Label::new(start..end).with_message(self.to_string()))
            .finish()
            .write(Source::from(text), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}
