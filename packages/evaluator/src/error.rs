use minibind_parser::ParseError;
use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("TypeError: {name} is not a function")]
    NotCallable { name: String },

    #[error("Invalid assignment target: {target}")]
    InvalidAssignment { target: String },

    #[error("Maximum call depth of {limit} exceeded")]
    DepthExceeded { limit: usize },

    /// Raised by the host or by `JSON.parse` and friends
    #[error("{message}")]
    Thrown { message: String },
}

impl EvalError {
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::TypeError {
            message: message.into(),
        }
    }

    pub fn not_callable(name: impl Into<String>) -> Self {
        Self::NotCallable { name: name.into() }
    }

    pub fn invalid_assignment(target: impl Into<String>) -> Self {
        Self::InvalidAssignment {
            target: target.into(),
        }
    }

    pub fn thrown(message: impl Into<String>) -> Self {
        Self::Thrown {
            message: message.into(),
        }
    }
}
