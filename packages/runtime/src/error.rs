use minibind_evaluator::EvalError;
use minibind_parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("EvaluationError: {0}")]
    Evaluation(EvalError),

    #[error("ScopeResolutionError: {entity}: {reason}")]
    ScopeResolution { entity: String, reason: String },

    #[error("StaleEntityError: entity {entity} is disposed")]
    StaleEntity { entity: String },

    #[error("Code block {id} failed: {message}")]
    BlockFailed { id: String, message: String },

    #[error("Node {node} not found")]
    NodeNotFound { node: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<EvalError> for RuntimeError {
    fn from(error: EvalError) -> Self {
        match error {
            EvalError::Parse(error) => RuntimeError::Parse(error),
            other => RuntimeError::Evaluation(other),
        }
    }
}

impl RuntimeError {
    pub fn scope_resolution(entity: &str, reason: impl Into<String>) -> Self {
        RuntimeError::ScopeResolution {
            entity: entity.to_string(),
            reason: reason.into(),
        }
    }

    pub fn stale(entity: &str) -> Self {
        RuntimeError::StaleEntity {
            entity: entity.to_string(),
        }
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// One binding that failed while its siblings carried on
#[derive(Debug)]
pub struct BindingFailure {
    pub entity: String,
    pub attribute: String,
    pub error: RuntimeError,
}

/// Failures collected over one evaluation pass or mutation batch
#[derive(Debug, Default)]
pub struct BindingReport {
    pub failures: Vec<BindingFailure>,
}

impl BindingReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entity: &str, attribute: &str, error: RuntimeError) {
        tracing::warn!(entity, attribute, %error, "binding failed");
        self.failures.push(BindingFailure {
            entity: entity.to_string(),
            attribute: attribute.to_string(),
            error,
        });
    }

    pub fn merge(&mut self, other: BindingReport) {
        self.failures.extend(other.failures);
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures of one attribute, in occurrence order
    pub fn for_attribute<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = &'a BindingFailure> {
        self.failures.iter().filter(move |f| f.attribute == attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_parse_errors_stay_parse_errors() {
        let parse = minibind_parser::parse_expression("(1").unwrap_err();
        let error: RuntimeError = EvalError::Parse(parse).into();
        assert!(matches!(error, RuntimeError::Parse(_)));

        let error: RuntimeError = EvalError::not_callable("f").into();
        assert!(error.to_string().starts_with("EvaluationError"));
    }

    #[test]
    fn test_report_merge() {
        let mut report = BindingReport::new();
        report.push("E1", ":text", RuntimeError::stale("E1"));

        let mut other = BindingReport::new();
        other.push("E2", ":class", RuntimeError::scope_resolution("E2", "no root"));
        report.merge(other);

        assert_eq!(report.len(), 2);
        assert_eq!(report.for_attribute(":class").count(), 1);
    }
}
