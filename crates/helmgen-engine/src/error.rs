//! Engine error types
//!
//! Template errors are miette diagnostics carrying the template source
//! and the offending location, so the CLI can render them with context.

use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::parser::ParseError;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unsupported value format: {}", .path.display())]
    UnsupportedValueFormat { path: PathBuf },

    #[error("Failed to parse values file {}: {message}", .path.display())]
    ValueParse { path: PathBuf, message: String },

    #[error("Failed to serialize values: {message}")]
    ValueEncode { message: String },

    #[error("Template compile error")]
    Compile(#[from] TemplateCompileError),

    #[error("Template eval error")]
    Eval(#[from] TemplateEvalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Template syntax error with source location
#[derive(Error, Debug, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(helmgen::template::compile))]
pub struct TemplateCompileError {
    /// Error message
    pub message: String,

    /// Template source
    #[source_code]
    pub src: NamedSource<String>,

    /// Error location in the source
    #[label("syntax error here")]
    pub span: Option<SourceSpan>,
}

impl TemplateCompileError {
    pub(crate) fn new(
        message: impl Into<String>,
        name: &str,
        source: &str,
        span: Option<(usize, usize)>,
    ) -> Self {
        Self {
            message: message.into(),
            src: NamedSource::new(name, source.to_string()),
            span: span.map(|(start, end)| to_source_span(source, start, end)),
        }
    }

    pub(crate) fn from_parse(err: &ParseError, name: &str, source: &str) -> Self {
        Self::new(err.to_string(), name, source, err.span())
    }
}

/// Error kind for categorizing evaluation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    UnknownFunction,
    InvalidArguments,
    UndefinedVariable,
    NotPipeable,
    TypeError,
}

/// Template evaluation error with source location
#[derive(Error, Debug, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(helmgen::template::eval))]
pub struct TemplateEvalError {
    /// Error message
    pub message: String,

    /// Error kind for categorization
    pub kind: EvalErrorKind,

    /// Template source
    #[source_code]
    pub src: NamedSource<String>,

    /// Location of the failing action
    #[label("while evaluating this action")]
    pub span: Option<SourceSpan>,

    /// Suggestion for fixing the error
    #[help]
    pub suggestion: Option<String>,
}

impl TemplateEvalError {
    pub(crate) fn new(
        message: impl Into<String>,
        kind: EvalErrorKind,
        name: &str,
        source: &str,
        span: Option<(usize, usize)>,
    ) -> Self {
        Self {
            message: message.into(),
            kind,
            src: NamedSource::new(name, source.to_string()),
            span: span.map(|(start, end)| to_source_span(source, start, end)),
            suggestion: None,
        }
    }

    pub(crate) fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn kind(&self) -> EvalErrorKind {
        self.kind
    }
}

fn to_source_span(source: &str, start: usize, end: usize) -> SourceSpan {
    let start = start.min(source.len());
    let mut len = end.saturating_sub(start);
    if len == 0 && start < source.len() {
        len = 1;
    }
    SourceSpan::new(start.into(), len)
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_carries_span() {
        let err = TemplateCompileError::new("bad", "t.yaml", "abcdef", Some((2, 4)));
        let span = err.span.unwrap();
        assert_eq!(span.offset(), 2);
        assert_eq!(span.len(), 2);
    }

    #[test]
    fn test_zero_width_span_is_widened() {
        let err = TemplateCompileError::new("bad", "t.yaml", "abcdef", Some((2, 2)));
        assert_eq!(err.span.unwrap().len(), 1);
    }

    #[test]
    fn test_span_clamped_to_source() {
        let err = TemplateCompileError::new("bad", "t.yaml", "ab", Some((10, 20)));
        let span = err.span.unwrap();
        assert_eq!(span.offset(), 2);
        assert_eq!(span.len(), 0);
    }

    #[test]
    fn test_eval_error_kind() {
        let err = TemplateEvalError::new(
            "unknown function `upperr`",
            EvalErrorKind::UnknownFunction,
            "t",
            "{{ upperr .x }}",
            None,
        )
        .with_suggestion("Did you mean `upper`?");

        assert_eq!(err.kind(), EvalErrorKind::UnknownFunction);
        assert_eq!(err.suggestion.as_deref(), Some("Did you mean `upper`?"));
    }
}
