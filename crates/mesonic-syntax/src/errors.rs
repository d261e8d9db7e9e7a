use miette::Diagnostic;
use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Syntax error: {message}")]
    #[diagnostic(code(mesonic::parse::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span, source: &str, filename: &str) -> Self {
        ParseError::Syntax {
            message: message.into(),
            span: (span.start, span.end.saturating_sub(span.start)).into(),
            src: miette::NamedSource::new(filename, source.to_owned()),
        }
    }

    /// Byte span of the error label, for diagnostic publishing.
    pub fn span(&self) -> Span {
        match self {
            ParseError::Syntax { span, .. } => Span::new(span.offset(), span.offset() + span.len()),
        }
    }
}
