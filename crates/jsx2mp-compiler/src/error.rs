use oxc_diagnostics::OxcDiagnostic;
use oxc_span::Span;
use thiserror::Error;

use crate::adapter::AdapterError;

/// A rewrite that cannot complete. The tree may be partially mutated and
/// must be discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("mapped list callback has no markup return value to rewrite (at offset {})", .span.start)]
    MissingReturn { span: Span },
    #[error("loop context stack unbalanced while rewriting list (at offset {})", .span.start)]
    UnbalancedLoopStack { span: Span },
    #[error("synthesized `{code}` did not parse into the expected node: {message}")]
    Snippet { code: String, message: String },
}

impl TransformError {
    pub fn span(&self) -> Span {
        match self {
            TransformError::MissingReturn { span } | TransformError::UnbalancedLoopStack { span } => {
                *span
            }
            TransformError::Snippet { .. } => Span::new(0, 0),
        }
    }
}

/// Whole-file compilation failure, located in the source.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("invalid adapter: {0}")]
    Adapter(#[from] AdapterError),
    #[error("list transform failed at {line}:{column}: {source}")]
    Transform {
        source: TransformError,
        line: usize,
        column: usize,
    },
}

impl CompileError {
    /// Locate the first diagnostic the parser reported.
    pub(crate) fn parse(source_text: &str, diagnostics: &[OxcDiagnostic]) -> Self {
        let Some(first) = diagnostics.first() else {
            return CompileError::Parse {
                message: "unknown parse failure".to_string(),
                line: 1,
                column: 1,
            };
        };
        let offset = first
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map_or(0, |label| label.offset());
        let (line, column) = line_col(source_text, offset);
        CompileError::Parse {
            message: first.message.to_string(),
            line,
            column,
        }
    }

    pub(crate) fn transform(source_text: &str, err: TransformError) -> Self {
        let (line, column) = line_col(source_text, err.span().start as usize);
        CompileError::Transform {
            source: err,
            line,
            column,
        }
    }
}

/// 1-based line and column of byte `offset` in `source`.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let source = "<View>\n  <Text>";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 9), (2, 3));
        assert_eq!(line_col(source, 999), (2, 9));
    }

    #[test]
    fn test_transform_error_is_located() {
        let err = CompileError::transform(
            "<View>\n{list.map(x => 1)}</View>",
            TransformError::MissingReturn {
                span: Span::new(7, 25),
            },
        );
        assert_eq!(
            err.to_string(),
            "list transform failed at 2:1: mapped list callback has no markup return value to rewrite (at offset 7)"
        );
    }

    #[test]
    fn test_empty_diagnostics_still_report() {
        let err = CompileError::parse("", &[]);
        assert!(matches!(err, CompileError::Parse { line: 1, column: 1, .. }));
    }
}
