//! Engine error types with source-annotated diagnostics

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use stevedore_core::CoreError;
use thiserror::Error;

use crate::suggestions::{
    extract_quoted_name, suggest_undefined_variable, suggest_unknown_filter,
    suggest_unknown_function,
};

/// Main engine error type
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("Invalid manifest: {0}")]
    #[diagnostic(code(stevedore::engine::invalid))]
    Invalid(#[from] CoreError),

    #[error("Failed to read {path}: {source}")]
    #[diagnostic(code(stevedore::engine::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    UndefinedVariable,
    UnknownFilter,
    UnknownFunction,
    SyntaxError,
    InvalidOperation,
    Other,
}

/// Rendering failure, pointing into the manifest template
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(stevedore::engine::template))]
pub struct TemplateError {
    pub message: String,

    pub kind: TemplateErrorKind,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    /// Build from a MiniJinja error; `overrides` feeds the "did you mean" hint
    pub fn from_minijinja(
        err: minijinja::Error,
        template_name: &str,
        template_source: &str,
        overrides: &[&str],
    ) -> Self {
        let kind = match err.kind() {
            minijinja::ErrorKind::UndefinedError => TemplateErrorKind::UndefinedVariable,
            minijinja::ErrorKind::UnknownFilter => TemplateErrorKind::UnknownFilter,
            minijinja::ErrorKind::UnknownFunction => TemplateErrorKind::UnknownFunction,
            minijinja::ErrorKind::SyntaxError => TemplateErrorKind::SyntaxError,
            minijinja::ErrorKind::InvalidOperation => TemplateErrorKind::InvalidOperation,
            _ => TemplateErrorKind::Other,
        };

        let detailed = format!("{:#}", err);
        let line_text = err
            .line()
            .and_then(|n| template_source.lines().nth(n.saturating_sub(1)));

        let suggestion = match kind {
            TemplateErrorKind::UndefinedVariable => line_text
                .and_then(expression_on_line)
                .map(|name| suggest_undefined_variable(&name, overrides)),
            TemplateErrorKind::UnknownFilter => line_text
                .and_then(filter_on_line)
                .or_else(|| extract_quoted_name(&detailed))
                .map(|name| suggest_unknown_filter(&name)),
            TemplateErrorKind::UnknownFunction => {
                extract_quoted_name(&err.to_string()).map(|name| suggest_unknown_function(&name))
            }
            TemplateErrorKind::SyntaxError => Some(
                "Check bracket matching: `{{ }}` for expressions, `{% %}` for statements"
                    .to_string(),
            ),
            _ => None,
        };

        let message = err
            .to_string()
            .replace("undefined value", "undefined variable");

        Self {
            message,
            kind,
            src: NamedSource::new(template_name, template_source.to_string()),
            span: err.line().and_then(|n| line_span(template_source, n)),
            suggestion,
        }
    }

    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

/// The rendered document is not a valid manifest
#[derive(Error, Debug, Diagnostic)]
#[error("Malformed manifest: {message}")]
#[diagnostic(
    code(stevedore::engine::descriptor),
    help("the document must have `metadata`, and may have `charts`, `packages` and `dependencies`")
)]
pub struct DescriptorError {
    pub message: String,

    /// The rendered document, since line numbers refer to it
    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl DescriptorError {
    pub fn from_yaml(err: &serde_yaml::Error, name: &str, rendered: &str) -> Self {
        let span = err.location().map(|loc| {
            let start = loc.index().min(rendered.len().saturating_sub(1));
            SourceSpan::new(start.into(), 1)
        });

        Self {
            message: err.to_string(),
            src: NamedSource::new(name, rendered.to_string()),
            span,
        }
    }
}

/// First `{{ expr }}` on the line, without filters
fn expression_on_line(line: &str) -> Option<String> {
    let start = line.find("{{")?;
    let end = line[start..].find("}}")?;
    let expr = line[start + 2..start + end].trim();
    let name = expr.split('|').next().unwrap_or(expr).trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Last filter applied in the first `{{ ... }}` on the line
fn filter_on_line(line: &str) -> Option<String> {
    let start = line.find("{{")?;
    let end = line[start..].find("}}")?;
    let expr = &line[start + 2..start + end];
    let filter = expr[expr.rfind('|')? + 1..].trim();
    let name = filter.split(['(', ' ']).next().unwrap_or(filter);
    (!name.is_empty()).then(|| name.to_string())
}

fn line_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;
    for (idx, line) in source.lines().enumerate() {
        if idx + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }
    None
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
