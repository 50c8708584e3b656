//! Unified diagnostics for the gloss substitution engine.
//!
//! Fatal failures are [`GlossError`] values: a `thiserror` enum whose variants all carry a
//! message, an [`ErrorContext`] (source fragment, span, help, related labels) and an optional
//! chained cause. They render through `miette`.
//!
//! Non-fatal conditions are [`Warning`] values. They are collected in [`Warnings`] during a
//! processing pass and logged with `tracing` as they are recorded.
//!
//! # Construction macros
//!
//! - `err_msg!(UnsupportedSubstitution, "unsupported substitution: '{}'", token)` for
//!   message-only errors.
//! - `err_ctx!(Grammar, "unable to parse fragment", &src, span)` when a source fragment and a
//!   span are at hand.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe classification of [`GlossError`] variants, mostly used by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// The grammar could not parse a fragment
    Grammar,
    /// A `subs` directive named an unknown step
    UnsupportedSubstitution,
    /// A counter holds something other than a number or a single character
    InvalidCounterType,
    /// A placeholder reference was unknown or never restored
    Placeholder,
    /// The input violates a precondition (e.g. reserved code point)
    Validation,
    /// Configuration, front matter or document loading failed
    Config,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Grammar => "Grammar",
            ErrorType::UnsupportedSubstitution => "UnsupportedSubstitution",
            ErrorType::InvalidCounterType => "InvalidCounterType",
            ErrorType::Placeholder => "Placeholder",
            ErrorType::Validation => "Validation",
            ErrorType::Config => "Config",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single additional label for multi-span diagnostics.
#[derive(Debug)]
pub struct RelatedLabel {
    pub source: SourceArc,
    pub span: Span,
    pub label: String,
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The fragment the error refers to (if any).
    pub source: Option<SourceArc>,
    /// The primary span within `source` (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
    /// Additional labeled spans.
    pub related: Vec<RelatedLabel>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_source(source: SourceArc) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            ..Self::default()
        }
    }

    /// Attaches a help message, replacing any previous one.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Every fatal failure of a processing pass.
#[derive(Debug, Error)]
pub enum GlossError {
    #[error("Grammar error: {message}")]
    Grammar {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Unsupported substitution: {message}")]
    UnsupportedSubstitution {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Invalid counter type: {message}")]
    InvalidCounterType {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Placeholder error: {message}")]
    Placeholder {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl GlossError {
    fn parts(&self) -> (&str, &ErrorContext) {
        match self {
            GlossError::Grammar { message, ctx, .. }
            | GlossError::UnsupportedSubstitution { message, ctx, .. }
            | GlossError::InvalidCounterType { message, ctx, .. }
            | GlossError::Placeholder { message, ctx, .. }
            | GlossError::Validation { message, ctx, .. }
            | GlossError::Config { message, ctx, .. } => (message, ctx),
        }
    }

    pub fn message(&self) -> &str {
        self.parts().0
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            GlossError::Grammar { .. } => ErrorType::Grammar,
            GlossError::UnsupportedSubstitution { .. } => ErrorType::UnsupportedSubstitution,
            GlossError::InvalidCounterType { .. } => ErrorType::InvalidCounterType,
            GlossError::Placeholder { .. } => ErrorType::Placeholder,
            GlossError::Validation { .. } => ErrorType::Validation,
            GlossError::Config { .. } => ErrorType::Config,
        }
    }

    /// Wraps an underlying error (IO, YAML, JSON) as a configuration failure.
    pub fn config<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        GlossError::Config {
            message: message.into(),
            ctx: ErrorContext::none(),
            source: Some(Box::new(cause)),
        }
    }

    /// Appends a help line to the error, keeping everything else.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        let help = help.into();
        match &mut self {
            GlossError::Grammar { ctx, .. }
            | GlossError::UnsupportedSubstitution { ctx, .. }
            | GlossError::InvalidCounterType { ctx, .. }
            | GlossError::Placeholder { ctx, .. }
            | GlossError::Validation { ctx, .. }
            | GlossError::Config { ctx, .. } => {
                ctx.help = Some(match ctx.help.take() {
                    Some(existing) => format!("{existing}\n{help}"),
                    None => help,
                })
            }
        }
        self
    }
}

impl Diagnostic for GlossError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self.error_type() {
            ErrorType::Grammar => "gloss::grammar",
            ErrorType::UnsupportedSubstitution => "gloss::subs",
            ErrorType::InvalidCounterType => "gloss::counter",
            ErrorType::Placeholder => "gloss::placeholder",
            ErrorType::Validation => "gloss::validation",
            ErrorType::Config => "gloss::config",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.parts()
            .1
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.parts()
            .1
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (message, ctx) = self.parts();
        let mut labels = Vec::new();
        if let Some(span) = ctx.span {
            labels.push(LabeledSpan::new(
                Some(message.to_string()),
                span.start,
                span.len().max(1),
            ));
        }
        for rel in &ctx.related {
            labels.push(LabeledSpan::new(
                Some(rel.label.clone()),
                rel.span.start,
                rel.span.len().max(1),
            ));
        }
        if labels.is_empty() {
            None
        } else {
            Some(Box::new(labels.into_iter()))
        }
    }
}

/// Wraps a fragment into a named source usable in an [`ErrorContext`].
pub fn to_error_source<S: AsRef<str>>(name: &str, source: S) -> SourceArc {
    Arc::new(NamedSource::new(name, source.as_ref().to_string()))
}

/// Constructs a [`GlossError`] variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $msg:expr, $($arg:expr),+ $(,)?) => {
        $crate::GlossError::$variant {
            message: format!($msg, $($arg),+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
    ($variant:ident, $msg:expr) => {
        $crate::GlossError::$variant {
            message: format!("{}", $msg),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a [`GlossError`] variant with a source fragment, a span and optional help.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, $src:expr, $span:expr, $help:expr) => {
        $crate::GlossError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_source_and_span(
                $crate::diagnostics::SourceArc::clone($src),
                $span,
            )
            .help(format!("{}", $help)),
            source: None,
        }
    };
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::GlossError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_source_and_span(
                $crate::diagnostics::SourceArc::clone($src),
                $span,
            ),
            source: None,
        }
    };
    ($variant:ident, $msg:expr, $src:expr) => {
        $crate::GlossError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_source($crate::diagnostics::SourceArc::clone($src)),
            source: None,
        }
    };
}

// ============================================================================
// WARNINGS
// ============================================================================

/// Non-fatal conditions. Processing continues with a well-defined fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    #[error("cannot find attribute '{name}', rendering it as '{{{name}}}'")]
    #[diagnostic(code(gloss::missing_attribute), severity(Warning))]
    MissingAttribute { name: String },

    #[error("no footnote with reference '{reference}'")]
    #[diagnostic(code(gloss::missing_footnote), severity(Warning))]
    MissingFootnote { reference: String },
}

/// Collects the warnings of one processing pass, logging each as it arrives.
#[derive(Debug, Default, Clone)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.0.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.0
    }
}
