pub use crate::ast::Span;
pub use crate::config::Configuration;
pub use crate::diagnostics::{to_error_source, ErrorContext, ErrorType, GlossError, Warning, Warnings};
pub use crate::subs::{apply_substitutions, trace_substitutions};
pub use crate::syntax::InlineGrammar;

pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod store;
pub mod subs;
pub mod syntax;
