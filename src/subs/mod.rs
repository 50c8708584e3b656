//! The substitution pipeline.
//!
//! [`apply_substitutions`] walks a [`RawDocument`](crate::ast::RawDocument) block by block. For
//! every block the [`selector`] picks the ordered steps, the [`executor`] runs them through the
//! [`Grammar`](crate::syntax::Grammar) using the [`placeholders`] codec, and the [`resolver`]
//! interpolates attributes and counters. Section identifiers and footnotes are settled on the way.

pub mod context;
pub mod executor;
pub mod footnotes;
pub mod merge;
pub mod placeholders;
pub mod resolver;
pub mod section_id;
pub mod selector;

pub use context::{SubstitutionContext, SubstitutionStep};
pub use executor::{apply_substitutions, trace_substitutions};
pub use footnotes::Footnotes;
pub use selector::{substitutions_for, Substitution};
