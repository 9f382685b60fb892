//! RELAX NG validators
//!
//! This module contains the schema pipeline and the validators:
//!
//! - [`grammar`] loads the RELAX NG XML syntax into grammar nodes
//! - [`simplify`] resolves references
//! - [`compiler`] builds the pattern graph stored in a [`PatternArena`]
//! - [`document_validation`] walks a tree against the patterns
//! - [`derivatives`] computes Brzozowski derivatives over tree events
//! - [`schemas`] and [`session`] tie the pipeline together

pub mod compiler;
pub mod derivatives;
pub mod document_validation;
pub mod grammar;
pub mod name_class;
pub mod patterns;
pub mod schemas;
pub mod session;
pub mod simplify;
pub mod validation;

// Re-exports
pub use derivatives::AfterOp;
pub use grammar::{Grammar, GrammarKind, GrammarNode};
pub use name_class::NameClass;
pub use patterns::{ArenaStats, Pattern, PatternArena, PatternId};
pub use schemas::RelaxNgSchema;
pub use session::{SchemaSession, SessionOutcome};
pub use validation::{DerivativeCheck, ValidationOptions, ValidationResult};
