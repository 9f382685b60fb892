//! # relaxng-rs
//!
//! A RELAX NG schema compiler and validator built on derivative pattern matching.
//!
//! A grammar in RELAX NG XML syntax is simplified and compiled into an arena of
//! memoized patterns. Documents are then checked by walking their tree through a
//! [`TreeWalker`](tree::TreeWalker), so any DOM-like tree can be validated.
//!
//! ## Features
//!
//! - RELAX NG XML syntax: elements, attributes, choice, group, interleave,
//!   oneOrMore/zeroOrMore/optional, mixed, define/ref, combine, div
//! - Recursive grammars through element boundaries
//! - Structural tree validation with readable diagnostics
//! - Derivative (Brzozowski) acceptance check alongside the structural pass
//! - Deferred validation sessions that queue calls until the schema is loaded
//! - Unsupported datatype content (`data`, `list`) is accepted permissively
//!
//! ## Example
//!
//! ```rust,ignore
//! use relaxng::validators::RelaxNgSchema;
//! use relaxng::documents::Document;
//!
//! // Load a schema
//! let schema = RelaxNgSchema::from_file("path/to/schema.rng")?;
//!
//! // Validate an XML document
//! let doc = Document::from_string(&std::fs::read_to_string("doc.xml")?)?;
//! let result = schema.validate(&mut doc.walker());
//! assert!(result.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod error;
pub mod limits;

// Utilities
pub mod namespaces;
pub mod names;
pub mod locations;

// Resource loading and trees
pub mod loaders;
pub mod documents;
pub mod tree;

// Schema compilation and validation
pub mod validators;

// Re-exports for convenience
pub use error::{Error, GrammarError, Result, ValidationError, ValidationErrorKind};
pub use validators::{
    DerivativeCheck, RelaxNgSchema, SchemaSession, ValidationOptions, ValidationResult,
};

/// Version of the relaxng-rs library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// RELAX NG structure namespace
pub const RELAXNG_NAMESPACE: &str = "http://relaxng.org/ns/structure/1.0";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
