//! Error types for relaxng-rs
//!
//! [`Error`] is returned by everything that can fail outright: reading
//! sources, parsing XML, compiling a grammar. An invalid document is not a
//! failure; its problems are plain [`ValidationError`] values collected into a
//! [`ValidationResult`](crate::validators::ValidationResult).

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::namespaces::QName;
use crate::tree::NodeKind;

/// Result type alias using relaxng Error
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a load, parse or compile step
#[derive(Error, Debug)]
pub enum Error {
    /// The RELAX NG grammar could not be loaded or compiled
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),

    /// A location could not be read
    #[error("resource error: {0}")]
    Resource(String),

    /// Undeclared prefix or illegal namespace declaration
    #[error("namespace error: {0}")]
    Namespace(String),

    /// A [`Limits`](crate::limits::Limits) budget was exceeded
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML
    #[error("XML error: {0}")]
    Xml(String),

    /// Anything else, such as an unknown option value
    #[error("{0}")]
    Other(String),
}

/// Errors found while loading, simplifying or compiling a grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// The document element is not in the RELAX NG namespace
    #[error("'{0}' is not a RELAX NG pattern or grammar")]
    NotRelaxNg(String),

    /// The grammar has no `start` element
    #[error("No Relax NG start element was found.")]
    MissingStart,

    /// A `ref` names a `define` that does not exist
    #[error("{0} was not defined.")]
    UndefinedRef(String),

    /// A `define` recursively references itself without an element in between
    #[error("reference to '{0}' recurses without passing through an element")]
    RecursiveRef(String),

    /// A `define` or `start` is declared twice without a `combine` attribute
    #[error("'{0}' is defined more than once without a combine attribute")]
    DuplicateDefine(String),

    /// Two definitions disagree on their `combine` method
    #[error("conflicting combine methods for '{0}'")]
    CombineConflict(String),

    /// A node has the wrong number of children after simplification
    #[error("{kind} with wrong # of elements: {count}")]
    Arity {
        /// Node kind
        kind: String,
        /// Number of children found
        count: usize,
    },

    /// A construct this implementation does not handle
    #[error("No support for {0}")]
    Unsupported(String),

    /// A name attribute or name element holds an invalid QName
    #[error("invalid name '{0}'")]
    InvalidName(String),

    /// A QName uses a prefix with no namespace binding
    #[error("unknown namespace prefix '{0}'")]
    UnknownPrefix(String),
}

/// Classification of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationErrorKind {
    /// The expected element is absent, or another element stands in its place
    MissingElement,
    /// An element remained after the content of its parent was matched
    UnexpectedElement,
    /// Non-whitespace text was found where an element was expected
    UnexpectedText,
    /// A required attribute is absent
    MissingAttribute,
    /// An attribute was not matched by any attribute pattern
    UnexpectedAttribute,
    /// More than one attribute matched a single attribute pattern
    DuplicateAttribute,
    /// A value did not match a literal `value` pattern
    WrongValue,
    /// Text remained inside an element after its pattern was satisfied
    SpuriousContent,
    /// No arrangement of interleaved branches matched
    InterleaveMismatch,
    /// Content met a `notAllowed` pattern
    NotAllowed,
    /// The derivative check rejected the document
    DerivativeMismatch,
    /// Element nesting exceeded the configured depth
    DepthExceeded,
}

/// Detached description of a tree node, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    /// Node kind
    pub kind: NodeKind,
    /// Element name, if the node is an element
    pub name: Option<QName>,
    /// Text value, if the node is text or a comment
    pub value: Option<String>,
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.value) {
            (Some(name), _) => write!(f, "Element {}", name),
            (None, Some(value)) => write!(f, "Node with value '{}'", value),
            (None, None) => write!(f, "Node"),
        }
    }
}

/// Document validation error with context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Error classification
    pub kind: ValidationErrorKind,
    /// Error message
    pub message: String,
    /// Node that failed validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeInfo>,
    /// Underlying reason, e.g. the failure of a nested branch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            node: None,
            reason: None,
        }
    }

    /// Set the node where validation failed
    pub fn with_node(mut self, node: NodeInfo) -> Self {
        self.node = Some(node);
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref node) = self.node {
            write!(f, " {}.", node)?;
        }

        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}
