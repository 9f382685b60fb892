//! RELAX NG schemas
//!
//! This module contains the compiled schema that ties the pipeline together:
//! the grammar loader, reference resolution, the pattern compiler and the
//! two validators that run over a tree.

use std::fmt;
use std::path::Path;

use super::compiler::compile;
use super::document_validation::validate_tree;
use super::grammar::Grammar;
use super::patterns::{ArenaStats, PatternArena, PatternId};
use super::simplify::simplify;
use super::validation::{DerivativeCheck, ValidationOptions, ValidationResult};

use crate::documents::Document;
use crate::error::{Result, ValidationError, ValidationErrorKind};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;
use crate::tree::TreeWalker;

/// A compiled RELAX NG schema
///
/// The pattern graph is built once and never modified afterwards, so one
/// schema can be shared between any number of validation calls.
#[derive(Debug)]
pub struct RelaxNgSchema {
    /// Compiled patterns
    patterns: PatternArena<'static>,
    /// Start pattern
    start: PatternId,
    /// Options used by [`RelaxNgSchema::validate`]
    options: ValidationOptions,
    /// Limits applied to documents parsed by this schema
    limits: Limits,
}

impl RelaxNgSchema {
    /// Compile a schema from a string
    ///
    /// # Example
    ///
    /// ```ignore
    /// let schema = RelaxNgSchema::from_string(r#"
    ///     <element name="doc" xmlns="http://relaxng.org/ns/structure/1.0">
    ///         <text/>
    ///     </element>"#)?;
    /// assert!(schema.is_valid_string("<doc>hello</doc>"));
    /// ```
    pub fn from_string(source: &str) -> Result<Self> {
        Self::from_string_with_limits(source, Limits::default())
    }

    /// Compile a schema from a string with custom limits
    pub fn from_string_with_limits(source: &str, limits: Limits) -> Result<Self> {
        let doc = Document::parse_with_limits(source, &limits)?;
        Self::build(&doc, limits)
    }

    /// Compile a schema from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_location(&Loader::new(), &Location::from(path.as_ref().to_path_buf()))
    }

    /// Compile a schema fetched through a loader
    pub fn from_location(loader: &Loader, location: &Location) -> Result<Self> {
        let doc = loader.load_document(location)?;
        Self::build(&doc, loader.limits().clone())
    }

    /// Compile a schema from an already parsed document
    pub fn from_document(doc: &Document) -> Result<Self> {
        Self::build(doc, Limits::default())
    }

    fn build(doc: &Document, limits: Limits) -> Result<Self> {
        let grammar = Grammar::from_document(doc)?;
        let simplified = simplify(grammar, &limits)?;
        let compiled = compile(&simplified)?;
        limits.check_patterns(compiled.patterns.len())?;
        log::debug!("schema compiled with {} patterns", compiled.patterns.len());

        Ok(Self {
            patterns: compiled.patterns,
            start: compiled.start,
            options: ValidationOptions::default(),
            limits,
        })
    }

    /// Replace the validation options
    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the derivative check mode
    pub fn set_derivative_check(&mut self, check: DerivativeCheck) {
        self.options.derivative_check = check;
    }

    /// Validation options
    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Limits applied when parsing documents
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Start pattern
    pub fn start(&self) -> PatternId {
        self.start
    }

    /// Compiled patterns
    pub fn patterns(&self) -> &PatternArena<'static> {
        &self.patterns
    }

    /// Pattern counts
    pub fn stats(&self) -> ArenaStats {
        self.patterns.stats()
    }

    /// Validate the tree below the walker's root
    ///
    /// Runs the structural validator and then, depending on
    /// [`ValidationOptions::derivative_check`], the derivative check. The
    /// walker's position afterwards is unspecified.
    pub fn validate<W: TreeWalker>(&self, walker: &mut W) -> ValidationResult {
        let mut result = validate_tree(&self.patterns, self.start, &mut *walker, &self.options);

        if self.options.derivative_check == DerivativeCheck::Skip {
            return result;
        }
        if self.accepts(walker) {
            log::debug!("derivative check accepted the document");
        } else {
            log::warn!(
                "derivative check rejected a document the tree validator found {}",
                if result.is_valid() { "valid" } else { "invalid" }
            );
            if self.options.derivative_check == DerivativeCheck::Enforce {
                result.add_error(ValidationError::new(
                    ValidationErrorKind::DerivativeMismatch,
                    "The document is not accepted by the schema's derivative.",
                ));
            }
        }
        result
    }

    /// Whether the derivative of the start pattern over the whole tree is nullable
    ///
    /// Derivatives are built in a layer over the compiled patterns, which are
    /// left untouched.
    pub fn accepts<W: TreeWalker>(&self, walker: &mut W) -> bool {
        let root = walker.root();
        walker.set_current_node(root);
        let mut layer = self.patterns.layered();
        let deriv = layer.child_deriv(self.start, walker, self.options.max_depth);
        log::trace!("derivative check built {} patterns", layer.local_len());
        layer.nullable(deriv)
    }

    /// Check if the tree below the walker's root is valid
    pub fn is_valid<W: TreeWalker>(&self, walker: &mut W) -> bool {
        self.validate(walker).is_valid()
    }

    /// Validate a parsed document
    pub fn validate_document(&self, doc: &Document) -> ValidationResult {
        self.validate(&mut doc.walker())
    }

    /// Validate an XML string
    ///
    /// Fails only when the string is not well-formed XML; validation errors
    /// are reported in the result.
    pub fn validate_string(&self, xml: &str) -> Result<ValidationResult> {
        let doc = Document::parse_with_limits(xml, &self.limits)?;
        Ok(self.validate_document(&doc))
    }

    /// Check if an XML string is well-formed and valid
    pub fn is_valid_string(&self, xml: &str) -> bool {
        self.validate_string(xml)
            .map(|result| result.is_valid())
            .unwrap_or(false)
    }

    /// Validate an XML file
    pub fn validate_file(&self, path: impl AsRef<Path>) -> Result<ValidationResult> {
        let doc = Loader::new()
            .with_limits(self.limits.clone())
            .load_document(&Location::from(path.as_ref().to_path_buf()))?;
        Ok(self.validate_document(&doc))
    }
}

impl fmt::Display for RelaxNgSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        write!(
            f,
            "RelaxNgSchema(patterns={}, elements={}, attributes={})",
            stats.patterns, stats.elements, stats.attributes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, GrammarError};

    const BOOK: &str = r#"
        <grammar xmlns="http://relaxng.org/ns/structure/1.0">
          <start>
            <element name="doc">
              <element name="title"><text/></element>
              <element name="body">
                <zeroOrMore><element name="p"><text/></element></zeroOrMore>
              </element>
            </element>
          </start>
        </grammar>"#;

    #[test]
    fn test_valid_document() {
        let schema = RelaxNgSchema::from_string(BOOK).unwrap();
        let result = schema
            .validate_string("<doc><title>T</title><body><p>a</p><p>b</p></body></doc>")
            .unwrap();
        assert!(result.is_valid(), "{}", result);
    }

    #[test]
    fn test_missing_title() {
        let schema = RelaxNgSchema::from_string(BOOK).unwrap();
        let result = schema
            .validate_string("<doc><body><p>a</p></body></doc>")
            .unwrap();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ValidationErrorKind::MissingElement);
        assert!(result.errors[0].message.contains("title"));
    }

    #[test]
    fn test_unexpected_element() {
        let schema = RelaxNgSchema::from_string(BOOK).unwrap();
        let result = schema
            .validate_string("<doc><title>T</title><body><p>a</p><q>x</q></body></doc>")
            .unwrap();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ValidationErrorKind::UnexpectedElement);
        assert!(result.errors[0].message.contains('q'));
    }

    #[test]
    fn test_enforced_derivative_check() {
        let schema = RelaxNgSchema::from_string(BOOK).unwrap().with_options(
            ValidationOptions::new().with_derivative_check(DerivativeCheck::Enforce),
        );
        let result = schema
            .validate_string("<doc><body><p>a</p></body></doc>")
            .unwrap();
        assert!(result.has_error(ValidationErrorKind::MissingElement));
        assert!(result.has_error(ValidationErrorKind::DerivativeMismatch));

        let result = schema
            .validate_string("<doc><title>T</title><body/></doc>")
            .unwrap();
        assert!(result.is_valid(), "{}", result);
    }

    #[test]
    fn test_accepts_leaves_patterns_untouched() {
        let schema = RelaxNgSchema::from_string(BOOK).unwrap();
        let before = schema.patterns().len();
        let doc = Document::from_string("<doc><title>T</title><body><p/></body></doc>").unwrap();
        assert!(schema.accepts(&mut doc.walker()));
        assert_eq!(schema.patterns().len(), before);
    }

    #[test]
    fn test_grammar_errors() {
        let err = RelaxNgSchema::from_string(
            r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0"><define name="a"><text/></define></grammar>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Grammar(GrammarError::MissingStart)));

        let err = RelaxNgSchema::from_string("<schema/>").unwrap_err();
        assert!(matches!(err, Error::Grammar(GrammarError::NotRelaxNg(_))));
    }

    #[test]
    fn test_pattern_budget() {
        let tight = Limits {
            max_patterns: 4,
            ..Limits::default()
        };
        let err = RelaxNgSchema::from_string_with_limits(BOOK, tight).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
        assert!(RelaxNgSchema::from_string_with_limits(BOOK, Limits::strict()).is_ok());
    }

    #[test]
    fn test_malformed_document() {
        let schema = RelaxNgSchema::from_string(BOOK).unwrap();
        assert!(schema.validate_string("<doc><title>").is_err());
        assert!(!schema.is_valid_string("<doc><title>"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("book.rng");
        let doc_path = dir.path().join("book.xml");
        std::fs::write(&schema_path, BOOK).unwrap();
        std::fs::write(&doc_path, "<doc><title>T</title><body/></doc>").unwrap();

        let schema = RelaxNgSchema::from_file(&schema_path).unwrap();
        assert!(schema.validate_file(&doc_path).unwrap().is_valid());
        assert!(RelaxNgSchema::from_file(dir.path().join("missing.rng")).is_err());
    }

    #[test]
    fn test_display() {
        let schema = RelaxNgSchema::from_string(BOOK).unwrap();
        let text = schema.to_string();
        assert!(text.starts_with("RelaxNgSchema("));
        assert!(text.contains("elements=4"));
    }
}
