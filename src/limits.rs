//! Resource budgets for parsing and schema compilation
//!
//! A [`Limits`] value travels with a [`Loader`](crate::loaders::Loader) and a
//! compiled schema. Documents are measured while they are parsed, grammars
//! while their `ref`s are expanded and their patterns interned.

use crate::error::{Error, Result};

/// Budgets enforced while reading documents and compiling grammars
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Deepest element nesting accepted in a parsed document
    pub max_xml_depth: usize,

    /// Largest document source accepted, in bytes
    pub max_xml_size: usize,

    /// Most attributes accepted on a single element
    pub max_attributes: usize,

    /// Deepest chain of `ref` expansions while simplifying a grammar
    pub max_schema_depth: usize,

    /// Largest compiled pattern arena
    pub max_patterns: usize,
}

const MIB: usize = 1024 * 1024;

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * MIB,
            max_attributes: 1000,
            max_schema_depth: 100,
            max_patterns: 1 << 20,
        }
    }
}

impl Limits {
    /// Default budgets
    pub fn new() -> Self {
        Self::default()
    }

    /// Tight budgets for untrusted input
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_xml_size: 10 * MIB,
            max_attributes: 100,
            max_schema_depth: 20,
            max_patterns: 1 << 14,
        }
    }

    /// Budgets for large trusted schemas and documents
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10_000,
            max_xml_size: 1024 * MIB,
            max_attributes: 10_000,
            max_schema_depth: 1000,
            max_patterns: 1 << 24,
        }
    }

    /// Check element nesting while parsing
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        within("document nesting", depth, self.max_xml_depth)
    }

    /// Check the byte length of a source
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        within("document size in bytes", size, self.max_xml_size)
    }

    /// Check the attribute count of one start tag
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        within("attributes on one element", count, self.max_attributes)
    }

    /// Check the depth of nested `ref` expansions
    pub fn check_schema_depth(&self, depth: usize) -> Result<()> {
        within("ref expansion depth", depth, self.max_schema_depth)
    }

    /// Check the size of a compiled pattern arena
    pub fn check_patterns(&self, count: usize) -> Result<()> {
        within("compiled patterns", count, self.max_patterns)
    }
}

fn within(what: &str, actual: usize, max: usize) -> Result<()> {
    if actual <= max {
        return Ok(());
    }
    Err(Error::LimitExceeded(format!(
        "{} reached {}, the limit is {}",
        what, actual, max
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_ordered() {
        let (strict, default, permissive) =
            (Limits::strict(), Limits::new(), Limits::permissive());
        assert!(strict.max_xml_depth < default.max_xml_depth);
        assert!(default.max_xml_depth < permissive.max_xml_depth);
        assert!(strict.max_patterns < default.max_patterns);
        assert!(default.max_schema_depth < permissive.max_schema_depth);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let limits = Limits {
            max_xml_depth: 3,
            ..Limits::default()
        };
        assert!(limits.check_xml_depth(3).is_ok());
        assert!(limits.check_xml_depth(4).is_err());
    }

    #[test]
    fn test_message_names_the_budget() {
        let err = Limits::strict().check_schema_depth(21).unwrap_err();
        match err {
            Error::LimitExceeded(msg) => {
                assert!(msg.contains("ref expansion depth"));
                assert!(msg.contains("21"));
                assert!(msg.contains("20"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_size_and_attribute_checks() {
        let limits = Limits::default();
        assert!(limits.check_xml_size(1024).is_ok());
        assert!(limits.check_xml_size(200 * MIB).is_err());
        assert!(limits.check_attributes(10).is_ok());
        assert!(matches!(
            limits.check_attributes(5000),
            Err(Error::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_pattern_budget() {
        let limits = Limits {
            max_patterns: 8,
            ..Limits::default()
        };
        assert!(limits.check_patterns(8).is_ok());
        assert!(limits.check_patterns(9).is_err());
    }
}
