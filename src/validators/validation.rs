//! Validation infrastructure
//!
//! Options that steer a validation run and the verdict it produces.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result, ValidationError, ValidationErrorKind};

/// What to do with the derivative acceptance check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerivativeCheck {
    /// Do not run the derivative check
    Skip,
    /// Run it and log a warning when it rejects the document
    #[default]
    Log,
    /// Run it and report a rejection as a validation error
    Enforce,
}

impl DerivativeCheck {
    /// Parse a derivative check mode from a string
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "skip" => Ok(DerivativeCheck::Skip),
            "log" => Ok(DerivativeCheck::Log),
            "enforce" => Ok(DerivativeCheck::Enforce),
            _ => Err(Error::Other(format!(
                "Invalid derivative check: '{}'. Must be 'skip', 'log', or 'enforce'",
                s
            ))),
        }
    }

    /// Get the mode as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivativeCheck::Skip => "skip",
            DerivativeCheck::Log => "log",
            DerivativeCheck::Enforce => "enforce",
        }
    }
}

impl fmt::Display for DerivativeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options for one validation run
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Derivative check mode
    pub derivative_check: DerivativeCheck,
    /// Maximum element nesting the validators descend into
    pub max_depth: usize,
    /// Maximum recursion through nested patterns in the tree validator
    pub max_nesting: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            derivative_check: DerivativeCheck::default(),
            max_depth: 256,
            max_nesting: 512,
        }
    }
}

impl ValidationOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the derivative check mode
    pub fn with_derivative_check(mut self, check: DerivativeCheck) -> Self {
        self.derivative_check = check;
        self
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the pattern recursion budget
    pub fn with_max_nesting(mut self, nesting: usize) -> Self {
        self.max_nesting = nesting;
        self
    }
}

/// Verdict of one validation call; no errors means valid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Validation errors in the order they were found
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self::default()
    }

    /// Create a result holding errors
    pub fn invalid(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// Whether no errors were found
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Whether an error of the given kind was found
    pub fn has_error(&self, kind: ValidationErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "valid");
        }
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivative_check_parsing() {
        assert_eq!(DerivativeCheck::from_str("skip").unwrap(), DerivativeCheck::Skip);
        assert_eq!(DerivativeCheck::from_str("enforce").unwrap(), DerivativeCheck::Enforce);
        assert!(DerivativeCheck::from_str("strict").is_err());
        assert_eq!(DerivativeCheck::default(), DerivativeCheck::Log);
        assert_eq!(DerivativeCheck::Log.to_string(), "log");
    }

    #[test]
    fn test_options_builders() {
        let options = ValidationOptions::new()
            .with_derivative_check(DerivativeCheck::Enforce)
            .with_max_depth(5)
            .with_max_nesting(40);
        assert_eq!(options.derivative_check, DerivativeCheck::Enforce);
        assert_eq!(options.max_depth, 5);
        assert_eq!(options.max_nesting, 40);
        assert!(ValidationOptions::default().max_depth < ValidationOptions::default().max_nesting);
    }

    #[test]
    fn test_validation_result() {
        let mut result = ValidationResult::valid();
        assert!(result.is_valid());
        assert_eq!(result.to_string(), "valid");

        result.add_error(ValidationError::new(
            ValidationErrorKind::MissingElement,
            "Missing element title",
        ));
        assert!(!result.is_valid());
        assert!(result.has_error(ValidationErrorKind::MissingElement));
        assert!(!result.has_error(ValidationErrorKind::NotAllowed));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["errors"][0]["kind"], "missingElement");
    }
}
