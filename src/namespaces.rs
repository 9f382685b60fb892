//! Expanded names and in-scope prefix bindings
//!
//! Both documents and grammars are matched on expanded names: a namespace URI
//! paired with a local name. [`NamespaceContext`] carries the bindings that
//! turn a lexical `prefix:local` into a [`QName`].

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::names::split_qname;
use crate::{XMLNS_NAMESPACE, XML_NAMESPACE};

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Expanded name
///
/// The empty namespace URI and "no namespace" are the same thing in
/// RELAX NG, so an empty URI is always stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QName {
    /// Namespace URI, `None` for no namespace
    pub namespace: Option<NamespaceUri>,
    /// Local part
    pub local_name: String,
}

impl QName {
    /// Pair a namespace URI with a local name; `""` means no namespace
    pub fn new(namespace: &str, local_name: impl Into<String>) -> Self {
        let namespace = (!namespace.is_empty()).then(|| namespace.to_owned());
        Self {
            namespace,
            local_name: local_name.into(),
        }
    }

    /// Name in no namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new("", local_name)
    }

    /// Name in the given namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self::new(&namespace.into(), local_name)
    }

    /// Namespace URI, or `""` for no namespace
    pub fn namespace_str(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }

    /// Compare against a namespace/local pair
    pub fn matches(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace_str() == namespace && self.local_name == local_name
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{{{}}}", ns)?;
        }
        f.write_str(&self.local_name)
    }
}

/// Prefix bindings in scope at one element
///
/// The default namespace is kept under the empty prefix. A child element
/// starts from a clone of its parent's context and layers its own
/// `xmlns` declarations on top.
#[derive(Debug, Clone, Default)]
pub struct NamespaceContext {
    bindings: HashMap<Prefix, NamespaceUri>,
}

impl NamespaceContext {
    /// Context with only the implicit `xml` binding
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a prefix to a namespace URI
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        let prefix = prefix.into();
        if !prefix.is_empty() {
            self.bindings.insert(prefix, namespace.into());
        }
    }

    /// Set the default namespace; `""` undeclares it
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        if namespace.is_empty() {
            self.bindings.remove("");
        } else {
            self.bindings.insert(String::new(), namespace);
        }
    }

    /// Apply an attribute if it is a namespace declaration
    ///
    /// Returns the name the declaration carries in the `xmlns` namespace, or
    /// `None` for an ordinary attribute.
    pub fn declare(&mut self, attr_name: &str, value: &str) -> Result<Option<QName>> {
        if attr_name == "xmlns" {
            self.set_default_namespace(value);
            return Ok(Some(QName::namespaced(XMLNS_NAMESPACE, "xmlns")));
        }
        let Some(prefix) = attr_name.strip_prefix("xmlns:") else {
            return Ok(None);
        };
        if value.is_empty() {
            return Err(Error::Namespace(format!(
                "prefix '{}' cannot be bound to the empty namespace",
                prefix
            )));
        }
        if prefix == "xmlns" || (prefix == "xml" && value != XML_NAMESPACE) {
            return Err(Error::Namespace(format!(
                "reserved prefix '{}' cannot be rebound",
                prefix
            )));
        }
        self.add_prefix(prefix, value);
        Ok(Some(QName::namespaced(XMLNS_NAMESPACE, prefix)))
    }

    /// Namespace bound to a prefix; `xml` is always bound
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        match prefix {
            "xml" => Some(XML_NAMESPACE),
            "" => None,
            _ => self.bindings.get(prefix).map(String::as_str),
        }
    }

    /// Namespace applied to unprefixed element names
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.bindings.get("").map(String::as_str)
    }

    /// Expand an element name; unprefixed names take the default namespace
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        let (prefix, local) = split_qname(prefixed_name);
        let namespace = match prefix {
            Some(prefix) => self
                .get_namespace(prefix)
                .ok_or_else(|| Error::Namespace(format!("undeclared prefix '{}'", prefix)))?,
            None => self.get_default_namespace().unwrap_or_default(),
        };
        Ok(QName::new(namespace, local))
    }

    /// Expand an attribute name; unprefixed attributes have no namespace
    pub fn resolve_attribute(&self, prefixed_name: &str) -> Result<QName> {
        match split_qname(prefixed_name) {
            (None, local) => Ok(QName::local(local)),
            (Some(_), _) => self.resolve(prefixed_name),
        }
    }
}
