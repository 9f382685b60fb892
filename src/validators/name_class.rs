//! Name classes
//!
//! A name class decides which (namespace, local name) pairs an `element` or
//! `attribute` pattern accepts.

use std::fmt;

use crate::error::GrammarError;
use crate::namespaces::QName;

use super::grammar::{GrammarKind, GrammarNode};

/// Predicate over element and attribute names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameClass {
    /// Exactly one name
    Name(QName),
    /// Any of several name classes
    Choice(Vec<NameClass>),
    /// Any name in a namespace
    NsName(String),
    /// Any name at all
    AnyName,
}

impl NameClass {
    /// Build a name class from a simplified `name`, `choice`, `nsName` or
    /// `anyName` node
    pub fn from_node(node: &GrammarNode) -> Result<Self, GrammarError> {
        match node.kind {
            GrammarKind::Name => node
                .name
                .clone()
                .map(NameClass::Name)
                .ok_or_else(|| GrammarError::InvalidName(node.text.clone().unwrap_or_default())),
            GrammarKind::Choice => {
                let mut members = Vec::with_capacity(node.children.len());
                for child in &node.children {
                    match Self::from_node(child)? {
                        NameClass::Choice(nested) => members.extend(nested),
                        other => members.push(other),
                    }
                }
                Ok(NameClass::Choice(members))
            }
            // `except` children were dropped while parsing
            GrammarKind::NsName => Ok(NameClass::NsName(
                node.attributes.get("ns").cloned().unwrap_or_default(),
            )),
            GrammarKind::AnyName => Ok(NameClass::AnyName),
            _ => Err(GrammarError::Unsupported(format!(
                "{} as a name class",
                node.kind
            ))),
        }
    }

    /// Check whether the name class matches a node name
    pub fn contains(&self, namespace: &str, local_name: &str) -> bool {
        match self {
            NameClass::Name(name) => name.matches(namespace, local_name),
            NameClass::Choice(members) => members.iter().any(|m| m.contains(namespace, local_name)),
            NameClass::NsName(ns) => ns == namespace,
            NameClass::AnyName => true,
        }
    }

    /// Check whether the name class matches a QName
    pub fn contains_qname(&self, name: &QName) -> bool {
        self.contains(name.namespace_str(), &name.local_name)
    }

    /// Stable identity string, used to share name classes between patterns
    pub fn key(&self) -> String {
        match self {
            NameClass::Name(name) => format!("{{{}}}{}", name.namespace_str(), name.local_name),
            NameClass::Choice(members) => {
                // member order does not change the set of names
                let mut keys: Vec<String> = members.iter().map(|m| m.key() + ",").collect();
                keys.sort();
                keys.dedup();
                keys.concat()
            }
            NameClass::NsName(ns) => format!("{{{}}}*", ns),
            NameClass::AnyName => "anyName".to_string(),
        }
    }

    /// Human-readable list of the accepted names
    pub fn describe(&self) -> String {
        match self {
            NameClass::Name(name) => name.to_string(),
            NameClass::Choice(members) => members
                .iter()
                .map(|m| m.describe())
                .collect::<Vec<_>>()
                .join(" or "),
            NameClass::NsName(ns) => format!("any name in {{{}}}", ns),
            NameClass::AnyName => "any name".to_string(),
        }
    }
}

impl fmt::Display for NameClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}
