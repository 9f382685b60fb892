//! RELAX NG grammar loading
//!
//! Turns a schema [`Document`] into [`GrammarNode`]s, applying the
//! syntax-level simplification rules on the way: whitespace trimming,
//! `ns`/`datatypeLibrary` inheritance, name resolution, hoisting of `name`
//! attributes, binarization of n-ary compositors and the desugaring of
//! `mixed`, `optional` and `zeroOrMore`. Every `element` is moved into a flat
//! list and replaced by an [`GrammarKind::ElementRef`].

use std::fmt;

use indexmap::IndexMap;

use crate::documents::{Document, NodeRef};
use crate::error::{GrammarError, Result};
use crate::names::{is_valid_qname, is_xml_space, split_qname};
use crate::namespaces::QName;
use crate::tree::{NodeKind, XmlNode};
use crate::RELAXNG_NAMESPACE;

/// Kind of a grammar node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    /// `element`
    Element,
    /// `attribute`
    Attribute,
    /// `choice`
    Choice,
    /// `group`
    Group,
    /// `interleave`
    Interleave,
    /// `oneOrMore`
    OneOrMore,
    /// `zeroOrMore`
    ZeroOrMore,
    /// `optional`
    Optional,
    /// `mixed`
    Mixed,
    /// `list`
    List,
    /// `ref`
    Ref,
    /// `parentRef`
    ParentRef,
    /// `define`
    Define,
    /// `value`
    Value,
    /// `data`
    Data,
    /// `text`
    Text,
    /// `empty`
    Empty,
    /// `notAllowed`
    NotAllowed,
    /// `start`
    Start,
    /// `grammar`
    Grammar,
    /// `div`
    Div,
    /// `include`
    Include,
    /// `externalRef`
    ExternalRef,
    /// `name`
    Name,
    /// `anyName`
    AnyName,
    /// `nsName`
    NsName,
    /// `except`
    Except,
    /// `param`
    Param,
    /// Placeholder for the registered element with this index
    ElementRef(usize),
}

impl GrammarKind {
    /// Map a RELAX NG element name to its kind
    pub fn from_local_name(name: &str) -> Option<Self> {
        let kind = match name {
            "element" => Self::Element,
            "attribute" => Self::Attribute,
            "choice" => Self::Choice,
            "group" => Self::Group,
            "interleave" => Self::Interleave,
            "oneOrMore" => Self::OneOrMore,
            "zeroOrMore" => Self::ZeroOrMore,
            "optional" => Self::Optional,
            "mixed" => Self::Mixed,
            "list" => Self::List,
            "ref" => Self::Ref,
            "parentRef" => Self::ParentRef,
            "define" => Self::Define,
            "value" => Self::Value,
            "data" => Self::Data,
            "text" => Self::Text,
            "empty" => Self::Empty,
            "notAllowed" => Self::NotAllowed,
            "start" => Self::Start,
            "grammar" => Self::Grammar,
            "div" => Self::Div,
            "include" => Self::Include,
            "externalRef" => Self::ExternalRef,
            "name" => Self::Name,
            "anyName" => Self::AnyName,
            "nsName" => Self::NsName,
            "except" => Self::Except,
            "param" => Self::Param,
            _ => return None,
        };
        Some(kind)
    }

    /// RELAX NG element name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Element => "element",
            Self::Attribute => "attribute",
            Self::Choice => "choice",
            Self::Group => "group",
            Self::Interleave => "interleave",
            Self::OneOrMore => "oneOrMore",
            Self::ZeroOrMore => "zeroOrMore",
            Self::Optional => "optional",
            Self::Mixed => "mixed",
            Self::List => "list",
            Self::Ref => "ref",
            Self::ParentRef => "parentRef",
            Self::Define => "define",
            Self::Value => "value",
            Self::Data => "data",
            Self::Text => "text",
            Self::Empty => "empty",
            Self::NotAllowed => "notAllowed",
            Self::Start => "start",
            Self::Grammar => "grammar",
            Self::Div => "div",
            Self::Include => "include",
            Self::ExternalRef => "externalRef",
            Self::Name => "name",
            Self::AnyName => "anyName",
            Self::NsName => "nsName",
            Self::Except => "except",
            Self::Param => "param",
            Self::ElementRef(_) => "elementref",
        }
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Node of the simplified grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarNode {
    /// Node kind
    pub kind: GrammarKind,
    /// Child patterns and name classes
    pub children: Vec<GrammarNode>,
    /// Unqualified attributes in document order
    pub attributes: IndexMap<String, String>,
    /// Literal text
    pub text: Option<String>,
    /// Resolved name of a `name` node
    pub name: Option<QName>,
}

impl GrammarNode {
    /// Create a node without children
    pub fn new(kind: GrammarKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            attributes: IndexMap::new(),
            text: None,
            name: None,
        }
    }

    /// Create a node with children
    pub fn with_children(kind: GrammarKind, children: Vec<GrammarNode>) -> Self {
        Self {
            children,
            ..Self::new(kind)
        }
    }

    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn arity(&self) -> GrammarError {
        GrammarError::Arity {
            kind: self.kind.to_string(),
            count: self.children.len(),
        }
    }
}

/// Loaded grammar, before `ref` resolution
#[derive(Debug, Clone)]
pub struct Grammar {
    /// The start pattern
    pub start: GrammarNode,
    /// Named definitions, already combined
    pub defines: IndexMap<String, GrammarNode>,
    /// Registered elements as `[name class, content]` nodes
    pub elements: Vec<GrammarNode>,
}

impl Grammar {
    /// Load a grammar from a parsed schema document
    pub fn from_document(doc: &Document) -> Result<Self> {
        let root = doc.root();
        if root.namespace() != RELAXNG_NAMESPACE {
            return Err(GrammarError::NotRelaxNg(root.local_name().to_string()).into());
        }

        let mut parser = GrammarParser::default();
        let top = parser
            .parse(root, &Scope::default())?
            .ok_or_else(|| GrammarError::NotRelaxNg(root.local_name().to_string()))?;

        if top.kind != GrammarKind::Grammar {
            log::debug!("schema root is a bare {} pattern", top.kind);
            return Ok(Grammar {
                start: top,
                defines: IndexMap::new(),
                elements: parser.elements,
            });
        }

        let mut starts = Combiner::default();
        let mut defines: IndexMap<String, Combiner> = IndexMap::new();
        for child in top.children {
            match child.kind {
                GrammarKind::Start => {
                    let combine = child.attribute("combine").map(str::to_string);
                    let body = single_child(child)?;
                    starts.add("start", body, combine.as_deref())?;
                }
                GrammarKind::Define => {
                    let name = child
                        .attribute("name")
                        .ok_or_else(|| GrammarError::InvalidName(String::new()))?
                        .to_string();
                    let combine = child.attribute("combine").map(str::to_string);
                    let body = single_child(child)?;
                    defines
                        .entry(name.clone())
                        .or_default()
                        .add(&name, body, combine.as_deref())?;
                }
                other => log::debug!("ignoring {} in grammar", other),
            }
        }

        let start = starts.finish().ok_or(GrammarError::MissingStart)?;
        let defines = defines
            .into_iter()
            .filter_map(|(name, combined)| combined.finish().map(|body| (name, body)))
            .collect();

        Ok(Grammar {
            start,
            defines,
            elements: parser.elements,
        })
    }
}

fn single_child(mut node: GrammarNode) -> std::result::Result<GrammarNode, GrammarError> {
    if node.children.len() != 1 {
        return Err(node.arity());
    }
    Ok(node.children.remove(0))
}

/// Collects the bodies of a `start` or of one `define` name
#[derive(Debug, Default)]
struct Combiner {
    bodies: Vec<GrammarNode>,
    method: Option<GrammarKind>,
    has_plain: bool,
}

impl Combiner {
    fn add(
        &mut self,
        name: &str,
        body: GrammarNode,
        combine: Option<&str>,
    ) -> std::result::Result<(), GrammarError> {
        match combine {
            None => {
                if self.has_plain {
                    return Err(GrammarError::DuplicateDefine(name.to_string()));
                }
                self.has_plain = true;
            }
            Some(method) => {
                let kind = match method {
                    "choice" => GrammarKind::Choice,
                    "interleave" => GrammarKind::Interleave,
                    _ => return Err(GrammarError::CombineConflict(name.to_string())),
                };
                if self.method.is_some_and(|m| m != kind) {
                    return Err(GrammarError::CombineConflict(name.to_string()));
                }
                self.method = Some(kind);
            }
        }
        if !self.bodies.is_empty() {
            log::debug!("combining definitions of '{}'", name);
        }
        self.bodies.push(body);
        Ok(())
    }

    fn finish(self) -> Option<GrammarNode> {
        let method = self.method.unwrap_or(GrammarKind::Choice);
        let mut bodies = self.bodies;
        if bodies.len() > 1 {
            binarize(method, &mut bodies);
            return Some(GrammarNode::with_children(method, bodies));
        }
        bodies.pop()
    }
}

/// Inherited context of a schema element
#[derive(Debug, Clone, Default)]
struct Scope {
    ns: String,
    datatype_library: String,
}

#[derive(Debug, Default)]
struct GrammarParser {
    elements: Vec<GrammarNode>,
}

impl GrammarParser {
    /// Parse one RELAX NG element; `None` means the node is dropped
    fn parse(&mut self, node: NodeRef<'_>, scope: &Scope) -> Result<Option<GrammarNode>> {
        let kind = GrammarKind::from_local_name(node.local_name())
            .ok_or_else(|| GrammarError::Unsupported(node.local_name().to_string()))?;

        match kind {
            GrammarKind::Include | GrammarKind::ExternalRef | GrammarKind::ParentRef => {
                return Err(GrammarError::Unsupported(kind.to_string()).into());
            }
            GrammarKind::Except | GrammarKind::Param => {
                log::debug!("{} is not checked, accepting", kind);
                return Ok(None);
            }
            _ => {}
        }

        let mut grammar_node = GrammarNode::new(kind);
        for attribute in node.attributes() {
            if attribute.namespace.is_empty() {
                grammar_node
                    .attributes
                    .insert(attribute.local_name.to_string(), attribute.value.to_string());
            }
        }

        let mut scope = scope.clone();
        if let Some(ns) = grammar_node.attribute("ns") {
            scope.ns = ns.to_string();
        }
        if let Some(library) = grammar_node.attribute("datatypeLibrary") {
            scope.datatype_library = library.to_string();
        }

        let mut text = String::new();
        for child in node.children() {
            match child.kind() {
                NodeKind::Element if child.namespace() == RELAXNG_NAMESPACE => {
                    match self.parse(child, &scope)? {
                        Some(parsed) if parsed.kind == GrammarKind::Div => {
                            grammar_node.children.extend(parsed.children);
                        }
                        Some(parsed) if parsed.kind == GrammarKind::Grammar => {
                            return Err(GrammarError::Unsupported("nested grammar".into()).into());
                        }
                        Some(parsed) => grammar_node.children.push(parsed),
                        None => {}
                    }
                }
                NodeKind::Element => {
                    log::trace!("skipping annotation element {}", child.local_name());
                }
                NodeKind::Text => text.push_str(child.text().unwrap_or_default()),
                NodeKind::Comment | NodeKind::Other => {}
            }
        }

        // whitespace is significant only in value and param
        grammar_node.text = Some(if kind == GrammarKind::Value {
            text
        } else {
            text.trim_matches(is_xml_space).to_string()
        });

        match kind {
            GrammarKind::Value => {
                if !grammar_node.attributes.contains_key("type") {
                    grammar_node.attributes.insert("type".into(), "token".into());
                    grammar_node.attributes.insert("datatypeLibrary".into(), String::new());
                } else {
                    grammar_node
                        .attributes
                        .insert("datatypeLibrary".into(), scope.datatype_library.clone());
                }
                grammar_node.attributes.insert("ns".into(), scope.ns.clone());
            }
            GrammarKind::Data => {
                grammar_node
                    .attributes
                    .insert("datatypeLibrary".into(), scope.datatype_library.clone());
            }
            GrammarKind::Element | GrammarKind::Attribute => {
                if let Some(qname) = grammar_node.attributes.shift_remove("name") {
                    let default_ns = if kind == GrammarKind::Element {
                        scope.ns.clone()
                    } else {
                        grammar_node.attribute("ns").unwrap_or_default().to_string()
                    };
                    let mut name = GrammarNode::new(GrammarKind::Name);
                    name.name = Some(resolve_name(node, &qname, &default_ns)?);
                    name.text = Some(qname);
                    grammar_node.children.insert(0, name);
                }
            }
            GrammarKind::Name => {
                let qname = grammar_node.text.clone().unwrap_or_default();
                grammar_node.name = Some(resolve_name(node, &qname, &scope.ns)?);
            }
            GrammarKind::NsName => {
                grammar_node.attributes.insert("ns".into(), scope.ns.clone());
            }
            _ => {}
        }

        simplify_shape(&mut grammar_node)?;

        if grammar_node.kind == GrammarKind::Element {
            let index = self.elements.len();
            self.elements.push(grammar_node);
            return Ok(Some(GrammarNode::new(GrammarKind::ElementRef(index))));
        }
        Ok(Some(grammar_node))
    }
}

/// Resolve a QName from a `name` attribute or element
fn resolve_name(
    node: NodeRef<'_>,
    qname: &str,
    default_ns: &str,
) -> std::result::Result<QName, GrammarError> {
    if !is_valid_qname(qname) {
        return Err(GrammarError::InvalidName(qname.to_string()));
    }
    match split_qname(qname) {
        (Some(prefix), local) => {
            let namespace = node
                .namespaces()
                .and_then(|ns| ns.get_namespace(prefix))
                .ok_or_else(|| GrammarError::UnknownPrefix(prefix.to_string()))?;
            Ok(QName::new(namespace, local))
        }
        (None, local) => Ok(QName::new(default_ns, local)),
    }
}

/// Turn `[c0, c1, c2, ...]` into `[c0, kind(c1, kind(c2, ...))]`
fn binarize(kind: GrammarKind, children: &mut Vec<GrammarNode>) {
    while children.len() > 2 {
        if let (Some(last), Some(before)) = (children.pop(), children.pop()) {
            children.push(GrammarNode::with_children(kind, vec![before, last]));
        }
    }
}

/// Child-count normalization and desugaring
fn simplify_shape(node: &mut GrammarNode) -> std::result::Result<(), GrammarError> {
    use GrammarKind::*;

    match node.kind {
        Define | OneOrMore | ZeroOrMore | Optional | List | Mixed if node.children.len() > 1 => {
            let mut children = std::mem::take(&mut node.children);
            binarize(Group, &mut children);
            node.children = vec![GrammarNode::with_children(Group, children)];
        }
        Element if node.children.len() > 2 => {
            let mut rest = node.children.split_off(1);
            binarize(Group, &mut rest);
            node.children.push(GrammarNode::with_children(Group, rest));
        }
        Attribute if node.children.len() == 1 => {
            node.children.push(GrammarNode::new(Text));
        }
        Choice | Group | Interleave if node.children.len() == 1 => {
            if let Some(child) = node.children.pop() {
                *node = child;
            }
            return Ok(());
        }
        Choice | Group | Interleave if node.children.len() > 2 => {
            let kind = node.kind;
            binarize(kind, &mut node.children);
        }
        _ => {}
    }

    match node.kind {
        Mixed | Optional | ZeroOrMore | OneOrMore if node.children.len() != 1 => {
            return Err(node.arity());
        }
        Element | Attribute | Choice | Group | Interleave if node.children.len() != 2 => {
            return Err(node.arity());
        }
        Mixed => {
            node.kind = Interleave;
            node.children.push(GrammarNode::new(Text));
        }
        Optional => {
            node.kind = Choice;
            node.children.push(GrammarNode::new(Empty));
        }
        ZeroOrMore => {
            let repeated = GrammarNode::with_children(OneOrMore, std::mem::take(&mut node.children));
            node.kind = Choice;
            node.children = vec![repeated, GrammarNode::new(Empty)];
        }
        _ => {}
    }
    Ok(())
}
