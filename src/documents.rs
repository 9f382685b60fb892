//! XML document handling
//!
//! This module provides an owned, namespace-resolved XML tree. It is used to
//! hold RELAX NG schemas while they are loaded, and it can be validated like
//! any other tree through [`Document::walker`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName};
use crate::tree::{NodeKind, NodeWalker, XmlAttribute, XmlNode};

/// Index of a node inside its [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// XML attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name; namespace declarations live in the xmlns namespace
    pub name: QName,
    /// Attribute value
    pub value: String,
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    name: Option<QName>,
    attributes: Vec<Attribute>,
    text: Option<String>,
    namespaces: Option<NamespaceContext>,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            attributes: Vec::new(),
            text: None,
            namespaces: None,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
        }
    }
}

/// XML Document representation
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
}

impl Document {
    /// Parse an XML document from a string with default limits
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document, enforcing the given limits
    pub fn parse_with_limits(xml: &str, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut doc = Document {
            nodes: Vec::new(),
            root: None,
        };
        let mut stack: Vec<(NodeId, NamespaceContext)> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    limits.check_xml_depth(stack.len() + 1)?;
                    let (id, scope) = doc.open_element(&e, &stack, limits)?;
                    stack.push((id, scope));
                }
                Ok(Event::Empty(e)) => {
                    limits.check_xml_depth(stack.len() + 1)?;
                    doc.open_element(&e, &stack, limits)?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(e)) => {
                    if let Some((parent, _)) = stack.last() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?
                            .to_string();
                        doc.append_text(*parent, NodeKind::Text, text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some((parent, _)) = stack.last() {
                        let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                        doc.append_text(*parent, NodeKind::Text, text);
                    }
                }
                Ok(Event::Comment(e)) => {
                    if let Some((parent, _)) = stack.last() {
                        let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                        doc.append_text(*parent, NodeKind::Comment, text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // processing instructions, declarations, doctype
            }
        }

        if doc.root.is_none() {
            return Err(Error::Xml("Document has no root element".to_string()));
        }
        if let Some((open, _)) = stack.last() {
            let name = doc.nodes[open.0]
                .name
                .as_ref()
                .map(|n| n.to_string())
                .unwrap_or_default();
            return Err(Error::Xml(format!("Unclosed element '{}'", name)));
        }

        Ok(doc)
    }

    /// Create an element node from a start tag and link it into the tree
    fn open_element(
        &mut self,
        start: &BytesStart,
        stack: &[(NodeId, NamespaceContext)],
        limits: &Limits,
    ) -> Result<(NodeId, NamespaceContext)> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
            .to_string();

        let mut scope = stack
            .last()
            .map(|(_, scope)| scope.clone())
            .unwrap_or_default();

        // Namespace declarations first, they apply to the element's own name
        let mut raw = Vec::new();
        for attr_result in start.attributes() {
            let attr =
                attr_result.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;
            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
                .to_string();
            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            let declared = scope.declare(&attr_name, &attr_value)?;
            raw.push((attr_name, declared, attr_value));
        }
        limits.check_attributes(raw.len())?;

        let mut attributes = Vec::with_capacity(raw.len());
        for (attr_name, declared, value) in raw {
            let name = match declared {
                Some(name) => name,
                None => scope.resolve_attribute(&attr_name)?,
            };
            attributes.push(Attribute { name, value });
        }

        let mut data = NodeData::new(NodeKind::Element);
        data.name = Some(scope.resolve(&name)?);
        data.attributes = attributes;
        data.namespaces = Some(scope.clone());

        let id = match stack.last() {
            Some((parent, _)) => self.append(*parent, data),
            None => {
                if self.root.is_some() {
                    return Err(Error::Xml("Document has more than one root element".into()));
                }
                let id = self.push(data);
                self.root = Some(id);
                id
            }
        };

        Ok((id, scope))
    }

    fn append_text(&mut self, parent: NodeId, kind: NodeKind, text: String) {
        // adjacent text events (e.g. around entities or CDATA) form one node
        if kind == NodeKind::Text {
            if let Some(last) = self.nodes[parent.0].last_child {
                let last = &mut self.nodes[last.0];
                if last.kind == NodeKind::Text {
                    if let Some(existing) = last.text.as_mut() {
                        existing.push_str(&text);
                        return;
                    }
                }
            }
        }
        let mut data = NodeData::new(kind);
        data.text = Some(text);
        self.append(parent, data);
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    fn append(&mut self, parent: NodeId, mut data: NodeData) -> NodeId {
        data.parent = Some(parent);
        let id = self.push(data);
        match self.nodes[parent.0].last_child {
            Some(last) => self.nodes[last.0].next_sibling = Some(id),
            None => self.nodes[parent.0].first_child = Some(id),
        }
        self.nodes[parent.0].last_child = Some(id);
        id
    }

    /// Get the root element
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            doc: self,
            // a parsed document always has a root element
            id: self.root.unwrap_or(NodeId(0)),
        }
    }

    /// Walker positioned at the root element
    pub fn walker(&self) -> NodeWalker<NodeRef<'_>> {
        NodeWalker::new(self.root())
    }

    /// Number of nodes in the document
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Borrowed handle to one node of a [`Document`]
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl<'d> NodeRef<'d> {
    fn data(&self) -> &'d NodeData {
        &self.doc.nodes[self.id.0]
    }

    fn at(&self, id: Option<NodeId>) -> Option<NodeRef<'d>> {
        id.map(|id| NodeRef { doc: self.doc, id })
    }

    /// Node index
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Element name
    pub fn name(&self) -> Option<&'d QName> {
        self.data().name.as_ref()
    }

    /// All attributes, namespace declarations included
    pub fn attribute_list(&self) -> &'d [Attribute] {
        &self.data().attributes
    }

    /// Value of an attribute by namespace and local name
    pub fn attribute(&self, namespace: &str, local_name: &str) -> Option<&'d str> {
        self.data()
            .attributes
            .iter()
            .find(|a| a.name.matches(namespace, local_name))
            .map(|a| a.value.as_str())
    }

    /// Prefix bindings in scope at this element
    pub fn namespaces(&self) -> Option<&'d NamespaceContext> {
        self.data().namespaces.as_ref()
    }

    /// Child nodes in document order
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'d>> + 'd {
        let doc = self.doc;
        std::iter::successors(self.at(self.data().first_child), move |n| {
            n.at(doc.nodes[n.id.0].next_sibling)
        })
    }
}

impl<'d> XmlNode for NodeRef<'d> {
    fn kind(&self) -> NodeKind {
        self.data().kind
    }

    fn namespace(&self) -> &str {
        self.data()
            .name
            .as_ref()
            .map(|n| n.namespace_str())
            .unwrap_or("")
    }

    fn local_name(&self) -> &str {
        self.data()
            .name
            .as_ref()
            .map(|n| n.local_name.as_str())
            .unwrap_or("")
    }

    fn text(&self) -> Option<&str> {
        self.data().text.as_deref()
    }

    fn attributes(&self) -> Vec<XmlAttribute<'_>> {
        self.data()
            .attributes
            .iter()
            .map(|a| XmlAttribute {
                namespace: a.name.namespace_str(),
                local_name: &a.name.local_name,
                value: &a.value,
            })
            .collect()
    }

    fn parent(&self) -> Option<Self> {
        self.at(self.data().parent)
    }

    fn first_child(&self) -> Option<Self> {
        self.at(self.data().first_child)
    }

    fn next_sibling(&self) -> Option<Self> {
        self.at(self.data().next_sibling)
    }
}
