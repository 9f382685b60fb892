//! Tree walking contract
//!
//! The validator never owns the document it checks. It sees the tree through a
//! [`TreeWalker`] whose nodes implement [`XmlNode`]. Two node types are
//! provided: [`NodeRef`](crate::documents::NodeRef) for the crate's own
//! [`Document`](crate::documents::Document), and `roxmltree::Node`.

use serde::Serialize;

use crate::error::NodeInfo;
use crate::namespaces::QName;

/// Kind of a tree node as far as validation is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Element node
    Element,
    /// Text or CDATA node
    Text,
    /// Comment node
    Comment,
    /// Anything else (document root, processing instruction, ...)
    Other,
}

/// One attribute as exposed by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlAttribute<'a> {
    /// Namespace URI, empty for none
    pub namespace: &'a str,
    /// Local name
    pub local_name: &'a str,
    /// Attribute value
    pub value: &'a str,
}

/// Read access to a node of the validated tree
pub trait XmlNode: Clone + PartialEq {
    /// Node kind
    fn kind(&self) -> NodeKind;

    /// Namespace URI of an element, empty for none
    fn namespace(&self) -> &str;

    /// Local name of an element, empty for other nodes
    fn local_name(&self) -> &str;

    /// Value of a text or comment node
    fn text(&self) -> Option<&str>;

    /// Attributes in document order; may include namespace declarations
    fn attributes(&self) -> Vec<XmlAttribute<'_>>;

    /// Parent node
    fn parent(&self) -> Option<Self>;

    /// First child node
    fn first_child(&self) -> Option<Self>;

    /// Next sibling node
    fn next_sibling(&self) -> Option<Self>;

    /// Detached description for diagnostics
    fn info(&self) -> NodeInfo {
        let kind = self.kind();
        NodeInfo {
            kind,
            name: (kind == NodeKind::Element)
                .then(|| QName::new(self.namespace(), self.local_name())),
            value: match kind {
                NodeKind::Text | NodeKind::Comment => self.text().map(str::to_string),
                _ => None,
            },
        }
    }
}

/// DOM-style tree walker
///
/// Navigation methods return the new current node, or `None` and leave the
/// current node unchanged when there is no such node.
pub trait TreeWalker {
    /// Node type
    type Node: XmlNode;

    /// Node the walker was created for; navigation never leaves its subtree
    fn root(&self) -> Self::Node;

    /// Current node
    fn current_node(&self) -> Self::Node;

    /// Reposition the walker
    fn set_current_node(&mut self, node: Self::Node);

    /// Move to the first child of the current node
    fn first_child(&mut self) -> Option<Self::Node>;

    /// Move to the next sibling of the current node
    fn next_sibling(&mut self) -> Option<Self::Node>;

    /// Move to the parent of the current node
    fn parent_node(&mut self) -> Option<Self::Node>;
}

impl<W: TreeWalker + ?Sized> TreeWalker for &mut W {
    type Node = W::Node;

    fn root(&self) -> Self::Node {
        (**self).root()
    }

    fn current_node(&self) -> Self::Node {
        (**self).current_node()
    }

    fn set_current_node(&mut self, node: Self::Node) {
        (**self).set_current_node(node)
    }

    fn first_child(&mut self) -> Option<Self::Node> {
        (**self).first_child()
    }

    fn next_sibling(&mut self) -> Option<Self::Node> {
        (**self).next_sibling()
    }

    fn parent_node(&mut self) -> Option<Self::Node> {
        (**self).parent_node()
    }
}

/// Walker over any [`XmlNode`] tree, rooted at a given node
#[derive(Debug, Clone)]
pub struct NodeWalker<N> {
    root: N,
    current: N,
}

impl<N: XmlNode> NodeWalker<N> {
    /// Create a walker positioned at `root`
    pub fn new(root: N) -> Self {
        Self {
            current: root.clone(),
            root,
        }
    }

    fn move_to(&mut self, node: Option<N>) -> Option<N> {
        if let Some(ref n) = node {
            self.current = n.clone();
        }
        node
    }
}

impl<N: XmlNode> TreeWalker for NodeWalker<N> {
    type Node = N;

    fn root(&self) -> N {
        self.root.clone()
    }

    fn current_node(&self) -> N {
        self.current.clone()
    }

    fn set_current_node(&mut self, node: N) {
        self.current = node;
    }

    fn first_child(&mut self) -> Option<N> {
        let child = self.current.first_child();
        self.move_to(child)
    }

    fn next_sibling(&mut self) -> Option<N> {
        if self.current == self.root {
            return None;
        }
        let sibling = self.current.next_sibling();
        self.move_to(sibling)
    }

    fn parent_node(&mut self) -> Option<N> {
        if self.current == self.root {
            return None;
        }
        let parent = self.current.parent();
        self.move_to(parent)
    }
}

impl<'a, 'input: 'a> XmlNode for roxmltree::Node<'a, 'input> {
    fn kind(&self) -> NodeKind {
        match self.node_type() {
            roxmltree::NodeType::Element => NodeKind::Element,
            roxmltree::NodeType::Text => NodeKind::Text,
            roxmltree::NodeType::Comment => NodeKind::Comment,
            roxmltree::NodeType::Root | roxmltree::NodeType::PI => NodeKind::Other,
        }
    }

    fn namespace(&self) -> &str {
        self.tag_name().namespace().unwrap_or("")
    }

    fn local_name(&self) -> &str {
        self.tag_name().name()
    }

    fn text(&self) -> Option<&str> {
        match self.node_type() {
            roxmltree::NodeType::Text | roxmltree::NodeType::Comment => {
                roxmltree::Node::text(self)
            }
            _ => None,
        }
    }

    fn attributes(&self) -> Vec<XmlAttribute<'_>> {
        // roxmltree keeps namespace declarations out of the attribute list
        roxmltree::Node::attributes(self)
            .map(|a| XmlAttribute {
                namespace: a.namespace().unwrap_or(""),
                local_name: a.name(),
                value: a.value(),
            })
            .collect()
    }

    fn parent(&self) -> Option<Self> {
        roxmltree::Node::parent(self)
    }

    fn first_child(&self) -> Option<Self> {
        roxmltree::Node::first_child(self)
    }

    fn next_sibling(&self) -> Option<Self> {
        roxmltree::Node::next_sibling(self)
    }
}
