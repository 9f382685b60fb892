//! Derivatives of patterns with respect to tree events
//!
//! Each function returns the pattern that describes what may follow after
//! one event (start tag, attribute, end of start tag, text, end tag). A
//! document is accepted when the derivative over its root element is
//! nullable.

use crate::names::{is_whitespace, normalize_token};
use crate::namespaces::QName;
use crate::tree::{NodeKind, TreeWalker, XmlAttribute, XmlNode};
use crate::XMLNS_NAMESPACE;

use super::patterns::{MemoKey, Pattern, PatternArena, PatternId};

/// Continuation rewrite applied below `after` patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterOp {
    /// `p` becomes `interleave(p, other)`
    InterleaveLeft(PatternId),
    /// `p` becomes `interleave(other, p)`
    InterleaveRight(PatternId),
    /// `p` becomes `group(p, other)`
    Group(PatternId),
    /// `p` becomes `after(p, other)`
    After(PatternId),
}

impl<'p> PatternArena<'p> {
    fn apply_op(&mut self, op: AfterOp, p: PatternId) -> PatternId {
        match op {
            AfterOp::InterleaveLeft(other) => self.interleave(p, other),
            AfterOp::InterleaveRight(other) => self.interleave(other, p),
            AfterOp::Group(other) => self.group(p, other),
            AfterOp::After(other) => self.after(p, other),
        }
    }

    /// Rewrite the continuation of every `after` reachable through choices
    pub fn apply_after(&mut self, op: AfterOp, p: PatternId) -> PatternId {
        match *self.get(p) {
            Pattern::After(p1, p2) => {
                let rewritten = self.apply_op(op, p2);
                self.after(p1, rewritten)
            }
            Pattern::Choice(p1, p2) => {
                let a = self.apply_after(op, p1);
                let b = self.apply_after(op, p2);
                self.choice(a, b)
            }
            _ => p,
        }
    }

    /// Derivative for a text node
    pub fn text_deriv(&mut self, p: PatternId, text: &str) -> PatternId {
        match self.get(p).clone() {
            Pattern::Choice(p1, p2) => {
                let a = self.text_deriv(p1, text);
                let b = self.text_deriv(p2, text);
                self.choice(a, b)
            }
            Pattern::Interleave(p1, p2) => {
                let d1 = self.text_deriv(p1, text);
                let left = self.interleave(d1, p2);
                let d2 = self.text_deriv(p2, text);
                let right = self.interleave(p1, d2);
                self.choice(left, right)
            }
            Pattern::Group(p1, p2) => {
                let d1 = self.text_deriv(p1, text);
                let g = self.group(d1, p2);
                if self.nullable(p1) {
                    let d2 = self.text_deriv(p2, text);
                    self.choice(g, d2)
                } else {
                    g
                }
            }
            Pattern::After(p1, p2) => {
                let d1 = self.text_deriv(p1, text);
                self.after(d1, p2)
            }
            Pattern::OneOrMore(inner) => {
                let d = self.text_deriv(inner, text);
                let rest = self.choice(p, PatternId::EMPTY);
                self.group(d, rest)
            }
            Pattern::Text => p,
            Pattern::Value { value, token } => {
                let equal = if token {
                    normalize_token(&value) == normalize_token(text)
                } else {
                    value == text
                };
                if equal {
                    PatternId::EMPTY
                } else {
                    PatternId::NOT_ALLOWED
                }
            }
            // datatypes and lists are not checked
            Pattern::Data { .. } | Pattern::List(_) => PatternId::EMPTY,
            Pattern::NotAllowed
            | Pattern::Empty
            | Pattern::Element { .. }
            | Pattern::Attribute { .. } => PatternId::NOT_ALLOWED,
        }
    }

    /// Derivative for an opening tag, before its attributes
    pub fn start_tag_open_deriv(&mut self, p: PatternId, name: &QName) -> PatternId {
        let key = MemoKey::StartTagOpen(p, name.clone());
        if let Some(id) = self.memoized(&key) {
            return id;
        }
        let result = match self.get(p).clone() {
            Pattern::Choice(p1, p2) => {
                let a = self.start_tag_open_deriv(p1, name);
                let b = self.start_tag_open_deriv(p2, name);
                self.choice(a, b)
            }
            Pattern::Element {
                name: name_class,
                content,
            } => {
                if name_class.contains_qname(name) {
                    self.after(content, PatternId::EMPTY)
                } else {
                    PatternId::NOT_ALLOWED
                }
            }
            Pattern::Interleave(p1, p2) => {
                let d1 = self.start_tag_open_deriv(p1, name);
                let left = self.apply_after(AfterOp::InterleaveLeft(p2), d1);
                let d2 = self.start_tag_open_deriv(p2, name);
                let right = self.apply_after(AfterOp::InterleaveRight(p1), d2);
                self.choice(left, right)
            }
            Pattern::OneOrMore(inner) => {
                let d = self.start_tag_open_deriv(inner, name);
                let rest = self.choice(p, PatternId::EMPTY);
                self.apply_after(AfterOp::Group(rest), d)
            }
            Pattern::Group(p1, p2) => {
                let d1 = self.start_tag_open_deriv(p1, name);
                let x = self.apply_after(AfterOp::Group(p2), d1);
                if self.nullable(p1) {
                    let d2 = self.start_tag_open_deriv(p2, name);
                    self.choice(x, d2)
                } else {
                    x
                }
            }
            Pattern::After(p1, p2) => {
                let d1 = self.start_tag_open_deriv(p1, name);
                self.apply_after(AfterOp::After(p2), d1)
            }
            Pattern::NotAllowed
            | Pattern::Empty
            | Pattern::Text
            | Pattern::Value { .. }
            | Pattern::Data { .. }
            | Pattern::List(_)
            | Pattern::Attribute { .. } => PatternId::NOT_ALLOWED,
        };
        self.memoize(key, result)
    }

    /// Derivative for one attribute
    pub fn att_deriv(&mut self, p: PatternId, attribute: &XmlAttribute<'_>) -> PatternId {
        match self.get(p).clone() {
            Pattern::After(p1, p2) => {
                let d1 = self.att_deriv(p1, attribute);
                self.after(d1, p2)
            }
            Pattern::Choice(p1, p2) => {
                let a = self.att_deriv(p1, attribute);
                let b = self.att_deriv(p2, attribute);
                self.choice(a, b)
            }
            Pattern::Group(p1, p2) => {
                let d1 = self.att_deriv(p1, attribute);
                let left = self.group(d1, p2);
                let d2 = self.att_deriv(p2, attribute);
                let right = self.group(p1, d2);
                self.choice(left, right)
            }
            Pattern::Interleave(p1, p2) => {
                let d1 = self.att_deriv(p1, attribute);
                let left = self.interleave(d1, p2);
                let d2 = self.att_deriv(p2, attribute);
                let right = self.interleave(p1, d2);
                self.choice(left, right)
            }
            Pattern::OneOrMore(inner) => {
                let d = self.att_deriv(inner, attribute);
                let rest = self.choice(p, PatternId::EMPTY);
                self.group(d, rest)
            }
            Pattern::Attribute { name, content } => {
                if name.contains(attribute.namespace, attribute.local_name)
                    && self.value_match(content, attribute.value)
                {
                    PatternId::EMPTY
                } else {
                    PatternId::NOT_ALLOWED
                }
            }
            Pattern::NotAllowed
            | Pattern::Empty
            | Pattern::Text
            | Pattern::Value { .. }
            | Pattern::Data { .. }
            | Pattern::List(_)
            | Pattern::Element { .. } => PatternId::NOT_ALLOWED,
        }
    }

    /// Whether a value pattern accepts a string
    pub fn value_match(&mut self, p: PatternId, value: &str) -> bool {
        if self.nullable(p) && is_whitespace(value) {
            return true;
        }
        let d = self.text_deriv(p, value);
        self.nullable(d)
    }

    /// Derivative for the end of an opening tag; unmatched attributes fail
    pub fn start_tag_close_deriv(&mut self, p: PatternId) -> PatternId {
        let key = MemoKey::StartTagClose(p);
        if let Some(id) = self.memoized(&key) {
            return id;
        }
        let result = match self.get(p).clone() {
            Pattern::After(p1, p2) => {
                let d1 = self.start_tag_close_deriv(p1);
                self.after(d1, p2)
            }
            Pattern::Choice(p1, p2) => {
                let a = self.start_tag_close_deriv(p1);
                let b = self.start_tag_close_deriv(p2);
                self.choice(a, b)
            }
            Pattern::Group(p1, p2) => {
                let a = self.start_tag_close_deriv(p1);
                let b = self.start_tag_close_deriv(p2);
                self.group(a, b)
            }
            Pattern::Interleave(p1, p2) => {
                let a = self.start_tag_close_deriv(p1);
                let b = self.start_tag_close_deriv(p2);
                self.interleave(a, b)
            }
            Pattern::OneOrMore(inner) => {
                let d = self.start_tag_close_deriv(inner);
                self.one_or_more(d)
            }
            Pattern::Attribute { .. } => PatternId::NOT_ALLOWED,
            Pattern::NotAllowed
            | Pattern::Empty
            | Pattern::Text
            | Pattern::Value { .. }
            | Pattern::Data { .. }
            | Pattern::List(_)
            | Pattern::Element { .. } => p,
        };
        self.memoize(key, result)
    }

    /// Derivative for a closing tag
    pub fn end_tag_deriv(&mut self, p: PatternId) -> PatternId {
        let key = MemoKey::EndTag(p);
        if let Some(id) = self.memoized(&key) {
            return id;
        }
        let result = match *self.get(p) {
            Pattern::Choice(p1, p2) => {
                let a = self.end_tag_deriv(p1);
                let b = self.end_tag_deriv(p2);
                self.choice(a, b)
            }
            Pattern::After(p1, p2) => {
                if self.nullable(p1) {
                    p2
                } else {
                    PatternId::NOT_ALLOWED
                }
            }
            _ => PatternId::NOT_ALLOWED,
        };
        self.memoize(key, result)
    }

    /// Derivative for the whole element at the walker's current node
    ///
    /// The walker is back on that element when this returns. Elements nested
    /// deeper than `max_depth` levels below it yield `notAllowed`.
    pub fn child_deriv<W: TreeWalker>(&mut self, p: PatternId, walker: &mut W, max_depth: usize) -> PatternId {
        if max_depth == 0 {
            log::debug!("derivative stopped at the nesting limit");
            return PatternId::NOT_ALLOWED;
        }
        let node = walker.current_node();
        let name = QName::new(node.namespace(), node.local_name());

        let mut p = self.start_tag_open_deriv(p, &name);
        for attribute in node.attributes() {
            if p == PatternId::NOT_ALLOWED {
                break;
            }
            if attribute.namespace == XMLNS_NAMESPACE {
                continue;
            }
            p = self.att_deriv(p, &attribute);
        }
        let p = self.start_tag_close_deriv(p);
        let p = self.children_deriv(p, walker, max_depth - 1);
        self.end_tag_deriv(p)
    }

    fn children_deriv<W: TreeWalker>(&mut self, p: PatternId, walker: &mut W, max_depth: usize) -> PatternId {
        enum Child<N> {
            Element(N),
            Text(String),
        }

        let element = walker.current_node();
        let mut children = Vec::new();
        let mut next = walker.first_child();
        while let Some(child) = next {
            match child.kind() {
                NodeKind::Element => children.push(Child::Element(child)),
                NodeKind::Text => {
                    let text = child.text().unwrap_or_default();
                    if !is_whitespace(text) {
                        children.push(Child::Text(text.to_string()));
                    }
                }
                NodeKind::Comment | NodeKind::Other => {}
            }
            next = walker.next_sibling();
        }
        if children.is_empty() {
            children.push(Child::Text(String::new()));
        }

        let mut p = p;
        for child in children {
            if p == PatternId::NOT_ALLOWED {
                break;
            }
            p = match child {
                Child::Text(text) if is_whitespace(&text) => {
                    let d = self.text_deriv(p, &text);
                    self.choice(p, d)
                }
                Child::Text(text) => self.text_deriv(p, &text),
                Child::Element(node) => {
                    walker.set_current_node(node);
                    self.child_deriv(p, walker, max_depth)
                }
            };
        }
        walker.set_current_node(element);
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;
    use crate::validators::name_class::NameClass;

    fn element(arena: &mut PatternArena<'_>, local: &str, content: PatternId) -> PatternId {
        let name = arena.name_class(NameClass::Name(QName::local(local)));
        let id = arena.reserve_element(name);
        arena.fill_element(id, content);
        id
    }

    fn attribute(arena: &mut PatternArena<'_>, local: &str, content: PatternId) -> PatternId {
        let name = arena.name_class(NameClass::Name(QName::local(local)));
        arena.attribute(name, content)
    }

    fn accepts(arena: &PatternArena<'_>, start: PatternId, xml: &str) -> bool {
        let doc = Document::from_string(xml).unwrap();
        let mut layer = arena.layered();
        let d = layer.child_deriv(start, &mut doc.walker(), 64);
        layer.nullable(d)
    }

    #[test]
    fn test_text_deriv() {
        let mut arena = PatternArena::new();
        assert_eq!(arena.text_deriv(PatternId::TEXT, "abc"), PatternId::TEXT);
        assert_eq!(arena.text_deriv(PatternId::EMPTY, "abc"), PatternId::NOT_ALLOWED);

        let value = arena.value("a  b", true);
        assert_eq!(arena.text_deriv(value, " a b "), PatternId::EMPTY);
        let exact = arena.value("a  b", false);
        assert_eq!(arena.text_deriv(exact, "a b"), PatternId::NOT_ALLOWED);

        let data = arena.data("integer");
        assert_eq!(arena.text_deriv(data, "not a number"), PatternId::EMPTY);
    }

    #[test]
    fn test_start_tag_open_yields_after() {
        let mut arena = PatternArena::new();
        let a = element(&mut arena, "a", PatternId::TEXT);
        let d = arena.start_tag_open_deriv(a, &QName::local("a"));
        assert_eq!(*arena.get(d), Pattern::After(PatternId::TEXT, PatternId::EMPTY));
        assert_eq!(
            arena.start_tag_open_deriv(a, &QName::local("b")),
            PatternId::NOT_ALLOWED
        );
    }

    #[test]
    fn test_apply_after_distributes_over_choice() {
        let mut arena = PatternArena::new();
        let a = element(&mut arena, "a", PatternId::EMPTY);
        let x = arena.after(PatternId::TEXT, PatternId::EMPTY);
        let y = arena.after(PatternId::EMPTY, PatternId::EMPTY);
        let both = arena.choice(x, y);

        let rewritten = arena.apply_after(AfterOp::Group(a), both);
        let expected_x = arena.after(PatternId::TEXT, a);
        let expected_y = arena.after(PatternId::EMPTY, a);
        let expected = arena.choice(expected_x, expected_y);
        assert_eq!(rewritten, expected);

        assert_eq!(arena.apply_after(AfterOp::Group(a), a), a);
    }

    #[test]
    fn test_attribute_derivative() {
        let mut arena = PatternArena::new();
        let fixed = arena.value("yes", true);
        let att = attribute(&mut arena, "flag", fixed);

        let good = XmlAttribute {
            namespace: "",
            local_name: "flag",
            value: "yes",
        };
        let bad = XmlAttribute { value: "no", ..good };
        assert_eq!(arena.att_deriv(att, &good), PatternId::EMPTY);
        assert_eq!(arena.att_deriv(att, &bad), PatternId::NOT_ALLOWED);
        assert_eq!(arena.start_tag_close_deriv(att), PatternId::NOT_ALLOWED);
    }

    #[test]
    fn test_end_tag_deriv() {
        let mut arena = PatternArena::new();
        let a = element(&mut arena, "a", PatternId::EMPTY);
        let done = arena.after(PatternId::TEXT, a);
        assert_eq!(arena.end_tag_deriv(done), a);
        let pending = arena.after(a, PatternId::EMPTY);
        assert_eq!(arena.end_tag_deriv(pending), PatternId::NOT_ALLOWED);
    }

    #[test]
    fn test_child_deriv_documents() {
        let mut arena = PatternArena::new();
        let title = element(&mut arena, "title", PatternId::TEXT);
        let p = element(&mut arena, "p", PatternId::TEXT);
        let ps = arena.one_or_more(p);
        let body_content = arena.choice(PatternId::EMPTY, ps);
        let body = element(&mut arena, "body", body_content);
        let id_att = attribute(&mut arena, "id", PatternId::TEXT);
        let content = arena.group(title, body);
        let content = arena.group(id_att, content);
        let doc = element(&mut arena, "doc", content);

        assert!(accepts(
            &arena,
            doc,
            "<doc id='1'>\n  <title>T</title>\n  <body><p>a</p><p>b</p></body>\n</doc>"
        ));
        assert!(accepts(&arena, doc, "<doc id='1'><title/><body/></doc>"));
        assert!(!accepts(&arena, doc, "<doc><title>T</title><body/></doc>"));
        assert!(!accepts(&arena, doc, "<doc id='1'><body/></doc>"));
        assert!(!accepts(&arena, doc, "<doc id='1'><title/><body><q/></body></doc>"));
        assert!(!accepts(&arena, doc, "<doc id='1'><title/><body/>stray</doc>"));
    }

    #[test]
    fn test_child_deriv_interleave_and_recursion() {
        let mut arena = PatternArena::new();
        let a = element(&mut arena, "a", PatternId::TEXT);
        let b = element(&mut arena, "b", PatternId::TEXT);
        let both = arena.interleave(a, b);
        let g = element(&mut arena, "g", both);
        assert!(accepts(&arena, g, "<g><a/><b/></g>"));
        assert!(accepts(&arena, g, "<g><b/><a/></g>"));
        assert!(!accepts(&arena, g, "<g><a/><a/></g>"));

        // section = element section { section* }
        let name = arena.name_class(NameClass::Name(QName::local("section")));
        let section = arena.reserve_element(name);
        let many = arena.one_or_more(section);
        let nested = arena.choice(PatternId::EMPTY, many);
        arena.fill_element(section, nested);
        assert!(accepts(
            &arena,
            section,
            "<section><section><section/></section><section/></section>"
        ));
        assert!(!accepts(&arena, section, "<section><other/></section>"));
    }

    #[test]
    fn test_child_deriv_depth_bound() {
        let mut arena = PatternArena::new();
        let name = arena.name_class(NameClass::Name(QName::local("s")));
        let s = arena.reserve_element(name);
        let nested = arena.choice(PatternId::EMPTY, s);
        arena.fill_element(s, nested);

        let doc = Document::from_string("<s><s><s/></s></s>").unwrap();
        let mut layer = arena.layered();
        let d = layer.child_deriv(s, &mut doc.walker(), 3);
        assert!(layer.nullable(d));
        let d = layer.child_deriv(s, &mut doc.walker(), 2);
        assert_eq!(d, PatternId::NOT_ALLOWED);
    }

    #[test]
    fn test_namespace_declarations_are_ignored() {
        let mut arena = PatternArena::new();
        let name = arena.name_class(NameClass::Name(QName::namespaced("urn:t", "doc")));
        let doc = arena.reserve_element(name);
        arena.fill_element(doc, PatternId::EMPTY);
        assert!(accepts(&arena, doc, "<t:doc xmlns:t='urn:t'/>"));
        assert!(!accepts(&arena, doc, "<doc/>"));
    }
}
