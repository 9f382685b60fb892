//! Document validation
//!
//! Structural validation of a tree against compiled patterns. The validator
//! walks the tree with a [`TreeWalker`], matching element patterns against
//! elements in document order. Comments and whitespace-only text are
//! transparent, `choice` and `oneOrMore` backtrack by rewinding the walker,
//! and `interleave` runs a fixpoint over its branches.
//!
//! Attributes are claimed by the attribute patterns that match them. Once the
//! content of an element is matched, any attribute left unclaimed is an
//! error.

use crate::error::{ValidationError, ValidationErrorKind};
use crate::names::{is_whitespace, normalize_token};
use crate::namespaces::QName;
use crate::tree::{NodeKind, TreeWalker, XmlAttribute, XmlNode};
use crate::XMLNS_NAMESPACE;

use super::name_class::NameClass;
use super::patterns::{Pattern, PatternArena, PatternId};
use super::validation::{ValidationOptions, ValidationResult};

type Outcome = std::result::Result<(), ValidationError>;

/// Validate the tree below `walker.root()` against `start`
pub fn validate_tree<W: TreeWalker>(
    patterns: &PatternArena<'_>,
    start: PatternId,
    walker: W,
    options: &ValidationOptions,
) -> ValidationResult {
    let root = walker.root();
    let mut validator = TreeValidator {
        patterns,
        cursor: Cursor::new(walker),
        options,
        depth: 0,
        nesting: 0,
        claimed: Vec::new(),
        frame: 0,
        depth_error: None,
    };
    let outcome = validator.validate_pattern(start, &root, None);
    // backtracking may swallow the depth error, it still fails the run
    if let Some(error) = validator.depth_error {
        return ValidationResult::invalid(vec![error]);
    }
    match outcome {
        Ok(()) => ValidationResult::valid(),
        Err(error) => {
            log::debug!("validation failed: {}", error.message);
            ValidationResult::invalid(vec![error])
        }
    }
}

/// A place in a sibling list: a node, or past the last node
#[derive(Debug, Clone)]
struct Position<N> {
    node: N,
    at_end: bool,
}

impl<N: PartialEq> PartialEq for Position<N> {
    fn eq(&self, other: &Self) -> bool {
        self.at_end == other.at_end && (self.at_end || self.node == other.node)
    }
}

/// Backtracking point: walker position plus the number of claimed attributes
#[derive(Debug, Clone)]
struct Mark<N> {
    position: Position<N>,
    claimed: usize,
}

/// Walker plus an end-of-siblings flag
///
/// A DOM walker stays on the last node when there is no next sibling, which
/// cannot be told apart from still being on that node. The cursor records
/// that case explicitly.
struct Cursor<W: TreeWalker> {
    walker: W,
    at_end: bool,
}

impl<W: TreeWalker> Cursor<W> {
    fn new(mut walker: W) -> Self {
        let root = walker.root();
        walker.set_current_node(root);
        Self {
            walker,
            at_end: false,
        }
    }

    fn current(&self) -> Option<W::Node> {
        if self.at_end {
            None
        } else {
            Some(self.walker.current_node())
        }
    }

    fn advance(&mut self) {
        if !self.at_end && self.walker.next_sibling().is_none() {
            self.at_end = true;
        }
    }

    /// Move to the first child of the current node
    fn enter(&mut self) {
        self.at_end = self.walker.first_child().is_none();
    }

    /// Move to the node following `node`
    fn leave(&mut self, node: W::Node) {
        self.walker.set_current_node(node);
        self.at_end = false;
        self.advance();
    }

    fn position(&self) -> Position<W::Node> {
        Position {
            node: self.walker.current_node(),
            at_end: self.at_end,
        }
    }

    fn rewind(&mut self, position: Position<W::Node>) {
        self.walker.set_current_node(position.node);
        self.at_end = position.at_end;
    }
}

/// State of one interleave branch
enum Branch<N> {
    Untried,
    Failed(ValidationError),
    Passed(Position<N>),
    Done,
}

struct TreeValidator<'a, 'p, W: TreeWalker> {
    patterns: &'a PatternArena<'p>,
    cursor: Cursor<W>,
    options: &'a ValidationOptions,
    /// Element nesting
    depth: usize,
    /// Pattern recursion, bounded so deep documents cannot exhaust the stack
    nesting: usize,
    /// Attribute index on its element and the attribute pattern that took it
    claimed: Vec<(usize, PatternId)>,
    /// Start of the current element's entries in `claimed`
    frame: usize,
    depth_error: Option<ValidationError>,
}

fn node_name<N: XmlNode>(node: &N) -> QName {
    QName::new(node.namespace(), node.local_name())
}

fn attribute_name(attribute: &XmlAttribute<'_>) -> QName {
    QName::new(attribute.namespace, attribute.local_name)
}

fn is_blank<N: XmlNode>(node: &N) -> bool {
    match node.kind() {
        NodeKind::Text => is_whitespace(node.text().unwrap_or_default()),
        NodeKind::Comment | NodeKind::Other => true,
        NodeKind::Element => false,
    }
}

impl<'a, 'p, W: TreeWalker> TreeValidator<'a, 'p, W> {
    fn mark(&self) -> Mark<W::Node> {
        Mark {
            position: self.cursor.position(),
            claimed: self.claimed.len(),
        }
    }

    fn restore(&mut self, mark: Mark<W::Node>) {
        self.cursor.rewind(mark.position);
        self.claimed.truncate(mark.claimed);
    }

    /// Whether the walker moved or an attribute was claimed since `mark`
    fn progressed(&self, mark: &Mark<W::Node>) -> bool {
        self.cursor.position() != mark.position || self.claimed.len() != mark.claimed
    }

    fn is_claimed(&self, index: usize) -> bool {
        self.claimed[self.frame..].iter().any(|(i, _)| *i == index)
    }

    /// Record a depth error that survives backtracking
    fn too_deep(&mut self, message: String, node: &W::Node) -> ValidationError {
        let error = ValidationError::new(ValidationErrorKind::DepthExceeded, message)
            .with_node(node.info());
        self.depth_error.get_or_insert_with(|| error.clone());
        error
    }

    fn validate_pattern(&mut self, p: PatternId, context: &W::Node, data: Option<&str>) -> Outcome {
        if self.nesting >= self.options.max_nesting {
            let message = format!("Maximum pattern nesting {} exceeded", self.options.max_nesting);
            return Err(self.too_deep(message, context));
        }
        self.nesting += 1;

        let patterns = self.patterns;
        let outcome = match patterns.get(p) {
            Pattern::Empty => Ok(()),
            Pattern::NotAllowed => Err(ValidationError::new(
                ValidationErrorKind::NotAllowed,
                "Content is not allowed here.",
            )
            .with_node(context.info())),
            Pattern::Text | Pattern::Data { .. } | Pattern::List(_) => {
                if data.is_none() {
                    self.skip_text();
                }
                Ok(())
            }
            Pattern::Value { value, token } => self.validate_value(value, *token, context, data),
            Pattern::Element { name, content } => self.validate_element(name, *content),
            Pattern::Attribute { name, content } => {
                self.validate_attribute(p, name, *content, context)
            }
            Pattern::Group(..) => self.validate_group(p, context, data),
            Pattern::Choice(..) => self.validate_choice(p, context, data),
            Pattern::OneOrMore(inner) => self.validate_one_or_more(*inner, context, data),
            Pattern::Interleave(..) => self.validate_interleave(p, context),
            Pattern::After(..) => unreachable!("after patterns only arise from derivatives"),
        };

        self.nesting -= 1;
        outcome
    }

    fn validate_value(
        &mut self,
        value: &str,
        token: bool,
        context: &W::Node,
        data: Option<&str>,
    ) -> Outcome {
        let actual = match data {
            Some(data) => data.to_string(),
            None => self.take_text(),
        };
        let equal = if token {
            normalize_token(value) == normalize_token(&actual)
        } else {
            value == actual
        };
        if equal {
            return Ok(());
        }
        Err(ValidationError::new(
            ValidationErrorKind::WrongValue,
            format!("Wrong value, should be '{}', not '{}'", value, actual),
        )
        .with_node(context.info()))
    }

    /// Walk a right-leaning group chain without recursing into its tail
    fn validate_group(&mut self, p: PatternId, context: &W::Node, data: Option<&str>) -> Outcome {
        let mut rest = p;
        while let Pattern::Group(first, second) = *self.patterns.get(rest) {
            self.validate_pattern(first, context, data)?;
            rest = second;
        }
        self.validate_pattern(rest, context, data)
    }

    fn validate_element(&mut self, name: &NameClass, content: PatternId) -> Outcome {
        let node = self.next_element(name)?;
        if !name.contains(node.namespace(), node.local_name()) {
            return Err(ValidationError::new(
                ValidationErrorKind::MissingElement,
                format!("Found {} instead of {}.", node_name(&node), name),
            )
            .with_node(node.info()));
        }
        if self.depth >= self.options.max_depth {
            let message = format!("Maximum depth {} exceeded", self.options.max_depth);
            return Err(self.too_deep(message, &node));
        }

        let outer_frame = std::mem::replace(&mut self.frame, self.claimed.len());
        self.depth += 1;
        self.cursor.enter();
        let result = self
            .validate_pattern(content, &node, None)
            .and_then(|()| self.check_no_content_left(&node))
            .and_then(|()| self.check_attributes_claimed(&node));
        self.depth -= 1;
        self.claimed.truncate(self.frame);
        self.frame = outer_frame;

        // on error too, the walker continues after this element
        self.cursor.leave(node);
        result
    }

    /// Skip comments and whitespace up to the next element
    fn next_element(&mut self, expected: &NameClass) -> std::result::Result<W::Node, ValidationError> {
        loop {
            let Some(node) = self.cursor.current() else {
                return Err(ValidationError::new(
                    ValidationErrorKind::MissingElement,
                    format!("Missing element {}", expected),
                ));
            };
            if node.kind() == NodeKind::Element {
                return Ok(node);
            }
            if !is_blank(&node) {
                return Err(ValidationError::new(
                    ValidationErrorKind::UnexpectedText,
                    format!("Text is not allowed here, expected {}.", expected),
                )
                .with_node(node.info()));
            }
            self.cursor.advance();
        }
    }

    fn check_no_content_left(&mut self, element: &W::Node) -> Outcome {
        while let Some(node) = self.cursor.current() {
            match node.kind() {
                NodeKind::Element => {
                    return Err(ValidationError::new(
                        ValidationErrorKind::UnexpectedElement,
                        format!(
                            "Unexpected element {} in {}.",
                            node_name(&node),
                            node_name(element)
                        ),
                    )
                    .with_node(node.info())
                    .with_reason("Spurious content."));
                }
                _ if !is_blank(&node) => {
                    return Err(ValidationError::new(
                        ValidationErrorKind::SpuriousContent,
                        format!("Spurious content in {}.", node_name(element)),
                    )
                    .with_node(node.info()));
                }
                _ => self.cursor.advance(),
            }
        }
        Ok(())
    }

    /// Every attribute of `element` must have been taken by an attribute pattern
    fn check_attributes_claimed(&self, element: &W::Node) -> Outcome {
        let attributes = element.attributes();
        let unclaimed = attributes
            .iter()
            .enumerate()
            .find(|(index, a)| a.namespace != XMLNS_NAMESPACE && !self.is_claimed(*index));
        let Some((_, attribute)) = unclaimed else {
            return Ok(());
        };

        // a second match for a pattern that already took one attribute
        let taken_by = self.claimed[self.frame..].iter().find_map(|(_, p)| match self.patterns.get(*p) {
            Pattern::Attribute { name, .. }
                if name.contains(attribute.namespace, attribute.local_name) =>
            {
                Some(name)
            }
            _ => None,
        });
        let error = match taken_by {
            Some(name) => ValidationError::new(
                ValidationErrorKind::DuplicateAttribute,
                format!("Attribute defined too often: {}", name),
            ),
            None => ValidationError::new(
                ValidationErrorKind::UnexpectedAttribute,
                format!(
                    "Unexpected attribute {} on {}.",
                    attribute_name(attribute),
                    node_name(element)
                ),
            ),
        };
        Err(error.with_node(element.info()))
    }

    fn validate_attribute(
        &mut self,
        p: PatternId,
        name: &NameClass,
        content: PatternId,
        context: &W::Node,
    ) -> Outcome {
        let attributes = context.attributes();
        let found = attributes.iter().enumerate().find(|(index, a)| {
            a.namespace != XMLNS_NAMESPACE
                && name.contains(a.namespace, a.local_name)
                && !self.is_claimed(*index)
        });

        let Some((index, attribute)) = found else {
            return Err(ValidationError::new(
                ValidationErrorKind::MissingAttribute,
                format!("Attribute not found: {}", name),
            )
            .with_node(context.info()));
        };
        self.claimed.push((index, p));

        let value = attribute.value.to_string();
        self.validate_pattern(content, context, Some(&value))
    }

    /// Alternatives of a choice chain in order; `empty` makes the choice optional
    fn alternatives(&self, p: PatternId) -> (Vec<PatternId>, bool) {
        let mut alternatives = Vec::new();
        let mut optional = false;
        let mut pending = vec![p];
        while let Some(id) = pending.pop() {
            match *self.patterns.get(id) {
                Pattern::Choice(a, b) => {
                    pending.push(b);
                    pending.push(a);
                }
                Pattern::Empty => optional = true,
                _ => alternatives.push(id),
            }
        }
        (alternatives, optional)
    }

    fn validate_choice(&mut self, p: PatternId, context: &W::Node, data: Option<&str>) -> Outcome {
        let (alternatives, optional) = self.alternatives(p);
        let start = self.mark();
        let mut last_error = None;

        for alternative in alternatives {
            match self.validate_pattern(alternative, context, data) {
                Ok(()) => return Ok(()),
                // a present attribute that failed cannot be skipped
                Err(error) if optional && self.claimed.len() > start.claimed => return Err(error),
                Err(error) => {
                    log::trace!("alternative not matched: {}", error.message);
                    self.restore(start.clone());
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) if !optional => Err(error),
            _ => Ok(()),
        }
    }

    /// Repeat while rounds succeed and make progress; the last round is undone
    fn validate_one_or_more(&mut self, p: PatternId, context: &W::Node, data: Option<&str>) -> Outcome {
        let mut rounds = 0;
        loop {
            let before = self.mark();
            let result = self.validate_pattern(p, context, data);
            rounds += 1;
            match result {
                Ok(()) if self.progressed(&before) => {}
                result if rounds > 1 => {
                    if let Err(error) = result {
                        log::trace!("repetition stopped: {}", error.message);
                    }
                    self.restore(before);
                    return Ok(());
                }
                result => return result,
            }
        }
    }

    fn collect_interleave(&self, p: PatternId, branches: &mut Vec<PatternId>) {
        match *self.patterns.get(p) {
            Pattern::Interleave(a, b) => {
                self.collect_interleave(a, branches);
                self.collect_interleave(b, branches);
            }
            _ => branches.push(p),
        }
    }

    /// Branches that may match again after they advanced
    fn is_repeatable(&self, p: PatternId) -> bool {
        let one_or_more = |id: PatternId| matches!(self.patterns.get(id), Pattern::OneOrMore(_));
        match *self.patterns.get(p) {
            Pattern::OneOrMore(_) | Pattern::Text => true,
            Pattern::Choice(a, b) => one_or_more(a) || one_or_more(b),
            _ => false,
        }
    }

    fn validate_interleave(&mut self, p: PatternId, context: &W::Node) -> Outcome {
        let mut branches = Vec::new();
        self.collect_interleave(p, &mut branches);
        let mut states: Vec<Branch<W::Node>> = branches.iter().map(|_| Branch::Untried).collect();

        let mut todo = branches.len();
        while todo > 0 {
            let round_start = self.cursor.position();
            let mut passed = 0;

            for (branch, state) in branches.iter().zip(states.iter_mut()) {
                let before = self.mark();
                match state {
                    Branch::Done => continue,
                    Branch::Passed(at) if *at == before.position => continue,
                    _ => {}
                }
                match self.validate_pattern(*branch, context, None) {
                    Err(error) => {
                        self.restore(before);
                        if !matches!(state, Branch::Passed(_)) {
                            *state = Branch::Failed(error);
                        }
                    }
                    Ok(()) => {
                        passed += 1;
                        *state = if !self.progressed(&before) || self.is_repeatable(*branch) {
                            Branch::Passed(before.position)
                        } else {
                            Branch::Done
                        };
                    }
                }
            }

            if passed == todo && self.cursor.position() == round_start {
                return Ok(());
            }
            if passed == 0 {
                let failure = states.iter().find_map(|state| match state {
                    Branch::Failed(error) => Some(error),
                    _ => None,
                });
                return match failure {
                    Some(error) => Err(ValidationError::new(
                        ValidationErrorKind::InterleaveMismatch,
                        "Interleave does not match.",
                    )
                    .with_node(context.info())
                    .with_reason(error.to_string())),
                    None => Ok(()),
                };
            }
            todo = states.iter().filter(|s| !matches!(s, Branch::Done)).count();
        }
        Ok(())
    }

    /// Consume the next text node and return its value
    fn take_text(&mut self) -> String {
        while let Some(node) = self.cursor.current() {
            match node.kind() {
                NodeKind::Text => {
                    let text = node.text().unwrap_or_default().to_string();
                    self.cursor.advance();
                    return text;
                }
                NodeKind::Comment | NodeKind::Other => self.cursor.advance(),
                NodeKind::Element => break,
            }
        }
        String::new()
    }

    /// Consume text and comments up to the next element
    fn skip_text(&mut self) {
        while let Some(node) = self.cursor.current() {
            if node.kind() == NodeKind::Element {
                break;
            }
            self.cursor.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;

    struct Fixture {
        arena: PatternArena<'static>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                arena: PatternArena::new(),
            }
        }

        fn element(&mut self, local: &str, content: PatternId) -> PatternId {
            let name = self.arena.name_class(NameClass::Name(QName::local(local)));
            let id = self.arena.reserve_element(name);
            self.arena.fill_element(id, content);
            id
        }

        fn attribute(&mut self, local: &str, content: PatternId) -> PatternId {
            let name = self.arena.name_class(NameClass::Name(QName::local(local)));
            self.arena.attribute(name, content)
        }

        fn check(&self, start: PatternId, xml: &str) -> ValidationResult {
            self.check_with(start, xml, &ValidationOptions::default())
        }

        fn check_with(&self, start: PatternId, xml: &str, options: &ValidationOptions) -> ValidationResult {
            let doc = Document::from_string(xml).unwrap();
            validate_tree(&self.arena, start, doc.walker(), options)
        }
    }

    fn first_kind(result: &ValidationResult) -> ValidationErrorKind {
        result.errors.first().map(|e| e.kind).expect("expected an error")
    }

    #[test]
    fn test_element_sequence() {
        let mut f = Fixture::new();
        let a = f.element("a", PatternId::TEXT);
        let b = f.element("b", PatternId::EMPTY);
        let content = f.arena.group(a, b);
        let root = f.element("root", content);

        assert!(f.check(root, "<root><a>x</a><!-- c --> <b/></root>").is_valid());

        let result = f.check(root, "<root><b/></root>");
        assert_eq!(first_kind(&result), ValidationErrorKind::MissingElement);
        assert!(result.errors[0].message.contains("Found b instead of a"));

        let result = f.check(root, "<root><a/></root>");
        assert_eq!(first_kind(&result), ValidationErrorKind::MissingElement);
        assert!(result.errors[0].message.contains("Missing element b"));

        let result = f.check(root, "<root>text<a/><b/></root>");
        assert_eq!(first_kind(&result), ValidationErrorKind::UnexpectedText);
    }

    #[test]
    fn test_spurious_content() {
        let mut f = Fixture::new();
        let a = f.element("a", PatternId::EMPTY);
        let root = f.element("root", a);

        let result = f.check(root, "<root><a/><extra/></root>");
        assert_eq!(first_kind(&result), ValidationErrorKind::UnexpectedElement);
        assert!(result.errors[0].message.contains("extra"));

        let result = f.check(root, "<root><a/>tail</root>");
        assert_eq!(first_kind(&result), ValidationErrorKind::SpuriousContent);

        let result = f.check(root, "<root><a>inner</a></root>");
        assert_eq!(first_kind(&result), ValidationErrorKind::SpuriousContent);
    }

    #[test]
    fn test_attributes() {
        let mut f = Fixture::new();
        let yes = f.arena.value("yes", true);
        let flag = f.attribute("flag", yes);
        let root = f.element("root", flag);

        assert!(f.check(root, "<root flag=' yes '/>").is_valid());
        assert!(f.check(root, "<root xmlns:x='urn:x' flag='yes'/>").is_valid());

        let result = f.check(root, "<root/>");
        assert_eq!(first_kind(&result), ValidationErrorKind::MissingAttribute);
        let result = f.check(root, "<root flag='no'/>");
        assert_eq!(first_kind(&result), ValidationErrorKind::WrongValue);
    }

    #[test]
    fn test_duplicate_attribute_through_name_class() {
        let mut f = Fixture::new();
        let names = NameClass::Choice(vec![
            NameClass::Name(QName::local("a")),
            NameClass::Name(QName::local("b")),
        ]);
        let name = f.arena.name_class(names);
        let att = f.arena.attribute(name, PatternId::TEXT);
        let root = f.element("root", att);

        assert!(f.check(root, "<root b='1'/>").is_valid());
        let result = f.check(root, "<root a='1' b='2'/>");
        assert_eq!(first_kind(&result), ValidationErrorKind::DuplicateAttribute);
    }

    #[test]
    fn test_unclaimed_attributes() {
        let mut f = Fixture::new();
        let title = f.element("title", PatternId::TEXT);
        let root = f.element("root", title);

        assert!(f.check(root, "<root xmlns:x='urn:x'><title>T</title></root>").is_valid());

        let result = f.check(root, "<root bogus='1'><title>T</title></root>");
        assert_eq!(first_kind(&result), ValidationErrorKind::UnexpectedAttribute);
        assert!(result.errors[0].message.contains("bogus"));

        let result = f.check(root, "<root><title xml:lang='en'>T</title></root>");
        assert_eq!(first_kind(&result), ValidationErrorKind::UnexpectedAttribute);
    }

    #[test]
    fn test_present_optional_attribute_is_checked() {
        let mut f = Fixture::new();
        let yes = f.arena.value("yes", true);
        let flag = f.attribute("flag", yes);
        let maybe_flag = f.arena.choice(PatternId::EMPTY, flag);
        let root = f.element("root", maybe_flag);

        assert!(f.check(root, "<root/>").is_valid());
        assert!(f.check(root, "<root flag='yes'/>").is_valid());
        let result = f.check(root, "<root flag='no'/>");
        assert_eq!(first_kind(&result), ValidationErrorKind::WrongValue);
    }

    #[test]
    fn test_repeated_wildcard_attribute() {
        let mut f = Fixture::new();
        let name = f.arena.name_class(NameClass::AnyName);
        let any = f.arena.attribute(name, PatternId::TEXT);
        let many = f.arena.one_or_more(any);
        let root = f.element("root", many);

        assert!(f.check(root, "<root a='1' b='2' c='3'/>").is_valid());
        let result = f.check(root, "<root/>");
        assert_eq!(first_kind(&result), ValidationErrorKind::MissingAttribute);
    }

    #[test]
    fn test_optional_and_choice() {
        let mut f = Fixture::new();
        let a = f.element("a", PatternId::EMPTY);
        let b = f.element("b", PatternId::EMPTY);
        let either = f.arena.choice(a, b);
        let maybe_a = f.arena.choice(PatternId::EMPTY, a);
        let content = f.arena.group(maybe_a, either);
        let root = f.element("root", content);

        assert!(f.check(root, "<root><a/><b/></root>").is_valid());
        assert!(f.check(root, "<root><b/></root>").is_valid());
        assert!(f.check(root, "<root><a/></root>").is_valid());
        assert!(!f.check(root, "<root/>").is_valid());
    }

    #[test]
    fn test_one_or_more_backtracks() {
        let mut f = Fixture::new();
        let p = f.element("p", PatternId::TEXT);
        let end = f.element("end", PatternId::EMPTY);
        let ps = f.arena.one_or_more(p);
        let content = f.arena.group(ps, end);
        let root = f.element("root", content);

        assert!(f.check(root, "<root><p/><p>x</p>\n<p/><end/></root>").is_valid());
        assert!(!f.check(root, "<root><end/></root>").is_valid());
    }

    #[test]
    fn test_interleave_any_order() {
        let mut f = Fixture::new();
        let a = f.element("a", PatternId::TEXT);
        let b = f.element("b", PatternId::TEXT);
        let content = f.arena.interleave(a, b);
        let g = f.element("g", content);

        assert!(f.check(g, "<g><a/><b/></g>").is_valid());
        assert!(f.check(g, "<g><b/><a/></g>").is_valid());

        let result = f.check(g, "<g><a/></g>");
        assert_eq!(first_kind(&result), ValidationErrorKind::InterleaveMismatch);
        assert!(result.errors[0].reason.is_some());
    }

    #[test]
    fn test_mixed_content() {
        let mut f = Fixture::new();
        let b = f.element("b", PatternId::TEXT);
        let bs = f.arena.one_or_more(b);
        let any_bs = f.arena.choice(PatternId::EMPTY, bs);
        let content = f.arena.interleave(any_bs, PatternId::TEXT);
        let p = f.element("p", content);

        assert!(f.check(p, "<p>some <b>bold</b> text <b>again</b>.</p>").is_valid());
        assert!(f.check(p, "<p/>").is_valid());
    }

    #[test]
    fn test_depth_limit() {
        let mut f = Fixture::new();
        let name = f.arena.name_class(NameClass::AnyName);
        let any = f.arena.reserve_element(name);
        let many = f.arena.one_or_more(any);
        let content = f.arena.choice(PatternId::EMPTY, many);
        f.arena.fill_element(any, content);

        let options = ValidationOptions::default().with_max_depth(2);
        assert!(f.check_with(any, "<a><b/></a>", &options).is_valid());
        let result = f.check_with(any, "<a><b><c/></b></a>", &options);
        assert!(result.has_error(ValidationErrorKind::DepthExceeded));
    }

    #[test]
    fn test_pattern_nesting_limit() {
        let mut f = Fixture::new();
        let name = f.arena.name_class(NameClass::AnyName);
        let any = f.arena.reserve_element(name);
        let many = f.arena.one_or_more(any);
        let content = f.arena.choice(PatternId::EMPTY, many);
        f.arena.fill_element(any, content);

        let options = ValidationOptions::default().with_max_nesting(8);
        assert!(f.check_with(any, "<a><b/></a>", &options).is_valid());
        let deep = "<a><b><c><d><e/></d></c></b></a>";
        let result = f.check_with(any, deep, &options);
        assert!(result.has_error(ValidationErrorKind::DepthExceeded));
        assert!(result.errors[0].message.contains("nesting"));
    }

    #[test]
    fn test_not_allowed() {
        let mut f = Fixture::new();
        let root = f.element("root", PatternId::NOT_ALLOWED);
        let result = f.check(root, "<root/>");
        assert_eq!(first_kind(&result), ValidationErrorKind::NotAllowed);
    }
}
