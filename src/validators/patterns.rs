//! Pattern algebra
//!
//! Patterns live in a [`PatternArena`] and refer to each other by
//! [`PatternId`]. The arena interns every pattern except `element`, so equal
//! patterns share one id, and the smart constructors apply the algebraic
//! identities of the derivative algorithm before allocating anything.
//!
//! Element slots are reserved before their content is known and filled in
//! later, which is how recursive grammars produce a cyclic pattern graph.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::Serialize;

use crate::namespaces::QName;

use super::name_class::NameClass;

/// Index of a pattern inside an arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(u32);

impl PatternId {
    /// The `notAllowed` pattern
    pub const NOT_ALLOWED: PatternId = PatternId(0);
    /// The `empty` pattern
    pub const EMPTY: PatternId = PatternId(1);
    /// The `text` pattern
    pub const TEXT: PatternId = PatternId(2);

    /// Position in the arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One node of the pattern graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// Matches nothing
    NotAllowed,
    /// Matches the empty sequence
    Empty,
    /// Matches any amount of text
    Text,
    /// Matches one literal value
    Value {
        /// Literal value
        value: String,
        /// Compare with whitespace normalized
        token: bool,
    },
    /// Matches a datatype; only the name is kept
    Data {
        /// Datatype name
        datatype: String,
    },
    /// Matches a whitespace-separated list
    List(PatternId),
    /// Either operand
    Choice(PatternId, PatternId),
    /// Both operands in any order
    Interleave(PatternId, PatternId),
    /// Both operands in sequence
    Group(PatternId, PatternId),
    /// Match the first operand, then continue with the second after the
    /// enclosing end tag
    After(PatternId, PatternId),
    /// One or more repetitions
    OneOrMore(PatternId),
    /// An element with a name class and content
    Element {
        /// Accepted names
        name: Arc<NameClass>,
        /// Content pattern
        content: PatternId,
    },
    /// An attribute with a name class and value pattern
    Attribute {
        /// Accepted names
        name: Arc<NameClass>,
        /// Value pattern
        content: PatternId,
    },
}

#[derive(Debug, Clone)]
struct Slot {
    pattern: Pattern,
    nullable: bool,
}

/// Memo key for constructor and derivative results
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum MemoKey {
    Choice(PatternId, PatternId),
    Group(PatternId, PatternId),
    Interleave(PatternId, PatternId),
    After(PatternId, PatternId),
    OneOrMore(PatternId),
    StartTagOpen(PatternId, QName),
    StartTagClose(PatternId),
    EndTag(PatternId),
}

/// Pattern counts, for inspection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaStats {
    /// Total number of patterns
    pub patterns: usize,
    /// Number of element patterns
    pub elements: usize,
    /// Number of attribute patterns
    pub attributes: usize,
    /// Number of choice patterns
    pub choices: usize,
    /// Number of group patterns
    pub groups: usize,
    /// Number of interleave patterns
    pub interleaves: usize,
    /// Number of oneOrMore patterns
    pub one_or_more: usize,
    /// Number of distinct name classes
    pub name_classes: usize,
    /// Number of memoized results
    pub memo_entries: usize,
}

/// Index-stable storage for patterns
///
/// An arena may sit on top of a parent arena. Ids below the parent's length
/// resolve in the parent, which is never written to; new patterns and memo
/// entries go to the layer. Derivative checks use a layer over the compiled
/// schema so validation never mutates shared state.
#[derive(Debug)]
pub struct PatternArena<'p> {
    parent: Option<&'p PatternArena<'p>>,
    base: usize,
    slots: Vec<Slot>,
    interned: HashMap<Pattern, PatternId>,
    memo: HashMap<MemoKey, PatternId>,
    name_classes: HashMap<String, Arc<NameClass>>,
}

impl PatternArena<'static> {
    /// Create an arena holding only the three constant patterns
    pub fn new() -> Self {
        let mut arena = PatternArena {
            parent: None,
            base: 0,
            slots: Vec::new(),
            interned: HashMap::new(),
            memo: HashMap::new(),
            name_classes: HashMap::new(),
        };
        arena.intern(Pattern::NotAllowed);
        arena.intern(Pattern::Empty);
        arena.intern(Pattern::Text);
        arena
    }
}

impl Default for PatternArena<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> PatternArena<'p> {
    /// Create an empty layer that reads through to this arena
    pub fn layered(&self) -> PatternArena<'_> {
        PatternArena {
            parent: Some(self),
            base: self.len(),
            slots: Vec::new(),
            interned: HashMap::new(),
            memo: HashMap::new(),
            name_classes: HashMap::new(),
        }
    }

    /// Number of patterns visible through this arena
    pub fn len(&self) -> usize {
        self.base + self.slots.len()
    }

    /// Whether the arena holds no patterns
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of patterns owned by this layer
    pub fn local_len(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, id: PatternId) -> &Slot {
        match self.parent {
            Some(parent) if id.index() < self.base => parent.slot(id),
            _ => &self.slots[id.index() - self.base],
        }
    }

    /// Look up a pattern
    pub fn get(&self, id: PatternId) -> &Pattern {
        &self.slot(id).pattern
    }

    /// Whether a pattern accepts the empty sequence
    pub fn nullable(&self, id: PatternId) -> bool {
        self.slot(id).nullable
    }

    fn find_interned(&self, pattern: &Pattern) -> Option<PatternId> {
        self.interned
            .get(pattern)
            .copied()
            .or_else(|| self.parent.and_then(|p| p.find_interned(pattern)))
    }

    pub(crate) fn memoized(&self, key: &MemoKey) -> Option<PatternId> {
        self.memo
            .get(key)
            .copied()
            .or_else(|| self.parent.and_then(|p| p.memoized(key)))
    }

    pub(crate) fn memoize(&mut self, key: MemoKey, id: PatternId) -> PatternId {
        self.memo.insert(key, id);
        id
    }

    fn compute_nullable(&self, pattern: &Pattern) -> bool {
        match *pattern {
            Pattern::Empty | Pattern::Text => true,
            Pattern::Choice(a, b) => self.nullable(a) || self.nullable(b),
            Pattern::Group(a, b) | Pattern::Interleave(a, b) => {
                self.nullable(a) && self.nullable(b)
            }
            Pattern::OneOrMore(p) => self.nullable(p),
            Pattern::NotAllowed
            | Pattern::Value { .. }
            | Pattern::Data { .. }
            | Pattern::List(_)
            | Pattern::After(..)
            | Pattern::Element { .. }
            | Pattern::Attribute { .. } => false,
        }
    }

    fn push(&mut self, pattern: Pattern) -> PatternId {
        let nullable = self.compute_nullable(&pattern);
        let id = PatternId(self.len() as u32);
        self.slots.push(Slot { pattern, nullable });
        id
    }

    /// Return the id of an equal pattern, allocating it if needed
    fn intern(&mut self, pattern: Pattern) -> PatternId {
        if let Some(id) = self.find_interned(&pattern) {
            return id;
        }
        let id = self.push(pattern.clone());
        self.interned.insert(pattern, id);
        id
    }

    /// Share name classes with the same identity
    pub fn name_class(&mut self, name: NameClass) -> Arc<NameClass> {
        let key = name.key();
        if let Some(existing) = self.find_name_class(&key) {
            return existing;
        }
        let shared = Arc::new(name);
        self.name_classes.insert(key, Arc::clone(&shared));
        shared
    }

    fn find_name_class(&self, key: &str) -> Option<Arc<NameClass>> {
        self.name_classes
            .get(key)
            .cloned()
            .or_else(|| self.parent.and_then(|p| p.find_name_class(key)))
    }

    /// `choice(p1, p2)`
    ///
    /// Nested choices are flattened, duplicate leaves dropped (first one
    /// wins) and the rest rebuilt as a right-leaning chain.
    pub fn choice(&mut self, p1: PatternId, p2: PatternId) -> PatternId {
        if p1 == PatternId::NOT_ALLOWED {
            return p2;
        }
        if p2 == PatternId::NOT_ALLOWED || p1 == p2 {
            return p1;
        }
        let key = MemoKey::Choice(p1, p2);
        if let Some(id) = self.memoized(&key) {
            return id;
        }

        let mut leaves = IndexSet::new();
        self.collect_choice_leaves(p1, &mut leaves);
        self.collect_choice_leaves(p2, &mut leaves);

        let mut rest = leaves.into_iter().rev();
        let mut result = rest.next().unwrap_or(PatternId::NOT_ALLOWED);
        for leaf in rest {
            result = self.intern(Pattern::Choice(leaf, result));
        }
        self.memoize(key, result)
    }

    fn collect_choice_leaves(&self, p: PatternId, leaves: &mut IndexSet<PatternId>) {
        match *self.get(p) {
            Pattern::Choice(a, b) => {
                self.collect_choice_leaves(a, leaves);
                self.collect_choice_leaves(b, leaves);
            }
            Pattern::NotAllowed => {}
            _ => {
                leaves.insert(p);
            }
        }
    }

    /// `group(p1, p2)`
    pub fn group(&mut self, p1: PatternId, p2: PatternId) -> PatternId {
        if p1 == PatternId::NOT_ALLOWED || p2 == PatternId::NOT_ALLOWED {
            return PatternId::NOT_ALLOWED;
        }
        if p1 == PatternId::EMPTY {
            return p2;
        }
        if p2 == PatternId::EMPTY {
            return p1;
        }
        let key = MemoKey::Group(p1, p2);
        if let Some(id) = self.memoized(&key) {
            return id;
        }
        let id = self.intern(Pattern::Group(p1, p2));
        self.memoize(key, id)
    }

    /// `interleave(p1, p2)`; operand order does not matter
    pub fn interleave(&mut self, p1: PatternId, p2: PatternId) -> PatternId {
        if p1 == PatternId::NOT_ALLOWED || p2 == PatternId::NOT_ALLOWED {
            return PatternId::NOT_ALLOWED;
        }
        if p1 == PatternId::EMPTY {
            return p2;
        }
        if p2 == PatternId::EMPTY {
            return p1;
        }
        let (a, b) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        let key = MemoKey::Interleave(a, b);
        if let Some(id) = self.memoized(&key) {
            return id;
        }
        let id = self.intern(Pattern::Interleave(a, b));
        self.memoize(key, id)
    }

    /// `after(p1, p2)`
    pub fn after(&mut self, p1: PatternId, p2: PatternId) -> PatternId {
        if p1 == PatternId::NOT_ALLOWED || p2 == PatternId::NOT_ALLOWED {
            return PatternId::NOT_ALLOWED;
        }
        let key = MemoKey::After(p1, p2);
        if let Some(id) = self.memoized(&key) {
            return id;
        }
        let id = self.intern(Pattern::After(p1, p2));
        self.memoize(key, id)
    }

    /// `oneOrMore(p)`
    pub fn one_or_more(&mut self, p: PatternId) -> PatternId {
        if p == PatternId::NOT_ALLOWED {
            return PatternId::NOT_ALLOWED;
        }
        let key = MemoKey::OneOrMore(p);
        if let Some(id) = self.memoized(&key) {
            return id;
        }
        let id = self.intern(Pattern::OneOrMore(p));
        self.memoize(key, id)
    }

    /// `value` pattern
    pub fn value(&mut self, value: impl Into<String>, token: bool) -> PatternId {
        self.intern(Pattern::Value {
            value: value.into(),
            token,
        })
    }

    /// `data` pattern
    pub fn data(&mut self, datatype: impl Into<String>) -> PatternId {
        self.intern(Pattern::Data {
            datatype: datatype.into(),
        })
    }

    /// `list` pattern
    pub fn list(&mut self, content: PatternId) -> PatternId {
        self.intern(Pattern::List(content))
    }

    /// `attribute` pattern
    pub fn attribute(&mut self, name: Arc<NameClass>, content: PatternId) -> PatternId {
        self.intern(Pattern::Attribute { name, content })
    }

    /// Allocate an element slot whose content is filled in later
    pub fn reserve_element(&mut self, name: Arc<NameClass>) -> PatternId {
        self.push(Pattern::Element {
            name,
            content: PatternId::NOT_ALLOWED,
        })
    }

    /// Set the content of a reserved element slot
    ///
    /// # Panics
    ///
    /// Panics if `id` is not an element slot owned by this arena.
    pub fn fill_element(&mut self, id: PatternId, content: PatternId) {
        let index = id
            .index()
            .checked_sub(self.base)
            .unwrap_or_else(|| panic!("element {:?} belongs to a parent arena", id));
        match &mut self.slots[index].pattern {
            Pattern::Element { content: slot, .. } => *slot = content,
            other => panic!("pattern {:?} is not an element slot: {:?}", id, other),
        }
    }

    /// Count the patterns of this arena and its parents
    pub fn stats(&self) -> ArenaStats {
        let mut stats = self.parent.map(|p| p.stats()).unwrap_or_default();
        for slot in &self.slots {
            stats.patterns += 1;
            match slot.pattern {
                Pattern::Element { .. } => stats.elements += 1,
                Pattern::Attribute { .. } => stats.attributes += 1,
                Pattern::Choice(..) => stats.choices += 1,
                Pattern::Group(..) => stats.groups += 1,
                Pattern::Interleave(..) => stats.interleaves += 1,
                Pattern::OneOrMore(_) => stats.one_or_more += 1,
                _ => {}
            }
        }
        stats.name_classes += self.name_classes.len();
        stats.memo_entries += self.memo.len();
        stats
    }
}
