//! Pattern compiler
//!
//! Converts a [`SimplifiedGrammar`] into patterns. Elements are compiled on
//! first use: the element slot is reserved before its content is compiled,
//! so a content model that refers back to the element reuses the slot.

use crate::error::{GrammarError, Result};

use super::grammar::{GrammarKind, GrammarNode};
use super::name_class::NameClass;
use super::patterns::{PatternArena, PatternId};
use super::simplify::SimplifiedGrammar;

/// Compiled grammar
#[derive(Debug)]
pub struct CompiledGrammar {
    /// Pattern storage
    pub patterns: PatternArena<'static>,
    /// Start pattern
    pub start: PatternId,
}

/// Compile a simplified grammar
pub fn compile(grammar: &SimplifiedGrammar) -> Result<CompiledGrammar> {
    let mut compiler = Compiler {
        elements: &grammar.elements,
        slots: vec![None; grammar.elements.len()],
        arena: PatternArena::new(),
    };
    let start = compiler.compile_node(&grammar.start)?;
    log::debug!(
        "compiled {} patterns, {} of {} elements reachable",
        compiler.arena.len(),
        compiler.slots.iter().filter(|s| s.is_some()).count(),
        compiler.slots.len()
    );
    Ok(CompiledGrammar {
        patterns: compiler.arena,
        start,
    })
}

struct Compiler<'g> {
    elements: &'g [GrammarNode],
    slots: Vec<Option<PatternId>>,
    arena: PatternArena<'static>,
}

impl Compiler<'_> {
    fn compile_node(&mut self, node: &GrammarNode) -> Result<PatternId> {
        let id = match node.kind {
            GrammarKind::Empty => PatternId::EMPTY,
            GrammarKind::NotAllowed => PatternId::NOT_ALLOWED,
            GrammarKind::Text => PatternId::TEXT,
            GrammarKind::Choice => {
                let (a, b) = self.compile_pair(node)?;
                self.arena.choice(a, b)
            }
            GrammarKind::Group => {
                let (a, b) = self.compile_pair(node)?;
                self.arena.group(a, b)
            }
            GrammarKind::Interleave => {
                let (first, rest) = node.children.split_first().ok_or_else(|| arity(node))?;
                let mut result = self.compile_node(first)?;
                for child in rest {
                    let next = self.compile_node(child)?;
                    result = self.arena.interleave(result, next);
                }
                result
            }
            GrammarKind::OneOrMore => {
                let [child] = node.children.as_slice() else {
                    return Err(arity(node).into());
                };
                let inner = self.compile_node(child)?;
                self.arena.one_or_more(inner)
            }
            GrammarKind::Attribute => {
                let [name, content] = node.children.as_slice() else {
                    return Err(arity(node).into());
                };
                let name = NameClass::from_node(name)?;
                let name = self.arena.name_class(name);
                let content = self.compile_node(content)?;
                self.arena.attribute(name, content)
            }
            GrammarKind::Value => {
                let token = node.attribute("type").map_or(true, |t| t != "string");
                let text = node.text.clone().unwrap_or_default();
                self.arena.value(text, token)
            }
            GrammarKind::Data => {
                let datatype = node.attribute("type").unwrap_or_default().to_string();
                self.arena.data(datatype)
            }
            GrammarKind::List => {
                let content = match node.children.first() {
                    Some(child) => self.compile_node(child)?,
                    None => PatternId::EMPTY,
                };
                self.arena.list(content)
            }
            GrammarKind::ElementRef(index) => self.compile_element(index)?,
            _ => return Err(GrammarError::Unsupported(node.kind.to_string()).into()),
        };
        Ok(id)
    }

    fn compile_pair(&mut self, node: &GrammarNode) -> Result<(PatternId, PatternId)> {
        let [a, b] = node.children.as_slice() else {
            return Err(arity(node).into());
        };
        Ok((self.compile_node(a)?, self.compile_node(b)?))
    }

    fn compile_element(&mut self, index: usize) -> Result<PatternId> {
        if let Some(Some(id)) = self.slots.get(index) {
            return Ok(*id);
        }
        let element = self.elements.get(index).ok_or_else(|| {
            GrammarError::Unsupported(format!("reference to unknown element {}", index))
        })?;
        let [name, content] = element.children.as_slice() else {
            return Err(arity(element).into());
        };

        let name = NameClass::from_node(name)?;
        let name = self.arena.name_class(name);
        let id = self.arena.reserve_element(name);
        self.slots[index] = Some(id);

        let content = self.compile_node(content)?;
        self.arena.fill_element(id, content);
        Ok(id)
    }
}

fn arity(node: &GrammarNode) -> GrammarError {
    GrammarError::Arity {
        kind: node.kind.to_string(),
        count: node.children.len(),
    }
}
