//! Reference resolution
//!
//! Every `ref` is replaced by a copy of the body of its `define`, in the
//! start pattern and in every registered element. Element bodies are only
//! reached through the element list, never through an `ElementRef`, so
//! recursion through elements stays finite. After substitution the `empty`
//! absorption rules are applied and nested interleaves are flattened.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{GrammarError, Result};
use crate::limits::Limits;

use super::grammar::{Grammar, GrammarKind, GrammarNode};

/// Grammar with all references resolved
#[derive(Debug, Clone)]
pub struct SimplifiedGrammar {
    /// Start pattern
    pub start: GrammarNode,
    /// Registered elements as `[name class, content]`
    pub elements: Vec<GrammarNode>,
}

/// Resolve all references of a loaded grammar
pub fn simplify(grammar: Grammar, limits: &Limits) -> Result<SimplifiedGrammar> {
    let mut resolver = Resolver {
        defines: &grammar.defines,
        resolved: HashMap::new(),
        stack: Vec::new(),
        limits,
    };

    let start = resolver.resolve(grammar.start.clone())?;
    let mut elements = Vec::with_capacity(grammar.elements.len());
    for element in &grammar.elements {
        elements.push(resolver.resolve(element.clone())?);
    }

    log::debug!(
        "resolved {} definitions for {} elements",
        resolver.resolved.len(),
        elements.len()
    );
    Ok(SimplifiedGrammar { start, elements })
}

struct Resolver<'g> {
    defines: &'g IndexMap<String, GrammarNode>,
    resolved: HashMap<String, GrammarNode>,
    stack: Vec<String>,
    limits: &'g Limits,
}

impl Resolver<'_> {
    fn resolve(&mut self, mut node: GrammarNode) -> Result<GrammarNode> {
        if node.kind == GrammarKind::Ref {
            let name = node.attribute("name").unwrap_or_default().to_string();
            return self.resolve_ref(&name);
        }
        let children = std::mem::take(&mut node.children);
        node.children = children
            .into_iter()
            .map(|child| self.resolve(child))
            .collect::<Result<_>>()?;
        Ok(absorb_empty(node))
    }

    fn resolve_ref(&mut self, name: &str) -> Result<GrammarNode> {
        if let Some(body) = self.resolved.get(name) {
            return Ok(body.clone());
        }
        if self.stack.iter().any(|n| n == name) {
            return Err(GrammarError::RecursiveRef(name.to_string()).into());
        }
        self.limits.check_schema_depth(self.stack.len() + 1)?;

        let body = self
            .defines
            .get(name)
            .cloned()
            .ok_or_else(|| GrammarError::UndefinedRef(name.to_string()))?;

        self.stack.push(name.to_string());
        let body = self.resolve(body);
        self.stack.pop();
        let body = body?;

        log::trace!("resolved define '{}'", name);
        self.resolved.insert(name.to_string(), body.clone());
        Ok(body)
    }
}

fn is_empty(node: Option<&GrammarNode>) -> bool {
    node.map_or(true, |n| n.kind == GrammarKind::Empty)
}

/// `empty` absorption and interleave flattening for one node
fn absorb_empty(mut node: GrammarNode) -> GrammarNode {
    match node.kind {
        GrammarKind::Choice if is_empty(node.children.get(1)) => {
            if is_empty(node.children.first()) {
                return GrammarNode::new(GrammarKind::Empty);
            }
            node.children.truncate(1);
            node.children.insert(0, GrammarNode::new(GrammarKind::Empty));
            node
        }
        GrammarKind::Group | GrammarKind::Interleave => {
            node.children.retain(|c| c.kind != GrammarKind::Empty);
            match node.children.len() {
                0 => GrammarNode::new(GrammarKind::Empty),
                1 => node.children.remove(0),
                _ if node.kind == GrammarKind::Interleave => {
                    let children = std::mem::take(&mut node.children);
                    for child in children {
                        if child.kind == GrammarKind::Interleave {
                            node.children.extend(child.children);
                        } else {
                            node.children.push(child);
                        }
                    }
                    node
                }
                _ => node,
            }
        }
        GrammarKind::OneOrMore if is_empty(node.children.first()) => {
            GrammarNode::new(GrammarKind::Empty)
        }
        _ => node,
    }
}
