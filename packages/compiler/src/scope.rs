//! Scope tree and symbol store.

use indexmap::IndexMap;
use serde::Serialize;

use crate::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolId(pub u32);

/// A named binding. The type is filled lazily, once the defining
/// declaration's type is known.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub decl: NodeId,
    pub ty: Option<NodeId>,
}

/// One name table. Lookup walks `parent`; local lookup does not. Each scope
/// carries its own counter for fresh temporary ids; only function-level
/// scopes actually hand ids out.
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    names: IndexMap<String, SymbolId>,
    pub next_tmpid: u32,
}

/// All scopes and symbols of one compilation. Flat stores indexed by typed
/// ids; nothing is ever removed.
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl ScopeTree {
    pub fn new() -> Self {
        ScopeTree::default()
    }

    pub fn push(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            names: IndexMap::new(),
            next_tmpid: 1,
        });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    /// Bind `name` in `scope`. `Err` carries the previously bound symbol.
    pub fn insert(
        &mut self,
        scope: ScopeId,
        name: &str,
        decl: NodeId,
    ) -> Result<SymbolId, SymbolId> {
        if let Some(&existing) = self.scopes[scope.0 as usize].names.get(name) {
            return Err(existing);
        }
        let sym = self.add_detached(name, decl);
        self.scopes[scope.0 as usize]
            .names
            .insert(name.to_string(), sym);
        Ok(sym)
    }

    /// Create a symbol bound in no scope. Compiler temporaries are never
    /// looked up by name.
    pub fn add_detached(&mut self, name: &str, decl: NodeId) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.to_string(),
            decl,
            ty: None,
        });
        id
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope.0 as usize].names.get(name).copied()
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            if let Some(sym) = self.lookup_local(s, name) {
                return Some(sym);
            }
            cur = self.scopes[s.0 as usize].parent;
        }
        None
    }

    pub fn fresh_tmpid(&mut self, scope: ScopeId) -> u32 {
        let s = &mut self.scopes[scope.0 as usize];
        let id = s.next_tmpid;
        s.next_tmpid += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents_local_does_not() {
        let mut tree = ScopeTree::new();
        let outer = tree.push(None);
        let inner = tree.push(Some(outer));
        let sym = tree.insert(outer, "x", NodeId(0)).unwrap();
        assert_eq!(tree.lookup(inner, "x"), Some(sym));
        assert_eq!(tree.lookup_local(inner, "x"), None);
        assert!(tree.insert(outer, "x", NodeId(1)).is_err());
    }

    #[test]
    fn tmpids_are_sequential_per_scope() {
        let mut tree = ScopeTree::new();
        let f = tree.push(None);
        let g = tree.push(None);
        assert_eq!(tree.fresh_tmpid(f), 1);
        assert_eq!(tree.fresh_tmpid(f), 2);
        assert_eq!(tree.fresh_tmpid(g), 1);
    }
}
