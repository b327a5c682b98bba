//! Semantic analysis.
//!
//! The analyzer resolves names and types, evaluates constant expressions,
//! decomposes complex sub-expressions into temporaries, rewrites complex
//! lvalues into pointer-deref chains, synthesizes tag enums for auto-tagged
//! unions, and orders forward declarations. Progress is driven by a work
//! queue: a declaration that cannot finish because another declaration is
//! unresolved records that dependency and is re-enqueued.

mod decls;
mod decompose;
mod exprs;
mod stmts;
mod types;

use std::collections::{HashMap, HashSet, VecDeque};

use smallvec::SmallVec;

use crate::diagnostics::{Diagnostics, Loc};
use crate::error::CompileError;
use crate::scope::{ScopeId, ScopeTree};
use crate::tree::{
    AnalysisState, NodeArena, NodeFlags, NodeId, NodeKind,
};
use crate::types::{BuiltinType, TypeTable};

/// Marker for an analysis error whose diagnostic has already been recorded.
pub struct AnalyzeFail;

pub type AResult<T> = Result<T, AnalyzeFail>;

/// The analyzer's output: the type table and scope tree survive analysis for
/// the emitter and for inspection in tests.
pub struct Analysis {
    pub types: TypeTable,
    pub scopes: ScopeTree,
    pub module_scope: ScopeId,
}

pub struct Analyzer<'a> {
    pub(crate) ast: &'a mut NodeArena,
    pub(crate) diags: &'a mut Diagnostics,
    pub(crate) types: TypeTable,
    pub(crate) scopes: ScopeTree,
    pub(crate) module: NodeId,
    pub(crate) module_scope: ScopeId,
    /// Current lexical scope.
    pub(crate) scope: ScopeId,
    /// Scope whose counter hands out temporary ids.
    pub(crate) fn_scope: ScopeId,
    /// Insertion point for synthesized temporaries: the current block and
    /// the index of the statement being analyzed within it.
    pub(crate) block: Option<NodeId>,
    pub(crate) stmt_ix: usize,
    /// Module level is zero.
    pub(crate) depth: u32,
    queue: VecDeque<NodeId>,
    pub(crate) pending_deps: SmallVec<[NodeId; 4]>,
    /// Collected forward-declaration stubs, paired with their target.
    pub(crate) forward_decls: Vec<(NodeId, NodeId)>,
    pub(crate) forward_targets: HashSet<NodeId>,
    /// Module-level declarations, for the pub/extern prefix exemptions.
    pub(crate) module_decls: HashSet<NodeId>,
    /// One function scope per function declaration, so temporary ids stay
    /// unique across re-analysis.
    pub(crate) fn_scopes: HashMap<NodeId, ScopeId>,
    requeues: HashMap<NodeId, u32>,
    builtin_ty_nodes: HashMap<BuiltinType, NodeId>,
}

/// Run semantic analysis over a parsed module. Errors land in `diags`; the
/// tree is normalized in place.
pub fn analyze(ast: &mut NodeArena, diags: &mut Diagnostics, module: NodeId) -> Analysis {
    let mut scopes = ScopeTree::new();
    let module_scope = scopes.push(None);
    let mut a = Analyzer {
        ast,
        diags,
        types: TypeTable::with_builtins(),
        scopes,
        module,
        module_scope,
        scope: module_scope,
        fn_scope: module_scope,
        block: None,
        stmt_ix: 0,
        depth: 0,
        queue: VecDeque::new(),
        pending_deps: SmallVec::new(),
        forward_decls: Vec::new(),
        forward_targets: HashSet::new(),
        module_decls: HashSet::new(),
        fn_scopes: HashMap::new(),
        requeues: HashMap::new(),
        builtin_ty_nodes: HashMap::new(),
    };
    a.run();
    Analysis {
        types: a.types,
        scopes: a.scopes,
        module_scope,
    }
}

impl<'a> Analyzer<'a> {
    fn run(&mut self) {
        self.register();
        self.drain();
        // Private declarations nothing public reached still need analysis
        // before emission; sweep them in after the demand-driven pass.
        let rest: Vec<NodeId> = self
            .module_decl_list()
            .into_iter()
            .filter(|&d| self.decl_state(d) == AnalysisState::NotStarted)
            .collect();
        for d in rest {
            self.enqueue(d);
        }
        self.drain();
        self.prepend_forward_decls();
    }

    pub(crate) fn module_decl_list(&self) -> Vec<NodeId> {
        match self.ast.kind(self.module) {
            NodeKind::Module { decls } => decls.clone(),
            _ => Vec::new(),
        }
    }

    /// Registration pass: set up states, populate the type table and module
    /// scope, and seed the queue with public declarations.
    fn register(&mut self) {
        let decls = self.module_decl_list();
        for &decl in &decls {
            let loc = self.ast.loc(decl);
            let (name, is_pub, init) = match self.ast.kind(decl) {
                NodeKind::Decl(d) => (
                    d.name.clone(),
                    d.quals.contains(crate::tree::Qualifiers::PUB),
                    d.init,
                ),
                _ => {
                    self.diags.error(
                        loc,
                        CompileError::Internal("module child is not a declaration".into())
                            .to_string(),
                    );
                    continue;
                }
            };
            self.module_decls.insert(decl);
            self.set_decl_state(decl, AnalysisState::NotStarted);
            let is_type_decl = matches!(
                init.map(|i| self.ast.kind(i)),
                Some(NodeKind::StructDecl { .. })
                    | Some(NodeKind::EnumDecl { .. })
                    | Some(NodeKind::UnionDecl { .. })
            );
            if is_type_decl && self.types.insert_user(&name, decl, is_pub).is_err() {
                self.diags
                    .error(loc, CompileError::DuplicateType(name.clone()).to_string());
                continue;
            }
            if self.scopes.insert(self.module_scope, &name, decl).is_err() {
                self.diags
                    .error(loc, CompileError::DuplicateDecl(name).to_string());
                continue;
            }
            if is_pub {
                self.enqueue(decl);
            }
        }
    }

    pub(crate) fn enqueue(&mut self, decl: NodeId) {
        if self.ast[decl].flags.contains(NodeFlags::QUEUED) {
            return;
        }
        self.ast[decl].flags |= NodeFlags::QUEUED;
        self.queue.push_back(decl);
    }

    /// Queue-driven lazy pass. A declaration that finishes clean is
    /// completed; one that produced pending dependencies is reset, its
    /// dependencies enqueued in order, and itself re-enqueued at the tail.
    fn drain(&mut self) {
        let max_requeues = self.module_decls.len() as u32 + 1;
        while let Some(decl) = self.queue.pop_front() {
            self.ast[decl].flags.remove(NodeFlags::QUEUED);
            match self.decl_state(decl) {
                AnalysisState::Completed | AnalysisState::Failed => continue,
                AnalysisState::InProgress => {
                    self.report_cycle(decl);
                    continue;
                }
                AnalysisState::NotStarted => {}
            }
            if *self.requeues.get(&decl).unwrap_or(&0) > max_requeues {
                self.report_cycle(decl);
                continue;
            }
            self.set_decl_state(decl, AnalysisState::InProgress);
            let result = self.analyze_module_decl(decl);
            let deps: Vec<NodeId> = self.pending_deps.drain(..).collect();
            for &d in &deps {
                self.ast[d].flags.remove(NodeFlags::PENDING_DEP);
            }
            match result {
                Err(AnalyzeFail) => self.set_decl_state(decl, AnalysisState::Failed),
                Ok(()) if deps.is_empty() => {
                    self.set_decl_state(decl, AnalysisState::Completed);
                    self.ast[decl].flags |= NodeFlags::ANALYZED;
                }
                Ok(()) => {
                    self.set_decl_state(decl, AnalysisState::NotStarted);
                    for d in deps {
                        if self.decl_state(d) != AnalysisState::Completed {
                            self.enqueue(d);
                        }
                    }
                    *self.requeues.entry(decl).or_insert(0) += 1;
                    self.enqueue(decl);
                }
            }
        }
    }

    fn report_cycle(&mut self, decl: NodeId) {
        let loc = self.ast.loc(decl);
        let name = self.decl_name(decl);
        self.diags
            .error(loc, CompileError::CircularDependency(name).to_string());
        self.set_decl_state(decl, AnalysisState::Failed);
    }

    /// Record that the declaration under analysis needs `dep` resolved
    /// first. Duplicates are suppressed by the per-node pending flag.
    pub(crate) fn add_dependency(&mut self, dep: NodeId) {
        if self.ast[dep].flags.contains(NodeFlags::PENDING_DEP) {
            return;
        }
        // failed dependencies already reported; waiting on them cannot help
        if matches!(
            self.decl_state(dep),
            AnalysisState::Completed | AnalysisState::Failed
        ) {
            return;
        }
        self.ast[dep].flags |= NodeFlags::PENDING_DEP;
        self.pending_deps.push(dep);
    }

    /// Place the collected forward-declaration stubs. Stubs go to the front
    /// of the module in declaration order, ahead of every definition — with
    /// one exception: an auto-tagged union's stub follows its synthesized
    /// tag enum, sitting immediately before the union itself.
    fn prepend_forward_decls(&mut self) {
        if self.forward_decls.is_empty() {
            return;
        }
        let order = self.module_decl_list();
        let pos_of = |target: NodeId| order.iter().position(|&d| d == target).unwrap_or(usize::MAX);
        let mut stubs = std::mem::take(&mut self.forward_decls);
        stubs.sort_by_key(|&(_, target)| pos_of(target));
        let mut front: Vec<NodeId> = Vec::new();
        let mut after_tag: Vec<(NodeId, NodeId)> = Vec::new();
        for (stub, target) in stubs {
            if self.has_synthesized_tag(target) {
                after_tag.push((stub, target));
            } else {
                front.push(stub);
            }
        }
        for (stub, target) in after_tag {
            let pos = match self.ast.kind(self.module) {
                NodeKind::Module { decls } => decls.iter().position(|&d| d == target),
                _ => None,
            };
            match pos {
                Some(pos) => {
                    if let NodeKind::Module { decls } = &mut self.ast[self.module].kind {
                        decls.insert(pos, stub);
                    }
                }
                None => front.push(stub),
            }
        }
        if let NodeKind::Module { decls } = &mut self.ast[self.module].kind {
            let mut new_decls = front;
            new_decls.append(decls);
            *decls = new_decls;
        }
    }

    /// True for a union declaration whose tag enum was synthesized by
    /// analysis rather than named in the source.
    fn has_synthesized_tag(&self, decl: NodeId) -> bool {
        let NodeKind::Decl(d) = self.ast.kind(decl) else {
            return false;
        };
        let Some(init) = d.init else { return false };
        let NodeKind::UnionDecl { tag: Some(tag), .. } = self.ast.kind(init) else {
            return false;
        };
        let NodeKind::NamedType {
            entry: Some(slot), ..
        } = self.ast.kind(*tag)
        else {
            return false;
        };
        let Some(tag_decl) = self.types.entry(*slot).decl else {
            return false;
        };
        self.ast[tag_decl].flags.contains(NodeFlags::SYNTHETIC)
    }

    // --- Shared helpers ---

    pub(crate) fn fail<T>(&mut self, loc: Loc, err: CompileError) -> AResult<T> {
        self.diags.error(loc, err.to_string());
        Err(AnalyzeFail)
    }

    pub(crate) fn decl_state(&self, decl: NodeId) -> AnalysisState {
        match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.states.overall,
            _ => AnalysisState::Completed,
        }
    }

    pub(crate) fn set_decl_state(&mut self, decl: NodeId, state: AnalysisState) {
        if let NodeKind::Decl(d) = &mut self.ast[decl].kind {
            d.states.overall = state;
        }
    }

    pub(crate) fn decl_name(&self, decl: NodeId) -> String {
        match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.name.clone(),
            _ => String::new(),
        }
    }

    /// Shared named-type node for a built-in.
    pub(crate) fn builtin_ty(&mut self, bt: BuiltinType) -> NodeId {
        if let Some(&id) = self.builtin_ty_nodes.get(&bt) {
            return id;
        }
        let name = bt.tick_name().to_string();
        let entry = self.types.lookup(&name).map(|(slot, _)| slot);
        let id = self.ast.alloc_synthetic(
            Loc::NONE,
            NodeKind::NamedType {
                name,
                builtin: bt,
                entry,
            },
        );
        self.builtin_ty_nodes.insert(bt, id);
        id
    }

    /// The built-in tag of a resolved type node.
    pub(crate) fn type_builtin(&self, ty: NodeId) -> BuiltinType {
        match self.ast.kind(ty) {
            NodeKind::NamedType { builtin, .. } => *builtin,
            _ => BuiltinType::Unknown,
        }
    }

    /// Insert a pre-analyzed statement immediately before the statement
    /// being analyzed.
    pub(crate) fn insert_before_current(&mut self, stmt: NodeId) {
        let block = self.block.expect("no insertion block");
        if let NodeKind::Block { stmts } = &mut self.ast[block].kind {
            stmts.insert(self.stmt_ix, stmt);
        }
        self.stmt_ix += 1;
    }

    /// Insert a synthesized statement before the current one and analyze it
    /// in place, so temporaries it produces land ahead of it.
    pub(crate) fn insert_and_analyze(&mut self, stmt: NodeId) -> AResult<()> {
        let block = self.block.expect("no insertion block");
        let pos = self.stmt_ix;
        if let NodeKind::Block { stmts } = &mut self.ast[block].kind {
            stmts.insert(pos, stmt);
        }
        self.stmt_ix = pos;
        self.analyze_stmt(stmt)?;
        self.stmt_ix += 1;
        Ok(())
    }
}
