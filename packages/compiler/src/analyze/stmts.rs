//! Statement analysis.

use crate::error::CompileError;
use crate::tree::{NodeFlags, NodeId, NodeKind, Qualifiers};

use super::{AResult, Analyzer};

impl<'a> Analyzer<'a> {
    /// Analyze a block: push a scope, walk the statements keeping the
    /// insertion point current, pop the scope. The explicit save/restore
    /// stands in for the scope guard of the block's lifetime.
    pub(crate) fn analyze_block(&mut self, blk: NodeId) -> AResult<()> {
        let saved_scope = self.scope;
        let saved_block = self.block;
        let saved_ix = self.stmt_ix;
        self.scope = self.scopes.push(Some(saved_scope));
        self.block = Some(blk);
        self.depth += 1;
        let result = self.analyze_block_stmts(blk);
        self.scope = saved_scope;
        self.block = saved_block;
        self.stmt_ix = saved_ix;
        self.depth -= 1;
        result
    }

    fn analyze_block_stmts(&mut self, blk: NodeId) -> AResult<()> {
        let mut ix = 0;
        loop {
            let len = match self.ast.kind(blk) {
                NodeKind::Block { stmts } => stmts.len(),
                _ => 0,
            };
            if ix >= len {
                return Ok(());
            }
            let stmt = match self.ast.kind(blk) {
                NodeKind::Block { stmts } => stmts[ix],
                _ => return Ok(()),
            };
            self.stmt_ix = ix;
            self.analyze_stmt(stmt)?;
            ix = self.stmt_ix + 1;
        }
    }

    pub(crate) fn analyze_stmt(&mut self, stmt: NodeId) -> AResult<()> {
        match self.ast.kind(stmt).clone() {
            NodeKind::Decl(_) => {
                // pre-completed compiler temporaries are not re-analyzed
                if self.ast[stmt].flags.contains(NodeFlags::TEMPORARY) {
                    return Ok(());
                }
                self.analyze_local_decl(stmt)
            }
            NodeKind::Assign { lhs, rhs } => self.analyze_assign(stmt, lhs, rhs),
            NodeKind::If {
                cond,
                then_blk,
                else_blk,
            } => {
                self.analyze_expr(cond)?;
                // normalize: no else becomes an empty block, `else if`
                // becomes a block wrapping the inner if
                let else_blk = match else_blk {
                    None => {
                        let loc = self.ast.loc(stmt);
                        self.ast
                            .alloc_synthetic(loc, NodeKind::Block { stmts: Vec::new() })
                    }
                    Some(e) if matches!(self.ast.kind(e), NodeKind::If { .. }) => {
                        let loc = self.ast.loc(e);
                        self.ast
                            .alloc_synthetic(loc, NodeKind::Block { stmts: vec![e] })
                    }
                    Some(e) => e,
                };
                if let NodeKind::If { else_blk: eb, .. } = &mut self.ast[stmt].kind {
                    *eb = Some(else_blk);
                }
                self.analyze_block(then_blk)?;
                self.analyze_block(else_blk)
            }
            NodeKind::Switch { value, cases } => {
                self.analyze_expr(value)?;
                for case in cases {
                    self.analyze_case(case)?;
                }
                Ok(())
            }
            NodeKind::For {
                init,
                cond,
                step,
                body,
            } => {
                // the loop header shares one scope so an init declaration is
                // visible to the condition, step, and body
                let saved_scope = self.scope;
                self.scope = self.scopes.push(Some(saved_scope));
                let result = (|| {
                    if let Some(init) = init {
                        self.analyze_stmt(init)?;
                    }
                    if let Some(cond) = cond {
                        self.analyze_expr(cond)?;
                    }
                    if let Some(step) = step {
                        self.analyze_stmt(step)?;
                    }
                    self.analyze_block(body)
                })();
                self.scope = saved_scope;
                result
            }
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.analyze_expr(value)?;
                }
                Ok(())
            }
            NodeKind::ExprStmt { expr } => {
                self.analyze_expr(expr)?;
                Ok(())
            }
            NodeKind::Block { .. } => self.analyze_block(stmt),
            NodeKind::Break | NodeKind::Continue | NodeKind::Goto { .. }
            | NodeKind::Label { .. } => Ok(()),
            _ => {
                let loc = self.ast.loc(stmt);
                self.fail(
                    loc,
                    CompileError::Internal("unexpected node in statement position".into()),
                )
            }
        }
    }

    fn analyze_assign(&mut self, stmt: NodeId, lhs: NodeId, rhs: NodeId) -> AResult<()> {
        self.analyze_expr(lhs)?;
        self.analyze_expr(rhs)?;
        let lhs_is_ident = matches!(self.ast.kind(lhs), NodeKind::Ident { .. });
        let lhs_synthetic = self.ast.is_synthetic(lhs);
        if !lhs_is_ident && !lhs_synthetic {
            let new_lhs = self.lvalue_chain(lhs)?;
            if let NodeKind::Assign { lhs: l, .. } = &mut self.ast[stmt].kind {
                *l = new_lhs;
            }
        }
        Ok(())
    }

    fn analyze_case(&mut self, case: NodeId) -> AResult<()> {
        let (values, stmts, block) = match self.ast.kind(case).clone() {
            NodeKind::Case {
                values,
                stmts,
                block,
            } => (values, stmts, block),
            _ => return Ok(()),
        };
        for v in values {
            self.analyze_expr(v)?;
        }
        // every case body emits as a block, empty cases included
        let block = match block {
            Some(b) => b,
            None => {
                let b = if stmts.len() == 1
                    && matches!(self.ast.kind(stmts[0]), NodeKind::Block { .. })
                {
                    stmts[0]
                } else {
                    let loc = self.ast.loc(case);
                    self.ast.alloc_synthetic(loc, NodeKind::Block { stmts })
                };
                if let NodeKind::Case { block: bl, .. } = &mut self.ast[case].kind {
                    *bl = Some(b);
                }
                b
            }
        };
        self.analyze_block(block)
    }

    /// Local declaration: infer or resolve the type, normalize the
    /// initializer, and bind the symbol.
    pub(crate) fn analyze_local_decl(&mut self, decl: NodeId) -> AResult<()> {
        let loc = self.ast.loc(decl);
        let (name, quals, ty, init) = match self.ast.kind(decl) {
            NodeKind::Decl(d) => (d.name.clone(), d.quals, d.ty, d.init),
            _ => return Ok(()),
        };
        if let Some(ty) = ty {
            self.resolve_type(ty)?;
            let init_is_fn = matches!(
                init.map(|i| self.ast.kind(i)),
                Some(NodeKind::Function { .. })
            );
            if matches!(self.ast.kind(ty), NodeKind::FnType { .. }) && !init_is_fn {
                return self.fail(loc, CompileError::BareFnType);
            }
        }
        match init.map(|i| (i, self.ast.kind(i).clone())) {
            None => {
                if !quals.contains(Qualifiers::EXTERN) {
                    return self.fail(loc, CompileError::MissingInitializer(name));
                }
            }
            Some((_, NodeKind::Function { .. }))
            | Some((_, NodeKind::StructDecl { .. }))
            | Some((_, NodeKind::EnumDecl { .. }))
            | Some((_, NodeKind::UnionDecl { .. })) => {
                return self.fail(loc, CompileError::NotModuleLevel);
            }
            Some((_, NodeKind::StrLit { .. })) if quals.contains(Qualifiers::STATIC) => {
                self.rewrite_static_string(decl);
            }
            Some((_, NodeKind::StructInit { .. })) | Some((_, NodeKind::ArrayInit { .. })) => {
                if quals.contains(Qualifiers::STATIC) {
                    // static aggregates keep their initializer; C accepts it
                    if let Some(i) = init {
                        self.analyze_expr(i)?;
                        if let Some(ty) = ty {
                            self.ast[i].ty = Some(ty);
                        }
                    }
                } else {
                    self.flatten_initializer(decl)?;
                }
            }
            Some((i, NodeKind::UndefinedLit)) => {
                if ty.is_none() {
                    return self.fail(loc, CompileError::CannotInfer(name));
                }
                // undefined initializers normalize to null
                let iloc = self.ast.loc(i);
                let null = self.ast.alloc_synthetic(iloc, NodeKind::NullLit);
                self.analyze_expr(null)?;
                if let NodeKind::Decl(d) = &mut self.ast[decl].kind {
                    d.init = Some(null);
                }
            }
            Some((i, _)) => {
                let it = self.analyze_expr(i)?;
                if ty.is_none() {
                    if let NodeKind::Decl(d) = &mut self.ast[decl].kind {
                        d.ty = it;
                    }
                }
            }
        }
        let sym = match self.scopes.insert(self.scope, &name, decl) {
            Ok(sym) => sym,
            Err(existing) => {
                if self.scopes.symbol(existing).decl == decl {
                    existing
                } else {
                    return self.fail(loc, CompileError::DuplicateDecl(name));
                }
            }
        };
        let final_ty = match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.ty,
            _ => None,
        };
        self.scopes.symbol_mut(sym).ty = final_ty;
        if final_ty.is_some() {
            self.ast[decl].flags |= NodeFlags::ANALYZED;
        }
        Ok(())
    }
}
