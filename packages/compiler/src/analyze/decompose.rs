//! Expression decomposition.
//!
//! Three rewrites share the machinery here: extraction of complex
//! sub-expressions into temporaries (three-address form), flattening of
//! struct and array initializers into per-field assignments, and the
//! rewrite of complex assignment targets into pointer-deref chains.

use crate::error::CompileError;
use crate::tree::{
    AnalysisState, DeclData, DeclStates, NodeFlags, NodeId, NodeKind, Qualifiers, UnOp,
};

use super::{AResult, Analyzer};

impl<'a> Analyzer<'a> {
    /// Simple expressions survive as operands: literals other than strings,
    /// identifiers, initializers, and deref/address-of/field/index forms
    /// built from simple parts.
    pub(crate) fn is_simple(&self, id: NodeId) -> bool {
        match self.ast.kind(id) {
            NodeKind::IntLit { .. }
            | NodeKind::UintLit { .. }
            | NodeKind::BoolLit { .. }
            | NodeKind::NullLit
            | NodeKind::UndefinedLit
            | NodeKind::Ident { .. }
            | NodeKind::EnumValueRef { .. }
            | NodeKind::StructInit { .. }
            | NodeKind::ArrayInit { .. } => true,
            NodeKind::Unary {
                op: UnOp::Deref,
                operand,
                ..
            }
            | NodeKind::Unary {
                op: UnOp::AddrOf,
                operand,
                ..
            } => self.is_simple(*operand),
            NodeKind::Field { object, .. } => self.is_simple(*object),
            NodeKind::Index { object, index } => {
                self.is_simple(*object) && self.is_simple(*index)
            }
            _ => false,
        }
    }

    /// Extract `id` into a fresh temporary and return an identifier
    /// reference to it. Already-simple expressions, module-level
    /// expressions, and array-typed expressions pass through unchanged.
    pub(crate) fn decompose_to_simple(&mut self, id: NodeId) -> AResult<NodeId> {
        if self.is_simple(id) {
            return Ok(id);
        }
        if self.block.is_none() {
            // module-level initializers stay whole; constness is checked at
            // the declaration
            return Ok(id);
        }
        let Some(ty) = self.analyze_expr(id)? else {
            // unresolved behind a dependency; retried on re-analysis
            return Ok(id);
        };
        if !self.type_is_resolved(ty) {
            return Ok(id);
        }
        if matches!(self.ast.kind(ty), NodeKind::ArrayType { .. }) {
            // arrays cannot be assigned in C
            return Ok(id);
        }
        let ident = self.make_temporary(ty, Some(id));
        Ok(ident)
    }

    /// Declare `__tmp<n>` of the given type, insert it before the current
    /// statement, and return a fresh identifier reference to it.
    pub(crate) fn make_temporary(&mut self, ty: NodeId, init: Option<NodeId>) -> NodeId {
        let loc = init.map(|i| self.ast.loc(i)).unwrap_or(crate::diagnostics::Loc::NONE);
        let tmp_id = self.scopes.fresh_tmpid(self.fn_scope);
        let name = crate::emit::names::tmp_name(tmp_id);
        let decl = self.ast.alloc_synthetic(
            loc,
            NodeKind::Decl(DeclData {
                name: name.clone(),
                quals: Qualifiers::empty(),
                tmp_id,
                ty: Some(ty),
                init,
                states: DeclStates {
                    overall: AnalysisState::Completed,
                    signature: AnalysisState::Completed,
                    body: AnalysisState::Completed,
                },
            }),
        );
        self.ast[decl].flags |= NodeFlags::TEMPORARY | NodeFlags::ANALYZED;
        let sym = self.scopes.add_detached(&name, decl);
        self.scopes.symbol_mut(sym).ty = Some(ty);
        self.insert_before_current(decl);
        self.temp_ref(sym, ty, loc)
    }

    fn temp_ref(&mut self, sym: crate::scope::SymbolId, ty: NodeId, loc: crate::diagnostics::Loc) -> NodeId {
        let name = self.scopes.symbol(sym).name.clone();
        let ident = self.ast.alloc_synthetic(
            loc,
            NodeKind::Ident {
                name,
                symbol: Some(sym),
                needs_user_prefix: false,
            },
        );
        self.ast[ident].ty = Some(ty);
        self.ast[ident].flags |= NodeFlags::ANALYZED;
        ident
    }

    /// Flatten a struct or array initializer on a local declaration into a
    /// temporary plus one assignment per field, each analyzed immediately so
    /// composite bases decompose into pointer chains.
    pub(crate) fn flatten_initializer(&mut self, decl: NodeId) -> AResult<()> {
        let loc = self.ast.loc(decl);
        let (name, ty, init) = match self.ast.kind(decl) {
            NodeKind::Decl(d) => (d.name.clone(), d.ty, d.init),
            _ => return Ok(()),
        };
        let Some(init) = init else { return Ok(()) };
        let Some(ty) = ty else {
            return self.fail(loc, CompileError::CannotInfer(name));
        };
        self.resolve_type(ty)?;
        if !self.type_is_resolved(ty) {
            return Ok(()); // retried once dependencies resolve
        }
        let base = self.make_temporary(ty, None);
        self.ast[init].ty = Some(ty);
        self.flatten_fields(base, init)?;
        let replacement = self.ast.clone_expr(base);
        if let NodeKind::Decl(d) = &mut self.ast[decl].kind {
            d.init = Some(replacement);
        }
        Ok(())
    }

    fn flatten_fields(&mut self, base: NodeId, init: NodeId) -> AResult<()> {
        match self.ast.kind(init).clone() {
            NodeKind::StructInit { fields } => {
                for (fname, value) in fields {
                    let vloc = self.ast.loc(value);
                    let obj = self.ast.clone_expr(base);
                    let lhs = self.ast.alloc(
                        vloc,
                        NodeKind::Field {
                            object: obj,
                            name: fname,
                            object_is_pointer: false,
                        },
                    );
                    self.flatten_one(lhs, value)?;
                }
            }
            NodeKind::ArrayInit { elems } => {
                for (i, value) in elems.into_iter().enumerate() {
                    let vloc = self.ast.loc(value);
                    let obj = self.ast.clone_expr(base);
                    let ix = self.ast.alloc(vloc, NodeKind::IntLit { value: i as i64 });
                    let lhs = self.ast.alloc(
                        vloc,
                        NodeKind::Index {
                            object: obj,
                            index: ix,
                        },
                    );
                    self.flatten_one(lhs, value)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn flatten_one(&mut self, lhs: NodeId, value: NodeId) -> AResult<()> {
        if matches!(
            self.ast.kind(value),
            NodeKind::StructInit { .. } | NodeKind::ArrayInit { .. }
        ) {
            return self.flatten_fields(lhs, value);
        }
        let loc = self.ast.loc(value);
        let assign = self
            .ast
            .alloc_synthetic(loc, NodeKind::Assign { lhs, rhs: value });
        self.insert_and_analyze(assign)
    }

    /// Rewrite a complex lvalue into a chain of pointer temporaries,
    /// returning the final `*tmp` (or a bare identifier for the base case).
    /// `&(*p)` folds back to `p`, so a deref of a simple pointer is left
    /// alone. Synthetic nodes make the rewrite idempotent.
    pub(crate) fn lvalue_chain(&mut self, lv: NodeId) -> AResult<NodeId> {
        let loc = self.ast.loc(lv);
        match self.ast.kind(lv).clone() {
            NodeKind::Ident { .. } => Ok(lv),
            NodeKind::Unary {
                op: UnOp::Deref,
                operand,
                ..
            } => {
                if matches!(self.ast.kind(operand), NodeKind::Ident { .. }) {
                    return Ok(lv);
                }
                let simple = self.decompose_to_simple(operand)?;
                let deref = self.ast.alloc_synthetic(
                    loc,
                    NodeKind::Unary {
                        op: UnOp::Deref,
                        operand: simple,
                        builtin: None,
                    },
                );
                self.analyze_expr(deref)?;
                Ok(deref)
            }
            NodeKind::Field { object, name, .. } => {
                let base = self.lvalue_chain(object)?;
                let obj = self.deref_if_pointer(base)?;
                let access = self.ast.alloc_synthetic(
                    loc,
                    NodeKind::Field {
                        object: obj,
                        name,
                        object_is_pointer: false,
                    },
                );
                self.chain_step(lv, access)
            }
            NodeKind::Index { object, index } => {
                let base = self.lvalue_chain(object)?;
                let ix = self.decompose_to_simple(index)?;
                let obj = self.deref_if_pointer(base)?;
                let access = self.ast.alloc_synthetic(
                    loc,
                    NodeKind::Index {
                        object: obj,
                        index: ix,
                    },
                );
                self.chain_step(lv, access)
            }
            _ => Ok(lv),
        }
    }

    /// Wrap a pointer-typed base in an explicit deref so the access prints
    /// as `(*base).field` inside the synthesized address-of.
    fn deref_if_pointer(&mut self, base: NodeId) -> AResult<NodeId> {
        let Some(ty) = self.analyze_expr(base)? else {
            return Ok(base);
        };
        if !matches!(self.ast.kind(ty), NodeKind::PointerType { .. }) {
            return Ok(base);
        }
        let loc = self.ast.loc(base);
        let deref = self.ast.alloc_synthetic(
            loc,
            NodeKind::Unary {
                op: UnOp::Deref,
                operand: base,
                builtin: None,
            },
        );
        self.analyze_expr(deref)?;
        Ok(deref)
    }

    /// Bind `&access` to a fresh pointer temporary and return `*tmp`.
    fn chain_step(&mut self, original: NodeId, access: NodeId) -> AResult<NodeId> {
        let loc = self.ast.loc(access);
        let Some(t) = self.analyze_expr(access)? else {
            // unresolved mid-chain; leave the original target untouched and
            // let re-analysis redo the chain
            return Ok(original);
        };
        let addr = self.ast.alloc_synthetic(
            loc,
            NodeKind::Unary {
                op: UnOp::AddrOf,
                operand: access,
                builtin: None,
            },
        );
        let ptr_ty = self
            .ast
            .alloc_synthetic(loc, NodeKind::PointerType { pointee: t });
        self.ast[addr].ty = Some(ptr_ty);
        self.ast[addr].flags |= NodeFlags::ANALYZED;
        let tmp_ref = self.make_temporary(ptr_ty, Some(addr));
        let deref = self.ast.alloc_synthetic(
            loc,
            NodeKind::Unary {
                op: UnOp::Deref,
                operand: tmp_ref,
                builtin: None,
            },
        );
        self.ast[deref].ty = Some(t);
        self.ast[deref].flags |= NodeFlags::ANALYZED;
        Ok(deref)
    }

    /// `static` string declarations become `u8[N]` arrays of byte literals
    /// with a trailing zero.
    pub(crate) fn rewrite_static_string(&mut self, decl: NodeId) {
        let (init, loc) = match self.ast.kind(decl) {
            NodeKind::Decl(d) => (d.init, self.ast.loc(decl)),
            _ => return,
        };
        let Some(init) = init else { return };
        let NodeKind::StrLit { value } = self.ast.kind(init).clone() else {
            return;
        };
        let u8_ty = self.builtin_ty(crate::types::BuiltinType::U8);
        let size = self
            .ast
            .alloc_synthetic(loc, NodeKind::IntLit {
                value: value.len() as i64 + 1,
            });
        let arr_ty = self.ast.alloc_synthetic(
            loc,
            NodeKind::ArrayType {
                elem: u8_ty,
                size,
            },
        );
        let mut elems = Vec::with_capacity(value.len() + 1);
        for b in value.iter().copied().chain(std::iter::once(0u8)) {
            elems.push(
                self.ast
                    .alloc_synthetic(loc, NodeKind::IntLit { value: b as i64 }),
            );
        }
        let arr_init = self.ast.alloc_synthetic(loc, NodeKind::ArrayInit { elems });
        self.ast[arr_init].ty = Some(arr_ty);
        self.ast[arr_init].flags |= NodeFlags::ANALYZED;
        if let NodeKind::Decl(d) = &mut self.ast[decl].kind {
            d.ty = Some(arr_ty);
            d.init = Some(arr_init);
        }
    }
}
