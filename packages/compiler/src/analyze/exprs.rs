//! Expression analysis.
//!
//! Every function returns the resolved type of the expression, or `None`
//! when resolution is deferred behind a pending dependency. Operands are
//! decomposed to simple form before analysis descends into them.

use crate::error::CompileError;
use crate::tree::{
    AnalysisState, BinOp, BuiltinOp, CastStrategy, NodeFlags, NodeId, NodeKind, Qualifiers, UnOp,
};
use crate::types::BuiltinType;

use super::{AResult, Analyzer};

impl<'a> Analyzer<'a> {
    pub(crate) fn analyze_expr(&mut self, id: NodeId) -> AResult<Option<NodeId>> {
        if self.ast[id].flags.contains(NodeFlags::ANALYZED) {
            if let Some(ty) = self.ast[id].ty {
                return Ok(Some(ty));
            }
        }
        let loc = self.ast.loc(id);
        let result = match self.ast.kind(id).clone() {
            NodeKind::IntLit { value } => {
                let bt = BuiltinType::smallest_signed(value);
                Some(self.builtin_ty(bt))
            }
            NodeKind::UintLit { .. } => Some(self.builtin_ty(BuiltinType::U64)),
            NodeKind::BoolLit { value } => {
                // booleans normalize to uint literals of type bool
                self.ast[id].kind = NodeKind::UintLit {
                    value: value as u64,
                };
                Some(self.builtin_ty(BuiltinType::Bool))
            }
            NodeKind::StrLit { .. } => {
                let u8_ty = self.builtin_ty(BuiltinType::U8);
                Some(
                    self.ast
                        .alloc_synthetic(loc, NodeKind::PointerType { pointee: u8_ty }),
                )
            }
            NodeKind::NullLit => {
                let void_ty = self.builtin_ty(BuiltinType::Void);
                Some(
                    self.ast
                        .alloc_synthetic(loc, NodeKind::PointerType { pointee: void_ty }),
                )
            }
            NodeKind::UndefinedLit => Some(self.builtin_ty(BuiltinType::Void)),
            NodeKind::Ident { ref name, .. } => {
                let name = name.clone();
                self.analyze_ident(id, loc, &name)?
            }
            NodeKind::Binary { op, lhs, rhs, .. } => self.analyze_binary(id, op, lhs, rhs)?,
            NodeKind::Unary { op, operand, .. } => self.analyze_unary(id, loc, op, operand)?,
            NodeKind::Cast { value, target, .. } => self.analyze_cast(id, value, target)?,
            NodeKind::Field {
                object, ref name, ..
            } => {
                let name = name.clone();
                self.analyze_field(id, loc, object, &name)?
            }
            NodeKind::Call { callee, args } => self.analyze_call(id, callee, args)?,
            NodeKind::Index { object, index } => self.analyze_index(id, loc, object, index)?,
            NodeKind::StructInit { fields } => {
                for (_, value) in fields {
                    self.analyze_expr(value)?;
                }
                self.ast[id].ty
            }
            NodeKind::ArrayInit { elems } => {
                for value in elems {
                    self.analyze_expr(value)?;
                }
                self.ast[id].ty
            }
            NodeKind::EnumValueRef { .. } => self.ast[id].ty,
            NodeKind::Unwrap { operand } => {
                let t = self.analyze_expr(operand)?;
                match t.map(|t| self.ast.kind(t).clone()) {
                    Some(NodeKind::OptionalType { inner }) => Some(inner),
                    _ => t,
                }
            }
            _ => None,
        };
        self.ast[id].ty = result;
        if result.is_some() {
            self.ast[id].flags |= NodeFlags::ANALYZED;
        }
        Ok(result)
    }

    fn analyze_ident(&mut self, id: NodeId, loc: crate::diagnostics::Loc, name: &str) -> AResult<Option<NodeId>> {
        if let Some(builtin) = name.strip_prefix('@') {
            if builtin != "dbg" && builtin != "panic" {
                return self.fail(loc, CompileError::UnknownBuiltin(name.to_string()));
            }
            return Ok(Some(self.builtin_ty(BuiltinType::Void)));
        }
        let Some(sym) = self.scopes.lookup(self.scope, name) else {
            return self.fail(loc, CompileError::UndefinedIdent(name.to_string()));
        };
        let decl = self.scopes.symbol(sym).decl;
        let prefix = self.needs_user_prefix(decl);
        if let NodeKind::Ident {
            symbol,
            needs_user_prefix,
            ..
        } = &mut self.ast[id].kind
        {
            *symbol = Some(sym);
            *needs_user_prefix = prefix;
        }
        if let Some(ty) = self.scopes.symbol(sym).ty {
            return Ok(Some(ty));
        }
        // Module-level declaration whose type has not resolved yet.
        if self.module_decls.contains(&decl) {
            if self.decl_state(decl) != AnalysisState::Completed {
                self.add_dependency(decl);
                return Ok(None);
            }
            let ty = match self.ast.kind(decl) {
                NodeKind::Decl(d) => d.ty,
                _ => None,
            };
            if ty.is_some() {
                self.scopes.symbol_mut(sym).ty = ty;
            }
            return Ok(ty);
        }
        Ok(None)
    }

    /// Prefix rule: extern names and pub module-level names keep their
    /// original spelling; temporaries have their own naming; everything else
    /// gets the user prefix.
    fn needs_user_prefix(&self, decl: NodeId) -> bool {
        if self.ast[decl].flags.contains(NodeFlags::TEMPORARY) {
            return false;
        }
        match self.ast.kind(decl) {
            NodeKind::Decl(d) => {
                if d.quals.contains(Qualifiers::EXTERN) {
                    return false;
                }
                if d.quals.contains(Qualifiers::PUB) && self.module_decls.contains(&decl) {
                    return false;
                }
                true
            }
            _ => true,
        }
    }

    fn analyze_binary(
        &mut self,
        id: NodeId,
        op: BinOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> AResult<Option<NodeId>> {
        let lhs = self.decompose_to_simple(lhs)?;
        let rhs = self.decompose_to_simple(rhs)?;
        if let NodeKind::Binary { lhs: l, rhs: r, .. } = &mut self.ast[id].kind {
            *l = lhs;
            *r = rhs;
        }
        let lt = self.analyze_expr(lhs)?;
        self.analyze_expr(rhs)?;
        let Some(lt) = lt else { return Ok(None) };
        let result = match op {
            BinOp::Orelse => match self.ast.kind(lt).clone() {
                NodeKind::OptionalType { inner } => inner,
                _ => lt,
            },
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
            | BinOp::And | BinOp::Or => self.builtin_ty(BuiltinType::Bool),
            _ => lt,
        };
        let tag = select_builtin_op(op, self.type_builtin(lt));
        if let NodeKind::Binary { builtin, .. } = &mut self.ast[id].kind {
            *builtin = tag;
        }
        Ok(Some(result))
    }

    fn analyze_unary(
        &mut self,
        id: NodeId,
        loc: crate::diagnostics::Loc,
        op: UnOp,
        operand: NodeId,
    ) -> AResult<Option<NodeId>> {
        let operand = self.decompose_to_simple(operand)?;
        if let NodeKind::Unary { operand: o, .. } = &mut self.ast[id].kind {
            *o = operand;
        }
        let t = self.analyze_expr(operand)?;
        let Some(t) = t else { return Ok(None) };
        match op {
            UnOp::AddrOf => Ok(Some(
                self.ast
                    .alloc_synthetic(loc, NodeKind::PointerType { pointee: t }),
            )),
            UnOp::Deref => match self.ast.kind(t).clone() {
                NodeKind::PointerType { pointee } => {
                    // the pointee's definition is needed, not just a stub
                    self.resolve_type(pointee)?;
                    Ok(Some(pointee))
                }
                _ => self.fail(loc, CompileError::DerefNonPointer),
            },
            UnOp::Not => Ok(Some(self.builtin_ty(BuiltinType::Bool))),
            UnOp::Neg => {
                if self.type_builtin(t).is_signed_int() {
                    if let NodeKind::Unary { builtin, .. } = &mut self.ast[id].kind {
                        *builtin = Some(BuiltinOp::CheckedNeg);
                    }
                }
                Ok(Some(t))
            }
            UnOp::BitNot => Ok(Some(t)),
        }
    }

    fn analyze_cast(
        &mut self,
        id: NodeId,
        value: NodeId,
        target: NodeId,
    ) -> AResult<Option<NodeId>> {
        let value = self.decompose_to_simple(value)?;
        if let NodeKind::Cast { value: v, .. } = &mut self.ast[id].kind {
            *v = value;
        }
        let vt = self.analyze_expr(value)?;
        self.resolve_type(target)?;
        let Some(vt) = vt else { return Ok(None) };
        let src = self.type_builtin(vt);
        let dst = self.type_builtin(target);
        let strategy = cast_strategy(src, dst);
        let runtime_func = if strategy == CastStrategy::Checked {
            Some(crate::emit::runtime::cast_helper_name(src, dst))
        } else {
            None
        };
        if let NodeKind::Cast {
            strategy: s,
            runtime_func: rf,
            ..
        } = &mut self.ast[id].kind
        {
            *s = strategy;
            *rf = runtime_func;
        }
        Ok(Some(target))
    }

    fn analyze_field(
        &mut self,
        id: NodeId,
        loc: crate::diagnostics::Loc,
        object: NodeId,
        name: &str,
    ) -> AResult<Option<NodeId>> {
        let object = self.decompose_to_simple(object)?;
        if let NodeKind::Field { object: o, .. } = &mut self.ast[id].kind {
            *o = object;
        }
        // A bare identifier naming a type is a type-scoped access.
        if let NodeKind::Ident { name: oname, .. } = self.ast.kind(object).clone() {
            if !oname.starts_with('@') {
                if let Some((slot, entry)) = self.types.lookup(&oname) {
                    if entry.builtin != BuiltinType::UserDefined {
                        return self.fail(loc, CompileError::FieldOfNonAggregate);
                    }
                    let decl = entry.decl.expect("user type without declaration");
                    let init = match self.ast.kind(decl) {
                        NodeKind::Decl(d) => d.init,
                        _ => None,
                    };
                    match init.map(|i| self.ast.kind(i).clone()) {
                        Some(NodeKind::EnumDecl { values, .. }) => {
                            let exists = values.iter().any(|&v| {
                                matches!(self.ast.kind(v), NodeKind::EnumMember { name: n, .. } if n.as_str() == name)
                            });
                            if !exists {
                                return self.fail(
                                    loc,
                                    CompileError::NoSuchEnumValue(name.to_string(), oname.clone()),
                                );
                            }
                            if self.decl_state(decl) != AnalysisState::Completed {
                                self.add_dependency(decl);
                            }
                            let ty = self.ast.alloc_synthetic(
                                loc,
                                NodeKind::NamedType {
                                    name: oname.clone(),
                                    builtin: BuiltinType::UserDefined,
                                    entry: Some(slot),
                                },
                            );
                            self.ast[id].kind = NodeKind::EnumValueRef {
                                name: name.to_string(),
                                parent: decl,
                            };
                            return Ok(Some(ty));
                        }
                        Some(NodeKind::StructDecl { .. }) | Some(NodeKind::UnionDecl { .. }) => {
                            return self.fail(loc, CompileError::FieldOfNonAggregate);
                        }
                        _ => {}
                    }
                }
            }
        }
        let t = self.analyze_expr(object)?;
        let Some(t) = t else { return Ok(None) };
        let base = match self.ast.kind(t).clone() {
            NodeKind::PointerType { pointee } => {
                if let NodeKind::Field {
                    object_is_pointer, ..
                } = &mut self.ast[id].kind
                {
                    *object_is_pointer = true;
                }
                pointee
            }
            _ => t,
        };
        self.resolve_type_shallow(base)?;
        let NodeKind::NamedType {
            builtin: BuiltinType::UserDefined,
            entry: Some(slot),
            ..
        } = self.ast.kind(base)
        else {
            return self.fail(loc, CompileError::FieldOfNonAggregate);
        };
        let Some(decl) = self.types.entry(*slot).decl else {
            return self.fail(loc, CompileError::FieldOfNonAggregate);
        };
        if self.decl_state(decl) != AnalysisState::Completed {
            self.add_dependency(decl);
            return Ok(None);
        }
        let init = match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.init,
            _ => None,
        };
        let fields = match init.map(|i| self.ast.kind(i).clone()) {
            Some(NodeKind::StructDecl { fields, .. })
            | Some(NodeKind::UnionDecl { fields, .. }) => fields,
            _ => return self.fail(loc, CompileError::FieldOfNonAggregate),
        };
        for f in fields {
            if let NodeKind::FieldDef { name: fname, ty, .. } = self.ast.kind(f).clone() {
                if fname == name {
                    self.resolve_type(ty)?;
                    return Ok(Some(ty));
                }
            }
        }
        self.fail(loc, CompileError::NoSuchField(name.to_string()))
    }

    fn analyze_call(
        &mut self,
        id: NodeId,
        callee: NodeId,
        args: Vec<NodeId>,
    ) -> AResult<Option<NodeId>> {
        let callee = self.decompose_to_simple(callee)?;
        let mut new_args = Vec::with_capacity(args.len());
        for arg in args {
            new_args.push(self.decompose_to_simple(arg)?);
        }
        if let NodeKind::Call {
            callee: c,
            args: a,
        } = &mut self.ast[id].kind
        {
            *c = callee;
            *a = new_args.clone();
        }
        let ct = self.analyze_expr(callee)?;
        for arg in new_args {
            self.analyze_expr(arg)?;
        }
        if let NodeKind::Ident { name, .. } = self.ast.kind(callee) {
            if name == "@dbg" || name == "@panic" {
                return Ok(Some(self.builtin_ty(BuiltinType::Void)));
            }
        }
        let Some(ct) = ct else { return Ok(None) };
        match self.ast.kind(ct).clone() {
            NodeKind::FnType { ret, .. } => Ok(Some(ret)),
            NodeKind::PointerType { pointee } => match self.ast.kind(pointee).clone() {
                NodeKind::FnType { ret, .. } => Ok(Some(ret)),
                _ => Ok(Some(ct)),
            },
            _ => Ok(Some(ct)),
        }
    }

    fn analyze_index(
        &mut self,
        id: NodeId,
        loc: crate::diagnostics::Loc,
        object: NodeId,
        index: NodeId,
    ) -> AResult<Option<NodeId>> {
        let object = self.decompose_to_simple(object)?;
        let index = self.decompose_to_simple(index)?;
        if let NodeKind::Index {
            object: o,
            index: i,
        } = &mut self.ast[id].kind
        {
            *o = object;
            *i = index;
        }
        let ot = self.analyze_expr(object)?;
        let it = self.analyze_expr(index)?;
        if let Some(it) = it {
            if !self.type_builtin(it).is_integer() {
                return self.fail(loc, CompileError::NonNumericIndex);
            }
        }
        let Some(ot) = ot else { return Ok(None) };
        match self.ast.kind(ot).clone() {
            NodeKind::ArrayType { elem, .. } | NodeKind::SliceType { elem } => Ok(Some(elem)),
            NodeKind::PointerType { pointee } => Ok(Some(pointee)),
            _ => self.fail(loc, CompileError::IndexNonArray),
        }
    }
}

/// Map a surface operator and a resolved built-in tag to the semantic
/// operation the runtime must perform. Plain arithmetic on signed integers
/// is checked; on anything else it collapses to the C operator.
pub(crate) fn select_builtin_op(op: BinOp, bt: BuiltinType) -> Option<BuiltinOp> {
    if !bt.is_integer() {
        return None;
    }
    let signed = bt.is_signed_int();
    match op {
        BinOp::SatAdd => Some(BuiltinOp::SatAdd),
        BinOp::SatSub => Some(BuiltinOp::SatSub),
        BinOp::SatMul => Some(BuiltinOp::SatMul),
        BinOp::SatDiv => Some(BuiltinOp::SatDiv),
        BinOp::WrapAdd => Some(BuiltinOp::WrapAdd),
        BinOp::WrapSub => Some(BuiltinOp::WrapSub),
        BinOp::WrapMul => Some(BuiltinOp::WrapMul),
        BinOp::WrapDiv => Some(BuiltinOp::WrapDiv),
        BinOp::Add if signed => Some(BuiltinOp::CheckedAdd),
        BinOp::Sub if signed => Some(BuiltinOp::CheckedSub),
        BinOp::Mul if signed => Some(BuiltinOp::CheckedMul),
        BinOp::Div if signed => Some(BuiltinOp::CheckedDiv),
        BinOp::Mod if signed => Some(BuiltinOp::CheckedMod),
        BinOp::Shl if signed => Some(BuiltinOp::CheckedShl),
        BinOp::Shr if signed => Some(BuiltinOp::CheckedShr),
        _ => None,
    }
}

/// Whether a cast needs the runtime range check. The destination must
/// represent every value of the source for the cast to stay bare.
pub(crate) fn cast_strategy(src: BuiltinType, dst: BuiltinType) -> CastStrategy {
    if !src.is_integer() || !dst.is_integer() {
        return CastStrategy::Bare;
    }
    if src == dst {
        return CastStrategy::Bare;
    }
    if BuiltinType::widens_to(src, dst) {
        return CastStrategy::Bare;
    }
    CastStrategy::Checked
}
