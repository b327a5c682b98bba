//! Module-level declaration analysis: functions, globals, and type
//! declarations, including enum value assignment and union tag synthesis.

use crate::consteval;
use crate::error::CompileError;
use crate::tree::{
    AnalysisState, DeclData, DeclStates, NodeFlags, NodeId, NodeKind, Qualifiers,
};
use crate::types::BuiltinType;

use super::{AResult, Analyzer};

impl<'a> Analyzer<'a> {
    pub(crate) fn analyze_module_decl(&mut self, decl: NodeId) -> AResult<()> {
        let init = match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.init,
            _ => return Ok(()),
        };
        match init.map(|i| self.ast.kind(i)) {
            Some(NodeKind::Function { .. }) => self.analyze_fn_decl(decl, init.unwrap()),
            Some(NodeKind::StructDecl { .. }) => self.analyze_struct_decl(decl, init.unwrap()),
            Some(NodeKind::EnumDecl { .. }) => self.analyze_enum_decl(decl, init.unwrap()),
            Some(NodeKind::UnionDecl { .. }) => self.analyze_union_decl(decl, init.unwrap()),
            _ => self.analyze_module_var_decl(decl),
        }
    }

    // --- Functions ---

    fn analyze_fn_decl(&mut self, decl: NodeId, func: NodeId) -> AResult<()> {
        let (params, ret, body) = match self.ast.kind(func).clone() {
            NodeKind::Function { params, ret, body } => (params, ret, body),
            _ => return Ok(()),
        };
        self.resolve_type(ret)?;
        let mut param_tys = Vec::with_capacity(params.len());
        for &p in &params {
            if let NodeKind::Param { ty, .. } = self.ast.kind(p).clone() {
                self.resolve_type(ty)?;
                param_tys.push(ty);
            }
        }
        let loc = self.ast.loc(func);
        let fn_ty = self.ast.alloc_synthetic(
            loc,
            NodeKind::FnType {
                params: param_tys,
                ret,
            },
        );
        let name = self.decl_name(decl);
        if let NodeKind::Decl(d) = &mut self.ast[decl].kind {
            d.ty = Some(fn_ty);
            d.states.signature = AnalysisState::Completed;
        }
        if let Some(sym) = self.scopes.lookup_local(self.module_scope, &name) {
            self.scopes.symbol_mut(sym).ty = Some(fn_ty);
        }
        let Some(body) = body else {
            if let NodeKind::Decl(d) = &mut self.ast[decl].kind {
                d.states.body = AnalysisState::Completed;
            }
            return Ok(());
        };
        // One function scope per declaration: temporary ids must survive
        // re-analysis without restarting.
        let fscope = match self.fn_scopes.get(&decl) {
            Some(&s) => s,
            None => {
                let s = self.scopes.push(Some(self.module_scope));
                self.fn_scopes.insert(decl, s);
                s
            }
        };
        let saved_scope = self.scope;
        let saved_fn_scope = self.fn_scope;
        self.scope = fscope;
        self.fn_scope = fscope;
        let result = (|| {
            for &p in &params {
                let (pname, pty) = match self.ast.kind(p).clone() {
                    NodeKind::Param { name, ty } => (name, ty),
                    _ => continue,
                };
                let ploc = self.ast.loc(p);
                let sym = match self.scopes.insert(fscope, &pname, p) {
                    Ok(sym) => sym,
                    Err(existing) => {
                        if self.scopes.symbol(existing).decl == p {
                            existing
                        } else {
                            return self.fail(ploc, CompileError::DuplicateDecl(pname));
                        }
                    }
                };
                self.scopes.symbol_mut(sym).ty = Some(pty);
            }
            self.analyze_block(body)
        })();
        self.scope = saved_scope;
        self.fn_scope = saved_fn_scope;
        result?;
        if let NodeKind::Decl(d) = &mut self.ast[decl].kind {
            d.states.body = AnalysisState::Completed;
        }
        Ok(())
    }

    // --- Globals ---

    fn analyze_module_var_decl(&mut self, decl: NodeId) -> AResult<()> {
        let loc = self.ast.loc(decl);
        let (name, quals, ty, init) = match self.ast.kind(decl) {
            NodeKind::Decl(d) => (d.name.clone(), d.quals, d.ty, d.init),
            _ => return Ok(()),
        };
        if let Some(ty) = ty {
            self.resolve_type(ty)?;
            if matches!(self.ast.kind(ty), NodeKind::FnType { .. }) {
                return self.fail(loc, CompileError::BareFnType);
            }
        }
        match init.map(|i| (i, self.ast.kind(i).clone())) {
            None => {
                if !quals.contains(Qualifiers::EXTERN) {
                    return self.fail(loc, CompileError::MissingInitializer(name));
                }
            }
            Some((_, NodeKind::StrLit { .. })) if quals.contains(Qualifiers::STATIC) => {
                self.rewrite_static_string(decl);
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
            Some((i, NodeKind::StructInit { .. })) | Some((i, NodeKind::ArrayInit { .. })) => {
                // module-level aggregates stay whole; their values must be
                // constants
                self.analyze_expr(i)?;
                if let Some(ty) = ty {
                    self.ast[i].ty = Some(ty);
                } else {
                    return self.fail(loc, CompileError::CannotInfer(name));
                }
            }
            Some((i, _)) => {
                let it = self.analyze_expr(i)?;
                if !self.pending_deps.is_empty() && it.is_none() {
                    return Ok(()); // retried after dependencies resolve
                }
                if ty.is_none() {
                    if it.is_none() {
                        return self.fail(loc, CompileError::CannotInfer(name));
                    }
                    if let NodeKind::Decl(d) = &mut self.ast[decl].kind {
                        d.ty = it;
                    }
                }
                if !consteval::reduce(self.ast, i)
                    && !matches!(
                        self.ast.kind(i),
                        NodeKind::StrLit { .. } | NodeKind::NullLit
                    )
                    && !self.is_fn_address(i)
                {
                    let iloc = self.ast.loc(i);
                    return self.fail(iloc, CompileError::NonConstModuleInit);
                }
            }
        }
        let final_ty = match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.ty,
            _ => None,
        };
        if let Some(sym) = self.scopes.lookup_local(self.module_scope, &name) {
            self.scopes.symbol_mut(sym).ty = final_ty;
        }
        Ok(())
    }

    /// Function names are address constants; they may initialize
    /// module-level function pointers.
    fn is_fn_address(&self, expr: NodeId) -> bool {
        let NodeKind::Ident {
            symbol: Some(sym), ..
        } = self.ast.kind(expr)
        else {
            return false;
        };
        let decl = self.scopes.symbol(*sym).decl;
        match self.ast.kind(decl) {
            NodeKind::Decl(d) => matches!(
                d.init.map(|i| self.ast.kind(i)),
                Some(NodeKind::Function { .. })
            ),
            _ => false,
        }
    }

    // --- Structs ---

    fn analyze_struct_decl(&mut self, decl: NodeId, s: NodeId) -> AResult<()> {
        let (fields, align) = match self.ast.kind(s).clone() {
            NodeKind::StructDecl { fields, align, .. } => (fields, align),
            _ => return Ok(()),
        };
        if let Some(align) = align {
            self.reduce_to_literal(align)?;
        }
        self.analyze_field_defs(&fields)?;
        self.collect_forward_decl(decl);
        Ok(())
    }

    fn analyze_field_defs(&mut self, fields: &[NodeId]) -> AResult<()> {
        for &f in fields {
            if let NodeKind::FieldDef { ty, align, .. } = self.ast.kind(f).clone() {
                self.resolve_type(ty)?;
                if let Some(align) = align {
                    self.reduce_to_literal(align)?;
                }
            }
        }
        Ok(())
    }

    fn reduce_to_literal(&mut self, expr: NodeId) -> AResult<()> {
        if consteval::reduce(self.ast, expr) {
            Ok(())
        } else {
            let loc = self.ast.loc(expr);
            self.fail(loc, CompileError::NotConstant)
        }
    }

    // --- Enums ---

    fn analyze_enum_decl(&mut self, decl: NodeId, e: NodeId) -> AResult<()> {
        let (underlying, values) = match self.ast.kind(e).clone() {
            NodeKind::EnumDecl { underlying, values } => (underlying, values),
            _ => return Ok(()),
        };
        let underlying = match underlying {
            Some(u) => u,
            None => {
                let loc = self.ast.loc(e);
                let u = self.ast.alloc_synthetic(
                    loc,
                    NodeKind::NamedType {
                        name: "i32".into(),
                        builtin: BuiltinType::Unknown,
                        entry: None,
                    },
                );
                if let NodeKind::EnumDecl { underlying: un, .. } = &mut self.ast[e].kind {
                    *un = Some(u);
                }
                u
            }
        };
        self.resolve_type(underlying)?;
        // first sub-pass: explicit values become literals
        for &v in &values {
            if let NodeKind::EnumMember {
                value: Some(expr), ..
            } = self.ast.kind(v).clone()
            {
                self.reduce_to_literal(expr)?;
            }
        }
        // second sub-pass: auto-increment from the last assigned value
        let mut counter: i64 = 0;
        for &v in &values {
            let (explicit, loc) = match self.ast.kind(v) {
                NodeKind::EnumMember { value, .. } => (*value, self.ast.loc(v)),
                _ => continue,
            };
            let assigned = match explicit {
                Some(expr) => match self.ast.kind(expr) {
                    NodeKind::IntLit { value } => *value,
                    _ => counter,
                },
                None => {
                    let lit = self
                        .ast
                        .alloc_synthetic(loc, NodeKind::IntLit { value: counter });
                    if let NodeKind::EnumMember { value, .. } = &mut self.ast[v].kind {
                        *value = Some(lit);
                    }
                    counter
                }
            };
            counter = assigned + 1;
            if let NodeKind::EnumMember { parent, .. } = &mut self.ast[v].kind {
                *parent = Some(decl);
            }
        }
        Ok(())
    }

    // --- Unions ---

    fn analyze_union_decl(&mut self, decl: NodeId, u: NodeId) -> AResult<()> {
        let loc = self.ast.loc(u);
        let (fields, align, tag) = match self.ast.kind(u).clone() {
            NodeKind::UnionDecl { fields, align, tag } => (fields, align, tag),
            _ => return Ok(()),
        };
        match tag {
            None => self.synthesize_union_tag(decl, u, &fields)?,
            Some(tag) => self.validate_union_tag(loc, tag, &fields)?,
        }
        if let Some(align) = align {
            self.reduce_to_literal(align)?;
        }
        self.analyze_field_defs(&fields)?;
        self.collect_forward_decl(decl);
        Ok(())
    }

    /// Auto-tagging: synthesize `<Union>_Tag` with one `<field>_tag` value
    /// per union field and the narrowest unsigned underlying type, insert it
    /// immediately before the union in module order, and point the union's
    /// tag reference at it.
    fn synthesize_union_tag(
        &mut self,
        decl: NodeId,
        u: NodeId,
        fields: &[NodeId],
    ) -> AResult<()> {
        let loc = self.ast.loc(u);
        let union_name = self.decl_name(decl);
        let is_pub = match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.quals.contains(Qualifiers::PUB),
            _ => false,
        };
        let bt = if fields.len() <= u8::MAX as usize {
            BuiltinType::U8
        } else if fields.len() <= u16::MAX as usize {
            BuiltinType::U16
        } else {
            BuiltinType::U32
        };
        let tag_name = format!("{}_Tag", union_name);
        let mut members = Vec::with_capacity(fields.len());
        for (i, &f) in fields.iter().enumerate() {
            let fname = match self.ast.kind(f) {
                NodeKind::FieldDef { name, .. } => name.clone(),
                _ => continue,
            };
            let lit = self
                .ast
                .alloc_synthetic(loc, NodeKind::IntLit { value: i as i64 });
            members.push(self.ast.alloc_synthetic(
                loc,
                NodeKind::EnumMember {
                    name: format!("{}_tag", fname),
                    value: Some(lit),
                    parent: None,
                },
            ));
        }
        let underlying = self.ast.alloc_synthetic(
            loc,
            NodeKind::NamedType {
                name: bt.tick_name().into(),
                builtin: BuiltinType::Unknown,
                entry: None,
            },
        );
        let enum_node = self.ast.alloc_synthetic(
            loc,
            NodeKind::EnumDecl {
                underlying: Some(underlying),
                values: members,
            },
        );
        let quals = if is_pub {
            Qualifiers::PUB
        } else {
            Qualifiers::empty()
        };
        let enum_decl = self.ast.alloc_synthetic(
            loc,
            NodeKind::Decl(DeclData {
                name: tag_name.clone(),
                quals,
                tmp_id: 0,
                ty: None,
                init: Some(enum_node),
                states: DeclStates {
                    overall: AnalysisState::Completed,
                    signature: AnalysisState::Completed,
                    body: AnalysisState::Completed,
                },
            }),
        );
        self.ast[enum_decl].flags |= NodeFlags::ANALYZED;
        let slot = match self.types.insert_user(&tag_name, enum_decl, is_pub) {
            Ok(slot) => slot,
            Err(_) => {
                return self.fail(loc, CompileError::DuplicateType(tag_name));
            }
        };
        if self.scopes.insert(self.module_scope, &tag_name, enum_decl).is_err() {
            return self.fail(loc, CompileError::DuplicateDecl(tag_name));
        }
        // module order: the tag enum sits immediately before its union
        let pos = self
            .module_decl_list()
            .iter()
            .position(|&d| d == decl)
            .unwrap_or(0);
        if let NodeKind::Module { decls } = &mut self.ast[self.module].kind {
            decls.insert(pos, enum_decl);
        }
        self.module_decls.insert(enum_decl);
        self.analyze_enum_decl(enum_decl, enum_node)?;
        let tag_ty = self.ast.alloc_synthetic(
            loc,
            NodeKind::NamedType {
                name: tag_name,
                builtin: BuiltinType::UserDefined,
                entry: Some(slot),
            },
        );
        if let NodeKind::UnionDecl { tag, .. } = &mut self.ast[u].kind {
            *tag = Some(tag_ty);
        }
        Ok(())
    }

    /// Explicit tags must name a user-defined enum with one value per union
    /// field. Synthesized tags are recognized by their name suffix and are
    /// not re-validated.
    fn validate_union_tag(
        &mut self,
        loc: crate::diagnostics::Loc,
        tag: NodeId,
        fields: &[NodeId],
    ) -> AResult<()> {
        self.resolve_type_shallow(tag)?;
        let tag_name = match self.ast.kind(tag) {
            NodeKind::NamedType { name, .. } => name.clone(),
            _ => return self.fail(loc, CompileError::UnionTagNotEnum),
        };
        if tag_name.ends_with("_Tag") {
            return Ok(());
        }
        let Some((_, entry)) = self.types.lookup(&tag_name) else {
            return self.fail(loc, CompileError::UnionTagNotEnum);
        };
        if entry.builtin != BuiltinType::UserDefined {
            return self.fail(loc, CompileError::UnionTagNotEnum);
        }
        let Some(tag_decl) = entry.decl else {
            return self.fail(loc, CompileError::UnionTagNotEnum);
        };
        let enum_values = match self.ast.kind(tag_decl) {
            NodeKind::Decl(d) => match d.init.map(|i| self.ast.kind(i).clone()) {
                Some(NodeKind::EnumDecl { values, .. }) => values,
                _ => return self.fail(loc, CompileError::UnionTagNotEnum),
            },
            _ => return self.fail(loc, CompileError::UnionTagNotEnum),
        };
        for &f in fields {
            let fname = match self.ast.kind(f) {
                NodeKind::FieldDef { name, .. } => name.clone(),
                _ => continue,
            };
            let found = enum_values.iter().any(|&v| {
                matches!(self.ast.kind(v), NodeKind::EnumMember { name, .. } if *name == fname)
            });
            if !found {
                return self.fail(
                    loc,
                    CompileError::UnionTagMissingValue(tag_name, fname),
                );
            }
        }
        if self.decl_state(tag_decl) != AnalysisState::Completed {
            self.add_dependency(tag_decl);
        }
        Ok(())
    }

    // --- Forward declarations ---

    /// Collect one synthetic forward stub per struct/union declaration; the
    /// driver prepends them to the module once the queue drains.
    fn collect_forward_decl(&mut self, decl: NodeId) {
        if self.forward_targets.contains(&decl) {
            return;
        }
        let loc = self.ast.loc(decl);
        let (name, quals) = match self.ast.kind(decl) {
            NodeKind::Decl(d) => (d.name.clone(), d.quals),
            _ => return,
        };
        let stub = self.ast.alloc_synthetic(
            loc,
            NodeKind::Decl(DeclData {
                name,
                quals: (quals & Qualifiers::PUB) | Qualifiers::FORWARD_DECL,
                tmp_id: 0,
                ty: None,
                init: None,
                states: DeclStates {
                    overall: AnalysisState::Completed,
                    signature: AnalysisState::Completed,
                    body: AnalysisState::Completed,
                },
            }),
        );
        self.forward_targets.insert(decl);
        self.forward_decls.push((stub, decl));
    }
}
