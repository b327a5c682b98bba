//! Type resolution.

use crate::consteval;
use crate::error::CompileError;
use crate::tree::{AnalysisState, NodeId, NodeKind};
use crate::types::BuiltinType;

use super::{AResult, Analyzer};

impl<'a> Analyzer<'a> {
    /// Resolve a type node in place, registering dependencies on any
    /// user-defined declaration that is not yet completed.
    pub(crate) fn resolve_type(&mut self, ty: NodeId) -> AResult<()> {
        self.resolve_type_inner(ty, true)
    }

    /// Pointees resolve without dependency registration: a forward
    /// declaration is enough to emit a pointer.
    pub(crate) fn resolve_type_shallow(&mut self, ty: NodeId) -> AResult<()> {
        self.resolve_type_inner(ty, false)
    }

    fn resolve_type_inner(&mut self, ty: NodeId, register: bool) -> AResult<()> {
        let loc = self.ast.loc(ty);
        match self.ast.kind(ty).clone() {
            NodeKind::NamedType { name, .. } => {
                let Some((slot, entry)) = self.types.lookup(&name) else {
                    if let NodeKind::NamedType { builtin, .. } = &mut self.ast[ty].kind {
                        *builtin = BuiltinType::Unknown;
                    }
                    return self.fail(loc, CompileError::UnresolvedType(name));
                };
                let builtin = entry.builtin;
                let decl = entry.decl;
                if let NodeKind::NamedType {
                    builtin: b,
                    entry: e,
                    ..
                } = &mut self.ast[ty].kind
                {
                    *b = builtin;
                    *e = Some(slot);
                }
                if register && builtin == BuiltinType::UserDefined {
                    if let Some(decl) = decl {
                        if self.decl_state(decl) != AnalysisState::Completed {
                            self.add_dependency(decl);
                        }
                    }
                }
                Ok(())
            }
            NodeKind::PointerType { pointee } => self.resolve_type_inner(pointee, false),
            NodeKind::ArrayType { elem, size } => {
                if !consteval::reduce(self.ast, size) {
                    let sloc = self.ast.loc(size);
                    return self.fail(sloc, CompileError::NotConstant);
                }
                self.resolve_type_inner(elem, register)
            }
            NodeKind::FnType { params, ret } => {
                self.resolve_type_inner(ret, register)?;
                for p in params {
                    self.resolve_type_inner(p, register)?;
                }
                Ok(())
            }
            NodeKind::OptionalType { inner }
            | NodeKind::ErrorUnionType { inner }
            | NodeKind::SliceType { elem: inner } => self.resolve_type_inner(inner, register),
            _ => Ok(()),
        }
    }

    /// True once a type node carries enough information for a temporary of
    /// that type to be declared.
    pub(crate) fn type_is_resolved(&self, ty: NodeId) -> bool {
        match self.ast.kind(ty) {
            NodeKind::NamedType { builtin, .. } => *builtin != BuiltinType::Unknown,
            NodeKind::PointerType { pointee } => self.type_is_resolved(*pointee),
            NodeKind::ArrayType { elem, size } => {
                self.type_is_resolved(*elem)
                    && matches!(self.ast.kind(*size), NodeKind::IntLit { .. })
            }
            NodeKind::FnType { params, ret } => {
                self.type_is_resolved(*ret) && params.iter().all(|&p| self.type_is_resolved(p))
            }
            NodeKind::OptionalType { inner }
            | NodeKind::ErrorUnionType { inner }
            | NodeKind::SliceType { elem: inner } => self.type_is_resolved(*inner),
            _ => false,
        }
    }
}
