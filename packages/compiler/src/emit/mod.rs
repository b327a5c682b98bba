//! C emission.
//!
//! A structural translator: the normalized tree prints into two sinks, the
//! public interface and the implementation, with `#line` directives mapping
//! every statement back to its Tick source line. No semantic decisions are
//! made here; anything unresolved is an internal error.

pub mod names;
pub mod runtime;

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::diagnostics::Loc;
use crate::error::CompileError;
use crate::tree::{
    BinOp, NodeArena, NodeFlags, NodeId, NodeKind, Qualifiers, UnOp,
};
use crate::types::{BuiltinType, TypeTable};

use names::{sanitize_identifier, tmp_name, user_name};

lazy_static! {
    static ref BINARY_OPERATORS: HashMap<BinOp, &'static str> = {
        let mut m = HashMap::new();
        m.insert(BinOp::Add, "+");
        m.insert(BinOp::Sub, "-");
        m.insert(BinOp::Mul, "*");
        m.insert(BinOp::Div, "/");
        m.insert(BinOp::Mod, "%");
        // sat/wrap spellings collapse to the plain operator when no helper
        // was selected (non-integer operands)
        m.insert(BinOp::SatAdd, "+");
        m.insert(BinOp::SatSub, "-");
        m.insert(BinOp::SatMul, "*");
        m.insert(BinOp::SatDiv, "/");
        m.insert(BinOp::WrapAdd, "+");
        m.insert(BinOp::WrapSub, "-");
        m.insert(BinOp::WrapMul, "*");
        m.insert(BinOp::WrapDiv, "/");
        m.insert(BinOp::BitAnd, "&");
        m.insert(BinOp::BitOr, "|");
        m.insert(BinOp::BitXor, "^");
        m.insert(BinOp::Shl, "<<");
        m.insert(BinOp::Shr, ">>");
        m.insert(BinOp::Eq, "==");
        m.insert(BinOp::Ne, "!=");
        m.insert(BinOp::Lt, "<");
        m.insert(BinOp::Le, "<=");
        m.insert(BinOp::Gt, ">");
        m.insert(BinOp::Ge, ">=");
        m.insert(BinOp::And, "&&");
        m.insert(BinOp::Or, "||");
        m
    };
}

const INDENT: &str = "    ";

/// One output sink, tracking the last emitted `#line` so adjacent
/// directives for the same line are suppressed.
struct CWriter {
    out: String,
    last_line: Option<u32>,
}

impl CWriter {
    fn new() -> Self {
        CWriter {
            out: String::new(),
            last_line: None,
        }
    }

    fn raw(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn line(&mut self, loc: Loc, src: &str) {
        if loc.is_none() {
            return;
        }
        if self.last_line == Some(loc.line) {
            return;
        }
        self.out
            .push_str(&format!("#line {} \"{}\"\n", loc.line, src));
        self.last_line = Some(loc.line);
    }
}

type EResult<T> = Result<T, CompileError>;

struct CEmitter<'a> {
    ast: &'a NodeArena,
    types: &'a TypeTable,
    src_name: &'a str,
}

/// Emit a module into (interface, implementation) text.
pub fn emit_module(
    ast: &NodeArena,
    types: &TypeTable,
    module: NodeId,
    src_name: &str,
    header_name: &str,
) -> EResult<(String, String)> {
    let e = CEmitter {
        ast,
        types,
        src_name,
    };
    let mut header = CWriter::new();
    let mut body = CWriter::new();
    header.raw("#pragma once\n");
    header.raw(runtime::PRELUDE);
    header.raw("\n");
    body.raw(&format!("#include \"{}\"\n\n", header_name));
    let decls = match ast.kind(module) {
        NodeKind::Module { decls } => decls.clone(),
        _ => {
            return Err(CompileError::Internal(
                "emission expects a module node".into(),
            ))
        }
    };
    for decl in decls {
        e.emit_top_decl(decl, &mut header, &mut body)?;
    }
    Ok((header.out, body.out))
}

impl<'a> CEmitter<'a> {
    fn emit_top_decl(
        &self,
        decl: NodeId,
        header: &mut CWriter,
        body: &mut CWriter,
    ) -> EResult<()> {
        let d = match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.clone(),
            _ => {
                return Err(CompileError::Internal(
                    "module child is not a declaration".into(),
                ))
            }
        };
        let loc = self.ast.loc(decl);
        let is_pub = d.quals.contains(Qualifiers::PUB);
        if d.quals.contains(Qualifiers::FORWARD_DECL) {
            let w = if is_pub { header } else { body };
            w.line(loc, self.src_name);
            let n = user_name(&d.name);
            w.raw(&format!("typedef struct {} {};\n", n, n));
            return Ok(());
        }
        match d.init.map(|i| self.ast.kind(i)) {
            Some(NodeKind::StructDecl { .. }) => {
                let w = if is_pub { header } else { body };
                self.emit_struct(decl, d.init.unwrap(), w)
            }
            Some(NodeKind::UnionDecl { .. }) => {
                let w = if is_pub { header } else { body };
                self.emit_union(decl, d.init.unwrap(), w)
            }
            Some(NodeKind::EnumDecl { .. }) => {
                let w = if is_pub { header } else { body };
                self.emit_enum(decl, d.init.unwrap(), w)
            }
            Some(NodeKind::Function { .. }) => {
                self.emit_function(decl, d.init.unwrap(), header, body)
            }
            _ => self.emit_global_var(decl, header, body),
        }
    }

    // --- Types ---

    fn type_text(&self, ty: NodeId) -> EResult<String> {
        match self.ast.kind(ty) {
            NodeKind::NamedType { name, builtin, .. } => match builtin {
                BuiltinType::Unknown => {
                    Err(CompileError::Internal(format!("unresolved type `{}`", name)))
                }
                BuiltinType::UserDefined => Ok(user_name(name)),
                _ => Ok(builtin.c_name().to_string()),
            },
            NodeKind::PointerType { pointee } => match self.ast.kind(*pointee) {
                NodeKind::FnType { params, ret } => self.fn_ptr_text(params, *ret, None),
                NodeKind::ArrayType { elem, size } => {
                    let n = self.expect_literal(*size)?;
                    Ok(format!("{} (*)[{}]", self.type_text(*elem)?, n))
                }
                _ => Ok(format!("{}*", self.type_text(*pointee)?)),
            },
            // the [N] suffix attaches to declarator names, not types
            NodeKind::ArrayType { elem, .. } => self.type_text(*elem),
            NodeKind::FnType { params, ret } => self.fn_ptr_text(params, *ret, None),
            NodeKind::OptionalType { .. }
            | NodeKind::ErrorUnionType { .. }
            | NodeKind::SliceType { .. } => Err(CompileError::Internal(
                "optional, error-union and slice types must be lowered before emission".into(),
            )),
            _ => Err(CompileError::Internal(
                "expected a type node in emission".into(),
            )),
        }
    }

    fn fn_ptr_text(&self, params: &[NodeId], ret: NodeId, name: Option<&str>) -> EResult<String> {
        let ret_text = self.type_text(ret)?;
        let mut ps = Vec::with_capacity(params.len());
        for &p in params {
            ps.push(self.type_text(p)?);
        }
        let plist = if ps.is_empty() {
            "void".to_string()
        } else {
            ps.join(", ")
        };
        Ok(format!(
            "{} (*{})({})",
            ret_text,
            name.unwrap_or(""),
            plist
        ))
    }

    /// `<type> <name>` with C declarator quirks: array suffixes, function
    /// pointers, and pointers to arrays.
    fn declarator(&self, ty: NodeId, name: &str) -> EResult<String> {
        match self.ast.kind(ty) {
            NodeKind::ArrayType { .. } => {
                let mut dims = Vec::new();
                let mut cur = ty;
                while let NodeKind::ArrayType { elem, size } = self.ast.kind(cur) {
                    dims.push(self.expect_literal(*size)?);
                    cur = *elem;
                }
                let mut out = format!("{} {}", self.type_text(cur)?, name);
                for d in dims {
                    out.push_str(&format!("[{}]", d));
                }
                Ok(out)
            }
            NodeKind::FnType { params, ret } => self.fn_ptr_text(params, *ret, Some(name)),
            NodeKind::PointerType { pointee } => match self.ast.kind(*pointee) {
                NodeKind::FnType { params, ret } => self.fn_ptr_text(params, *ret, Some(name)),
                NodeKind::ArrayType { elem, size } => {
                    let n = self.expect_literal(*size)?;
                    Ok(format!("{} (*{})[{}]", self.type_text(*elem)?, name, n))
                }
                _ => Ok(format!("{} {}", self.type_text(ty)?, name)),
            },
            _ => Ok(format!("{} {}", self.type_text(ty)?, name)),
        }
    }

    /// Array sizes, enum values and alignments must be literals by now.
    fn expect_literal(&self, id: NodeId) -> EResult<i64> {
        match self.ast.kind(id) {
            NodeKind::IntLit { value } => Ok(*value),
            NodeKind::UintLit { value } => Ok(*value as i64),
            _ => Err(CompileError::NotConstant),
        }
    }

    // --- Expressions ---

    fn expr_text(&self, id: NodeId) -> EResult<String> {
        match self.ast.kind(id) {
            NodeKind::IntLit { value } => Ok(value.to_string()),
            NodeKind::UintLit { value } => Ok(format!("{}ull", value)),
            NodeKind::BoolLit { value } => Ok(if *value { "1" } else { "0" }.to_string()),
            NodeKind::StrLit { value } => {
                let mut bytes: Vec<String> = value.iter().map(|b| b.to_string()).collect();
                bytes.push("0".to_string());
                Ok(format!(
                    "(const char*)(uint8_t[]){{{}}}",
                    bytes.join(", ")
                ))
            }
            NodeKind::NullLit => Ok("NULL".to_string()),
            NodeKind::UndefinedLit => Ok("0".to_string()),
            NodeKind::Ident {
                name,
                needs_user_prefix,
                ..
            } => match name.as_str() {
                "@dbg" => Ok("tick_debug_log".to_string()),
                "@panic" => Ok("tick_panic".to_string()),
                _ if *needs_user_prefix => Ok(user_name(name)),
                _ => Ok(sanitize_identifier(name)),
            },
            NodeKind::Unary {
                op,
                operand,
                builtin,
            } => {
                let x = self.expr_text(*operand)?;
                if let Some(tag) = builtin {
                    let bt = self.expr_builtin(id);
                    return Ok(format!("{}({})", runtime::helper_name(*tag, bt), x));
                }
                Ok(match op {
                    UnOp::Neg => format!("-({})", x),
                    UnOp::Not => format!("!({})", x),
                    UnOp::BitNot => format!("~({})", x),
                    UnOp::AddrOf => format!("&({})", x),
                    UnOp::Deref => {
                        if matches!(self.ast.kind(*operand), NodeKind::Ident { .. }) {
                            format!("*{}", x)
                        } else {
                            format!("*({})", x)
                        }
                    }
                })
            }
            NodeKind::Binary {
                op,
                lhs,
                rhs,
                builtin,
            } => {
                let l = self.expr_text(*lhs)?;
                let r = self.expr_text(*rhs)?;
                if let Some(tag) = builtin {
                    let bt = self.expr_builtin(id);
                    return Ok(format!(
                        "{}({}, {})",
                        runtime::helper_name(*tag, bt),
                        l,
                        r
                    ));
                }
                let Some(spelling) = BINARY_OPERATORS.get(op) else {
                    return Err(CompileError::Internal(
                        "operator has no C spelling; lowering missed it".into(),
                    ));
                };
                Ok(format!("{} {} {}", l, spelling, r))
            }
            NodeKind::Call { callee, args } => {
                let c = self.expr_text(*callee)?;
                let mut xs = Vec::with_capacity(args.len());
                for &a in args {
                    xs.push(self.expr_text(a)?);
                }
                Ok(format!("{}({})", c, xs.join(", ")))
            }
            NodeKind::Index { object, index } => {
                let mut obj = self.expr_text(*object)?;
                // a deref object is parenthesized to preserve precedence
                if matches!(
                    self.ast.kind(*object),
                    NodeKind::Unary {
                        op: UnOp::Deref,
                        ..
                    }
                ) {
                    obj = format!("({})", obj);
                }
                Ok(format!("{}[{}]", obj, self.expr_text(*index)?))
            }
            NodeKind::Field {
                object,
                name,
                object_is_pointer,
            } => {
                let mut obj = self.expr_text(*object)?;
                // a deref object is parenthesized to preserve precedence
                if matches!(
                    self.ast.kind(*object),
                    NodeKind::Unary {
                        op: UnOp::Deref,
                        ..
                    }
                ) {
                    obj = format!("({})", obj);
                }
                let sep = if *object_is_pointer { "->" } else { "." };
                // union payloads live behind the synthesized data member
                let data = if self.object_is_union(*object, *object_is_pointer) {
                    "data."
                } else {
                    ""
                };
                Ok(format!("{}{}{}{}", obj, sep, data, name))
            }
            NodeKind::Cast {
                value,
                target,
                strategy,
                runtime_func,
            } => {
                let v = self.expr_text(*value)?;
                match strategy {
                    crate::tree::CastStrategy::Checked => {
                        let f = runtime_func.as_deref().ok_or_else(|| {
                            CompileError::Internal("checked cast without a runtime helper".into())
                        })?;
                        Ok(format!("{}({})", f, v))
                    }
                    crate::tree::CastStrategy::Bare => {
                        Ok(format!("({})({})", self.type_text(*target)?, v))
                    }
                }
            }
            NodeKind::StructInit { fields } => {
                let mut parts = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    parts.push(format!(".{} = {}", name, self.expr_text(*value)?));
                }
                Ok(format!("{{ {} }}", parts.join(", ")))
            }
            NodeKind::ArrayInit { elems } => {
                let mut parts = Vec::with_capacity(elems.len());
                for &e in elems {
                    parts.push(self.expr_text(e)?);
                }
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            NodeKind::EnumValueRef { name, parent } => {
                let parent_name = match self.ast.kind(*parent) {
                    NodeKind::Decl(d) => d.name.clone(),
                    _ => String::new(),
                };
                Ok(format!("{}_{}", user_name(&parent_name), name))
            }
            NodeKind::Unwrap { .. } => Err(CompileError::Internal(
                "optional unwrap must be lowered before emission".into(),
            )),
            _ => Err(CompileError::Internal(
                "expected an expression node in emission".into(),
            )),
        }
    }

    fn expr_builtin(&self, id: NodeId) -> BuiltinType {
        match self.ast[id].ty.map(|t| self.ast.kind(t)) {
            Some(NodeKind::NamedType { builtin, .. }) => *builtin,
            _ => BuiltinType::Unknown,
        }
    }

    fn object_is_union(&self, object: NodeId, object_is_pointer: bool) -> bool {
        let Some(mut t) = self.ast[object].ty else {
            return false;
        };
        if object_is_pointer {
            if let NodeKind::PointerType { pointee } = self.ast.kind(t) {
                t = *pointee;
            }
        }
        let NodeKind::NamedType {
            builtin: BuiltinType::UserDefined,
            entry: Some(slot),
            ..
        } = self.ast.kind(t)
        else {
            return false;
        };
        let Some(decl) = self.types.entry(*slot).decl else {
            return false;
        };
        match self.ast.kind(decl) {
            NodeKind::Decl(d) => matches!(
                d.init.map(|i| self.ast.kind(i)),
                Some(NodeKind::UnionDecl { .. })
            ),
            _ => false,
        }
    }

    // --- Statements ---

    fn emit_stmt(&self, w: &mut CWriter, id: NodeId, indent: usize) -> EResult<()> {
        let pad = INDENT.repeat(indent);
        w.line(self.ast.loc(id), self.src_name);
        match self.ast.kind(id) {
            NodeKind::Decl(d) => {
                let name = if self.ast[id].flags.contains(NodeFlags::TEMPORARY) {
                    tmp_name(d.tmp_id)
                } else {
                    user_name(&d.name)
                };
                let ty = d.ty.ok_or_else(|| {
                    CompileError::Internal(format!("declaration `{}` has no type", d.name))
                })?;
                let mut text = pad;
                if d.quals.contains(Qualifiers::STATIC) {
                    text.push_str("static ");
                }
                if d.quals.contains(Qualifiers::VOLATILE) {
                    text.push_str("volatile ");
                }
                text.push_str(&self.declarator(ty, &name)?);
                if let Some(init) = d.init {
                    text.push_str(" = ");
                    text.push_str(&self.expr_text(init)?);
                }
                text.push_str(";\n");
                w.raw(&text);
                Ok(())
            }
            NodeKind::Assign { lhs, rhs } => {
                w.raw(&format!(
                    "{}{} = {};\n",
                    pad,
                    self.expr_text(*lhs)?,
                    self.expr_text(*rhs)?
                ));
                Ok(())
            }
            NodeKind::ExprStmt { expr } => {
                w.raw(&format!("{}{};\n", pad, self.expr_text(*expr)?));
                Ok(())
            }
            NodeKind::Return { value } => {
                match value {
                    Some(v) => w.raw(&format!("{}return {};\n", pad, self.expr_text(*v)?)),
                    None => w.raw(&format!("{}return;\n", pad)),
                }
                Ok(())
            }
            NodeKind::Break => {
                w.raw(&format!("{}break;\n", pad));
                Ok(())
            }
            NodeKind::Continue => {
                w.raw(&format!("{}continue;\n", pad));
                Ok(())
            }
            NodeKind::Goto { label } => {
                w.raw(&format!("{}goto {};\n", pad, user_name(label)));
                Ok(())
            }
            NodeKind::Label { name } => {
                w.raw(&format!("{}{}:;\n", pad, user_name(name)));
                Ok(())
            }
            NodeKind::Block { .. } => {
                w.raw(&format!("{}{{\n", pad));
                self.emit_block_stmts(w, id, indent + 1)?;
                w.raw(&format!("{}}}\n", pad));
                Ok(())
            }
            NodeKind::If {
                cond,
                then_blk,
                else_blk,
            } => {
                let (cond, then_blk, else_blk) = (*cond, *then_blk, *else_blk);
                w.raw(&format!("{}if ({}) {{\n", pad, self.expr_text(cond)?));
                self.emit_block_stmts(w, then_blk, indent + 1)?;
                // analysis normalized the else branch, so both always emit
                let else_blk = else_blk.ok_or_else(|| {
                    CompileError::Internal("if statement missing normalized else".into())
                })?;
                w.raw(&format!("{}}} else {{\n", pad));
                self.emit_block_stmts(w, else_blk, indent + 1)?;
                w.raw(&format!("{}}}\n", pad));
                Ok(())
            }
            NodeKind::For {
                init,
                cond,
                step,
                body,
            } => {
                // all three forms collapse to an infinite loop with an
                // early-exit check
                w.raw(&format!("{}{{\n", pad));
                if let Some(init) = init {
                    self.emit_stmt(w, *init, indent + 1)?;
                }
                let p1 = INDENT.repeat(indent + 1);
                w.raw(&format!("{}while (1) {{\n", p1));
                if let Some(cond) = cond {
                    let p2 = INDENT.repeat(indent + 2);
                    w.raw(&format!("{}if (!({})) break;\n", p2, self.expr_text(*cond)?));
                }
                self.emit_block_stmts(w, *body, indent + 2)?;
                if let Some(step) = step {
                    self.emit_stmt(w, *step, indent + 2)?;
                }
                w.raw(&format!("{}}}\n", p1));
                w.raw(&format!("{}}}\n", pad));
                Ok(())
            }
            NodeKind::Switch { value, cases } => {
                w.raw(&format!(
                    "{}switch ({}) {{\n",
                    pad,
                    self.expr_text(*value)?
                ));
                let p1 = INDENT.repeat(indent + 1);
                for &case in cases {
                    let NodeKind::Case { values, block, .. } = self.ast.kind(case) else {
                        continue;
                    };
                    if values.is_empty() {
                        w.raw(&format!("{}default:\n", p1));
                    } else {
                        for &v in values {
                            w.raw(&format!("{}case {}:\n", p1, self.expr_text(v)?));
                        }
                    }
                    // braces give per-case declarations their own scope
                    let block = (*block).ok_or_else(|| {
                        CompileError::Internal("switch case missing normalized block".into())
                    })?;
                    w.raw(&format!("{}{{\n", p1));
                    self.emit_block_stmts(w, block, indent + 2)?;
                    w.raw(&format!("{}break;\n", INDENT.repeat(indent + 2)));
                    w.raw(&format!("{}}}\n", p1));
                }
                w.raw(&format!("{}}}\n", pad));
                Ok(())
            }
            _ => Err(CompileError::Internal(
                "unexpected node in statement position".into(),
            )),
        }
    }

    fn emit_block_stmts(&self, w: &mut CWriter, block: NodeId, indent: usize) -> EResult<()> {
        let stmts = match self.ast.kind(block) {
            NodeKind::Block { stmts } => stmts.clone(),
            _ => return Err(CompileError::Internal("expected a block node".into())),
        };
        for s in stmts {
            self.emit_stmt(w, s, indent)?;
        }
        Ok(())
    }

    // --- Top-level declarations ---

    fn emit_struct(&self, decl: NodeId, s: NodeId, w: &mut CWriter) -> EResult<()> {
        let NodeKind::StructDecl {
            fields,
            align,
            packed,
        } = self.ast.kind(s)
        else {
            return Ok(());
        };
        let name = user_name(&self.decl_name(decl));
        w.line(self.ast.loc(decl), self.src_name);
        let mut attrs = String::new();
        if *packed {
            attrs.push_str("TICK_PACKED ");
        }
        if let Some(align) = align {
            attrs.push_str(&format!("TICK_ALIGNED({}) ", self.expect_literal(*align)?));
        }
        w.raw(&format!("struct {}{} {{\n", attrs, name));
        self.emit_field_defs(w, fields, 1)?;
        w.raw("};\n\n");
        Ok(())
    }

    fn emit_field_defs(&self, w: &mut CWriter, fields: &[NodeId], indent: usize) -> EResult<()> {
        let pad = INDENT.repeat(indent);
        for &f in fields {
            let NodeKind::FieldDef { name, ty, align } = self.ast.kind(f) else {
                continue;
            };
            w.line(self.ast.loc(f), self.src_name);
            let mut text = pad.clone();
            if let Some(align) = align {
                text.push_str(&format!("_Alignas({}) ", self.expect_literal(*align)?));
            }
            text.push_str(&self.declarator(*ty, name)?);
            text.push_str(";\n");
            w.raw(&text);
        }
        Ok(())
    }

    fn emit_union(&self, decl: NodeId, u: NodeId, w: &mut CWriter) -> EResult<()> {
        let NodeKind::UnionDecl { fields, align, tag } = self.ast.kind(u) else {
            return Ok(());
        };
        let name = user_name(&self.decl_name(decl));
        let tag = (*tag).ok_or_else(|| {
            CompileError::Internal("union reached emission without a tag type".into())
        })?;
        let tag_text = self.type_text(tag)?;
        w.line(self.ast.loc(decl), self.src_name);
        let mut attrs = String::new();
        if let Some(align) = align {
            attrs.push_str(&format!("TICK_ALIGNED({}) ", self.expect_literal(*align)?));
        }
        w.raw(&format!("struct {}{} {{\n", attrs, name));
        w.raw(&format!("{}{} tag;\n", INDENT, tag_text));
        w.raw(&format!("{}union {{\n", INDENT));
        self.emit_field_defs(w, fields, 2)?;
        w.raw(&format!("{}}} data;\n", INDENT));
        w.raw("};\n\n");
        Ok(())
    }

    fn emit_enum(&self, decl: NodeId, e: NodeId, w: &mut CWriter) -> EResult<()> {
        let NodeKind::EnumDecl { underlying, values } = self.ast.kind(e) else {
            return Ok(());
        };
        let name = user_name(&self.decl_name(decl));
        let underlying = (*underlying).ok_or_else(|| {
            CompileError::Internal("enum reached emission without an underlying type".into())
        })?;
        w.line(self.ast.loc(decl), self.src_name);
        w.raw(&format!("typedef {} {};\n", self.type_text(underlying)?, name));
        for &v in values {
            let NodeKind::EnumMember {
                name: vname, value, ..
            } = self.ast.kind(v)
            else {
                continue;
            };
            let value = value.ok_or(CompileError::NotConstant)?;
            w.raw(&format!(
                "static const {} {}_{} = {};\n",
                name,
                name,
                vname,
                self.expect_literal(value)?
            ));
        }
        w.raw("\n");
        Ok(())
    }

    fn emit_function(
        &self,
        decl: NodeId,
        func: NodeId,
        header: &mut CWriter,
        body: &mut CWriter,
    ) -> EResult<()> {
        let NodeKind::Function { params, ret, body: fn_body } = self.ast.kind(func).clone()
        else {
            return Ok(());
        };
        let d = match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.clone(),
            _ => return Ok(()),
        };
        let is_pub = d.quals.contains(Qualifiers::PUB);
        let is_extern = d.quals.contains(Qualifiers::EXTERN) || fn_body.is_none();
        let name = if is_pub || is_extern {
            sanitize_identifier(&d.name)
        } else {
            user_name(&d.name)
        };
        let ret_text = self.type_text(ret)?;
        let mut proto_params = Vec::with_capacity(params.len());
        let mut def_params = Vec::with_capacity(params.len());
        for &p in &params {
            let NodeKind::Param { name: pname, ty } = self.ast.kind(p) else {
                continue;
            };
            proto_params.push(self.declarator(*ty, "")?.trim_end().to_string());
            def_params.push(self.declarator(*ty, &user_name(pname))?);
        }
        let proto = if proto_params.is_empty() {
            "void".to_string()
        } else {
            proto_params.join(", ")
        };
        let defs = if def_params.is_empty() {
            "void".to_string()
        } else {
            def_params.join(", ")
        };
        if is_extern {
            let w = if is_pub { header } else { body };
            w.line(self.ast.loc(decl), self.src_name);
            w.raw(&format!("extern {} {}({});\n", ret_text, name, proto));
            return Ok(());
        }
        if is_pub {
            header.line(self.ast.loc(decl), self.src_name);
            header.raw(&format!("{} {}({});\n", ret_text, name, proto));
        }
        body.line(self.ast.loc(decl), self.src_name);
        body.raw(&format!("{} {}({}) {{\n", ret_text, name, defs));
        self.emit_block_stmts(body, fn_body.unwrap(), 1)?;
        body.raw("}\n\n");
        Ok(())
    }

    fn emit_global_var(
        &self,
        decl: NodeId,
        header: &mut CWriter,
        body: &mut CWriter,
    ) -> EResult<()> {
        let d = match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.clone(),
            _ => return Ok(()),
        };
        let is_pub = d.quals.contains(Qualifiers::PUB);
        let is_extern = d.quals.contains(Qualifiers::EXTERN);
        let name = if is_pub || is_extern {
            sanitize_identifier(&d.name)
        } else {
            user_name(&d.name)
        };
        let ty = d.ty.ok_or_else(|| {
            CompileError::Internal(format!("declaration `{}` has no type", d.name))
        })?;
        let mut prefix = String::new();
        if d.quals.contains(Qualifiers::VOLATILE) {
            prefix.push_str("volatile ");
        }
        let declare = self.declarator(ty, &name)?;
        if is_extern {
            // declared elsewhere; no definition is emitted
            let w = if is_pub { header } else { body };
            w.line(self.ast.loc(decl), self.src_name);
            w.raw(&format!("extern {}{};\n", prefix, declare));
            return Ok(());
        }
        if is_pub {
            header.line(self.ast.loc(decl), self.src_name);
            header.raw(&format!("extern {}{};\n", prefix, declare));
        }
        body.line(self.ast.loc(decl), self.src_name);
        let mut text = String::new();
        if d.quals.contains(Qualifiers::STATIC) {
            text.push_str("static ");
        }
        text.push_str(&prefix);
        text.push_str(&declare);
        if let Some(init) = d.init {
            text.push_str(" = ");
            text.push_str(&self.expr_text(init)?);
        }
        text.push_str(";\n");
        body.raw(&text);
        Ok(())
    }

    fn decl_name(&self, decl: NodeId) -> String {
        match self.ast.kind(decl) {
            NodeKind::Decl(d) => d.name.clone(),
            _ => String::new(),
        }
    }
}
