//! Tick parser: token stream to raw tree.
//!
//! Recursive descent with precedence climbing for expressions. The parser
//! builds unanalyzed nodes only; every semantic decision is deferred to the
//! analyzer. Declaration lists, parameter lists, field lists and enum value
//! lists all come out in source order.

use crate::diagnostics::{Diagnostics, Loc};
use crate::syntax::lexer::{Token, TokenKind};
use crate::tree::{
    BinOp, DeclData, DeclStates, NodeArena, NodeId, NodeKind, Qualifiers, UnOp,
};

type PResult<T> = Result<T, ()>;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    ast: &'a mut NodeArena,
    diags: &'a mut Diagnostics,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, ast: &'a mut NodeArena, diags: &'a mut Diagnostics) -> Self {
        Parser {
            tokens,
            pos: 0,
            ast,
            diags,
        }
    }

    /// Parse a whole module. Always returns a module node; check the
    /// diagnostics buffer for errors before using it.
    pub fn parse_module(mut self) -> NodeId {
        let loc = self.loc();
        let mut decls = Vec::new();
        while !self.cur().is_eof() {
            match self.parse_decl() {
                Ok(d) => decls.push(d),
                Err(()) => self.sync_decl(),
            }
        }
        self.ast.alloc(loc, NodeKind::Module { decls })
    }

    // --- Cursor helpers ---

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self, off: usize) -> &Token {
        &self.tokens[(self.pos + off).min(self.tokens.len() - 1)]
    }

    fn loc(&self) -> Loc {
        Loc::new(self.cur().line, self.cur().col)
    }

    fn advance(&mut self) -> Token {
        let t = self.cur().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn at_op(&self, op: &str) -> bool {
        self.cur().is_operator(op)
    }

    fn at_kw(&self, kw: &str) -> bool {
        self.cur().is_keyword(kw)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.at_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn describe(tok: &Token) -> String {
        match tok.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Int => "integer literal".to_string(),
            TokenKind::Str => "string literal".to_string(),
            TokenKind::Error => tok.text.clone(),
            _ => format!("`{}`", tok.text),
        }
    }

    fn error<T>(&mut self, msg: impl Into<String>) -> PResult<T> {
        let loc = self.loc();
        self.diags.error(loc, msg);
        Err(())
    }

    fn expect_op(&mut self, op: &str) -> PResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            let found = Self::describe(self.cur());
            self.error(format!("expected `{}`, found {}", op, found))
        }
    }

    fn expect_kw(&mut self, kw: &str) -> PResult<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            let found = Self::describe(self.cur());
            self.error(format!("expected `{}`, found {}", kw, found))
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        if self.cur().is_ident() {
            Ok(self.advance().text)
        } else {
            let found = Self::describe(self.cur());
            self.error(format!("expected identifier, found {}", found))
        }
    }

    /// Skip to the next likely declaration boundary.
    fn sync_decl(&mut self) {
        let mut depth = 0usize;
        loop {
            let t = self.cur();
            if t.is_eof() {
                return;
            }
            if t.is_operator("{") {
                depth += 1;
            } else if t.is_operator("}") {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        // trailing `;` after a type declaration body
                        self.eat_op(";");
                        return;
                    }
                }
            } else if t.is_operator(";") && depth == 0 {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    // --- Declarations ---

    fn parse_quals(&mut self) -> Qualifiers {
        let mut quals = Qualifiers::empty();
        loop {
            if self.eat_kw("pub") {
                quals |= Qualifiers::PUB;
            } else if self.eat_kw("extern") {
                quals |= Qualifiers::EXTERN;
            } else if self.eat_kw("static") {
                quals |= Qualifiers::STATIC;
            } else if self.eat_kw("volatile") {
                quals |= Qualifiers::VOLATILE;
            } else {
                return quals;
            }
        }
    }

    fn parse_decl(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        let quals = self.parse_quals();
        if self.at_kw("fn") {
            return self.parse_fn_decl(loc, quals);
        }
        let quals = if self.eat_kw("var") {
            quals | Qualifiers::VAR
        } else {
            self.expect_kw("let")?;
            quals
        };
        let name = self.expect_ident()?;
        let ty = if self.eat_op(":") {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.eat_op("=") {
            Some(self.parse_init()?)
        } else {
            None
        };
        self.expect_op(";")?;
        Ok(self.ast.alloc(
            loc,
            NodeKind::Decl(DeclData {
                name,
                quals,
                tmp_id: 0,
                ty,
                init,
                states: DeclStates::not_started(),
            }),
        ))
    }

    fn parse_fn_decl(&mut self, loc: Loc, quals: Qualifiers) -> PResult<NodeId> {
        self.expect_kw("fn")?;
        let name = self.expect_ident()?;
        self.expect_op("(")?;
        let mut params = Vec::new();
        while !self.at_op(")") {
            let ploc = self.loc();
            let pname = self.expect_ident()?;
            self.expect_op(":")?;
            let pty = self.parse_type()?;
            params.push(
                self.ast
                    .alloc(ploc, NodeKind::Param { name: pname, ty: pty }),
            );
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        let ret = self.parse_type()?;
        let body = if self.eat_op(";") {
            None
        } else {
            Some(self.parse_block()?)
        };
        let func = self.ast.alloc(loc, NodeKind::Function { params, ret, body });
        Ok(self.ast.alloc(
            loc,
            NodeKind::Decl(DeclData {
                name,
                quals,
                tmp_id: 0,
                ty: None,
                init: Some(func),
                states: DeclStates::not_started(),
            }),
        ))
    }

    fn parse_init(&mut self) -> PResult<NodeId> {
        if self.at_kw("struct") {
            self.parse_struct_decl()
        } else if self.at_kw("union") {
            self.parse_union_decl()
        } else if self.at_kw("enum") {
            self.parse_enum_decl()
        } else {
            self.parse_expr()
        }
    }

    fn parse_attrs(&mut self) -> PResult<(Option<NodeId>, bool)> {
        let mut align = None;
        let mut packed = false;
        loop {
            if self.eat_kw("align") {
                self.expect_op("(")?;
                align = Some(self.parse_expr()?);
                self.expect_op(")")?;
            } else if self.eat_kw("packed") {
                packed = true;
            } else {
                return Ok((align, packed));
            }
        }
    }

    fn parse_fields(&mut self) -> PResult<Vec<NodeId>> {
        self.expect_op("{")?;
        let mut fields = Vec::new();
        while !self.at_op("}") {
            let floc = self.loc();
            let name = self.expect_ident()?;
            self.expect_op(":")?;
            let ty = self.parse_type()?;
            let align = if self.eat_kw("align") {
                self.expect_op("(")?;
                let a = self.parse_expr()?;
                self.expect_op(")")?;
                Some(a)
            } else {
                None
            };
            fields.push(self.ast.alloc(floc, NodeKind::FieldDef { name, ty, align }));
            if !self.eat_op(",") && !self.at_op("}") {
                let found = Self::describe(self.cur());
                return self.error(format!("expected `,` or `}}`, found {}", found));
            }
        }
        self.expect_op("}")?;
        Ok(fields)
    }

    fn parse_struct_decl(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        self.expect_kw("struct")?;
        let (align, packed) = self.parse_attrs()?;
        let fields = self.parse_fields()?;
        Ok(self.ast.alloc(
            loc,
            NodeKind::StructDecl {
                fields,
                align,
                packed,
            },
        ))
    }

    fn parse_union_decl(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        self.expect_kw("union")?;
        let tag = if self.eat_op("(") {
            let tloc = self.loc();
            let name = self.expect_ident()?;
            self.expect_op(")")?;
            Some(self.ast.alloc(
                tloc,
                NodeKind::NamedType {
                    name,
                    builtin: crate::types::BuiltinType::Unknown,
                    entry: None,
                },
            ))
        } else {
            None
        };
        let (align, _) = self.parse_attrs()?;
        let fields = self.parse_fields()?;
        Ok(self
            .ast
            .alloc(loc, NodeKind::UnionDecl { fields, align, tag }))
    }

    fn parse_enum_decl(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        self.expect_kw("enum")?;
        let underlying = if self.eat_op("(") {
            let t = self.parse_type()?;
            self.expect_op(")")?;
            Some(t)
        } else {
            None
        };
        self.expect_op("{")?;
        let mut values = Vec::new();
        while !self.at_op("}") {
            let vloc = self.loc();
            let name = self.expect_ident()?;
            let value = if self.eat_op("=") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            values.push(self.ast.alloc(
                vloc,
                NodeKind::EnumMember {
                    name,
                    value,
                    parent: None,
                },
            ));
            if !self.eat_op(",") && !self.at_op("}") {
                let found = Self::describe(self.cur());
                return self.error(format!("expected `,` or `}}`, found {}", found));
            }
        }
        self.expect_op("}")?;
        Ok(self
            .ast
            .alloc(loc, NodeKind::EnumDecl { underlying, values }))
    }

    // --- Types ---

    fn parse_type(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        if self.eat_op("*") {
            let pointee = self.parse_type()?;
            return Ok(self.ast.alloc(loc, NodeKind::PointerType { pointee }));
        }
        if self.eat_op("?") {
            let inner = self.parse_type()?;
            return Ok(self.ast.alloc(loc, NodeKind::OptionalType { inner }));
        }
        if self.eat_op("!") {
            let inner = self.parse_type()?;
            return Ok(self.ast.alloc(loc, NodeKind::ErrorUnionType { inner }));
        }
        if self.at_op("[") && self.peek(1).is_operator("]") {
            self.advance();
            self.advance();
            let elem = self.parse_type()?;
            return Ok(self.ast.alloc(loc, NodeKind::SliceType { elem }));
        }
        if self.eat_kw("fn") {
            self.expect_op("(")?;
            let mut params = Vec::new();
            while !self.at_op(")") {
                params.push(self.parse_type()?);
                if !self.eat_op(",") {
                    break;
                }
            }
            self.expect_op(")")?;
            let ret = self.parse_type()?;
            return Ok(self.ast.alloc(loc, NodeKind::FnType { params, ret }));
        }
        let name = self.expect_ident()?;
        let mut ty = self.ast.alloc(
            loc,
            NodeKind::NamedType {
                name,
                builtin: crate::types::BuiltinType::Unknown,
                entry: None,
            },
        );
        while self.at_op("[") {
            self.advance();
            let size = self.parse_expr()?;
            self.expect_op("]")?;
            ty = self.ast.alloc(loc, NodeKind::ArrayType { elem: ty, size });
        }
        Ok(ty)
    }

    // --- Statements ---

    fn parse_block(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        self.expect_op("{")?;
        let mut stmts = Vec::new();
        while !self.at_op("}") {
            if self.cur().is_eof() {
                return self.error("unexpected end of file in block");
            }
            stmts.push(self.parse_stmt()?);
        }
        self.expect_op("}")?;
        Ok(self.ast.alloc(loc, NodeKind::Block { stmts }))
    }

    fn parse_stmt(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        if self.at_op("{") {
            return self.parse_block();
        }
        if self.at_kw("let")
            || self.at_kw("var")
            || self.at_kw("fn")
            || self.at_kw("pub")
            || self.at_kw("extern")
            || self.at_kw("static")
            || self.at_kw("volatile")
        {
            return self.parse_decl();
        }
        if self.eat_kw("return") {
            let value = if self.at_op(";") {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.expect_op(";")?;
            return Ok(self.ast.alloc(loc, NodeKind::Return { value }));
        }
        if self.eat_kw("break") {
            self.expect_op(";")?;
            return Ok(self.ast.alloc(loc, NodeKind::Break));
        }
        if self.eat_kw("continue") {
            self.expect_op(";")?;
            return Ok(self.ast.alloc(loc, NodeKind::Continue));
        }
        if self.eat_kw("goto") {
            let label = self.expect_ident()?;
            self.expect_op(";")?;
            return Ok(self.ast.alloc(loc, NodeKind::Goto { label }));
        }
        if self.at_kw("if") {
            return self.parse_if();
        }
        if self.at_kw("for") {
            return self.parse_for();
        }
        if self.at_kw("switch") {
            return self.parse_switch();
        }
        if self.cur().is_ident() && self.peek(1).is_operator(":") {
            let name = self.advance().text;
            self.advance(); // ':'
            return Ok(self.ast.alloc(loc, NodeKind::Label { name }));
        }
        let expr = self.parse_expr()?;
        if self.eat_op("=") {
            let rhs = self.parse_expr()?;
            self.expect_op(";")?;
            return Ok(self.ast.alloc(loc, NodeKind::Assign { lhs: expr, rhs }));
        }
        self.expect_op(";")?;
        Ok(self.ast.alloc(loc, NodeKind::ExprStmt { expr }))
    }

    fn parse_if(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        self.expect_kw("if")?;
        let cond = self.parse_expr()?;
        let then_blk = self.parse_block()?;
        let else_blk = if self.eat_kw("else") {
            if self.at_kw("if") {
                Some(self.parse_if()?)
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(self.ast.alloc(
            loc,
            NodeKind::If {
                cond,
                then_blk,
                else_blk,
            },
        ))
    }

    /// One of the three for-forms: `for {}`, `for cond {}`,
    /// `for init; cond; step {}`.
    fn parse_for(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        self.expect_kw("for")?;
        if self.at_op("{") {
            let body = self.parse_block()?;
            return Ok(self.ast.alloc(
                loc,
                NodeKind::For {
                    init: None,
                    cond: None,
                    step: None,
                    body,
                },
            ));
        }
        if self.at_kw("let") || self.at_kw("var") {
            let init = self.parse_decl()?; // consumes `;`
            return self.parse_for_tail(loc, Some(init));
        }
        let e = self.parse_expr()?;
        if self.at_op("{") {
            let body = self.parse_block()?;
            return Ok(self.ast.alloc(
                loc,
                NodeKind::For {
                    init: None,
                    cond: Some(e),
                    step: None,
                    body,
                },
            ));
        }
        let eloc = self.ast.loc(e);
        let init = if self.eat_op("=") {
            let rhs = self.parse_expr()?;
            self.ast.alloc(eloc, NodeKind::Assign { lhs: e, rhs })
        } else {
            self.ast.alloc(eloc, NodeKind::ExprStmt { expr: e })
        };
        self.expect_op(";")?;
        self.parse_for_tail(loc, Some(init))
    }

    fn parse_for_tail(&mut self, loc: Loc, init: Option<NodeId>) -> PResult<NodeId> {
        let cond = Some(self.parse_expr()?);
        self.expect_op(";")?;
        let step = Some(self.parse_small_stmt()?);
        let body = self.parse_block()?;
        Ok(self.ast.alloc(
            loc,
            NodeKind::For {
                init,
                cond,
                step,
                body,
            },
        ))
    }

    /// Assignment or expression without the trailing `;`; the for-step slot.
    fn parse_small_stmt(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        let expr = self.parse_expr()?;
        if self.eat_op("=") {
            let rhs = self.parse_expr()?;
            return Ok(self.ast.alloc(loc, NodeKind::Assign { lhs: expr, rhs }));
        }
        Ok(self.ast.alloc(loc, NodeKind::ExprStmt { expr }))
    }

    fn parse_switch(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        self.expect_kw("switch")?;
        let value = self.parse_expr()?;
        self.expect_op("{")?;
        let mut cases = Vec::new();
        while !self.at_op("}") {
            let cloc = self.loc();
            let values = if self.eat_kw("case") {
                let mut vs = vec![self.parse_expr()?];
                while self.eat_op(",") {
                    vs.push(self.parse_expr()?);
                }
                vs
            } else {
                self.expect_kw("default")?;
                Vec::new()
            };
            self.expect_op(":")?;
            let mut stmts = Vec::new();
            while !self.at_kw("case") && !self.at_kw("default") && !self.at_op("}") {
                if self.cur().is_eof() {
                    return self.error("unexpected end of file in switch");
                }
                stmts.push(self.parse_stmt()?);
            }
            cases.push(self.ast.alloc(
                cloc,
                NodeKind::Case {
                    values,
                    stmts,
                    block: None,
                },
            ));
        }
        self.expect_op("}")?;
        Ok(self.ast.alloc(loc, NodeKind::Switch { value, cases }))
    }

    // --- Expressions ---

    fn parse_expr(&mut self) -> PResult<NodeId> {
        self.parse_orelse()
    }

    fn parse_orelse(&mut self) -> PResult<NodeId> {
        let mut lhs = self.parse_or()?;
        while self.at_kw("orelse") {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_or()?;
            lhs = self.binary(loc, BinOp::Orelse, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> PResult<NodeId> {
        let mut lhs = self.parse_and()?;
        while self.at_kw("or") {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_and()?;
            lhs = self.binary(loc, BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<NodeId> {
        let mut lhs = self.parse_cmp()?;
        while self.at_kw("and") {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_cmp()?;
            lhs = self.binary(loc, BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> PResult<NodeId> {
        let mut lhs = self.parse_bitor()?;
        loop {
            let op = if self.at_op("==") {
                BinOp::Eq
            } else if self.at_op("!=") {
                BinOp::Ne
            } else if self.at_op("<=") {
                BinOp::Le
            } else if self.at_op(">=") {
                BinOp::Ge
            } else if self.at_op("<") {
                BinOp::Lt
            } else if self.at_op(">") {
                BinOp::Gt
            } else {
                return Ok(lhs);
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_bitor()?;
            lhs = self.binary(loc, op, lhs, rhs);
        }
    }

    fn parse_bitor(&mut self) -> PResult<NodeId> {
        let mut lhs = self.parse_bitxor()?;
        while self.at_op("|") {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_bitxor()?;
            lhs = self.binary(loc, BinOp::BitOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitxor(&mut self) -> PResult<NodeId> {
        let mut lhs = self.parse_bitand()?;
        while self.at_op("^") {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_bitand()?;
            lhs = self.binary(loc, BinOp::BitXor, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> PResult<NodeId> {
        let mut lhs = self.parse_shift()?;
        while self.at_op("&") {
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_shift()?;
            lhs = self.binary(loc, BinOp::BitAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> PResult<NodeId> {
        let mut lhs = self.parse_add()?;
        loop {
            let op = if self.at_op("<<") {
                BinOp::Shl
            } else if self.at_op(">>") {
                BinOp::Shr
            } else {
                return Ok(lhs);
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_add()?;
            lhs = self.binary(loc, op, lhs, rhs);
        }
    }

    fn parse_add(&mut self) -> PResult<NodeId> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = if self.at_op("+") {
                BinOp::Add
            } else if self.at_op("-") {
                BinOp::Sub
            } else if self.at_op("+%") {
                BinOp::WrapAdd
            } else if self.at_op("-%") {
                BinOp::WrapSub
            } else if self.at_op("+|") {
                BinOp::SatAdd
            } else if self.at_op("-|") {
                BinOp::SatSub
            } else {
                return Ok(lhs);
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = self.binary(loc, op, lhs, rhs);
        }
    }

    fn parse_mul(&mut self) -> PResult<NodeId> {
        let mut lhs = self.parse_cast()?;
        loop {
            let op = if self.at_op("*") {
                BinOp::Mul
            } else if self.at_op("/") {
                BinOp::Div
            } else if self.at_op("%") {
                BinOp::Mod
            } else if self.at_op("*%") {
                BinOp::WrapMul
            } else if self.at_op("/%") {
                BinOp::WrapDiv
            } else if self.at_op("*|") {
                BinOp::SatMul
            } else if self.at_op("/|") {
                BinOp::SatDiv
            } else {
                return Ok(lhs);
            };
            let loc = self.loc();
            self.advance();
            let rhs = self.parse_cast()?;
            lhs = self.binary(loc, op, lhs, rhs);
        }
    }

    fn parse_cast(&mut self) -> PResult<NodeId> {
        let mut value = self.parse_unary()?;
        while self.at_kw("as") {
            let loc = self.loc();
            self.advance();
            let target = self.parse_type()?;
            value = self.ast.alloc(
                loc,
                NodeKind::Cast {
                    value,
                    target,
                    strategy: crate::tree::CastStrategy::Bare,
                    runtime_func: None,
                },
            );
        }
        Ok(value)
    }

    fn parse_unary(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        let op = if self.at_op("-") {
            UnOp::Neg
        } else if self.at_op("!") {
            UnOp::Not
        } else if self.at_op("~") {
            UnOp::BitNot
        } else if self.at_op("&") {
            UnOp::AddrOf
        } else if self.at_op("*") {
            UnOp::Deref
        } else {
            return self.parse_postfix();
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(self.ast.alloc(
            loc,
            NodeKind::Unary {
                op,
                operand,
                builtin: None,
            },
        ))
    }

    fn parse_postfix(&mut self) -> PResult<NodeId> {
        let mut expr = self.parse_primary()?;
        loop {
            let loc = self.loc();
            if self.eat_op("(") {
                let mut args = Vec::new();
                while !self.at_op(")") {
                    args.push(self.parse_expr()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op(")")?;
                expr = self.ast.alloc(loc, NodeKind::Call { callee: expr, args });
            } else if self.eat_op("[") {
                let index = self.parse_expr()?;
                self.expect_op("]")?;
                expr = self.ast.alloc(
                    loc,
                    NodeKind::Index {
                        object: expr,
                        index,
                    },
                );
            } else if self.eat_op(".?") {
                expr = self.ast.alloc(loc, NodeKind::Unwrap { operand: expr });
            } else if self.at_op(".") && self.peek(1).is_ident() {
                self.advance();
                let name = self.advance().text;
                expr = self.ast.alloc(
                    loc,
                    NodeKind::Field {
                        object: expr,
                        name,
                        object_is_pointer: false,
                    },
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> PResult<NodeId> {
        let loc = self.loc();
        let tok = self.cur().clone();
        match tok.kind {
            TokenKind::Int => {
                self.advance();
                if tok.is_unsigned {
                    Ok(self
                        .ast
                        .alloc(loc, NodeKind::UintLit { value: tok.int_value }))
                } else {
                    Ok(self.ast.alloc(
                        loc,
                        NodeKind::IntLit {
                            value: tok.int_value as i64,
                        },
                    ))
                }
            }
            TokenKind::Str => {
                self.advance();
                Ok(self.ast.alloc(
                    loc,
                    NodeKind::StrLit {
                        value: tok.str_bytes,
                    },
                ))
            }
            TokenKind::Ident | TokenKind::Builtin => {
                self.advance();
                Ok(self.ast.alloc(
                    loc,
                    NodeKind::Ident {
                        name: tok.text,
                        symbol: None,
                        needs_user_prefix: false,
                    },
                ))
            }
            TokenKind::Keyword => {
                if self.eat_kw("true") {
                    Ok(self.ast.alloc(loc, NodeKind::BoolLit { value: true }))
                } else if self.eat_kw("false") {
                    Ok(self.ast.alloc(loc, NodeKind::BoolLit { value: false }))
                } else if self.eat_kw("null") {
                    Ok(self.ast.alloc(loc, NodeKind::NullLit))
                } else if self.eat_kw("undefined") {
                    Ok(self.ast.alloc(loc, NodeKind::UndefinedLit))
                } else {
                    let found = Self::describe(&tok);
                    self.error(format!("expected expression, found {}", found))
                }
            }
            TokenKind::Operator => {
                if self.eat_op("(") {
                    let e = self.parse_expr()?;
                    self.expect_op(")")?;
                    Ok(e)
                } else if self.eat_op(".{") {
                    self.parse_initializer(loc)
                } else {
                    let found = Self::describe(&tok);
                    self.error(format!("expected expression, found {}", found))
                }
            }
            TokenKind::Error => {
                let msg = tok.text.clone();
                self.advance();
                self.error(msg)
            }
            TokenKind::Eof => self.error("expected expression, found end of file"),
        }
    }

    /// `.{ .f = e, ... }` is a struct initializer; `.{ e, ... }` an array
    /// initializer. An empty `.{}` parses as an empty array initializer.
    fn parse_initializer(&mut self, loc: Loc) -> PResult<NodeId> {
        if self.at_op(".") && self.peek(1).is_ident() {
            let mut fields = Vec::new();
            while !self.at_op("}") {
                self.expect_op(".")?;
                let name = self.expect_ident()?;
                self.expect_op("=")?;
                let value = self.parse_expr()?;
                fields.push((name, value));
                if !self.eat_op(",") && !self.at_op("}") {
                    let found = Self::describe(self.cur());
                    return self.error(format!("expected `,` or `}}`, found {}", found));
                }
            }
            self.expect_op("}")?;
            return Ok(self.ast.alloc(loc, NodeKind::StructInit { fields }));
        }
        let mut elems = Vec::new();
        while !self.at_op("}") {
            elems.push(self.parse_expr()?);
            if !self.eat_op(",") && !self.at_op("}") {
                let found = Self::describe(self.cur());
                return self.error(format!("expected `,` or `}}`, found {}", found));
            }
        }
        self.expect_op("}")?;
        Ok(self.ast.alloc(loc, NodeKind::ArrayInit { elems }))
    }

    fn binary(&mut self, loc: Loc, op: BinOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.ast.alloc(
            loc,
            NodeKind::Binary {
                op,
                lhs,
                rhs,
                builtin: None,
            },
        )
    }
}
