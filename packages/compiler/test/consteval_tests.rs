//! Constant evaluator tests.

#[cfg(test)]
mod tests {
    use tick_compiler::consteval::{eval, reduce};
    use tick_compiler::diagnostics::Loc;
    use tick_compiler::tree::{BinOp, NodeArena, NodeId, NodeKind, UnOp};

    fn lit(ast: &mut NodeArena, v: i64) -> NodeId {
        ast.alloc(Loc::new(1, 1), NodeKind::IntLit { value: v })
    }

    fn ulit(ast: &mut NodeArena, v: u64) -> NodeId {
        ast.alloc(Loc::new(1, 1), NodeKind::UintLit { value: v })
    }

    fn bin(ast: &mut NodeArena, op: BinOp, l: i64, r: i64) -> NodeId {
        let lhs = lit(ast, l);
        let rhs = lit(ast, r);
        ast.alloc(
            Loc::new(1, 1),
            NodeKind::Binary {
                op,
                lhs,
                rhs,
                builtin: None,
            },
        )
    }

    fn un(ast: &mut NodeArena, op: UnOp, v: i64) -> NodeId {
        let operand = lit(ast, v);
        ast.alloc(
            Loc::new(1, 1),
            NodeKind::Unary {
                op,
                operand,
                builtin: None,
            },
        )
    }

    fn expect_eval(ast: &NodeArena, id: NodeId, expected: i64) {
        assert_eq!(eval(ast, id), Some(expected));
    }

    #[test]
    fn arithmetic_matches_wrapped_64_bit_semantics() {
        let mut ast = NodeArena::new();
        let cases: Vec<(BinOp, i64, i64, i64)> = vec![
            (BinOp::Add, 2, 3, 5),
            (BinOp::Sub, 2, 3, -1),
            (BinOp::Mul, -4, 6, -24),
            (BinOp::Div, 7, 2, 3),
            (BinOp::Div, -7, 2, -3),
            (BinOp::Mod, 7, 3, 1),
            (BinOp::BitAnd, 0b1100, 0b1010, 0b1000),
            (BinOp::BitOr, 0b1100, 0b1010, 0b1110),
            (BinOp::BitXor, 0b1100, 0b1010, 0b0110),
            (BinOp::Shl, 1, 10, 1024),
            (BinOp::Shr, 1024, 3, 128),
            (BinOp::Shr, -8, 1, -4),
            (BinOp::Add, i64::MAX, 1, i64::MIN),
            (BinOp::Mul, i64::MAX, 2, -2),
        ];
        for (op, l, r, expected) in cases {
            let id = bin(&mut ast, op, l, r);
            assert_eq!(eval(&ast, id), Some(expected), "{:?} {} {}", op, l, r);
        }
    }

    #[test]
    fn saturating_and_wrapping_spellings_collapse() {
        let mut ast = NodeArena::new();
        for op in [BinOp::SatAdd, BinOp::WrapAdd] {
            let id = bin(&mut ast, op, 40, 2);
            expect_eval(&ast, id, 42);
        }
        for op in [BinOp::SatDiv, BinOp::WrapDiv] {
            let id = bin(&mut ast, op, 42, 6);
            expect_eval(&ast, id, 7);
        }
    }

    #[test]
    fn unary_operators() {
        let mut ast = NodeArena::new();
        let neg = un(&mut ast, UnOp::Neg, 5);
        expect_eval(&ast, neg, -5);
        let not = un(&mut ast, UnOp::BitNot, 0);
        expect_eval(&ast, not, -1);
    }

    #[test]
    fn division_and_modulo_by_zero_fail() {
        let mut ast = NodeArena::new();
        let d = bin(&mut ast, BinOp::Div, 1, 0);
        assert_eq!(eval(&ast, d), None);
        let m = bin(&mut ast, BinOp::Mod, 1, 0);
        assert_eq!(eval(&ast, m), None);
    }

    #[test]
    fn uint_literals_are_widened() {
        let mut ast = NodeArena::new();
        let u = ulit(&mut ast, 300);
        expect_eval(&ast, u, 300);
    }

    #[test]
    fn non_constants_fail() {
        let mut ast = NodeArena::new();
        let ident = ast.alloc(
            Loc::new(1, 1),
            NodeKind::Ident {
                name: "x".into(),
                symbol: None,
                needs_user_prefix: false,
            },
        );
        assert_eq!(eval(&ast, ident), None);
        let lhs = lit(&mut ast, 1);
        let mixed = ast.alloc(
            Loc::new(1, 1),
            NodeKind::Binary {
                op: BinOp::Add,
                lhs,
                rhs: ident,
                builtin: None,
            },
        );
        assert_eq!(eval(&ast, mixed), None);
    }

    #[test]
    fn reduce_keeps_the_source_location() {
        let mut ast = NodeArena::new();
        let id = bin(&mut ast, BinOp::Mul, 6, 7);
        assert!(reduce(&mut ast, id));
        assert!(matches!(ast.kind(id), NodeKind::IntLit { value: 42 }));
        assert_eq!(ast.loc(id), Loc::new(1, 1));
    }

    #[test]
    fn nested_expression() {
        // (2 + 3) * 4 - (10 / 2)
        let mut ast = NodeArena::new();
        let sum = bin(&mut ast, BinOp::Add, 2, 3);
        let four = lit(&mut ast, 4);
        let prod = ast.alloc(
            Loc::new(1, 1),
            NodeKind::Binary {
                op: BinOp::Mul,
                lhs: sum,
                rhs: four,
                builtin: None,
            },
        );
        let quot = bin(&mut ast, BinOp::Div, 10, 2);
        let total = ast.alloc(
            Loc::new(1, 1),
            NodeKind::Binary {
                op: BinOp::Sub,
                lhs: prod,
                rhs: quot,
                builtin: None,
            },
        );
        expect_eval(&ast, total, 15);
    }
}
