//! Compile-time integer evaluation.
//!
//! A recursive, integer-only evaluator. Saturating and wrapping operator
//! spellings collapse to ordinary semantics here; all arithmetic is done in
//! 64-bit signed space and wraps silently, matching the behavior the rest of
//! the pipeline expects from array sizes, enum values, and alignments.

use crate::tree::{BinOp, NodeArena, NodeId, NodeKind, UnOp};

/// Evaluate `id` to a signed 64-bit value. Returns `None` for anything
/// non-constant, and for division or modulo by zero.
pub fn eval(ast: &NodeArena, id: NodeId) -> Option<i64> {
    match ast.kind(id) {
        NodeKind::IntLit { value } => Some(*value),
        // uint literals are widened into the signed domain
        NodeKind::UintLit { value } => Some(*value as i64),
        NodeKind::Binary { op, lhs, rhs, .. } => {
            let (op, lhs, rhs) = (*op, *lhs, *rhs);
            let l = eval(ast, lhs)?;
            let r = eval(ast, rhs)?;
            match op {
                BinOp::Add | BinOp::SatAdd | BinOp::WrapAdd => Some(l.wrapping_add(r)),
                BinOp::Sub | BinOp::SatSub | BinOp::WrapSub => Some(l.wrapping_sub(r)),
                BinOp::Mul | BinOp::SatMul | BinOp::WrapMul => Some(l.wrapping_mul(r)),
                BinOp::Div | BinOp::SatDiv | BinOp::WrapDiv => {
                    if r == 0 {
                        None
                    } else {
                        Some(l.wrapping_div(r))
                    }
                }
                BinOp::Mod => {
                    if r == 0 {
                        None
                    } else {
                        Some(l.wrapping_rem(r))
                    }
                }
                BinOp::BitAnd => Some(l & r),
                BinOp::BitOr => Some(l | r),
                BinOp::BitXor => Some(l ^ r),
                BinOp::Shl => Some(l.wrapping_shl(r as u32)),
                BinOp::Shr => Some(l.wrapping_shr(r as u32)),
                _ => None,
            }
        }
        NodeKind::Unary { op, operand, .. } => {
            let (op, operand) = (*op, *operand);
            let v = eval(ast, operand)?;
            match op {
                UnOp::Neg => Some(v.wrapping_neg()),
                UnOp::BitNot => Some(!v),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Reduce the node in place: on success the node becomes a fresh integer
/// literal carrying the computed value at the original source location.
pub fn reduce(ast: &mut NodeArena, id: NodeId) -> bool {
    if matches!(ast.kind(id), NodeKind::IntLit { .. }) {
        return true;
    }
    match eval(ast, id) {
        Some(value) => {
            ast[id].kind = NodeKind::IntLit { value };
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Loc;

    fn lit(ast: &mut NodeArena, v: i64) -> NodeId {
        ast.alloc(Loc::NONE, NodeKind::IntLit { value: v })
    }

    fn bin(ast: &mut NodeArena, op: BinOp, l: NodeId, r: NodeId) -> NodeId {
        ast.alloc(
            Loc::NONE,
            NodeKind::Binary {
                op,
                lhs: l,
                rhs: r,
                builtin: None,
            },
        )
    }

    #[test]
    fn division_by_zero_fails() {
        let mut ast = NodeArena::new();
        let l = lit(&mut ast, 10);
        let r = lit(&mut ast, 0);
        let d = bin(&mut ast, BinOp::Div, l, r);
        assert_eq!(eval(&ast, d), None);
        let m = bin(&mut ast, BinOp::Mod, l, r);
        assert_eq!(eval(&ast, m), None);
    }

    #[test]
    fn reduce_rewrites_in_place() {
        let mut ast = NodeArena::new();
        let l = lit(&mut ast, 6);
        let r = lit(&mut ast, 7);
        let p = bin(&mut ast, BinOp::Mul, l, r);
        assert!(reduce(&mut ast, p));
        assert!(matches!(ast.kind(p), NodeKind::IntLit { value: 42 }));
    }

    #[test]
    fn identifiers_are_not_constant() {
        let mut ast = NodeArena::new();
        let ident = ast.alloc(
            Loc::NONE,
            NodeKind::Ident {
                name: "x".into(),
                symbol: None,
                needs_user_prefix: true,
            },
        );
        assert_eq!(eval(&ast, ident), None);
        assert!(!reduce(&mut ast, ident));
    }
}
