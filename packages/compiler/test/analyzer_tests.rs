//! Analyzer invariant tests.

#[cfg(test)]
mod tests {
    use tick_compiler::analyze_source;
    use tick_compiler::tree::{
        CastStrategy, NodeArena, NodeFlags, NodeId, NodeKind, Qualifiers, UnOp,
    };
    use tick_compiler::Compilation;

    fn analyze_ok(src: &str) -> Compilation {
        let c = analyze_source(src, "test.tick");
        assert!(
            !c.diagnostics.has_errors(),
            "unexpected errors: {:?}",
            c.diagnostics.render_all(None)
        );
        c
    }

    fn module_decls(ast: &NodeArena, module: NodeId) -> Vec<NodeId> {
        match ast.kind(module) {
            NodeKind::Module { decls } => decls.clone(),
            _ => panic!("expected module"),
        }
    }

    /// The simple-expression classification: a literal other than string, an
    /// identifier, an initializer, or deref/address-of/field/index over
    /// simple parts.
    fn is_simple(ast: &NodeArena, id: NodeId) -> bool {
        match ast.kind(id) {
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
            } => is_simple(ast, *operand),
            NodeKind::Field { object, .. } => is_simple(ast, *object),
            NodeKind::Index { object, index } => {
                is_simple(ast, *object) && is_simple(ast, *index)
            }
            _ => false,
        }
    }

    #[test]
    fn simple_form_closure() {
        let c = analyze_ok(
            "fn f(x: i32, y: i32) i32 {\n\
             let a: i32 = (x + 1) * (y - 2);\n\
             return f(a + x, a * y) + f(1, 2);\n\
             }",
        );
        for id in c.ast.ids() {
            if !c.ast[id].flags.contains(NodeFlags::ANALYZED) {
                continue;
            }
            match c.ast.kind(id) {
                NodeKind::Binary { lhs, rhs, .. } => {
                    assert!(is_simple(&c.ast, *lhs), "binary lhs not simple");
                    assert!(is_simple(&c.ast, *rhs), "binary rhs not simple");
                }
                NodeKind::Unary { operand, .. } => {
                    assert!(is_simple(&c.ast, *operand), "unary operand not simple");
                }
                NodeKind::Call { args, .. } => {
                    for &a in args {
                        assert!(is_simple(&c.ast, a), "call argument not simple");
                    }
                }
                NodeKind::Cast { value, .. } => {
                    assert!(is_simple(&c.ast, *value), "cast source not simple");
                }
                _ => {}
            }
        }
    }

    #[test]
    fn lvalue_chain_closure() {
        let c = analyze_ok(
            "let Inner = struct { value: i32 };\n\
             let Outer = struct { inner: Inner, arr: i32[4] };\n\
             fn g(p: *Outer, o: Outer) void {\n\
             p.inner.value = 1;\n\
             o.arr[2] = 3;\n\
             p.inner = o.inner;\n\
             }",
        );
        for id in c.ast.ids() {
            if let NodeKind::Assign { lhs, .. } = c.ast.kind(id) {
                let ok = match c.ast.kind(*lhs) {
                    NodeKind::Ident { .. } => true,
                    NodeKind::Unary {
                        op: UnOp::Deref,
                        operand,
                        ..
                    } => matches!(c.ast.kind(*operand), NodeKind::Ident { .. }),
                    _ => false,
                };
                assert!(ok, "assignment target is neither ident nor *ident");
            }
        }
    }

    #[test]
    fn temporary_ids_are_unique_per_function() {
        let c = analyze_ok(
            "fn f(x: i32) i32 {\n\
             let a: i32 = (x + 1) * (x + 2);\n\
             let b: i32 = (x + 3) * (x + 4);\n\
             return a + b;\n\
             }",
        );
        let mut seen = std::collections::HashSet::new();
        for id in c.ast.ids() {
            if let NodeKind::Decl(d) = c.ast.kind(id) {
                if d.tmp_id != 0 {
                    assert!(seen.insert(d.tmp_id), "temporary id {} reused", d.tmp_id);
                }
            }
        }
        assert!(!seen.is_empty(), "expected extracted temporaries");
    }

    #[test]
    fn forward_declarations_precede_definitions() {
        // struct stubs open the module; an auto-tagged union's stub instead
        // follows its synthesized tag enum, immediately before the union
        let c = analyze_ok(
            "pub let A = struct { x: i32 };\n\
             pub let B = struct { a: *A };\n\
             pub let U = union { i: i32, j: i64 };",
        );
        let decls = module_decls(&c.ast, c.module);
        let layout: Vec<(String, bool)> = decls
            .iter()
            .map(|&d| match c.ast.kind(d) {
                NodeKind::Decl(data) => (
                    data.name.clone(),
                    data.quals.contains(Qualifiers::FORWARD_DECL),
                ),
                _ => panic!("not a decl"),
            })
            .collect();
        let expected = vec![
            ("A".to_string(), true),
            ("B".to_string(), true),
            ("A".to_string(), false),
            ("B".to_string(), false),
            ("U_Tag".to_string(), false),
            ("U".to_string(), true),
            ("U".to_string(), false),
        ];
        assert_eq!(layout, expected);
    }

    #[test]
    fn auto_tagged_union_synthesizes_an_enum() {
        let c = analyze_ok("pub let Shape = union { circle: f32, square: i32 };");
        let decls = module_decls(&c.ast, c.module);
        // skip stubs; the tag enum must sit immediately before the union
        let defs: Vec<NodeId> = decls
            .iter()
            .copied()
            .filter(|&d| match c.ast.kind(d) {
                NodeKind::Decl(data) => !data.quals.contains(Qualifiers::FORWARD_DECL),
                _ => false,
            })
            .collect();
        assert_eq!(defs.len(), 2);
        let NodeKind::Decl(enum_decl) = c.ast.kind(defs[0]) else {
            panic!("not a decl")
        };
        assert_eq!(enum_decl.name, "Shape_Tag");
        assert!(enum_decl.quals.contains(Qualifiers::PUB), "tag inherits pub");
        let NodeKind::EnumDecl { underlying, values } = c.ast.kind(enum_decl.init.unwrap())
        else {
            panic!("tag is not an enum")
        };
        let NodeKind::NamedType { name, .. } = c.ast.kind(underlying.unwrap()) else {
            panic!("no underlying type")
        };
        assert_eq!(name, "u8", "narrowest unsigned type for two fields");
        let vals: Vec<(String, i64)> = values
            .iter()
            .map(|&v| match c.ast.kind(v) {
                NodeKind::EnumMember { name, value, .. } => {
                    let lit = match c.ast.kind(value.unwrap()) {
                        NodeKind::IntLit { value } => *value,
                        _ => panic!("enum value is not a literal"),
                    };
                    (name.clone(), lit)
                }
                _ => panic!("not an enum member"),
            })
            .collect();
        assert_eq!(
            vals,
            vec![("circle_tag".to_string(), 0), ("square_tag".to_string(), 1)]
        );
        let NodeKind::Decl(union_decl) = c.ast.kind(defs[1]) else {
            panic!("not a decl")
        };
        let NodeKind::UnionDecl { tag, .. } = c.ast.kind(union_decl.init.unwrap()) else {
            panic!("not a union")
        };
        let NodeKind::NamedType { name, .. } = c.ast.kind(tag.unwrap()) else {
            panic!("tag reference is not a named type")
        };
        assert_eq!(name, "Shape_Tag");
    }

    #[test]
    fn enum_auto_increment_tracks_last_value() {
        let c = analyze_ok("let Color = enum(u8) { Red, Green = 5, Blue };");
        let decls = module_decls(&c.ast, c.module);
        let NodeKind::Decl(d) = c.ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        let NodeKind::EnumDecl { values, .. } = c.ast.kind(d.init.unwrap()) else {
            panic!("not an enum")
        };
        let vals: Vec<i64> = values
            .iter()
            .map(|&v| match c.ast.kind(v) {
                NodeKind::EnumMember { value, .. } => match c.ast.kind(value.unwrap()) {
                    NodeKind::IntLit { value } => *value,
                    _ => panic!("value is not a literal"),
                },
                _ => panic!("not an enum member"),
            })
            .collect();
        assert_eq!(vals, vec![0, 5, 6]);
    }

    #[test]
    fn bool_literals_normalize_to_uint() {
        let c = analyze_ok("fn f() bool { return true; }");
        let mut found = false;
        for id in c.ast.ids() {
            if matches!(c.ast.kind(id), NodeKind::UintLit { value: 1 }) {
                found = true;
            }
            assert!(
                !matches!(c.ast.kind(id), NodeKind::BoolLit { .. })
                    || !c.ast[id].flags.contains(NodeFlags::ANALYZED),
                "analyzed bool literal survived"
            );
        }
        assert!(found, "expected the rewritten uint literal");
    }

    #[test]
    fn narrowing_cast_selects_the_checked_helper() {
        let c = analyze_ok("fn f(x: i64) i32 { return x as i32; }");
        let mut found = false;
        for id in c.ast.ids() {
            if let NodeKind::Cast {
                strategy,
                runtime_func,
                ..
            } = c.ast.kind(id)
            {
                assert_eq!(*strategy, CastStrategy::Checked);
                assert_eq!(runtime_func.as_deref(), Some("tick_checked_cast_i64_i32"));
                found = true;
            }
        }
        assert!(found);
    }

    #[test]
    fn widening_cast_stays_bare() {
        let c = analyze_ok("fn f(x: u16) i32 { return x as i32; }");
        for id in c.ast.ids() {
            if let NodeKind::Cast { strategy, .. } = c.ast.kind(id) {
                assert_eq!(*strategy, CastStrategy::Bare);
            }
        }
    }

    #[test]
    fn circular_value_dependency_is_reported() {
        let c = analyze_source(
            "pub let A = struct { b: B };\npub let B = struct { a: A };",
            "test.tick",
        );
        assert!(c.diagnostics.has_errors());
        let all = c.diagnostics.render_all(None).join("\n");
        assert!(all.contains("circular dependency"), "got: {}", all);
    }

    #[test]
    fn mutually_recursive_pointers_are_fine() {
        analyze_ok(
            "pub let A = struct { b: *B };\n\
             pub let B = struct { a: *A };",
        );
    }

    #[test]
    fn undefined_identifier_is_reported() {
        let c = analyze_source("fn f() i32 { return nope; }", "test.tick");
        assert!(c.diagnostics.has_errors());
        let all = c.diagnostics.render_all(None).join("\n");
        assert!(all.contains("undefined identifier `nope`"), "got: {}", all);
    }

    #[test]
    fn unknown_builtin_is_reported() {
        let c = analyze_source("fn f() void { @bogus(1); }", "test.tick");
        assert!(c.diagnostics.has_errors());
        let all = c.diagnostics.render_all(None).join("\n");
        assert!(all.contains("unknown builtin"), "got: {}", all);
    }

    #[test]
    fn duplicate_declaration_is_reported() {
        let c = analyze_source("let x = 1;\nlet x = 2;", "test.tick");
        assert!(c.diagnostics.has_errors());
        let all = c.diagnostics.render_all(None).join("\n");
        assert!(all.contains("duplicate declaration `x`"), "got: {}", all);
    }

    #[test]
    fn union_tag_must_cover_every_field() {
        let c = analyze_source(
            "pub let Kind = enum(u8) { a };\n\
             pub let U = union(Kind) { a: i32, b: i64 };",
            "test.tick",
        );
        assert!(c.diagnostics.has_errors());
        let all = c.diagnostics.render_all(None).join("\n");
        assert!(all.contains("no value matching union field `b`"), "got: {}", all);
    }

    #[test]
    fn union_tag_must_be_an_enum() {
        let c = analyze_source(
            "pub let NotEnum = struct { x: i32 };\n\
             pub let U = union(NotEnum) { a: i32 };",
            "test.tick",
        );
        assert!(c.diagnostics.has_errors());
        let all = c.diagnostics.render_all(None).join("\n");
        assert!(all.contains("union tag type"), "got: {}", all);
    }

    #[test]
    fn module_initializers_reduce_to_literals() {
        let c = analyze_ok("pub let answer: i32 = 6 * 7;");
        let decls = module_decls(&c.ast, c.module);
        let NodeKind::Decl(d) = c.ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        assert!(matches!(
            c.ast.kind(d.init.unwrap()),
            NodeKind::IntLit { value: 42 }
        ));
    }

    #[test]
    fn non_constant_module_initializer_is_reported() {
        let c = analyze_source("fn f() i32 { return 1; }\nlet x: i32 = f();", "test.tick");
        assert!(c.diagnostics.has_errors());
        let all = c.diagnostics.render_all(None).join("\n");
        assert!(all.contains("compile-time constant"), "got: {}", all);
    }

    #[test]
    fn missing_initializer_is_reported() {
        let c = analyze_source("let x: i32;", "test.tick");
        assert!(c.diagnostics.has_errors());
        let all = c.diagnostics.render_all(None).join("\n");
        assert!(all.contains("requires an initializer"), "got: {}", all);
    }
}
