//! Parser tests.

#[cfg(test)]
mod tests {
    use tick_compiler::parse_source;
    use tick_compiler::tree::{BinOp, NodeArena, NodeId, NodeKind, Qualifiers};

    fn parse(src: &str) -> (NodeArena, NodeId) {
        let c = parse_source(src, "test.tick");
        assert!(
            !c.diagnostics.has_errors(),
            "unexpected parse errors: {:?}",
            c.diagnostics.render_all(None)
        );
        (c.ast, c.module)
    }

    fn module_decls(ast: &NodeArena, module: NodeId) -> Vec<NodeId> {
        match ast.kind(module) {
            NodeKind::Module { decls } => decls.clone(),
            other => panic!("expected module, got {:?}", other),
        }
    }

    fn decl_name(ast: &NodeArena, decl: NodeId) -> String {
        match ast.kind(decl) {
            NodeKind::Decl(d) => d.name.clone(),
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn declarations_stay_in_source_order() {
        let (ast, module) = parse("let a = 1;\nlet b = 2;\nlet c = 3;");
        let decls = module_decls(&ast, module);
        let names: Vec<String> = decls.iter().map(|&d| decl_name(&ast, d)).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn qualifiers_parse() {
        let (ast, module) = parse("pub extern var x: i32;");
        let decls = module_decls(&ast, module);
        let NodeKind::Decl(d) = ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        assert!(d.quals.contains(Qualifiers::PUB));
        assert!(d.quals.contains(Qualifiers::EXTERN));
        assert!(d.quals.contains(Qualifiers::VAR));
    }

    #[test]
    fn function_parameters_in_order() {
        let (ast, module) = parse("fn f(a: i32, b: u8, c: *i64) void { }");
        let decls = module_decls(&ast, module);
        let NodeKind::Decl(d) = ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        let NodeKind::Function { params, .. } = ast.kind(d.init.unwrap()) else {
            panic!("not a function")
        };
        let names: Vec<String> = params
            .iter()
            .map(|&p| match ast.kind(p) {
                NodeKind::Param { name, .. } => name.clone(),
                _ => panic!("not a param"),
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let (ast, module) = parse("let x = 1 + 2 * 3;");
        let decls = module_decls(&ast, module);
        let NodeKind::Decl(d) = ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        let NodeKind::Binary { op, rhs, .. } = ast.kind(d.init.unwrap()) else {
            panic!("expected binary init")
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(
            ast.kind(*rhs),
            NodeKind::Binary {
                op: BinOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn cast_is_postfix() {
        let (ast, module) = parse("fn f(x: i64) i32 { return x as i32; }");
        let decls = module_decls(&ast, module);
        let NodeKind::Decl(d) = ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        let NodeKind::Function { body, .. } = ast.kind(d.init.unwrap()) else {
            panic!("not a function")
        };
        let NodeKind::Block { stmts } = ast.kind(body.unwrap()) else {
            panic!("not a block")
        };
        let NodeKind::Return { value } = ast.kind(stmts[0]) else {
            panic!("not a return")
        };
        assert!(matches!(ast.kind(value.unwrap()), NodeKind::Cast { .. }));
    }

    #[test]
    fn the_three_for_forms() {
        let (ast, module) = parse(
            "fn f(n: i32) void {\n\
             for { break; }\n\
             for n > 0 { break; }\n\
             for var i: i32 = 0; i < n; i = i + 1 { }\n\
             }",
        );
        let decls = module_decls(&ast, module);
        let NodeKind::Decl(d) = ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        let NodeKind::Function { body, .. } = ast.kind(d.init.unwrap()) else {
            panic!("not a function")
        };
        let NodeKind::Block { stmts } = ast.kind(body.unwrap()) else {
            panic!("not a block")
        };
        let forms: Vec<(bool, bool, bool)> = stmts
            .iter()
            .map(|&s| match ast.kind(s) {
                NodeKind::For {
                    init, cond, step, ..
                } => (init.is_some(), cond.is_some(), step.is_some()),
                other => panic!("expected for, got {:?}", other),
            })
            .collect();
        assert_eq!(
            forms,
            vec![(false, false, false), (false, true, false), (true, true, true)]
        );
    }

    #[test]
    fn switch_cases_and_default() {
        let (ast, module) = parse(
            "fn f(x: i32) i32 {\n\
             switch x {\n\
             case 1, 2: return 1;\n\
             default: return 0;\n\
             }\n\
             return 0;\n\
             }",
        );
        let decls = module_decls(&ast, module);
        let NodeKind::Decl(d) = ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        let NodeKind::Function { body, .. } = ast.kind(d.init.unwrap()) else {
            panic!("not a function")
        };
        let NodeKind::Block { stmts } = ast.kind(body.unwrap()) else {
            panic!("not a block")
        };
        let NodeKind::Switch { cases, .. } = ast.kind(stmts[0]) else {
            panic!("expected switch")
        };
        assert_eq!(cases.len(), 2);
        let NodeKind::Case { values, .. } = ast.kind(cases[0]) else {
            panic!("expected case")
        };
        assert_eq!(values.len(), 2);
        let NodeKind::Case { values, .. } = ast.kind(cases[1]) else {
            panic!("expected case")
        };
        assert!(values.is_empty(), "default case carries no values");
    }

    #[test]
    fn struct_and_array_initializers() {
        let (ast, module) = parse("fn f() void { let p: Point = .{ .x = 1, .y = 2 }; let a: i32[2] = .{ 1, 2 }; }");
        let decls = module_decls(&ast, module);
        let NodeKind::Decl(d) = ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        let NodeKind::Function { body, .. } = ast.kind(d.init.unwrap()) else {
            panic!("not a function")
        };
        let NodeKind::Block { stmts } = ast.kind(body.unwrap()) else {
            panic!("not a block")
        };
        let NodeKind::Decl(p) = ast.kind(stmts[0]) else {
            panic!("not a decl")
        };
        let NodeKind::StructInit { fields } = ast.kind(p.init.unwrap()) else {
            panic!("expected struct initializer")
        };
        assert_eq!(fields[0].0, "x");
        assert_eq!(fields[1].0, "y");
        let NodeKind::Decl(a) = ast.kind(stmts[1]) else {
            panic!("not a decl")
        };
        let NodeKind::ArrayInit { elems } = ast.kind(a.init.unwrap()) else {
            panic!("expected array initializer")
        };
        assert_eq!(elems.len(), 2);
    }

    #[test]
    fn union_with_explicit_tag() {
        let (ast, module) = parse("let U = union(Tag) { a: i32 };");
        let decls = module_decls(&ast, module);
        let NodeKind::Decl(d) = ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        let NodeKind::UnionDecl { tag, .. } = ast.kind(d.init.unwrap()) else {
            panic!("expected union")
        };
        assert!(tag.is_some());
    }

    #[test]
    fn enum_values_with_and_without_explicit() {
        let (ast, module) = parse("let Color = enum(u8) { Red, Green = 5, Blue };");
        let decls = module_decls(&ast, module);
        let NodeKind::Decl(d) = ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        let NodeKind::EnumDecl { values, .. } = ast.kind(d.init.unwrap()) else {
            panic!("expected enum")
        };
        assert_eq!(values.len(), 3);
        let explicit: Vec<bool> = values
            .iter()
            .map(|&v| match ast.kind(v) {
                NodeKind::EnumMember { value, .. } => value.is_some(),
                _ => panic!("not an enum member"),
            })
            .collect();
        assert_eq!(explicit, vec![false, true, false]);
    }

    #[test]
    fn labels_and_goto() {
        let (ast, module) = parse("fn f() void { top: goto top; }");
        let decls = module_decls(&ast, module);
        let NodeKind::Decl(d) = ast.kind(decls[0]) else {
            panic!("not a decl")
        };
        let NodeKind::Function { body, .. } = ast.kind(d.init.unwrap()) else {
            panic!("not a function")
        };
        let NodeKind::Block { stmts } = ast.kind(body.unwrap()) else {
            panic!("not a block")
        };
        assert!(matches!(ast.kind(stmts[0]), NodeKind::Label { .. }));
        assert!(matches!(ast.kind(stmts[1]), NodeKind::Goto { .. }));
    }

    #[test]
    fn malformed_declaration_reports_located_error() {
        let c = parse_source("let = 3;", "test.tick");
        assert!(c.diagnostics.has_errors());
        let rendered = c.diagnostics.render_all(None);
        assert!(rendered[0].starts_with("test.tick:1:"), "got {}", rendered[0]);
    }

    #[test]
    fn recovery_continues_after_a_bad_declaration() {
        let c = parse_source("let = 3;\nlet ok = 1;", "test.tick");
        assert!(c.diagnostics.has_errors());
        let decls = match c.ast.kind(c.module) {
            NodeKind::Module { decls } => decls.clone(),
            _ => panic!("expected module"),
        };
        assert_eq!(decls.len(), 1);
    }
}
