//! End-to-end emission tests.

#[cfg(test)]
mod tests {
    use tick_compiler::emitc;

    fn compile(src: &str) -> (String, String) {
        let result = emitc(src, "test.tick", "out.h", false);
        assert!(
            result.success,
            "compilation failed: {:?}",
            result.diagnostics
        );
        (result.interface.unwrap(), result.implementation.unwrap())
    }

    fn expect_in_order(haystack: &str, needles: &[&str]) {
        let mut from = 0;
        for needle in needles {
            match haystack[from..].find(needle) {
                Some(ix) => from += ix + needle.len(),
                None => panic!("`{}` missing or out of order in:\n{}", needle, haystack),
            }
        }
    }

    #[test]
    fn signed_addition_selects_the_checked_helper() {
        let (header, body) = compile("pub fn add(a: i32, b: i32) i32 { return a + b; }");
        assert!(
            header.contains("int32_t add(int32_t, int32_t);"),
            "header:\n{}",
            header
        );
        expect_in_order(
            &body,
            &[
                "int32_t add(int32_t __u_a, int32_t __u_b) {",
                "return tick_checked_add_i32(__u_a, __u_b);",
                "}",
            ],
        );
    }

    #[test]
    fn complex_expressions_extract_temporaries() {
        let (_, body) = compile("fn f(x: i32) i32 { return (x + 1) * (x + 2); }");
        expect_in_order(
            &body,
            &[
                "int32_t __tmp1 = tick_checked_add_i32(__u_x, 1);",
                "int32_t __tmp2 = tick_checked_add_i32(__u_x, 2);",
                "return tick_checked_mul_i32(__tmp1, __tmp2);",
            ],
        );
    }

    #[test]
    fn auto_tagged_union_emits_enum_stub_and_struct() {
        let (header, _) = compile("pub let Shape = union { circle: f32, square: i32 };");
        // the synthesized tag enum comes first, then the forward
        // declaration, then the full struct
        expect_in_order(
            &header,
            &[
                "typedef uint8_t __u_Shape_Tag;",
                "static const __u_Shape_Tag __u_Shape_Tag_circle_tag = 0;",
                "static const __u_Shape_Tag __u_Shape_Tag_square_tag = 1;",
                "typedef struct __u_Shape __u_Shape;",
                "struct __u_Shape {",
                "__u_Shape_Tag tag;",
                "union {",
                "float circle;",
                "int32_t square;",
                "} data;",
                "};",
            ],
        );
    }

    #[test]
    fn enum_auto_increment() {
        let (_, body) = compile("let Color = enum(u8) { Red, Green = 5, Blue };");
        expect_in_order(
            &body,
            &[
                "typedef uint8_t __u_Color;",
                "static const __u_Color __u_Color_Red = 0;",
                "static const __u_Color __u_Color_Green = 5;",
                "static const __u_Color __u_Color_Blue = 6;",
            ],
        );
    }

    #[test]
    fn nested_field_assignment_decomposes_to_a_pointer_chain() {
        let (_, body) = compile(
            "let Inner = struct { value: i32 };\n\
             let Outer = struct { inner: Inner };\n\
             fn g(p: *Outer) void { p.inner.value = 42; }",
        );
        expect_in_order(
            &body,
            &[
                "__u_Inner* __tmp1 = &((*__u_p).inner);",
                "int32_t* __tmp2 = &((*__tmp1).value);",
                "*__tmp2 = 42;",
            ],
        );
    }

    #[test]
    fn unsigned_addition_collapses_to_the_c_operator() {
        let (_, body) = compile("fn u(a: u32, b: u32) u32 { return a + b; }");
        assert!(body.contains("return __u_a + __u_b;"), "body:\n{}", body);
        assert!(!body.contains("tick_checked_add_u32"));
    }

    #[test]
    fn interface_opens_with_pragma_and_prelude() {
        let (header, _) = compile("pub fn f() void { }");
        assert!(header.starts_with("#pragma once\n"));
        assert!(header.contains("tick runtime prelude"));
        assert!(header.contains("TICK_DECLARE_INT_OPS(i32)"));
        assert!(header.contains("void tick_panic(const char *fmt, ...);"));
    }

    #[test]
    fn implementation_includes_the_interface() {
        let (_, body) = compile("pub fn f() void { }");
        assert!(body.starts_with("#include \"out.h\"\n"), "body:\n{}", body);
    }

    #[test]
    fn line_directives_point_at_tick_source() {
        let (_, body) = compile("fn f(x: i32) i32 {\n    let y: i32 = x + 1;\n    return y;\n}");
        assert!(body.contains("#line 2 \"test.tick\""));
        assert!(body.contains("#line 3 \"test.tick\""));
    }

    #[test]
    fn no_two_consecutive_identical_line_directives() {
        let (_, body) = compile(
            "fn f(x: i32) i32 { let a: i32 = x + 1; let b: i32 = a + 2; return b; }",
        );
        let mut last: Option<&str> = None;
        for line in body.lines() {
            if line.starts_with("#line") {
                assert_ne!(last, Some(line), "duplicate adjacent directive: {}", line);
            }
            last = Some(line);
        }
    }

    #[test]
    fn prefix_contract() {
        let (header, body) = compile(
            "pub let visible: i32 = 1;\n\
             let hidden: i32 = 2;\n\
             extern fn c_func() void;\n\
             pub fn api(arg: i32) i32 { c_func(); return arg; }\n\
             fn helper() i32 { return hidden; }",
        );
        assert!(header.contains("extern int32_t visible;"));
        assert!(body.contains("int32_t visible = 1;"));
        assert!(body.contains("int32_t __u_hidden = 2;"));
        assert!(body.contains("extern void c_func(void);"));
        assert!(body.contains("int32_t api(int32_t __u_arg) {"));
        assert!(body.contains("c_func();"));
        assert!(body.contains("int32_t __u_helper(void) {"));
        assert!(body.contains("return __u_hidden;"));
    }

    #[test]
    fn for_loop_lowers_to_while_with_early_exit() {
        let (_, body) = compile(
            "fn f(n: i32) i32 {\n\
             var total: i32 = 0;\n\
             for var i: i32 = 0; i < n; i = i + 1 {\n\
             total = total + i;\n\
             }\n\
             return total;\n\
             }",
        );
        expect_in_order(
            &body,
            &[
                "int32_t __u_i = 0;",
                "while (1) {",
                "if (!(__u_i < __u_n)) break;",
                "__u_total = tick_checked_add_i32(__u_total, __u_i);",
                "__u_i = tick_checked_add_i32(__u_i, 1);",
                "}",
            ],
        );
    }

    #[test]
    fn switch_cases_wrap_in_braces_with_break() {
        let (_, body) = compile(
            "fn f(x: i32) i32 {\n\
             var r: i32 = 0;\n\
             switch x {\n\
             case 1, 2: r = 1;\n\
             default: r = 2;\n\
             }\n\
             return r;\n\
             }",
        );
        expect_in_order(
            &body,
            &[
                "switch (__u_x) {",
                "case 1:",
                "case 2:",
                "{",
                "__u_r = 1;",
                "break;",
                "}",
                "default:",
                "{",
                "__u_r = 2;",
                "break;",
                "}",
                "}",
            ],
        );
    }

    #[test]
    fn if_always_emits_both_branches() {
        let (_, body) = compile("fn f(x: i32) i32 { if x > 0 { return 1; } return 0; }");
        expect_in_order(&body, &["if (__u_x > 0) {", "return 1;", "} else {", "}"]);
    }

    #[test]
    fn string_literals_inline_as_byte_arrays() {
        let (_, body) = compile("fn f() void { @dbg(\"hi\"); }");
        assert!(
            body.contains("(const char*)(uint8_t[]){104, 105, 0}"),
            "body:\n{}",
            body
        );
        assert!(body.contains("tick_debug_log(__tmp1);"));
    }

    #[test]
    fn undefined_initializers_become_null() {
        let (_, body) = compile(
            "var g: *i32 = undefined;\n\
             fn f() void { var p: *i32 = undefined; }",
        );
        assert!(body.contains("int32_t* __u_g = NULL;"), "body:\n{}", body);
        assert!(body.contains("int32_t* __u_p = NULL;"), "body:\n{}", body);
    }

    #[test]
    fn static_strings_become_byte_arrays() {
        let (_, body) = compile("static let msg = \"ok\";");
        assert!(
            body.contains("static uint8_t __u_msg[3] = {111, 107, 0};"),
            "body:\n{}",
            body
        );
    }

    #[test]
    fn enum_value_references_use_qualified_names() {
        let (_, body) = compile(
            "let Color = enum(u8) { Red, Green };\n\
             fn f() Color { return Color.Green; }",
        );
        assert!(body.contains("return __u_Color_Green;"), "body:\n{}", body);
    }

    #[test]
    fn union_field_access_injects_data() {
        let (_, body) = compile(
            "let U = union { i: i32, j: i64 };\n\
             fn f(u: *U) i32 { return u.i; }",
        );
        assert!(body.contains("return __u_u->data.i;"), "body:\n{}", body);
    }

    #[test]
    fn checked_cast_emits_the_helper_call() {
        let (_, body) = compile("fn f(x: i64) i32 { return x as i32; }");
        assert!(
            body.contains("return tick_checked_cast_i64_i32(__u_x);"),
            "body:\n{}",
            body
        );
    }

    #[test]
    fn widening_cast_emits_a_plain_cast() {
        let (_, body) = compile("fn f(x: u16) i64 { return x as i64; }");
        assert!(body.contains("return (int64_t)(__u_x);"), "body:\n{}", body);
    }

    #[test]
    fn struct_initializer_flattens_into_assignments() {
        let (_, body) = compile(
            "let Point = struct { x: i32, y: i32 };\n\
             fn f() i32 {\n\
             let p: Point = .{ .x = 1, .y = 2 };\n\
             return p.x;\n\
             }",
        );
        expect_in_order(
            &body,
            &["__u_Point __tmp1;", "= &(__tmp1.x);", "= 1;", "= &(__tmp1.y);", "= 2;"],
        );
    }

    #[test]
    fn function_pointers_declare_with_c_syntax() {
        let (_, body) = compile(
            "extern fn handler(x: i32) void;\n\
             let cb: *fn(i32) void = handler;",
        );
        assert!(
            body.contains("void (*__u_cb)(int32_t) = handler;"),
            "body:\n{}",
            body
        );
    }

    #[test]
    fn errors_suppress_emission() {
        let result = emitc("fn f() i32 { return nope; }", "test.tick", "out.h", false);
        assert!(!result.success);
        assert!(result.interface.is_none());
        assert!(result.implementation.is_none());
        assert!(!result.diagnostics.is_empty());
    }
}
