//! Lexer tests.

#[cfg(test)]
mod tests {
    use tick_compiler::syntax::lexer::{Lexer, Token, TokenKind};

    fn lex(text: &str) -> Vec<Token> {
        Lexer::new().tokenize(text)
    }

    fn expect_operator(token: &Token, op: &str) {
        assert!(
            token.is_operator(op),
            "expected operator `{}`, got {:?} `{}`",
            op,
            token.kind,
            token.text
        );
    }

    fn expect_keyword(token: &Token, kw: &str) {
        assert!(
            token.is_keyword(kw),
            "expected keyword `{}`, got {:?} `{}`",
            kw,
            token.kind,
            token.text
        );
    }

    fn expect_ident(token: &Token, name: &str) {
        assert!(token.is_ident(), "expected identifier, got {:?}", token.kind);
        assert_eq!(token.text, name, "expected identifier `{}`", name);
    }

    fn expect_int(token: &Token, value: u64) {
        assert!(token.is_int(), "expected integer, got {:?}", token.kind);
        assert_eq!(token.int_value, value, "expected integer {}", value);
    }

    #[test]
    fn keywords_and_identifiers() {
        let toks = lex("pub fn main let letter");
        expect_keyword(&toks[0], "pub");
        expect_keyword(&toks[1], "fn");
        expect_ident(&toks[2], "main");
        expect_keyword(&toks[3], "let");
        expect_ident(&toks[4], "letter");
        assert!(toks[5].is_eof());
    }

    #[test]
    fn integer_literals() {
        let toks = lex("0 123 0x7f 1_000_000");
        expect_int(&toks[0], 0);
        expect_int(&toks[1], 123);
        expect_int(&toks[2], 0x7f);
        expect_int(&toks[3], 1_000_000);
    }

    #[test]
    fn large_literals_become_unsigned() {
        let toks = lex("9223372036854775807 9223372036854775808");
        assert!(!toks[0].is_unsigned);
        assert!(toks[1].is_unsigned);
        expect_int(&toks[1], 9223372036854775808);
    }

    #[test]
    fn overflowing_literal_is_an_error() {
        let toks = lex("99999999999999999999999999");
        assert_eq!(toks[0].kind, TokenKind::Error);
    }

    #[test]
    fn wrapping_and_saturating_operators() {
        let toks = lex("+% -% *% /% +| -| *| /|");
        for (i, op) in ["+%", "-%", "*%", "/%", "+|", "-|", "*|", "/|"]
            .iter()
            .enumerate()
        {
            expect_operator(&toks[i], op);
        }
    }

    #[test]
    fn multi_character_operators_win() {
        let toks = lex("<< >> <= >= == != .? .{");
        for (i, op) in ["<<", ">>", "<=", ">=", "==", "!=", ".?", ".{"]
            .iter()
            .enumerate()
        {
            expect_operator(&toks[i], op);
        }
    }

    #[test]
    fn comments_are_skipped() {
        let toks = lex("a // comment with let and fn\nb");
        expect_ident(&toks[0], "a");
        expect_ident(&toks[1], "b");
        assert_eq!(toks[1].line, 2);
    }

    #[test]
    fn string_escapes() {
        let toks = lex(r#""a\n\t\\\"\x41\0""#);
        assert!(toks[0].is_str());
        assert_eq!(toks[0].str_bytes, b"a\n\t\\\"\x41\0");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let toks = lex("\"abc");
        assert_eq!(toks[0].kind, TokenKind::Error);
    }

    #[test]
    fn builtin_references() {
        let toks = lex("@dbg(x)");
        assert_eq!(toks[0].kind, TokenKind::Builtin);
        assert_eq!(toks[0].text, "@dbg");
        expect_operator(&toks[1], "(");
    }

    #[test]
    fn positions_are_one_based() {
        let toks = lex("a\n  b");
        assert_eq!((toks[0].line, toks[0].col), (1, 1));
        assert_eq!((toks[1].line, toks[1].col), (2, 3));
    }
}
