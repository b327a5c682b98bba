//! Tick lexer: character stream to token stream.

use serde::{Deserialize, Serialize};

use crate::chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Ident,
    /// `@`-prefixed builtin reference; `text` keeps the `@`.
    Builtin,
    Int,
    Str,
    Keyword,
    Operator,
    Error,
    Eof,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub line: u32,
    pub col: u32,
    pub kind: TokenKind,
    /// Spelling: identifier or keyword text, operator spelling, or an error
    /// message for `Error` tokens.
    pub text: String,
    pub int_value: u64,
    /// The literal does not fit in `i64`.
    pub is_unsigned: bool,
    pub str_bytes: Vec<u8>,
}

impl Token {
    fn new(line: u32, col: u32, kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            line,
            col,
            kind,
            text: text.into(),
            int_value: 0,
            is_unsigned: false,
            str_bytes: Vec::new(),
        }
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    pub fn is_int(&self) -> bool {
        self.kind == TokenKind::Int
    }

    pub fn is_str(&self) -> bool {
        self.kind == TokenKind::Str
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::Error
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == kw
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }
}

pub const KEYWORDS: &[&str] = &[
    "let", "var", "fn", "pub", "extern", "static", "volatile", "struct", "enum", "union",
    "return", "if", "else", "for", "switch", "case", "default", "break", "continue", "goto",
    "true", "false", "null", "undefined", "and", "or", "orelse", "as", "align", "packed",
];

/// Multi-character operators, longest spellings first.
const OPERATORS2: &[&str] = &[
    "+%", "+|", "-%", "-|", "*%", "*|", "/%", "/|", "<<", ">>", "<=", ">=", "==", "!=", ".?",
    ".{",
];

const OPERATORS1: &[char] = &[
    '+', '-', '*', '/', '%', '&', '|', '^', '<', '>', '=', '!', '~', '(', ')', '{', '}', '[',
    ']', ',', ';', ':', '.', '?',
];

#[derive(Default)]
pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Lexer
    }

    pub fn tokenize(&self, src: &str) -> Vec<Token> {
        Scanner::new(src).run()
    }
}

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> char {
        if self.pos < self.src.len() {
            self.src[self.pos] as char
        } else {
            chars::EOF
        }
    }

    fn peek_at(&self, off: usize) -> char {
        if self.pos + off < self.src.len() {
            self.src[self.pos + off] as char
        } else {
            chars::EOF
        }
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        if c != chars::EOF {
            self.pos += 1;
            if c == chars::NEWLINE {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        c
    }

    fn run(mut self) -> Vec<Token> {
        loop {
            self.skip_trivia();
            let (line, col) = (self.line, self.col);
            let c = self.peek();
            if c == chars::EOF {
                self.tokens.push(Token::new(line, col, TokenKind::Eof, ""));
                break;
            }
            if chars::is_ident_start(c) {
                self.ident(line, col);
            } else if chars::is_digit(c) {
                self.number(line, col);
            } else if c == '@' {
                self.builtin(line, col);
            } else if c == '"' {
                self.string(line, col);
            } else {
                self.operator(line, col);
            }
        }
        self.tokens
    }

    fn skip_trivia(&mut self) {
        loop {
            while chars::is_whitespace(self.peek()) {
                self.advance();
            }
            if self.peek() == '/' && self.peek_at(1) == '/' {
                while self.peek() != chars::NEWLINE && self.peek() != chars::EOF {
                    self.advance();
                }
            } else {
                return;
            }
        }
    }

    fn ident(&mut self, line: u32, col: u32) {
        let start = self.pos;
        while chars::is_ident_part(self.peek()) {
            self.advance();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        let kind = if KEYWORDS.contains(&text) {
            TokenKind::Keyword
        } else {
            TokenKind::Ident
        };
        self.tokens.push(Token::new(line, col, kind, text));
    }

    fn builtin(&mut self, line: u32, col: u32) {
        let start = self.pos;
        self.advance(); // '@'
        if !chars::is_ident_start(self.peek()) {
            self.tokens.push(Token::new(
                line,
                col,
                TokenKind::Error,
                "expected identifier after `@`",
            ));
            return;
        }
        while chars::is_ident_part(self.peek()) {
            self.advance();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        self.tokens
            .push(Token::new(line, col, TokenKind::Builtin, text));
    }

    fn number(&mut self, line: u32, col: u32) {
        let mut value: u64 = 0;
        let mut overflow = false;
        if self.peek() == '0' && (self.peek_at(1) == 'x' || self.peek_at(1) == 'X') {
            self.advance();
            self.advance();
            let mut any = false;
            while chars::is_hex_digit(self.peek()) || self.peek() == '_' {
                let c = self.advance();
                if c == '_' {
                    continue;
                }
                any = true;
                let (v, o1) = value.overflowing_mul(16);
                let (v, o2) = v.overflowing_add(chars::hex_value(c) as u64);
                value = v;
                overflow |= o1 || o2;
            }
            if !any {
                self.tokens.push(Token::new(
                    line,
                    col,
                    TokenKind::Error,
                    "hex literal has no digits",
                ));
                return;
            }
        } else {
            while chars::is_digit(self.peek()) || self.peek() == '_' {
                let c = self.advance();
                if c == '_' {
                    continue;
                }
                let (v, o1) = value.overflowing_mul(10);
                let (v, o2) = v.overflowing_add((c as u8 - b'0') as u64);
                value = v;
                overflow |= o1 || o2;
            }
        }
        if overflow {
            self.tokens.push(Token::new(
                line,
                col,
                TokenKind::Error,
                "integer literal too large",
            ));
            return;
        }
        let mut tok = Token::new(line, col, TokenKind::Int, "");
        tok.int_value = value;
        tok.is_unsigned = value > i64::MAX as u64;
        self.tokens.push(tok);
    }

    fn string(&mut self, line: u32, col: u32) {
        self.advance(); // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                '"' => {
                    self.advance();
                    break;
                }
                chars::EOF | chars::NEWLINE => {
                    self.tokens.push(Token::new(
                        line,
                        col,
                        TokenKind::Error,
                        "unterminated string literal",
                    ));
                    return;
                }
                '\\' => {
                    self.advance();
                    let esc = self.advance();
                    match esc {
                        'n' => bytes.push(b'\n'),
                        'r' => bytes.push(b'\r'),
                        't' => bytes.push(b'\t'),
                        '\\' => bytes.push(b'\\'),
                        '"' => bytes.push(b'"'),
                        '0' => bytes.push(0),
                        'x' => {
                            let hi = self.advance();
                            let lo = self.advance();
                            if !chars::is_hex_digit(hi) || !chars::is_hex_digit(lo) {
                                self.tokens.push(Token::new(
                                    line,
                                    col,
                                    TokenKind::Error,
                                    "invalid \\x escape",
                                ));
                                return;
                            }
                            bytes.push(chars::hex_value(hi) * 16 + chars::hex_value(lo));
                        }
                        _ => {
                            self.tokens.push(Token::new(
                                line,
                                col,
                                TokenKind::Error,
                                format!("unknown escape `\\{}`", esc),
                            ));
                            return;
                        }
                    }
                }
                _ => {
                    bytes.push(self.advance() as u8);
                }
            }
        }
        let mut tok = Token::new(line, col, TokenKind::Str, "");
        tok.str_bytes = bytes;
        self.tokens.push(tok);
    }

    fn operator(&mut self, line: u32, col: u32) {
        for op in OPERATORS2 {
            let b = op.as_bytes();
            if self.peek() == b[0] as char && self.peek_at(1) == b[1] as char {
                self.advance();
                self.advance();
                self.tokens
                    .push(Token::new(line, col, TokenKind::Operator, *op));
                return;
            }
        }
        let c = self.peek();
        if OPERATORS1.contains(&c) {
            self.advance();
            self.tokens
                .push(Token::new(line, col, TokenKind::Operator, c.to_string()));
            return;
        }
        self.advance();
        self.tokens.push(Token::new(
            line,
            col,
            TokenKind::Error,
            format!("unexpected character `{}`", c),
        ));
    }
}
