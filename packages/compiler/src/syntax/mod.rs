//! Lexing and parsing of Tick source.

pub mod lexer;
pub mod parser;

pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
