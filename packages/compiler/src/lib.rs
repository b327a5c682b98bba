#![deny(clippy::all)]

//! Tick compiler library.
//!
//! An ahead-of-time compiler for the Tick systems language. One source file
//! goes in; a public interface file and an implementation file come out,
//! both portable C against the bundled runtime prelude. The pipeline is
//! lexer, parser, analyzer, lowerer, emitter, over one shared tree.

pub mod chars;
pub mod consteval;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod lower;
pub mod scope;
pub mod syntax;
pub mod tree;
pub mod types;

pub mod analyze;

use serde::Serialize;

pub use analyze::{analyze, Analysis};
pub use diagnostics::Diagnostics;
pub use emit::emit_module;
pub use lower::lower;
pub use syntax::{Lexer, Parser};
pub use tree::{NodeArena, NodeId};

/// A compilation carried through some prefix of the pipeline. Tests and the
/// CLI both build on this.
pub struct Compilation {
    pub ast: NodeArena,
    pub module: NodeId,
    pub diagnostics: Diagnostics,
    pub analysis: Option<Analysis>,
}

/// Lex and parse only.
pub fn parse_source(source: &str, file_name: &str) -> Compilation {
    let mut diagnostics = Diagnostics::new(file_name);
    let mut ast = NodeArena::new();
    let tokens = Lexer::new().tokenize(source);
    let module = Parser::new(tokens, &mut ast, &mut diagnostics).parse_module();
    Compilation {
        ast,
        module,
        diagnostics,
        analysis: None,
    }
}

/// Lex, parse, and analyze.
pub fn analyze_source(source: &str, file_name: &str) -> Compilation {
    let mut c = parse_source(source, file_name);
    if !c.diagnostics.has_errors() {
        let analysis = analyze(&mut c.ast, &mut c.diagnostics, c.module);
        c.analysis = Some(analysis);
    }
    c
}

/// Result of one `emitc` run.
#[derive(Debug)]
pub struct EmitcResult {
    /// The interface file text, on success.
    pub interface: Option<String>,
    /// The implementation file text, on success.
    pub implementation: Option<String>,
    /// Rendered diagnostics, in order.
    pub diagnostics: Vec<String>,
    pub success: bool,
    /// JSON dump of the analyzed tree, when requested.
    pub ast_json: Option<String>,
}

#[derive(Serialize)]
struct AstDump<'a> {
    module: NodeId,
    nodes: &'a NodeArena,
}

/// Compile one source file to its two C artifacts. `header_name` is the
/// file name the implementation's `#include` refers to.
pub fn emitc(source: &str, file_name: &str, header_name: &str, dump_ast: bool) -> EmitcResult {
    let mut c = analyze_source(source, file_name);
    if !c.diagnostics.has_errors() {
        lower(&mut c.ast, &mut c.diagnostics);
    }
    let mut interface = None;
    let mut implementation = None;
    if !c.diagnostics.has_errors() {
        let analysis = c.analysis.as_ref().expect("analysis ran without errors");
        match emit_module(&c.ast, &analysis.types, c.module, file_name, header_name) {
            Ok((h, i)) => {
                interface = Some(h);
                implementation = Some(i);
            }
            Err(e) => {
                c.diagnostics
                    .error(diagnostics::Loc::NONE, e.to_string());
            }
        }
    }
    let ast_json = if dump_ast {
        serde_json::to_string_pretty(&AstDump {
            module: c.module,
            nodes: &c.ast,
        })
        .ok()
    } else {
        None
    };
    let success = !c.diagnostics.has_errors();
    EmitcResult {
        interface,
        implementation,
        diagnostics: c.diagnostics.render_all(Some(source)),
        success,
        ast_json,
    }
}
