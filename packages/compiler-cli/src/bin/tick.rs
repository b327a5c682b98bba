//! Tick compiler CLI.

use std::path::Path;
use std::process;

use anyhow::Context;
use clap::{Arg, ArgAction, Command};

fn main() {
    let matches = Command::new("tick")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tick compiler")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("emitc")
                .about("Compile a Tick source file to C")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .value_name("INPUT")
                        .help("Tick source file"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .required(true)
                        .value_name("BASENAME")
                        .help("Output basename; writes <BASENAME>.h and <BASENAME>.c"),
                )
                .arg(
                    Arg::new("dump-ast")
                        .long("dump-ast")
                        .action(ArgAction::SetTrue)
                        .help("Print the analyzed tree as JSON to stdout"),
                ),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("emitc") {
        let input = matches.get_one::<String>("input").unwrap();
        let output = matches.get_one::<String>("output").unwrap();
        let dump_ast = matches.get_flag("dump-ast");
        match run_emitc(input, output, dump_ast) {
            Ok(true) => {}
            Ok(false) => process::exit(1),
            Err(e) => {
                eprintln!("error: {:#}", e);
                process::exit(1);
            }
        }
    }
}

fn run_emitc(input: &str, output: &str, dump_ast: bool) -> anyhow::Result<bool> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("reading `{}`", input))?;
    let header_path = format!("{}.h", output);
    let impl_path = format!("{}.c", output);
    // the implementation's #include carries the file name, not the path
    let header_name = Path::new(&header_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| header_path.clone());

    let result = tick_compiler::emitc(&source, input, &header_name, dump_ast);

    for diag in &result.diagnostics {
        eprintln!("{}", diag);
    }
    if let Some(json) = &result.ast_json {
        println!("{}", json);
    }
    if !result.success {
        return Ok(false);
    }
    let interface = result.interface.expect("interface text on success");
    let implementation = result.implementation.expect("implementation text on success");
    std::fs::write(&header_path, interface)
        .with_context(|| format!("writing `{}`", header_path))?;
    std::fs::write(&impl_path, implementation)
        .with_context(|| format!("writing `{}`", impl_path))?;
    Ok(true)
}
