//! Per-file compilation pipeline.
//!
//! One call to [`compile_file`] runs lex → parse → emit for a single
//! translation unit and hands back the finished LLIR module together with
//! the post-inclusion line count. Each unit gets a fresh emitter, so nothing
//! is shared across files; multi-file orchestration and native code
//! generation stay with the caller.

use crate::emitter::Emitter;
use crate::error::CompileError;
use crate::llir::Module;
use crate::parser::lexer::Lexer;
use crate::parser::parse::Parser;
use std::path::Path;

/// Toggles for the debugging dumps.
#[derive(Debug, Default, Clone)]
pub struct CompileOptions {
    /// Print the AST after parsing.
    pub dump_ast: bool,
    /// Print the IR after emission.
    pub dump_ir: bool,
}

/// The result of compiling one source file.
#[derive(Debug)]
pub struct CompiledUnit {
    pub module: Module,
    /// Effective line count after `#import` inclusion.
    pub total_lines: u32,
}

/// Compile one `.em` file into an LLIR module. The module is named after
/// the source file.
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<CompiledUnit, CompileError> {
    let lexer = Lexer::from_file(path)?;

    let mut parser = Parser::new(&lexer);
    let ast = parser.parse_program()?;

    if options.dump_ast {
        print!("{}", ast.dump());
    }

    let mut emitter = Emitter::new(&lexer.file_name().to_string());
    if let Err(error) = emitter.emit(&ast) {
        // Emission errors dump whatever was built so far.
        eprintln!("***************** :: partial IR :: *****************\n");
        eprintln!("{}", emitter.module());
        return Err(error.into());
    }
    let module = emitter.into_module();

    if options.dump_ir {
        println!("***************** :: LLIR :: *****************\n");
        println!("{}", module);
    }

    Ok(CompiledUnit {
        module,
        total_lines: lexer.total_lines(),
    })
}
