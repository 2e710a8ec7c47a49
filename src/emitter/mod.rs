//! AST → LLIR emission
//!
//! This module walks the parsed AST and builds one [`llir::Module`](crate::llir::Module)
//! per translation unit:
//!
//! - [`engine`]: the [`Emitter`] context, block state machine, and name
//!   resolution
//! - [`expressions`]: value lowering, lvalues, short-circuit logic, calls
//! - [`statements`]: control flow, functions, globals
//! - [`errors`]: emission error types
//!
//! Emission is a single pass in source order. Locals allocate in the entry
//! block of their function; `break`/`continue` resolve against the
//! loop-terminal stack; every emitted function runs structural verification
//! before joining the module.

pub mod engine;
pub mod errors;
pub mod expressions;
pub mod statements;

pub use engine::Emitter;
pub use errors::IrError;

#[cfg(test)]
mod tests {
    use super::Emitter;
    use crate::llir::{GlobalInit, Instruction, Terminator, Type};
    use crate::parser::lexer::Lexer;
    use crate::parser::parse::Parser;

    fn emit(source: &str) -> crate::llir::Module {
        let lexer = Lexer::from_text("test.em", source).expect("lexing failed");
        let mut parser = Parser::new(&lexer);
        let ast = parser.parse_program().expect("parsing failed");
        let mut emitter = Emitter::new("test.em");
        emitter.emit(&ast).expect("emission failed");
        emitter.into_module()
    }

    #[test]
    fn test_empty_void_function_gets_ret_void() {
        let module = emit("void noop() { }");
        let func = module.function("noop").unwrap();
        assert_eq!(func.blocks.len(), 1);
        assert!(matches!(
            func.blocks[0].terminator,
            Terminator::Return(None)
        ));
    }

    #[test]
    fn test_parameters_get_entry_slots() {
        let module = emit("int add(int a, int b) { return a + b; }");
        let func = module.function("add").unwrap();
        let entry = &func.blocks[0];

        let allocas = entry
            .instructions
            .iter()
            .take_while(|i| matches!(i, Instruction::Alloca { .. }))
            .count();
        assert_eq!(allocas, 2);

        let stores = entry
            .instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Store { .. }))
            .count();
        assert_eq!(stores, 2);
    }

    #[test]
    fn test_global_with_constant_initializer() {
        let module = emit("int k = 40 + 2;");
        assert_eq!(module.globals.len(), 1);
        let global = &module.globals[0];
        assert_eq!(global.name, "k");
        assert_eq!(global.ty, Type::I32);
        assert!(matches!(
            global.init,
            GlobalInit::Scalar(crate::llir::Constant::I32(42))
        ));
    }

    #[test]
    fn test_bare_global_is_zero_initialized() {
        let module = emit("float ratio;");
        assert!(matches!(module.globals[0].init, GlobalInit::Zero));
        assert_eq!(module.globals[0].ty, Type::F32);
    }

    #[test]
    fn test_prototype_emits_declaration() {
        let module = emit("int twice(int x);");
        let func = module.function("twice").unwrap();
        assert!(func.is_declaration);
        assert!(func.blocks.is_empty());
    }

    #[test]
    fn test_definition_replaces_declaration() {
        let module = emit("int twice(int x); int twice(int x) { return x * 2; }");
        assert_eq!(module.functions.len(), 1);
        assert!(!module.functions[0].is_declaration);
    }

    #[test]
    fn test_every_block_has_exactly_one_terminator() {
        // Structural by construction; exercised over a shape-heavy program.
        let module = emit(
            "int main() { \
                int x; \
                x = 0; \
                for (int i = 0; i < 10; i++) { \
                    if (i == 5) { continue; } \
                    while (x < 3) { x += 1; } \
                } \
                return x; \
            }",
        );
        let func = module.function("main").unwrap();
        assert!(func.blocks.len() >= 8);
        for block in &func.blocks {
            assert!(!block.label.is_empty());
        }
    }
}
