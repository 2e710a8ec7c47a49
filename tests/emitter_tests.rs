// End-to-end tests for IR emission: source text in, LLIR module out.

use emc::driver::{self, CompileOptions};
use emc::emitter::{Emitter, IrError};
use emc::llir::{
    BasicBlock, BinOp, CmpOp, Constant, Function, GlobalInit, Instruction, Module, Operand,
    Terminator, Type,
};
use emc::parser::lexer::Lexer;
use emc::parser::parse::Parser;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn emit(source: &str) -> Module {
    try_emit(source).expect("emission failed")
}

fn try_emit(source: &str) -> Result<Module, IrError> {
    let lexer = Lexer::from_text("test.em", source).expect("lexing failed");
    let mut parser = Parser::new(&lexer);
    let ast = parser.parse_program().expect("parsing failed");
    let mut emitter = Emitter::new("test.em");
    emitter.emit(&ast)?;
    Ok(emitter.into_module())
}

fn block<'a>(func: &'a Function, prefix: &str) -> &'a BasicBlock {
    func.blocks
        .iter()
        .find(|b| b.label.starts_with(prefix))
        .unwrap_or_else(|| panic!("no block labeled '{}*' in {}", prefix, func.name))
}

#[test]
fn test_add_function() {
    let module = emit("int add(int a, int b) { return a + b; }");

    let func = module.function("add").expect("missing function 'add'");
    assert_eq!(func.params.len(), 2);
    assert!(func.params.iter().all(|p| p.ty == Type::I32));
    assert_eq!(func.return_type, Type::I32);

    // The body stack-allocates slots for both parameters and stores the
    // incoming arguments into them.
    let entry = &func.blocks[0];
    assert!(matches!(entry.instructions[0], Instruction::Alloca { ty: Type::I32, .. }));
    assert!(matches!(entry.instructions[1], Instruction::Alloca { ty: Type::I32, .. }));
    assert!(matches!(
        entry.instructions[2],
        Instruction::Store {
            val: Operand::Arg(0),
            ..
        }
    ));
    assert!(matches!(
        entry.instructions[3],
        Instruction::Store {
            val: Operand::Arg(1),
            ..
        }
    ));

    // Two loads feed one add, whose result is returned.
    let adds: Vec<_> = entry
        .instructions
        .iter()
        .filter_map(|i| match i {
            Instruction::BinOp { op: BinOp::Add, dest, .. } => Some(*dest),
            _ => None,
        })
        .collect();
    assert_eq!(adds.len(), 1);
    assert!(matches!(
        entry.terminator,
        Terminator::Return(Some((Operand::Value(v), Type::I32))) if v == adds[0]
    ));
}

#[test]
fn test_while_loop_shape() {
    let module = emit("int main() { int x; x = 3; while (x < 10) { x += 1; } return x; }");
    let func = module.function("main").unwrap();

    // Entry: one allocation, one initial store, branch into the header.
    let entry = &func.blocks[0];
    assert_eq!(
        entry
            .instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Alloca { .. }))
            .count(),
        1
    );
    assert!(entry.instructions.iter().any(|i| matches!(
        i,
        Instruction::Store {
            val: Operand::Const(Constant::I32(3)),
            ..
        }
    )));
    let cond_label = match &entry.terminator {
        Terminator::Branch(label) => label.clone(),
        other => panic!("expected branch into the loop header, got {:?}", other),
    };
    assert!(cond_label.starts_with("whilecond"));

    // Header: load, signed-less-than against 10, conditional branch.
    let cond = block(func, "whilecond");
    assert!(cond.instructions.iter().any(|i| matches!(
        i,
        Instruction::Cmp {
            op: CmpOp::Slt,
            rhs: Operand::Const(Constant::I32(10)),
            ..
        }
    )));
    assert!(matches!(cond.terminator, Terminator::CondBranch { .. }));

    // Body: load/add/store, and the backward edge targets the condition
    // block.
    let body = block(func, "whilebody");
    assert!(body
        .instructions
        .iter()
        .any(|i| matches!(i, Instruction::BinOp { op: BinOp::Add, .. })));
    assert!(matches!(
        &body.terminator,
        Terminator::Branch(label) if *label == cond_label
    ));

    // Exit: the final load feeds the return.
    let end = block(func, "whileend");
    assert!(matches!(
        end.terminator,
        Terminator::Return(Some((_, Type::I32)))
    ));
}

#[test]
fn test_short_circuit_and() {
    let module = emit("int f(int a) { if (a && a < 5) return 1; else return 0; }");
    let func = module.function("f").unwrap();

    // The right operand evaluates in its own block.
    let right = block(func, "andright");
    assert!(right
        .instructions
        .iter()
        .any(|i| matches!(i, Instruction::Cmp { op: CmpOp::Slt, .. })));

    // The merge block selects between constant-false (left was zero) and
    // the right operand's boolean form.
    let merge = block(func, "andend");
    let Some(Instruction::Phi { incomings, ty, .. }) = merge.instructions.first() else {
        panic!("expected the merge block to start with a phi");
    };
    assert_eq!(*ty, Type::I1);
    assert_eq!(incomings.len(), 2);
    assert!(incomings
        .iter()
        .any(|(v, label)| *v == Operand::Const(Constant::Bool(false)) && label == "entry"));
    assert!(incomings.iter().any(|(_, label)| label.starts_with("andright")));

    // The phi feeds the if's conditional branch.
    assert!(matches!(merge.terminator, Terminator::CondBranch { .. }));
}

#[test]
fn test_for_loop_break_targets_forend() {
    let module = emit("int main() { for (int i = 0; i < 3; i++) { if (i == 2) break; } return 0; }");
    let func = module.function("main").unwrap();

    // break branches straight to the loop end, bypassing the increment.
    let then = block(func, "then");
    assert!(matches!(
        &then.terminator,
        Terminator::Branch(label) if label.starts_with("forend")
    ));

    // The increment block runs i++ and loops back to the condition.
    let inc = block(func, "forinc");
    assert!(inc
        .instructions
        .iter()
        .any(|i| matches!(i, Instruction::BinOp { op: BinOp::Add, .. })));
    assert!(matches!(
        &inc.terminator,
        Terminator::Branch(label) if label.starts_with("forcond")
    ));

    // Only the body falls through into the increment.
    let body = block(func, "forbody");
    let ifend = block(func, "ifend");
    assert!(matches!(
        &ifend.terminator,
        Terminator::Branch(label) if label.starts_with("forinc")
    ));
    assert!(matches!(body.terminator, Terminator::CondBranch { .. }));
}

#[test]
fn test_import_resolves_across_files() {
    let unit = driver::compile_file(&fixture("main_import.em"), &CompileOptions::default())
        .expect("compilation failed");

    // Both functions live in one module; the call site resolves g by name.
    assert!(unit.module.function("g").is_some());
    let main = unit.module.function("main").unwrap();
    assert!(main.blocks[0].instructions.iter().any(|i| matches!(
        i,
        Instruction::Call { func, args, .. } if func == "g" && args.len() == 1
    )));
    assert_eq!(unit.total_lines, 4);
}

#[test]
fn test_global_with_initializer_and_load() {
    let module = emit("int k = 42; int get() { return k; }");

    assert_eq!(module.globals.len(), 1);
    let global = &module.globals[0];
    assert_eq!(global.name, "k");
    assert!(matches!(global.init, GlobalInit::Scalar(Constant::I32(42))));

    // The function takes the global's address and loads through it.
    let func = module.function("get").unwrap();
    let entry = &func.blocks[0];
    assert!(matches!(
        &entry.instructions[0],
        Instruction::GlobalAddr { name, .. } if name == "k"
    ));
    assert!(matches!(entry.instructions[1], Instruction::Load { ty: Type::I32, .. }));
}

#[test]
fn test_global_string_initializer() {
    let module = emit("string greeting = \"hello\";");
    assert!(matches!(&module.globals[0].init, GlobalInit::StrPtr(label) if label == ".str.0"));
    assert_eq!(module.string_literals[0].1, "hello");
}

#[test]
fn test_non_constant_global_initializer_is_an_error() {
    let err = try_emit("int k = 2; int j = k;").unwrap_err();
    assert!(matches!(err, IrError::NonConstantGlobalInit { name, .. } if name == "j"));
}

#[test]
fn test_break_outside_loop_is_an_error() {
    let err = try_emit("int main() { break; return 0; }").unwrap_err();
    assert!(matches!(err, IrError::JumpOutsideLoop { .. }));
}

#[test]
fn test_undefined_identifier_is_an_error() {
    let err = try_emit("int main() { return y; }").unwrap_err();
    assert!(matches!(err, IrError::UndefinedIdentifier { name, .. } if name == "y"));
}

#[test]
fn test_identifier_is_gone_after_its_scope_ends() {
    let err = try_emit("int main() { { int x; } x = 1; return 0; }").unwrap_err();
    assert!(matches!(err, IrError::UndefinedIdentifier { name, .. } if name == "x"));
}

#[test]
fn test_unknown_function_call_is_an_error() {
    let err = try_emit("int main() { return missing(); }").unwrap_err();
    assert!(matches!(err, IrError::UnknownFunction { name, .. } if name == "missing"));
}

#[test]
fn test_call_arity_mismatch_is_an_error() {
    let err = try_emit("int f(int a) { return a; } int main() { return f(1, 2); }").unwrap_err();
    assert!(matches!(
        err,
        IrError::ArgumentCountMismatch {
            expected: 1,
            got: 2,
            ..
        }
    ));
}

#[test]
fn test_empty_for_clauses_make_an_infinite_loop() {
    let module = emit("void spin() { for (;;) { } }");
    let func = module.function("spin").unwrap();

    // An absent condition lowers to constant-true in the header.
    let cond = block(func, "forcond");
    assert!(matches!(
        cond.terminator,
        Terminator::CondBranch {
            cond: Operand::Const(Constant::Bool(true)),
            ..
        }
    ));
}

#[test]
fn test_self_assignment_loads_then_stores() {
    let module = emit("int main() { int x; x = x; return x; }");
    let entry = &module.function("main").unwrap().blocks[0];

    // x = x: a load from the slot, then a store of that very value back.
    let load_dest = entry.instructions.iter().find_map(|i| match i {
        Instruction::Load { dest, .. } => Some(*dest),
        _ => None,
    });
    let store_val = entry.instructions.iter().find_map(|i| match i {
        Instruction::Store {
            val: Operand::Value(v),
            ..
        } => Some(*v),
        _ => None,
    });
    assert_eq!(load_dest, store_val);
    assert!(load_dest.is_some());
}

#[test]
fn test_return_widens_and_narrows_integers() {
    // char → int widens; int literal → char narrows.
    let module = emit("int widen(char c) { return c; } char narrow() { return 300; }");

    let widen = module.function("widen").unwrap();
    assert!(widen.blocks[0].instructions.iter().any(|i| matches!(
        i,
        Instruction::Cast {
            from_ty: Type::I8,
            to_ty: Type::I32,
            ..
        }
    )));

    let narrow = module.function("narrow").unwrap();
    assert!(narrow.blocks[0].instructions.iter().any(|i| matches!(
        i,
        Instruction::Cast {
            from_ty: Type::I32,
            to_ty: Type::I8,
            ..
        }
    )));
}

#[test]
fn test_non_integer_return_mismatch_is_an_error() {
    let err = try_emit("int main() { return \"text\"; }").unwrap_err();
    assert!(matches!(err, IrError::ReturnTypeMismatch { .. }));
}

#[test]
fn test_postfix_and_prefix_increment_values() {
    let module = emit("int main() { int x; x = 1; int a; a = x++; int b; b = ++x; return a + b; }");
    let entry = &module.function("main").unwrap().blocks[0];

    // Each increment loads the old value, adds one, and stores back.
    let incs = entry
        .instructions
        .iter()
        .filter(|i| {
            matches!(
                i,
                Instruction::BinOp {
                    op: BinOp::Add,
                    rhs: Operand::Const(Constant::I32(1)),
                    ..
                }
            )
        })
        .count();
    assert_eq!(incs, 2);
}

#[test]
fn test_compound_assignment_signed_semantics() {
    let module = emit(
        "int main() { int x; x = 100; x /= 3; x %= 7; x >>= 1; x <<= 2; x &&= 1; return x; }",
    );
    let entry = &module.function("main").unwrap().blocks[0];

    let has_op = |op: BinOp| {
        entry
            .instructions
            .iter()
            .any(|i| matches!(i, Instruction::BinOp { op: o, .. } if *o == op))
    };
    assert!(has_op(BinOp::SDiv));
    assert!(has_op(BinOp::SRem));
    assert!(has_op(BinOp::AShr));
    assert!(has_op(BinOp::Shl));
    assert!(has_op(BinOp::And));
}

#[test]
fn test_emission_is_idempotent() {
    let source = "int k = 1; int f(int a) { return a + k; } int main() { return f(41); }";
    let lexer = Lexer::from_text("test.em", source).expect("lexing failed");
    let mut parser = Parser::new(&lexer);
    let ast = parser.parse_program().expect("parsing failed");

    let emit_once = || {
        let mut emitter = Emitter::new("test.em");
        emitter.emit(&ast).expect("emission failed");
        emitter.into_module()
    };
    let first = emit_once();
    let second = emit_once();

    assert_eq!(first.functions.len(), second.functions.len());
    assert_eq!(first.globals.len(), second.globals.len());
    for (a, b) in first.functions.iter().zip(second.functions.iter()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.blocks.len(), b.blocks.len());
        for (x, y) in a.blocks.iter().zip(b.blocks.iter()) {
            assert_eq!(x.label, y.label);
            assert_eq!(x.instructions.len(), y.instructions.len());
        }
    }
}

#[test]
fn test_textual_ir_output() {
    let module = emit("int add(int a, int b) { return a + b; }");
    let text = module.to_string();

    assert!(text.contains("; ModuleID = 'test.em'"));
    assert!(text.contains("define i32 @add(i32 %a, i32 %b) {"));
    assert!(text.contains("entry:"));
    assert!(text.contains("store i32 %a"));
    assert!(text.contains(" = add i32 "));
    assert!(text.contains("ret i32 "));
}
