//! Emitter context and block discipline
//!
//! The [`Emitter`] owns everything emission needs for one translation unit:
//! the module being built, the per-function block state, a scoped map from
//! variable names to their storage, and the loop-terminal stack that
//! `break`/`continue` resolve against. Nothing is global; one emitter is
//! created per source file and consumed when its module is taken.
//!
//! The current basic block is a small state machine: it is *open* while
//! `current_label` is set, and *terminated* once a branch, return, or
//! unreachable has been emitted (at which point the block is pushed and the
//! label cleared). Every control-flow lowering checks [`Emitter::is_terminated`]
//! before emitting its own fallthrough branch, which is the single rule that
//! keeps every block ending in exactly one terminator.

use super::errors::IrError;
use crate::llir::{
    self, BasicBlock, Instruction, Label, Module, Operand, Terminator, Type, ValueId,
};
use crate::parser::ast::{Ast, DataType, ExprKind, SourceLoc};
use rustc_hash::FxHashMap;

/// Where a variable lives: a stack slot in the current function, or a
/// module-scope global addressed by name.
#[derive(Debug, Clone)]
pub(super) enum Place {
    Slot(ValueId),
    Global(String),
}

/// Emitter-side symbol entry: the storage place plus its element type.
#[derive(Debug, Clone)]
pub(super) struct SlotInfo {
    pub place: Place,
    pub ty: Type,
}

/// Targets of `continue` and `break` for the innermost enclosing loop.
#[derive(Debug)]
pub(super) struct LoopTerminals {
    pub continue_target: Label,
    pub break_target: Label,
}

/// State of the function currently being lowered.
#[derive(Debug)]
pub(super) struct FunctionFrame {
    pub name: String,
    pub return_type: Type,
}

/// Lowers one AST into one LLIR [`Module`].
pub struct Emitter {
    pub(super) module: Module,

    // Per-function state
    pub(super) next_value: u32,
    pub(super) next_label: u32,
    pub(super) blocks: Vec<BasicBlock>,
    pub(super) current_label: Option<Label>,
    pub(super) current_instrs: Vec<Instruction>,
    /// Allocas collected during body lowering; spliced to the front of the
    /// entry block when the function is assembled.
    pub(super) entry_allocas: Vec<Instruction>,
    pub(super) current_function: Option<FunctionFrame>,

    // Name resolution
    pub(super) scopes: Vec<FxHashMap<String, SlotInfo>>,
    pub(super) globals: FxHashMap<String, Type>,

    // Loop context for break/continue
    pub(super) loop_terminals: Vec<LoopTerminals>,
}

impl Emitter {
    pub fn new(module_name: &str) -> Emitter {
        Emitter {
            module: Module::new(module_name),
            next_value: 0,
            next_label: 0,
            blocks: Vec::new(),
            current_label: None,
            current_instrs: Vec::new(),
            entry_allocas: Vec::new(),
            current_function: None,
            scopes: Vec::new(),
            globals: FxHashMap::default(),
            loop_terminals: Vec::new(),
        }
    }

    /// Lower the whole translation unit. On error the module holds whatever
    /// was emitted so far; the driver dumps it for inspection.
    pub fn emit(&mut self, ast: &Ast) -> Result<(), IrError> {
        for &top in &ast.top_level {
            let expr = &ast.arena[top];
            match &expr.kind {
                ExprKind::FuncDef { .. } => self.emit_function(ast, top)?,
                ExprKind::Decl { data_type, name } => {
                    self.emit_global(ast, name, *data_type, None, &expr.loc)?
                }
                ExprKind::Binary {
                    op: crate::parser::lexer::TokenKind::Assign,
                    left,
                    right,
                } => match &ast.arena[*left].kind {
                    ExprKind::Decl { data_type, name } => {
                        self.emit_global(ast, name, *data_type, Some(*right), &expr.loc)?
                    }
                    _ => {
                        return Err(IrError::Internal(
                            "top-level assignment without a declaration".to_string(),
                        ))
                    }
                },
                _ => {
                    return Err(IrError::Internal(
                        "unexpected top-level expression kind".to_string(),
                    ))
                }
            }
        }

        debug_assert!(self.scopes.is_empty());
        debug_assert!(self.loop_terminals.is_empty());
        Ok(())
    }

    /// The module built so far. Used by the driver to dump partial IR when
    /// emission fails.
    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn into_module(self) -> Module {
        self.module
    }

    // === Block state machine ===

    pub(super) fn fresh_value(&mut self) -> ValueId {
        let v = ValueId(self.next_value);
        self.next_value += 1;
        v
    }

    pub(super) fn fresh_label(&mut self, prefix: &str) -> Label {
        let label = format!("{}{}", prefix, self.next_label);
        self.next_label += 1;
        label
    }

    pub(super) fn is_terminated(&self) -> bool {
        self.current_label.is_none()
    }

    pub(super) fn current_block_label(&self) -> Result<Label, IrError> {
        self.current_label
            .clone()
            .ok_or_else(|| IrError::Internal("no open block".to_string()))
    }

    pub(super) fn emit_instr(&mut self, instr: Instruction) -> Result<(), IrError> {
        if self.current_label.is_none() {
            return Err(IrError::Internal(
                "instruction emitted into a terminated block".to_string(),
            ));
        }
        self.current_instrs.push(instr);
        Ok(())
    }

    /// Close the open block with `terminator` and push it. Emitting a second
    /// terminator is an internal error; callers check [`Self::is_terminated`]
    /// first.
    pub(super) fn terminate(&mut self, terminator: Terminator) -> Result<(), IrError> {
        let Some(label) = self.current_label.take() else {
            return Err(IrError::Internal(
                "terminator emitted into a terminated block".to_string(),
            ));
        };
        self.blocks.push(BasicBlock {
            label,
            instructions: std::mem::take(&mut self.current_instrs),
            terminator,
        });
        Ok(())
    }

    pub(super) fn start_block(&mut self, label: Label) -> Result<(), IrError> {
        if self.current_label.is_some() {
            return Err(IrError::Internal(format!(
                "block '{}' started while the previous block is still open",
                label
            )));
        }
        self.current_label = Some(label);
        Ok(())
    }

    // === Name resolution ===

    pub(super) fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub(super) fn pop_scope(&mut self) {
        if self.scopes.pop().is_none() {
            panic!("emitter scope stack underflow");
        }
    }

    pub(super) fn define_local(&mut self, name: &str, slot: ValueId, ty: Type) {
        // Redeclaration was already rejected by the parser; an insert here
        // can only shadow an outer scope or replace a loop-local rebind.
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.to_string(),
                SlotInfo {
                    place: Place::Slot(slot),
                    ty,
                },
            );
        }
    }

    /// Search the scope chain innermost-first, then the globals.
    pub(super) fn lookup(&self, name: &str) -> Option<SlotInfo> {
        for scope in self.scopes.iter().rev() {
            if let Some(info) = scope.get(name) {
                return Some(info.clone());
            }
        }
        self.globals.get(name).map(|&ty| SlotInfo {
            place: Place::Global(name.to_string()),
            ty,
        })
    }

    pub(super) fn lookup_or_err(
        &self,
        name: &str,
        loc: &SourceLoc,
    ) -> Result<SlotInfo, IrError> {
        self.lookup(name).ok_or_else(|| IrError::UndefinedIdentifier {
            name: name.to_string(),
            loc: Some(loc.clone()),
        })
    }

    // === Type mapping ===

    pub(super) fn map_type(data_type: DataType) -> Result<Type, IrError> {
        match data_type {
            DataType::Void => Ok(Type::Void),
            DataType::Bool => Ok(Type::I1),
            DataType::Int => Ok(Type::I32),
            DataType::Float => Ok(Type::F32),
            DataType::Char => Ok(Type::I8),
            DataType::Str => Ok(Type::Ptr),
            DataType::Unidentified => Err(IrError::Internal(
                "unidentified data type reached emission".to_string(),
            )),
        }
    }

    /// Allocate a stack slot for a local in the entry block of the enclosing
    /// function and register it in the current scope.
    pub(super) fn alloc_local(&mut self, name: &str, ty: Type) -> ValueId {
        let slot = self.fresh_value();
        self.entry_allocas.push(Instruction::Alloca { dest: slot, ty });
        self.define_local(name, slot, ty);
        slot
    }

    /// Collapse a value to `i1`: identity for booleans, a zero comparison
    /// for integers, ordered-not-equal against 0.0 for floats, a null
    /// comparison for pointers.
    pub(super) fn to_bool(
        &mut self,
        value: Operand,
        ty: Type,
        loc: &SourceLoc,
    ) -> Result<Operand, IrError> {
        let zero = match ty {
            Type::I1 => return Ok(value),
            Type::I8 => llir::Constant::I8(0),
            Type::I32 => llir::Constant::I32(0),
            Type::F32 => llir::Constant::F32(0.0),
            Type::Ptr => llir::Constant::Null,
            Type::Void => {
                return Err(IrError::NonBooleanOperand {
                    loc: Some(loc.clone()),
                })
            }
        };
        let op = if ty == Type::F32 {
            llir::CmpOp::FOne
        } else {
            llir::CmpOp::Ne
        };
        let dest = self.fresh_value();
        self.emit_instr(Instruction::Cmp {
            dest,
            op,
            lhs: value,
            rhs: Operand::Const(zero),
            ty,
        })?;
        Ok(Operand::Value(dest))
    }
}
