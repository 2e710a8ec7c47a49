//! Statement and function lowering
//!
//! Control flow lowers to labeled blocks in the shapes described by the
//! block names: `then`/`else`/`ifend`, `whilecond`/`whilebody`/`whileend`,
//! `forcond`/`forbody`/`forinc`/`forend`. Loop headers push a loop-terminal
//! pair that `break` and `continue` branch to; for a `for` loop the continue
//! target is the increment block, so increments still run on `continue`.

use super::engine::{Emitter, FunctionFrame, LoopTerminals};
use super::errors::IrError;
use crate::llir::{
    self, Constant, FuncParam, Function, Global, GlobalInit, Instruction, Operand, Terminator,
    Type,
};
use crate::parser::ast::{Ast, DataType, ExprKind, ExprRef, JumpKind, LiteralValue, SourceLoc};
use crate::parser::lexer::TokenKind;

impl Emitter {
    /// Lower one statement. Expression statements are evaluated for their
    /// side effects and the value discarded.
    pub(super) fn lower_stmt(&mut self, ast: &Ast, expr: ExprRef) -> Result<(), IrError> {
        match &ast.arena[expr].kind {
            ExprKind::If {
                condition,
                then_block,
                else_block,
            } => self.lower_if(ast, *condition, then_block, else_block),

            ExprKind::While { condition, body } => self.lower_while(ast, *condition, body),

            ExprKind::For {
                init,
                condition,
                increment,
                body,
            } => self.lower_for(ast, *init, *condition, *increment, body),

            ExprKind::Return { value } => self.lower_return(ast, *value, &ast.arena[expr].loc),

            ExprKind::Jump { kind } => self.lower_jump(*kind, &ast.arena[expr].loc),

            ExprKind::Block { body } => {
                self.push_scope();
                let result = self.lower_body(ast, body);
                self.pop_scope();
                result
            }

            ExprKind::FuncDef { .. } => Err(IrError::Internal(
                "nested function definition reached statement lowering".to_string(),
            )),

            _ => self.lower_value(ast, expr).map(|_| ()),
        }
    }

    /// Lower the statements of a block in order. Statements after the first
    /// `return` or `break`/`continue` are unreachable and skipped; a jump
    /// leaves its fresh `jumpend` block open so the caller's fallthrough
    /// branch stays well-formed.
    pub(super) fn lower_body(&mut self, ast: &Ast, body: &[ExprRef]) -> Result<(), IrError> {
        for &stmt in body {
            self.lower_stmt(ast, stmt)?;
            // A return (directly or from inside a nested block) terminates
            // the current block; a jump leaves its jumpend open but the
            // source statements after it are unreachable either way.
            if self.is_terminated() || matches!(ast.arena[stmt].kind, ExprKind::Jump { .. }) {
                break;
            }
        }
        Ok(())
    }

    fn lower_if(
        &mut self,
        ast: &Ast,
        condition: ExprRef,
        then_block: &[ExprRef],
        else_block: &[ExprRef],
    ) -> Result<(), IrError> {
        let cond_loc = ast.arena[condition].loc.clone();
        let (cond, cond_ty) = self.lower_value(ast, condition)?;
        let cond_bool = self.to_bool(cond, cond_ty, &cond_loc)?;

        let then_label = self.fresh_label("then");
        let else_label = self.fresh_label("else");
        let end_label = self.fresh_label("ifend");

        self.terminate(Terminator::CondBranch {
            cond: cond_bool,
            then_label: then_label.clone(),
            else_label: else_label.clone(),
        })?;

        self.start_block(then_label)?;
        self.lower_body(ast, then_block)?;
        if !self.is_terminated() {
            self.terminate(Terminator::Branch(end_label.clone()))?;
        }

        self.start_block(else_label)?;
        self.lower_body(ast, else_block)?;
        if !self.is_terminated() {
            self.terminate(Terminator::Branch(end_label.clone()))?;
        }

        self.start_block(end_label)
    }

    fn lower_while(
        &mut self,
        ast: &Ast,
        condition: ExprRef,
        body: &[ExprRef],
    ) -> Result<(), IrError> {
        let cond_label = self.fresh_label("whilecond");
        let body_label = self.fresh_label("whilebody");
        let end_label = self.fresh_label("whileend");

        self.terminate(Terminator::Branch(cond_label.clone()))?;

        self.start_block(cond_label.clone())?;
        let cond_loc = ast.arena[condition].loc.clone();
        let (cond, cond_ty) = self.lower_value(ast, condition)?;
        let cond_bool = self.to_bool(cond, cond_ty, &cond_loc)?;

        self.loop_terminals.push(LoopTerminals {
            continue_target: cond_label.clone(),
            break_target: end_label.clone(),
        });

        self.terminate(Terminator::CondBranch {
            cond: cond_bool,
            then_label: body_label.clone(),
            else_label: end_label.clone(),
        })?;

        self.start_block(body_label)?;
        self.lower_body(ast, body)?;
        if !self.is_terminated() {
            // The backward edge targets the condition block.
            self.terminate(Terminator::Branch(cond_label))?;
        }

        self.loop_terminals.pop();
        self.start_block(end_label)
    }

    fn lower_for(
        &mut self,
        ast: &Ast,
        init: Option<ExprRef>,
        condition: Option<ExprRef>,
        increment: Option<ExprRef>,
        body: &[ExprRef],
    ) -> Result<(), IrError> {
        if let Some(init) = init {
            self.lower_value(ast, init)?;
        }

        let cond_label = self.fresh_label("forcond");
        let body_label = self.fresh_label("forbody");
        let inc_label = self.fresh_label("forinc");
        let end_label = self.fresh_label("forend");

        self.terminate(Terminator::Branch(cond_label.clone()))?;

        self.start_block(cond_label.clone())?;
        let cond_bool = match condition {
            Some(condition) => {
                let cond_loc = ast.arena[condition].loc.clone();
                let (cond, cond_ty) = self.lower_value(ast, condition)?;
                self.to_bool(cond, cond_ty, &cond_loc)?
            }
            // An absent condition is always true.
            None => Operand::Const(Constant::Bool(true)),
        };

        // continue runs the increment; break leaves the loop.
        self.loop_terminals.push(LoopTerminals {
            continue_target: inc_label.clone(),
            break_target: end_label.clone(),
        });

        self.terminate(Terminator::CondBranch {
            cond: cond_bool,
            then_label: body_label.clone(),
            else_label: end_label.clone(),
        })?;

        self.start_block(body_label)?;
        self.lower_body(ast, body)?;
        if !self.is_terminated() {
            self.terminate(Terminator::Branch(inc_label.clone()))?;
        }

        self.start_block(inc_label)?;
        if let Some(increment) = increment {
            self.lower_value(ast, increment)?;
        }
        self.terminate(Terminator::Branch(cond_label))?;

        self.loop_terminals.pop();
        self.start_block(end_label)
    }

    fn lower_return(
        &mut self,
        ast: &Ast,
        value: Option<ExprRef>,
        loc: &SourceLoc,
    ) -> Result<(), IrError> {
        let frame = self
            .current_function
            .as_ref()
            .ok_or_else(|| IrError::Internal("return outside of a function".to_string()))?;
        let function = frame.name.clone();
        let return_type = frame.return_type;

        let Some(value) = value else {
            return self.terminate(Terminator::Return(None));
        };

        let (mut operand, ty) = self.lower_value(ast, value)?;
        if ty != return_type {
            // Integer widths adjust silently; anything else is a hard
            // mismatch.
            if ty.is_integer() && return_type.is_integer() {
                let dest = self.fresh_value();
                self.emit_instr(Instruction::Cast {
                    dest,
                    src: operand,
                    from_ty: ty,
                    to_ty: return_type,
                })?;
                operand = Operand::Value(dest);
            } else {
                return Err(IrError::ReturnTypeMismatch {
                    function,
                    loc: Some(loc.clone()),
                });
            }
        }

        self.terminate(Terminator::Return(Some((operand, return_type))))
    }

    fn lower_jump(&mut self, kind: JumpKind, loc: &SourceLoc) -> Result<(), IrError> {
        let Some(terminals) = self.loop_terminals.last() else {
            return Err(IrError::JumpOutsideLoop {
                kind,
                loc: Some(loc.clone()),
            });
        };

        let target = match kind {
            JumpKind::Break => terminals.break_target.clone(),
            JumpKind::Continue => terminals.continue_target.clone(),
        };
        self.terminate(Terminator::Branch(target))?;

        // Open a fresh block so trailing statements in the source block
        // remain well-formed IR; the backend discards the dead code.
        let label = self.fresh_label("jumpend");
        self.start_block(label)
    }

    /// Lower a function definition or prototype into the module.
    pub(super) fn emit_function(&mut self, ast: &Ast, expr: ExprRef) -> Result<(), IrError> {
        let node = &ast.arena[expr];
        let ExprKind::FuncDef {
            return_type,
            name,
            params,
            is_prototype,
            body,
        } = &node.kind
        else {
            return Err(IrError::Internal(
                "emit_function called on a non-function node".to_string(),
            ));
        };

        let return_type = Self::map_type(*return_type)?;
        let func_params: Vec<FuncParam> = params
            .iter()
            .map(|p| {
                Ok(FuncParam {
                    name: p.name.clone(),
                    ty: Self::map_type(p.data_type)?,
                })
            })
            .collect::<Result<_, IrError>>()?;

        if *is_prototype {
            // A prototype after the definition (or a repeat) adds nothing.
            if self.module.function(name).is_none() {
                self.module.functions.push(Function {
                    name: name.clone(),
                    return_type,
                    params: func_params,
                    blocks: vec![],
                    is_declaration: true,
                });
            }
            return Ok(());
        }

        if let Some(index) = self.module.functions.iter().position(|f| f.name == *name) {
            if self.module.functions[index].is_declaration {
                // The definition replaces its forward declaration.
                self.module.functions.remove(index);
            } else {
                return Err(IrError::FunctionRedefinition {
                    name: name.clone(),
                    loc: Some(node.loc.clone()),
                });
            }
        }

        // Reset per-function state.
        self.next_value = 0;
        self.next_label = 0;
        self.blocks.clear();
        self.current_instrs.clear();
        self.entry_allocas.clear();
        self.current_function = Some(FunctionFrame {
            name: name.clone(),
            return_type,
        });

        self.push_scope();
        self.start_block("entry".to_string())?;

        // Each parameter gets a stack slot in the entry block; the incoming
        // argument is stored into it and the name bound to the slot.
        for (index, param) in func_params.iter().enumerate() {
            let slot = self.alloc_local(&param.name, param.ty);
            self.emit_instr(Instruction::Store {
                val: Operand::Arg(index as u32),
                ptr: slot,
                ty: param.ty,
            })?;
        }

        self.lower_body(ast, body)?;

        // A void function may fall off the end; it gets its `ret void`. A
        // non-void fall-through (or a dead join block) ends in unreachable.
        if !self.is_terminated() {
            if return_type == Type::Void {
                self.terminate(Terminator::Return(None))?;
            } else {
                self.terminate(Terminator::Unreachable)?;
            }
        }

        self.pop_scope();
        self.current_function = None;

        let mut blocks = std::mem::take(&mut self.blocks);
        // Allocas land at the start of the entry block, ahead of the
        // parameter stores and body code.
        blocks[0]
            .instructions
            .splice(0..0, std::mem::take(&mut self.entry_allocas));

        let function = Function {
            name: name.clone(),
            return_type,
            params: func_params,
            blocks,
            is_declaration: false,
        };

        llir::verify_function(&function).map_err(|reason| IrError::Verification {
            function: name.clone(),
            reason,
        })?;

        self.module.functions.push(function);
        Ok(())
    }

    /// Lower a module-scope declaration into a global with external linkage.
    /// A bare declaration zero-initializes; an initializer must fold to a
    /// compile-time constant.
    pub(super) fn emit_global(
        &mut self,
        ast: &Ast,
        name: &str,
        data_type: DataType,
        init: Option<ExprRef>,
        loc: &SourceLoc,
    ) -> Result<(), IrError> {
        let ty = Self::map_type(data_type)?;

        let init = match init {
            None => GlobalInit::Zero,
            Some(init) => {
                // Global string initializers intern the literal and point
                // at it.
                if let ExprKind::Literal {
                    value: LiteralValue::Str(s),
                } = &ast.arena[init].kind
                {
                    GlobalInit::StrPtr(self.module.intern_string(s))
                } else {
                    match Self::fold_constant(ast, init) {
                        Some(constant) => GlobalInit::Scalar(constant),
                        None => {
                            return Err(IrError::NonConstantGlobalInit {
                                name: name.to_string(),
                                loc: Some(loc.clone()),
                            })
                        }
                    }
                }
            }
        };

        self.globals.insert(name.to_string(), ty);
        self.module.globals.push(Global {
            name: name.to_string(),
            ty,
            init,
        });
        Ok(())
    }

    /// Fold an initializer expression to a constant, or `None` when it is
    /// not compile-time evaluable.
    fn fold_constant(ast: &Ast, expr: ExprRef) -> Option<Constant> {
        match &ast.arena[expr].kind {
            ExprKind::Literal { value } => match value {
                LiteralValue::Bool(b) => Some(Constant::Bool(*b)),
                LiteralValue::Int(i) => Some(Constant::I32(*i)),
                LiteralValue::Float(x) => Some(Constant::F32(*x)),
                LiteralValue::Char(c) => Some(Constant::I8(*c)),
                LiteralValue::Str(_) => None,
            },

            ExprKind::Unary {
                op,
                operand,
                is_postfix: false,
            } => {
                let value = Self::fold_int(Self::fold_constant(ast, *operand)?)?;
                match op {
                    TokenKind::Not => Some(Constant::Bool(value == 0)),
                    TokenKind::BitNot => Some(Constant::I32(!value)),
                    _ => None,
                }
            }

            ExprKind::Binary { op, left, right } => {
                let lhs = Self::fold_int(Self::fold_constant(ast, *left)?)?;
                let rhs = Self::fold_int(Self::fold_constant(ast, *right)?)?;
                let int = |v: i32| Some(Constant::I32(v));
                let boolean = |v: bool| Some(Constant::Bool(v));
                match op {
                    TokenKind::Plus => int(lhs.wrapping_add(rhs)),
                    TokenKind::Minus => int(lhs.wrapping_sub(rhs)),
                    TokenKind::Star => int(lhs.wrapping_mul(rhs)),
                    TokenKind::Divide => int(lhs.checked_div(rhs)?),
                    TokenKind::Mod => int(lhs.checked_rem(rhs)?),
                    TokenKind::Lshift => int(lhs.wrapping_shl(rhs as u32)),
                    TokenKind::Rshift => int(lhs.wrapping_shr(rhs as u32)),
                    TokenKind::Ampersand => int(lhs & rhs),
                    TokenKind::BitOr => int(lhs | rhs),
                    TokenKind::Xor => int(lhs ^ rhs),
                    TokenKind::And => boolean(lhs != 0 && rhs != 0),
                    TokenKind::Or => boolean(lhs != 0 || rhs != 0),
                    TokenKind::Equal => boolean(lhs == rhs),
                    TokenKind::NotEq => boolean(lhs != rhs),
                    TokenKind::Less => boolean(lhs < rhs),
                    TokenKind::LessEq => boolean(lhs <= rhs),
                    TokenKind::Greater => boolean(lhs > rhs),
                    TokenKind::GreaterEq => boolean(lhs >= rhs),
                    _ => None,
                }
            }

            _ => None,
        }
    }

    fn fold_int(constant: Constant) -> Option<i32> {
        match constant {
            Constant::Bool(b) => Some(b as i32),
            Constant::I8(v) => Some(v as i32),
            Constant::I32(v) => Some(v),
            _ => None,
        }
    }
}
