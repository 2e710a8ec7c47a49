//! Expression lowering
//!
//! Every value-producing node lowers to an `(operand, type)` pair. Two entry
//! points exist for lvalue-capable expressions: [`Emitter::lower_value`]
//! loads from storage, [`Emitter::lower_address`] yields the storage slot
//! itself (used by assignments and increment/decrement).
//!
//! `&&` and `||` lower to short-circuit control flow ending in a phi merge:
//! the short-circuit constant flows in from the block that skipped the right
//! operand, the right operand's boolean form from the block that evaluated
//! it.

use super::engine::{Emitter, Place};
use super::errors::IrError;
use crate::llir::{BinOp, CmpOp, Constant, Instruction, Operand, Type, ValueId};
use crate::parser::ast::{Ast, ExprKind, ExprRef, LiteralValue, SourceLoc};
use crate::parser::expressions::{op_prec, Precedence};
use crate::parser::lexer::TokenKind;

impl Emitter {
    /// Lower an expression to a value.
    pub(super) fn lower_value(
        &mut self,
        ast: &Ast,
        expr: ExprRef,
    ) -> Result<(Operand, Type), IrError> {
        let node = &ast.arena[expr];
        let loc = node.loc.clone();

        match &node.kind {
            ExprKind::Literal { value } => self.lower_literal(value),

            ExprKind::Ident { name } => {
                let info = self.lookup_or_err(name, &loc)?;
                let ptr = self.place_to_ptr(&info.place)?;
                let dest = self.fresh_value();
                self.emit_instr(Instruction::Load {
                    dest,
                    ptr,
                    ty: info.ty,
                })?;
                Ok((Operand::Value(dest), info.ty))
            }

            ExprKind::Decl { data_type, name } => {
                let ty = Self::map_type(*data_type)?;
                let slot = self.alloc_local(name, ty);
                Ok((Operand::Value(slot), Type::Ptr))
            }

            ExprKind::Unary {
                op,
                operand,
                is_postfix,
            } => self.lower_unary(ast, *op, *operand, *is_postfix, &loc),

            ExprKind::Binary { op, left, right } => {
                self.lower_binary(ast, *op, *left, *right, &loc)
            }

            ExprKind::Call { callee, args } => self.lower_call(ast, callee, args, &loc),

            _ => Err(IrError::Internal(
                "statement node reached expression lowering".to_string(),
            )),
        }
    }

    /// Lower an lvalue expression to the address of its storage, plus the
    /// stored element type. Only identifiers and fresh declarations denote
    /// storage.
    pub(super) fn lower_address(
        &mut self,
        ast: &Ast,
        expr: ExprRef,
    ) -> Result<(ValueId, Type), IrError> {
        let node = &ast.arena[expr];
        match &node.kind {
            ExprKind::Ident { name } => {
                let info = self.lookup_or_err(name, &node.loc)?;
                let ptr = self.place_to_ptr(&info.place)?;
                Ok((ptr, info.ty))
            }
            ExprKind::Decl { data_type, name } => {
                let ty = Self::map_type(*data_type)?;
                let slot = self.alloc_local(name, ty);
                Ok((slot, ty))
            }
            _ => Err(IrError::NotAnLvalue {
                loc: Some(node.loc.clone()),
            }),
        }
    }

    /// A stack slot is already a pointer; a global needs its address taken.
    fn place_to_ptr(&mut self, place: &Place) -> Result<ValueId, IrError> {
        match place {
            Place::Slot(slot) => Ok(*slot),
            Place::Global(name) => {
                let dest = self.fresh_value();
                self.emit_instr(Instruction::GlobalAddr {
                    dest,
                    name: name.clone(),
                })?;
                Ok(dest)
            }
        }
    }

    fn lower_literal(&mut self, value: &LiteralValue) -> Result<(Operand, Type), IrError> {
        let constant = match value {
            LiteralValue::Bool(b) => Constant::Bool(*b),
            LiteralValue::Int(i) => Constant::I32(*i),
            LiteralValue::Float(x) => Constant::F32(*x),
            LiteralValue::Char(c) => Constant::I8(*c),
            LiteralValue::Str(s) => {
                // In function context a string literal is a pointer to the
                // interned byte array.
                let label = self.module.intern_string(s);
                let dest = self.fresh_value();
                self.emit_instr(Instruction::GlobalAddr { dest, name: label })?;
                return Ok((Operand::Value(dest), Type::Ptr));
            }
        };
        Ok((Operand::Const(constant), constant.ty()))
    }

    fn lower_unary(
        &mut self,
        ast: &Ast,
        op: TokenKind,
        operand: ExprRef,
        is_postfix: bool,
        loc: &SourceLoc,
    ) -> Result<(Operand, Type), IrError> {
        match op {
            TokenKind::Not => {
                let (value, ty) = self.lower_value(ast, operand)?;
                let zero = Self::int_const(ty, 0).ok_or_else(|| IrError::InvalidUnaryOperand {
                    loc: Some(loc.clone()),
                })?;
                let dest = self.fresh_value();
                self.emit_instr(Instruction::Cmp {
                    dest,
                    op: CmpOp::Eq,
                    lhs: value,
                    rhs: Operand::Const(zero),
                    ty,
                })?;
                Ok((Operand::Value(dest), Type::I1))
            }

            TokenKind::BitNot => {
                let (value, ty) = self.lower_value(ast, operand)?;
                let all_ones =
                    Self::int_const(ty, -1).ok_or_else(|| IrError::InvalidUnaryOperand {
                        loc: Some(loc.clone()),
                    })?;
                let dest = self.fresh_value();
                self.emit_instr(Instruction::BinOp {
                    dest,
                    op: BinOp::Xor,
                    lhs: value,
                    rhs: Operand::Const(all_ones),
                    ty,
                })?;
                Ok((Operand::Value(dest), ty))
            }

            TokenKind::Increment | TokenKind::Decrement => {
                // Increment/decrement needs the address of its operand, so
                // only plain identifiers qualify.
                if !matches!(ast.arena[operand].kind, ExprKind::Ident { .. }) {
                    return Err(IrError::NonLvalueIncrement {
                        loc: Some(loc.clone()),
                    });
                }
                let (ptr, ty) = self.lower_address(ast, operand)?;
                if !matches!(ty, Type::I8 | Type::I32) {
                    return Err(IrError::InvalidUnaryOperand {
                        loc: Some(loc.clone()),
                    });
                }

                let old = self.fresh_value();
                self.emit_instr(Instruction::Load { dest: old, ptr, ty })?;

                let delta = if op == TokenKind::Increment { 1 } else { -1 };
                let one = Self::int_const(ty, delta).ok_or_else(|| {
                    IrError::InvalidUnaryOperand {
                        loc: Some(loc.clone()),
                    }
                })?;
                let new = self.fresh_value();
                self.emit_instr(Instruction::BinOp {
                    dest: new,
                    op: BinOp::Add,
                    lhs: Operand::Value(old),
                    rhs: Operand::Const(one),
                    ty,
                })?;
                self.emit_instr(Instruction::Store {
                    val: Operand::Value(new),
                    ptr,
                    ty,
                })?;

                // Postfix yields the old value, prefix the new one.
                let result = if is_postfix { old } else { new };
                Ok((Operand::Value(result), ty))
            }

            _ => Err(IrError::InvalidUnaryOperand {
                loc: Some(loc.clone()),
            }),
        }
    }

    fn lower_binary(
        &mut self,
        ast: &Ast,
        op: TokenKind,
        left: ExprRef,
        right: ExprRef,
        loc: &SourceLoc,
    ) -> Result<(Operand, Type), IrError> {
        // Logical && and || short-circuit: the right side only evaluates
        // when the left side did not already decide the result.
        if op == TokenKind::And {
            return self.lower_short_circuit(ast, left, right, true, loc);
        }
        if op == TokenKind::Or {
            return self.lower_short_circuit(ast, left, right, false, loc);
        }

        if op_prec(op) == Precedence::Assignment {
            return self.lower_assignment(ast, op, left, right, loc);
        }

        let (lhs, lhs_ty) = self.lower_value(ast, left)?;
        let (rhs, _) = self.lower_value(ast, right)?;

        if let Some(bin_op) = Self::pure_bin_op(op) {
            let dest = self.fresh_value();
            self.emit_instr(Instruction::BinOp {
                dest,
                op: bin_op,
                lhs,
                rhs,
                ty: lhs_ty,
            })?;
            return Ok((Operand::Value(dest), lhs_ty));
        }

        if let Some(cmp_op) = Self::cmp_op(op) {
            let dest = self.fresh_value();
            self.emit_instr(Instruction::Cmp {
                dest,
                op: cmp_op,
                lhs,
                rhs,
                ty: lhs_ty,
            })?;
            return Ok((Operand::Value(dest), Type::I1));
        }

        Err(IrError::InvalidBinaryOperator {
            loc: Some(loc.clone()),
        })
    }

    /// `=` stores the right value through the left address; compound
    /// assignments load the current value, apply the operation, and store
    /// the result back. The expression value is the stored value for `=`
    /// and the new value for compound forms.
    fn lower_assignment(
        &mut self,
        ast: &Ast,
        op: TokenKind,
        left: ExprRef,
        right: ExprRef,
        loc: &SourceLoc,
    ) -> Result<(Operand, Type), IrError> {
        let (ptr, elem_ty) = self.lower_address(ast, left)?;
        let (rhs, rhs_ty) = self.lower_value(ast, right)?;

        if op == TokenKind::Assign {
            self.emit_instr(Instruction::Store {
                val: rhs,
                ptr,
                ty: elem_ty,
            })?;
            return Ok((rhs, rhs_ty));
        }

        let bin_op = match op {
            TokenKind::PlusEq => BinOp::Add,
            TokenKind::MinusEq => BinOp::Sub,
            TokenKind::MultiplyEq => BinOp::Mul,
            TokenKind::DivideEq => BinOp::SDiv,
            TokenKind::ModEq => BinOp::SRem,
            TokenKind::LshiftEq => BinOp::Shl,
            TokenKind::RshiftEq => BinOp::AShr,
            // The logical compound forms collapse to their bitwise
            // counterparts: there is nothing to short-circuit once the
            // target has to be read anyway.
            TokenKind::AndEq | TokenKind::BitAndEq => BinOp::And,
            TokenKind::OrEq | TokenKind::BitOrEq => BinOp::Or,
            TokenKind::XorEq => BinOp::Xor,
            _ => {
                return Err(IrError::InvalidBinaryOperator {
                    loc: Some(loc.clone()),
                })
            }
        };

        let current = self.fresh_value();
        self.emit_instr(Instruction::Load {
            dest: current,
            ptr,
            ty: elem_ty,
        })?;

        let result = self.fresh_value();
        self.emit_instr(Instruction::BinOp {
            dest: result,
            op: bin_op,
            lhs: Operand::Value(current),
            rhs,
            ty: elem_ty,
        })?;
        self.emit_instr(Instruction::Store {
            val: Operand::Value(result),
            ptr,
            ty: elem_ty,
        })?;

        Ok((Operand::Value(result), elem_ty))
    }

    fn lower_short_circuit(
        &mut self,
        ast: &Ast,
        left: ExprRef,
        right: ExprRef,
        is_and: bool,
        loc: &SourceLoc,
    ) -> Result<(Operand, Type), IrError> {
        let (right_label, end_label) = if is_and {
            (self.fresh_label("andright"), self.fresh_label("andend"))
        } else {
            (self.fresh_label("orright"), self.fresh_label("orend"))
        };

        let (lhs, lhs_ty) = self.lower_value(ast, left)?;
        let lhs_bool = self.to_bool(lhs, lhs_ty, loc)?;
        // The phi's first edge comes from wherever the left operand finished
        // evaluating, which is not necessarily where it started.
        let left_block = self.current_block_label()?;

        if is_and {
            self.terminate(crate::llir::Terminator::CondBranch {
                cond: lhs_bool,
                then_label: right_label.clone(),
                else_label: end_label.clone(),
            })?;
        } else {
            self.terminate(crate::llir::Terminator::CondBranch {
                cond: lhs_bool,
                then_label: end_label.clone(),
                else_label: right_label.clone(),
            })?;
        }

        self.start_block(right_label)?;
        let (rhs, rhs_ty) = self.lower_value(ast, right)?;
        let rhs_bool = self.to_bool(rhs, rhs_ty, loc)?;
        let right_block = self.current_block_label()?;
        self.terminate(crate::llir::Terminator::Branch(end_label.clone()))?;

        self.start_block(end_label)?;
        let dest = self.fresh_value();
        let short_value = Operand::Const(Constant::Bool(!is_and));
        self.emit_instr(Instruction::Phi {
            dest,
            ty: Type::I1,
            incomings: vec![(short_value, left_block), (rhs_bool, right_block)],
        })?;

        Ok((Operand::Value(dest), Type::I1))
    }

    fn lower_call(
        &mut self,
        ast: &Ast,
        callee: &str,
        args: &[ExprRef],
        loc: &SourceLoc,
    ) -> Result<(Operand, Type), IrError> {
        let Some(func) = self.module.function(callee) else {
            return Err(IrError::UnknownFunction {
                name: callee.to_string(),
                loc: Some(loc.clone()),
            });
        };
        let return_type = func.return_type;
        let expected = func.params.len();

        if args.len() != expected {
            return Err(IrError::ArgumentCountMismatch {
                name: callee.to_string(),
                expected,
                got: args.len(),
                loc: Some(loc.clone()),
            });
        }

        let mut lowered = Vec::with_capacity(args.len());
        for &arg in args {
            lowered.push(self.lower_value(ast, arg)?);
        }

        let dest = if return_type == Type::Void {
            None
        } else {
            Some(self.fresh_value())
        };
        self.emit_instr(Instruction::Call {
            dest,
            func: callee.to_string(),
            args: lowered,
            return_type,
        })?;

        let value = match dest {
            Some(v) => Operand::Value(v),
            None => Operand::Const(Constant::I32(0)),
        };
        Ok((value, return_type))
    }

    /// An integer constant of the given type, or `None` for non-integers.
    fn int_const(ty: Type, value: i32) -> Option<Constant> {
        match ty {
            Type::I1 => Some(Constant::Bool(value != 0)),
            Type::I8 => Some(Constant::I8(value as i8)),
            Type::I32 => Some(Constant::I32(value)),
            _ => None,
        }
    }

    fn pure_bin_op(op: TokenKind) -> Option<BinOp> {
        match op {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Divide => Some(BinOp::SDiv),
            TokenKind::Mod => Some(BinOp::SRem),
            TokenKind::Lshift => Some(BinOp::Shl),
            TokenKind::Rshift => Some(BinOp::AShr),
            TokenKind::Ampersand => Some(BinOp::And),
            TokenKind::BitOr => Some(BinOp::Or),
            TokenKind::Xor => Some(BinOp::Xor),
            _ => None,
        }
    }

    fn cmp_op(op: TokenKind) -> Option<CmpOp> {
        match op {
            TokenKind::Equal => Some(CmpOp::Eq),
            TokenKind::NotEq => Some(CmpOp::Ne),
            TokenKind::Less => Some(CmpOp::Slt),
            TokenKind::Greater => Some(CmpOp::Sgt),
            TokenKind::LessEq => Some(CmpOp::Sle),
            TokenKind::GreaterEq => Some(CmpOp::Sge),
            _ => None,
        }
    }
}
