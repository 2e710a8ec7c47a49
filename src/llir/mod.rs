//! Target-agnostic low-level IR (LLIR)
//!
//! The emitter lowers the AST into this representation: a [`Module`] holding
//! globals, interned string literals, and functions made of labeled basic
//! blocks. Every block ends in exactly one [`Terminator`] by construction.
//! Values are SSA-shaped: each instruction writing a result gets a fresh
//! [`ValueId`], unique within its function.
//!
//! The textual form (the `Display` impl, LLVM-flavored) is what the driver
//! prints for IR dumps and writes to `.ll` files. Native code generation is
//! the job of an external backend consuming this module.

use std::fmt;

/// Value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Void,
    I1,
    I8,
    I32,
    F32,
    /// Pointer to a byte sequence (the `string` type).
    Ptr,
}

impl Type {
    pub fn is_integer(self) -> bool {
        matches!(self, Type::I1 | Type::I8 | Type::I32)
    }

    /// Bit width used to pick integer cast opcodes.
    fn bits(self) -> u32 {
        match self {
            Type::Void => 0,
            Type::I1 => 1,
            Type::I8 => 8,
            Type::I32 | Type::F32 => 32,
            Type::Ptr => 64,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Void => "void",
            Type::I1 => "i1",
            Type::I8 => "i8",
            Type::I32 => "i32",
            Type::F32 => "float",
            Type::Ptr => "ptr",
        })
    }
}

/// Compile-time constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    Bool(bool),
    I8(i8),
    I32(i32),
    F32(f32),
    Null,
}

impl Constant {
    pub fn ty(self) -> Type {
        match self {
            Constant::Bool(_) => Type::I1,
            Constant::I8(_) => Type::I8,
            Constant::I32(_) => Type::I32,
            Constant::F32(_) => Type::F32,
            Constant::Null => Type::Ptr,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::I8(v) => write!(f, "{}", v),
            Constant::I32(v) => write!(f, "{}", v),
            Constant::F32(v) => write!(f, "{:?}", v),
            Constant::Null => f.write_str("null"),
        }
    }
}

/// An SSA value id, unique within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%v{}", self.0)
    }
}

/// An instruction operand: a value, an incoming function argument, or a
/// constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Value(ValueId),
    /// The n-th parameter of the enclosing function.
    Arg(u32),
    Const(Constant),
}

/// Binary operations. Division, remainder, and right shift are signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    Shl,
    AShr,
    And,
    Or,
    Xor,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::SDiv => "sdiv",
            BinOp::SRem => "srem",
            BinOp::Shl => "shl",
            BinOp::AShr => "ashr",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        })
    }
}

/// Comparisons. Integer comparisons are signed; `FOne` is the
/// ordered-not-equal float comparison used for boolean casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Slt,
    Sgt,
    Sle,
    Sge,
    FOne,
}

/// Block label. Unique within a function.
pub type Label = String;

#[derive(Debug, Clone)]
pub enum Instruction {
    /// Reserve a stack slot: `%dest = alloca ty`.
    Alloca { dest: ValueId, ty: Type },

    /// `store ty val, ptr`.
    Store {
        val: Operand,
        ptr: ValueId,
        ty: Type,
    },

    /// `%dest = load ty, ptr`.
    Load {
        dest: ValueId,
        ptr: ValueId,
        ty: Type,
    },

    /// `%dest = op ty lhs, rhs`.
    BinOp {
        dest: ValueId,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
        ty: Type,
    },

    /// `%dest = icmp/fcmp op ty lhs, rhs`; the result is `i1`.
    Cmp {
        dest: ValueId,
        op: CmpOp,
        lhs: Operand,
        rhs: Operand,
        ty: Type,
    },

    /// Merge node: `%dest = phi ty [ val, label ]...`. Selects among the
    /// incoming values based on the predecessor block control came from.
    Phi {
        dest: ValueId,
        ty: Type,
        incomings: Vec<(Operand, Label)>,
    },

    /// `%dest = call ret @func(args...)`; `dest` is absent for void calls.
    Call {
        dest: Option<ValueId>,
        func: String,
        args: Vec<(Operand, Type)>,
        return_type: Type,
    },

    /// Integer width conversion.
    Cast {
        dest: ValueId,
        src: Operand,
        from_ty: Type,
        to_ty: Type,
    },

    /// `%dest = globaladdr @name`: the address of a global or interned
    /// string literal.
    GlobalAddr { dest: ValueId, name: String },
}

/// Block terminator; exactly one per block.
#[derive(Debug, Clone)]
pub enum Terminator {
    Return(Option<(Operand, Type)>),
    Branch(Label),
    CondBranch {
        cond: Operand,
        then_label: Label,
        else_label: Label,
    },
    Unreachable,
}

/// A basic block: a label, straight-line instructions, one terminator.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub label: Label,
    pub instructions: Vec<Instruction>,
    pub terminator: Terminator,
}

#[derive(Debug, Clone)]
pub struct FuncParam {
    pub name: String,
    pub ty: Type,
}

/// An LLIR function. Declarations (prototypes) carry no blocks.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<FuncParam>,
    pub blocks: Vec<BasicBlock>,
    pub is_declaration: bool,
}

/// Initializer of a module-scope global.
#[derive(Debug, Clone)]
pub enum GlobalInit {
    /// Zero-initialized storage.
    Zero,
    /// A folded scalar constant.
    Scalar(Constant),
    /// The address of an interned string literal.
    StrPtr(Label),
}

/// A module-scope variable with external linkage.
#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub ty: Type,
    pub init: GlobalInit,
}

/// One translation unit's worth of IR. The module name equals the source
/// file name.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    pub target_triple: Option<String>,
    pub globals: Vec<Global>,
    /// Interned string literals: private null-terminated byte arrays,
    /// unnamed-address, align 1.
    pub string_literals: Vec<(Label, String)>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: &str) -> Module {
        Module {
            name: name.to_string(),
            ..Module::default()
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Intern a string literal and return its label.
    pub fn intern_string(&mut self, value: &str) -> Label {
        let label = format!(".str.{}", self.string_literals.len());
        self.string_literals.push((label.clone(), value.to_string()));
        label
    }
}

/// Structural checks run after each function is emitted: block labels are
/// unique, every branch and phi edge targets an existing block, and return
/// arity/type agree with the signature.
pub fn verify_function(func: &Function) -> Result<(), String> {
    if func.is_declaration {
        return Ok(());
    }
    if func.blocks.is_empty() {
        return Err("function body has no basic blocks".to_string());
    }

    let mut labels = std::collections::HashSet::new();
    for block in &func.blocks {
        if !labels.insert(block.label.as_str()) {
            return Err(format!("duplicate block label '{}'", block.label));
        }
    }

    let check_target = |label: &str| -> Result<(), String> {
        if labels.contains(label) {
            Ok(())
        } else {
            Err(format!("branch to unknown block '{}'", label))
        }
    };

    for block in &func.blocks {
        for instr in &block.instructions {
            if let Instruction::Phi { incomings, .. } = instr {
                for (_, label) in incomings {
                    check_target(label)?;
                }
            }
        }
        match &block.terminator {
            Terminator::Branch(target) => check_target(target)?,
            Terminator::CondBranch {
                then_label,
                else_label,
                ..
            } => {
                check_target(then_label)?;
                check_target(else_label)?;
            }
            Terminator::Return(value) => match (value, func.return_type) {
                (None, Type::Void) => {}
                (None, _) => {
                    return Err(format!(
                        "'{}' returns no value but has return type {}",
                        func.name, func.return_type
                    ));
                }
                (Some(_), Type::Void) => {
                    return Err(format!("'{}' returns a value but is void", func.name));
                }
                (Some((_, ty)), expected) if *ty != expected => {
                    return Err(format!(
                        "'{}' returns {} but has return type {}",
                        func.name, ty, expected
                    ));
                }
                _ => {}
            },
            Terminator::Unreachable => {}
        }
    }

    Ok(())
}

// === Textual form ===

fn write_operand(f: &mut fmt::Formatter<'_>, op: &Operand, func: &Function) -> fmt::Result {
    match op {
        Operand::Value(v) => write!(f, "{}", v),
        Operand::Arg(i) => match func.params.get(*i as usize) {
            Some(param) => write!(f, "%{}", param.name),
            None => write!(f, "%arg{}", i),
        },
        Operand::Const(c) => write!(f, "{}", c),
    }
}

fn write_cmp(
    f: &mut fmt::Formatter<'_>,
    op: CmpOp,
    lhs: &Operand,
    rhs: &Operand,
    ty: Type,
    func: &Function,
) -> fmt::Result {
    let (mnemonic, cond) = match op {
        CmpOp::Eq => ("icmp", "eq"),
        CmpOp::Ne => ("icmp", "ne"),
        CmpOp::Slt => ("icmp", "slt"),
        CmpOp::Sgt => ("icmp", "sgt"),
        CmpOp::Sle => ("icmp", "sle"),
        CmpOp::Sge => ("icmp", "sge"),
        CmpOp::FOne => ("fcmp", "one"),
    };
    write!(f, "{} {} {} ", mnemonic, cond, ty)?;
    write_operand(f, lhs, func)?;
    f.write_str(", ")?;
    write_operand(f, rhs, func)
}

fn write_instruction(
    f: &mut fmt::Formatter<'_>,
    instr: &Instruction,
    func: &Function,
) -> fmt::Result {
    f.write_str("  ")?;
    match instr {
        Instruction::Alloca { dest, ty } => write!(f, "{} = alloca {}", dest, ty),
        Instruction::Store { val, ptr, ty } => {
            write!(f, "store {} ", ty)?;
            write_operand(f, val, func)?;
            write!(f, ", ptr {}", ptr)
        }
        Instruction::Load { dest, ptr, ty } => {
            write!(f, "{} = load {}, ptr {}", dest, ty, ptr)
        }
        Instruction::BinOp {
            dest,
            op,
            lhs,
            rhs,
            ty,
        } => {
            write!(f, "{} = {} {} ", dest, op, ty)?;
            write_operand(f, lhs, func)?;
            f.write_str(", ")?;
            write_operand(f, rhs, func)
        }
        Instruction::Cmp {
            dest,
            op,
            lhs,
            rhs,
            ty,
        } => {
            write!(f, "{} = ", dest)?;
            write_cmp(f, *op, lhs, rhs, *ty, func)
        }
        Instruction::Phi {
            dest,
            ty,
            incomings,
        } => {
            write!(f, "{} = phi {} ", dest, ty)?;
            for (i, (value, label)) in incomings.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str("[ ")?;
                write_operand(f, value, func)?;
                write!(f, ", %{} ]", label)?;
            }
            Ok(())
        }
        Instruction::Call {
            dest,
            func: callee,
            args,
            return_type,
        } => {
            if let Some(dest) = dest {
                write!(f, "{} = ", dest)?;
            }
            write!(f, "call {} @{}(", return_type, callee)?;
            for (i, (value, ty)) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} ", ty)?;
                write_operand(f, value, func)?;
            }
            f.write_str(")")
        }
        Instruction::Cast {
            dest,
            src,
            from_ty,
            to_ty,
        } => {
            let op = if from_ty.bits() < to_ty.bits() {
                if *from_ty == Type::I1 {
                    "zext"
                } else {
                    "sext"
                }
            } else if from_ty.bits() > to_ty.bits() {
                "trunc"
            } else {
                "bitcast"
            };
            write!(f, "{} = {} {} ", dest, op, from_ty)?;
            write_operand(f, src, func)?;
            write!(f, " to {}", to_ty)
        }
        Instruction::GlobalAddr { dest, name } => {
            write!(f, "{} = globaladdr @{}", dest, name)
        }
    }
}

fn write_terminator(
    f: &mut fmt::Formatter<'_>,
    term: &Terminator,
    func: &Function,
) -> fmt::Result {
    f.write_str("  ")?;
    match term {
        Terminator::Return(None) => f.write_str("ret void"),
        Terminator::Return(Some((value, ty))) => {
            write!(f, "ret {} ", ty)?;
            write_operand(f, value, func)
        }
        Terminator::Branch(label) => write!(f, "br label %{}", label),
        Terminator::CondBranch {
            cond,
            then_label,
            else_label,
        } => {
            f.write_str("br i1 ")?;
            write_operand(f, cond, func)?;
            write!(f, ", label %{}, label %{}", then_label, else_label)
        }
        Terminator::Unreachable => f.write_str("unreachable"),
    }
}

fn write_function(f: &mut fmt::Formatter<'_>, func: &Function) -> fmt::Result {
    let keyword = if func.is_declaration {
        "declare"
    } else {
        "define"
    };
    write!(f, "{} {} @{}(", keyword, func.return_type, func.name)?;
    for (i, param) in func.params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{} %{}", param.ty, param.name)?;
    }
    if func.is_declaration {
        return writeln!(f, ")");
    }

    writeln!(f, ") {{")?;
    for block in &func.blocks {
        writeln!(f, "{}:", block.label)?;
        for instr in &block.instructions {
            write_instruction(f, instr, func)?;
            writeln!(f)?;
        }
        write_terminator(f, &block.terminator, func)?;
        writeln!(f)?;
    }
    writeln!(f, "}}")
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    let bytes = value.as_bytes();
    write!(
        f,
        "@{} = private unnamed_addr constant [{} x i8] c\"",
        label,
        bytes.len() + 1
    )?;
    for &b in bytes {
        if (b.is_ascii_graphic() || b == b' ') && b != b'"' && b != b'\\' {
            write!(f, "{}", b as char)?;
        } else {
            write!(f, "\\{:02X}", b)?;
        }
    }
    writeln!(f, "\\00\", align 1")
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        if let Some(triple) = &self.target_triple {
            writeln!(f, "target triple = \"{}\"", triple)?;
        }
        if !self.globals.is_empty() || !self.string_literals.is_empty() {
            writeln!(f)?;
        }
        for global in &self.globals {
            match &global.init {
                GlobalInit::Zero => {
                    writeln!(f, "@{} = global {} zeroinitializer", global.name, global.ty)?
                }
                GlobalInit::Scalar(value) => {
                    writeln!(f, "@{} = global {} {}", global.name, global.ty, value)?
                }
                GlobalInit::StrPtr(label) => {
                    writeln!(f, "@{} = global ptr @{}", global.name, label)?
                }
            }
        }
        for (label, value) in &self.string_literals {
            write_string_literal(f, label, value)?;
        }
        for func in &self.functions {
            writeln!(f)?;
            write_function(f, func)?;
        }
        Ok(())
    }
}
