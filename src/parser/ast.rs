//! AST definitions for the Em language.
//!
//! Nodes are a tagged sum type ([`ExprKind`]) stored in a per-translation-unit
//! arena and addressed through the typed index [`ExprRef`]. Parents own their
//! children through indices, the arena is built by the parser, read-only
//! afterwards, and dropped once IR emission is done.

use super::lexer::TokenKind;
use std::fmt::Write;
use std::rc::Rc;

/// A (file, line, column) position in source code. Lines are 1-based,
/// columns 0-based on the raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: Rc<str>,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Base data type tags of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Unidentified,
    Void,
    Bool,
    Int,
    Float,
    Char,
    Str,
}

impl DataType {
    /// Classify a data-type lexeme. Unknown names map to `Unidentified`.
    pub fn from_lexeme(lexeme: &str) -> DataType {
        match lexeme {
            "void" => DataType::Void,
            "bool" => DataType::Bool,
            "int" => DataType::Int,
            "float" => DataType::Float,
            "char" => DataType::Char,
            "string" => DataType::Str,
            _ => DataType::Unidentified,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Unidentified => "<unidentified>",
            DataType::Void => "void",
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Char => "char",
            DataType::Str => "string",
        };
        f.write_str(name)
    }
}

/// A typed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Char(i8),
    Str(String),
}

impl std::fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralValue::Bool(b) => write!(f, "{}", b),
            LiteralValue::Int(i) => write!(f, "{}", i),
            LiteralValue::Float(x) => write!(f, "{}", x),
            LiteralValue::Char(c) => write!(f, "'{}'", (*c as u8) as char),
            LiteralValue::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// `break` or `continue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
}

impl std::fmt::Display for JumpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            JumpKind::Break => "break",
            JumpKind::Continue => "continue",
        })
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub data_type: DataType,
}

/// Typed index of an expression in its [`ExprArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprRef(u32);

/// The tagged expression variants. Statements are expressions in this
/// language; control flow nodes simply produce no value.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident {
        name: String,
    },
    Literal {
        value: LiteralValue,
    },
    FuncDef {
        return_type: DataType,
        name: String,
        params: Vec<Param>,
        is_prototype: bool,
        body: Vec<ExprRef>,
    },
    If {
        condition: ExprRef,
        then_block: Vec<ExprRef>,
        else_block: Vec<ExprRef>,
    },
    For {
        init: Option<ExprRef>,
        condition: Option<ExprRef>,
        increment: Option<ExprRef>,
        body: Vec<ExprRef>,
    },
    While {
        condition: ExprRef,
        body: Vec<ExprRef>,
    },
    Decl {
        data_type: DataType,
        name: String,
    },
    Unary {
        op: TokenKind,
        operand: ExprRef,
        is_postfix: bool,
    },
    Binary {
        op: TokenKind,
        left: ExprRef,
        right: ExprRef,
    },
    Call {
        callee: String,
        args: Vec<ExprRef>,
    },
    Return {
        value: Option<ExprRef>,
    },
    Jump {
        kind: JumpKind,
    },
    Block {
        body: Vec<ExprRef>,
    },
}

/// An expression node: its variant plus the source position it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLoc,
}

/// Bump arena holding every expression of one translation unit.
#[derive(Debug, Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena::default()
    }

    pub fn alloc(&mut self, expr: Expr) -> ExprRef {
        let index = self.exprs.len() as u32;
        self.exprs.push(expr);
        ExprRef(index)
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

impl std::ops::Index<ExprRef> for ExprArena {
    type Output = Expr;

    fn index(&self, r: ExprRef) -> &Expr {
        &self.exprs[r.0 as usize]
    }
}

/// A parsed translation unit: the arena plus the ordered top-level
/// expressions (function definitions and global declarations).
#[derive(Debug, Default)]
pub struct Ast {
    pub arena: ExprArena,
    pub top_level: Vec<ExprRef>,
}

impl Ast {
    /// Render the tree as indented text, one top-level expression at a time.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (i, &expr) in self.top_level.iter().enumerate() {
            let _ = writeln!(out, "************** :: {} :: **************\n", i + 1);
            self.dump_expr(expr, 0, &mut out);
            out.push('\n');
        }
        out
    }

    fn indent(out: &mut String, level: usize) {
        for _ in 0..2 * level {
            out.push(' ');
        }
    }

    fn dump_body(&self, body: &[ExprRef], level: usize, out: &mut String) {
        for &e in body {
            self.dump_expr(e, level + 1, out);
        }
    }

    fn dump_expr(&self, r: ExprRef, level: usize, out: &mut String) {
        Self::indent(out, level);
        match &self.arena[r].kind {
            ExprKind::Ident { name } => {
                let _ = writeln!(out, "<IDENT, {}>", name);
            }
            ExprKind::Literal { value } => {
                let _ = writeln!(out, "<LITERAL, {}>", value);
            }
            ExprKind::FuncDef {
                return_type,
                name,
                params,
                is_prototype,
                body,
            } => {
                let _ = write!(out, "<FUNC, {}> (", name);
                for param in params {
                    let _ = write!(out, "[{} : {}]", param.name, param.data_type);
                }
                let _ = write!(out, ") -> ({})", return_type);
                if *is_prototype {
                    let _ = writeln!(out, ";");
                    return;
                }
                let _ = writeln!(out, " {{");
                self.dump_body(body, level, out);
                Self::indent(out, level);
                let _ = writeln!(out, "}}");
            }
            ExprKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let _ = writeln!(out, "<IF> (");
                self.dump_expr(*condition, level + 1, out);
                Self::indent(out, level);
                let _ = writeln!(out, ") {{");
                self.dump_body(then_block, level, out);
                Self::indent(out, level);
                let _ = writeln!(out, "}}");
                if !else_block.is_empty() {
                    Self::indent(out, level);
                    let _ = writeln!(out, "<ELSE> {{");
                    self.dump_body(else_block, level, out);
                    Self::indent(out, level);
                    let _ = writeln!(out, "}}");
                }
            }
            ExprKind::For {
                init,
                condition,
                increment,
                body,
            } => {
                let _ = writeln!(out, "<FOR> (");
                for part in [init, condition, increment].into_iter().flatten() {
                    self.dump_expr(*part, level + 1, out);
                }
                Self::indent(out, level);
                let _ = writeln!(out, ") {{");
                self.dump_body(body, level, out);
                Self::indent(out, level);
                let _ = writeln!(out, "}}");
            }
            ExprKind::While { condition, body } => {
                let _ = writeln!(out, "<WHILE> (");
                self.dump_expr(*condition, level + 1, out);
                Self::indent(out, level);
                let _ = writeln!(out, ") {{");
                self.dump_body(body, level, out);
                Self::indent(out, level);
                let _ = writeln!(out, "}}");
            }
            ExprKind::Decl { data_type, name } => {
                let _ = writeln!(out, "<DECL, [{} : {}]>", name, data_type);
            }
            ExprKind::Unary {
                op,
                operand,
                is_postfix,
            } => {
                let fix = if *is_postfix { "POST" } else { "PRE" };
                let _ = writeln!(out, "<UNARY_OP ({}) {}> (", fix, op);
                self.dump_expr(*operand, level + 1, out);
                Self::indent(out, level);
                let _ = writeln!(out, ")");
            }
            ExprKind::Binary { op, left, right } => {
                let _ = writeln!(out, "<BINARY_OP {}> (", op);
                self.dump_expr(*left, level + 1, out);
                self.dump_expr(*right, level + 1, out);
                Self::indent(out, level);
                let _ = writeln!(out, ")");
            }
            ExprKind::Call { callee, args } => {
                let _ = writeln!(out, "<CALL, {}> (", callee);
                self.dump_body(args, level, out);
                Self::indent(out, level);
                let _ = writeln!(out, ")");
            }
            ExprKind::Return { value } => {
                match value {
                    None => {
                        let _ = writeln!(out, "<RETURN> ()");
                    }
                    Some(v) => {
                        let _ = writeln!(out, "<RETURN> (");
                        self.dump_expr(*v, level + 1, out);
                        Self::indent(out, level);
                        let _ = writeln!(out, ")");
                    }
                }
            }
            ExprKind::Jump { kind } => {
                let _ = writeln!(out, "<JUMP, {}>", kind);
            }
            ExprKind::Block { body } => {
                let _ = writeln!(out, "{{");
                self.dump_body(body, level, out);
                Self::indent(out, level);
                let _ = writeln!(out, "}}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_loc() -> SourceLoc {
        SourceLoc {
            file: Rc::from("test.em"),
            line: 1,
            column: 0,
        }
    }

    #[test]
    fn test_arena_indexing() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(Expr {
            kind: ExprKind::Ident {
                name: "x".to_string(),
            },
            loc: dummy_loc(),
        });
        let b = arena.alloc(Expr {
            kind: ExprKind::Literal {
                value: LiteralValue::Int(3),
            },
            loc: dummy_loc(),
        });

        assert_ne!(a, b);
        assert!(matches!(&arena[a].kind, ExprKind::Ident { name } if name == "x"));
        assert!(matches!(
            &arena[b].kind,
            ExprKind::Literal {
                value: LiteralValue::Int(3)
            }
        ));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_dump_shape() {
        let mut ast = Ast::default();
        let lit = ast.arena.alloc(Expr {
            kind: ExprKind::Literal {
                value: LiteralValue::Int(0),
            },
            loc: dummy_loc(),
        });
        let ret = ast.arena.alloc(Expr {
            kind: ExprKind::Return { value: Some(lit) },
            loc: dummy_loc(),
        });
        let func = ast.arena.alloc(Expr {
            kind: ExprKind::FuncDef {
                return_type: DataType::Int,
                name: "main".to_string(),
                params: vec![],
                is_prototype: false,
                body: vec![ret],
            },
            loc: dummy_loc(),
        });
        ast.top_level.push(func);

        let text = ast.dump();
        assert!(text.contains("<FUNC, main> () -> (int) {"));
        assert!(text.contains("<RETURN> ("));
        assert!(text.contains("<LITERAL, 0>"));
    }
}
