//! IR emission error types
//!
//! All emission errors are fatal: the first one aborts the pipeline, and the
//! driver dumps the partially built module to stderr for inspection. A
//! source location is attached where the offending AST node carries one.

use crate::parser::ast::{JumpKind, SourceLoc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IrError {
    #[error("IR ERROR: Undefined identifier '{name}' encountered.")]
    UndefinedIdentifier { name: String, loc: Option<SourceLoc> },

    #[error("IR ERROR: Cannot assign to a non-lvalue expression.")]
    NotAnLvalue { loc: Option<SourceLoc> },

    #[error("IR ERROR: Cannot increment or decrement a non-lvalue expression.")]
    NonLvalueIncrement { loc: Option<SourceLoc> },

    #[error("IR ERROR: '{kind}' cannot be used outside a loop.")]
    JumpOutsideLoop {
        kind: JumpKind,
        loc: Option<SourceLoc>,
    },

    #[error("IR ERROR: Global initializer for '{name}' is not a compile-time constant.")]
    NonConstantGlobalInit { name: String, loc: Option<SourceLoc> },

    #[error("IR ERROR: Return value does not match the return type of function '{function}'.")]
    ReturnTypeMismatch {
        function: String,
        loc: Option<SourceLoc>,
    },

    #[error("IR ERROR: Invalid function call. Unknown function '{name}'.")]
    UnknownFunction { name: String, loc: Option<SourceLoc> },

    #[error("IR ERROR: Function '{name}' called with {got} arguments, expected {expected}.")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        got: usize,
        loc: Option<SourceLoc>,
    },

    #[error("IR ERROR: Redefinition of function '{name}'.")]
    FunctionRedefinition { name: String, loc: Option<SourceLoc> },

    #[error("IR ERROR: Non-boolean type in logical expression.")]
    NonBooleanOperand { loc: Option<SourceLoc> },

    #[error("IR ERROR: Invalid operand type for unary operator.")]
    InvalidUnaryOperand { loc: Option<SourceLoc> },

    #[error("IR ERROR: Invalid binary operator encountered.")]
    InvalidBinaryOperator { loc: Option<SourceLoc> },

    #[error("IR ERROR: Function '{function}' could not be verified: {reason}")]
    Verification { function: String, reason: String },

    /// An invariant of the emitter itself was violated; this is a compiler
    /// bug, not a user error.
    #[error("IR ERROR (internal): {0}")]
    Internal(String),
}

impl IrError {
    pub fn loc(&self) -> Option<&SourceLoc> {
        match self {
            IrError::UndefinedIdentifier { loc, .. }
            | IrError::NotAnLvalue { loc }
            | IrError::NonLvalueIncrement { loc }
            | IrError::JumpOutsideLoop { loc, .. }
            | IrError::NonConstantGlobalInit { loc, .. }
            | IrError::ReturnTypeMismatch { loc, .. }
            | IrError::UnknownFunction { loc, .. }
            | IrError::ArgumentCountMismatch { loc, .. }
            | IrError::FunctionRedefinition { loc, .. }
            | IrError::NonBooleanOperand { loc }
            | IrError::InvalidUnaryOperand { loc }
            | IrError::InvalidBinaryOperator { loc } => loc.as_ref(),
            IrError::Verification { .. } | IrError::Internal(_) => None,
        }
    }
}
