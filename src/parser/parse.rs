//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing
//! infrastructure: the error type, token-cursor helpers, and the top-level
//! entry point. The grammar itself is split across focused modules:
//!
//! - `expressions`: operator precedence climbing over the token stream
//! - `statements`: statement dispatch, function definitions, blocks
//!
//! Parser methods are implemented in `impl Parser` blocks across these files
//! so each module extends the parser with related functionality while
//! sharing its state.

use super::ast::{Ast, DataType, Expr, ExprKind, ExprRef, SourceLoc};
use super::lexer::{Lexer, Token, TokenKind};
use super::stream::TokenStream;
use crate::symtab::SymbolTable;
use std::rc::Rc;
use thiserror::Error;

/// Parser error type. All variants are fatal and carry the position of the
/// offending token.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("SYNTAX ERROR: Insufficient tokens for function definition.")]
    IncompleteFunctionDef { loc: SourceLoc },

    #[error("SYNTAX ERROR: Missing delimiter ';' at the end of the statement.")]
    MissingDelimiter { loc: SourceLoc },

    #[error("SYNTAX ERROR: Incomplete function call expression.")]
    IncompleteCall { loc: SourceLoc },

    #[error("SYNTAX ERROR: Invalid expression. Used ';' in an expression that is not a statement.")]
    DelimiterInExpression { loc: SourceLoc },

    #[error("SYNTAX ERROR: Expected {expected}, found {found}.")]
    Expected {
        expected: String,
        found: String,
        loc: SourceLoc,
    },

    #[error("SYNTAX ERROR: Redeclaration of '{name}' in the same scope.")]
    Redeclaration { name: String, loc: SourceLoc },

    #[error("SYNTAX ERROR: Redefinition of function '{name}'.")]
    FuncRedefinition { name: String, loc: SourceLoc },

    #[error("SYNTAX ERROR: Variables cannot be declared with type '{data_type}'.")]
    InvalidDeclType {
        data_type: DataType,
        loc: SourceLoc,
    },

    #[error("SYNTAX ERROR: Invalid numeric literal '{lexeme}'.")]
    BadNumericLiteral { lexeme: String, loc: SourceLoc },

    #[error("SYNTAX ERROR: Unexpected end of input.")]
    UnexpectedEof { loc: SourceLoc },
}

impl ParseError {
    pub fn loc(&self) -> &SourceLoc {
        match self {
            ParseError::IncompleteFunctionDef { loc }
            | ParseError::MissingDelimiter { loc }
            | ParseError::IncompleteCall { loc }
            | ParseError::DelimiterInExpression { loc }
            | ParseError::Expected { loc, .. }
            | ParseError::Redeclaration { loc, .. }
            | ParseError::FuncRedefinition { loc, .. }
            | ParseError::InvalidDeclType { loc, .. }
            | ParseError::BadNumericLiteral { loc, .. }
            | ParseError::UnexpectedEof { loc } => loc,
        }
    }
}

/// Precedence-climbing parser for Em.
pub struct Parser<'a> {
    pub(super) stream: TokenStream<'a>,
    pub(super) symbols: SymbolTable,
    pub(super) arena: super::ast::ExprArena,
    file_name: Rc<str>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: &'a Lexer) -> Parser<'a> {
        Parser {
            stream: lexer.stream(),
            symbols: SymbolTable::new(),
            arena: super::ast::ExprArena::new(),
            file_name: lexer.file_name().clone(),
        }
    }

    /// Parse the whole translation unit. Top-level expressions are function
    /// definitions, global declarations, or global declarations with a
    /// constant initializer.
    pub fn parse_program(&mut self) -> Result<Ast, ParseError> {
        let mut top_level = Vec::new();

        while !self.stream.at_end() {
            top_level.push(self.parse_top_level()?);
        }

        debug_assert_eq!(self.symbols.scope_depth(), 0);

        Ok(Ast {
            arena: std::mem::take(&mut self.arena),
            top_level,
        })
    }

    fn parse_top_level(&mut self) -> Result<ExprRef, ParseError> {
        if self.peek_kind(0) != Some(TokenKind::DataType) {
            return Err(self.err_expected("a type at the top level"));
        }

        // `DataType Ident (` starts a function definition or prototype;
        // anything else is a global declaration statement.
        if self.peek_kind(1) == Some(TokenKind::Identifier)
            && self.peek_kind(2) == Some(TokenKind::LeftParen)
        {
            return self.parse_function_def();
        }

        let loc = self.current_loc();
        let expr = self.parse_subexpr(super::expressions::Precedence::Min, TokenKind::Delimiter)?;
        self.expect_delimiter()?;

        let valid = match &self.arena[expr].kind {
            ExprKind::Decl { .. } => true,
            ExprKind::Binary {
                op: TokenKind::Assign,
                left,
                ..
            } => matches!(self.arena[*left].kind, ExprKind::Decl { .. }),
            _ => false,
        };
        if !valid {
            return Err(ParseError::Expected {
                expected: "a declaration or function definition at the top level".to_string(),
                found: "an expression".to_string(),
                loc,
            });
        }

        Ok(expr)
    }

    // === Token access helpers ===

    pub(super) fn peek_kind(&self, offset: usize) -> Option<TokenKind> {
        self.stream.peek(offset).map(|t| t.kind)
    }

    pub(super) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind(0) == Some(kind)
    }

    pub(super) fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.stream.skip();
            true
        } else {
            false
        }
    }

    pub(super) fn at_keyword(&self, keyword: &str) -> bool {
        matches!(
            self.stream.peek(0),
            Some(t) if t.kind == TokenKind::Keyword && t.lexeme == keyword
        )
    }

    /// Position of the current token, or of the end of input.
    pub(super) fn current_loc(&self) -> SourceLoc {
        if let Some(token) = self.stream.peek(0) {
            return token.loc.clone();
        }
        if let Some(token) = self.stream.peek_prev() {
            return token.loc.clone();
        }
        SourceLoc {
            file: self.file_name.clone(),
            line: 1,
            column: 0,
        }
    }

    pub(super) fn expect(
        &mut self,
        kind: TokenKind,
        expected: &str,
    ) -> Result<&'a Token, ParseError> {
        match self.stream.peek(0) {
            Some(token) if token.kind == kind => {
                self.stream.skip();
                Ok(token)
            }
            _ => Err(self.err_expected(expected)),
        }
    }

    /// Statements must end with `';'`; anything else is the mandated
    /// missing-delimiter error.
    pub(super) fn expect_delimiter(&mut self) -> Result<(), ParseError> {
        if self.match_kind(TokenKind::Delimiter) {
            Ok(())
        } else {
            Err(ParseError::MissingDelimiter {
                loc: self.current_loc(),
            })
        }
    }

    pub(super) fn err_expected(&self, expected: &str) -> ParseError {
        let (found, loc) = match self.stream.peek(0) {
            Some(token) => (token.to_string(), token.loc.clone()),
            None => ("end of input".to_string(), self.current_loc()),
        };
        ParseError::Expected {
            expected: expected.to_string(),
            found,
            loc,
        }
    }

    pub(super) fn alloc(&mut self, kind: ExprKind, loc: SourceLoc) -> ExprRef {
        self.arena.alloc(Expr { kind, loc })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{JumpKind, LiteralValue};

    fn parse(source: &str) -> Result<Ast, ParseError> {
        let lexer = Lexer::from_text("test.em", source).expect("lexing failed");
        let mut parser = Parser::new(&lexer);
        parser.parse_program()
    }

    #[test]
    fn test_parse_simple_function() {
        let ast = parse("int main() { return 0; }").unwrap();

        assert_eq!(ast.top_level.len(), 1);
        match &ast.arena[ast.top_level[0]].kind {
            ExprKind::FuncDef {
                name,
                params,
                return_type,
                is_prototype,
                body,
            } => {
                assert_eq!(name, "main");
                assert!(params.is_empty());
                assert_eq!(*return_type, DataType::Int);
                assert!(!is_prototype);
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected function definition, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_prototype() {
        let ast = parse("int add(int a, int b);").unwrap();

        match &ast.arena[ast.top_level[0]].kind {
            ExprKind::FuncDef {
                is_prototype, body, ..
            } => {
                assert!(is_prototype);
                assert!(body.is_empty());
            }
            other => panic!("expected prototype, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_shape() {
        // 1 + 2 * 3 must parse as 1 + (2 * 3).
        let ast = parse("int main() { int x; x = 1 + 2 * 3; return x; }").unwrap();
        let body = match &ast.arena[ast.top_level[0]].kind {
            ExprKind::FuncDef { body, .. } => body.clone(),
            _ => panic!("expected function"),
        };

        let assign = &ast.arena[body[1]].kind;
        let ExprKind::Binary {
            op: TokenKind::Assign,
            right,
            ..
        } = assign
        else {
            panic!("expected assignment, got {:?}", assign);
        };
        let ExprKind::Binary {
            op: TokenKind::Plus,
            left: add_left,
            right: add_right,
        } = &ast.arena[*right].kind
        else {
            panic!("expected '+' at the root of the initializer");
        };
        assert!(matches!(
            ast.arena[*add_left].kind,
            ExprKind::Literal {
                value: LiteralValue::Int(1)
            }
        ));
        assert!(matches!(
            ast.arena[*add_right].kind,
            ExprKind::Binary {
                op: TokenKind::Star,
                ..
            }
        ));
    }

    #[test]
    fn test_left_associativity() {
        // 10 - 4 - 3 must parse as (10 - 4) - 3.
        let ast = parse("int main() { return 10 - 4 - 3; }").unwrap();
        let body = match &ast.arena[ast.top_level[0]].kind {
            ExprKind::FuncDef { body, .. } => body.clone(),
            _ => panic!("expected function"),
        };
        let ExprKind::Return { value: Some(v) } = &ast.arena[body[0]].kind else {
            panic!("expected return");
        };
        let ExprKind::Binary {
            op: TokenKind::Minus,
            left,
            right,
        } = &ast.arena[*v].kind
        else {
            panic!("expected '-' at the root");
        };
        assert!(matches!(
            ast.arena[*left].kind,
            ExprKind::Binary {
                op: TokenKind::Minus,
                ..
            }
        ));
        assert!(matches!(
            ast.arena[*right].kind,
            ExprKind::Literal {
                value: LiteralValue::Int(3)
            }
        ));
    }

    #[test]
    fn test_if_else_and_jumps() {
        let ast = parse(
            "int main() { while (1) { if (2) break; else continue; } return 0; }",
        )
        .unwrap();
        let body = match &ast.arena[ast.top_level[0]].kind {
            ExprKind::FuncDef { body, .. } => body.clone(),
            _ => panic!("expected function"),
        };
        let ExprKind::While { body: loop_body, .. } = &ast.arena[body[0]].kind else {
            panic!("expected while");
        };
        let ExprKind::If {
            then_block,
            else_block,
            ..
        } = &ast.arena[loop_body[0]].kind
        else {
            panic!("expected if");
        };
        assert!(matches!(
            ast.arena[then_block[0]].kind,
            ExprKind::Jump {
                kind: JumpKind::Break
            }
        ));
        assert!(matches!(
            ast.arena[else_block[0]].kind,
            ExprKind::Jump {
                kind: JumpKind::Continue
            }
        ));
    }

    #[test]
    fn test_global_declaration() {
        let ast = parse("int k = 42;").unwrap();
        match &ast.arena[ast.top_level[0]].kind {
            ExprKind::Binary {
                op: TokenKind::Assign,
                left,
                ..
            } => {
                assert!(matches!(
                    ast.arena[*left].kind,
                    ExprKind::Decl {
                        data_type: DataType::Int,
                        ..
                    }
                ));
            }
            other => panic!("expected global initializer, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_delimiter_error() {
        let err = parse("int main() { return 0 }").unwrap_err();
        assert!(matches!(err, ParseError::MissingDelimiter { .. }));
    }

    #[test]
    fn test_delimiter_inside_expression_error() {
        let err = parse("int main() { return (1 + 2; ); }").unwrap_err();
        assert!(matches!(err, ParseError::DelimiterInExpression { .. }));
    }

    #[test]
    fn test_redeclaration_error() {
        let err = parse("int main() { int x; int x; return 0; }").unwrap_err();
        assert!(matches!(err, ParseError::Redeclaration { name, .. } if name == "x"));
    }

    #[test]
    fn test_shadowing_in_nested_block_is_allowed() {
        assert!(parse("int main() { int x; { int x; } return 0; }").is_ok());
    }

    #[test]
    fn test_void_variable_is_rejected() {
        let err = parse("int main() { void x; return 0; }").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidDeclType {
                data_type: DataType::Void,
                ..
            }
        ));
    }

    #[test]
    fn test_incomplete_function_def_error() {
        let err = parse("int main(int").unwrap_err();
        assert!(matches!(err, ParseError::IncompleteFunctionDef { .. }));
    }

    #[test]
    fn test_incomplete_call_error() {
        let err = parse("int main() { f(1, 2; return 0; }").unwrap_err();
        assert!(matches!(err, ParseError::IncompleteCall { .. }));
    }

    #[test]
    fn test_top_level_statement_is_rejected() {
        let err = parse("int k; k = 1;").unwrap_err();
        assert!(matches!(err, ParseError::Expected { .. }));
    }
}
