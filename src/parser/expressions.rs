//! Expression parsing by precedence climbing
//!
//! [`Parser::parse_subexpr`] parses a primary and then folds binary
//! operators rightward as long as their precedence stays at or above the
//! current minimum. Right operands are parsed one level tighter for
//! left-associative operators and at the same level for the
//! right-associative assignment family, which yields conventional C
//! associativity.
//!
//! A subexpression is delimited by a context-dependent stop token: `';'`
//! for statements, `')'` for grouped expressions and conditions, `','` for
//! all but the last call argument. Hitting `';'` where the stop token is
//! something else is a hard error, since it means a statement delimiter
//! appeared inside a grouped expression.

use super::ast::{DataType, ExprKind, ExprRef, LiteralValue};
use super::lexer::TokenKind;
use super::parse::{ParseError, Parser};
use crate::symtab::Symbol;

/// Binding power of the operator ladder, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Min,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Additive,
    Multiplicative,
    Unary,
    Primary,
}

impl Precedence {
    /// The next-tighter level, used to make binary operators
    /// left-associative.
    fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            Min => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Additive,
            Additive => Multiplicative,
            Multiplicative => Unary,
            Unary | Primary => Primary,
        }
    }
}

/// Map an operator (or primary-starting) token to its precedence level.
pub fn op_prec(kind: TokenKind) -> Precedence {
    use TokenKind::*;
    match kind {
        Assign | PlusEq | MinusEq | MultiplyEq | DivideEq | ModEq | OrEq | BitOrEq | XorEq
        | AndEq | BitAndEq | LshiftEq | RshiftEq => Precedence::Assignment,

        Or | BitOr | Xor => Precedence::Or,

        And | Ampersand => Precedence::And,

        Equal | NotEq => Precedence::Equality,

        Less | LessEq | Greater | GreaterEq => Precedence::Comparison,

        Plus | Minus => Precedence::Additive,

        Star | Divide | Mod | Lshift | Rshift => Precedence::Multiplicative,

        Not | BitNot | Increment | Decrement => Precedence::Unary,

        Identifier | DataType | NumericLiteral | CharLiteral | StringLiteral | BoolLiteral
        | LeftParen => Precedence::Primary,

        _ => Precedence::Min,
    }
}

impl<'a> Parser<'a> {
    /// Parse a subexpression whose operators all bind at least as tightly as
    /// `min_prec`, stopping (without consuming) at `stop`.
    pub(super) fn parse_subexpr(
        &mut self,
        min_prec: Precedence,
        stop: TokenKind,
    ) -> Result<ExprRef, ParseError> {
        let mut left = self.parse_primary()?;

        loop {
            let Some(token) = self.stream.peek(0) else {
                return Ok(left);
            };

            if token.kind == stop {
                return Ok(left);
            }
            if token.kind == TokenKind::Delimiter {
                // A ';' where the terminator should be ')' or ','.
                return Err(ParseError::DelimiterInExpression {
                    loc: token.loc.clone(),
                });
            }

            if token.kind.is_binary_op() {
                let prec = op_prec(token.kind);
                if prec < min_prec {
                    // A looser operator belongs to an enclosing level.
                    return Ok(left);
                }

                let op = token.kind;
                let loc = token.loc.clone();
                self.stream.skip();

                // The assignment family is right-associative.
                let next_min = if prec == Precedence::Assignment {
                    prec
                } else {
                    prec.next()
                };
                let right = self.parse_subexpr(next_min, stop)?;
                left = self.alloc(ExprKind::Binary { op, left, right }, loc);
                continue;
            }

            // Anything else ends the subexpression; the caller reports the
            // stop token it was owed (a missing ';', ')', or ',').
            return Ok(left);
        }
    }

    /// Parse a primary expression: a prefix unary chain, a literal, an
    /// identifier (possibly a call, possibly postfix-incremented), a
    /// declaration, or a parenthesized subexpression.
    fn parse_primary(&mut self) -> Result<ExprRef, ParseError> {
        let Some(token) = self.stream.peek(0) else {
            return Err(ParseError::UnexpectedEof {
                loc: self.current_loc(),
            });
        };
        let loc = token.loc.clone();

        if token.kind.is_unary_op() {
            let op = token.kind;
            self.stream.skip();
            let operand = self.parse_primary()?;
            return Ok(self.alloc(
                ExprKind::Unary {
                    op,
                    operand,
                    is_postfix: false,
                },
                loc,
            ));
        }

        if token.kind.is_literal() {
            let value = self.parse_literal(token.kind, &token.lexeme, &loc)?;
            self.stream.skip();
            return Ok(self.alloc(ExprKind::Literal { value }, loc));
        }

        match token.kind {
            TokenKind::DataType => self.parse_decl(),

            TokenKind::Identifier => {
                let name = token.lexeme.clone();
                self.stream.skip();

                // An identifier immediately followed by '(' is a call.
                if self.check(TokenKind::LeftParen) {
                    return self.parse_call(name, loc);
                }

                let ident = self.alloc(ExprKind::Ident { name }, loc);

                // Postfix increment/decrement binds directly to the name.
                if let Some(op @ (TokenKind::Increment | TokenKind::Decrement)) = self.peek_kind(0)
                {
                    let op_loc = self.current_loc();
                    self.stream.skip();
                    return Ok(self.alloc(
                        ExprKind::Unary {
                            op,
                            operand: ident,
                            is_postfix: true,
                        },
                        op_loc,
                    ));
                }

                Ok(ident)
            }

            TokenKind::LeftParen => {
                self.stream.skip();
                let inner = self.parse_subexpr(Precedence::Min, TokenKind::RightParen)?;
                self.expect(TokenKind::RightParen, "')' to close the expression")?;
                Ok(inner)
            }

            _ => Err(self.err_expected("an expression")),
        }
    }

    /// `DataType Ident`: a declaration primary. The declared name is
    /// registered in the current scope right away, so a same-scope
    /// redeclaration fails here.
    fn parse_decl(&mut self) -> Result<ExprRef, ParseError> {
        let type_token = self.expect(TokenKind::DataType, "a data type")?;
        let data_type = DataType::from_lexeme(&type_token.lexeme);
        let loc = type_token.loc.clone();

        let name_token = self.expect(TokenKind::Identifier, "an identifier after the type")?;
        let name = name_token.lexeme.clone();
        let name_loc = name_token.loc.clone();

        if matches!(data_type, DataType::Void | DataType::Unidentified) {
            return Err(ParseError::InvalidDeclType { data_type, loc });
        }

        if !self.symbols.insert(&name, Symbol::var(data_type)) {
            return Err(ParseError::Redeclaration {
                name,
                loc: name_loc,
            });
        }

        Ok(self.alloc(ExprKind::Decl { data_type, name }, loc))
    }

    /// Parse a call after its callee name. The argument list is parsed by
    /// counting top-level separators up to the matching ')', then parsing
    /// each argument with the matching stop token.
    fn parse_call(
        &mut self,
        callee: String,
        loc: super::ast::SourceLoc,
    ) -> Result<ExprRef, ParseError> {
        self.expect(TokenKind::LeftParen, "'(' after the function name")?;

        if self.match_kind(TokenKind::RightParen) {
            return Ok(self.alloc(
                ExprKind::Call {
                    callee,
                    args: vec![],
                },
                loc,
            ));
        }

        // Count the separators up to the matching ')'.
        let mut depth = 1u32;
        let mut separators = 0usize;
        let mut offset = 0usize;
        loop {
            let Some(token) = self.stream.peek(offset) else {
                return Err(ParseError::IncompleteCall {
                    loc: self.current_loc(),
                });
            };
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                TokenKind::Separator if depth == 1 => separators += 1,
                TokenKind::Delimiter => {
                    return Err(ParseError::IncompleteCall {
                        loc: token.loc.clone(),
                    });
                }
                _ => {}
            }
            offset += 1;
        }

        let arg_count = separators + 1;
        let mut args = Vec::with_capacity(arg_count);
        for i in 0..arg_count {
            let stop = if i + 1 == arg_count {
                TokenKind::RightParen
            } else {
                TokenKind::Separator
            };
            args.push(self.parse_subexpr(Precedence::Min, stop)?);
            match stop {
                TokenKind::RightParen => {
                    self.expect(TokenKind::RightParen, "')' to close the call")?
                }
                _ => self.expect(TokenKind::Separator, "',' between arguments")?,
            };
        }

        Ok(self.alloc(ExprKind::Call { callee, args }, loc))
    }

    /// Convert a literal token to its typed value. A numeric lexeme with a
    /// `.` is a float, otherwise an int.
    fn parse_literal(
        &self,
        kind: TokenKind,
        lexeme: &str,
        loc: &super::ast::SourceLoc,
    ) -> Result<LiteralValue, ParseError> {
        match kind {
            TokenKind::NumericLiteral if lexeme.contains('.') => lexeme
                .parse::<f32>()
                .map(LiteralValue::Float)
                .map_err(|_| ParseError::BadNumericLiteral {
                    lexeme: lexeme.to_string(),
                    loc: loc.clone(),
                }),
            TokenKind::NumericLiteral => lexeme
                .parse::<i32>()
                .map(LiteralValue::Int)
                .map_err(|_| ParseError::BadNumericLiteral {
                    lexeme: lexeme.to_string(),
                    loc: loc.clone(),
                }),
            TokenKind::CharLiteral => {
                let c = lexeme.chars().next().unwrap_or('\0');
                Ok(LiteralValue::Char(c as i8))
            }
            TokenKind::StringLiteral => Ok(LiteralValue::Str(lexeme.to_string())),
            TokenKind::BoolLiteral => Ok(LiteralValue::Bool(lexeme == "true")),
            _ => Err(ParseError::Expected {
                expected: "a literal".to_string(),
                found: kind.to_string(),
                loc: loc.clone(),
            }),
        }
    }
}
