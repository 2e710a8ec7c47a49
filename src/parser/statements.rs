//! Statement and function-definition parsing
//!
//! Statements are dispatched by keyword: `if`, `for`, `while`, `return`,
//! `break`, `continue`. A `{` begins a freestanding block, and anything else
//! is an expression statement terminated by `';'` (declarations and
//! assignments included, since a declaration is an expression primary).
//!
//! Function definitions sit at the top level only:
//!
//! ```text
//! FuncDef := DataType Ident "(" Params? ")" ( Block | Stmt )
//!          | DataType Ident "(" Params? ")" ";"     (prototype)
//! ```

use super::ast::{DataType, ExprKind, ExprRef, JumpKind, Param};
use super::expressions::Precedence;
use super::lexer::TokenKind;
use super::parse::{ParseError, Parser};
use crate::symtab::{FuncSignature, Symbol};

impl<'a> Parser<'a> {
    /// Parse a function definition or prototype. The caller has already
    /// established the `DataType Ident (` prefix by lookahead.
    pub(super) fn parse_function_def(&mut self) -> Result<ExprRef, ParseError> {
        let type_token = self.expect(TokenKind::DataType, "a return type")?;
        let return_type = DataType::from_lexeme(&type_token.lexeme);
        let loc = type_token.loc.clone();

        let name_token = self.expect(TokenKind::Identifier, "a function name")?;
        let name = name_token.lexeme.clone();
        let name_loc = name_token.loc.clone();

        self.expect(TokenKind::LeftParen, "'(' after the function name")?;

        let mut params: Vec<Param> = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if self.stream.at_end() {
                    return Err(ParseError::IncompleteFunctionDef {
                        loc: self.current_loc(),
                    });
                }

                let type_token = self.expect(TokenKind::DataType, "a parameter type")?;
                let data_type = DataType::from_lexeme(&type_token.lexeme);
                let type_loc = type_token.loc.clone();

                if self.stream.at_end() {
                    return Err(ParseError::IncompleteFunctionDef {
                        loc: self.current_loc(),
                    });
                }
                let param_name = self
                    .expect(TokenKind::Identifier, "a parameter name")?
                    .lexeme
                    .clone();

                if matches!(data_type, DataType::Void | DataType::Unidentified) {
                    return Err(ParseError::InvalidDeclType {
                        data_type,
                        loc: type_loc,
                    });
                }

                params.push(Param {
                    name: param_name,
                    data_type,
                });

                if !self.match_kind(TokenKind::Separator) {
                    break;
                }
            }
        }

        if self.stream.at_end() {
            return Err(ParseError::IncompleteFunctionDef {
                loc: self.current_loc(),
            });
        }
        self.expect(TokenKind::RightParen, "')' after the parameter list")?;

        let signature = FuncSignature {
            return_type,
            params: params.iter().map(|p| p.data_type).collect(),
        };

        // A ';' in place of a body makes this a prototype.
        if self.match_kind(TokenKind::Delimiter) {
            self.symbols.insert_prototype(&name, signature);
            return Ok(self.alloc(
                ExprKind::FuncDef {
                    return_type,
                    name,
                    params,
                    is_prototype: true,
                    body: vec![],
                },
                loc,
            ));
        }

        if !self.symbols.insert(&name, Symbol::func(signature)) {
            return Err(ParseError::FuncRedefinition {
                name,
                loc: name_loc,
            });
        }

        if self.stream.at_end() {
            return Err(ParseError::IncompleteFunctionDef {
                loc: self.current_loc(),
            });
        }

        // Function bodies open a scope holding the parameters.
        self.symbols.push_scope();
        for param in &params {
            if !self.symbols.insert(&param.name, Symbol::var(param.data_type)) {
                self.symbols.pop_scope();
                return Err(ParseError::Redeclaration {
                    name: param.name.clone(),
                    loc: name_loc,
                });
            }
        }

        let body = if self.match_kind(TokenKind::LeftBrace) {
            let statements = self.parse_block_statements()?;
            self.expect(TokenKind::RightBrace, "'}' to close the function body")?;
            statements
        } else {
            vec![self.parse_statement()?]
        };

        self.symbols.pop_scope();

        Ok(self.alloc(
            ExprKind::FuncDef {
                return_type,
                name,
                params,
                is_prototype: false,
                body,
            },
            loc,
        ))
    }

    /// Parse statements up to (but not including) a closing `}`.
    pub(super) fn parse_block_statements(&mut self) -> Result<Vec<ExprRef>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.stream.at_end() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// Parse a single statement.
    pub(super) fn parse_statement(&mut self) -> Result<ExprRef, ParseError> {
        let Some(token) = self.stream.peek(0) else {
            return Err(ParseError::UnexpectedEof {
                loc: self.current_loc(),
            });
        };
        let loc = token.loc.clone();

        if token.kind == TokenKind::Keyword {
            return match token.lexeme.as_str() {
                "if" => self.parse_if(),
                "for" => self.parse_for(),
                "while" => self.parse_while(),
                "return" => self.parse_return(),
                "break" => self.parse_jump(JumpKind::Break),
                "continue" => self.parse_jump(JumpKind::Continue),
                // A stray 'else' or similar.
                _ => Err(self.err_expected("a statement")),
            };
        }

        if token.kind == TokenKind::LeftBrace {
            self.stream.skip();
            self.symbols.push_scope();
            let body = self.parse_block_statements()?;
            self.expect(TokenKind::RightBrace, "'}' to close the block")?;
            self.symbols.pop_scope();
            return Ok(self.alloc(ExprKind::Block { body }, loc));
        }

        let expr = self.parse_subexpr(Precedence::Min, TokenKind::Delimiter)?;
        self.expect_delimiter()?;
        Ok(expr)
    }

    /// The body of an `if`/`for`/`while`: either a braced block (opening a
    /// scope) or a single statement.
    fn parse_statement_or_block(&mut self) -> Result<Vec<ExprRef>, ParseError> {
        if self.match_kind(TokenKind::LeftBrace) {
            self.symbols.push_scope();
            let statements = self.parse_block_statements()?;
            self.expect(TokenKind::RightBrace, "'}' to close the block")?;
            self.symbols.pop_scope();
            Ok(statements)
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    fn parse_if(&mut self) -> Result<ExprRef, ParseError> {
        let loc = self.current_loc();
        self.stream.skip(); // 'if'

        self.expect(TokenKind::LeftParen, "'(' after 'if'")?;
        let condition = self.parse_subexpr(Precedence::Min, TokenKind::RightParen)?;
        self.expect(TokenKind::RightParen, "')' after the if condition")?;

        let then_block = self.parse_statement_or_block()?;

        let else_block = if self.at_keyword("else") {
            self.stream.skip();
            self.parse_statement_or_block()?
        } else {
            vec![]
        };

        Ok(self.alloc(
            ExprKind::If {
                condition,
                then_block,
                else_block,
            },
            loc,
        ))
    }

    fn parse_while(&mut self) -> Result<ExprRef, ParseError> {
        let loc = self.current_loc();
        self.stream.skip(); // 'while'

        self.expect(TokenKind::LeftParen, "'(' after 'while'")?;
        let condition = self.parse_subexpr(Precedence::Min, TokenKind::RightParen)?;
        self.expect(TokenKind::RightParen, "')' after the while condition")?;

        let body = self.parse_statement_or_block()?;

        Ok(self.alloc(ExprKind::While { condition, body }, loc))
    }

    fn parse_for(&mut self) -> Result<ExprRef, ParseError> {
        let loc = self.current_loc();
        self.stream.skip(); // 'for'

        self.expect(TokenKind::LeftParen, "'(' after 'for'")?;

        // The whole loop gets a scope, so an init declaration stays local
        // to it.
        self.symbols.push_scope();

        let result: Result<ExprKind, ParseError> = (|| {
            let init = if self.check(TokenKind::Delimiter) {
                None
            } else {
                Some(self.parse_subexpr(Precedence::Min, TokenKind::Delimiter)?)
            };
            self.expect_delimiter()?;

            let condition = if self.check(TokenKind::Delimiter) {
                None
            } else {
                Some(self.parse_subexpr(Precedence::Min, TokenKind::Delimiter)?)
            };
            self.expect_delimiter()?;

            let increment = if self.check(TokenKind::RightParen) {
                None
            } else {
                Some(self.parse_subexpr(Precedence::Min, TokenKind::RightParen)?)
            };
            self.expect(TokenKind::RightParen, "')' after the for clauses")?;

            let body = self.parse_statement_or_block()?;

            Ok(ExprKind::For {
                init,
                condition,
                increment,
                body,
            })
        })();

        self.symbols.pop_scope();

        Ok(self.alloc(result?, loc))
    }

    fn parse_return(&mut self) -> Result<ExprRef, ParseError> {
        let loc = self.current_loc();
        self.stream.skip(); // 'return'

        let value = if self.check(TokenKind::Delimiter) {
            None
        } else {
            Some(self.parse_subexpr(Precedence::Min, TokenKind::Delimiter)?)
        };
        self.expect_delimiter()?;

        Ok(self.alloc(ExprKind::Return { value }, loc))
    }

    fn parse_jump(&mut self, kind: JumpKind) -> Result<ExprRef, ParseError> {
        let loc = self.current_loc();
        self.stream.skip(); // 'break' / 'continue'
        self.expect_delimiter()?;
        Ok(self.alloc(ExprKind::Jump { kind }, loc))
    }
}
