//! Statement parsing: let, return, expression statements, blocks.

use crate::ast::{Block, Stmt, StmtKind};
use crate::lexer::TokenKind;

use super::core::{ParseResult, Parser};

impl Parser {
    pub(crate) fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_token(&TokenKind::Let) {
            return self.let_statement();
        }
        if self.match_token(&TokenKind::Return) {
            return self.return_statement();
        }
        self.expression_statement()
    }

    fn let_statement(&mut self) -> ParseResult<Stmt> {
        let start_span = self.previous_span();
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Equal)?;
        let value = self.expression()?;
        self.match_token(&TokenKind::Semicolon);

        let span = start_span.merge(&self.previous_span());
        Ok(Stmt::new(StmtKind::Let { name, value }, span))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let start_span = self.previous_span();
        let value = self.expression()?;
        self.match_token(&TokenKind::Semicolon);

        let span = start_span.merge(&self.previous_span());
        Ok(Stmt::new(StmtKind::Return(value), span))
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.match_token(&TokenKind::Semicolon);

        let span = expr.span;
        Ok(Stmt::new(StmtKind::Expression(expr), span))
    }

    /// Parse statements up to and including the closing brace. The opening
    /// brace has already been consumed by the caller.
    pub(crate) fn block(&mut self) -> ParseResult<Block> {
        let start_span = self.previous_span();
        let mut statements = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;

        let span = start_span.merge(&self.previous_span());
        Ok(Block::new(statements, span))
    }
}
