use crate::ast::{ArrowBody, Expr, ForInit, Position, Program, Stmt};
use crate::lexer::{Token, TokenType};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub pos: Position,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.pos.line, self.pos.column)
    }
}

impl Error for ParseError {}

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let pos = self.current().pos;
        let mut body = Vec::new();
        while !self.at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(Program { pos, body })
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.current().pos;
        if self.check_type(TokenType::LBrace) {
            return self.parse_block();
        }
        if self.check_type(TokenType::Semicolon) {
            self.advance();
            return Ok(Stmt::Empty { pos });
        }
        if self.match_keyword("var") {
            let name = self.consume_ident("Expected variable name after 'var'.")?;
            let init = if self.match_op("=") {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.consume_optional_semicolon();
            return Ok(Stmt::VarDecl { pos, name, init });
        }
        if self.match_keyword("function") {
            let name = self.consume_ident("Expected function name.")?;
            let params = self.parse_params()?;
            let body = self.parse_brace_body()?;
            return Ok(Stmt::FunctionDecl { pos, name, params, body });
        }
        if self.match_keyword("return") {
            let value = if self.check_type(TokenType::Semicolon)
                || self.check_type(TokenType::RBrace)
                || self.at_end()
            {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.consume_optional_semicolon();
            return Ok(Stmt::Return { pos, value });
        }
        if self.match_keyword("if") {
            self.consume_type(TokenType::LParen, "Expected '(' after 'if'.")?;
            let condition = self.parse_expression()?;
            self.consume_type(TokenType::RParen, "Expected ')' after if condition.")?;
            let then_branch = Box::new(self.parse_statement()?);
            let else_branch = if self.match_keyword("else") {
                Some(Box::new(self.parse_statement()?))
            } else {
                None
            };
            return Ok(Stmt::If { pos, condition, then_branch, else_branch });
        }
        if self.match_keyword("while") {
            self.consume_type(TokenType::LParen, "Expected '(' after 'while'.")?;
            let condition = self.parse_expression()?;
            self.consume_type(TokenType::RParen, "Expected ')' after while condition.")?;
            let body = Box::new(self.parse_statement()?);
            return Ok(Stmt::While { pos, condition, body });
        }
        if self.match_keyword("do") {
            let body = Box::new(self.parse_statement()?);
            self.consume_keyword("while", "Expected 'while' after do body.")?;
            self.consume_type(TokenType::LParen, "Expected '(' after 'while'.")?;
            let condition = self.parse_expression()?;
            self.consume_type(TokenType::RParen, "Expected ')' after do-while condition.")?;
            self.consume_optional_semicolon();
            return Ok(Stmt::DoWhile { pos, body, condition });
        }
        if self.match_keyword("for") {
            return self.parse_for(pos);
        }
        if self.match_keyword("break") {
            self.consume_optional_semicolon();
            return Ok(Stmt::Break { pos });
        }
        if self.match_keyword("continue") {
            self.consume_optional_semicolon();
            return Ok(Stmt::Continue { pos });
        }
        let expr = self.parse_expression()?;
        self.consume_optional_semicolon();
        Ok(Stmt::Expr { pos, expr })
    }

    fn parse_block(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.current().pos;
        let body = self.parse_brace_body()?;
        Ok(Stmt::Block { pos, body })
    }

    fn parse_brace_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.consume_type(TokenType::LBrace, "Expected '{'.")?;
        let mut body = Vec::new();
        while !self.check_type(TokenType::RBrace) {
            if self.at_end() {
                return self.error_here("Unterminated block. Expected '}'.");
            }
            body.push(self.parse_statement()?);
        }
        self.consume_type(TokenType::RBrace, "Expected '}'.")?;
        Ok(body)
    }

    fn parse_for(&mut self, pos: Position) -> Result<Stmt, ParseError> {
        self.consume_type(TokenType::LParen, "Expected '(' after 'for'.")?;

        if self.match_keyword("var") {
            let name = self.consume_ident("Expected variable name in for header.")?;
            if self.match_keyword("in") {
                let object = self.parse_expression()?;
                self.consume_type(TokenType::RParen, "Expected ')' after for-in header.")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::ForIn { pos, decl: true, var_name: name, object, body });
            }
            if self.match_contextual("of") {
                let object = self.parse_expression()?;
                self.consume_type(TokenType::RParen, "Expected ')' after for-of header.")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::ForOf { pos, decl: true, var_name: name, object, body });
            }
            let init_value = if self.match_op("=") {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let init = Some(ForInit::VarDecl { name, init: init_value });
            self.consume_type(TokenType::Semicolon, "Expected ';' after for initializer.")?;
            return self.parse_classic_for_tail(pos, init);
        }

        if self.check_type(TokenType::Semicolon) {
            self.advance();
            return self.parse_classic_for_tail(pos, None);
        }

        let first = self.parse_expression()?;
        if let Expr::Ident { name, .. } = &first {
            if self.match_keyword("in") {
                let var_name = name.clone();
                let object = self.parse_expression()?;
                self.consume_type(TokenType::RParen, "Expected ')' after for-in header.")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::ForIn { pos, decl: false, var_name, object, body });
            }
            if self.match_contextual("of") {
                let var_name = name.clone();
                let object = self.parse_expression()?;
                self.consume_type(TokenType::RParen, "Expected ')' after for-of header.")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::ForOf { pos, decl: false, var_name, object, body });
            }
        }
        self.consume_type(TokenType::Semicolon, "Expected ';' after for initializer.")?;
        self.parse_classic_for_tail(pos, Some(ForInit::Expr(first)))
    }

    fn parse_classic_for_tail(
        &mut self,
        pos: Position,
        init: Option<ForInit>,
    ) -> Result<Stmt, ParseError> {
        let condition = if self.check_type(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_type(TokenType::Semicolon, "Expected ';' after for condition.")?;
        let update = if self.check_type(TokenType::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_type(TokenType::RParen, "Expected ')' after for header.")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For { pos, init, condition, update, body })
    }

    fn parse_params(&mut self) -> Result<Vec<String>, ParseError> {
        self.consume_type(TokenType::LParen, "Expected '(' before parameter list.")?;
        let mut params = Vec::new();
        if !self.check_type(TokenType::RParen) {
            loop {
                params.push(self.consume_ident("Expected parameter name.")?);
                if !self.match_type(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume_type(TokenType::RParen, "Expected ')' after parameter list.")?;
        Ok(params)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_logical_or()?;
        if self.check_op("=") {
            let pos = left.pos();
            if !matches!(left, Expr::Ident { .. } | Expr::Member { .. }) {
                return self.error_here("Invalid assignment target.");
            }
            self.advance();
            let value = self.parse_assignment()?;
            return Ok(Expr::Assign {
                pos,
                target: Box::new(left),
                value: Box::new(value),
            });
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;
        while self.check_op("||") {
            let pos = left.pos();
            let op = self.advance().value;
            let right = self.parse_logical_and()?;
            left = Expr::Binary { pos, op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.check_op("&&") {
            let pos = left.pos();
            let op = self.advance().value;
            let right = self.parse_equality()?;
            left = Expr::Binary { pos, op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        while self.check_op("==") || self.check_op("!=") || self.check_op("===") || self.check_op("!==")
        {
            let pos = left.pos();
            let op = self.advance().value;
            let right = self.parse_relational()?;
            left = Expr::Binary { pos, op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        while self.check_op("<") || self.check_op("<=") || self.check_op(">") || self.check_op(">=") {
            let pos = left.pos();
            let op = self.advance().value;
            let right = self.parse_additive()?;
            left = Expr::Binary { pos, op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        while self.check_op("+") || self.check_op("-") {
            let pos = left.pos();
            let op = self.advance().value;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary { pos, op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        while self.check_op("*") || self.check_op("/") || self.check_op("%") {
            let pos = left.pos();
            let op = self.advance().value;
            let right = self.parse_unary()?;
            left = Expr::Binary { pos, op, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check_op("-") || self.check_op("!") {
            let token = self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                pos: token.pos,
                op: token.value,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_call()?;
        if self.check_op("++") || self.check_op("--") {
            let pos = expr.pos();
            if !matches!(expr, Expr::Ident { .. } | Expr::Member { .. }) {
                return self.error_here("Invalid increment/decrement target.");
            }
            let op = self.advance().value;
            return Ok(Expr::Postfix { pos, op, operand: Box::new(expr) });
        }
        Ok(expr)
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check_type(TokenType::LParen) {
                let pos = expr.pos();
                self.advance();
                let mut args = Vec::new();
                if !self.check_type(TokenType::RParen) {
                    loop {
                        args.push(self.parse_expression()?);
                        if !self.match_type(TokenType::Comma) {
                            break;
                        }
                    }
                }
                self.consume_type(TokenType::RParen, "Expected ')' after call arguments.")?;
                expr = Expr::Call { pos, callee: Box::new(expr), args };
                continue;
            }
            if self.check_type(TokenType::Dot) {
                let pos = expr.pos();
                self.advance();
                let property = self.consume_ident("Expected property name after '.'.")?;
                expr = Expr::Member { pos, object: Box::new(expr), property };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();
        match token.typ {
            TokenType::Number => {
                self.advance();
                let value = token.value.parse::<f64>().map_err(|_| ParseError {
                    message: format!("Invalid number literal '{}'.", token.value),
                    pos: token.pos,
                })?;
                Ok(Expr::Number { pos: token.pos, value })
            }
            TokenType::String => {
                self.advance();
                Ok(Expr::Str { pos: token.pos, value: token.value })
            }
            TokenType::Keyword if token.value == "true" || token.value == "false" => {
                self.advance();
                Ok(Expr::Bool { pos: token.pos, value: token.value == "true" })
            }
            TokenType::Keyword if token.value == "null" => {
                self.advance();
                Ok(Expr::Null { pos: token.pos })
            }
            TokenType::Keyword if token.value == "function" => {
                self.advance();
                let name = if self.check_type(TokenType::Ident) {
                    Some(self.advance().value)
                } else {
                    None
                };
                let params = self.parse_params()?;
                let body = self.parse_brace_body()?;
                Ok(Expr::Function { pos: token.pos, name, params, body })
            }
            TokenType::Ident => {
                if self.peek_next_is_arrow() {
                    self.advance();
                    self.advance();
                    let body = self.parse_arrow_body()?;
                    return Ok(Expr::Arrow { pos: token.pos, params: vec![token.value], body });
                }
                self.advance();
                Ok(Expr::Ident { pos: token.pos, name: token.value })
            }
            TokenType::LParen => {
                if let Some(params) = self.try_arrow_params() {
                    self.consume_op("=>", "Expected '=>' after arrow parameters.")?;
                    let body = self.parse_arrow_body()?;
                    return Ok(Expr::Arrow { pos: token.pos, params, body });
                }
                self.advance();
                let expr = self.parse_expression()?;
                self.consume_type(TokenType::RParen, "Expected ')' after expression.")?;
                Ok(expr)
            }
            TokenType::LBrace => self.parse_object_literal(),
            TokenType::LBracket => self.parse_array_literal(),
            _ => self.error_here(format!("Unexpected token '{}'.", token.value)),
        }
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let pos = self.current().pos;
        self.consume_type(TokenType::LBrace, "Expected '{'.")?;
        let mut entries = Vec::new();
        if !self.check_type(TokenType::RBrace) {
            loop {
                let key_token = self.current().clone();
                let key = match key_token.typ {
                    TokenType::String | TokenType::Ident | TokenType::Keyword => {
                        self.advance();
                        key_token.value
                    }
                    TokenType::Number => {
                        self.advance();
                        key_token.value
                    }
                    _ => return self.error_here("Expected object key."),
                };
                self.consume_type(TokenType::Colon, "Expected ':' after object key.")?;
                let value = self.parse_expression()?;
                entries.push((key, value));
                if !self.match_type(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume_type(TokenType::RBrace, "Expected '}' after object literal.")?;
        Ok(Expr::Object { pos, entries })
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let pos = self.current().pos;
        self.consume_type(TokenType::LBracket, "Expected '['.")?;
        let mut items = Vec::new();
        if !self.check_type(TokenType::RBracket) {
            loop {
                items.push(self.parse_expression()?);
                if !self.match_type(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume_type(TokenType::RBracket, "Expected ']' after array literal.")?;
        Ok(Expr::Array { pos, items })
    }

    fn parse_arrow_body(&mut self) -> Result<ArrowBody, ParseError> {
        if self.check_type(TokenType::LBrace) {
            let body = self.parse_brace_body()?;
            Ok(ArrowBody::Block(body))
        } else {
            let expr = self.parse_expression()?;
            Ok(ArrowBody::Expr(Box::new(expr)))
        }
    }

    // Lookahead for "(a, b) =>". Restores the cursor when the parenthesized
    // run is not an arrow parameter list.
    fn try_arrow_params(&mut self) -> Option<Vec<String>> {
        let start = self.index;
        if !self.match_type(TokenType::LParen) {
            return None;
        }
        let mut params = Vec::new();
        if !self.check_type(TokenType::RParen) {
            loop {
                if !self.check_type(TokenType::Ident) {
                    self.index = start;
                    return None;
                }
                params.push(self.advance().value);
                if !self.match_type(TokenType::Comma) {
                    break;
                }
            }
        }
        if !self.match_type(TokenType::RParen) {
            self.index = start;
            return None;
        }
        if !self.check_op("=>") {
            self.index = start;
            return None;
        }
        Some(params)
    }

    fn peek_next_is_arrow(&self) -> bool {
        if self.index + 1 >= self.tokens.len() {
            return false;
        }
        let next = &self.tokens[self.index + 1];
        next.typ == TokenType::Op && next.value == "=>"
    }

    fn consume_optional_semicolon(&mut self) {
        if self.check_type(TokenType::Semicolon) {
            self.advance();
        }
    }

    fn consume_ident(&mut self, message: &str) -> Result<String, ParseError> {
        if self.check_type(TokenType::Ident) {
            Ok(self.advance().value)
        } else {
            self.error_here(message)
        }
    }

    fn consume_type(&mut self, typ: TokenType, message: &str) -> Result<Token, ParseError> {
        if self.check_type(typ) {
            Ok(self.advance())
        } else {
            self.error_here(message)
        }
    }

    fn consume_keyword(&mut self, keyword: &str, message: &str) -> Result<(), ParseError> {
        if self.match_keyword(keyword) {
            Ok(())
        } else {
            self.error_here(message)
        }
    }

    fn consume_op(&mut self, op: &str, message: &str) -> Result<(), ParseError> {
        if self.check_op(op) {
            self.advance();
            Ok(())
        } else {
            self.error_here(message)
        }
    }

    fn match_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_contextual(&mut self, word: &str) -> bool {
        let token = self.current();
        if token.typ == TokenType::Ident && token.value == word {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_type(&mut self, typ: TokenType) -> bool {
        if self.check_type(typ) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_op(&mut self, op: &str) -> bool {
        if self.check_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        let token = self.current();
        token.typ == TokenType::Keyword && token.value == keyword
    }

    fn check_type(&self, typ: TokenType) -> bool {
        self.current().typ == typ
    }

    fn check_op(&self, op: &str) -> bool {
        let token = self.current();
        token.typ == TokenType::Op && token.value == op
    }

    fn current(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.index.min(self.tokens.len() - 1)].clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.current().typ == TokenType::Eof
    }

    fn error_here<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError {
            message: message.into(),
            pos: self.current().pos,
        })
    }
}
