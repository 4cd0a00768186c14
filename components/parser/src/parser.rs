//! Recursive descent parser for the probe language
//!
//! Precedence, lowest first: assignment and arrow functions, conditional,
//! `||`/`??`, `&&`, equality, relational, additive, multiplicative, unary,
//! postfix, call/member, primary.

use std::rc::Rc;

use crate::ast::{
    AssignmentOperator, AssignmentTarget, BinaryOperator, CatchClause, Expression, ForInOfLeft,
    ForInit, Function, Literal, LogicalOperator, MemberProperty, Program, Statement,
    UnaryOperator, UpdateOperator, VariableDeclarator, VariableKind,
};
use crate::error::{syntax_error, unexpected_token, ParseResult};
use crate::lexer::{Keyword, Lexer, Punctuator, Token};

/// Default limit on syntactic nesting (parenthesised expressions, unary
/// chains, right-nested assignments and nested statements).
pub const DEFAULT_MAX_NESTING: u32 = 256;

/// Parser for probe language source
pub struct Parser {
    lexer: Lexer,
    /// Current syntactic nesting
    nesting: u32,
    /// Nesting at which parsing fails
    max_nesting: u32,
    /// Nesting depth of loops in the current function (break/continue validation)
    loop_depth: u32,
    /// Nesting depth of functions (return validation)
    function_depth: u32,
    /// Track if we're in for loop init (disallows 'in' as relational operator)
    in_for_init: bool,
}

impl Parser {
    /// Create a new parser for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            lexer: Lexer::new(source),
            nesting: 0,
            max_nesting: DEFAULT_MAX_NESTING,
            loop_depth: 0,
            function_depth: 0,
            in_for_init: false,
        }
    }

    /// Set the nesting limit.
    pub fn with_max_nesting(mut self, max_nesting: u32) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// Parse the source into a program
    pub fn parse(&mut self) -> ParseResult<Program> {
        let mut body = Vec::new();
        while !self.is_at_end()? {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    /// Enter a nested construct.
    fn enter(&mut self) -> ParseResult<()> {
        self.nesting += 1;
        if self.nesting > self.max_nesting {
            return Err(syntax_error("too much nesting", self.lexer.token_line));
        }
        Ok(())
    }

    /// Leave a nested construct.
    fn exit(&mut self) {
        self.nesting = self.nesting.saturating_sub(1);
    }

    fn is_at_end(&mut self) -> ParseResult<bool> {
        Ok(matches!(self.lexer.peek_token()?, Token::EOF))
    }

    /// Line of the next token.
    fn line(&mut self) -> ParseResult<u32> {
        self.lexer.peek_token()?;
        Ok(self.lexer.token_line)
    }

    fn check_punctuator(&mut self, punct: Punctuator) -> ParseResult<bool> {
        Ok(matches!(self.lexer.peek_token()?, Token::Punctuator(p) if *p == punct))
    }

    fn check_keyword(&mut self, keyword: Keyword) -> ParseResult<bool> {
        Ok(matches!(self.lexer.peek_token()?, Token::Keyword(k) if *k == keyword))
    }

    fn check_contextual(&mut self, word: &str) -> ParseResult<bool> {
        Ok(matches!(self.lexer.peek_token()?, Token::Identifier(name) if name == word))
    }

    fn eat_punctuator(&mut self, punct: Punctuator) -> ParseResult<bool> {
        if self.check_punctuator(punct)? {
            self.lexer.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_punctuator(&mut self, punct: Punctuator) -> ParseResult<()> {
        let token = self.lexer.next_token()?;
        match token {
            Token::Punctuator(p) if p == punct => Ok(()),
            other => Err(unexpected_token(
                &format!("{punct:?}"),
                &other.describe(),
                self.lexer.token_line,
            )),
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<()> {
        let token = self.lexer.next_token()?;
        match token {
            Token::Keyword(k) if k == keyword => Ok(()),
            other => Err(unexpected_token(
                keyword.as_str(),
                &other.describe(),
                self.lexer.token_line,
            )),
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.lexer.next_token()? {
            Token::Identifier(name) => Ok(name),
            other => Err(unexpected_token(
                "identifier",
                &other.describe(),
                self.lexer.token_line,
            )),
        }
    }

    /// Accepts `;`, or inserts one before `}`, end of input or a new line.
    fn consume_semicolon(&mut self) -> ParseResult<()> {
        if self.eat_punctuator(Punctuator::Semicolon)? {
            return Ok(());
        }
        let at_boundary = matches!(
            self.lexer.peek_token()?,
            Token::EOF | Token::Punctuator(Punctuator::RBrace)
        );
        if at_boundary || self.lexer.line_terminator_before_token {
            return Ok(());
        }
        let got = self.lexer.peek_token()?.describe();
        Err(unexpected_token("';'", &got, self.lexer.token_line))
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        self.enter()?;
        let result = self.parse_statement_inner();
        self.exit();
        result
    }

    fn parse_statement_inner(&mut self) -> ParseResult<Statement> {
        let line = self.line()?;
        match self.lexer.peek_token()?.clone() {
            Token::Keyword(Keyword::Let | Keyword::Const | Keyword::Var) => {
                let (kind, declarations) = self.parse_variable_declaration()?;
                self.consume_semicolon()?;
                Ok(Statement::VariableDeclaration {
                    kind,
                    declarations,
                    line,
                })
            }
            Token::Keyword(Keyword::Function) => {
                let function = self.parse_function(true)?;
                Ok(Statement::FunctionDeclaration(function))
            }
            Token::Keyword(Keyword::Return) => self.parse_return_statement(line),
            Token::Keyword(Keyword::If) => self.parse_if_statement(),
            Token::Keyword(Keyword::While) => self.parse_while_statement(),
            Token::Keyword(Keyword::For) => self.parse_for_statement(line),
            Token::Keyword(Keyword::Break) => {
                self.lexer.next_token()?;
                if self.loop_depth == 0 {
                    return Err(syntax_error("Illegal break statement", line));
                }
                self.consume_semicolon()?;
                Ok(Statement::BreakStatement { line })
            }
            Token::Keyword(Keyword::Continue) => {
                self.lexer.next_token()?;
                if self.loop_depth == 0 {
                    return Err(syntax_error("Illegal continue statement", line));
                }
                self.consume_semicolon()?;
                Ok(Statement::ContinueStatement { line })
            }
            Token::Keyword(Keyword::Throw) => {
                self.lexer.next_token()?;
                if self.lexer.peek_token().is_ok() && self.lexer.line_terminator_before_token {
                    return Err(syntax_error("Illegal newline after throw", line));
                }
                let argument = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Statement::ThrowStatement { argument, line })
            }
            Token::Keyword(Keyword::Try) => self.parse_try_statement(),
            Token::Punctuator(Punctuator::LBrace) => Ok(Statement::BlockStatement {
                body: self.parse_block_body()?,
            }),
            Token::Punctuator(Punctuator::Semicolon) => {
                self.lexer.next_token()?;
                Ok(Statement::EmptyStatement)
            }
            _ => {
                let expression = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Statement::ExpressionStatement { expression, line })
            }
        }
    }

    fn parse_variable_kind(&mut self) -> ParseResult<VariableKind> {
        match self.lexer.next_token()? {
            Token::Keyword(Keyword::Let) => Ok(VariableKind::Let),
            Token::Keyword(Keyword::Const) => Ok(VariableKind::Const),
            Token::Keyword(Keyword::Var) => Ok(VariableKind::Var),
            other => Err(unexpected_token(
                "declaration",
                &other.describe(),
                self.lexer.token_line,
            )),
        }
    }

    fn parse_variable_declaration(&mut self) -> ParseResult<(VariableKind, Vec<VariableDeclarator>)> {
        let kind = self.parse_variable_kind()?;
        let first = self.expect_identifier()?;
        let declarations = self.parse_declarators(kind, first)?;
        Ok((kind, declarations))
    }

    /// Parses declarators after the first bound name has been consumed.
    fn parse_declarators(&mut self, kind: VariableKind, first: String) -> ParseResult<Vec<VariableDeclarator>> {
        let mut declarations = Vec::new();
        let mut id = first;
        loop {
            let init = if self.eat_punctuator(Punctuator::Assign)? {
                Some(self.parse_assignment_expression()?)
            } else if kind == VariableKind::Const {
                return Err(syntax_error(
                    "Missing initializer in const declaration",
                    self.lexer.token_line,
                ));
            } else {
                None
            };
            declarations.push(VariableDeclarator { id, init });
            if !self.eat_punctuator(Punctuator::Comma)? {
                return Ok(declarations);
            }
            id = self.expect_identifier()?;
        }
    }

    fn parse_function(&mut self, require_name: bool) -> ParseResult<Rc<Function>> {
        let line = self.line()?;
        self.expect_keyword(Keyword::Function)?;
        let name = if matches!(self.lexer.peek_token()?, Token::Identifier(_)) {
            Some(self.expect_identifier()?)
        } else if require_name {
            return Err(syntax_error("Function statements require a name", line));
        } else {
            None
        };
        let params = self.parse_parameters()?;
        let body = self.parse_function_body()?;
        Ok(Rc::new(Function {
            name,
            params,
            body,
            line,
        }))
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<String>> {
        self.expect_punctuator(Punctuator::LParen)?;
        let mut params = Vec::new();
        while !self.eat_punctuator(Punctuator::RParen)? {
            params.push(self.expect_identifier()?);
            if !self.check_punctuator(Punctuator::RParen)? {
                self.expect_punctuator(Punctuator::Comma)?;
            }
        }
        Ok(params)
    }

    fn parse_function_body(&mut self) -> ParseResult<Vec<Statement>> {
        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
        let saved_for_init = std::mem::replace(&mut self.in_for_init, false);
        self.function_depth += 1;
        let body = self.parse_block_body();
        self.function_depth -= 1;
        self.loop_depth = saved_loop_depth;
        self.in_for_init = saved_for_init;
        body
    }

    fn parse_return_statement(&mut self, line: u32) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::Return)?;
        if self.function_depth == 0 {
            return Err(syntax_error("Illegal return statement", line));
        }
        let argument = if self.check_punctuator(Punctuator::Semicolon)?
            || self.check_punctuator(Punctuator::RBrace)?
            || self.is_at_end()?
            || self.lexer.line_terminator_before_token
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Statement::ReturnStatement { argument, line })
    }

    fn parse_if_statement(&mut self) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::If)?;
        self.expect_punctuator(Punctuator::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;

        let consequent = Box::new(self.parse_statement()?);

        let alternate = if self.check_keyword(Keyword::Else)? {
            self.lexer.next_token()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::IfStatement {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_while_statement(&mut self) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::While)?;
        self.expect_punctuator(Punctuator::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        let body = Box::new(self.parse_loop_body()?);
        Ok(Statement::WhileStatement { test, body })
    }

    fn parse_loop_body(&mut self) -> ParseResult<Statement> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        body
    }

    fn parse_for_statement(&mut self, line: u32) -> ParseResult<Statement> {
        self.expect_keyword(Keyword::For)?;
        self.expect_punctuator(Punctuator::LParen)?;

        let init = if self.check_punctuator(Punctuator::Semicolon)? {
            None
        } else if matches!(
            self.lexer.peek_token()?,
            Token::Keyword(Keyword::Let | Keyword::Const | Keyword::Var)
        ) {
            let kind = self.parse_variable_kind()?;
            let id = self.expect_identifier()?;
            if self.check_contextual("of")? || self.check_keyword(Keyword::In)? {
                let left = ForInOfLeft::VariableDeclaration { kind, id };
                return self.parse_for_in_of(left, line);
            }
            self.in_for_init = true;
            let declarations = self.parse_declarators(kind, id);
            self.in_for_init = false;
            Some(ForInit::VariableDeclaration {
                kind,
                declarations: declarations?,
            })
        } else {
            self.in_for_init = true;
            let expression = self.parse_expression();
            self.in_for_init = false;
            let expression = expression?;
            if let Expression::Identifier { name, .. } = &expression {
                if self.check_contextual("of")? || self.check_keyword(Keyword::In)? {
                    let left = ForInOfLeft::Identifier(name.clone());
                    return self.parse_for_in_of(left, line);
                }
            }
            Some(ForInit::Expression(expression))
        };

        self.expect_punctuator(Punctuator::Semicolon)?;
        let test = if self.check_punctuator(Punctuator::Semicolon)? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punctuator(Punctuator::Semicolon)?;
        let update = if self.check_punctuator(Punctuator::RParen)? {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punctuator(Punctuator::RParen)?;
        let body = Box::new(self.parse_loop_body()?);

        Ok(Statement::ForStatement {
            init,
            test,
            update,
            body,
        })
    }

    /// Parses `of expr) body` or `in expr) body`.
    fn parse_for_in_of(&mut self, left: ForInOfLeft, line: u32) -> ParseResult<Statement> {
        let is_of = self.check_contextual("of")?;
        self.lexer.next_token()?;
        let right = self.parse_expression()?;
        self.expect_punctuator(Punctuator::RParen)?;
        let body = Box::new(self.parse_loop_body()?);
        Ok(if is_of {
            Statement::ForOfStatement {
                left,
                right,
                body,
                line,
            }
        } else {
            Statement::ForInStatement {
                left,
                right,
                body,
                line,
            }
        })
    }

    fn parse_try_statement(&mut self) -> ParseResult<Statement> {
        let line = self.line()?;
        self.expect_keyword(Keyword::Try)?;
        let block = self.parse_block_body()?;

        let handler = if self.check_keyword(Keyword::Catch)? {
            self.lexer.next_token()?;
            let param = if self.eat_punctuator(Punctuator::LParen)? {
                let name = self.expect_identifier()?;
                self.expect_punctuator(Punctuator::RParen)?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block_body()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.check_keyword(Keyword::Finally)? {
            self.lexer.next_token()?;
            Some(self.parse_block_body()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(syntax_error("Missing catch or finally after try", line));
        }

        Ok(Statement::TryStatement {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_block_body(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect_punctuator(Punctuator::LBrace)?;
        let mut body = Vec::new();
        while !self.eat_punctuator(Punctuator::RBrace)? {
            if self.is_at_end()? {
                return Err(syntax_error("Unexpected end of input", self.lexer.token_line));
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment_expression()
    }

    fn parse_assignment_expression(&mut self) -> ParseResult<Expression> {
        self.enter()?;
        let result = self.parse_assignment_expression_inner();
        self.exit();
        result
    }

    fn parse_assignment_expression_inner(&mut self) -> ParseResult<Expression> {
        if self.is_arrow_ahead() {
            return self.parse_arrow_function();
        }

        let line = self.line()?;
        let left = self.parse_conditional_expression()?;
        let Some(operator) = self.check_assignment_operator()? else {
            return Ok(left);
        };
        self.lexer.next_token()?;
        let target = to_assignment_target(left, line)?;
        let right = self.parse_assignment_expression()?;
        Ok(Expression::AssignmentExpression {
            operator,
            left: Box::new(target),
            right: Box::new(right),
            line,
        })
    }

    fn check_assignment_operator(&mut self) -> ParseResult<Option<AssignmentOperator>> {
        Ok(match self.lexer.peek_token()? {
            Token::Punctuator(Punctuator::Assign) => Some(AssignmentOperator::Assign),
            Token::Punctuator(Punctuator::PlusEq) => Some(AssignmentOperator::AddAssign),
            Token::Punctuator(Punctuator::MinusEq) => Some(AssignmentOperator::SubAssign),
            Token::Punctuator(Punctuator::StarEq) => Some(AssignmentOperator::MulAssign),
            Token::Punctuator(Punctuator::SlashEq) => Some(AssignmentOperator::DivAssign),
            Token::Punctuator(Punctuator::PercentEq) => Some(AssignmentOperator::ModAssign),
            _ => None,
        })
    }

    /// Looks ahead for `ident =>` or `( ... ) =>` without consuming input.
    fn is_arrow_ahead(&mut self) -> bool {
        let state = self.lexer.save();
        let found = self.scan_arrow_head().unwrap_or(false);
        self.lexer.restore(state);
        found
    }

    fn scan_arrow_head(&mut self) -> ParseResult<bool> {
        match self.lexer.next_token()? {
            Token::Identifier(_) => {}
            Token::Punctuator(Punctuator::LParen) => {
                let mut depth = 1u32;
                while depth > 0 {
                    match self.lexer.next_token()? {
                        Token::Punctuator(Punctuator::LParen) => depth += 1,
                        Token::Punctuator(Punctuator::RParen) => depth -= 1,
                        Token::EOF => return Ok(false),
                        _ => {}
                    }
                }
            }
            _ => return Ok(false),
        }
        Ok(matches!(
            self.lexer.next_token()?,
            Token::Punctuator(Punctuator::Arrow)
        ))
    }

    fn parse_arrow_function(&mut self) -> ParseResult<Expression> {
        let line = self.line()?;
        let params = if matches!(self.lexer.peek_token()?, Token::Identifier(_)) {
            vec![self.expect_identifier()?]
        } else {
            self.parse_parameters()?
        };
        self.expect_punctuator(Punctuator::Arrow)?;
        let body = if self.check_punctuator(Punctuator::LBrace)? {
            self.parse_function_body()?
        } else {
            let body_line = self.line()?;
            let saved_for_init = std::mem::replace(&mut self.in_for_init, false);
            let argument = self.parse_assignment_expression();
            self.in_for_init = saved_for_init;
            vec![Statement::ReturnStatement {
                argument: Some(argument?),
                line: body_line,
            }]
        };
        Ok(Expression::FunctionExpression(Rc::new(Function {
            name: None,
            params,
            body,
            line,
        })))
    }

    fn parse_conditional_expression(&mut self) -> ParseResult<Expression> {
        let test = self.parse_logical_or_expression()?;
        if !self.eat_punctuator(Punctuator::Question)? {
            return Ok(test);
        }
        let saved_for_init = std::mem::replace(&mut self.in_for_init, false);
        let consequent = self.parse_assignment_expression();
        self.in_for_init = saved_for_init;
        let consequent = consequent?;
        self.expect_punctuator(Punctuator::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(Expression::ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_logical_or_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_logical_and_expression()?;
        let base = self.nesting;
        loop {
            let operator = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::OrOr) => LogicalOperator::Or,
                Token::Punctuator(Punctuator::NullishCoalesce) => LogicalOperator::NullishCoalesce,
                _ => break,
            };
            self.lexer.next_token()?;
            self.enter()?;
            let right = self.parse_logical_and_expression()?;
            left = Expression::LogicalExpression {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        self.nesting = base;
        Ok(left)
    }

    fn parse_logical_and_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_equality_expression()?;
        let base = self.nesting;
        while self.eat_punctuator(Punctuator::AndAnd)? {
            self.enter()?;
            let right = self.parse_equality_expression()?;
            left = Expression::LogicalExpression {
                left: Box::new(left),
                operator: LogicalOperator::And,
                right: Box::new(right),
            };
        }
        self.nesting = base;
        Ok(left)
    }

    fn parse_equality_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_relational_expression()?;
        let base = self.nesting;
        loop {
            let line = self.line()?;
            let operator = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::EqEq) => BinaryOperator::Eq,
                Token::Punctuator(Punctuator::NotEq) => BinaryOperator::NotEq,
                Token::Punctuator(Punctuator::EqEqEq) => BinaryOperator::StrictEq,
                Token::Punctuator(Punctuator::NotEqEq) => BinaryOperator::StrictNotEq,
                _ => break,
            };
            self.lexer.next_token()?;
            self.enter()?;
            let right = self.parse_relational_expression()?;
            left = binary(left, operator, right, line);
        }
        self.nesting = base;
        Ok(left)
    }

    fn parse_relational_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive_expression()?;
        let base = self.nesting;
        loop {
            let line = self.line()?;
            let operator = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::Lt) => BinaryOperator::Lt,
                Token::Punctuator(Punctuator::LtEq) => BinaryOperator::LtEq,
                Token::Punctuator(Punctuator::Gt) => BinaryOperator::Gt,
                Token::Punctuator(Punctuator::GtEq) => BinaryOperator::GtEq,
                Token::Keyword(Keyword::In) if !self.in_for_init => BinaryOperator::In,
                _ => break,
            };
            self.lexer.next_token()?;
            self.enter()?;
            let right = self.parse_additive_expression()?;
            left = binary(left, operator, right, line);
        }
        self.nesting = base;
        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative_expression()?;
        let base = self.nesting;
        loop {
            let line = self.line()?;
            let operator = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::Plus) => BinaryOperator::Add,
                Token::Punctuator(Punctuator::Minus) => BinaryOperator::Sub,
                _ => break,
            };
            self.lexer.next_token()?;
            self.enter()?;
            let right = self.parse_multiplicative_expression()?;
            left = binary(left, operator, right, line);
        }
        self.nesting = base;
        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary_expression()?;
        let base = self.nesting;
        loop {
            let line = self.line()?;
            let operator = match self.lexer.peek_token()? {
                Token::Punctuator(Punctuator::Star) => BinaryOperator::Mul,
                Token::Punctuator(Punctuator::Slash) => BinaryOperator::Div,
                Token::Punctuator(Punctuator::Percent) => BinaryOperator::Mod,
                _ => break,
            };
            self.lexer.next_token()?;
            self.enter()?;
            let right = self.parse_unary_expression()?;
            left = binary(left, operator, right, line);
        }
        self.nesting = base;
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expression> {
        self.enter()?;
        let result = self.parse_unary_expression_inner();
        self.exit();
        result
    }

    fn parse_unary_expression_inner(&mut self) -> ParseResult<Expression> {
        let line = self.line()?;
        let operator = match self.lexer.peek_token()? {
            Token::Punctuator(Punctuator::Not) => UnaryOperator::Not,
            Token::Punctuator(Punctuator::Minus) => UnaryOperator::Minus,
            Token::Punctuator(Punctuator::Plus) => UnaryOperator::Plus,
            Token::Keyword(Keyword::Typeof) => UnaryOperator::Typeof,
            Token::Punctuator(Punctuator::PlusPlus | Punctuator::MinusMinus) => {
                let operator = if self.check_punctuator(Punctuator::PlusPlus)? {
                    UpdateOperator::Increment
                } else {
                    UpdateOperator::Decrement
                };
                self.lexer.next_token()?;
                let argument = self.parse_unary_expression()?;
                return Ok(Expression::UpdateExpression {
                    operator,
                    prefix: true,
                    argument: Box::new(to_assignment_target(argument, line)?),
                    line,
                });
            }
            _ => return self.parse_postfix_expression(),
        };
        self.lexer.next_token()?;
        let argument = self.parse_unary_expression()?;
        Ok(Expression::UnaryExpression {
            operator,
            argument: Box::new(argument),
            line,
        })
    }

    fn parse_postfix_expression(&mut self) -> ParseResult<Expression> {
        let line = self.line()?;
        let expression = self.parse_call_member_expression()?;
        let operator = match self.lexer.peek_token()? {
            Token::Punctuator(Punctuator::PlusPlus) => UpdateOperator::Increment,
            Token::Punctuator(Punctuator::MinusMinus) => UpdateOperator::Decrement,
            _ => return Ok(expression),
        };
        if self.lexer.line_terminator_before_token {
            return Ok(expression);
        }
        self.lexer.next_token()?;
        Ok(Expression::UpdateExpression {
            operator,
            prefix: false,
            argument: Box::new(to_assignment_target(expression, line)?),
            line,
        })
    }

    fn parse_call_member_expression(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_primary_expression()?;
        let base = self.nesting;
        loop {
            let line = self.line()?;
            if self.eat_punctuator(Punctuator::Dot)? {
                let name = match self.lexer.next_token()? {
                    Token::Identifier(name) => name,
                    Token::Keyword(keyword) => keyword.as_str().to_string(),
                    other => {
                        return Err(unexpected_token("property name", &other.describe(), line));
                    }
                };
                expression = Expression::MemberExpression {
                    object: Box::new(expression),
                    property: MemberProperty::Identifier(name),
                    line,
                };
            } else if self.eat_punctuator(Punctuator::LBracket)? {
                let saved_for_init = std::mem::replace(&mut self.in_for_init, false);
                let property = self.parse_expression();
                self.in_for_init = saved_for_init;
                let property = property?;
                self.expect_punctuator(Punctuator::RBracket)?;
                expression = Expression::MemberExpression {
                    object: Box::new(expression),
                    property: MemberProperty::Computed(Box::new(property)),
                    line,
                };
            } else if self.check_punctuator(Punctuator::LParen)? {
                let arguments = self.parse_arguments()?;
                expression = Expression::CallExpression {
                    callee: Box::new(expression),
                    arguments,
                    line,
                };
            } else {
                self.nesting = base;
                return Ok(expression);
            }
            self.enter()?;
        }
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        self.expect_punctuator(Punctuator::LParen)?;
        let saved_for_init = std::mem::replace(&mut self.in_for_init, false);
        let arguments = self.parse_list(Punctuator::RParen);
        self.in_for_init = saved_for_init;
        arguments
    }

    /// Comma separated expressions up to `close`; a trailing comma is allowed.
    fn parse_list(&mut self, close: Punctuator) -> ParseResult<Vec<Expression>> {
        let mut items = Vec::new();
        while !self.eat_punctuator(close)? {
            items.push(self.parse_assignment_expression()?);
            if !self.check_punctuator(close)? {
                self.expect_punctuator(Punctuator::Comma)?;
            }
        }
        Ok(items)
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expression> {
        let line = self.line()?;
        if self.check_keyword(Keyword::Function)? {
            return Ok(Expression::FunctionExpression(self.parse_function(false)?));
        }
        match self.lexer.next_token()? {
            Token::Identifier(name) => Ok(Expression::Identifier { name, line }),
            Token::Number(n) => Ok(Expression::Literal(Literal::Number(n))),
            Token::String(s) => Ok(Expression::Literal(Literal::String(s))),
            Token::Keyword(Keyword::True) => Ok(Expression::Literal(Literal::Boolean(true))),
            Token::Keyword(Keyword::False) => Ok(Expression::Literal(Literal::Boolean(false))),
            Token::Keyword(Keyword::Null) => Ok(Expression::Literal(Literal::Null)),
            Token::Punctuator(Punctuator::LParen) => {
                let saved_for_init = std::mem::replace(&mut self.in_for_init, false);
                let expression = self.parse_expression();
                self.in_for_init = saved_for_init;
                let expression = expression?;
                self.expect_punctuator(Punctuator::RParen)?;
                Ok(expression)
            }
            Token::Punctuator(Punctuator::LBracket) => {
                let saved_for_init = std::mem::replace(&mut self.in_for_init, false);
                let elements = self.parse_list(Punctuator::RBracket);
                self.in_for_init = saved_for_init;
                Ok(Expression::ArrayExpression {
                    elements: elements?,
                })
            }
            Token::Punctuator(Punctuator::LBrace) => {
                let saved_for_init = std::mem::replace(&mut self.in_for_init, false);
                let properties = self.parse_object_properties();
                self.in_for_init = saved_for_init;
                Ok(Expression::ObjectExpression {
                    properties: properties?,
                })
            }
            Token::EOF => Err(syntax_error("Unexpected end of input", line)),
            other => Err(syntax_error(
                format!("Unexpected {}", other.describe()),
                line,
            )),
        }
    }

    fn parse_object_properties(&mut self) -> ParseResult<Vec<(String, Expression)>> {
        let mut properties = Vec::new();
        while !self.eat_punctuator(Punctuator::RBrace)? {
            let line = self.line()?;
            let (key, shorthand_ok) = match self.lexer.next_token()? {
                Token::Identifier(name) => (name, true),
                Token::Keyword(keyword) => (keyword.as_str().to_string(), false),
                Token::String(s) => (s, false),
                Token::Number(n) => (number_key(n), false),
                other => {
                    return Err(unexpected_token("property name", &other.describe(), line));
                }
            };
            let value = if self.eat_punctuator(Punctuator::Colon)? {
                self.parse_assignment_expression()?
            } else if shorthand_ok {
                Expression::Identifier {
                    name: key.clone(),
                    line,
                }
            } else {
                return Err(syntax_error("Expected ':' after property name", line));
            };
            properties.push((key, value));
            if !self.check_punctuator(Punctuator::RBrace)? {
                self.expect_punctuator(Punctuator::Comma)?;
            }
        }
        Ok(properties)
    }
}

fn binary(left: Expression, operator: BinaryOperator, right: Expression, line: u32) -> Expression {
    Expression::BinaryExpression {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        line,
    }
}

fn to_assignment_target(expression: Expression, line: u32) -> ParseResult<AssignmentTarget> {
    match expression {
        Expression::Identifier { name, .. } => Ok(AssignmentTarget::Identifier(name)),
        Expression::MemberExpression {
            object, property, ..
        } => Ok(AssignmentTarget::Member {
            object: *object,
            property,
        }),
        _ => Err(syntax_error("Invalid assignment target", line)),
    }
}

/// Property key for a numeric literal key: integers print without a
/// fraction.
fn number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
