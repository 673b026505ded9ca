//! Recursive-descent parser for one row.
//!
//! A row is either a complete statement or an `if <condition>:` header. An
//! `if` with a statement after the colon is a statement of its own.

use crate::error::ParseError;

use super::ast::{BinOp, BoolOp, CmpOp, Const, Expr, Line, Stmt, UnaryOp};
use super::lexer::{tokenize, Token, TokenKind};

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "if", "elif", "else", "while", "for", "in", "is", "def", "return",
    "pass", "print", "lambda", "del", "import", "from", "class", "with", "global",
];

fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Parse a row into a statement or an `if` header.
pub fn parse_line(source: &str) -> Result<Line, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(&tokens);
    if parser.at_keyword("if") {
        return parser.if_row();
    }
    parser.statement().map(Line::Statement)
}

/// Parse a row that must be a complete statement.
pub fn parse_statement(source: &str) -> Result<Stmt, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(&tokens).statement()
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn column(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].column
    }

    fn advance(&mut self) -> &TokenKind {
        let idx = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[idx].kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {}", kind.describe())))
        }
    }

    fn unexpected(&self, context: &str) -> ParseError {
        ParseError::new(
            format!("{}, found {}", context, self.peek().describe()),
            self.column(),
        )
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), TokenKind::Name(n) if n == word)
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if *self.peek() == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected("expected end of statement"))
        }
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if *self.peek() == TokenKind::Eof {
            // Nothing but a comment.
            if self.column() > 0 {
                return Ok(Stmt::Pass);
            }
            return Err(ParseError::new("empty statement", 0));
        }

        if self.at_keyword("if") {
            return match self.if_row()? {
                Line::Statement(stmt) => Ok(stmt),
                Line::IfHeader(_) => Err(self.unexpected("expected a statement after `:`")),
            };
        }

        if self.at_keyword("pass") {
            self.advance();
            self.expect_end()?;
            return Ok(Stmt::Pass);
        }

        if self.at_keyword("print") {
            self.advance();
            let args = self.print_args()?;
            self.expect_end()?;
            return Ok(Stmt::Print(args));
        }

        if let TokenKind::Name(name) = self.peek().clone() {
            if !is_keyword(&name) {
                if let Some(op) = aug_op(self.peek_at(1)) {
                    self.advance();
                    self.advance();
                    let value = self.expression()?;
                    self.expect_end()?;
                    return Ok(Stmt::AugAssign {
                        target: name,
                        op,
                        value,
                    });
                }
                if *self.peek_at(1) == TokenKind::Assign {
                    return self.assignment();
                }
            }
        }

        let expr = self.expression()?;
        if *self.peek() == TokenKind::Assign {
            return Err(self.unexpected("can only assign to a plain name"));
        }
        self.expect_end()?;
        Ok(Stmt::Expr(expr))
    }

    fn assignment(&mut self) -> Result<Stmt, ParseError> {
        let mut targets = Vec::new();
        loop {
            match (self.peek().clone(), self.peek_at(1).clone()) {
                (TokenKind::Name(name), TokenKind::Assign) if !is_keyword(&name) => {
                    self.advance();
                    self.advance();
                    targets.push(name);
                }
                _ => break,
            }
        }
        let value = self.expression()?;
        self.expect_end()?;
        Ok(Stmt::Assign { targets, value })
    }

    /// `print a, b` or `print(a, b)`.
    fn print_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        if *self.peek() == TokenKind::Eof {
            return Ok(Vec::new());
        }
        if *self.peek() == TokenKind::LParen && self.closing_paren_is_last() {
            self.advance();
            let args = self.comma_list(&TokenKind::RParen)?;
            self.expect(&TokenKind::RParen)?;
            return Ok(args);
        }
        let mut args = vec![self.expression()?];
        while self.eat(&TokenKind::Comma) {
            args.push(self.expression()?);
        }
        Ok(args)
    }

    fn closing_paren_is_last(&self) -> bool {
        let mut depth = 0usize;
        for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.tokens[self.pos + offset + 1].kind == TokenKind::Eof;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    /// `if cond:` opens a block; `if cond: stmt` guards a single statement.
    fn if_row(&mut self) -> Result<Line, ParseError> {
        if !self.at_keyword("if") {
            return Err(self.unexpected("expected `if`"));
        }
        self.advance();
        let condition = self.expression()?;
        self.expect(&TokenKind::Colon)?;
        if *self.peek() == TokenKind::Eof {
            return Ok(Line::IfHeader(condition));
        }
        let body = self.statement()?;
        Ok(Line::Statement(Stmt::If {
            condition,
            body: Box::new(body),
        }))
    }

    fn comma_list(&mut self, close: &TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.peek() == close {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if !self.eat(&TokenKind::Comma) || self.peek() == close {
                break;
            }
        }
        Ok(items)
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.at_keyword("or") {
            self.advance();
            let rhs = self.and_expr()?;
            lhs = Expr::Bool {
                op: BoolOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.not_expr()?;
        while self.at_keyword("and") {
            self.advance();
            let rhs = self.not_expr()?;
            lhs = Expr::Bool {
                op: BoolOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.at_keyword("not") {
            self.advance();
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let first = self.additive()?;
        let mut rest = Vec::new();
        while let Some(op) = cmp_op(self.peek()) {
            self.advance();
            rest.push((op, self.additive()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            TokenKind::Minus => {
                self.advance();
                let operand = self.unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Plus => {
                self.advance();
                self.unary()
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.comma_list(&TokenKind::RParen)?;
                    self.expect(&TokenKind::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = match self.advance().clone() {
                        TokenKind::Name(name) if !is_keyword(&name) => name,
                        _ => {
                            self.pos = self.pos.saturating_sub(1);
                            return Err(self.unexpected("expected attribute name"));
                        }
                    };
                    expr = Expr::Attribute {
                        object: Box::new(expr),
                        name,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let expr = match self.peek().clone() {
            TokenKind::Int(i) => Expr::Const(Const::Int(i)),
            TokenKind::Float(f) => Expr::Const(Const::Float(f)),
            TokenKind::Str(s) => Expr::Const(Const::Str(s)),
            TokenKind::Name(name) => match name.as_str() {
                "True" => Expr::Const(Const::Bool(true)),
                "False" => Expr::Const(Const::Bool(false)),
                "None" => Expr::Const(Const::None),
                _ if is_keyword(&name) => {
                    return Err(self.unexpected("unexpected keyword"));
                }
                _ => Expr::Name(name),
            },
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen)?;
                return Ok(inner);
            }
            _ => return Err(self.unexpected("expected an expression")),
        };
        self.advance();
        Ok(expr)
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn aug_op(kind: &TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::PlusAssign => Some(BinOp::Add),
        TokenKind::MinusAssign => Some(BinOp::Sub),
        TokenKind::StarAssign => Some(BinOp::Mul),
        TokenKind::SlashAssign => Some(BinOp::Div),
        _ => None,
    }
}

fn cmp_op(kind: &TokenKind) -> Option<CmpOp> {
    match kind {
        TokenKind::EqEq => Some(CmpOp::Eq),
        TokenKind::NotEq => Some(CmpOp::NotEq),
        TokenKind::Lt => Some(CmpOp::Lt),
        TokenKind::Le => Some(CmpOp::Le),
        TokenKind::Gt => Some(CmpOp::Gt),
        TokenKind::Ge => Some(CmpOp::Ge),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Expr {
        Expr::Name(n.to_string())
    }

    #[test]
    fn test_method_call_statement() {
        let stmt = parse_statement("mutex.wait()").expect("parse");
        assert_eq!(
            stmt,
            Stmt::Expr(Expr::Call {
                callee: Box::new(Expr::Attribute {
                    object: Box::new(name("mutex")),
                    name: "wait".into(),
                }),
                args: vec![],
            })
        );
    }

    #[test]
    fn test_chained_assignment() {
        let stmt = parse_statement("a = b = Semaphore(0)").expect("parse");
        match stmt {
            Stmt::Assign { targets, .. } => assert_eq!(targets, vec!["a", "b"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_augmented_assignment() {
        let stmt = parse_statement("count += 1").expect("parse");
        assert_eq!(
            stmt,
            Stmt::AugAssign {
                target: "count".into(),
                op: BinOp::Add,
                value: Expr::Const(Const::Int(1)),
            }
        );
    }

    #[test]
    fn test_print_forms() {
        assert_eq!(
            parse_statement("print True").expect("parse"),
            Stmt::Print(vec![Expr::Const(Const::Bool(true))])
        );
        assert_eq!(
            parse_statement("print(a, b)").expect("parse"),
            Stmt::Print(vec![name("a"), name("b")])
        );
        // The parentheses belong to the first argument here.
        assert_eq!(
            parse_statement("print (a) + 1").expect("parse"),
            Stmt::Print(vec![binary(
                BinOp::Add,
                name("a"),
                Expr::Const(Const::Int(1))
            )])
        );
        assert_eq!(parse_statement("print").expect("parse"), Stmt::Print(vec![]));
    }

    #[test]
    fn test_precedence() {
        let stmt = parse_statement("x = 1 + 2 * 3 == 7 and not done").expect("parse");
        let Stmt::Assign { value, .. } = stmt else {
            panic!("expected assignment");
        };
        let Expr::Bool { op: BoolOp::And, lhs, rhs } = value else {
            panic!("expected and");
        };
        assert!(matches!(*lhs, Expr::Compare { .. }));
        assert!(matches!(*rhs, Expr::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn test_if_header_and_statement() {
        let line = parse_line("if counter == 0:").expect("parse");
        assert!(matches!(line, Line::IfHeader(Expr::Compare { .. })));

        let line = parse_line("counter = 0").expect("parse");
        assert!(matches!(line, Line::Statement(Stmt::Assign { .. })));
    }

    #[test]
    fn test_inline_if_body() {
        let line = parse_line("if x: y = 1").expect("parse");
        let Line::Statement(Stmt::If { condition, body }) = line else {
            panic!("expected a guarded statement");
        };
        assert_eq!(condition, name("x"));
        assert!(matches!(*body, Stmt::Assign { .. }));

        assert!(matches!(
            parse_statement("if done: print 'bye'"),
            Ok(Stmt::If { .. })
        ));
        assert!(parse_statement("if done:").is_err());
        assert!(parse_line("if x: y = = 1").is_err());
    }

    #[test]
    fn test_comment_only_row_is_pass() {
        assert_eq!(parse_statement("## note").expect("parse"), Stmt::Pass);
        assert_eq!(parse_line("# x = 1").expect("parse"), Line::Statement(Stmt::Pass));
        assert!(parse_statement("").is_err());
    }

    #[test]
    fn test_malformed_lines() {
        assert!(parse_line("while True:").is_err());
        assert!(parse_line("if counter == 0").is_err());
        assert!(parse_line("x = = 1").is_err());
        assert!(parse_line("x.y = 1").is_err());
        assert!(parse_line("mutex.wait(").is_err());
    }
}
