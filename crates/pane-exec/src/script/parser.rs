//! Recursive-descent parser with binding-power expression parsing.
//!
//! Statements need no terminator; a `;` is accepted and ignored. To keep that
//! unambiguous, a call `(` or index `[` only continues an expression when it
//! sits on the same line as the token before it.
use std::rc::Rc;

use super::{
    SyntaxError,
    ast::{BinaryOp, Expr, FnDef, Literal, Name, Program, Stmt, StmtKind, Target, UnaryOp},
    lexer::{Lexer, Token, TokenKind},
};

const PREC_PREFIX: u8 = 13;

/// Default bound on syntactic nesting: blocks, groupings, literals and
/// operator chains all count one level each.
pub const DEFAULT_MAX_NESTING: usize = 200;

/// Parse a whole script, stopping at the first syntax error.
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    parse_with_limit(source, DEFAULT_MAX_NESTING)
}

/// Like [`parse`], rejecting anything nested deeper than `max_nesting`.
///
/// The resulting tree is at most `max_nesting` levels deep, which bounds the
/// recursion of everything that later walks or drops it.
pub fn parse_with_limit(source: &str, max_nesting: usize) -> Result<Program, SyntaxError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
        max_nesting,
    };
    let body = parser.parse_until(&TokenKind::Eof)?;
    Ok(Program { body })
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
    max_nesting: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.cursor.min(last)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn previous_line(&self) -> u32 {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.line)
    }

    fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        let token = self.current();
        SyntaxError::new(message, token.line, token.column)
    }

    /// One level deeper; callers reset `depth` to its entry value on success.
    fn descend(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= self.max_nesting {
            return Err(self.error_here(format!(
                "too deeply nested (limit {})",
                self.max_nesting
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, SyntaxError> {
        if self.check(&kind) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected {what}, found {}", self.current_kind())))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<Name, SyntaxError> {
        match self.current_kind() {
            TokenKind::Ident(name) => {
                let name: Name = Rc::from(name.as_str());
                self.bump();
                Ok(name)
            }
            other => Err(self.error_here(format!("expected {what}, found {other}"))),
        }
    }

    fn parse_until(&mut self, end: &TokenKind) -> Result<Vec<Stmt>, SyntaxError> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.check(end) || self.check(&TokenKind::Eof) {
                return Ok(stmts);
            }
            stmts.push(self.parse_statement()?);
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.expect(TokenKind::LBrace, "`{` to open block")?;
        self.descend()?;
        let body = self.parse_until(&TokenKind::RBrace)?;
        self.depth -= 1;
        self.expect(TokenKind::RBrace, "`}` to close block")?;
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.current().line;
        let kind = match self.current_kind() {
            TokenKind::KwLet => {
                self.bump();
                let name = self.expect_ident("variable name after `let`")?;
                let value = if self.eat(&TokenKind::Eq) {
                    self.parse_expression()?
                } else {
                    Expr::Literal(Literal::Null)
                };
                StmtKind::Let(name, value)
            }
            TokenKind::KwFn if matches!(self.peek_kind(1), Some(TokenKind::Ident(_))) => {
                self.bump();
                let name = self.expect_ident("function name")?;
                StmtKind::Fn(self.parse_fn_rest(name, line)?)
            }
            TokenKind::KwIf => self.parse_if()?,
            TokenKind::KwWhile => {
                self.bump();
                let cond = self.parse_expression()?;
                let body = self.parse_block()?;
                StmtKind::While { cond, body }
            }
            TokenKind::KwFor => {
                self.bump();
                let var = self.expect_ident("loop variable after `for`")?;
                self.expect(TokenKind::KwIn, "`in`")?;
                let iter = self.parse_expression()?;
                let body = self.parse_block()?;
                StmtKind::For { var, iter, body }
            }
            TokenKind::KwBreak => {
                self.bump();
                StmtKind::Break
            }
            TokenKind::KwContinue => {
                self.bump();
                StmtKind::Continue
            }
            TokenKind::KwReturn => {
                self.bump();
                let ends = matches!(
                    self.current_kind(),
                    TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
                ) || self.current().line != line;
                StmtKind::Return(if ends { None } else { Some(self.parse_expression()?) })
            }
            TokenKind::KwRaise => {
                self.bump();
                StmtKind::Raise(self.parse_expression()?)
            }
            TokenKind::KwTry => {
                self.bump();
                let body = self.parse_block()?;
                self.expect(TokenKind::KwCatch, "`catch` after `try` block")?;
                let binding = match self.current_kind() {
                    TokenKind::Ident(_) => Some(self.expect_ident("error binding")?),
                    _ => None,
                };
                let handler = self.parse_block()?;
                StmtKind::Try {
                    body,
                    binding,
                    handler,
                }
            }
            _ => self.parse_expression_statement()?,
        };
        Ok(Stmt { kind, line })
    }

    fn peek_kind(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.cursor + ahead).map(|t| &t.kind)
    }

    fn parse_if(&mut self) -> Result<StmtKind, SyntaxError> {
        let mut branches = Vec::new();
        let mut otherwise = None;

        self.expect(TokenKind::KwIf, "`if`")?;
        loop {
            let cond = self.parse_expression()?;
            let body = self.parse_block()?;
            branches.push((cond, body));

            if !self.eat(&TokenKind::KwElse) {
                break;
            }
            if self.eat(&TokenKind::KwIf) {
                continue;
            }
            otherwise = Some(self.parse_block()?);
            break;
        }
        Ok(StmtKind::If {
            branches,
            otherwise,
        })
    }

    fn parse_expression_statement(&mut self) -> Result<StmtKind, SyntaxError> {
        let start = self.current().clone();
        let expr = self.parse_expression()?;

        let op = match self.current_kind() {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinaryOp::Add),
            TokenKind::MinusEq => Some(BinaryOp::Sub),
            TokenKind::StarEq => Some(BinaryOp::Mul),
            TokenKind::SlashEq => Some(BinaryOp::Div),
            _ => return Ok(StmtKind::Expr(expr)),
        };
        self.bump();

        let target = match expr {
            Expr::Ident(name) => Target::Name(name),
            Expr::Index { target, index } => Target::Index {
                target: *target,
                index: *index,
            },
            Expr::Field { target, name } => Target::Field {
                target: *target,
                name,
            },
            _ => {
                return Err(SyntaxError::new(
                    "cannot assign to this expression",
                    start.line,
                    start.column,
                ));
            }
        };
        let value = self.parse_expression()?;
        Ok(StmtKind::Assign { target, op, value })
    }

    fn parse_fn_rest(&mut self, name: Name, line: u32) -> Result<Rc<FnDef>, SyntaxError> {
        self.expect(TokenKind::LParen, "`(` to open parameter list")?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let param = self.expect_ident("parameter name")?;
            if params.contains(&param) {
                return Err(self.error_here(format!("duplicate parameter `{param}`")));
            }
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "`)` to close parameter list")?;
        let body = self.parse_block()?;
        Ok(Rc::new(FnDef {
            name,
            params,
            body,
            line,
        }))
    }

    pub(super) fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_expression_bp(0)
    }

    fn parse_expression_bp(&mut self, min_bp: u8) -> Result<Expr, SyntaxError> {
        let entry = self.depth;
        self.descend()?;
        let mut lhs = match self.current_kind() {
            TokenKind::Minus => {
                self.bump();
                let rhs = self.parse_expression_bp(PREC_PREFIX)?;
                Expr::Unary(UnaryOp::Neg, Box::new(rhs))
            }
            TokenKind::Bang => {
                self.bump();
                let rhs = self.parse_expression_bp(PREC_PREFIX)?;
                Expr::Unary(UnaryOp::Not, Box::new(rhs))
            }
            _ => self.parse_postfix()?,
        };

        while let Some((left_bp, right_bp)) = infix_binding_power(self.current_kind()) {
            if left_bp < min_bp {
                break;
            }
            let op = self.bump().kind;
            // each wrap deepens the left spine
            self.descend()?;
            let rhs = self.parse_expression_bp(right_bp)?;
            let (l, r) = (Box::new(lhs), Box::new(rhs));
            lhs = match op {
                TokenKind::AndAnd => Expr::And(l, r),
                TokenKind::OrOr => Expr::Or(l, r),
                other => match binary_op(&other) {
                    Some(op) => Expr::Binary(op, l, r),
                    None => return Err(self.error_here(format!("unexpected operator {other}"))),
                },
            };
        }
        self.depth = entry;
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let entry = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            let same_line = self.current().line == self.previous_line();
            match self.current_kind() {
                TokenKind::LParen if same_line => {
                    self.bump();
                    self.descend()?;
                    let args = self.parse_list(TokenKind::RParen, "`)` to close call")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                TokenKind::LBracket if same_line => {
                    self.bump();
                    self.descend()?;
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "`]` to close index")?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::Dot => {
                    self.bump();
                    self.descend()?;
                    let name = self.expect_ident("field name after `.`")?;
                    expr = Expr::Field {
                        target: Box::new(expr),
                        name,
                    };
                }
                _ => {
                    self.depth = entry;
                    return Ok(expr);
                }
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.current().clone();
        let expr = match token.kind {
            TokenKind::Ident(name) => Expr::Ident(Rc::from(name.as_str())),
            TokenKind::Int(v) => Expr::Literal(Literal::Int(v)),
            TokenKind::Float(v) => Expr::Literal(Literal::Float(v)),
            TokenKind::Str(s) => Expr::Literal(Literal::Str(Rc::from(s.as_str()))),
            TokenKind::KwTrue => Expr::Literal(Literal::Bool(true)),
            TokenKind::KwFalse => Expr::Literal(Literal::Bool(false)),
            TokenKind::KwNull => Expr::Literal(Literal::Null),
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, "`)` to close grouping")?;
                return Ok(inner);
            }
            TokenKind::LBracket => {
                self.bump();
                let items = self.parse_list(TokenKind::RBracket, "`]` to close list")?;
                return Ok(Expr::List(items));
            }
            TokenKind::LBrace => {
                self.bump();
                return self.parse_map_rest();
            }
            TokenKind::KwFn => {
                self.bump();
                let def = self.parse_fn_rest(Rc::from("<lambda>"), token.line)?;
                return Ok(Expr::Lambda(def));
            }
            other => return Err(self.error_here(format!("expected expression, found {other}"))),
        };
        self.bump();
        Ok(expr)
    }

    fn parse_list(&mut self, close: TokenKind, what: &str) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        while !self.check(&close) {
            items.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close, what)?;
        Ok(items)
    }

    fn parse_map_rest(&mut self) -> Result<Expr, SyntaxError> {
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key: Rc<str> = match self.current_kind() {
                TokenKind::Ident(k) | TokenKind::Str(k) => Rc::from(k.as_str()),
                other => {
                    return Err(self.error_here(format!("expected map key, found {other}")));
                }
            };
            self.bump();
            self.expect(TokenKind::Colon, "`:` after map key")?;
            entries.push((key, self.parse_expression()?));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}` to close map")?;
        Ok(Expr::Map(entries))
    }
}

fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8)> {
    let bp = match kind {
        TokenKind::OrOr => (1, 2),
        TokenKind::AndAnd => (3, 4),
        TokenKind::EqEq | TokenKind::NotEq => (5, 6),
        TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => (7, 8),
        TokenKind::Plus | TokenKind::Minus => (9, 10),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => (11, 12),
        _ => return None,
    };
    Some(bp)
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(src: &str) -> StmtKind {
        let mut program = parse(src).unwrap();
        assert_eq!(program.body.len(), 1, "{src}");
        program.body.remove(0).kind
    }

    fn ident(name: &str) -> Expr {
        Expr::Ident(Rc::from(name))
    }

    fn int(v: i64) -> Expr {
        Expr::Literal(Literal::Int(v))
    }

    #[test]
    fn precedence_binds_multiplication_tighter() {
        let StmtKind::Expr(expr) = single("1 + 2 * 3") else {
            panic!("expected expression");
        };
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(int(1)),
                Box::new(Expr::Binary(BinaryOp::Mul, Box::new(int(2)), Box::new(int(3)))),
            )
        );
    }

    #[test]
    fn compound_assignment_to_index() {
        let StmtKind::Assign { target, op, .. } = single("xs[0] += 1") else {
            panic!("expected assignment");
        };
        assert_eq!(op, Some(BinaryOp::Add));
        assert_eq!(
            target,
            Target::Index {
                target: ident("xs"),
                index: int(0),
            }
        );
    }

    #[test]
    fn newline_separates_statements_before_paren() {
        let program = parse("let a = b\n(c)").unwrap();
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn semicolons_are_optional() {
        let program = parse("let a = 1; let b = 2\nlet c = 3;;").unwrap();
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn statements_record_their_line() {
        let program = parse("let a = 1\n\nfn f(x) {\n  return x\n}\nf(a)").unwrap();
        let lines: Vec<_> = program.body.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 3, 6]);

        let StmtKind::Fn(def) = &program.body[1].kind else {
            panic!("expected fn");
        };
        assert_eq!(&*def.name, "f");
        assert_eq!(def.body[0].line, 4);
    }

    #[test]
    fn if_else_chain() {
        let StmtKind::If {
            branches,
            otherwise,
        } = single("if a { 1 } else if b { 2 } else { 3 }")
        else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 2);
        assert!(otherwise.is_some());
    }

    #[test]
    fn map_literal_and_field_access() {
        let StmtKind::Expr(Expr::Field { target, name }) = single("{a: 1, \"b c\": 2}.a") else {
            panic!("expected field access");
        };
        assert_eq!(&*name, "a");
        assert!(matches!(*target, Expr::Map(ref e) if e.len() == 2));
    }

    #[test]
    fn lambda_expression() {
        let StmtKind::Let(_, Expr::Lambda(def)) = single("let f = fn(a, b) { return a + b }") else {
            panic!("expected lambda");
        };
        assert_eq!(&*def.name, "<lambda>");
        assert_eq!(def.params.len(), 2);
    }

    #[test]
    fn bare_return_at_end_of_block() {
        let program = parse("fn f() {\n  return\n}").unwrap();
        let StmtKind::Fn(def) = &program.body[0].kind else {
            panic!("expected fn");
        };
        assert_eq!(def.body[0].kind, StmtKind::Return(None));
    }

    #[test]
    fn errors_carry_position() {
        let err = parse("let x = 1\nlet y = ;").unwrap_err();
        assert_eq!((err.line, err.column), (2, 9));
        assert!(err.message.starts_with("expected expression"), "{}", err.message);

        let err = parse("1 = 2").unwrap_err();
        assert_eq!(err.message, "cannot assign to this expression");

        let err = parse("while true {").unwrap_err();
        assert!(err.message.contains("`}`"), "{}", err.message);
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let lists = format!("let x = {}1{}", "[".repeat(3000), "]".repeat(3000));
        let err = parse(&lists).unwrap_err();
        assert!(err.message.starts_with("too deeply nested"), "{}", err.message);
        assert_eq!(err.line, 1);

        let parens = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
        assert!(parse(&parens).is_err());

        let negations = format!("let y = {}1", "-".repeat(5000));
        assert!(parse(&negations).is_err());

        let blocks = format!("{}{}", "if true {\n".repeat(3000), "}\n".repeat(3000));
        let err = parse(&blocks).unwrap_err();
        assert!(err.message.starts_with("too deeply nested"), "{}", err.message);
    }

    #[test]
    fn long_operator_chains_count_as_nesting() {
        let chain = format!("let s = 1{}", " + 1".repeat(10_000));
        let err = parse(&chain).unwrap_err();
        assert!(err.message.contains("limit 200"), "{}", err.message);

        let fields = format!("a{}", ".b".repeat(10_000));
        assert!(parse(&fields).is_err());
    }

    #[test]
    fn nesting_limit_is_configurable() {
        let src = "let x = [[[1]]]";
        assert!(parse_with_limit(src, 3).is_err());
        assert!(parse_with_limit(src, 4).is_ok());

        // depth is released after each sibling
        let wide = format!("let x = [{}]", "[[1]], ".repeat(500));
        assert!(parse_with_limit(&wide, 8).is_ok());
        assert!(parse(&format!("let s = 1{}", " + 1".repeat(150))).is_ok());
    }
}
