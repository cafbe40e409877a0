//! Recursive descent parser
//!
//! Precedence, loosest to tightest: cascade (`:>`), keyword sends,
//! binary operators (one level, left-associative), unary/postfix sends,
//! terms. Statements are separated by terminators (`.` or significant
//! newlines).

use crate::ast::{Arg, Expr, MethodDef, Stmt, Unit};
use crate::diagnostic::Diagnostic;
use crate::token::{Token, TokenKind};

/// Parser state over a token stream
pub struct Parser {
    tokens: Vec<Token>,
    i: usize,
}

type PResult<T> = Result<T, Diagnostic>;

impl Parser {
    /// Create a parser; the token stream must end with an Eof token
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, i: 0 }
    }

    /// Parse a whole compilation unit
    pub fn parse_unit(&mut self) -> PResult<Unit> {
        let mut stmts = Vec::new();
        self.skip_terminators();
        while !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
            if !self.is_at_end() && !self.check(TokenKind::Terminator) {
                return Err(self.error_here("Expected end of statement"));
            }
            self.skip_terminators();
        }
        Ok(Unit { stmts })
    }

    // ===== Statements =====

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        match self.peek_kind() {
            TokenKind::Nonlocal => {
                self.advance();
                let name = self.consume(TokenKind::Name, "name after `nonlocal´")?;
                self.consume(TokenKind::Assign, "`:=´ in nonlocal assignment")?;
                let value = self.parse_expr()?;
                Ok(Stmt::Assign {
                    nonlocal: true,
                    name: name.value,
                    value,
                    line: name.line,
                })
            }
            TokenKind::Type => {
                self.advance();
                let name = self.consume(TokenKind::Name, "name after `type´")?;
                Ok(Stmt::Type {
                    name: name.value,
                    line: name.line,
                })
            }
            TokenKind::If => {
                let line = self.peek().line;
                self.advance();
                let cond = self.parse_expr()?;
                self.consume(TokenKind::Return, "`return´ after condition")?;
                let value = self.parse_expr()?;
                Ok(Stmt::ReturnIf { cond, value, line })
            }
            TokenKind::Loop => {
                let line = self.peek().line;
                self.advance();
                Ok(Stmt::Loop { line })
            }
            TokenKind::Name if self.peek_kind_at(1) == TokenKind::Assign => {
                let name = self.advance();
                self.advance();
                let value = self.parse_expr()?;
                Ok(Stmt::Assign {
                    nonlocal: false,
                    name: name.value,
                    value,
                    line: name.line,
                })
            }
            TokenKind::Name if self.peek_kind_at(1) == TokenKind::Fn => {
                self.parse_method_def().map(Stmt::Method)
            }
            TokenKind::Field if self.peek_kind_at(1) == TokenKind::Assign => {
                let name = self.advance();
                self.advance();
                let value = self.parse_expr()?;
                Ok(Stmt::FieldAssign {
                    name: name.value,
                    value,
                    line: name.line,
                })
            }
            TokenKind::Import => Err(self.error_here("Imports are not supported")),
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    /// `Ns fn recv selector { body }`
    ///
    /// The selector pattern is one of `recv name`, `recv OP param`, or
    /// `recv k1: p1 k2: p2 …`.
    fn parse_method_def(&mut self) -> PResult<MethodDef> {
        let namespace = self.advance();
        self.consume(TokenKind::Fn, "`fn´")?;
        let receiver = self.consume(TokenKind::Name, "receiver name")?;

        let mut selector = String::new();
        let mut params = Vec::new();

        match self.peek_kind() {
            TokenKind::Key => {
                while self.check(TokenKind::Key) {
                    let key = self.advance();
                    selector.push_str(&key.value);
                    let param = self.consume(TokenKind::Name, "parameter name")?;
                    params.push(param.value);
                }
            }
            TokenKind::Operator => {
                let op = self.advance();
                selector = op.value;
                let param = self.consume(TokenKind::Name, "parameter name")?;
                params.push(param.value);
            }
            TokenKind::Name => {
                selector = self.advance().value;
            }
            _ => return Err(self.error_here("Invalid method parameters")),
        }

        let mut seen = vec![receiver.value.clone()];
        for param in &params {
            if seen.contains(param) {
                return Err(Diagnostic::error("Repeated parameter name", receiver.line)
                    .with_lexeme(param.clone()));
            }
            seen.push(param.clone());
        }

        self.consume(TokenKind::LeftBlock, "`{´ before method body")?;
        let body = self.parse_chunk()?;
        self.consume(TokenKind::RightBlock, "`}´ after method body")?;

        Ok(MethodDef {
            namespace: namespace.value,
            receiver: receiver.value,
            selector,
            params,
            body,
            line: namespace.line,
        })
    }

    /// Statements up to (not including) a closing `}` or end of input
    fn parse_chunk(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        self.skip_terminators();
        while !self.check(TokenKind::RightBlock) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
            if !self.check(TokenKind::RightBlock)
                && !self.is_at_end()
                && !self.check(TokenKind::Terminator)
            {
                return Err(self.error_here("Expected end of statement"));
            }
            self.skip_terminators();
        }
        Ok(stmts)
    }

    // ===== Expressions =====

    fn parse_expr(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_keyword_expr()?;
        while self.check(TokenKind::Cascade) {
            self.advance();
            expr = self.parse_cascade_cont(expr)?;
        }
        Ok(expr)
    }

    fn parse_keyword_expr(&mut self) -> PResult<Expr> {
        let recv = self.parse_binary_expr()?;
        let recv_rank = if self.check(TokenKind::At) {
            self.parse_rank()?
        } else {
            0
        };
        if !self.check(TokenKind::Key) {
            return Ok(recv);
        }
        self.finish_keyword_send(recv, recv_rank)
    }

    fn finish_keyword_send(&mut self, recv: Expr, recv_rank: u16) -> PResult<Expr> {
        let line = self.peek().line;
        let mut selector = String::new();
        let mut args = Vec::new();
        while self.check(TokenKind::Key) {
            let key = self.advance();
            selector.push_str(&key.value);
            let rank = if self.check(TokenKind::At) {
                self.parse_rank()?
            } else {
                0
            };
            let value = self.parse_binary_expr()?;
            args.push(Arg {
                key: key.value,
                rank,
                value,
            });
        }
        Ok(Expr::Call {
            recv: Box::new(recv),
            recv_rank,
            selector,
            args,
            line,
        })
    }

    /// Message(s) applied to a cascaded receiver: a keyword send, or a
    /// postfix chain with an optional binary tail and keyword send.
    fn parse_cascade_cont(&mut self, recv: Expr) -> PResult<Expr> {
        if self.check(TokenKind::Key) {
            return self.finish_keyword_send(recv, 0);
        }

        let before = self.i;
        let mut expr = self.parse_postfix(recv)?;
        expr = self.parse_binary_tail(expr, 0)?;
        if self.check(TokenKind::Key) {
            expr = self.finish_keyword_send(expr, 0)?;
        }
        if self.i == before {
            return Err(self.error_here("Expected message after `:>´"));
        }
        Ok(expr)
    }

    fn parse_binary_expr(&mut self) -> PResult<Expr> {
        let lhs = self.parse_unary_expr()?;
        let lhs_rank = if self.check(TokenKind::At)
            && self.rank_target_is(&[TokenKind::Operator, TokenKind::Type])
        {
            self.parse_rank()?
        } else {
            0
        };
        self.parse_binary_tail(lhs, lhs_rank)
    }

    fn parse_binary_tail(&mut self, mut lhs: Expr, mut lhs_rank: u16) -> PResult<Expr> {
        loop {
            match self.peek_kind() {
                TokenKind::Operator => {
                    let op = self.advance();
                    let rhs_rank = if self.check(TokenKind::At) {
                        self.parse_rank()?
                    } else {
                        0
                    };
                    let rhs = self.parse_unary_expr()?;
                    lhs = Expr::Binary {
                        lhs: Box::new(lhs),
                        lhs_rank,
                        op: op.value,
                        rhs: Box::new(rhs),
                        rhs_rank,
                        line: op.line,
                    };
                    lhs_rank = 0;
                }
                TokenKind::Type => {
                    let line = self.peek().line;
                    self.advance();
                    let rhs = self.parse_unary_expr()?;
                    lhs = Expr::TypeTest {
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                        line,
                    };
                    lhs_rank = 0;
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_unary_expr(&mut self) -> PResult<Expr> {
        let expr = self.parse_term()?;
        self.parse_postfix(expr)
    }

    /// Zero or more postfix sends: unary names, field reads, and
    /// `[index]` sugar, each optionally preceded by a rank.
    fn parse_postfix(&mut self, mut expr: Expr) -> PResult<Expr> {
        loop {
            match self.peek_kind() {
                TokenKind::Name => {
                    let method = self.advance();
                    expr = Expr::Unary {
                        recv: Box::new(expr),
                        recv_rank: 0,
                        method: method.value,
                        line: method.line,
                    };
                }
                TokenKind::Field => {
                    let field = self.advance();
                    expr = Expr::Unary {
                        recv: Box::new(expr),
                        recv_rank: 0,
                        method: format!("&{}", field.value),
                        line: field.line,
                    };
                }
                TokenKind::LeftList => {
                    let line = self.peek().line;
                    self.advance();
                    let index = self.parse_expr()?;
                    self.consume(TokenKind::RightList, "`]´ after index")?;
                    expr = Expr::Index {
                        recv: Box::new(expr),
                        index: Box::new(index),
                        line,
                    };
                }
                TokenKind::At
                    if self.rank_target_is(&[TokenKind::Name, TokenKind::Field]) =>
                {
                    let rank = self.parse_rank()?;
                    let method = self.advance();
                    let name = match method.kind {
                        TokenKind::Field => format!("&{}", method.value),
                        _ => method.value,
                    };
                    expr = Expr::Unary {
                        recv: Box::new(expr),
                        recv_rank: rank,
                        method: name,
                        line: method.line,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                let value: f64 = token
                    .value
                    .parse()
                    .map_err(|_| self.error_at(&token, "Invalid number literal"))?;
                Ok(Expr::Number {
                    value,
                    line: token.line,
                })
            }
            TokenKind::Symbol => {
                self.advance();
                Ok(Expr::SymbolLit {
                    name: token.value,
                    line: token.line,
                })
            }
            TokenKind::Regex => {
                self.advance();
                Ok(Expr::Regex {
                    pattern: token.value,
                    line: token.line,
                })
            }
            TokenKind::Name => {
                self.advance();
                Ok(Expr::Name {
                    name: token.value,
                    line: token.line,
                })
            }
            TokenKind::Field => {
                self.advance();
                Ok(Expr::Field {
                    name: token.value,
                    line: token.line,
                })
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.consume(TokenKind::RightParen, "`)´ after expression")?;
                Ok(expr)
            }
            TokenKind::LeftBlock => self.parse_lambda(),
            TokenKind::LeftList => self.parse_list_literal(),
            TokenKind::Hash => self.parse_table_literal(),
            TokenKind::StringBegin => self.parse_interpolation(),
            _ => Err(self.error_here("Expected expression")),
        }
    }

    /// `{ |a b| body }` or `{ body }`
    fn parse_lambda(&mut self) -> PResult<Expr> {
        let line = self.peek().line;
        self.consume(TokenKind::LeftBlock, "`{´")?;

        let mut params = Vec::new();
        if self.check(TokenKind::Pipe) {
            self.advance();
            while self.check(TokenKind::Name) {
                let param = self.advance();
                if params.contains(&param.value) {
                    return Err(Diagnostic::error("Repeated parameter name", param.line)
                        .with_lexeme(param.value));
                }
                params.push(param.value);
            }
            self.consume(TokenKind::Pipe, "`|´ after parameters")?;
        }

        let body = self.parse_chunk()?;
        self.consume(TokenKind::RightBlock, "`}´ after function body")?;
        Ok(Expr::Lambda { params, body, line })
    }

    /// `[a, b, c]`
    fn parse_list_literal(&mut self) -> PResult<Expr> {
        let line = self.peek().line;
        self.consume(TokenKind::LeftList, "`[´")?;
        let mut items = Vec::new();
        self.skip_terminators();
        if !self.check(TokenKind::RightList) {
            loop {
                items.push(self.parse_expr()?);
                self.skip_terminators();
                if !self.check(TokenKind::Separator) {
                    break;
                }
                self.advance();
                self.skip_terminators();
            }
        }
        self.consume(TokenKind::RightList, "`]´ after list")?;
        Ok(Expr::List { items, line })
    }

    /// `#[k: v, (expr): v, key: v]`
    fn parse_table_literal(&mut self) -> PResult<Expr> {
        let line = self.peek().line;
        self.consume(TokenKind::Hash, "`#´")?;
        self.consume(TokenKind::LeftList, "`[´ after `#´")?;
        let mut entries = Vec::new();
        self.skip_terminators();
        if !self.check(TokenKind::RightList) {
            loop {
                let entry = self.parse_table_entry()?;
                entries.push(entry);
                self.skip_terminators();
                if !self.check(TokenKind::Separator) {
                    break;
                }
                self.advance();
                self.skip_terminators();
            }
        }
        self.consume(TokenKind::RightList, "`]´ after table")?;
        Ok(Expr::Table { entries, line })
    }

    fn parse_table_entry(&mut self) -> PResult<(Expr, Expr)> {
        // `a: 1` — the label is a symbol key.
        if self.check(TokenKind::Key) {
            let key = self.advance();
            let name = key.value.trim_end_matches(':').to_string();
            let value = self.parse_binary_expr()?;
            return Ok((
                Expr::SymbolLit {
                    name,
                    line: key.line,
                },
                value,
            ));
        }
        // `'a: 1` — a one-segment keyword symbol doubles as a key; the
        // colon the lexer folded into the symbol stands in for the entry
        // separator.
        if self.check(TokenKind::Symbol)
            && self.peek().value.ends_with(':')
            && self.peek().value.matches(':').count() == 1
        {
            let key = self.advance();
            let name = key.value.trim_end_matches(':').to_string();
            let value = self.parse_binary_expr()?;
            return Ok((
                Expr::SymbolLit {
                    name,
                    line: key.line,
                },
                value,
            ));
        }
        let key = self.parse_binary_expr()?;
        self.consume(TokenKind::Colon, "`:´ in table entry")?;
        let value = self.parse_binary_expr()?;
        Ok((key, value))
    }

    /// `"a #{x} b"` — literal segments and embedded expressions
    fn parse_interpolation(&mut self) -> PResult<Expr> {
        let line = self.peek().line;
        self.consume(TokenKind::StringBegin, "`\"´")?;
        let mut parts = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::StringLiteral => {
                    let part = self.advance();
                    parts.push(Expr::Str {
                        value: part.value,
                        line: part.line,
                    });
                }
                TokenKind::LeftBlock => {
                    self.advance();
                    parts.push(self.parse_expr()?);
                    self.consume(TokenKind::RightBlock, "`}´ after interpolation")?;
                }
                TokenKind::StringEnd => {
                    self.advance();
                    break;
                }
                _ => return Err(self.error_here("Unterminated string")),
            }
        }
        Ok(Expr::Interp { parts, line })
    }

    // ===== Helpers =====

    /// `@` with an optional count; a bare `@` means rank 1
    fn parse_rank(&mut self) -> PResult<u16> {
        self.consume(TokenKind::At, "`@´")?;
        if self.check(TokenKind::Number) {
            let token = self.advance();
            let value: f64 = token
                .value
                .parse()
                .map_err(|_| self.error_at(&token, "Invalid rank"))?;
            if value < 0.0 || value.fract() != 0.0 || value > f64::from(u16::MAX) {
                return Err(self.error_at(&token, "Invalid rank"));
            }
            Ok(value as u16)
        } else {
            Ok(1)
        }
    }

    /// Whether the token after `@` (and its optional count) is one of `kinds`
    fn rank_target_is(&self, kinds: &[TokenKind]) -> bool {
        let mut j = self.i + 1;
        if self.peek_kind_at(1) == TokenKind::Number {
            j += 1;
        }
        self.tokens
            .get(j)
            .is_some_and(|tk| kinds.contains(&tk.kind))
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.i.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.i + offset)
            .map(|tk| tk.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.i += 1;
        }
        token
    }

    fn consume(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(&format!("Expected {}", what)))
        }
    }

    fn skip_terminators(&mut self) {
        while self.check(TokenKind::Terminator) {
            self.advance();
        }
    }

    fn error_here(&self, message: &str) -> Diagnostic {
        let token = self.peek();
        Diagnostic::error(message, token.line).with_lexeme(token.lexeme.clone())
    }

    fn error_at(&self, token: &Token, message: &str) -> Diagnostic {
        Diagnostic::error(message, token.line).with_lexeme(token.lexeme.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Stmt};
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Unit {
        let (tokens, diagnostics) = Lexer::new(source).tokenize();
        assert!(diagnostics.is_empty(), "lex errors: {:?}", diagnostics);
        Parser::new(tokens).parse_unit().expect("parse failed")
    }

    fn parse_err(source: &str) -> Diagnostic {
        let (tokens, _) = Lexer::new(source).tokenize();
        Parser::new(tokens).parse_unit().expect_err("expected error")
    }

    #[test]
    fn test_assignment() {
        let unit = parse("x := 1.");
        assert!(matches!(
            &unit.stmts[0],
            Stmt::Assign { nonlocal: false, name, .. } if name == "x"
        ));
    }

    #[test]
    fn test_keyword_send_selector_concatenation() {
        let unit = parse("p x: 3 y: 4.");
        let Stmt::Expr(Expr::Call { selector, args, .. }) = &unit.stmts[0] else {
            panic!("expected call statement");
        };
        assert_eq!(selector, "x:y:");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_binary_is_left_associative() {
        let unit = parse("1 + 2 * 3.");
        let Stmt::Expr(Expr::Binary { lhs, op, .. }) = &unit.stmts[0] else {
            panic!("expected binary statement");
        };
        assert_eq!(op, "*");
        assert!(matches!(**lhs, Expr::Binary { .. }));
    }

    #[test]
    fn test_cascade_unary() {
        let unit = parse("1 + 2 :> string.");
        let Stmt::Expr(Expr::Unary { method, recv, .. }) = &unit.stmts[0] else {
            panic!("expected unary send");
        };
        assert_eq!(method, "string");
        assert!(matches!(**recv, Expr::Binary { .. }));
    }

    #[test]
    fn test_cascade_keyword() {
        let unit = parse("\"\" :> join: parts.");
        let Stmt::Expr(Expr::Call { selector, .. }) = &unit.stmts[0] else {
            panic!("expected keyword send");
        };
        assert_eq!(selector, "join:");
    }

    #[test]
    fn test_index_sugar() {
        let unit = parse("xs[0].");
        assert!(matches!(&unit.stmts[0], Stmt::Expr(Expr::Index { .. })));
    }

    #[test]
    fn test_method_definition_keyword() {
        let unit = parse("Point fn p x: x y: y { &x := x. &y := y }.");
        let Stmt::Method(def) = &unit.stmts[0] else {
            panic!("expected method definition");
        };
        assert_eq!(def.namespace, "Point");
        assert_eq!(def.receiver, "p");
        assert_eq!(def.selector, "x:y:");
        assert_eq!(def.params, vec!["x", "y"]);
        assert_eq!(def.body.len(), 2);
    }

    #[test]
    fn test_method_definition_unary_and_binary() {
        let unit = parse("Point fn p norm { 0 }.\nPoint fn a + b { 0 }.");
        let Stmt::Method(unary) = &unit.stmts[0] else {
            panic!("expected method");
        };
        assert_eq!(unary.selector, "norm");
        assert!(unary.params.is_empty());
        let Stmt::Method(binary) = &unit.stmts[1] else {
            panic!("expected method");
        };
        assert_eq!(binary.selector, "+");
        assert_eq!(binary.params, vec!["b"]);
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = parse_err("Point fn p x: a y: a { a }.");
        assert!(err.message.contains("Repeated parameter"));
    }

    #[test]
    fn test_lambda_with_params() {
        let unit = parse("sq := { |x| x * x }.");
        let Stmt::Assign { value, .. } = &unit.stmts[0] else {
            panic!("expected assignment");
        };
        let Expr::Lambda { params, body, .. } = value else {
            panic!("expected lambda");
        };
        assert_eq!(params, &vec!["x".to_string()]);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_return_if() {
        let unit = parse("f := { |n| if n == 0 return 1\nn }.");
        let Stmt::Assign { value, .. } = &unit.stmts[0] else {
            panic!("expected assignment");
        };
        let Expr::Lambda { body, .. } = value else {
            panic!("expected lambda");
        };
        assert!(matches!(body[0], Stmt::ReturnIf { .. }));
    }

    #[test]
    fn test_table_literal_with_symbol_keys() {
        let unit = parse("#['a: 1, 'b: 2].");
        let Stmt::Expr(Expr::Table { entries, .. }) = &unit.stmts[0] else {
            panic!("expected table literal");
        };
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0].0, Expr::SymbolLit { name, .. } if name == "a"));
    }

    #[test]
    fn test_rank_annotations() {
        let unit = parse("xs @ + 1.");
        let Stmt::Expr(Expr::Binary { lhs_rank, .. }) = &unit.stmts[0] else {
            panic!("expected binary");
        };
        assert_eq!(*lhs_rank, 1);

        let unit = parse("f map: @2 xs.");
        let Stmt::Expr(Expr::Call { args, .. }) = &unit.stmts[0] else {
            panic!("expected call");
        };
        assert_eq!(args[0].rank, 2);
    }

    #[test]
    fn test_field_postfix() {
        let unit = parse("p &x + p &y.");
        let Stmt::Expr(Expr::Binary { lhs, rhs, .. }) = &unit.stmts[0] else {
            panic!("expected binary");
        };
        assert!(matches!(&**lhs, Expr::Unary { method, .. } if method == "&x"));
        assert!(matches!(&**rhs, Expr::Unary { method, .. } if method == "&y"));
    }

    #[test]
    fn test_type_test() {
        let unit = parse("p type Point.");
        assert!(matches!(&unit.stmts[0], Stmt::Expr(Expr::TypeTest { .. })));
    }

    #[test]
    fn test_interpolation_parts() {
        let unit = parse("\"v = #{x}\".");
        let Stmt::Expr(Expr::Interp { parts, .. }) = &unit.stmts[0] else {
            panic!("expected interpolation");
        };
        // literal "v = ", expression x, trailing empty literal
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn test_missing_terminator_is_error() {
        // Two statements on one line with no `.` separator.
        let err = parse_err("x := 1 y := 2");
        assert!(err.message.contains("Expected"));
    }
}
