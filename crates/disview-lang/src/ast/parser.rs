use std::iter::Peekable;

use crate::lexer::token::{Token, TokenKind};
use crate::range::{Position, Range};

use super::error::ParseError;
use super::node::{
    BinOp, BoolOp, CmpOp, Constant, Expr, ExprContext, ExprKind, Ident, Module, Param, Stmt,
    StmtKind, UnaryOp,
};

/// Recursive-descent parser over the token stream produced by [`crate::lexer::layout`].
pub struct Parser<'a> {
    tokens: Peekable<core::slice::Iter<'a, Token>>,
    last_end: Position,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: core::slice::Iter<'a, Token>) -> Self {
        Self {
            tokens: tokens.peekable(),
            last_end: Position::default(),
        }
    }

    pub fn parse(&mut self) -> Result<Module, ParseError> {
        let mut body = Vec::new();

        loop {
            match self.peek_kind() {
                Some(TokenKind::Eof) | None => break,
                _ => body.push(self.parse_stmt()?),
            }
        }

        let range = match (body.first(), body.last()) {
            (Some(first), Some(last)) => first.range.merge(&last.range),
            _ => Range::default(),
        };

        Ok(Module { body, range })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let token = self.peek_token()?;

        match &token.kind {
            TokenKind::Def => self.parse_function_def(),
            TokenKind::Class => self.parse_class_def(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Indent | TokenKind::Dedent => Err(ParseError::UnexpectedToken(token.clone())),
            _ => {
                let stmt = self.parse_simple_stmt()?;
                self.expect(TokenKind::NewLine)?;
                Ok(stmt)
            }
        }
    }

    fn parse_function_def(&mut self) -> Result<Stmt, ParseError> {
        let start = self.next_token()?.range.start;
        let name = self.parse_ident()?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params(&TokenKind::RParen)?;
        self.expect_closing_paren()?;
        let body = self.parse_block()?;

        Ok(self.stmt(StmtKind::FunctionDef { name, params, body }, start))
    }

    fn parse_class_def(&mut self) -> Result<Stmt, ParseError> {
        let start = self.next_token()?.range.start;
        let name = self.parse_ident()?;
        let bases = if self.eat(&TokenKind::LParen) {
            let bases = self.parse_comma_separated(&TokenKind::RParen)?;
            self.expect_closing_paren()?;
            bases
        } else {
            Vec::new()
        };
        let body = self.parse_block()?;

        Ok(self.stmt(StmtKind::ClassDef { name, bases, body }, start))
    }

    /// Parses `if` and `elif` alike; an `elif` chain nests inside `orelse`.
    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.next_token()?.range.start;
        let test = self.parse_test()?;
        let body = self.parse_block()?;
        let orelse = match self.peek_kind() {
            Some(TokenKind::Elif) => vec![self.parse_if()?],
            Some(TokenKind::Else) => {
                self.next_token()?;
                self.parse_block()?
            }
            _ => Vec::new(),
        };

        Ok(self.stmt(StmtKind::If { test, body, orelse }, start))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.next_token()?.range.start;
        let test = self.parse_test()?;
        let body = self.parse_block()?;

        Ok(self.stmt(StmtKind::While { test, body }, start))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.next_token()?.range.start;
        let target = self.parse_target_list()?.into_store();
        self.expect(TokenKind::In)?;
        let iter = self.parse_testlist()?;
        let body = self.parse_block()?;

        Ok(self.stmt(StmtKind::For { target, iter, body }, start))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::Colon)?;

        if !self.eat(&TokenKind::NewLine) {
            let stmt = self.parse_simple_stmt()?;
            self.expect(TokenKind::NewLine)?;
            return Ok(vec![stmt]);
        }

        let token = self.next_token()?;
        if token.kind != TokenKind::Indent {
            return Err(ParseError::ExpectedIndentedBlock(token.clone()));
        }

        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::Dedent) => {
                    self.next_token()?;
                    break;
                }
                Some(TokenKind::Eof) | None => break,
                _ => body.push(self.parse_stmt()?),
            }
        }

        Ok(body)
    }

    fn parse_simple_stmt(&mut self) -> Result<Stmt, ParseError> {
        let token = self.peek_token()?;
        let start = token.range.start;

        match &token.kind {
            TokenKind::Pass => {
                self.next_token()?;
                Ok(self.stmt(StmtKind::Pass, start))
            }
            TokenKind::Break => {
                self.next_token()?;
                Ok(self.stmt(StmtKind::Break, start))
            }
            TokenKind::Continue => {
                self.next_token()?;
                Ok(self.stmt(StmtKind::Continue, start))
            }
            TokenKind::Return => {
                self.next_token()?;
                let value = if Self::starts_expr(self.peek_kind()) {
                    Some(self.parse_testlist()?)
                } else {
                    None
                };
                Ok(self.stmt(StmtKind::Return(value), start))
            }
            _ => self.parse_expr_stmt(start),
        }
    }

    fn parse_expr_stmt(&mut self, start: Position) -> Result<Stmt, ParseError> {
        let first = self.parse_testlist()?;

        if let Some(op) = self.peek_kind().and_then(Self::aug_assign_op) {
            self.next_token()?;
            let value = self.parse_testlist()?;
            return Ok(self.stmt(
                StmtKind::AugAssign {
                    target: first.into_store(),
                    op,
                    value,
                },
                start,
            ));
        }

        if !self.eat(&TokenKind::Equal) {
            return Ok(self.stmt(StmtKind::Expr(first), start));
        }

        let mut targets = vec![first.into_store()];
        let mut value = self.parse_testlist()?;
        while self.eat(&TokenKind::Equal) {
            let next = self.parse_testlist()?;
            targets.push(std::mem::replace(&mut value, next).into_store());
        }

        Ok(self.stmt(StmtKind::Assign { targets, value }, start))
    }

    fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_or_test()?;
        if self.peek_kind() != Some(&TokenKind::Comma) {
            return Ok(first);
        }

        let start = first.range.start;
        let mut elts = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.peek_kind() == Some(&TokenKind::In) {
                break;
            }
            elts.push(self.parse_or_test()?);
        }

        Ok(self.expr(ExprKind::Tuple(elts, ExprContext::Load), start))
    }

    fn parse_testlist(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_test()?;
        if self.peek_kind() != Some(&TokenKind::Comma) {
            return Ok(first);
        }

        let start = first.range.start;
        let mut elts = vec![first];
        while self.eat(&TokenKind::Comma) {
            if !Self::starts_expr(self.peek_kind()) {
                break;
            }
            elts.push(self.parse_test()?);
        }

        Ok(self.expr(ExprKind::Tuple(elts, ExprContext::Load), start))
    }

    fn parse_test(&mut self) -> Result<Expr, ParseError> {
        if self.peek_kind() == Some(&TokenKind::Lambda) {
            return self.parse_lambda();
        }

        let body = self.parse_or_test()?;
        if !self.eat(&TokenKind::If) {
            return Ok(body);
        }

        let test = self.parse_or_test()?;
        self.expect(TokenKind::Else)?;
        let orelse = self.parse_test()?;
        let start = body.range.start;

        Ok(self.expr(
            ExprKind::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
            start,
        ))
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let start = self.next_token()?.range.start;
        let params = self.parse_params(&TokenKind::Colon)?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_test()?;

        Ok(self.expr(
            ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            start,
        ))
    }

    fn parse_or_test(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_and_test()?;
        if self.peek_kind() != Some(&TokenKind::Or) {
            return Ok(first);
        }

        let start = first.range.start;
        let mut values = vec![first];
        while self.eat(&TokenKind::Or) {
            values.push(self.parse_and_test()?);
        }

        Ok(self.expr(
            ExprKind::BoolOp {
                op: BoolOp::Or,
                values,
            },
            start,
        ))
    }

    fn parse_and_test(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_not_test()?;
        if self.peek_kind() != Some(&TokenKind::And) {
            return Ok(first);
        }

        let start = first.range.start;
        let mut values = vec![first];
        while self.eat(&TokenKind::And) {
            values.push(self.parse_not_test()?);
        }

        Ok(self.expr(
            ExprKind::BoolOp {
                op: BoolOp::And,
                values,
            },
            start,
        ))
    }

    fn parse_not_test(&mut self) -> Result<Expr, ParseError> {
        if self.peek_kind() != Some(&TokenKind::Not) {
            return self.parse_comparison();
        }

        let start = self.next_token()?.range.start;
        let operand = self.parse_not_test()?;

        Ok(self.expr(
            ExprKind::UnaryOp {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
            start,
        ))
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_binary_expr(1)?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();

        while let Some(op) = self.peek_kind().and_then(Self::cmp_op) {
            self.next_token()?;
            ops.push(op);
            comparators.push(self.parse_binary_expr(1)?);
        }

        if ops.is_empty() {
            return Ok(left);
        }

        let start = left.range.start;
        Ok(self.expr(
            ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
            start,
        ))
    }

    fn parse_binary_expr(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;

        while let Some((precedence, op)) = self.peek_kind().and_then(Self::binary_op_precedence) {
            if precedence < min_precedence {
                break;
            }

            self.next_token()?;
            let right = self.parse_binary_expr(precedence + 1)?;
            let start = left.range.start;
            left = self.expr(
                ExprKind::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                start,
            );
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => UnaryOp::USub,
            Some(TokenKind::Plus) => UnaryOp::UAdd,
            _ => return self.parse_power(),
        };

        let start = self.next_token()?.range.start;
        let operand = self.parse_factor()?;

        Ok(self.expr(
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            start,
        ))
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_primary()?;
        if !self.eat(&TokenKind::DoubleAsterisk) {
            return Ok(base);
        }

        // Right-associative, and binds tighter than a unary minus on its left.
        let exponent = self.parse_factor()?;
        let start = base.range.start;

        Ok(self.expr(
            ExprKind::BinOp {
                left: Box::new(base),
                op: BinOp::Pow,
                right: Box::new(exponent),
            },
            start,
        ))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            let start = expr.range.start;
            expr = match self.peek_kind() {
                Some(TokenKind::LParen) => {
                    self.next_token()?;
                    let args = self.parse_comma_separated(&TokenKind::RParen)?;
                    self.expect_closing_paren()?;
                    self.expr(
                        ExprKind::Call {
                            func: Box::new(expr),
                            args,
                        },
                        start,
                    )
                }
                Some(TokenKind::Dot) => {
                    self.next_token()?;
                    let attr = self.parse_ident()?;
                    self.expr(
                        ExprKind::Attribute {
                            value: Box::new(expr),
                            attr,
                            ctx: ExprContext::Load,
                        },
                        start,
                    )
                }
                Some(TokenKind::LBracket) => {
                    self.next_token()?;
                    let index = self.parse_testlist()?;
                    self.expect_closing_bracket()?;
                    self.expr(
                        ExprKind::Subscript {
                            value: Box::new(expr),
                            index: Box::new(index),
                            ctx: ExprContext::Load,
                        },
                        start,
                    )
                }
                _ => return Ok(expr),
            };
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let token = self.next_token()?;
        let start = token.range.start;

        let kind = match &token.kind {
            TokenKind::Ident(name) => ExprKind::Name(name.clone(), ExprContext::Load),
            TokenKind::IntLiteral(n) => ExprKind::Constant(Constant::Int(*n)),
            TokenKind::FloatLiteral(n) => ExprKind::Constant(Constant::Float(*n)),
            TokenKind::StringLiteral(s) => ExprKind::Constant(Constant::Str(s.clone())),
            TokenKind::True => ExprKind::Constant(Constant::Bool(true)),
            TokenKind::False => ExprKind::Constant(Constant::Bool(false)),
            TokenKind::None => ExprKind::Constant(Constant::None),
            TokenKind::LParen => {
                if self.eat(&TokenKind::RParen) {
                    ExprKind::Tuple(Vec::new(), ExprContext::Load)
                } else {
                    let inner = self.parse_testlist()?;
                    self.expect_closing_paren()?;
                    // A parenthesised tuple covers its parentheses; any other
                    // expression keeps its own range.
                    return Ok(match inner.kind {
                        ExprKind::Tuple(..) => self.expr(inner.kind, start),
                        _ => inner,
                    });
                }
            }
            TokenKind::LBracket => {
                let elts = self.parse_comma_separated(&TokenKind::RBracket)?;
                self.expect_closing_bracket()?;
                ExprKind::List(elts, ExprContext::Load)
            }
            _ => return Err(ParseError::UnexpectedToken(token.clone())),
        };

        Ok(self.expr(kind, start))
    }

    fn parse_comma_separated(&mut self, terminator: &TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();

        while self.peek_kind() != Some(terminator) {
            items.push(self.parse_test()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(items)
    }

    fn parse_params(&mut self, terminator: &TokenKind) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();

        while self.peek_kind() != Some(terminator) {
            let token = self.next_token()?;
            match &token.kind {
                TokenKind::Ident(name) => params.push(Param {
                    name: name.clone(),
                    range: token.range,
                }),
                _ => return Err(ParseError::UnexpectedToken(token.clone())),
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    fn parse_ident(&mut self) -> Result<Ident, ParseError> {
        let token = self.next_token()?;
        match &token.kind {
            TokenKind::Ident(name) => Ok(name.clone()),
            _ => Err(ParseError::UnexpectedToken(token.clone())),
        }
    }

    #[inline(always)]
    fn binary_op_precedence(kind: &TokenKind) -> Option<(u8, BinOp)> {
        match kind {
            TokenKind::Plus => Some((1, BinOp::Add)),
            TokenKind::Minus => Some((1, BinOp::Sub)),
            TokenKind::Asterisk => Some((2, BinOp::Mult)),
            TokenKind::Slash => Some((2, BinOp::Div)),
            TokenKind::DoubleSlash => Some((2, BinOp::FloorDiv)),
            TokenKind::Percent => Some((2, BinOp::Mod)),
            _ => None,
        }
    }

    #[inline(always)]
    fn cmp_op(kind: &TokenKind) -> Option<CmpOp> {
        match kind {
            TokenKind::EqEq => Some(CmpOp::Eq),
            TokenKind::NeEq => Some(CmpOp::NotEq),
            TokenKind::Lt => Some(CmpOp::Lt),
            TokenKind::Lte => Some(CmpOp::LtE),
            TokenKind::Gt => Some(CmpOp::Gt),
            TokenKind::Gte => Some(CmpOp::GtE),
            _ => None,
        }
    }

    #[inline(always)]
    fn aug_assign_op(kind: &TokenKind) -> Option<BinOp> {
        match kind {
            TokenKind::PlusEqual => Some(BinOp::Add),
            TokenKind::MinusEqual => Some(BinOp::Sub),
            TokenKind::AsteriskEqual => Some(BinOp::Mult),
            TokenKind::SlashEqual => Some(BinOp::Div),
            _ => None,
        }
    }

    fn starts_expr(kind: Option<&TokenKind>) -> bool {
        matches!(
            kind,
            Some(
                TokenKind::Ident(_)
                    | TokenKind::IntLiteral(_)
                    | TokenKind::FloatLiteral(_)
                    | TokenKind::StringLiteral(_)
                    | TokenKind::True
                    | TokenKind::False
                    | TokenKind::None
                    | TokenKind::LParen
                    | TokenKind::LBracket
                    | TokenKind::Minus
                    | TokenKind::Plus
                    | TokenKind::Not
                    | TokenKind::Lambda
            )
        )
    }

    fn stmt(&self, kind: StmtKind, start: Position) -> Stmt {
        Stmt {
            kind,
            range: Range::new(start, self.last_end),
        }
    }

    fn expr(&self, kind: ExprKind, start: Position) -> Expr {
        Expr {
            kind,
            range: Range::new(start, self.last_end),
        }
    }

    fn peek_token(&mut self) -> Result<&'a Token, ParseError> {
        self.tokens
            .peek()
            .copied()
            .ok_or(ParseError::UnexpectedEOFDetected(Range::new(
                self.last_end,
                self.last_end,
            )))
    }

    fn peek_kind(&mut self) -> Option<&'a TokenKind> {
        self.tokens.peek().copied().map(|token| &token.kind)
    }

    fn next_token(&mut self) -> Result<&'a Token, ParseError> {
        match self.tokens.next() {
            Some(token) => {
                // Layout tokens carry no source text of their own.
                if !matches!(
                    token.kind,
                    TokenKind::NewLine | TokenKind::Indent | TokenKind::Dedent | TokenKind::Eof
                ) {
                    self.last_end = token.range.end;
                }
                Ok(token)
            }
            None => Err(ParseError::UnexpectedEOFDetected(Range::new(
                self.last_end,
                self.last_end,
            ))),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.next_token().is_ok()
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token, ParseError> {
        let token = self.next_token()?;
        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken(token.clone()))
        }
    }

    fn expect_closing_paren(&mut self) -> Result<(), ParseError> {
        let token = self.next_token()?;
        match token.kind {
            TokenKind::RParen => Ok(()),
            _ => Err(ParseError::ExpectedClosingParen(token.clone())),
        }
    }

    fn expect_closing_bracket(&mut self) -> Result<(), ParseError> {
        let token = self.next_token()?;
        match token.kind {
            TokenKind::RBracket => Ok(()),
            _ => Err(ParseError::ExpectedClosingBracket(token.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, layout};
    use rstest::rstest;

    fn parse(code: &str) -> Result<Module, ParseError> {
        let tokens = layout(Lexer::new().tokenize(code).unwrap()).unwrap();
        Parser::new(tokens.iter()).parse()
    }

    fn stmt_kinds(code: &str) -> Vec<&'static str> {
        parse(code)
            .unwrap()
            .body
            .iter()
            .map(|stmt| stmt.kind.kind_name())
            .collect()
    }

    fn single_expr(code: &str) -> Expr {
        match parse(code).unwrap().body.remove(0).kind {
            StmtKind::Expr(expr) => expr,
            kind => panic!("expected an expression statement, got {:?}", kind),
        }
    }

    fn name(id: &str, ctx: ExprContext) -> ExprKind {
        ExprKind::Name(id.into(), ctx)
    }

    #[rstest]
    #[case::empty("", vec![])]
    #[case::assign("x = 1", vec!["Assign"])]
    #[case::aug_assign("x += 1", vec!["AugAssign"])]
    #[case::expr("f(x)", vec!["Expr"])]
    #[case::keywords("pass\nbreak\ncontinue", vec!["Pass", "Break", "Continue"])]
    #[case::if_stmt("if a:\n  b\nelif c:\n  d\nelse:\n  e", vec!["If"])]
    #[case::while_stmt("while x: x -= 1", vec!["While"])]
    #[case::for_stmt("for i in range(3):\n  print(i)", vec!["For"])]
    #[case::function("def f(a, b):\n  return a\n\nf(1, 2)", vec!["FunctionDef", "Expr"])]
    #[case::class("class C(Base):\n  x = 1", vec!["ClassDef"])]
    fn test_statements(#[case] code: &str, #[case] expected: Vec<&'static str>) {
        assert_eq!(stmt_kinds(code), expected);
    }

    #[test]
    fn test_chained_assignment() {
        let module = parse("a = b = 1").unwrap();
        match &module.body[0].kind {
            StmtKind::Assign { targets, value } => {
                let targets: Vec<_> = targets.iter().map(|t| t.kind.clone()).collect();
                assert_eq!(
                    targets,
                    vec![name("a", ExprContext::Store), name("b", ExprContext::Store)]
                );
                assert_eq!(value.kind, ExprKind::Constant(Constant::Int(1)));
            }
            kind => panic!("unexpected statement {:?}", kind),
        }
    }

    #[test]
    fn test_precedence() {
        match single_expr("1 + 2 * 3").kind {
            ExprKind::BinOp { op, right, .. } => {
                assert_eq!(op, BinOp::Add);
                assert!(matches!(right.kind, ExprKind::BinOp { op: BinOp::Mult, .. }));
            }
            kind => panic!("unexpected expression {:?}", kind),
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        match single_expr("2 ** 3 ** 2").kind {
            ExprKind::BinOp { op, left, right } => {
                assert_eq!(op, BinOp::Pow);
                assert_eq!(left.kind, ExprKind::Constant(Constant::Int(2)));
                assert!(matches!(right.kind, ExprKind::BinOp { op: BinOp::Pow, .. }));
            }
            kind => panic!("unexpected expression {:?}", kind),
        }
    }

    #[test]
    fn test_comparison_chain() {
        match single_expr("a < b <= c").kind {
            ExprKind::Compare {
                ops, comparators, ..
            } => {
                assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE]);
                assert_eq!(comparators.len(), 2);
            }
            kind => panic!("unexpected expression {:?}", kind),
        }
    }

    #[test]
    fn test_bool_op_flattens() {
        match single_expr("a or b or c and d").kind {
            ExprKind::BoolOp { op, values } => {
                assert_eq!(op, BoolOp::Or);
                assert_eq!(values.len(), 3);
                assert!(matches!(values[2].kind, ExprKind::BoolOp { op: BoolOp::And, .. }));
            }
            kind => panic!("unexpected expression {:?}", kind),
        }
    }

    #[rstest]
    #[case::conditional("a if c else b", "IfExp")]
    #[case::lambda("lambda x, y: x + y", "Lambda")]
    #[case::attribute("a.b.c", "Attribute")]
    #[case::subscript("a[0]", "Subscript")]
    #[case::list("[1, 2]", "List")]
    #[case::tuple("1, 2", "Tuple")]
    #[case::empty_tuple("()", "Tuple")]
    #[case::parenthesised("(x)", "Name")]
    #[case::negative("-x", "UnaryOp")]
    #[case::not("not x", "UnaryOp")]
    fn test_expressions(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(single_expr(code).kind.kind_name(), expected);
    }

    #[test]
    fn test_ranges() {
        let module = parse("x = 1\ny = 22\n").unwrap();
        assert_eq!(
            module.body[1].range,
            Range::new(Position::new(2, 1), Position::new(2, 7))
        );
        assert_eq!(
            module.range,
            Range::new(Position::new(1, 1), Position::new(2, 7))
        );
    }

    #[test]
    fn test_block_range_excludes_trailing_newline() {
        let module = parse("def f():\n    return 1\n\nx = 2").unwrap();
        assert_eq!(
            module.body[0].range,
            Range::new(Position::new(1, 1), Position::new(2, 13))
        );
    }

    #[test]
    fn test_for_target_is_store() {
        match &parse("for a, b in x: pass").unwrap().body[0].kind {
            StmtKind::For { target, .. } => assert!(target.is_store()),
            kind => panic!("unexpected statement {:?}", kind),
        }
    }

    #[rstest]
    #[case::missing_operand("x = ")]
    #[case::stray_paren("x = )")]
    #[case::missing_block("def f():")]
    #[case::unexpected_indent("x = 1\n  y = 2")]
    fn test_unexpected_token(#[case] code: &str) {
        assert!(matches!(
            parse(code),
            Err(ParseError::UnexpectedToken(_)) | Err(ParseError::ExpectedIndentedBlock(_))
        ));
    }

    #[test]
    fn test_expected_closing_paren() {
        assert!(matches!(
            parse("f(1 2)"),
            Err(ParseError::ExpectedClosingParen(_))
        ));
    }
}
