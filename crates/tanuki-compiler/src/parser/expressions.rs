//! Expression-level grammar.
//!
//! Precedence climbing, lowest first: ternary/lambda, `or`, `and`, `not`,
//! comparisons (chained), `|`, `^`, `&`, shifts, additive, multiplicative,
//! unary, `**` (right-associative), postfix trailers, atoms.

use super::core::Parser;
use crate::ast::*;
use crate::lexer::{split_fstring, FStringPiece, TokenKind};
use crate::span::Span;

impl<'src> Parser<'src> {
    /// Full expression, including conditional expressions and lambdas.
    pub(crate) fn expression(&mut self) -> Expr {
        if !self.enter_recursion() {
            let span = self.current_span();
            return Expr {
                kind: ExprKind::NoneLit,
                span,
            };
        }
        let expr = self.expression_inner();
        self.exit_recursion();
        expr
    }

    fn expression_inner(&mut self) -> Expr {
        if self.at(TokenKind::KwLambda) {
            return self.lambda();
        }
        let start = self.current_span();
        let body = self.or_test();
        if self.at(TokenKind::KwIf) {
            self.bump();
            let test = self.or_test();
            self.expect(TokenKind::KwElse, "`else` in conditional expression");
            let orelse = self.expression();
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::IfExp {
                    test: Box::new(test),
                    body: Box::new(body),
                    orelse: Box::new(orelse),
                },
            };
        }
        body
    }

    /// Expression or tuple without parentheses (`a, b, c`).
    pub(super) fn expr_or_tuple(&mut self) -> Expr {
        let start = self.current_span();
        let first = self.maybe_starred();
        if !self.at(TokenKind::Comma) {
            return first;
        }
        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.tuple_element_follows() {
                elements.push(self.maybe_starred());
            } else {
                break; // trailing comma
            }
        }
        Expr {
            span: start.cover(Span::empty(self.prev_end())),
            kind: ExprKind::Tuple(elements),
        }
    }

    /// Binding targets (`for` loops, `with ... as`, comprehensions).
    ///
    /// Deliberately narrower than expressions: `for k, v in pairs` must
    /// not read `v in pairs` as a comparison.
    pub(super) fn target_list(&mut self) -> Expr {
        let start = self.current_span();
        let first = self.single_target();
        if !self.at(TokenKind::Comma) {
            return first;
        }
        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if !matches!(
                self.current(),
                TokenKind::Name | TokenKind::Star | TokenKind::LParen
            ) {
                break;
            }
            elements.push(self.single_target());
        }
        Expr {
            span: start.cover(Span::empty(self.prev_end())),
            kind: ExprKind::Tuple(elements),
        }
    }

    fn single_target(&mut self) -> Expr {
        if self.at(TokenKind::Star) {
            let start = self.current_span();
            self.bump();
            let inner = self.single_target();
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::Starred(Box::new(inner)),
            };
        }
        if self.at(TokenKind::LParen) {
            self.bump();
            let inner = self.target_list();
            self.expect(TokenKind::RParen, "`)`");
            return inner;
        }
        self.postfix()
    }

    fn tuple_element_follows(&self) -> bool {
        !matches!(
            self.current(),
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::Dedent
                | TokenKind::Assign
                | TokenKind::Colon
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::KwIn
                | TokenKind::Semicolon
        )
    }

    fn maybe_starred(&mut self) -> Expr {
        if self.at(TokenKind::Star) {
            let start = self.current_span();
            self.bump();
            let inner = self.expression();
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::Starred(Box::new(inner)),
            };
        }
        self.expression()
    }

    fn lambda(&mut self) -> Expr {
        let start = self.current_span();
        self.bump(); // lambda
        let mut params = Vec::new();
        while self.at(TokenKind::Name) {
            let pspan = self.current_span();
            let name = self.current_text().to_string();
            self.bump();
            let default = if self.eat(TokenKind::Assign) {
                Some(self.expression())
            } else {
                None
            };
            params.push(Param {
                name,
                annotation: None,
                default,
                starred: false,
                span: pspan,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Colon, "`:` in lambda");
        let body = self.expression();
        Expr {
            span: start.cover(Span::empty(self.prev_end())),
            kind: ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
        }
    }

    fn or_test(&mut self) -> Expr {
        let start = self.current_span();
        let first = self.and_test();
        if !self.at(TokenKind::KwOr) {
            return first;
        }
        let mut values = vec![first];
        while self.eat(TokenKind::KwOr) {
            values.push(self.and_test());
        }
        Expr {
            span: start.cover(Span::empty(self.prev_end())),
            kind: ExprKind::BoolOp {
                op: BoolOp::Or,
                values,
            },
        }
    }

    fn and_test(&mut self) -> Expr {
        let start = self.current_span();
        let first = self.not_test();
        if !self.at(TokenKind::KwAnd) {
            return first;
        }
        let mut values = vec![first];
        while self.eat(TokenKind::KwAnd) {
            values.push(self.not_test());
        }
        Expr {
            span: start.cover(Span::empty(self.prev_end())),
            kind: ExprKind::BoolOp {
                op: BoolOp::And,
                values,
            },
        }
    }

    fn not_test(&mut self) -> Expr {
        if self.at(TokenKind::KwNot) {
            let start = self.current_span();
            self.bump();
            let operand = self.not_test();
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
            };
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Expr {
        let start = self.current_span();
        let left = self.bit_or();
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.comparison_op() {
            ops.push(op);
            comparators.push(self.bit_or());
        }
        if ops.is_empty() {
            return left;
        }
        Expr {
            span: start.cover(Span::empty(self.prev_end())),
            kind: ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
        }
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.current() {
            TokenKind::Eq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::NotEq,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::LtEq => CmpOp::LtE,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::GtEq => CmpOp::GtE,
            TokenKind::KwIs => {
                self.bump();
                if self.eat(TokenKind::KwNot) {
                    return Some(CmpOp::IsNot);
                }
                return Some(CmpOp::Is);
            }
            TokenKind::KwIn => CmpOp::In,
            TokenKind::KwNot if self.nth(1) == TokenKind::KwIn => {
                self.bump();
                self.bump();
                return Some(CmpOp::NotIn);
            }
            _ => return None,
        };
        self.bump();
        Some(op)
    }

    fn bit_or(&mut self) -> Expr {
        self.binary_left(Self::bit_xor, &[(TokenKind::Pipe, BinOp::BitOr)])
    }

    fn bit_xor(&mut self) -> Expr {
        self.binary_left(Self::bit_and, &[(TokenKind::Caret, BinOp::BitXor)])
    }

    fn bit_and(&mut self) -> Expr {
        self.binary_left(Self::shift, &[(TokenKind::Amp, BinOp::BitAnd)])
    }

    fn shift(&mut self) -> Expr {
        self.binary_left(
            Self::arith,
            &[(TokenKind::Shl, BinOp::Shl), (TokenKind::Shr, BinOp::Shr)],
        )
    }

    fn arith(&mut self) -> Expr {
        self.binary_left(
            Self::term,
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
        )
    }

    fn term(&mut self) -> Expr {
        self.binary_left(
            Self::factor,
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::DoubleSlash, BinOp::FloorDiv),
                (TokenKind::Percent, BinOp::Mod),
                (TokenKind::At, BinOp::MatMul),
            ],
        )
    }

    fn binary_left(
        &mut self,
        next: fn(&mut Self) -> Expr,
        table: &[(TokenKind, BinOp)],
    ) -> Expr {
        let start = self.current_span();
        let mut left = next(self);
        'outer: loop {
            for &(kind, op) in table {
                if self.at(kind) {
                    self.bump();
                    let right = next(self);
                    left = Expr {
                        span: start.cover(Span::empty(self.prev_end())),
                        kind: ExprKind::BinOp {
                            left: Box::new(left),
                            op,
                            right: Box::new(right),
                        },
                    };
                    continue 'outer;
                }
            }
            break;
        }
        left
    }

    fn factor(&mut self) -> Expr {
        let op = match self.current() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Pos),
            TokenKind::Tilde => Some(UnaryOp::Invert),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.current_span();
            self.bump();
            let operand = self.factor();
            let span = start.cover(Span::empty(self.prev_end()));
            // Fold negated literals so `-1` is one number, not an
            // operation; step arguments rely on it.
            if op == UnaryOp::Neg {
                match operand.kind {
                    ExprKind::Int(v) => {
                        return Expr {
                            kind: ExprKind::Int(-v),
                            span,
                        }
                    }
                    ExprKind::Float(v) => {
                        return Expr {
                            kind: ExprKind::Float(-v),
                            span,
                        }
                    }
                    _ => {
                        return Expr {
                            span,
                            kind: ExprKind::UnaryOp {
                                op,
                                operand: Box::new(operand),
                            },
                        }
                    }
                }
            }
            return Expr {
                span,
                kind: ExprKind::UnaryOp {
                    op,
                    operand: Box::new(operand),
                },
            };
        }
        self.power()
    }

    fn power(&mut self) -> Expr {
        let start = self.current_span();
        let base = self.postfix();
        if self.eat(TokenKind::DoubleStar) {
            let exp = self.factor(); // right-associative
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::BinOp {
                    left: Box::new(base),
                    op: BinOp::Pow,
                    right: Box::new(exp),
                },
            };
        }
        base
    }

    fn postfix(&mut self) -> Expr {
        let start = self.current_span();
        let mut expr = self.atom();
        loop {
            match self.current() {
                TokenKind::LParen => {
                    self.bump();
                    let (args, kwargs) = self.call_args();
                    self.expect(TokenKind::RParen, "`)`");
                    expr = Expr {
                        span: start.cover(Span::empty(self.prev_end())),
                        kind: ExprKind::Call {
                            func: Box::new(expr),
                            args,
                            kwargs,
                        },
                    };
                }
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.subscript();
                    self.expect(TokenKind::RBracket, "`]`");
                    expr = Expr {
                        span: start.cover(Span::empty(self.prev_end())),
                        kind: ExprKind::Subscript {
                            value: Box::new(expr),
                            index: Box::new(index),
                        },
                    };
                }
                TokenKind::Dot => {
                    self.bump();
                    let attr = self.ident("attribute name");
                    expr = Expr {
                        span: start.cover(Span::empty(self.prev_end())),
                        kind: ExprKind::Attribute {
                            value: Box::new(expr),
                            attr,
                        },
                    };
                }
                _ => break,
            }
        }
        expr
    }

    fn call_args(&mut self) -> (Vec<Expr>, Vec<(String, Expr)>) {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        while !self.at(TokenKind::RParen) && !self.eof() {
            if self.at(TokenKind::Name) && self.nth(1) == TokenKind::Assign {
                let name = self.current_text().to_string();
                self.bump();
                self.bump();
                kwargs.push((name, self.expression()));
            } else if self.at(TokenKind::Star) {
                let start = self.current_span();
                self.bump();
                let inner = self.expression();
                args.push(Expr {
                    span: start.cover(Span::empty(self.prev_end())),
                    kind: ExprKind::Starred(Box::new(inner)),
                });
            } else {
                let expr = self.expression();
                if self.at(TokenKind::KwFor) {
                    // Bare generator expression argument.
                    let generators = self.comprehension_clauses();
                    let span = expr.span.cover(Span::empty(self.prev_end()));
                    args.push(Expr {
                        span,
                        kind: ExprKind::GeneratorExp {
                            element: Box::new(expr),
                            generators,
                        },
                    });
                } else {
                    args.push(expr);
                }
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        (args, kwargs)
    }

    fn subscript(&mut self) -> Index {
        let lower = if self.at(TokenKind::Colon) {
            None
        } else {
            Some(self.expression())
        };
        if !self.eat(TokenKind::Colon) {
            return Index::Key(lower.unwrap_or_else(|| {
                self.error("expected subscript");
                Expr {
                    kind: ExprKind::NoneLit,
                    span: self.current_span(),
                }
            }));
        }
        let upper = if self.at(TokenKind::Colon) || self.at(TokenKind::RBracket) {
            None
        } else {
            Some(self.expression())
        };
        let step = if self.eat(TokenKind::Colon) {
            if self.at(TokenKind::RBracket) {
                None
            } else {
                Some(self.expression())
            }
        } else {
            None
        };
        Index::Slice { lower, upper, step }
    }

    fn comprehension_clauses(&mut self) -> Vec<Comprehension> {
        let mut generators = Vec::new();
        while self.eat(TokenKind::KwFor) {
            let target = self.target_list();
            self.expect(TokenKind::KwIn, "`in`");
            let iter = self.or_test();
            let mut ifs = Vec::new();
            while self.eat(TokenKind::KwIf) {
                ifs.push(self.or_test());
            }
            generators.push(Comprehension { target, iter, ifs });
        }
        generators
    }

    fn atom(&mut self) -> Expr {
        let span = self.current_span();
        match self.current() {
            TokenKind::Name => {
                let name = self.current_text().to_string();
                self.bump();
                Expr {
                    kind: ExprKind::Name(name),
                    span,
                }
            }
            TokenKind::Int => {
                let value = parse_int(self.current_text());
                self.bump();
                Expr {
                    kind: ExprKind::Int(value),
                    span,
                }
            }
            TokenKind::Float => {
                let value = self
                    .current_text()
                    .replace('_', "")
                    .parse::<f64>()
                    .unwrap_or(0.0);
                self.bump();
                Expr {
                    kind: ExprKind::Float(value),
                    span,
                }
            }
            TokenKind::Str => {
                let value = crate::lexer::unquote(self.current_text());
                self.bump();
                Expr {
                    kind: ExprKind::Str(value),
                    span,
                }
            }
            TokenKind::FStr => self.fstring(),
            TokenKind::KwTrue => {
                self.bump();
                Expr {
                    kind: ExprKind::Bool(true),
                    span,
                }
            }
            TokenKind::KwFalse => {
                self.bump();
                Expr {
                    kind: ExprKind::Bool(false),
                    span,
                }
            }
            TokenKind::KwNone => {
                self.bump();
                Expr {
                    kind: ExprKind::NoneLit,
                    span,
                }
            }
            TokenKind::LParen => self.paren_atom(),
            TokenKind::LBracket => self.list_atom(),
            TokenKind::LBrace => self.brace_atom(),
            TokenKind::Walrus => {
                self.error("`:=` is not in the supported subset");
                self.bump();
                Expr {
                    kind: ExprKind::NoneLit,
                    span,
                }
            }
            _ => {
                self.error("expected an expression");
                Expr {
                    kind: ExprKind::NoneLit,
                    span,
                }
            }
        }
    }

    fn paren_atom(&mut self) -> Expr {
        let start = self.current_span();
        self.bump(); // (
        if self.eat(TokenKind::RParen) {
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::Tuple(Vec::new()),
            };
        }
        let first = self.maybe_starred();
        if self.at(TokenKind::KwFor) {
            let generators = self.comprehension_clauses();
            self.expect(TokenKind::RParen, "`)`");
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::GeneratorExp {
                    element: Box::new(first),
                    generators,
                },
            };
        }
        if self.at(TokenKind::Comma) {
            let mut elements = vec![first];
            while self.eat(TokenKind::Comma) {
                if self.at(TokenKind::RParen) {
                    break;
                }
                elements.push(self.maybe_starred());
            }
            self.expect(TokenKind::RParen, "`)`");
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::Tuple(elements),
            };
        }
        self.expect(TokenKind::RParen, "`)`");
        first
    }

    fn list_atom(&mut self) -> Expr {
        let start = self.current_span();
        self.bump(); // [
        if self.eat(TokenKind::RBracket) {
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::List(Vec::new()),
            };
        }
        let first = self.maybe_starred();
        if self.at(TokenKind::KwFor) {
            let generators = self.comprehension_clauses();
            self.expect(TokenKind::RBracket, "`]`");
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::ListComp {
                    element: Box::new(first),
                    generators,
                },
            };
        }
        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::RBracket) {
                break;
            }
            elements.push(self.maybe_starred());
        }
        self.expect(TokenKind::RBracket, "`]`");
        Expr {
            span: start.cover(Span::empty(self.prev_end())),
            kind: ExprKind::List(elements),
        }
    }

    fn brace_atom(&mut self) -> Expr {
        let start = self.current_span();
        self.bump(); // {
        if self.eat(TokenKind::RBrace) {
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::Dict {
                    keys: Vec::new(),
                    values: Vec::new(),
                },
            };
        }

        let first = self.expression();
        if self.eat(TokenKind::Colon) {
            let first_value = self.expression();
            if self.at(TokenKind::KwFor) {
                let generators = self.comprehension_clauses();
                self.expect(TokenKind::RBrace, "`}`");
                return Expr {
                    span: start.cover(Span::empty(self.prev_end())),
                    kind: ExprKind::DictComp {
                        key: Box::new(first),
                        value: Box::new(first_value),
                        generators,
                    },
                };
            }
            let mut keys = vec![first];
            let mut values = vec![first_value];
            while self.eat(TokenKind::Comma) {
                if self.at(TokenKind::RBrace) {
                    break;
                }
                keys.push(self.expression());
                self.expect(TokenKind::Colon, "`:` in dict literal");
                values.push(self.expression());
            }
            self.expect(TokenKind::RBrace, "`}`");
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::Dict { keys, values },
            };
        }

        if self.at(TokenKind::KwFor) {
            let generators = self.comprehension_clauses();
            self.expect(TokenKind::RBrace, "`}`");
            return Expr {
                span: start.cover(Span::empty(self.prev_end())),
                kind: ExprKind::SetComp {
                    element: Box::new(first),
                    generators,
                },
            };
        }
        let mut elements = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.at(TokenKind::RBrace) {
                break;
            }
            elements.push(self.expression());
        }
        self.expect(TokenKind::RBrace, "`}`");
        Expr {
            span: start.cover(Span::empty(self.prev_end())),
            kind: ExprKind::Set(elements),
        }
    }

    fn fstring(&mut self) -> Expr {
        let span = self.current_span();
        let text = self.current_text().to_string();
        self.bump();
        let mut parts = Vec::new();
        for piece in split_fstring(&text, span.start) {
            match piece {
                FStringPiece::Literal(s) => parts.push(FStringPart::Literal(s)),
                FStringPiece::Expr { source, offset } => {
                    let (expr, diags) =
                        super::parse_embedded_expr(self.source, &source, offset);
                    self.diags.extend(diags);
                    parts.push(FStringPart::Expr(Box::new(expr)));
                }
            }
        }
        Expr {
            kind: ExprKind::FString(parts),
            span,
        }
    }
}

/// Parses an integer literal, honoring `0b`/`0o`/`0x` prefixes and `_`
/// separators. Out-of-range literals saturate.
fn parse_int(text: &str) -> i64 {
    let clean = text.replace('_', "");
    let (radix, digits) = match clean.get(..2) {
        Some("0b") | Some("0B") => (2, &clean[2..]),
        Some("0o") | Some("0O") => (8, &clean[2..]),
        Some("0x") | Some("0X") => (16, &clean[2..]),
        _ => (10, clean.as_str()),
    };
    i64::from_str_radix(digits, radix).unwrap_or(i64::MAX)
}
