//! Statement-level grammar.

use super::core::Parser;
use crate::ast::*;
use crate::diagnostics::Code;
use crate::lexer::TokenKind;
use crate::span::Span;

impl<'src> Parser<'src> {
    pub(crate) fn module(&mut self) -> Module {
        let mut body = Vec::new();
        while !self.eof() {
            // Stray layout tokens between statements are harmless.
            if self.eat(TokenKind::Newline)
                || self.eat(TokenKind::Indent)
                || self.eat(TokenKind::Dedent)
            {
                continue;
            }
            let before = self.pos;
            self.statement(&mut body);
            if self.pos == before {
                // Always make progress, whatever the grammar thought.
                self.bump();
            }
        }
        Module { body }
    }

    /// Parses one statement (or several, for `a = b = v` chains and
    /// semicolon-joined simple statements) into `out`.
    pub(super) fn statement(&mut self, out: &mut Vec<Stmt>) {
        match self.current() {
            TokenKind::At | TokenKind::KwDef | TokenKind::KwClass => self.definition(out),
            TokenKind::KwIf => out.push(self.if_stmt()),
            TokenKind::KwWhile => out.push(self.while_stmt()),
            TokenKind::KwFor => out.push(self.for_stmt()),
            TokenKind::KwTry => out.push(self.try_stmt()),
            TokenKind::KwWith => out.push(self.with_stmt()),
            TokenKind::KwReturn
            | TokenKind::KwRaise
            | TokenKind::KwImport
            | TokenKind::KwFrom
            | TokenKind::KwPass
            | TokenKind::KwBreak
            | TokenKind::KwContinue => self.simple_stmt_line(out),
            TokenKind::KwDel
            | TokenKind::KwGlobal
            | TokenKind::KwNonlocal
            | TokenKind::KwAssert
            | TokenKind::KwYield
            | TokenKind::KwAsync
            | TokenKind::KwAwait => {
                let span = self.current_span();
                let kw = self.current_text().to_string();
                self.error_with_code(
                    Code::UnsupportedSyntax,
                    format!("`{}` is not in the supported subset", kw),
                );
                self.sync_to_stmt_boundary();
                out.push(Stmt {
                    kind: StmtKind::Unsupported,
                    span,
                });
            }
            TokenKind::Garbage => {
                self.error("unexpected input");
                self.sync_to_stmt_boundary();
            }
            _ => self.simple_stmt_line(out),
        }
    }

    /// `@decorator` lines followed by a `def` or `class`.
    fn definition(&mut self, out: &mut Vec<Stmt>) {
        let start = self.current_span();
        let mut decorators = Vec::new();
        while self.eat(TokenKind::At) {
            decorators.push(self.expression());
            self.expect(TokenKind::Newline, "newline after decorator");
        }
        match self.current() {
            TokenKind::KwDef => out.push(self.function_def(decorators, start)),
            TokenKind::KwClass => out.push(self.class_def(decorators, start)),
            _ => {
                self.error("expected `def` or `class` after decorators");
                self.sync_to_stmt_boundary();
            }
        }
    }

    fn function_def(&mut self, decorators: Vec<Expr>, start: Span) -> Stmt {
        self.bump(); // def
        let name = self.ident("function name");
        self.expect(TokenKind::LParen, "`(`");
        let params = self.param_list();
        self.expect(TokenKind::RParen, "`)`");
        let returns = if self.eat(TokenKind::Arrow) {
            Some(self.expression())
        } else {
            None
        };
        let body = self.block();
        Stmt {
            span: start.cover(Span::empty(self.prev_end())),
            kind: StmtKind::FunctionDef(FunctionDef {
                name,
                decorators,
                params,
                returns,
                body,
            }),
        }
    }

    fn class_def(&mut self, decorators: Vec<Expr>, start: Span) -> Stmt {
        self.bump(); // class
        let name = self.ident("class name");
        let mut bases = Vec::new();
        if self.eat(TokenKind::LParen) {
            while !self.at(TokenKind::RParen) && !self.eof() {
                bases.push(self.expression());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "`)`");
        }
        let body = self.block();
        Stmt {
            span: start.cover(Span::empty(self.prev_end())),
            kind: StmtKind::ClassDef(ClassDef {
                name,
                decorators,
                bases,
                body,
            }),
        }
    }

    fn param_list(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) && !self.eof() {
            let span = self.current_span();
            let starred = self.eat(TokenKind::Star);
            let name = self.ident("parameter name");
            let annotation = if self.eat(TokenKind::Colon) {
                Some(self.expression())
            } else {
                None
            };
            let default = if self.eat(TokenKind::Assign) {
                Some(self.expression())
            } else {
                None
            };
            params.push(Param {
                name,
                annotation,
                default,
                starred,
                span: span.cover(Span::empty(self.prev_end())),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        params
    }

    fn if_stmt(&mut self) -> Stmt {
        let start = self.current_span();
        self.bump(); // if / elif
        let test = self.expression();
        let body = self.block();
        let orelse = match self.current() {
            TokenKind::KwElif => vec![self.if_stmt()],
            TokenKind::KwElse => {
                self.bump();
                self.block()
            }
            _ => Vec::new(),
        };
        Stmt {
            span: start.cover(Span::empty(self.prev_end())),
            kind: StmtKind::If { test, body, orelse },
        }
    }

    fn while_stmt(&mut self) -> Stmt {
        let start = self.current_span();
        self.bump();
        let test = self.expression();
        let body = self.block();
        Stmt {
            span: start.cover(Span::empty(self.prev_end())),
            kind: StmtKind::While { test, body },
        }
    }

    fn for_stmt(&mut self) -> Stmt {
        let start = self.current_span();
        self.bump();
        let target = self.target_list();
        self.expect(TokenKind::KwIn, "`in`");
        let iter = self.expression();
        let body = self.block();
        Stmt {
            span: start.cover(Span::empty(self.prev_end())),
            kind: StmtKind::For { target, iter, body },
        }
    }

    fn try_stmt(&mut self) -> Stmt {
        let start = self.current_span();
        self.bump();
        let body = self.block();
        let mut handlers = Vec::new();
        while self.at(TokenKind::KwExcept) {
            let hstart = self.current_span();
            self.bump();
            let ty = if self.at(TokenKind::Colon) {
                None
            } else {
                Some(self.expression())
            };
            let name = if self.eat(TokenKind::KwAs) {
                Some(self.ident("exception binding"))
            } else {
                None
            };
            let hbody = self.block();
            handlers.push(ExceptHandler {
                ty,
                name,
                body: hbody,
                span: hstart.cover(Span::empty(self.prev_end())),
            });
        }
        let orelse = if self.eat(TokenKind::KwElse) {
            self.block()
        } else {
            Vec::new()
        };
        let finalbody = if self.eat(TokenKind::KwFinally) {
            self.block()
        } else {
            Vec::new()
        };
        if handlers.is_empty() && finalbody.is_empty() {
            self.error("`try` needs at least one `except` or a `finally`");
        }
        Stmt {
            span: start.cover(Span::empty(self.prev_end())),
            kind: StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            },
        }
    }

    fn with_stmt(&mut self) -> Stmt {
        let start = self.current_span();
        self.bump();
        let mut items = Vec::new();
        loop {
            let context = self.expression();
            let binding = if self.eat(TokenKind::KwAs) {
                Some(self.target_list())
            } else {
                None
            };
            items.push(WithItem { context, binding });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let body = self.block();
        Stmt {
            span: start.cover(Span::empty(self.prev_end())),
            kind: StmtKind::With { items, body },
        }
    }

    /// Simple statements up to the end of the logical line, separated by
    /// semicolons.
    fn simple_stmt_line(&mut self, out: &mut Vec<Stmt>) {
        loop {
            self.simple_stmt(out);
            if !self.eat(TokenKind::Semicolon) {
                break;
            }
            if self.at(TokenKind::Newline) {
                break;
            }
        }
        if !self.eat(TokenKind::Newline) && !self.at(TokenKind::Dedent) && !self.eof() {
            self.error("expected end of statement");
            self.sync_to_stmt_boundary();
        }
    }

    fn simple_stmt(&mut self, out: &mut Vec<Stmt>) {
        let start = self.current_span();
        match self.current() {
            TokenKind::KwReturn => {
                self.bump();
                let value = if self.at(TokenKind::Newline)
                    || self.at(TokenKind::Semicolon)
                    || self.at(TokenKind::Dedent)
                    || self.eof()
                {
                    None
                } else {
                    Some(self.expr_or_tuple())
                };
                out.push(Stmt {
                    span: start.cover(Span::empty(self.prev_end())),
                    kind: StmtKind::Return(value),
                });
            }
            TokenKind::KwRaise => {
                self.bump();
                let exc = if self.at(TokenKind::Newline) || self.at(TokenKind::Dedent) || self.eof()
                {
                    None
                } else {
                    Some(self.expression())
                };
                let cause = if self.eat(TokenKind::KwFrom) {
                    Some(self.expression())
                } else {
                    None
                };
                out.push(Stmt {
                    span: start.cover(Span::empty(self.prev_end())),
                    kind: StmtKind::Raise { exc, cause },
                });
            }
            TokenKind::KwPass => {
                self.bump();
                out.push(Stmt {
                    span: start,
                    kind: StmtKind::Pass,
                });
            }
            TokenKind::KwBreak => {
                self.bump();
                out.push(Stmt {
                    span: start,
                    kind: StmtKind::Break,
                });
            }
            TokenKind::KwContinue => {
                self.bump();
                out.push(Stmt {
                    span: start,
                    kind: StmtKind::Continue,
                });
            }
            TokenKind::KwImport => out.push(self.import_stmt()),
            TokenKind::KwFrom => out.push(self.from_import_stmt()),
            _ => self.expr_like_stmt(out),
        }
    }

    fn import_stmt(&mut self) -> Stmt {
        let start = self.current_span();
        self.bump();
        let mut names = Vec::new();
        loop {
            let nstart = self.current_span();
            let name = self.dotted_name();
            let asname = if self.eat(TokenKind::KwAs) {
                Some(self.ident("import alias"))
            } else {
                None
            };
            names.push(Alias {
                name,
                asname,
                span: nstart.cover(Span::empty(self.prev_end())),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Stmt {
            span: start.cover(Span::empty(self.prev_end())),
            kind: StmtKind::Import { names },
        }
    }

    fn from_import_stmt(&mut self) -> Stmt {
        let start = self.current_span();
        self.bump();
        let module = self.dotted_name();
        self.expect(TokenKind::KwImport, "`import`");
        let mut names = Vec::new();
        if self.at(TokenKind::Star) {
            self.error_with_code(
                Code::UnsupportedSyntax,
                "`from ... import *` is not in the supported subset",
            );
            self.bump();
        } else {
            let parenthesized = self.eat(TokenKind::LParen);
            loop {
                let nstart = self.current_span();
                let name = self.ident("imported name");
                let asname = if self.eat(TokenKind::KwAs) {
                    Some(self.ident("import alias"))
                } else {
                    None
                };
                names.push(Alias {
                    name,
                    asname,
                    span: nstart.cover(Span::empty(self.prev_end())),
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                if parenthesized && self.at(TokenKind::RParen) {
                    break;
                }
            }
            if parenthesized {
                self.expect(TokenKind::RParen, "`)`");
            }
        }
        Stmt {
            span: start.cover(Span::empty(self.prev_end())),
            kind: StmtKind::ImportFrom { module, names },
        }
    }

    /// Expression statement, assignment, annotated assignment, or
    /// augmented assignment.
    fn expr_like_stmt(&mut self, out: &mut Vec<Stmt>) {
        let start = self.current_span();
        let first = self.expr_or_tuple();

        if self.eat(TokenKind::Colon) {
            let annotation = self.expression();
            let value = if self.eat(TokenKind::Assign) {
                Some(self.expr_or_tuple())
            } else {
                None
            };
            out.push(Stmt {
                span: start.cover(Span::empty(self.prev_end())),
                kind: StmtKind::AnnAssign {
                    target: first,
                    annotation,
                    value,
                },
            });
            return;
        }

        if self.current().is_augmented_assign() {
            let op = augmented_op(self.current());
            self.bump();
            let value = self.expr_or_tuple();
            out.push(Stmt {
                span: start.cover(Span::empty(self.prev_end())),
                kind: StmtKind::AugAssign {
                    target: first,
                    op,
                    value,
                },
            });
            return;
        }

        if self.at(TokenKind::Assign) {
            // Chained `a = b = v` desugars to one assignment per target.
            let mut targets = vec![first];
            while self.eat(TokenKind::Assign) {
                targets.push(self.expr_or_tuple());
            }
            let value = targets.pop().unwrap_or_else(|| Expr {
                kind: ExprKind::NoneLit,
                span: start,
            });
            for target in targets {
                out.push(Stmt {
                    span: start.cover(Span::empty(self.prev_end())),
                    kind: StmtKind::Assign {
                        target,
                        value: value.clone(),
                    },
                });
            }
            return;
        }

        out.push(Stmt {
            span: start.cover(Span::empty(self.prev_end())),
            kind: StmtKind::Expr(first),
        });
    }

    /// An indented suite, or a same-line suite after the colon.
    pub(super) fn block(&mut self) -> Vec<Stmt> {
        let mut body = Vec::new();
        self.expect(TokenKind::Colon, "`:`");

        if !self.at(TokenKind::Newline) {
            // `if x: y = 1` single-line suite.
            self.simple_stmt_line(&mut body);
            return body;
        }
        self.bump(); // newline

        if !self.expect(TokenKind::Indent, "an indented block") {
            return body;
        }
        while !self.at(TokenKind::Dedent) && !self.eof() {
            if self.eat(TokenKind::Newline) {
                continue;
            }
            let before = self.pos;
            self.statement(&mut body);
            if self.pos == before {
                self.bump();
            }
        }
        self.eat(TokenKind::Dedent);
        body
    }

    pub(super) fn ident(&mut self, what: &str) -> String {
        if self.at(TokenKind::Name) {
            let text = self.current_text().to_string();
            self.bump();
            text
        } else {
            self.error(format!("expected {}", what));
            String::new()
        }
    }

    fn dotted_name(&mut self) -> String {
        let mut name = self.ident("module name");
        while self.at(TokenKind::Dot) && self.nth(1) == TokenKind::Name {
            self.bump();
            name.push('.');
            name.push_str(self.current_text());
            self.bump();
        }
        name
    }
}

fn augmented_op(kind: TokenKind) -> BinOp {
    match kind {
        TokenKind::PlusAssign => BinOp::Add,
        TokenKind::MinusAssign => BinOp::Sub,
        TokenKind::StarAssign => BinOp::Mul,
        TokenKind::SlashAssign => BinOp::Div,
        TokenKind::DoubleSlashAssign => BinOp::FloorDiv,
        TokenKind::PercentAssign => BinOp::Mod,
        TokenKind::DoubleStarAssign => BinOp::Pow,
        TokenKind::ShlAssign => BinOp::Shl,
        TokenKind::ShrAssign => BinOp::Shr,
        TokenKind::AmpAssign => BinOp::BitAnd,
        TokenKind::PipeAssign => BinOp::BitOr,
        TokenKind::CaretAssign => BinOp::BitXor,
        TokenKind::AtAssign => BinOp::MatMul,
        _ => unreachable!("not an augmented assignment operator"),
    }
}
