use std::{iter::Peekable, rc::Rc, slice::Iter};

use crate::{
    ast::{
        AssignOp, BinOp, CatchClause, DeclKind, Expr, Function, Ident, Literal, LogicalOp,
        Property, Source, Span, Stmt, SwitchCase, UnaryOp, UpdateOp,
    },
    error::{Error, ErrorMsg, Phase},
    token::{Keyword, TextRange, Token, TokenKind, TRUE_LITERAL},
};

/// Upper bound on declared parameters and call arguments
pub const MAX_ARGS: usize = 255;

/// Upper bound on how deeply statements and expressions nest,
/// counting each link of an operator or call chain as a level
pub const MAX_NESTING: usize = 64;

/// Stand-in returned once the stream is exhausted, so that
/// hand-built token slices without a trailing EOF still parse.
static EOF: Token = Token {
    kind: TokenKind::EOF,
    range: TextRange { start: 0, end: 0 },
    line: 0,
    column: 0,
    lexeme: String::new(),
};

/// Constructs enclosing the statement being parsed
#[derive(Clone, Copy, Debug, Default)]
struct Context {
    loops: usize,
    switches: usize,
    in_function: bool,
}

#[derive(Debug)]
pub struct Parser<'a> {
    stream: Peekable<Iter<'a, Token>>,
    errors: Vec<Error>,
    consumed: usize,
    depth: usize,
    context: Context,
}

impl<'a> Parser<'a> {
    pub fn new(stream: &'a [Token]) -> Self {
        Self {
            stream: stream.iter().peekable(),
            errors: Vec::default(),
            consumed: 0,
            depth: 0,
            context: Context::default(),
        }
    }

    /// Parses the whole token stream. Errors are collected while the
    /// parser resynchronises, and are all returned together if any
    /// were recorded.
    pub fn parse_all(mut self) -> Result<Source, Vec<Error>> {
        let body = self.parse_items(|t| t.kind == TokenKind::EOF);
        if self.errors.is_empty() {
            Ok(Source { body })
        } else {
            Err(self.errors)
        }
    }

    fn parse_items<F>(&mut self, end: F) -> Vec<Stmt>
    where
        F: Fn(&Token) -> bool,
    {
        let mut items: Vec<Stmt> = Vec::default();
        loop {
            let t = self.peek();
            if t.kind == TokenKind::EOF || end(t) {
                break;
            }
            let before = self.consumed;
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.errors.push(e);
                    self.sync();
                    // Guarantee progress when the offending token
                    // is itself a synchronisation point
                    if self.consumed == before {
                        self.advance();
                    }
                }
            }
        }
        items
    }

    pub fn parse_item(&mut self) -> Result<Stmt, Error> {
        self.nested(Self::parse_stmt)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        let t = self.peek();
        if t.is_punct('{') {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if t.is_punct(';') {
            self.advance();
            return Ok(Stmt::Empty);
        }
        let item = match t.keyword() {
            Some(Keyword::Tabit | Keyword::Bdl) => self.parse_var_decl()?,
            Some(Keyword::Dala) => return self.parse_function_decl(),
            Some(Keyword::Ila) => return self.parse_if_stmt(),
            Some(Keyword::Madamt) => return self.parse_while_stmt(),
            Some(Keyword::Douz) => return self.parse_for_stmt(),
            Some(Keyword::Jrb) => return self.parse_try_stmt(),
            Some(Keyword::Bdl3la) => return self.parse_switch_stmt(),
            Some(Keyword::Dir) => self.parse_do_while_stmt()?,
            Some(Keyword::Rj3) => {
                if !self.context.in_function {
                    return Err(Self::misplaced(self.advance(), ErrorMsg::ReturnOutsideFunction));
                }
                self.parse_return()?
            }
            Some(Keyword::Wa9f) => {
                let t = self.advance();
                if self.context.loops == 0 && self.context.switches == 0 {
                    return Err(Self::misplaced(t, ErrorMsg::BreakOutsideLoop));
                }
                Stmt::Break
            }
            Some(Keyword::Kamml) => {
                let t = self.advance();
                if self.context.loops == 0 {
                    return Err(Self::misplaced(t, ErrorMsg::ContinueOutsideLoop));
                }
                Stmt::Continue
            }
            _ => self.parse_expr_stmt()?,
        };
        self.advance_or_err(|t| t.is_punct(';'), ErrorMsg::MissingSemicolon)?;
        Ok(item)
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, Error> {
        // Consume the `tabit` or `bdl` keyword
        let kind = if self.advance().is_keyword(Keyword::Tabit) {
            DeclKind::Const
        } else {
            DeclKind::Let
        };
        let ident = self.parse_ident()?;
        let init = if self.advance_if(|t| t.is_op("=")).is_some() {
            Some(self.parse_expr()?)
        } else {
            None
        };
        if kind == DeclKind::Const && init.is_none() {
            return Err(Self::error(self.peek(), ErrorMsg::MissingConstInit));
        }

        Ok(Stmt::VarDecl { kind, ident, init })
    }

    fn parse_function_decl(&mut self) -> Result<Stmt, Error> {
        // Consume the `dala` keyword
        self.advance();
        let name = self.parse_ident()?;
        let func = self.parse_function(Some(name))?;
        Ok(Stmt::Function(Rc::new(func)))
    }

    /// Parses the parameter list and body that follow `dala [name]`
    fn parse_function(&mut self, name: Option<Ident>) -> Result<Function, Error> {
        let open = self.advance_or_err(|t| t.is_punct('('), ErrorMsg::MissingOpeningParen)?;
        let mut params = vec![];
        while !self.peek().is_punct(')') {
            params.push(self.parse_ident()?);
            if self.advance_if(|t| t.is_punct(',')).is_none() {
                break;
            }
        }
        self.advance_or_err(|t| t.is_punct(')'), ErrorMsg::MissingClosingParen)?;
        if params.len() > MAX_ARGS {
            // Recorded without aborting the declaration
            self.errors.push(Error::new(
                Phase::Parse,
                format!("{} {}", ErrorMsg::TooManyParams, params.len()),
                open.line,
                open.column,
            ));
        }
        // Loops and switches around the function do not enclose its body
        let outer = std::mem::replace(
            &mut self.context,
            Context {
                in_function: true,
                ..Default::default()
            },
        );
        let body = self.parse_block();
        self.context = outer;

        Ok(Function {
            name,
            params,
            body: body?,
        })
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, Error> {
        // Consume the `ila` or `wa9ila` keyword
        self.advance();
        self.advance_or_err(|t| t.is_punct('('), ErrorMsg::MissingOpeningParen)?;
        let test = self.parse_expr()?;
        self.advance_or_err(|t| t.is_punct(')'), ErrorMsg::MissingClosingParen)?;
        let consequent = Box::new(self.parse_item()?);
        let alternate = if self.advance_if(|t| t.is_keyword(Keyword::Ella)).is_some() {
            Some(Box::new(self.parse_item()?))
        } else if self.peek().is_keyword(Keyword::Wa9ila) {
            // `wa9ila (..)` is sugar for `ella ila (..)`
            Some(Box::new(self.nested(Self::parse_if_stmt)?))
        } else {
            None
        };

        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt, Error> {
        // Consume the `madamt` keyword
        self.advance();
        self.advance_or_err(|t| t.is_punct('('), ErrorMsg::MissingOpeningParen)?;
        let test = self.parse_expr()?;
        self.advance_or_err(|t| t.is_punct(')'), ErrorMsg::MissingClosingParen)?;

        Ok(Stmt::While {
            test,
            body: Box::new(self.parse_loop_body()?),
        })
    }

    fn parse_do_while_stmt(&mut self) -> Result<Stmt, Error> {
        // Consume the `dir` keyword
        self.advance();
        let body = Box::new(self.parse_loop_body()?);
        self.advance_or_err(
            |t| t.is_keyword(Keyword::Madamt),
            ErrorMsg::UnexpectedToken,
        )?;
        self.advance_or_err(|t| t.is_punct('('), ErrorMsg::MissingOpeningParen)?;
        let test = self.parse_expr()?;
        self.advance_or_err(|t| t.is_punct(')'), ErrorMsg::MissingClosingParen)?;

        Ok(Stmt::DoWhile { body, test })
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt, Error> {
        // Consume the `douz` keyword
        self.advance();
        self.advance_or_err(|t| t.is_punct('('), ErrorMsg::MissingOpeningParen)?;
        let t = self.peek();
        let init = if t.is_punct(';') {
            None
        } else if t.is_keyword(Keyword::Bdl) || t.is_keyword(Keyword::Tabit) {
            Some(Box::new(self.parse_var_decl()?))
        } else {
            Some(Box::new(self.parse_expr_stmt()?))
        };
        self.advance_or_err(|t| t.is_punct(';'), ErrorMsg::MissingSemicolon)?;

        let test = if self.peek().is_punct(';') {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.advance_or_err(|t| t.is_punct(';'), ErrorMsg::MissingSemicolon)?;

        let update = if self.peek().is_punct(')') {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.advance_or_err(|t| t.is_punct(')'), ErrorMsg::MissingClosingParen)?;

        Ok(Stmt::For {
            init,
            test,
            update,
            body: Box::new(self.parse_loop_body()?),
        })
    }

    fn parse_loop_body(&mut self) -> Result<Stmt, Error> {
        self.context.loops += 1;
        let body = self.parse_item();
        self.context.loops -= 1;
        body
    }

    fn parse_try_stmt(&mut self) -> Result<Stmt, Error> {
        // Consume the `jrb` keyword
        self.advance();
        let block = self.parse_block()?;
        let handler = if self.advance_if(|t| t.is_keyword(Keyword::Msk)).is_some() {
            self.advance_or_err(|t| t.is_punct('('), ErrorMsg::MissingOpeningParen)?;
            let param = self.parse_ident()?;
            self.advance_or_err(|t| t.is_punct(')'), ErrorMsg::MissingClosingParen)?;
            Some(CatchClause {
                param,
                body: self.parse_block()?,
            })
        } else {
            None
        };
        let finalizer = if self.advance_if(|t| t.is_keyword(Keyword::Fakhr)).is_some() {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(Self::error(self.peek(), ErrorMsg::MissingCatchOrFinally));
        }

        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_switch_stmt(&mut self) -> Result<Stmt, Error> {
        // Consume the `bdl3la` keyword
        self.advance();
        self.advance_or_err(|t| t.is_punct('('), ErrorMsg::MissingOpeningParen)?;
        let discriminant = self.parse_expr()?;
        self.advance_or_err(|t| t.is_punct(')'), ErrorMsg::MissingClosingParen)?;
        self.advance_or_err(|t| t.is_punct('{'), ErrorMsg::MissingOpeningBrace)?;

        let mut cases = vec![];
        let mut seen_default = false;
        loop {
            let t = self.peek();
            let test = if t.is_keyword(Keyword::Hala) {
                self.advance();
                Some(self.parse_expr()?)
            } else if t.is_keyword(Keyword::Adi) {
                self.advance();
                if seen_default {
                    self.errors.push(Error::new(
                        Phase::Parse,
                        ErrorMsg::DuplicateDefault.to_string(),
                        t.line,
                        t.column,
                    ));
                }
                seen_default = true;
                None
            } else if t.is_punct('}') || t.kind == TokenKind::EOF {
                break;
            } else {
                self.errors.push(Self::error(t, ErrorMsg::InvalidCase));
                let before = self.consumed;
                self.sync();
                if self.consumed == before {
                    self.advance();
                }
                continue;
            };
            self.advance_or_err(|t| t.is_punct(':'), ErrorMsg::MissingColon)?;
            self.context.switches += 1;
            let consequent = self.parse_items(|t| {
                t.is_keyword(Keyword::Hala) || t.is_keyword(Keyword::Adi) || t.is_punct('}')
            });
            self.context.switches -= 1;
            cases.push(SwitchCase { test, consequent });
        }
        self.advance_or_err(|t| t.is_punct('}'), ErrorMsg::MissingClosingBrace)?;

        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, Error> {
        // Consume the `rj3` keyword
        self.advance();
        if self.peek().is_punct(';') {
            return Ok(Stmt::Return(None));
        }
        Ok(Stmt::Return(Some(self.parse_expr()?)))
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt, Error> {
        Ok(Stmt::Expr(self.parse_expr()?))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        self.advance_or_err(|t| t.is_punct('{'), ErrorMsg::MissingOpeningBrace)?;
        let items = self.parse_items(|t| t.is_punct('}'));
        self.advance_or_err(|t| t.is_punct('}'), ErrorMsg::MissingClosingBrace)?;
        Ok(items)
    }

    pub fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expr, Error> {
        let lhs = self.parse_logical_or()?;
        let t = self.peek();
        let Some(op) = (t.kind == TokenKind::OPERATOR)
            .then(|| AssignOp::from_lexeme(&t.lexeme))
            .flatten()
        else {
            return Ok(lhs);
        };
        if !lhs.is_assignable() {
            return Err(Self::error(t, ErrorMsg::InvalidAssignment));
        }
        self.advance();
        // Assignment is right-associative
        let rhs = self.nested(Self::parse_assignment)?;

        Ok(Expr::Assign {
            op,
            target: Box::new(lhs),
            value: Box::new(rhs),
            span: Span::from(t),
        })
    }

    fn parse_logical_or(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_logical_and()?;
        let mut links = 0;
        while self.advance_if(|t| t.is_op("||")).is_some() {
            self.deepen(&mut links)?;
            let rhs = self.parse_logical_and()?;
            lhs = Expr::Logical {
                lhs: Box::new(lhs),
                op: LogicalOp::Or,
                rhs: Box::new(rhs),
            };
        }
        self.depth -= links;
        Ok(lhs)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_eq()?;
        let mut links = 0;
        while self.advance_if(|t| t.is_op("&&")).is_some() {
            self.deepen(&mut links)?;
            let rhs = self.parse_eq()?;
            lhs = Expr::Logical {
                lhs: Box::new(lhs),
                op: LogicalOp::And,
                rhs: Box::new(rhs),
            };
        }
        self.depth -= links;
        Ok(lhs)
    }

    fn parse_eq(&mut self) -> Result<Expr, Error> {
        self.parse_binary(&["==", "!=", "===", "!=="], Self::parse_cmp)
    }

    fn parse_cmp(&mut self) -> Result<Expr, Error> {
        self.parse_binary(&["<", "<=", ">", ">="], Self::parse_term)
    }

    fn parse_term(&mut self) -> Result<Expr, Error> {
        self.parse_binary(&["+", "-"], Self::parse_factor)
    }

    fn parse_factor(&mut self) -> Result<Expr, Error> {
        self.parse_binary(&["*", "/", "%"], Self::parse_unary)
    }

    /// Parses one left-associative precedence level
    fn parse_binary(
        &mut self,
        ops: &[&str],
        operand: fn(&mut Self) -> Result<Expr, Error>,
    ) -> Result<Expr, Error> {
        let mut lhs = operand(self)?;
        let mut links = 0;
        while let Some(op) = self.advance_if(|t| ops.iter().any(|op| t.is_op(op))) {
            self.deepen(&mut links)?;
            // Infallible as the operator set is checked above
            let Some(bin_op) = BinOp::from_lexeme(&op.lexeme) else {
                unreachable!("non-binary operators cannot be present here")
            };
            let rhs = operand(self)?;
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op: bin_op,
                rhs: Box::new(rhs),
            };
        }
        self.depth -= links;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let t = self.peek();
        if t.is_op("++") || t.is_op("--") {
            self.advance();
            let target = self.nested(Self::parse_unary)?;
            if !target.is_assignable() {
                return Err(Self::error(t, ErrorMsg::InvalidUpdate));
            }
            return Ok(Expr::Update {
                op: Self::update_op(t),
                prefix: true,
                target: Box::new(target),
                span: Span::from(t),
            });
        }
        let op = if t.kind == TokenKind::OPERATOR || t.kind == TokenKind::KEYWORD {
            UnaryOp::from_token(t)
        } else {
            None
        };
        if let Some(op) = op {
            self.advance();
            return Ok(Expr::Unary {
                op,
                expr: Box::new(self.nested(Self::parse_unary)?),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let expr = self.parse_call()?;
        let t = self.peek();
        if !(t.is_op("++") || t.is_op("--")) {
            return Ok(expr);
        }
        if !expr.is_assignable() {
            return Err(Self::error(t, ErrorMsg::InvalidUpdate));
        }
        self.advance();
        Ok(Expr::Update {
            op: Self::update_op(t),
            prefix: false,
            target: Box::new(expr),
            span: Span::from(t),
        })
    }

    fn update_op(t: &Token) -> UpdateOp {
        if t.is_op("++") {
            UpdateOp::Increment
        } else {
            UpdateOp::Decrement
        }
    }

    fn parse_call(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;
        let mut links = 0;
        loop {
            let t = self.peek();
            if t.is_punct('(') || t.is_punct('.') || t.is_punct('[') {
                self.deepen(&mut links)?;
            }
            if t.is_punct('(') {
                self.advance();
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args: self.parse_args(t)?,
                    span: Span::from(t),
                };
            } else if t.is_punct('.') || t.is_punct('[') {
                expr = self.parse_member(expr)?;
            } else {
                break;
            }
        }
        self.depth -= links;

        Ok(expr)
    }

    /// Parses a single `.name` or `[expr]` suffix
    fn parse_member(&mut self, object: Expr) -> Result<Expr, Error> {
        let t = self.advance();
        let property = if t.is_punct('.') {
            let name = self.advance_or_err(
                |t| {
                    matches!(
                        t.kind,
                        TokenKind::IDENT | TokenKind::KEYWORD | TokenKind::BOOLEAN
                    )
                },
                ErrorMsg::InvalidIdent,
            )?;
            Property::Named(name.lexeme.clone())
        } else {
            let key = self.parse_expr()?;
            self.advance_or_err(|t| t.is_punct(']'), ErrorMsg::MissingClosingBracket)?;
            Property::Computed(Box::new(key))
        };

        Ok(Expr::Member {
            object: Box::new(object),
            property,
            span: Span::from(t),
        })
    }

    /// Parses call arguments after the opening parenthesis
    fn parse_args(&mut self, open: &Token) -> Result<Vec<Expr>, Error> {
        let mut args = vec![];
        if self.advance_if(|t| t.is_punct(')')).is_none() {
            loop {
                args.push(self.parse_expr()?);
                if self.advance_if(|t| t.is_punct(',')).is_none() {
                    break;
                }
            }
            self.advance_or_err(|t| t.is_punct(')'), ErrorMsg::MissingClosingParen)?;
        }
        if args.len() > MAX_ARGS {
            self.errors.push(Error::new(
                Phase::Parse,
                format!("{} {}", ErrorMsg::TooManyArgs, args.len()),
                open.line,
                open.column,
            ));
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let t = self.advance();
        let lit = match t.kind {
            TokenKind::NUMBER => Literal::Number(
                t.lexeme
                    .parse()
                    .map_err(|_| Self::error(t, ErrorMsg::UnexpectedToken))?,
            ),
            TokenKind::STRING => Literal::Str(t.lexeme.clone()),
            TokenKind::BOOLEAN => Literal::Boolean(t.lexeme == TRUE_LITERAL),
            TokenKind::IDENT => return Ok(Expr::Ident(Ident::new(t.lexeme.clone(), Span::from(t)))),
            TokenKind::KEYWORD => match t.keyword() {
                Some(Keyword::Farkha) => Literal::Null,
                Some(Keyword::Mchmcha) => Literal::Undefined,
                Some(Keyword::Hadi) => return Ok(Expr::This),
                Some(Keyword::Jdid) => return self.parse_new(t),
                Some(Keyword::Dala) => {
                    let name = if self.peek().kind == TokenKind::IDENT {
                        Some(self.parse_ident()?)
                    } else {
                        None
                    };
                    return Ok(Expr::Function(Rc::new(self.parse_function(name)?)));
                }
                _ => return Err(Self::error(t, ErrorMsg::UnexpectedToken)),
            },
            TokenKind::PUNCTUATION if t.is_punct('(') => return self.parse_group(),
            TokenKind::PUNCTUATION if t.is_punct('[') => return self.parse_array(),
            TokenKind::PUNCTUATION if t.is_punct('{') => return self.parse_object(),
            _ => return Err(Self::error(t, ErrorMsg::UnexpectedToken)),
        };
        Ok(Expr::Literal(lit))
    }

    fn parse_new(&mut self, keyword: &Token) -> Result<Expr, Error> {
        // The constructor is a primary followed by member accesses
        // only, so that the first argument list belongs to `jdid`
        let mut callee = self.parse_primary()?;
        let mut links = 0;
        while self.peek().is_punct('.') || self.peek().is_punct('[') {
            self.deepen(&mut links)?;
            callee = self.parse_member(callee)?;
        }
        self.depth -= links;
        let args = match self.advance_if(|t| t.is_punct('(')) {
            Some(open) => self.parse_args(open)?,
            None => vec![],
        };

        Ok(Expr::New {
            callee: Box::new(callee),
            args,
            span: Span::from(keyword),
        })
    }

    fn parse_group(&mut self) -> Result<Expr, Error> {
        let expr = self.parse_expr()?;
        self.advance_or_err(|t| t.is_punct(')'), ErrorMsg::MissingClosingParen)?;
        Ok(expr)
    }

    fn parse_array(&mut self) -> Result<Expr, Error> {
        let mut elements = vec![];
        while !self.peek().is_punct(']') {
            elements.push(self.parse_expr()?);
            if self.advance_if(|t| t.is_punct(',')).is_none() {
                break;
            }
        }
        self.advance_or_err(|t| t.is_punct(']'), ErrorMsg::MissingClosingBracket)?;
        Ok(Expr::Array(elements))
    }

    fn parse_object(&mut self) -> Result<Expr, Error> {
        let mut entries = vec![];
        while !self.peek().is_punct('}') {
            let t = self.advance();
            let key = match t.kind {
                TokenKind::IDENT | TokenKind::KEYWORD | TokenKind::BOOLEAN | TokenKind::STRING => {
                    t.lexeme.clone()
                }
                TokenKind::NUMBER => match t.lexeme.parse::<f64>() {
                    Ok(n) => n.to_string(),
                    Err(_) => return Err(Self::error(t, ErrorMsg::InvalidPropertyName)),
                },
                _ => return Err(Self::error(t, ErrorMsg::InvalidPropertyName)),
            };
            self.advance_or_err(|t| t.is_punct(':'), ErrorMsg::MissingColon)?;
            entries.push((key, self.parse_expr()?));
            if self.advance_if(|t| t.is_punct(',')).is_none() {
                break;
            }
        }
        self.advance_or_err(|t| t.is_punct('}'), ErrorMsg::MissingClosingBrace)?;
        Ok(Expr::Object(entries))
    }

    fn parse_ident(&mut self) -> Result<Ident, Error> {
        let t = self.advance_or_err(|t| t.kind == TokenKind::IDENT, ErrorMsg::InvalidIdent)?;
        Ok(Ident::new(t.lexeme.clone(), Span::from(t)))
    }

    fn peek(&mut self) -> &'a Token {
        self.stream.peek().copied().unwrap_or(&EOF)
    }

    /// Consumes the next token. The EOF sentinel is never consumed,
    /// so it stays available for error positions.
    fn advance(&mut self) -> &'a Token {
        let t = self.peek();
        if t.kind != TokenKind::EOF {
            self.stream.next();
            self.consumed += 1;
        }
        t
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<&'a Token>
    where
        F: FnOnce(&Token) -> bool,
    {
        let t = self.peek();
        if t.kind != TokenKind::EOF && cond(t) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn advance_or_err<F>(&mut self, cond: F, msg: ErrorMsg) -> Result<&'a Token, Error>
    where
        F: FnOnce(&Token) -> bool,
    {
        self.advance_if(cond)
            .ok_or_else(|| Self::error(self.peek(), msg))
    }

    /// Skips tokens until a statement boundary: a consumed `;`, or
    /// a statement keyword, a brace or a switch clause left in place.
    fn sync(&mut self) {
        loop {
            let t = self.peek();
            if t.kind == TokenKind::EOF || t.is_punct('{') || t.is_punct('}') {
                return;
            }
            if t.is_punct(';') {
                self.advance();
                return;
            }
            if let Some(kw) = t.keyword() {
                if kw.starts_statement() || matches!(kw, Keyword::Hala | Keyword::Adi) {
                    return;
                }
            }
            self.advance();
        }
    }

    /// Runs `f` one nesting level deeper. The depth is restored on
    /// both paths, which also drops levels left behind by a chain
    /// that failed midway.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.depth >= MAX_NESTING {
            return Err(Self::error(self.peek(), ErrorMsg::NestingTooDeep));
        }
        let depth = self.depth;
        self.depth += 1;
        let res = f(self);
        self.depth = depth;
        res
    }

    /// Counts one more link of a left-associative chain. Callers
    /// release their links once the chain is complete.
    fn deepen(&mut self, links: &mut usize) -> Result<(), Error> {
        if self.depth >= MAX_NESTING {
            return Err(Self::error(self.peek(), ErrorMsg::NestingTooDeep));
        }
        self.depth += 1;
        *links += 1;
        Ok(())
    }

    /// Statement valid only inside an enclosing construct
    fn misplaced(token: &Token, msg: ErrorMsg) -> Error {
        Error::new(Phase::Parse, msg.to_string(), token.line, token.column)
    }

    fn error(token: &Token, msg: ErrorMsg) -> Error {
        Error::new(
            Phase::Parse,
            format!("{} `{}`", msg, token),
            token.line,
            token.column,
        )
    }
}
