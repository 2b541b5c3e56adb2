use std::{fmt::Display, rc::Rc};

use crate::token::Token;

/// Source position of a node, used for runtime error reporting.
#[derive(Copy, Clone, Debug, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

/// Spans never take part in structural comparison, so two trees
/// parsed from differently formatted text compare equal.
impl PartialEq for Span {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl From<&Token> for Span {
    fn from(token: &Token) -> Self {
        Self {
            line: token.line,
            column: token.column,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Source {
    pub body: Vec<Stmt>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    /// `tabit`
    Const,
    /// `bdl`
    Let,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: Option<Ident>,
    pub params: Vec<Ident>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause {
    pub param: Ident,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    /// `None` marks the `3adi` clause
    pub test: Option<Expr>,
    pub consequent: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    VarDecl {
        kind: DeclKind,
        ident: Ident,
        init: Option<Expr>,
    },
    Function(Rc<Function>),
    Block(Vec<Stmt>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Expr(Expr),
    Empty,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Bang,
    Minus,
    Plus,
    TypeOf,
}

impl UnaryOp {
    pub fn from_token(t: &Token) -> Option<Self> {
        use crate::token::Keyword;
        if t.is_keyword(Keyword::No3) {
            return Some(Self::TypeOf);
        }
        let op = match t.lexeme.as_str() {
            "!" => Self::Bang,
            "-" => Self::Minus,
            "+" => Self::Plus,
            _ => return None,
        };
        Some(op)
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Bang => "!",
            Self::Minus => "-",
            Self::Plus => "+",
            Self::TypeOf => "no3 ",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl Display for UpdateOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Slash,
    Star,
    Modulo,
    Plus,
    Minus,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    EqualEqual,
    BangEqual,
    StrictEqual,
    StrictNotEqual,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Slash => "/",
            Self::Star => "*",
            Self::Modulo => "%",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::EqualEqual => "==",
            Self::BangEqual => "!=",
            Self::StrictEqual => "===",
            Self::StrictNotEqual => "!==",
        })
    }
}

impl BinOp {
    pub fn from_lexeme(op: &str) -> Option<Self> {
        let op = match op {
            "/" => Self::Slash,
            "*" => Self::Star,
            "%" => Self::Modulo,
            "+" => Self::Plus,
            "-" => Self::Minus,
            ">" => Self::Greater,
            ">=" => Self::GreaterEqual,
            "<" => Self::Less,
            "<=" => Self::LessEqual,
            "==" => Self::EqualEqual,
            "!=" => Self::BangEqual,
            "===" => Self::StrictEqual,
            "!==" => Self::StrictNotEqual,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::And => "&&",
            Self::Or => "||",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl AssignOp {
    pub fn from_lexeme(op: &str) -> Option<Self> {
        let op = match op {
            "=" => Self::Assign,
            "+=" => Self::Add,
            "-=" => Self::Sub,
            "*=" => Self::Mul,
            "/=" => Self::Div,
            "%=" => Self::Rem,
            _ => return None,
        };
        Some(op)
    }

    /// The binary operator a compound assignment applies
    pub fn bin_op(&self) -> Option<BinOp> {
        match self {
            Self::Assign => None,
            Self::Add => Some(BinOp::Plus),
            Self::Sub => Some(BinOp::Minus),
            Self::Mul => Some(BinOp::Star),
            Self::Div => Some(BinOp::Slash),
            Self::Rem => Some(BinOp::Modulo),
        }
    }
}

impl Display for AssignOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
            Self::Rem => "%=",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Boolean(bool),
    Null,
    Undefined,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Property {
    /// `object.name`
    Named(String),
    /// `object[expr]`
    Computed(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    Logical {
        lhs: Box<Expr>,
        op: LogicalOp,
        rhs: Box<Expr>,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinOp,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        property: Property,
        span: Span,
    },
    Ident(Ident),
    Literal(Literal),
    This,
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Function(Rc<Function>),
}

impl Expr {
    /// Whether the expression can appear on the left of an
    /// assignment or as the operand of `++`/`--`
    pub fn is_assignable(&self) -> bool {
        matches!(self, Self::Ident(_) | Self::Member { .. })
    }
}
