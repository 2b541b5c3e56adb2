use std::fmt::Display;

use darija_syntax::{
    ast::Span,
    error::{Error, Phase},
};

use crate::types::Value;

/// An abrupt completion that unwinds until a `msk` handler or the
/// top of the run.
#[derive(Debug)]
pub enum Exception {
    /// A fault detected by the interpreter
    Error(Error),
    /// A value raised by the program through `rmmi`
    Raised {
        value: Value,
        line: usize,
        column: usize,
    },
}

impl Exception {
    /// Positions an exception that was created without one, such as
    /// those coming out of the environment or native functions.
    pub fn at(self, span: Span) -> Self {
        match self {
            Self::Error(mut e) if !e.has_position() => {
                e.line = span.line;
                e.column = span.column;
                Self::Error(e)
            }
            Self::Raised {
                value, line: 0, ..
            } => Self::Raised {
                value,
                line: span.line,
                column: span.column,
            },
            other => other,
        }
    }

    /// The value a `msk` clause binds: the message of an interpreter
    /// fault, or the raised payload itself.
    pub fn into_value(self) -> Value {
        match self {
            Self::Error(e) => Value::Str(e.msg),
            Self::Raised { value, .. } => value,
        }
    }
}

impl Display for Exception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(e) => write!(f, "{e}"),
            Self::Raised {
                value,
                line: 0,
                ..
            } => write!(f, "Runtime error: uncaught {}", value.to_literal()),
            Self::Raised {
                value,
                line,
                column,
            } => write!(
                f,
                "Runtime error at line {line}, column {column}: uncaught {}",
                value.to_literal()
            ),
        }
    }
}

#[derive(Debug)]
pub enum ErrorMsg {
    // Memory errors
    UndefinedVar,
    ConstAssign,
    Redeclaration,
    // Runtime errors
    InvalidAssignTarget,
    InvalidIndex,
    InvalidCallExpr,
    InvalidConstructor,
    UndefinedMember,
    InvalidMemberAccess,
    TooManyArgs,
    CallDepthExceeded,
    TimerLimitExceeded,
    NestingTooDeep,
    // Built-in argument errors
    ExpectedFunction,
    ExpectedObject,
    ExpectedDate,
    EmptyReduce,
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::UndefinedVar => "undefined variable",
            Self::ConstAssign => "assignment to constant",
            Self::Redeclaration => "variable already declared in this scope",
            Self::InvalidAssignTarget => "cannot assign to a property of",
            Self::InvalidIndex => "invalid array index",
            Self::InvalidCallExpr => "not a function",
            Self::InvalidConstructor => "not a constructor",
            Self::UndefinedMember => "undefined member",
            Self::InvalidMemberAccess => "cannot read a property of",
            Self::TooManyArgs => "calls cannot pass more than 255 arguments, found",
            Self::CallDepthExceeded => "maximum call depth exceeded in",
            Self::TimerLimitExceeded => "timer callbacks exceeded the limit of",
            Self::NestingTooDeep => "evaluation nested deeper than the limit of",
            Self::ExpectedFunction => "expected a function, found",
            Self::ExpectedObject => "expected an object or array, found",
            Self::ExpectedDate => "expected a date, found",
            Self::EmptyReduce => "`jme3` of an empty array with no initial value",
        })
    }
}

/// Builds an unpositioned runtime fault.
pub fn runtime_error(msg: ErrorMsg, val: impl Display) -> Exception {
    Exception::Error(Error::new(Phase::Runtime, format!("{msg} `{val}`"), 0, 0))
}
