use std::fmt::Display;

/// The pipeline stage an error was raised in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Lex,
    Parse,
    Runtime,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Lex => "Lex",
            Self::Parse => "Parse",
            Self::Runtime => "Runtime",
        })
    }
}

/// A positioned error. Lines and columns are 1-based; a line of 0
/// means the position is not known yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub phase: Phase,
    pub msg: String,
    pub line: usize,
    pub column: usize,
}

impl Error {
    pub fn new(phase: Phase, msg: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            phase,
            msg: msg.into(),
            line,
            column,
        }
    }

    pub fn has_position(&self) -> bool {
        self.line != 0
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_position() {
            write!(
                f,
                "{} error at line {}, column {}: {}",
                self.phase, self.line, self.column, self.msg
            )
        } else {
            write!(f, "{} error: {}", self.phase, self.msg)
        }
    }
}

impl std::error::Error for Error {}

#[derive(Debug)]
pub enum ErrorMsg {
    // Lex errors
    UnexpectedChar,
    UnterminatedString,
    UnterminatedComment,
    InvalidNumber,
    // Parse errors
    UnexpectedToken,
    MissingSemicolon,
    MissingColon,
    MissingOpeningParen,
    MissingClosingParen,
    MissingOpeningBrace,
    MissingClosingBrace,
    MissingClosingBracket,
    InvalidIdent,
    InvalidAssignment,
    InvalidUpdate,
    InvalidPropertyName,
    MissingConstInit,
    TooManyParams,
    TooManyArgs,
    MissingCatchOrFinally,
    InvalidCase,
    DuplicateDefault,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    ReturnOutsideFunction,
    NestingTooDeep,
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::UnexpectedChar => "unexpected character",
            Self::UnterminatedString => "unterminated string",
            Self::UnterminatedComment => "unterminated block comment",
            Self::InvalidNumber => "invalid numeric literal",
            Self::UnexpectedToken => "unexpected token",
            Self::MissingSemicolon => "expected `;`, found",
            Self::MissingColon => "expected `:`, found",
            Self::MissingOpeningParen => "expected `(`, found",
            Self::MissingClosingParen => "expected `)`, found",
            Self::MissingOpeningBrace => "expected `{`, found",
            Self::MissingClosingBrace => "expected `}`, found",
            Self::MissingClosingBracket => "expected `]`, found",
            Self::InvalidIdent => "expected identifier, found",
            Self::InvalidAssignment => "invalid assignment target before",
            Self::InvalidUpdate => "invalid increment/decrement target before",
            Self::InvalidPropertyName => "invalid property name",
            Self::MissingConstInit => "missing initializer in `tabit` declaration before",
            Self::TooManyParams => "functions cannot take more than 255 parameters, found",
            Self::TooManyArgs => "calls cannot pass more than 255 arguments, found",
            Self::MissingCatchOrFinally => "expected `msk` or `fakhr` after `jrb` block, found",
            Self::InvalidCase => "expected `7ala` or `3adi` in `bdl3la` body, found",
            Self::DuplicateDefault => "more than one `3adi` clause in `bdl3la`",
            Self::BreakOutsideLoop => "`wa9f` outside of a loop or `bdl3la`",
            Self::ContinueOutsideLoop => "`kamml` outside of a loop",
            Self::ReturnOutsideFunction => "`rj3` outside of a function",
            Self::NestingTooDeep => "nesting too deep at",
        })
    }
}
