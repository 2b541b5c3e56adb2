use std::fmt::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

/// The enum variants are in SCREAMING_SNAKE_CASE as they technically
/// represent constants, but Rust does not allow const enum variants.
#[allow(nonstandard_style)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenKind {
    NUMBER,
    STRING,
    BOOLEAN,
    IDENT,
    KEYWORD,
    OPERATOR,
    PUNCTUATION,
    EOF,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NUMBER => "number",
            Self::STRING => "string",
            Self::BOOLEAN => "boolean",
            Self::IDENT => "identifier",
            Self::KEYWORD => "keyword",
            Self::OPERATOR => "operator",
            Self::PUNCTUATION => "punctuation",
            Self::EOF => "end of file",
        })
    }
}

/// Operators ordered so that the first prefix match is the longest one.
pub const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=",
    "+", "-", "*", "/", "%", "<", ">", "!", "=",
];

pub const PUNCTUATION: &[char] = &['{', '}', '(', ')', '[', ']', ',', ';', '.', ':'];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Tabit,
    Bdl,
    Dala,
    Rj3,
    Jdid,
    Hadi,
    No3,
    Ila,
    Ella,
    Wa9ila,
    Douz,
    Madamt,
    Dir,
    Bdl3la,
    Hala,
    Adi,
    Wa9f,
    Kamml,
    Jrb,
    Msk,
    Fakhr,
    Farkha,
    Mchmcha,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        let kw = match word {
            "tabit" => Self::Tabit,
            "bdl" => Self::Bdl,
            "dala" => Self::Dala,
            "rj3" => Self::Rj3,
            "jdid" => Self::Jdid,
            "hadi" => Self::Hadi,
            "no3" => Self::No3,
            "ila" => Self::Ila,
            "ella" => Self::Ella,
            "wa9ila" => Self::Wa9ila,
            "douz" => Self::Douz,
            "madamt" => Self::Madamt,
            "dir" => Self::Dir,
            "bdl3la" => Self::Bdl3la,
            "7ala" => Self::Hala,
            "3adi" => Self::Adi,
            "wa9f" => Self::Wa9f,
            "kamml" => Self::Kamml,
            "jrb" => Self::Jrb,
            "msk" => Self::Msk,
            "fakhr" => Self::Fakhr,
            "farkha" => Self::Farkha,
            "mchmcha" => Self::Mchmcha,
            _ => return None,
        };
        Some(kw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tabit => "tabit",
            Self::Bdl => "bdl",
            Self::Dala => "dala",
            Self::Rj3 => "rj3",
            Self::Jdid => "jdid",
            Self::Hadi => "hadi",
            Self::No3 => "no3",
            Self::Ila => "ila",
            Self::Ella => "ella",
            Self::Wa9ila => "wa9ila",
            Self::Douz => "douz",
            Self::Madamt => "madamt",
            Self::Dir => "dir",
            Self::Bdl3la => "bdl3la",
            Self::Hala => "7ala",
            Self::Adi => "3adi",
            Self::Wa9f => "wa9f",
            Self::Kamml => "kamml",
            Self::Jrb => "jrb",
            Self::Msk => "msk",
            Self::Fakhr => "fakhr",
            Self::Farkha => "farkha",
            Self::Mchmcha => "mchmcha",
        }
    }

    /// Keywords that may begin a statement, used when resynchronising
    /// the parser after an error.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Self::Tabit
                | Self::Bdl
                | Self::Dala
                | Self::Rj3
                | Self::Ila
                | Self::Douz
                | Self::Madamt
                | Self::Dir
                | Self::Bdl3la
                | Self::Wa9f
                | Self::Kamml
                | Self::Jrb
        )
    }
}

pub const TRUE_LITERAL: &str = "s7i7";
pub const FALSE_LITERALS: &[&str] = &["ghalat", "kdb"];

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
    pub line: usize,
    pub column: usize,
    pub lexeme: String,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::EOF => f.write_str("end of file"),
            TokenKind::STRING => write!(f, "\"{}\"", self.lexeme),
            _ => f.write_str(&self.lexeme),
        }
    }
}

impl Token {
    pub fn new(
        kind: TokenKind,
        range: TextRange,
        line: usize,
        column: usize,
        lexeme: String,
    ) -> Self {
        Self {
            kind,
            range,
            line,
            column,
            lexeme,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        if self.kind == TokenKind::KEYWORD {
            Keyword::from_word(&self.lexeme)
        } else {
            None
        }
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.keyword() == Some(kw)
    }

    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::OPERATOR && self.lexeme == op
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::PUNCTUATION && self.lexeme.starts_with(c)
    }
}
