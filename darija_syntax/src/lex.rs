use crate::{
    error::{Error, ErrorMsg, Phase},
    token::{Keyword, TextRange, Token, TokenKind, FALSE_LITERALS, OPERATORS, PUNCTUATION, TRUE_LITERAL},
};

#[derive(Debug)]
pub struct Lexer {
    source: Vec<char>,
    line: usize,
    column: usize,
    start: usize,
    start_line: usize,
    start_column: usize,
    current: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            line: 1,
            column: 1,
            start: 0,
            start_line: 1,
            start_column: 1,
            current: 0,
        }
    }

    /// Lexes the whole source, stopping at the first error. The
    /// returned sequence always ends with a single EOF token.
    pub fn lex_all(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens: Vec<Token> = Vec::default();
        loop {
            let token = self.lex()?;
            let done = token.kind == TokenKind::EOF;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    pub fn lex(&mut self) -> Result<Token, Error> {
        self.skip_trivia()?;
        self.start = self.current;
        self.start_line = self.line;
        self.start_column = self.column;
        let Some(c) = self.advance() else {
            return Ok(self.make_token_with(TokenKind::EOF, String::default()));
        };
        match c {
            '"' | '\'' => self.lex_string(c),
            c if c.is_ascii_digit() => self.lex_number(),
            c if is_ident_char(c) => Ok(self.lex_ident()),
            c if PUNCTUATION.contains(&c) => Ok(self.make_token(TokenKind::PUNCTUATION)),
            c => self.lex_operator(c),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), Error> {
        loop {
            match (self.peek(), self.peek_nth(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    self.advance_while(|c| c != '\n');
                }
                (Some('/'), Some('*')) => {
                    self.start_line = self.line;
                    self.start_column = self.column;
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('*') if self.advance_if(|c| c == '/').is_some() => break,
                            Some(_) => (),
                            None => return Err(self.error(ErrorMsg::UnterminatedComment)),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_ident(&mut self) -> Token {
        self.advance_while(is_ident_char);
        let word = self.lexeme_from_range();
        let kind = if word == TRUE_LITERAL || FALSE_LITERALS.contains(&word.as_str()) {
            TokenKind::BOOLEAN
        } else if Keyword::from_word(&word).is_some() {
            TokenKind::KEYWORD
        } else {
            TokenKind::IDENT
        };
        self.make_token_with(kind, word)
    }

    fn lex_number(&mut self) -> Result<Token, Error> {
        // Consume the integer part
        self.advance_while(|c| c.is_ascii_digit());
        // Words such as `7ala` or `3adi` start with a digit
        if !self.exponent_ahead() && self.peek().is_some_and(is_ident_char) {
            return Ok(self.lex_ident());
        }
        // The fraction is only consumed when a digit follows the dot,
        // otherwise the dot is left for member access
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.advance_while(|c| c.is_ascii_digit());
        }
        if self.exponent_ahead() {
            self.advance();
            self.advance_if(|c| c == '+' || c == '-');
            self.advance_while(|c| c.is_ascii_digit());
        }
        if self.peek().is_some_and(is_ident_char) {
            self.advance_while(is_ident_char);
            return Err(self.error_with(ErrorMsg::InvalidNumber));
        }
        let lexeme = self.lexeme_from_range();
        if lexeme.parse::<f64>().is_err() {
            return Err(self.error_with(ErrorMsg::InvalidNumber));
        }
        Ok(self.make_token_with(TokenKind::NUMBER, lexeme))
    }

    fn exponent_ahead(&self) -> bool {
        if !matches!(self.peek(), Some('e' | 'E')) {
            return false;
        }
        match self.peek_nth(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('+' | '-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, Error> {
        let mut value = String::default();
        loop {
            match self.advance() {
                None | Some('\n') => return Err(self.error(ErrorMsg::UnterminatedString)),
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    None => return Err(self.error(ErrorMsg::UnterminatedString)),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(c) => value.push(c),
                },
                Some(c) => value.push(c),
            }
        }
        Ok(self.make_token_with(TokenKind::STRING, value))
    }

    fn lex_operator(&mut self, first: char) -> Result<Token, Error> {
        // Operators are listed longest first, so the first match
        // is the maximal munch
        let rest = &self.source[self.start..];
        let matched = OPERATORS.iter().find(|op| {
            op.chars().count() <= rest.len() && op.chars().zip(rest).all(|(a, &b)| a == b)
        });
        match matched {
            Some(op) => {
                for _ in 1..op.chars().count() {
                    self.advance();
                }
                Ok(self.make_token(TokenKind::OPERATOR))
            }
            None => Err(Error::new(
                Phase::Lex,
                format!("{} `{}`", ErrorMsg::UnexpectedChar, first),
                self.start_line,
                self.start_column,
            )),
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        self.make_token_with(kind, self.lexeme_from_range())
    }

    fn make_token_with(&self, kind: TokenKind, lexeme: String) -> Token {
        Token::new(
            kind,
            self.text_range(),
            self.start_line,
            self.start_column,
            lexeme,
        )
    }

    fn lexeme_from_range(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn text_range(&self) -> TextRange {
        TextRange {
            start: self.start,
            end: self.current,
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source.get(self.current + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<char>
    where
        F: FnOnce(char) -> bool,
    {
        if self.peek().filter(|&c| cond(c)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_while<F>(&mut self, cond: F) -> Option<usize>
    where
        F: Fn(char) -> bool,
    {
        let mut count: usize = 0;
        while self.peek().filter(|&c| cond(c)).is_some() {
            count += 1;
            self.advance();
        }
        count.ne(&0).then_some(count)
    }

    fn error(&self, msg: ErrorMsg) -> Error {
        Error::new(Phase::Lex, msg.to_string(), self.start_line, self.start_column)
    }

    fn error_with(&self, msg: ErrorMsg) -> Error {
        Error::new(
            Phase::Lex,
            format!("{} `{}`", msg, self.lexeme_from_range()),
            self.start_line,
            self.start_column,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_test(input: &str, expected: &[(TokenKind, &str)]) {
        let tokens = Lexer::new(input).lex_all().unwrap();
        let actual = tokens
            .iter()
            .map(|t| (t.kind, t.lexeme.as_str()))
            .collect::<Vec<_>>();
        let mut expected = expected.to_vec();
        expected.push((TokenKind::EOF, ""));
        assert_eq!(actual, expected);
    }

    fn lex_err_test(input: &str, expected: &str) {
        let err = Lexer::new(input).lex_all().unwrap_err();
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn declaration() {
        lex_test(
            "tabit x = 4.5;",
            &[
                (TokenKind::KEYWORD, "tabit"),
                (TokenKind::IDENT, "x"),
                (TokenKind::OPERATOR, "="),
                (TokenKind::NUMBER, "4.5"),
                (TokenKind::PUNCTUATION, ";"),
            ],
        );
    }

    #[test]
    fn booleans() {
        lex_test(
            "s7i7 ghalat kdb",
            &[
                (TokenKind::BOOLEAN, "s7i7"),
                (TokenKind::BOOLEAN, "ghalat"),
                (TokenKind::BOOLEAN, "kdb"),
            ],
        );
    }

    #[test]
    fn digit_led_keywords() {
        lex_test(
            "7ala 3adi 9iyam",
            &[
                (TokenKind::KEYWORD, "7ala"),
                (TokenKind::KEYWORD, "3adi"),
                (TokenKind::IDENT, "9iyam"),
            ],
        );
    }

    #[test]
    fn numbers() {
        lex_test(
            "12 0.25 1e3 2.5E-2 7.x",
            &[
                (TokenKind::NUMBER, "12"),
                (TokenKind::NUMBER, "0.25"),
                (TokenKind::NUMBER, "1e3"),
                (TokenKind::NUMBER, "2.5E-2"),
                (TokenKind::NUMBER, "7"),
                (TokenKind::PUNCTUATION, "."),
                (TokenKind::IDENT, "x"),
            ],
        );
    }

    #[test]
    fn strings() {
        lex_test(
            r#""a\"b" 'it\'s\n'"#,
            &[(TokenKind::STRING, "a\"b"), (TokenKind::STRING, "it's\n")],
        );
    }

    #[test]
    fn maximal_munch() {
        lex_test(
            "a === b !== c == d = e++ + f",
            &[
                (TokenKind::IDENT, "a"),
                (TokenKind::OPERATOR, "==="),
                (TokenKind::IDENT, "b"),
                (TokenKind::OPERATOR, "!=="),
                (TokenKind::IDENT, "c"),
                (TokenKind::OPERATOR, "=="),
                (TokenKind::IDENT, "d"),
                (TokenKind::OPERATOR, "="),
                (TokenKind::IDENT, "e"),
                (TokenKind::OPERATOR, "++"),
                (TokenKind::OPERATOR, "+"),
                (TokenKind::IDENT, "f"),
            ],
        );
    }

    #[test]
    fn comments_are_skipped() {
        lex_test(
            "// line\nx /* block\n comment */ y",
            &[(TokenKind::IDENT, "x"), (TokenKind::IDENT, "y")],
        );
    }

    #[test]
    fn positions() {
        let tokens = Lexer::new("bdl x;\n  tbe3(x);").lex_all().unwrap();
        let tbe3 = &tokens[3];
        assert_eq!((tbe3.line, tbe3.column), (2, 3));
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::EOF);
        assert_eq!((eof.line, eof.column), (2, 11));
    }

    #[test]
    fn unexpected_char() {
        lex_err_test(
            "bdl x = 1 @ 2;",
            "Lex error at line 1, column 11: unexpected character `@`",
        );
    }

    #[test]
    fn unterminated_string() {
        lex_err_test(
            "tbe3(\"hello);\ntbe3(1);",
            "Lex error at line 1, column 6: unterminated string",
        );
    }

    #[test]
    fn unterminated_comment() {
        lex_err_test(
            "x; /* never closed",
            "Lex error at line 1, column 4: unterminated block comment",
        );
    }
}
