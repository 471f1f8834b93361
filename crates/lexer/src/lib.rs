//! Tokenizer for the SQL dialect.
//!
//! Turns source text into a flat stream of [`Token`]s, each carrying the
//! line/column where it started. The stream always ends with `Eof` so a
//! parser never needs to special-case running off the end.


use common::{DbError, DbResult};

/// The shape of a single lexeme.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// A reserved word, normalized to upper-case (`SELECT`, `FROM`, ...).
    Keyword(String),
    Ident(String),
    Int(i64),
    Str(String),
    True,
    False,
    Null,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Comma,
    Semicolon,
    LParen,
    RParen,
    Dot,
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

const KEYWORDS: &[&str] = &[
    "CREATE", "TABLE", "INSERT", "INTO", "SELECT", "FROM", "WHERE", "VALUES", "DELETE", "DROP",
    "UPDATE", "SET", "INT", "INTEGER", "VARCHAR", "CHAR", "TEXT", "FLOAT", "REAL", "BOOLEAN",
    "AND", "OR", "NOT", "ORDER", "BY", "ASC", "DESC", "LIMIT", "JOIN", "INNER", "LEFT", "RIGHT",
    "FULL", "OUTER", "ON", "COUNT", "SUM", "AVG", "MAX", "MIN", "DISTINCT", "BEGIN", "COMMIT",
    "ROLLBACK", "TRANSACTION",
];

/// Tokenize `source` into a token stream, terminated by `Eof`.
///
/// # Errors
/// Returns `DbError::Lexical` with the offending position on an unterminated
/// string, unterminated block comment, or unrecognized character.
pub fn tokenize(source: &str) -> DbResult<Vec<Token>> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    _source: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            _source: source,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn err(&self, line: usize, column: usize, msg: impl Into<String>) -> DbError {
        DbError::Lexical(line, column, msg.into())
    }

    fn run(mut self) -> DbResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            let (line, column) = (self.line, self.column);
            let Some(c) = self.current() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    line,
                    column,
                });
                break;
            };

            let kind = if c.is_ascii_digit() {
                self.read_number()?
            } else if c.is_alphabetic() || c == '_' {
                self.read_word()
            } else if c == '\'' || c == '"' {
                self.read_string(c)?
            } else {
                self.read_operator_or_delim(line, column)?
            };

            tokens.push(Token { kind, line, column });
        }
        Ok(tokens)
    }

    fn skip_whitespace_and_comments(&mut self) -> DbResult<()> {
        loop {
            match self.current() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('-') if self.peek() == Some('-') => {
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek() == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(c) = self.current() {
                        if c == '*' && self.peek() == Some('/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        return Err(self.err(line, column, "unterminated block comment"));
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn read_number(&mut self) -> DbResult<TokenKind> {
        let (line, column) = (self.line, self.column);
        let mut lexeme = String::new();
        while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
            lexeme.push(self.advance().unwrap());
        }
        lexeme
            .parse::<i64>()
            .map(TokenKind::Int)
            .map_err(|_| self.err(line, column, format!("invalid integer literal '{lexeme}'")))
    }

    fn read_word(&mut self) -> TokenKind {
        let mut lexeme = String::new();
        while matches!(self.current(), Some(c) if c.is_alphanumeric() || c == '_') {
            lexeme.push(self.advance().unwrap());
        }
        let upper = lexeme.to_ascii_uppercase();
        match upper.as_str() {
            "TRUE" => TokenKind::True,
            "FALSE" => TokenKind::False,
            "NULL" => TokenKind::Null,
            _ if KEYWORDS.contains(&upper.as_str()) => TokenKind::Keyword(upper),
            _ => TokenKind::Ident(lexeme),
        }
    }

    fn read_string(&mut self, quote: char) -> DbResult<TokenKind> {
        let (line, column) = (self.line, self.column);
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.current() {
                None => return Err(self.err(line, column, "unterminated string literal")),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\\') => value.push('\\'),
                        Some(c) if c == quote => value.push(quote),
                        Some(other) => value.push(other),
                        None => return Err(self.err(line, column, "unterminated string literal")),
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
        Ok(TokenKind::Str(value))
    }

    fn read_operator_or_delim(&mut self, line: usize, column: usize) -> DbResult<TokenKind> {
        let c = self.advance().unwrap();
        let kind = match c {
            '=' => TokenKind::Eq,
            '!' if self.current() == Some('=') => {
                self.advance();
                TokenKind::Ne
            }
            '<' if self.current() == Some('>') => {
                self.advance();
                TokenKind::Ne
            }
            '<' if self.current() == Some('=') => {
                self.advance();
                TokenKind::Le
            }
            '<' => TokenKind::Lt,
            '>' if self.current() == Some('=') => {
                self.advance();
                TokenKind::Ge
            }
            '>' => TokenKind::Gt,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '.' => TokenKind::Dot,
            other => return Err(self.err(line, column, format!("unexpected character '{other}'"))),
        };
        Ok(kind)
    }
}
