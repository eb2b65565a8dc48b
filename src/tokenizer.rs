use crate::token::{Keyword, Token, TokenKind};

/// A lexical scanner (lexer) that converts a raw SQL string into a sequence of [Token]s.
///
/// Tokenizing never fails: characters that do not start any token, and
/// literals left unterminated, become [`TokenKind::Unknown`] tokens so that
/// the parser can report the exact location.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
    line: usize,
    column: usize,
}

/// Convenience wrapper around [`Tokenizer::tokenize`].
pub fn tokenize(sql: &str) -> Vec<Token> {
    Tokenizer::new(sql).tokenize()
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Processes the entire input and returns a vector of tokens, always
    /// terminated by [`TokenKind::Eof`].
    ///
    /// # Example
    /// ```
    /// # use sqlcore::token::{Keyword, TokenKind};
    /// # use sqlcore::tokenizer::Tokenizer;
    /// let tokens = Tokenizer::new("SELECT *").tokenize();
    /// assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Select));
    /// assert_eq!(tokens[1].kind, TokenKind::Star);
    /// ```
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();

            if self.is_at_end() {
                break;
            }

            tokens.push(self.next_token());
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            line: self.line,
            column: self.column,
            offset: self.position,
        });
        tokens
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Token {
        let start = (self.position, self.line, self.column);
        let ch = self.current_char();

        let (kind, text) = match ch {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            '*' => self.single(TokenKind::Star),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '/' => self.single(TokenKind::Slash),
            '%' => self.single(TokenKind::Percent),
            '=' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    (TokenKind::Eq, "==".to_string())
                } else {
                    (TokenKind::Eq, "=".to_string())
                }
            }
            '<' => {
                self.advance();
                match self.peek() {
                    Some('=') => self.double(TokenKind::LtEq, "<="),
                    Some('>') => self.double(TokenKind::NotEq, "<>"),
                    _ => (TokenKind::Lt, "<".to_string()),
                }
            }
            '>' => {
                self.advance();
                match self.peek() {
                    Some('=') => self.double(TokenKind::GtEq, ">="),
                    _ => (TokenKind::Gt, ">".to_string()),
                }
            }
            '!' => {
                self.advance();
                match self.peek() {
                    Some('=') => self.double(TokenKind::NotEq, "!="),
                    _ => (TokenKind::Unknown, "!".to_string()),
                }
            }
            '|' => {
                self.advance();
                match self.peek() {
                    Some('|') => self.double(TokenKind::Concat, "||"),
                    _ => (TokenKind::Unknown, "|".to_string()),
                }
            }
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            '.' => self.single(TokenKind::Dot),
            '\'' => self.read_string(),
            '"' => self.read_quoted_identifier('"'),
            '`' => self.read_quoted_identifier('`'),
            '?' => self.single(TokenKind::Parameter),
            '$' | ':' | '@' => self.read_parameter(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            other => {
                self.advance();
                (TokenKind::Unknown, other.to_string())
            }
        };

        Token {
            kind,
            text,
            line: start.1,
            column: start.2,
            offset: start.0,
        }
    }

    // --- Navigation Helpers ---

    /// Returns the character at the current position.
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.input.get(self.position + ahead).copied()
    }

    /// Moves the cursor forward by one character, tracking line and column.
    fn advance(&mut self) {
        if self.current_char() == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    /// Checks if the cursor has reached the end of the input.
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn single(&mut self, kind: TokenKind) -> (TokenKind, String) {
        let text = self.current_char().to_string();
        self.advance();
        (kind, text)
    }

    /// Consumes the second character of a two-character operator.
    fn double(&mut self, kind: TokenKind, text: &str) -> (TokenKind, String) {
        self.advance();
        (kind, text.to_string())
    }

    /// Consumes whitespace, `-- line` comments and `/* block */` comments.
    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '-' && self.peek_at(1) == Some('-') {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
            } else if ch == '/' && self.peek_at(1) == Some('*') {
                self.advance();
                self.advance();
                while !self.is_at_end() && !(self.current_char() == '*' && self.peek_at(1) == Some('/')) {
                    self.advance();
                }
                if !self.is_at_end() {
                    self.advance();
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    // --- Extraction Logic ---

    /// Reads a sequence of alphanumeric characters and determines if it's
    /// a reserved SQL keyword or a user-defined identifier.
    ///
    /// Keywords are matched case-insensitively.
    fn read_identifier(&mut self) -> (TokenKind, String) {
        let mut ident = String::new();

        while !self.is_at_end()
            && (self.current_char().is_alphanumeric() || self.current_char() == '_' || self.current_char() == '$')
        {
            ident.push(self.current_char());
            self.advance();
        }

        match Keyword::lookup(&ident) {
            Some(keyword) => (TokenKind::Keyword(keyword), ident),
            None => (TokenKind::Identifier, ident),
        }
    }

    /// Reads an integer or decimal literal, with an optional exponent.
    /// The text is kept verbatim; the parser decides between integer and float.
    fn read_number(&mut self) -> (TokenKind, String) {
        let mut number = String::new();
        let mut has_dot = false;

        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_ascii_digit() {
                number.push(ch);
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number.push(ch);
            } else {
                break;
            }
            self.advance();
        }

        let exponent_follows = matches!(self.peek(), Some('e' | 'E'))
            && match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
        if exponent_follows {
            number.push(self.current_char());
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                number.push(self.current_char());
                self.advance();
            }
            while !self.is_at_end() && self.current_char().is_ascii_digit() {
                number.push(self.current_char());
                self.advance();
            }
        }

        (TokenKind::Number, number)
    }

    /// Reads a string literal enclosed in single quotes. A doubled quote
    /// (`'it''s'`) stands for one quote character.
    fn read_string(&mut self) -> (TokenKind, String) {
        self.advance(); // Skip the opening quote

        let mut string = String::new();
        loop {
            if self.is_at_end() {
                return (TokenKind::Unknown, format!("'{string}"));
            }
            let ch = self.current_char();
            self.advance();
            if ch == '\'' {
                if self.peek() == Some('\'') {
                    string.push('\'');
                    self.advance();
                } else {
                    break;
                }
            } else {
                string.push(ch);
            }
        }

        (TokenKind::String, string)
    }

    /// Reads a `"quoted"` or `` `quoted` `` identifier, with doubled-quote escaping.
    fn read_quoted_identifier(&mut self, quote: char) -> (TokenKind, String) {
        self.advance();

        let mut ident = String::new();
        loop {
            if self.is_at_end() {
                return (TokenKind::Unknown, format!("{quote}{ident}"));
            }
            let ch = self.current_char();
            self.advance();
            if ch == quote {
                if self.peek() == Some(quote) {
                    ident.push(quote);
                    self.advance();
                } else {
                    break;
                }
            } else {
                ident.push(ch);
            }
        }

        (TokenKind::QuotedIdentifier, ident)
    }

    /// Reads `$1`, `:name` or `@name`. A lone marker character is unknown.
    fn read_parameter(&mut self) -> (TokenKind, String) {
        let mut marker = self.current_char().to_string();
        self.advance();

        while !self.is_at_end() && (self.current_char().is_alphanumeric() || self.current_char() == '_') {
            marker.push(self.current_char());
            self.advance();
        }

        if marker.len() == 1 {
            (TokenKind::Unknown, marker)
        } else {
            (TokenKind::Parameter, marker)
        }
    }
}
