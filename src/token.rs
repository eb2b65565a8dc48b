use std::fmt;

/// Reserved SQL keywords.
///
/// Words with meaning only in one position (`KEY`, `USER`, `SEQUENCE`,
/// `NULLS`, `CASCADE`, ...) are left as identifiers and matched by the parser
/// contextually, so they stay usable as table and column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Create,
    Drop,
    Alter,
    Truncate,
    Table,
    And,
    Or,
    Not,
    Null,
    Is,
    In,
    Between,
    Like,
    As,
    On,
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Limit,
    Offset,
    Distinct,
    All,
    Case,
    When,
    Then,
    Else,
    End,
    Cast,
    Exists,
    True,
    False,
    Primary,
    Unique,
    Default,
    References,
    Check,
    Constraint,
    Foreign,
    Grant,
    Revoke,
    To,
    Begin,
    Commit,
    Rollback,
    Savepoint,
    Describe,
    Show,
    Use,
    With,
    Union,
    Using,
}

/// Keyword table, fixed at compile time.
const KEYWORDS: &[(&str, Keyword)] = &[
    ("SELECT", Keyword::Select),
    ("FROM", Keyword::From),
    ("WHERE", Keyword::Where),
    ("INSERT", Keyword::Insert),
    ("INTO", Keyword::Into),
    ("VALUES", Keyword::Values),
    ("UPDATE", Keyword::Update),
    ("SET", Keyword::Set),
    ("DELETE", Keyword::Delete),
    ("CREATE", Keyword::Create),
    ("DROP", Keyword::Drop),
    ("ALTER", Keyword::Alter),
    ("TRUNCATE", Keyword::Truncate),
    ("TABLE", Keyword::Table),
    ("AND", Keyword::And),
    ("OR", Keyword::Or),
    ("NOT", Keyword::Not),
    ("NULL", Keyword::Null),
    ("IS", Keyword::Is),
    ("IN", Keyword::In),
    ("BETWEEN", Keyword::Between),
    ("LIKE", Keyword::Like),
    ("AS", Keyword::As),
    ("ON", Keyword::On),
    ("JOIN", Keyword::Join),
    ("INNER", Keyword::Inner),
    ("LEFT", Keyword::Left),
    ("RIGHT", Keyword::Right),
    ("FULL", Keyword::Full),
    ("OUTER", Keyword::Outer),
    ("CROSS", Keyword::Cross),
    ("GROUP", Keyword::Group),
    ("BY", Keyword::By),
    ("HAVING", Keyword::Having),
    ("ORDER", Keyword::Order),
    ("ASC", Keyword::Asc),
    ("DESC", Keyword::Desc),
    ("LIMIT", Keyword::Limit),
    ("OFFSET", Keyword::Offset),
    ("DISTINCT", Keyword::Distinct),
    ("ALL", Keyword::All),
    ("CASE", Keyword::Case),
    ("WHEN", Keyword::When),
    ("THEN", Keyword::Then),
    ("ELSE", Keyword::Else),
    ("END", Keyword::End),
    ("CAST", Keyword::Cast),
    ("EXISTS", Keyword::Exists),
    ("TRUE", Keyword::True),
    ("FALSE", Keyword::False),
    ("PRIMARY", Keyword::Primary),
    ("UNIQUE", Keyword::Unique),
    ("DEFAULT", Keyword::Default),
    ("REFERENCES", Keyword::References),
    ("CHECK", Keyword::Check),
    ("CONSTRAINT", Keyword::Constraint),
    ("FOREIGN", Keyword::Foreign),
    ("GRANT", Keyword::Grant),
    ("REVOKE", Keyword::Revoke),
    ("TO", Keyword::To),
    ("BEGIN", Keyword::Begin),
    ("COMMIT", Keyword::Commit),
    ("ROLLBACK", Keyword::Rollback),
    ("SAVEPOINT", Keyword::Savepoint),
    ("DESCRIBE", Keyword::Describe),
    ("SHOW", Keyword::Show),
    ("USE", Keyword::Use),
    ("WITH", Keyword::With),
    ("UNION", Keyword::Union),
    ("USING", Keyword::Using),
];

impl Keyword {
    /// Looks a word up in the keyword table, case-insensitively.
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(text, _)| text.eq_ignore_ascii_case(word))
            .map(|(_, keyword)| *keyword)
    }

    pub fn as_str(&self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, keyword)| keyword == self)
            .map_or("?", |(text, _)| text)
    }

    /// Keywords that can start a statement. The parser resumes at one of
    /// these after a syntax error. `SET` is left out since it also appears
    /// inside UPDATE.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            Self::Select
                | Self::Insert
                | Self::Update
                | Self::Delete
                | Self::Create
                | Self::Drop
                | Self::Alter
                | Self::Truncate
                | Self::Grant
                | Self::Revoke
                | Self::Begin
                | Self::Commit
                | Self::Rollback
                | Self::Savepoint
                | Self::Describe
                | Self::Show
                | Self::Use
                | Self::With
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier,
    /// `"name"` or `` `name` ``; the token text holds the unquoted name.
    QuotedIdentifier,
    /// `'text'`; the token text holds the unescaped content.
    String,
    /// Integer or decimal literal, text kept verbatim (`1.5e3`).
    Number,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Concat,
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Dot,
    /// `?`, `$1`, `:name` or `@name`; the text keeps the marker.
    Parameter,
    /// A character the tokenizer does not understand, or an unterminated literal.
    Unknown,
    Eof,
}

/// Represents the smallest meaningful units (atoms) of the SQL language,
/// with the position where it starts in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// Character offset from the start of the input.
    pub offset: usize,
}

impl Token {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Matches an unreserved word such as `KEY` or `NULLS`.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text.eq_ignore_ascii_case(word)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::String => write!(f, "'{}'", self.text.replace('\'', "''")),
            TokenKind::QuotedIdentifier => write!(f, "\"{}\"", self.text.replace('"', "\"\"")),
            _ => f.write_str(&self.text),
        }
    }
}
