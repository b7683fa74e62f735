/// A position in source text, tracking line and column for error reporting.
///
/// `start` and `end` are byte offsets; `line` and `column` are 1-based and
/// count one byte as one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// Token classification for Coi source.
///
/// The set is closed: anything the scanner cannot classify and that is not a
/// hard error becomes `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Component,
    Def,
    Return,
    Data,
    View,
    Tick,
    Init,
    Mount,
    Pub,
    Key,
    Style,
    Mut,
    Import,
    Shared,
    If,
    Else,
    For,
    In,
    Enum,
    Router,

    // Built-in type names
    Int,
    Float,
    Float32,
    String,
    Bool,
    Void,

    // Literals
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    TemplateString,
    True,
    False,

    Identifier,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    MoveAssign,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    PlusPlus,
    MinusMinus,
    And,
    Or,
    Not,
    Question,
    Arrow,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,
    DoubleColon,
    Ampersand,

    Eof,
    Unknown,
}

impl TokenKind {
    /// Built-in type keywords that may begin a declaration.
    pub fn is_builtin_type(self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::Float32
                | TokenKind::String
                | TokenKind::Bool
        )
    }

    /// Assignment operators, including the move form `:=` and compound forms.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            TokenKind::Assign
                | TokenKind::MoveAssign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::PercentAssign
        )
    }

    /// The binary operator a compound assignment expands to (`+=` → `+`).
    pub fn compound_op(self) -> Option<&'static str> {
        match self {
            TokenKind::PlusAssign => Some("+"),
            TokenKind::MinusAssign => Some("-"),
            TokenKind::StarAssign => Some("*"),
            TokenKind::SlashAssign => Some("/"),
            TokenKind::PercentAssign => Some("%"),
            _ => None,
        }
    }
}

/// A token produced by the Coi scanner.
///
/// `value` holds the source text, except for string literals where it holds
/// the unescaped content without delimiters.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            span,
        }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }
}

/// Reserved words and the kinds they lex to.
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("component", TokenKind::Component),
    ("def", TokenKind::Def),
    ("return", TokenKind::Return),
    ("data", TokenKind::Data),
    ("view", TokenKind::View),
    ("tick", TokenKind::Tick),
    ("init", TokenKind::Init),
    ("mount", TokenKind::Mount),
    ("pub", TokenKind::Pub),
    ("key", TokenKind::Key),
    ("style", TokenKind::Style),
    ("mut", TokenKind::Mut),
    ("import", TokenKind::Import),
    ("shared", TokenKind::Shared),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("for", TokenKind::For),
    ("in", TokenKind::In),
    ("int", TokenKind::Int),
    ("float", TokenKind::Float),
    ("float32", TokenKind::Float32),
    ("string", TokenKind::String),
    ("bool", TokenKind::Bool),
    ("void", TokenKind::Void),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("enum", TokenKind::Enum),
    ("router", TokenKind::Router),
];

/// Look up a reserved word.
pub fn keyword(ident: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(word, _)| *word == ident)
        .map(|(_, kind)| *kind)
}
