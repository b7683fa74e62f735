use crate::token::{self, Span, Token, TokenKind};
use crate::LexerError;

/// Coi source scanner.
///
/// A single forward cursor over the source bytes with tracked line/column.
/// Whitespace and `//` comments are skipped; every other byte either starts
/// a token or is a lexer error. One byte counts as one column.
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

/// Two-byte operators, matched before single-byte punctuation.
const TWO_CHAR_OPS: &[(&[u8; 2], TokenKind)] = &[
    (b"==", TokenKind::Eq),
    (b"!=", TokenKind::Neq),
    (b"<=", TokenKind::Lte),
    (b">=", TokenKind::Gte),
    (b"+=", TokenKind::PlusAssign),
    (b"-=", TokenKind::MinusAssign),
    (b"*=", TokenKind::StarAssign),
    (b"/=", TokenKind::SlashAssign),
    (b"%=", TokenKind::PercentAssign),
    (b"++", TokenKind::PlusPlus),
    (b"--", TokenKind::MinusMinus),
    (b"&&", TokenKind::And),
    (b"||", TokenKind::Or),
    (b"=>", TokenKind::Arrow),
    (b"::", TokenKind::DoubleColon),
    (b":=", TokenKind::MoveAssign),
];

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire source into a vector of tokens ending in `Eof`.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexerError> {
        let mut scanner = Scanner::new(source);
        scanner.scan_tokens()?;
        Ok(scanner.tokens)
    }

    fn scan_tokens(&mut self) -> Result<(), LexerError> {
        loop {
            self.skip_trivia();
            if self.is_at_end() {
                break;
            }
            self.scan_token()?;
        }

        self.emit(TokenKind::Eof, 0);
        Ok(())
    }

    /// Skip whitespace and line comments.
    fn skip_trivia(&mut self) {
        loop {
            let c = self.peek();
            if c.is_ascii_whitespace() || c == 0x0b {
                self.advance();
            } else if c == b'/' && self.peek_next() == b'/' {
                while !self.is_at_end() && self.peek() != b'\n' {
                    self.advance();
                }
            } else {
                return;
            }
        }
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c = self.peek();

        match c {
            b'0'..=b'9' => return self.scan_number(),
            b'"' => return self.scan_string(),
            b'`' => return self.scan_template(),
            c if c.is_ascii_alphabetic() || c == b'_' => return self.scan_identifier(),
            _ => {}
        }

        let pair = [c, self.peek_next()];
        if let Some((_, kind)) = TWO_CHAR_OPS.iter().find(|(op, _)| **op == pair) {
            self.emit(*kind, 2);
            self.advance();
            self.advance();
            return Ok(());
        }

        let kind = match c {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'=' => TokenKind::Assign,
            b'<' => TokenKind::Lt,
            b'>' => TokenKind::Gt,
            b'!' => TokenKind::Not,
            b'?' => TokenKind::Question,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b':' => TokenKind::Colon,
            b'&' => TokenKind::Ampersand,
            // Stray punctuation (`|`, `#`, `@`, `'`) and non-ASCII text have no
            // meaning in the grammar. They only survive inside view text and
            // style blocks; the expression parser rejects them.
            c if c.is_ascii_punctuation() || !c.is_ascii() => {
                let len = self.source[self.pos..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                self.emit(TokenKind::Unknown, len);
                for _ in 0..len {
                    self.advance();
                }
                return Ok(());
            }
            _ => {
                let ch = self.source[self.pos..].chars().next().unwrap_or('\0');
                return Err(self.error(format!("Unexpected character: '{ch}'")));
            }
        };

        self.emit(kind, 1);
        self.advance();
        Ok(())
    }

    // --- Literals ---

    /// Scan a decimal, float or `0x` hex literal.
    fn scan_number(&mut self) -> Result<(), LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        let start_pos = self.pos;

        if self.peek() == b'0' && matches!(self.peek_next(), b'x' | b'X') {
            self.advance();
            self.advance();
            while self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            self.push(TokenKind::IntLiteral, start_pos, start_line, start_col);
            return Ok(());
        }

        let mut is_float = false;
        while self.peek().is_ascii_digit() || self.peek() == b'.' {
            if self.peek() == b'.' {
                if is_float {
                    break;
                }
                is_float = true;
            }
            self.advance();
        }

        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        self.push(kind, start_pos, start_line, start_col);
        Ok(())
    }

    /// Scan a double-quoted string. `\{` and `\}` stay escaped so later stages
    /// can tell literal braces from interpolation markers.
    fn scan_string(&mut self) -> Result<(), LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        let start_pos = self.pos;
        self.advance(); // opening quote

        let mut value: Vec<u8> = Vec::new();

        while !self.is_at_end() && self.peek() != b'"' {
            if self.peek() == b'\\' {
                self.advance();
                if self.is_at_end() {
                    break;
                }
                match self.peek() {
                    b'n' => value.push(b'\n'),
                    b't' => value.push(b'\t'),
                    b'\\' => value.push(b'\\'),
                    b'"' => value.push(b'"'),
                    b'{' => value.extend_from_slice(b"\\{"),
                    b'}' => value.extend_from_slice(b"\\}"),
                    other => value.push(other),
                }
            } else {
                value.push(self.peek());
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(LexerError {
                message: "Unterminated string".into(),
                line: start_line,
                column: start_col,
            });
        }

        self.advance(); // closing quote

        let span = Span::new(start_pos, self.pos, start_line, start_col);
        self.tokens
            .push(Token::new(TokenKind::StringLiteral, bytes_to_string(value), span));
        Ok(())
    }

    /// Scan a backtick template string. Content is raw except for `` \` ``.
    fn scan_template(&mut self) -> Result<(), LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        let start_pos = self.pos;
        self.advance(); // opening backtick

        let mut value: Vec<u8> = Vec::new();

        while !self.is_at_end() && self.peek() != b'`' {
            if self.peek() == b'\\' && self.peek_next() == b'`' {
                value.push(b'`');
                self.advance();
            } else {
                value.push(self.peek());
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(LexerError {
                message: "Unterminated template string".into(),
                line: start_line,
                column: start_col,
            });
        }

        self.advance(); // closing backtick

        let span = Span::new(start_pos, self.pos, start_line, start_col);
        self.tokens
            .push(Token::new(TokenKind::TemplateString, bytes_to_string(value), span));
        Ok(())
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> Result<(), LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        let start_pos = self.pos;

        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        let text = &self.source[start_pos..self.pos];
        let kind = token::keyword(text).unwrap_or(TokenKind::Identifier);
        self.push(kind, start_pos, start_line, start_col);
        Ok(())
    }

    // --- Helpers ---

    /// Push a token whose value is the source text from `start` to the cursor.
    fn push(&mut self, kind: TokenKind, start: usize, line: usize, column: usize) {
        let span = Span::new(start, self.pos, line, column);
        let text = &self.source[start..self.pos];
        self.tokens.push(Token::new(kind, text, span));
    }

    /// Push a token of `len` bytes starting at the cursor.
    fn emit(&mut self, kind: TokenKind, len: usize) {
        let end = (self.pos + len).min(self.bytes.len());
        let span = Span::new(self.pos, end, self.line, self.column);
        let text = &self.source[self.pos..end];
        self.tokens.push(Token::new(kind, text, span));
    }

    fn peek(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    fn peek_next(&self) -> u8 {
        self.bytes.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.is_at_end() {
            return;
        }
        if self.bytes[self.pos] == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn error(&self, message: String) -> LexerError {
        LexerError {
            message,
            line: self.line,
            column: self.column,
        }
    }
}

/// Escapes only ever split the buffer at ASCII bytes, so the content stays
/// valid UTF-8; fall back to lossy decoding rather than panic.
fn bytes_to_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: tokenize and return token kinds (ignoring spans).
    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    /// Helper: tokenize and panic on error.
    fn tokens(source: &str) -> Vec<Token> {
        Scanner::tokenize(source).unwrap()
    }

    /// Helper: parse an integer literal the way a base-0 strtol would.
    fn parse_int(text: &str) -> i64 {
        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).unwrap()
        } else {
            text.parse().unwrap()
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    #[test]
    fn test_empty_source() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_whitespace_only() {
        assert_eq!(kinds("  \t\r\n\n  "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_line_comment_skipped() {
        assert_eq!(
            kinds("// header\nint x; // trailing"),
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_comment_at_eof_without_newline() {
        assert_eq!(kinds("x // done"), vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    // =========================================================================
    // Keywords and identifiers
    // =========================================================================

    #[test]
    fn test_all_keywords() {
        for (word, kind) in token::KEYWORDS {
            assert_eq!(kinds(word), vec![*kind, TokenKind::Eof], "keyword {word}");
        }
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(
            kinds("components integer viewport _tick"),
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_match_is_not_reserved() {
        assert_eq!(kinds("match"), vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn test_identifier_value() {
        let toks = tokens("counter_2");
        assert_eq!(toks[0].value, "counter_2");
    }

    // =========================================================================
    // Numbers
    // =========================================================================

    #[test]
    fn test_integer() {
        let toks = tokens("42");
        assert_eq!(toks[0].kind, TokenKind::IntLiteral);
        assert_eq!(toks[0].value, "42");
    }

    #[test]
    fn test_float() {
        let toks = tokens("3.14");
        assert_eq!(toks[0].kind, TokenKind::FloatLiteral);
        assert_eq!(toks[0].value, "3.14");
    }

    #[test]
    fn test_second_dot_terminates_number() {
        assert_eq!(
            kinds("1.2.3"),
            vec![
                TokenKind::FloatLiteral,
                TokenKind::Dot,
                TokenKind::IntLiteral,
                TokenKind::Eof
            ]
        );
        assert_eq!(tokens("1.2.3")[0].value, "1.2");
    }

    #[test]
    fn test_hex_literals() {
        for (text, expected) in [("0xFF", 255), ("0xff", 255), ("0x0", 0), ("0X1a", 26)] {
            let toks = tokens(text);
            assert_eq!(toks[0].kind, TokenKind::IntLiteral);
            assert_eq!(toks[0].value, text);
            assert_eq!(parse_int(&toks[0].value), expected);
        }
    }

    #[test]
    fn test_range_is_not_float() {
        assert_eq!(
            kinds("0:10"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::Colon,
                TokenKind::IntLiteral,
                TokenKind::Eof
            ]
        );
    }

    // =========================================================================
    // Strings
    // =========================================================================

    #[test]
    fn test_string_literal() {
        let toks = tokens(r#""hello world""#);
        assert_eq!(toks[0].kind, TokenKind::StringLiteral);
        assert_eq!(toks[0].value, "hello world");
    }

    #[test]
    fn test_string_escapes() {
        let toks = tokens(r#""a\nb\tc\\d\"e""#);
        assert_eq!(toks[0].value, "a\nb\tc\\d\"e");
    }

    #[test]
    fn test_string_escaped_braces_kept() {
        let toks = tokens(r#""\{name\}""#);
        assert_eq!(toks[0].value, "\\{name\\}");
    }

    #[test]
    fn test_string_unknown_escape_yields_char() {
        let toks = tokens(r#""\q""#);
        assert_eq!(toks[0].value, "q");
    }

    #[test]
    fn test_string_utf8_content() {
        let toks = tokens("\"héllo ✓\"");
        assert_eq!(toks[0].value, "héllo ✓");
    }

    #[test]
    fn test_string_unterminated() {
        let err = Scanner::tokenize("\"abc").unwrap_err();
        assert_eq!(err.message, "Unterminated string");
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn test_template_string_raw() {
        let toks = tokens(r"`a\n{b}\`c`");
        assert_eq!(toks[0].kind, TokenKind::TemplateString);
        assert_eq!(toks[0].value, r"a\n{b}`c");
    }

    #[test]
    fn test_template_unterminated() {
        let err = Scanner::tokenize("`abc").unwrap_err();
        assert_eq!(err.message, "Unterminated template string");
    }

    // =========================================================================
    // Operators and punctuation
    // =========================================================================

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("== != <= >= += -= *= /= %= ++ -- && || => :: :="),
            vec![
                TokenKind::Eq,
                TokenKind::Neq,
                TokenKind::Lte,
                TokenKind::Gte,
                TokenKind::PlusAssign,
                TokenKind::MinusAssign,
                TokenKind::StarAssign,
                TokenKind::SlashAssign,
                TokenKind::PercentAssign,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Arrow,
                TokenKind::DoubleColon,
                TokenKind::MoveAssign,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_single_char_tokens() {
        assert_eq!(
            kinds("+ - * / % = < > ! ? ( ) { } [ ] ; , . : &"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Assign,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Not,
                TokenKind::Question,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Colon,
                TokenKind::Ampersand,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_self_closing_tag_tokens() {
        assert_eq!(
            kinds("</div>"),
            vec![
                TokenKind::Lt,
                TokenKind::Slash,
                TokenKind::Identifier,
                TokenKind::Gt,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_lone_pipe_is_unknown() {
        let toks = tokens("a | b");
        assert_eq!(toks[1].kind, TokenKind::Unknown);
        assert_eq!(toks[1].value, "|");
    }

    #[test]
    fn test_unexpected_character() {
        let err = Scanner::tokenize("int x = \u{1};").unwrap_err();
        assert_eq!(err.message, "Unexpected character: '\u{1}'");
        assert_eq!((err.line, err.column), (1, 9));
    }

    #[test]
    fn test_stray_punctuation_and_unicode_are_unknown() {
        let toks = tokens("#fff @media caf\u{e9}");
        assert_eq!(toks[0].kind, TokenKind::Unknown);
        assert_eq!(toks[0].value, "#");
        assert_eq!(toks[2].value, "@");
        assert_eq!(toks[3].value, "media");
        let last = &toks[toks.len() - 2];
        assert_eq!(last.kind, TokenKind::Unknown);
        assert_eq!(last.value, "\u{e9}");
        assert_eq!(last.span.end - last.span.start, 2);
    }

    // =========================================================================
    // Positions
    // =========================================================================

    #[test]
    fn test_span_line_column() {
        let toks = tokens("int a;\n  a += 1;");
        assert_eq!((toks[0].span.line, toks[0].span.column), (1, 1));
        assert_eq!((toks[1].span.line, toks[1].span.column), (1, 5));
        assert_eq!((toks[3].span.line, toks[3].span.column), (2, 3));
        assert_eq!((toks[4].span.line, toks[4].span.column), (2, 5));
        assert_eq!(toks[4].value, "+=");
    }

    #[test]
    fn test_positions_monotonic() {
        let toks = tokens("component A {\n view { <div>{x}</div> }\n}\n");
        for pair in toks.windows(2) {
            let a = (pair[0].span.line, pair[0].span.column);
            let b = (pair[1].span.line, pair[1].span.column);
            assert!(a <= b, "{a:?} > {b:?}");
        }
    }

    #[test]
    fn test_multiline_string_advances_line() {
        let toks = tokens("\"a\nb\" x");
        assert_eq!(toks[1].span.line, 2);
    }

    // =========================================================================
    // Round trip
    // =========================================================================

    #[test]
    fn test_round_trip_non_literal_tokens() {
        let source = "component Foo { mut int x ; def f ( ) : void { x += 1 ; a :: b := c => d } }";
        let original = tokens(source);
        let joined = original
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let relexed: Vec<TokenKind> = kinds(&joined);
        let expected: Vec<TokenKind> = original.into_iter().map(|t| t.kind).collect();
        assert_eq!(relexed, expected);
    }

    #[test]
    fn test_counter_component() {
        let source = r#"component Counter {
    mut int count = 0;
    def inc() : void { count++; }
    view { <button onclick={inc}>"+"</button> }
}"#;
        let toks = tokens(source);
        assert_eq!(toks[0].kind, TokenKind::Component);
        assert_eq!(toks[1].value, "Counter");
        assert!(toks.iter().any(|t| t.kind == TokenKind::PlusPlus));
        assert_eq!(toks.last().map(|t| t.kind), Some(TokenKind::Eof));
    }
}
