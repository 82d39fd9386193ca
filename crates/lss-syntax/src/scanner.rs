//! Scanner: source text to tokens
//!
//! One left-to-right pass with at most two characters of lookahead. Lexical
//! problems are recorded as diagnostics and scanning always continues, so the
//! parser receives a complete token stream ending in `Eof`.

use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::Arc;

use crate::diagnostic::{Diagnostic, codes};
use crate::span::SourceSpan;
use crate::token::{Token, TokenKind};

/// Scan `source` into tokens
///
/// Whitespace and comment tokens are kept only when `keep_trivia` is set.
pub fn scan(source: &str, filename: Option<&str>, keep_trivia: bool) -> (Vec<Token>, Vec<Diagnostic>) {
    Scanner::new(source, filename, keep_trivia).scan_tokens()
}

/// Scanner state for a single source text
pub struct Scanner<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    file: Option<Arc<str>>,
    keep_trivia: bool,
    /// Byte offset where the current lexeme starts
    start: usize,
    /// Byte offset one past the last consumed character
    cursor: usize,
    /// Current line, 1-based
    line: usize,
    /// Line where the current lexeme starts
    start_line: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Scanner<'a> {
    /// Create a scanner
    pub fn new(source: &'a str, filename: Option<&str>, keep_trivia: bool) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            file: filename.map(Arc::from),
            keep_trivia,
            start: 0,
            cursor: 0,
            line: 1,
            start_line: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Scan the whole source
    pub fn scan_tokens(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while let Some(&(index, _)) = self.chars.peek() {
            self.start = index;
            self.cursor = index;
            self.start_line = self.line;
            self.scan_token();
        }

        let eof = SourceSpan::new(self.file.clone(), self.source.len(), self.line, 0);
        self.tokens.push(Token::new(TokenKind::Eof, "", eof));
        (self.tokens, self.diagnostics)
    }

    fn scan_token(&mut self) {
        use TokenKind::*;

        let Some(c) = self.advance() else {
            return;
        };
        #[rustfmt::skip]
        let kind = match c {
            '(' => LeftParen,
            ')' => RightParen,
            '{' => LeftBrace,
            '}' => RightBrace,
            '[' => LeftBracket,
            ']' => RightBracket,
            ',' => Comma,
            ';' => Semicolon,
            '+' => Plus,
            '-' => Minus,
            '%' => Percent,
            '^' => Caret,
            '~' => Tilde,
            ':' => if self.match_next(':') {
                if self.match_next('$') { ColonColonDollar } else { ColonColon }
            } else { Colon },
            '.' => if self.match_next('$') { DotDollar } else { Dot },
            '*' => if self.match_next('*') { StarStar } else { Star },
            '&' => if self.match_next('&') { AmpAmp } else { Ampersand },
            '|' => if self.match_next('|') { PipePipe } else { Pipe },
            '=' => if self.match_next('=') { EqualEqual } else { Equal },
            '!' => if self.match_next('=') { BangEqual } else { Bang },
            '<' => if self.match_next('<') { ShiftLeft } else if self.match_next('=') { LessEqual } else { Less },
            '>' => if self.match_next('>') { ShiftRight } else if self.match_next('=') { GreaterEqual } else { Greater },
            '/' => if self.match_next('/') {
                self.line_comment()
            } else if self.match_next('*') {
                self.block_comment()
            } else { Slash },
            '"' => self.string(),
            c if c.is_whitespace() => self.whitespace(c),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            other => {
                self.error(codes::UNEXPECTED_CHARACTER, format!("Unexpected character '{other}'"));
                Invalid
            }
        };

        if kind.is_trivia() && !self.keep_trivia {
            return;
        }
        let text = &self.source[self.start..self.cursor];
        let span = self.lexeme_span();
        self.tokens.push(Token::new(kind, text, span));
    }

    fn whitespace(&mut self, first: char) -> TokenKind {
        if first == '\n' {
            self.line += 1;
        }
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.advance();
            if c == '\n' {
                self.line += 1;
            }
        }
        TokenKind::Whitespace
    }

    fn line_comment(&mut self) -> TokenKind {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
        TokenKind::Comment
    }

    fn block_comment(&mut self) -> TokenKind {
        loop {
            match self.advance() {
                Some('*') if self.match_next('/') => return TokenKind::Comment,
                Some('\n') => self.line += 1,
                Some(_) => {}
                None => {
                    self.error(codes::UNTERMINATED_COMMENT, "Unterminated block comment");
                    return TokenKind::Comment;
                }
            }
        }
    }

    /// String literal; the token text keeps the quotes and escapes
    fn string(&mut self) -> TokenKind {
        loop {
            match self.peek() {
                None => {
                    self.error(codes::UNTERMINATED_STRING_EOF, "Unterminated string at end of input");
                    break;
                }
                Some('\n') => {
                    self.error(codes::UNTERMINATED_STRING_LINE, "Unterminated string before end of line");
                    break;
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    if self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        TokenKind::String
    }

    fn number(&mut self) -> TokenKind {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // A '.' only continues the number when a digit follows it.
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            return TokenKind::Float;
        }
        TokenKind::Integer
    }

    fn identifier(&mut self) -> TokenKind {
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        TokenKind::keyword_or_identifier(&self.source[self.start..self.cursor])
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Option<char> {
        let (i, c) = self.chars.next()?;
        self.cursor = i + c.len_utf8();
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut it = self.chars.clone();
        it.next()?;
        it.next().map(|(_, c)| c)
    }

    fn lexeme_span(&self) -> SourceSpan {
        SourceSpan::new(
            self.file.clone(),
            self.start,
            self.start_line,
            self.cursor - self.start,
        )
    }

    fn error(&mut self, code: &'static str, message: impl Into<String>) {
        let span = self.lexeme_span();
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = scan(source, None, false);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_longest_match_operators() {
        assert_eq!(
            kinds(": :: ::$ . .$ & && * ** < << <= > >> >= = == ! !="),
            vec![
                Colon,
                ColonColon,
                ColonColonDollar,
                Dot,
                DotDollar,
                Ampersand,
                AmpAmp,
                Star,
                StarStar,
                Less,
                ShiftLeft,
                LessEqual,
                Greater,
                ShiftRight,
                GreaterEqual,
                Equal,
                EqualEqual,
                Bang,
                BangEqual,
                Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("12 1.5 3.x"), vec![Integer, Float, Integer, Dot, Identifier, Eof]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("foreach item in list length append"),
            vec![Foreach, Identifier, In, Identifier, Length, Identifier, Eof]
        );
    }

    #[test]
    fn test_string_keeps_escapes() {
        let (tokens, _) = scan(r#""a\"b""#, None, false);
        assert_eq!(tokens[0].kind, String);
        assert_eq!(tokens[0].text, r#""a\"b""#);
        assert_eq!(tokens[0].string_value(), "a\"b");
    }

    #[test]
    fn test_unterminated_string_at_newline() {
        let (tokens, diagnostics) = scan("\"abc\nx", None, false);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, codes::UNTERMINATED_STRING_LINE);
        assert_eq!(tokens[0].text, "\"abc");
        assert_eq!(tokens[1].kind, Identifier);
        assert_eq!(tokens[1].span.start_line, 2);
    }

    #[test]
    fn test_unterminated_string_at_eof() {
        let (tokens, diagnostics) = scan("\"abc", None, false);
        assert_eq!(diagnostics[0].code, codes::UNTERMINATED_STRING_EOF);
        assert_eq!(tokens[0].kind, String);
        assert_eq!(tokens.last().map(|t| t.kind), Some(Eof));
    }

    #[test]
    fn test_comments_and_lines() {
        let source = "a // one\n/* two\nthree */ b";
        let (tokens, diagnostics) = scan(source, Some("c.lss"), false);
        assert!(diagnostics.is_empty());
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].text, "b");
        assert_eq!(tokens[1].span.start_line, 3);
        assert_eq!(tokens[1].span.file.as_deref(), Some("c.lss"));
    }

    #[test]
    fn test_trivia_kept_on_request() {
        let (tokens, _) = scan("a /* c */", None, true);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![Identifier, Whitespace, Comment, Eof]);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (_, diagnostics) = scan("/* never closed", None, false);
        assert_eq!(diagnostics[0].code, codes::UNTERMINATED_COMMENT);
    }

    #[test]
    fn test_invalid_character_continues() {
        let (tokens, diagnostics) = scan("a # b", None, false);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, codes::UNEXPECTED_CHARACTER);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![Identifier, Invalid, Identifier, Eof]);
    }
}
