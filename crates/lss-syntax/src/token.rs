//! Lexical tokens

use std::fmt;

use serde::Serialize;

use crate::span::SourceSpan;

/// Kind of a lexical token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(missing_docs)]
pub enum TokenKind {
    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Colon,

    // Access operators
    Dot,
    DotDollar,
    ColonColon,
    ColonColonDollar,

    // Operators
    Equal,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    Bang,
    ShiftLeft,
    ShiftRight,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AmpAmp,
    PipePipe,

    // Literals
    Integer,
    Float,
    String,
    Identifier,

    // Keywords
    Function,
    Class,
    Property,
    Global,
    Var,
    Return,
    If,
    Else,
    While,
    Do,
    Foreach,
    In,
    New,
    This,
    True,
    False,
    Nothing,

    // Builtin property keywords
    Length,
    Red,
    Green,
    Blue,
    Alpha,
    IsInt,
    IsFloat,
    IsString,
    IsObject,
    IsArray,
    ClassId,

    // Trivia and sentinels
    Whitespace,
    Comment,
    Invalid,
    Eof,
}

use TokenKind::*;

/// Keyword spellings
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("function", Function),
    ("class", Class),
    ("property", Property),
    ("global", Global),
    ("var", Var),
    ("return", Return),
    ("if", If),
    ("else", Else),
    ("while", While),
    ("do", Do),
    ("foreach", Foreach),
    ("in", In),
    ("new", New),
    ("this", This),
    ("true", True),
    ("false", False),
    ("nothing", Nothing),
    ("length", Length),
    ("red", Red),
    ("green", Green),
    ("blue", Blue),
    ("alpha", Alpha),
    ("isint", IsInt),
    ("isfloat", IsFloat),
    ("isstring", IsString),
    ("isobject", IsObject),
    ("isarray", IsArray),
    ("classid", ClassId),
];

impl TokenKind {
    /// Keyword for an identifier-shaped word, or `Identifier`
    pub fn keyword_or_identifier(word: &str) -> TokenKind {
        KEYWORDS
            .iter()
            .find(|(text, _)| *text == word)
            .map(|(_, kind)| *kind)
            .unwrap_or(Identifier)
    }

    /// Fixed spelling of punctuation, operators and keywords
    pub fn lexeme(self) -> Option<&'static str> {
        let text = match self {
            LeftParen => "(",
            RightParen => ")",
            LeftBrace => "{",
            RightBrace => "}",
            LeftBracket => "[",
            RightBracket => "]",
            Comma => ",",
            Semicolon => ";",
            Colon => ":",
            Dot => ".",
            DotDollar => ".$",
            ColonColon => "::",
            ColonColonDollar => "::$",
            Equal => "=",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            StarStar => "**",
            Ampersand => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            Bang => "!",
            ShiftLeft => "<<",
            ShiftRight => ">>",
            EqualEqual => "==",
            BangEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            AmpAmp => "&&",
            PipePipe => "||",
            Integer | Float | String | Identifier | Whitespace | Comment | Invalid | Eof => {
                return None;
            }
            keyword => {
                return KEYWORDS
                    .iter()
                    .find(|(_, kind)| *kind == keyword)
                    .map(|(text, _)| *text);
            }
        };
        Some(text)
    }

    /// Binding power of a binary operator, lowest = 1
    ///
    /// Access operators are handled at the postfix level and report `None`.
    pub fn binary_precedence(self) -> Option<u8> {
        Some(match self {
            PipePipe => 1,
            AmpAmp => 2,
            Pipe => 3,
            Caret => 4,
            Ampersand => 5,
            EqualEqual | BangEqual => 6,
            Less | LessEqual | Greater | GreaterEqual => 7,
            ShiftLeft | ShiftRight => 8,
            Plus | Minus => 9,
            Star | Slash | Percent => 10,
            StarStar => 11,
            _ => return None,
        })
    }

    /// Only `**` groups to the right
    #[inline]
    pub fn is_right_associative(self) -> bool {
        self == StarStar
    }

    /// `.`, `.$`, `::` and `::$`
    #[inline]
    pub fn is_access(self) -> bool {
        matches!(self, Dot | DotDollar | ColonColon | ColonColonDollar)
    }

    /// Keywords usable after `.` as a builtin property
    #[inline]
    pub fn is_builtin_property(self) -> bool {
        matches!(
            self,
            Length | Red | Green | Blue | Alpha | IsInt | IsFloat | IsString | IsObject | IsArray | ClassId
        )
    }

    /// Keywords that begin a statement or declaration
    #[inline]
    pub fn begins_statement(self) -> bool {
        matches!(
            self,
            Function | Class | Property | Global | Var | Return | If | While | Do | Foreach
        )
    }

    /// Whitespace and comments
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, Whitespace | Comment)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lexeme() {
            Some(text) => write!(f, "'{text}'"),
            None => match self {
                Integer => f.write_str("integer"),
                Float => f.write_str("float"),
                String => f.write_str("string"),
                Identifier => f.write_str("identifier"),
                Eof => f.write_str("end of file"),
                other => write!(f, "{other:?}"),
            },
        }
    }
}

/// A lexical token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// Token kind
    pub kind: TokenKind,
    /// Source text (string literals keep their quotes)
    pub text: std::string::String,
    /// Source location
    pub span: SourceSpan,
}

impl Token {
    /// Create a token
    pub fn new(kind: TokenKind, text: impl Into<std::string::String>, span: SourceSpan) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// Token without a source location
    pub fn synthetic(kind: TokenKind, text: impl Into<std::string::String>) -> Self {
        Self::new(kind, text, SourceSpan::default())
    }

    /// Synthetic token with the kind's fixed spelling
    pub fn of(kind: TokenKind) -> Self {
        Self::synthetic(kind, kind.lexeme().unwrap_or_default())
    }

    /// Synthetic identifier
    pub fn identifier(name: impl Into<std::string::String>) -> Self {
        Self::synthetic(Identifier, name)
    }

    /// Synthetic integer literal
    pub fn integer(value: i64) -> Self {
        Self::synthetic(Integer, value.to_string())
    }

    /// Synthetic float literal; the text always carries a fractional part
    pub fn float(value: f32) -> Self {
        let mut text = value.to_string();
        if !text.contains(['.', 'e', 'E', 'N', 'n']) {
            text.push_str(".0");
        }
        Self::synthetic(Float, text)
    }

    /// Synthetic string literal holding `value` (quoted and escaped)
    pub fn string(value: &str) -> Self {
        Self::synthetic(String, quote_string(value))
    }

    /// Value of a string literal token with quotes removed and escapes resolved
    pub fn string_value(&self) -> std::string::String {
        unquote_string(&self.text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Quote and escape a string value as LSS source text
pub fn quote_string(value: &str) -> std::string::String {
    let mut out = std::string::String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Inverse of [`quote_string`]; tolerates a missing closing quote
pub fn unquote_string(text: &str) -> std::string::String {
    let inner = text.strip_prefix('"').unwrap_or(text);
    let inner = match inner.strip_suffix('"') {
        // a trailing `\"` is an escaped quote of an unterminated literal
        Some(stripped) if !ends_with_escape(stripped) => stripped,
        _ => inner,
    };

    let mut out = std::string::String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn ends_with_escape(text: &str) -> bool {
    text.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::keyword_or_identifier("foreach"), Foreach);
        assert_eq!(TokenKind::keyword_or_identifier("classid"), ClassId);
        assert_eq!(TokenKind::keyword_or_identifier("append"), Identifier);
    }

    #[test]
    fn test_lexeme_of_keyword() {
        assert_eq!(Foreach.lexeme(), Some("foreach"));
        assert_eq!(ColonColonDollar.lexeme(), Some("::$"));
        assert_eq!(Identifier.lexeme(), None);
    }

    #[test]
    fn test_precedence_order() {
        let p = |k: TokenKind| k.binary_precedence().unwrap();
        assert!(p(PipePipe) < p(AmpAmp));
        assert!(p(Ampersand) < p(EqualEqual));
        assert!(p(ShiftLeft) < p(Plus));
        assert!(p(Star) < p(StarStar));
        assert_eq!(Dot.binary_precedence(), None);
    }

    #[test]
    fn test_string_escapes() {
        let quoted = quote_string("say \"hi\"\n");
        assert_eq!(quoted, r#""say \"hi\"\n""#);
        assert_eq!(unquote_string(&quoted), "say \"hi\"\n");
        assert_eq!(unquote_string("\"open"), "open");
        assert_eq!(unquote_string(r#""a\""#), "a\"");
    }

    #[test]
    fn test_float_token_text() {
        assert_eq!(Token::float(2.0).text, "2.0");
        assert_eq!(Token::float(1.5).text, "1.5");
        assert_eq!(Token::float(-0.25).text, "-0.25");
    }
}
