use std::fmt;

use logos::Logos;

use crate::error::{ ParseError, ParseResult };

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// A bare identifier, keyword or file name.
    Word(String),

    /// A double-quoted string, quotes stripped.
    Str(String),

    Number(f64),

    /// One of `{ } ( ) =`.
    Symbol(char),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::Word(w) => write!(f, "'{}'", w),
            TokenKind::Str(s) => write!(f, "\"{}\"", s),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Symbol(c) => write!(f, "'{}'", c),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,

    /// 1-based source line the token starts on.
    pub line: usize,
}

/// Raw scanner output. Anything that looks like a number but doesn't parse
/// as one comes out as `Error`.
#[derive(Logos, Debug, Clone, PartialEq)]
enum Raw {
    #[error]
    Error,

    #[regex(r"[ \t\r\n\f,]+", logos::skip)]
    Blank,

    #[regex(r"#[^\n]*", logos::skip)]
    Comment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_./-]*", |lex| lex.slice().to_string())]
    // Relative and absolute paths; a dot before a digit starts a number.
    #[regex(r"\.[A-Za-z_./-][A-Za-z0-9_./-]*|/[A-Za-z0-9_./-]*", |lex| lex.slice().to_string())]
    Word(String),

    #[regex(r#""[^"\n]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    Str(String),

    #[regex(r"-?\.?[0-9][0-9A-Za-z_.]*([eE][+-][0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[token("{", |_| '{')]
    #[token("}", |_| '}')]
    #[token("(", |_| '(')]
    #[token(")", |_| ')')]
    #[token("=", |_| '=')]
    Symbol(char),
}

/// Splits scene text into tokens.
///
/// Commas count as whitespace and `#` comments run to the end of the line.
/// The lexer is a plain iterator; errors end the stream after being
/// yielded once.
pub struct Lexer<'a> {
    raw: logos::Lexer<'a, Raw>,
    text: &'a str,

    /// Line number at byte offset `seen`.
    line: usize,
    seen: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Lexer<'a> {
        Lexer { raw: Raw::lexer(text), text, line: 1, seen: 0, failed: false }
    }

    /// Advances the line count to byte offset `at`.
    fn line_at(&mut self, at: usize) -> usize {
        self.line += self.text[self.seen..at].matches('\n').count();
        self.seen = at;
        self.line
    }

    fn error(slice: &str, line: usize) -> ParseError {
        let message = match slice.chars().next() {
            Some('"') => "unterminated string".to_string(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '.' =>
                format!("malformed numeric literal '{}'", slice),
            Some(c) => format!("unexpected character '{}'", c),
            None => "unexpected input".to_string(),
        };

        ParseError::syntax(line, message)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = ParseResult<Token>;

    fn next(&mut self) -> Option<ParseResult<Token>> {
        if self.failed {
            return None;
        }

        let raw = self.raw.next()?;
        let line = self.line_at(self.raw.span().start);

        let kind = match raw {
            Raw::Word(w) => TokenKind::Word(w),
            Raw::Str(s) => TokenKind::Str(s),
            Raw::Number(x) => TokenKind::Number(x),
            Raw::Symbol(c) => TokenKind::Symbol(c),
            Raw::Error | Raw::Blank | Raw::Comment => {
                self.failed = true;
                return Some(Err(Lexer::error(self.raw.slice(), line)));
            },
        };

        Some(Ok(Token { kind, line }))
    }
}

#[cfg(test)]
fn kinds(text: &str) -> Vec<TokenKind> {
    Lexer::new(text).map(|t| t.unwrap().kind).collect()
}

#[test]
fn symbols_words_and_numbers() {
    let k = kinds("sphere { ka = (1, 0.5, -2) }");

    assert_eq!(k, vec![
        TokenKind::Word("sphere".to_string()),
        TokenKind::Symbol('{'),
        TokenKind::Word("ka".to_string()),
        TokenKind::Symbol('='),
        TokenKind::Symbol('('),
        TokenKind::Number(1.0),
        TokenKind::Number(0.5),
        TokenKind::Number(-2.0),
        TokenKind::Symbol(')'),
        TokenKind::Symbol('}'),
    ]);
}

#[test]
fn comments_and_line_numbers() {
    let tokens: Vec<Token> = Lexer::new("# header\npush { }\n\n  # note\npop {}")
        .map(|t| t.unwrap())
        .collect();

    assert_eq!(tokens[0], Token { kind: TokenKind::Word("push".to_string()), line: 2 });
    assert_eq!(tokens[3].line, 5);
    assert_eq!(tokens.len(), 6);
}

#[test]
fn file_names_are_single_words() {
    assert_eq!(kinds("tex/wood_2.ppm"), vec![TokenKind::Word("tex/wood_2.ppm".to_string())]);
    assert_eq!(kinds("\"my file.png\""), vec![TokenKind::Str("my file.png".to_string())]);
}

#[test]
fn relative_and_absolute_paths_are_words() {
    assert_eq!(kinds("./wood.ppm ../tex/wood.ppm /srv/tex/wood.ppm .5"), vec![
        TokenKind::Word("./wood.ppm".to_string()),
        TokenKind::Word("../tex/wood.ppm".to_string()),
        TokenKind::Word("/srv/tex/wood.ppm".to_string()),
        TokenKind::Number(0.5),
    ]);
}

#[test]
fn exponents_and_fractions() {
    assert_eq!(kinds("1e3 .5 -0.25 2.5E-1"), vec![
        TokenKind::Number(1000.0),
        TokenKind::Number(0.5),
        TokenKind::Number(-0.25),
        TokenKind::Number(0.25),
    ]);
}

#[test]
fn malformed_numbers() {
    for bad in &["1.2.3", "12abc", "-", "3x"] {
        let first = Lexer::new(bad).next().unwrap();
        assert!(first.is_err(), "{} should not lex", bad);
    }
}

#[test]
fn stray_character_stops_the_stream() {
    let mut lx = Lexer::new("box\n{ @ }");
    assert!(lx.next().unwrap().is_ok());
    assert!(lx.next().unwrap().is_ok());

    let err = lx.next().unwrap().unwrap_err();
    assert_eq!(err.line(), Some(2));
    assert!(lx.next().is_none());
}
