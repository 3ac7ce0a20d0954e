use std::iter::Peekable;
use std::str::CharIndices;

use crate::{Diagnostic, IncludeProvider, PrepperError, ResolvedIncludePath};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Directive,
    Keyword,
    Boolean,
    Integer,
    Float,
    String,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,
    Semicolon,
    Comma,
    Equals,
    Minus,
    Whitespace,
    /// Any other single punctuation character; passed through untouched.
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Token text; for strings, without the surrounding quotes.
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Directive,
    Number,
    Keyword,
    Whitespace,
    Dot,
    String,
    Punctuation,
}

fn classify(c: char) -> CharClass {
    match c {
        '#' => CharClass::Directive,
        '0'..='9' => CharClass::Number,
        'a'..='z' | 'A'..='Z' | '_' => CharClass::Keyword,
        ' ' | '\t' | '\n' => CharClass::Whitespace,
        '.' => CharClass::Dot,
        '"' => CharClass::String,
        _ => CharClass::Punctuation,
    }
}

fn punctuation_kind(c: char) -> TokenKind {
    match c {
        '{' => TokenKind::OpenCurly,
        '}' => TokenKind::CloseCurly,
        '(' => TokenKind::OpenParen,
        ')' => TokenKind::CloseParen,
        ';' => TokenKind::Semicolon,
        ',' => TokenKind::Comma,
        '=' => TokenKind::Equals,
        '-' => TokenKind::Minus,
        _ => TokenKind::Other,
    }
}

/// Splits one file into tokens, line by line. Only a missing file stops tokenization;
/// every other problem is recorded and lexing carries on.
pub struct Lexer {
    file: String,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    valid: bool,
}

impl Lexer {
    pub fn new(path: &ResolvedIncludePath, include_provider: &mut dyn IncludeProvider) -> Self {
        match include_provider.get_include(path) {
            Ok(source) => Self::from_source(&path.0, &source),
            Err(cause) => Self {
                file: path.0.clone(),
                tokens: Vec::new(),
                diagnostics: vec![Diagnostic::new(
                    path.0.clone(),
                    0,
                    PrepperError::FileNotFound {
                        file: path.0.clone(),
                        cause: cause.to_string(),
                    },
                )],
                valid: false,
            },
        }
    }

    pub fn from_source(file: &str, source: &str) -> Self {
        let mut lexer = Self {
            file: file.to_owned(),
            tokens: Vec::new(),
            diagnostics: Vec::new(),
            valid: true,
        };

        // Same splitting as `getline`: a trailing newline does not start another line.
        if !source.is_empty() {
            let source = source.strip_suffix('\n').unwrap_or(source);
            for (i, line) in source.split('\n').enumerate() {
                lexer.tokenize_line(line, i + 1);
            }
        }

        lexer
    }

    /// False only when the file could not be loaded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_parts(self) -> (Vec<Token>, Vec<Diagnostic>) {
        (self.tokens, self.diagnostics)
    }

    fn tokenize_line(&mut self, line: &str, line_number: usize) {
        let mut it = line.char_indices().peekable();

        while let Some(&(start, c)) = it.peek() {
            let token = match classify(c) {
                CharClass::Directive => {
                    it.next();
                    let end = Self::take_while(&mut it, line, |class| class == CharClass::Keyword);
                    Token::new(TokenKind::Directive, &line[start..end], line_number)
                }
                CharClass::Keyword => {
                    let end = Self::take_while(&mut it, line, |class| {
                        class == CharClass::Keyword || class == CharClass::Number
                    });
                    let text = &line[start..end];
                    let kind = if text == "true" || text == "false" {
                        TokenKind::Boolean
                    } else {
                        TokenKind::Keyword
                    };
                    Token::new(kind, text, line_number)
                }
                CharClass::Number => {
                    let mut end = Self::take_while(&mut it, line, |class| {
                        class == CharClass::Number || class == CharClass::Dot
                    });
                    if let Some(&(_, 'f')) = it.peek() {
                        it.next();
                        end += 1;
                    }
                    let text = &line[start..end];
                    let kind = if text.contains('.') {
                        TokenKind::Float
                    } else {
                        TokenKind::Integer
                    };
                    Token::new(kind, text, line_number)
                }
                CharClass::Whitespace => {
                    let end =
                        Self::take_while(&mut it, line, |class| class == CharClass::Whitespace);
                    Token::new(TokenKind::Whitespace, &line[start..end], line_number)
                }
                CharClass::String => {
                    it.next();
                    let text_start = start + 1;
                    let mut text_end = line.len();
                    let mut terminated = false;

                    for (i, c) in &mut it {
                        if c == '"' {
                            text_end = i;
                            terminated = true;
                            break;
                        }
                    }

                    if !terminated {
                        self.register_error(line_number, PrepperError::MissingClosingQuote);
                    }
                    Token::new(TokenKind::String, &line[text_start..text_end], line_number)
                }
                CharClass::Dot | CharClass::Punctuation => {
                    it.next();
                    Token::new(
                        punctuation_kind(c),
                        &line[start..start + c.len_utf8()],
                        line_number,
                    )
                }
            };

            self.tokens.push(token);
        }

        self.tokens
            .push(Token::new(TokenKind::Whitespace, "\n", line_number));
    }

    /// Consumes characters while `pred` accepts their class; returns the byte offset
    /// one past the last consumed character.
    fn take_while(
        it: &mut Peekable<CharIndices<'_>>,
        line: &str,
        pred: impl Fn(CharClass) -> bool,
    ) -> usize {
        while let Some(&(i, c)) = it.peek() {
            if !pred(classify(c)) {
                return i;
            }
            it.next();
        }
        line.len()
    }

    fn register_error(&mut self, line: usize, error: PrepperError) {
        self.diagnostics
            .push(Diagnostic::new(self.file.clone(), line, error));
    }
}
