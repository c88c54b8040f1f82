//! Tokenizer for annotation and function-header lines.
//!
//! Built on the logos lexer generator. Only the small part of the script
//! language that dependency declarations use is recognised precisely:
//! punctuation, identifiers and quoted string literals. Anything else that can
//! legally appear inside a parameter list (numbers, operators, dotted names)
//! lexes to coarse tokens so header lines can be skimmed without failing.

use std::fmt;

use logos::{Logos, Span};

/// A token with its byte span in the source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexError {
    #[default]
    UnexpectedCharacter,
    InvalidEscape(char),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedCharacter => write!(f, "unexpected character"),
            LexError::InvalidEscape(c) => write!(f, "invalid escape sequence '\\{c}'"),
        }
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\f]+")]
pub enum Token {
    #[token("@")]
    At,

    #[token("def")]
    Def,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token("=")]
    Equals,

    #[token(":")]
    Colon,

    #[token("->")]
    Arrow,

    /// Quoted string literal with escapes already processed.
    #[regex(r#""([^"\\\n]|\\.)*""#, lex_string)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, lex_string)]
    Str(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?")]
    Number,

    #[regex(r"[*./+\-|<>%&~^!{}]")]
    Punct,

    #[token("#", skip_comment)]
    Comment,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::At => write!(f, "'@'"),
            Token::Def => write!(f, "'def'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Comma => write!(f, "','"),
            Token::Equals => write!(f, "'='"),
            Token::Colon => write!(f, "':'"),
            Token::Arrow => write!(f, "'->'"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Ident(s) => write!(f, "identifier '{s}'"),
            Token::Number => write!(f, "number"),
            Token::Punct => write!(f, "operator"),
            Token::Comment => write!(f, "comment"),
        }
    }
}

fn lex_string(lex: &mut logos::Lexer<Token>) -> Result<String, LexError> {
    let slice = lex.slice();
    unescape(&slice[1..slice.len() - 1])
}

// Comments run to the end of the line; lines are lexed one at a time.
fn skip_comment(lex: &mut logos::Lexer<Token>) -> logos::Skip {
    lex.bump(lex.remainder().len());
    logos::Skip
}

fn unescape(body: &str) -> Result<String, LexError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => return Err(LexError::InvalidEscape(other)),
            None => return Err(LexError::UnexpectedCharacter),
        }
    }

    Ok(out)
}

/// Tokenize a whole line, failing on the first lexical error.
pub fn tokenize(line: &str) -> Result<Vec<Spanned<Token>>, Spanned<LexError>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(line).spanned() {
        match result {
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(err) => return Err(Spanned::new(err, span)),
        }
    }
    Ok(tokens)
}

/// Lex only the first `n` tokens of a line.
///
/// Used for function headers, whose parameter lists may contain syntax the
/// lexer does not model (type annotations, default expressions).
pub fn leading_tokens(line: &str, n: usize) -> Result<Vec<Spanned<Token>>, Spanned<LexError>> {
    let mut tokens = Vec::with_capacity(n);
    for (result, span) in Token::lexer(line).spanned().take(n) {
        match result {
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(err) => return Err(Spanned::new(err, span)),
        }
    }
    Ok(tokens)
}
