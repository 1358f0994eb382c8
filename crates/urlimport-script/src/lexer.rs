//! Lexer for module source.
//!
//! Tokens within a line come from `logos`. Line structure (logical newlines,
//! indentation and dedentation) is layered on top line by line; lines inside
//! open brackets are joined.

use logos::Logos;
use std::ops::Range;

/// Span type for tracking source positions
pub type Span = Range<usize>;

/// Token with span information
pub type SpannedToken = (Token, Span);

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\f]+")]
pub enum Token {
    #[regex(r"#[^\n]*", allow_greedy = true)]
    Comment,

    // Keywords
    #[token("def")]
    Def,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("pass")]
    Pass,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("None")]
    NoneKw,
    #[token("import")]
    Import,
    #[token("from")]
    From,
    #[token("class")]
    Class,
    #[token("global")]
    Global,
    #[token("lambda")]
    Lambda,

    // Literals
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| unescape(lex.slice()))]
    Str(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Operators
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("//")]
    SlashSlash,
    #[token("=")]
    Equals,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // Punctuation
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
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    // Line structure, produced by `tokenize`
    Newline,
    Indent,
    Dedent,
    Eof,
}

/// Strip quotes and resolve escapes; `None` for an unknown escape.
fn unescape(slice: &str) -> Option<String> {
    let body = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            _ => return None,
        }
    }

    Some(out)
}

/// Lexing failure.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Column width of leading whitespace; tabs advance to the next multiple of 8.
fn indent_width(prefix: &str) -> usize {
    prefix.chars().fold(0, |width, ch| match ch {
        '\t' => (width / 8 + 1) * 8,
        _ => width + 1,
    })
}

/// Tokenize source into a stream ending in `Eof`, with `Newline`, `Indent`
/// and `Dedent` marking line structure.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens: Vec<SpannedToken> = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut depth: usize = 0;
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let content = line.trim_end_matches(['\n', '\r']);

        if depth == 0 {
            let stripped = content.trim_start_matches([' ', '\t', '\x0c']);
            if stripped.is_empty() || stripped.starts_with('#') {
                continue;
            }

            let prefix_len = content.len() - stripped.len();
            let width = indent_width(&content[..prefix_len]);
            let indent_span = line_start..line_start + prefix_len;
            let current = indents.last().copied().unwrap_or(0);

            if width > current {
                indents.push(width);
                tokens.push((Token::Indent, indent_span));
            } else {
                while width < indents.last().copied().unwrap_or(0) {
                    indents.pop();
                    tokens.push((Token::Dedent, indent_span.clone()));
                }
                if width != indents.last().copied().unwrap_or(0) {
                    return Err(LexError {
                        message: "unindent does not match any outer indentation level".to_string(),
                        span: indent_span,
                    });
                }
            }
        }

        for (token, span) in Token::lexer(content).spanned() {
            let span = line_start + span.start..line_start + span.end;
            match token {
                Ok(Token::Comment) => {}
                Ok(token) => {
                    match token {
                        Token::LParen | Token::LBracket => depth += 1,
                        Token::RParen | Token::RBracket => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    tokens.push((token, span));
                }
                Err(()) => {
                    return Err(LexError {
                        message: format!("invalid token '{}'", &source[span.clone()]),
                        span,
                    });
                }
            }
        }

        if depth == 0 {
            let end = line_start + content.len();
            tokens.push((Token::Newline, end..end));
        }
    }

    let end = source.len();
    if depth > 0 {
        return Err(LexError {
            message: "unexpected end of file inside brackets".to_string(),
            span: end..end,
        });
    }

    while indents.len() > 1 {
        indents.pop();
        tokens.push((Token::Dedent, end..end));
    }
    tokens.push((Token::Eof, end..end));

    Ok(tokens)
}
