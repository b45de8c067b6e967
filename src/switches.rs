//! Switch extraction: quote-aware tokenization of a command line
//!
//! A raw argument line is split into positional words and switch tokens.
//! A switch is a `-name` or `-name=value` token appearing outside quotes;
//! values may be wrapped in matching `"`, `'` or `` ` `` quotes with
//! backslash-escaped delimiters inside. The tokenizer is deliberately
//! lenient: an unmatched quote passes the remaining substring through
//! literally instead of erroring.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::char as nchar,
    combinator::{opt, recognize},
    sequence::{preceded, tuple},
    IResult,
};

/// Result of tokenizing a line: positional words and switch tokens, each
/// in the order they appeared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    pub positional: Vec<String>,
    pub switches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum RawToken {
    Word(String),
    Switch(String),
}

const QUOTES: [char; 3] = ['"', '\'', '`'];

fn is_quote(c: char) -> bool {
    QUOTES.contains(&c)
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && c != '=' && !is_quote(c)
}

/// Remove backslash escapes of the given delimiter (and of the backslash
/// itself) from quoted content.
fn unescape(content: &str, delim: char) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&next) if next == delim || next == '\\' => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Scan a quoted region starting at `input[0]`, returning the byte length
/// of the region including both delimiters, or None if unterminated.
fn quoted_span(input: &str) -> Option<usize> {
    let mut chars = input.char_indices();
    let (_, delim) = chars.next()?;
    if !is_quote(delim) {
        return None;
    }
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delim {
            return Some(i + c.len_utf8());
        }
    }
    None
}

/// Parse a quoted positional word, yielding its unescaped content.
fn quoted_word(input: &str) -> IResult<&str, RawToken> {
    match quoted_span(input) {
        Some(len) => {
            let delim = input.chars().next().unwrap_or('"');
            let inner = &input[1..len - 1];
            Ok((&input[len..], RawToken::Word(unescape(inner, delim))))
        }
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        ))),
    }
}

/// Recognize a quoted switch value, keeping the raw text (quotes included).
fn quoted_value_raw(input: &str) -> IResult<&str, &str> {
    match quoted_span(input) {
        Some(len) => Ok((&input[len..], &input[..len])),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        ))),
    }
}

/// A switch value: quoted, or a bare run up to whitespace (possibly empty).
fn switch_value_raw(input: &str) -> IResult<&str, &str> {
    alt((quoted_value_raw, take_while(|c: char| !c.is_whitespace())))(input)
}

/// Parse a `-name` or `-name=value` switch token, keeping its raw text.
fn switch_token(input: &str) -> IResult<&str, RawToken> {
    let (rest, raw) = recognize(tuple((
        nchar('-'),
        take_while1(is_name_char),
        opt(preceded(nchar('='), switch_value_raw)),
    )))(input)?;
    Ok((rest, RawToken::Switch(raw.to_string())))
}

/// Parse a bare positional word (stops at whitespace or a quote).
fn bare_word(input: &str) -> IResult<&str, RawToken> {
    let (rest, word) = take_while1(|c: char| !c.is_whitespace() && !is_quote(c))(input)?;
    Ok((rest, RawToken::Word(word.to_string())))
}

/// Parse a single token. Quoted words win over switches so that `"-x"`
/// stays positional.
fn token(input: &str) -> IResult<&str, RawToken> {
    alt((quoted_word, switch_token, bare_word))(input)
}

/// Tokenize a raw argument line into positional words and switch tokens.
///
/// Pure and lenient: never fails. On an unmatched quote the remainder of
/// the line becomes a single literal positional token.
pub fn extract(line: &str) -> Extraction {
    let mut out = Extraction::default();
    let mut rem = line;

    loop {
        rem = rem.trim_start();
        if rem.is_empty() {
            break;
        }
        match token(rem) {
            Ok((rest, tok)) if rest.len() < rem.len() => {
                match tok {
                    RawToken::Word(w) => out.positional.push(w),
                    RawToken::Switch(s) => out.switches.push(s),
                }
                rem = rest;
            }
            // Unmatched quote (or a stalled parse): pass the rest through
            // literally as one token.
            _ => {
                out.positional.push(rem.to_string());
                break;
            }
        }
    }
    out
}

/// Name of a switch token: `-name=value` -> `name`.
pub fn switch_name(token: &str) -> &str {
    let t = token.strip_prefix('-').unwrap_or(token);
    match t.find('=') {
        Some(i) => &t[..i],
        None => t,
    }
}

/// Extracted value of a switch token, dequoted and unescaped.
/// None when the switch carries no `=value` part.
pub fn switch_value(token: &str) -> Option<String> {
    let t = token.strip_prefix('-').unwrap_or(token);
    let eq = t.find('=')?;
    Some(dequote(&t[eq + 1..]))
}

/// Strip matching enclosing quotes and resolve delimiter escapes.
pub fn dequote(raw: &str) -> String {
    if raw.len() >= 2 {
        if let Some(q) = raw.chars().next().filter(|c| is_quote(*c)) {
            if raw.ends_with(q) {
                return unescape(&raw[1..raw.len() - 1], q);
            }
        }
    }
    raw.to_string()
}

/// Split off the first whitespace-delimited token of a line.
/// Returns (token, remainder-with-leading-whitespace-trimmed).
pub fn split_first_token(line: &str) -> (&str, &str) {
    let trimmed = line.trim_start();
    match trimmed.find(char::is_whitespace) {
        Some(i) => (&trimmed[..i], trimmed[i..].trim_start()),
        None => (trimmed, ""),
    }
}
