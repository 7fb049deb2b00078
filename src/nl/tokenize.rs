//! Tokenizer: raw input → typed tokens.
//!
//! Words, numbers, punctuation and quoted spans are told apart by their
//! first character. Quoted spans are kept verbatim. Contractions keep their
//! surface token and carry the expanded words as metadata. A compound verb
//! in command position ("pick up", "look at") is merged greedily, longest
//! form first, into one token.
//!
//! Never fails: anything unrecognized becomes an `Unknown` token.

use serde::{Deserialize, Serialize};

use crate::nl::lexicon::Lexicon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Word,
    Number,
    Punctuation,
    Quoted,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Surface text. For quoted spans, the text between the quotes.
    pub text: String,
    /// Byte offset into the source string.
    pub offset: usize,
    /// Byte length in the source string, quotes included.
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expansion: Option<Vec<String>>,
    #[serde(default)]
    pub is_compound: bool,
}

impl Token {
    fn new(kind: TokenKind, text: &str, offset: usize, length: usize) -> Self {
        Self {
            kind,
            text: text.to_string(),
            offset,
            length,
            expansion: None,
            is_compound: false,
        }
    }

    pub fn lower(&self) -> String {
        self.text.to_lowercase()
    }

    pub fn span(&self) -> (usize, usize) {
        (self.offset, self.offset + self.length)
    }
}

const PUNCTUATION: &[char] = &[',', '.', ';', ':', '!', '?'];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '-' || c == '\u{2019}'
}

/// Split `input` into tokens.
pub fn tokenize(input: &str, lexicon: &Lexicon) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' {
            chars.next();
            let mut end = input.len();
            let mut closed = false;
            for (i, ch) in chars.by_ref() {
                if ch == '"' {
                    end = i;
                    closed = true;
                    break;
                }
            }
            let inner = &input[start + 1..end];
            let length = if closed { end + 1 - start } else { end - start };
            tokens.push(Token::new(TokenKind::Quoted, inner, start, length));
            continue;
        }

        if c.is_ascii_digit() {
            let mut end = start;
            while let Some(&(i, ch)) = chars.peek() {
                if !ch.is_ascii_digit() {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }
            tokens.push(Token::new(TokenKind::Number, &input[start..end], start, end - start));
            continue;
        }

        if c.is_alphabetic() {
            let mut end = start;
            while let Some(&(i, ch)) = chars.peek() {
                if !is_word_char(ch) {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }
            let text = input[start..end].replace('\u{2019}', "'");
            let mut token = Token::new(TokenKind::Word, &text, start, end - start);
            if let Some(expanded) = lexicon.contractions.get(&text.to_lowercase()) {
                token.expansion = Some(expanded.clone());
            }
            tokens.push(token);
            continue;
        }

        chars.next();
        let kind = if PUNCTUATION.contains(&c) {
            TokenKind::Punctuation
        } else {
            TokenKind::Unknown
        };
        tokens.push(Token::new(kind, &input[start..start + c.len_utf8()], start, c.len_utf8()));
    }

    merge_compound_verb(&mut tokens, lexicon);
    tokens
}

/// Merge a compound verb at the front of the token stream.
fn merge_compound_verb(tokens: &mut Vec<Token>, lexicon: &Lexicon) {
    let lowered: Vec<String> = tokens
        .iter()
        .take_while(|t| t.kind == TokenKind::Word)
        .map(Token::lower)
        .collect();

    let Some(compound) = lexicon
        .compounds
        .iter()
        .find(|c| c.words.len() <= lowered.len() && lowered[..c.words.len()] == c.words[..])
    else {
        return;
    };

    let n = compound.words.len();
    let first = &tokens[0];
    let last = &tokens[n - 1];
    let merged = Token {
        kind: TokenKind::Word,
        text: compound.words.join(" "),
        offset: first.offset,
        length: last.offset + last.length - first.offset,
        expansion: None,
        is_compound: true,
    };
    tokens.splice(0..n, [merged]);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
