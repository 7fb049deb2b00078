//! Part-of-speech tagger and lemmatizer.
//!
//! Lexicon lookup first, suffix rules second. The first word of a command
//! is tried as a verb; every later word goes through the closed classes
//! and, failing those, is a noun. No statistics: the same tokens always
//! get the same tags.

use serde::{Deserialize, Serialize};

use crate::nl::lexicon::Lexicon;
use crate::nl::tokenize::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOfSpeech {
    Verb,
    Noun,
    Adjective,
    Adverb,
    Preposition,
    Article,
    Determiner,
    Quantifier,
    Pronoun,
    Conjunction,
    Number,
    Quoted,
    Punctuation,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedWord {
    pub text: String,
    pub pos: PartOfSpeech,
    pub lemma: String,
    /// Byte range in the source string.
    pub span: (usize, usize),
}

/// Tag a token sequence.
pub fn tag(tokens: &[Token], lexicon: &Lexicon) -> Vec<TaggedWord> {
    let mut out = Vec::with_capacity(tokens.len());

    for token in tokens {
        let span = token.span();
        match token.kind {
            TokenKind::Quoted => out.push(word(&token.text, PartOfSpeech::Quoted, &token.text, span)),
            TokenKind::Number => out.push(word(&token.text, PartOfSpeech::Number, &token.text, span)),
            TokenKind::Unknown => out.push(word(&token.text, PartOfSpeech::Unknown, &token.text, span)),
            TokenKind::Punctuation => {
                let pos = if lexicon.conjunctions.contains(&token.text) {
                    PartOfSpeech::Conjunction
                } else {
                    PartOfSpeech::Punctuation
                };
                out.push(word(&token.text, pos, &token.text, span));
            }
            TokenKind::Word => {
                if let Some(expanded) = &token.expansion {
                    for w in expanded {
                        let pos = tag_word(w, out.is_empty(), lexicon);
                        let lemma = lemmatize(w, pos, lexicon);
                        out.push(word(w, pos, &lemma, span));
                    }
                    continue;
                }
                let lower = token.lower();
                if token.is_compound {
                    out.push(word(&lower, PartOfSpeech::Verb, &lower, span));
                    continue;
                }
                let pos = tag_word(&lower, out.is_empty(), lexicon);
                let lemma = lemmatize(&lower, pos, lexicon);
                out.push(word(&lower, pos, &lemma, span));
            }
        }
    }

    out
}

fn word(text: &str, pos: PartOfSpeech, lemma: &str, span: (usize, usize)) -> TaggedWord {
    TaggedWord {
        text: text.to_string(),
        pos,
        lemma: lemma.to_string(),
        span,
    }
}

fn tag_word(lower: &str, command_position: bool, lexicon: &Lexicon) -> PartOfSpeech {
    if command_position
        && (lexicon.canonical_verb(lower).is_some()
            || lexicon.canonical_verb(&lemmatize(lower, PartOfSpeech::Verb, lexicon)).is_some())
    {
        return PartOfSpeech::Verb;
    }
    if lexicon.articles.contains(lower) {
        PartOfSpeech::Article
    } else if lexicon.determiners.contains(lower) || lexicon.possessives.contains(lower) {
        PartOfSpeech::Determiner
    } else if lexicon.quantifiers.contains(lower) {
        PartOfSpeech::Quantifier
    } else if lexicon.pronoun(lower).is_some() {
        PartOfSpeech::Pronoun
    } else if lexicon.conjunctions.contains(lower) || lexicon.exclusions.contains(lower) {
        PartOfSpeech::Conjunction
    } else if lexicon.prepositions.contains(lower) {
        PartOfSpeech::Preposition
    } else if lexicon.adverbs.contains(lower) {
        PartOfSpeech::Adverb
    } else if lexicon.adjectives.contains(lower) {
        PartOfSpeech::Adjective
    } else {
        PartOfSpeech::Noun
    }
}

// ---------------------------------------------------------------------------
// Lemmatization
// ---------------------------------------------------------------------------

/// Reduce an inflected word to its base form.
///
/// Verbs: "taking" → "take", "grabbed" → "grab", "opens" → "open".
/// Nouns: "boxes" → "box", "berries" → "berry", "coins" → "coin".
pub fn lemmatize(lower: &str, pos: PartOfSpeech, lexicon: &Lexicon) -> String {
    if let Some(base) = lexicon.irregular.get(lower) {
        return base.clone();
    }
    match pos {
        PartOfSpeech::Verb => lemmatize_verb(lower, lexicon),
        PartOfSpeech::Noun => lemmatize_noun(lower),
        _ => lower.to_string(),
    }
}

fn lemmatize_verb(lower: &str, lexicon: &Lexicon) -> String {
    if lexicon.canonical_verb(lower).is_some() {
        return lower.to_string();
    }
    let known = |s: &str| lexicon.canonical_verb(s).is_some();

    for suffix in ["ing", "ed"] {
        let Some(stem) = lower.strip_suffix(suffix) else {
            continue;
        };
        if stem.len() < 2 {
            continue;
        }
        if known(stem) {
            return stem.to_string();
        }
        let with_e = format!("{stem}e");
        if known(&with_e) {
            return with_e;
        }
        if let Some(undoubled) = undouble(stem) {
            if known(undoubled) {
                return undoubled.to_string();
            }
        }
    }
    for suffix in ["es", "s"] {
        if let Some(stem) = lower.strip_suffix(suffix) {
            if known(stem) {
                return stem.to_string();
            }
        }
    }
    lower.to_string()
}

/// "grabb" → "grab"
fn undouble(stem: &str) -> Option<&str> {
    let mut rev = stem.chars().rev();
    let (last, before) = (rev.next()?, rev.next()?);
    rev.next()?;
    if last == before && last.is_ascii_alphabetic() && !"aeiou".contains(last) {
        Some(&stem[..stem.len() - last.len_utf8()])
    } else {
        None
    }
}

fn lemmatize_noun(lower: &str) -> String {
    if lower.len() <= 3 || lower.ends_with("ss") || lower.ends_with("us") {
        return lower.to_string();
    }
    if let Some(stem) = lower.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["ches", "shes", "sses", "xes", "zes"] {
        if lower.ends_with(suffix) {
            return lower[..lower.len() - 2].to_string();
        }
    }
    if let Some(stem) = lower.strip_suffix('s') {
        return stem.to_string();
    }
    lower.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
