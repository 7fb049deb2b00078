//! Phrase identifier: tagged words → verb, noun and prepositional phrases.
//!
//! Greedy, left to right. The leading verb (plus any adverbs) forms the verb
//! phrase. After that a phrase runs until the next boundary: a preposition,
//! a conjunction, or the end of input. A preposition opens a prepositional
//! phrase that swallows the noun words after it. A conjunction closes the
//! current phrase and is remembered on the next one as `joined_by`.
//!
//! Example:
//!   "take the key and the lamp from the box"
//!   → Verb[take] Noun[the key] Noun[the lamp](and) Prep[from the box]

use serde::{Deserialize, Serialize};

use crate::nl::tagger::{PartOfSpeech, TaggedWord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseKind {
    Verb,
    Noun,
    Prepositional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub kind: PhraseKind,
    /// For prepositional phrases the preposition comes first.
    pub words: Vec<TaggedWord>,
    /// Byte range in the source string.
    pub span: (usize, usize),
    /// The conjunction that joined this phrase to the previous one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_by: Option<String>,
}

impl Phrase {
    fn open(kind: PhraseKind, joined_by: Option<String>) -> Self {
        Self {
            kind,
            words: Vec::new(),
            span: (0, 0),
            joined_by,
        }
    }

    fn push(&mut self, word: TaggedWord) {
        if self.words.is_empty() {
            self.span = word.span;
        } else {
            self.span.1 = word.span.1;
        }
        self.words.push(word);
    }

    /// The words after a leading preposition.
    pub fn object_words(&self) -> &[TaggedWord] {
        match self.kind {
            PhraseKind::Prepositional => self.words.get(1..).unwrap_or(&[]),
            _ => &self.words,
        }
    }

    pub fn preposition(&self) -> Option<&str> {
        match self.kind {
            PhraseKind::Prepositional => self.words.first().map(|w| w.text.as_str()),
            _ => None,
        }
    }

    /// Source text covered by this phrase.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.span.0..self.span.1).unwrap_or("")
    }
}

/// Group tagged words into phrases.
pub fn identify(words: &[TaggedWord]) -> Vec<Phrase> {
    let mut phrases: Vec<Phrase> = Vec::new();
    let mut current: Option<Phrase> = None;
    let mut pending_conjunction: Option<String> = None;
    let mut i = 0;

    // Verb phrase: the leading verb and any adverbs around it.
    if words.first().is_some_and(|w| w.pos == PartOfSpeech::Verb) {
        let mut verb = Phrase::open(PhraseKind::Verb, None);
        verb.push(words[0].clone());
        i = 1;
        while i < words.len() && words[i].pos == PartOfSpeech::Adverb {
            verb.push(words[i].clone());
            i += 1;
        }
        phrases.push(verb);
    }

    for w in &words[i..] {
        match w.pos {
            PartOfSpeech::Preposition => {
                // "out of the box": a second preposition before any object
                // is folded into the first.
                if current
                    .as_ref()
                    .is_some_and(|p| p.kind == PhraseKind::Prepositional && p.object_words().is_empty())
                {
                    continue;
                }
                close(&mut phrases, &mut current);
                let mut p = Phrase::open(PhraseKind::Prepositional, pending_conjunction.take());
                p.push(w.clone());
                current = Some(p);
            }
            PartOfSpeech::Conjunction => {
                close(&mut phrases, &mut current);
                pending_conjunction = Some(w.text.clone());
            }
            PartOfSpeech::Adverb | PartOfSpeech::Punctuation => {}
            _ => {
                let standalone = matches!(w.pos, PartOfSpeech::Pronoun | PartOfSpeech::Quoted);
                match current.as_mut() {
                    Some(p) if extends(p, standalone) => p.push(w.clone()),
                    _ => {
                        close(&mut phrases, &mut current);
                        let mut p = Phrase::open(PhraseKind::Noun, pending_conjunction.take());
                        p.push(w.clone());
                        current = Some(p);
                    }
                }
            }
        }
    }
    close(&mut phrases, &mut current);
    phrases
}

/// A pronoun or quoted span stands alone; anything else extends the open
/// phrase unless that phrase already ends in one.
fn extends(p: &Phrase, standalone: bool) -> bool {
    match p.object_words().last() {
        None => true,
        Some(last) => {
            !standalone && !matches!(last.pos, PartOfSpeech::Pronoun | PartOfSpeech::Quoted)
        }
    }
}

fn close(phrases: &mut Vec<Phrase>, current: &mut Option<Phrase>) {
    if let Some(p) = current.take() {
        phrases.push(p);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
