//! Grammar analyzer: phrases → parsed commands.
//!
//! Every canonical verb registers the phrase shapes it accepts:
//!
//! ```text
//! Verb            → "look"
//! VerbObj         → "take <np>"
//! VerbPrepObj     → "listen <prep> <np>"
//! VerbObjPrepObj  → "put <np> <prep> <np>"
//! VerbText        → "say <anything>"
//! VerbDirection   → "go <direction>"
//! ```
//!
//! A sentence that is only a direction ("north", "n") parses as the verb
//! that takes a direction. Patterns are tried in registration order and the
//! first structural match wins. A direct slot made of conjuncts ("the key and the lamp") yields one
//! command per conjunct; an exclusion ("all but the lamp") attaches to the
//! slot before it instead.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::nl::lexicon::Lexicon;
use crate::nl::phrase::{Phrase, PhraseKind};
use crate::nl::tagger::{PartOfSpeech, TaggedWord};
use crate::types::ParseError;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Verb,
    VerbObj,
    VerbPrepObj,
    VerbObjPrepObj,
    VerbText,
    VerbDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarPattern {
    pub kind: PatternKind,
    /// Accepted prepositions; empty accepts any.
    #[serde(default)]
    pub prepositions: Vec<String>,
}

impl GrammarPattern {
    pub fn new(kind: PatternKind) -> Self {
        Self { kind, prepositions: Vec::new() }
    }

    pub fn with_prepositions(mut self, preps: &[&str]) -> Self {
        self.prepositions = preps.iter().map(|p| p.to_lowercase()).collect();
        self
    }

    fn accepts_preposition(&self, prep: &str) -> bool {
        self.prepositions.is_empty() || self.prepositions.iter().any(|p| p == prep)
    }
}

// ---------------------------------------------------------------------------
// Parsed commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Named,
    Pronoun,
    /// "all", "everything", "all the coins"
    All,
    /// Free text such as the argument of "say".
    Literal,
}

/// One noun phrase slot of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NounSlot {
    /// Source text of the phrase, for messages that quote the player.
    pub text: String,
    pub head: String,
    pub head_lemma: String,
    pub adjectives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub determiner: Option<String>,
    pub kind: SlotKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<NounSlot>,
    pub span: (usize, usize),
}

impl NounSlot {
    pub fn named(head: &str) -> Self {
        Self {
            text: head.to_string(),
            head: head.to_string(),
            head_lemma: head.to_string(),
            adjectives: Vec::new(),
            determiner: None,
            kind: SlotKind::Named,
            except: Vec::new(),
            span: (0, 0),
        }
    }
}

/// A structured command. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// Canonical verb.
    pub verb: String,
    pub pattern: PatternKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct: Option<NounSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indirect: Option<NounSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preposition: Option<String>,
    pub original_text: String,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Match phrases against the verb's registered patterns.
pub fn analyze(
    phrases: &[Phrase],
    source: &str,
    lexicon: &Lexicon,
) -> Result<Vec<ParsedCommand>, ParseError> {
    let Some(first) = phrases.first() else {
        return Err(ParseError::EmptyInput);
    };
    if let Some(command) = bare_direction(phrases, source, lexicon) {
        debug!(verb = %command.verb, "bare direction");
        return Ok(vec![command]);
    }
    let first_word = first.words.first().map(|w| w.text.clone()).unwrap_or_default();
    if first.kind != PhraseKind::Verb {
        return Err(ParseError::UnknownVerb { verb: first_word });
    }
    let verb_word = &first.words[0];
    let canonical = lexicon
        .canonical_verb(&verb_word.text)
        .or_else(|| lexicon.canonical_verb(&verb_word.lemma))
        .ok_or_else(|| ParseError::UnknownVerb { verb: first_word.clone() })?
        .to_string();
    let patterns = lexicon.patterns_for(&canonical);
    if patterns.is_empty() {
        return Err(ParseError::UnknownVerb { verb: first_word });
    }

    let rest = &phrases[1..];
    let rest_text = source.get(first.span.1..).unwrap_or("").trim().to_string();
    let no_match = || ParseError::NoPatternMatch { verb: canonical.clone(), text: rest_text.clone() };

    let prep_at = rest.iter().position(|p| p.kind == PhraseKind::Prepositional);
    let (directs, prep) = match prep_at {
        Some(i) => (&rest[..i], Some(&rest[i])),
        None => (rest, None),
    };
    let trailing = prep_at.map(|i| &rest[i + 1..]).unwrap_or(&[]);
    let prep_word = prep.and_then(|p| p.preposition()).map(str::to_string);
    let prep_has_object = prep.is_some_and(|p| !p.object_words().is_empty());

    let matched = patterns.iter().find(|pat| match pat.kind {
        PatternKind::Verb => rest.is_empty(),
        PatternKind::VerbObj => !directs.is_empty() && prep.is_none(),
        PatternKind::VerbPrepObj => {
            directs.is_empty()
                && trailing.is_empty()
                && prep_has_object
                && prep_word.as_deref().is_some_and(|w| pat.accepts_preposition(w))
        }
        PatternKind::VerbObjPrepObj => {
            !directs.is_empty()
                && trailing.is_empty()
                && prep_has_object
                && prep_word.as_deref().is_some_and(|w| pat.accepts_preposition(w))
        }
        PatternKind::VerbText => !rest_text.is_empty(),
        PatternKind::VerbDirection => direction_word(rest, lexicon).is_some(),
    });
    let Some(pattern) = matched else {
        return Err(no_match());
    };
    debug!(verb = %canonical, pattern = ?pattern.kind, "grammar pattern matched");

    let base = ParsedCommand {
        verb: canonical.clone(),
        pattern: pattern.kind,
        direct: None,
        indirect: None,
        preposition: None,
        original_text: source.trim().to_string(),
    };

    let commands = match pattern.kind {
        PatternKind::Verb => vec![base],
        PatternKind::VerbText => {
            let literal = rest_text.trim_matches('"').to_string();
            let slot = NounSlot {
                text: literal.clone(),
                head: literal.clone(),
                head_lemma: literal,
                kind: SlotKind::Literal,
                span: (first.span.1, source.len()),
                ..NounSlot::named("")
            };
            vec![ParsedCommand { direct: Some(slot), ..base }]
        }
        PatternKind::VerbDirection => {
            let (word, direction) = direction_word(rest, lexicon).ok_or_else(no_match)?;
            vec![ParsedCommand { direct: Some(direction_slot(word, direction)), ..base }]
        }
        PatternKind::VerbPrepObj => {
            let p = prep.ok_or_else(no_match)?;
            let slot = build_slot(p.object_words(), source, lexicon).ok_or_else(no_match)?;
            vec![ParsedCommand { direct: Some(slot), preposition: prep_word, ..base }]
        }
        PatternKind::VerbObj | PatternKind::VerbObjPrepObj => {
            let indirect = match prep {
                Some(p) => Some(build_slot(p.object_words(), source, lexicon).ok_or_else(no_match)?),
                None => None,
            };
            let slots = conjuncts(directs, source, lexicon).ok_or_else(no_match)?;
            slots
                .into_iter()
                .map(|slot| ParsedCommand {
                    direct: Some(slot),
                    indirect: indirect.clone(),
                    preposition: prep_word.clone(),
                    ..base.clone()
                })
                .collect()
        }
    };
    Ok(commands)
}

/// The single word of `phrases`, when it names a direction.
fn direction_word<'p>(phrases: &'p [Phrase], lexicon: &Lexicon) -> Option<(&'p TaggedWord, String)> {
    let mut words = phrases.iter().flat_map(|p| p.words.iter());
    let word = words.next()?;
    if words.next().is_some() {
        return None;
    }
    lexicon.direction(&word.text).map(|d| (word, d.to_string()))
}

/// A literal slot whose head is the canonical direction and whose text is
/// what the player typed.
fn direction_slot(word: &TaggedWord, direction: String) -> NounSlot {
    NounSlot {
        text: word.text.clone(),
        head: direction.clone(),
        head_lemma: direction,
        kind: SlotKind::Literal,
        span: word.span,
        ..NounSlot::named("")
    }
}

/// "north" on its own. A word that is also a verb stays a verb.
fn bare_direction(phrases: &[Phrase], source: &str, lexicon: &Lexicon) -> Option<ParsedCommand> {
    let (word, direction) = direction_word(phrases, lexicon)?;
    if lexicon.canonical_verb(&word.text).is_some() {
        return None;
    }
    let verb = lexicon.direction_verb()?;
    Some(ParsedCommand {
        verb: verb.to_string(),
        pattern: PatternKind::VerbDirection,
        direct: Some(direction_slot(word, direction)),
        indirect: None,
        preposition: None,
        original_text: source.trim().to_string(),
    })
}

/// Split a run of noun phrases into slots, folding exclusions into the
/// slot before them.
fn conjuncts(phrases: &[Phrase], source: &str, lexicon: &Lexicon) -> Option<Vec<NounSlot>> {
    let mut slots: Vec<NounSlot> = Vec::new();
    for (i, phrase) in phrases.iter().enumerate() {
        let slot = build_slot(&phrase.words, source, lexicon)?;
        let joined = phrase.joined_by.as_deref();
        if i > 0 && joined.is_none() {
            // Two noun phrases with nothing between them.
            return None;
        }
        match joined {
            Some(j) if lexicon.exclusions.contains(j) => slots.last_mut()?.except.push(slot),
            _ => slots.push(slot),
        }
    }
    if slots.is_empty() {
        None
    } else {
        Some(slots)
    }
}

fn build_slot(words: &[TaggedWord], source: &str, lexicon: &Lexicon) -> Option<NounSlot> {
    let first = words.first()?;
    let last = words.last()?;
    let span = (first.span.0, last.span.1);
    let text = source.get(span.0..span.1).unwrap_or_default().to_string();
    let determiner = words
        .iter()
        .find(|w| matches!(w.pos, PartOfSpeech::Article | PartOfSpeech::Determiner))
        .map(|w| w.text.clone());

    if let Some(q) = words.iter().find(|w| w.pos == PartOfSpeech::Quoted) {
        return Some(NounSlot {
            text: q.text.clone(),
            head: q.text.clone(),
            head_lemma: q.text.clone(),
            kind: SlotKind::Literal,
            span,
            ..NounSlot::named("")
        });
    }
    if let Some(p) = words.iter().find(|w| w.pos == PartOfSpeech::Pronoun) {
        return Some(NounSlot {
            text,
            head: p.text.clone(),
            head_lemma: p.text.clone(),
            determiner,
            kind: SlotKind::Pronoun,
            span,
            ..NounSlot::named("")
        });
    }

    let content: Vec<&TaggedWord> = words
        .iter()
        .filter(|w| {
            matches!(
                w.pos,
                PartOfSpeech::Noun | PartOfSpeech::Adjective | PartOfSpeech::Number | PartOfSpeech::Unknown
            )
        })
        .collect();
    let is_all = words.iter().any(|w| w.pos == PartOfSpeech::Quantifier && lexicon.quantifiers.contains(&w.text));

    let (head, head_lemma, adjectives) = match content.split_last() {
        Some((h, rest)) => (
            h.text.clone(),
            h.lemma.clone(),
            rest.iter().map(|w| w.text.clone()).collect(),
        ),
        None if is_all => ("all".to_string(), "all".to_string(), Vec::new()),
        None => return None,
    };

    Some(NounSlot {
        text,
        head,
        head_lemma,
        adjectives,
        determiner,
        kind: if is_all { SlotKind::All } else { SlotKind::Named },
        except: Vec::new(),
        span,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
