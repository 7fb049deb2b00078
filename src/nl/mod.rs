//! Command language layer.
//!
//! A deterministic pipeline that turns a typed sentence into structured
//! commands:
//!
//! 1. **Tokenizing**: words, numbers, quotes, contractions, compound verbs (`tokenize`)
//! 2. **Tagging**: part of speech and lemma per word (`tagger`)
//! 3. **Phrasing**: verb, noun and prepositional phrases (`phrase`)
//! 4. **Grammar**: per-verb patterns → `ParsedCommand`s (`grammar`)
//!
//! All four stages read one `Lexicon` (`lexicon`). A `Parser` owns its own
//! copy, so registering a verb on one parser never leaks into another.

pub mod grammar;
pub mod lexicon;
pub mod phrase;
pub mod tagger;
pub mod tokenize;

use std::path::Path;

use tracing::debug;

use crate::types::ParseError;
use grammar::{GrammarPattern, ParsedCommand};
use lexicon::Lexicon;
use tokenize::Token;

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Parser {
    lexicon: Lexicon,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// A parser over the shared lexicon.
    pub fn new() -> Self {
        Self { lexicon: lexicon::lexicon().clone() }
    }

    pub fn with_lexicon(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// A parser over the lexicon at `path`, or the embedded one.
    pub fn from_path(path: &Path) -> Self {
        Self { lexicon: Lexicon::load(path) }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Register a multi-word verb form ("hop onto" → "enter"). Applies to
    /// the next `parse` call.
    pub fn register_compound_verb(&mut self, phrase: &str, canonical: &str) {
        self.lexicon.add_compound(phrase, canonical);
    }

    pub fn register_verb(&mut self, canonical: &str, synonyms: &[&str], patterns: Vec<GrammarPattern>) {
        self.lexicon.add_verb(canonical, synonyms, patterns);
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        tokenize::tokenize(text, &self.lexicon)
    }

    /// Is `text` a request to repeat the previous command?
    pub fn is_again(&self, text: &str) -> bool {
        let trimmed = text.trim().trim_end_matches(['.', '!']);
        self.lexicon.is_again(trimmed)
    }

    /// Parse one sentence into one or more commands (more than one when
    /// the direct slot has conjuncts).
    pub fn parse(&self, text: &str) -> Result<Vec<ParsedCommand>, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }
        let tokens = self.tokenize(text);
        debug!(count = tokens.len(), "tokenized");

        let tagged = tagger::tag(&tokens, &self.lexicon);
        debug!(
            tags = ?tagged.iter().map(|w| (w.text.as_str(), w.pos)).collect::<Vec<_>>(),
            "tagged"
        );

        let phrases = phrase::identify(&tagged);
        debug!(
            phrases = ?phrases.iter().map(|p| (p.kind, p.text(text))).collect::<Vec<_>>(),
            "phrases"
        );

        let commands = grammar::analyze(&phrases, text, &self.lexicon)?;
        debug!(count = commands.len(), verb = commands.first().map(|c| c.verb.as_str()), "parsed");
        Ok(commands)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nl::grammar::PatternKind;

    #[test]
    fn test_parse_is_deterministic() {
        let p = Parser::new();
        let a = p.parse("put the brass key in the wooden box");
        let b = p.parse("put the brass key in the wooden box");
        assert_eq!(a, b);
    }

    #[test]
    fn test_blank_input_is_empty() {
        assert_eq!(Parser::new().parse("   "), Err(ParseError::EmptyInput));
    }

    #[test]
    fn test_register_verb_makes_it_known() {
        let mut p = Parser::new();
        assert!(matches!(p.parse("dance"), Err(ParseError::UnknownVerb { .. })));
        p.register_verb("dance", &["boogie"], vec![GrammarPattern::new(PatternKind::Verb)]);
        assert_eq!(p.parse("boogie").unwrap()[0].verb, "dance");
    }

    #[test]
    fn test_registration_is_local_to_parser() {
        let mut p = Parser::new();
        p.register_verb("dance", &[], vec![GrammarPattern::new(PatternKind::Verb)]);
        assert!(Parser::new().parse("dance").is_err());
    }

    #[test]
    fn test_register_compound_verb() {
        let mut p = Parser::new();
        p.register_compound_verb("snatch up", "take");
        let cmds = p.parse("snatch up the lamp").unwrap();
        assert_eq!(cmds[0].verb, "take");
        assert_eq!(cmds[0].direct.as_ref().unwrap().head, "lamp");
    }

    #[test]
    fn test_again_words() {
        let p = Parser::new();
        assert!(p.is_again("again"));
        assert!(p.is_again(" G "));
        assert!(!p.is_again("take lamp"));
    }
}
