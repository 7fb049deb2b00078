//! Command lexicon.
//!
//! Loads closed word classes and the verb table from `data/nl/lexicon.yaml`.
//! The tagger asks it what a word is; the grammar asks it which phrase
//! shapes a verb accepts. Adding a verb or a synonym is a YAML edit, not a
//! code change.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use tracing::warn;

use crate::nl::grammar::{GrammarPattern, PatternKind};

// ---------------------------------------------------------------------------
// Embedded fallback
// ---------------------------------------------------------------------------

const EMBEDDED_LEXICON: &str = include_str!("../../data/nl/lexicon.yaml");

/// Where the disk copy is looked for when no path is configured.
pub const DEFAULT_LEXICON_PATH: &str = "data/nl/lexicon.yaml";

// ---------------------------------------------------------------------------
// YAML schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LexiconYaml {
    articles: Vec<String>,
    determiners: Vec<String>,
    #[serde(default)]
    possessives: Vec<String>,
    quantifiers: Vec<String>,
    #[serde(default)]
    exclusions: Vec<String>,
    prepositions: Vec<String>,
    pronouns: PronounsYaml,
    conjunctions: Vec<String>,
    #[serde(default)]
    adjectives: Vec<String>,
    #[serde(default)]
    adverbs: Vec<String>,
    #[serde(default)]
    again: Vec<String>,
    #[serde(default)]
    directions: HashMap<String, Vec<String>>,
    #[serde(default)]
    contractions: HashMap<String, String>,
    #[serde(default)]
    irregular: HashMap<String, String>,
    verbs: Vec<VerbEntry>,
}

#[derive(Debug, Deserialize)]
struct PronounsYaml {
    #[serde(default)]
    singular: Vec<String>,
    #[serde(default)]
    plural: Vec<String>,
    #[serde(default)]
    animate: Vec<String>,
    #[serde(default)]
    reflexive: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VerbEntry {
    verb: String,
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    compounds: Vec<String>,
    #[serde(default)]
    patterns: Vec<PatternEntry>,
}

#[derive(Debug, Deserialize)]
struct PatternEntry {
    shape: PatternKind,
    #[serde(default)]
    prepositions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Runtime lexicon
// ---------------------------------------------------------------------------

/// Which referent a pronoun points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PronounClass {
    /// "it"
    Singular,
    /// "them"
    Plural,
    /// "him", "her"
    Animate,
    /// "me", "myself"
    Reflexive,
}

/// A multi-word verb form and the canonical verb it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundVerb {
    pub words: Vec<String>,
    pub canonical: String,
}

/// The loaded lexicon, indexed for lookup. Cloned into each `Parser` so
/// registrations stay local to that parser.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    pub articles: HashSet<String>,
    pub determiners: HashSet<String>,
    pub possessives: HashSet<String>,
    pub quantifiers: HashSet<String>,
    pub exclusions: HashSet<String>,
    pub prepositions: HashSet<String>,
    pub pronouns: HashMap<String, PronounClass>,
    pub conjunctions: HashSet<String>,
    pub adjectives: HashSet<String>,
    pub adverbs: HashSet<String>,
    pub again: HashSet<String>,
    /// Direction word or abbreviation → canonical direction.
    pub directions: HashMap<String, String>,
    /// "don't" → ["do", "not"]
    pub contractions: HashMap<String, Vec<String>>,
    /// Irregular inflections → base form.
    pub irregular: HashMap<String, String>,
    /// Surface verb (canonical or synonym) → canonical verb.
    pub verbs: HashMap<String, String>,
    /// Compound verbs, longest first.
    pub compounds: Vec<CompoundVerb>,
    /// Canonical verb → accepted phrase shapes, in match order.
    pub patterns: HashMap<String, Vec<GrammarPattern>>,
}

impl Lexicon {
    pub fn canonical_verb(&self, word: &str) -> Option<&str> {
        self.verbs.get(&word.to_lowercase()).map(String::as_str)
    }

    pub fn patterns_for(&self, canonical: &str) -> &[GrammarPattern] {
        self.patterns.get(canonical).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pronoun(&self, word: &str) -> Option<PronounClass> {
        self.pronouns.get(word).copied()
    }

    pub fn is_again(&self, word: &str) -> bool {
        self.again.contains(&word.to_lowercase())
    }

    /// "n" → "north"
    pub fn direction(&self, word: &str) -> Option<&str> {
        self.directions.get(&word.to_lowercase()).map(String::as_str)
    }

    /// The verb a lone direction stands for: the first, alphabetically, of
    /// the verbs that take a direction.
    pub fn direction_verb(&self) -> Option<&str> {
        self.patterns
            .iter()
            .filter(|(_, pats)| pats.iter().any(|p| p.kind == PatternKind::VerbDirection))
            .map(|(verb, _)| verb.as_str())
            .min()
    }

    /// Register a compound verb form such as "hop onto". Takes effect on
    /// the next tokenize call.
    pub fn add_compound(&mut self, phrase: &str, canonical: &str) {
        let words: Vec<String> = phrase.split_whitespace().map(str::to_lowercase).collect();
        if words.len() < 2 {
            return;
        }
        self.compounds.retain(|c| c.words != words);
        self.compounds.push(CompoundVerb { words, canonical: canonical.to_lowercase() });
        self.compounds.sort_by(|a, b| b.words.len().cmp(&a.words.len()));
        self.verbs.insert(phrase.to_lowercase(), canonical.to_lowercase());
    }

    /// Register a verb with its synonyms and patterns. Patterns are appended
    /// to any the verb already has.
    pub fn add_verb(&mut self, canonical: &str, synonyms: &[&str], patterns: Vec<GrammarPattern>) {
        let canonical = canonical.to_lowercase();
        self.verbs.insert(canonical.clone(), canonical.clone());
        for syn in synonyms {
            self.verbs.insert(syn.to_lowercase(), canonical.clone());
        }
        self.patterns.entry(canonical).or_default().extend(patterns);
    }

    /// Load from `path`, falling back to the embedded copy when the file is
    /// missing or does not parse.
    pub fn load(path: &Path) -> Lexicon {
        let Ok(yaml_str) = std::fs::read_to_string(path) else {
            return embedded();
        };
        parse_lexicon(&yaml_str).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "lexicon failed to parse, using embedded copy");
            embedded()
        })
    }
}

// ---------------------------------------------------------------------------
// Singleton
// ---------------------------------------------------------------------------

static LEXICON: OnceLock<Lexicon> = OnceLock::new();

/// The shared lexicon, loaded on first call from the default path.
pub fn lexicon() -> &'static Lexicon {
    LEXICON.get_or_init(|| Lexicon::load(Path::new(DEFAULT_LEXICON_PATH)))
}

fn embedded() -> Lexicon {
    parse_lexicon(EMBEDDED_LEXICON).expect("embedded lexicon.yaml must parse")
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

pub(crate) fn parse_lexicon(yaml_str: &str) -> Result<Lexicon, String> {
    let raw: LexiconYaml =
        serde_yaml::from_str(yaml_str).map_err(|e| format!("YAML parse error: {}", e))?;

    let lower_set = |words: &[String]| -> HashSet<String> {
        words.iter().map(|w| w.to_lowercase()).collect()
    };

    let mut pronouns = HashMap::new();
    for (class, words) in [
        (PronounClass::Singular, &raw.pronouns.singular),
        (PronounClass::Plural, &raw.pronouns.plural),
        (PronounClass::Animate, &raw.pronouns.animate),
        (PronounClass::Reflexive, &raw.pronouns.reflexive),
    ] {
        for w in words {
            pronouns.insert(w.to_lowercase(), class);
        }
    }

    let contractions = raw
        .contractions
        .iter()
        .map(|(k, v)| {
            let words = v.split_whitespace().map(str::to_lowercase).collect();
            (k.to_lowercase(), words)
        })
        .collect();

    let mut directions = HashMap::new();
    for (canonical, short) in &raw.directions {
        let canonical = canonical.to_lowercase();
        for word in short {
            directions.insert(word.to_lowercase(), canonical.clone());
        }
        directions.insert(canonical.clone(), canonical);
    }

    let irregular = raw
        .irregular
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
        .collect();

    let mut lex = Lexicon {
        articles: lower_set(&raw.articles),
        determiners: lower_set(&raw.determiners),
        possessives: lower_set(&raw.possessives),
        quantifiers: lower_set(&raw.quantifiers),
        exclusions: lower_set(&raw.exclusions),
        prepositions: lower_set(&raw.prepositions),
        pronouns,
        conjunctions: lower_set(&raw.conjunctions),
        adjectives: lower_set(&raw.adjectives),
        adverbs: lower_set(&raw.adverbs),
        again: lower_set(&raw.again),
        directions,
        contractions,
        irregular,
        ..Lexicon::default()
    };

    for entry in &raw.verbs {
        if entry.patterns.is_empty() {
            return Err(format!("verb '{}' has no patterns", entry.verb));
        }
        let patterns = entry
            .patterns
            .iter()
            .map(|p| GrammarPattern {
                kind: p.shape,
                prepositions: p.prepositions.iter().map(|s| s.to_lowercase()).collect(),
            })
            .collect();
        let synonyms: Vec<&str> = entry.synonyms.iter().map(String::as_str).collect();
        lex.add_verb(&entry.verb, &synonyms, patterns);
        for compound in &entry.compounds {
            lex.add_compound(compound, &entry.verb);
        }
        // A multi-word canonical verb is also its own compound form.
        if entry.verb.contains(' ') {
            lex.add_compound(&entry.verb, &entry.verb);
        }
    }

    Ok(lex)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
