use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier of an entity in the world: a room, an actor, a thing.
/// String-based so story files can name entities directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Groups every event produced by one player command, including all the
/// commands a multi-object input expands into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// Which noun slot of a command an error or selection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    Direct,
    Indirect,
}

impl fmt::Display for SlotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotRole::Direct => write!(f, "direct object"),
            SlotRole::Indirect => write!(f, "indirect object"),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The input could not be turned into a structured command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty input")]
    EmptyInput,

    /// The first word is not a verb the grammar knows.
    #[error("unknown verb '{verb}'")]
    UnknownVerb { verb: String },

    /// The verb is known but the rest of the sentence fits none of its patterns.
    #[error("'{verb}' does not accept '{text}'")]
    NoPatternMatch { verb: String, text: String },

    /// "again" before any command has parsed.
    #[error("nothing to repeat")]
    NothingToRepeat,
}

impl ParseError {
    pub fn message_id(&self) -> &'static str {
        match self {
            ParseError::EmptyInput => "empty_input",
            ParseError::UnknownVerb { .. } => "unknown_verb",
            ParseError::NoPatternMatch { .. } => "no_pattern_match",
            ParseError::NothingToRepeat => "nothing_to_repeat",
        }
    }
}

/// A noun phrase could not be bound to entities in the world.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("no '{text}' here")]
    EntityNotFound { role: SlotRole, text: String },

    #[error("'{text}' could mean any of {candidates:?}")]
    Ambiguous {
        role: SlotRole,
        text: String,
        candidates: Vec<EntityId>,
    },

    /// The entity exists and is perceivable, but not at the level the action needs.
    #[error("'{text}' is perceivable but not {required}")]
    WrongScope {
        role: SlotRole,
        text: String,
        entity: EntityId,
        required: crate::scope::ScopeLevel,
    },

    #[error("action '{action}' needs a {role}")]
    NoTarget { role: SlotRole, action: String },
}

impl ResolutionError {
    pub fn message_id(&self) -> &'static str {
        match self {
            ResolutionError::EntityNotFound { .. } => "entity_not_found",
            ResolutionError::Ambiguous { .. } => "ambiguous",
            ResolutionError::WrongScope { required, .. } => match required {
                crate::scope::ScopeLevel::Carried => "not_held",
                crate::scope::ScopeLevel::Reachable => "not_reachable",
                _ => "wrong_scope",
            },
            ResolutionError::NoTarget { .. } => "no_target",
        }
    }
}

/// Failures of the world model itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("unknown entity '{0}'")]
    UnknownEntity(EntityId),

    #[error("duplicate entity '{0}'")]
    DuplicateEntity(EntityId),

    #[error("'{entity}' has no {trait_name} trait")]
    MissingTrait { entity: EntityId, trait_name: &'static str },

    #[error("moving '{entity}' into '{target}' would create a containment cycle")]
    WouldCreateCycle { entity: EntityId, target: EntityId },

    #[error("story parse error: {0}")]
    Story(String),
}

/// Programmer or configuration errors, surfaced apart from gameplay failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("no action registered for verb '{verb}'")]
    NoActionRegistered { verb: String },

    #[error("unknown action id '{0}'")]
    UnknownAction(String),

    #[error("phase contract violated: {0}")]
    ContractViolation(String),

    #[error("world error: {0}")]
    World(#[from] WorldError),
}

impl EngineError {
    pub fn message_id(&self) -> &'static str {
        match self {
            EngineError::NoActionRegistered { .. } => "no_action_registered",
            EngineError::UnknownAction(_) => "unknown_action",
            EngineError::ContractViolation(_) => "contract_violation",
            EngineError::World(_) => "world_error",
        }
    }
}

/// Anything that stops a command before an action's phases run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl CommandError {
    pub fn message_id(&self) -> &'static str {
        match self {
            CommandError::Parse(e) => e.message_id(),
            CommandError::Resolution(e) => e.message_id(),
            CommandError::Engine(e) => e.message_id(),
        }
    }

    /// Gameplay failures are narrated; engine errors are configuration bugs.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, CommandError::Engine(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
