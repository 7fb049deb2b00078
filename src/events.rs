//! Semantic events: the symbolic record of what a turn did.
//!
//! Actions never produce prose. They return `EventDraft`s carrying a
//! `message_id` and parameters; the engine stamps each draft with an id, a
//! logical timestamp and the transaction id of the command that caused it,
//! then appends the turn to the `EventLog`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{EntityId, TransactionId};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Event types emitted by the engine itself. Actions add their own
/// `if.event.*` types.
pub mod kinds {
    pub const ACTION_SUCCESS: &str = "action.success";
    pub const ACTION_BLOCKED: &str = "action.blocked";
    pub const COMMAND_FAILED: &str = "command.failed";
    pub const SYSTEM_ERROR: &str = "system.error";
    pub const SYSTEM_PARSER: &str = "system.parser";
    pub const SYSTEM_VALIDATION: &str = "system.validation";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The entities an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventEntities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indirect: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub others: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventData {
    pub message_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticEvent {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Logical clock, strictly increasing across the whole log.
    pub timestamp: u64,
    pub entities: EventEntities,
    pub data: EventData,
    pub transaction_id: TransactionId,
    /// 0 for an event caused directly by the command, 1 for one it implied.
    pub chain_depth: u32,
}

impl SemanticEvent {
    pub fn message_id(&self) -> &str {
        &self.data.message_id
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.data.params.get(key)
    }
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// An event before the engine stamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub event_type: String,
    pub entities: EventEntities,
    pub data: EventData,
    pub chain_depth: u32,
}

impl EventDraft {
    pub fn new(event_type: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            entities: EventEntities::default(),
            data: EventData { message_id: message_id.into(), params: BTreeMap::new() },
            chain_depth: 0,
        }
    }

    pub fn actor(mut self, id: &EntityId) -> Self {
        self.entities.actor = Some(id.clone());
        self
    }

    pub fn target(mut self, id: &EntityId) -> Self {
        self.entities.target = Some(id.clone());
        self
    }

    pub fn indirect(mut self, id: &EntityId) -> Self {
        self.entities.indirect = Some(id.clone());
        self
    }

    pub fn location(mut self, id: Option<&EntityId>) -> Self {
        self.entities.location = id.cloned();
        self
    }

    pub fn others(mut self, ids: impl IntoIterator<Item = EntityId>) -> Self {
        self.entities.others.extend(ids);
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.params.insert(key.to_string(), value.into());
        self
    }

    pub fn chained(mut self) -> Self {
        self.chain_depth += 1;
        self
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// Turn-indexed, append-only event history.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    turns: BTreeMap<u64, Vec<SemanticEvent>>,
    clock: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp drafts for `turn` under one transaction, in order.
    pub fn stamp(&mut self, turn: u64, txn: TransactionId, drafts: Vec<EventDraft>) -> Vec<SemanticEvent> {
        let already = self.turns.get(&turn).map_or(0, Vec::len);
        drafts
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                self.clock += 1;
                SemanticEvent {
                    id: EventId(format!("evt-{}-{}", turn, already + i + 1)),
                    event_type: d.event_type,
                    timestamp: self.clock,
                    entities: d.entities,
                    data: d.data,
                    transaction_id: txn,
                    chain_depth: d.chain_depth,
                }
            })
            .collect()
    }

    pub fn append(&mut self, turn: u64, events: &[SemanticEvent]) {
        self.turns.entry(turn).or_default().extend_from_slice(events);
    }

    pub fn turn(&self, turn: u64) -> &[SemanticEvent] {
        self.turns.get(&turn).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SemanticEvent> {
        self.turns.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.turns.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
