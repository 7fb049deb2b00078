//! The turn loop: one typed command in, one ordered event list out.
//!
//! ```text
//!   raw text ──parse──▶ ParsedCommand* ──validate──▶ ValidatedCommand*
//!                                                         │
//!            events ◀──stamp── drafts ◀──run_phases───────┘
//! ```
//!
//! A parse or resolution failure ends the turn with exactly one
//! `command.failed` event; a missing action or a broken phase contract ends
//! it with one `system.error` event. Either way the world is untouched by
//! the failing command.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::action::{run_phases, ActionRegistry, Terminal};
use crate::actions;
use crate::config::EngineConfig;
use crate::events::{kinds, EventDraft, EventLog, SemanticEvent};
use crate::nl::grammar::ParsedCommand;
use crate::nl::Parser;
use crate::resolve::Mentions;
use crate::scope::{resolve_scope, Sense};
use crate::types::{
    CommandError, EngineError, EntityId, ParseError, ResolutionError, TransactionId, WorldError,
};
use crate::validate::{Selections, ValidatedCommand, Validator};
use crate::world::World;

/// What one submitted command produced.
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub turn: u64,
    pub events: Vec<SemanticEvent>,
    /// At least one command reached its report phase.
    pub success: bool,
    /// Why the turn stopped before any action ran, if it did.
    pub error: Option<CommandError>,
}

pub struct Engine {
    world: World,
    parser: Parser,
    registry: ActionRegistry,
    config: EngineConfig,
    log: EventLog,
    mentions: BTreeMap<EntityId, Mentions>,
    turn: u64,
    next_txn: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("turn", &self.turn)
            .field("entities", &self.world.entities().count())
            .field("actions", &self.registry.ids())
            .field("events", &self.log.len())
            .finish()
    }
}

impl Engine {
    /// An engine over `world` with the standard actions and default config.
    pub fn new(world: World) -> Self {
        Self::with_config(world, EngineConfig::default())
    }

    pub fn with_config(world: World, config: EngineConfig) -> Self {
        let parser = match &config.lexicon_path {
            Some(path) => Parser::from_path(path),
            None => Parser::new(),
        };
        Self {
            world,
            parser,
            registry: actions::standard_registry(),
            config,
            log: EventLog::new(),
            mentions: BTreeMap::new(),
            turn: 0,
            next_txn: 1,
        }
    }

    /// Replace the action set wholesale.
    pub fn with_registry(mut self, registry: ActionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access between turns (story setup, background processes).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn mentions(&self, actor: &EntityId) -> Option<&Mentions> {
        self.mentions.get(actor)
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    fn next_transaction(&mut self) -> TransactionId {
        let txn = TransactionId(self.next_txn);
        self.next_txn += 1;
        txn
    }

    // ── Turns ───────────────────────────────────────────────────────────

    /// Run one player command for `actor`.
    pub fn submit_command(&mut self, actor: &EntityId, raw: &str) -> TurnResult {
        self.submit_with_selection(actor, raw, &Selections::new())
    }

    /// Run a command with entities the player already chose for slots
    /// that were ambiguous last time.
    pub fn submit_with_selection(
        &mut self,
        actor: &EntityId,
        raw: &str,
        selections: &Selections,
    ) -> TurnResult {
        self.turn += 1;
        let turn = self.turn;
        let txn = self.next_transaction();
        info!(turn, actor = %actor, input = raw, "turn started");

        let mut drafts = Vec::new();
        let outcome = self.play(actor, raw, selections, txn, &mut drafts);
        let (success, error) = match outcome {
            Ok(success) => (success, None),
            Err(err) => {
                if err.is_engine_error() {
                    warn!(turn, error = %err, "engine error");
                } else {
                    debug!(turn, error = %err, "command failed");
                }
                drafts.push(failure_event(&self.world, actor, &err));
                (false, Some(err))
            }
        };

        let events = self.log.stamp(turn, txn, drafts);
        self.log.append(turn, &events);
        info!(turn, events = events.len(), success, "turn finished");
        TurnResult { turn, events, success, error }
    }

    fn play(
        &mut self,
        actor: &EntityId,
        raw: &str,
        selections: &Selections,
        txn: TransactionId,
        drafts: &mut Vec<EventDraft>,
    ) -> Result<bool, CommandError> {
        if !self.world.is_actor(actor) {
            return Err(EngineError::World(WorldError::UnknownEntity(actor.clone())).into());
        }
        let mut mentions = self.mentions.get(actor).cloned().unwrap_or_default();

        let text = if self.parser.is_again(raw) {
            mentions.last_command.clone().ok_or(ParseError::NothingToRepeat)?
        } else {
            raw.to_string()
        };
        let parsed = self.parser.parse(&text)?;
        mentions.last_command = Some(text.clone());
        self.mentions.insert(actor.clone(), mentions.clone());
        if self.config.debug_parser_events {
            drafts.push(parser_event(actor, &text, &parsed));
        }

        let verb = parsed.first().map(|p| p.verb.clone()).unwrap_or_default();
        let action = self
            .registry
            .for_verb(&verb)
            .ok_or(EngineError::NoActionRegistered { verb })?;

        // Bind every conjunct before anything runs, so one bad conjunct
        // fails the turn without a partial mutation.
        let validator =
            Validator::new(&self.world, self.parser.lexicon(), actor, &mentions, selections);
        let mut commands: Vec<ValidatedCommand> = Vec::new();
        for p in &parsed {
            commands.extend(validator.validate(p, action, txn)?);
        }
        if self.config.debug_validation_events {
            drafts.push(validation_event(&self.world, actor, action.metadata().sense, &commands));
        }

        let mut success = false;
        let mut direct = Vec::new();
        let mut indirect = Vec::new();
        for command in &commands {
            let outcome = run_phases(action, &mut self.world, command)?;
            success |= outcome.terminal == Terminal::Reported;
            drafts.extend(outcome.events);
            direct.extend(command.direct.iter().cloned());
            indirect.extend(command.indirect.iter().cloned());
        }

        mentions.record(&self.world, &direct, &indirect);
        self.mentions.insert(actor.clone(), mentions);
        Ok(success)
    }

    /// Run an already-bound command outside the player's turn loop, for
    /// background actors. Events land in the current turn of the log.
    pub fn invoke(&mut self, command: &ValidatedCommand) -> Result<Vec<SemanticEvent>, EngineError> {
        let action = self
            .registry
            .get(&command.action_id)
            .ok_or_else(|| EngineError::UnknownAction(command.action_id.clone()))?;
        if !self.world.contains(&command.actor) {
            return Err(WorldError::UnknownEntity(command.actor.clone()).into());
        }
        let outcome = run_phases(action, &mut self.world, command)?;
        let events = self.log.stamp(self.turn, command.transaction_id, outcome.events);
        self.log.append(self.turn, &events);
        debug!(action = %command.action_id, events = events.len(), "invoked");
        Ok(events)
    }

    /// A fresh transaction id for a background command built with
    /// `ValidatedCommand::bare`.
    pub fn begin_transaction(&mut self) -> TransactionId {
        self.next_transaction()
    }
}

// ---------------------------------------------------------------------------
// Engine-side events
// ---------------------------------------------------------------------------

fn failure_event(world: &World, actor: &EntityId, err: &CommandError) -> EventDraft {
    let kind = if err.is_engine_error() { kinds::SYSTEM_ERROR } else { kinds::COMMAND_FAILED };
    let draft = EventDraft::new(kind, err.message_id())
        .actor(actor)
        .location(world.get_location(actor))
        .param("error", err.to_string());
    match err {
        CommandError::Parse(ParseError::UnknownVerb { verb }) => draft.param("verb", verb.as_str()),
        CommandError::Parse(ParseError::NoPatternMatch { verb, text }) => {
            draft.param("verb", verb.as_str()).param("text", text.as_str())
        }
        CommandError::Resolution(ResolutionError::EntityNotFound { text, .. }) => draft.param("text", text.as_str()),
        CommandError::Resolution(ResolutionError::Ambiguous { text, candidates, .. }) => draft
            .others(candidates.iter().cloned())
            .param("text", text.as_str())
            .param("candidates", candidates.iter().map(|c| world.name_of(c)).collect::<Vec<_>>()),
        CommandError::Resolution(ResolutionError::WrongScope { text, entity, required, .. }) => draft
            .target(entity)
            .param("text", text.as_str())
            .param("item", world.name_of(entity))
            .param("required", required.to_string()),
        CommandError::Resolution(ResolutionError::NoTarget { role, action }) => {
            draft.param("role", role.to_string()).param("action", action.as_str())
        }
        CommandError::Engine(EngineError::NoActionRegistered { verb }) => draft.param("verb", verb.as_str()),
        _ => draft,
    }
}

fn parser_event(actor: &EntityId, text: &str, parsed: &[ParsedCommand]) -> EventDraft {
    let structure = serde_json::to_value(parsed).unwrap_or(Value::Null);
    EventDraft::new(kinds::SYSTEM_PARSER, "parsed")
        .actor(actor)
        .param("input", text)
        .param("commands", structure)
}

fn validation_event(
    world: &World,
    actor: &EntityId,
    sense: Sense,
    commands: &[ValidatedCommand],
) -> EventDraft {
    let scope = resolve_scope(world, actor, sense);
    let level = |id: &Option<EntityId>| {
        id.as_ref()
            .and_then(|id| scope.level_of(id))
            .map(|l| l.to_string())
    };
    let bound: Vec<Value> = commands
        .iter()
        .map(|c| {
            json!({
                "action": c.action_id,
                "direct": c.direct,
                "direct_scope": level(&c.direct),
                "indirect": c.indirect,
                "indirect_scope": level(&c.indirect),
            })
        })
        .collect();
    EventDraft::new(kinds::SYSTEM_VALIDATION, "validated")
        .actor(actor)
        .param("commands", bound)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Entity, EntityKind, Trait};

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    fn engine() -> Engine {
        let mut w = World::new();
        w.add_entity(Entity::new("hall", "hall", EntityKind::Room)).unwrap();
        w.add_at(Entity::new("player", "yourself", EntityKind::Actor), &id("hall")).unwrap();
        w.add_at(Entity::new("lamp", "brass lamp", EntityKind::Thing), &id("hall")).unwrap();
        w.add_at(
            Entity::new("door", "oak door", EntityKind::Door).with_trait(Trait::Openable { open: true }),
            &id("hall"),
        )
        .unwrap();
        Engine::new(w)
    }

    #[test]
    fn test_successful_turn() {
        let mut e = engine();
        let r = e.submit_command(&id("player"), "take the lamp");
        assert!(r.success);
        assert!(r.error.is_none());
        assert_eq!(r.turn, 1);
        assert_eq!(r.events[0].event_type, "if.event.taken");
        assert!(r.events.iter().all(|ev| ev.transaction_id == r.events[0].transaction_id));
        assert_eq!(e.world().get_location(&id("lamp")), Some(&id("player")));
    }

    #[test]
    fn test_unknown_verb_is_single_failure_event() {
        let mut e = engine();
        let r = e.submit_command(&id("player"), "xyzzy");
        assert!(!r.success);
        assert_eq!(r.events.len(), 1);
        assert_eq!(r.events[0].event_type, kinds::COMMAND_FAILED);
        assert_eq!(r.events[0].message_id(), "unknown_verb");
        assert!(matches!(r.error, Some(CommandError::Parse(ParseError::UnknownVerb { .. }))));
    }

    #[test]
    fn test_non_ascii_input_fails_cleanly() {
        let mut e = engine();
        for input in ["丸ed", "丸ing the lamp", "ランプを取る"] {
            let r = e.submit_command(&id("player"), input);
            assert_eq!(r.events.len(), 1, "input: {}", input);
            assert_eq!(r.events[0].event_type, kinds::COMMAND_FAILED);
        }
    }

    #[test]
    fn test_missing_action_is_system_error() {
        let mut e = engine().with_registry(ActionRegistry::new());
        let r = e.submit_command(&id("player"), "take lamp");
        assert_eq!(r.events.len(), 1);
        assert_eq!(r.events[0].event_type, kinds::SYSTEM_ERROR);
        assert!(r.error.as_ref().is_some_and(CommandError::is_engine_error));
        assert_eq!(e.world().get_location(&id("lamp")), Some(&id("hall")));
    }

    #[test]
    fn test_pronoun_follows_previous_turn() {
        let mut e = engine();
        e.submit_command(&id("player"), "examine lamp");
        let r = e.submit_command(&id("player"), "take it");
        assert!(r.success);
        assert_eq!(e.world().get_location(&id("lamp")), Some(&id("player")));
    }

    #[test]
    fn test_it_after_put_is_the_thing_put() {
        let mut e = engine();
        e.world_mut()
            .add_at(
                Entity::new("box", "wooden box", EntityKind::Thing)
                    .with_trait(Trait::Container { transparent: false, capacity: None }),
                &id("hall"),
            )
            .unwrap();
        e.submit_command(&id("player"), "take lamp");
        assert!(e.submit_command(&id("player"), "put the lamp in the box").success);
        let r = e.submit_command(&id("player"), "take it");
        assert!(r.success, "events: {:?}", r.events);
        assert_eq!(e.world().get_location(&id("lamp")), Some(&id("player")));
    }

    #[test]
    fn test_again_repeats_last_command() {
        let mut e = engine();
        let r = e.submit_command(&id("player"), "again");
        assert_eq!(r.events[0].message_id(), "nothing_to_repeat");

        e.submit_command(&id("player"), "take lamp");
        let r = e.submit_command(&id("player"), "g");
        assert_eq!(r.events[0].event_type, kinds::ACTION_BLOCKED);
        assert_eq!(r.events[0].message_id(), "already_have");
    }

    #[test]
    fn test_debug_events() {
        let mut w = engine().world().clone();
        w.add_at(Entity::new("rock", "rock", EntityKind::Thing), &id("hall")).unwrap();
        let config = EngineConfig { debug_parser_events: true, debug_validation_events: true, ..Default::default() };
        let mut e = Engine::with_config(w, config);
        let r = e.submit_command(&id("player"), "take rock");
        assert_eq!(r.events[0].event_type, kinds::SYSTEM_PARSER);
        assert_eq!(r.events[1].event_type, kinds::SYSTEM_VALIDATION);
        assert_eq!(r.events[1].param("commands").unwrap()[0]["direct_scope"], json!("reachable"));
        assert_eq!(r.events[2].event_type, "if.event.taken");
    }

    #[test]
    fn test_unknown_actor() {
        let mut e = engine();
        let r = e.submit_command(&id("ghost"), "look");
        assert!(r.error.as_ref().is_some_and(CommandError::is_engine_error));
    }

    #[test]
    fn test_invoke_runs_bound_command() {
        let mut e = engine();
        let txn = e.begin_transaction();
        let cmd = ValidatedCommand::bare("if.action.closing", &id("player"), Some(id("door")), None, txn);
        let events = e.invoke(&cmd).unwrap();
        assert_eq!(events[0].event_type, "if.event.closed");
        assert!(!e.world().is_open(&id("door")));
        assert!(matches!(
            e.invoke(&ValidatedCommand::bare("nope", &id("player"), None, None, txn)),
            Err(EngineError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_log_keeps_every_turn() {
        let mut e = engine();
        e.submit_command(&id("player"), "look");
        e.submit_command(&id("player"), "xyzzy");
        assert_eq!(e.log().turn(1).len(), 2);
        assert_eq!(e.log().turn(2).len(), 1);
        let stamps: Vec<u64> = e.log().iter().map(|ev| ev.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }
}
