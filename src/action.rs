//! Actions and the four-phase engine that drives them.
//!
//! Every action is a small object with four phases:
//!
//! ```text
//!   validate ──valid──▶ execute ──▶ report      (terminal)
//!      │
//!      └──invalid──▶ blocked                    (terminal)
//! ```
//!
//! `validate`, `report` and `blocked` only see `&World`; `execute` is the one
//! phase handed `&mut World`. The phase run is typestate: `execute` exists
//! only on a run whose validation came back valid, and each run is consumed
//! by exactly one terminal phase.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;
use tracing::trace;

use crate::events::{kinds, EventDraft};
use crate::scope::{ScopeLevel, Sense};
use crate::types::{EngineError, EntityId, WorldError};
use crate::validate::ValidatedCommand;
use crate::world::World;

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// What an action needs in one noun slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRequirement {
    /// The slot must be empty.
    None,
    /// May be filled; when filled, the entity must be in scope at this level.
    Optional(ScopeLevel),
    /// Must be filled, in scope at this level.
    Required(ScopeLevel),
    /// Free text, never resolved to an entity.
    Text,
}

impl SlotRequirement {
    pub fn level(&self) -> Option<ScopeLevel> {
        match self {
            SlotRequirement::Optional(l) | SlotRequirement::Required(l) => Some(*l),
            _ => None,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, SlotRequirement::Required(_))
    }
}

/// Static description of an action, read by the validator before any
/// action code runs.
#[derive(Debug, Clone)]
pub struct ActionMetadata {
    pub id: String,
    /// Canonical verbs that invoke this action.
    pub verbs: Vec<String>,
    pub direct: SlotRequirement,
    pub indirect: SlotRequirement,
    /// The sense scope is computed for.
    pub sense: Sense,
}

impl ActionMetadata {
    pub fn new(id: &str, verbs: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            verbs: verbs.iter().map(|v| v.to_string()).collect(),
            direct: SlotRequirement::None,
            indirect: SlotRequirement::None,
            sense: Sense::Sight,
        }
    }

    pub fn direct(mut self, req: SlotRequirement) -> Self {
        self.direct = req;
        self
    }

    pub fn indirect(mut self, req: SlotRequirement) -> Self {
        self.indirect = req;
        self
    }

    pub fn sense(mut self, sense: Sense) -> Self {
        self.sense = sense;
        self
    }
}

// ---------------------------------------------------------------------------
// Phase values
// ---------------------------------------------------------------------------

/// Outcome of `validate`. Failure is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub valid: bool,
    /// Message id when invalid.
    pub error: Option<String>,
    pub params: BTreeMap<String, Value>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { valid: true, ..Self::default() }
    }

    pub fn fail(message_id: &str) -> Self {
        Self { valid: false, error: Some(message_id.to_string()), params: BTreeMap::new() }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// Facts `execute` hands to `report` (e.g. what it implicitly did first).
pub type Effects = BTreeMap<String, Value>;

/// Read-only view for validate, report and blocked.
pub struct ActionContext<'a> {
    pub world: &'a World,
    pub command: &'a ValidatedCommand,
}

impl<'a> ActionContext<'a> {
    pub fn actor(&self) -> &'a EntityId {
        &self.command.actor
    }

    pub fn direct(&self) -> Option<&'a EntityId> {
        self.command.direct.as_ref()
    }

    pub fn indirect(&self) -> Option<&'a EntityId> {
        self.command.indirect.as_ref()
    }

    pub fn name(&self, id: &EntityId) -> String {
        self.world.name_of(id)
    }

    /// Where the actor is standing.
    pub fn location(&self) -> Option<&'a EntityId> {
        self.world.get_location(&self.command.actor)
    }
}

/// The one mutable view, handed to `execute`.
pub struct ExecuteContext<'a> {
    pub world: &'a mut World,
    pub command: &'a ValidatedCommand,
    pub validation: &'a ValidationResult,
}

// ---------------------------------------------------------------------------
// Action trait
// ---------------------------------------------------------------------------

pub trait Action {
    fn metadata(&self) -> &ActionMetadata;

    /// Pure check. Must not mutate anything.
    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult;

    /// The sole world mutation for this command. Emits no events.
    fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError>;

    /// Success events, built from the already-mutated world.
    fn report(&self, ctx: &ActionContext<'_>, validation: &ValidationResult, effects: &Effects) -> Vec<EventDraft>;

    /// Failure events. Nothing has been mutated.
    fn blocked(&self, ctx: &ActionContext<'_>, result: &ValidationResult) -> Vec<EventDraft> {
        let message = result.error.clone().unwrap_or_else(|| "cannot_do_that".to_string());
        let mut draft = EventDraft::new(kinds::ACTION_BLOCKED, message)
            .actor(ctx.actor())
            .param("action", self.metadata().id.as_str());
        if let Some(target) = ctx.direct() {
            draft = draft.target(target).param("item", ctx.name(target));
        }
        if let Some(indirect) = ctx.indirect() {
            draft = draft.indirect(indirect).param("container", ctx.name(indirect));
        }
        for (k, v) in &result.params {
            draft = draft.param(k, v.clone());
        }
        vec![draft]
    }

    /// Does "all" cover `id` for this action? Called during expansion, so
    /// excluded entities produce no events at all.
    fn includes_in_all(&self, _world: &World, _actor: &EntityId, _id: &EntityId) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Phase run (typestate)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Reported,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub terminal: Terminal,
    pub events: Vec<EventDraft>,
}

/// A command about to be validated.
pub struct PhaseRun<'a> {
    action: &'a dyn Action,
    command: &'a ValidatedCommand,
}

pub struct ValidRun<'a> {
    action: &'a dyn Action,
    command: &'a ValidatedCommand,
    validation: ValidationResult,
}

pub struct InvalidRun<'a> {
    action: &'a dyn Action,
    command: &'a ValidatedCommand,
    validation: ValidationResult,
}

pub struct ExecutedRun<'a> {
    action: &'a dyn Action,
    command: &'a ValidatedCommand,
    validation: ValidationResult,
    effects: Effects,
}

pub enum Validated<'a> {
    Valid(ValidRun<'a>),
    Invalid(InvalidRun<'a>),
}

impl<'a> PhaseRun<'a> {
    pub fn new(action: &'a dyn Action, command: &'a ValidatedCommand) -> Self {
        Self { action, command }
    }

    pub fn validate(self, world: &World) -> Validated<'a> {
        let ctx = ActionContext { world, command: self.command };
        let validation = self.action.validate(&ctx);
        trace!(action = %self.command.action_id, valid = validation.valid, error = ?validation.error, "validate");
        if validation.valid {
            Validated::Valid(ValidRun { action: self.action, command: self.command, validation })
        } else {
            Validated::Invalid(InvalidRun { action: self.action, command: self.command, validation })
        }
    }
}

impl<'a> ValidRun<'a> {
    pub fn execute(self, world: &mut World) -> Result<ExecutedRun<'a>, EngineError> {
        let mut ctx = ExecuteContext { world, command: self.command, validation: &self.validation };
        let effects = self.action.execute(&mut ctx).map_err(|e| {
            EngineError::ContractViolation(format!(
                "'{}' failed to execute after validating: {}",
                self.command.action_id, e
            ))
        })?;
        trace!(action = %self.command.action_id, "execute");
        Ok(ExecutedRun { action: self.action, command: self.command, validation: self.validation, effects })
    }
}

impl ExecutedRun<'_> {
    pub fn report(self, world: &World) -> PhaseOutcome {
        let ctx = ActionContext { world, command: self.command };
        let events = self.action.report(&ctx, &self.validation, &self.effects);
        trace!(action = %self.command.action_id, events = events.len(), "report");
        PhaseOutcome { terminal: Terminal::Reported, events }
    }
}

impl InvalidRun<'_> {
    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn blocked(self, world: &World) -> PhaseOutcome {
        let ctx = ActionContext { world, command: self.command };
        let events = self.action.blocked(&ctx, &self.validation);
        trace!(action = %self.command.action_id, events = events.len(), "blocked");
        PhaseOutcome { terminal: Terminal::Blocked, events }
    }
}

/// Drive one command to its terminal phase.
pub fn run_phases(
    action: &dyn Action,
    world: &mut World,
    command: &ValidatedCommand,
) -> Result<PhaseOutcome, EngineError> {
    match PhaseRun::new(action, command).validate(world) {
        Validated::Valid(run) => Ok(run.execute(world)?.report(world)),
        Validated::Invalid(run) => Ok(run.blocked(world)),
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Actions keyed by id, indexed by the canonical verbs that invoke them.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Box<dyn Action>>,
    by_verb: HashMap<String, String>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.actions.keys().collect();
        ids.sort();
        f.debug_struct("ActionRegistry")
            .field("actions", &ids)
            .field("by_verb", &self.by_verb)
            .finish()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action, replacing any action with the same id and
    /// taking over its verbs.
    pub fn register(&mut self, action: Box<dyn Action>) -> &mut Self {
        let meta = action.metadata();
        let id = meta.id.clone();
        for verb in &meta.verbs {
            self.by_verb.insert(verb.clone(), id.clone());
        }
        self.actions.insert(id, action);
        self
    }

    pub fn get(&self, id: &str) -> Option<&dyn Action> {
        self.actions.get(id).map(|a| a.as_ref())
    }

    pub fn for_verb(&self, verb: &str) -> Option<&dyn Action> {
        self.by_verb.get(verb).and_then(|id| self.get(id))
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionId;
    use crate::world::{Entity, EntityKind};
    use std::cell::Cell;

    /// Moves its target into the actor when the target is not already held.
    struct Grab {
        meta: ActionMetadata,
        executed: Cell<u32>,
        reported: Cell<u32>,
        blocked: Cell<u32>,
    }

    impl Grab {
        fn new() -> Self {
            Self {
                meta: ActionMetadata::new("test.grab", &["grab"]).direct(SlotRequirement::Required(ScopeLevel::Reachable)),
                executed: Cell::new(0),
                reported: Cell::new(0),
                blocked: Cell::new(0),
            }
        }
    }

    impl Action for Grab {
        fn metadata(&self) -> &ActionMetadata {
            &self.meta
        }

        fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
            match ctx.direct() {
                Some(t) if ctx.world.get_location(t) == Some(ctx.actor()) => ValidationResult::fail("already_have"),
                Some(_) => ValidationResult::ok(),
                None => ValidationResult::fail("no_target"),
            }
        }

        fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
            self.executed.set(self.executed.get() + 1);
            if let Some(t) = &ctx.command.direct {
                ctx.world.move_entity(t, &ctx.command.actor)?;
            }
            Ok(Effects::new())
        }

        fn report(&self, ctx: &ActionContext<'_>, _v: &ValidationResult, _e: &Effects) -> Vec<EventDraft> {
            self.reported.set(self.reported.get() + 1);
            vec![EventDraft::new(kinds::ACTION_SUCCESS, "grabbed").actor(ctx.actor())]
        }

        fn blocked(&self, ctx: &ActionContext<'_>, result: &ValidationResult) -> Vec<EventDraft> {
            self.blocked.set(self.blocked.get() + 1);
            vec![EventDraft::new(kinds::ACTION_BLOCKED, result.error.clone().unwrap_or_default()).actor(ctx.actor())]
        }
    }

    fn setup() -> World {
        let mut w = World::new();
        w.add_entity(Entity::new("room", "room", EntityKind::Room)).unwrap();
        w.add_at(Entity::new("me", "me", EntityKind::Actor), &"room".into()).unwrap();
        w.add_at(Entity::new("rock", "rock", EntityKind::Thing), &"room".into()).unwrap();
        w
    }

    fn command(direct: &str) -> ValidatedCommand {
        ValidatedCommand::bare("test.grab", &"me".into(), Some(direct.into()), None, TransactionId(1))
    }

    #[test]
    fn test_valid_command_executes_then_reports() {
        let mut w = setup();
        let grab = Grab::new();
        let out = run_phases(&grab, &mut w, &command("rock")).unwrap();
        assert_eq!(out.terminal, Terminal::Reported);
        assert_eq!(w.get_location(&"rock".into()), Some(&EntityId::new("me")));
        assert_eq!((grab.executed.get(), grab.reported.get(), grab.blocked.get()), (1, 1, 0));
    }

    #[test]
    fn test_invalid_command_only_blocks() {
        let mut w = setup();
        w.move_entity(&"rock".into(), &"me".into()).unwrap();
        let grab = Grab::new();
        let out = run_phases(&grab, &mut w, &command("rock")).unwrap();
        assert_eq!(out.terminal, Terminal::Blocked);
        assert_eq!(out.events[0].data.message_id, "already_have");
        assert_eq!((grab.executed.get(), grab.reported.get(), grab.blocked.get()), (0, 0, 1));
    }

    #[test]
    fn test_execute_failure_is_contract_violation() {
        let mut w = setup();
        let grab = Grab::new();
        // The actor cannot be moved into itself.
        let err = run_phases(&grab, &mut w, &command("me")).unwrap_err();
        assert!(matches!(err, EngineError::ContractViolation(_)));
        assert_eq!(grab.reported.get(), 0);
    }

    #[test]
    fn test_default_blocked_carries_params() {
        struct Never(ActionMetadata);
        impl Action for Never {
            fn metadata(&self) -> &ActionMetadata {
                &self.0
            }
            fn validate(&self, _: &ActionContext<'_>) -> ValidationResult {
                ValidationResult::fail("not_today").with("reason", "rain")
            }
            fn execute(&self, _: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
                unreachable!("never validates")
            }
            fn report(&self, _: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
                Vec::new()
            }
        }
        let mut w = setup();
        let never = Never(ActionMetadata::new("test.never", &["never"]));
        let out = run_phases(&never, &mut w, &command("rock")).unwrap();
        let ev = &out.events[0];
        assert_eq!(ev.event_type, kinds::ACTION_BLOCKED);
        assert_eq!(ev.data.message_id, "not_today");
        assert_eq!(ev.data.params["reason"], Value::from("rain"));
        assert_eq!(ev.data.params["item"], Value::from("rock"));
    }

    #[test]
    fn test_registry_maps_verbs() {
        let mut reg = ActionRegistry::new();
        reg.register(Box::new(Grab::new()));
        assert!(reg.for_verb("grab").is_some());
        assert!(reg.for_verb("take").is_none());
        assert_eq!(reg.ids(), vec!["test.grab"]);
        reg.register(Box::new(Grab::new()));
        assert_eq!(reg.len(), 1);
    }
}
