//! Command validator: parsed command + action metadata → validated commands.
//!
//! This is where the cross-cutting slot checks live, so no action has to
//! repeat them:
//!
//! - a required slot that is missing fails with `NoTarget`;
//! - each filled slot is resolved against the actor's scope for the
//!   action's sense;
//! - every resolved entity must be in scope at the level the action
//!   declares, or the command fails with `WrongScope`.
//!
//! A direct slot that resolves to several entities ("all", "them") expands
//! into one `ValidatedCommand` per entity, all under the caller's
//! transaction id.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::action::{Action, SlotRequirement};
use crate::nl::grammar::{NounSlot, ParsedCommand, PatternKind, SlotKind};
use crate::nl::lexicon::Lexicon;
use crate::resolve::{resolve_slot, Mentions, Resolution, ResolveRequest};
use crate::scope::{resolve_scope, ScopeLevel, ScopeSet};
use crate::types::{EntityId, ResolutionError, SlotRole, TransactionId};
use crate::world::{TraitKind, World};

/// Prepositions after which "all" means "everything in/on the indirect object".
const SOURCE_PREPOSITIONS: &[&str] = &["from", "out", "off"];

/// Entities the player picked for slots that came back ambiguous.
pub type Selections = BTreeMap<SlotRole, EntityId>;

/// A fully resolved, action-ready command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedCommand {
    pub action_id: String,
    pub actor: EntityId,
    pub direct: Option<EntityId>,
    pub indirect: Option<EntityId>,
    pub preposition: Option<String>,
    /// Free text for text-taking actions ("say"), or the canonical
    /// direction for "go".
    pub text: Option<String>,
    pub raw: ParsedCommand,
    pub transaction_id: TransactionId,
}

impl ValidatedCommand {
    /// A command built directly from ids, for callers that skip parsing
    /// (background actors, tests).
    pub fn bare(
        action_id: &str,
        actor: &EntityId,
        direct: Option<EntityId>,
        indirect: Option<EntityId>,
        transaction_id: TransactionId,
    ) -> Self {
        let pattern = match (&direct, &indirect) {
            (_, Some(_)) => PatternKind::VerbObjPrepObj,
            (Some(_), None) => PatternKind::VerbObj,
            (None, None) => PatternKind::Verb,
        };
        Self {
            action_id: action_id.to_string(),
            actor: actor.clone(),
            direct,
            indirect,
            preposition: None,
            text: None,
            raw: ParsedCommand {
                verb: action_id.to_string(),
                pattern,
                direct: None,
                indirect: None,
                preposition: None,
                original_text: String::new(),
            },
            transaction_id,
        }
    }
}

/// Read-only inputs to one validation.
pub struct Validator<'a> {
    pub world: &'a World,
    pub lexicon: &'a Lexicon,
    pub actor: &'a EntityId,
    pub mentions: &'a Mentions,
    pub selections: &'a Selections,
}

impl<'a> Validator<'a> {
    pub fn new(
        world: &'a World,
        lexicon: &'a Lexicon,
        actor: &'a EntityId,
        mentions: &'a Mentions,
        selections: &'a Selections,
    ) -> Self {
        Self { world, lexicon, actor, mentions, selections }
    }

    /// Bind `parsed` to entities for `action`.
    pub fn validate(
        &self,
        parsed: &ParsedCommand,
        action: &dyn Action,
        transaction_id: TransactionId,
    ) -> Result<Vec<ValidatedCommand>, ResolutionError> {
        let meta = action.metadata();
        let scope = resolve_scope(self.world, self.actor, meta.sense);
        debug!(action = %meta.id, sense = ?meta.sense, in_scope = scope.len(), "validating");

        require(meta.direct, parsed.direct.as_ref(), SlotRole::Direct, &meta.id)?;
        require(meta.indirect, parsed.indirect.as_ref(), SlotRole::Indirect, &meta.id)?;

        // Indirect first: "all from the box" needs to know the box.
        let indirect = match (meta.indirect.level(), &parsed.indirect) {
            (Some(level), Some(slot)) => {
                let ids = self.bind(&scope, slot, SlotRole::Indirect, level, None, &|_| true)?;
                match ids.as_slice() {
                    [one] => Some(one.clone()),
                    _ => {
                        return Err(ResolutionError::Ambiguous {
                            role: SlotRole::Indirect,
                            text: slot.text.clone(),
                            candidates: ids,
                        })
                    }
                }
            }
            _ => None,
        };

        let mut text = None;
        let directs: Vec<Option<EntityId>> = match (meta.direct, &parsed.direct) {
            (SlotRequirement::Text, Some(slot)) => {
                text = Some(slot.head.clone());
                vec![None]
            }
            (SlotRequirement::Optional(level) | SlotRequirement::Required(level), Some(slot)) => {
                let all_from = indirect.as_ref().filter(|holder| {
                    slot.kind == SlotKind::All
                        && parsed.preposition.as_deref().is_some_and(|p| SOURCE_PREPOSITIONS.contains(&p))
                        && (self.world.has_trait(holder, TraitKind::Container)
                            || self.world.has_trait(holder, TraitKind::Supporter))
                });
                let include = |id: &EntityId| {
                    Some(id) != indirect.as_ref() && action.includes_in_all(self.world, self.actor, id)
                };
                self.bind(&scope, slot, SlotRole::Direct, level, all_from, &include)?
                    .into_iter()
                    .map(Some)
                    .collect()
            }
            _ => vec![None],
        };

        let commands = directs
            .into_iter()
            .map(|direct| ValidatedCommand {
                action_id: meta.id.clone(),
                actor: self.actor.clone(),
                direct,
                indirect: indirect.clone(),
                preposition: parsed.preposition.clone(),
                text: text.clone(),
                raw: parsed.clone(),
                transaction_id,
            })
            .collect::<Vec<_>>();
        debug!(action = %meta.id, count = commands.len(), "validated");
        Ok(commands)
    }

    /// Resolve one slot and check every resulting entity against `level`.
    fn bind(
        &self,
        scope: &ScopeSet,
        slot: &NounSlot,
        role: SlotRole,
        level: ScopeLevel,
        all_from: Option<&EntityId>,
        include: &dyn Fn(&EntityId) -> bool,
    ) -> Result<Vec<EntityId>, ResolutionError> {
        let ids = match self.selections.get(&role) {
            Some(chosen) => {
                if chosen != self.actor && scope.get(chosen).is_none() {
                    return Err(ResolutionError::EntityNotFound { role, text: slot.text.clone() });
                }
                vec![chosen.clone()]
            }
            None => {
                let req = ResolveRequest {
                    actor: self.actor,
                    scope,
                    mentions: self.mentions,
                    lexicon: self.lexicon,
                    min_level: level,
                    include_in_all: include,
                    all_from,
                };
                match resolve_slot(self.world, slot, &req).outcome {
                    Resolution::Unique(id) => vec![id],
                    Resolution::Multiple(ids) => ids,
                    Resolution::Ambiguous(candidates) => {
                        return Err(ResolutionError::Ambiguous { role, text: slot.text.clone(), candidates })
                    }
                    Resolution::NotFound(text) => return Err(ResolutionError::EntityNotFound { role, text }),
                }
            }
        };

        for id in &ids {
            if id != self.actor && !scope.has(id, level) {
                return Err(ResolutionError::WrongScope {
                    role,
                    text: slot.text.clone(),
                    entity: id.clone(),
                    required: level,
                });
            }
        }
        Ok(ids)
    }
}

fn require(
    req: SlotRequirement,
    slot: Option<&NounSlot>,
    role: SlotRole,
    action: &str,
) -> Result<(), ResolutionError> {
    let needed = req.is_required() || req == SlotRequirement::Text;
    if needed && slot.is_none() {
        return Err(ResolutionError::NoTarget { role, action: action.to_string() });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionContext, ActionMetadata, Effects, ExecuteContext, ValidationResult};
    use crate::events::EventDraft;
    use crate::nl::Parser;
    use crate::scope::Sense;
    use crate::types::WorldError;
    use crate::world::{Entity, EntityKind, Trait};

    struct StubAction(ActionMetadata);

    impl Action for StubAction {
        fn metadata(&self) -> &ActionMetadata {
            &self.0
        }
        fn validate(&self, _: &ActionContext<'_>) -> ValidationResult {
            ValidationResult::ok()
        }
        fn execute(&self, _: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
            Ok(Effects::new())
        }
        fn report(&self, _: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
            Vec::new()
        }
        fn includes_in_all(&self, world: &World, actor: &EntityId, id: &EntityId) -> bool {
            !world.has_trait(id, TraitKind::Scenery) && !world.is_actor(id) && world.get_location(id) != Some(actor)
        }
    }

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    fn world() -> World {
        let mut w = World::new();
        w.add_entity(Entity::new("hall", "hall", EntityKind::Room)).unwrap();
        w.add_at(Entity::new("player", "yourself", EntityKind::Actor), &id("hall")).unwrap();
        w.add_at(Entity::new("coin", "gold coin", EntityKind::Thing), &id("hall")).unwrap();
        w.add_at(Entity::new("key", "iron key", EntityKind::Thing), &id("player")).unwrap();
        w.add_at(
            Entity::new("box", "glass box", EntityKind::Thing)
                .with_trait(Trait::Container { transparent: true, capacity: None })
                .with_trait(Trait::Openable { open: false }),
            &id("hall"),
        )
        .unwrap();
        w.add_at(Entity::new("gem", "gem", EntityKind::Thing), &id("box")).unwrap();
        w.add_at(
            Entity::new("chest", "chest", EntityKind::Thing)
                .with_trait(Trait::Container { transparent: false, capacity: None }),
            &id("hall"),
        )
        .unwrap();
        w.add_at(Entity::new("ring", "ring", EntityKind::Thing), &id("chest")).unwrap();
        w.add_at(Entity::new("pearl", "pearl", EntityKind::Thing), &id("chest")).unwrap();
        w
    }

    fn run(
        w: &World,
        action: &StubAction,
        input: &str,
        selections: &Selections,
    ) -> Result<Vec<ValidatedCommand>, ResolutionError> {
        let parser = Parser::new();
        let parsed = parser.parse(input).unwrap().remove(0);
        let mentions = Mentions::default();
        let actor = id("player");
        Validator::new(w, parser.lexicon(), &actor, &mentions, selections).validate(&parsed, action, TransactionId(1))
    }

    fn take() -> StubAction {
        StubAction(
            ActionMetadata::new("test.take", &["take"])
                .direct(SlotRequirement::Required(ScopeLevel::Reachable))
                .indirect(SlotRequirement::Optional(ScopeLevel::Reachable)),
        )
    }

    #[test]
    fn test_binds_direct_object() {
        let cmds = run(&world(), &take(), "take the coin", &Selections::new()).unwrap();
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].direct, Some(id("coin")));
        assert_eq!(cmds[0].action_id, "test.take");
    }

    #[test]
    fn test_visible_but_unreachable_is_wrong_scope() {
        let err = run(&world(), &take(), "take gem", &Selections::new()).unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::WrongScope { required: ScopeLevel::Reachable, ref entity, .. } if *entity == id("gem")
        ));
        assert_eq!(err.message_id(), "not_reachable");
    }

    #[test]
    fn test_carried_requirement() {
        let drop = StubAction(
            ActionMetadata::new("test.drop", &["drop"]).direct(SlotRequirement::Required(ScopeLevel::Carried)),
        );
        assert!(run(&world(), &drop, "drop key", &Selections::new()).is_ok());
        let err = run(&world(), &drop, "drop coin", &Selections::new()).unwrap_err();
        assert_eq!(err.message_id(), "not_held");
    }

    #[test]
    fn test_missing_required_slot_is_no_target() {
        let put = StubAction(
            ActionMetadata::new("test.put", &["examine"])
                .direct(SlotRequirement::Required(ScopeLevel::Carried))
                .indirect(SlotRequirement::Required(ScopeLevel::Reachable)),
        );
        let err = run(&world(), &put, "examine key", &Selections::new()).unwrap_err();
        assert_eq!(err, ResolutionError::NoTarget { role: SlotRole::Indirect, action: "test.put".into() });
    }

    #[test]
    fn test_all_expands_per_entity() {
        let cmds = run(&world(), &take(), "take all", &Selections::new()).unwrap();
        let ids: Vec<_> = cmds.iter().filter_map(|c| c.direct.clone()).collect();
        assert_eq!(ids, vec![id("coin"), id("box"), id("chest")]);
        assert!(cmds.iter().all(|c| c.transaction_id == TransactionId(1)));
    }

    #[test]
    fn test_all_from_container() {
        let cmds = run(&world(), &take(), "take all from the chest", &Selections::new()).unwrap();
        let ids: Vec<_> = cmds.iter().filter_map(|c| c.direct.clone()).collect();
        assert_eq!(ids, vec![id("ring"), id("pearl")]);
        assert!(cmds.iter().all(|c| c.indirect == Some(id("chest"))));
    }

    #[test]
    fn test_selection_resolves_ambiguity() {
        let mut w = world();
        w.add_at(Entity::new("coin2", "silver coin", EntityKind::Thing), &id("hall")).unwrap();
        let err = run(&w, &take(), "take coin", &Selections::new()).unwrap_err();
        assert!(matches!(err, ResolutionError::Ambiguous { ref candidates, .. } if candidates.len() == 2));

        let mut chosen = Selections::new();
        chosen.insert(SlotRole::Direct, id("coin2"));
        let cmds = run(&w, &take(), "take coin", &chosen).unwrap();
        assert_eq!(cmds[0].direct, Some(id("coin2")));
    }

    #[test]
    fn test_selection_out_of_scope_is_not_found() {
        let mut w = world();
        w.add_entity(Entity::new("vault", "vault", EntityKind::Room)).unwrap();
        w.add_at(Entity::new("bar", "gold bar", EntityKind::Thing), &id("vault")).unwrap();
        let mut chosen = Selections::new();
        chosen.insert(SlotRole::Direct, id("bar"));
        assert!(matches!(
            run(&w, &take(), "take coin", &chosen),
            Err(ResolutionError::EntityNotFound { .. })
        ));
    }

    #[test]
    fn test_text_slot_passes_through() {
        let say = StubAction(ActionMetadata::new("test.say", &["say"]).direct(SlotRequirement::Text));
        let cmds = run(&world(), &say, "say \"hello sailor\"", &Selections::new()).unwrap();
        assert_eq!(cmds[0].text.as_deref(), Some("hello sailor"));
        assert_eq!(cmds[0].direct, None);
    }

    #[test]
    fn test_direction_slot_carries_canonical_name() {
        let go = StubAction(ActionMetadata::new("test.go", &["go"]).direct(SlotRequirement::Text));
        let cmds = run(&world(), &go, "ne", &Selections::new()).unwrap();
        assert_eq!(cmds[0].text.as_deref(), Some("northeast"));
        assert_eq!(cmds[0].raw.direct.as_ref().unwrap().text, "ne");
    }

    #[test]
    fn test_reflexive_passes_scope_check() {
        let examine = StubAction(
            ActionMetadata::new("test.examine", &["examine"]).direct(SlotRequirement::Required(ScopeLevel::Visible)),
        );
        let cmds = run(&world(), &examine, "examine myself", &Selections::new()).unwrap();
        assert_eq!(cmds[0].direct, Some(id("player")));
    }

    #[test]
    fn test_hearing_sense_reaches_closed_container_loud_entity() {
        let mut w = world();
        w.add_at(Entity::new("clock", "clock", EntityKind::Thing).with_trait(Trait::Loud), &id("chest")).unwrap();
        w.add_at(
            Entity::new("cabinet", "cabinet", EntityKind::Thing)
                .with_trait(Trait::Container { transparent: false, capacity: None })
                .with_trait(Trait::Openable { open: false }),
            &id("hall"),
        )
        .unwrap();
        w.move_entity(&id("clock"), &id("cabinet")).unwrap();
        let listen = StubAction(
            ActionMetadata::new("test.listen", &["listen"])
                .direct(SlotRequirement::Optional(ScopeLevel::Detectable))
                .sense(Sense::Hearing),
        );
        let cmds = run(&w, &listen, "listen to the clock", &Selections::new()).unwrap();
        assert_eq!(cmds[0].direct, Some(id("clock")));
    }
}
