//! Looking, examining, listening and smelling. None of these mutate the
//! world; their reports read scope directly.

use super::{event, lit, names, with_success};
use crate::action::{Action, ActionContext, ActionMetadata, Effects, ExecuteContext, SlotRequirement, ValidationResult};
use crate::events::EventDraft;
use crate::scope::{resolve_scope, ScopeLevel, Sense};
use crate::types::{EntityId, WorldError};
use crate::world::{ContentsOptions, TraitKind, World};

/// Contents an observer can see without opening anything.
fn visible_contents(world: &World, holder: &EntityId) -> Vec<EntityId> {
    let shows = world.has_trait(holder, TraitKind::Supporter)
        || world.is_actor(holder)
        || (world.has_trait(holder, TraitKind::Container) && (world.is_open(holder) || world.is_transparent(holder)));
    if shows {
        world.get_contents(holder, ContentsOptions::default())
    } else {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// Examining
// ---------------------------------------------------------------------------

pub struct Examining {
    meta: ActionMetadata,
}

impl Default for Examining {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.examining", &["examine"])
                .direct(SlotRequirement::Required(ScopeLevel::Visible)),
        }
    }
}

impl Action for Examining {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        match ctx.direct() {
            Some(_) => ValidationResult::ok(),
            None => ValidationResult::fail("no_target"),
        }
    }

    fn execute(&self, _: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let Some(target) = ctx.direct() else {
            return Vec::new();
        };
        let world = ctx.world;
        if target == ctx.actor() {
            return with_success(event(ctx, "if.event.examined", "examined_self").target(target), &self.meta.id);
        }

        let contents = visible_contents(world, target);
        let mut examined = event(ctx, "if.event.examined", "examined")
            .target(target)
            .others(contents.iter().cloned())
            .param("item", ctx.name(target));
        if world.has_trait(target, TraitKind::Openable) {
            examined = examined.param("open", world.is_open(target));
        }
        if world.has_trait(target, TraitKind::Switchable) {
            examined = examined.param("switched_on", world.is_switched_on(target));
        }
        if world.has_trait(target, TraitKind::Wearable) {
            examined = examined.param("worn", world.is_worn(target));
        }
        if world.has_trait(target, TraitKind::Container) || world.has_trait(target, TraitKind::Supporter) {
            examined = examined.param("contents", names(world, &contents));
        }
        with_success(examined, &self.meta.id)
    }
}

// ---------------------------------------------------------------------------
// Looking
// ---------------------------------------------------------------------------

pub struct Looking {
    meta: ActionMetadata,
}

impl Default for Looking {
    fn default() -> Self {
        Self { meta: ActionMetadata::new("if.action.looking", &["look"]) }
    }
}

impl Action for Looking {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        match ctx.location() {
            Some(_) => ValidationResult::ok(),
            None => ValidationResult::fail("nowhere"),
        }
    }

    fn execute(&self, _: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let Some(here) = ctx.location() else {
            return Vec::new();
        };
        let world = ctx.world;
        let room = world.containing_room(ctx.actor()).unwrap_or(here);
        let scope = resolve_scope(world, ctx.actor(), Sense::Sight);
        let looked = if lit(world, ctx.actor(), room, &scope) {
            let listed: Vec<EntityId> = world
                .get_contents(here, ContentsOptions::default())
                .into_iter()
                .filter(|id| id != ctx.actor() && scope.has(id, ScopeLevel::Visible))
                .filter(|id| !world.has_trait(id, TraitKind::Scenery))
                .collect();
            event(ctx, "if.event.looked", "room_description")
                .others(listed.iter().cloned())
                .param("room", ctx.name(room))
                .param("contents", names(world, &listed))
        } else {
            event(ctx, "if.event.looked", "room_dark").param("room", ctx.name(room))
        };
        with_success(looked, &self.meta.id)
    }
}

// ---------------------------------------------------------------------------
// Listening and smelling
// ---------------------------------------------------------------------------

/// Everything `actor` detects through `sense` that carries `marker`.
fn sensed_with(world: &World, actor: &EntityId, sense: Sense, marker: TraitKind) -> Vec<EntityId> {
    resolve_scope(world, actor, sense)
        .at_level(ScopeLevel::Detectable)
        .into_iter()
        .filter(|id| world.has_trait(id, marker))
        .collect()
}

pub struct Listening {
    meta: ActionMetadata,
}

impl Default for Listening {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.listening", &["listen"])
                .direct(SlotRequirement::Optional(ScopeLevel::Detectable))
                .sense(Sense::Hearing),
        }
    }
}

impl Action for Listening {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, _: &ActionContext<'_>) -> ValidationResult {
        ValidationResult::ok()
    }

    fn execute(&self, _: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let listened = match ctx.direct() {
            Some(target) => {
                let loud = ctx.world.has_trait(target, TraitKind::Loud);
                event(ctx, "if.event.listened", if loud { "hears_target" } else { "silent_target" })
                    .target(target)
                    .param("item", ctx.name(target))
            }
            None => {
                let sounds = sensed_with(ctx.world, ctx.actor(), Sense::Hearing, TraitKind::Loud);
                let message = if sounds.is_empty() { "silence" } else { "hears" };
                event(ctx, "if.event.listened", message)
                    .others(sounds.iter().cloned())
                    .param("sounds", names(ctx.world, &sounds))
            }
        };
        with_success(listened, &self.meta.id)
    }
}

pub struct Smelling {
    meta: ActionMetadata,
}

impl Default for Smelling {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.smelling", &["smell"])
                .direct(SlotRequirement::Optional(ScopeLevel::Detectable))
                .sense(Sense::Smell),
        }
    }
}

impl Action for Smelling {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, _: &ActionContext<'_>) -> ValidationResult {
        ValidationResult::ok()
    }

    fn execute(&self, _: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let smelled = match ctx.direct() {
            Some(target) => {
                let scented = ctx.world.has_trait(target, TraitKind::Scented);
                event(ctx, "if.event.smelled", if scented { "smells_target" } else { "no_scent_target" })
                    .target(target)
                    .param("item", ctx.name(target))
            }
            None => {
                let scents = sensed_with(ctx.world, ctx.actor(), Sense::Smell, TraitKind::Scented);
                let message = if scents.is_empty() { "no_scent" } else { "smells" };
                event(ctx, "if.event.smelled", message)
                    .others(scents.iter().cloned())
                    .param("scents", names(ctx.world, &scents))
            }
        };
        with_success(smelled, &self.meta.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
