//! Taking, dropping and listing what the actor holds.

use serde_json::Value;

use super::{event, names, with_success};
use crate::action::{Action, ActionContext, ActionMetadata, Effects, ExecuteContext, SlotRequirement, ValidationResult};
use crate::events::EventDraft;
use crate::scope::ScopeLevel;
use crate::types::{EntityId, WorldError};
use crate::world::{ContentsOptions, EntityKind, TraitKind, World};

// ---------------------------------------------------------------------------
// Taking
// ---------------------------------------------------------------------------

pub struct Taking {
    meta: ActionMetadata,
}

impl Default for Taking {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.taking", &["take"])
                .direct(SlotRequirement::Required(ScopeLevel::Reachable))
                .indirect(SlotRequirement::Optional(ScopeLevel::Reachable)),
        }
    }
}

/// Items the actor holds that count against its capacity.
fn held_count(world: &World, actor: &EntityId) -> usize {
    world
        .get_contents(actor, ContentsOptions { recursive: false, include_worn: false })
        .len()
}

impl Action for Taking {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        let Some(target) = ctx.direct() else {
            return ValidationResult::fail("no_target");
        };
        let world = ctx.world;
        let item = ctx.name(target);
        if target == ctx.actor() {
            return ValidationResult::fail("cant_take_self");
        }
        if world.get_location(target) == Some(ctx.actor()) {
            return ValidationResult::fail("already_have").with("item", item);
        }
        if world.is_room(target) {
            return ValidationResult::fail("cant_take_room").with("item", item);
        }
        if world.has_trait(target, TraitKind::Scenery) || world.entity(target).is_some_and(|e| e.kind == EntityKind::Door) {
            return ValidationResult::fail("fixed_in_place").with("item", item);
        }
        if world.is_actor(target) {
            return ValidationResult::fail("cant_take_actor").with("item", item);
        }
        if let Some(source) = ctx.indirect() {
            if world.get_location(target) != Some(source) {
                return ValidationResult::fail("not_there").with("item", item).with("container", ctx.name(source));
            }
        }
        if let Some(cap) = world.container_capacity(ctx.actor()) {
            if held_count(world, ctx.actor()) >= cap {
                return ValidationResult::fail("container_full").with("item", item);
            }
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        let mut effects = Effects::new();
        let Some(target) = &ctx.command.direct else {
            return Ok(effects);
        };
        if let Some(prev) = ctx.world.get_location(target).cloned() {
            effects.insert("previous_location".into(), Value::from(prev.as_str()));
        }
        if ctx.world.is_worn(target) {
            ctx.world.set_worn(target, false)?;
            effects.insert("implicitly_removed".into(), Value::Bool(true));
        }
        ctx.world.move_entity(target, &ctx.command.actor)?;
        Ok(effects)
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, effects: &Effects) -> Vec<EventDraft> {
        let Some(target) = ctx.direct() else {
            return Vec::new();
        };
        let item = ctx.name(target);
        let prev = effects
            .get("previous_location")
            .and_then(Value::as_str)
            .map(EntityId::new);
        let mut events = Vec::new();

        if effects.contains_key("implicitly_removed") {
            let mut removed = event(ctx, "if.event.removed", "removed")
                .target(target)
                .param("implicit", true)
                .param("item", item.as_str())
                .chained();
            if let Some(p) = &prev {
                removed = removed.param("container", ctx.name(p));
            }
            events.push(removed);
        }

        let from_holder = prev.as_ref().filter(|p| Some(*p) != ctx.location());
        let message = if from_holder.is_some() { "taken_from" } else { "taken" };
        let mut taken = event(ctx, "if.event.taken", message)
            .target(target)
            .param("item", item.as_str());
        if let Some(p) = from_holder {
            taken = taken.indirect(p).param("container", ctx.name(p));
        }
        events.extend(with_success(taken, &self.meta.id));
        events
    }

    fn includes_in_all(&self, world: &World, actor: &EntityId, id: &EntityId) -> bool {
        id != actor
            && world.get_location(id) != Some(actor)
            && !world.is_room(id)
            && !world.is_actor(id)
            && !world.has_trait(id, TraitKind::Scenery)
            && world.entity(id).is_some_and(|e| e.kind == EntityKind::Thing)
    }
}

// ---------------------------------------------------------------------------
// Dropping
// ---------------------------------------------------------------------------

pub struct Dropping {
    meta: ActionMetadata,
}

impl Default for Dropping {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.dropping", &["drop"])
                .direct(SlotRequirement::Required(ScopeLevel::Carried)),
        }
    }
}

impl Action for Dropping {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        let Some(target) = ctx.direct() else {
            return ValidationResult::fail("no_target");
        };
        let item = ctx.name(target);
        if ctx.world.get_location(target) != Some(ctx.actor()) {
            return ValidationResult::fail("not_held").with("item", item);
        }
        if ctx.world.is_worn(target) {
            return ValidationResult::fail("still_worn").with("item", item);
        }
        let Some(here) = ctx.location() else {
            return ValidationResult::fail("cant_drop_here");
        };
        if let Some(cap) = ctx.world.container_capacity(here) {
            if ctx.world.get_contents(here, ContentsOptions::default()).len() >= cap {
                return ValidationResult::fail("container_full").with("item", item);
            }
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        let (Some(target), Some(here)) = (&ctx.command.direct, ctx.world.get_location(&ctx.command.actor).cloned()) else {
            return Ok(Effects::new());
        };
        ctx.world.move_entity(target, &here)?;
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let (Some(target), Some(here)) = (ctx.direct(), ctx.location()) else {
            return Vec::new();
        };
        let message = if ctx.world.is_room(here) {
            "dropped"
        } else if ctx.world.has_trait(here, TraitKind::Supporter) {
            "dropped_on"
        } else {
            "dropped_in"
        };
        let dropped = event(ctx, "if.event.dropped", message)
            .target(target)
            .param("item", ctx.name(target))
            .param("location", ctx.name(here));
        with_success(dropped, &self.meta.id)
    }

    fn includes_in_all(&self, world: &World, actor: &EntityId, id: &EntityId) -> bool {
        world.get_location(id) == Some(actor) && !world.is_worn(id)
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

pub struct Inventory {
    meta: ActionMetadata,
}

impl Default for Inventory {
    fn default() -> Self {
        Self { meta: ActionMetadata::new("if.action.inventory", &["inventory"]) }
    }
}

impl Action for Inventory {
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
        let all = ctx.world.get_contents(ctx.actor(), ContentsOptions::default());
        let (worn, carried): (Vec<EntityId>, Vec<EntityId>) = all.into_iter().partition(|id| ctx.world.is_worn(id));
        let message = if worn.is_empty() && carried.is_empty() { "inventory_empty" } else { "inventory" };
        let listed = event(ctx, "if.event.inventory", message)
            .others(carried.iter().chain(worn.iter()).cloned())
            .param("carried", names(ctx.world, &carried))
            .param("worn", names(ctx.world, &worn));
        with_success(listed, &self.meta.id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
