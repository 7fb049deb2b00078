//! Walking between rooms through doors.

use serde_json::Value;

use super::{event, lit, with_success};
use crate::action::{Action, ActionContext, ActionMetadata, Effects, ExecuteContext, SlotRequirement, ValidationResult};
use crate::events::EventDraft;
use crate::scope::{resolve_scope, Sense};
use crate::types::{EntityId, WorldError};
use crate::world::{Direction, World};

pub struct Going {
    meta: ActionMetadata,
}

impl Default for Going {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.going", &["go"]).direct(SlotRequirement::Text),
        }
    }
}

/// The door an actor walks through and the rooms on either side.
struct Route<'w> {
    door: &'w EntityId,
    from: &'w EntityId,
    to: &'w EntityId,
}

/// Find the way out of the actor's room in the direction named by `text`,
/// or the failure explaining why there is none.
fn route<'w>(world: &'w World, actor: &EntityId, text: Option<&str>) -> Result<Route<'w>, ValidationResult> {
    let Some(direction) = text.and_then(Direction::from_name) else {
        return Err(ValidationResult::fail("no_direction"));
    };
    let from = match world.get_location(actor) {
        Some(here) if world.is_room(here) => here,
        _ => return Err(ValidationResult::fail("not_in_room")),
    };
    let Some((door, to)) = world.exit(from, direction) else {
        return Err(ValidationResult::fail("no_exit_that_way").with("direction", direction.name()));
    };
    if !world.is_open(door) {
        return Err(ValidationResult::fail("door_closed")
            .with("door", world.name_of(door))
            .with("direction", direction.name()));
    }
    Ok(Route { door, from, to })
}

impl Action for Going {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        match route(ctx.world, ctx.actor(), ctx.command.text.as_deref()) {
            Ok(_) => ValidationResult::ok(),
            Err(failed) => failed,
        }
    }

    fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        let command = ctx.command;
        let mut effects = Effects::new();
        let Ok(Route { door, from, to }) = route(ctx.world, &command.actor, command.text.as_deref()) else {
            return Ok(effects);
        };
        let (door, from, to) = (door.clone(), from.clone(), to.clone());
        ctx.world.move_entity(&command.actor, &to)?;
        effects.insert("door".into(), Value::from(door.as_str()));
        effects.insert("from".into(), Value::from(from.as_str()));
        Ok(effects)
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, effects: &Effects) -> Vec<EventDraft> {
        let Some(to) = ctx.location() else {
            return Vec::new();
        };
        let id_of = |key: &str| effects.get(key).and_then(Value::as_str).map(EntityId::new);
        let (Some(door), Some(from)) = (id_of("door"), id_of("from")) else {
            return Vec::new();
        };
        let scope = resolve_scope(ctx.world, ctx.actor(), Sense::Sight);
        let message = if lit(ctx.world, ctx.actor(), to, &scope) { "moved" } else { "too_dark" };
        let moved = event(ctx, "if.event.actor_moved", message)
            .target(&door)
            .param("direction", ctx.command.text.clone().unwrap_or_default())
            .param("door", ctx.name(&door))
            .param("from", ctx.name(&from))
            .param("to", ctx.name(to));
        with_success(moved, &self.meta.id)
    }
}
