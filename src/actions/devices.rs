//! Switching devices on and off.

use super::{event, with_success};
use crate::action::{Action, ActionContext, ActionMetadata, Effects, ExecuteContext, SlotRequirement, ValidationResult};
use crate::events::EventDraft;
use crate::scope::ScopeLevel;
use crate::types::{EntityId, WorldError};
use crate::world::{TraitKind, World};

/// One action per direction; the two differ only in target state and names.
pub struct Switching {
    meta: ActionMetadata,
    on: bool,
}

impl Switching {
    pub fn on() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.switching_on", &["switch on"])
                .direct(SlotRequirement::Required(ScopeLevel::Reachable)),
            on: true,
        }
    }

    pub fn off() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.switching_off", &["switch off"])
                .direct(SlotRequirement::Required(ScopeLevel::Reachable)),
            on: false,
        }
    }
}

impl Action for Switching {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        let Some(target) = ctx.direct() else {
            return ValidationResult::fail("no_target");
        };
        let item = ctx.name(target);
        if !ctx.world.has_trait(target, TraitKind::Switchable) {
            return ValidationResult::fail("not_switchable").with("item", item);
        }
        if ctx.world.is_switched_on(target) == self.on {
            return ValidationResult::fail(if self.on { "already_on" } else { "already_off" }).with("item", item);
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        if let Some(target) = &ctx.command.direct {
            ctx.world.set_switched(target, self.on)?;
        }
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let Some(target) = ctx.direct() else {
            return Vec::new();
        };
        let (event_type, message) = if self.on {
            ("if.event.switched_on", "switched_on")
        } else {
            ("if.event.switched_off", "switched_off")
        };
        let switched = event(ctx, event_type, message)
            .target(target)
            .param("item", ctx.name(target))
            .param("light_source", ctx.world.has_trait(target, TraitKind::LightSource));
        with_success(switched, &self.meta.id)
    }

    fn includes_in_all(&self, world: &World, _: &EntityId, id: &EntityId) -> bool {
        world.has_trait(id, TraitKind::Switchable) && world.is_switched_on(id) != self.on
    }
}
