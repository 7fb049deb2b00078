//! Putting clothing on and taking it off.

use super::{event, with_success};
use crate::action::{Action, ActionContext, ActionMetadata, Effects, ExecuteContext, SlotRequirement, ValidationResult};
use crate::events::EventDraft;
use crate::scope::ScopeLevel;
use crate::types::{EntityId, WorldError};
use crate::world::{TraitKind, World};

pub struct Wearing {
    meta: ActionMetadata,
}

impl Default for Wearing {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.wearing", &["wear"])
                .direct(SlotRequirement::Required(ScopeLevel::Carried)),
        }
    }
}

impl Action for Wearing {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        let Some(target) = ctx.direct() else {
            return ValidationResult::fail("no_target");
        };
        let item = ctx.name(target);
        if !ctx.world.has_trait(target, TraitKind::Wearable) {
            return ValidationResult::fail("not_wearable").with("item", item);
        }
        if ctx.world.get_location(target) != Some(ctx.actor()) {
            return ValidationResult::fail("not_held").with("item", item);
        }
        if ctx.world.is_worn(target) {
            return ValidationResult::fail("already_wearing").with("item", item);
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        if let Some(target) = &ctx.command.direct {
            ctx.world.set_worn(target, true)?;
        }
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let Some(target) = ctx.direct() else {
            return Vec::new();
        };
        let worn = event(ctx, "if.event.worn", "worn")
            .target(target)
            .param("item", ctx.name(target));
        with_success(worn, &self.meta.id)
    }

    fn includes_in_all(&self, world: &World, actor: &EntityId, id: &EntityId) -> bool {
        world.get_location(id) == Some(actor) && world.has_trait(id, TraitKind::Wearable) && !world.is_worn(id)
    }
}

pub struct TakingOff {
    meta: ActionMetadata,
}

impl Default for TakingOff {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.taking_off", &["take off"])
                .direct(SlotRequirement::Required(ScopeLevel::Carried)),
        }
    }
}

impl Action for TakingOff {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        let Some(target) = ctx.direct() else {
            return ValidationResult::fail("no_target");
        };
        let wearing = ctx.world.get_location(target) == Some(ctx.actor()) && ctx.world.is_worn(target);
        if !wearing {
            return ValidationResult::fail("not_wearing").with("item", ctx.name(target));
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        if let Some(target) = &ctx.command.direct {
            ctx.world.set_worn(target, false)?;
        }
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let Some(target) = ctx.direct() else {
            return Vec::new();
        };
        let removed = event(ctx, "if.event.removed", "removed")
            .target(target)
            .param("item", ctx.name(target));
        with_success(removed, &self.meta.id)
    }

    fn includes_in_all(&self, world: &World, actor: &EntityId, id: &EntityId) -> bool {
        world.get_location(id) == Some(actor) && world.is_worn(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::action::Terminal;
    use crate::actions::tests::{hall, id, run};

    #[test]
    fn test_wear_and_take_off() {
        let mut w = hall();
        let out = run(&mut w, "if.action.wearing", Some("cloak"), None);
        assert_eq!(out.events[0].event_type, "if.event.worn");
        assert!(w.is_worn(&id("cloak")));

        let out = run(&mut w, "if.action.wearing", Some("cloak"), None);
        assert_eq!(out.events[0].data.message_id, "already_wearing");

        let out = run(&mut w, "if.action.taking_off", Some("cloak"), None);
        assert_eq!(out.terminal, Terminal::Reported);
        assert!(!w.is_worn(&id("cloak")));
    }

    #[test]
    fn test_wear_unwearable() {
        let mut w = hall();
        w.move_entity(&id("coin"), &id("player")).unwrap();
        let out = run(&mut w, "if.action.wearing", Some("coin"), None);
        assert_eq!(out.events[0].data.message_id, "not_wearable");
    }

    #[test]
    fn test_take_off_something_not_worn() {
        let mut w = hall();
        let out = run(&mut w, "if.action.taking_off", Some("cloak"), None);
        assert_eq!(out.events[0].data.message_id, "not_wearing");
    }
}
