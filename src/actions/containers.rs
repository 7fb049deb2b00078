//! Putting things in or on other things, and opening and closing them.

use super::{event, names, with_success};
use crate::action::{Action, ActionContext, ActionMetadata, Effects, ExecuteContext, SlotRequirement, ValidationResult};
use crate::events::EventDraft;
use crate::scope::ScopeLevel;
use crate::types::{EntityId, WorldError};
use crate::world::{ContentsOptions, TraitKind, World};

const ON_PREPOSITIONS: &[&str] = &["on", "onto", "upon"];

// ---------------------------------------------------------------------------
// Putting
// ---------------------------------------------------------------------------

pub struct Putting {
    meta: ActionMetadata,
}

impl Default for Putting {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.putting", &["put"])
                .direct(SlotRequirement::Required(ScopeLevel::Carried))
                .indirect(SlotRequirement::Required(ScopeLevel::Reachable)),
        }
    }
}

impl Putting {
    /// Does the command place onto a surface rather than into a container?
    fn onto(ctx: &ActionContext<'_>, dest: &EntityId) -> bool {
        match ctx.command.preposition.as_deref() {
            Some(p) => ON_PREPOSITIONS.contains(&p),
            None => !ctx.world.has_trait(dest, TraitKind::Container),
        }
    }
}

impl Action for Putting {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        let (Some(item), Some(dest)) = (ctx.direct(), ctx.indirect()) else {
            return ValidationResult::fail("no_target");
        };
        let world = ctx.world;
        let onto = Self::onto(ctx, dest);
        let fail = |id: &str| {
            ValidationResult::fail(id)
                .with("item", ctx.name(item))
                .with(if onto { "surface" } else { "container" }, ctx.name(dest))
        };

        if item == dest || world.is_ancestor(item, dest) {
            return fail(if onto { "cant_put_on_itself" } else { "cant_put_in_itself" });
        }
        if onto && !world.has_trait(dest, TraitKind::Supporter) {
            return fail("not_surface");
        }
        if !onto && !world.has_trait(dest, TraitKind::Container) {
            return fail("not_container");
        }
        if world.get_location(item) == Some(dest) {
            return fail("already_there");
        }
        if world.is_worn(item) {
            return fail("still_worn");
        }
        if !onto && !world.is_open(dest) {
            return fail("container_closed");
        }
        if let Some(cap) = world.container_capacity(dest) {
            if world.get_contents(dest, ContentsOptions::default()).len() >= cap {
                return fail("no_room");
            }
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        if let (Some(item), Some(dest)) = (&ctx.command.direct, &ctx.command.indirect) {
            ctx.world.move_entity(item, dest)?;
        }
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let (Some(item), Some(dest)) = (ctx.direct(), ctx.indirect()) else {
            return Vec::new();
        };
        let put = if Self::onto(ctx, dest) {
            event(ctx, "if.event.put_on", "put_on").param("surface", ctx.name(dest))
        } else {
            event(ctx, "if.event.put_in", "put_in").param("container", ctx.name(dest))
        };
        let put = put.target(item).indirect(dest).param("item", ctx.name(item));
        with_success(put, &self.meta.id)
    }

    fn includes_in_all(&self, world: &World, actor: &EntityId, id: &EntityId) -> bool {
        world.get_location(id) == Some(actor) && !world.is_worn(id)
    }
}

// ---------------------------------------------------------------------------
// Opening and closing
// ---------------------------------------------------------------------------

pub struct Opening {
    meta: ActionMetadata,
}

impl Default for Opening {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.opening", &["open"])
                .direct(SlotRequirement::Required(ScopeLevel::Reachable)),
        }
    }
}

impl Action for Opening {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        let Some(target) = ctx.direct() else {
            return ValidationResult::fail("no_target");
        };
        if !ctx.world.has_trait(target, TraitKind::Openable) {
            return ValidationResult::fail("not_openable").with("item", ctx.name(target));
        }
        if ctx.world.is_open(target) {
            return ValidationResult::fail("already_open").with("item", ctx.name(target));
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        if let Some(target) = &ctx.command.direct {
            ctx.world.set_open(target, true)?;
        }
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let Some(target) = ctx.direct() else {
            return Vec::new();
        };
        // Opening an opaque container shows what was inside.
        let revealed = if ctx.world.has_trait(target, TraitKind::Container) && !ctx.world.is_transparent(target) {
            ctx.world.get_contents(target, ContentsOptions::default())
        } else {
            Vec::new()
        };
        let message = if revealed.is_empty() { "opened" } else { "opened_revealing" };
        let opened = event(ctx, "if.event.opened", message)
            .target(target)
            .others(revealed.iter().cloned())
            .param("item", ctx.name(target))
            .param("revealed", names(ctx.world, &revealed));
        with_success(opened, &self.meta.id)
    }

    fn includes_in_all(&self, world: &World, _: &EntityId, id: &EntityId) -> bool {
        world.has_trait(id, TraitKind::Openable) && !world.is_open(id)
    }
}

pub struct Closing {
    meta: ActionMetadata,
}

impl Default for Closing {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.closing", &["close"])
                .direct(SlotRequirement::Required(ScopeLevel::Reachable)),
        }
    }
}

impl Action for Closing {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        let Some(target) = ctx.direct() else {
            return ValidationResult::fail("no_target");
        };
        if !ctx.world.has_trait(target, TraitKind::Openable) {
            return ValidationResult::fail("not_closable").with("item", ctx.name(target));
        }
        if !ctx.world.is_open(target) {
            return ValidationResult::fail("already_closed").with("item", ctx.name(target));
        }
        if ctx.world.is_ancestor(target, ctx.actor()) {
            return ValidationResult::fail("cant_close_from_inside").with("item", ctx.name(target));
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        if let Some(target) = &ctx.command.direct {
            ctx.world.set_open(target, false)?;
        }
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let Some(target) = ctx.direct() else {
            return Vec::new();
        };
        let closed = event(ctx, "if.event.closed", "closed")
            .target(target)
            .param("item", ctx.name(target));
        with_success(closed, &self.meta.id)
    }

    fn includes_in_all(&self, world: &World, _: &EntityId, id: &EntityId) -> bool {
        world.has_trait(id, TraitKind::Openable) && world.is_open(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Terminal;
    use crate::actions::tests::{hall, id, run};
    use crate::world::{Entity, EntityKind};

    #[test]
    fn test_put_in_closed_box_is_blocked() {
        let mut w = hall();
        let out = run(&mut w, "if.action.putting", Some("cloak"), Some("box"));
        assert_eq!(out.events[0].data.message_id, "container_closed");
        assert_eq!(w.get_location(&id("cloak")), Some(&id("player")));
    }

    #[test]
    fn test_put_in_open_box_then_full() {
        let mut w = hall();
        w.set_open(&id("box"), true).unwrap();
        let out = run(&mut w, "if.action.putting", Some("cloak"), Some("box"));
        assert_eq!(out.terminal, Terminal::Reported);
        assert_eq!(out.events[0].event_type, "if.event.put_in");
        assert_eq!(w.get_location(&id("cloak")), Some(&id("box")));

        w.move_entity(&id("coin"), &id("player")).unwrap();
        let out = run(&mut w, "if.action.putting", Some("coin"), Some("box"));
        assert_eq!(out.events[0].data.message_id, "no_room");
    }

    #[test]
    fn test_put_on_supporter() {
        let mut w = hall();
        let cmd = crate::validate::ValidatedCommand {
            preposition: Some("on".into()),
            ..crate::validate::ValidatedCommand::bare(
                "if.action.putting",
                &id("player"),
                Some(id("cloak")),
                Some(id("table")),
                crate::types::TransactionId(1),
            )
        };
        let out = crate::action::run_phases(&Putting::default(), &mut w, &cmd).unwrap();
        assert_eq!(out.events[0].event_type, "if.event.put_on");
        assert_eq!(out.events[0].data.params["surface"], serde_json::Value::from("table"));
    }

    #[test]
    fn test_put_in_itself() {
        let mut w = hall();
        w.set_open(&id("box"), true).unwrap();
        w.move_entity(&id("box"), &id("player")).unwrap();
        let out = run(&mut w, "if.action.putting", Some("box"), Some("box"));
        assert_eq!(out.events[0].data.message_id, "cant_put_in_itself");
    }

    #[test]
    fn test_put_on_non_surface() {
        let mut w = hall();
        w.add_at(Entity::new("rug", "rug", EntityKind::Thing), &id("hall")).unwrap();
        let cmd = crate::validate::ValidatedCommand {
            preposition: Some("on".into()),
            ..crate::validate::ValidatedCommand::bare(
                "if.action.putting",
                &id("player"),
                Some(id("cloak")),
                Some(id("rug")),
                crate::types::TransactionId(1),
            )
        };
        let out = crate::action::run_phases(&Putting::default(), &mut w, &cmd).unwrap();
        assert_eq!(out.events[0].data.message_id, "not_surface");
    }

    #[test]
    fn test_open_then_already_open() {
        let mut w = hall();
        w.add_at(Entity::new("bead", "bead", EntityKind::Thing), &id("box")).unwrap();
        let out = run(&mut w, "if.action.opening", Some("box"), None);
        assert_eq!(out.events[0].data.message_id, "opened_revealing");
        assert_eq!(out.events[0].data.params["revealed"], serde_json::json!(["bead"]));
        assert!(w.is_open(&id("box")));

        let out = run(&mut w, "if.action.opening", Some("box"), None);
        assert_eq!(out.terminal, Terminal::Blocked);
        assert_eq!(out.events[0].data.message_id, "already_open");
    }

    #[test]
    fn test_open_unopenable() {
        let mut w = hall();
        let out = run(&mut w, "if.action.opening", Some("coin"), None);
        assert_eq!(out.events[0].data.message_id, "not_openable");
    }

    #[test]
    fn test_close() {
        let mut w = hall();
        w.set_open(&id("box"), true).unwrap();
        let out = run(&mut w, "if.action.closing", Some("box"), None);
        assert_eq!(out.events[0].event_type, "if.event.closed");
        assert!(!w.is_open(&id("box")));
        let out = run(&mut w, "if.action.closing", Some("box"), None);
        assert_eq!(out.events[0].data.message_id, "already_closed");
    }
}
