//! Saying things out loud.

use super::{event, with_success};
use crate::action::{Action, ActionContext, ActionMetadata, Effects, ExecuteContext, SlotRequirement, ValidationResult};
use crate::events::EventDraft;
use crate::scope::{resolve_scope, ScopeLevel, Sense};
use crate::types::{EntityId, WorldError};

pub struct Saying {
    meta: ActionMetadata,
}

impl Default for Saying {
    fn default() -> Self {
        Self {
            meta: ActionMetadata::new("if.action.saying", &["say"])
                .direct(SlotRequirement::Text)
                .sense(Sense::Hearing),
        }
    }
}

impl Action for Saying {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn validate(&self, ctx: &ActionContext<'_>) -> ValidationResult {
        match ctx.command.text.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => ValidationResult::ok(),
            _ => ValidationResult::fail("say_what"),
        }
    }

    fn execute(&self, _: &mut ExecuteContext<'_>) -> Result<Effects, WorldError> {
        Ok(Effects::new())
    }

    fn report(&self, ctx: &ActionContext<'_>, _: &ValidationResult, _: &Effects) -> Vec<EventDraft> {
        let text = ctx.command.text.clone().unwrap_or_default();
        // Other actors within earshot are listed so listeners can react.
        let listeners: Vec<EntityId> = resolve_scope(ctx.world, ctx.actor(), Sense::Hearing)
            .at_level(ScopeLevel::Detectable)
            .into_iter()
            .filter(|id| ctx.world.is_actor(id))
            .collect();
        let said = event(ctx, "if.event.said", "said").others(listeners).param("text", text);
        with_success(said, &self.meta.id)
    }
}
