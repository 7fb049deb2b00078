//! Standard actions.
//!
//! Each action reports a domain event (`if.event.*`) followed by an
//! `action.success` event carrying the same message id and parameters, so
//! a text service can render either. Failures go through the default
//! `blocked` phase as one `action.blocked` event.

mod containers;
mod devices;
mod inventory;
mod movement;
mod senses;
mod speech;
mod wearing;

use serde_json::Value;

use crate::action::{ActionContext, ActionRegistry};
use crate::events::{kinds, EventDraft};
use crate::scope::ScopeSet;
use crate::types::EntityId;
use crate::world::{TraitKind, World};

pub use containers::{Closing, Opening, Putting};
pub use devices::Switching;
pub use inventory::{Dropping, Inventory, Taking};
pub use movement::Going;
pub use senses::{Examining, Listening, Looking, Smelling};
pub use speech::Saying;
pub use wearing::{TakingOff, Wearing};

/// Register every standard action.
pub fn register_standard(registry: &mut ActionRegistry) {
    registry
        .register(Box::new(Taking::default()))
        .register(Box::new(Dropping::default()))
        .register(Box::new(Inventory::default()))
        .register(Box::new(Putting::default()))
        .register(Box::new(Opening::default()))
        .register(Box::new(Closing::default()))
        .register(Box::new(Examining::default()))
        .register(Box::new(Looking::default()))
        .register(Box::new(Listening::default()))
        .register(Box::new(Smelling::default()))
        .register(Box::new(Wearing::default()))
        .register(Box::new(TakingOff::default()))
        .register(Box::new(Switching::on()))
        .register(Box::new(Switching::off()))
        .register(Box::new(Saying::default()))
        .register(Box::new(Going::default()));
}

pub fn standard_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    register_standard(&mut registry);
    registry
}

// ---------------------------------------------------------------------------
// Helpers shared by the action bodies
// ---------------------------------------------------------------------------

/// A domain event stamped with the acting actor and where they stand.
fn event(ctx: &ActionContext<'_>, event_type: &str, message_id: &str) -> EventDraft {
    EventDraft::new(event_type, message_id)
        .actor(ctx.actor())
        .location(ctx.location())
}

/// The domain event followed by its `action.success` twin.
fn with_success(domain: EventDraft, action_id: &str) -> Vec<EventDraft> {
    let mut success = domain.clone().param("action", action_id);
    success.event_type = kinds::ACTION_SUCCESS.to_string();
    vec![domain, success]
}

fn names(world: &World, ids: &[EntityId]) -> Value {
    Value::from(ids.iter().map(|id| world.name_of(id)).collect::<Vec<_>>())
}

/// Can `actor` see in `room`? `scope` is the actor's sight scope.
fn lit(world: &World, actor: &EntityId, room: &EntityId, scope: &ScopeSet) -> bool {
    !world.has_trait(room, TraitKind::Dark)
        || world.is_active_light(actor)
        || scope.iter().any(|(id, f)| f.visible && world.is_active_light(id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
