//! Entity resolver: noun-phrase slot + scope → entity ids.
//!
//! Candidates are the in-scope entities whose name, aliases or type
//! synonyms match the head noun and that carry every adjective the player
//! used. When more than one survives, ties are broken in a fixed order:
//!
//!   1. the entity the previous command was about,
//!   2. fewest descriptive words the player left out,
//!   3. narrowest scope level (carried before reachable before visible),
//!
//! and anything still tied is reported as ambiguous. Nothing is picked
//! silently.
//!
//! "it", "them", "him" and "her" read a per-actor `Mentions` record that
//! the caller passes in. "all" expands through a filter supplied by the
//! action.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::nl::grammar::{NounSlot, SlotKind};
use crate::nl::lexicon::{Lexicon, PronounClass};
use crate::scope::{ScopeLevel, ScopeSet};
use crate::types::EntityId;
use crate::world::{ContentsOptions, Entity, TraitKind, World};

// ---------------------------------------------------------------------------
// Mentions
// ---------------------------------------------------------------------------

/// What an actor's recent commands referred to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentions {
    pub it: Option<EntityId>,
    pub them: Vec<EntityId>,
    pub animate: Option<EntityId>,
    /// Entities the previous command resolved to.
    pub recent: Vec<EntityId>,
    /// Text of the last command that parsed, for "again".
    pub last_command: Option<String>,
}

impl Mentions {
    /// Remember what a command's direct and indirect slots resolved to.
    ///
    /// "it" takes the direct object, or the indirect one when there was no
    /// direct object, and never an actor. "them" changes only when a slot
    /// named several entities. Actors go to "him"/"her".
    pub fn record(&mut self, world: &World, direct: &[EntityId], indirect: &[EntityId]) {
        let direct = distinct(direct);
        let indirect = distinct(indirect);
        if direct.is_empty() && indirect.is_empty() {
            return;
        }

        let it = if direct.is_empty() { lone_thing(world, &indirect) } else { lone_thing(world, &direct) };
        if it.is_some() {
            self.it = it;
        }
        for ids in [&direct, &indirect] {
            if ids.len() > 1 {
                self.them = ids.clone();
            }
        }
        if let Some(actor) = direct.iter().chain(&indirect).rev().find(|id| world.is_actor(id)) {
            self.animate = Some(actor.clone());
        }
        self.recent = distinct(&[direct, indirect].concat());
    }
}

fn lone_thing(world: &World, ids: &[EntityId]) -> Option<EntityId> {
    match ids {
        [one] if !world.is_actor(one) => Some(one.clone()),
        _ => None,
    }
}

fn distinct(ids: &[EntityId]) -> Vec<EntityId> {
    let mut seen = BTreeSet::new();
    ids.iter().filter(|id| seen.insert((*id).clone())).cloned().collect()
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Resolution {
    Unique(EntityId),
    /// "all", "them": every listed entity, in world order.
    Multiple(Vec<EntityId>),
    Ambiguous(Vec<EntityId>),
    /// Carries the text the player typed.
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSlot {
    /// Every entity that matched before tie-breaking.
    pub candidates: Vec<EntityId>,
    pub outcome: Resolution,
}

impl ResolvedSlot {
    fn unique(candidates: Vec<EntityId>, id: EntityId) -> Self {
        Self { candidates, outcome: Resolution::Unique(id) }
    }

    fn not_found(text: &str) -> Self {
        Self { candidates: Vec::new(), outcome: Resolution::NotFound(text.to_string()) }
    }

    /// The resolved ids, when resolution succeeded.
    pub fn ids(&self) -> Option<Vec<EntityId>> {
        match &self.outcome {
            Resolution::Unique(id) => Some(vec![id.clone()]),
            Resolution::Multiple(ids) => Some(ids.clone()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Everything one slot resolution needs besides the slot itself.
pub struct ResolveRequest<'a> {
    pub actor: &'a EntityId,
    pub scope: &'a ScopeSet,
    pub mentions: &'a Mentions,
    pub lexicon: &'a Lexicon,
    /// Minimum scope level the action declares for this slot. Bounds what
    /// "all" can expand to.
    pub min_level: ScopeLevel,
    /// The action's own filter for "all".
    pub include_in_all: &'a dyn Fn(&EntityId) -> bool,
    /// "all from the box": limit expansion to this holder's contents.
    pub all_from: Option<&'a EntityId>,
}

/// Resolve one noun-phrase slot.
pub fn resolve_slot(world: &World, slot: &NounSlot, req: &ResolveRequest<'_>) -> ResolvedSlot {
    let resolved = match slot.kind {
        SlotKind::Named => resolve_named(world, slot, req),
        SlotKind::Pronoun => resolve_pronoun(world, slot, req),
        SlotKind::All => resolve_all(world, slot, req),
        SlotKind::Literal => ResolvedSlot::not_found(&slot.text),
    };
    debug!(text = %slot.text, outcome = ?resolved.outcome, "slot resolved");
    resolved
}

fn matches_head(entity: &Entity, slot: &NounSlot) -> bool {
    let nouns = entity.nouns();
    let types = entity.type_synonyms();
    [slot.head.as_str(), slot.head_lemma.as_str()]
        .into_iter()
        .any(|h| nouns.iter().any(|n| n.as_str() == h) || types.iter().any(|t| *t == h))
}

fn has_adjectives(entity: &Entity, adjectives: &[String]) -> bool {
    let descriptors = entity.descriptors();
    adjectives.iter().all(|a| descriptors.contains(a))
}

fn resolve_named(world: &World, slot: &NounSlot, req: &ResolveRequest<'_>) -> ResolvedSlot {
    let pool: Vec<&Entity> = req.scope.iter().filter_map(|(id, _)| world.entity(id)).collect();

    let by_head: Vec<&Entity> = pool.iter().copied().filter(|e| matches_head(e, slot)).collect();
    let candidates: Vec<&Entity> = if by_head.is_empty() {
        // "press yellow": the head word may be an adjective.
        let mut as_adjectives = slot.adjectives.clone();
        as_adjectives.push(slot.head.clone());
        pool.iter().copied().filter(|e| has_adjectives(e, &as_adjectives)).collect()
    } else {
        by_head.into_iter().filter(|e| has_adjectives(e, &slot.adjectives)).collect()
    };

    let ids: Vec<EntityId> = candidates.iter().map(|e| e.id.clone()).collect();
    match ids.len() {
        0 => return ResolvedSlot::not_found(&slot.text),
        1 => return ResolvedSlot::unique(ids.clone(), ids[0].clone()),
        _ => {}
    }

    // 1. Recency.
    let recent: Vec<&EntityId> = ids.iter().filter(|id| req.mentions.recent.contains(id)).collect();
    if recent.len() == 1 {
        return ResolvedSlot::unique(ids.clone(), recent[0].clone());
    }

    // 2. Fewest descriptors the player did not mention.
    let unmatched = |e: &Entity| {
        e.descriptors().iter().filter(|d| !slot.adjectives.contains(d)).count()
    };
    let fewest = candidates.iter().map(|e| unmatched(e)).min().unwrap_or(0);
    let tied: Vec<&Entity> = candidates.into_iter().filter(|e| unmatched(e) == fewest).collect();
    if tied.len() == 1 {
        return ResolvedSlot::unique(ids, tied[0].id.clone());
    }

    // 3. Narrowest scope.
    let level = |e: &Entity| req.scope.level_of(&e.id).unwrap_or(ScopeLevel::Detectable);
    let narrowest = tied.iter().map(|e| level(e)).min().unwrap_or(ScopeLevel::Detectable);
    let tied: Vec<EntityId> = tied
        .into_iter()
        .filter(|e| level(e) == narrowest)
        .map(|e| e.id.clone())
        .collect();
    if tied.len() == 1 {
        return ResolvedSlot::unique(ids, tied[0].clone());
    }

    // 4. Still tied.
    ResolvedSlot { candidates: ids, outcome: Resolution::Ambiguous(tied) }
}

fn resolve_pronoun(world: &World, slot: &NounSlot, req: &ResolveRequest<'_>) -> ResolvedSlot {
    let in_scope = |id: &EntityId| req.scope.get(id).is_some() && world.contains(id);
    let referents: Vec<EntityId> = match req.lexicon.pronoun(&slot.head) {
        Some(PronounClass::Reflexive) => {
            return ResolvedSlot::unique(vec![req.actor.clone()], req.actor.clone());
        }
        Some(PronounClass::Singular) => req.mentions.it.iter().cloned().collect(),
        Some(PronounClass::Animate) => req.mentions.animate.iter().cloned().collect(),
        Some(PronounClass::Plural) => req.mentions.them.clone(),
        None => Vec::new(),
    };
    let referents: Vec<EntityId> = referents.into_iter().filter(|id| in_scope(id)).collect();
    match referents.len() {
        0 => ResolvedSlot::not_found(&slot.text),
        1 => ResolvedSlot::unique(referents.clone(), referents[0].clone()),
        _ => ResolvedSlot { candidates: referents.clone(), outcome: Resolution::Multiple(referents) },
    }
}

/// Is `id` lying in the open around the actor: held, on the floor, or on a
/// supporter (or a stack of supporters) standing there?
fn on_surface(world: &World, id: &EntityId, actor: &EntityId, here: &EntityId) -> bool {
    let mut loc = world.get_location(id);
    if loc == Some(actor) {
        return true;
    }
    while let Some(l) = loc {
        if l == here {
            return true;
        }
        if !world.has_trait(l, TraitKind::Supporter) {
            return false;
        }
        loc = world.get_location(l);
    }
    false
}

fn resolve_all(world: &World, slot: &NounSlot, req: &ResolveRequest<'_>) -> ResolvedSlot {
    let Some(here) = world.get_location(req.actor) else {
        return ResolvedSlot::not_found(&slot.text);
    };

    let mut excluded = BTreeSet::new();
    for ex in &slot.except {
        if let Some(ids) = resolve_slot(world, ex, req).ids() {
            excluded.extend(ids);
        }
    }

    let root = req.all_from.unwrap_or(here);
    let order = world.get_contents(root, ContentsOptions { recursive: true, include_worn: true });
    let ids: Vec<EntityId> = order
        .into_iter()
        .filter(|id| req.scope.has(id, req.min_level))
        .filter(|id| match req.all_from {
            Some(holder) => world.get_location(id) == Some(holder),
            None => on_surface(world, id, req.actor, here),
        })
        .filter(|id| slot.head == "all" || world.entity(id).is_some_and(|e| matches_head(e, slot)))
        .filter(|id| !excluded.contains(id))
        .filter(|id| (req.include_in_all)(id))
        .collect();

    if ids.is_empty() {
        return ResolvedSlot::not_found(&slot.text);
    }
    ResolvedSlot { candidates: ids.clone(), outcome: Resolution::Multiple(ids) }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
