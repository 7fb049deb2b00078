//! Scope resolution: what an actor can hold, reach, see, or otherwise sense.
//!
//! `resolve_scope` is a pure query over the containment forest. It walks
//! depth-first from the actor's surroundings and tags every entity it meets
//! with the scope levels that apply. Nothing is cached; each call reads the
//! world as it is now.
//!
//! Rules:
//!   1. The actor's direct children (held or worn) are CARRIED, REACHABLE and
//!      VISIBLE. Deeper items inside them follow the container rules below.
//!   2. The walk of the surroundings starts at a *ceiling*: the actor's
//!      location, raised through supporters and open (or, for sight,
//!      transparent) containers until a room or an enclosing wall is hit.
//!      The root is always entered; any other container is entered only if
//!      it is open or transparent. Only open containers pass reach.
//!   3. Items worn by another actor are VISIBLE but not REACHABLE unless the
//!      item or the wearer is `Exposed`.
//!   4. In a dark place with no active light source, everything outside the
//!      actor's own subtree loses VISIBLE and REACHABLE.
//!   5. DETECTABLE is VISIBLE for sight, REACHABLE for touch, and for hearing
//!      and smell widens to the same room (closed containers muffle) and to
//!      rooms joined by an open door.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::EntityId;
use crate::world::{ContentsOptions, EntityKind, TraitKind, World};

// ---------------------------------------------------------------------------
// Levels and senses
// ---------------------------------------------------------------------------

/// How an entity is accessible to an actor. Ordered narrowest first, so
/// `Carried < Reachable < Visible < Detectable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeLevel {
    Carried,
    Reachable,
    Visible,
    Detectable,
}

impl fmt::Display for ScopeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeLevel::Carried => write!(f, "carried"),
            ScopeLevel::Reachable => write!(f, "reachable"),
            ScopeLevel::Visible => write!(f, "visible"),
            ScopeLevel::Detectable => write!(f, "detectable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    #[default]
    Sight,
    Hearing,
    Smell,
    Touch,
}

/// The scope levels that hold for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScopeFlags {
    pub carried: bool,
    pub reachable: bool,
    pub visible: bool,
    pub detectable: bool,
}

impl ScopeFlags {
    pub fn has(&self, level: ScopeLevel) -> bool {
        match level {
            ScopeLevel::Carried => self.carried,
            ScopeLevel::Reachable => self.reachable,
            ScopeLevel::Visible => self.visible,
            ScopeLevel::Detectable => self.detectable,
        }
    }

    /// The narrowest level that holds.
    pub fn narrowest(&self) -> Option<ScopeLevel> {
        [ScopeLevel::Carried, ScopeLevel::Reachable, ScopeLevel::Visible, ScopeLevel::Detectable]
            .into_iter()
            .find(|l| self.has(*l))
    }
}

// ---------------------------------------------------------------------------
// ScopeSet
// ---------------------------------------------------------------------------

/// Per-actor, per-sense scope of every perceivable entity. Never includes
/// the actor itself or rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSet {
    pub actor: EntityId,
    pub sense: Sense,
    entries: BTreeMap<EntityId, ScopeFlags>,
}

impl ScopeSet {
    fn empty(actor: EntityId, sense: Sense) -> Self {
        Self { actor, sense, entries: BTreeMap::new() }
    }

    pub fn get(&self, id: &EntityId) -> Option<ScopeFlags> {
        self.entries.get(id).copied()
    }

    pub fn has(&self, id: &EntityId, level: ScopeLevel) -> bool {
        self.entries.get(id).is_some_and(|f| f.has(level))
    }

    pub fn level_of(&self, id: &EntityId) -> Option<ScopeLevel> {
        self.entries.get(id).and_then(|f| f.narrowest())
    }

    /// Every entity in scope at `level`, in id order.
    pub fn at_level(&self, level: ScopeLevel) -> Vec<EntityId> {
        self.entries
            .iter()
            .filter(|(_, f)| f.has(level))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn carried(&self) -> BTreeSet<EntityId> {
        self.at_level(ScopeLevel::Carried).into_iter().collect()
    }

    pub fn reachable(&self) -> BTreeSet<EntityId> {
        self.at_level(ScopeLevel::Reachable).into_iter().collect()
    }

    pub fn visible(&self) -> BTreeSet<EntityId> {
        self.at_level(ScopeLevel::Visible).into_iter().collect()
    }

    pub fn detectable(&self) -> BTreeSet<EntityId> {
        self.at_level(ScopeLevel::Detectable).into_iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &ScopeFlags)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Compute the scope of `actor` for `sense` against the current world.
/// An actor with no location gets an empty set.
pub fn resolve_scope(world: &World, actor: &EntityId, sense: Sense) -> ScopeSet {
    let mut set = ScopeSet::empty(actor.clone(), sense);
    let Some(location) = world.get_location(actor) else {
        debug!(actor = %actor, "actor has no location; empty scope");
        return set;
    };

    // 1. What the actor holds and wears.
    let mut own = BTreeMap::new();
    visit_own(world, actor, actor, true, true, &mut own);

    // 2. The surroundings, from the sight and reach ceilings.
    let sight_root = ceiling(world, location, |w, id| w.is_open(id) || w.is_transparent(id));
    let reach_root = ceiling(world, location, |w, id| w.is_open(id));
    let mut around = BTreeMap::new();
    let mut walk = Surroundings { world, actor, reach_root: &reach_root, flags: &mut around };
    walk.visit(&sight_root, sight_root == reach_root);

    // 3. Darkness.
    let lit = world.is_active_light(actor)
        || own.keys().chain(around.keys()).any(|id| world.is_active_light(id));
    let dark = world.has_trait(&sight_root, TraitKind::Dark) && !lit;
    if dark {
        around.clear();
    }

    for (id, flags) in own.into_iter().chain(around) {
        let entry = set.entries.entry(id).or_default();
        entry.carried |= flags.carried;
        entry.reachable |= flags.reachable;
        entry.visible |= flags.visible;
    }

    // 4. Detectability for the requested sense.
    for flags in set.entries.values_mut() {
        flags.detectable = match sense {
            Sense::Touch => flags.reachable,
            _ => flags.visible,
        };
    }
    if matches!(sense, Sense::Hearing | Sense::Smell) {
        for id in sensed(world, actor, &sight_root, sense) {
            set.entries.entry(id).or_default().detectable = true;
        }
    }

    debug!(
        actor = %actor,
        ?sense,
        dark,
        entities = set.len(),
        "scope resolved"
    );
    set
}

/// Climb from `start` while the current holder lets the sense through,
/// stopping at a room.
fn ceiling(world: &World, start: &EntityId, passes: impl Fn(&World, &EntityId) -> bool) -> EntityId {
    let mut current = start.clone();
    let mut steps = 0;
    while !world.is_room(&current) && passes(world, &current) {
        let Some(parent) = world.get_location(&current) else {
            break;
        };
        steps += 1;
        if steps > world.entities().count() {
            break;
        }
        current = parent.clone();
    }
    current
}

/// Does a holder show its contents to the eye? Anything that is not a
/// closed, opaque container does.
fn shows_contents(world: &World, id: &EntityId) -> bool {
    !world.has_trait(id, TraitKind::Container) || world.is_open(id) || world.is_transparent(id)
}

fn visit_own(
    world: &World,
    actor: &EntityId,
    node: &EntityId,
    visible: bool,
    reachable: bool,
    out: &mut BTreeMap<EntityId, ScopeFlags>,
) {
    for child in world.get_contents(node, ContentsOptions::default()) {
        if world.is_room(&child) {
            continue;
        }
        let flags = ScopeFlags {
            carried: node == actor,
            reachable,
            visible,
            detectable: false,
        };
        out.insert(child.clone(), flags);
        if shows_contents(world, &child) {
            visit_own(world, actor, &child, visible, reachable && world.is_open(&child), out);
        }
    }
}

struct Surroundings<'a> {
    world: &'a World,
    actor: &'a EntityId,
    reach_root: &'a EntityId,
    flags: &'a mut BTreeMap<EntityId, ScopeFlags>,
}

impl Surroundings<'_> {
    /// `contents_reachable`: whether the direct children of `node` can be touched.
    fn visit(&mut self, node: &EntityId, contents_reachable: bool) {
        let world = self.world;
        for child in world.get_contents(node, ContentsOptions::default()) {
            if &child == self.actor || world.is_room(&child) {
                continue;
            }
            let worn_by_other = world.is_actor(node) && world.is_worn(&child);
            let exposed = world.has_trait(&child, TraitKind::Exposed)
                || world.has_trait(node, TraitKind::Exposed);
            let reachable = contents_reachable && (!worn_by_other || exposed);

            let entry = self.flags.entry(child.clone()).or_default();
            entry.visible = true;
            entry.reachable |= reachable;

            if shows_contents(world, &child) || &child == self.reach_root {
                let inner = (reachable && world.is_open(&child)) || &child == self.reach_root;
                self.visit(&child, inner);
            }
        }
    }
}

/// Entities perceivable by hearing or smell: the actor's room (closed
/// containers muffle) and rooms joined to it by an open door.
fn sensed(world: &World, actor: &EntityId, sight_root: &EntityId, sense: Sense) -> BTreeSet<EntityId> {
    let mut out = BTreeSet::new();
    let room = world
        .containing_room(actor)
        .cloned()
        .unwrap_or_else(|| sight_root.clone());

    walk_sense(world, actor, &room, false, sense, &mut out);

    for door in world.entities().filter(|e| e.kind == EntityKind::Door) {
        let Some(rooms) = world.door_rooms(&door.id) else {
            continue;
        };
        if !world.is_open(&door.id) {
            continue;
        }
        let other = if rooms[0] == room {
            &rooms[1]
        } else if rooms[1] == room {
            &rooms[0]
        } else {
            continue;
        };
        walk_sense(world, actor, other, false, sense, &mut out);
    }
    out
}

fn walk_sense(
    world: &World,
    actor: &EntityId,
    node: &EntityId,
    sealed: bool,
    sense: Sense,
    out: &mut BTreeSet<EntityId>,
) {
    for child in world.get_contents(node, ContentsOptions::default()) {
        if &child == actor || world.is_room(&child) {
            continue;
        }
        let perceived = match sense {
            Sense::Hearing => !sealed || world.has_trait(&child, TraitKind::Loud),
            Sense::Smell => {
                !sealed && (world.has_trait(&child, TraitKind::Scented) || world.is_actor(&child))
            }
            _ => false,
        };
        if perceived {
            out.insert(child.clone());
        }
        let seals = world.has_trait(&child, TraitKind::Container) && !world.is_open(&child);
        walk_sense(world, actor, &child, sealed || seals, sense, out);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Entity, Trait};

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    fn room(w: &mut World, name: &str) {
        w.add_entity(Entity::new(name, name, EntityKind::Room)).unwrap();
    }

    fn thing(w: &mut World, name: &str, at: &str) {
        w.add_at(Entity::new(name, name, EntityKind::Thing), &id(at)).unwrap();
    }

    fn lit_world() -> World {
        let mut w = World::new();
        room(&mut w, "hall");
        w.add_at(Entity::new("player", "yourself", EntityKind::Actor), &id("hall")).unwrap();
        thing(&mut w, "coin", "player");
        thing(&mut w, "rock", "hall");
        w.add_at(
            Entity::new("chest", "chest", EntityKind::Thing)
                .with_trait(Trait::Container { transparent: false, capacity: None })
                .with_trait(Trait::Openable { open: false }),
            &id("hall"),
        )
        .unwrap();
        thing(&mut w, "gem", "chest");
        w.add_at(
            Entity::new("case", "glass case", EntityKind::Thing)
                .with_trait(Trait::Container { transparent: true, capacity: None })
                .with_trait(Trait::Openable { open: false }),
            &id("hall"),
        )
        .unwrap();
        thing(&mut w, "medal", "case");
        w
    }

    #[test]
    fn test_carried_items_have_every_level() {
        let w = lit_world();
        let s = resolve_scope(&w, &id("player"), Sense::Sight);
        let coin = s.get(&id("coin")).unwrap();
        assert!(coin.carried && coin.reachable && coin.visible && coin.detectable);
        assert_eq!(s.level_of(&id("coin")), Some(ScopeLevel::Carried));
    }

    #[test]
    fn test_room_contents_reachable() {
        let w = lit_world();
        let s = resolve_scope(&w, &id("player"), Sense::Sight);
        assert_eq!(s.level_of(&id("rock")), Some(ScopeLevel::Reachable));
        assert!(s.get(&id("player")).is_none(), "actor is never in its own scope");
        assert!(s.get(&id("hall")).is_none(), "rooms are never in scope");
    }

    #[test]
    fn test_closed_opaque_container_hides_contents() {
        let w = lit_world();
        let s = resolve_scope(&w, &id("player"), Sense::Sight);
        assert!(s.has(&id("chest"), ScopeLevel::Reachable));
        assert!(s.get(&id("gem")).is_none());
    }

    #[test]
    fn test_transparent_container_shows_but_does_not_reach() {
        let w = lit_world();
        let s = resolve_scope(&w, &id("player"), Sense::Sight);
        assert!(s.has(&id("medal"), ScopeLevel::Visible));
        assert!(!s.has(&id("medal"), ScopeLevel::Reachable));
    }

    #[test]
    fn test_opening_container_exposes_contents() {
        let mut w = lit_world();
        w.set_open(&id("chest"), true).unwrap();
        let s = resolve_scope(&w, &id("player"), Sense::Sight);
        assert_eq!(s.level_of(&id("gem")), Some(ScopeLevel::Reachable));
    }

    #[test]
    fn test_darkness_hides_room_but_not_inventory() {
        let mut w = lit_world();
        w.add_entity(Entity::new("cellar", "cellar", EntityKind::Room).with_trait(Trait::Dark)).unwrap();
        w.move_entity(&id("player"), &id("cellar")).unwrap();
        w.move_entity(&id("rock"), &id("cellar")).unwrap();
        let s = resolve_scope(&w, &id("player"), Sense::Sight);
        assert!(s.get(&id("rock")).is_none());
        assert_eq!(s.level_of(&id("coin")), Some(ScopeLevel::Carried));
    }

    #[test]
    fn test_active_light_on_floor_lights_dark_room() {
        let mut w = lit_world();
        w.add_entity(Entity::new("cellar", "cellar", EntityKind::Room).with_trait(Trait::Dark)).unwrap();
        w.move_entity(&id("player"), &id("cellar")).unwrap();
        w.add_at(
            Entity::new("lamp", "lamp", EntityKind::Thing)
                .with_trait(Trait::LightSource)
                .with_trait(Trait::Switchable { on: true }),
            &id("cellar"),
        )
        .unwrap();
        let s = resolve_scope(&w, &id("player"), Sense::Sight);
        assert!(s.has(&id("lamp"), ScopeLevel::Reachable));

        w.set_switched(&id("lamp"), false).unwrap();
        let s = resolve_scope(&w, &id("player"), Sense::Sight);
        assert!(s.get(&id("lamp")).is_none());
    }

    #[test]
    fn test_worn_items_of_others_visible_not_reachable() {
        let mut w = lit_world();
        w.add_at(Entity::new("guard", "guard", EntityKind::Actor), &id("hall")).unwrap();
        w.add_at(
            Entity::new("helmet", "helmet", EntityKind::Thing).with_trait(Trait::Wearable { worn: false }),
            &id("guard"),
        )
        .unwrap();
        w.set_worn(&id("helmet"), true).unwrap();
        let s = resolve_scope(&w, &id("player"), Sense::Sight);
        assert!(s.has(&id("helmet"), ScopeLevel::Visible));
        assert!(!s.has(&id("helmet"), ScopeLevel::Reachable));
    }

    #[test]
    fn test_actor_without_location_has_empty_scope() {
        let mut w = lit_world();
        w.add_entity(Entity::new("ghost", "ghost", EntityKind::Actor)).unwrap();
        let s = resolve_scope(&w, &id("ghost"), Sense::Sight);
        assert!(s.is_empty());
    }

    #[test]
    fn test_actor_inside_closed_box_sees_only_box() {
        let mut w = lit_world();
        w.add_at(
            Entity::new("wardrobe", "wardrobe", EntityKind::Thing)
                .with_trait(Trait::Container { transparent: false, capacity: None })
                .with_trait(Trait::Openable { open: false }),
            &id("hall"),
        )
        .unwrap();
        thing(&mut w, "hanger", "wardrobe");
        w.move_entity(&id("player"), &id("wardrobe")).unwrap();
        let s = resolve_scope(&w, &id("player"), Sense::Sight);
        assert!(s.has(&id("hanger"), ScopeLevel::Reachable));
        assert!(s.get(&id("rock")).is_none());
    }

    #[test]
    fn test_hearing_reaches_through_open_door() {
        let mut w = lit_world();
        room(&mut w, "study");
        w.add_at(Entity::new("parrot", "parrot", EntityKind::Actor), &id("study")).unwrap();
        w.add_at(
            Entity::new("door", "oak door", EntityKind::Door)
                .with_trait(Trait::Door { rooms: [id("hall"), id("study")], exits: None })
                .with_trait(Trait::Openable { open: true }),
            &id("hall"),
        )
        .unwrap();
        let s = resolve_scope(&w, &id("player"), Sense::Hearing);
        assert!(s.has(&id("parrot"), ScopeLevel::Detectable));
        assert!(!s.has(&id("parrot"), ScopeLevel::Visible));

        let sight = resolve_scope(&w, &id("player"), Sense::Sight);
        assert!(sight.get(&id("parrot")).is_none());
    }

    #[test]
    fn test_loud_item_heard_from_closed_container() {
        let mut w = lit_world();
        w.add_at(Entity::new("clock", "clock", EntityKind::Thing).with_trait(Trait::Loud), &id("chest")).unwrap();
        let s = resolve_scope(&w, &id("player"), Sense::Hearing);
        assert!(s.has(&id("clock"), ScopeLevel::Detectable));
        assert!(!s.has(&id("gem"), ScopeLevel::Detectable));
    }

    #[test]
    fn test_scope_is_idempotent_and_layered() {
        let w = lit_world();
        let a = resolve_scope(&w, &id("player"), Sense::Sight);
        let b = resolve_scope(&w, &id("player"), Sense::Sight);
        assert_eq!(a, b);
        assert!(a.carried().is_subset(&a.reachable()));
        assert!(a.reachable().is_subset(&a.visible()));
    }
}
