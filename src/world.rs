//! World model: entities, typed traits, and the containment forest.
//!
//! The command pipeline only ever talks to the world through the queries
//! here (`get_location`, `get_contents`, `has_trait`/`get_trait`) and the one
//! mutation `move_entity`, which refuses any move that would make an entity
//! its own ancestor. Stories are loaded from YAML.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, WorldError};

// ---------------------------------------------------------------------------
// Entities and traits
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Room,
    #[default]
    Thing,
    Actor,
    Door,
}

/// Which way an exit leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
    Up,
    Down,
    In,
    Out,
}

impl Direction {
    pub const ALL: [Direction; 12] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Northeast,
        Direction::Northwest,
        Direction::Southeast,
        Direction::Southwest,
        Direction::Up,
        Direction::Down,
        Direction::In,
        Direction::Out,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Northeast => "northeast",
            Direction::Northwest => "northwest",
            Direction::Southeast => "southeast",
            Direction::Southwest => "southwest",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    /// Look up a canonical direction name ("north", not "n").
    pub fn from_name(name: &str) -> Option<Direction> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed capability attached to an entity. Story files list them as
/// `{ kind: container, transparent: true }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trait {
    Container {
        #[serde(default)]
        transparent: bool,
        #[serde(default)]
        capacity: Option<usize>,
    },
    Supporter,
    Openable {
        #[serde(default)]
        open: bool,
    },
    /// Fixed in place; never picked up.
    Scenery,
    Wearable {
        #[serde(default)]
        worn: bool,
    },
    LightSource,
    Switchable {
        #[serde(default)]
        on: bool,
    },
    /// Rooms only: unlit unless a light source is active.
    Dark,
    /// Worn items of another actor can be reached.
    Exposed,
    /// Heard even from inside a closed container.
    Loud,
    Scented,
    Door {
        rooms: [EntityId; 2],
        /// Direction of travel out of each room, in `rooms` order. A door
        /// without exits joins rooms for the senses only.
        #[serde(default)]
        exits: Option<[Direction; 2]>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraitKind {
    Container,
    Supporter,
    Openable,
    Scenery,
    Wearable,
    LightSource,
    Switchable,
    Dark,
    Exposed,
    Loud,
    Scented,
    Door,
}

impl Trait {
    pub fn kind(&self) -> TraitKind {
        match self {
            Trait::Container { .. } => TraitKind::Container,
            Trait::Supporter => TraitKind::Supporter,
            Trait::Openable { .. } => TraitKind::Openable,
            Trait::Scenery => TraitKind::Scenery,
            Trait::Wearable { .. } => TraitKind::Wearable,
            Trait::LightSource => TraitKind::LightSource,
            Trait::Switchable { .. } => TraitKind::Switchable,
            Trait::Dark => TraitKind::Dark,
            Trait::Exposed => TraitKind::Exposed,
            Trait::Loud => TraitKind::Loud,
            Trait::Scented => TraitKind::Scented,
            Trait::Door { .. } => TraitKind::Door,
        }
    }
}

/// Something that exists in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Display name; its last word doubles as a head noun ("brass lamp" → "lamp").
    pub name: String,
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub traits: Vec<Trait>,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            aliases: Vec::new(),
            adjectives: Vec::new(),
            traits: Vec::new(),
        }
    }

    pub fn with_trait(mut self, t: Trait) -> Self {
        self.traits.push(t);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_adjective(mut self, adjective: impl Into<String>) -> Self {
        self.adjectives.push(adjective.into());
        self
    }

    pub fn has(&self, kind: TraitKind) -> bool {
        self.traits.iter().any(|t| t.kind() == kind)
    }

    pub fn get(&self, kind: TraitKind) -> Option<&Trait> {
        self.traits.iter().find(|t| t.kind() == kind)
    }

    fn get_mut(&mut self, kind: TraitKind) -> Option<&mut Trait> {
        self.traits.iter_mut().find(|t| t.kind() == kind)
    }

    /// Words that name this entity as a head noun: the full name, its last
    /// word, and every alias (and alias last word).
    pub fn nouns(&self) -> Vec<String> {
        let mut out = Vec::new();
        for n in std::iter::once(&self.name).chain(self.aliases.iter()) {
            let lower = n.to_lowercase();
            if let Some(last) = lower.split_whitespace().last() {
                if last != lower {
                    out.push(last.to_string());
                }
            }
            out.push(lower);
        }
        out
    }

    /// Words describing this entity: explicit adjectives plus the
    /// non-final words of its name.
    pub fn descriptors(&self) -> Vec<String> {
        let mut out: Vec<String> = self.adjectives.iter().map(|a| a.to_lowercase()).collect();
        let lower = self.name.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();
        if words.len() > 1 {
            for w in &words[..words.len() - 1] {
                if !out.iter().any(|o| o == w) {
                    out.push(w.to_string());
                }
            }
        }
        out
    }

    /// Generic nouns implied by kind and traits ("door", "container", "light").
    pub fn type_synonyms(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        match self.kind {
            EntityKind::Door => out.push("door"),
            EntityKind::Actor => out.extend(["person", "someone"]),
            EntityKind::Room => out.push("room"),
            EntityKind::Thing => {}
        }
        if self.has(TraitKind::Container) {
            out.push("container");
        }
        if self.has(TraitKind::Supporter) {
            out.push("surface");
        }
        if self.has(TraitKind::LightSource) {
            out.push("light");
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Contents queries
// ---------------------------------------------------------------------------

/// Options for `World::get_contents`.
#[derive(Debug, Clone, Copy)]
pub struct ContentsOptions {
    /// Walk the whole subtree instead of direct children only.
    pub recursive: bool,
    /// Include items worn by the holder.
    pub include_worn: bool,
}

impl Default for ContentsOptions {
    fn default() -> Self {
        Self { recursive: false, include_worn: true }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The containment forest. Every entity has at most one location; rooms are
/// the roots.
#[derive(Debug, Clone, Default)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    parent: BTreeMap<EntityId, EntityId>,
    /// Children in the order they arrived, for deterministic listings.
    children: BTreeMap<EntityId, Vec<EntityId>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, entity: Entity) -> Result<(), WorldError> {
        if self.entities.contains_key(&entity.id) {
            return Err(WorldError::DuplicateEntity(entity.id));
        }
        self.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    /// Add an entity and put it somewhere in one step.
    pub fn add_at(&mut self, entity: Entity, location: &EntityId) -> Result<(), WorldError> {
        let id = entity.id.clone();
        self.add_entity(entity)?;
        self.move_entity(&id, location)
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn get_location(&self, id: &EntityId) -> Option<&EntityId> {
        self.parent.get(id)
    }

    pub fn get_contents(&self, id: &EntityId, opts: ContentsOptions) -> Vec<EntityId> {
        let mut out = Vec::new();
        self.collect_contents(id, opts, &mut out);
        out
    }

    fn collect_contents(&self, id: &EntityId, opts: ContentsOptions, out: &mut Vec<EntityId>) {
        let Some(kids) = self.children.get(id) else {
            return;
        };
        for kid in kids {
            if !opts.include_worn && self.is_worn(kid) {
                continue;
            }
            out.push(kid.clone());
            if opts.recursive {
                self.collect_contents(kid, opts, out);
            }
        }
    }

    pub fn has_trait(&self, id: &EntityId, kind: TraitKind) -> bool {
        self.entities.get(id).is_some_and(|e| e.has(kind))
    }

    pub fn get_trait(&self, id: &EntityId, kind: TraitKind) -> Option<&Trait> {
        self.entities.get(id).and_then(|e| e.get(kind))
    }

    /// Move `id` into `target`. Rejects moves that would put an entity
    /// inside itself or inside one of its own descendants.
    pub fn move_entity(&mut self, id: &EntityId, target: &EntityId) -> Result<(), WorldError> {
        if !self.entities.contains_key(id) {
            return Err(WorldError::UnknownEntity(id.clone()));
        }
        if !self.entities.contains_key(target) {
            return Err(WorldError::UnknownEntity(target.clone()));
        }
        if id == target || self.is_ancestor(id, target) {
            return Err(WorldError::WouldCreateCycle {
                entity: id.clone(),
                target: target.clone(),
            });
        }

        if let Some(old) = self.parent.remove(id) {
            if let Some(kids) = self.children.get_mut(&old) {
                kids.retain(|k| k != id);
            }
        }
        self.parent.insert(id.clone(), target.clone());
        self.children.entry(target.clone()).or_default().push(id.clone());

        // Moving anything takes it off whoever was wearing it.
        if let Some(Trait::Wearable { worn }) = self.trait_mut(id, TraitKind::Wearable) {
            *worn = false;
        }
        Ok(())
    }

    /// Is `ancestor` somewhere above `id` in the containment forest?
    pub fn is_ancestor(&self, ancestor: &EntityId, id: &EntityId) -> bool {
        let mut current = self.parent.get(id);
        let mut steps = 0;
        while let Some(loc) = current {
            if loc == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.entities.len() {
                break;
            }
            current = self.parent.get(loc);
        }
        false
    }

    /// The room an entity is ultimately inside, if any.
    pub fn containing_room(&self, id: &EntityId) -> Option<&EntityId> {
        let mut current = self.parent.get(id);
        let mut steps = 0;
        while let Some(loc) = current {
            if self.entities.get(loc).is_some_and(|e| e.kind == EntityKind::Room) {
                return Some(loc);
            }
            steps += 1;
            if steps > self.entities.len() {
                break;
            }
            current = self.parent.get(loc);
        }
        None
    }

    // ── Trait helpers ───────────────────────────────────────────────────

    fn trait_mut(&mut self, id: &EntityId, kind: TraitKind) -> Option<&mut Trait> {
        self.entities.get_mut(id).and_then(|e| e.get_mut(kind))
    }

    pub fn is_room(&self, id: &EntityId) -> bool {
        self.entities.get(id).is_some_and(|e| e.kind == EntityKind::Room)
    }

    pub fn is_actor(&self, id: &EntityId) -> bool {
        self.entities.get(id).is_some_and(|e| e.kind == EntityKind::Actor)
    }

    /// Containers without an `Openable` trait are always open.
    pub fn is_open(&self, id: &EntityId) -> bool {
        match self.get_trait(id, TraitKind::Openable) {
            Some(Trait::Openable { open }) => *open,
            _ => true,
        }
    }

    pub fn is_transparent(&self, id: &EntityId) -> bool {
        matches!(
            self.get_trait(id, TraitKind::Container),
            Some(Trait::Container { transparent: true, .. })
        )
    }

    pub fn is_worn(&self, id: &EntityId) -> bool {
        matches!(
            self.get_trait(id, TraitKind::Wearable),
            Some(Trait::Wearable { worn: true })
        )
    }

    pub fn is_switched_on(&self, id: &EntityId) -> bool {
        matches!(
            self.get_trait(id, TraitKind::Switchable),
            Some(Trait::Switchable { on: true })
        )
    }

    /// A light source shines when it has no switch or its switch is on.
    pub fn is_active_light(&self, id: &EntityId) -> bool {
        self.has_trait(id, TraitKind::LightSource)
            && (!self.has_trait(id, TraitKind::Switchable) || self.is_switched_on(id))
    }

    pub fn container_capacity(&self, id: &EntityId) -> Option<usize> {
        match self.get_trait(id, TraitKind::Container) {
            Some(Trait::Container { capacity, .. }) => *capacity,
            _ => None,
        }
    }

    pub fn door_rooms(&self, id: &EntityId) -> Option<&[EntityId; 2]> {
        match self.get_trait(id, TraitKind::Door) {
            Some(Trait::Door { rooms, .. }) => Some(rooms),
            _ => None,
        }
    }

    /// The door leading out of `room` in `direction`, and the room behind it.
    pub fn exit(&self, room: &EntityId, direction: Direction) -> Option<(&EntityId, &EntityId)> {
        self.entities.values().find_map(|e| match e.get(TraitKind::Door) {
            Some(Trait::Door { rooms, exits: Some(exits) }) => (0..2)
                .find(|&i| &rooms[i] == room && exits[i] == direction)
                .map(|i| (&e.id, &rooms[1 - i])),
            _ => None,
        })
    }

    pub fn set_open(&mut self, id: &EntityId, value: bool) -> Result<(), WorldError> {
        match self.trait_mut(id, TraitKind::Openable) {
            Some(Trait::Openable { open }) => {
                *open = value;
                Ok(())
            }
            _ => Err(WorldError::MissingTrait { entity: id.clone(), trait_name: "openable" }),
        }
    }

    pub fn set_worn(&mut self, id: &EntityId, value: bool) -> Result<(), WorldError> {
        match self.trait_mut(id, TraitKind::Wearable) {
            Some(Trait::Wearable { worn }) => {
                *worn = value;
                Ok(())
            }
            _ => Err(WorldError::MissingTrait { entity: id.clone(), trait_name: "wearable" }),
        }
    }

    pub fn set_switched(&mut self, id: &EntityId, value: bool) -> Result<(), WorldError> {
        match self.trait_mut(id, TraitKind::Switchable) {
            Some(Trait::Switchable { on }) => {
                *on = value;
                Ok(())
            }
            _ => Err(WorldError::MissingTrait { entity: id.clone(), trait_name: "switchable" }),
        }
    }

    pub fn name_of(&self, id: &EntityId) -> String {
        self.entities
            .get(id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    // ── Story loading ───────────────────────────────────────────────────

    /// Build a world from a YAML story document.
    pub fn from_yaml(yaml: &str) -> Result<Story, WorldError> {
        let raw: StoryYaml =
            serde_yaml::from_str(yaml).map_err(|e| WorldError::Story(e.to_string()))?;

        let mut world = World::new();
        let mut placements = Vec::new();
        for def in raw.entities {
            let entity = Entity {
                id: def.id,
                name: def.name,
                kind: def.kind,
                aliases: def.aliases,
                adjectives: def.adjectives,
                traits: def.traits,
            };
            if let Some(loc) = def.location {
                placements.push((entity.id.clone(), loc));
            }
            world.add_entity(entity)?;
        }
        // Place after everything exists so files may list children first.
        // Worn flags are restored afterwards because moving clears them.
        for (id, loc) in placements {
            let worn = world.is_worn(&id);
            world.move_entity(&id, &loc)?;
            if worn {
                world.set_worn(&id, true)?;
            }
        }

        if !world.is_actor(&raw.player) {
            return Err(WorldError::Story(format!("player '{}' is not an actor", raw.player)));
        }
        Ok(Story { world, player: raw.player })
    }
}

// ---------------------------------------------------------------------------
// YAML schema
// ---------------------------------------------------------------------------

/// A loaded story: the world plus the entity the player controls.
#[derive(Debug, Clone)]
pub struct Story {
    pub world: World,
    pub player: EntityId,
}

#[derive(Debug, Deserialize)]
struct StoryYaml {
    player: EntityId,
    entities: Vec<EntityYaml>,
}

#[derive(Debug, Deserialize)]
struct EntityYaml {
    id: EntityId,
    name: String,
    #[serde(default)]
    kind: EntityKind,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    adjectives: Vec<String>,
    #[serde(default)]
    traits: Vec<Trait>,
    #[serde(default)]
    location: Option<EntityId>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn small_world() -> World {
        let mut w = World::new();
        w.add_entity(Entity::new("hall", "Hall", EntityKind::Room)).unwrap();
        w.add_at(Entity::new("player", "yourself", EntityKind::Actor), &"hall".into()).unwrap();
        w.add_at(
            Entity::new("box", "wooden box", EntityKind::Thing)
                .with_trait(Trait::Container { transparent: false, capacity: None })
                .with_trait(Trait::Openable { open: true }),
            &"hall".into(),
        )
        .unwrap();
        w.add_at(Entity::new("key", "brass key", EntityKind::Thing), &"box".into()).unwrap();
        w
    }

    #[test]
    fn test_move_rejects_self_containment() {
        let mut w = small_world();
        let err = w.move_entity(&"box".into(), &"box".into()).unwrap_err();
        assert!(matches!(err, WorldError::WouldCreateCycle { .. }));
    }

    #[test]
    fn test_move_rejects_descendant_target() {
        let mut w = small_world();
        let err = w.move_entity(&"box".into(), &"key".into()).unwrap_err();
        assert!(matches!(err, WorldError::WouldCreateCycle { .. }));
        // Rejected moves leave the graph untouched.
        assert_eq!(w.get_location(&"key".into()), Some(&EntityId::new("box")));
        assert_eq!(w.get_location(&"box".into()), Some(&EntityId::new("hall")));
    }

    #[test]
    fn test_contents_order_and_recursion() {
        let w = small_world();
        let direct = w.get_contents(&"hall".into(), ContentsOptions::default());
        assert_eq!(direct, vec![EntityId::new("player"), EntityId::new("box")]);
        let all = w.get_contents(&"hall".into(), ContentsOptions { recursive: true, include_worn: true });
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_containing_room() {
        let w = small_world();
        assert_eq!(w.containing_room(&"key".into()), Some(&EntityId::new("hall")));
        assert_eq!(w.containing_room(&"hall".into()), None);
    }

    #[test]
    fn test_moving_clears_worn() {
        let mut w = small_world();
        w.add_at(
            Entity::new("cloak", "cloak", EntityKind::Thing).with_trait(Trait::Wearable { worn: true }),
            &"player".into(),
        )
        .unwrap();
        w.set_worn(&"cloak".into(), true).unwrap();
        assert!(w.is_worn(&"cloak".into()));
        w.move_entity(&"cloak".into(), &"hall".into()).unwrap();
        assert!(!w.is_worn(&"cloak".into()));
    }

    #[test]
    fn test_nouns_and_descriptors() {
        let e = Entity::new("lamp", "brass lamp", EntityKind::Thing)
            .with_alias("lantern")
            .with_adjective("shiny");
        assert!(e.nouns().contains(&"lamp".to_string()));
        assert!(e.nouns().contains(&"lantern".to_string()));
        assert_eq!(e.descriptors(), vec!["shiny".to_string(), "brass".to_string()]);
    }

    #[test]
    fn test_story_from_yaml() {
        let yaml = r#"
player: me
entities:
  - id: me
    name: yourself
    kind: actor
    location: cellar
  - id: cellar
    name: Cellar
    kind: room
    traits:
      - kind: dark
  - id: cloak
    name: velvet cloak
    location: me
    traits:
      - kind: wearable
        worn: true
"#;
        let story = World::from_yaml(yaml).unwrap();
        assert_eq!(story.player, EntityId::new("me"));
        assert!(story.world.has_trait(&"cellar".into(), TraitKind::Dark));
        assert!(story.world.is_worn(&"cloak".into()));
        assert_eq!(story.world.get_location(&"me".into()), Some(&EntityId::new("cellar")));
    }

    #[test]
    fn test_exit_through_door_both_ways() {
        let mut w = small_world();
        w.add_entity(Entity::new("yard", "Yard", EntityKind::Room)).unwrap();
        w.add_at(
            Entity::new("gate", "gate", EntityKind::Door).with_trait(Trait::Door {
                rooms: ["hall".into(), "yard".into()],
                exits: Some([Direction::North, Direction::South]),
            }),
            &"hall".into(),
        )
        .unwrap();
        let gate = EntityId::new("gate");
        assert_eq!(w.exit(&"hall".into(), Direction::North), Some((&gate, &EntityId::new("yard"))));
        assert_eq!(w.exit(&"yard".into(), Direction::South), Some((&gate, &EntityId::new("hall"))));
        assert_eq!(w.exit(&"hall".into(), Direction::South), None);
        assert_eq!(w.door_rooms(&gate).map(|r| r[1].clone()), Some(EntityId::new("yard")));
    }

    #[test]
    fn test_direction_names() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_name(d.name()), Some(d));
        }
        assert_eq!(Direction::from_name("n"), None);
        assert_eq!(Direction::Northeast.to_string(), "northeast");
    }

    #[test]
    fn test_story_rejects_non_actor_player() {
        let yaml = "player: rock\nentities:\n  - id: rock\n    name: rock\n";
        assert!(matches!(World::from_yaml(yaml), Err(WorldError::Story(_))));
    }
}
