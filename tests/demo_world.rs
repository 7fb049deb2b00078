/// A short playthrough of the bundled demo story.
///
/// The story has a lit study and a dark cellar joined by an open trapdoor:
/// "down" from the study, "up" from the cellar.

use lantern::events::{kinds, SemanticEvent};
use lantern::types::EntityId;
use lantern::world::World;
use lantern::Engine;
use serde_json::{json, Value};

const DEMO_WORLD: &str = include_str!("../data/worlds/demo.yaml");

fn id(s: &str) -> EntityId {
    EntityId::new(s)
}

fn demo() -> (Engine, EntityId) {
    let story = World::from_yaml(DEMO_WORLD).expect("demo story should load");
    (Engine::new(story.world), story.player)
}

/// The first domain event of a turn.
fn domain(events: &[SemanticEvent]) -> &SemanticEvent {
    events
        .iter()
        .find(|e| e.event_type.starts_with("if.event."))
        .unwrap_or_else(|| panic!("no domain event in {:?}", events))
}

fn list(ev: &SemanticEvent, key: &str) -> Vec<String> {
    match ev.param(key) {
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        other => panic!("param '{}' is not a list: {:?}", key, other),
    }
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_demo_story_loads() {
    let (engine, player) = demo();
    let w = engine.world();
    assert_eq!(player, id("player"));
    assert_eq!(w.get_location(&player), Some(&id("study")));
    assert!(w.is_worn(&id("cloak")));
    assert_eq!(w.get_location(&id("coin")), Some(&id("chest")));
    assert!(w.is_open(&id("trapdoor")));
}

#[test]
fn test_bad_story_is_rejected() {
    assert!(World::from_yaml("player: nobody\nentities: []\n").is_err());
    assert!(World::from_yaml("not: [valid").is_err());
}

// ============================================================================
// Study
// ============================================================================

#[test]
fn test_look_in_study_hides_scenery() {
    let (mut engine, player) = demo();
    let r = engine.submit_command(&player, "look");
    let ev = domain(&r.events);
    assert_eq!(ev.message_id(), "room_description");
    let contents = list(ev, "contents");
    assert!(contents.contains(&"red ball".to_string()));
    assert!(contents.contains(&"glass case".to_string()));
    assert!(!contents.contains(&"oak desk".to_string()));
}

#[test]
fn test_take_lamp_from_desk_by_alias() {
    let (mut engine, player) = demo();
    let r = engine.submit_command(&player, "take the lantern");
    assert!(r.success);
    let ev = domain(&r.events);
    assert_eq!(ev.message_id(), "taken_from");
    assert_eq!(ev.param("container"), Some(&json!("oak desk")));
    assert_eq!(engine.world().get_location(&id("lamp")), Some(&player));
}

#[test]
fn test_medal_needs_the_case_opened() {
    let (mut engine, player) = demo();
    assert!(engine.submit_command(&player, "examine the medal").success);

    let r = engine.submit_command(&player, "take medal");
    assert_eq!(r.events[0].event_type, kinds::COMMAND_FAILED);
    assert_eq!(r.events[0].message_id(), "not_reachable");

    let r = engine.submit_command(&player, "open the glass case");
    assert_eq!(domain(&r.events).message_id(), "opened");

    let r = engine.submit_command(&player, "take medal from case");
    assert!(r.success);
    assert_eq!(engine.world().get_location(&id("medal")), Some(&player));
}

#[test]
fn test_put_both_balls_in_case() {
    let (mut engine, player) = demo();
    engine.submit_command(&player, "open case");
    assert!(engine.submit_command(&player, "take red ball and blue ball").success);
    let r = engine.submit_command(&player, "put them in the case");
    assert!(r.success, "events: {:?}", r.events);
    assert_eq!(engine.world().get_location(&id("red-ball")), Some(&id("case")));
    assert_eq!(engine.world().get_location(&id("blue-ball")), Some(&id("case")));
}

#[test]
fn test_inventory_splits_worn_and_carried() {
    let (mut engine, player) = demo();
    engine.submit_command(&player, "take lamp");
    let r = engine.submit_command(&player, "i");
    let ev = domain(&r.events);
    assert_eq!(ev.message_id(), "inventory");
    assert_eq!(list(ev, "carried"), vec!["brass lamp"]);
    assert_eq!(list(ev, "worn"), vec!["velvet cloak"]);

    assert!(engine.submit_command(&player, "take off the cloak").success);
    let r = engine.submit_command(&player, "inventory");
    assert!(list(domain(&r.events), "worn").is_empty());
}

// ============================================================================
// Senses across the trapdoor
// ============================================================================

#[test]
fn test_clock_heard_through_open_trapdoor() {
    let (mut engine, player) = demo();
    let r = engine.submit_command(&player, "listen");
    let ev = domain(&r.events);
    assert_eq!(ev.message_id(), "hears");
    assert_eq!(list(ev, "sounds"), vec!["grandfather clock"]);

    engine.world_mut().set_open(&id("trapdoor"), false).unwrap();
    let r = engine.submit_command(&player, "listen");
    assert_eq!(domain(&r.events).message_id(), "silence");
}

#[test]
fn test_cheese_smelled_from_study() {
    let (mut engine, player) = demo();
    let r = engine.submit_command(&player, "smell");
    let ev = domain(&r.events);
    assert_eq!(ev.message_id(), "smells");
    assert!(list(ev, "scents").contains(&"mouldy cheese".to_string()));
}

#[test]
fn test_say_reaches_no_one() {
    let (mut engine, player) = demo();
    let r = engine.submit_command(&player, "say \"is anyone down there?\"");
    let ev = domain(&r.events);
    assert_eq!(ev.event_type, "if.event.said");
    assert_eq!(ev.param("text"), Some(&json!("is anyone down there?")));
    assert!(ev.entities.others.is_empty());
}

// ============================================================================
// Cellar
// ============================================================================

#[test]
fn test_cellar_is_dark_until_the_lamp_is_lit() {
    let (mut engine, player) = demo();
    engine.submit_command(&player, "take lamp");
    let r = engine.submit_command(&player, "go down");
    assert!(r.success);
    assert_eq!(domain(&r.events).message_id(), "too_dark");
    assert_eq!(engine.world().get_location(&player), Some(&id("cellar")));

    let r = engine.submit_command(&player, "look");
    assert_eq!(domain(&r.events).message_id(), "room_dark");
    let r = engine.submit_command(&player, "open chest");
    assert_eq!(r.events[0].message_id(), "entity_not_found");

    let r = engine.submit_command(&player, "turn on the lamp");
    assert!(r.success);
    assert!(engine.world().is_switched_on(&id("lamp")));

    let r = engine.submit_command(&player, "open chest");
    let ev = domain(&r.events);
    assert_eq!(ev.message_id(), "opened_revealing");
    assert_eq!(list(ev, "revealed"), vec!["gold coin"]);

    assert!(engine.submit_command(&player, "take coin").success);
    assert_eq!(engine.world().get_location(&id("coin")), Some(&player));
}

#[test]
fn test_clock_in_the_dark_is_heard_not_seen() {
    let (mut engine, player) = demo();
    assert!(engine.submit_command(&player, "d").success);
    let r = engine.submit_command(&player, "take clock");
    assert_eq!(r.events[0].message_id(), "entity_not_found");
    let r = engine.submit_command(&player, "listen to the clock");
    assert_eq!(domain(&r.events).message_id(), "hears_target");
}

#[test]
fn test_walking_the_trapdoor() {
    let (mut engine, player) = demo();
    let r = engine.submit_command(&player, "north");
    assert_eq!(r.events[0].event_type, kinds::ACTION_BLOCKED);
    assert_eq!(r.events[0].message_id(), "no_exit_that_way");

    assert!(engine.submit_command(&player, "close the trapdoor").success);
    let r = engine.submit_command(&player, "down");
    assert_eq!(r.events[0].message_id(), "door_closed");
    assert_eq!(engine.world().get_location(&player), Some(&id("study")));

    engine.submit_command(&player, "open trapdoor");
    assert!(engine.submit_command(&player, "d").success);
    let r = engine.submit_command(&player, "u");
    let ev = domain(&r.events);
    assert_eq!(ev.event_type, "if.event.actor_moved");
    assert_eq!(ev.message_id(), "moved");
    assert_eq!(ev.param("to"), Some(&json!("Study")));
    assert_eq!(engine.world().get_location(&player), Some(&id("study")));
}
